// Wire models for the backend's JSON envelopes.
//
// Only the fields the dashboard consumes are modelled; everything else in
// the records is ignored by serde.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ── Envelopes ────────────────────────────────────────────────────────

/// `{ success, data: [T], pagination? }` returned by every list endpoint.
///
/// `data` is a single page in server order. `pagination.total`, when present,
/// is the authoritative count of matching records server-side.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListResponse<T> {
    pub success: bool,
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
    /// Records on the page that did not decode into `T`. They still count
    /// towards the page length but match no category.
    #[serde(skip)]
    pub rejected: Vec<RejectedRecord>,
}

impl<T> ListResponse<T> {
    /// The server-declared total, if the response carried one.
    pub fn declared_total(&self) -> Option<u64> {
        self.pagination.as_ref().and_then(|p| p.total)
    }

    /// Number of records the backend put on this page, decoded or not.
    pub fn page_len(&self) -> u64 {
        u64::try_from(self.data.len() + self.rejected.len()).unwrap_or(u64::MAX)
    }
}

/// A record whose consumed fields had the wrong type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRecord {
    pub index: usize,
    /// Path of the offending field, e.g. `data[3].status`.
    pub field: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default, deserialize_with = "count")]
    pub total: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub page: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub limit: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub total_pages: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub has_next: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub has_prev: Option<bool>,
}

/// Read a JSON number holding a non-negative integer, written as `9` or `9.0`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
pub fn as_count(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    (f.is_finite() && f >= 0.0 && f.fract().abs() < f64::EPSILON).then(|| f as u64)
}

fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        value => as_count(&value).map(Some).ok_or_else(|| {
            serde::de::Error::custom(format!("expected a non-negative integer, got {value}"))
        }),
    }
}

/// Informational fields: a value of the wrong type reads as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if let Some(n) = as_count(&value) {
        if let Ok(parsed) = T::deserialize(Value::from(n)) {
            return Ok(Some(parsed));
        }
    }
    Ok(T::deserialize(value).ok())
}

/// `{ success, data: { <category>: { total, <bucket>: n, ... } } }`.
///
/// Category payloads are kept as raw JSON; which buckets a category carries
/// varies by backend version.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub data: BTreeMap<String, serde_json::Value>,
}

/// Raw chart points from a history endpoint, unvalidated.
///
/// Each point is expected to look like `{ "month": "...", "<series>": n, ... }`.
pub type ChartHistory = Vec<serde_json::Value>;

// ── Records ──────────────────────────────────────────────────────────

/// Record identifier. The backend emits string ids on most collections and
/// numeric ids on a few legacy ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RecordId {
    Text(String),
    Number(i64),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Lead {
    #[serde(default, alias = "_id")]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, alias = "_id")]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct College {
    #[serde(default, alias = "_id")]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Trainer {
    #[serde(default, alias = "_id")]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub availability: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn integral_float_is_a_count() {
        assert_eq!(as_count(&json!(9)), Some(9));
        assert_eq!(as_count(&json!(9.0)), Some(9));
        assert_eq!(as_count(&json!(9.5)), None);
        assert_eq!(as_count(&json!(-1)), None);
        assert_eq!(as_count(&json!("9")), None);
    }

    #[test]
    fn pagination_accepts_float_totals() {
        let pagination: Pagination =
            serde_json::from_value(json!({ "total": 9.0, "page": 1.0, "hasNext": "no" }))
                .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(pagination.total, Some(9));
        assert_eq!(pagination.page, Some(1));
        assert_eq!(pagination.has_next, None);
    }
}
