// ── Stats fast path ──
//
// The optional stats endpoint returns pre-aggregated counts per category:
// `{ "leads": { "total": 120, "new": 40, ... }, ... }`. When a category is
// present and well-formed it replaces the list-derived summary for that
// category only.

use crmdash_api::StatsResponse;
use serde_json::Value;

use super::classify::StatusClassifier;
use crate::model::{EntitySummary, SummaryBasis};

/// Summary for `category` from a stats payload.
///
/// Returns `None` when the category is absent or has no unsigned integer
/// `total`; the caller then uses the list endpoint. Named categories the
/// payload omits read as 0. Extra numeric keys are kept, lower-cased.
pub fn summary_from_stats(
    stats: &StatsResponse,
    category: &str,
    classifier: &StatusClassifier,
) -> Option<EntitySummary> {
    let entry = stats.data.get(category)?.as_object()?;
    let total = entry.get("total").and_then(Value::as_u64)?;

    let mut breakdown = classifier.empty_breakdown();
    for (key, value) in entry {
        if key == "total" {
            continue;
        }
        if let Some(count) = value.as_u64() {
            *breakdown.entry(key.to_ascii_lowercase()).or_insert(0) += count;
        }
    }

    Some(EntitySummary {
        total,
        breakdown,
        basis: SummaryBasis::Stats,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::metrics::classify::{LEADS, TRAINERS};

    fn stats(data: Value) -> StatsResponse {
        StatsResponse {
            success: true,
            data: serde_json::from_value(data).unwrap_or_default(),
        }
    }

    #[test]
    fn well_formed_category_is_used() {
        let resp = stats(json!({
            "leads": { "total": 120, "new": 40, "Qualified": 50, "converted": 30 }
        }));
        let summary = summary_from_stats(&resp, "leads", &LEADS);

        let summary = summary.unwrap_or_default();
        assert_eq!(summary.total, 120);
        assert_eq!(summary.basis, SummaryBasis::Stats);
        assert_eq!(summary.count("qualified"), 50);
        assert_eq!(summary.count("converted"), 30);
    }

    #[test]
    fn missing_buckets_default_to_zero() {
        let resp = stats(json!({ "trainers": { "total": 7, "available": 7 } }));
        let summary = summary_from_stats(&resp, "trainers", &TRAINERS).unwrap_or_default();
        assert_eq!(summary.count("busy"), 0);
        assert_eq!(summary.breakdown.len(), 3);
    }

    #[test]
    fn absent_category_or_bad_total_falls_through() {
        let resp = stats(json!({
            "leads": { "total": "120" },
            "users": { "new": 3 },
            "colleges": 4
        }));
        assert!(summary_from_stats(&resp, "leads", &LEADS).is_none());
        assert!(summary_from_stats(&resp, "users", &LEADS).is_none());
        assert!(summary_from_stats(&resp, "colleges", &LEADS).is_none());
        assert!(summary_from_stats(&resp, "trainers", &TRAINERS).is_none());
    }
}
