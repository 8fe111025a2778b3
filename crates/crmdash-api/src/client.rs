// Backend HTTP client
//
// Wraps `reqwest::Client` with base-URL joining, `{ success, data }`
// envelope checks, and contract validation. Endpoint paths are supplied
// by the caller; the backend's routing is configuration, not code.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::Error;
use crate::models::{ChartHistory, ListResponse, Pagination, RejectedRecord, StatsResponse, as_count};
use crate::transport::TransportConfig;

/// Raw HTTP client for the CRM/CMS backend.
///
/// Every method validates the envelope before deserializing it, so a body
/// with a missing `data` array or a non-numeric `pagination.total` surfaces
/// as [`Error::Malformed`] naming the field instead of an opaque serde error.
/// Individual list records are decoded one at a time, so one bad record
/// never costs the rest of the page.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a client from a base URL and a `TransportConfig`.
    ///
    /// The base URL may carry a path prefix (e.g. `https://host/backend`);
    /// endpoint paths are appended to it.
    pub fn new(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let base_url = Url::parse(base_url)?;
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Append an endpoint path to the base URL, keeping any base path prefix.
    pub(crate) fn endpoint_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    // ── Public API ───────────────────────────────────────────────────

    /// Fetch one page of a list endpoint.
    ///
    /// Requests `?page={page}&limit={limit}`. The returned `data` may be a
    /// truncated view of a larger set; see [`ListResponse::declared_total`].
    /// Records that fail to decode are reported in `rejected`.
    pub async fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        page: u32,
        limit: u32,
    ) -> Result<ListResponse<T>, Error> {
        let mut body = self
            .get_envelope(path, &[("page", page.to_string()), ("limit", limit.to_string())])
            .await?;

        let Some(Value::Array(records)) = body.get_mut("data").map(Value::take) else {
            return Err(malformed(path, "data"));
        };
        let pagination: Option<Pagination> = match body.get_mut("pagination").map(Value::take) {
            None | Some(Value::Null) => None,
            Some(pagination @ Value::Object(_)) => {
                match pagination.get("total") {
                    None | Some(Value::Null) => {}
                    Some(total) if as_count(total).is_some() => {}
                    Some(_) => return Err(malformed(path, "pagination.total")),
                }
                Some(decode(path, pagination)?)
            }
            Some(_) => return Err(malformed(path, "pagination")),
        };

        let (data, rejected) = decode_records(records);
        if !rejected.is_empty() {
            warn!(
                endpoint = path,
                rejected = rejected.len(),
                "records with invalid fields counted as uncategorized"
            );
        }
        Ok(ListResponse {
            success: true,
            data,
            pagination,
            rejected,
        })
    }

    /// Fetch the pre-aggregated CRM stats.
    pub async fn stats(&self, path: &str) -> Result<StatsResponse, Error> {
        let body = self.get_envelope(path, &[]).await?;
        if !body.get("data").is_some_and(Value::is_object) {
            return Err(malformed(path, "data"));
        }
        decode(path, body)
    }

    /// Fetch CRM chart history: `{ success, data: { chartData: [...] } }`.
    pub async fn crm_chart_history(&self, path: &str) -> Result<ChartHistory, Error> {
        let mut body = self.get_envelope(path, &[]).await?;
        match body.pointer_mut("/data/chartData").map(Value::take) {
            Some(Value::Array(points)) => Ok(points),
            _ => Err(malformed(path, "data.chartData")),
        }
    }

    /// Fetch CMS analytics history: `{ success, data: [...] }`.
    pub async fn cms_chart_history(&self, path: &str) -> Result<ChartHistory, Error> {
        let mut body = self.get_envelope(path, &[]).await?;
        match body.get_mut("data").map(Value::take) {
            Some(Value::Array(points)) => Ok(points),
            _ => Err(malformed(path, "data")),
        }
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and check the `{ success }` envelope.
    ///
    /// Returns the whole body as JSON so callers can validate the fields
    /// they consume before decoding.
    async fn get_envelope(&self, path: &str, params: &[(&str, String)]) -> Result<Value, Error> {
        let url = self.endpoint_url(path)?;
        debug!("GET {url} params={params:?}");

        let resp = self.http.get(url).query(params).send().await?;
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(Error::Unauthorized {
                endpoint: path.to_owned(),
                status: status.as_u16(),
            });
        }

        let body = resp.text().await?;

        if !status.is_success() {
            return Err(Error::Http {
                endpoint: path.to_owned(),
                status: status.as_u16(),
                message: if body.is_empty() {
                    status.to_string()
                } else {
                    preview(&body).to_owned()
                },
            });
        }

        trace!(endpoint = path, bytes = body.len(), "response received");

        let value: Value = serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body: body.clone(),
        })?;

        match value.get("success") {
            Some(Value::Bool(true)) => Ok(value),
            Some(Value::Bool(false)) => Err(Error::Unsuccessful {
                endpoint: path.to_owned(),
                message: value
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("success=false")
                    .to_owned(),
            }),
            _ => Err(malformed(path, "success")),
        }
    }
}

fn decode<T: DeserializeOwned>(path: &str, body: Value) -> Result<T, Error> {
    serde_json::from_value(body.clone()).map_err(|e| Error::Deserialization {
        message: format!("{path}: {e}"),
        body: body.to_string(),
    })
}

/// Decode each record separately; failures keep their index and the field
/// that broke them.
fn decode_records<T: DeserializeOwned>(records: Vec<Value>) -> (Vec<T>, Vec<RejectedRecord>) {
    let mut data = Vec::with_capacity(records.len());
    let mut rejected = Vec::new();
    for (index, record) in records.into_iter().enumerate() {
        match T::deserialize(&record) {
            Ok(item) => data.push(item),
            Err(e) => {
                let field = match offending_key::<T>(&record) {
                    Some(key) => format!("data[{index}].{key}"),
                    None => format!("data[{index}]"),
                };
                debug!(%field, error = %e, "record rejected");
                rejected.push(RejectedRecord { index, field });
            }
        }
    }
    (data, rejected)
}

/// The first key whose removal lets the record decode.
fn offending_key<T: DeserializeOwned>(record: &Value) -> Option<String> {
    let Value::Object(fields) = record else {
        return None;
    };
    fields
        .keys()
        .find(|key| {
            let mut trimmed = fields.clone();
            trimmed.remove(key.as_str());
            T::deserialize(&Value::Object(trimmed)).is_ok()
        })
        .cloned()
}

fn malformed(endpoint: &str, field: &str) -> Error {
    Error::Malformed {
        endpoint: endpoint.to_owned(),
        field: field.to_owned(),
    }
}

/// First 200 bytes of a body, cut on a char boundary.
fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::with_client(reqwest::Client::new(), Url::parse(base).unwrap())
    }

    #[test]
    fn endpoint_url_keeps_base_prefix() {
        let c = client("https://crm.example.com/backend/");
        assert_eq!(
            c.endpoint_url("/api/leads").unwrap().as_str(),
            "https://crm.example.com/backend/api/leads"
        );
    }

    #[test]
    fn endpoint_url_without_prefix() {
        let c = client("http://localhost:5000");
        assert_eq!(
            c.endpoint_url("api/crm/stats").unwrap().as_str(),
            "http://localhost:5000/api/crm/stats"
        );
    }

    #[test]
    fn bad_record_is_rejected_with_its_field() {
        let records = vec![
            serde_json::json!({ "id": "a", "status": "NEW" }),
            serde_json::json!({ "id": "b", "status": 5 }),
            serde_json::json!("not a record"),
        ];
        let (data, rejected) = decode_records::<crate::Lead>(records);
        assert_eq!(data.len(), 1);
        assert_eq!(
            rejected,
            vec![
                RejectedRecord {
                    index: 1,
                    field: "data[1].status".into()
                },
                RejectedRecord {
                    index: 2,
                    field: "data[2]".into()
                },
            ]
        );
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let body = "é".repeat(150);
        let cut = preview(&body);
        assert!(cut.len() <= 200);
        assert!(body.starts_with(cut));
    }
}
