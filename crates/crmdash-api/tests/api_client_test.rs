#![allow(clippy::unwrap_used)]
// Integration tests for `ApiClient` using wiremock.

use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crmdash_api::{ApiClient, Error, Lead, TransportConfig, User};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = ApiClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

// ── List endpoints ──────────────────────────────────────────────────

#[tokio::test]
async fn test_list_leads_with_pagination() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/leads"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [
                { "_id": "l1", "status": "NEW", "name": "Asha" },
                { "_id": "l2", "status": "qualified" }
            ],
            "pagination": {
                "total": 9, "page": 1, "limit": 100,
                "totalPages": 1, "hasNext": false, "hasPrev": false
            }
        })))
        .mount(&server)
        .await;

    let resp = client.list::<Lead>("/api/leads", 1, 100).await.unwrap();

    assert!(resp.success);
    assert_eq!(resp.data.len(), 2);
    assert_eq!(resp.declared_total(), Some(9));
    assert_eq!(resp.data[1].status.as_deref(), Some("qualified"));
    assert_eq!(resp.data[0].id.as_ref().unwrap().to_string(), "l1");
    let pagination = resp.pagination.unwrap();
    assert_eq!(pagination.total_pages, Some(1));
    assert_eq!(pagination.has_next, Some(false));
}

#[tokio::test]
async fn test_list_without_pagination() {
    let (server, client) = setup().await;
    mount_json(
        &server,
        "/api/users",
        json!({
            "success": true,
            "data": [{ "id": 7, "isActive": true }, { "id": 8, "status": "INACTIVE" }]
        }),
    )
    .await;

    let resp = client.list::<User>("/api/users", 1, 100).await.unwrap();

    assert_eq!(resp.declared_total(), None);
    assert_eq!(resp.data[0].is_active, Some(true));
    assert_eq!(resp.data[1].status.as_deref(), Some("INACTIVE"));
}

#[tokio::test]
async fn test_list_null_total_is_not_malformed() {
    let (server, client) = setup().await;
    mount_json(
        &server,
        "/api/leads",
        json!({ "success": true, "data": [], "pagination": { "total": null } }),
    )
    .await;

    let resp = client.list::<Lead>("/api/leads", 1, 100).await.unwrap();
    assert_eq!(resp.declared_total(), None);
}

#[tokio::test]
async fn test_list_string_total_is_malformed() {
    let (server, client) = setup().await;
    mount_json(
        &server,
        "/api/leads",
        json!({ "success": true, "data": [], "pagination": { "total": "9" } }),
    )
    .await;

    let err = client.list::<Lead>("/api/leads", 1, 100).await.unwrap_err();
    assert_eq!(err.malformed_field(), Some("pagination.total"));
}

#[tokio::test]
async fn test_list_integral_float_total() {
    let (server, client) = setup().await;
    mount_json(
        &server,
        "/api/leads",
        json!({ "success": true, "data": [], "pagination": { "total": 9.0 } }),
    )
    .await;

    let resp = client.list::<Lead>("/api/leads", 1, 100).await.unwrap();
    assert_eq!(resp.declared_total(), Some(9));
}

#[tokio::test]
async fn test_list_fractional_total_is_malformed() {
    let (server, client) = setup().await;
    mount_json(
        &server,
        "/api/leads",
        json!({ "success": true, "data": [], "pagination": { "total": 9.5 } }),
    )
    .await;

    let err = client.list::<Lead>("/api/leads", 1, 100).await.unwrap_err();
    assert_eq!(err.malformed_field(), Some("pagination.total"));
}

#[tokio::test]
async fn test_list_keeps_page_when_one_record_is_bad() {
    let (server, client) = setup().await;
    mount_json(
        &server,
        "/api/users",
        json!({
            "success": true,
            "data": [
                { "id": "u1", "isActive": true },
                { "id": "u2", "isActive": "yes" },
                { "id": "u3", "status": "ACTIVE" }
            ],
            "pagination": { "total": 30 }
        }),
    )
    .await;

    let resp = client.list::<User>("/api/users", 1, 100).await.unwrap();
    assert_eq!(resp.declared_total(), Some(30));
    assert_eq!(resp.data.len(), 2);
    assert_eq!(resp.page_len(), 3);
    assert_eq!(resp.rejected.len(), 1);
    assert_eq!(resp.rejected[0].field, "data[1].isActive");
}

#[tokio::test]
async fn test_list_missing_data_is_malformed() {
    let (server, client) = setup().await;
    mount_json(&server, "/api/leads", json!({ "success": true, "items": [] })).await;

    let err = client.list::<Lead>("/api/leads", 1, 100).await.unwrap_err();
    assert!(
        matches!(err, Error::Malformed { ref field, .. } if field == "data"),
        "expected Malformed(data), got: {err:?}"
    );
}

#[tokio::test]
async fn test_unsuccessful_envelope() {
    let (server, client) = setup().await;
    mount_json(
        &server,
        "/api/trainers",
        json!({ "success": false, "message": "database offline" }),
    )
    .await;

    let err = client
        .list::<serde_json::Value>("/api/trainers", 1, 100)
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::Unsuccessful { ref message, .. } if message == "database offline"),
        "expected Unsuccessful, got: {err:?}"
    );
}

#[tokio::test]
async fn test_server_error_maps_to_http() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/trainers"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = client
        .list::<serde_json::Value>("/api/trainers", 1, 100)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Http { status: 502, .. }), "got: {err:?}");
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_unauthorized() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/leads"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client.list::<Lead>("/api/leads", 1, 100).await.unwrap_err();
    assert!(err.is_auth(), "got: {err:?}");
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/crm/stats"))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "leads": { "total": 4, "new": 1 } }
        })))
        .mount(&server)
        .await;

    let transport = TransportConfig::default().with_bearer_token("s3cret".to_string().into());
    let client = ApiClient::new(&server.uri(), &transport).unwrap();

    let stats = client.stats("/api/crm/stats").await.unwrap();
    assert_eq!(stats.data["leads"]["total"], 4);
}

// ── Chart history ───────────────────────────────────────────────────

#[tokio::test]
async fn test_crm_chart_history_shape() {
    let (server, client) = setup().await;
    mount_json(
        &server,
        "/api/crm/chart-data",
        json!({
            "success": true,
            "data": { "chartData": [ { "month": "Jan", "leads": 3 }, { "month": "Feb", "leads": 5 } ] }
        }),
    )
    .await;

    let points = client.crm_chart_history("/api/crm/chart-data").await.unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[1]["leads"], 5);
}

#[tokio::test]
async fn test_crm_chart_history_missing_chart_data() {
    let (server, client) = setup().await;
    mount_json(&server, "/api/crm/chart-data", json!({ "success": true, "data": [] })).await;

    let err = client
        .crm_chart_history("/api/crm/chart-data")
        .await
        .unwrap_err();
    assert_eq!(err.malformed_field(), Some("data.chartData"));
}

#[tokio::test]
async fn test_cms_chart_history_shape() {
    let (server, client) = setup().await;
    mount_json(
        &server,
        "/api/cms/analytics/chart",
        json!({ "success": true, "data": [ { "month": "Mar", "blogs": 2, "videos": 1 } ] }),
    )
    .await;

    let points = client
        .cms_chart_history("/api/cms/analytics/chart")
        .await
        .unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0]["month"], "Mar");
}
