use std::time::Duration;

use relief_review::config::{build_http_client, AppConfig, ConfigOverrides};
use relief_review::filter::FilterCriteria;
use relief_review::model::LoadOutcome;
use relief_review::store::{ApplicationStore, ApplicationsClient};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client_for(origin: &str, token: Option<&str>) -> ApplicationsClient {
    let http = build_http_client(Duration::from_secs(5)).unwrap();
    let cfg = AppConfig::resolve(
        ConfigOverrides {
            origin: origin.to_string(),
            api_base: Some("/api/v1".into()),
            token: token.map(String::from),
            limit: 1000,
            timeout: Duration::from_secs(5),
        },
        &http,
    )
    .await;
    ApplicationsClient::new(&cfg, http)
}

async fn serve(body: Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/applications/"))
        .and(query_param("limit", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;
    server
}

async fn load_ids(body: Value) -> Vec<String> {
    let server = serve(body).await;
    let client = client_for(&server.uri(), None).await;
    let mut store = ApplicationStore::new();
    let outcome = store.load(&client).await;
    assert!(!outcome.is_failed(), "{outcome:?}");
    store.records().iter().map(|r| r.id.clone()).collect()
}

#[tokio::test]
async fn bare_array_is_loaded_in_order() {
    let ids = load_ids(json!([{"id": 1}, {"id": 2}, {"id": 3}])).await;
    assert_eq!(ids, vec!["1", "2", "3"]);
}

#[tokio::test]
async fn nested_data_applications_yields_exactly_its_items() {
    let ids = load_ids(json!({
        "data": {"applications": [{"id": "a", "status": "pending"}, {"id": "b"}], "total": 2}
    }))
    .await;
    assert_eq!(ids, vec!["a", "b"]);
}

#[tokio::test]
async fn data_list_is_loaded() {
    let ids = load_ids(json!({"data": [{"id": 7}, {"id": 8}]})).await;
    assert_eq!(ids, vec!["7", "8"]);
}

#[tokio::test]
async fn single_data_object_becomes_one_record() {
    let ids = load_ids(json!({"data": {"id": 42, "case_no": "C-42"}})).await;
    assert_eq!(ids, vec!["42"]);
}

#[tokio::test]
async fn top_level_applications_is_loaded() {
    let ids = load_ids(json!({"applications": [{"id": 5}]})).await;
    assert_eq!(ids, vec!["5"]);
}

#[tokio::test]
async fn null_data_falls_through_to_applications() {
    let ids = load_ids(json!({"data": null, "applications": [{"id": 9}]})).await;
    assert_eq!(ids, vec!["9"]);
}

#[tokio::test]
async fn unknown_shape_loads_empty_without_failing() {
    let ids = load_ids(json!({"items": [{"id": 1}]})).await;
    assert!(ids.is_empty());
}

#[tokio::test]
async fn bearer_token_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/applications/"))
        .and(header("authorization", "Bearer t0ken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), Some("t0ken")).await;
    let mut store = ApplicationStore::new();
    assert_eq!(store.load(&client).await, LoadOutcome::Loaded { count: 1 });
}

#[tokio::test]
async fn server_error_clears_previous_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/applications/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "status": "pending"},
            {"id": 2, "status": "approved"}
        ])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/applications/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), None).await;
    let mut store = ApplicationStore::new();
    store.load(&client).await;
    assert_eq!(store.stats().total, 2);

    let outcome = store.load(&client).await;
    assert!(outcome.is_failed());
    assert!(store.records().is_empty());
    assert_eq!(store.stats().total, 0);
    assert!(store.filtered(&FilterCriteria::default()).is_empty());
}

#[tokio::test]
async fn unreachable_backend_yields_empty_store() {
    let client = client_for("http://127.0.0.1:9", None).await;
    let mut store = ApplicationStore::new();
    let outcome = store.load(&client).await;
    assert!(outcome.is_failed());
    assert!(store.records().is_empty());
}

#[tokio::test]
async fn non_json_body_yields_empty_store() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/applications/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), None).await;
    let mut store = ApplicationStore::new();
    assert!(store.load(&client).await.is_failed());
    assert!(store.records().is_empty());
}

#[tokio::test]
async fn stats_cover_full_store_regardless_of_filter() {
    let server = serve(json!([
        {"id": 1, "status": "pending", "address": "台北市大安區"},
        {"id": 2, "status": "pending", "address": "高雄市前鎮區"},
        {"id": 3, "status": "under_review", "address": "台北市信義區"},
        {"id": 4, "status": "site_inspection", "address": "台南市"},
        {"id": 5, "status": "completed", "address": "台北市中正區"}
    ]))
    .await;
    let client = client_for(&server.uri(), None).await;
    let mut store = ApplicationStore::new();
    store.load(&client).await;

    let criteria = FilterCriteria {
        city: "台北市".into(),
        ..Default::default()
    };
    assert_eq!(store.filtered(&criteria).len(), 3);

    let stats = store.stats();
    assert_eq!(stats.pending, 2);
    assert_eq!(stats.inspection, 2);
    assert_eq!(stats.approved_or_completed, 1);
    assert_eq!(stats.rejected, 0);
    assert_eq!(stats.total, 5);
}
