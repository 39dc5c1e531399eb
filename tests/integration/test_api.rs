//! Tests for the REST API boundary.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use tributary::config::StoreConfig;
use tributary::{
    create_rest_router, DataFrame, DataSystem, Oracle, OracleError, RestApiConfig, Selection,
    SourceDescriptor, TableRetriever,
};

/// Oracle fake that routes by keyword: queries mentioning "solar" go to
/// source 0, everything else matches nothing.
struct KeywordOracle;

#[async_trait]
impl Oracle for KeywordOracle {
    async fn select(
        &self,
        query: &str,
        _sources: &[SourceDescriptor],
    ) -> Result<Selection, OracleError> {
        if query.contains("solar") {
            Ok(Selection::Single {
                source: 0,
                query: query.to_string(),
            })
        } else {
            Ok(Selection::NoMatch)
        }
    }
}

fn test_router() -> Router {
    let frame = DataFrame::from_records(&[
        json!({"name": "Alpha Solar", "county": "Ross"}),
        json!({"name": "Beta Solar", "county": "Pike"}),
        json!({"name": "Gamma Solar", "county": "Athens"}),
    ])
    .unwrap();

    let mut system = DataSystem::new(Arc::new(KeywordOracle));
    system.add_dataframe_retriever(Arc::new(TableRetriever::new("Energy Atlas", frame)));

    create_rest_router(
        Arc::new(system),
        &StoreConfig::default(),
        &RestApiConfig::default(),
    )
}

async fn get(router: Router, uri: &str) -> (StatusCode, Value) {
    send(router, "GET", uri).await
}

async fn send(router: Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = router
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_query_success_returns_records() {
    let (status, body) = get(test_router(), "/api/v1/query?query=solar%20plants%20in%20Ohio").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["query"], "solar plants in Ohio");
    assert_eq!(body["source"], "Energy Atlas");

    let records = body["result"].as_array().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["name"], "Alpha Solar");
    assert_eq!(records[2]["name"], "Gamma Solar");
}

#[tokio::test]
async fn test_empty_query_is_bad_request() {
    let (status, body) = get(test_router(), "/api/v1/query?query=").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], "empty_query");
}

#[tokio::test]
async fn test_unmatched_query_is_not_found() {
    let (status, body) = get(test_router(), "/api/v1/query?query=lunar%20geology").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "no_data");
    assert_eq!(body["query"], "lunar geology");
}

#[tokio::test]
async fn test_annotations_listing_after_query() {
    let router = test_router();
    let (status, _) = get(router.clone(), "/api/v1/query?query=solar%20farms").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(router, "/api/v1/annotations").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["annotations"][0]["source"], "Energy Atlas");
    assert_eq!(body["annotations"][0]["kind"], "table");
    assert_eq!(body["annotations"][0]["rows"], 3);
}

#[tokio::test]
async fn test_prune_endpoint() {
    let router = test_router();
    let (status, body) = send(router, "DELETE", "/api/v1/annotations?older_than=300").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 0);
    assert_eq!(body["older_than_secs"], 300);
}

#[tokio::test]
async fn test_prune_rejects_zero_age() {
    let (status, body) = send(test_router(), "DELETE", "/api/v1/annotations?older_than=0").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_argument");
}

#[tokio::test]
async fn test_stats_endpoint() {
    let router = test_router();
    get(router.clone(), "/api/v1/query?query=solar").await;

    let (status, body) = get(router, "/api/v1/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["annotations"], 1);
    assert_eq!(body["dataframe_retrievers"], 1);
    assert_eq!(body["text_retrievers"], 0);
}

#[tokio::test]
async fn test_api_info_route() {
    let (status, body) = get(test_router(), "/api").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Tributary REST API");
}
