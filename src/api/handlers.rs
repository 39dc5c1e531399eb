//! REST API request handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::annotation::Payload;
use crate::config::StoreConfig;
use crate::error::TributaryError;
use crate::system::DataSystem;

/// Application state shared across handlers.
pub struct ApiState {
    /// The data system serving queries.
    pub system: Arc<DataSystem>,
    /// Prune once the store grows past this many annotations.
    prune_trigger: usize,
    /// Age bound applied by the size-triggered prune, in seconds.
    retention_secs: u64,
    started_at: Instant,
}

impl ApiState {
    /// Create new API state with the store policy knobs.
    pub fn new(system: Arc<DataSystem>, store: &StoreConfig) -> Self {
        Self {
            system,
            prune_trigger: store.max_entries,
            retention_secs: store.retention_secs,
            started_at: Instant::now(),
        }
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query string parameters for `GET /query`.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryParams {
    pub query: String,
}

/// Successful query response.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub query: String,
    /// Retriever name, or a composite label for joined answers.
    pub source: String,
    /// Tabular payloads as an ordered array of row-objects; text
    /// payloads as `{"answer": ...}`.
    pub result: Value,
    pub status: String,
}

/// Error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub query: String,
    pub status: String,
    pub message: String,
    pub code: String,
}

/// One stored annotation, summarized for listing.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotationSummary {
    pub id: String,
    pub source: String,
    pub query: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub age_secs: i64,
}

/// Annotations list response.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotationsResponse {
    pub annotations: Vec<AnnotationSummary>,
    pub total: usize,
}

/// Prune query parameters for `DELETE /annotations`.
#[derive(Debug, Clone, Deserialize)]
pub struct PruneParams {
    pub older_than: u64,
}

/// Prune response.
#[derive(Debug, Clone, Serialize)]
pub struct PruneResponse {
    pub removed: usize,
    pub older_than_secs: u64,
}

/// Stats response.
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub annotations: usize,
    pub dataframe_retrievers: usize,
    pub text_retrievers: usize,
    pub uptime_seconds: u64,
}

// ============================================================================
// Handler Functions
// ============================================================================

/// GET /query?query=... - Answer a natural-language query.
pub async fn query_handler(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<QueryParams>,
) -> impl IntoResponse {
    if params.query.trim().is_empty() {
        return error_response(&params.query, TributaryError::EmptyQuery);
    }

    // Size-triggered prune: the store itself never self-evicts.
    if state.system.store().len() > state.prune_trigger {
        let removed = state
            .system
            .remove_annotations_older_than(state.retention_secs);
        debug!(removed, "size threshold exceeded, pruned store");
    }

    match state.system.process_request(&params.query).await {
        Ok(annotation) => {
            let result = match &annotation.payload {
                Payload::Table(frame) => match serde_json::to_value(frame.to_records()) {
                    Ok(value) => value,
                    Err(e) => {
                        return error_response(&params.query, TributaryError::Serialization(e))
                    }
                },
                Payload::Text(answer) => serde_json::json!({ "answer": answer.text.clone() }),
            };

            (
                StatusCode::OK,
                Json(QueryResponse {
                    query: params.query,
                    source: annotation.source,
                    result,
                    status: "success".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => error_response(&params.query, e),
    }
}

/// GET /annotations - List the stored annotations.
pub async fn list_annotations_handler(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let annotations: Vec<AnnotationSummary> = state
        .system
        .store()
        .snapshot()
        .into_iter()
        .map(|a| AnnotationSummary {
            id: a.id.to_string(),
            source: a.source.clone(),
            query: a.query.clone(),
            kind: a.payload.kind().to_string(),
            rows: match &a.payload {
                Payload::Table(frame) => Some(frame.num_rows()),
                Payload::Text(_) => None,
            },
            created_at: a.created_at,
            age_secs: a.age().num_seconds(),
        })
        .collect();

    let total = annotations.len();
    (StatusCode::OK, Json(AnnotationsResponse { annotations, total }))
}

/// DELETE /annotations?older_than=secs - Prune annotations by age.
pub async fn prune_annotations_handler(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<PruneParams>,
) -> impl IntoResponse {
    if params.older_than == 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                query: String::new(),
                status: "error".to_string(),
                message: "older_than must be a positive number of seconds".to_string(),
                code: "invalid_argument".to_string(),
            }),
        )
            .into_response();
    }

    let removed = state.system.remove_annotations_older_than(params.older_than);
    (
        StatusCode::OK,
        Json(PruneResponse {
            removed,
            older_than_secs: params.older_than,
        }),
    )
        .into_response()
}

/// GET /stats - Service statistics.
pub async fn stats_handler(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(StatsResponse {
            annotations: state.system.store().len(),
            dataframe_retrievers: state.system.dataframe_retriever_count(),
            text_retrievers: state.system.text_retriever_count(),
            uptime_seconds: state.started_at.elapsed().as_secs(),
        }),
    )
}

/// Map an error to its HTTP status and structured body.
///
/// "No data" is a normal outcome (404) and is kept distinct from the
/// internal-failure kinds (500). No internals beyond the error message
/// reach the wire.
fn error_response(query: &str, error: TributaryError) -> axum::response::Response {
    let (status, code) = match &error {
        TributaryError::EmptyQuery => (StatusCode::BAD_REQUEST, "empty_query"),
        TributaryError::NoData => (StatusCode::NOT_FOUND, "no_data"),
        TributaryError::Oracle(_) => (StatusCode::INTERNAL_SERVER_ERROR, "oracle_failure"),
        TributaryError::Retriever(_) => (StatusCode::INTERNAL_SERVER_ERROR, "retriever_failure"),
        TributaryError::Frame(_) => (StatusCode::INTERNAL_SERVER_ERROR, "join_failure"),
        TributaryError::Timeout(_) => (StatusCode::INTERNAL_SERVER_ERROR, "timeout"),
        TributaryError::Serialization(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "serialization_failure")
        }
        TributaryError::Config(_) | TributaryError::Io(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "internal")
        }
    };

    (
        status,
        Json(ErrorResponse {
            query: query.to_string(),
            status: "error".to_string(),
            message: error.to_string(),
            code: code.to_string(),
        }),
    )
        .into_response()
}
