//! REST API router and configuration.

use std::sync::Arc;

use axum::{
    http::{header, Method},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::api::handlers::{
    list_annotations_handler, prune_annotations_handler, query_handler, stats_handler, ApiState,
};
use crate::config::StoreConfig;
use crate::system::DataSystem;

/// REST API configuration.
#[derive(Debug, Clone)]
pub struct RestApiConfig {
    /// Enable CORS.
    pub enable_cors: bool,
    /// API prefix (e.g., "/api/v1").
    pub prefix: String,
}

impl Default for RestApiConfig {
    fn default() -> Self {
        Self {
            enable_cors: true,
            prefix: "/api/v1".to_string(),
        }
    }
}

/// Create the REST API router.
///
/// Endpoints:
/// - GET    /api/v1/query?query=...        - Answer a natural-language query
/// - GET    /api/v1/annotations            - List stored annotations
/// - DELETE /api/v1/annotations?older_than - Prune annotations by age
/// - GET    /api/v1/stats                  - Service statistics
pub fn create_rest_router(
    system: Arc<DataSystem>,
    store: &StoreConfig,
    config: &RestApiConfig,
) -> Router {
    let state = Arc::new(ApiState::new(system, store));

    let api_routes = Router::new()
        .route("/query", get(query_handler))
        .route(
            "/annotations",
            get(list_annotations_handler).delete(prune_annotations_handler),
        )
        .route("/stats", get(stats_handler))
        .with_state(state);

    let router = Router::new()
        .nest(&config.prefix, api_routes)
        .route("/api", get(api_info_handler));

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_origin(Any);

        router.layer(cors)
    } else {
        router
    }
}

/// API info handler.
async fn api_info_handler() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "Tributary REST API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Natural-language queries routed across registered data sources",
        "endpoints": {
            "query": {
                "method": "GET",
                "path": "/api/v1/query",
                "params": { "query": "Natural-language query (required, non-empty)" }
            },
            "annotations": {
                "method": "GET",
                "path": "/api/v1/annotations",
                "description": "List stored retrieval results"
            },
            "prune": {
                "method": "DELETE",
                "path": "/api/v1/annotations",
                "params": { "older_than": "Remove results older than this many seconds" }
            },
            "stats": {
                "method": "GET",
                "path": "/api/v1/stats",
                "description": "Service statistics"
            }
        }
    }))
}
