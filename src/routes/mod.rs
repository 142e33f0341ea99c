use std::sync::Arc;

use axum::{http::StatusCode, middleware, routing::get, Json, Router};
use reqwest::Client as HttpClient;
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, request_id_middleware};
use crate::services::CatalogProvider;

pub mod images;
pub mod movies;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogProvider>,
    pub http_client: HttpClient,
    /// Image CDN base; the proxy appends `/original/{path}`
    pub image_base_url: String,
}

impl AppState {
    pub fn new(catalog: Arc<dyn CatalogProvider>, image_base_url: impl Into<String>) -> Self {
        Self {
            catalog,
            http_client: HttpClient::new(),
            image_base_url: image_base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/image-proxy/*path", get(images::proxy))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/movies/discover", get(movies::discover))
        .route("/movies/search", get(movies::search))
        .route("/movies/random", get(movies::random))
        .route("/movies/:id", get(movies::details))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
