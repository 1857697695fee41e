//! Product search routes

use axum::{extract::DefaultBodyLimit, Router};
use domain_product_search::handlers;
use tower_http::limit::RequestBodyLimitLayer;

use crate::state::AppState;

/// Create product search router
///
/// Uploads and batch bodies are capped at `MAX_UPLOAD_BYTES`.
pub fn router(state: &AppState) -> Router {
    handlers::router(state.service.clone())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.config.max_upload_bytes))
}
