//! Application state management

use std::sync::Arc;

use domain_product_search::{ProductSearchService, QdrantRepository};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: crate::config::Config,
    pub service: Arc<ProductSearchService<QdrantRepository>>,
}
