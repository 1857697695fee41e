//! Product Search API - image and text similarity search over the product catalogue

use std::sync::Arc;

use axum_helpers::server::{create_production_app, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_product_search::{
    ClipImageEmbedder, GeminiEmbedder, HttpImageFetcher, ProductSearchService, QdrantRepository,
    TextEmbedder, VertexAIEmbedder,
};
use tracing::info;

mod api;
mod config;
mod openapi;
mod state;

use config::{Config, TextEmbeddingConfig};
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    let text_embedder: Arc<dyn TextEmbedder> = match &config.text_embedding {
        TextEmbeddingConfig::Gemini(gemini) => Arc::new(GeminiEmbedder::new(gemini.clone())),
        TextEmbeddingConfig::VertexAI(vertex) => Arc::new(VertexAIEmbedder::new(vertex.clone())),
    };
    info!(provider = %config.text_embedding.provider(), "Text embedding provider configured");

    // Model load reads (and on first run downloads) the ONNX files.
    info!("Loading CLIP image model");
    let image_model = config.image_model.clone();
    let image_embedder =
        tokio::task::spawn_blocking(move || ClipImageEmbedder::new(image_model)).await??;
    info!("CLIP image model loaded");

    let image_source = HttpImageFetcher::new(config.image_fetcher.clone())?;

    info!("Connecting to Qdrant at {}", config.qdrant.url);
    let repository = QdrantRepository::new(config.qdrant.clone())?;

    let service = ProductSearchService::new(
        repository,
        Arc::new(image_embedder),
        text_embedder,
        Arc::new(image_source),
    );
    service.ensure_collections().await?;
    info!(
        image_collection = %config.qdrant.image_collection,
        text_collection = %config.qdrant.text_collection,
        "Vector collections ready"
    );

    // Initialize the application state
    let state = AppState {
        config: config.clone(),
        service: Arc::new(service),
    };

    // Build REST router
    let api_routes = api::routes(&state);
    let router = axum_helpers::create_router::<openapi::ApiDoc>(api_routes).await?;
    let app = router
        .merge(health_router(state.config.app))
        .merge(api::health::router(state.clone()));

    info!(
        "Starting Product Search API on port {}",
        state.config.server.port
    );

    let server_config = state.config.server.clone();
    create_production_app(app, &server_config, async move {
        info!("Shutting down: releasing search service");
        drop(state);
    })
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Product Search API shutdown complete");
    Ok(())
}
