//! In-process CLIP ViT-B/32 image embeddings via fastembed (ONNX Runtime).
//!
//! Model files are downloaded on first use into the cache directory.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_optional};
use fastembed::{ImageEmbedding, ImageEmbeddingModel, ImageInitOptions};
use tracing::{debug, info};

use super::{ImageEmbedder, ProductImage};
use crate::error::{SearchError, SearchResult};

#[derive(Debug, Clone, Default)]
pub struct ImageModelConfig {
    pub cache_dir: Option<PathBuf>,
}

impl FromEnv for ImageModelConfig {
    /// - IMAGE_MODEL_CACHE_DIR: optional, fastembed's default cache otherwise
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            cache_dir: env_optional("IMAGE_MODEL_CACHE_DIR").map(PathBuf::from),
        })
    }
}

pub struct ClipImageEmbedder {
    model: Arc<ImageEmbedding>,
}

impl ClipImageEmbedder {
    /// Loads the model; blocking, call before the server starts.
    pub fn new(config: ImageModelConfig) -> SearchResult<Self> {
        let mut options =
            ImageInitOptions::new(ImageEmbeddingModel::ClipVitB32).with_show_download_progress(false);
        if let Some(dir) = config.cache_dir {
            options = options.with_cache_dir(dir);
        }

        let model = ImageEmbedding::try_new(options)
            .map_err(|e| SearchError::Config(format!("Failed to load CLIP model: {}", e)))?;

        info!("Loaded image embedding model: clip-ViT-B-32");
        Ok(Self {
            model: Arc::new(model),
        })
    }
}

#[async_trait]
impl ImageEmbedder for ClipImageEmbedder {
    async fn embed_image(&self, image: &ProductImage) -> SearchResult<Vec<f32>> {
        let png = image.to_png()?;
        let model = Arc::clone(&self.model);

        let embedding = tokio::task::spawn_blocking(move || {
            model
                .embed_bytes(&[png.as_slice()], None)
                .map_err(|e| SearchError::Embedding(format!("Image embedding failed: {}", e)))?
                .pop()
                .ok_or_else(|| SearchError::Embedding("No image embedding returned".to_string()))
        })
        .await
        .map_err(|e| SearchError::Internal(format!("Image embedding task failed: {}", e)))??;

        debug!(dimension = embedding.len(), "Generated image embedding");
        Ok(l2_normalize(embedding))
    }
}

/// Scales `vector` to unit length; the zero vector is returned unchanged.
pub fn l2_normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
    vector
}
