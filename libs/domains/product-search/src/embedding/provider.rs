use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::ProductImage;
use crate::error::{SearchError, SearchResult};

/// Remote API used for text embeddings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TextEmbeddingProvider {
    #[default]
    Gemini,
    #[strum(serialize = "vertexai", serialize = "vertex")]
    VertexAI,
}

/// Produces text embeddings for the text collection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    fn provider(&self) -> TextEmbeddingProvider;

    /// Blank input is a validation error.
    async fn embed_text(&self, text: &str) -> SearchResult<Vec<f32>>;
}

/// Produces image embeddings for the image collection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageEmbedder: Send + Sync {
    async fn embed_image(&self, image: &ProductImage) -> SearchResult<Vec<f32>>;
}

/// Loads images referenced by URL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch_image(&self, url: &str) -> SearchResult<ProductImage>;
}

pub(crate) fn ensure_not_blank(text: &str) -> SearchResult<()> {
    if text.trim().is_empty() {
        return Err(SearchError::Validation(
            "Text input cannot be empty for embedding".to_string(),
        ));
    }
    Ok(())
}
