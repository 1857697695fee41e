use async_trait::async_trait;

use crate::error::SearchResult;
use crate::models::{EmbeddingRecord, MetadataFilter, Modality, ScoredResult};

/// Storage for product embeddings, one collection per [`Modality`].
///
/// Implementations own the similarity metric (cosine) and report scores on a
/// 0-100 scale, ordered best first.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorRepository: Send + Sync {
    /// Create the modality's collection if it does not exist yet.
    async fn ensure_collection(&self, modality: Modality) -> SearchResult<()>;

    /// Insert or replace one record in its modality's collection.
    async fn upsert(&self, record: EmbeddingRecord) -> SearchResult<()>;

    /// Top-`top_k` nearest neighbours of `vector`, restricted by `filter`.
    async fn query(
        &self,
        modality: Modality,
        vector: Vec<f32>,
        top_k: u64,
        filter: MetadataFilter,
    ) -> SearchResult<Vec<ScoredResult>>;

    /// Remove every record of a modality.
    async fn clear(&self, modality: Modality) -> SearchResult<()>;

    async fn health_check(&self) -> SearchResult<()>;
}
