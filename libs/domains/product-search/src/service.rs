use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::embedding::{ImageEmbedder, ImageSource, ProductImage, TextEmbedder};
use crate::error::{SearchError, SearchResult};
use crate::models::{
    BatchEmbedResponse, BatchFailure, BatchSummary, EmbedProductData, EmbedProductRequest,
    EmbeddingRecord, ImageQuery, MAX_TOP_K, MetadataFilter, Modality, RecommendationRequest,
    ScoredResult, derive_product_id,
};
use crate::ranking::deduplicate_and_rank;
use crate::repository::VectorRepository;

/// Outcome of one recommendation branch.
///
/// A failed branch contributes no results but never fails the request.
#[derive(Debug)]
pub enum BranchOutcome {
    /// The branch was not enabled by the mode or had no input.
    Skipped,
    Results(Vec<ScoredResult>),
    Failed(SearchError),
}

impl BranchOutcome {
    pub fn into_results(self) -> Vec<ScoredResult> {
        match self {
            BranchOutcome::Results(results) => results,
            BranchOutcome::Skipped | BranchOutcome::Failed(_) => Vec::new(),
        }
    }
}

impl From<SearchResult<Vec<ScoredResult>>> for BranchOutcome {
    fn from(result: SearchResult<Vec<ScoredResult>>) -> Self {
        match result {
            Ok(results) => BranchOutcome::Results(results),
            Err(err) => BranchOutcome::Failed(err),
        }
    }
}

/// Ingestion and query orchestration over the embedding clients and the vector store.
///
/// Built once at startup and shared read-only between requests.
pub struct ProductSearchService<R: VectorRepository> {
    repository: R,
    image_embedder: Arc<dyn ImageEmbedder>,
    text_embedder: Arc<dyn TextEmbedder>,
    image_source: Arc<dyn ImageSource>,
}

impl<R: VectorRepository> ProductSearchService<R> {
    pub fn new(
        repository: R,
        image_embedder: Arc<dyn ImageEmbedder>,
        text_embedder: Arc<dyn TextEmbedder>,
        image_source: Arc<dyn ImageSource>,
    ) -> Self {
        Self {
            repository,
            image_embedder,
            text_embedder,
            image_source,
        }
    }

    /// Create any missing collection.
    pub async fn ensure_collections(&self) -> SearchResult<()> {
        for modality in Modality::ALL {
            self.repository.ensure_collection(modality).await?;
        }
        Ok(())
    }

    pub async fn health(&self) -> SearchResult<()> {
        self.repository.health_check().await
    }

    // ===== Ingestion =====

    /// Embeds the product image and description and stores both vectors.
    ///
    /// Not atomic: if the text write fails after the image write succeeded,
    /// the image record stays in place.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn embed_product(&self, input: EmbedProductRequest) -> SearchResult<EmbedProductData> {
        input.validate()?;

        let image = self.image_source.fetch_image(&input.image_url).await?;
        let image_vector = self.embed_image(&image).await?;
        let text_vector = self.embed_text(&input.embedding_text()).await?;

        let metadata = input.metadata();
        self.store(EmbeddingRecord::new(Modality::Image, image_vector, &metadata)?)
            .await?;
        self.store(EmbeddingRecord::new(Modality::Text, text_vector, &metadata)?)
            .await?;

        info!(product_id = %metadata.product_id, "Product embeddings stored");
        Ok(EmbedProductData {
            product_id: metadata.product_id.clone(),
            stored_types: Modality::ALL.to_vec(),
            metadata,
        })
    }

    /// Ingests each product independently; one failure does not stop the batch.
    ///
    /// Records are parsed one by one, so a malformed entry is reported in
    /// `failed` without rejecting the rest.
    #[instrument(skip(self, inputs), fields(count = inputs.len()))]
    pub async fn embed_products(&self, inputs: Vec<Value>) -> BatchEmbedResponse {
        let mut response = BatchEmbedResponse {
            status: true,
            summary: BatchSummary {
                processed: inputs.len(),
                ..BatchSummary::default()
            },
            ..BatchEmbedResponse::default()
        };

        for (index, raw) in inputs.into_iter().enumerate() {
            let (product_id, name) = raw_identity(&raw);

            let outcome = match serde_json::from_value::<EmbedProductRequest>(raw) {
                Ok(input) => self.embed_product(input).await,
                Err(err) => Err(SearchError::Validation(format!(
                    "Invalid product record: {}",
                    err
                ))),
            };

            match outcome {
                Ok(data) => response.success.push(data),
                Err(err) => {
                    warn!(index, %product_id, error = %err, "Product embedding failed");
                    response.failed.push(BatchFailure {
                        index,
                        product_id,
                        name,
                        error: err.to_string(),
                    });
                }
            }
        }

        response.summary.success_count = response.success.len();
        response.summary.failed_count = response.failed.len();
        response
    }

    // ===== Queries =====

    #[instrument(skip(self, query), fields(query_type = ?query.query_type()))]
    pub async fn image_search(
        &self,
        query: ImageQuery,
        top_k: u64,
    ) -> SearchResult<Vec<ScoredResult>> {
        validate_top_k(top_k)?;

        let image = match query {
            ImageQuery::Upload(file) => ProductImage::decode(&file.bytes).map_err(|e| {
                SearchError::ImageDecode(format!("Invalid uploaded image: {}", e))
            })?,
            ImageQuery::Url(url) => self.image_source.fetch_image(&url).await?,
        };

        let vector = self.embed_image(&image).await?;
        self.search(Modality::Image, vector, top_k, MetadataFilter::new())
            .await
    }

    #[instrument(skip(self))]
    pub async fn text_search(&self, query: &str, top_k: u64) -> SearchResult<Vec<ScoredResult>> {
        if query.trim().is_empty() {
            return Err(SearchError::Validation("Query cannot be empty.".to_string()));
        }
        validate_top_k(top_k)?;

        let vector = self.embed_text(query).await?;
        self.search(Modality::Text, vector, top_k, MetadataFilter::new())
            .await
    }

    /// Similar products from the image and/or text collections, excluding the product itself.
    ///
    /// Branches run one after the other. A failing branch is logged and
    /// contributes nothing; if no branch yields results the request is `NotFound`.
    #[instrument(skip(self, request), fields(product_id = %request.product_id, mode = %request.mode, top_k = request.top_k))]
    pub async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> SearchResult<Vec<ScoredResult>> {
        if request.product_id.trim().is_empty() {
            return Err(SearchError::Validation("Product ID is required.".to_string()));
        }
        validate_top_k(request.top_k)?;

        let image_outcome = match request.image_url.as_deref() {
            Some(url) if request.mode.includes_image() => {
                self.image_branch(url, request).await.into()
            }
            _ => BranchOutcome::Skipped,
        };
        if let BranchOutcome::Failed(err) = &image_outcome {
            warn!(error = %err, "Image recommendation failed");
        }

        let text_outcome = match request.text_input() {
            Some(text) if request.mode.includes_text() => {
                self.text_branch(&text, request).await.into()
            }
            _ => BranchOutcome::Skipped,
        };
        if let BranchOutcome::Failed(err) = &text_outcome {
            warn!(error = %err, "Text recommendation failed");
        }

        let mut combined = image_outcome.into_results();
        combined.extend(text_outcome.into_results());

        if combined.is_empty() {
            return Err(SearchError::NotFound("No recommendations found.".to_string()));
        }

        Ok(deduplicate_and_rank(combined))
    }

    /// Drops every vector of one modality.
    #[instrument(skip(self))]
    pub async fn clear_index(&self, modality: Modality) -> SearchResult<()> {
        self.repository.clear(modality).await
    }

    async fn image_branch(
        &self,
        url: &str,
        request: &RecommendationRequest,
    ) -> SearchResult<Vec<ScoredResult>> {
        let image = self.image_source.fetch_image(url).await?;
        let vector = self.embed_image(&image).await?;
        let filter = branch_filter(Modality::Image, &request.product_id);
        self.search(Modality::Image, vector, request.top_k, filter)
            .await
    }

    async fn text_branch(
        &self,
        text: &str,
        request: &RecommendationRequest,
    ) -> SearchResult<Vec<ScoredResult>> {
        let vector = self.embed_text(text).await?;
        let filter = branch_filter(Modality::Text, &request.product_id);
        self.search(Modality::Text, vector, request.top_k, filter)
            .await
    }

    async fn embed_image(&self, image: &ProductImage) -> SearchResult<Vec<f32>> {
        let vector = self.image_embedder.embed_image(image).await?;
        info!(dimension = vector.len(), "Generated image embedding");
        Ok(vector)
    }

    async fn embed_text(&self, text: &str) -> SearchResult<Vec<f32>> {
        let vector = self.text_embedder.embed_text(text).await?;
        info!(
            dimension = vector.len(),
            provider = %self.text_embedder.provider(),
            "Generated text embedding"
        );
        Ok(vector)
    }

    async fn store(&self, record: EmbeddingRecord) -> SearchResult<()> {
        record.modality.check_dimension(&record.vector)?;
        self.repository.upsert(record).await
    }

    async fn search(
        &self,
        modality: Modality,
        vector: Vec<f32>,
        top_k: u64,
        filter: MetadataFilter,
    ) -> SearchResult<Vec<ScoredResult>> {
        modality.check_dimension(&vector)?;
        self.repository.query(modality, vector, top_k, filter).await
    }
}

/// Product id and name of a batch entry, read before it is parsed.
fn raw_identity(raw: &Value) -> (String, String) {
    let name = raw
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let explicit = raw.get("productId").and_then(Value::as_str);
    (derive_product_id(explicit, &name), name)
}

/// Restricts a branch to its own record type and excludes the source product.
fn branch_filter(modality: Modality, product_id: &str) -> MetadataFilter {
    MetadataFilter::new()
        .eq("type", modality.to_string())
        .ne("product_id", product_id)
}

fn validate_top_k(top_k: u64) -> SearchResult<()> {
    if !(1..=MAX_TOP_K).contains(&top_k) {
        return Err(SearchError::Validation(format!(
            "top_k must be between 1 and {}",
            MAX_TOP_K
        )));
    }
    Ok(())
}
