use bytes::Bytes;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{SearchError, SearchResult};

/// Output length of the CLIP ViT-B/32 image model.
pub const IMAGE_EMBEDDING_DIM: usize = 512;
/// Output length of `text-embedding-004`.
pub const TEXT_EMBEDDING_DIM: usize = 768;

pub const DEFAULT_TOP_K: u64 = 10;
pub const MAX_TOP_K: u64 = 100;

/// Which embedding space a vector lives in. Each modality has its own collection.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Modality {
    Image,
    Text,
}

impl Modality {
    pub const ALL: [Modality; 2] = [Modality::Image, Modality::Text];

    /// Required vector length for this modality.
    pub fn dimension(self) -> usize {
        match self {
            Modality::Image => IMAGE_EMBEDDING_DIM,
            Modality::Text => TEXT_EMBEDDING_DIM,
        }
    }

    /// Suffix appended to the product id in record identifiers.
    pub fn suffix(self) -> &'static str {
        match self {
            Modality::Image => "img",
            Modality::Text => "txt",
        }
    }

    /// Rejects vectors whose length does not match [`Modality::dimension`].
    pub fn check_dimension(self, vector: &[f32]) -> SearchResult<()> {
        let expected = self.dimension();
        if vector.len() != expected {
            return Err(SearchError::DimensionMismatch {
                modality: self,
                expected,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

// ===== Ingestion =====

/// A product submitted for embedding.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct EmbedProductRequest {
    #[serde(rename = "imageUrl")]
    #[validate(url(message = "imageUrl must be a valid URL"))]
    #[schema(example = "https://cdn.example.com/shoes/red-runner.jpg")]
    pub image_url: String,

    #[validate(length(min = 1, message = "name cannot be empty"))]
    #[schema(example = "Red Runner")]
    pub name: String,

    #[schema(example = "Lightweight running shoe with breathable mesh")]
    pub description: String,

    #[schema(example = "Footwear")]
    pub category: String,

    #[serde(default)]
    pub brand: Option<String>,

    #[serde(default)]
    pub price: Option<f64>,

    /// Derived from the name when absent.
    #[serde(default, rename = "productId")]
    pub product_id: Option<String>,
}

/// Non-blank explicit id, otherwise the name lower-cased with spaces as underscores.
pub fn derive_product_id(explicit: Option<&str>, name: &str) -> String {
    match explicit.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => name.to_lowercase().replace(' ', "_"),
    }
}

impl EmbedProductRequest {
    /// Caller-supplied id, or the name lower-cased with spaces replaced by underscores.
    pub fn resolved_product_id(&self) -> String {
        derive_product_id(self.product_id.as_deref(), &self.name)
    }

    /// Text that is embedded for the text collection.
    pub fn embedding_text(&self) -> String {
        let brand = self.brand.as_deref().unwrap_or("N/A");
        let price = self
            .price
            .map(|p| format!("{:?}", p))
            .unwrap_or_else(|| "N/A".to_string());

        format!(
            "{}. {}. Category: {}. Brand: {}. Price {}.",
            self.name, self.description, self.category, brand, price
        )
    }

    pub fn metadata(&self) -> ProductMetadata {
        ProductMetadata {
            product_id: self.resolved_product_id(),
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            brand: self.brand.clone(),
            price: self.price,
        }
    }
}

/// Product attributes stored alongside both embeddings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductMetadata {
    pub product_id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub brand: Option<String>,
    pub price: Option<f64>,
}

/// One vector as written to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    /// `{modality}-{product_id}_{img|txt}`
    pub id: String,
    pub modality: Modality,
    pub vector: Vec<f32>,
    /// Product attributes plus the `type` discriminator.
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl EmbeddingRecord {
    pub fn new(
        modality: Modality,
        vector: Vec<f32>,
        metadata: &ProductMetadata,
    ) -> SearchResult<Self> {
        let mut payload = match serde_json::to_value(metadata)? {
            serde_json::Value::Object(map) => map,
            other => {
                return Err(SearchError::Internal(format!(
                    "metadata serialized to non-object: {other}"
                )));
            }
        };
        payload.insert(
            "type".to_string(),
            serde_json::Value::String(modality.to_string()),
        );

        Ok(Self {
            id: Self::record_id(modality, &metadata.product_id),
            modality,
            vector,
            metadata: payload,
        })
    }

    pub fn record_id(modality: Modality, product_id: &str) -> String {
        format!("{}-{}_{}", modality, product_id, modality.suffix())
    }
}

/// Successful single-product ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EmbedProductData {
    pub product_id: String,
    pub stored_types: Vec<Modality>,
    pub metadata: ProductMetadata,
}

/// Response for `POST /embed-product`. `data` is absent on failure.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EmbedProductResponse {
    pub status: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<EmbedProductData>,
}

impl EmbedProductResponse {
    pub fn success(data: EmbedProductData) -> Self {
        Self {
            status: true,
            message: "Product embeddings created and stored successfully.".to_string(),
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: false,
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BatchSummary {
    pub processed: usize,
    pub success_count: usize,
    pub failed_count: usize,
}

/// A batch entry that could not be ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BatchFailure {
    /// Position in the submitted array.
    pub index: usize,
    pub product_id: String,
    pub name: String,
    pub error: String,
}

/// Response for `POST /embed-products`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct BatchEmbedResponse {
    pub status: bool,
    pub summary: BatchSummary,
    pub success: Vec<EmbedProductData>,
    pub failed: Vec<BatchFailure>,
}

// ===== Queries =====

/// One nearest-neighbour hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ScoredResult {
    pub product_id: String,
    /// Similarity scaled to 0-100, two decimals.
    #[schema(example = 87.42)]
    pub score: f64,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
}

/// Equality predicate on a payload field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCondition {
    pub field: String,
    pub op: FilterOp,
    pub value: String,
}

/// Conjunction of payload predicates applied to a vector query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFilter {
    pub conditions: Vec<FieldCondition>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.conditions.push(FieldCondition {
            field: field.into(),
            op: FilterOp::Eq,
            value: value.into(),
        });
        self
    }

    pub fn ne(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.conditions.push(FieldCondition {
            field: field.into(),
            op: FilterOp::Ne,
            value: value.into(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// An uploaded file part.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Bytes,
}

impl UploadedFile {
    /// Browsers submit an empty, unnamed part when no file was chosen.
    pub fn is_present(&self) -> bool {
        !self.filename.trim().is_empty() && !self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImageQueryType {
    File,
    Url,
}

/// Source image of an image search.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageQuery {
    Upload(UploadedFile),
    Url(String),
}

impl ImageQuery {
    /// The uploaded file takes priority over the URL.
    pub fn resolve(file: Option<UploadedFile>, image_url: Option<String>) -> SearchResult<Self> {
        if let Some(file) = file.filter(UploadedFile::is_present) {
            return Ok(ImageQuery::Upload(file));
        }

        match image_url.filter(|url| !url.trim().is_empty()) {
            Some(url) => Ok(ImageQuery::Url(url)),
            None => Err(SearchError::Validation(
                "Please provide either image_url or file.".to_string(),
            )),
        }
    }

    pub fn query_type(&self) -> ImageQueryType {
        match self {
            ImageQuery::Upload(_) => ImageQueryType::File,
            ImageQuery::Url(_) => ImageQueryType::Url,
        }
    }
}

/// Form fields of `POST /image-search`.
#[derive(Debug, Clone, ToSchema)]
pub struct ImageSearchForm {
    pub image_url: Option<String>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub file: Option<UploadedFile>,
    #[schema(default = 10, minimum = 1, maximum = 100)]
    pub top_k: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImageSearchResponse {
    pub status: bool,
    pub query_type: ImageQueryType,
    pub count: usize,
    pub results: Vec<ScoredResult>,
}

/// Form fields of `POST /text-search`.
#[derive(Debug, Clone, ToSchema)]
pub struct TextSearchForm {
    #[schema(example = "red running shoes")]
    pub query: String,
    #[schema(default = 10, minimum = 1, maximum = 100)]
    pub top_k: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TextSearchResponse {
    pub status: bool,
    pub query: String,
    pub count: usize,
    pub results: Vec<ScoredResult>,
}

/// Which query branches a recommendation request runs.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RecommendationMode {
    Image,
    Text,
    #[default]
    Hybrid,
}

impl RecommendationMode {
    pub fn includes_image(self) -> bool {
        matches!(self, RecommendationMode::Image | RecommendationMode::Hybrid)
    }

    pub fn includes_text(self) -> bool {
        matches!(self, RecommendationMode::Text | RecommendationMode::Hybrid)
    }
}

/// Form fields of `POST /recommendations`.
#[derive(Debug, Clone, PartialEq, ToSchema)]
pub struct RecommendationRequest {
    /// Excluded from its own recommendations.
    pub product_id: String,
    pub product_name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[schema(default = "hybrid")]
    pub mode: RecommendationMode,
    #[schema(default = 10, minimum = 1, maximum = 100)]
    pub top_k: u64,
}

impl RecommendationRequest {
    pub fn new(product_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: None,
            description: None,
            image_url: None,
            mode: RecommendationMode::default(),
            top_k: DEFAULT_TOP_K,
        }
    }

    /// `"{name}. {description}"`, or `None` when both are absent.
    pub fn text_input(&self) -> Option<String> {
        let name = self.product_name.as_deref().unwrap_or("").trim();
        let description = self.description.as_deref().unwrap_or("").trim();

        if name.is_empty() && description.is_empty() {
            return None;
        }

        Some(format!("{name}. {description}").trim().to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecommendationResponse {
    pub status: bool,
    pub mode: RecommendationMode,
    pub count: usize,
    pub recommendations: Vec<ScoredResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClearIndexResponse {
    pub status: bool,
    pub modality: Modality,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> EmbedProductRequest {
        EmbedProductRequest {
            image_url: "https://cdn.example.com/p.jpg".to_string(),
            name: "Red Runner Shoe".to_string(),
            description: "Light mesh".to_string(),
            category: "Footwear".to_string(),
            brand: Some("Acme".to_string()),
            price: Some(49.99),
            product_id: None,
        }
    }

    #[test]
    fn test_product_id_derived_from_name() {
        assert_eq!(request().resolved_product_id(), "red_runner_shoe");

        let mut req = request();
        req.product_id = Some("sku-42".to_string());
        assert_eq!(req.resolved_product_id(), "sku-42");

        req.product_id = Some("  ".to_string());
        assert_eq!(req.resolved_product_id(), "red_runner_shoe");
    }

    #[test]
    fn test_embedding_text_format() {
        assert_eq!(
            request().embedding_text(),
            "Red Runner Shoe. Light mesh. Category: Footwear. Brand: Acme. Price 49.99."
        );

        let mut req = request();
        req.brand = None;
        req.price = None;
        assert_eq!(
            req.embedding_text(),
            "Red Runner Shoe. Light mesh. Category: Footwear. Brand: N/A. Price N/A."
        );
    }

    #[test]
    fn test_embedding_text_keeps_decimal_on_whole_prices() {
        let mut req = request();
        req.price = Some(49.0);
        assert!(req.embedding_text().ends_with("Price 49.0."));

        req.price = Some(120.5);
        assert!(req.embedding_text().ends_with("Price 120.5."));
    }

    #[test]
    fn test_request_uses_camel_case_keys() {
        let req: EmbedProductRequest = serde_json::from_value(serde_json::json!({
            "imageUrl": "https://cdn.example.com/p.jpg",
            "name": "Mug",
            "description": "Ceramic",
            "category": "Kitchen",
            "productId": "mug-1"
        }))
        .unwrap();

        assert_eq!(req.product_id.as_deref(), Some("mug-1"));
        assert!(req.brand.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_request_validation() {
        let mut req = request();
        req.image_url = "not a url".to_string();
        req.name = String::new();

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("image_url"));
        assert!(fields.contains_key("name"));
    }

    #[test]
    fn test_record_carries_type_and_id() {
        let record = EmbeddingRecord::new(Modality::Text, vec![0.0; 4], &request().metadata())
            .unwrap();

        assert_eq!(record.id, "text-red_runner_shoe_txt");
        assert_eq!(record.metadata["type"], "text");
        assert_eq!(record.metadata["product_id"], "red_runner_shoe");
        assert_eq!(record.metadata["brand"], "Acme");
    }

    #[test]
    fn test_dimension_check() {
        assert!(Modality::Image.check_dimension(&[0.0; 512]).is_ok());
        assert!(Modality::Text.check_dimension(&[0.0; 768]).is_ok());

        let err = Modality::Image.check_dimension(&[0.0; 768]).unwrap_err();
        assert!(matches!(
            err,
            SearchError::DimensionMismatch {
                modality: Modality::Image,
                expected: 512,
                actual: 768
            }
        ));
    }

    #[test]
    fn test_image_query_prefers_file() {
        let file = UploadedFile {
            filename: "shoe.png".to_string(),
            bytes: Bytes::from_static(b"png"),
        };

        let query = ImageQuery::resolve(Some(file), Some("https://x/y.jpg".to_string())).unwrap();
        assert_eq!(query.query_type(), ImageQueryType::File);

        let query = ImageQuery::resolve(None, Some("https://x/y.jpg".to_string())).unwrap();
        assert_eq!(query.query_type(), ImageQueryType::Url);
    }

    #[test]
    fn test_image_query_ignores_empty_upload() {
        let empty = UploadedFile {
            filename: String::new(),
            bytes: Bytes::new(),
        };

        let query = ImageQuery::resolve(Some(empty.clone()), Some("https://x/y.jpg".to_string()))
            .unwrap();
        assert_eq!(query, ImageQuery::Url("https://x/y.jpg".to_string()));

        let err = ImageQuery::resolve(Some(empty), None).unwrap_err();
        assert!(matches!(err, SearchError::Validation(_)));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("image".parse::<RecommendationMode>().unwrap(), RecommendationMode::Image);
        assert_eq!("hybrid".parse::<RecommendationMode>().unwrap(), RecommendationMode::Hybrid);
        assert!("visual".parse::<RecommendationMode>().is_err());
        assert_eq!(RecommendationMode::default(), RecommendationMode::Hybrid);
        assert!(RecommendationMode::Hybrid.includes_image());
        assert!(!RecommendationMode::Text.includes_image());
    }

    #[test]
    fn test_recommendation_text_input() {
        let mut req = RecommendationRequest::new("p1");
        assert_eq!(req.text_input(), None);

        req.product_name = Some("Red Runner".to_string());
        assert_eq!(req.text_input().as_deref(), Some("Red Runner."));

        req.description = Some("Light mesh".to_string());
        assert_eq!(req.text_input().as_deref(), Some("Red Runner. Light mesh"));

        req.product_name = None;
        assert_eq!(req.text_input().as_deref(), Some(". Light mesh"));
    }
}
