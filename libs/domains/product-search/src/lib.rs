//! Product Search Domain Library
//!
//! Image and text similarity search for an e-commerce catalogue. Each product
//! is stored twice: a CLIP image embedding and a text embedding of its
//! description, each in its own Qdrant collection.
//!
//! # Architecture
//!
//! ```text
//! ProductSearchService        ingestion, search, recommendations
//!   ├── VectorRepository      QdrantRepository
//!   ├── ImageEmbedder         ClipImageEmbedder (fastembed, in-process)
//!   ├── TextEmbedder          GeminiEmbedder | VertexAIEmbedder
//!   └── ImageSource           HttpImageFetcher
//! ```
//!
//! Recommendation results from the image and text branches are merged with
//! [`ranking::deduplicate_and_rank`].

pub mod embedding;
pub mod error;
pub mod handlers;
pub mod models;
pub mod qdrant;
pub mod ranking;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use embedding::{
    ClipImageEmbedder, GeminiConfig, GeminiEmbedder, HttpImageFetcher, ImageEmbedder,
    ImageFetcherConfig, ImageModelConfig, ImageSource, ProductImage, TextEmbedder,
    TextEmbeddingProvider, VertexAIConfig, VertexAIEmbedder,
};
pub use error::{SearchError, SearchResult};
pub use handlers::ApiDoc;
pub use models::*;
pub use qdrant::{QdrantConfig, QdrantRepository};
pub use ranking::deduplicate_and_rank;
pub use repository::VectorRepository;
pub use service::{BranchOutcome, ProductSearchService};
