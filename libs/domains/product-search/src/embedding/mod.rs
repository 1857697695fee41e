mod clip;
mod fetcher;
mod gemini;
mod product_image;
mod provider;
mod vertexai;

pub use clip::{ClipImageEmbedder, ImageModelConfig, l2_normalize};
pub use fetcher::{HttpImageFetcher, ImageFetcherConfig};
pub use gemini::{GeminiConfig, GeminiEmbedder};
pub use product_image::ProductImage;
pub use provider::{ImageEmbedder, ImageSource, TextEmbedder, TextEmbeddingProvider};
pub use vertexai::{VertexAIConfig, VertexAIEmbedder};

#[cfg(test)]
pub use provider::{MockImageEmbedder, MockImageSource, MockTextEmbedder};
