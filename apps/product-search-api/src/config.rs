//! Configuration for Product Search API

use core_config::{
    app_info, env_or_default, env_parse_or, server::ServerConfig, AppInfo, ConfigError, FromEnv,
};
use domain_product_search::{
    GeminiConfig, ImageFetcherConfig, ImageModelConfig, QdrantConfig, TextEmbeddingProvider,
    VertexAIConfig,
};

pub use core_config::Environment;

/// Request body limit for uploads and batch ingestion (10 MiB).
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Text embedding backend and its settings
#[derive(Clone, Debug)]
pub enum TextEmbeddingConfig {
    Gemini(GeminiConfig),
    VertexAI(VertexAIConfig),
}

impl TextEmbeddingConfig {
    pub fn provider(&self) -> TextEmbeddingProvider {
        match self {
            Self::Gemini(_) => TextEmbeddingProvider::Gemini,
            Self::VertexAI(_) => TextEmbeddingProvider::VertexAI,
        }
    }
}

impl FromEnv for TextEmbeddingConfig {
    /// TEXT_EMBEDDING_PROVIDER selects the backend (gemini by default);
    /// only that backend's variables are read.
    fn from_env() -> Result<Self, ConfigError> {
        let raw = env_or_default("TEXT_EMBEDDING_PROVIDER", "gemini");
        let provider: TextEmbeddingProvider =
            raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "TEXT_EMBEDDING_PROVIDER".to_string(),
                details: format!("unknown provider '{}', expected gemini or vertexai", raw),
            })?;

        match provider {
            TextEmbeddingProvider::Gemini => Ok(Self::Gemini(GeminiConfig::from_env()?)),
            TextEmbeddingProvider::VertexAI => Ok(Self::VertexAI(VertexAIConfig::from_env()?)),
        }
    }
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub server: ServerConfig,
    pub environment: Environment,
    pub qdrant: QdrantConfig,
    pub text_embedding: TextEmbeddingConfig,
    pub image_model: ImageModelConfig,
    pub image_fetcher: ImageFetcherConfig,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let server = ServerConfig::from_env()?;
        let qdrant = QdrantConfig::from_env()?;
        let text_embedding = TextEmbeddingConfig::from_env()?;
        let image_model = ImageModelConfig::from_env()?;
        let image_fetcher = ImageFetcherConfig::from_env()?;
        let max_upload_bytes = env_parse_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;

        Ok(Self {
            app: app_info!(),
            server,
            environment,
            qdrant,
            text_embedding,
            image_model,
            image_fetcher,
            max_upload_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROVIDER_VARS: [&str; 5] = [
        "TEXT_EMBEDDING_PROVIDER",
        "GOOGLE_API_KEY",
        "GOOGLE_CLOUD_PROJECT",
        "GCP_PROJECT_ID",
        "MAX_UPLOAD_BYTES",
    ];

    fn with_env<F: FnOnce()>(overrides: &[(&str, &str)], f: F) {
        let vars: Vec<(&str, Option<&str>)> = PROVIDER_VARS
            .iter()
            .map(|key| {
                let value = overrides.iter().find(|(k, _)| k == key).map(|(_, v)| *v);
                (*key, value)
            })
            .collect();
        temp_env::with_vars(vars, f);
    }

    #[test]
    fn test_defaults_to_gemini() {
        with_env(&[("GOOGLE_API_KEY", "test-key")], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.text_embedding.provider(), TextEmbeddingProvider::Gemini);
            assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        });
    }

    #[test]
    fn test_gemini_requires_api_key() {
        with_env(&[], || {
            let err = Config::from_env().unwrap_err();
            assert!(err.to_string().contains("GOOGLE_API_KEY"));
        });
    }

    #[test]
    fn test_vertexai_provider() {
        with_env(
            &[
                ("TEXT_EMBEDDING_PROVIDER", "vertexai"),
                ("GOOGLE_CLOUD_PROJECT", "catalogue-prod"),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(
                    config.text_embedding.provider(),
                    TextEmbeddingProvider::VertexAI
                );
            },
        );
    }

    #[test]
    fn test_unknown_provider_rejected() {
        with_env(&[("TEXT_EMBEDDING_PROVIDER", "openai")], || {
            let err = Config::from_env().unwrap_err();
            assert!(err.to_string().contains("TEXT_EMBEDDING_PROVIDER"));
        });
    }

    #[test]
    fn test_max_upload_bytes_override() {
        with_env(
            &[("GOOGLE_API_KEY", "test-key"), ("MAX_UPLOAD_BYTES", "1048576")],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.max_upload_bytes, 1024 * 1024);
            },
        );
    }
}
