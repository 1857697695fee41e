//! Google Generative Language API (`embedContent`) text embeddings.
//!
//! Authenticates with an API key (`GOOGLE_API_KEY`).

use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_optional, env_or_default, env_required};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::provider::ensure_not_blank;
use super::{TextEmbedder, TextEmbeddingProvider};
use crate::error::{SearchError, SearchResult};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub(crate) const DEFAULT_TEXT_MODEL: &str = "text-embedding-004";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl GeminiConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            model: DEFAULT_TEXT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn endpoint_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:embedContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

impl FromEnv for GeminiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let api_key = env_required("GOOGLE_API_KEY")?;
        let model = env_or_default("TEXT_EMBEDDING_MODEL", DEFAULT_TEXT_MODEL);
        let base_url = env_optional("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into());

        Ok(Self {
            api_key,
            model,
            base_url,
        })
    }
}

pub struct GeminiEmbedder {
    client: Client,
    config: GeminiConfig,
}

impl GeminiEmbedder {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

// Gemini request/response types

#[derive(Debug, Serialize)]
struct EmbedContentRequest<'a> {
    model: String,
    content: Content<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[async_trait]
impl TextEmbedder for GeminiEmbedder {
    fn provider(&self) -> TextEmbeddingProvider {
        TextEmbeddingProvider::Gemini
    }

    async fn embed_text(&self, text: &str) -> SearchResult<Vec<f32>> {
        ensure_not_blank(text)?;

        let request = EmbedContentRequest {
            model: format!("models/{}", self.config.model),
            content: Content {
                parts: vec![Part { text }],
            },
        };

        let response = self
            .client
            .post(self.config.endpoint_url())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SearchError::Embedding(format!(
                "Gemini API error ({}): {}",
                status, error_text
            )));
        }

        let body: EmbedContentResponse = response.json().await?;
        debug!(
            dimension = body.embedding.values.len(),
            "Generated text embedding"
        );

        Ok(body.embedding.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url() {
        let config = GeminiConfig::new("key".to_string());
        assert_eq!(
            config.endpoint_url(),
            "https://generativelanguage.googleapis.com/v1beta/models/text-embedding-004:embedContent"
        );

        let config = config.with_base_url("http://localhost:9000/".to_string());
        assert_eq!(
            config.endpoint_url(),
            "http://localhost:9000/v1beta/models/text-embedding-004:embedContent"
        );
    }

    #[test]
    fn test_request_shape() {
        let request = EmbedContentRequest {
            model: "models/text-embedding-004".to_string(),
            content: Content {
                parts: vec![Part { text: "red shoes" }],
            },
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "model": "models/text-embedding-004",
                "content": {"parts": [{"text": "red shoes"}]}
            })
        );
    }

    #[test]
    fn test_response_parsing() {
        let body: EmbedContentResponse =
            serde_json::from_str(r#"{"embedding": {"values": [0.1, -0.2, 0.3]}}"#).unwrap();
        assert_eq!(body.embedding.values, vec![0.1, -0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_blank_text_rejected_without_request() {
        // Unroutable base URL: reaching the network would fail with Embedding instead.
        let embedder = GeminiEmbedder::new(
            GeminiConfig::new("key".to_string()).with_base_url("http://127.0.0.1:1".to_string()),
        );

        let err = embedder.embed_text("   ").await.unwrap_err();
        assert!(matches!(err, SearchError::Validation(_)));
    }

    #[test]
    fn test_config_from_env() {
        temp_env::with_vars(
            [
                ("GOOGLE_API_KEY", Some("secret")),
                ("TEXT_EMBEDDING_MODEL", None),
                ("GEMINI_BASE_URL", None),
            ],
            || {
                let config = GeminiConfig::from_env().unwrap();
                assert_eq!(config.api_key, "secret");
                assert_eq!(config.model, "text-embedding-004");
                assert_eq!(config.base_url, DEFAULT_BASE_URL);
            },
        );

        temp_env::with_var_unset("GOOGLE_API_KEY", || {
            assert!(GeminiConfig::from_env().is_err());
        });
    }
}
