//! Vertex AI text embeddings (`:predict` on a Google publisher model)
//!
//! Supports authentication via:
//! - An explicit access token (GOOGLE_ACCESS_TOKEN), for local development
//! - The GCE/GKE metadata server (Workload Identity)

use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_optional, env_or_default};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::gemini::DEFAULT_TEXT_MODEL;
use super::provider::ensure_not_blank;
use super::{TextEmbedder, TextEmbeddingProvider};
use crate::error::{SearchError, SearchResult};

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

#[derive(Debug, Clone)]
pub struct VertexAIConfig {
    /// GCP Project ID
    pub project_id: String,
    /// GCP Region (e.g., "us-central1")
    pub location: String,
    pub model: String,
    /// Falls back to the metadata server when absent.
    pub access_token: Option<String>,
}

impl VertexAIConfig {
    pub fn new(project_id: String, location: String) -> Self {
        Self {
            project_id,
            location,
            model: DEFAULT_TEXT_MODEL.to_string(),
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, token: String) -> Self {
        self.access_token = Some(token);
        self
    }

    fn endpoint_url(&self) -> String {
        format!(
            "https://{}-aiplatform.googleapis.com/v1/projects/{}/locations/{}/publishers/google/models/{}:predict",
            self.location, self.project_id, self.location, self.model
        )
    }
}

impl FromEnv for VertexAIConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let project_id = env_optional("GOOGLE_CLOUD_PROJECT")
            .or_else(|| env_optional("GCP_PROJECT_ID"))
            .ok_or_else(|| ConfigError::MissingEnvVar("GOOGLE_CLOUD_PROJECT".to_string()))?;

        Ok(Self {
            project_id,
            location: env_or_default("VERTEX_AI_LOCATION", "us-central1"),
            model: env_or_default("TEXT_EMBEDDING_MODEL", DEFAULT_TEXT_MODEL),
            access_token: env_optional("GOOGLE_ACCESS_TOKEN"),
        })
    }
}

pub struct VertexAIEmbedder {
    client: Client,
    config: VertexAIConfig,
}

impl VertexAIEmbedder {
    pub fn new(config: VertexAIConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn access_token(&self) -> SearchResult<String> {
        if let Some(ref token) = self.config.access_token {
            return Ok(token.clone());
        }

        self.metadata_token().await
    }

    async fn metadata_token(&self) -> SearchResult<String> {
        let response = self
            .client
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| {
                SearchError::Config(format!(
                    "Failed to get access token from metadata server: {}. \
                     Set GOOGLE_ACCESS_TOKEN for local development.",
                    e
                ))
            })?;

        if !response.status().is_success() {
            return Err(SearchError::Config(format!(
                "Metadata server returned {}. Set GOOGLE_ACCESS_TOKEN for local development.",
                response.status()
            )));
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Config(format!("Failed to parse token response: {}", e)))?;

        Ok(token.access_token)
    }
}

// Vertex AI request/response types

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: Vec<TextInstance<'a>>,
}

#[derive(Debug, Serialize)]
struct TextInstance<'a> {
    content: &'a str,
    task_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    embeddings: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[async_trait]
impl TextEmbedder for VertexAIEmbedder {
    fn provider(&self) -> TextEmbeddingProvider {
        TextEmbeddingProvider::VertexAI
    }

    async fn embed_text(&self, text: &str) -> SearchResult<Vec<f32>> {
        ensure_not_blank(text)?;

        let access_token = self.access_token().await?;
        let request = PredictRequest {
            instances: vec![TextInstance {
                content: text,
                task_type: "RETRIEVAL_DOCUMENT",
            }],
        };

        let response = self
            .client
            .post(self.config.endpoint_url())
            .bearer_auth(access_token)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SearchError::Embedding(format!(
                "Vertex AI API error ({}): {}",
                status, error_text
            )));
        }

        let body: PredictResponse = response.json().await?;
        let values = body
            .predictions
            .into_iter()
            .next()
            .map(|p| p.embeddings.values)
            .ok_or_else(|| SearchError::Embedding("No embedding returned".to_string()))?;

        debug!(dimension = values.len(), "Generated text embedding");
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url() {
        let config = VertexAIConfig::new("my-project".to_string(), "us-central1".to_string());
        let expected = "https://us-central1-aiplatform.googleapis.com/v1/projects/my-project/locations/us-central1/publishers/google/models/text-embedding-004:predict";
        assert_eq!(config.endpoint_url(), expected);
    }

    #[test]
    fn test_response_parsing() {
        let body: PredictResponse = serde_json::from_str(
            r#"{"predictions": [{"embeddings": {"values": [0.5, 0.25], "statistics": {"token_count": 2}}}]}"#,
        )
        .unwrap();
        assert_eq!(body.predictions[0].embeddings.values, vec![0.5, 0.25]);
    }

    #[test]
    fn test_config_project_fallback() {
        temp_env::with_vars(
            [
                ("GOOGLE_CLOUD_PROJECT", None),
                ("GCP_PROJECT_ID", Some("fallback-project")),
                ("VERTEX_AI_LOCATION", Some("europe-west4")),
                ("GOOGLE_ACCESS_TOKEN", None),
            ],
            || {
                let config = VertexAIConfig::from_env().unwrap();
                assert_eq!(config.project_id, "fallback-project");
                assert_eq!(config.location, "europe-west4");
                assert!(config.access_token.is_none());
            },
        );
    }

    #[test]
    fn test_config_requires_project() {
        temp_env::with_vars(
            [("GOOGLE_CLOUD_PROJECT", None::<&str>), ("GCP_PROJECT_ID", None)],
            || {
                let err = VertexAIConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("GOOGLE_CLOUD_PROJECT"));
            },
        );
    }

    #[tokio::test]
    async fn test_blank_text_rejected_before_auth() {
        let embedder = VertexAIEmbedder::new(VertexAIConfig::new(
            "p".to_string(),
            "us-central1".to_string(),
        ));

        let err = embedder.embed_text("").await.unwrap_err();
        assert!(matches!(err, SearchError::Validation(_)));
    }
}
