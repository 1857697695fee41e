use core_config::{ConfigError, FromEnv, env_optional, env_or_default, env_parse_or};

use crate::models::Modality;

const DEFAULT_URL: &str = "http://localhost:6334";
const DEFAULT_IMAGE_COLLECTION: &str = "product-image-index";
const DEFAULT_TEXT_COLLECTION: &str = "product-text-index";

/// Qdrant connection configuration
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub image_collection: String,
    pub text_collection: String,
}

impl QdrantConfig {
    pub fn new(url: String) -> Self {
        Self {
            url,
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn collection_name(&self, modality: Modality) -> &str {
        match modality {
            Modality::Image => &self.image_collection,
            Modality::Text => &self.text_collection,
        }
    }
}

impl FromEnv for QdrantConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            url: env_or_default("QDRANT_URL", DEFAULT_URL),
            api_key: env_optional("QDRANT_API_KEY"),
            timeout_secs: env_parse_or("QDRANT_TIMEOUT_SECS", 30u64)?,
            image_collection: env_or_default("QDRANT_IMAGE_COLLECTION", DEFAULT_IMAGE_COLLECTION),
            text_collection: env_or_default("QDRANT_TEXT_COLLECTION", DEFAULT_TEXT_COLLECTION),
        };

        if config.image_collection == config.text_collection {
            return Err(ConfigError::InvalidValue {
                key: "QDRANT_TEXT_COLLECTION".to_string(),
                details: "image and text collections must differ".to_string(),
            });
        }

        Ok(config)
    }
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            api_key: None,
            timeout_secs: 30,
            image_collection: DEFAULT_IMAGE_COLLECTION.to_string(),
            text_collection: DEFAULT_TEXT_COLLECTION.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        temp_env::with_vars(
            [
                ("QDRANT_URL", None::<&str>),
                ("QDRANT_API_KEY", None),
                ("QDRANT_TIMEOUT_SECS", None),
                ("QDRANT_IMAGE_COLLECTION", None),
                ("QDRANT_TEXT_COLLECTION", None),
            ],
            || {
                let config = QdrantConfig::from_env().unwrap();
                assert_eq!(config.url, "http://localhost:6334");
                assert_eq!(config.timeout_secs, 30);
                assert_eq!(config.collection_name(Modality::Image), "product-image-index");
                assert_eq!(config.collection_name(Modality::Text), "product-text-index");
            },
        );
    }

    #[test]
    fn test_collections_must_differ() {
        temp_env::with_vars(
            [
                ("QDRANT_IMAGE_COLLECTION", Some("products")),
                ("QDRANT_TEXT_COLLECTION", Some("products")),
            ],
            || {
                assert!(QdrantConfig::from_env().is_err());
            },
        );
    }

    #[test]
    fn test_builder() {
        let config = QdrantConfig::new("http://qdrant:6334".to_string())
            .with_api_key("k".to_string())
            .with_timeout(5);
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.image_collection, "product-image-index");
    }
}
