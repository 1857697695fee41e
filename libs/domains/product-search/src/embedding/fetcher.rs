use std::time::Duration;

use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_parse_or};
use reqwest::Client;
use tracing::debug;

use super::{ImageSource, ProductImage};
use crate::error::{SearchError, SearchResult};

#[derive(Debug, Clone)]
pub struct ImageFetcherConfig {
    pub timeout: Duration,
}

impl Default for ImageFetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

impl FromEnv for ImageFetcherConfig {
    /// - IMAGE_FETCH_TIMEOUT_SECS: defaults to 10
    fn from_env() -> Result<Self, ConfigError> {
        let secs = env_parse_or("IMAGE_FETCH_TIMEOUT_SECS", 10u64)?;
        Ok(Self {
            timeout: Duration::from_secs(secs),
        })
    }
}

/// Downloads product images over HTTP(S).
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    pub fn new(config: ImageFetcherConfig) -> SearchResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SearchError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ImageSource for HttpImageFetcher {
    async fn fetch_image(&self, url: &str) -> SearchResult<ProductImage> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SearchError::ImageFetch(format!("{}: {}", url, e)))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SearchError::ImageFetch(format!("{}: {}", url, e)))?;

        let image = ProductImage::decode(&bytes)?;
        debug!(url, width = image.width(), height = image.height(), "Fetched image");

        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        temp_env::with_var("IMAGE_FETCH_TIMEOUT_SECS", Some("3"), || {
            let config = ImageFetcherConfig::from_env().unwrap();
            assert_eq!(config.timeout, Duration::from_secs(3));
        });
        temp_env::with_var_unset("IMAGE_FETCH_TIMEOUT_SECS", || {
            let config = ImageFetcherConfig::from_env().unwrap();
            assert_eq!(config.timeout, Duration::from_secs(10));
        });
    }

    #[tokio::test]
    async fn test_invalid_url_is_fetch_error() {
        let fetcher = HttpImageFetcher::new(ImageFetcherConfig::default()).unwrap();
        let err = fetcher.fetch_image("not a url").await.unwrap_err();
        assert!(matches!(err, SearchError::ImageFetch(_)));
    }
}
