use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;

use crate::models::Modality;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Failed to fetch image: {0}")]
    ImageFetch(String),

    #[error("Invalid image: {0}")]
    ImageDecode(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Embedding dimension {actual} does not match {expected} for {modality} index")]
    DimensionMismatch {
        modality: Modality,
        expected: usize,
        actual: usize,
    },

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type SearchResult<T> = Result<T, SearchError>;

impl From<qdrant_client::QdrantError> for SearchError {
    fn from(err: qdrant_client::QdrantError) -> Self {
        SearchError::VectorStore(err.to_string())
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::Embedding(err.to_string())
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::Internal(format!("JSON error: {}", err))
    }
}

impl From<image::ImageError> for SearchError {
    fn from(err: image::ImageError) -> Self {
        SearchError::ImageDecode(err.to_string())
    }
}

impl From<validator::ValidationErrors> for SearchError {
    fn from(err: validator::ValidationErrors) -> Self {
        SearchError::Validation(err.to_string())
    }
}

/// Convert SearchError to AppError for standardized HTTP error responses
impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Validation(msg) => AppError::BadRequest(msg),
            err @ (SearchError::ImageFetch(_) | SearchError::ImageDecode(_)) => {
                AppError::BadRequest(err.to_string())
            }
            SearchError::NotFound(msg) => AppError::NotFound(msg),
            err @ SearchError::DimensionMismatch { .. } => {
                AppError::UnprocessableEntity(err.to_string())
            }
            err @ (SearchError::Embedding(_) | SearchError::VectorStore(_)) => {
                AppError::BadGateway(err.to_string())
            }
            err @ (SearchError::Config(_) | SearchError::Internal(_)) => {
                AppError::InternalServerError(err.to_string())
            }
        }
    }
}

impl IntoResponse for SearchError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (SearchError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (SearchError::ImageFetch("x".into()), StatusCode::BAD_REQUEST),
            (SearchError::ImageDecode("x".into()), StatusCode::BAD_REQUEST),
            (SearchError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                SearchError::DimensionMismatch {
                    modality: Modality::Text,
                    expected: 768,
                    actual: 3,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (SearchError::Embedding("x".into()), StatusCode::BAD_GATEWAY),
            (SearchError::VectorStore("x".into()), StatusCode::BAD_GATEWAY),
            (SearchError::Config("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (SearchError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn test_dimension_mismatch_message() {
        let err = SearchError::DimensionMismatch {
            modality: Modality::Image,
            expected: 512,
            actual: 384,
        };
        assert_eq!(
            err.to_string(),
            "Embedding dimension 384 does not match 512 for image index"
        );
    }

    #[test]
    fn test_validation_message_passes_through() {
        let app: AppError = SearchError::Validation("Query cannot be empty.".into()).into();
        assert!(matches!(app, AppError::BadRequest(msg) if msg == "Query cannot be empty."));
    }
}
