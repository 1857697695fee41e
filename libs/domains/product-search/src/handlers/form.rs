//! Form bodies accepted as either `multipart/form-data` or urlencoded.

use std::collections::HashMap;

use axum::{
    extract::{Form, FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use axum_helpers::AppError;

use crate::models::{
    DEFAULT_TOP_K, ImageSearchForm, RecommendationMode, RecommendationRequest, TextSearchForm,
    UploadedFile,
};

/// Multipart part name carrying the uploaded image.
const FILE_FIELD: &str = "file";

/// Text fields of a form plus the optional `file` upload.
#[derive(Debug, Default)]
pub struct FormPayload {
    pub fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
}

impl FormPayload {
    /// Field value, with blank values treated as absent.
    pub fn text(&self, key: &str) -> Option<String> {
        self.fields
            .get(key)
            .filter(|value| !value.trim().is_empty())
            .cloned()
    }

    pub fn top_k(&self) -> Result<u64, AppError> {
        match self.text("top_k") {
            None => Ok(DEFAULT_TOP_K),
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| AppError::BadRequest(format!("top_k must be an integer, got '{}'", raw))),
        }
    }
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"))
}

impl<S> FromRequest<S> for FormPayload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| AppError::FormExtraction(e.body_text()))?;
            return Ok(Self { fields, file: None });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::FormExtraction(e.body_text()))?;

        let mut payload = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::FormExtraction(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();

            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::FormExtraction(e.body_text()))?;
                    if name == FILE_FIELD {
                        payload.file = Some(UploadedFile { filename, bytes });
                    }
                }
                None => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| AppError::FormExtraction(e.body_text()))?;
                    payload.fields.insert(name, value);
                }
            }
        }

        Ok(payload)
    }
}

impl TryFrom<FormPayload> for ImageSearchForm {
    type Error = AppError;

    fn try_from(form: FormPayload) -> Result<Self, Self::Error> {
        Ok(Self {
            image_url: form.text("image_url"),
            top_k: form.top_k()?,
            file: form.file,
        })
    }
}

impl TryFrom<FormPayload> for TextSearchForm {
    type Error = AppError;

    fn try_from(form: FormPayload) -> Result<Self, Self::Error> {
        Ok(Self {
            query: form.fields.get("query").cloned().unwrap_or_default(),
            top_k: form.top_k()?,
        })
    }
}

impl TryFrom<FormPayload> for RecommendationRequest {
    type Error = AppError;

    fn try_from(form: FormPayload) -> Result<Self, Self::Error> {
        let product_id = form
            .text("product_id")
            .ok_or_else(|| AppError::BadRequest("Product ID is required.".to_string()))?;

        let mode = match form.text("mode") {
            None => RecommendationMode::default(),
            Some(raw) => raw.trim().parse().map_err(|_| {
                AppError::BadRequest(format!(
                    "Invalid mode '{}': expected image, text or hybrid",
                    raw
                ))
            })?,
        };

        Ok(Self {
            product_name: form.text("product_name"),
            description: form.text("description"),
            image_url: form.text("image_url"),
            top_k: form.top_k()?,
            product_id,
            mode,
        })
    }
}
