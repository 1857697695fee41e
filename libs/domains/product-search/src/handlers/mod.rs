//! HTTP handlers for the product search API

mod form;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, post},
};
use axum_helpers::{
    AppError, ErrorResponse, ValidatedJson,
    errors::responses::{
        BadGatewayResponse, BadRequestValidationResponse, InternalServerErrorResponse,
        NotFoundResponse, UnprocessableEntityResponse,
    },
};
use serde_json::Value;
use std::sync::Arc;
use utoipa::OpenApi;

pub use form::FormPayload;

use crate::models::{
    BatchEmbedResponse, BatchFailure, BatchSummary, ClearIndexResponse, EmbedProductData,
    EmbedProductRequest, EmbedProductResponse, ImageQuery, ImageQueryType, ImageSearchForm,
    ImageSearchResponse, Modality, ProductMetadata, RecommendationMode, RecommendationRequest,
    RecommendationResponse, ScoredResult, TextSearchForm, TextSearchResponse,
};
use crate::repository::VectorRepository;
use crate::service::ProductSearchService;

/// OpenAPI documentation for the product search API
#[derive(OpenApi)]
#[openapi(
    paths(
        embed_product,
        embed_products,
        image_search,
        text_search,
        recommendations,
        clear_index,
    ),
    components(
        schemas(
            EmbedProductRequest, EmbedProductResponse, EmbedProductData, ProductMetadata,
            BatchEmbedResponse, BatchSummary, BatchFailure,
            ImageSearchForm, ImageSearchResponse, ImageQueryType,
            TextSearchForm, TextSearchResponse,
            RecommendationRequest, RecommendationResponse, RecommendationMode,
            ScoredResult, Modality, ClearIndexResponse, ErrorResponse
        ),
        responses(
            BadRequestValidationResponse,
            NotFoundResponse,
            UnprocessableEntityResponse,
            BadGatewayResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "Products", description = "Product embedding ingestion and similarity search")
    )
)]
pub struct ApiDoc;

/// Create the product search router
pub fn router<R: VectorRepository + 'static>(service: Arc<ProductSearchService<R>>) -> Router {
    Router::new()
        .route("/embed-product", post(embed_product))
        .route("/embed-products", post(embed_products))
        .route("/image-search", post(image_search))
        .route("/text-search", post(text_search))
        .route("/recommendations", post(recommendations))
        .route("/index/{modality}", delete(clear_index))
        .with_state(service)
}

/// Embed one product's image and description
///
/// Every failure, including a malformed or invalid body, is reported as
/// `{status: false, message}`.
#[utoipa::path(
    post,
    path = "/embed-product",
    tag = "Products",
    request_body = EmbedProductRequest,
    responses(
        (status = 200, description = "Both embeddings stored", body = EmbedProductResponse),
        (status = 400, description = "Invalid input or unreadable image", body = EmbedProductResponse),
        (status = 422, description = "Malformed body or model returned a vector of the wrong length", body = EmbedProductResponse),
        (status = 502, description = "Embedding API or vector store failed", body = EmbedProductResponse)
    )
)]
async fn embed_product<R: VectorRepository>(
    State(service): State<Arc<ProductSearchService<R>>>,
    payload: Result<ValidatedJson<EmbedProductRequest>, AppError>,
) -> Response {
    let result = match payload {
        Ok(ValidatedJson(input)) => service.embed_product(input).await.map_err(AppError::from),
        Err(rejection) => Err(rejection),
    };

    match result {
        Ok(data) => Json(EmbedProductResponse::success(data)).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Error in embed_product");
            let status = err.status();
            (status, Json(EmbedProductResponse::failure(err.to_string()))).into_response()
        }
    }
}

/// Embed a batch of products
///
/// Each entry is parsed and processed independently; entries that are
/// malformed or fail to embed are listed in `failed` with their index.
#[utoipa::path(
    post,
    path = "/embed-products",
    tag = "Products",
    request_body = Vec<EmbedProductRequest>,
    responses(
        (status = 200, description = "Batch processed", body = BatchEmbedResponse),
        (status = 400, description = "Body is not valid JSON", body = ErrorResponse),
        (status = 422, description = "Body is not a JSON array", body = ErrorResponse)
    )
)]
async fn embed_products<R: VectorRepository>(
    State(service): State<Arc<ProductSearchService<R>>>,
    payload: Result<Json<Vec<Value>>, JsonRejection>,
) -> Result<Json<BatchEmbedResponse>, AppError> {
    let Json(inputs) = payload?;
    Ok(Json(service.embed_products(inputs).await))
}

/// Find visually similar products
///
/// Accepts an uploaded `file` or an `image_url`; the file wins when both are sent.
#[utoipa::path(
    post,
    path = "/image-search",
    tag = "Products",
    request_body(content = ImageSearchForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Nearest products by image", body = ImageSearchResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 422, response = UnprocessableEntityResponse),
        (status = 502, response = BadGatewayResponse)
    )
)]
async fn image_search<R: VectorRepository>(
    State(service): State<Arc<ProductSearchService<R>>>,
    form: FormPayload,
) -> Result<Json<ImageSearchResponse>, AppError> {
    let form = ImageSearchForm::try_from(form)?;
    let query = ImageQuery::resolve(form.file, form.image_url)?;
    let query_type = query.query_type();

    let results = service.image_search(query, form.top_k).await?;

    Ok(Json(ImageSearchResponse {
        status: true,
        query_type,
        count: results.len(),
        results,
    }))
}

/// Semantic product search from a text query
#[utoipa::path(
    post,
    path = "/text-search",
    tag = "Products",
    request_body(content = TextSearchForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Nearest products by text", body = TextSearchResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 422, response = UnprocessableEntityResponse),
        (status = 502, response = BadGatewayResponse)
    )
)]
async fn text_search<R: VectorRepository>(
    State(service): State<Arc<ProductSearchService<R>>>,
    form: FormPayload,
) -> Result<Json<TextSearchResponse>, AppError> {
    let form = TextSearchForm::try_from(form)?;
    let results = service.text_search(&form.query, form.top_k).await?;

    Ok(Json(TextSearchResponse {
        status: true,
        query: form.query,
        count: results.len(),
        results,
    }))
}

/// Recommend products similar to a given one
///
/// Runs the image and/or text branch depending on `mode` and merges their results.
#[utoipa::path(
    post,
    path = "/recommendations",
    tag = "Products",
    request_body(content = RecommendationRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Ranked recommendations", body = RecommendationResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn recommendations<R: VectorRepository>(
    State(service): State<Arc<ProductSearchService<R>>>,
    form: FormPayload,
) -> Result<Json<RecommendationResponse>, AppError> {
    let request = RecommendationRequest::try_from(form)?;
    let recommendations = service.recommend(&request).await?;

    Ok(Json(RecommendationResponse {
        status: true,
        mode: request.mode,
        count: recommendations.len(),
        recommendations,
    }))
}

/// Remove every vector of one modality
#[utoipa::path(
    delete,
    path = "/index/{modality}",
    tag = "Products",
    params(
        ("modality" = Modality, Path, description = "Index to clear: image or text")
    ),
    responses(
        (status = 200, description = "Index cleared", body = ClearIndexResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 502, response = BadGatewayResponse)
    )
)]
async fn clear_index<R: VectorRepository>(
    State(service): State<Arc<ProductSearchService<R>>>,
    Path(modality): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let modality: Modality = modality.parse().map_err(|_| {
        AppError::BadRequest(format!(
            "Unknown index '{}': expected image or text",
            modality
        ))
    })?;

    service.clear_index(modality).await?;

    Ok((
        StatusCode::OK,
        Json(ClearIndexResponse {
            status: true,
            modality,
            message: format!("Cleared all vectors in {} index.", modality),
        }),
    ))
}
