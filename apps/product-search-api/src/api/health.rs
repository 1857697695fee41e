//! Root banner and readiness endpoints

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use axum_helpers::server::{run_health_checks, HealthCheckFuture};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
struct BannerResponse {
    status: bool,
    message: String,
}

async fn root() -> Json<BannerResponse> {
    Json(BannerResponse {
        status: true,
        message: "Product search API is running.".to_string(),
    })
}

async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let checks: Vec<(&str, HealthCheckFuture<'_>)> = vec![(
        "qdrant",
        Box::pin(async { state.service.health().await.map_err(|e| e.to_string()) }),
    )];

    run_health_checks(checks).await
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/ready", get(ready))
        .with_state(state)
}
