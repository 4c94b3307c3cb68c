use axum::{http::StatusCode, response::IntoResponse};

use crate::axum_http::error_responses::AppError;

pub async fn not_found() -> impl IntoResponse {
    AppError::NotFound("No route found".to_string())
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK").into_response()
}
