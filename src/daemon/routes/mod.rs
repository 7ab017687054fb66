//! API route handlers

pub mod coordinate;
pub mod health;
pub mod hooks;
pub mod planning;

use axum::{http::StatusCode, Json};

use super::types::ErrorResponse;

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse::new(code, error)))
}
