//! Error responses shared by the route handlers

use axum::{extract::rejection::JsonRejection, http::StatusCode, Json};
use serde::Serialize;
use tracing::warn;

pub const ENGINE_UNAVAILABLE: &str = "Agent Engine not initialized or not found";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type RouteError = (StatusCode, Json<ErrorResponse>);

pub fn error_response(status: StatusCode, message: impl Into<String>) -> RouteError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub fn engine_unavailable() -> RouteError {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, ENGINE_UNAVAILABLE)
}

/// Value of a required field, `None` when missing or blank
pub fn required(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.trim().is_empty())
}

/// Unwrap a JSON body, answering 400 with `message` when it was rejected
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>, message: &str) -> Result<T, RouteError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            warn!("Rejected request body: {}", rejection.body_text());
            Err(error_response(StatusCode::BAD_REQUEST, message))
        }
    }
}
