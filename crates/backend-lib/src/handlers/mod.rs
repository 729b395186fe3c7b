//! HTTP handlers.

pub mod auth;
pub mod health;
pub mod push;
pub mod subscribe;
pub mod users;

use axum::extract::rejection::JsonRejection;

use crate::error::AppError;

/// Malformed or non-JSON bodies are client errors
pub(crate) fn bad_json(rejection: JsonRejection) -> AppError {
    AppError::InvalidInput(rejection.body_text())
}
