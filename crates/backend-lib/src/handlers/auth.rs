//! Registration and login.

use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use pushrelay_common::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use std::sync::Arc;
use tracing::instrument;

use super::bad_json;
use crate::error::AppError;
use crate::storage::Storage;
use crate::AppState;

/// `POST /api/register`
#[instrument(skip_all)]
pub async fn register<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let Json(req) = payload.map_err(bad_json)?;
    let id = state.auth.register(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            id,
        }),
    ))
}

/// `POST /api/login`
#[instrument(skip_all)]
pub async fn login<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(req) = payload.map_err(bad_json)?;
    Ok(Json(state.auth.login(req).await?))
}
