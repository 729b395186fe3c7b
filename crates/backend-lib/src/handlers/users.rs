use axum::{extract::State, Json};
use pushrelay_common::UserSummary;
use std::sync::Arc;
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::storage::Storage;
use crate::AppState;

/// `GET /api/users` (admin)
#[instrument(skip_all, fields(caller = %caller.username))]
pub async fn list_users<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: AuthenticatedUser,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    let users = state.storage.list_users().await?;
    Ok(Json(users.iter().map(UserSummary::from).collect()))
}
