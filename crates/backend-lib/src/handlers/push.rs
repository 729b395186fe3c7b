//! Admin push endpoints.

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use pushrelay_common::{Ack, SendPushRequest, SendPushToUserRequest};
use std::sync::Arc;
use tracing::{info, instrument};

use super::bad_json;
use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::push::PushTarget;
use crate::storage::Storage;
use crate::validation;
use crate::AppState;

const SENT: &str = "Push notification sent";

/// An empty body means default title and message
fn parse_optional_body(body: &Bytes) -> Result<SendPushRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(SendPushRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::InvalidInput(format!("invalid JSON body: {e}")))
}

/// `POST /api/send-push/{id}` (admin)
#[instrument(skip_all, fields(caller = %caller.username, target = %id))]
pub async fn send_push<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    caller: AuthenticatedUser,
    body: Bytes,
) -> Result<Json<Ack>, AppError> {
    let id = validation::parse_user_id(&id)?;
    let req = parse_optional_body(&body)?;

    state.push.send(PushTarget::Id(id), req.title, req.body).await?;
    info!("admin push sent");
    Ok(Json(Ack::new(SENT)))
}

/// `POST /api/send-push-to-user` (admin)
#[instrument(skip_all, fields(caller = %caller.username))]
pub async fn send_push_to_user<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: AuthenticatedUser,
    payload: Result<Json<SendPushToUserRequest>, JsonRejection>,
) -> Result<Json<Ack>, AppError> {
    let Json(req) = payload.map_err(bad_json)?;

    state
        .push
        .send(PushTarget::Username(req.target_username), req.title, req.body)
        .await?;
    info!("admin push sent");
    Ok(Json(Ack::new(SENT)))
}
