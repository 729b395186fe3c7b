//! Push subscription registration.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use pushrelay_common::{Ack, SubscribeRequest};
use std::sync::Arc;
use tracing::{debug, instrument};

use super::bad_json;
use crate::config::Settings;
use crate::error::AppError;
use crate::middleware::optional_session;
use crate::push::SubscriptionOwner;
use crate::storage::Storage;
use crate::AppState;

/// Body identity for clients that predate session tokens
fn legacy_owner(settings: &Settings, req: &SubscribeRequest) -> Result<SubscriptionOwner, AppError> {
    let missing = || AppError::Unauthorized("missing token".to_string());
    if !settings.auth.legacy_identity {
        return Err(missing());
    }

    let non_empty = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
    if let Some(id) = non_empty(&req.user_id) {
        return Ok(SubscriptionOwner::LegacyUserId(id));
    }
    if let Some(username) = non_empty(&req.username) {
        return Ok(SubscriptionOwner::LegacyUsername(username));
    }
    Err(missing())
}

/// `POST /api/subscribe`
#[instrument(skip_all)]
pub async fn subscribe<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    payload: Result<Json<SubscribeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Ack>), AppError> {
    let session = optional_session(&state, &headers)?;
    let Json(req) = payload.map_err(bad_json)?;

    let owner = match session {
        Some(user) => SubscriptionOwner::Session(user.id),
        None => {
            let owner = legacy_owner(&state.settings, &req)?;
            debug!(?owner, "subscribe without session");
            owner
        },
    };

    state.push.subscribe(owner, req.subscription).await?;
    Ok((StatusCode::CREATED, Json(Ack::new("Subscription saved"))))
}
