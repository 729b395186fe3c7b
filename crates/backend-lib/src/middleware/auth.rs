//! Session authentication layers.
//!
//! `require_session` verifies the bearer token and stores the caller in the
//! request extensions; `require_admin` runs after it on admin routes.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use pushrelay_common::{Role, UserId};
use std::sync::Arc;
use tracing::debug;

use crate::auth::SessionClaims;
use crate::error::AppError;
use crate::storage::Storage;
use crate::AppState;

/// Caller identity taken from a verified session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub username: String,
    pub role: Role,
}

impl From<SessionClaims> for AuthenticatedUser {
    fn from(claims: SessionClaims) -> Self {
        Self {
            id: claims.sub,
            username: claims.username,
            role: claims.role,
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("missing token".to_string()))
    }
}

/// Pull the token out of `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("missing token".to_string()))?;
    let malformed = || AppError::Unauthorized("malformed token".to_string());

    let value = value.to_str().map_err(|_| malformed())?;
    let parts: Vec<&str> = value.split(' ').collect();
    match parts.as_slice() {
        ["Bearer", token] if !token.is_empty() => Ok(*token),
        _ => Err(malformed()),
    }
}

/// Verify the session if the request carries one
///
/// No header gives `Ok(None)`. A header that fails verification is an error,
/// never an anonymous request.
pub fn optional_session<S>(
    state: &AppState<S>,
    headers: &HeaderMap,
) -> Result<Option<AuthenticatedUser>, AppError> {
    if !headers.contains_key(AUTHORIZATION) {
        return Ok(None);
    }
    let token = bearer_token(headers)?;
    let claims = state.auth.verify_session(token)?;
    Ok(Some(claims.into()))
}

/// Reject requests without a valid session
pub async fn require_session<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?;
    let claims = state.auth.verify_session(token)?;
    debug!(user = %claims.username, role = %claims.role, "session verified");

    request.extensions_mut().insert(AuthenticatedUser::from(claims));
    Ok(next.run(request).await)
}

/// Reject authenticated callers that are not administrators
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| AppError::Unauthorized("missing token".to_string()))?;

    if !user.role.is_admin() {
        debug!(user = %user.username, "admin route refused");
        return Err(AppError::Forbidden);
    }
    Ok(next.run(request).await)
}
