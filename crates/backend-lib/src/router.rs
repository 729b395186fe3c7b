// ============================
// pushrelay-backend-lib/src/router.rs
// ============================
//! HTTP route table.
use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::config::CorsSettings;
use crate::handlers::{auth, health, push, subscribe, users};
use crate::middleware::{require_admin, require_session};
use crate::storage::Storage;
use crate::AppState;

/// CORS policy from the configured origin allow-list
pub fn cors_layer(settings: &CorsSettings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "skipping invalid CORS origin");
                None
            },
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true)
}

/// Create the API router
pub fn create_router<S: Storage + Clone + 'static>(state: Arc<AppState<S>>) -> Router {
    // route_layer: the last one added runs first, so the session is
    // verified before the role check
    let admin = Router::new()
        .route("/api/users", get(users::list_users::<S>))
        .route("/api/send-push/{id}", post(push::send_push::<S>))
        .route("/api/send-push-to-user", post(push::send_push_to_user::<S>))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session::<S>,
        ));

    Router::new()
        .route("/", get(health::health))
        .route("/api/register", post(auth::register::<S>))
        .route("/api/login", post(auth::login::<S>))
        .route("/api/subscribe", post(subscribe::subscribe::<S>))
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.settings.cors))
        .with_state(state)
}
