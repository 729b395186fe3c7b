// ============================
// pushrelay-backend-lib/src/lib.rs
// ============================
//! Core of the push relay server: accounts, sessions, push subscriptions and
//! admin-triggered Web Push delivery.

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod push;
pub mod router;
pub mod storage;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod validation;

use std::sync::Arc;
use std::time::Duration;

use crate::auth::{AuthService, DefaultAuth, PasswordHasherConfig, SessionManager};
use crate::config::Settings;
use crate::push::{PushDispatcher, PushOptions, PushService};
use crate::storage::Storage;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState<S> {
    /// Authentication service
    pub auth: Arc<dyn AuthService>,
    /// Subscription and delivery service
    pub push: Arc<PushService<S>>,
    /// Settings
    pub settings: Arc<Settings>,
    /// Storage backend
    pub storage: S,
}

impl<S: Storage + Clone + 'static> AppState<S> {
    /// Wire services over `storage` according to `settings`
    pub fn new(
        storage: S,
        settings: Settings,
        dispatcher: Arc<dyn PushDispatcher>,
    ) -> anyhow::Result<Self> {
        let hasher = PasswordHasherConfig::new(settings.auth.hash_cost)?;
        let sessions = SessionManager::new(
            &settings.auth.jwt_secret,
            Duration::from_secs(settings.auth.session_ttl_secs),
        );
        let auth = Arc::new(DefaultAuth::new(
            storage.clone(),
            sessions,
            hasher,
            settings.auth.admin_username.clone(),
        )?);
        let push = Arc::new(PushService::new(
            storage.clone(),
            dispatcher,
            PushOptions {
                icon: settings.push.icon.clone(),
                ttl_secs: settings.push.ttl_secs,
            },
        ));

        Ok(Self {
            auth,
            push,
            settings: Arc::new(settings),
            storage,
        })
    }
}
