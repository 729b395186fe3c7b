//! Subscription lifecycle and push dispatch on top of the user store.

use metrics::counter;
use pushrelay_common::{PushPayload, Subscription, User, UserId};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{DispatchError, PushDispatcher};
use crate::error::AppError;
use crate::metrics::{PUSH_FAILED, PUSH_GONE, PUSH_SENT, SUBSCRIPTION_SAVED};
use crate::storage::Storage;
use crate::validation;

const DEFAULT_TITLE: &str = "Notification";

/// Who a subscription belongs to
#[derive(Debug, Clone)]
pub enum SubscriptionOwner {
    /// Identity taken from a verified session
    Session(UserId),
    /// Raw `userId` from the request body
    LegacyUserId(String),
    /// Raw `username` from the request body
    LegacyUsername(String),
}

/// Who a push is addressed to
#[derive(Debug, Clone)]
pub enum PushTarget {
    Id(UserId),
    Username(String),
}

/// Payload defaults
#[derive(Debug, Clone)]
pub struct PushOptions {
    pub icon: String,
    pub ttl_secs: u32,
}

pub struct PushService<S> {
    storage: S,
    dispatcher: Arc<dyn PushDispatcher>,
    options: PushOptions,
}

impl<S: Storage> PushService<S> {
    pub fn new(storage: S, dispatcher: Arc<dyn PushDispatcher>, options: PushOptions) -> Self {
        Self {
            storage,
            dispatcher,
            options,
        }
    }

    async fn resolve_owner(&self, owner: &SubscriptionOwner) -> Result<Option<User>, AppError> {
        match owner {
            SubscriptionOwner::Session(id) => self.storage.find_by_id(*id).await,
            SubscriptionOwner::LegacyUserId(raw) => {
                let id = validation::parse_user_id(raw)?;
                self.storage.find_by_id(id).await
            },
            SubscriptionOwner::LegacyUsername(name) => {
                let name = validation::validate_username(name)?;
                self.storage.find_by_username(name).await
            },
        }
    }

    async fn resolve_target(&self, target: &PushTarget) -> Result<Option<User>, AppError> {
        match target {
            PushTarget::Id(id) => self.storage.find_by_id(*id).await,
            PushTarget::Username(name) => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(AppError::InvalidInput("target username is required".to_string()));
                }
                self.storage.find_by_username(name).await
            },
        }
    }

    /// Store `subscription` for the owner, replacing any previous one
    #[instrument(skip_all, fields(owner = ?owner))]
    pub async fn subscribe(
        &self,
        owner: SubscriptionOwner,
        subscription: Option<Subscription>,
    ) -> Result<UserId, AppError> {
        let subscription = validation::validate_subscription(subscription.as_ref())?.clone();
        let user = self
            .resolve_owner(&owner)
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;

        if !self.storage.set_subscription(user.id, Some(subscription)).await? {
            return Err(AppError::NotFound("user not found".to_string()));
        }

        counter!(SUBSCRIPTION_SAVED).increment(1);
        info!(id = %user.id, "subscription saved");
        Ok(user.id)
    }

    /// Build the payload for `user`, filling in defaults
    pub fn payload_for(&self, user: &User, title: Option<String>, body: Option<String>) -> PushPayload {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        PushPayload {
            title: non_empty(title).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            message: non_empty(body)
                .unwrap_or_else(|| format!("Hello {}, you have a notification", user.username)),
            icon: self.options.icon.clone(),
        }
    }

    /// Deliver one notification. A gone endpoint clears the stored
    /// subscription and yields `SubscriptionGone`.
    #[instrument(skip_all, fields(target = ?target))]
    pub async fn send(
        &self,
        target: PushTarget,
        title: Option<String>,
        body: Option<String>,
    ) -> Result<(), AppError> {
        let user = self
            .resolve_target(&target)
            .await?
            .ok_or_else(|| AppError::NotFound("target user not found".to_string()))?;

        let subscription = match &user.subscription {
            Some(sub) if !sub.endpoint.trim().is_empty() => sub.clone(),
            _ => return Err(AppError::NotFound("target user is not subscribed".to_string())),
        };

        let payload = serde_json::to_vec(&self.payload_for(&user, title, body))?;

        match self
            .dispatcher
            .deliver(&subscription, &payload, self.options.ttl_secs)
            .await
        {
            Ok(()) => {
                counter!(PUSH_SENT).increment(1);
                info!(id = %user.id, "push delivered");
                Ok(())
            },
            Err(e @ DispatchError::Gone { .. }) => {
                counter!(PUSH_GONE).increment(1);
                // a subscription saved while the delivery was in flight stays
                let cleared = self
                    .storage
                    .clear_subscription_if(user.id, &subscription.endpoint)
                    .await?;
                warn!(id = %user.id, error = %e, cleared, "subscription gone");
                Err(AppError::SubscriptionGone)
            },
            Err(e) => {
                counter!(PUSH_FAILED).increment(1);
                Err(AppError::Delivery(e.to_string()))
            },
        }
    }
}
