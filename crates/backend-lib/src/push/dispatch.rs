//! Web push delivery.
//!
//! Payloads are encrypted (RFC 8291) and signed (VAPID, RFC 8292) with the
//! `web-push` crate; the HTTP request itself goes out through a shared
//! `reqwest::Client`. One attempt per call, no retries.

use async_trait::async_trait;
use pushrelay_common::Subscription;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use web_push::{ContentEncoding, SubscriptionInfo, VapidSignatureBuilder, WebPushMessageBuilder};

use super::VapidKeys;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a delivery did not go through
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The push service no longer knows the subscription
    #[error("subscription gone (HTTP {status})")]
    Gone { status: u16 },

    #[error("push service rejected the message (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("push request failed: {0}")]
    Transport(String),

    #[error("push delivery is not configured: {0}")]
    NotConfigured(String),

    #[error("subscription cannot be used: {0}")]
    InvalidSubscription(String),
}

impl DispatchError {
    pub fn is_gone(&self) -> bool {
        matches!(self, DispatchError::Gone { .. })
    }
}

/// Map a push service response to an outcome
///
/// 404 and 410 mean the endpoint is gone. Some services answer other codes
/// with a body mentioning an expired subscription; those count as gone too.
pub fn classify_response(status: u16, body: &str) -> Result<(), DispatchError> {
    match status {
        200..=299 => Ok(()),
        404 | 410 => Err(DispatchError::Gone { status }),
        _ if body.to_ascii_lowercase().contains("expired") => Err(DispatchError::Gone { status }),
        _ => Err(DispatchError::Rejected {
            status,
            body: body.to_string(),
        }),
    }
}

/// Delivers one payload to one subscription
#[async_trait]
pub trait PushDispatcher: Send + Sync {
    async fn deliver(
        &self,
        subscription: &Subscription,
        payload: &[u8],
        ttl_secs: u32,
    ) -> Result<(), DispatchError>;
}

/// Real dispatcher speaking the Web Push protocol
pub struct WebPushDispatcher {
    client: reqwest::Client,
    keys: Option<VapidKeys>,
    subject: String,
}

impl WebPushDispatcher {
    /// Without keys every delivery fails with `NotConfigured`
    pub fn new(client: reqwest::Client, keys: Option<VapidKeys>, subject: impl Into<String>) -> Self {
        Self {
            client,
            keys,
            subject: subject.into(),
        }
    }

    /// Build with a fresh client shared by every delivery
    pub fn with_default_client(
        keys: Option<VapidKeys>,
        subject: impl Into<String>,
    ) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DispatchError::Transport(e.to_string()))?;
        Ok(Self::new(client, keys, subject))
    }

    pub fn is_configured(&self) -> bool {
        self.keys.is_some()
    }
}

#[async_trait]
impl PushDispatcher for WebPushDispatcher {
    async fn deliver(
        &self,
        subscription: &Subscription,
        payload: &[u8],
        ttl_secs: u32,
    ) -> Result<(), DispatchError> {
        let keys = self
            .keys
            .as_ref()
            .ok_or_else(|| DispatchError::NotConfigured("VAPID keys missing".to_string()))?;
        let sub_keys = subscription.keys.as_ref().ok_or_else(|| {
            DispatchError::InvalidSubscription("no encryption keys".to_string())
        })?;

        let sub_info = SubscriptionInfo::new(&subscription.endpoint, &sub_keys.p256dh, &sub_keys.auth);

        let mut sig_builder = VapidSignatureBuilder::from_base64(keys.private_key_base64url(), &sub_info)
            .map_err(|e| DispatchError::NotConfigured(format!("VAPID key: {e}")))?;
        sig_builder.add_claim("sub", self.subject.as_str());
        let signature = sig_builder
            .build()
            .map_err(|e| DispatchError::NotConfigured(format!("VAPID signature: {e}")))?;

        let mut builder = WebPushMessageBuilder::new(&sub_info);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload);
        builder.set_vapid_signature(signature);
        builder.set_ttl(ttl_secs);

        let message = builder
            .build()
            .map_err(|e| DispatchError::InvalidSubscription(e.to_string()))?;

        let mut request = self
            .client
            .post(message.endpoint.to_string())
            .header("TTL", message.ttl.to_string());

        if let Some(urgency) = message.urgency {
            request = request.header("Urgency", urgency.to_string());
        }

        if let Some(topic) = message.topic {
            request = request.header("Topic", topic);
        }

        if let Some(push_payload) = message.payload {
            request = request
                .header("Content-Encoding", push_payload.content_encoding.to_str())
                .header("Content-Type", "application/octet-stream");

            for (key, value) in &push_payload.crypto_headers {
                request = request.header(*key, value.as_str());
            }

            request = request.body(push_payload.content);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        debug!(status, "push service answered");

        if response.status().is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let outcome = classify_response(status, &body);
        if let Err(e) = &outcome {
            if !e.is_gone() {
                warn!(status, "push service rejected message");
            }
        }
        outcome
    }
}
