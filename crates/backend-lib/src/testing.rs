//! Test doubles shared by unit and integration tests.

use async_trait::async_trait;
use pushrelay_common::{PushPayload, Subscription};
use std::sync::Mutex;

use crate::push::{DispatchError, PushDispatcher};

/// What every delivery through a `FakeDispatcher` returns
#[derive(Debug, Clone, Copy)]
pub enum FakeOutcome {
    Delivered,
    Gone,
    Rejected(u16),
}

#[derive(Debug, Default)]
struct Recorded {
    calls: usize,
    last_endpoint: Option<String>,
    last_payload: Option<Vec<u8>>,
    last_ttl: Option<u32>,
}

/// Records deliveries instead of sending them
#[derive(Debug)]
pub struct FakeDispatcher {
    outcome: Mutex<FakeOutcome>,
    recorded: Mutex<Recorded>,
}

impl FakeDispatcher {
    pub fn new(outcome: FakeOutcome) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            recorded: Mutex::new(Recorded::default()),
        }
    }

    pub fn set_outcome(&self, outcome: FakeOutcome) {
        if let Ok(mut current) = self.outcome.lock() {
            *current = outcome;
        }
    }

    pub fn calls(&self) -> usize {
        self.recorded.lock().map(|r| r.calls).unwrap_or_default()
    }

    pub fn last_endpoint(&self) -> Option<String> {
        self.recorded.lock().ok().and_then(|r| r.last_endpoint.clone())
    }

    pub fn last_ttl(&self) -> Option<u32> {
        self.recorded.lock().ok().and_then(|r| r.last_ttl)
    }

    /// Last payload decoded as the JSON document browsers receive
    pub fn last_payload(&self) -> Option<PushPayload> {
        let bytes = self.recorded.lock().ok()?.last_payload.clone()?;
        serde_json::from_slice(&bytes).ok()
    }
}

#[async_trait]
impl PushDispatcher for FakeDispatcher {
    async fn deliver(
        &self,
        subscription: &Subscription,
        payload: &[u8],
        ttl_secs: u32,
    ) -> Result<(), DispatchError> {
        if let Ok(mut recorded) = self.recorded.lock() {
            recorded.calls += 1;
            recorded.last_endpoint = Some(subscription.endpoint.clone());
            recorded.last_payload = Some(payload.to_vec());
            recorded.last_ttl = Some(ttl_secs);
        }

        let outcome = self.outcome.lock().map(|o| *o).unwrap_or(FakeOutcome::Delivered);
        match outcome {
            FakeOutcome::Delivered => Ok(()),
            FakeOutcome::Gone => Err(DispatchError::Gone { status: 410 }),
            FakeOutcome::Rejected(status) => Err(DispatchError::Rejected {
                status,
                body: String::new(),
            }),
        }
    }
}
