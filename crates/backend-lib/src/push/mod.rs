//! Web push: VAPID keys, delivery, and the subscription service.

pub mod dispatch;
pub mod service;
pub mod vapid;

pub use dispatch::{classify_response, DispatchError, PushDispatcher, WebPushDispatcher};
pub use service::{PushOptions, PushService, PushTarget, SubscriptionOwner};
pub use vapid::{VapidError, VapidKeys};
