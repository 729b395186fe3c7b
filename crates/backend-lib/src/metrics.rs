// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const USER_REGISTERED: &str = "auth.user_registered";
pub const LOGIN_SUCCEEDED: &str = "auth.login_succeeded";
pub const LOGIN_FAILED: &str = "auth.login_failed";
pub const SUBSCRIPTION_SAVED: &str = "push.subscription_saved";
pub const PUSH_SENT: &str = "push.sent";
pub const PUSH_GONE: &str = "push.gone";
pub const PUSH_FAILED: &str = "push.failed";
