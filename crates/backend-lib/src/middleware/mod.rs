// crates/backend-lib/src/middleware/mod.rs

//! Request middleware for the push relay API.

pub mod auth;

pub use auth::{bearer_token, optional_session, require_admin, require_session, AuthenticatedUser};
