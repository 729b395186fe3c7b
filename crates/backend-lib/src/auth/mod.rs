// ============================
// pushrelay-backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod password;
pub mod session;
mod service;
mod service_impl;

pub use password::{verify_password, PasswordHasherConfig, DEFAULT_HASH_COST};
pub use session::{SessionClaims, SessionManager, SESSION_TTL};
pub use service::AuthService;
pub use service_impl::DefaultAuth;
