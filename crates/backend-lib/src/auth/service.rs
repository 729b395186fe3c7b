use async_trait::async_trait;
use pushrelay_common::{LoginRequest, LoginResponse, RegisterRequest, UserId};

use super::SessionClaims;
use crate::error::AppError;

/// Credential management: registration, login and session verification
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create a user, returning its id
    async fn register(&self, req: RegisterRequest) -> Result<UserId, AppError>;

    /// Check credentials and issue a session token
    async fn login(&self, req: LoginRequest) -> Result<LoginResponse, AppError>;

    /// Stateless token check
    fn verify_session(&self, token: &str) -> Result<SessionClaims, AppError>;
}
