use async_trait::async_trait;
use metrics::counter;
use pushrelay_common::{LoginRequest, LoginResponse, RegisterRequest, Role, User, UserId};
use tracing::{info, instrument};
use uuid::Uuid;
use zeroize::Zeroize;

use super::{verify_password, AuthService, PasswordHasherConfig, SessionClaims, SessionManager};
use crate::error::AppError;
use crate::metrics::{LOGIN_FAILED, LOGIN_SUCCEEDED, USER_REGISTERED};
use crate::storage::Storage;
use crate::validation;

/// Store-backed `AuthService`
pub struct DefaultAuth<S> {
    storage: S,
    sessions: SessionManager,
    hasher: PasswordHasherConfig,
    admin_username: String,
    /// Verified against when the username is unknown so both failure paths
    /// cost one hash check
    dummy_hash: String,
}

impl<S: Storage> DefaultAuth<S> {
    pub fn new(
        storage: S,
        sessions: SessionManager,
        hasher: PasswordHasherConfig,
        admin_username: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let dummy_hash = hasher.hash("not-a-real-password")?;
        Ok(Self {
            storage,
            sessions,
            hasher,
            admin_username: admin_username.into(),
            dummy_hash,
        })
    }

    /// Role assigned at registration
    pub fn role_for(&self, username: &str) -> Role {
        if username == self.admin_username {
            Role::Admin
        } else {
            Role::User
        }
    }

    async fn hash_blocking(&self, mut plain: String) -> Result<String, AppError> {
        let hasher = self.hasher;
        tokio::task::spawn_blocking(move || hasher.hash_secure(&mut plain))
            .await
            .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))?
            .map_err(|e| AppError::Internal(e.to_string()))
    }

    async fn verify_blocking(&self, hash: String, mut plain: String) -> Result<bool, AppError> {
        tokio::task::spawn_blocking(move || {
            let ok = verify_password(&hash, &plain);
            plain.zeroize();
            ok
        })
        .await
        .map_err(|e| AppError::Internal(format!("verification task failed: {e}")))
    }
}

#[async_trait]
impl<S: Storage + 'static> AuthService for DefaultAuth<S> {
    #[instrument(skip_all, fields(username = %req.username))]
    async fn register(&self, mut req: RegisterRequest) -> Result<UserId, AppError> {
        let (username, email) = {
            let reg = validation::validate_registration(&req)?;
            (reg.username.to_string(), reg.email.to_string())
        };

        if self
            .storage
            .find_by_username_or_email(&username, &email)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "username or email already registered".to_string(),
            ));
        }

        let password_hash = self.hash_blocking(std::mem::take(&mut req.password)).await?;
        let role = self.role_for(&username);

        let user = User {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            role,
            subscription: None,
        };
        // the store's unique indexes catch a concurrent duplicate
        let id = self.storage.insert_user(user).await?;

        counter!(USER_REGISTERED).increment(1);
        info!(%id, %role, "user registered");
        Ok(id)
    }

    #[instrument(skip_all, fields(username = %req.username))]
    async fn login(&self, mut req: LoginRequest) -> Result<LoginResponse, AppError> {
        if req.username.trim().is_empty() || req.password.is_empty() {
            req.password.zeroize();
            return Err(AppError::InvalidInput("username and password are required".to_string()));
        }

        let password = std::mem::take(&mut req.password);
        let user = self.storage.find_by_username(req.username.trim()).await?;

        let verified = match &user {
            Some(user) => self.verify_blocking(user.password_hash.clone(), password).await?,
            None => {
                self.verify_blocking(self.dummy_hash.clone(), password).await?;
                false
            },
        };

        let user = match user {
            Some(user) if verified => user,
            _ => {
                counter!(LOGIN_FAILED).increment(1);
                return Err(AppError::InvalidCredentials);
            },
        };

        let token = self.sessions.issue(user.id, &user.username, user.role)?;
        counter!(LOGIN_SUCCEEDED).increment(1);
        info!(id = %user.id, role = %user.role, "login succeeded");

        Ok(LoginResponse {
            message: "Login successful".to_string(),
            token,
            username: user.username,
            email: user.email,
            role: user.role,
        })
    }

    fn verify_session(&self, token: &str) -> Result<SessionClaims, AppError> {
        self.sessions.verify(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SESSION_TTL;
    use crate::storage::FlatFileStorage;
    use tempfile::{tempdir, TempDir};

    fn auth() -> (DefaultAuth<FlatFileStorage>, FlatFileStorage, TempDir) {
        let dir = tempdir().unwrap();
        let storage = FlatFileStorage::new(dir.path()).unwrap();
        let auth = DefaultAuth::new(
            storage.clone(),
            SessionManager::new("secret", SESSION_TTL),
            PasswordHasherConfig::new(4).unwrap(),
            "juan",
        )
        .unwrap();
        (auth, storage, dir)
    }

    fn register_req(username: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    fn login_req(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: username.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let (auth, storage, _dir) = auth();
        let id = auth.register(register_req("ana", "ana@example.com", "pw")).await.unwrap();

        let stored = storage.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.role, Role::User);
        assert_ne!(stored.password_hash, "pw");
        assert!(stored.subscription.is_none());

        let resp = auth.login(login_req("ana", "pw")).await.unwrap();
        assert_eq!(resp.role, Role::User);
        assert_eq!(resp.email, "ana@example.com");
        let claims = auth.verify_session(&resp.token).unwrap();
        assert_eq!(claims.user_id(), id);
        assert_eq!(claims.role, stored.role);
    }

    #[tokio::test]
    async fn test_reserved_name_is_admin() {
        let (auth, _storage, _dir) = auth();
        auth.register(register_req("juan", "juan@x.com", "123")).await.unwrap();

        let resp = auth.login(login_req("juan", "123")).await.unwrap();
        assert_eq!(resp.role, Role::Admin);
        assert!(matches!(
            auth.login(login_req("juan", "wrong")).await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_unknown_user_and_wrong_password_look_the_same() {
        let (auth, _storage, _dir) = auth();
        auth.register(register_req("ana", "ana@example.com", "pw")).await.unwrap();

        let unknown = auth.login(login_req("nobody", "pw")).await.unwrap_err();
        let wrong = auth.login(login_req("ana", "nope")).await.unwrap_err();
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(unknown.error_code(), wrong.error_code());
        assert_eq!(unknown.status_code(), wrong.status_code());
    }

    #[tokio::test]
    async fn test_duplicates_conflict() {
        let (auth, _storage, _dir) = auth();
        auth.register(register_req("ana", "ana@example.com", "pw")).await.unwrap();

        assert!(matches!(
            auth.register(register_req("ana", "new@example.com", "pw")).await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            auth.register(register_req("bea", "ana@example.com", "pw")).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_fields_rejected() {
        let (auth, storage, _dir) = auth();
        assert!(matches!(
            auth.register(register_req("", "a@b.co", "pw")).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            auth.register(register_req("ana", "a@b.co", "")).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            auth.login(login_req("ana", "")).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(storage.list_users().await.unwrap().is_empty());
    }
}
