//! Startup provisioning of the store and the reserved administrator.

use anyhow::{bail, Context, Result};
use pushrelay_common::{Role, User, UserId};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::PasswordHasherConfig;
use crate::config::AuthSettings;
use crate::storage::Storage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Created(UserId),
    Existing(UserId),
}

impl BootstrapOutcome {
    pub fn user_id(self) -> UserId {
        match self {
            BootstrapOutcome::Created(id) | BootstrapOutcome::Existing(id) => id,
        }
    }
}

/// Ensure unique indexes and the administrator account. Safe to run on
/// every start.
pub async fn run<S: Storage>(
    storage: &S,
    auth: &AuthSettings,
    hasher: PasswordHasherConfig,
) -> Result<BootstrapOutcome> {
    storage
        .ensure_indexes()
        .await
        .context("failed to ensure unique indexes")?;

    if let Some(existing) = storage.find_by_username(&auth.admin_username).await? {
        if !existing.role.is_admin() {
            warn!(
                username = %existing.username,
                role = %existing.role,
                "reserved administrator account exists without the admin role"
            );
        }
        return Ok(BootstrapOutcome::Existing(existing.id));
    }

    let password = auth.admin_password.clone();
    let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .context("hashing task failed")??;

    let admin = User {
        id: Uuid::new_v4(),
        username: auth.admin_username.clone(),
        email: auth.admin_email.clone(),
        password_hash,
        role: Role::Admin,
        subscription: None,
    };
    let id = storage
        .insert_user(admin)
        .await
        .context("failed to create administrator")?;

    info!(%id, username = %auth.admin_username, "administrator created");
    Ok(BootstrapOutcome::Created(id))
}

/// Re-hash the administrator's password in place
pub async fn reset_admin_password<S: Storage>(
    storage: &S,
    admin_username: &str,
    new_password: &str,
    hasher: PasswordHasherConfig,
) -> Result<UserId> {
    if new_password.is_empty() {
        bail!("new password must not be empty");
    }
    let Some(admin) = storage.find_by_username(admin_username).await? else {
        bail!("administrator {admin_username} does not exist");
    };

    let mut plain = new_password.to_string();
    let password_hash = tokio::task::spawn_blocking(move || hasher.hash_secure(&mut plain))
        .await
        .context("hashing task failed")??;

    if !storage.set_password_hash(admin.id, &password_hash).await? {
        bail!("administrator {admin_username} disappeared during reset");
    }
    info!(id = %admin.id, "administrator password reset");
    Ok(admin.id)
}
