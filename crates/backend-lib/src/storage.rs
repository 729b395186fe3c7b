// ============================
// pushrelay-backend-lib/src/storage.rs
// ============================
//! Storage abstraction with flat-file implementation.
//!
//! The flat-file store keeps the whole user collection in memory behind an
//! async `RwLock` and rewrites `users.json` atomically on every mutation, so
//! writes to the same user are serialized by the lock. The write guard is
//! held across the file write, which also serializes the temp file.
use async_trait::async_trait;
use pushrelay_common::{Subscription, User, UserId};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{fs as tokio_fs, io::AsyncWriteExt, sync::RwLock};

use crate::error::AppError;

const USERS_FILE: &str = "users.json";
const USERS_TMP_FILE: &str = "users.json.tmp";

/// Trait for storage backends
#[async_trait]
pub trait Storage: Send + Sync {
    /// Build the unique username/email indexes, failing if stored data
    /// already violates them
    async fn ensure_indexes(&self) -> Result<(), AppError>;

    /// Insert a new user. Fails with `Conflict` on a duplicate username or email.
    async fn insert_user(&self, user: User) -> Result<UserId, AppError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, AppError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// First user whose username or email matches
    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, AppError>;

    async fn list_users(&self) -> Result<Vec<User>, AppError>;

    /// Set or clear a user's subscription. Returns `false` if no such user.
    async fn set_subscription(
        &self,
        id: UserId,
        subscription: Option<Subscription>,
    ) -> Result<bool, AppError>;

    /// Clear a user's subscription only if it still points at `endpoint`.
    /// Returns `true` when something was cleared.
    async fn clear_subscription_if(&self, id: UserId, endpoint: &str) -> Result<bool, AppError>;

    /// Replace a user's password hash. Returns `false` if no such user.
    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> Result<bool, AppError>;
}

/// On-disk document layout
#[derive(Debug, Default, Serialize, Deserialize)]
struct UsersDocument {
    users: Vec<User>,
}

#[derive(Debug, Default)]
struct UserTable {
    users: HashMap<UserId, User>,
    /// Insertion order, kept for stable listings
    order: Vec<UserId>,
    by_username: HashMap<String, UserId>,
    by_email: HashMap<String, UserId>,
}

impl UserTable {
    fn from_document(doc: UsersDocument) -> Self {
        let mut table = UserTable::default();
        for user in doc.users {
            table.order.push(user.id);
            table.users.insert(user.id, user);
        }
        table
    }

    fn to_document(&self) -> UsersDocument {
        UsersDocument {
            users: self
                .order
                .iter()
                .filter_map(|id| self.users.get(id).cloned())
                .collect(),
        }
    }

    fn rebuild_indexes(&mut self) -> Result<(), AppError> {
        let mut by_username = HashMap::with_capacity(self.users.len());
        let mut by_email = HashMap::with_capacity(self.users.len());
        for id in &self.order {
            let Some(user) = self.users.get(id) else { continue };
            if by_username.insert(user.username.clone(), user.id).is_some() {
                return Err(AppError::Internal(format!(
                    "stored users violate unique username index: {}",
                    user.username
                )));
            }
            if by_email.insert(user.email.clone(), user.id).is_some() {
                return Err(AppError::Internal(format!(
                    "stored users violate unique email index: {}",
                    user.email
                )));
            }
        }
        self.by_username = by_username;
        self.by_email = by_email;
        Ok(())
    }
}

/// Flat-file implementation of the Storage trait
#[derive(Clone)]
pub struct FlatFileStorage {
    root: PathBuf,
    table: Arc<RwLock<UserTable>>,
}

impl FlatFileStorage {
    /// Open the store under `root`, creating the directory if needed and
    /// loading any existing `users.json`
    pub fn new<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let path = root.join(USERS_FILE);
        let doc = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str::<UsersDocument>(&content)?
        } else {
            UsersDocument::default()
        };

        let mut table = UserTable::from_document(doc);
        table.rebuild_indexes()?;

        Ok(Self {
            root,
            table: Arc::new(RwLock::new(table)),
        })
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(USERS_FILE)
    }

    /// Write the table through a temp file and rename it into place
    async fn persist(&self, table: &UserTable) -> Result<(), AppError> {
        let json = serde_json::to_vec_pretty(&table.to_document())?;
        let tmp_path = self.root.join(USERS_TMP_FILE);

        let mut file = tokio_fs::File::create(&tmp_path).await?;
        file.write_all(&json).await?;
        file.sync_all().await?;
        drop(file);

        tokio_fs::rename(&tmp_path, self.path()).await?;
        Ok(())
    }
}

#[async_trait]
impl Storage for FlatFileStorage {
    async fn ensure_indexes(&self) -> Result<(), AppError> {
        let mut table = self.table.write().await;
        table.rebuild_indexes()
    }

    async fn insert_user(&self, user: User) -> Result<UserId, AppError> {
        let mut table = self.table.write().await;

        if table.by_username.contains_key(&user.username) {
            return Err(AppError::Conflict(format!("username {} taken", user.username)));
        }
        if table.by_email.contains_key(&user.email) {
            return Err(AppError::Conflict(format!("email {} taken", user.email)));
        }

        let id = user.id;
        table.by_username.insert(user.username.clone(), id);
        table.by_email.insert(user.email.clone(), id);
        table.order.push(id);
        table.users.insert(id, user);

        if let Err(e) = self.persist(&table).await {
            // roll back so memory matches disk
            if let Some(user) = table.users.remove(&id) {
                table.by_username.remove(&user.username);
                table.by_email.remove(&user.email);
            }
            table.order.retain(|existing| *existing != id);
            return Err(e);
        }

        Ok(id)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, AppError> {
        let table = self.table.read().await;
        Ok(table.users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let table = self.table.read().await;
        Ok(table
            .by_username
            .get(username)
            .and_then(|id| table.users.get(id))
            .cloned())
    }

    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        let table = self.table.read().await;
        let id = table
            .by_username
            .get(username)
            .or_else(|| table.by_email.get(email));
        Ok(id.and_then(|id| table.users.get(id)).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let table = self.table.read().await;
        Ok(table.to_document().users)
    }

    async fn set_subscription(
        &self,
        id: UserId,
        subscription: Option<Subscription>,
    ) -> Result<bool, AppError> {
        let mut table = self.table.write().await;
        let Some(user) = table.users.get_mut(&id) else {
            return Ok(false);
        };
        let previous = std::mem::replace(&mut user.subscription, subscription);

        if let Err(e) = self.persist(&table).await {
            if let Some(user) = table.users.get_mut(&id) {
                user.subscription = previous;
            }
            return Err(e);
        }
        Ok(true)
    }

    async fn clear_subscription_if(&self, id: UserId, endpoint: &str) -> Result<bool, AppError> {
        let mut table = self.table.write().await;
        let Some(user) = table.users.get_mut(&id) else {
            return Ok(false);
        };
        if user.subscription.as_ref().map(|s| s.endpoint.as_str()) != Some(endpoint) {
            return Ok(false);
        }
        let previous = user.subscription.take();

        if let Err(e) = self.persist(&table).await {
            if let Some(user) = table.users.get_mut(&id) {
                user.subscription = previous;
            }
            return Err(e);
        }
        Ok(true)
    }

    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> Result<bool, AppError> {
        let mut table = self.table.write().await;
        let Some(user) = table.users.get_mut(&id) else {
            return Ok(false);
        };
        let previous = std::mem::replace(&mut user.password_hash, password_hash.to_string());

        if let Err(e) = self.persist(&table).await {
            if let Some(user) = table.users.get_mut(&id) {
                user.password_hash = previous;
            }
            return Err(e);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pushrelay_common::Role;
    use tempfile::tempdir;
    use uuid::Uuid;

    fn user(username: &str, email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            password_hash: "$scrypt$test".into(),
            role: Role::User,
            subscription: None,
        }
    }

    fn subscription(endpoint: &str) -> Subscription {
        Subscription {
            endpoint: endpoint.into(),
            expiration_time: None,
            keys: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let dir = tempdir().unwrap();
        let store = FlatFileStorage::new(dir.path()).unwrap();

        let ana = user("ana", "ana@example.com");
        let id = store.insert_user(ana.clone()).await.unwrap();
        assert_eq!(id, ana.id);

        assert_eq!(store.find_by_id(id).await.unwrap(), Some(ana.clone()));
        assert_eq!(store.find_by_username("ana").await.unwrap(), Some(ana.clone()));
        assert_eq!(store.find_by_username("ANA").await.unwrap(), None);
        assert_eq!(
            store
                .find_by_username_or_email("nobody", "ana@example.com")
                .await
                .unwrap()
                .map(|u| u.id),
            Some(id)
        );
    }

    #[tokio::test]
    async fn test_unique_username_and_email() {
        let dir = tempdir().unwrap();
        let store = FlatFileStorage::new(dir.path()).unwrap();
        store.insert_user(user("ana", "ana@example.com")).await.unwrap();

        let dup_name = store.insert_user(user("ana", "other@example.com")).await;
        assert!(matches!(dup_name, Err(AppError::Conflict(_))));

        let dup_email = store.insert_user(user("bob", "ana@example.com")).await;
        assert!(matches!(dup_email, Err(AppError::Conflict(_))));

        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_subscription_last_write_wins() {
        let dir = tempdir().unwrap();
        let store = FlatFileStorage::new(dir.path()).unwrap();
        let id = store.insert_user(user("ana", "ana@example.com")).await.unwrap();

        assert!(store.set_subscription(id, Some(subscription("https://a.example/1"))).await.unwrap());
        assert!(store.set_subscription(id, Some(subscription("https://a.example/2"))).await.unwrap());
        let stored = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.subscription.unwrap().endpoint, "https://a.example/2");

        assert!(store.set_subscription(id, None).await.unwrap());
        assert!(store.find_by_id(id).await.unwrap().unwrap().subscription.is_none());

        assert!(!store.set_subscription(Uuid::new_v4(), None).await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_subscription_only_if_endpoint_matches() {
        let dir = tempdir().unwrap();
        let store = FlatFileStorage::new(dir.path()).unwrap();
        let id = store.insert_user(user("ana", "ana@example.com")).await.unwrap();
        store.set_subscription(id, Some(subscription("https://a.example/new"))).await.unwrap();

        assert!(!store.clear_subscription_if(id, "https://a.example/old").await.unwrap());
        let kept = store.find_by_id(id).await.unwrap().unwrap().subscription.unwrap();
        assert_eq!(kept.endpoint, "https://a.example/new");

        assert!(store.clear_subscription_if(id, "https://a.example/new").await.unwrap());
        assert!(store.find_by_id(id).await.unwrap().unwrap().subscription.is_none());
        assert!(!store.clear_subscription_if(id, "https://a.example/new").await.unwrap());
        assert!(!store.clear_subscription_if(Uuid::new_v4(), "x").await.unwrap());

        // the cleared state is what lands on disk
        let reopened = FlatFileStorage::new(dir.path()).unwrap();
        assert!(reopened.find_by_id(id).await.unwrap().unwrap().subscription.is_none());
        assert!(!dir.path().join(USERS_TMP_FILE).exists());
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempdir().unwrap();
        let id = {
            let store = FlatFileStorage::new(dir.path()).unwrap();
            let id = store.insert_user(user("ana", "ana@example.com")).await.unwrap();
            store.insert_user(user("bob", "bob@example.com")).await.unwrap();
            store.set_subscription(id, Some(subscription("https://a.example/1"))).await.unwrap();
            store.set_password_hash(id, "$scrypt$new").await.unwrap();
            id
        };

        let store = FlatFileStorage::new(dir.path()).unwrap();
        let users = store.list_users().await.unwrap();
        assert_eq!(
            users.iter().map(|u| u.username.as_str()).collect::<Vec<_>>(),
            vec!["ana", "bob"]
        );
        let ana = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(ana.password_hash, "$scrypt$new");
        assert!(ana.subscription.is_some());
        // indexes are rebuilt on open
        assert!(store.insert_user(user("ana", "x@example.com")).await.is_err());
    }

    #[tokio::test]
    async fn test_corrupt_duplicates_fail_on_open() {
        let dir = tempdir().unwrap();
        let doc = UsersDocument {
            users: vec![user("ana", "a@example.com"), user("ana", "b@example.com")],
        };
        fs::write(dir.path().join(USERS_FILE), serde_json::to_string(&doc).unwrap()).unwrap();
        assert!(FlatFileStorage::new(dir.path()).is_err());
    }
}
