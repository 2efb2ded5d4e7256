//! Bearer token persistence and the session wrapper the dispatcher reads from
//!
//! A single opaque token is kept under one fixed key. It is written on login,
//! read before every authenticated request and removed on logout. Store
//! failures never reach the caller: [`AuthSession`] logs and swallows them.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::Result;
use crate::storage::{SETTING_ACCESS_TOKEN, Storage};

/// Backend that holds the bearer token
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Read the stored token, if any
    async fn load(&self) -> Result<Option<String>>;

    /// Replace the stored token
    async fn save(&self, token: &str) -> Result<()>;

    /// Delete the stored token
    async fn remove(&self) -> Result<()>;
}

/// Token kept in process memory only
#[derive(Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<String>> {
        Ok(self.token.lock().clone())
    }

    async fn save(&self, token: &str) -> Result<()> {
        *self.token.lock() = Some(token.to_string());
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        *self.token.lock() = None;
        Ok(())
    }
}

/// Token persisted in the SQLite settings table
pub struct SqliteCredentialStore {
    storage: Arc<Storage>,
}

impl SqliteCredentialStore {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn load(&self) -> Result<Option<String>> {
        self.storage.get_setting(SETTING_ACCESS_TOKEN)
    }

    async fn save(&self, token: &str) -> Result<()> {
        self.storage.set_setting(SETTING_ACCESS_TOKEN, token)
    }

    async fn remove(&self) -> Result<()> {
        self.storage.delete_setting(SETTING_ACCESS_TOKEN)?;
        Ok(())
    }
}

/// Credential provider injected into the API client.
///
/// Cloning shares the underlying store.
#[derive(Clone)]
pub struct AuthSession {
    store: Arc<dyn CredentialStore>,
}

impl AuthSession {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Session with no persistence and no token
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCredentialStore::new()))
    }

    /// Current token. A failing store reads as signed out.
    pub async fn token(&self) -> Option<String> {
        match self.store.load().await {
            Ok(token) => token,
            Err(e) => {
                warn!("Failed to fetch token: {}", e);
                None
            }
        }
    }

    pub async fn is_logged_in(&self) -> bool {
        self.token().await.is_some()
    }

    /// Store a freshly issued token
    pub async fn login(&self, token: &str) {
        match self.store.save(token).await {
            Ok(()) => debug!("Stored access token"),
            Err(e) => warn!("Failed to save token: {}", e),
        }
    }

    /// Forget the stored token
    pub async fn logout(&self) {
        match self.store.remove().await {
            Ok(()) => debug!("Removed access token"),
            Err(e) => warn!("Failed to delete token: {}", e),
        }
    }
}
