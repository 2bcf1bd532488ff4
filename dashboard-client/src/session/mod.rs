//! Credential storage.
//!
//! The API client never reaches a global; it holds an `Arc<dyn CredentialStore>`
//! so the file-backed store used by the CLI can be swapped for the in-memory
//! one in tests.

pub mod file;
pub mod memory;

use crate::models::{ProfileUpdate, UserProfile};
use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use thiserror::Error;

pub use file::FileCredentialStore;
pub use memory::MemoryCredentialStore;

/// Access token, refresh token and cached profile of the active session.
///
/// Both tokens are always present together; the type has no way to express
/// a half-populated session.
#[derive(Debug)]
pub struct CredentialSet {
    pub access_token: Secret<String>,
    pub refresh_token: Secret<String>,
    pub profile: UserProfile,
}

impl CredentialSet {
    pub fn new(access_token: String, refresh_token: String, profile: UserProfile) -> Self {
        Self {
            access_token: Secret::new(access_token),
            refresh_token: Secret::new(refresh_token),
            profile,
        }
    }

    pub fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }

    pub fn refresh_token(&self) -> &str {
        self.refresh_token.expose_secret()
    }
}

impl Clone for CredentialSet {
    fn clone(&self) -> Self {
        Self::new(
            self.access_token().to_string(),
            self.refresh_token().to_string(),
            self.profile.clone(),
        )
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Credential storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Credential serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Single source of truth for the session's credentials.
///
/// Implementations apply every mutation atomically with respect to the others:
/// a `clear` racing a `replace_access_token` ends either fully cleared or
/// fully populated, never with an access token and no refresh token.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// The persisted session, or `None`. Never fails: unreadable or partial
    /// state reads as "not logged in".
    async fn load(&self) -> Option<CredentialSet>;

    /// Persist all three fields as one unit.
    async fn save(&self, credentials: CredentialSet) -> Result<(), StoreError>;

    /// Swap the access token only. No-op when there is no session.
    async fn replace_access_token(&self, token: Secret<String>) -> Result<(), StoreError>;

    /// Merge `update` into the cached profile. No-op when there is no session.
    async fn replace_profile(&self, update: ProfileUpdate) -> Result<(), StoreError>;

    /// Overwrite the cached profile with one the server returned, nulls
    /// included. No-op when there is no session.
    async fn set_profile(&self, profile: UserProfile) -> Result<(), StoreError>;

    /// Remove every persisted credential. Idempotent.
    async fn clear(&self) -> Result<(), StoreError>;
}
