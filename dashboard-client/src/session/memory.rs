use super::{CredentialSet, CredentialStore, StoreError};
use crate::models::{ProfileUpdate, UserProfile};
use async_trait::async_trait;
use secrecy::Secret;
use tokio::sync::RwLock;

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: RwLock<Option<CredentialSet>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(credentials: CredentialSet) -> Self {
        Self {
            inner: RwLock::new(Some(credentials)),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Option<CredentialSet> {
        self.inner.read().await.clone()
    }

    async fn save(&self, credentials: CredentialSet) -> Result<(), StoreError> {
        *self.inner.write().await = Some(credentials);
        Ok(())
    }

    async fn replace_access_token(&self, token: Secret<String>) -> Result<(), StoreError> {
        if let Some(session) = self.inner.write().await.as_mut() {
            session.access_token = token;
        }
        Ok(())
    }

    async fn replace_profile(&self, update: ProfileUpdate) -> Result<(), StoreError> {
        if let Some(session) = self.inner.write().await.as_mut() {
            session.profile.merge(update);
        }
        Ok(())
    }

    async fn set_profile(&self, profile: UserProfile) -> Result<(), StoreError> {
        if let Some(session) = self.inner.write().await.as_mut() {
            session.profile = profile;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        *self.inner.write().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        serde_json::from_value(serde_json::json!({
            "id": "u1",
            "email": "ana@acme.com",
            "first_name": "Ana",
            "last_name": "Souza",
            "full_name": "Ana Souza",
            "can_edit": false
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_replace_access_token_keeps_refresh_and_profile() {
        let store = MemoryCredentialStore::with_session(CredentialSet::new(
            "old".into(),
            "refresh".into(),
            profile(),
        ));

        store
            .replace_access_token(Secret::new("new".to_string()))
            .await
            .unwrap();

        let session = store.load().await.unwrap();
        assert_eq!(session.access_token(), "new");
        assert_eq!(session.refresh_token(), "refresh");
        assert_eq!(session.profile, profile());
    }

    #[tokio::test]
    async fn test_mutations_without_session_do_not_create_one() {
        let store = MemoryCredentialStore::new();

        store
            .replace_access_token(Secret::new("orphan".to_string()))
            .await
            .unwrap();
        store
            .replace_profile(ProfileUpdate {
                first_name: Some("X".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn test_set_profile_overwrites_nullable_fields() {
        let mut seeded = profile();
        seeded.avatar = Some("/media/a.png".to_string());
        let store = MemoryCredentialStore::with_session(CredentialSet::new(
            "a".into(),
            "r".into(),
            seeded,
        ));

        store.set_profile(profile()).await.unwrap();

        let session = store.load().await.unwrap();
        assert_eq!(session.profile.avatar, None);
        assert_eq!(session.access_token(), "a");

        store.clear().await.unwrap();
        store.set_profile(profile()).await.unwrap();
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let store = MemoryCredentialStore::with_session(CredentialSet::new(
            "a".into(),
            "r".into(),
            profile(),
        ));

        store.clear().await.unwrap();
        store.clear().await.unwrap();
        assert!(store.load().await.is_none());
    }
}
