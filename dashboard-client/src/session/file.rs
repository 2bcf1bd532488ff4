//! JSON key/value file holding the session under three namespaced keys:
//! `<ns>:token`, `<ns>:refresh` and `<ns>:user`.
//!
//! Other keys in the document are left alone. Writes go to a uniquely named
//! sibling temp file which is then renamed over the target, so concurrent
//! writers (other processes included) never see a half-written document.

use super::{CredentialSet, CredentialStore, StoreError};
use crate::models::{ProfileUpdate, UserProfile};
use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use serde_json::{Map, Value};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;

type Document = Map<String, Value>;

pub struct FileCredentialStore {
    path: PathBuf,
    token_key: String,
    refresh_key: String,
    user_key: String,
    // Serializes read-modify-write cycles.
    lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>, namespace: &str) -> Self {
        Self {
            path: path.into(),
            token_key: format!("{}:token", namespace),
            refresh_key: format!("{}:refresh", namespace),
            user_key: format!("{}:user", namespace),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Document {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Document::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Unreadable session file, treating as empty");
                return Document::new();
            }
        };

        match serde_json::from_slice::<Document>(&bytes) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Malformed session file, treating as empty");
                Document::new()
            }
        }
    }

    async fn write_document(&self, document: &Document) -> Result<(), StoreError> {
        if document.is_empty() {
            return match tokio::fs::remove_file(&self.path).await {
                Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            };
        }

        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&directory).await?;

        let bytes = serde_json::to_vec_pretty(document)?;
        let target = self.path.clone();

        // Unique temp name per write, created 0600, renamed over the target.
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let mut tmp = NamedTempFile::new_in(&directory)?;
            tmp.write_all(&bytes)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Io(std::io::Error::other(e)))?
    }

    /// Rebuild a credential set from the document; any missing or malformed
    /// entry yields `None`.
    fn session_from(&self, document: &Document) -> Option<CredentialSet> {
        let access = document.get(&self.token_key).and_then(Value::as_str);
        let refresh = document.get(&self.refresh_key).and_then(Value::as_str);
        let user = document.get(&self.user_key);

        match (access, refresh, user) {
            (Some(access), Some(refresh), Some(user)) => {
                match serde_json::from_value::<UserProfile>(user.clone()) {
                    Ok(profile) => Some(CredentialSet::new(
                        access.to_string(),
                        refresh.to_string(),
                        profile,
                    )),
                    Err(e) => {
                        tracing::warn!(error = %e, "Stored profile is malformed, ignoring session");
                        None
                    }
                }
            }
            (None, None, None) => None,
            _ => {
                tracing::warn!(path = %self.path.display(), "Partial credential state on disk, ignoring session");
                None
            }
        }
    }

    fn remove_session(&self, document: &mut Document) {
        document.remove(&self.token_key);
        document.remove(&self.refresh_key);
        document.remove(&self.user_key);
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Option<CredentialSet> {
        let _guard = self.lock.lock().await;
        let document = self.read_document().await;
        self.session_from(&document)
    }

    async fn save(&self, credentials: CredentialSet) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await;

        document.insert(
            self.token_key.clone(),
            Value::String(credentials.access_token.expose_secret().clone()),
        );
        document.insert(
            self.refresh_key.clone(),
            Value::String(credentials.refresh_token.expose_secret().clone()),
        );
        document.insert(
            self.user_key.clone(),
            serde_json::to_value(&credentials.profile)?,
        );

        self.write_document(&document).await
    }

    async fn replace_access_token(&self, token: Secret<String>) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await;

        if self.session_from(&document).is_none() {
            tracing::debug!("No session to update access token on");
            return Ok(());
        }

        document.insert(
            self.token_key.clone(),
            Value::String(token.expose_secret().clone()),
        );
        self.write_document(&document).await
    }

    async fn replace_profile(&self, update: ProfileUpdate) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await;

        let Some(mut session) = self.session_from(&document) else {
            tracing::debug!("No session to update profile on");
            return Ok(());
        };

        session.profile.merge(update);
        document.insert(
            self.user_key.clone(),
            serde_json::to_value(&session.profile)?,
        );
        self.write_document(&document).await
    }

    async fn set_profile(&self, profile: UserProfile) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await;

        if self.session_from(&document).is_none() {
            tracing::debug!("No session to store profile on");
            return Ok(());
        }

        document.insert(self.user_key.clone(), serde_json::to_value(&profile)?);
        self.write_document(&document).await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await;
        self.remove_session(&mut document);
        self.write_document(&document).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn profile() -> UserProfile {
        serde_json::from_value(json!({
            "id": "u1",
            "email": "ana@acme.com",
            "first_name": "Ana",
            "last_name": "Souza",
            "full_name": "Ana Souza",
            "role": "viewer",
            "can_edit": false,
            "company_data": { "id": "c1", "name": "Acme", "slug": "acme" }
        }))
        .unwrap()
    }

    fn store_in(dir: &TempDir) -> FileCredentialStore {
        FileCredentialStore::new(dir.path().join("session.json"), "@v4vision")
    }

    async fn raw(store: &FileCredentialStore) -> Value {
        match tokio::fs::read(store.path()).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap(),
            Err(_) => Value::Null,
        }
    }

    #[tokio::test]
    async fn test_session_survives_a_new_store_instance() {
        let dir = TempDir::new().unwrap();
        store_in(&dir)
            .save(CredentialSet::new("acc".into(), "ref".into(), profile()))
            .await
            .unwrap();

        let reopened = store_in(&dir);
        let session = reopened.load().await.unwrap();
        assert_eq!(session.access_token(), "acc");
        assert_eq!(session.refresh_token(), "ref");
        assert_eq!(session.profile, profile());

        let document = raw(&reopened).await;
        assert_eq!(document["@v4vision:token"], json!("acc"));
        assert_eq!(document["@v4vision:refresh"], json!("ref"));
        assert_eq!(document["@v4vision:user"]["email"], json!("ana@acme.com"));
    }

    #[tokio::test]
    async fn test_missing_file_means_no_session() {
        let dir = TempDir::new().unwrap();
        assert!(store_in(&dir).load().await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_file_fails_open() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        tokio::fs::write(store.path(), b"{not json").await.unwrap();

        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn test_partial_state_is_not_a_session() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        tokio::fs::write(
            store.path(),
            serde_json::to_vec(&json!({ "@v4vision:token": "acc" })).unwrap(),
        )
        .await
        .unwrap();

        assert!(store.load().await.is_none());

        // And a stray access token cannot be promoted into a session.
        store
            .replace_access_token(Secret::new("new".to_string()))
            .await
            .unwrap();
        assert_eq!(raw(&store).await["@v4vision:token"], json!("acc"));
    }

    #[tokio::test]
    async fn test_clear_keeps_foreign_keys_and_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        tokio::fs::write(
            store.path(),
            serde_json::to_vec(&json!({ "theme": "dark" })).unwrap(),
        )
        .await
        .unwrap();
        store
            .save(CredentialSet::new("acc".into(), "ref".into(), profile()))
            .await
            .unwrap();

        store.clear().await.unwrap();
        store.clear().await.unwrap();

        assert!(store.load().await.is_none());
        assert_eq!(raw(&store).await, json!({ "theme": "dark" }));
    }

    #[tokio::test]
    async fn test_clear_removes_file_when_only_session_was_stored() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .save(CredentialSet::new("acc".into(), "ref".into(), profile()))
            .await
            .unwrap();

        store.clear().await.unwrap();
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_replace_profile_merges_on_disk() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .save(CredentialSet::new("acc".into(), "ref".into(), profile()))
            .await
            .unwrap();

        store
            .replace_profile(ProfileUpdate {
                last_name: Some("Lima".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let session = store.load().await.unwrap();
        assert_eq!(session.profile.last_name, "Lima");
        assert_eq!(session.profile.first_name, "Ana");
        assert_eq!(session.profile.company_data.as_ref().unwrap().slug, "acme");
        assert_eq!(session.access_token(), "acc");
    }

    #[tokio::test]
    async fn test_two_stores_on_one_path_save_concurrently() {
        let dir = TempDir::new().unwrap();
        let first = Arc::new(store_in(&dir));
        let second = Arc::new(store_in(&dir));

        let mut handles = Vec::new();
        for i in 0..50 {
            for store in [first.clone(), second.clone()] {
                handles.push(tokio::spawn(async move {
                    store
                        .save(CredentialSet::new(format!("acc-{}", i), "ref".into(), profile()))
                        .await
                }));
            }
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let session = first.load().await.unwrap();
        assert!(session.access_token().starts_with("acc-"));
        assert_eq!(session.refresh_token(), "ref");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name())
            .filter(|name| name != "session.json")
            .collect();
        assert!(leftovers.is_empty(), "stray temp files: {:?}", leftovers);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_session_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .save(CredentialSet::new("acc".into(), "ref".into(), profile()))
            .await
            .unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_set_profile_replaces_stored_profile() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .save(CredentialSet::new("acc".into(), "ref".into(), profile()))
            .await
            .unwrap();

        let mut replacement = profile();
        replacement.company_data = None;
        store.set_profile(replacement.clone()).await.unwrap();

        let session = store.load().await.unwrap();
        assert_eq!(session.profile, replacement);
        assert_eq!(raw(&store).await["@v4vision:user"]["company_data"], Value::Null);
    }

    #[tokio::test]
    async fn test_racing_clear_and_renewal_never_leave_partial_state() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(store_in(&dir));
        store
            .save(CredentialSet::new("acc".into(), "ref".into(), profile()))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                if i % 4 == 0 {
                    store.clear().await.unwrap();
                } else {
                    store
                        .replace_access_token(Secret::new(format!("acc-{}", i)))
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let document = raw(&store).await;
        let present = ["@v4vision:token", "@v4vision:refresh", "@v4vision:user"]
            .iter()
            .filter(|key| document.get(**key).is_some())
            .count();
        assert!(present == 0 || present == 3, "partial state: {}", document);
    }
}
