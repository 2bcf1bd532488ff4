//! Shared fixtures for the API client integration tests.

#![allow(dead_code)]

use dashboard_client::config::ApiSettings;
use dashboard_client::models::UserProfile;
use dashboard_client::services::api_client::ApiClient;
use dashboard_client::session::{CredentialSet, CredentialStore, MemoryCredentialStore};
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::MockServer;

pub const STALE_TOKEN: &str = "stale-access";
pub const FRESH_TOKEN: &str = "fresh-access";
pub const REFRESH_TOKEN: &str = "refresh-1";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

pub fn profile_json() -> Value {
    json!({
        "id": "6f1c2a64-0c1e-4c38-9b1a-1f3f0c3a9e10",
        "email": "ana@acme.com",
        "first_name": "Ana",
        "last_name": "Souza",
        "full_name": "Ana Souza",
        "role": "company_admin",
        "avatar": null,
        "can_edit": true,
        "is_active": true,
        "date_joined": "2024-03-01T12:00:00-03:00",
        "company_data": {
            "id": "0b7d3c1e-8a51-4c7e-9d0e-5b1f2e6c7a90",
            "name": "Acme",
            "slug": "acme",
            "logo": null,
            "primary_color": "#F97316"
        }
    })
}

pub fn profile() -> UserProfile {
    serde_json::from_value(profile_json()).unwrap()
}

pub fn session(access: &str, refresh: &str) -> CredentialSet {
    CredentialSet::new(access.to_string(), refresh.to_string(), profile())
}

/// Client against `server`, backed by an in-memory store optionally seeded
/// with a session. The concrete store is returned for inspection.
pub fn client(
    server: &MockServer,
    seed: Option<CredentialSet>,
) -> (Arc<ApiClient>, Arc<MemoryCredentialStore>) {
    client_with_timeout(server, seed, 5)
}

pub fn client_with_timeout(
    server: &MockServer,
    seed: Option<CredentialSet>,
    timeout_secs: u64,
) -> (Arc<ApiClient>, Arc<MemoryCredentialStore>) {
    init_tracing();

    let store = Arc::new(match seed {
        Some(credentials) => MemoryCredentialStore::with_session(credentials),
        None => MemoryCredentialStore::new(),
    });
    let settings = ApiSettings {
        base_url: server.uri(),
        timeout_secs,
    };
    let api = ApiClient::new(&settings, store.clone()).unwrap();

    (Arc::new(api), store)
}

/// (access, refresh) currently held by the store.
pub async fn tokens(store: &MemoryCredentialStore) -> Option<(String, String)> {
    store.load().await.map(|session| {
        (
            session.access_token().to_string(),
            session.refresh_token().to_string(),
        )
    })
}

pub fn retrospective_json() -> Value {
    json!({
        "ano": 2024,
        "meses": [
            { "mes": 1, "receita": 125000.0 },
            { "mes": 2, "receita": 98000.5 }
        ]
    })
}
