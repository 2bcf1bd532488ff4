//! Wire shapes of the `/api/auth/*` endpoints.

use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Successful `POST /api/auth/login/` body.
#[derive(Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Body of both the refresh and the logout calls.
#[derive(Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

#[derive(Deserialize)]
pub struct RefreshResponse {
    pub access: String,
}

#[derive(Serialize)]
pub struct ChangePasswordRequest<'a> {
    pub old_password: &'a str,
    pub new_password: &'a str,
}

/// Error envelope used by the API (`{"detail": "..."}`).
#[derive(Deserialize, Default)]
pub struct ErrorDetail {
    #[serde(default)]
    pub detail: Option<String>,
}

impl ErrorDetail {
    /// Pull `detail` out of an error body, tolerating non-JSON bodies.
    pub fn from_body(body: &[u8]) -> Option<String> {
        serde_json::from_slice::<ErrorDetail>(body)
            .ok()
            .and_then(|e| e.detail)
            .filter(|d| !d.trim().is_empty())
    }
}
