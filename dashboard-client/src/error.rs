use crate::session::StoreError;
use reqwest::StatusCode;
use std::fmt;
use thiserror::Error;

/// Why a session ended without the caller asking for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryCause {
    /// 401 with no refresh token on hand.
    MissingRenewalToken,
    /// The refresh exchange failed or was refused.
    RenewalRejected,
    /// The replay after a successful renewal was refused again.
    RenewalLoop,
}

impl fmt::Display for ExpiryCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ExpiryCause::MissingRenewalToken => "no refresh token available",
            ExpiryCause::RenewalRejected => "token renewal was rejected",
            ExpiryCause::RenewalLoop => "renewed token was rejected",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// Login refused. Carries the server's `detail` when it sent one.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The credential store has been cleared; the user must log in again.
    #[error("Session expired: {0}")]
    SessionExpired(ExpiryCause),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status}{}", detail_suffix(.detail))]
    Status {
        status: StatusCode,
        detail: Option<String>,
    },

    #[error("Invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(": {}", d))
        .unwrap_or_default()
}

impl ApiError {
    /// True when the caller should send the user back to the login flow.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired(_))
    }

    /// Transport, status and decode failures: the session is untouched and the
    /// caller may simply try again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ApiError::Http(_) | ApiError::Status { .. } | ApiError::Json(_)
        )
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Http(e) => e.status(),
            _ => None,
        }
    }
}
