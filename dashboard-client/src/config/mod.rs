use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub api: ApiSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ApiSettings {
    /// Root of the REST API, e.g. `http://localhost:8000`. Paths such as
    /// `/api/auth/login/` are appended verbatim.
    pub base_url: String,
    /// Per-request timeout, applied to every call including logout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Deserialize, Clone, Debug)]
pub struct SessionSettings {
    /// File holding the persisted credential set.
    #[serde(default = "default_session_path")]
    pub path: PathBuf,
    /// Prefix of the three persisted keys (`<namespace>:token` ...).
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            path: default_session_path(),
            namespace: default_namespace(),
        }
    }
}

fn default_session_path() -> PathBuf {
    PathBuf::from(".dashboard-session.json")
}

fn default_namespace() -> String {
    "@v4vision".to_string()
}

#[derive(Deserialize, Clone, Debug)]
pub struct TelemetrySettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// OTLP gRPC endpoint; span export is off when unset.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("No working directory: {}", e)))?;

    // Running from the workspace root or from inside the crate both work.
    let configuration_directory = if base_path.ends_with("dashboard-client") {
        base_path.join("config")
    } else {
        base_path.join("dashboard-client").join("config")
    };

    service_core::config::load_layered(&configuration_directory)
}
