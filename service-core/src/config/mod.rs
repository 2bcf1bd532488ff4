use config::{Config, ConfigError, Environment, File};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Build settings from `<directory>/base.yaml` overlaid with `APP_` prefixed
/// environment variables (`APP_API__BASE_URL` sets `api.base_url`).
///
/// Callers load `.env` themselves before this runs.
pub fn load_layered<T: DeserializeOwned>(directory: &Path) -> Result<T, ConfigError> {
    let settings = Config::builder()
        .add_source(File::from(directory.join("base.yaml")).required(false))
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<T>()
}
