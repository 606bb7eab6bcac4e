//! Runtime configuration for the settings store.
//!
//! Values come from the process environment; a `.env` file in the working
//! directory is loaded first when present.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::AppError;

pub const DATA_DIR_ENV: &str = "POSTPROCESS_DATA_DIR";
pub const MODELS_TIMEOUT_ENV: &str = "POSTPROCESS_MODELS_TIMEOUT_SECS";

const DEFAULT_MODELS_TIMEOUT_SECS: u64 = 15;
const APP_DIR_NAME: &str = "postprocess-settings";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding `settings.db`.
    pub data_dir: PathBuf,
    /// Timeout for a single model-list HTTP request.
    pub models_timeout: Duration,
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, AppError> {
        load_dotenv(dotenvy::dotenv());
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let data_dir = match lookup(DATA_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir()?,
        };

        let models_timeout = match lookup(MODELS_TIMEOUT_ENV) {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    AppError::Validation(format!(
                        "{MODELS_TIMEOUT_ENV} must be a whole number of seconds, got '{raw}'"
                    ))
                })?;
                if secs == 0 {
                    return Err(AppError::Validation(format!(
                        "{MODELS_TIMEOUT_ENV} must be greater than zero"
                    )));
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_MODELS_TIMEOUT_SECS),
        };

        Ok(Self {
            data_dir,
            models_timeout,
        })
    }
}

/// A missing `.env` is the common case; anything else is worth a warning.
fn load_dotenv(result: Result<PathBuf, dotenvy::Error>) {
    match result {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "Ignoring unreadable .env file"),
    }
}

fn default_data_dir() -> Result<PathBuf, AppError> {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .ok_or_else(|| AppError::Internal("Could not resolve the user data directory".into()))
}
