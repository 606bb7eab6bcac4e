pub mod bedrock;
pub mod capability;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod panel;
pub mod store;
pub mod validation;

use std::sync::Arc;

pub use capability::{CapabilityProbe, PlatformProbe};
pub use config::StoreConfig;
pub use db::models::{BedrockSettings, ModelOption, ProviderConfig, SettingsSnapshot};
pub use error::AppError;
pub use panel::fields::ProviderFields;
pub use panel::models::merge_model_options;
pub use panel::selector::{ProviderKind, ProviderSelection};
pub use panel::{BedrockField, PostProcessPanel};
pub use store::{SettingsStore, SqliteSettingsStore};

/// Open the SQLite-backed store from environment configuration and build a
/// panel over it with the platform capability probe.
///
/// Must be called from within a tokio runtime; panel writes are spawned on it.
pub fn open_panel() -> Result<PostProcessPanel, AppError> {
    let config = StoreConfig::from_env()?;
    tracing::info!(data_dir = %config.data_dir.display(), "Opening post-processing settings");

    let store = SqliteSettingsStore::open(&config)?;
    Ok(PostProcessPanel::new(Arc::new(store), Arc::new(PlatformProbe)))
}
