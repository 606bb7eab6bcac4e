//! Settings store: the contract the panel writes through, plus the SQLite
//! implementation backing it.

pub mod model_list;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::config::StoreConfig;
use crate::db::models::{BedrockSettings, SettingsSnapshot};
use crate::db::repos::{providers as provider_repo, settings as settings_repo};
use crate::db::{settings_keys, DbPool};
use crate::error::AppError;
use crate::validation;

use model_list::{HttpModelLister, ModelLister};

// ── Operation keys for `is_updating` ──────────────────────────────────

pub const OP_BASE_URL: &str = "post_process_base_url";
pub const OP_API_KEY: &str = "post_process_api_key";
pub const OP_MODEL: &str = "post_process_model";
pub const OP_FETCH_MODELS: &str = "post_process_models_fetch";
pub const OP_SET_PROVIDER: &str = "post_process_provider";

/// `<operation>:<provider_id>` key used to track in-flight updates.
pub fn operation_key(operation: &str, provider_id: &str) -> String {
    format!("{operation}:{provider_id}")
}

// ── Trait ──────────────────────────────────────────────────────────────

/// Everything the post-processing panel reads from and writes to.
///
/// Reads are synchronous; writes are async so callers can spawn them and
/// move on.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Current values of every post-processing setting.
    fn snapshot(&self) -> Result<SettingsSnapshot, AppError>;

    fn get_setting(&self, key: &str) -> Result<Option<String>, AppError>;

    /// Whether an update tracked under `operation_key` is still running.
    fn is_updating(&self, operation_key: &str) -> bool;

    /// Write a generic setting; `None` clears it.
    async fn update_setting(&self, key: &str, value: Option<String>) -> Result<(), AppError>;

    async fn update_post_process_base_url(
        &self,
        provider_id: &str,
        base_url: &str,
    ) -> Result<(), AppError>;

    async fn update_post_process_api_key(
        &self,
        provider_id: &str,
        api_key: &str,
    ) -> Result<(), AppError>;

    async fn update_post_process_model(&self, provider_id: &str, model: &str)
        -> Result<(), AppError>;

    async fn set_post_process_provider(&self, provider_id: &str) -> Result<(), AppError>;

    /// Refresh and persist the provider's model list, returning it.
    async fn fetch_post_process_models(&self, provider_id: &str) -> Result<Vec<String>, AppError>;
}

// ── In-flight tracking ────────────────────────────────────────────────

/// Running-call count per operation key. Overlapping calls on one key keep
/// it marked until the last of them finishes.
#[derive(Default)]
struct InFlight {
    keys: Mutex<HashMap<String, usize>>,
}

impl InFlight {
    fn begin(&self, key: String) -> InFlightGuard<'_> {
        *self
            .keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(key.clone())
            .or_insert(0) += 1;
        InFlightGuard { owner: self, key }
    }

    fn contains(&self, key: &str) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }
}

/// Releases its call when the update finishes, including on early `?` returns.
struct InFlightGuard<'a> {
    owner: &'a InFlight,
    key: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut keys = self.owner.keys.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(count) = keys.get_mut(&self.key) {
            *count -= 1;
            if *count == 0 {
                keys.remove(&self.key);
            }
        }
    }
}

// ── SQLite store ──────────────────────────────────────────────────────

pub struct SqliteSettingsStore {
    pool: DbPool,
    lister: Arc<dyn ModelLister>,
    in_flight: InFlight,
}

impl SqliteSettingsStore {
    pub fn new(pool: DbPool, lister: Arc<dyn ModelLister>) -> Self {
        Self {
            pool,
            lister,
            in_flight: InFlight::default(),
        }
    }

    /// Open (or create) the database under the configured data directory and
    /// list models over HTTP.
    pub fn open(config: &StoreConfig) -> Result<Self, AppError> {
        let pool = crate::db::init_db(&config.data_dir)?;
        let lister = HttpModelLister::new(config.models_timeout)?;
        Ok(Self::new(pool, Arc::new(lister)))
    }

    fn bedrock_settings(&self) -> Result<BedrockSettings, AppError> {
        let defaults = BedrockSettings::default();
        let read = |key: &str| -> Result<Option<String>, AppError> {
            Ok(settings_repo::get(&self.pool, key)?.filter(|v| !v.trim().is_empty()))
        };

        Ok(BedrockSettings {
            profile_name: read(settings_keys::BEDROCK_PROFILE_NAME)?,
            region: read(settings_keys::BEDROCK_REGION)?.unwrap_or(defaults.region),
            model_id: read(settings_keys::BEDROCK_MODEL_ID)?.unwrap_or(defaults.model_id),
            custom_model_id: read(settings_keys::BEDROCK_CUSTOM_MODEL_ID)?.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    fn snapshot(&self) -> Result<SettingsSnapshot, AppError> {
        Ok(SettingsSnapshot {
            post_process_providers: provider_repo::get_all(&self.pool)?,
            post_process_provider_id: settings_repo::get(
                &self.pool,
                settings_keys::POST_PROCESS_PROVIDER_ID,
            )?,
            post_process_api_keys: provider_repo::api_keys(&self.pool)?,
            post_process_models: provider_repo::models(&self.pool)?,
            post_process_model_options: provider_repo::cached_models(&self.pool)?,
            bedrock: self.bedrock_settings()?,
        })
    }

    fn get_setting(&self, key: &str) -> Result<Option<String>, AppError> {
        settings_repo::get(&self.pool, key)
    }

    fn is_updating(&self, operation_key: &str) -> bool {
        self.in_flight.contains(operation_key)
    }

    async fn update_setting(&self, key: &str, value: Option<String>) -> Result<(), AppError> {
        validation::require_non_empty("key", key)?;
        let _guard = self.in_flight.begin(key.to_string());

        let value = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        settings_repo::put(&self.pool, key, value.as_deref())?;
        tracing::debug!(key = %key, cleared = value.is_none(), "Setting updated");
        Ok(())
    }

    async fn update_post_process_base_url(
        &self,
        provider_id: &str,
        base_url: &str,
    ) -> Result<(), AppError> {
        validation::require_valid_id("provider_id", provider_id)?;
        let _guard = self.in_flight.begin(operation_key(OP_BASE_URL, provider_id));

        let base_url = base_url.trim();
        validation::require_http_url("base_url", base_url)?;
        provider_repo::update_base_url(&self.pool, provider_id, base_url)?;
        tracing::info!(provider_id = %provider_id, "Post-process base URL updated");
        Ok(())
    }

    async fn update_post_process_api_key(
        &self,
        provider_id: &str,
        api_key: &str,
    ) -> Result<(), AppError> {
        validation::require_valid_id("provider_id", provider_id)?;
        let _guard = self.in_flight.begin(operation_key(OP_API_KEY, provider_id));

        provider_repo::set_api_key(&self.pool, provider_id, api_key.trim())?;
        // Never log the key itself.
        tracing::info!(provider_id = %provider_id, "Post-process API key updated");
        Ok(())
    }

    async fn update_post_process_model(
        &self,
        provider_id: &str,
        model: &str,
    ) -> Result<(), AppError> {
        validation::require_valid_id("provider_id", provider_id)?;
        let _guard = self.in_flight.begin(operation_key(OP_MODEL, provider_id));

        provider_repo::set_model(&self.pool, provider_id, model.trim())?;
        tracing::info!(provider_id = %provider_id, model = %model.trim(), "Post-process model updated");
        Ok(())
    }

    async fn set_post_process_provider(&self, provider_id: &str) -> Result<(), AppError> {
        validation::require_valid_id("provider_id", provider_id)?;
        let _guard = self.in_flight.begin(operation_key(OP_SET_PROVIDER, provider_id));

        // Rejects unknown ids so the stored selection always names a real provider.
        provider_repo::get_by_id(&self.pool, provider_id)?;
        settings_repo::set(&self.pool, settings_keys::POST_PROCESS_PROVIDER_ID, provider_id)?;
        tracing::info!(provider_id = %provider_id, "Post-process provider selected");
        Ok(())
    }

    async fn fetch_post_process_models(&self, provider_id: &str) -> Result<Vec<String>, AppError> {
        validation::require_valid_id("provider_id", provider_id)?;
        let _guard = self.in_flight.begin(operation_key(OP_FETCH_MODELS, provider_id));

        let provider = provider_repo::get_by_id(&self.pool, provider_id)?;
        let models = match model_list::static_models(&provider.id) {
            Some(models) => models,
            None => {
                let api_key = provider_repo::api_keys(&self.pool)?
                    .remove(&provider.id)
                    .unwrap_or_default();
                self.lister.list_models(&provider, &api_key).await?
            }
        };

        // No request-id guarding: a slower, older fetch overwrites a newer one.
        provider_repo::set_cached_models(&self.pool, &provider.id, &models)?;
        Ok(models)
    }
}
