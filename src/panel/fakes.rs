//! In-memory collaborators for panel tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::capability::CapabilityProbe;
use crate::catalog;
use crate::db::models::SettingsSnapshot;
use crate::db::settings_keys;
use crate::error::AppError;
use crate::store::{operation_key, SettingsStore, OP_FETCH_MODELS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Setting(String, Option<String>),
    BaseUrl(String, String),
    ApiKey(String, String),
    Model(String, String),
    Provider(String),
    FetchModels(String),
}

/// Scripted response for one `fetch_post_process_models` call.
pub struct FetchReply {
    pub delay: Duration,
    pub models: Vec<String>,
}

pub struct RecordingStore {
    snapshot: Mutex<SettingsSnapshot>,
    calls: Mutex<Vec<Call>>,
    replies: Mutex<VecDeque<FetchReply>>,
    fetching: Mutex<HashMap<String, usize>>,
    fail_writes: AtomicBool,
}

impl RecordingStore {
    pub fn new(snapshot: SettingsSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            calls: Mutex::new(Vec::new()),
            replies: Mutex::new(VecDeque::new()),
            fetching: Mutex::new(HashMap::new()),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Snapshot with the built-in catalog and nothing configured.
    pub fn with_catalog() -> Self {
        Self::new(SettingsSnapshot {
            post_process_providers: catalog::builtin_providers(),
            ..Default::default()
        })
    }

    pub fn failing(self) -> Self {
        self.set_failing(true);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    pub fn push_reply(&self, delay_ms: u64, models: &[&str]) {
        self.replies.lock().unwrap().push_back(FetchReply {
            delay: Duration::from_millis(delay_ms),
            models: models.iter().map(|m| m.to_string()).collect(),
        });
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn edit(&self, f: impl FnOnce(&mut SettingsSnapshot)) {
        f(&mut self.snapshot.lock().unwrap());
    }

    fn record(&self, call: Call) -> Result<(), AppError> {
        self.calls.lock().unwrap().push(call);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Internal("store offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for RecordingStore {
    fn snapshot(&self) -> Result<SettingsSnapshot, AppError> {
        Ok(self.snapshot.lock().unwrap().clone())
    }

    fn get_setting(&self, key: &str) -> Result<Option<String>, AppError> {
        let snap = self.snapshot.lock().unwrap();
        Ok(match key {
            settings_keys::POST_PROCESS_PROVIDER_ID => snap.post_process_provider_id.clone(),
            settings_keys::BEDROCK_REGION => Some(snap.bedrock.region.clone()),
            _ => None,
        })
    }

    fn is_updating(&self, operation_key: &str) -> bool {
        self.fetching.lock().unwrap().contains_key(operation_key)
    }

    async fn update_setting(&self, key: &str, value: Option<String>) -> Result<(), AppError> {
        self.record(Call::Setting(key.into(), value.clone()))?;
        let mut snap = self.snapshot.lock().unwrap();
        match key {
            settings_keys::BEDROCK_PROFILE_NAME => snap.bedrock.profile_name = value,
            settings_keys::BEDROCK_REGION => {
                snap.bedrock.region =
                    value.unwrap_or_else(|| catalog::BEDROCK_DEFAULT_REGION.into())
            }
            settings_keys::BEDROCK_MODEL_ID => {
                snap.bedrock.model_id = value.unwrap_or_default()
            }
            settings_keys::BEDROCK_CUSTOM_MODEL_ID => {
                snap.bedrock.custom_model_id = value.unwrap_or_default()
            }
            _ => {}
        }
        Ok(())
    }

    async fn update_post_process_base_url(
        &self,
        provider_id: &str,
        base_url: &str,
    ) -> Result<(), AppError> {
        self.record(Call::BaseUrl(provider_id.into(), base_url.into()))?;
        let mut snap = self.snapshot.lock().unwrap();
        if let Some(p) = snap
            .post_process_providers
            .iter_mut()
            .find(|p| p.id == provider_id)
        {
            p.base_url = Some(base_url.into());
        }
        Ok(())
    }

    async fn update_post_process_api_key(
        &self,
        provider_id: &str,
        api_key: &str,
    ) -> Result<(), AppError> {
        self.record(Call::ApiKey(provider_id.into(), api_key.into()))?;
        self.snapshot
            .lock()
            .unwrap()
            .post_process_api_keys
            .insert(provider_id.into(), api_key.into());
        Ok(())
    }

    async fn update_post_process_model(
        &self,
        provider_id: &str,
        model: &str,
    ) -> Result<(), AppError> {
        self.record(Call::Model(provider_id.into(), model.into()))?;
        self.snapshot
            .lock()
            .unwrap()
            .post_process_models
            .insert(provider_id.into(), model.into());
        Ok(())
    }

    async fn set_post_process_provider(&self, provider_id: &str) -> Result<(), AppError> {
        self.record(Call::Provider(provider_id.into()))?;
        self.snapshot.lock().unwrap().post_process_provider_id = Some(provider_id.into());
        Ok(())
    }

    async fn fetch_post_process_models(&self, provider_id: &str) -> Result<Vec<String>, AppError> {
        self.record(Call::FetchModels(provider_id.into()))?;
        let reply = self.replies.lock().unwrap().pop_front();
        let Some(reply) = reply else {
            return Ok(Vec::new());
        };
        let key = operation_key(OP_FETCH_MODELS, provider_id);
        *self.fetching.lock().unwrap().entry(key.clone()).or_insert(0) += 1;
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        {
            let mut fetching = self.fetching.lock().unwrap();
            if let Some(count) = fetching.get_mut(&key) {
                *count -= 1;
                if *count == 0 {
                    fetching.remove(&key);
                }
            }
        }
        self.snapshot
            .lock()
            .unwrap()
            .post_process_model_options
            .insert(provider_id.into(), reply.models.clone());
        Ok(reply.models)
    }
}

/// Probe with a fixed answer that counts how often it was asked.
pub struct FixedProbe {
    pub available: bool,
    pub checks: Mutex<usize>,
}

impl FixedProbe {
    pub fn new(available: bool) -> Self {
        Self {
            available,
            checks: Mutex::new(0),
        }
    }

    pub fn checks(&self) -> usize {
        *self.checks.lock().unwrap()
    }
}

#[async_trait]
impl CapabilityProbe for FixedProbe {
    async fn check_apple_intelligence_available(&self) -> bool {
        *self.checks.lock().unwrap() += 1;
        self.available
    }
}

/// Provider ids each recorded fetch targeted.
pub fn fetched(calls: &[Call]) -> Vec<&str> {
    calls
        .iter()
        .filter_map(|c| match c {
            Call::FetchModels(id) => Some(id.as_str()),
            _ => None,
        })
        .collect()
}

pub fn snapshot_with_keys(keys: &[(&str, &str)]) -> SettingsSnapshot {
    let mut snap = SettingsSnapshot {
        post_process_providers: catalog::builtin_providers(),
        ..Default::default()
    };
    for (id, key) in keys {
        snap.post_process_api_keys.insert(id.to_string(), key.to_string());
    }
    snap
}
