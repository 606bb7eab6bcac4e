//! Post-processing provider panel.
//!
//! [`PostProcessPanel`] owns the local UI state (requested provider, Apple
//! advisory flag, Bedrock edit buffers) over a [`SettingsStore`]. Every
//! derived value is recomputed from the latest snapshot; writes go to the
//! store as fire-and-forget tasks on the tokio runtime.
//!
//! Writes are applied to the local snapshot optimistically so the form and
//! the no-op checks see the new value before the store confirms it. A write
//! the store rejects queues a revert; the next call that drives the panel
//! (any edit, selection, `refresh` or `settle`) restores the previous value,
//! so retrying the same input writes again.

pub mod buffer;
pub mod fields;
pub mod models;
pub mod selector;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio_util::task::TaskTracker;

use crate::capability::CapabilityProbe;
use crate::catalog;
use crate::db::models::SettingsSnapshot;
use crate::db::settings_keys;
use crate::error::AppError;
use crate::store::{operation_key, SettingsStore, OP_FETCH_MODELS};

use buffer::EditBuffer;
use fields::{changed_value, ProjectionInputs, ProviderFields};
use selector::{ProviderKind, ProviderSelection};

/// Buffered Bedrock text fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BedrockField {
    ProfileName,
    Region,
    CustomModelId,
}

impl BedrockField {
    fn setting_key(self) -> &'static str {
        match self {
            BedrockField::ProfileName => settings_keys::BEDROCK_PROFILE_NAME,
            BedrockField::Region => settings_keys::BEDROCK_REGION,
            BedrockField::CustomModelId => settings_keys::BEDROCK_CUSTOM_MODEL_ID,
        }
    }
}

#[derive(Debug, Default)]
struct BedrockBuffers {
    profile_name: EditBuffer,
    region: EditBuffer,
    custom_model_id: EditBuffer,
}

impl BedrockBuffers {
    fn from_snapshot(snapshot: &SettingsSnapshot) -> Self {
        let bedrock = &snapshot.bedrock;
        Self {
            profile_name: EditBuffer::new(bedrock.profile_name.as_deref().unwrap_or("")),
            region: EditBuffer::new(&bedrock.region),
            custom_model_id: EditBuffer::new(&bedrock.custom_model_id),
        }
    }

    fn sync(&mut self, snapshot: &SettingsSnapshot) {
        let bedrock = &snapshot.bedrock;
        self.profile_name
            .sync(bedrock.profile_name.as_deref().unwrap_or(""));
        self.region.sync(&bedrock.region);
        self.custom_model_id.sync(&bedrock.custom_model_id);
    }

    fn get_mut(&mut self, field: BedrockField) -> &mut EditBuffer {
        match field {
            BedrockField::ProfileName => &mut self.profile_name,
            BedrockField::Region => &mut self.region,
            BedrockField::CustomModelId => &mut self.custom_model_id,
        }
    }
}

/// Local value to restore when an optimistic write fails. Applied only if
/// the field still holds `attempted`; a newer edit wins.
#[derive(Clone, PartialEq, Eq)]
enum Revert {
    BaseUrl {
        provider_id: String,
        attempted: String,
        previous: Option<String>,
    },
    ApiKey {
        provider_id: String,
        attempted: String,
        previous: Option<String>,
    },
    Model {
        provider_id: String,
        attempted: String,
        previous: Option<String>,
    },
    Bedrock {
        field: BedrockField,
        attempted: String,
        previous: String,
    },
    BedrockModel {
        attempted: String,
        previous: String,
    },
}

type RevertQueue = Arc<Mutex<Vec<Revert>>>;

pub struct PostProcessPanel {
    store: Arc<dyn SettingsStore>,
    probe: Arc<dyn CapabilityProbe>,
    tasks: TaskTracker,
    reverts: RevertQueue,
    snapshot: SettingsSnapshot,
    requested_provider_id: Option<String>,
    apple_unavailable: bool,
    bedrock: BedrockBuffers,
}

impl PostProcessPanel {
    pub fn new(store: Arc<dyn SettingsStore>, probe: Arc<dyn CapabilityProbe>) -> Self {
        let snapshot = read_snapshot(store.as_ref()).unwrap_or_default();
        let bedrock = BedrockBuffers::from_snapshot(&snapshot);
        Self {
            store,
            probe,
            tasks: TaskTracker::new(),
            reverts: RevertQueue::default(),
            snapshot,
            requested_provider_id: None,
            apple_unavailable: false,
            bedrock,
        }
    }

    /// Re-read the store after an external change. Buffers follow values
    /// that changed underneath them; unchanged ones keep local edits.
    pub fn refresh(&mut self) {
        self.apply_reverts();
        if let Some(snapshot) = read_snapshot(self.store.as_ref()) {
            self.bedrock.sync(&snapshot);
            self.snapshot = snapshot;
        }
    }

    pub fn snapshot(&self) -> &SettingsSnapshot {
        &self.snapshot
    }

    pub fn selection(&self) -> ProviderSelection {
        selector::resolve(&self.snapshot, self.requested_provider_id.as_deref())
    }

    pub fn apple_unavailable(&self) -> bool {
        self.apple_unavailable
    }

    pub fn is_fetching_models(&self) -> bool {
        let id = self.selection().selected_provider_id;
        self.store
            .is_updating(&operation_key(OP_FETCH_MODELS, &id))
    }

    /// Values for the active variant's form.
    pub fn fields(&self) -> ProviderFields {
        let selection = self.selection();
        let inputs = ProjectionInputs {
            apple_unavailable: self.apple_unavailable,
            models_loading: self
                .store
                .is_updating(&operation_key(OP_FETCH_MODELS, &selection.selected_provider_id)),
            bedrock_profile_name: self.bedrock.profile_name.value(),
            bedrock_region: self.bedrock.region.value(),
            bedrock_custom_model_id: self.bedrock.custom_model_id.value(),
        };
        fields::project(&self.snapshot, &selection, inputs)
    }

    /// Wait until every spawned write and refresh has finished, then roll
    /// back whatever the store rejected.
    pub async fn settle(&mut self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
        self.apply_reverts();
    }

    // ── Provider selection ────────────────────────────────────────────

    /// Switch to `provider_id`.
    ///
    /// Selecting Apple awaits the capability probe first; an unavailable
    /// result only raises the advisory flag. The new id is then persisted,
    /// and a configured non-Apple provider gets a model-list refresh.
    pub async fn select_provider(&mut self, provider_id: &str) {
        self.apply_reverts();
        if provider_id == self.selection().selected_provider_id {
            return;
        }
        if self.snapshot.provider(provider_id).is_none() {
            tracing::warn!(provider_id = %provider_id, "Ignoring selection of unknown provider");
            return;
        }

        let kind = ProviderKind::of(provider_id);
        if kind == ProviderKind::Apple {
            let available = self.probe.check_apple_intelligence_available().await;
            if !available {
                tracing::info!("Apple Intelligence unavailable on this device");
            }
            self.apple_unavailable = !available;
        } else {
            self.apple_unavailable = false;
        }

        self.requested_provider_id = Some(provider_id.to_string());
        self.snapshot.post_process_provider_id = Some(provider_id.to_string());

        let id = provider_id.to_string();
        let store = self.store.clone();
        self.dispatch("set_post_process_provider", None, async move {
            store.set_post_process_provider(&id).await
        });

        if kind != ProviderKind::Apple && selector::is_configured(&self.snapshot, provider_id) {
            self.refresh_models();
        }
    }

    /// Fire a model-list refresh for the active provider.
    pub fn refresh_models(&self) {
        let id = self.selection().selected_provider_id;
        let store = self.store.clone();
        self.dispatch("fetch_post_process_models", None, async move {
            store.fetch_post_process_models(&id).await.map(|_| ())
        });
    }

    // ── Standard / custom fields ──────────────────────────────────────

    /// Commit a base URL edit. Only the custom provider accepts one.
    pub fn set_base_url(&mut self, value: &str) {
        self.apply_reverts();
        let selection = self.selection();
        if !selection.is_custom() {
            tracing::debug!(provider_id = %selection.selected_provider_id, "Base URL is not editable");
            return;
        }
        let id = selection.selected_provider_id;
        let Some(value) = changed_value(self.snapshot.base_url(&id), value) else {
            return;
        };

        let Some(provider) = self
            .snapshot
            .post_process_providers
            .iter_mut()
            .find(|p| p.id == id)
        else {
            return;
        };
        let revert = Revert::BaseUrl {
            provider_id: id.clone(),
            attempted: value.clone(),
            previous: provider.base_url.replace(value.clone()),
        };

        let store = self.store.clone();
        self.dispatch("update_post_process_base_url", Some(revert), async move {
            store.update_post_process_base_url(&id, &value).await
        });
    }

    pub fn set_api_key(&mut self, value: &str) {
        self.apply_reverts();
        let selection = self.selection();
        if !matches!(selection.kind, ProviderKind::Custom | ProviderKind::Standard) {
            return;
        }
        let id = selection.selected_provider_id;
        let Some(value) = changed_value(self.snapshot.api_key(&id), value) else {
            return;
        };

        let revert = Revert::ApiKey {
            provider_id: id.clone(),
            attempted: value.clone(),
            previous: self
                .snapshot
                .post_process_api_keys
                .insert(id.clone(), value.clone()),
        };

        let store = self.store.clone();
        self.dispatch("update_post_process_api_key", Some(revert), async move {
            store.update_post_process_api_key(&id, &value).await
        });
    }

    pub fn set_model(&mut self, value: &str) {
        self.apply_reverts();
        let selection = self.selection();
        if !matches!(selection.kind, ProviderKind::Custom | ProviderKind::Standard) {
            return;
        }
        let id = selection.selected_provider_id;
        let Some(value) = changed_value(self.snapshot.model(&id), value) else {
            return;
        };

        let revert = Revert::Model {
            provider_id: id.clone(),
            attempted: value.clone(),
            previous: self
                .snapshot
                .post_process_models
                .insert(id.clone(), value.clone()),
        };

        let store = self.store.clone();
        self.dispatch("update_post_process_model", Some(revert), async move {
            store.update_post_process_model(&id, &value).await
        });
    }

    // ── Bedrock fields ────────────────────────────────────────────────

    /// Keystroke in a Bedrock text field. Buffered only.
    pub fn edit_bedrock_field(&mut self, field: BedrockField, text: &str) {
        self.bedrock.get_mut(field).edit(text);
    }

    /// Blur of a Bedrock text field: writes the buffered value if it changed.
    /// An empty value clears the setting.
    pub fn commit_bedrock_field(&mut self, field: BedrockField) {
        self.apply_reverts();
        let Some(value) = self.bedrock.get_mut(field).commit() else {
            return;
        };

        let previous = bedrock_value(&self.snapshot, field);
        set_bedrock_value(&mut self.snapshot, field, &value);
        let attempted = bedrock_value(&self.snapshot, field);
        // Keep the buffer's external value in step with a defaulted region so
        // the next refresh is not mistaken for an outside change.
        if attempted != value {
            self.bedrock.get_mut(field).sync(&attempted);
        }
        let revert = Revert::Bedrock {
            field,
            attempted,
            previous,
        };

        let key = field.setting_key();
        let store = self.store.clone();
        let value = Some(value).filter(|v| !v.is_empty());
        self.dispatch("update_setting", Some(revert), async move {
            store.update_setting(key, value).await
        });
    }

    /// Pick from the fixed Bedrock list, or the custom sentinel to reveal the
    /// free-form model field.
    pub fn select_bedrock_model(&mut self, model_id: &str) {
        self.apply_reverts();
        let model_id = model_id.trim();
        if model_id != catalog::BEDROCK_CUSTOM_MODEL && !catalog::is_known_bedrock_model(model_id) {
            tracing::warn!(model_id = %model_id, "Ignoring unknown Bedrock model");
            return;
        }
        if model_id == self.snapshot.bedrock.model_id {
            return;
        }

        let revert = Revert::BedrockModel {
            attempted: model_id.to_string(),
            previous: std::mem::replace(&mut self.snapshot.bedrock.model_id, model_id.to_string()),
        };

        let store = self.store.clone();
        let value = model_id.to_string();
        self.dispatch("update_setting", Some(revert), async move {
            store
                .update_setting(settings_keys::BEDROCK_MODEL_ID, Some(value))
                .await
        });
    }

    // ── Internals ─────────────────────────────────────────────────────

    /// Spawn a store call without awaiting it. Failures are logged and
    /// queue `revert` for the next call that drives the panel.
    fn dispatch<F>(&self, operation: &'static str, revert: Option<Revert>, fut: F)
    where
        F: Future<Output = Result<(), AppError>> + Send + 'static,
    {
        let reverts = self.reverts.clone();
        self.tasks.spawn(async move {
            if let Err(e) = fut.await {
                tracing::warn!(operation, error = %e, "Settings update failed");
                if let Some(revert) = revert {
                    reverts
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .push(revert);
                }
            }
        });
    }

    fn apply_reverts(&mut self) {
        let pending = std::mem::take(&mut *self.reverts.lock().unwrap_or_else(|e| e.into_inner()));
        for revert in pending {
            self.apply_revert(revert);
        }
    }

    fn apply_revert(&mut self, revert: Revert) {
        match revert {
            Revert::BaseUrl {
                provider_id,
                attempted,
                previous,
            } => {
                if let Some(provider) = self
                    .snapshot
                    .post_process_providers
                    .iter_mut()
                    .find(|p| p.id == provider_id)
                    .filter(|p| p.base_url.as_deref() == Some(attempted.as_str()))
                {
                    provider.base_url = previous;
                }
            }
            Revert::ApiKey {
                provider_id,
                attempted,
                previous,
            } => restore_entry(
                &mut self.snapshot.post_process_api_keys,
                provider_id,
                &attempted,
                previous,
            ),
            Revert::Model {
                provider_id,
                attempted,
                previous,
            } => restore_entry(
                &mut self.snapshot.post_process_models,
                provider_id,
                &attempted,
                previous,
            ),
            Revert::Bedrock {
                field,
                attempted,
                previous,
            } => {
                if bedrock_value(&self.snapshot, field) == attempted {
                    set_bedrock_value(&mut self.snapshot, field, &previous);
                    self.bedrock.get_mut(field).revert(&previous);
                }
            }
            Revert::BedrockModel {
                attempted,
                previous,
            } => {
                if self.snapshot.bedrock.model_id == attempted {
                    self.snapshot.bedrock.model_id = previous;
                }
            }
        }
    }
}

fn restore_entry(
    map: &mut HashMap<String, String>,
    provider_id: String,
    attempted: &str,
    previous: Option<String>,
) {
    if map.get(&provider_id).map(String::as_str) != Some(attempted) {
        return;
    }
    match previous {
        Some(value) => {
            map.insert(provider_id, value);
        }
        None => {
            map.remove(&provider_id);
        }
    }
}

/// Snapshot value of a buffered Bedrock field, in buffer form.
fn bedrock_value(snapshot: &SettingsSnapshot, field: BedrockField) -> String {
    let bedrock = &snapshot.bedrock;
    match field {
        BedrockField::ProfileName => bedrock.profile_name.clone().unwrap_or_default(),
        BedrockField::Region => bedrock.region.clone(),
        BedrockField::CustomModelId => bedrock.custom_model_id.clone(),
    }
}

/// Apply a committed Bedrock value: empty clears the profile and resets the
/// region to its default.
fn set_bedrock_value(snapshot: &mut SettingsSnapshot, field: BedrockField, value: &str) {
    let bedrock = &mut snapshot.bedrock;
    match field {
        BedrockField::ProfileName => {
            bedrock.profile_name = Some(value.to_string()).filter(|v| !v.is_empty())
        }
        BedrockField::Region if value.is_empty() => {
            bedrock.region = catalog::BEDROCK_DEFAULT_REGION.to_string()
        }
        BedrockField::Region => bedrock.region = value.to_string(),
        BedrockField::CustomModelId => bedrock.custom_model_id = value.to_string(),
    }
}

fn read_snapshot(store: &dyn SettingsStore) -> Option<SettingsSnapshot> {
    match store.snapshot() {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read settings snapshot");
            None
        }
    }
}

#[cfg(test)]
mod fakes;
