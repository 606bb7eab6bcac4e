use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::catalog;

// ============================================================================
// Post-processing providers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProviderConfig {
    pub id: String,
    pub label: String,
    pub base_url: Option<String>,
    #[serde(default)]
    pub allow_base_url_edit: bool,
    /// Path appended to the base URL to list models. `None` means the
    /// provider cannot list models over HTTP.
    #[serde(default)]
    pub models_endpoint: Option<String>,
}

// ============================================================================
// Bedrock
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BedrockSettings {
    /// AWS shared-config profile. `None` uses the default credential chain.
    pub profile_name: Option<String>,
    pub region: String,
    /// One of the enumerated Bedrock models, or `catalog::BEDROCK_CUSTOM_MODEL`.
    pub model_id: String,
    pub custom_model_id: String,
}

impl Default for BedrockSettings {
    fn default() -> Self {
        Self {
            profile_name: None,
            region: catalog::BEDROCK_DEFAULT_REGION.into(),
            model_id: catalog::BEDROCK_DEFAULT_MODEL_ID.into(),
            custom_model_id: String::new(),
        }
    }
}

impl BedrockSettings {
    /// Model id actually sent to Bedrock: the custom id when the sentinel is selected.
    pub fn effective_model_id(&self) -> &str {
        if self.model_id == catalog::BEDROCK_CUSTOM_MODEL {
            self.custom_model_id.trim()
        } else {
            &self.model_id
        }
    }
}

// ============================================================================
// Settings snapshot
// ============================================================================

/// Point-in-time copy of every setting the post-processing panel reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SettingsSnapshot {
    pub post_process_providers: Vec<ProviderConfig>,
    pub post_process_provider_id: Option<String>,
    #[serde(default)]
    pub post_process_api_keys: HashMap<String, String>,
    #[serde(default)]
    pub post_process_models: HashMap<String, String>,
    /// Last fetched raw model list per provider.
    #[serde(default)]
    pub post_process_model_options: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub bedrock: BedrockSettings,
}

impl SettingsSnapshot {
    pub fn provider(&self, provider_id: &str) -> Option<&ProviderConfig> {
        self.post_process_providers
            .iter()
            .find(|p| p.id == provider_id)
    }

    /// Stored API key, empty when unset.
    pub fn api_key(&self, provider_id: &str) -> &str {
        self.post_process_api_keys
            .get(provider_id)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Stored model, empty when unset.
    pub fn model(&self, provider_id: &str) -> &str {
        self.post_process_models
            .get(provider_id)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Base URL of the provider, empty when the provider is unknown or has none.
    pub fn base_url(&self, provider_id: &str) -> &str {
        self.provider(provider_id)
            .and_then(|p| p.base_url.as_deref())
            .unwrap_or("")
    }

    pub fn fetched_models(&self, provider_id: &str) -> &[String] {
        self.post_process_model_options
            .get(provider_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

// ============================================================================
// Dropdown options
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ModelOption {
    pub value: String,
    pub label: String,
}

impl ModelOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}
