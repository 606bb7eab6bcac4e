//! Which provider is active, and which UI variant it needs.

use crate::catalog;
use crate::db::models::{ProviderConfig, SettingsSnapshot};

/// UI variant of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Apple's on-device model: no credentials, fixed model.
    Apple,
    /// AWS Bedrock: profile / region / enumerated model.
    Bedrock,
    /// User-supplied OpenAI-compatible endpoint with an editable base URL.
    Custom,
    /// Hosted OpenAI-compatible endpoint with a fixed base URL.
    Standard,
}

impl ProviderKind {
    pub fn of(provider_id: &str) -> Self {
        match provider_id {
            catalog::APPLE_INTELLIGENCE_PROVIDER_ID => ProviderKind::Apple,
            catalog::BEDROCK_PROVIDER_ID => ProviderKind::Bedrock,
            catalog::CUSTOM_PROVIDER_ID => ProviderKind::Custom,
            _ => ProviderKind::Standard,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSelection {
    pub selected_provider_id: String,
    /// `None` only when the snapshot lists no providers at all.
    pub selected_provider: Option<ProviderConfig>,
    pub kind: ProviderKind,
}

impl ProviderSelection {
    pub fn is_apple(&self) -> bool {
        self.kind == ProviderKind::Apple
    }

    pub fn is_bedrock(&self) -> bool {
        self.kind == ProviderKind::Bedrock
    }

    pub fn is_custom(&self) -> bool {
        self.kind == ProviderKind::Custom
    }
}

/// Resolve the active provider.
///
/// Order: `requested` if the snapshot lists it, else the stored selection if
/// the snapshot lists it, else the first provider, else the fallback id.
pub fn resolve(snapshot: &SettingsSnapshot, requested: Option<&str>) -> ProviderSelection {
    let listed = |id: &&str| snapshot.provider(id).is_some();

    let selected_provider_id = requested
        .filter(listed)
        .or_else(|| snapshot.post_process_provider_id.as_deref().filter(listed))
        .or_else(|| snapshot.post_process_providers.first().map(|p| p.id.as_str()))
        .unwrap_or(catalog::FALLBACK_PROVIDER_ID)
        .to_string();

    ProviderSelection {
        selected_provider: snapshot.provider(&selected_provider_id).cloned(),
        kind: ProviderKind::of(&selected_provider_id),
        selected_provider_id,
    }
}

/// A provider is configured once it can be reached: the custom provider
/// needs a base URL, every other provider an API key.
pub fn is_configured(snapshot: &SettingsSnapshot, provider_id: &str) -> bool {
    match ProviderKind::of(provider_id) {
        ProviderKind::Custom => !snapshot.base_url(provider_id).trim().is_empty(),
        _ => !snapshot.api_key(provider_id).trim().is_empty(),
    }
}
