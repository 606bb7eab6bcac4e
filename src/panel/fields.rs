//! Editable field values for each provider variant.

use serde::Serialize;
use ts_rs::TS;

use super::models::{bedrock_model_options, merge_model_options};
use super::selector::{ProviderKind, ProviderSelection};
use crate::catalog;
use crate::db::models::{ModelOption, SettingsSnapshot};

/// Fields for OpenAI-compatible endpoints (custom and hosted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct EndpointFields {
    pub provider_id: String,
    pub base_url: String,
    /// Only the custom provider exposes an editable base URL.
    pub base_url_editable: bool,
    pub api_key: String,
    pub model: String,
    pub model_options: Vec<ModelOption>,
    pub models_loading: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AppleFields {
    pub model: String,
    /// Advisory only: the provider stays selectable.
    pub unavailable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BedrockFields {
    /// Buffered values, as currently typed.
    pub profile_name: String,
    pub region: String,
    pub custom_model_id: String,
    pub model_id: String,
    pub show_custom_model: bool,
    pub model_options: Vec<ModelOption>,
}

/// Per-variant projection of the settings. Each variant carries only what
/// its form renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(tag = "variant", content = "fields", rename_all = "camelCase")]
pub enum ProviderFields {
    Apple(AppleFields),
    Bedrock(BedrockFields),
    Custom(EndpointFields),
    Standard(EndpointFields),
}

/// Local state the projection needs beyond the snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectionInputs<'a> {
    pub apple_unavailable: bool,
    pub models_loading: bool,
    pub bedrock_profile_name: &'a str,
    pub bedrock_region: &'a str,
    pub bedrock_custom_model_id: &'a str,
}

pub fn project(
    snapshot: &SettingsSnapshot,
    selection: &ProviderSelection,
    inputs: ProjectionInputs<'_>,
) -> ProviderFields {
    let id = selection.selected_provider_id.as_str();

    match selection.kind {
        ProviderKind::Apple => {
            let model = match snapshot.model(id) {
                "" => catalog::APPLE_INTELLIGENCE_DEFAULT_MODEL_ID,
                stored => stored,
            };
            ProviderFields::Apple(AppleFields {
                model: model.to_string(),
                unavailable: inputs.apple_unavailable,
            })
        }
        ProviderKind::Bedrock => {
            let model_id = snapshot.bedrock.model_id.clone();
            ProviderFields::Bedrock(BedrockFields {
                profile_name: inputs.bedrock_profile_name.to_string(),
                region: inputs.bedrock_region.to_string(),
                custom_model_id: inputs.bedrock_custom_model_id.to_string(),
                show_custom_model: model_id == catalog::BEDROCK_CUSTOM_MODEL,
                model_id,
                model_options: bedrock_model_options(),
            })
        }
        ProviderKind::Custom => ProviderFields::Custom(endpoint(snapshot, id, true, inputs)),
        ProviderKind::Standard => ProviderFields::Standard(endpoint(snapshot, id, false, inputs)),
    }
}

fn endpoint(
    snapshot: &SettingsSnapshot,
    provider_id: &str,
    base_url_editable: bool,
    inputs: ProjectionInputs<'_>,
) -> EndpointFields {
    let model = snapshot.model(provider_id);
    EndpointFields {
        provider_id: provider_id.to_string(),
        base_url: snapshot.base_url(provider_id).to_string(),
        base_url_editable,
        api_key: snapshot.api_key(provider_id).to_string(),
        model: model.to_string(),
        model_options: merge_model_options(snapshot.fetched_models(provider_id), model),
        models_loading: inputs.models_loading,
    }
}

/// The trimmed candidate when it differs from the stored value, `None` for
/// a no-op edit.
pub fn changed_value(current: &str, candidate: &str) -> Option<String> {
    let candidate = candidate.trim();
    if candidate == current.trim() {
        None
    } else {
        Some(candidate.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::selector::resolve;

    fn snapshot() -> SettingsSnapshot {
        let mut snap = SettingsSnapshot {
            post_process_providers: catalog::builtin_providers(),
            ..Default::default()
        };
        snap.post_process_api_keys.insert("openai".into(), "sk-1".into());
        snap.post_process_models.insert("openai".into(), "gpt-4o".into());
        snap.post_process_model_options
            .insert("openai".into(), vec!["o3".into(), "o3".into()]);
        snap.post_process_model_options
            .insert("bedrock".into(), vec!["fetched-should-not-show".into()]);
        snap
    }

    #[test]
    fn test_standard_projection() {
        let snap = snapshot();
        let sel = resolve(&snap, Some("openai"));
        let ProviderFields::Standard(fields) = project(&snap, &sel, ProjectionInputs::default())
        else {
            panic!("expected standard variant");
        };
        assert_eq!(fields.base_url, "https://api.openai.com/v1");
        assert!(!fields.base_url_editable);
        assert_eq!(fields.api_key, "sk-1");
        assert_eq!(fields.model, "gpt-4o");
        let values: Vec<_> = fields.model_options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, vec!["o3", "gpt-4o"]);
    }

    #[test]
    fn test_custom_projection_is_editable() {
        let snap = snapshot();
        let sel = resolve(&snap, Some("custom"));
        let ProviderFields::Custom(fields) = project(&snap, &sel, ProjectionInputs::default())
        else {
            panic!("expected custom variant");
        };
        assert!(fields.base_url_editable);
        assert_eq!(fields.base_url, "http://localhost:11434/v1");
        assert_eq!(fields.api_key, "");
        assert!(fields.model_options.is_empty());
    }

    #[test]
    fn test_bedrock_ignores_fetched_models() {
        let snap = snapshot();
        let sel = resolve(&snap, Some("bedrock"));
        let inputs = ProjectionInputs {
            bedrock_region: "eu-central-1",
            ..Default::default()
        };
        let ProviderFields::Bedrock(fields) = project(&snap, &sel, inputs) else {
            panic!("expected bedrock variant");
        };
        assert_eq!(fields.model_options, bedrock_model_options());
        assert_eq!(fields.region, "eu-central-1");
        assert!(!fields.show_custom_model);
    }

    #[test]
    fn test_apple_projection_carries_advisory() {
        let snap = snapshot();
        let sel = resolve(&snap, Some("apple_intelligence"));
        let inputs = ProjectionInputs {
            apple_unavailable: true,
            ..Default::default()
        };
        assert_eq!(
            project(&snap, &sel, inputs),
            ProviderFields::Apple(AppleFields {
                model: catalog::APPLE_INTELLIGENCE_DEFAULT_MODEL_ID.into(),
                unavailable: true,
            })
        );
    }

    #[test]
    fn test_changed_value() {
        assert_eq!(changed_value("sk-1", "  sk-1 "), None);
        assert_eq!(changed_value("", "   "), None);
        assert_eq!(changed_value("sk-1", " sk-2").as_deref(), Some("sk-2"));
        assert_eq!(changed_value("sk-1", "").as_deref(), Some(""));
    }

    #[test]
    fn test_serializes_tagged() {
        let json = serde_json::to_value(ProviderFields::Apple(AppleFields {
            model: "Apple Intelligence".into(),
            unavailable: false,
        }))
        .unwrap();
        assert_eq!(json["variant"], "apple");
        assert_eq!(json["fields"]["unavailable"], false);
    }
}
