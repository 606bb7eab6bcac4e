//! Built-in post-processing providers and the fixed Bedrock model list.

use crate::db::models::ProviderConfig;

pub const OPENAI_PROVIDER_ID: &str = "openai";
pub const APPLE_INTELLIGENCE_PROVIDER_ID: &str = "apple_intelligence";
pub const BEDROCK_PROVIDER_ID: &str = "bedrock";
pub const CUSTOM_PROVIDER_ID: &str = "custom";

/// Used when neither the request, the stored selection nor the provider list
/// yields an id.
pub const FALLBACK_PROVIDER_ID: &str = OPENAI_PROVIDER_ID;

/// The only model Apple's on-device provider exposes.
pub const APPLE_INTELLIGENCE_DEFAULT_MODEL_ID: &str = "Apple Intelligence";

/// Dropdown value that reveals the free-form Bedrock model field.
pub const BEDROCK_CUSTOM_MODEL: &str = "custom";

pub const BEDROCK_DEFAULT_REGION: &str = "us-east-1";

/// (model id, display label) pairs offered for Bedrock, in dropdown order.
pub const BEDROCK_MODELS: &[(&str, &str)] = &[
    (
        "us.anthropic.claude-3-5-haiku-20241022-v1:0",
        "Claude 3.5 Haiku",
    ),
    (
        "us.anthropic.claude-3-7-sonnet-20250219-v1:0",
        "Claude 3.7 Sonnet",
    ),
    (
        "us.anthropic.claude-sonnet-4-20250514-v1:0",
        "Claude Sonnet 4",
    ),
    ("us.amazon.nova-micro-v1:0", "Amazon Nova Micro"),
    ("us.amazon.nova-lite-v1:0", "Amazon Nova Lite"),
    ("us.amazon.nova-pro-v1:0", "Amazon Nova Pro"),
    (
        "us.meta.llama3-3-70b-instruct-v1:0",
        "Llama 3.3 70B Instruct",
    ),
];

pub const BEDROCK_DEFAULT_MODEL_ID: &str = BEDROCK_MODELS[0].0;

/// Whether `model_id` is one of the enumerated Bedrock models.
pub fn is_known_bedrock_model(model_id: &str) -> bool {
    BEDROCK_MODELS.iter().any(|(id, _)| *id == model_id)
}

/// Default model stored for a freshly seeded provider.
pub fn default_model_for_provider(provider_id: &str) -> &'static str {
    match provider_id {
        APPLE_INTELLIGENCE_PROVIDER_ID => APPLE_INTELLIGENCE_DEFAULT_MODEL_ID,
        _ => "",
    }
}

/// Built-in providers in display order. Custom always comes last.
pub fn builtin_providers() -> Vec<ProviderConfig> {
    fn remote(id: &str, label: &str, base_url: &str) -> ProviderConfig {
        ProviderConfig {
            id: id.into(),
            label: label.into(),
            base_url: Some(base_url.into()),
            allow_base_url_edit: false,
            models_endpoint: Some("/models".into()),
        }
    }

    vec![
        remote(OPENAI_PROVIDER_ID, "OpenAI", "https://api.openai.com/v1"),
        remote("openrouter", "OpenRouter", "https://openrouter.ai/api/v1"),
        remote("anthropic", "Anthropic", "https://api.anthropic.com/v1"),
        remote("groq", "Groq", "https://api.groq.com/openai/v1"),
        remote("cerebras", "Cerebras", "https://api.cerebras.ai/v1"),
        ProviderConfig {
            id: APPLE_INTELLIGENCE_PROVIDER_ID.into(),
            label: "Apple Intelligence".into(),
            base_url: Some("apple-intelligence://local".into()),
            allow_base_url_edit: false,
            models_endpoint: None,
        },
        ProviderConfig {
            id: BEDROCK_PROVIDER_ID.into(),
            label: "AWS Bedrock".into(),
            base_url: None,
            allow_base_url_edit: false,
            models_endpoint: None,
        },
        ProviderConfig {
            id: CUSTOM_PROVIDER_ID.into(),
            label: "Custom".into(),
            base_url: Some("http://localhost:11434/v1".into()),
            allow_base_url_edit: true,
            models_endpoint: Some("/models".into()),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_is_last_and_only_editable() {
        let providers = builtin_providers();
        assert_eq!(providers.last().unwrap().id, CUSTOM_PROVIDER_ID);
        let editable: Vec<_> = providers
            .iter()
            .filter(|p| p.allow_base_url_edit)
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(editable, vec![CUSTOM_PROVIDER_ID]);
    }

    #[test]
    fn test_provider_ids_are_unique() {
        let providers = builtin_providers();
        let mut ids: Vec<_> = providers.iter().map(|p| p.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), providers.len());
    }

    #[test]
    fn test_bedrock_sentinel_is_not_a_model() {
        assert!(!is_known_bedrock_model(BEDROCK_CUSTOM_MODEL));
        assert!(is_known_bedrock_model(BEDROCK_DEFAULT_MODEL_ID));
    }
}
