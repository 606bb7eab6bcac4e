//! Model-list fetching for OpenAI-compatible providers.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::catalog;
use crate::db::models::ProviderConfig;
use crate::error::AppError;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Lists the model identifiers a provider currently serves.
#[async_trait]
pub trait ModelLister: Send + Sync {
    async fn list_models(
        &self,
        provider: &ProviderConfig,
        api_key: &str,
    ) -> Result<Vec<String>, AppError>;
}

/// `GET {base_url}{models_endpoint}` with bearer auth.
pub struct HttpModelLister {
    http: reqwest::Client,
}

impl HttpModelLister {
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl ModelLister for HttpModelLister {
    async fn list_models(
        &self,
        provider: &ProviderConfig,
        api_key: &str,
    ) -> Result<Vec<String>, AppError> {
        let url = models_url(provider).ok_or_else(|| {
            AppError::Validation(format!("Provider '{}' cannot list models", provider.label))
        })?;

        tracing::debug!(provider_id = %provider.id, url = %url, "Fetching model list");

        let mut req = self.http.get(&url);
        if provider.id == "anthropic" {
            req = req
                .header("x-api-key", api_key)
                .header("anthropic-version", ANTHROPIC_VERSION);
        } else if !api_key.is_empty() {
            req = req.bearer_auth(api_key);
        }

        let body: Value = req.send().await?.error_for_status()?.json().await?;
        let models = parse_model_ids(&body);

        tracing::info!(provider_id = %provider.id, count = models.len(), "Model list fetched");
        Ok(models)
    }
}

/// Full models URL, or `None` when the provider has no listable endpoint.
pub fn models_url(provider: &ProviderConfig) -> Option<String> {
    let base = provider.base_url.as_deref()?.trim().trim_end_matches('/');
    let endpoint = provider.models_endpoint.as_deref()?.trim();
    if base.is_empty() || endpoint.is_empty() {
        return None;
    }
    if endpoint.starts_with('/') {
        Some(format!("{base}{endpoint}"))
    } else {
        Some(format!("{base}/{endpoint}"))
    }
}

/// Extract model ids from the common list-models response shapes:
/// `{ "data": [{ "id" }] }` (OpenAI), `{ "models": [{ "id" | "name" }] }`
/// (Ollama-style) or a bare array of strings / objects.
pub fn parse_model_ids(body: &Value) -> Vec<String> {
    let entries = body
        .get("data")
        .or_else(|| body.get("models"))
        .unwrap_or(body)
        .as_array();

    let Some(entries) = entries else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => obj
                .get("id")
                .or_else(|| obj.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
        .collect()
}

/// Models for providers that never hit the network.
pub fn static_models(provider_id: &str) -> Option<Vec<String>> {
    match provider_id {
        catalog::APPLE_INTELLIGENCE_PROVIDER_ID => {
            Some(vec![catalog::APPLE_INTELLIGENCE_DEFAULT_MODEL_ID.to_string()])
        }
        catalog::BEDROCK_PROVIDER_ID => Some(
            catalog::BEDROCK_MODELS
                .iter()
                .map(|(id, _)| id.to_string())
                .collect(),
        ),
        _ => None,
    }
}
