//! Bedrock Converse client driven by the stored Bedrock settings.
//!
//! Credentials come from the AWS default chain, optionally pinned to the
//! configured shared-config profile. Structured requests force a single tool
//! call whose input carries the processed text; if the model answers in
//! plain text instead, that text is returned.

use aws_config::BehaviorVersion;
use aws_sdk_bedrockruntime::config::Region;
use aws_sdk_bedrockruntime::error::{BuildError, SdkError};
use aws_sdk_bedrockruntime::operation::converse::builders::ConverseFluentBuilder;
use aws_sdk_bedrockruntime::operation::converse::ConverseError;
use aws_sdk_bedrockruntime::types::{
    ContentBlock, ConversationRole, ConverseOutput, Message, SpecificToolChoice,
    SystemContentBlock, Tool, ToolChoice, ToolConfiguration, ToolInputSchema, ToolSpecification,
};
use aws_sdk_bedrockruntime::Client;
use aws_smithy_types::error::display::DisplayErrorContext;
use aws_smithy_types::{Document, Number};
use serde_json::Value;

use crate::db::models::BedrockSettings;
use crate::error::AppError;

/// Input field of the structured-output tool holding the processed text.
pub const OUTPUT_FIELD: &str = "transcription";
pub const OUTPUT_TOOL_NAME: &str = "transcription_output";

/// Plain completion: the first text block of the reply.
pub async fn send_completion(
    settings: &BedrockSettings,
    system_prompt: Option<&str>,
    user_prompt: &str,
) -> Result<String, AppError> {
    let model_id = resolve_model_id(settings)?;
    tracing::info!(region = %settings.region, model_id = %model_id, "Bedrock completion");

    let client = build_client(settings).await;
    let request = converse_request(&client, model_id, system_prompt, user_prompt)?;
    let response = request.send().await.map_err(map_sdk_error)?;

    text_from_content(reply_message(response.output)?.content())
}

/// Completion forced through the structured-output tool.
pub async fn send_structured_completion(
    settings: &BedrockSettings,
    system_prompt: Option<&str>,
    user_prompt: &str,
) -> Result<String, AppError> {
    let model_id = resolve_model_id(settings)?;
    tracing::info!(region = %settings.region, model_id = %model_id, "Bedrock structured completion");

    let client = build_client(settings).await;
    let request = converse_request(&client, model_id, system_prompt, user_prompt)?
        .tool_config(output_tool_config()?);
    let response = request.send().await.map_err(map_sdk_error)?;

    structured_output(reply_message(response.output)?.content())
}

async fn build_client(settings: &BedrockSettings) -> Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(profile) = settings
        .profile_name
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
    {
        tracing::debug!(profile = %profile, "Using AWS profile");
        loader = loader.profile_name(profile);
    }

    let sdk_config = loader
        .region(Region::new(settings.region.clone()))
        .load()
        .await;
    Client::new(&sdk_config)
}

fn converse_request(
    client: &Client,
    model_id: &str,
    system_prompt: Option<&str>,
    user_prompt: &str,
) -> Result<ConverseFluentBuilder, AppError> {
    let message = Message::builder()
        .role(ConversationRole::User)
        .content(ContentBlock::Text(user_prompt.to_string()))
        .build()
        .map_err(build_error("message"))?;

    let mut request = client.converse().model_id(model_id).messages(message);
    if let Some(system) = system_prompt {
        request = request.system(SystemContentBlock::Text(system.to_string()));
    }
    Ok(request)
}

/// Model id to send, rejecting a custom selection with no id filled in.
fn resolve_model_id(settings: &BedrockSettings) -> Result<&str, AppError> {
    match settings.effective_model_id() {
        "" => Err(AppError::Validation(
            "Bedrock custom model ID is empty".into(),
        )),
        id => Ok(id),
    }
}

fn output_tool_config() -> Result<ToolConfiguration, AppError> {
    let schema = serde_json::json!({
        "type": "object",
        "properties": {
            OUTPUT_FIELD: {
                "type": "string",
                "description": "The cleaned and processed transcription text"
            }
        },
        "required": [OUTPUT_FIELD],
        "additionalProperties": false
    });

    let spec = ToolSpecification::builder()
        .name(OUTPUT_TOOL_NAME)
        .description("Output the processed transcription text")
        .input_schema(ToolInputSchema::Json(json_to_document(&schema)))
        .build()
        .map_err(build_error("tool spec"))?;

    let choice = SpecificToolChoice::builder()
        .name(OUTPUT_TOOL_NAME)
        .build()
        .map_err(build_error("tool choice"))?;

    ToolConfiguration::builder()
        .tools(Tool::ToolSpec(spec))
        .tool_choice(ToolChoice::Tool(choice))
        .build()
        .map_err(build_error("tool config"))
}

pub(crate) fn json_to_document(value: &Value) -> Document {
    match value {
        Value::Null => Document::Null,
        Value::Bool(b) => Document::Bool(*b),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Document::Number(Number::PosInt(u))
            } else if let Some(i) = n.as_i64() {
                Document::Number(Number::NegInt(i))
            } else if let Some(f) = n.as_f64() {
                Document::Number(Number::Float(f))
            } else {
                Document::Null
            }
        }
        Value::String(s) => Document::String(s.clone()),
        Value::Array(items) => Document::Array(items.iter().map(json_to_document).collect()),
        Value::Object(map) => Document::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), json_to_document(v)))
                .collect(),
        ),
    }
}

fn string_field(doc: &Document, field: &str) -> Option<String> {
    match doc {
        Document::Object(map) => match map.get(field) {
            Some(Document::String(s)) => Some(s.clone()),
            _ => None,
        },
        _ => None,
    }
}

fn reply_message(output: Option<ConverseOutput>) -> Result<Message, AppError> {
    match output {
        Some(ConverseOutput::Message(message)) => Ok(message),
        Some(_) => Err(AppError::Bedrock("Unexpected response type from Bedrock".into())),
        None => Err(AppError::Bedrock("Bedrock returned an empty response".into())),
    }
}

pub(crate) fn text_from_content(content: &[ContentBlock]) -> Result<String, AppError> {
    content
        .iter()
        .find_map(|block| match block {
            ContentBlock::Text(text) => Some(text.clone()),
            _ => None,
        })
        .inspect(|text| tracing::debug!(chars = text.len(), "Bedrock text response"))
        .ok_or_else(|| AppError::Bedrock("Bedrock response contains no text content".into()))
}

/// Text from the output tool's input, falling back to a plain text block.
pub(crate) fn structured_output(content: &[ContentBlock]) -> Result<String, AppError> {
    for block in content {
        let ContentBlock::ToolUse(tool_use) = block else {
            continue;
        };
        if tool_use.name() != OUTPUT_TOOL_NAME {
            continue;
        }
        match string_field(tool_use.input(), OUTPUT_FIELD) {
            Some(text) => return Ok(text),
            None => tracing::warn!(field = OUTPUT_FIELD, "Tool output is missing its text field"),
        }
    }

    tracing::debug!("No usable tool output, falling back to text content");
    text_from_content(content)
}

pub(crate) fn map_sdk_error(error: SdkError<ConverseError>) -> AppError {
    let message = format!("Bedrock API error: {}", DisplayErrorContext(&error));
    tracing::error!(error = %message, "Bedrock call failed");
    AppError::Bedrock(message)
}

fn build_error(what: &'static str) -> impl Fn(BuildError) -> AppError {
    move |e| AppError::Bedrock(format!("Failed to build {what}: {e}"))
}
