/// Canonical settings key constants for the `app_settings` table.
///
/// Use these instead of raw string literals to prevent typo-based key mismatches.

/// Currently selected post-processing provider id.
pub const POST_PROCESS_PROVIDER_ID: &str = "post_process_provider_id";

/// AWS shared-config profile used for Bedrock. Absent means the default chain.
pub const BEDROCK_PROFILE_NAME: &str = "bedrock_profile_name";

/// AWS region for Bedrock requests (e.g., `us-east-1`).
pub const BEDROCK_REGION: &str = "bedrock_region";

/// Selected Bedrock model id, or the `custom` sentinel.
pub const BEDROCK_MODEL_ID: &str = "bedrock_model_id";

/// Free-form Bedrock model id used when `bedrock_model_id` is `custom`.
pub const BEDROCK_CUSTOM_MODEL_ID: &str = "bedrock_custom_model_id";
