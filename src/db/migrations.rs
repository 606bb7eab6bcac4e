use rusqlite::Connection;

use crate::error::AppError;

/// Run the consolidated, idempotent schema migration.
pub fn run(conn: &Connection) -> Result<(), AppError> {
    tracing::debug!("Running database migrations");

    conn.execute_batch(SCHEMA)?;

    tracing::info!("Database migrations complete");
    Ok(())
}

const SCHEMA: &str = r#"

-- ============================================================================
-- Generic key/value settings
-- ============================================================================

CREATE TABLE IF NOT EXISTS app_settings (
    key         TEXT PRIMARY KEY,
    value       TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

-- ============================================================================
-- Post-processing providers
-- ============================================================================

CREATE TABLE IF NOT EXISTS post_process_providers (
    id                   TEXT PRIMARY KEY,
    label                TEXT NOT NULL,
    base_url             TEXT,
    allow_base_url_edit  INTEGER NOT NULL DEFAULT 0,
    models_endpoint      TEXT,
    sort_order           INTEGER NOT NULL DEFAULT 0,
    created_at           TEXT NOT NULL,
    updated_at           TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_post_process_providers_sort ON post_process_providers(sort_order);

-- API key and selected model per provider. Missing rows read as empty strings.
CREATE TABLE IF NOT EXISTS post_process_credentials (
    provider_id  TEXT PRIMARY KEY REFERENCES post_process_providers(id) ON DELETE CASCADE,
    api_key      TEXT NOT NULL DEFAULT '',
    model        TEXT NOT NULL DEFAULT '',
    updated_at   TEXT NOT NULL
);

-- Last fetched model list per provider, stored as a JSON array of ids.
CREATE TABLE IF NOT EXISTS post_process_model_cache (
    provider_id  TEXT PRIMARY KEY REFERENCES post_process_providers(id) ON DELETE CASCADE,
    models       TEXT NOT NULL DEFAULT '[]',
    fetched_at   TEXT NOT NULL
);

"#;
