use std::collections::HashMap;

use rusqlite::{params, Row};

use crate::db::models::ProviderConfig;
use crate::db::DbPool;
use crate::error::AppError;

fn row_to_provider(row: &Row) -> rusqlite::Result<ProviderConfig> {
    Ok(ProviderConfig {
        id: row.get("id")?,
        label: row.get("label")?,
        base_url: row.get("base_url")?,
        allow_base_url_edit: row.get::<_, i32>("allow_base_url_edit")? != 0,
        models_endpoint: row.get("models_endpoint")?,
    })
}

pub fn get_all(pool: &DbPool) -> Result<Vec<ProviderConfig>, AppError> {
    let conn = pool.get()?;
    let mut stmt =
        conn.prepare("SELECT * FROM post_process_providers ORDER BY sort_order, created_at")?;
    let rows = stmt.query_map([], row_to_provider)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn get_by_id(pool: &DbPool, id: &str) -> Result<ProviderConfig, AppError> {
    let conn = pool.get()?;
    conn.query_row(
        "SELECT * FROM post_process_providers WHERE id = ?1",
        params![id],
        row_to_provider,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(format!("Provider {id}")),
        other => AppError::Database(other),
    })
}

/// Update the base URL. Only providers that allow editing accept a new URL.
pub fn update_base_url(pool: &DbPool, id: &str, base_url: &str) -> Result<(), AppError> {
    let provider = get_by_id(pool, id)?;
    if !provider.allow_base_url_edit {
        return Err(AppError::Validation(format!(
            "Provider '{}' does not allow base URL edits",
            provider.label
        )));
    }

    let now = chrono::Utc::now().to_rfc3339();
    let conn = pool.get()?;
    conn.execute(
        "UPDATE post_process_providers SET base_url = ?1, updated_at = ?2 WHERE id = ?3",
        params![base_url, now, id],
    )?;
    Ok(())
}

// ── Credentials (api key + model) ──────────────────────────────────────

/// API keys by provider id. Providers without a row are simply absent.
pub fn api_keys(pool: &DbPool) -> Result<HashMap<String, String>, AppError> {
    credential_column(pool, "SELECT provider_id, api_key FROM post_process_credentials")
}

/// Selected models by provider id.
pub fn models(pool: &DbPool) -> Result<HashMap<String, String>, AppError> {
    credential_column(pool, "SELECT provider_id, model FROM post_process_credentials")
}

fn credential_column(pool: &DbPool, sql: &str) -> Result<HashMap<String, String>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn set_api_key(pool: &DbPool, id: &str, api_key: &str) -> Result<(), AppError> {
    get_by_id(pool, id)?;
    let now = chrono::Utc::now().to_rfc3339();
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO post_process_credentials (provider_id, api_key, model, updated_at)
         VALUES (?1, ?2, '', ?3)
         ON CONFLICT(provider_id) DO UPDATE SET api_key = ?2, updated_at = ?3",
        params![id, api_key, now],
    )?;
    Ok(())
}

pub fn set_model(pool: &DbPool, id: &str, model: &str) -> Result<(), AppError> {
    get_by_id(pool, id)?;
    let now = chrono::Utc::now().to_rfc3339();
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO post_process_credentials (provider_id, api_key, model, updated_at)
         VALUES (?1, '', ?2, ?3)
         ON CONFLICT(provider_id) DO UPDATE SET model = ?2, updated_at = ?3",
        params![id, model, now],
    )?;
    Ok(())
}

// ── Fetched model lists ────────────────────────────────────────────────

pub fn cached_models(pool: &DbPool) -> Result<HashMap<String, Vec<String>>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare("SELECT provider_id, models FROM post_process_model_cache")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

    let mut out = HashMap::new();
    for (provider_id, raw) in rows.filter_map(|r| r.ok()) {
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(models) => {
                out.insert(provider_id, models);
            }
            Err(e) => {
                tracing::warn!(provider_id = %provider_id, error = %e, "Ignoring corrupt model cache entry");
            }
        }
    }
    Ok(out)
}

/// Replace the cached model list for a provider. Last write wins.
pub fn set_cached_models(pool: &DbPool, id: &str, models: &[String]) -> Result<(), AppError> {
    let raw = serde_json::to_string(models)?;
    let now = chrono::Utc::now().to_rfc3339();
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO post_process_model_cache (provider_id, models, fetched_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(provider_id) DO UPDATE SET models = ?2, fetched_at = ?3",
        params![id, raw, now],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::db::init_test_db;

    #[test]
    fn test_providers_in_catalog_order() {
        let pool = init_test_db().unwrap();
        let ids: Vec<_> = get_all(&pool).unwrap().into_iter().map(|p| p.id).collect();
        let expected: Vec<_> = catalog::builtin_providers().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let pool = init_test_db().unwrap();
        assert!(matches!(get_by_id(&pool, "nope"), Err(AppError::NotFound(_))));
        assert!(matches!(set_api_key(&pool, "nope", "k"), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_base_url_only_editable_for_custom() {
        let pool = init_test_db().unwrap();
        update_base_url(&pool, catalog::CUSTOM_PROVIDER_ID, "http://127.0.0.1:1234/v1").unwrap();
        assert_eq!(
            get_by_id(&pool, catalog::CUSTOM_PROVIDER_ID).unwrap().base_url.as_deref(),
            Some("http://127.0.0.1:1234/v1")
        );

        let err = update_base_url(&pool, catalog::OPENAI_PROVIDER_ID, "http://evil/v1");
        assert!(matches!(err, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_api_key_and_model_are_independent() {
        let pool = init_test_db().unwrap();
        set_api_key(&pool, "groq", "gsk-123").unwrap();
        set_model(&pool, "groq", "llama-3.1-8b-instant").unwrap();
        set_api_key(&pool, "groq", "gsk-456").unwrap();

        assert_eq!(api_keys(&pool).unwrap()["groq"], "gsk-456");
        assert_eq!(models(&pool).unwrap()["groq"], "llama-3.1-8b-instant");
    }

    #[test]
    fn test_cached_models_last_write_wins() {
        let pool = init_test_db().unwrap();
        set_cached_models(&pool, "openai", &["gpt-4o".into()]).unwrap();
        set_cached_models(&pool, "openai", &["gpt-4o-mini".into(), "o3".into()]).unwrap();

        let cache = cached_models(&pool).unwrap();
        assert_eq!(cache["openai"], vec!["gpt-4o-mini".to_string(), "o3".to_string()]);
        assert!(!cache.contains_key("groq"));
    }
}
