pub mod migrations;
pub mod models;
pub mod repos;
pub mod settings_keys;

use r2d2::{CustomizeConnection, Pool};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;

use crate::catalog;
use crate::error::AppError;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Connection customizer that sets per-connection SQLite pragmas.
#[derive(Debug)]
struct SqlitePragmaCustomizer;

impl CustomizeConnection<rusqlite::Connection, rusqlite::Error> for SqlitePragmaCustomizer {
    fn on_acquire(&self, conn: &mut rusqlite::Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;
             PRAGMA synchronous = NORMAL;",
        )?;
        Ok(())
    }
}

/// Initialize the database: create file, enable WAL + foreign keys, run migrations, seed providers.
pub fn init_db(data_dir: &Path) -> Result<DbPool, AppError> {
    std::fs::create_dir_all(data_dir)?;
    let db_path = data_dir.join("settings.db");

    tracing::info!(path = %db_path.display(), "Initializing database");

    let manager = SqliteConnectionManager::file(&db_path);
    let pool = Pool::builder()
        .max_size(4)
        .connection_customizer(Box::new(SqlitePragmaCustomizer))
        .build(manager)?;

    // WAL is database-wide, only needs to run once
    {
        let conn = pool.get()?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        tracing::debug!("SQLite pragmas configured (WAL, FK, busy_timeout)");
    }

    {
        let conn = pool.get()?;
        migrations::run(&conn)?;
        seed_builtin_providers(&conn)?;
    }

    tracing::info!("Database initialized successfully");
    Ok(pool)
}

/// Seed the built-in post-processing providers and their empty credential rows.
///
/// Existing rows are left untouched so user edits (e.g. the custom base URL)
/// survive restarts. An empty Apple model is backfilled with its fixed default.
fn seed_builtin_providers(conn: &rusqlite::Connection) -> Result<(), AppError> {
    let now = chrono::Utc::now().to_rfc3339();

    for (order, provider) in catalog::builtin_providers().iter().enumerate() {
        conn.execute(
            "INSERT OR IGNORE INTO post_process_providers
             (id, label, base_url, allow_base_url_edit, models_endpoint, sort_order, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                provider.id,
                provider.label,
                provider.base_url,
                provider.allow_base_url_edit as i32,
                provider.models_endpoint,
                order as i64,
                now,
            ],
        )?;

        let default_model = catalog::default_model_for_provider(&provider.id);
        conn.execute(
            "INSERT OR IGNORE INTO post_process_credentials (provider_id, api_key, model, updated_at)
             VALUES (?1, '', ?2, ?3)",
            params![provider.id, default_model, now],
        )?;
        if !default_model.is_empty() {
            conn.execute(
                "UPDATE post_process_credentials SET model = ?1, updated_at = ?2
                 WHERE provider_id = ?3 AND model = ''",
                params![default_model, now, provider.id],
            )?;
        }
    }

    tracing::debug!("Builtin post-processing providers seeded");
    Ok(())
}

#[cfg(test)]
pub fn init_test_db() -> Result<DbPool, AppError> {
    use std::time::Duration;

    // Use a unique temp file for each test to avoid in-memory connection issues with r2d2.
    let tmp = std::env::temp_dir().join(format!("postprocess_test_{}.db", uuid::Uuid::new_v4()));
    let manager = SqliteConnectionManager::file(&tmp);
    let pool = Pool::builder()
        .max_size(2)
        .connection_timeout(Duration::from_secs(5))
        .connection_customizer(Box::new(SqlitePragmaCustomizer))
        .build(manager)?;

    let conn = pool.get()?;
    migrations::run(&conn)?;
    seed_builtin_providers(&conn)?;
    drop(conn);
    Ok(pool)
}
