//! SQLite persistence for the settings row and the usage log.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::credentials::{GatewaySettings, SettingsStore};
use crate::error::LlmError;
use crate::usage::{UsageLogEntry, UsageRecorder};

const CREATE_SETTINGS: &str = r#"
CREATE TABLE IF NOT EXISTS ai_settings (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    openai_api_key TEXT,
    gemini_api_key TEXT,
    gemini_v22_api_key TEXT,
    anthropic_api_key TEXT,
    zai_api_key TEXT,
    mistral_api_key TEXT,
    default_text_provider TEXT,
    default_text_model TEXT,
    default_image_provider TEXT,
    default_image_model TEXT
)"#;

const CREATE_USAGE_LOGS: &str = r#"
CREATE TABLE IF NOT EXISTS ai_usage_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    provider TEXT NOT NULL,
    model TEXT NOT NULL,
    operation TEXT NOT NULL,
    tokens_used INTEGER,
    duration_ms INTEGER NOT NULL,
    success BOOLEAN NOT NULL,
    error_message TEXT,
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL
)"#;

/// Open a small pool. SQLite is single-writer.
pub async fn connect(database_url: &str) -> Result<SqlitePool, LlmError> {
    SqlitePoolOptions::new()
        .max_connections(4)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
        .map_err(|e| LlmError::DatabaseError(format!("Failed to connect to database: {e}")))
}

/// Create both gateway tables if they do not exist yet.
pub async fn migrate(pool: &SqlitePool) -> Result<(), LlmError> {
    sqlx::query(CREATE_SETTINGS).execute(pool).await?;
    sqlx::query(CREATE_USAGE_LOGS).execute(pool).await?;
    tracing::debug!("gateway tables ready");
    Ok(())
}

/// Settings row read with `SELECT ... LIMIT 1`; a missing row means defaults.
#[derive(Debug, Clone)]
pub struct SqliteSettingsStore {
    pool: SqlitePool,
}

impl SqliteSettingsStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or replace the single settings row.
    pub async fn save(&self, settings: &GatewaySettings) -> Result<(), LlmError> {
        sqlx::query(
            "INSERT OR REPLACE INTO ai_settings (
                id, openai_api_key, gemini_api_key, gemini_v22_api_key, anthropic_api_key,
                zai_api_key, mistral_api_key, default_text_provider, default_text_model,
                default_image_provider, default_image_model
            ) VALUES (1, $1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(&settings.openai_api_key)
        .bind(&settings.gemini_api_key)
        .bind(&settings.gemini_v22_api_key)
        .bind(&settings.anthropic_api_key)
        .bind(&settings.zai_api_key)
        .bind(&settings.mistral_api_key)
        .bind(&settings.default_text_provider)
        .bind(&settings.default_text_model)
        .bind(&settings.default_image_provider)
        .bind(&settings.default_image_model)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn load(&self) -> Result<GatewaySettings, LlmError> {
        let row = sqlx::query_as::<_, GatewaySettings>(
            "SELECT openai_api_key, gemini_api_key, gemini_v22_api_key, anthropic_api_key,
                    zai_api_key, mistral_api_key, default_text_provider, default_text_model,
                    default_image_provider, default_image_model
             FROM ai_settings LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.unwrap_or_default())
    }
}

#[derive(sqlx::FromRow)]
struct UsageRow {
    provider: String,
    model: String,
    operation: String,
    tokens_used: Option<i64>,
    duration_ms: i64,
    success: bool,
    error_message: Option<String>,
    metadata: String,
    created_at: DateTime<Utc>,
}

impl From<UsageRow> for UsageLogEntry {
    fn from(row: UsageRow) -> Self {
        let metadata = match serde_json::from_str::<Value>(&row.metadata) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        Self {
            provider: row.provider,
            model: row.model,
            operation: row.operation,
            tokens_used: row.tokens_used.and_then(|t| u64::try_from(t).ok()),
            duration_ms: u64::try_from(row.duration_ms).unwrap_or(0),
            success: row.success,
            error_message: row.error_message,
            metadata,
            created_at: row.created_at,
        }
    }
}

/// Usage log backed by the `ai_usage_logs` table.
#[derive(Debug, Clone)]
pub struct SqliteUsageRecorder {
    pool: SqlitePool,
}

impl SqliteUsageRecorder {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Most recent entries, newest first.
    pub async fn recent(&self, limit: u32) -> Result<Vec<UsageLogEntry>, LlmError> {
        let rows = sqlx::query_as::<_, UsageRow>(
            "SELECT provider, model, operation, tokens_used, duration_ms, success,
                    error_message, metadata, created_at
             FROM ai_usage_logs ORDER BY id DESC LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(UsageLogEntry::from).collect())
    }
}

#[async_trait]
impl UsageRecorder for SqliteUsageRecorder {
    async fn record(&self, entry: UsageLogEntry) -> Result<(), LlmError> {
        let metadata = serde_json::to_string(&entry.metadata)?;
        sqlx::query(
            "INSERT INTO ai_usage_logs
                (provider, model, operation, tokens_used, duration_ms, success, error_message, metadata, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(&entry.provider)
        .bind(&entry.model)
        .bind(&entry.operation)
        .bind(entry.tokens_used.and_then(|t| i64::try_from(t).ok()))
        .bind(i64::try_from(entry.duration_ms).unwrap_or(i64::MAX))
        .bind(entry.success)
        .bind(&entry.error_message)
        .bind(metadata)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
