//! Usage recording
//!
//! One [`UsageLogEntry`] is written per dispatch attempt. Recording never
//! influences the outcome of the generation: failures are reported through
//! `tracing` and otherwise dropped.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{LlmError, MAX_ERROR_MESSAGE_CHARS, truncate_chars};

/// Append-only record of one dispatch attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageLogEntry {
    pub provider: String,
    pub model: String,
    pub operation: String,
    pub tokens_used: Option<u64>,
    pub duration_ms: u64,
    pub success: bool,
    pub error_message: Option<String>,
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl UsageLogEntry {
    pub fn success(
        provider: impl Into<String>,
        model: impl Into<String>,
        operation: impl Into<String>,
        duration_ms: u64,
        tokens_used: Option<u64>,
    ) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            operation: operation.into(),
            tokens_used,
            duration_ms,
            success: true,
            error_message: None,
            metadata: Map::new(),
            created_at: Utc::now(),
        }
    }

    /// Failed attempt. The message is truncated and never left empty.
    pub fn failure(
        provider: impl Into<String>,
        model: impl Into<String>,
        operation: impl Into<String>,
        duration_ms: u64,
        error: &LlmError,
    ) -> Self {
        let mut message = truncate_chars(&error.to_string(), MAX_ERROR_MESSAGE_CHARS);
        if message.trim().is_empty() {
            message = format!("{:?}", error.category());
        }
        Self {
            provider: provider.into(),
            model: model.into(),
            operation: operation.into(),
            tokens_used: None,
            duration_ms,
            success: false,
            error_message: Some(message),
            metadata: Map::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Sink for usage entries.
#[async_trait]
pub trait UsageRecorder: Send + Sync {
    async fn record(&self, entry: UsageLogEntry) -> Result<(), LlmError>;
}

/// Record an entry, logging and swallowing any failure.
pub async fn record_usage(recorder: &dyn UsageRecorder, entry: UsageLogEntry) {
    let provider = entry.provider.clone();
    let operation = entry.operation.clone();
    if let Err(e) = recorder.record(entry).await {
        tracing::warn!(
            error = %e,
            provider = %provider,
            operation = %operation,
            "Failed to record AI usage"
        );
    }
}

/// In-memory recorder, handy for tests and local tooling.
#[derive(Debug, Clone, Default)]
pub struct MemoryUsageRecorder {
    entries: Arc<Mutex<Vec<UsageLogEntry>>>,
}

impl MemoryUsageRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn entries(&self) -> Vec<UsageLogEntry> {
        match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl UsageRecorder for MemoryUsageRecorder {
    async fn record(&self, entry: UsageLogEntry) -> Result<(), LlmError> {
        self.entries
            .lock()
            .map_err(|_| LlmError::DatabaseError("usage buffer poisoned".into()))?
            .push(entry);
        Ok(())
    }
}

/// Emits each entry as a structured `tracing` event instead of persisting it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingUsageRecorder;

#[async_trait]
impl UsageRecorder for TracingUsageRecorder {
    async fn record(&self, entry: UsageLogEntry) -> Result<(), LlmError> {
        tracing::info!(
            provider = %entry.provider,
            model = %entry.model,
            operation = %entry.operation,
            tokens_used = ?entry.tokens_used,
            duration_ms = entry.duration_ms,
            success = entry.success,
            error_message = ?entry.error_message,
            "ai usage"
        );
        Ok(())
    }
}
