//! Subscriber setup for binaries and tests that embed the gateway.
//!
//! The library itself only emits `tracing` events; installing a subscriber is
//! the host's choice. These helpers cover the common case.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::credentials::{EnvSource, ProcessEnv};
use crate::error::LlmError;

/// `GATEWAY_LOG_FORMAT=json` switches to JSON lines.
pub const LOG_FORMAT_ENV: &str = "GATEWAY_LOG_FORMAT";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    pub fn from_env_source(env: &dyn EnvSource) -> Self {
        match env.var(LOG_FORMAT_ENV) {
            Some(v) if v.trim().eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Install a global subscriber, failing if one is already set.
///
/// Filter comes from `RUST_LOG`, defaulting to `info`.
pub fn try_init_tracing() -> Result<(), LlmError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    let result = match LogFormat::from_env_source(&ProcessEnv) {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };
    result.map_err(|e| LlmError::ConfigurationError(format!("tracing subscriber: {e}")))
}

/// Like [`try_init_tracing`] but ignores an already-installed subscriber.
pub fn init_tracing() {
    if let Err(e) = try_init_tracing() {
        tracing::debug!(error = %e, "tracing subscriber already installed");
    }
}
