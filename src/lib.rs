//! # genai-gateway - Provider-agnostic dispatch for AI text and image generation
//!
//! One `generate` call covers six vendor wire protocols (OpenAI chat and
//! images, Google generateContent and Imagen, Anthropic Messages, Z.AI,
//! Mistral) plus the `lovable` gateway alias.
//!
#![deny(unsafe_code)]

//! ## Features
//!
//! - **Provider resolution**: explicit override, model-name prefix, settings default.
//! - **Image fallback**: walks Gemini, OpenAI, Z.AI until one has a credential.
//! - **Bounded dispatch**: every attempt has a timeout and honors caller cancellation.
//! - **Usage log**: one row per attempt, never affecting the primary result.
//! - **Structured output**: fence stripping and repair for model-produced JSON.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use genai_gateway::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     genai_gateway::logging::init_tracing();
//!
//!     let gateway = Gateway::builder()
//!         .config(GatewayConfig::from_env()?)
//!         .build()?;
//!
//!     let result = gateway
//!         .generate(
//!             GenerationRequest::for_operation(Operation::GenerateDialogue, "Two friends meet")
//!                 .model("GLM-4.7")
//!                 .entity("article_id", 42),
//!         )
//!         .await?;
//!
//!     let parsed = parse_structured_or(
//!         result.text_or_empty(),
//!         &ShapeDescriptor::dialogue(),
//!         fallback_dialogue("en"),
//!     );
//!     println!("{} lines via {}", parsed.array("dialogue").len(), result.provider_used);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod credentials;
pub mod defaults;
pub mod dispatch;
pub mod error;
pub mod execution;
pub mod fallback;
pub mod gateway;
pub mod logging;
pub mod normalize;
pub mod registry;
pub mod resolver;
pub mod store;
pub mod structured;
pub mod types;
pub mod usage;

pub use config::GatewayConfig;
pub use error::LlmError;
pub use gateway::{Gateway, GatewayBuilder};
pub use types::{
    GenerationKind, GenerationRequest, GenerationResult, Operation, ProviderId, ResponseMode,
};

pub mod prelude {
    pub use crate::config::GatewayConfig;
    pub use crate::credentials::{
        CredentialSet, EnvSource, GatewaySettings, MapEnv, ProcessEnv, SettingsStore,
        StaticSettings,
    };
    pub use crate::error::{ErrorCategory, LlmError, summarize_error};
    pub use crate::fallback::FallbackPolicy;
    pub use crate::gateway::{Gateway, GatewayBuilder};
    pub use crate::resolver::{GeminiRoute, resolve_provider};
    pub use crate::store::{SqliteSettingsStore, SqliteUsageRecorder};
    pub use crate::structured::{
        ParsedResult, ShapeDescriptor, fallback_dialogue, parse_structured, parse_structured_or,
    };
    pub use crate::types::{
        GenerationKind, GenerationRequest, GenerationResult, Operation, ProviderId, ResponseMode,
    };
    pub use crate::usage::{MemoryUsageRecorder, UsageLogEntry, UsageRecorder};
    pub use tokio_util::sync::CancellationToken;
}
