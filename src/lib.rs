//! Tool-calling orchestration for Gemini on Vertex AI
//!
//! - [`llm::tools`]: tool trait, registry, schema translation and execution
//! - [`llm::orchestrator`]: the bounded model/tool loop behind `chat_with_tools`
//! - [`llm::gemini`]: the Vertex AI Gemini provider
//! - [`config`] and [`telemetry`]: environment configuration and logging setup

// Lets `#[tool]` expansions refer to `::toolchat` from inside this crate too.
extern crate self as toolchat;

pub mod config;
pub mod llm;
pub mod telemetry;

pub use toolchat_macros::tool;
