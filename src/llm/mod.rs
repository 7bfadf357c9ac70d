//! LLM Abstraction Layer
//!
//! This module provides a provider-neutral interface to generative models, a
//! Gemini implementation on Google Cloud Platform's Vertex AI, and the tool
//! calling machinery built on top of it.

pub mod auth;
pub mod core;
pub mod gemini;
pub mod orchestrator;
pub mod tools;

// Re-export commonly used types
pub use self::core::{
    config::GenerationConfig,
    error::LlmError,
    provider::{create_provider, LlmProvider},
    types::{
        CallOutcome, Content, FinishReason, FunctionCall, FunctionDeclaration, FunctionResponse,
        ModelTurn, Part, ParametersSchema, PropertySchema, PropertyType, Role, TextStream,
        UsageMetadata,
    },
};
pub use gemini::{GeminiClient, GeminiModel};
pub use orchestrator::{
    ChatRequest, FunctionCallingOrchestrator, OrchestrationResult, OrchestrationState,
    ToolCallRecord,
};
pub use tools::{
    create_function_declaration, FnTool, PermissionLevel, RegistryToolExecutor, Tool,
    ToolCategory, ToolExecutionContext, ToolExecutor, ToolRegistry, ToolResult,
};
