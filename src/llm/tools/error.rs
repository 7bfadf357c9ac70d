//! Error types for the tool layer

use thiserror::Error;

use super::builtin::KnowledgeError;

/// Failure raised by a tool handler
///
/// The executor turns these into failed call responses; they never reach the
/// orchestrator as errors.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Arguments did not match the tool's schema
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The handler failed while doing its work
    #[error("{0}")]
    Execution(String),

    /// A knowledge collaborator failed
    #[error(transparent)]
    Knowledge(#[from] KnowledgeError),
}

impl ToolError {
    pub fn execution(message: impl Into<String>) -> Self {
        ToolError::Execution(message.into())
    }
}

/// Argument schema could not be turned into a declaration
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    /// The root of an argument schema must describe an object
    #[error("Argument schema for '{tool}' must describe an object, found {found}")]
    NotAnObject { tool: String, found: String },

    /// A `$ref` pointed at a definition that does not exist
    #[error("Argument schema for '{tool}' references unknown definition '{reference}'")]
    UnresolvedReference { tool: String, reference: String },
}

/// Errors raised while populating the registry
#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("Failed to register tool: {0}")]
    Schema(#[from] SchemaError),
}
