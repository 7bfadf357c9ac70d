//! Core types for the LLM abstraction layer

use std::collections::BTreeMap;
use std::pin::Pin;

use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::LlmError;

/// Lazy, finite sequence of generated text chunks
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Role of a transcript turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Human input (including the tool-augmented initial prompt)
    User,
    /// Model output, possibly carrying requested calls
    Model,
    /// Results of executed calls
    Function,
}

/// A single turn in the conversation transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Who produced this turn
    pub role: Role,
    /// Parts making up the turn
    pub parts: Vec<Part>,
}

impl Content {
    /// Create a user turn with text content
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text { text: text.into() }],
        }
    }

    /// Create a model turn with text content
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::Text { text: text.into() }],
        }
    }

    /// Create a model turn containing the calls it requested
    pub fn function_calls(calls: &[FunctionCall]) -> Self {
        Self {
            role: Role::Model,
            parts: calls.iter().cloned().map(Part::FunctionCall).collect(),
        }
    }

    /// Create a function-result turn from executed call responses
    pub fn function_responses(responses: &[FunctionResponse]) -> Self {
        Self {
            role: Role::Function,
            parts: responses.iter().cloned().map(Part::FunctionResponse).collect(),
        }
    }
}

/// Part of a transcript turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    /// Plain text
    Text { text: String },
    /// Call requested by the model
    FunctionCall(FunctionCall),
    /// Normalized outcome of an executed call
    FunctionResponse(FunctionResponse),
}

/// A call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Name of the tool to invoke
    pub name: String,
    /// Arguments keyed by parameter name
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// Normalized response for one requested call
///
/// Always produced, even when the tool was missing, denied, or failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    /// Name of the call this responds to
    pub name: String,
    /// Outcome of the call
    pub response: CallOutcome,
}

impl FunctionResponse {
    /// Build a successful response
    pub fn success(name: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            name: name.into(),
            response: CallOutcome {
                success: true,
                data,
                error: None,
            },
        }
    }

    /// Build a failed response
    pub fn failure(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            response: CallOutcome {
                success: false,
                data: None,
                error: Some(error.into()),
            },
        }
    }
}

/// `{success, data?, error?}` body of a function response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One model response in the function-calling protocol
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelTurn {
    /// True when the model produced a final answer
    pub is_complete: bool,
    /// Text produced in this turn, if any
    pub text: Option<String>,
    /// Calls the model wants executed
    pub function_calls: Vec<FunctionCall>,
    /// Why the model stopped, when reported
    pub finish_reason: Option<FinishReason>,
    /// Token usage, when reported
    pub usage: Option<UsageMetadata>,
}

impl ModelTurn {
    /// A completed turn carrying a final answer
    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            is_complete: true,
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// An incomplete turn requesting calls
    pub fn calls(function_calls: Vec<FunctionCall>) -> Self {
        Self {
            is_complete: false,
            text: None,
            function_calls,
            ..Self::default()
        }
    }

    /// Whether the orchestrator has to execute anything for this turn
    pub fn wants_tools(&self) -> bool {
        !self.is_complete && !self.function_calls.is_empty()
    }
}

/// Model-facing description of a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    /// Always equal to the owning tool's name
    pub name: String,
    pub description: String,
    pub parameters: ParametersSchema,
}

/// Root `{type: "object", properties, required}` of a declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParametersSchema {
    #[serde(rename = "type")]
    pub kind: PropertyType,
    pub properties: BTreeMap<String, PropertySchema>,
    pub required: Vec<String>,
}

/// Structural description of one parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: PropertyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertySchema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, PropertySchema>>,
}

impl PropertySchema {
    /// A bare schema of the given kind
    pub fn of(kind: PropertyType) -> Self {
        Self {
            kind,
            description: None,
            enum_values: None,
            items: None,
            properties: None,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }
}

/// Parameter kinds understood by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

/// Reason why generation finished
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural completion
    Stop,
    /// Hit token limit
    MaxTokens,
    /// Blocked by safety filters
    Safety,
    /// Provider-specific reason
    Other(String),
}

/// Token usage information
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetadata {
    /// Prompt tokens consumed
    pub input_tokens: u32,
    /// Response tokens generated
    pub output_tokens: u32,
    /// Sum of input and output
    pub total_tokens: u32,
}

impl UsageMetadata {
    /// Create new usage metadata
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }
}
