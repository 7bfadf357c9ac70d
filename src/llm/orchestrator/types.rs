//! Request and result types for tool-calling runs

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::core::types::FunctionResponse;
use crate::llm::tools::types::ToolExecutionContext;

use super::prompt::DEFAULT_SYSTEM_PROMPT;

/// One conversational turn to run through the orchestrator
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub message: String,
    pub context: ToolExecutionContext,
    pub system_prompt: Option<String>,
    /// Agent allow-list; every enabled tool when absent
    pub enabled_tools: Option<Vec<String>>,
    /// Overrides the orchestrator's iteration cap
    pub max_iterations: Option<usize>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, context: ToolExecutionContext) -> Self {
        Self {
            message: message.into(),
            context,
            system_prompt: None,
            enabled_tools: None,
            max_iterations: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_enabled_tools<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enabled_tools = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    /// The system prompt, or the default one
    pub fn system_prompt(&self) -> &str {
        self.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }
}

/// Outcome of one executed call, as reported to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallRecord {
    pub tool_name: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl From<&FunctionResponse> for ToolCallRecord {
    fn from(response: &FunctionResponse) -> Self {
        Self {
            tool_name: response.name.clone(),
            success: response.response.success,
            data: response.response.data.clone(),
        }
    }
}

/// Final artifact of a tool-calling run
///
/// `tools_called` always equals `tool_results.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationResult {
    pub response: String,
    pub tools_called: usize,
    pub execution_time_ms: u64,
    pub tool_results: Vec<ToolCallRecord>,
}
