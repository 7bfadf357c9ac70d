//! Shared tool types: execution context, results, categories and permission levels

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::llm::core::types::FunctionResponse;

/// Identity and scope passed into every tool invocation
///
/// Built by the caller once per request and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolExecutionContext {
    pub agent_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub tenant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl ToolExecutionContext {
    /// Context for an anonymous caller
    pub fn new(agent_id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            user_id: None,
            tenant_id: tenant_id.into(),
            session_id: None,
            metadata: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Whether the caller is an identified user
    pub fn is_authenticated(&self) -> bool {
        self.user_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

/// Value returned by a tool handler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ToolResultMetadata>,
}

impl ToolResult {
    /// Successful result carrying data
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            metadata: None,
        }
    }

    /// Failed result reported by the handler itself
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: ToolResultMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Wrap this result as the response for the call named `name`
    pub fn into_response(self, name: impl Into<String>) -> FunctionResponse {
        let name = name.into();
        if self.success {
            FunctionResponse::success(name, self.data)
        } else {
            let error = self
                .error
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| format!("Tool reported failure: {}", name));
            let mut response = FunctionResponse::failure(name, error);
            response.response.data = self.data;
            response
        }
    }
}

/// Bookkeeping attached to a tool result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultMetadata {
    /// Handler wall time in milliseconds
    pub execution_time: u64,
    /// Where the data came from
    pub source: String,
    pub cached: bool,
}

/// Broad grouping of a tool, surfaced for listing and auditing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    Knowledge,
    Data,
    Action,
    Integration,
    Utility,
}

/// Who may invoke a tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    /// Anyone
    Public,
    /// Callers with a user id
    Authenticated,
    /// Administrators (currently: callers with a user id)
    Admin,
    /// Decided by the tool's own `authorize` hook
    Custom,
    /// A level this build does not recognise; always denied
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_context_builder() {
        let context = ToolExecutionContext::new("agent-1", "tenant-1")
            .with_user("user-1")
            .with_session("session-1");

        assert!(context.is_authenticated());
        assert_eq!(context.session_id.as_deref(), Some("session-1"));

        let anonymous = ToolExecutionContext::new("agent-1", "tenant-1");
        assert!(!anonymous.is_authenticated());
    }

    #[test]
    fn test_empty_user_id_is_not_authenticated() {
        let mut context = ToolExecutionContext::new("agent-1", "tenant-1");
        context.user_id = Some(String::new());
        assert!(!context.is_authenticated());
    }

    #[test]
    fn test_context_deserializes_camel_case() {
        let context: ToolExecutionContext = serde_json::from_value(json!({
            "agentId": "a",
            "tenantId": "t",
            "userId": "u"
        }))
        .unwrap();
        assert_eq!(context.user_id.as_deref(), Some("u"));
        assert!(context.session_id.is_none());
    }

    #[test]
    fn test_unknown_permission_level_deserializes() {
        let level: PermissionLevel = serde_json::from_str("\"superuser\"").unwrap();
        assert_eq!(level, PermissionLevel::Unknown);
        let level: PermissionLevel = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(level, PermissionLevel::Admin);
    }

    #[test]
    fn test_into_response_success() {
        let response = ToolResult::ok(json!({"results": [1]})).into_response("search");
        assert_eq!(response.name, "search");
        assert!(response.response.success);
        assert_eq!(response.response.data, Some(json!({"results": [1]})));
        assert!(response.response.error.is_none());
    }

    #[test]
    fn test_into_response_failure_always_has_error() {
        let mut result = ToolResult::failure("");
        result.error = None;
        let response = result.into_response("lookup");
        assert!(!response.response.success);
        assert_eq!(
            response.response.error.as_deref(),
            Some("Tool reported failure: lookup")
        );
    }
}
