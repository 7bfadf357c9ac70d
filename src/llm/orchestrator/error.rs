use std::time::Duration;

use crate::llm::core::error::LlmError;

/// Errors that interrupt a tool-calling run
///
/// These never reach the caller of `chat_with_tools`; they select the fallback path.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// Error from the LLM provider
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// A model call exceeded its wall-clock budget
    #[error("{operation} timed out after {}ms", after.as_millis())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// The provider panicked during a model call
    #[error("{operation} panicked")]
    Panicked { operation: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let err = OrchestratorError::Timeout {
            operation: "generate_with_tools",
            after: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "generate_with_tools timed out after 250ms");
    }

    #[test]
    fn test_panicked_display() {
        let err = OrchestratorError::Panicked {
            operation: "continue_with_results",
        };
        assert_eq!(err.to_string(), "continue_with_results panicked");
    }

    #[test]
    fn test_llm_error_converts() {
        let err: OrchestratorError = LlmError::StreamError("reset".to_string()).into();
        assert!(matches!(err, OrchestratorError::Llm(_)));
        assert!(err.to_string().starts_with("LLM error"));
    }
}
