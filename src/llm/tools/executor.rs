//! Tool executor trait and the registry-backed implementation

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::join_all;
use futures::FutureExt;
use tracing::{info, warn};

use crate::llm::core::types::{FunctionCall, FunctionResponse};

use super::permissions::check_permission;
use super::registry::ToolRegistry;
use super::types::ToolExecutionContext;

/// Message reported when a handler panics
const UNKNOWN_FAILURE: &str = "Tool execution failed with an unknown error";

/// Trait for executing function calls requested by the model
///
/// Implementations never fail: every problem is reported inside the returned
/// [`FunctionResponse`].
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute a single call
    async fn execute_function_call(
        &self,
        call: &FunctionCall,
        context: &ToolExecutionContext,
    ) -> FunctionResponse;

    /// Execute calls concurrently
    ///
    /// Responses come back in the same order as `calls`, whatever order the
    /// handlers finish in.
    async fn execute_function_calls(
        &self,
        calls: &[FunctionCall],
        context: &ToolExecutionContext,
    ) -> Vec<FunctionResponse> {
        join_all(
            calls
                .iter()
                .map(|call| self.execute_function_call(call, context)),
        )
        .await
    }
}

/// Executor that resolves calls against a [`ToolRegistry`]
#[derive(Clone)]
pub struct RegistryToolExecutor {
    registry: Arc<ToolRegistry>,
    tool_timeout: Option<Duration>,
}

impl RegistryToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            tool_timeout: None,
        }
    }

    /// Bound each handler invocation by wall-clock time
    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    /// Resolve, authorize and run one call; `Err` carries the failure message
    async fn dispatch(
        &self,
        call: &FunctionCall,
        context: &ToolExecutionContext,
    ) -> Result<FunctionResponse, String> {
        let entry = self
            .registry
            .get(&call.name)
            .ok_or_else(|| format!("Tool not found: {}", call.name))?;

        if !entry.enabled {
            return Err(format!("Tool is disabled: {}", call.name));
        }

        check_permission(entry.tool.as_ref(), context)?;

        let invocation = AssertUnwindSafe(entry.tool.invoke(call.args.clone(), context)).catch_unwind();
        let outcome = match self.tool_timeout {
            Some(limit) => tokio::time::timeout(limit, invocation).await.map_err(|_| {
                format!("Tool execution timed out after {}ms", limit.as_millis())
            })?,
            None => invocation.await,
        };

        match outcome {
            Ok(Ok(result)) => Ok(result.into_response(call.name.clone())),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_panic) => Err(UNKNOWN_FAILURE.to_string()),
        }
    }
}

#[async_trait]
impl ToolExecutor for RegistryToolExecutor {
    async fn execute_function_call(
        &self,
        call: &FunctionCall,
        context: &ToolExecutionContext,
    ) -> FunctionResponse {
        let start = Instant::now();
        let response = match self.dispatch(call, context).await {
            Ok(response) => response,
            Err(message) => FunctionResponse::failure(call.name.clone(), non_empty(message)),
        };
        let elapsed_ms = start.elapsed().as_millis() as u64;

        if response.response.success {
            info!(tool = %call.name, success = true, elapsed_ms, "Tool executed");
        } else {
            warn!(
                tool = %call.name,
                success = false,
                elapsed_ms,
                error = response.response.error.as_deref().unwrap_or_default(),
                "Tool execution failed"
            );
        }

        response
    }
}

fn non_empty(message: String) -> String {
    if message.trim().is_empty() {
        UNKNOWN_FAILURE.to_string()
    } else {
        message
    }
}
