//! The `Tool` trait and a closure-backed implementation

use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::declaration::argument_schema;
use super::error::ToolError;
use super::types::{PermissionLevel, ToolCategory, ToolExecutionContext, ToolResult};

/// A capability the model can invoke mid-conversation
///
/// Implementations are registered once in a
/// [`ToolRegistry`](super::registry::ToolRegistry) and shared across requests.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name, as declared to the model
    fn name(&self) -> &str;

    /// What the tool does; the model reads this to decide when to call it
    fn description(&self) -> &str;

    fn category(&self) -> ToolCategory {
        ToolCategory::Utility
    }

    fn permission(&self) -> PermissionLevel {
        PermissionLevel::Public
    }

    /// Whether the tool starts out enabled when registered
    fn enabled(&self) -> bool {
        true
    }

    /// JSON Schema of the arguments object
    fn argument_schema(&self) -> Value;

    /// Tool-specific authorization for [`PermissionLevel::Custom`]
    ///
    /// Returns the denial reason on failure. Allows everything by default.
    fn authorize(&self, _context: &ToolExecutionContext) -> Result<(), String> {
        Ok(())
    }

    /// Run the tool
    async fn invoke(
        &self,
        args: Map<String, Value>,
        context: &ToolExecutionContext,
    ) -> Result<ToolResult, ToolError>;
}

type Handler = Box<
    dyn Fn(Map<String, Value>, ToolExecutionContext) -> BoxFuture<'static, Result<ToolResult, ToolError>>
        + Send
        + Sync,
>;

/// A [`Tool`] backed by an async function with typed arguments
///
/// Arguments are deserialized with `serde` and described with `schemars`;
/// the function's output is serialized into the result data.
///
/// # Example
///
/// ```ignore
/// #[derive(Deserialize, JsonSchema)]
/// struct EchoArgs {
///     /// Text to echo back
///     text: String,
/// }
///
/// let echo = FnTool::new("echo", "Echo the input", |args: EchoArgs, _ctx| async move {
///     Ok::<_, String>(json!({ "text": args.text }))
/// });
/// ```
pub struct FnTool {
    name: String,
    description: String,
    category: ToolCategory,
    permission: PermissionLevel,
    enabled: bool,
    schema: Value,
    handler: Handler,
}

impl FnTool {
    pub fn new<F, Args, R, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        func: F,
    ) -> Self
    where
        F: Fn(Args, ToolExecutionContext) -> Fut + Send + Sync + 'static,
        Args: DeserializeOwned + JsonSchema + Send + 'static,
        R: Serialize + Send + 'static,
        Fut: Future<Output = Result<R, String>> + Send + 'static,
    {
        let wrapper = move |args_json: Map<String, Value>, context: ToolExecutionContext| {
            let args = match serde_json::from_value::<Args>(Value::Object(args_json)) {
                Ok(args) => args,
                Err(e) => {
                    let err = ToolError::InvalidArguments(e.to_string());
                    return Box::pin(async move { Err(err) }) as BoxFuture<'static, _>;
                }
            };

            let future = func(args, context);

            Box::pin(async move {
                let output = future.await.map_err(ToolError::Execution)?;
                let data = serde_json::to_value(&output).map_err(|e| {
                    ToolError::execution(format!("Failed to serialize result: {}", e))
                })?;
                Ok(ToolResult::ok(data))
            }) as BoxFuture<'static, _>
        };

        Self {
            name: name.into(),
            description: description.into(),
            category: ToolCategory::Utility,
            permission: PermissionLevel::Public,
            enabled: true,
            schema: argument_schema::<Args>(),
            handler: Box::new(wrapper),
        }
    }

    pub fn with_category(mut self, category: ToolCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_permission(mut self, permission: PermissionLevel) -> Self {
        self.permission = permission;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl fmt::Debug for FnTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("permission", &self.permission)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn category(&self) -> ToolCategory {
        self.category
    }

    fn permission(&self) -> PermissionLevel {
        self.permission
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn argument_schema(&self) -> Value {
        self.schema.clone()
    }

    async fn invoke(
        &self,
        args: Map<String, Value>,
        context: &ToolExecutionContext,
    ) -> Result<ToolResult, ToolError> {
        (self.handler)(args, context.clone()).await
    }
}
