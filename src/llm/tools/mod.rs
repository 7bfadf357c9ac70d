//! Tool calling framework
//!
//! Tools are registered once in a [`ToolRegistry`], which translates each argument
//! schema into a [`FunctionDeclaration`](crate::llm::core::types::FunctionDeclaration)
//! for the model. A [`ToolExecutor`] resolves the calls the model requests, checks
//! permissions and runs the handlers concurrently.

pub mod builtin;
pub mod declaration;
pub mod error;
pub mod executor;
pub mod permissions;
pub mod registry;
pub mod schema;
pub mod tool;
pub mod types;

// Re-export commonly used types
pub use declaration::{argument_schema, create_function_declaration};
pub use error::{RegistryError, SchemaError, ToolError};
pub use executor::{RegistryToolExecutor, ToolExecutor};
pub use permissions::check_permission;
pub use registry::{RegisteredTool, ToolRegistry};
pub use tool::{FnTool, Tool};
pub use types::{
    PermissionLevel, ToolCategory, ToolExecutionContext, ToolResult, ToolResultMetadata,
};

/// Helper macro to register multiple `#[tool]` functions at once
///
/// Takes a registry and the generated `<fn>_tool` modules.
///
/// # Example
///
/// ```ignore
/// #[tool(description = "Look up an order by id")]
/// async fn lookup_order(args: LookupArgs) -> Result<Order, String> {
///     // Implementation
/// }
///
/// #[tool(description = "Get the current weather", permission = "authenticated")]
/// async fn weather(args: WeatherArgs) -> Result<WeatherReport, String> {
///     // Implementation
/// }
///
/// let mut registry = ToolRegistry::new();
/// register_tools!(registry, lookup_order_tool, weather_tool);
/// ```
#[macro_export]
macro_rules! register_tools {
    ($registry:expr, $($tool_mod:path),+ $(,)?) => {
        $registry.register(vec![
            $(
                {
                    use $tool_mod as tool;
                    ::std::sync::Arc::new(tool::tool())
                        as ::std::sync::Arc<dyn $crate::llm::tools::Tool>
                }
            ),+
        ])?
    };
}
