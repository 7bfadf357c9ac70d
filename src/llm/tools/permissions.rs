//! Permission checks applied before a tool runs

use super::tool::Tool;
use super::types::{PermissionLevel, ToolExecutionContext};

/// Decide whether `context` may invoke `tool`
///
/// Returns the denial reason when the call is not allowed.
pub fn check_permission(tool: &dyn Tool, context: &ToolExecutionContext) -> Result<(), String> {
    match tool.permission() {
        PermissionLevel::Public => Ok(()),
        PermissionLevel::Authenticated if context.is_authenticated() => Ok(()),
        PermissionLevel::Authenticated => {
            Err("Authentication required to use this tool".to_string())
        }
        // Role elevation is not modeled; any identified user passes.
        PermissionLevel::Admin if context.is_authenticated() => Ok(()),
        PermissionLevel::Admin => Err("Authentication required for admin tools".to_string()),
        PermissionLevel::Custom => tool.authorize(context),
        PermissionLevel::Unknown => Err("Unknown permission level".to_string()),
    }
}
