//! Tool registry: the catalog of tools and their declarations

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::llm::core::types::FunctionDeclaration;

use super::error::RegistryError;
use super::schema::translate;
use super::tool::Tool;

/// A tool together with its translated declaration
#[derive(Clone)]
pub struct RegisteredTool {
    pub tool: Arc<dyn Tool>,
    pub declaration: FunctionDeclaration,
    pub enabled: bool,
}

/// Registry for managing tools
///
/// Populated once at startup, then shared behind an `Arc` and only read.
/// Listings follow registration order.
///
/// # Example
///
/// ```ignore
/// let mut registry = ToolRegistry::new();
/// registry.register(vec![Arc::new(lookup_tool::tool())])?;
///
/// let declarations = registry.get_enabled_function_declarations();
/// ```
#[derive(Default)]
pub struct ToolRegistry {
    entries: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register tools, translating each argument schema into a declaration
    ///
    /// A name that is already registered is replaced in place (last write wins).
    ///
    /// # Errors
    ///
    /// Returns an error if a tool's argument schema cannot be translated. Tools
    /// earlier in the list stay registered.
    pub fn register(&mut self, tools: Vec<Arc<dyn Tool>>) -> Result<(), RegistryError> {
        for tool in tools {
            let declaration = translate(tool.name(), tool.description(), &tool.argument_schema())?;
            let entry = RegisteredTool {
                enabled: tool.enabled(),
                tool,
                declaration,
            };
            let name = entry.declaration.name.clone();

            match self.index.get(&name) {
                Some(&slot) => {
                    warn!(tool = %name, "Tool already registered, replacing");
                    self.entries[slot] = entry;
                }
                None => {
                    debug!(tool = %name, "Registered tool");
                    self.index.insert(name, self.entries.len());
                    self.entries.push(entry);
                }
            }
        }
        Ok(())
    }

    /// Register a single tool
    pub fn register_tool(&mut self, tool: impl Tool + 'static) -> Result<(), RegistryError> {
        self.register(vec![Arc::new(tool)])
    }

    /// Look up a registry entry by name
    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.index.get(name).map(|&slot| &self.entries[slot])
    }

    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.get(name).map(|entry| Arc::clone(&entry.tool))
    }

    pub fn get_function_declaration(&self, name: &str) -> Option<&FunctionDeclaration> {
        self.get(name).map(|entry| &entry.declaration)
    }

    /// Tools currently enabled
    pub fn get_enabled_tools(&self) -> Vec<Arc<dyn Tool>> {
        self.entries
            .iter()
            .filter(|entry| entry.enabled)
            .map(|entry| Arc::clone(&entry.tool))
            .collect()
    }

    pub fn get_enabled_function_declarations(&self) -> Vec<FunctionDeclaration> {
        self.entries
            .iter()
            .filter(|entry| entry.enabled)
            .map(|entry| entry.declaration.clone())
            .collect()
    }

    /// Tools from an agent's allow-list, in allow-list order
    ///
    /// Unknown and disabled names are dropped without error.
    pub fn get_tools_for_agent(&self, names: &[String]) -> Vec<Arc<dyn Tool>> {
        self.agent_entries(names)
            .map(|entry| Arc::clone(&entry.tool))
            .collect()
    }

    pub fn get_function_declarations_for_agent(&self, names: &[String]) -> Vec<FunctionDeclaration> {
        self.agent_entries(names)
            .map(|entry| entry.declaration.clone())
            .collect()
    }

    fn agent_entries<'a>(
        &'a self,
        names: &'a [String],
    ) -> impl Iterator<Item = &'a RegisteredTool> + 'a {
        names
            .iter()
            .filter_map(|name| self.get(name))
            .filter(|entry| entry.enabled)
    }

    /// Enable or disable a tool; returns false if the name is unknown
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.index.get(name) {
            Some(&slot) => {
                self.entries[slot].enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Remove a tool, returning it if it was registered
    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn Tool>> {
        let slot = self.index.remove(name)?;
        let removed = self.entries.remove(slot);
        for position in self.index.values_mut() {
            if *position > slot {
                *position -= 1;
            }
        }
        Some(removed.tool)
    }

    /// Check if a tool is registered
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
