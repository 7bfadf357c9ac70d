//! Function declaration helpers using JSON Schema generation

use schemars::{schema_for, JsonSchema};
use serde_json::{json, Value};

use crate::llm::core::types::FunctionDeclaration;

use super::error::SchemaError;
use super::schema::translate;

/// JSON Schema describing the argument type `T`
///
/// Doc comments on fields become property descriptions.
pub fn argument_schema<T: JsonSchema>() -> Value {
    serde_json::to_value(schema_for!(T)).unwrap_or_else(|_| json!({ "type": "object" }))
}

/// Create a function declaration from a type that implements JsonSchema
///
/// # Example
///
/// ```ignore
/// use schemars::JsonSchema;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, JsonSchema)]
/// struct LookupArgs {
///     /// Identifier of the item
///     id: String,
///     /// Include archived items
///     #[serde(default)]
///     archived: bool,
/// }
///
/// let decl = create_function_declaration::<LookupArgs>(
///     "lookup",
///     "Look up an item by id"
/// )?;
/// assert_eq!(decl.parameters.required, vec!["id"]);
/// ```
pub fn create_function_declaration<T: JsonSchema>(
    name: impl Into<String>,
    description: impl Into<String>,
) -> Result<FunctionDeclaration, SchemaError> {
    translate(&name.into(), &description.into(), &argument_schema::<T>())
}
