//! Argument schema translation
//!
//! Turns a tool's JSON Schema (usually produced by `schemars`) into the
//! provider-neutral [`FunctionDeclaration`] the model reads.
//!
//! | schema kind                          | declared as                     |
//! |--------------------------------------|---------------------------------|
//! | `string`                             | `string`                        |
//! | `number`, `integer`                  | `number`                        |
//! | `boolean`                            | `boolean`                       |
//! | `enum` / string `oneOf` of constants | `string` with `enum`            |
//! | `array`                              | `array` with translated `items` |
//! | `object` with `properties`           | `object` with `properties`      |
//! | map (`additionalProperties` only)    | `object`, no properties         |
//! | anything else                        | `string`, with a warning        |
//!
//! Nullable wrappers (`["T", "null"]`, `anyOf [T, null]`) and fields carrying a
//! `default` are unwrapped and left out of `required`.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::warn;

use crate::llm::core::types::{
    FunctionDeclaration, ParametersSchema, PropertySchema, PropertyType,
};

use super::error::SchemaError;

/// Recursive types stop being expanded past this depth
const MAX_DEPTH: usize = 16;

/// Translate a tool's argument schema into a function declaration
///
/// Pure: identical inputs always yield identical declarations.
pub fn translate(
    name: &str,
    description: &str,
    schema: &Value,
) -> Result<FunctionDeclaration, SchemaError> {
    let translator = Translator {
        tool: name,
        definitions: schema.get("definitions").and_then(Value::as_object),
    };

    let (root, _) = translator.unwrap(schema)?;
    let untyped_object = root.is_object() && root.get("type").is_none();
    if !(is_object(&root) || untyped_object) {
        return Err(SchemaError::NotAnObject {
            tool: name.to_string(),
            found: describe_kind(&root),
        });
    }

    let required_fields: Vec<&str> = root
        .get("required")
        .and_then(Value::as_array)
        .map(|fields| fields.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut properties = BTreeMap::new();
    let mut required = Vec::new();
    if let Some(fields) = root.get("properties").and_then(Value::as_object) {
        for (field, field_schema) in fields {
            let (inner, optional) = translator.unwrap(field_schema)?;
            if !optional && required_fields.contains(&field.as_str()) {
                required.push(field.clone());
            }
            let property = translator.property(&inner, 1)?;
            properties.insert(field.clone(), property);
        }
    }

    Ok(FunctionDeclaration {
        name: name.to_string(),
        description: description.to_string(),
        parameters: ParametersSchema {
            kind: PropertyType::Object,
            properties,
            required,
        },
    })
}

struct Translator<'a> {
    tool: &'a str,
    definitions: Option<&'a Map<String, Value>>,
}

impl Translator<'_> {
    /// Resolve references and strip optional wrappers
    ///
    /// Returns the concrete schema (carrying the outermost description) and whether
    /// any optional/default wrapper was removed on the way.
    fn unwrap(&self, schema: &Value) -> Result<(Value, bool), SchemaError> {
        let mut current = schema.clone();
        let mut optional = false;
        let mut description = description_of(schema);

        for _ in 0..MAX_DEPTH {
            if current.get("default").is_some() {
                optional = true;
            }
            if current.get("nullable").and_then(Value::as_bool) == Some(true) {
                optional = true;
            }
            if description.is_none() {
                description = description_of(&current);
            }

            if let Some(reference) = current.get("$ref").and_then(Value::as_str) {
                current = self.resolve(reference)?;
                continue;
            }

            if let Some(inner) = single_all_of(&current) {
                current = inner.clone();
                continue;
            }

            if let Some(inner) = non_null_alternative(&current) {
                optional = true;
                current = inner.clone();
                continue;
            }

            if let Some(kind) = nullable_type(&current) {
                optional = true;
                if let Some(object) = current.as_object_mut() {
                    object.insert("type".to_string(), Value::String(kind));
                }
            }
            break;
        }

        if let (Some(text), Some(object)) = (description, current.as_object_mut()) {
            object.insert("description".to_string(), Value::String(text));
        }
        Ok((current, optional))
    }

    fn resolve(&self, reference: &str) -> Result<Value, SchemaError> {
        let key = reference
            .strip_prefix("#/definitions/")
            .or_else(|| reference.strip_prefix("#/$defs/"));

        key.and_then(|key| self.definitions.and_then(|defs| defs.get(key)))
            .cloned()
            .ok_or_else(|| SchemaError::UnresolvedReference {
                tool: self.tool.to_string(),
                reference: reference.to_string(),
            })
    }

    /// Map an unwrapped schema onto a property description
    fn property(&self, schema: &Value, depth: usize) -> Result<PropertySchema, SchemaError> {
        let description = description_of(schema);

        if let Some(values) = enum_values(schema) {
            return Ok(PropertySchema {
                enum_values: Some(values),
                ..PropertySchema::of(PropertyType::String)
            }
            .with_description(description));
        }

        let kind = match schema.get("type").and_then(Value::as_str) {
            Some("string") => PropertyType::String,
            Some("number") | Some("integer") => PropertyType::Number,
            Some("boolean") => PropertyType::Boolean,
            Some("array") => PropertyType::Array,
            Some("object") => PropertyType::Object,
            None if schema.get("properties").is_some() => PropertyType::Object,
            _ => {
                warn!(
                    tool = self.tool,
                    kind = %describe_kind(schema),
                    "Unsupported argument kind, declaring as string"
                );
                return Ok(PropertySchema::of(PropertyType::String).with_description(description));
            }
        };

        let mut property = PropertySchema::of(kind).with_description(description);
        if depth >= MAX_DEPTH {
            warn!(tool = self.tool, "Argument schema nests too deeply, truncating");
            return Ok(property);
        }

        match kind {
            PropertyType::Array => {
                let items = match schema.get("items") {
                    Some(Value::Array(tuple)) => tuple.first(),
                    other => other,
                };
                if let Some(items) = items {
                    let (inner, _) = self.unwrap(items)?;
                    property.items = Some(Box::new(self.property(&inner, depth + 1)?));
                }
            }
            PropertyType::Object => {
                if let Some(fields) = schema.get("properties").and_then(Value::as_object) {
                    let mut nested = BTreeMap::new();
                    for (field, field_schema) in fields {
                        let (inner, _) = self.unwrap(field_schema)?;
                        nested.insert(field.clone(), self.property(&inner, depth + 1)?);
                    }
                    property.properties = Some(nested);
                }
            }
            _ => {}
        }

        Ok(property)
    }
}

fn description_of(schema: &Value) -> Option<String> {
    schema
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn is_object(schema: &Value) -> bool {
    schema.get("type").and_then(Value::as_str) == Some("object")
}

/// `allOf: [X]` is how `schemars` attaches a description to a reference
fn single_all_of(schema: &Value) -> Option<&Value> {
    match schema.get("allOf").and_then(Value::as_array) {
        Some(all) if all.len() == 1 => all.first(),
        _ => None,
    }
}

/// `anyOf`/`oneOf` of exactly one schema plus `{type: null}`
fn non_null_alternative(schema: &Value) -> Option<&Value> {
    let options = schema
        .get("anyOf")
        .or_else(|| schema.get("oneOf"))
        .and_then(Value::as_array)?;

    let non_null: Vec<&Value> = options.iter().filter(|option| !is_null_type(option)).collect();
    if non_null.len() == 1 && options.len() == 2 {
        Some(non_null[0])
    } else {
        None
    }
}

fn is_null_type(schema: &Value) -> bool {
    schema.get("type").and_then(Value::as_str) == Some("null")
}

/// `type: ["T", "null"]` collapses to `T`
fn nullable_type(schema: &Value) -> Option<String> {
    let kinds = schema.get("type").and_then(Value::as_array)?;
    if !kinds.iter().any(|kind| kind.as_str() == Some("null")) {
        return None;
    }
    kinds
        .iter()
        .filter_map(Value::as_str)
        .find(|kind| *kind != "null")
        .map(str::to_string)
}

/// Allowed values of an enum, from `enum` or from a `oneOf` of single-value enums
fn enum_values(schema: &Value) -> Option<Vec<String>> {
    if let Some(values) = schema.get("enum").and_then(Value::as_array) {
        return Some(values.iter().map(enum_literal).collect());
    }

    let variants = schema.get("oneOf").and_then(Value::as_array)?;
    let mut values = Vec::new();
    for variant in variants {
        if let Some(constant) = variant.get("const") {
            values.push(enum_literal(constant));
        } else {
            values.extend(variant.get("enum")?.as_array()?.iter().map(enum_literal));
        }
    }
    Some(values)
}

fn enum_literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn describe_kind(schema: &Value) -> String {
    match schema.get("type") {
        Some(Value::String(kind)) => kind.clone(),
        Some(other) => other.to_string(),
        None if schema.is_boolean() => format!("schema `{}`", schema),
        None => "untyped schema".to_string(),
    }
}
