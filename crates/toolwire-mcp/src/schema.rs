//! Wire schema → validated parameter contract.
//!
//! Tool servers describe parameters with a JSON-Schema-like object. We only
//! need a flat view of it: each top-level property becomes a [`Primitive`]
//! with a kind, nullability, optionality and default. Nullability and
//! optionality are mutually exclusive: a property whose union admits `null`
//! is nullable and never optional, whatever `required` says.

use crate::error::McpError;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Base type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    String,
    Number,
    Integer,
    Boolean,
    /// A list of arbitrary values.
    Array,
    /// A string-keyed map of arbitrary values.
    Object,
}

impl PrimitiveKind {
    /// Map a wire type name. Unrecognized names fall back to `String`.
    fn from_wire(name: &str) -> Self {
        match name {
            "integer" => PrimitiveKind::Integer,
            "number" => PrimitiveKind::Number,
            "boolean" => PrimitiveKind::Boolean,
            "array" => PrimitiveKind::Array,
            "object" => PrimitiveKind::Object,
            _ => PrimitiveKind::String,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Number => "number",
            PrimitiveKind::Integer => "integer",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Array => "array",
            PrimitiveKind::Object => "object",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            PrimitiveKind::String => value.is_string(),
            PrimitiveKind::Number => value.is_number(),
            PrimitiveKind::Integer => value.is_i64()
                || value.is_u64()
                || value.as_f64().is_some_and(|f| f.fract() == 0.0),
            PrimitiveKind::Boolean => value.is_boolean(),
            PrimitiveKind::Array => value.is_array(),
            PrimitiveKind::Object => value.is_object(),
        }
    }
}

/// Translated contract of one parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub kind: PrimitiveKind,
    /// Accepts an explicit `null`.
    pub nullable: bool,
    /// May be omitted from the arguments.
    pub optional: bool,
    /// Filled in when the argument is omitted.
    pub default: Option<Value>,
    pub description: Option<String>,
}

/// Translated contract of a tool's parameters, in wire order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSchema {
    params: Vec<(String, Primitive)>,
}

impl ParameterSchema {
    /// Translate a tool's `inputSchema`.
    ///
    /// Fails with [`McpError::SchemaTranslation`] when the schema is
    /// structurally unusable; callers skip the tool in that case.
    pub fn translate(input_schema: &Value) -> Result<Self, McpError> {
        let schema = match input_schema {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => map,
            other => return Err(translation_error("<root>", "an object", other)),
        };

        let required: HashSet<&str> = match schema.get("required") {
            None | Some(Value::Null) => HashSet::new(),
            Some(Value::Array(names)) => names.iter().filter_map(Value::as_str).collect(),
            Some(other) => return Err(translation_error("required", "an array", other)),
        };

        let properties = match schema.get("properties") {
            None | Some(Value::Null) => return Ok(Self::default()),
            Some(Value::Object(props)) => props,
            Some(other) => return Err(translation_error("properties", "an object", other)),
        };

        let params = properties
            .iter()
            .map(|(name, prop)| {
                translate_property(name, prop, required.contains(name.as_str()))
                    .map(|p| (name.clone(), p))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { params })
    }

    pub fn get(&self, name: &str) -> Option<&Primitive> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Primitive)> {
        self.params.iter().map(|(n, p)| (n.as_str(), p))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Check `arguments` against the contract and return the arguments to send.
    ///
    /// Omitted parameters receive their default. Unknown keys are dropped,
    /// except for a schema without parameters, which passes arguments through.
    pub fn validate(&self, tool: &str, arguments: Value) -> Result<Value, McpError> {
        let mut provided = match arguments {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            other => {
                return Err(McpError::InvalidArguments {
                    tool: tool.to_string(),
                    message: format!("expected an object, got {}", type_name(&other)),
                });
            }
        };

        if self.params.is_empty() {
            return Ok(Value::Object(provided));
        }

        let mut accepted = Map::new();
        let mut problems = Vec::new();
        for (name, param) in &self.params {
            match provided.remove(name) {
                Some(Value::Null) if param.nullable => {
                    accepted.insert(name.clone(), Value::Null);
                }
                Some(value) if param.kind.accepts(&value) => {
                    accepted.insert(name.clone(), value);
                }
                Some(value) => problems.push(format!(
                    "'{name}' must be {}{}, got {}",
                    param.kind.as_str(),
                    if param.nullable { " or null" } else { "" },
                    type_name(&value)
                )),
                None => match &param.default {
                    Some(default) => {
                        accepted.insert(name.clone(), default.clone());
                    }
                    None if param.optional => {}
                    None => problems.push(format!("missing required parameter '{name}'")),
                },
            }
        }

        if !provided.is_empty() {
            let ignored: Vec<&str> = provided.keys().map(String::as_str).collect();
            tracing::debug!("Dropping unknown arguments for '{tool}': {ignored:?}");
        }

        if problems.is_empty() {
            Ok(Value::Object(accepted))
        } else {
            Err(McpError::InvalidArguments {
                tool: tool.to_string(),
                message: problems.join("; "),
            })
        }
    }

    /// Render the contract as a JSON Schema object for the language model.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for (name, param) in &self.params {
            let mut prop = Map::new();
            let kind = Value::from(param.kind.as_str());
            let ty = if param.nullable {
                Value::Array(vec![kind, Value::from("null")])
            } else {
                kind
            };
            prop.insert("type".into(), ty);
            if param.kind == PrimitiveKind::Array {
                prop.insert("items".into(), Value::Object(Map::new()));
            }
            if let Some(description) = &param.description {
                prop.insert("description".into(), Value::from(description.as_str()));
            }
            if let Some(default) = &param.default {
                prop.insert("default".into(), default.clone());
            }
            properties.insert(name.clone(), Value::Object(prop));

            if !param.optional && param.default.is_none() {
                required.push(Value::from(name.as_str()));
            }
        }

        let mut schema = Map::new();
        schema.insert("type".into(), Value::from("object"));
        schema.insert("properties".into(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".into(), Value::Array(required));
        }
        if self.params.is_empty() {
            schema.insert("additionalProperties".into(), Value::Bool(true));
        }
        Value::Object(schema)
    }
}

fn translate_property(name: &str, prop: &Value, required: bool) -> Result<Primitive, McpError> {
    let obj = prop
        .as_object()
        .ok_or_else(|| translation_error(name, "an object", prop))?;

    let description = obj
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);
    let own_default = obj.get("default").cloned();

    if let Some(alternatives) = union_alternatives(name, obj)? {
        let has_null = alternatives.iter().any(|alt| alt.type_name == Some("null"));
        let base = alternatives.iter().find(|alt| alt.type_name != Some("null"));

        let kind = base
            .and_then(|alt| alt.type_name)
            .map(PrimitiveKind::from_wire)
            .unwrap_or(PrimitiveKind::String);
        let default = base
            .and_then(|alt| alt.default.clone())
            .or(own_default);

        return Ok(Primitive {
            kind,
            nullable: has_null,
            optional: !has_null && !required,
            default,
            description,
        });
    }

    let kind = match obj.get("type") {
        None | Some(Value::Null) => PrimitiveKind::String,
        Some(Value::String(ty)) => PrimitiveKind::from_wire(ty),
        Some(other) => return Err(translation_error(name, "a type name", other)),
    };

    Ok(Primitive {
        kind,
        nullable: false,
        optional: !required,
        default: own_default,
        description,
    })
}

/// One alternative of a union encoding.
struct Alternative<'a> {
    type_name: Option<&'a str>,
    default: Option<Value>,
}

/// Collect union alternatives from `anyOf: [...]` or `type: [...]`.
///
/// Returns `None` when the property is not a (non-empty) union.
fn union_alternatives<'a>(
    name: &str,
    obj: &'a Map<String, Value>,
) -> Result<Option<Vec<Alternative<'a>>>, McpError> {
    if let Some(any_of) = obj.get("anyOf").filter(|v| !v.is_null()) {
        let items = any_of
            .as_array()
            .ok_or_else(|| translation_error(name, "an anyOf array", any_of))?;
        if items.is_empty() {
            return Ok(None);
        }
        let alternatives = items
            .iter()
            .map(|item| {
                let alt = item
                    .as_object()
                    .ok_or_else(|| translation_error(name, "anyOf alternatives to be objects", item))?;
                Ok(Alternative {
                    type_name: alt.get("type").and_then(Value::as_str),
                    default: alt.get("default").cloned(),
                })
            })
            .collect::<Result<Vec<_>, McpError>>()?;
        return Ok(Some(alternatives));
    }

    if let Some(Value::Array(types)) = obj.get("type") {
        if types.is_empty() {
            return Ok(None);
        }
        let alternatives = types
            .iter()
            .map(|ty| {
                ty.as_str()
                    .map(|t| Alternative {
                        type_name: Some(t),
                        default: None,
                    })
                    .ok_or_else(|| translation_error(name, "type names", ty))
            })
            .collect::<Result<Vec<_>, McpError>>()?;
        return Ok(Some(alternatives));
    }

    Ok(None)
}

fn translation_error(property: &str, expected: &str, got: &Value) -> McpError {
    McpError::SchemaTranslation {
        property: property.to_string(),
        message: format!("expected {expected}, got {}", type_name(got)),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
