//! JSON Schema → Gemini `responseSchema`
//!
//! Gemini accepts an OpenAPI-flavoured subset: uppercase type names, a
//! `nullable` flag instead of `[T, "null"]` unions and enums on strings only.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// Gemini schema node type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GeminiType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl GeminiType {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "integer" => Some(Self::Integer),
            "boolean" => Some(Self::Boolean),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            _ => None,
        }
    }
}

/// Native Gemini schema node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeminiSchema {
    #[serde(rename = "type")]
    pub kind: GeminiType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<GeminiSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, GeminiSchema>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Properties not listed in `required`. Not sent on the wire; Gemini
    /// treats anything outside `required` as optional.
    #[serde(skip)]
    pub optional_properties: Vec<String>,
}

impl GeminiSchema {
    fn of(kind: GeminiType) -> Self {
        Self {
            kind,
            description: None,
            nullable: false,
            enum_values: None,
            items: None,
            properties: None,
            required: Vec::new(),
            optional_properties: Vec::new(),
        }
    }

    /// Wire form for `generationConfig.responseSchema`.
    pub fn to_value(&self) -> Result<Value, crate::error::LlmError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Resolve the node type and nullability.
fn resolve_type(node: &serde_json::Map<String, Value>) -> (GeminiType, bool) {
    let mut nullable = node
        .get("nullable")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let declared = match node.get("type") {
        Some(Value::String(name)) => Some(name.as_str()),
        Some(Value::Array(names)) => {
            let names: Vec<&str> = names.iter().filter_map(Value::as_str).collect();
            nullable |= names.contains(&"null");
            names.into_iter().find(|name| *name != "null")
        }
        _ => None,
    };

    let kind = match declared {
        Some(name) => GeminiType::parse(name).unwrap_or_else(|| {
            warn!(schema_type = name, "unsupported schema type, falling back to string");
            GeminiType::String
        }),
        None if node.contains_key("properties") => GeminiType::Object,
        None if node.contains_key("items") => GeminiType::Array,
        None if node.contains_key("enum") => GeminiType::String,
        None => {
            warn!("schema node without a type, falling back to string");
            GeminiType::String
        }
    };
    (kind, nullable)
}

/// Convert a standard JSON Schema into Gemini's native representation.
///
/// Unknown node types fall back to a string schema. That fallback is lossy.
pub fn to_gemini_schema(schema: &Value) -> GeminiSchema {
    let Some(node) = schema.as_object() else {
        warn!("schema node is not an object, falling back to string");
        return GeminiSchema::of(GeminiType::String);
    };

    let (kind, nullable) = resolve_type(node);
    let mut out = GeminiSchema::of(kind);
    out.nullable = nullable;
    out.description = node
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);

    match kind {
        GeminiType::String => {
            out.enum_values = node.get("enum").and_then(Value::as_array).map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            });
        }
        GeminiType::Array => {
            out.items = node
                .get("items")
                .map(|items| Box::new(to_gemini_schema(items)));
        }
        GeminiType::Object => {
            let properties: BTreeMap<String, GeminiSchema> = node
                .get("properties")
                .and_then(Value::as_object)
                .map(|props| {
                    props
                        .iter()
                        .map(|(name, prop)| (name.clone(), to_gemini_schema(prop)))
                        .collect()
                })
                .unwrap_or_default();
            let listed: Vec<&str> = node
                .get("required")
                .and_then(Value::as_array)
                .map(|r| r.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            out.required = properties
                .keys()
                .filter(|name| listed.contains(&name.as_str()))
                .cloned()
                .collect();
            out.optional_properties = properties
                .keys()
                .filter(|name| !listed.contains(&name.as_str()))
                .cloned()
                .collect();
            out.properties = Some(properties);
        }
        GeminiType::Number | GeminiType::Integer | GeminiType::Boolean => {}
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn optional_properties_are_the_complement_of_required() {
        let schema = json!({
            "type": "object",
            "properties": {"a": {"type": "string"}, "b": {"type": "integer"}},
            "required": ["a"]
        });
        let native = to_gemini_schema(&schema);
        assert_eq!(native.required, vec!["a".to_string()]);
        assert_eq!(native.optional_properties, vec!["b".to_string()]);
    }

    #[test]
    fn nullable_union_shorthand() {
        let native = to_gemini_schema(&json!({"type": ["null", "number"]}));
        assert_eq!(native.kind, GeminiType::Number);
        assert!(native.nullable);
    }

    #[test]
    fn wire_form_uses_uppercase_types() {
        let schema = json!({
            "type": "array",
            "items": {"type": "string", "enum": ["red", "green"]}
        });
        let wire = to_gemini_schema(&schema).to_value().unwrap();
        assert_eq!(
            wire,
            json!({"type": "ARRAY", "items": {"type": "STRING", "enum": ["red", "green"]}})
        );
    }

    #[test]
    fn nested_objects_recurse() {
        let schema = json!({
            "type": "object",
            "properties": {
                "tags": {"type": "array", "items": {"type": "string"}},
                "owner": {
                    "type": "object",
                    "properties": {"name": {"type": "string"}},
                    "required": ["name"]
                }
            },
            "required": ["owner"]
        });
        let wire = to_gemini_schema(&schema).to_value().unwrap();
        assert_eq!(wire["properties"]["tags"]["items"]["type"], "STRING");
        assert_eq!(wire["properties"]["owner"]["required"], json!(["name"]));
        assert_eq!(wire["required"], json!(["owner"]));
    }

    #[test]
    #[tracing_test::traced_test]
    fn unknown_types_fall_back_to_string() {
        let native = to_gemini_schema(&json!({"type": "date-time"}));
        assert_eq!(native.kind, GeminiType::String);
        assert!(logs_contain("falling back to string"));
    }

    #[test]
    fn missing_type_is_inferred() {
        assert_eq!(
            to_gemini_schema(&json!({"properties": {}})).kind,
            GeminiType::Object
        );
        assert_eq!(
            to_gemini_schema(&json!({"items": {"type": "integer"}})).kind,
            GeminiType::Array
        );
    }
}
