//! Strict JSON Schema for OpenAI-compatible `response_format`
//!
//! Strict mode requires every object to list all of its properties as
//! required, forbid additional properties and have an object at the root.

use serde_json::{Map, Value, json};

/// Name of the synthetic property used to wrap non-object roots.
pub const WRAPPED_PROPERTY: &str = "value";

/// A strict schema plus whether the root was wrapped.
#[derive(Debug, Clone, PartialEq)]
pub struct StrictSchema {
    pub schema: Value,
    pub wrapped: bool,
}

/// Object nodes include nullable unions such as `["object", "null"]`.
fn is_object_node(node: &Map<String, Value>) -> bool {
    match node.get("type") {
        Some(Value::String(kind)) => kind == "object",
        Some(Value::Array(kinds)) => kinds.iter().any(|k| k == "object"),
        Some(_) => false,
        None => node.contains_key("properties"),
    }
}

/// The root must be a plain object; nullable object roots are wrapped.
fn is_object_root(node: &Map<String, Value>) -> bool {
    match node.get("type") {
        Some(Value::String(kind)) => kind == "object",
        Some(_) => false,
        None => node.contains_key("properties"),
    }
}

fn strictify(schema: &Value) -> Value {
    let Some(node) = schema.as_object() else {
        return schema.clone();
    };
    let mut out = node.clone();

    if is_object_node(node) {
        let properties: Map<String, Value> = node
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(name, prop)| (name.clone(), strictify(prop)))
                    .collect()
            })
            .unwrap_or_default();
        let required: Vec<Value> = properties.keys().cloned().map(Value::String).collect();
        out.insert("properties".to_string(), Value::Object(properties));
        out.insert("required".to_string(), Value::Array(required));
        out.insert("additionalProperties".to_string(), Value::Bool(false));
    }

    if let Some(items) = node.get("items") {
        out.insert("items".to_string(), strictify(items));
    }
    for key in ["anyOf", "oneOf", "allOf"] {
        if let Some(Value::Array(variants)) = node.get(key) {
            out.insert(
                key.to_string(),
                Value::Array(variants.iter().map(strictify).collect()),
            );
        }
    }
    for key in ["$defs", "definitions"] {
        if let Some(Value::Object(defs)) = node.get(key) {
            let defs = defs
                .iter()
                .map(|(name, def)| (name.clone(), strictify(def)))
                .collect();
            out.insert(key.to_string(), Value::Object(defs));
        }
    }
    Value::Object(out)
}

/// Convert a JSON Schema to strict form, wrapping non-object roots in
/// `{"value": <schema>}`.
pub fn to_strict_json_schema(schema: &Value) -> StrictSchema {
    let strict = strictify(schema);
    let object_root = schema.as_object().is_some_and(is_object_root);
    if object_root {
        return StrictSchema {
            schema: strict,
            wrapped: false,
        };
    }
    StrictSchema {
        schema: json!({
            "type": "object",
            "properties": { WRAPPED_PROPERTY: strict },
            "required": [WRAPPED_PROPERTY],
            "additionalProperties": false
        }),
        wrapped: true,
    }
}

/// Undo root wrapping on a response.
///
/// Only unwraps when `wrapped` is set and the text parses to an object
/// with a `value` key; anything else is returned unchanged.
pub fn unwrap_strict_response(text: &str, wrapped: bool) -> String {
    if !wrapped {
        return text.to_string();
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(mut object)) => match object.remove(WRAPPED_PROPERTY) {
            Some(inner) => serde_json::to_string(&inner).unwrap_or_else(|_| text.to_string()),
            None => text.to_string(),
        },
        _ => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_roots_get_all_properties_required() {
        let schema = json!({
            "type": "object",
            "properties": {
                "a": {"type": "string"},
                "b": {"type": "object", "properties": {"c": {"type": "number"}}}
            },
            "required": ["a"]
        });
        let strict = to_strict_json_schema(&schema);
        assert!(!strict.wrapped);
        assert_eq!(strict.schema["required"], json!(["a", "b"]));
        assert_eq!(strict.schema["additionalProperties"], json!(false));
        assert_eq!(strict.schema["properties"]["b"]["required"], json!(["c"]));
        assert_eq!(
            strict.schema["properties"]["b"]["additionalProperties"],
            json!(false)
        );
    }

    #[test]
    fn nullable_objects_are_strict() {
        let schema = json!({
            "type": "object",
            "properties": {
                "owner": {
                    "type": ["object", "null"],
                    "properties": {"name": {"type": "string"}}
                }
            }
        });
        let strict = to_strict_json_schema(&schema);
        let owner = &strict.schema["properties"]["owner"];
        assert_eq!(owner["type"], json!(["object", "null"]));
        assert_eq!(owner["required"], json!(["name"]));
        assert_eq!(owner["additionalProperties"], json!(false));
    }

    #[test]
    fn nullable_object_root_is_wrapped_and_strict() {
        let schema = json!({
            "type": ["object", "null"],
            "properties": {"id": {"type": "integer"}}
        });
        let strict = to_strict_json_schema(&schema);
        assert!(strict.wrapped);
        let inner = &strict.schema["properties"]["value"];
        assert_eq!(inner["required"], json!(["id"]));
        assert_eq!(inner["additionalProperties"], json!(false));
    }

    #[test]
    fn non_object_roots_are_wrapped() {
        let schema = json!({"type": "array", "items": {"type": "string"}});
        let strict = to_strict_json_schema(&schema);
        assert!(strict.wrapped);
        assert_eq!(strict.schema["required"], json!(["value"]));
        assert_eq!(strict.schema["properties"]["value"], schema);
    }

    #[test]
    fn array_items_of_objects_are_strict() {
        let schema = json!({
            "type": "array",
            "items": {"type": "object", "properties": {"x": {"type": "integer"}}}
        });
        let strict = to_strict_json_schema(&schema);
        let items = &strict.schema["properties"]["value"]["items"];
        assert_eq!(items["required"], json!(["x"]));
        assert_eq!(items["additionalProperties"], json!(false));
    }

    #[test]
    fn unwrap_returns_the_value_field() {
        assert_eq!(
            unwrap_strict_response(r#"{"value":["a","b"]}"#, true),
            r#"["a","b"]"#
        );
        assert_eq!(unwrap_strict_response(r#"{"value":"hi"}"#, true), r#""hi""#);
    }

    #[test]
    fn unwrap_leaves_other_text_alone() {
        assert_eq!(unwrap_strict_response(r#"{"value":1}"#, false), r#"{"value":1}"#);
        assert_eq!(unwrap_strict_response("not json", true), "not json");
        assert_eq!(unwrap_strict_response(r#"{"other":1}"#, true), r#"{"other":1}"#);
    }
}
