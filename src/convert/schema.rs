//! Tool parameter-schema cleanup for the upstream's restricted JSON-Schema
//! dialect.
//!
//! The cleanup is lossy by design: keywords the upstream rejects are dropped
//! rather than translated. A schema that is still invalid after cleanup
//! causes that single tool to be skipped, never the whole request.

use serde_json::Value;

/// JSON-Schema keywords the upstream rejects, camelCase and snake_case.
const EXCLUDED_KEYS: &[&str] = &[
    "$schema",
    "additionalProperties",
    "minLength",
    "maxLength",
    "minItems",
    "maxItems",
    "uniqueItems",
    "exclusiveMaximum",
    "exclusiveMinimum",
    "const",
    "anyOf",
    "oneOf",
    "allOf",
    "additional_properties",
    "min_length",
    "max_length",
    "min_items",
    "max_items",
    "unique_items",
    "exclusive_maximum",
    "exclusive_minimum",
    "any_of",
    "one_of",
    "all_of",
];

const SUPPORTED_TYPES: &[&str] = &[
    "string", "number", "integer", "boolean", "array", "object", "null",
];

/// Strip unsupported keywords, normalize `type` casing, and default missing
/// object shapes. Running the cleaner twice produces equal output.
pub fn clean_tool_schema(schema: &mut Value) {
    strip_excluded(schema);
    normalize(schema);
}

fn strip_excluded(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for key in EXCLUDED_KEYS {
                map.remove(*key);
            }
            for child in map.values_mut() {
                strip_excluded(child);
            }
        }
        Value::Array(items) => {
            for item in items {
                strip_excluded(item);
            }
        }
        _ => {}
    }
}

fn normalize(value: &mut Value) {
    match value {
        Value::Object(map) => {
            match map.get_mut("type") {
                Some(Value::String(kind)) => {
                    *kind = kind.to_ascii_lowercase();
                }
                Some(Value::Array(kinds)) => {
                    for kind in kinds.iter_mut() {
                        if let Value::String(kind) = kind {
                            *kind = kind.to_ascii_lowercase();
                        }
                    }
                }
                Some(_) => {}
                None => {
                    map.insert("type".to_string(), Value::String("object".to_string()));
                }
            }

            if map.get("type").and_then(Value::as_str) == Some("object")
                && !map.get("properties").is_some_and(Value::is_object)
            {
                map.insert(
                    "properties".to_string(),
                    Value::Object(serde_json::Map::new()),
                );
            }

            for child in map.values_mut() {
                if child.is_object() || child.is_array() {
                    normalize_children(child);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                normalize(item);
            }
        }
        _ => {}
    }
}

// Child schemas live under `properties`/`items`/similar containers. Plain
// metadata values (descriptions, enums) must not gain a `type` key, so only
// recurse into values that already look like schema objects or schema
// containers.
fn normalize_children(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.contains_key("type")
                || map.contains_key("properties")
                || map.contains_key("items")
            {
                normalize(value);
            } else {
                for child in map.values_mut() {
                    if child.is_object() {
                        normalize_children(child);
                    }
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                if item.is_object() {
                    normalize_children(item);
                }
            }
        }
        _ => {}
    }
}

/// Check a cleaned schema against the upstream's supported subset.
pub fn validate_tool_schema(schema: &Value, context: &str) -> Result<(), String> {
    let mut errors = Vec::new();
    validate_recursive(schema, context, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}

fn validate_recursive(schema: &Value, path: &str, errors: &mut Vec<String>) {
    let Value::Object(map) = schema else {
        errors.push(format!("{path}: schema must be an object"));
        return;
    };

    if let Some(kind) = map.get("type").and_then(Value::as_str)
        && !SUPPORTED_TYPES.contains(&kind)
    {
        errors.push(format!("{path}: unsupported type '{kind}'"));
    }

    if map.get("type").and_then(Value::as_str) == Some("object") {
        if let Some(properties) = map.get("properties") {
            if let Value::Object(properties) = properties {
                for (name, subschema) in properties {
                    validate_recursive(subschema, &format!("{path}.properties.{name}"), errors);
                }
            } else {
                errors.push(format!("{path}: properties must be an object"));
            }
        }
        if let Some(required) = map.get("required")
            && !required
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string))
        {
            errors.push(format!("{path}: required must be an array of strings"));
        }
    }

    if let Some(items) = map.get("items") {
        match items {
            Value::Object(_) => validate_recursive(items, &format!("{path}.items"), errors),
            Value::Array(list) => {
                for (idx, subschema) in list.iter().enumerate() {
                    validate_recursive(subschema, &format!("{path}.items[{idx}]"), errors);
                }
            }
            _ => errors.push(format!("{path}: items must be an object or array")),
        }
    }
}
