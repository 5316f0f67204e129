//! Response schema sent with summary requests.
//!
//! The JSON Schema is derived from [`SummaryResult`] with schemars and then narrowed to the
//! OpenAPI subset Gemini accepts for `responseSchema`.

use crate::summary::{SummaryResult, WordRange};
use serde_json::{Map, Value};

/// Keys Gemini understands inside a `responseSchema` node.
const ALLOWED_KEYS: &[&str] = &[
    "type",
    "properties",
    "items",
    "required",
    "description",
    "enum",
    "nullable",
    "format",
];

/// The schema constraining a summary reply, with the word range for the chosen tier.
pub fn summary_schema(range: WordRange) -> Value {
    let derived = serde_json::to_value(schemars::schema_for!(SummaryResult)).unwrap_or_default();
    let mut schema = to_gemini(&derived);

    // Only the fields carry instructions; the struct doc stays out of the request.
    if let Some(root) = schema.as_object_mut() {
        root.remove("description");
    }

    if let Some(summary) = schema.pointer_mut("/properties/summary") {
        summary["description"] = Value::String(format!(
            "A concise summary of the text, between {} and {} words.",
            range.min, range.max
        ));
    }
    schema
}

/// Convert a JSON Schema node into Gemini's schema dialect.
fn to_gemini(node: &Value) -> Value {
    let Value::Object(map) = node else {
        return node.clone();
    };

    let mut out = Map::new();
    for (key, value) in map {
        if !ALLOWED_KEYS.contains(&key.as_str()) {
            continue;
        }
        match key.as_str() {
            "type" => {
                let (ty, nullable) = gemini_type(value);
                if let Some(ty) = ty {
                    out.insert("type".to_string(), Value::String(ty));
                }
                if nullable {
                    out.insert("nullable".to_string(), Value::Bool(true));
                }
            }
            "properties" => {
                let props = value
                    .as_object()
                    .map(|props| {
                        props
                            .iter()
                            .map(|(name, prop)| (name.clone(), to_gemini(prop)))
                            .collect::<Map<_, _>>()
                    })
                    .unwrap_or_default();
                out.insert(key.clone(), Value::Object(props));
            }
            "items" => {
                out.insert(key.clone(), to_gemini(value));
            }
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(out)
}

/// `"string"` becomes `STRING`; `["string", "null"]` becomes `STRING` plus nullable.
fn gemini_type(value: &Value) -> (Option<String>, bool) {
    match value {
        Value::String(ty) => (Some(ty.to_uppercase()), false),
        Value::Array(types) => {
            let nullable = types.iter().any(|t| t == "null");
            let ty = types
                .iter()
                .filter_map(Value::as_str)
                .find(|t| *t != "null")
                .map(str::to_uppercase);
            (ty, nullable)
        }
        _ => (None, false),
    }
}
