//! Helpers for the raw JSON documents held in pending/base tables

use serde_json::Value;

/// Turn a `content` cell into a JSON document.
///
/// Stores that return JSON columns as text hand back a string, which is
/// parsed here; stores with a native JSON type hand back the document itself.
pub fn parse_content(content: &Value) -> Result<Value, String> {
    match content {
        Value::String(text) => {
            let mut bytes = text.as_bytes().to_vec();
            simd_json::serde::from_slice::<Value>(&mut bytes).map_err(|e| e.to_string())
        }
        other => Ok(other.clone()),
    }
}

/// Walk a dot-delimited path. Missing keys and non-container intermediates
/// yield `None`; numeric segments index into arrays.
pub fn value_at_path<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = document;
    for part in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}
