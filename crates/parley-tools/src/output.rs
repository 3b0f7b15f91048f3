use serde_json::Value;

/// Deepest container nesting a tool result may have before serialization
/// refuses it.
pub const MAX_OUTPUT_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SerializeError {
    #[error("result nests deeper than {limit} levels")]
    TooDeep { limit: usize },
    #[error("{0}")]
    Json(String),
}

/// Render a handler's return value as the string sent back to the backend.
///
/// Null becomes `"null"`, strings pass through unchanged, numbers and booleans
/// use their canonical text, and arrays/objects are pretty-printed JSON with
/// two-space indentation and sorted object keys.
pub fn serialize_output(value: &Value, max_depth: usize) -> Result<String, SerializeError> {
    match value {
        Value::Null => Ok("null".to_string()),
        Value::String(text) => Ok(text.clone()),
        Value::Bool(flag) => Ok(flag.to_string()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Array(_) | Value::Object(_) => {
            check_depth(value, 1, max_depth)?;
            serde_json::to_string_pretty(value).map_err(|err| SerializeError::Json(err.to_string()))
        }
    }
}

fn check_depth(value: &Value, depth: usize, limit: usize) -> Result<(), SerializeError> {
    let children: Box<dyn Iterator<Item = &Value>> = match value {
        Value::Array(items) => Box::new(items.iter()),
        Value::Object(map) => Box::new(map.values()),
        _ => return Ok(()),
    };
    if depth > limit {
        return Err(SerializeError::TooDeep { limit });
    }
    for child in children {
        check_depth(child, depth + 1, limit)?;
    }
    Ok(())
}
