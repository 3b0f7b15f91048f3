use serde_json::Value;

use super::typed_object;

/// A tool advertised to the backend in the request's `tools` array.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolParam {
    value: Value,
}

impl ToolParam {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        strict: bool,
    ) -> Self {
        let mut obj = typed_object("function");
        obj.insert("name".to_string(), Value::String(name.into()));
        obj.insert("description".to_string(), Value::String(description.into()));
        obj.insert("parameters".to_string(), parameters);
        obj.insert("strict".to_string(), Value::Bool(strict));
        Self::new(Value::Object(obj))
    }

    pub fn name(&self) -> Option<&str> {
        self.value.get("name").and_then(Value::as_str)
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}
