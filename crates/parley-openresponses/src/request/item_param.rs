use serde_json::Value;

use super::typed_object;

/// One entry of the `input` array sent to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemParam {
    value: Value,
}

impl ItemParam {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    pub fn message_text(role: impl Into<String>, text: impl Into<String>) -> Self {
        let mut obj = typed_object("message");
        obj.insert("role".to_string(), Value::String(role.into()));
        obj.insert("content".to_string(), Value::String(text.into()));
        Self::new(Value::Object(obj))
    }

    pub fn system_message_text(text: impl Into<String>) -> Self {
        Self::message_text("system", text)
    }

    pub fn user_message_text(text: impl Into<String>) -> Self {
        Self::message_text("user", text)
    }

    /// `item_id` is the backend-assigned item id, echoed back when known.
    pub fn function_call(
        item_id: Option<&str>,
        call_id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        let mut obj = typed_object("function_call");
        if let Some(id) = item_id {
            obj.insert("id".to_string(), Value::String(id.to_string()));
        }
        obj.insert("call_id".to_string(), Value::String(call_id.into()));
        obj.insert("name".to_string(), Value::String(name.into()));
        obj.insert("arguments".to_string(), Value::String(arguments.into()));
        Self::new(Value::Object(obj))
    }

    pub fn function_call_output(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        let mut obj = typed_object("function_call_output");
        obj.insert("call_id".to_string(), Value::String(call_id.into()));
        obj.insert("output".to_string(), Value::String(output.into()));
        Self::new(Value::Object(obj))
    }

    /// Reasoning items are opaque; the payload is sent back exactly as received.
    pub fn reasoning_raw(payload: Value) -> Self {
        Self::new(payload)
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}
