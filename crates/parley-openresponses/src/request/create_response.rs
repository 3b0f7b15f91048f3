use serde_json::{Map, Value};

use super::{ItemParam, ToolParam};

#[derive(Debug, Clone, PartialEq)]
pub struct CreateResponsePayload {
    body: Value,
}

impl CreateResponsePayload {
    pub fn new(body: Value) -> Self {
        Self { body }
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn into_body(self) -> Value {
        self.body
    }

    pub fn input_len(&self) -> usize {
        self.body
            .get("input")
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn has_tools(&self) -> bool {
        self.body.get("tools").is_some()
    }
}

#[derive(Debug, Default)]
pub struct CreateResponseBuilder {
    body: Map<String, Value>,
}

impl CreateResponseBuilder {
    pub fn new() -> Self {
        Self { body: Map::new() }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.body
            .insert("model".to_string(), Value::String(model.into()));
        self
    }

    pub fn input_items(mut self, items: Vec<ItemParam>) -> Self {
        let array = items
            .into_iter()
            .map(ItemParam::into_value)
            .collect::<Vec<_>>();
        self.body.insert("input".to_string(), Value::Array(array));
        self
    }

    /// An empty tool list leaves `tools` off the request entirely.
    pub fn tools(mut self, tools: Vec<ToolParam>) -> Self {
        if tools.is_empty() {
            self.body.remove("tools");
            return self;
        }
        let array = tools
            .into_iter()
            .map(ToolParam::into_value)
            .collect::<Vec<_>>();
        self.body.insert("tools".to_string(), Value::Array(array));
        self
    }

    pub fn parallel_tool_calls(mut self, enabled: bool) -> Self {
        self.body
            .insert("parallel_tool_calls".to_string(), Value::Bool(enabled));
        self
    }

    pub fn build(self) -> CreateResponsePayload {
        CreateResponsePayload::new(Value::Object(self.body))
    }
}
