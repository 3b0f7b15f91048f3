use serde_json::{Map, Value};

mod create_response;
mod item_param;
mod tool_param;

pub use create_response::{CreateResponseBuilder, CreateResponsePayload};
pub use item_param::ItemParam;
pub use tool_param::ToolParam;

pub(super) fn typed_object(item_type: &str) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert("type".to_string(), Value::String(item_type.to_string()));
    obj
}
