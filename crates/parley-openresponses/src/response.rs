//! Typed view of a non-streaming `ResponseResource`.
//!
//! Output items are classified by their `type` tag. Reasoning items stay as raw
//! JSON because they are echoed back to the backend untouched. Unknown item
//! types are preserved as [`OutputItem::Other`] and ignored by callers.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ResponseError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct ResponseFields {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    output: Vec<Value>,
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    error: Option<ResponseError>,
}

#[derive(Debug, Clone)]
pub struct ResponseResource {
    id: Option<String>,
    status: Option<String>,
    output: Vec<Value>,
    output_text: Option<String>,
    error: Option<ResponseError>,
    raw: Value,
}

impl ResponseResource {
    pub fn from_value(raw: Value) -> Result<Self, String> {
        let fields: ResponseFields = serde_json::from_value(raw.clone())
            .map_err(|err| format!("response body: {err}"))?;
        Ok(Self {
            id: fields.id,
            status: fields.status,
            output: fields.output,
            output_text: fields.output_text,
            error: fields.error,
            raw,
        })
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn error(&self) -> Option<&ResponseError> {
        self.error.as_ref()
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }

    pub fn output_items(&self) -> Result<Vec<OutputItem>, String> {
        self.output
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                OutputItem::from_value(item).map_err(|err| format!("output[{idx}]: {err}"))
            })
            .collect()
    }

    /// Concatenated text of every message segment, falling back to the
    /// `output_text` convenience field when the output carries no text parts.
    pub fn final_text(&self) -> Result<String, String> {
        let segments = self
            .output_items()?
            .into_iter()
            .filter_map(|item| match item {
                OutputItem::Message(message) => Some(message.segments),
                _ => None,
            })
            .flatten()
            .collect::<Vec<_>>();
        if segments.is_empty() {
            return Ok(self
                .output_text
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string());
        }
        Ok(segments.concat().trim().to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutputItem {
    Message(MessageItem),
    FunctionCall(FunctionCallItem),
    Reasoning(Value),
    Other(String),
}

impl OutputItem {
    pub fn from_value(value: &Value) -> Result<Self, String> {
        // An item without a type tag is just another kind we don't know.
        let item_type = value.get("type").and_then(Value::as_str).unwrap_or_default();
        match item_type {
            "message" => {
                let raw: RawMessage =
                    serde_json::from_value(value.clone()).map_err(|err| err.to_string())?;
                Ok(Self::Message(MessageItem {
                    segments: raw.content.segments(),
                }))
            }
            "function_call" => {
                let raw: RawFunctionCall =
                    serde_json::from_value(value.clone()).map_err(|err| err.to_string())?;
                let call_id = raw
                    .call_id
                    .filter(|id| !id.is_empty())
                    .or_else(|| raw.id.clone())
                    .unwrap_or_default();
                Ok(Self::FunctionCall(FunctionCallItem {
                    item_id: raw.id,
                    call_id,
                    name: raw.name,
                    arguments: raw.arguments,
                }))
            }
            "reasoning" => Ok(Self::Reasoning(value.clone())),
            other => Ok(Self::Other(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageItem {
    pub segments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCallItem {
    pub item_id: Option<String>,
    pub call_id: String,
    pub name: String,
    pub arguments: String,
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(default)]
    content: RawContent,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawContent {
    Text(String),
    Parts(Vec<RawContentPart>),
}

impl Default for RawContent {
    fn default() -> Self {
        Self::Parts(Vec::new())
    }
}

impl RawContent {
    fn segments(self) -> Vec<String> {
        match self {
            Self::Text(text) => vec![text],
            Self::Parts(parts) => parts
                .into_iter()
                .filter(|part| matches!(part.kind.as_str(), "output_text" | "text"))
                .filter_map(|part| part.text)
                .collect(),
        }
    }
}

#[derive(Deserialize)]
struct RawContentPart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct RawFunctionCall {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    call_id: Option<String>,
    name: String,
    #[serde(default)]
    arguments: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_output_items() {
        let response = ResponseResource::from_value(json!({
            "id": "resp_1",
            "output": [
                { "type": "reasoning", "id": "rs_1", "summary": [] },
                { "type": "function_call", "id": "fc_1", "call_id": "call_1", "name": "noop", "arguments": "{}" },
                { "type": "web_search_call", "id": "ws_1" }
            ]
        }))
        .expect("response");

        let items = response.output_items().expect("items");
        assert!(matches!(items[0], OutputItem::Reasoning(_)));
        assert_eq!(
            items[1],
            OutputItem::FunctionCall(FunctionCallItem {
                item_id: Some("fc_1".to_string()),
                call_id: "call_1".to_string(),
                name: "noop".to_string(),
                arguments: "{}".to_string(),
            })
        );
        assert_eq!(items[2], OutputItem::Other("web_search_call".to_string()));
    }

    #[test]
    fn untagged_item_is_ignored_like_unknown_types() {
        let response = ResponseResource::from_value(json!({
            "output": [
                { "role": "assistant" },
                { "type": "message", "content": "still here" }
            ]
        }))
        .expect("response");
        let items = response.output_items().expect("items");
        assert_eq!(items[0], OutputItem::Other(String::new()));
        assert_eq!(response.final_text().expect("text"), "still here");
    }

    #[test]
    fn function_call_falls_back_to_item_id() {
        let item = OutputItem::from_value(&json!({
            "type": "function_call",
            "id": "fc_9",
            "name": "noop"
        }))
        .expect("item");
        let OutputItem::FunctionCall(call) = item else {
            panic!("expected function call");
        };
        assert_eq!(call.call_id, "fc_9");
        assert_eq!(call.arguments, "");
    }

    #[test]
    fn function_call_without_name_is_rejected() {
        let err = OutputItem::from_value(&json!({
            "type": "function_call",
            "call_id": "call_1"
        }))
        .unwrap_err();
        assert!(err.contains("name"), "err: {err}");
    }

    #[test]
    fn final_text_concatenates_segments_and_trims() {
        let response = ResponseResource::from_value(json!({
            "output": [
                {
                    "type": "message",
                    "role": "assistant",
                    "content": [
                        { "type": "output_text", "text": "  Hello" },
                        { "type": "refusal", "refusal": "no" },
                        { "type": "output_text", "text": ", world \n" }
                    ]
                }
            ],
            "output_text": "ignored"
        }))
        .expect("response");
        assert_eq!(response.final_text().expect("text"), "Hello, world");
    }

    #[test]
    fn final_text_falls_back_to_output_text() {
        let response = ResponseResource::from_value(json!({
            "output": [],
            "output_text": " fallback "
        }))
        .expect("response");
        assert_eq!(response.final_text().expect("text"), "fallback");
    }

    #[test]
    fn final_text_is_empty_without_any_text() {
        let response = ResponseResource::from_value(json!({ "output": [] })).expect("response");
        assert_eq!(response.final_text().expect("text"), "");
    }

    #[test]
    fn error_object_is_exposed() {
        let response = ResponseResource::from_value(json!({
            "status": "failed",
            "error": { "code": "server_error", "message": "boom" }
        }))
        .expect("response");
        assert_eq!(response.status(), Some("failed"));
        assert_eq!(response.error().map(|err| err.message.as_str()), Some("boom"));
    }

    #[test]
    fn non_object_body_is_rejected() {
        assert!(ResponseResource::from_value(json!("nope")).is_err());
    }
}
