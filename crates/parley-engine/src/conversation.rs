//! Conversation state: an append-only display log and the wire history sent
//! to the backend.
//!
//! Both sequences start with the system instruction message when one is
//! configured. That message sits below the truncation floor, so neither
//! rollback nor reset can remove it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use parley_openresponses::ItemParam;
use parley_tools::{ToolCall, ToolResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationItem {
    Message { role: Role, text: String },
    ToolCall(ToolCall),
    ToolResult(ToolResult),
    Reasoning { payload: Value },
}

impl ConversationItem {
    pub fn system(text: impl Into<String>) -> Self {
        Self::Message {
            role: Role::System,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::Message {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::Message {
            role: Role::Assistant,
            text: text.into(),
        }
    }

    pub fn to_item_param(&self) -> ItemParam {
        match self {
            Self::Message { role, text } => ItemParam::message_text(role.as_str(), text.clone()),
            Self::ToolCall(call) => ItemParam::function_call(
                call.item_id.as_deref(),
                call.call_id.clone(),
                call.name.clone(),
                call.arguments.clone(),
            ),
            Self::ToolResult(result) => {
                ItemParam::function_call_output(result.call_id.clone(), result.output.clone())
            }
            Self::Reasoning { payload } => ItemParam::reasoning_raw(payload.clone()),
        }
    }
}

/// An append-only sequence of items with a fixed floor.
#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    items: Vec<ConversationItem>,
    floor: usize,
}

impl ConversationLog {
    fn with_pinned(pinned: Option<ConversationItem>) -> Self {
        let items = pinned.into_iter().collect::<Vec<_>>();
        let floor = items.len();
        Self { items, floor }
    }

    pub fn append(&mut self, item: ConversationItem) {
        self.items.push(item);
    }

    pub fn snapshot_len(&self) -> usize {
        self.items.len()
    }

    /// Drops everything past `len`. Never cuts below the pinned prefix and
    /// never grows the log.
    pub fn truncate_to(&mut self, len: usize) {
        self.items.truncate(len.max(self.floor));
    }

    pub fn items(&self) -> &[ConversationItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConversationItem> {
        self.items.iter()
    }

    fn reset(&mut self) {
        self.items.truncate(self.floor);
    }
}

impl<'a> IntoIterator for &'a ConversationLog {
    type Item = &'a ConversationItem;
    type IntoIter = std::slice::Iter<'a, ConversationItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub display_len: usize,
    pub wire_len: usize,
}

#[derive(Debug, Clone)]
pub struct ConversationStore {
    display: ConversationLog,
    wire: ConversationLog,
}

impl ConversationStore {
    pub fn new(system_instructions: Option<String>) -> Self {
        let pinned = system_instructions
            .filter(|text| !text.trim().is_empty())
            .map(ConversationItem::system);
        Self {
            display: ConversationLog::with_pinned(pinned.clone()),
            wire: ConversationLog::with_pinned(pinned),
        }
    }

    pub fn push_both(&mut self, item: ConversationItem) {
        self.display.append(item.clone());
        self.wire.append(item);
    }

    pub fn push_display(&mut self, item: ConversationItem) {
        self.display.append(item);
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            display_len: self.display.snapshot_len(),
            wire_len: self.wire.snapshot_len(),
        }
    }

    pub fn rollback(&mut self, snapshot: StoreSnapshot) {
        self.display.truncate_to(snapshot.display_len);
        self.wire.truncate_to(snapshot.wire_len);
    }

    pub fn reset(&mut self) {
        self.display.reset();
        self.wire.reset();
    }

    pub fn display(&self) -> &ConversationLog {
        &self.display
    }

    pub fn wire(&self) -> &ConversationLog {
        &self.wire
    }

    pub fn wire_items(&self) -> Vec<ItemParam> {
        self.wire
            .iter()
            .map(ConversationItem::to_item_param)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn system_message_is_pinned_through_rollback_and_reset() {
        let mut store = ConversationStore::new(Some("You are an assistant.".to_string()));
        store.push_both(ConversationItem::user("hi"));
        store.rollback(StoreSnapshot {
            display_len: 0,
            wire_len: 0,
        });
        assert_eq!(store.display().items(), &[ConversationItem::system("You are an assistant.")]);
        assert_eq!(store.wire().len(), 1);

        store.push_both(ConversationItem::user("again"));
        store.reset();
        assert_eq!(store.display().len(), 1);
        assert_eq!(store.wire().len(), 1);
    }

    #[test]
    fn blank_instructions_leave_logs_empty() {
        let store = ConversationStore::new(Some("   ".to_string()));
        assert!(store.display().is_empty());
        assert!(store.wire().is_empty());
    }

    #[test]
    fn display_only_items_do_not_reach_the_wire() {
        let mut store = ConversationStore::new(None);
        store.push_display(ConversationItem::Reasoning {
            payload: json!({ "type": "reasoning", "id": "rs_1" }),
        });
        store.push_both(ConversationItem::assistant("done"));
        assert_eq!(store.display().len(), 2);
        assert_eq!(store.wire().len(), 1);
    }

    #[test]
    fn rollback_restores_snapshot_lengths() {
        let mut store = ConversationStore::new(Some("sys".to_string()));
        let snapshot = store.snapshot();
        store.push_both(ConversationItem::user("q"));
        store.push_display(ConversationItem::Reasoning { payload: json!({}) });
        store.rollback(snapshot);
        assert_eq!(store.snapshot(), snapshot);
    }

    #[test]
    fn truncate_never_grows() {
        let mut log = ConversationLog::default();
        log.append(ConversationItem::user("a"));
        log.truncate_to(10);
        assert_eq!(log.snapshot_len(), 1);
    }

    #[test]
    fn wire_items_map_every_kind() {
        let mut store = ConversationStore::new(Some("sys".to_string()));
        store.push_both(ConversationItem::user("list entities"));
        store.push_both(ConversationItem::Reasoning {
            payload: json!({ "type": "reasoning", "id": "rs_1", "summary": [] }),
        });
        store.push_both(ConversationItem::ToolCall(ToolCall {
            call_id: "call_1".to_string(),
            name: "find_entities".to_string(),
            arguments: "{}".to_string(),
            item_id: Some("fc_1".to_string()),
        }));
        store.push_both(ConversationItem::ToolResult(ToolResult {
            call_id: "call_1".to_string(),
            output: "null".to_string(),
        }));

        let items = store
            .wire_items()
            .into_iter()
            .map(ItemParam::into_value)
            .collect::<Vec<_>>();
        assert_eq!(
            items,
            vec![
                json!({ "type": "message", "role": "system", "content": "sys" }),
                json!({ "type": "message", "role": "user", "content": "list entities" }),
                json!({ "type": "reasoning", "id": "rs_1", "summary": [] }),
                json!({
                    "type": "function_call",
                    "id": "fc_1",
                    "call_id": "call_1",
                    "name": "find_entities",
                    "arguments": "{}"
                }),
                json!({ "type": "function_call_output", "call_id": "call_1", "output": "null" }),
            ]
        );
    }
}
