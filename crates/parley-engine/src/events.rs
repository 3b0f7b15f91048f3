use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use parley_tools::ToolOutcome;

pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Progress notification for presentation layers. Events are best effort:
/// a lagging or absent subscriber never affects the turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub turn_id: String,
    pub timestamp_ms: u64,
    pub seq: u64,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    TurnStarted {
        input: String,
    },
    BackendRequest {
        iteration: u32,
        input_items: usize,
    },
    Reasoning {
        count: usize,
        forwarded: bool,
    },
    ToolStarted {
        call_id: String,
        name: String,
    },
    ToolEnded {
        call_id: String,
        name: String,
        outcome: ToolOutcome,
        duration_ms: u64,
    },
    TurnCompleted {
        text: String,
    },
    TurnRolledBack {
        error: String,
    },
}

pub(crate) struct EventSink<'a> {
    sender: &'a broadcast::Sender<Event>,
    turn_id: String,
    seq: u64,
}

impl<'a> EventSink<'a> {
    pub(crate) fn new(sender: &'a broadcast::Sender<Event>) -> Self {
        Self {
            sender,
            turn_id: Uuid::new_v4().to_string(),
            seq: 0,
        }
    }

    pub(crate) fn turn_id(&self) -> &str {
        &self.turn_id
    }

    pub(crate) fn emit(&mut self, kind: EventKind) {
        let event = Event {
            id: Uuid::new_v4().to_string(),
            turn_id: self.turn_id.clone(),
            timestamp_ms: now_ms(),
            seq: self.seq,
            kind,
        };
        self.seq += 1;
        // No receivers is not an error.
        let _ = self.sender.send(event);
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
