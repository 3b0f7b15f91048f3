mod backend;
mod client;
mod config;
mod conversation;
mod driver;
mod error;
mod events;

pub use backend::{Backend, HttpBackend};
pub use client::AgentClient;
pub use config::{
    ClientConfig, ConfigError, DEFAULT_BASE_URL, DEFAULT_MAX_TOOL_ITERATIONS, DEFAULT_MODEL,
};
pub use conversation::{ConversationItem, ConversationLog, ConversationStore, Role, StoreSnapshot};
pub use driver::TurnReply;
pub use error::{AgentError, BackendError};
pub use events::{Event, EventKind};

pub use parley_openresponses::{CreateResponsePayload, ResponseResource};
pub use parley_tools::{ToolCall, ToolDefinition, ToolError, ToolOutcome, ToolResult};
pub use tokio_util::sync::CancellationToken;
