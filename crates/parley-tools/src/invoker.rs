use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{serialize_output, ToolRegistry, MAX_OUTPUT_DEPTH};

/// A backend request to run one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub call_id: String,
    pub name: String,
    /// Raw JSON text exactly as the backend sent it; may be empty.
    pub arguments: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    pub output: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOutcome {
    Completed,
    Unavailable,
    InvalidArguments,
    Failed,
    Unserializable,
}

#[derive(Debug, Clone)]
pub struct InvocationReport {
    pub result: ToolResult,
    pub outcome: ToolOutcome,
    pub duration_ms: u64,
}

/// Runs tool calls against a registry. Every failure mode ends up in the
/// result's output text; invocation itself never fails.
///
/// Handlers run without a timeout, so a handler that never resolves stalls
/// the caller.
#[derive(Debug, Clone)]
pub struct ToolInvoker {
    registry: Arc<ToolRegistry>,
    max_output_depth: usize,
}

impl ToolInvoker {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            max_output_depth: MAX_OUTPUT_DEPTH,
        }
    }

    pub fn with_max_output_depth(mut self, max_output_depth: usize) -> Self {
        self.max_output_depth = max_output_depth;
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub async fn invoke(&self, call: &ToolCall) -> ToolResult {
        self.run(call).await.result
    }

    pub async fn run(&self, call: &ToolCall) -> InvocationReport {
        let started_at = Instant::now();
        let (outcome, output) = self.execute(call).await;
        let duration_ms = started_at.elapsed().as_millis() as u64;
        match outcome {
            ToolOutcome::Completed => {
                tracing::debug!(tool = %call.name, call_id = %call.call_id, duration_ms, "tool completed");
            }
            _ => {
                tracing::warn!(
                    tool = %call.name,
                    call_id = %call.call_id,
                    ?outcome,
                    output = %output,
                    "tool call did not complete"
                );
            }
        }
        InvocationReport {
            result: ToolResult {
                call_id: call.call_id.clone(),
                output,
            },
            outcome,
            duration_ms,
        }
    }

    async fn execute(&self, call: &ToolCall) -> (ToolOutcome, String) {
        let name = call.name.as_str();
        let Some(definition) = self.registry.get(name) else {
            return (
                ToolOutcome::Unavailable,
                format!("Tool \"{name}\" is not available."),
            );
        };

        let args = match parse_arguments(&call.arguments) {
            Ok(args) => args,
            Err(err) => {
                return (
                    ToolOutcome::InvalidArguments,
                    format!("Invalid arguments for tool \"{name}\": {err}"),
                );
            }
        };

        let handler = definition.handler();
        let returned = AssertUnwindSafe(async move { handler(args).await })
            .catch_unwind()
            .await;
        let value = match returned {
            Ok(Ok(value)) => value,
            Ok(Err(err)) => {
                return (ToolOutcome::Failed, format!("Tool \"{name}\" failed: {err}"));
            }
            Err(panic) => {
                return (
                    ToolOutcome::Failed,
                    format!(
                        "Tool \"{name}\" failed: handler panicked: {}",
                        panic_message(panic.as_ref())
                    ),
                );
            }
        };

        match serialize_output(&value, self.max_output_depth) {
            Ok(output) => (ToolOutcome::Completed, output),
            Err(err) => (
                ToolOutcome::Unserializable,
                format!("Tool \"{name}\" returned an unserializable result: {err}"),
            ),
        }
    }
}

fn parse_arguments(raw: &str) -> Result<Value, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str(raw)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = panic.downcast_ref::<String>() {
        return message.clone();
    }
    "unknown panic".to_string()
}
