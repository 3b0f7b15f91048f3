//! The turn loop as an explicit state machine.
//!
//! ```text
//! AwaitingBackend --(no tool calls)--> Finished
//! AwaitingBackend --(tool calls)-----> AwaitingTools --> AwaitingBackend
//! ```
//!
//! Any error returned from [`TurnDriver::run`] leaves partial appends in the
//! store; the caller owns rollback.

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use parley_openresponses::{CreateResponseBuilder, CreateResponsePayload, OutputItem};
use parley_tools::{ToolCall, ToolInvoker};

use crate::backend::Backend;
use crate::conversation::{ConversationItem, ConversationStore};
use crate::error::{AgentError, BackendError};
use crate::events::{EventKind, EventSink};

#[derive(Debug, Clone)]
pub(crate) struct TurnSettings {
    pub(crate) model: String,
    pub(crate) parallel_tool_calls: bool,
    pub(crate) max_tool_iterations: u32,
}

/// Final answer of a successful turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReply {
    pub text: String,
    pub raw_response: Value,
}

enum TurnState {
    AwaitingBackend,
    AwaitingTools(Vec<ToolCall>),
    Finished(TurnReply),
}

pub(crate) struct TurnDriver<'a, 's> {
    pub(crate) backend: &'a dyn Backend,
    pub(crate) invoker: &'a ToolInvoker,
    pub(crate) settings: &'a TurnSettings,
    pub(crate) store: &'a mut ConversationStore,
    pub(crate) events: &'a mut EventSink<'s>,
    pub(crate) cancel: &'a CancellationToken,
}

impl TurnDriver<'_, '_> {
    pub(crate) async fn run(mut self) -> Result<TurnReply, AgentError> {
        let mut iterations = 0u32;
        let mut state = TurnState::AwaitingBackend;
        loop {
            state = match state {
                TurnState::AwaitingBackend => self.await_backend(&mut iterations).await?,
                TurnState::AwaitingTools(calls) => self.run_tools(calls).await,
                TurnState::Finished(reply) => return Ok(reply),
            };
        }
    }

    async fn await_backend(&mut self, iterations: &mut u32) -> Result<TurnState, AgentError> {
        if self.cancel.is_cancelled() {
            return Err(AgentError::Cancelled);
        }

        let payload = self.build_payload();
        let input_items = payload.input_len();
        tracing::debug!(iteration = *iterations, input_items, "sending backend request");
        self.events.emit(EventKind::BackendRequest {
            iteration: *iterations,
            input_items,
        });

        let backend = self.backend;
        let response = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(AgentError::Cancelled),
            response = backend.create_response(payload) => response?,
        };

        let mut reasoning = Vec::new();
        let mut calls = Vec::new();
        for item in response.output_items().map_err(BackendError::Decode)? {
            match item {
                OutputItem::Reasoning(payload) => reasoning.push(payload),
                OutputItem::FunctionCall(call) => calls.push(ToolCall {
                    call_id: call.call_id,
                    name: call.name,
                    arguments: call.arguments,
                    item_id: call.item_id,
                }),
                OutputItem::Message(_) | OutputItem::Other(_) => {}
            }
        }

        // Reasoning only travels back to the backend when it led to a tool call.
        let forward_reasoning = !calls.is_empty();
        if !reasoning.is_empty() {
            self.events.emit(EventKind::Reasoning {
                count: reasoning.len(),
                forwarded: forward_reasoning,
            });
        }
        for payload in reasoning {
            let item = ConversationItem::Reasoning { payload };
            if forward_reasoning {
                self.store.push_both(item);
            } else {
                self.store.push_display(item);
            }
        }

        if calls.is_empty() {
            let text = response.final_text().map_err(BackendError::Decode)?;
            self.store.push_both(ConversationItem::assistant(text.clone()));
            self.events.emit(EventKind::TurnCompleted { text: text.clone() });
            return Ok(TurnState::Finished(TurnReply {
                text,
                raw_response: response.into_raw(),
            }));
        }

        if self.invoker.registry().is_empty() {
            return Err(AgentError::NoToolsRegistered {
                name: calls[0].name.clone(),
            });
        }
        if *iterations >= self.settings.max_tool_iterations {
            return Err(AgentError::IterationLimit {
                limit: self.settings.max_tool_iterations,
            });
        }
        *iterations += 1;
        Ok(TurnState::AwaitingTools(calls))
    }

    /// Calls run one at a time in the order the backend listed them, whatever
    /// the parallel hint says.
    async fn run_tools(&mut self, calls: Vec<ToolCall>) -> TurnState {
        for call in calls {
            self.store.push_both(ConversationItem::ToolCall(call.clone()));
            self.events.emit(EventKind::ToolStarted {
                call_id: call.call_id.clone(),
                name: call.name.clone(),
            });
            let report = self.invoker.run(&call).await;
            self.events.emit(EventKind::ToolEnded {
                call_id: call.call_id.clone(),
                name: call.name.clone(),
                outcome: report.outcome,
                duration_ms: report.duration_ms,
            });
            self.store
                .push_both(ConversationItem::ToolResult(report.result));
        }
        TurnState::AwaitingBackend
    }

    fn build_payload(&self) -> CreateResponsePayload {
        let builder = CreateResponseBuilder::new()
            .model(self.settings.model.clone())
            .input_items(self.store.wire_items());
        let tools = self.invoker.registry().function_tools();
        if tools.is_empty() {
            return builder.build();
        }
        builder
            .tools(tools)
            .parallel_tool_calls(self.settings.parallel_tool_calls)
            .build()
    }
}
