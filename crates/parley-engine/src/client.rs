use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use parley_tools::{ToolDefinition, ToolInvoker, ToolRegistry};

use crate::backend::{Backend, HttpBackend};
use crate::config::ClientConfig;
use crate::conversation::{ConversationItem, ConversationStore};
use crate::driver::{TurnDriver, TurnReply, TurnSettings};
use crate::error::AgentError;
use crate::events::{Event, EventKind, EventSink, EVENT_CHANNEL_CAPACITY};

/// A tool-calling conversation against one backend.
///
/// Turns take `&mut self`, so a client runs at most one turn at a time.
/// A failed turn leaves both logs exactly as they were before it started.
pub struct AgentClient {
    config: ClientConfig,
    backend: Result<Arc<dyn Backend>, String>,
    settings: TurnSettings,
    invoker: ToolInvoker,
    store: ConversationStore,
    events: broadcast::Sender<Event>,
}

impl AgentClient {
    /// Builds a client that talks HTTP to `config.base_url()`. Without an API
    /// key the client is constructed but not ready, and every `send` fails.
    pub fn new(config: ClientConfig, tools: Vec<ToolDefinition>) -> Self {
        let backend = match HttpBackend::new(reqwest::Client::new(), &config) {
            Ok(backend) => Ok(Arc::new(backend) as Arc<dyn Backend>),
            Err(err) => {
                tracing::warn!(error = %err, "agent client is not ready");
                Err(err.to_string())
            }
        };
        Self::assemble(config, tools, backend)
    }

    /// Uses a caller-supplied backend. The backend owns its credentials, so
    /// the client is ready regardless of `config.api_key`.
    pub fn with_backend(
        config: ClientConfig,
        tools: Vec<ToolDefinition>,
        backend: Arc<dyn Backend>,
    ) -> Self {
        Self::assemble(config, tools, Ok(backend))
    }

    fn assemble(
        config: ClientConfig,
        tools: Vec<ToolDefinition>,
        backend: Result<Arc<dyn Backend>, String>,
    ) -> Self {
        let registry = Arc::new(ToolRegistry::new(tools));
        let settings = TurnSettings {
            model: config.model().to_string(),
            parallel_tool_calls: config.parallel_tool_calls,
            max_tool_iterations: config.max_tool_iterations,
        };
        let store = ConversationStore::new(config.instructions.clone());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            backend,
            settings,
            invoker: ToolInvoker::new(registry),
            store,
            events,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.backend.is_ok()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.invoker.registry()
    }

    pub fn display_log(&self) -> &[ConversationItem] {
        self.store.display().items()
    }

    pub fn wire_history(&self) -> &[ConversationItem] {
        self.store.wire().items()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Drops every turn, keeping the system instruction message.
    pub fn reset(&mut self) {
        self.store.reset();
    }

    pub async fn send(&mut self, text: impl Into<String>) -> Result<TurnReply, AgentError> {
        self.send_with_cancel(text, CancellationToken::new()).await
    }

    /// Runs one turn. Cancelling `cancel` interrupts the pending backend
    /// request, or stops the turn before the next one is sent.
    pub async fn send_with_cancel(
        &mut self,
        text: impl Into<String>,
        cancel: CancellationToken,
    ) -> Result<TurnReply, AgentError> {
        let backend = match &self.backend {
            Ok(backend) => backend.clone(),
            Err(reason) => return Err(AgentError::NotConfigured(reason.clone())),
        };
        let text = text.into();

        let mut sink = EventSink::new(&self.events);
        let snapshot = self.store.snapshot();
        tracing::info!(turn_id = %sink.turn_id(), "turn started");
        self.store.push_both(ConversationItem::user(text.clone()));
        sink.emit(EventKind::TurnStarted { input: text });

        let driver = TurnDriver {
            backend: backend.as_ref(),
            invoker: &self.invoker,
            settings: &self.settings,
            store: &mut self.store,
            events: &mut sink,
            cancel: &cancel,
        };
        match driver.run().await {
            Ok(reply) => {
                tracing::info!(turn_id = %sink.turn_id(), "turn completed");
                Ok(reply)
            }
            Err(err) => {
                self.store.rollback(snapshot);
                tracing::warn!(turn_id = %sink.turn_id(), error = %err, "turn rolled back");
                sink.emit(EventKind::TurnRolledBack {
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for AgentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentClient")
            .field("config", &self.config)
            .field("ready", &self.is_ready())
            .field("tools", &self.registry().names().collect::<Vec<_>>())
            .field("display_len", &self.store.display().len())
            .field("wire_len", &self.store.wire().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_api_key_fails_fast_without_touching_logs() {
        let config = ClientConfig::default().with_instructions("Be brief.");
        let mut client = AgentClient::new(config, Vec::new());
        assert!(!client.is_ready());

        let err = client.send("hello").await.unwrap_err();
        assert!(matches!(err, AgentError::NotConfigured(_)), "err: {err}");
        assert_eq!(client.display_log(), &[ConversationItem::system("Be brief.")]);
        assert_eq!(client.wire_history(), client.display_log());
    }

    #[test]
    fn api_key_makes_client_ready() {
        let client = AgentClient::new(ClientConfig::default().with_api_key("sk-test"), Vec::new());
        assert!(client.is_ready());
        assert!(client.registry().is_empty());
        assert!(client.display_log().is_empty());
    }
}
