#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("backend transport error: {0}")]
    Transport(String),
    #[error("backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("backend error: {0}")]
    Api(String),
    #[error("invalid backend response: {0}")]
    Decode(String),
}

/// Errors that end a turn. The conversation is rolled back before any of
/// these reaches the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgentError {
    #[error("client is not configured: {0}")]
    NotConfigured(String),
    #[error("backend requested tool \"{name}\" but no tools are registered")]
    NoToolsRegistered { name: String },
    #[error("tool-calling loop exceeded {limit} iterations")]
    IterationLimit { limit: u32 },
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("turn cancelled")]
    Cancelled,
}
