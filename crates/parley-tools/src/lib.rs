mod definition;
mod invoker;
mod output;
mod registry;

pub use definition::{decode_args, ToolDefinition, ToolError, ToolFuture, ToolHandler};
pub use invoker::{InvocationReport, ToolCall, ToolInvoker, ToolOutcome, ToolResult};
pub use output::{serialize_output, SerializeError, MAX_OUTPUT_DEPTH};
pub use registry::ToolRegistry;
