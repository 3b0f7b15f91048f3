use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;

use parley_openresponses::ToolParam;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Failed(String),
}

impl ToolError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

pub type ToolFuture = BoxFuture<'static, Result<Value, ToolError>>;

pub type ToolHandler = Arc<dyn Fn(Value) -> ToolFuture + Send + Sync>;

/// Decode a tool's parsed JSON arguments into its typed argument struct.
pub fn decode_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|err| ToolError::InvalidArguments(err.to_string()))
}

/// A host-supplied tool: what the backend sees (name, description, schema,
/// strictness) plus the handler that runs when the backend calls it.
#[derive(Clone)]
pub struct ToolDefinition {
    name: String,
    description: String,
    parameters: Value,
    strict: bool,
    handler: ToolHandler,
}

impl ToolDefinition {
    pub fn from_handler(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        handler: ToolHandler,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            strict: false,
            handler,
        }
    }

    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        Self::from_handler(
            name,
            description,
            parameters,
            Arc::new(move |args: Value| -> ToolFuture { Box::pin(handler(args)) }),
        )
    }

    pub fn sync<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        Self::from_handler(
            name,
            description,
            parameters,
            Arc::new(move |args: Value| -> ToolFuture {
                let handler = handler.clone();
                Box::pin(async move { handler(args) })
            }),
        )
    }

    /// Like [`ToolDefinition::new`], but the handler receives its arguments
    /// already decoded. Decode failures are reported as tool errors.
    pub fn typed<A, F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        handler: F,
    ) -> Self
    where
        A: DeserializeOwned + Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        Self::from_handler(
            name,
            description,
            parameters,
            Arc::new(move |args: Value| -> ToolFuture {
                let handler = handler.clone();
                Box::pin(async move {
                    let args = decode_args::<A>(args)?;
                    handler(args).await
                })
            }),
        )
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &Value {
        &self.parameters
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn handler(&self) -> ToolHandler {
        self.handler.clone()
    }

    pub fn to_tool_param(&self) -> ToolParam {
        ToolParam::function(
            self.name.clone(),
            self.description.clone(),
            self.parameters.clone(),
            self.strict,
        )
    }

    /// Top-level properties a strict schema declares but does not require.
    /// Strict backends reject such schemas; optional fields must be nullable.
    pub fn strict_schema_violations(&self) -> Vec<String> {
        if !self.strict {
            return Vec::new();
        }
        let Some(properties) = self.parameters.get("properties").and_then(Value::as_object) else {
            return Vec::new();
        };
        let required = self
            .parameters
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect::<Vec<_>>())
            .unwrap_or_default();
        properties
            .keys()
            .filter(|key| !required.contains(&key.as_str()))
            .cloned()
            .collect()
    }
}

impl fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .field("strict", &self.strict)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct EchoArgs {
        text: String,
    }

    #[tokio::test]
    async fn sync_handler_runs_inside_future() {
        let tool = ToolDefinition::sync("add", "", json!({}), |args| {
            let a = args["a"].as_i64().unwrap_or(0);
            let b = args["b"].as_i64().unwrap_or(0);
            Ok(json!(a + b))
        });
        let handler = tool.handler();
        let value = handler(json!({ "a": 2, "b": 3 })).await.expect("value");
        assert_eq!(value, json!(5));
    }

    #[tokio::test]
    async fn typed_handler_decodes_arguments() {
        let tool = ToolDefinition::typed("echo", "", json!({}), |args: EchoArgs| async move {
            Ok(Value::String(args.text))
        });
        let handler = tool.handler();
        assert_eq!(
            handler(json!({ "text": "hi" })).await.expect("value"),
            json!("hi")
        );
        let err = handler(json!({ "txt": "hi" })).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)), "err: {err:?}");
    }

    #[test]
    fn strict_schema_violations_lists_optional_properties() {
        let tool = ToolDefinition::sync(
            "write_script_asset",
            "",
            json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string" },
                    "content": { "type": "string" },
                    "overwrite": { "type": ["boolean", "null"] }
                },
                "required": ["path", "content"]
            }),
            |_| Ok(Value::Null),
        )
        .with_strict(true);
        assert_eq!(tool.strict_schema_violations(), vec!["overwrite".to_string()]);
    }

    #[test]
    fn non_strict_schema_has_no_violations() {
        let tool = ToolDefinition::sync(
            "t",
            "",
            json!({ "type": "object", "properties": { "x": {} } }),
            |_| Ok(Value::Null),
        );
        assert!(tool.strict_schema_violations().is_empty());
    }

    #[test]
    fn tool_param_projection_carries_strict_flag() {
        let tool = ToolDefinition::sync("t", "desc", json!({ "type": "object" }), |_| {
            Ok(Value::Null)
        })
        .with_strict(true);
        assert_eq!(
            tool.to_tool_param().into_value(),
            json!({
                "type": "function",
                "name": "t",
                "description": "desc",
                "parameters": { "type": "object" },
                "strict": true
            })
        );
    }

    #[test]
    fn tool_error_display_is_the_message() {
        assert_eq!(ToolError::failed("disk full").to_string(), "disk full");
        assert_eq!(
            ToolError::InvalidArguments("missing field `path`".to_string()).to_string(),
            "invalid arguments: missing field `path`"
        );
    }
}
