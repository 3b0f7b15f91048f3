use std::collections::HashMap;

use parley_openresponses::ToolParam;

use crate::ToolDefinition;

/// Fixed set of tools, built once from the host's definitions.
///
/// Names are unique keys: a later definition with the same name replaces an
/// earlier one but keeps the earlier one's position in [`ToolRegistry::function_tools`].
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolDefinition>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new(definitions: impl IntoIterator<Item = ToolDefinition>) -> Self {
        let mut tools = HashMap::new();
        let mut order = Vec::new();
        for definition in definitions {
            let name = definition.name().to_string();
            let violations = definition.strict_schema_violations();
            if !violations.is_empty() {
                tracing::warn!(
                    tool = %name,
                    properties = ?violations,
                    "strict tool schema declares properties that are not required"
                );
            }
            if tools.insert(name.clone(), definition).is_some() {
                tracing::debug!(tool = %name, "tool definition shadows an earlier one");
            } else {
                order.push(name);
            }
        }
        Self { tools, order }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Function-schema projection advertised to the backend.
    pub fn function_tools(&self) -> Vec<ToolParam> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(ToolDefinition::to_tool_param)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn constant(name: &str, description: &str, value: Value) -> ToolDefinition {
        ToolDefinition::sync(name, description, json!({ "type": "object" }), move |_| {
            Ok(value.clone())
        })
    }

    #[test]
    fn empty_registry_projects_nothing() {
        let registry = ToolRegistry::new(Vec::new());
        assert!(registry.is_empty());
        assert!(registry.function_tools().is_empty());
    }

    #[test]
    fn projection_keeps_definition_order() {
        let registry = ToolRegistry::new(vec![
            constant("find_entities", "a", Value::Null),
            constant("get_asset", "b", Value::Null),
        ]);
        let names = registry
            .function_tools()
            .iter()
            .filter_map(|tool| tool.name().map(str::to_string))
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["find_entities", "get_asset"]);
    }

    #[tokio::test]
    async fn later_definition_shadows_earlier() {
        let registry = ToolRegistry::new(vec![
            constant("dup", "first", json!(1)),
            constant("other", "", Value::Null),
            constant("dup", "second", json!(2)),
        ]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["dup", "other"]);

        let tool = registry.get("dup").expect("dup");
        assert_eq!(tool.description(), "second");
        let handler = tool.handler();
        assert_eq!(handler(json!({})).await.expect("value"), json!(2));
    }

    #[test]
    fn lookup_misses_unknown_names() {
        let registry = ToolRegistry::new(vec![constant("a", "", Value::Null)]);
        assert!(registry.contains("a"));
        assert!(registry.get("b").is_none());
    }
}
