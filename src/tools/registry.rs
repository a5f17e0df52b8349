use crate::types::{AppError, Result, ToolDefinition};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;
    async fn execute(&self, args: Value) -> Result<Value>;
}

pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registry preloaded with the built-in tools.
    pub fn with_default_tools() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(crate::tools::calculator::Calculator));
        registry.register(Arc::new(crate::tools::datetime::CurrentTime));
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get_tool_definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Definitions for a named subset, silently skipping unknown names.
    pub fn definitions_for(&self, names: &[String]) -> Vec<ToolDefinition> {
        self.get_tool_definitions()
            .into_iter()
            .filter(|d| names.contains(&d.name))
            .collect()
    }

    pub async fn execute(&self, name: &str, args: Value) -> Result<Value> {
        if let Some(tool) = self.tools.get(name) {
            tool.execute(args).await
        } else {
            Err(AppError::NotFound(format!("Tool not found: {}", name)))
        }
    }

    /// Execute a tool and render the outcome as text for feeding back
    /// into a continuation prompt. Unknown tools and execution failures
    /// become error strings rather than hard errors, so the model can
    /// react to them.
    pub async fn invoke(&self, name: &str, args: Value) -> String {
        match self.execute(name, args).await {
            Ok(value) => match value {
                Value::String(s) => s,
                other => other.to_string(),
            },
            Err(e) => {
                warn!(tool = name, error = %e, "tool invocation failed");
                format!("Error: {}", e)
            }
        }
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.tool_names().len(), 0);
    }

    #[test]
    fn test_registry_with_default_tools() {
        let registry = ToolRegistry::with_default_tools();
        assert!(registry.has_tool("calculator"));
        assert!(registry.has_tool("current_time"));
    }

    #[test]
    fn test_get_tool_definitions() {
        let registry = ToolRegistry::with_default_tools();
        let definitions = registry.get_tool_definitions();
        assert_eq!(definitions.len(), 2);
        for def in &definitions {
            assert!(!def.name.is_empty());
            assert!(!def.description.is_empty());
            assert!(def.parameters.is_object());
        }
    }

    #[test]
    fn test_definitions_for_subset() {
        let registry = ToolRegistry::with_default_tools();
        let subset = registry.definitions_for(&["calculator".to_string(), "bogus".to_string()]);
        assert_eq!(subset.len(), 1);
        assert_eq!(subset[0].name, "calculator");
    }

    #[tokio::test]
    async fn test_calculator_execution() {
        let registry = ToolRegistry::with_default_tools();

        let args = serde_json::json!({
            "operation": "add",
            "a": 5.0,
            "b": 3.0
        });

        let result = registry.execute("calculator", args).await.unwrap();
        assert_eq!(result["result"], 8.0);
    }

    #[tokio::test]
    async fn test_nonexistent_tool() {
        let registry = ToolRegistry::with_default_tools();

        let result = registry
            .execute("nonexistent_tool", serde_json::json!({}))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_invoke_renders_errors_as_text() {
        let registry = ToolRegistry::with_default_tools();

        let text = registry.invoke("nonexistent_tool", serde_json::json!({})).await;
        assert!(text.starts_with("Error:"));

        let text = registry
            .invoke(
                "calculator",
                serde_json::json!({"operation": "divide", "a": 1.0, "b": 0.0}),
            )
            .await;
        assert!(text.starts_with("Error:"));
    }
}
