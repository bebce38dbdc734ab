//! Tool registry and dispatch.

use super::call::{ToolCall, ToolSchema};
use crate::error::{Result, SlatedError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// A typed handler behind one tool name.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// The schema declared to the reasoning model.
    fn schema(&self) -> ToolSchema;

    /// Executes the tool. The returned string is the observation fed
    /// back into the reasoning step.
    async fn invoke(&self, arguments: Map<String, Value>) -> Result<String>;
}

/// Maps tool names to handlers and converts every failure mode into an
/// observation string, so a misbehaving tool call never crashes the
/// workflow.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        let name = handler.schema().name;
        self.tools.insert(name, handler);
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self.tools.values().map(|t| t.schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Dispatches one call, converting recoverable errors into
    /// observation text. Unknown tools, bad arguments, and calendar
    /// failures all come back as observations the reasoning step can
    /// react to.
    pub async fn dispatch(&self, call: &ToolCall) -> String {
        let handler = match self.tools.get(&call.name) {
            Some(handler) => handler,
            None => {
                tracing::warn!("[ToolRegistry] Unknown tool call: {}", call.name);
                return format!("Unknown tool '{}'. Available tools: {}", call.name, self.names());
            }
        };

        match handler.invoke(call.arguments.clone()).await {
            Ok(observation) => observation,
            Err(SlatedError::Validation(message)) => {
                tracing::warn!("[ToolRegistry] Validation failed for {}: {}", call.name, message);
                format!("Invalid arguments for '{}': {}", call.name, message)
            }
            Err(SlatedError::UnparseablePhrase { phrase }) => format!(
                "Could not understand the time phrase '{}'. Ask the user to restate it.",
                phrase
            ),
            Err(SlatedError::Calendar(message)) => {
                tracing::error!("[ToolRegistry] Calendar failure in {}: {}", call.name, message);
                format!("The calendar action '{}' failed: {}", call.name, message)
            }
            Err(err) => {
                tracing::error!("[ToolRegistry] Tool {} failed: {}", call.name, err);
                format!("Tool '{}' failed: {}", call.name, err)
            }
        }
    }

    fn names(&self) -> String {
        let mut names: Vec<&str> = self.tools.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names.join(", ")
    }
}

/// Deserializes a tool's argument object into its typed form, mapping
/// failures to `Validation` errors.
pub fn parse_arguments<T: serde::de::DeserializeOwned>(arguments: Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(arguments))
        .map_err(|err| SlatedError::validation(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl ToolHandler for EchoTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema::new(
                "echo",
                "Echoes the text argument",
                json!({
                    "type": "object",
                    "properties": { "text": { "type": "string" } },
                    "required": ["text"]
                }),
            )
        }

        async fn invoke(&self, arguments: Map<String, Value>) -> Result<String> {
            #[derive(serde::Deserialize)]
            struct Args {
                text: String,
            }
            let args: Args = parse_arguments(arguments)?;
            Ok(args.text)
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        registry
    }

    fn call(name: &str, arguments: Value) -> ToolCall {
        let Value::Object(map) = arguments else {
            panic!("arguments must be an object");
        };
        ToolCall::new(name, map)
    }

    #[tokio::test]
    async fn dispatches_to_registered_tool() {
        let observation = registry().dispatch(&call("echo", json!({"text": "hi"}))).await;
        assert_eq!(observation, "hi");
    }

    #[tokio::test]
    async fn unknown_tool_becomes_observation() {
        let observation = registry().dispatch(&call("nope", json!({}))).await;
        assert!(observation.contains("Unknown tool 'nope'"));
        assert!(observation.contains("echo"));
    }

    #[tokio::test]
    async fn bad_arguments_become_observation() {
        let observation = registry().dispatch(&call("echo", json!({"text": 42}))).await;
        assert!(observation.contains("Invalid arguments for 'echo'"));
    }

    #[test]
    fn schemas_are_sorted() {
        let registry = registry();
        let schemas = registry.schemas();
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].name, "echo");
        assert!(registry.contains("echo"));
    }
}
