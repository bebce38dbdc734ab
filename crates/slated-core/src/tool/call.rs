//! Tool call and schema types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A structured request emitted by the reasoning step, naming an action
/// and its arguments, to be executed by the core rather than answered in
/// natural language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: Map<String, Value>,
    /// Correlation id for matching observations back to calls.
    pub call_id: String,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
            call_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Declared shape of one tool, handed to the reasoning model so it knows
/// what it may call and with which arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    /// JSON-schema-shaped description of the argument object.
    pub parameters: Value,
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}
