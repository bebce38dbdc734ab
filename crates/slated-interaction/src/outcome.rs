//! Parsing assistant content into a structured outcome.
//!
//! The model is instructed to answer either in plain language or with
//! bare JSON of the form `{"tool_call": name, "arguments": {...}}` (or an
//! array of those). Anything that fails to parse as that shape is treated
//! as a natural-language message.

use crate::chat::ChatOutcome;
use serde_json::{Map, Value};
use slated_core::tool::ToolCall;

/// Classifies one assistant reply.
pub fn parse_outcome(content: &str) -> ChatOutcome {
    let cleaned = strip_code_fence(content.trim());

    let parsed: Value = match serde_json::from_str(cleaned) {
        Ok(value) => value,
        Err(_) => return ChatOutcome::Message(content.trim().to_string()),
    };

    match parsed {
        Value::Object(object) => match tool_call_from_object(&object) {
            Some(call) => ChatOutcome::ToolCalls(vec![call]),
            None => ChatOutcome::Message(content.trim().to_string()),
        },
        Value::Array(items) => {
            let calls: Vec<ToolCall> = items
                .iter()
                .filter_map(|item| item.as_object().and_then(tool_call_from_object))
                .collect();
            if calls.is_empty() || calls.len() != items.len() {
                ChatOutcome::Message(content.trim().to_string())
            } else {
                ChatOutcome::ToolCalls(calls)
            }
        }
        _ => ChatOutcome::Message(content.trim().to_string()),
    }
}

fn tool_call_from_object(object: &Map<String, Value>) -> Option<ToolCall> {
    let name = object.get("tool_call")?.as_str()?;
    let arguments = match object.get("arguments") {
        Some(Value::Object(map)) => map.clone(),
        None => Map::new(),
        Some(_) => return None,
    };
    Some(ToolCall::new(name, arguments))
}

/// Strips a surrounding markdown code fence, with or without a language
/// tag. Models wrap JSON in fences often enough that this is worth
/// tolerating.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = match rest.split_once('\n') {
        Some((first_line, body)) if !first_line.contains('{') => body,
        _ => rest,
    };
    rest.trim().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_message() {
        let outcome = parse_outcome("You're free tomorrow afternoon.");
        assert_eq!(
            outcome,
            ChatOutcome::Message("You're free tomorrow afternoon.".to_string())
        );
    }

    #[test]
    fn single_tool_call_object() {
        let outcome = parse_outcome(
            r#"{"tool_call": "book_slot", "arguments": {"start_time": "2025-06-26 15:00", "duration": "1h"}}"#,
        );
        let ChatOutcome::ToolCalls(calls) = outcome else {
            panic!("expected tool calls");
        };
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "book_slot");
        assert_eq!(calls[0].arguments["duration"], "1h");
        assert!(!calls[0].call_id.is_empty());
    }

    #[test]
    fn array_of_tool_calls() {
        let outcome = parse_outcome(
            r#"[{"tool_call": "list_events", "arguments": {}}, {"tool_call": "check_availability", "arguments": {"start_date": "2025-06-25", "end_date": "2025-06-25"}}]"#,
        );
        let ChatOutcome::ToolCalls(calls) = outcome else {
            panic!("expected tool calls");
        };
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "list_events");
        assert_eq!(calls[1].name, "check_availability");
    }

    #[test]
    fn fenced_json_is_unwrapped() {
        let outcome = parse_outcome(
            "```json\n{\"tool_call\": \"list_events\", \"arguments\": {}}\n```",
        );
        assert!(matches!(outcome, ChatOutcome::ToolCalls(_)));
    }

    #[test]
    fn json_without_tool_call_key_is_a_message() {
        let outcome = parse_outcome(r#"{"answer": "yes"}"#);
        assert!(matches!(outcome, ChatOutcome::Message(_)));
    }

    #[test]
    fn mixed_array_falls_back_to_message() {
        let outcome = parse_outcome(r#"[{"tool_call": "list_events"}, "not a call"]"#);
        assert!(matches!(outcome, ChatOutcome::Message(_)));
    }
}
