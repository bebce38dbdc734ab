//! The Reason/Act turn loop.
//!
//! One user message drives alternating reasoning steps and tool
//! executions until the model produces a natural-language reply or the
//! iteration cap is hit. Recoverable failures degrade into an apologetic
//! reply; only fatal configuration errors propagate out.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use slated_core::session::ConversationMessage;
use slated_core::tool::{ToolCall, ToolRegistry};
use slated_core::{Result, SlatedError};
use slated_interaction::{build_system_prompt, ChatAgent, ChatMessage, ChatOutcome};
use std::sync::Arc;

/// Reply used when the iteration cap fires before the model settles.
const LOOP_LIMIT_REPLY: &str =
    "I wasn't able to finish that request in a reasonable number of steps. \
     Could you rephrase or split it into smaller pieces?";

/// Final replies containing these ask the user to pin down details
/// before the assistant can act.
const CLARIFICATION_KEYWORDS: [&str; 4] = ["specify", "unclear", "missing", "duration"];

/// One executed tool call within a turn.
#[derive(Debug, Clone)]
pub struct TurnStep {
    pub tool: String,
    /// The bare-JSON call as the model emitted it, for history replay.
    pub call: String,
    pub observation: String,
}

/// Everything one turn produced: the final reply plus the tool calls
/// that led to it, in execution order.
#[derive(Debug, Clone)]
pub struct TurnRecord {
    pub reply: String,
    pub steps: Vec<TurnStep>,
    /// Whether the reply asks the user for missing scheduling details.
    pub needs_clarification: bool,
}

/// Classifies a final reply as a clarification request.
pub fn needs_clarification(reply: &str) -> bool {
    let lower = reply.to_lowercase();
    CLARIFICATION_KEYWORDS
        .iter()
        .any(|keyword| lower.contains(keyword))
}

/// Runs the bounded reason/act loop for one turn.
///
/// The executor is stateless between turns; history comes in as the
/// session snapshot and tool effects go through the per-turn registry.
pub struct WorkflowExecutor {
    agent: Arc<dyn ChatAgent>,
    zone: Tz,
    max_iterations: usize,
}

impl WorkflowExecutor {
    pub fn new(agent: Arc<dyn ChatAgent>, zone: Tz, max_iterations: usize) -> Self {
        Self {
            agent,
            zone,
            max_iterations,
        }
    }

    /// Runs one turn over the given history. The latest user message must
    /// already be the last entry in `history`.
    ///
    /// # Errors
    ///
    /// Only non-recoverable errors (fatal configuration) escape; model
    /// and credential failures come back as a degraded reply.
    pub async fn run_turn(
        &self,
        history: &[ConversationMessage],
        registry: &ToolRegistry,
        now: DateTime<Utc>,
    ) -> Result<TurnRecord> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(build_system_prompt(
            now.with_timezone(&self.zone),
            &registry.schemas(),
        )));
        for entry in history {
            messages.push(ChatMessage {
                role: entry.role.as_wire_str().to_string(),
                content: entry.content.clone(),
            });
        }

        let mut steps = Vec::new();
        for iteration in 0..self.max_iterations {
            let outcome = match self.agent.complete(&messages).await {
                Ok(outcome) => outcome,
                Err(err) if err.is_recoverable() => {
                    tracing::error!("[Workflow] Reasoning step failed: {}", err);
                    return Ok(TurnRecord {
                        reply: degraded_reply(&err),
                        steps,
                        needs_clarification: false,
                    });
                }
                Err(err) => return Err(err),
            };

            match outcome {
                ChatOutcome::Message(reply) => {
                    tracing::debug!(
                        "[Workflow] Settled after {} iteration(s), {} tool call(s)",
                        iteration + 1,
                        steps.len()
                    );
                    let needs_clarification = needs_clarification(&reply);
                    return Ok(TurnRecord {
                        reply,
                        steps,
                        needs_clarification,
                    });
                }
                ChatOutcome::ToolCalls(calls) => {
                    // Echo the calls back so the model sees its own request
                    // next to each observation.
                    messages.push(ChatMessage::assistant(render_tool_calls(&calls)));
                    for call in calls {
                        tracing::info!("[Workflow] Executing tool {}", call.name);
                        let rendered = render_tool_calls(std::slice::from_ref(&call));
                        let observation = registry.dispatch(&call).await;
                        messages.push(ChatMessage::user(format!(
                            "Tool result for {}: {}",
                            call.name, observation
                        )));
                        steps.push(TurnStep {
                            tool: call.name,
                            call: rendered,
                            observation,
                        });
                    }
                }
            }
        }

        tracing::warn!(
            "[Workflow] Iteration cap ({}) hit without a final reply",
            self.max_iterations
        );
        Ok(TurnRecord {
            reply: LOOP_LIMIT_REPLY.to_string(),
            steps,
            needs_clarification: false,
        })
    }
}

fn render_tool_calls(calls: &[ToolCall]) -> String {
    let rendered: Vec<serde_json::Value> = calls
        .iter()
        .map(|call| {
            serde_json::json!({
                "tool_call": call.name,
                "arguments": call.arguments,
            })
        })
        .collect();
    if rendered.len() == 1 {
        rendered[0].to_string()
    } else {
        serde_json::Value::Array(rendered).to_string()
    }
}

fn degraded_reply(err: &SlatedError) -> String {
    match err {
        SlatedError::KeysExhausted { .. } => {
            "I couldn't reach my reasoning service with any of the configured credentials. \
             Please try again in a moment."
                .to_string()
        }
        _ => "Something went wrong while processing that request. Please try again.".to_string(),
    }
}
