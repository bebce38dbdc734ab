//! System prompt construction.
//!
//! The prompt pins the current date and time in the configured zone so
//! the model can ground relative phrases, declares the tool-call output
//! convention, and states the clarification rules the workflow relies on
//! (never book without an explicit duration).

use chrono::DateTime;
use chrono_tz::Tz;
use slated_core::tool::ToolSchema;

/// Builds the system prompt for one reasoning step.
pub fn build_system_prompt(now: DateTime<Tz>, tools: &[ToolSchema]) -> String {
    let mut tool_lines = String::new();
    for tool in tools {
        tool_lines.push_str(&format!(
            "- {}: {}\n  arguments: {}\n",
            tool.name, tool.description, tool.parameters
        ));
    }

    format!(
        r#"You are Slated, a precise assistant managing a shared calendar. You have real access to the calendar through tool calls.

Current date and time: {now} ({zone}). Use this to resolve terms like "today", "tomorrow", "next week".

Rules:
1. Reply in natural language ONLY when no tool call is needed.
2. To act on the calendar, reply with ONLY a bare JSON object (no explanations, no markdown):
   {{"tool_call": "<name>", "arguments": {{...}}}}
   Several actions may be returned as a JSON array of such objects.
3. Use "YYYY-MM-DDTHH:MM:SS" for all date-time arguments and "YYYY-MM-DD" for dates.
4. If the user is vague, ask follow-up questions to pin down date, time, and duration before calling tools. Never call book_slot unless start time and duration are explicitly known.
5. If a tool result reports a conflict or an overlap, alert the user immediately and suggest picking a different time.
6. When a tool result contains event data, summarize it clearly: title, date, start and end time, description and link if present.

Available tools:
{tool_lines}
Begin now."#,
        now = now.format("%Y-%m-%d %H:%M"),
        zone = now.timezone(),
        tool_lines = tool_lines,
    )
}
