//! Calendar tool handlers.
//!
//! The three tools the reasoning model may call: availability checking,
//! booking, and listing. Handlers are built per turn so the booking
//! request carries the requesting session id. Each handler validates its
//! typed arguments; failures surface as observations, never panics.

use crate::booking::BookingService;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use slated_core::schedule::{BookingOutcome, BookingRequest, CalendarEvent, CalendarService};
use slated_core::time::{parse_duration, TimeRange, TimeResolver};
use slated_core::tool::{parse_arguments, ToolHandler, ToolRegistry, ToolSchema};
use slated_core::{Result, SlatedError};
use std::fmt::Write as _;
use std::sync::Arc;

/// Clock injected into handlers so tests can pin the reference instant.
pub type Clock = fn() -> DateTime<Utc>;

/// Default title when a booking does not name one.
const DEFAULT_EVENT_TITLE: &str = "Slated meeting";
/// Listing window when no end date is given.
const DEFAULT_LIST_DAYS: i64 = 30;

/// Builds the registry for one turn, binding the requesting user id
/// into the booking tool.
pub fn build_registry(
    calendar: Arc<dyn CalendarService>,
    resolver: TimeResolver,
    user_id: &str,
    clock: Clock,
) -> ToolRegistry {
    let booking = Arc::new(BookingService::new(calendar.clone()));
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(CheckAvailabilityTool {
        booking: booking.clone(),
        resolver,
        clock,
    }));
    registry.register(Arc::new(BookSlotTool {
        booking,
        resolver,
        user_id: user_id.to_string(),
        clock,
    }));
    registry.register(Arc::new(ListEventsTool {
        calendar,
        resolver,
        clock,
    }));
    registry
}

/// Reports busy and free slots between two dates.
pub struct CheckAvailabilityTool {
    booking: Arc<BookingService>,
    resolver: TimeResolver,
    clock: Clock,
}

#[derive(Deserialize)]
struct CheckAvailabilityArgs {
    start_date: String,
    end_date: String,
}

#[async_trait]
impl ToolHandler for CheckAvailabilityTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "check_availability",
            "Check busy and free slots between start_date and end_date (inclusive, full days)",
            json!({
                "type": "object",
                "properties": {
                    "start_date": {"type": "string", "description": "YYYY-MM-DD or a phrase like 'tomorrow'"},
                    "end_date": {"type": "string", "description": "YYYY-MM-DD or a phrase like 'tomorrow'"}
                },
                "required": ["start_date", "end_date"]
            }),
        )
    }

    async fn invoke(&self, arguments: Map<String, Value>) -> Result<String> {
        let args: CheckAvailabilityArgs = parse_arguments(arguments)?;
        let now = (self.clock)();
        let from = self.resolver.resolve_day(&args.start_date, now)?;
        let to = self.resolver.resolve_day(&args.end_date, now)?;
        if to < from {
            return Err(SlatedError::validation(format!(
                "end_date {to} is before start_date {from}"
            )));
        }

        let window = self.resolver.day_span(from, to)?;
        let index = self.booking.busy_intervals(&window).await?;
        if index.is_empty() {
            return Ok(format!("You're fully available between {from} and {to}."));
        }

        let mut out = String::from("Busy slots:\n");
        for event in index.events() {
            let _ = writeln!(out, "- {} ({})", event.range, event.title);
        }
        let free = index.free_slots(&window);
        if !free.is_empty() {
            out.push_str("Free slots:\n");
            for slot in &free {
                let _ = writeln!(out, "- {slot}");
            }
        }
        Ok(out)
    }
}

/// Books a slot after two-phase conflict detection.
pub struct BookSlotTool {
    booking: Arc<BookingService>,
    resolver: TimeResolver,
    user_id: String,
    clock: Clock,
}

#[derive(Deserialize)]
struct BookSlotArgs {
    start_time: String,
    duration: Option<String>,
    title: Option<String>,
    description: Option<String>,
}

#[async_trait]
impl ToolHandler for BookSlotTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "book_slot",
            "Book a calendar meeting at start_time for the given duration",
            json!({
                "type": "object",
                "properties": {
                    "start_time": {"type": "string", "description": "YYYY-MM-DDTHH:MM:SS or a phrase like 'tomorrow at 2 pm'"},
                    "duration": {"type": "string", "description": "e.g. '1h', '90m', '2 hours'; defaults to 1h"},
                    "title": {"type": "string"},
                    "description": {"type": "string"}
                },
                "required": ["start_time"]
            }),
        )
    }

    async fn invoke(&self, arguments: Map<String, Value>) -> Result<String> {
        let args: BookSlotArgs = parse_arguments(arguments)?;
        let now = (self.clock)();
        let resolved = self.resolver.resolve(&args.start_time, now)?;

        // An explicit duration argument overrides whatever span the
        // phrase itself implied.
        let range = match args.duration.as_deref() {
            Some(text) => {
                let duration = parse_duration(text).ok_or_else(|| {
                    SlatedError::validation(format!("could not parse duration '{text}'"))
                })?;
                TimeRange::with_duration(resolved.start(), duration)?
            }
            None => resolved,
        };

        let title = args
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_EVENT_TITLE.to_string());
        let request = BookingRequest::new(range, title, &self.user_id)
            .with_description(args.description.unwrap_or_default());

        match self.booking.book(request).await? {
            BookingOutcome::Booked { event } => {
                let mut out = format!("Meeting '{}' booked for {}.", event.title, event.range);
                if let Some(link) = &event.html_link {
                    let _ = write!(out, " Link: {link}");
                }
                Ok(out)
            }
            BookingOutcome::Conflict { conflicts } => {
                let mut out = String::from("Overlap detected, the slot was not booked:\n");
                for event in &conflicts {
                    let _ = writeln!(out, "- {event}");
                }
                out.push_str("Please choose a different time.");
                Ok(out)
            }
        }
    }
}

/// Lists upcoming events, optionally bounded by dates.
pub struct ListEventsTool {
    calendar: Arc<dyn CalendarService>,
    resolver: TimeResolver,
    clock: Clock,
}

#[derive(Deserialize)]
struct ListEventsArgs {
    start_date: Option<String>,
    end_date: Option<String>,
}

#[async_trait]
impl ToolHandler for ListEventsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "list_events",
            "List upcoming events, optionally filtered by date range",
            json!({
                "type": "object",
                "properties": {
                    "start_date": {"type": "string", "description": "YYYY-MM-DD; defaults to now"},
                    "end_date": {"type": "string", "description": "YYYY-MM-DD; defaults to 30 days after start"}
                }
            }),
        )
    }

    async fn invoke(&self, arguments: Map<String, Value>) -> Result<String> {
        let args: ListEventsArgs = parse_arguments(arguments)?;
        let now = (self.clock)();

        let start = match args.start_date.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(text) => {
                let day = self.resolver.resolve_day(text, now)?;
                self.resolver.day_span(day, day)?.start()
            }
            None => now.with_timezone(&self.resolver.zone()),
        };
        let end = match args.end_date.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(text) => {
                let day = self.resolver.resolve_day(text, now)?;
                self.resolver.day_span(day, day)?.end()
            }
            None => start + Duration::days(DEFAULT_LIST_DAYS),
        };
        let window = TimeRange::new(start, end)?;

        let mut events = self.calendar.list_events(&window).await?;
        events.sort_by_key(|event| event.range.start());

        if events.is_empty() {
            return Ok("No upcoming events found in the given range.".to_string());
        }
        let mut out = String::from("Upcoming events:\n");
        for event in &events {
            out.push_str(&render_event_line(event));
        }
        Ok(out)
    }
}

fn render_event_line(event: &CalendarEvent) -> String {
    let mut line = format!("- {} ({})", event.title, event.range);
    if !event.description.is_empty() {
        let _ = write!(line, " | {}", event.description);
    }
    if let Some(link) = &event.html_link {
        let _ = write!(line, " | {link}");
    }
    line.push('\n');
    line
}
