//! The assistant facade.
//!
//! Owns the session store and wires one turn together: serialize on the
//! user's session, snapshot history, run the reason/act loop with a
//! per-turn tool registry, then persist what happened. Collaborators
//! arrive as trait objects so the whole surface is testable offline.

use crate::tools::{build_registry, Clock};
use crate::workflow::WorkflowExecutor;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use slated_core::config::AssistantConfig;
use slated_core::schedule::CalendarService;
use slated_core::session::{MessageRole, SessionStore, SessionSummary, TurnGuard};
use slated_core::time::{TimeRange, TimeResolver};
use slated_core::{Result, SlatedError};
use slated_infrastructure::GoogleCalendarClient;
use slated_interaction::{ChatAgent, KeyRotationClient, OpenRouterClient};
use std::sync::Arc;

/// Snapshot of process health for operational surfaces.
#[derive(Debug, Clone)]
pub struct HealthReport {
    pub calendar_reachable: bool,
    pub active_sessions: usize,
}

/// Entry point for conversational scheduling.
///
/// One instance serves every user; per-user serialization happens inside
/// the session store.
pub struct Assistant {
    executor: WorkflowExecutor,
    calendar: Arc<dyn CalendarService>,
    sessions: SessionStore,
    resolver: TimeResolver,
    session_ttl: Duration,
    clock: Clock,
}

impl Assistant {
    pub fn new(
        agent: Arc<dyn ChatAgent>,
        calendar: Arc<dyn CalendarService>,
        zone: Tz,
        max_iterations: usize,
        session_ttl: Duration,
    ) -> Self {
        Self {
            executor: WorkflowExecutor::new(agent, zone, max_iterations),
            calendar,
            sessions: SessionStore::new(),
            resolver: TimeResolver::new(zone),
            session_ttl,
            clock: Utc::now,
        }
    }

    /// Wires the production collaborators from configuration.
    ///
    /// # Errors
    ///
    /// Fatal `Config` errors for invalid settings or an empty key pool.
    pub fn from_config(config: &AssistantConfig) -> Result<Self> {
        let raw = OpenRouterClient::new(
            config.model.clone(),
            config.temperature,
            config.request_timeout,
        )?;
        let agent: Arc<dyn ChatAgent> =
            Arc::new(KeyRotationClient::new(Arc::new(raw), config.api_keys.clone())?);
        let calendar: Arc<dyn CalendarService> = Arc::new(GoogleCalendarClient::new(config)?);
        let session_ttl = Duration::from_std(config.session_ttl)
            .map_err(|_| SlatedError::config("session TTL out of range"))?;
        Ok(Self::new(
            agent,
            calendar,
            config.time_zone,
            config.max_iterations,
            session_ttl,
        ))
    }

    /// Pins the clock. Test hook.
    #[cfg(test)]
    pub(crate) fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Handles one user message end to end and returns the reply.
    /// Queues behind any in-flight turn for the same user id.
    pub async fn submit_message(&self, user_id: &str, text: &str) -> Result<String> {
        let now = (self.clock)();
        self.evict_idle(now).await;
        let turn = self.sessions.begin_turn(user_id, now).await;
        self.run_turn(turn, user_id, text, now).await
    }

    /// Non-queueing variant: rejects with `SessionBusy` when a turn for
    /// this user is already in flight.
    pub async fn try_submit_message(&self, user_id: &str, text: &str) -> Result<String> {
        let now = (self.clock)();
        self.evict_idle(now).await;
        let turn = self.sessions.try_begin_turn(user_id, now).await?;
        self.run_turn(turn, user_id, text, now).await
    }

    async fn run_turn(
        &self,
        turn: TurnGuard,
        user_id: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<String> {
        turn.append(MessageRole::User, text, now).await;
        let session = turn.snapshot().await;

        let registry = build_registry(self.calendar.clone(), self.resolver, user_id, self.clock);
        let record = self
            .executor
            .run_turn(&session.messages, &registry, now)
            .await?;

        for step in &record.steps {
            turn.record_tool_call(step.tool.as_str()).await;
            // Persist the call the model emitted next to its observation,
            // so later turns replay the same exchange the model saw.
            turn.append(MessageRole::Assistant, step.call.as_str(), now)
                .await;
            turn.append(
                MessageRole::Tool,
                format!("Tool result for {}: {}", step.tool, step.observation),
                now,
            )
            .await;
        }
        turn.append(MessageRole::Assistant, record.reply.as_str(), now)
            .await;
        turn.set_pending_clarification(record.needs_clarification).await;
        Ok(record.reply)
    }

    /// Summaries of the live sessions, most recently active first.
    pub async fn list_sessions(&self) -> Vec<SessionSummary> {
        self.sessions.list().await
    }

    /// Drops one user's conversation. Returns whether one existed.
    pub async fn clear_session(&self, user_id: &str) -> bool {
        self.sessions.clear(user_id).await
    }

    /// Drops every conversation, returning how many were held.
    pub async fn clear_all_sessions(&self) -> usize {
        self.sessions.clear_all().await
    }

    /// Probes the calendar collaborator and reports session load.
    pub async fn health(&self) -> HealthReport {
        let now = (self.clock)().with_timezone(&self.resolver.zone());
        let calendar_reachable = match TimeRange::with_duration(now, Duration::hours(1)) {
            Ok(window) => match self.calendar.list_events(&window).await {
                Ok(_) => true,
                Err(err) => {
                    tracing::warn!("[Assistant] Calendar probe failed: {}", err);
                    false
                }
            },
            Err(_) => false,
        };
        HealthReport {
            calendar_reachable,
            active_sessions: self.sessions.list().await.len(),
        }
    }

    async fn evict_idle(&self, now: DateTime<Utc>) {
        let evicted = self.sessions.evict_idle(self.session_ttl, now).await;
        if evicted > 0 {
            tracing::info!("[Assistant] Evicted {} idle session(s)", evicted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use chrono_tz::Asia::Kolkata;
    use slated_core::schedule::{CalendarEvent, EventSource};
    use slated_core::tool::ToolCall;
    use slated_interaction::{ChatMessage, ChatOutcome};
    use std::sync::Mutex;

    struct FixtureCalendar {
        events: Mutex<Vec<CalendarEvent>>,
    }

    impl FixtureCalendar {
        fn new(events: Vec<CalendarEvent>) -> Arc<Self> {
            Arc::new(Self {
                events: Mutex::new(events),
            })
        }
    }

    #[async_trait]
    impl CalendarService for FixtureCalendar {
        async fn list_events(&self, window: &TimeRange) -> Result<Vec<CalendarEvent>> {
            Ok(self
                .events
                .lock()
                .unwrap()
                .iter()
                .filter(|event| event.range.overlaps(window))
                .cloned()
                .collect())
        }

        async fn create_event(
            &self,
            title: &str,
            description: &str,
            range: &TimeRange,
        ) -> Result<CalendarEvent> {
            let event = CalendarEvent {
                id: format!("evt-{}", self.events.lock().unwrap().len() + 1),
                title: title.to_string(),
                description: description.to_string(),
                range: range.clone(),
                html_link: None,
                source: EventSource::Pending,
            };
            self.events.lock().unwrap().push(event.clone());
            Ok(event)
        }

        async fn delete_event(&self, event_id: &str) -> Result<()> {
            self.events.lock().unwrap().retain(|e| e.id != event_id);
            Ok(())
        }
    }

    /// Replays scripted outcomes in order; loops the last one forever.
    struct ScriptedAgent {
        script: Mutex<Vec<ChatOutcome>>,
    }

    impl ScriptedAgent {
        fn new(script: Vec<ChatOutcome>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
            })
        }
    }

    #[async_trait]
    impl ChatAgent for ScriptedAgent {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<ChatOutcome> {
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                Ok(script.remove(0))
            } else {
                Ok(script[0].clone())
            }
        }
    }

    fn tool_call(name: &str, arguments: serde_json::Value) -> ToolCall {
        let serde_json::Value::Object(map) = arguments else {
            panic!("arguments must be an object");
        };
        ToolCall::new(name, map)
    }

    fn fixed_now() -> DateTime<Utc> {
        // Monday 2025-06-30, 10:00 in Asia/Kolkata.
        Utc.with_ymd_and_hms(2025, 6, 30, 4, 30, 0).unwrap()
    }

    fn assistant(agent: Arc<dyn ChatAgent>, calendar: Arc<dyn CalendarService>) -> Assistant {
        Assistant::new(agent, calendar, Kolkata, 6, Duration::hours(24)).with_clock(fixed_now)
    }

    #[tokio::test]
    async fn plain_reply_flows_through_and_is_recorded() {
        let agent = ScriptedAgent::new(vec![ChatOutcome::Message("Hi there!".to_string())]);
        let assistant = assistant(agent, FixtureCalendar::new(Vec::new()));

        let reply = assistant.submit_message("alice", "hello").await.unwrap();
        assert_eq!(reply, "Hi there!");

        let sessions = assistant.list_sessions().await;
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].user_id, "alice");
        // User message plus assistant reply.
        assert_eq!(sessions[0].message_count, 2);
    }

    #[tokio::test]
    async fn booking_turn_creates_the_event_and_reports_it() {
        let agent = ScriptedAgent::new(vec![
            ChatOutcome::ToolCalls(vec![tool_call(
                "book_slot",
                serde_json::json!({
                    "start_time": "tomorrow at 2 pm",
                    "duration": "1h",
                    "title": "Project kickoff"
                }),
            )]),
            ChatOutcome::Message("Booked your kickoff for tomorrow at 2 PM.".to_string()),
        ]);
        let calendar = FixtureCalendar::new(Vec::new());
        let assistant = assistant(agent, calendar.clone());

        let reply = assistant
            .submit_message("alice", "book a kickoff tomorrow at 2 pm for an hour")
            .await
            .unwrap();
        assert!(reply.contains("Booked"), "{reply}");

        let events = calendar.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Project kickoff");
        assert_eq!(
            events[0].range.start(),
            Kolkata.with_ymd_and_hms(2025, 7, 1, 14, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn conflicting_booking_never_creates_a_second_event() {
        let existing = CalendarEvent::external(
            "busy",
            "Standup",
            TimeRange::new(
                Kolkata.with_ymd_and_hms(2025, 7, 1, 14, 0, 0).unwrap(),
                Kolkata.with_ymd_and_hms(2025, 7, 1, 15, 0, 0).unwrap(),
            )
            .unwrap(),
        );
        let agent = ScriptedAgent::new(vec![
            ChatOutcome::ToolCalls(vec![tool_call(
                "book_slot",
                serde_json::json!({"start_time": "2025-07-01T14:30:00", "duration": "1h"}),
            )]),
            ChatOutcome::Message("That slot overlaps your standup.".to_string()),
        ]);
        let calendar = FixtureCalendar::new(vec![existing]);
        let assistant = assistant(agent, calendar.clone());

        let reply = assistant
            .submit_message("alice", "book tomorrow 2:30 pm")
            .await
            .unwrap();
        assert!(reply.contains("overlaps"), "{reply}");
        assert_eq!(calendar.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn tool_observations_land_in_the_session_history() {
        let agent = ScriptedAgent::new(vec![
            ChatOutcome::ToolCalls(vec![tool_call("list_events", serde_json::json!({}))]),
            ChatOutcome::Message("You have nothing coming up.".to_string()),
        ]);
        let assistant = assistant(agent, FixtureCalendar::new(Vec::new()));

        assistant.submit_message("alice", "what's on?").await.unwrap();
        let sessions = assistant.list_sessions().await;
        // User message, echoed tool call, tool observation, assistant reply.
        assert_eq!(sessions[0].message_count, 4);

        // The echoed call precedes its observation in the history, so a
        // later turn replays the exchange the model actually saw.
        let session = assistant
            .sessions
            .begin_turn("alice", fixed_now())
            .await
            .snapshot()
            .await;
        assert!(session.messages[1].content.contains("\"tool_call\":\"list_events\""));
        assert!(session.messages[2].content.contains("Tool result for list_events"));
        assert_eq!(session.tool_calls_made, vec!["list_events"]);
    }

    #[tokio::test]
    async fn clarifying_reply_marks_the_session_pending() {
        let agent = ScriptedAgent::new(vec![
            ChatOutcome::Message("Could you specify the duration?".to_string()),
            ChatOutcome::Message("Booked it.".to_string()),
        ]);
        let assistant = assistant(agent, FixtureCalendar::new(Vec::new()));

        assistant
            .submit_message("alice", "book something tomorrow")
            .await
            .unwrap();
        assert!(assistant.list_sessions().await[0].pending_clarification);

        assistant.submit_message("alice", "one hour").await.unwrap();
        assert!(!assistant.list_sessions().await[0].pending_clarification);
    }

    #[tokio::test]
    async fn busy_session_is_rejected_without_queueing() {
        let agent = ScriptedAgent::new(vec![ChatOutcome::Message("ok".to_string())]);
        let calendar = FixtureCalendar::new(Vec::new());
        let assistant = assistant(agent, calendar);

        // Hold alice's turn lock, then try a non-queueing submit.
        let held = assistant.sessions.begin_turn("alice", fixed_now()).await;
        let err = assistant
            .try_submit_message("alice", "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, SlatedError::SessionBusy { .. }));
        drop(held);

        assert!(assistant.try_submit_message("alice", "hello").await.is_ok());
    }

    #[tokio::test]
    async fn clearing_sessions_forgets_history() {
        let agent = ScriptedAgent::new(vec![ChatOutcome::Message("ok".to_string())]);
        let assistant = assistant(agent, FixtureCalendar::new(Vec::new()));

        assistant.submit_message("alice", "hello").await.unwrap();
        assistant.submit_message("bob", "hello").await.unwrap();
        assert!(assistant.clear_session("alice").await);
        assert_eq!(assistant.clear_all_sessions().await, 1);
        assert!(assistant.list_sessions().await.is_empty());
    }

    #[tokio::test]
    async fn health_reports_reachable_calendar_and_session_count() {
        let agent = ScriptedAgent::new(vec![ChatOutcome::Message("ok".to_string())]);
        let assistant = assistant(agent, FixtureCalendar::new(Vec::new()));
        assistant.submit_message("alice", "hello").await.unwrap();

        let report = assistant.health().await;
        assert!(report.calendar_reachable);
        assert_eq!(report.active_sessions, 1);
    }
}
