//! Google Calendar v3 REST client.
//!
//! Implements the [`CalendarService`] collaborator: event listing over a
//! window, event creation, and deletion (used to back out a losing
//! writer). Authentication is the OAuth2 refresh-token grant; the access
//! token is cached until shortly before expiry.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveTime, SecondsFormat, TimeZone};
use chrono_tz::Tz;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use slated_core::config::{AssistantConfig, GoogleCredentials};
use slated_core::schedule::{CalendarEvent, CalendarService, EventSource};
use slated_core::time::TimeRange;
use slated_core::{Result, SlatedError};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const EVENTS_BASE: &str = "https://www.googleapis.com/calendar/v3/calendars";
const MAX_RESULTS: u32 = 50;
/// Refresh the access token this long before its reported expiry.
const TOKEN_EXPIRY_SKEW: Duration = Duration::from_secs(60);

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Calendar collaborator backed by the Google Calendar v3 API.
pub struct GoogleCalendarClient {
    client: Client,
    calendar_id: String,
    zone: Tz,
    credentials: GoogleCredentials,
    token: RwLock<Option<CachedToken>>,
}

impl GoogleCalendarClient {
    /// # Errors
    ///
    /// Returns a `Calendar` error if the HTTP client cannot be built.
    pub fn new(config: &AssistantConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| SlatedError::calendar(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            calendar_id: config.calendar_id.clone(),
            zone: config.time_zone,
            credentials: config.google.clone(),
            token: RwLock::new(None),
        })
    }

    async fn access_token(&self) -> Result<String> {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at > Instant::now() {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let response = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", self.credentials.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|err| SlatedError::calendar(format!("token refresh failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SlatedError::calendar(format!(
                "token refresh rejected ({status}): {body}"
            )));
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|err| SlatedError::calendar(format!("bad token response: {err}")))?;

        let expires_in = Duration::from_secs(parsed.expires_in);
        let expires_at = Instant::now() + expires_in.saturating_sub(TOKEN_EXPIRY_SKEW);
        let mut cached = self.token.write().await;
        *cached = Some(CachedToken {
            access_token: parsed.access_token.clone(),
            expires_at,
        });
        Ok(parsed.access_token)
    }

    fn events_url(&self) -> String {
        format!("{EVENTS_BASE}/{}/events", self.calendar_id)
    }

    fn parse_event(&self, resource: EventResource) -> Result<CalendarEvent> {
        let range = match (&resource.start.date_time, &resource.start.date) {
            (Some(start), _) => {
                let end = resource.end.date_time.as_deref().ok_or_else(|| {
                    SlatedError::calendar(format!("event {} has no end time", resource.id))
                })?;
                let start = parse_rfc3339(start, &self.zone)?;
                let end = parse_rfc3339(end, &self.zone)?;
                TimeRange::new(start, end)
                    .map_err(|err| SlatedError::calendar(err.to_string()))?
            }
            // All-day events block every local day they span.
            (None, Some(date)) => {
                all_day_range(&self.zone, date, resource.end.date.as_deref())?
            }
            (None, None) => {
                return Err(SlatedError::calendar(format!(
                    "event {} has no start",
                    resource.id
                )))
            }
        };

        Ok(CalendarEvent {
            id: resource.id,
            title: resource
                .summary
                .unwrap_or_else(|| "Untitled event".to_string()),
            description: resource.description.unwrap_or_default(),
            range,
            html_link: resource.html_link,
            source: EventSource::External,
        })
    }

}

/// The local span of an all-day event. The API reports `end.date` as
/// exclusive, so a one-day event ends on the next calendar day; a
/// missing or non-advancing end falls back to a single day.
fn all_day_range(zone: &Tz, start_date: &str, end_date: Option<&str>) -> Result<TimeRange> {
    let first: NaiveDate = start_date
        .parse()
        .map_err(|_| SlatedError::calendar(format!("bad all-day date '{start_date}'")))?;
    let after_last = match end_date {
        Some(end) => {
            let end: NaiveDate = end
                .parse()
                .map_err(|_| SlatedError::calendar(format!("bad all-day date '{end}'")))?;
            if end > first {
                end
            } else {
                first + ChronoDuration::days(1)
            }
        }
        None => first + ChronoDuration::days(1),
    };
    let start = local_midnight(zone, first)?;
    let end = local_midnight(zone, after_last)?;
    TimeRange::new(start, end).map_err(|err| SlatedError::calendar(err.to_string()))
}

fn local_midnight(zone: &Tz, day: NaiveDate) -> Result<DateTime<Tz>> {
    let midnight = NaiveTime::from_hms_opt(0, 0, 0)
        .ok_or_else(|| SlatedError::internal("invalid midnight"))?;
    zone.from_local_datetime(&day.and_time(midnight))
        .single()
        .ok_or_else(|| SlatedError::calendar(format!("ambiguous local midnight on {day}")))
}

#[async_trait]
impl CalendarService for GoogleCalendarClient {
    async fn list_events(&self, window: &TimeRange) -> Result<Vec<CalendarEvent>> {
        let token = self.access_token().await?;
        let time_min = window.start_utc().to_rfc3339_opts(SecondsFormat::Secs, true);
        let time_max = window.end_utc().to_rfc3339_opts(SecondsFormat::Secs, true);
        tracing::debug!("[GoogleCalendar] Listing events {} to {}", time_min, time_max);

        let response = self
            .client
            .get(self.events_url())
            .bearer_auth(token)
            .query(&[
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
                ("maxResults", &MAX_RESULTS.to_string()),
            ])
            .send()
            .await
            .map_err(|err| SlatedError::calendar(format!("event list failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SlatedError::calendar(format!(
                "event list rejected ({status}): {body}"
            )));
        }

        let parsed: EventsResponse = response
            .json()
            .await
            .map_err(|err| SlatedError::calendar(format!("bad event list response: {err}")))?;

        let mut events = Vec::with_capacity(parsed.items.len());
        for resource in parsed.items {
            match self.parse_event(resource) {
                Ok(event) => events.push(event),
                Err(err) => tracing::warn!("[GoogleCalendar] Skipping unparseable event: {}", err),
            }
        }
        Ok(events)
    }

    async fn create_event(
        &self,
        title: &str,
        description: &str,
        range: &TimeRange,
    ) -> Result<CalendarEvent> {
        let token = self.access_token().await?;
        let body = InsertEventRequest {
            summary: title,
            description,
            start: EventTimeRequest {
                date_time: range.start().to_rfc3339(),
                time_zone: self.zone.name(),
            },
            end: EventTimeRequest {
                date_time: range.end().to_rfc3339(),
                time_zone: self.zone.name(),
            },
        };
        tracing::info!("[GoogleCalendar] Creating event '{}' at {}", title, range);

        let response = self
            .client
            .post(self.events_url())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|err| SlatedError::calendar(format!("event insert failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SlatedError::calendar(format!(
                "event insert rejected ({status}): {body}"
            )));
        }

        let resource: EventResource = response
            .json()
            .await
            .map_err(|err| SlatedError::calendar(format!("bad insert response: {err}")))?;
        let mut event = self.parse_event(resource)?;
        event.source = EventSource::Pending;
        Ok(event)
    }

    async fn delete_event(&self, event_id: &str) -> Result<()> {
        let token = self.access_token().await?;
        let url = format!("{}/{}", self.events_url(), event_id);
        tracing::info!("[GoogleCalendar] Deleting event {}", event_id);

        let response = self
            .client
            .delete(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|err| SlatedError::calendar(format!("event delete failed: {err}")))?;

        // 404/410 mean the event is already gone, which is the state we want.
        let status = response.status();
        if status.is_success() || status.as_u16() == 404 || status.as_u16() == 410 {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(SlatedError::calendar(format!(
                "event delete rejected ({status}): {body}"
            )))
        }
    }
}

fn parse_rfc3339(text: &str, zone: &Tz) -> Result<DateTime<Tz>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(zone))
        .map_err(|err| SlatedError::calendar(format!("bad timestamp '{text}': {err}")))
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct EventsResponse {
    #[serde(default)]
    items: Vec<EventResource>,
}

#[derive(Deserialize)]
struct EventResource {
    id: String,
    summary: Option<String>,
    description: Option<String>,
    #[serde(rename = "htmlLink")]
    html_link: Option<String>,
    start: EventTimeResource,
    end: EventTimeResource,
}

#[derive(Deserialize, Default)]
struct EventTimeResource {
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
    date: Option<String>,
}

#[derive(Serialize)]
struct InsertEventRequest<'a> {
    summary: &'a str,
    description: &'a str,
    start: EventTimeRequest<'a>,
    end: EventTimeRequest<'a>,
}

#[derive(Serialize)]
struct EventTimeRequest<'a> {
    #[serde(rename = "dateTime")]
    date_time: String,
    #[serde(rename = "timeZone")]
    time_zone: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Kolkata;

    #[test]
    fn rfc3339_timestamps_normalize_into_the_zone() {
        let dt = parse_rfc3339("2025-06-30T08:30:00Z", &Kolkata).unwrap();
        assert_eq!(dt.format("%H:%M").to_string(), "14:00");

        let offset = parse_rfc3339("2025-06-30T14:00:00+05:30", &Kolkata).unwrap();
        assert_eq!(dt, offset);
    }

    #[test]
    fn event_resources_deserialize() {
        let json = r#"{
            "id": "abc123",
            "summary": "Standup",
            "htmlLink": "https://calendar.google.com/event?eid=abc",
            "start": {"dateTime": "2025-06-30T10:00:00+05:30"},
            "end": {"dateTime": "2025-06-30T10:30:00+05:30"}
        }"#;
        let resource: EventResource = serde_json::from_str(json).unwrap();
        assert_eq!(resource.id, "abc123");
        assert_eq!(resource.summary.as_deref(), Some("Standup"));
        assert!(resource.start.date_time.is_some());
        assert!(resource.start.date.is_none());
    }

    #[test]
    fn all_day_resources_deserialize() {
        let json = r#"{
            "id": "holiday",
            "start": {"date": "2025-07-01"},
            "end": {"date": "2025-07-02"}
        }"#;
        let resource: EventResource = serde_json::from_str(json).unwrap();
        assert_eq!(resource.start.date.as_deref(), Some("2025-07-01"));
        assert!(resource.summary.is_none());
    }

    #[test]
    fn multi_day_all_day_events_span_every_day() {
        let range = all_day_range(&Kolkata, "2025-07-01", Some("2025-07-04")).unwrap();
        assert_eq!(range.start().format("%Y-%m-%d %H:%M").to_string(), "2025-07-01 00:00");
        // end.date is exclusive: the event covers the 1st through the 3rd.
        assert_eq!(range.end().format("%Y-%m-%d %H:%M").to_string(), "2025-07-04 00:00");
    }

    #[test]
    fn single_day_all_day_event_blocks_one_local_day() {
        let range = all_day_range(&Kolkata, "2025-07-01", Some("2025-07-02")).unwrap();
        assert_eq!(range.end() - range.start(), ChronoDuration::days(1));
    }

    #[test]
    fn all_day_event_without_an_end_defaults_to_one_day() {
        let range = all_day_range(&Kolkata, "2025-07-01", None).unwrap();
        assert_eq!(range.end() - range.start(), ChronoDuration::days(1));
    }

    #[test]
    fn non_advancing_all_day_end_still_yields_a_valid_range() {
        let range = all_day_range(&Kolkata, "2025-07-01", Some("2025-07-01")).unwrap();
        assert_eq!(range.end() - range.start(), ChronoDuration::days(1));
    }
}
