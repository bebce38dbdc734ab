//! External collaborators for the Slated assistant.
//!
//! The Google Calendar REST client and environment-based configuration
//! loading. Everything here sits behind traits or plain functions so the
//! application layer never touches HTTP or the process environment
//! directly.

pub mod env_config;
pub mod google_calendar;

pub use env_config::load_config;
pub use google_calendar::GoogleCalendarClient;
