//! Domain layer for the Slated scheduling assistant.
//!
//! Pure types and logic: time resolution, interval queries, booking
//! outcomes, sessions, tool dispatch, configuration. No I/O lives here;
//! the external calendar and the reasoning model are reached only through
//! the traits this crate declares.

pub mod config;
pub mod error;
pub mod schedule;
pub mod session;
pub mod time;
pub mod tool;

// Re-export common error type
pub use error::{Result, SlatedError};
