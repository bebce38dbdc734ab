//! Application layer for the Slated assistant.
//!
//! Composes the domain, reasoning, and infrastructure layers into the
//! conversational scheduling workflow: the assistant facade, the
//! reason/act executor, the booking state machine, and the calendar
//! tool handlers.

pub mod assistant;
pub mod booking;
pub mod tools;
pub mod workflow;

pub use assistant::{Assistant, HealthReport};
pub use booking::BookingService;
pub use workflow::{TurnRecord, TurnStep, WorkflowExecutor};
