//! Tool domain module.
//!
//! - `call`: tool call and schema types
//! - `registry`: handler trait, registry, and dispatch

mod call;
mod registry;

pub use call::{ToolCall, ToolSchema};
pub use registry::{parse_arguments, ToolHandler, ToolRegistry};
