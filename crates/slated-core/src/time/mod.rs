//! Time domain module.
//!
//! - `range`: the canonical half-open [`TimeRange`] interval type
//! - `resolver`: natural-language phrase resolution ([`TimeResolver`])

mod range;
mod resolver;

pub use range::TimeRange;
pub use resolver::{parse_duration, TimeResolver};
