//! Shared helpers

pub mod dates;

pub use dates::{format_timestamp, parse_day, parse_timestamp};
