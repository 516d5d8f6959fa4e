//! Core data types shared across the crate

mod config;
mod tweet;

pub use config::{Config, DEFAULT_ENDPOINT, DEFAULT_USER_AGENT};
pub use tweet::{default_fieldnames, Tweet, DEFAULT_FIELDNAMES};
