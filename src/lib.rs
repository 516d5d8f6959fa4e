//! tweet-collect: scrape tweets and merge them with existing CSV archives
//!
//! Archives and the live search feed are read as ordered sources and merged
//! into one strictly id-descending stream. Holes in coverage that the feed
//! cannot fill are recorded as blank rows so later runs can find them.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod feed;
pub mod merge;
pub mod render;
pub mod source;
pub mod utils;

pub use error::{Error, Result};
