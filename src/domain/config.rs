//! Persistent settings read from config files and the environment.

use serde::{Deserialize, Serialize};

use crate::utils::dates::TWITTER_EPOCH;

pub const DEFAULT_ENDPOINT: &str = "https://twitter.com/i/search/timeline";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 6.1; Win64; x64)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Socket timeout for each feed request, in seconds.
    pub timeout_secs: u64,
    /// Consecutive transport failures tolerated for one feed window.
    pub max_retries: usize,
    /// Earliest day the feed is ever queried for.
    pub epoch_floor: String,
    pub endpoint: String,
    pub user_agent: String,
    /// Default language filter when `--language` is not given.
    pub language: Option<String>,
    /// Write the provenance comment header.
    pub comments: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            max_retries: 5,
            epoch_floor: TWITTER_EPOCH.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            language: None,
            comments: true,
        }
    }
}
