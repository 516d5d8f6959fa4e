//! CLI overrides on top of file/env config.

use crate::domain::Config;
use crate::error::Result;
use crate::feed::{FeedQuery, FeedSettings};
use crate::merge::MergeConfig;
use crate::utils::parse_day;

/// Options given on the command line; `None` defers to config.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub user: Option<String>,
    pub query: Option<String>,
    pub language: Option<String>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub force: bool,
    pub timeout_secs: Option<u64>,
    pub number: Option<usize>,
    pub no_comments: bool,
}

/// Everything a scrape run needs, resolved.
#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    /// Search terms without a window.
    pub query: FeedQuery,
    pub merge: MergeConfig,
    pub feed: FeedSettings,
    pub comments: bool,
    /// The config after overrides, for the HTTP client.
    pub config: Config,
}

pub fn merge_cli_with_config(mut config: Config, cli: CliOverrides) -> Result<ScrapeSettings> {
    if let Some(timeout) = cli.timeout_secs {
        config.timeout_secs = timeout;
    }
    if cli.language.is_some() {
        config.language = cli.language;
    }
    if cli.no_comments {
        config.comments = false;
    }

    let since = cli.since.as_deref().map(parse_day).transpose()?;
    let until = cli.until.as_deref().map(parse_day).transpose()?;
    let epoch_floor = parse_day(&config.epoch_floor)?;

    Ok(ScrapeSettings {
        query: FeedQuery {
            language: config.language.clone(),
            user: cli.user,
            query: cli.query,
            since: None,
            until: None,
        },
        merge: MergeConfig { since, until, force: cli.force, limit: cli.number.filter(|n| *n > 0) },
        feed: FeedSettings { epoch_floor, max_retries: config.max_retries },
        comments: config.comments,
        config,
    })
}
