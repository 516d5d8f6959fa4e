//! Live tweet feed: the search client boundary and the controller that
//! drives it through (since, until) windows.

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::Tweet;

pub mod archive;
pub mod controller;
pub mod http;

pub use archive::ArchiveFeed;
pub use controller::{FeedController, FeedSettings, FeedState, GapResolution};
pub use http::SearchClient;

/// Failures of a single feed request. All of them are transient from the
/// merge engine's point of view.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("unrecognised response from {url}: {reason}")]
    Unrecognised { url: String, reason: String },
}

/// Search terms plus the date window of one feed query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedQuery {
    pub language: Option<String>,
    pub user: Option<String>,
    pub query: Option<String>,
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
}

impl FeedQuery {
    /// A feed is only opened when there is something to search for.
    pub fn is_searchable(&self) -> bool {
        self.user.is_some() || self.query.is_some()
    }

    pub fn windowed(&self, since: Option<NaiveDate>, until: Option<NaiveDate>) -> Self {
        Self { since, until, ..self.clone() }
    }

    /// Advanced-search string, e.g. `lang:en from:bob since:2016-05-01 rust`.
    pub fn search_string(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(language) = &self.language {
            parts.push(format!("lang:{language}"));
        }
        if let Some(user) = &self.user {
            parts.push(format!("from:{user}"));
        }
        if let Some(since) = self.since {
            parts.push(format!("since:{since}"));
        }
        if let Some(until) = self.until {
            parts.push(format!("until:{until}"));
        }
        if let Some(query) = &self.query {
            parts.push(query.clone());
        }
        parts.join(" ")
    }
}

/// Something that can run a search and page through its results.
pub trait FeedClient {
    /// Start a search. Nothing is fetched until the stream is first read.
    fn search(&self, query: &FeedQuery) -> Box<dyn TweetStream + '_>;
}

/// Lazily paged results of one search, newest first.
pub trait TweetStream {
    fn next_tweet(&mut self) -> Result<Option<Tweet>, FeedError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::parse_day;

    #[test]
    fn search_string_orders_operators() {
        let query = FeedQuery {
            language: Some("en".into()),
            user: Some("bob".into()),
            query: Some("rust lang".into()),
            since: Some(parse_day("2016-05-01").expect("since")),
            until: Some(parse_day("2016-05-03").expect("until")),
        };
        assert_eq!(
            query.search_string(),
            "lang:en from:bob since:2016-05-01 until:2016-05-03 rust lang"
        );
    }

    #[test]
    fn searchable_needs_user_or_query() {
        let mut query = FeedQuery { language: Some("en".into()), ..Default::default() };
        assert!(!query.is_searchable());
        query.user = Some("bob".into());
        assert!(query.is_searchable());
    }

    #[test]
    fn windowed_keeps_terms() {
        let base = FeedQuery { query: Some("x".into()), ..Default::default() };
        let day = parse_day("2016-05-01").expect("day");
        let windowed = base.windowed(None, Some(day));
        assert_eq!(windowed.query.as_deref(), Some("x"));
        assert_eq!(windowed.until, Some(day));
        assert_eq!(windowed.since, None);
    }
}
