//! Feed served from tweets already on disk.
//!
//! Answers searches the way the live feed does (newest first, `since`
//! inclusive, `until` exclusive, filtered by user/language/terms) without
//! any network access. Useful for replaying a collection offline.

use std::cell::Cell;
use std::path::Path;

use super::{FeedClient, FeedError, FeedQuery, TweetStream};
use crate::domain::Tweet;
use crate::error::Result;
use crate::source::{CsvSource, DateWindow, Item, OrderedSource};

pub struct ArchiveFeed {
    tweets: Vec<Tweet>,
    searches: Cell<usize>,
}

impl ArchiveFeed {
    pub fn new(mut tweets: Vec<Tweet>) -> Self {
        tweets.sort_by(|a, b| b.id.cmp(&a.id));
        tweets.dedup_by_key(|t| t.id);
        Self { tweets, searches: Cell::new(0) }
    }

    /// Load every record of a CSV archive; gap markers are ignored.
    pub fn load(path: &Path) -> Result<Self> {
        let mut source = CsvSource::open(path, DateWindow::default())?;
        let mut tweets = Vec::new();
        let mut item = source.peek().clone();
        while !item.is_end() {
            if let Item::Record(tweet) = item {
                tweets.push(tweet);
            }
            item = source.advance()?.clone();
        }
        Ok(Self::new(tweets))
    }

    pub fn len(&self) -> usize {
        self.tweets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tweets.is_empty()
    }

    /// Number of searches served so far.
    pub fn searches(&self) -> usize {
        self.searches.get()
    }
}

impl FeedClient for ArchiveFeed {
    fn search(&self, query: &FeedQuery) -> Box<dyn TweetStream + '_> {
        self.searches.set(self.searches.get() + 1);
        Box::new(ArchiveStream {
            tweets: self.tweets.iter(),
            window: DateWindow::new(query.since, query.until),
            user: query.user.as_ref().map(|u| u.trim_start_matches('@').to_lowercase()),
            language: query.language.clone(),
            terms: query
                .query
                .as_deref()
                .map(|q| q.split_whitespace().map(str::to_lowercase).collect())
                .unwrap_or_default(),
        })
    }
}

struct ArchiveStream<'a> {
    tweets: std::slice::Iter<'a, Tweet>,
    window: DateWindow,
    user: Option<String>,
    language: Option<String>,
    terms: Vec<String>,
}

impl ArchiveStream<'_> {
    fn matches(&self, tweet: &Tweet) -> bool {
        if !self.window.contains(tweet.day()) {
            return false;
        }
        if let Some(user) = &self.user {
            if tweet.field("user").trim_start_matches('@').to_lowercase() != *user {
                return false;
            }
        }
        if let Some(language) = &self.language {
            if tweet.field("lang") != language {
                return false;
            }
        }
        let text = tweet.field("text").to_lowercase();
        self.terms.iter().all(|term| text.contains(term.as_str()))
    }
}

impl TweetStream for ArchiveStream<'_> {
    fn next_tweet(&mut self) -> std::result::Result<Option<Tweet>, FeedError> {
        while let Some(tweet) = self.tweets.next() {
            if self.matches(tweet) {
                return Ok(Some(tweet.clone()));
            }
        }
        Ok(None)
    }
}
