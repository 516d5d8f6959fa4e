//! Feed controller: opens, re-opens and parks the live feed.
//!
//! The feed only answers "tweets strictly before `until`, on or after
//! `since`", so filling a hole in the archive means choosing a window that
//! brackets it, skipping forward past ids already written, and walking
//! `until` back a day at a time when a window comes back empty.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info, warn};

use super::{FeedClient, FeedQuery, TweetStream};
use crate::domain::Tweet;
use crate::error::Result;
use crate::source::{Item, OrderedSource};
use crate::utils::dates::{next_day, previous_day, twitter_epoch};

pub const FEED_LABEL: &str = "twitter feed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedSettings {
    /// No window may end on or before this day.
    pub epoch_floor: NaiveDate,
    /// Transport failures retried on one window before `until` moves back.
    pub max_retries: usize,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self { epoch_floor: twitter_epoch(), max_retries: 5 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    /// No search has been started, or the last one was dropped.
    Closed,
    /// A search is live and can be read further.
    Open,
    /// The last search ran out of results.
    Exhausted,
}

/// Outcome of trying to bridge a suspected hole with the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapResolution {
    /// The feed is positioned on a record below the last written id.
    /// `pacing` is set when the feed also held the last written id itself.
    Resumed { pacing: bool },
    /// No window can be searched any more for this hole.
    Unresolved,
}

pub struct FeedController<'a> {
    client: &'a dyn FeedClient,
    terms: FeedQuery,
    settings: FeedSettings,
    since: Option<NaiveDate>,
    until: Option<NaiveDate>,
    stream: Option<Box<dyn TweetStream + 'a>>,
    state: FeedState,
    current: Item,
    last_date: Option<NaiveDateTime>,
    transport_error: bool,
    /// Retries spent on the current window.
    retries: usize,
    searches: usize,
}

impl<'a> FeedController<'a> {
    pub fn new(client: &'a dyn FeedClient, terms: FeedQuery, settings: FeedSettings) -> Self {
        Self {
            client,
            terms,
            settings,
            since: None,
            until: None,
            stream: None,
            state: FeedState::Closed,
            current: Item::End,
            last_date: None,
            transport_error: false,
            retries: 0,
            searches: 0,
        }
    }

    pub fn state(&self) -> FeedState {
        self.state
    }

    /// The `(since, until)` of the most recent search.
    pub fn window(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        (self.since, self.until)
    }

    /// Number of searches started so far.
    pub fn searches(&self) -> usize {
        self.searches
    }

    /// Date of the last record the feed yielded, kept across parking.
    pub fn last_date(&self) -> Option<NaiveDateTime> {
        self.last_date
    }

    /// Open the feed on `(since, until)` and position on its first record.
    ///
    /// Transport failures retry the same window up to `max_retries` times.
    pub fn open(&mut self, since: Option<NaiveDate>, until: Option<NaiveDate>) -> Option<&Tweet> {
        self.since = since;
        self.until = until;
        self.retries = 0;
        let mut attempts = 0;
        loop {
            self.transport_error = false;
            self.start_search("Opening");
            self.current = self.pull();
            if !self.transport_error || attempts >= self.settings.max_retries {
                break;
            }
            attempts += 1;
        }
        match self.current.record() {
            Some(tweet) => debug!("Read id: {} from {}", tweet.id, FEED_LABEL),
            None => info!("Twitter feed returned no results"),
        }
        self.current.record()
    }

    /// Stop consuming the feed while keeping the live search, so it can be
    /// continued later if the next hole falls on the same day.
    pub fn park(&mut self) {
        self.current = Item::End;
    }

    /// Try to continue past `last`, the record just written, when no source
    /// is pacing.
    ///
    /// `since` is the lowest day worth searching. `before_search` runs
    /// before any request so callers can flush output first.
    pub fn resolve_gap(
        &mut self,
        since: Option<NaiveDate>,
        last: &Tweet,
        force: bool,
        before_search: &mut dyn FnMut() -> Result<()>,
    ) -> Result<GapResolution> {
        loop {
            let same_day = self.last_date.map(|d| d.date()) == Some(last.day());
            let continuing =
                self.stream.is_some() && (force || (self.since <= since && same_day));

            if continuing {
                info!(
                    "Continuing twitter feed with until:{}, since:{}",
                    fmt_day(self.until),
                    fmt_day(self.since)
                );
            } else {
                // The feed returns tweets strictly before `until`.
                let until = next_day(last.day());
                if self.stream.is_some() || self.searches == 0 || self.since > since {
                    self.stream = None;
                    self.transport_error = false;
                    self.retries = 0;
                    self.since = since;
                    self.until = Some(until);
                } else if self.since == since {
                    if self.transport_error && self.retries < self.settings.max_retries {
                        self.retries += 1;
                        debug!(
                            "Retrying window after transport error ({}/{})",
                            self.retries, self.settings.max_retries
                        );
                    } else {
                        if self.transport_error {
                            warn!(
                                "Giving up on window until:{} after {} retries",
                                fmt_day(self.until),
                                self.retries
                            );
                        }
                        self.retries = 0;
                        self.until = match self.until {
                            Some(previous) if previous <= until => Some(previous_day(previous)),
                            _ => Some(until),
                        };
                        if self.window_collapsed() {
                            info!("No earlier window to search before id:{}", last.id);
                            return Ok(GapResolution::Unresolved);
                        }
                    }
                    self.transport_error = false;
                } else {
                    return Ok(GapResolution::Unresolved);
                }
                self.start_search("Opening");
            }

            // Searching can take a while and may fail.
            before_search()?;

            if let Some(pacing) = self.seek(last.id) {
                return Ok(GapResolution::Resumed { pacing });
            }
            info!("End of twitter feed");
        }
    }

    fn window_collapsed(&self) -> bool {
        match self.until {
            Some(until) => {
                until <= self.settings.epoch_floor || self.since.is_some_and(|since| until <= since)
            }
            None => false,
        }
    }

    fn start_search(&mut self, verb: &str) {
        info!(
            "{verb} twitter feed with until:{}, since:{}",
            fmt_day(self.until),
            fmt_day(self.since)
        );
        let client = self.client;
        let query = self.terms.windowed(self.since, self.until);
        self.current = Item::End;
        self.stream = Some(client.search(&query));
        self.state = FeedState::Open;
        self.searches += 1;
    }

    /// Skip past ids above `last_id`, starting from the record the feed is
    /// already positioned on, if any. Landing exactly on `last_id` means the
    /// feed agrees with what was written, so the following record paces.
    fn seek(&mut self, last_id: u64) -> Option<bool> {
        info!("Searching twitter feed for id:{last_id}");
        let mut item = match std::mem::replace(&mut self.current, Item::End) {
            Item::Record(tweet) => Item::Record(tweet),
            _ => self.pull(),
        };
        while matches!(&item, Item::Record(tweet) if tweet.id > last_id) {
            item = self.pull();
        }
        if let Some(tweet) = item.record() {
            info!("Found id:{}", tweet.id);
        }

        let mut pacing = false;
        if item.record().is_some_and(|tweet| tweet.id == last_id) {
            item = self.pull();
            pacing = item.record().is_some();
            if pacing {
                debug!("Twitter feed now pacing.");
            }
        }

        self.current = item;
        self.current.record().map(|_| pacing)
    }

    fn pull(&mut self) -> Item {
        let Some(stream) = self.stream.as_mut() else {
            return Item::End;
        };
        match stream.next_tweet() {
            Ok(Some(tweet)) => {
                self.last_date = Some(tweet.date);
                Item::Record(tweet)
            }
            Ok(None) => {
                self.stream = None;
                self.state = FeedState::Exhausted;
                Item::End
            }
            Err(err) => {
                warn!("{err}");
                self.transport_error = true;
                self.stream = None;
                self.state = FeedState::Closed;
                Item::End
            }
        }
    }
}

impl OrderedSource for FeedController<'_> {
    fn label(&self) -> &str {
        FEED_LABEL
    }

    fn peek(&self) -> &Item {
        &self.current
    }

    /// Never fails: transport errors end the stream and are retried on the
    /// next gap resolution.
    fn advance(&mut self) -> Result<&Item> {
        self.current = self.pull();
        Ok(&self.current)
    }
}

fn fmt_day(day: Option<NaiveDate>) -> String {
    day.map(|d| d.to_string()).unwrap_or_default()
}
