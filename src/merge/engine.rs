//! The merge loop.
//!
//! Each source occupies a lane. The lane holding the highest pending id is
//! the head; its record is written next and every lane sitting on the same
//! id advances with it. A lane is *pacing* while it agrees with the head.
//! When, after a write, no lane is pacing, coverage may have a hole: the
//! feed is asked to bridge it and, failing that, a gap marker is written.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::gap::{self, GapNotice};
use super::sink::RecordSink;
use crate::domain::Tweet;
use crate::error::Result;
use crate::feed::{FeedController, GapResolution};
use crate::source::{Item, OrderedSource};

/// Run parameters for one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeConfig {
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
    /// Query the feed over the whole window even where files cover it.
    pub force: bool,
    /// Stop after this many records, without a trailing gap marker.
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub written: usize,
    pub gaps: Vec<GapNotice>,
    pub feed_searches: usize,
    pub stopped_at_limit: bool,
}

#[derive(Debug)]
struct Lane {
    label: String,
    /// The source can still be read.
    open: bool,
    /// `None` while open means the source stopped at a gap marker.
    current: Option<Tweet>,
    pacing: bool,
    rows: usize,
}

impl Lane {
    fn id(&self) -> Option<u64> {
        self.current.as_ref().map(|t| t.id)
    }
}

pub struct MergeEngine<'a> {
    config: MergeConfig,
    files: Vec<Box<dyn OrderedSource + 'a>>,
    feed: Option<FeedController<'a>>,
    /// File lanes in input order, then the feed lane.
    lanes: Vec<Lane>,
    head: Option<usize>,
}

impl<'a> MergeEngine<'a> {
    /// Position every source on its first record and decide whether the
    /// feed is needed from the start.
    pub fn open(
        config: MergeConfig,
        files: Vec<Box<dyn OrderedSource + 'a>>,
        feed: Option<FeedController<'a>>,
    ) -> Result<Self> {
        let mut engine = Self { config, files, feed, lanes: Vec::new(), head: None };
        for idx in 0..engine.files.len() {
            let lane = engine.prime_file(idx)?;
            engine.lanes.push(lane);
        }
        engine.head = engine.find_head();

        if let Some(label) = engine.feed.as_ref().map(|feed| feed.label().to_string()) {
            engine.lanes.push(Lane { label, open: false, current: None, pacing: false, rows: 0 });
            engine.start_feed();
        }

        let head_id = engine.head_tweet().map(|t| t.id);
        for lane in &mut engine.lanes {
            lane.pacing = head_id.is_some() && lane.id() == head_id;
            if lane.pacing {
                debug!("{} is pacing", lane.label);
            }
        }
        Ok(engine)
    }

    /// True when at least one source has a record to write.
    pub fn has_records(&self) -> bool {
        self.head.is_some()
    }

    pub fn feed(&self) -> Option<&FeedController<'a>> {
        self.feed.as_ref()
    }

    /// Drive the merge to completion, writing into `sink`.
    pub fn run(&mut self, sink: &mut dyn RecordSink) -> Result<MergeSummary> {
        let mut summary = MergeSummary::default();
        if self.head.is_none() {
            info!("Nothing to do.");
            return Ok(summary);
        }

        while let Some(head_idx) = self.head {
            let Some(last) = self.lanes[head_idx].current.clone() else {
                break;
            };
            sink.write_tweet(&last)?;
            summary.written += 1;
            self.lanes[head_idx].rows += 1;
            if self.config.limit.is_some_and(|limit| summary.written >= limit) {
                summary.stopped_at_limit = true;
                break;
            }

            self.consume(&last, sink)?;
            let head = self.find_head();
            self.head = self.refill(head, &last)?;
            debug!("Head input is {}", self.head.map_or("empty", |idx| self.lanes[idx].label.as_str()));

            self.park_feed_if_paced();

            if !self.any_pacing() {
                self.bridge_gap(&last, sink)?;
            }
            if !self.any_pacing() {
                sink.write_gap()?;
                summary.gaps.push(gap::report(&last, self.head_tweet()));
                if self.head.is_none() {
                    break;
                }
            }
        }

        summary.feed_searches = self.feed.as_ref().map_or(0, |feed| feed.searches());
        Ok(summary)
    }

    fn prime_file(&mut self, idx: usize) -> Result<Lane> {
        let source = &mut self.files[idx];
        let label = source.label().to_string();
        let mut item = source.peek().clone();
        while matches!(item, Item::GapMarker) {
            // Nothing has been written yet, so there is nothing to bracket.
            info!("{label} starts with a gap marker, skipping it");
            item = source.advance()?.clone();
        }
        let current = match item {
            Item::Record(tweet) => {
                debug!("Read id: {} from {label}", tweet.id);
                Some(tweet)
            }
            _ => {
                info!("{label} has no records");
                None
            }
        };
        Ok(Lane { label, open: current.is_some(), current, pacing: false, rows: 0 })
    }

    /// Open the feed unless the files already reach `until`.
    fn start_feed(&mut self) {
        let head_day = self.head_tweet().map(Tweet::day);
        let head_id = self.head_tweet().map(|t| t.id);
        let needed = self.config.force
            || self.config.until.is_none()
            || head_day.is_none()
            || self.config.until > head_day;
        if !needed {
            debug!("Input files reach the upper bound, feed deferred");
            return;
        }

        let mut since = self.config.since;
        if !self.config.force {
            since = since.max(head_day);
        }
        let until = self.config.until;
        let Some(feed_idx) = self.feed_index() else {
            return;
        };
        let Some(feed) = self.feed.as_mut() else {
            return;
        };
        let Some(first) = feed.open(since, until).cloned() else {
            return;
        };

        if head_id.map_or(true, |id| first.id > id) {
            self.head = Some(feed_idx);
            debug!("Head input is {}", self.lanes[feed_idx].label);
        }
        let lane = &mut self.lanes[feed_idx];
        lane.current = Some(first);
        lane.open = true;
    }

    /// Advance every lane sitting on the record just written. Output is
    /// flushed before the feed lane is read, as that may fetch a page.
    fn consume(&mut self, last: &Tweet, sink: &mut dyn RecordSink) -> Result<()> {
        let feed_idx = self.feed_index();
        for idx in 0..self.lanes.len() {
            if self.lanes[idx].id() != Some(last.id) {
                continue;
            }
            if Some(idx) == feed_idx {
                sink.flush()?;
            }
            match self.read_next(idx, last)? {
                Item::Record(tweet) => self.lanes[idx].current = Some(tweet),
                Item::GapMarker => {
                    let lane = &mut self.lanes[idx];
                    lane.current = None;
                    lane.pacing = false;
                    info!("{} has gap after id:{} - {}", lane.label, last.id, last.field("date"));
                }
                Item::End => self.close_lane(idx),
            }
        }
        Ok(())
    }

    /// Read past the gap markers of lanes that stopped at one, and update
    /// pacing against `head`. Returns the head after refilling.
    fn refill(&mut self, head: Option<usize>, last: &Tweet) -> Result<Option<usize>> {
        let head_id = head.and_then(|idx| self.lanes[idx].id());
        let mut next_head = head;

        for idx in 0..self.lanes.len() {
            if self.lanes[idx].open && self.lanes[idx].current.is_none() {
                self.lanes[idx].pacing = false;
                loop {
                    match self.read_next(idx, last)? {
                        Item::Record(tweet) => {
                            let best = next_head.and_then(|i| self.lanes[i].id());
                            if best.map_or(true, |id| tweet.id > id) {
                                next_head = Some(idx);
                            }
                            self.lanes[idx].current = Some(tweet);
                            break;
                        }
                        Item::GapMarker => {
                            debug!("{} has consecutive gap markers", self.lanes[idx].label);
                        }
                        Item::End => {
                            self.close_lane(idx);
                            break;
                        }
                    }
                }
            }

            let lane = &mut self.lanes[idx];
            let (Some(id), Some(expected)) = (lane.id(), head_id) else {
                continue;
            };
            if lane.pacing && id != expected {
                warn!("Missing tweet, id: {expected} in file: {}", lane.label);
                lane.pacing = false;
            } else if !lane.pacing && id == expected {
                debug!("{} now pacing.", lane.label);
                lane.pacing = true;
            }
        }
        Ok(next_head)
    }

    /// Next item of lane `idx`, dropping records that would break the
    /// descending order of what has been written.
    fn read_next(&mut self, idx: usize, last: &Tweet) -> Result<Item> {
        loop {
            let item = match self.source_mut(idx) {
                Some(source) => source.advance()?.clone(),
                None => Item::End,
            };
            let lane = &mut self.lanes[idx];
            match &item {
                Item::Record(tweet) if tweet.id >= last.id => {
                    warn!("{}: skipping out-of-order id {} after id {}", lane.label, tweet.id, last.id);
                    lane.pacing = false;
                    continue;
                }
                Item::Record(tweet) => {
                    if tweet.date > last.date {
                        warn!("{}: date increases after id {}", lane.label, last.id);
                    }
                    debug!("Read id: {} from {}", tweet.id, lane.label);
                }
                Item::GapMarker => {}
                Item::End => debug!("End of {}", lane.label),
            }
            return Ok(item);
        }
    }

    /// Stop reading the feed once a file tracks the head: the files are
    /// trusted to cover the range and the feed can be resumed later.
    fn park_feed_if_paced(&mut self) {
        if self.config.force {
            return;
        }
        let Some(feed_idx) = self.feed_index() else {
            return;
        };
        let files_pacing = self.lanes[..feed_idx].iter().any(|lane| lane.pacing);
        if !self.lanes[feed_idx].open || !files_pacing {
            return;
        }

        self.close_lane(feed_idx);
        if let Some(feed) = self.feed.as_mut() {
            feed.park();
        }
        if self.head == Some(feed_idx) {
            self.head = self.find_head();
        }
    }

    fn bridge_gap(&mut self, last: &Tweet, sink: &mut dyn RecordSink) -> Result<()> {
        let Some(feed_idx) = self.feed_index() else {
            return Ok(());
        };
        let head_id = self.head_tweet().map(|t| t.id);
        let mut since = self.config.since;
        if !self.config.force {
            since = since.max(self.head_tweet().map(Tweet::day));
        }
        let force = self.config.force;

        let Some(feed) = self.feed.as_mut() else {
            return Ok(());
        };
        let outcome = feed.resolve_gap(since, last, force, &mut || sink.flush())?;
        let current = feed.peek().record().cloned();

        match (outcome, current) {
            (GapResolution::Resumed { pacing }, Some(tweet)) => {
                if head_id.map_or(true, |id| tweet.id > id) {
                    self.head = Some(feed_idx);
                    debug!("Head input is {}", self.lanes[feed_idx].label);
                }
                let lane = &mut self.lanes[feed_idx];
                lane.current = Some(tweet);
                lane.open = true;
                lane.pacing = pacing;
            }
            _ => {
                if self.lanes[feed_idx].open {
                    self.close_lane(feed_idx);
                }
                if self.head == Some(feed_idx) {
                    self.head = self.find_head();
                }
            }
        }
        Ok(())
    }

    fn close_lane(&mut self, idx: usize) {
        let lane = &mut self.lanes[idx];
        info!("Closing {} after {} rows.", lane.label, lane.rows);
        lane.rows = 0;
        lane.pacing = false;
        lane.open = false;
        lane.current = None;
    }

    /// Highest pending id; ties go to a pacing lane, then the earlier lane.
    fn find_head(&self) -> Option<usize> {
        let mut head: Option<(usize, u64)> = None;
        for (idx, lane) in self.lanes.iter().enumerate() {
            let Some(id) = lane.id() else { continue };
            let better = match head {
                None => true,
                Some((best_idx, best)) => {
                    id > best || (id == best && lane.pacing && !self.lanes[best_idx].pacing)
                }
            };
            if better {
                head = Some((idx, id));
            }
        }
        head.map(|(idx, _)| idx)
    }

    fn head_tweet(&self) -> Option<&Tweet> {
        self.head.and_then(|idx| self.lanes[idx].current.as_ref())
    }

    fn any_pacing(&self) -> bool {
        self.lanes.iter().any(|lane| lane.pacing)
    }

    fn feed_index(&self) -> Option<usize> {
        self.feed.as_ref().map(|_| self.files.len())
    }

    fn source_mut(&mut self, idx: usize) -> Option<&mut (dyn OrderedSource + 'a)> {
        if idx < self.files.len() {
            Some(self.files[idx].as_mut())
        } else {
            self.feed.as_mut().map(|feed| feed as &mut (dyn OrderedSource + 'a))
        }
    }
}
