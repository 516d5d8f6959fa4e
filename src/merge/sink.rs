//! Where merged records go.

use crate::domain::Tweet;
use crate::error::Result;
use crate::source::Item;

pub trait RecordSink {
    fn write_tweet(&mut self, tweet: &Tweet) -> Result<()>;

    /// Persist a blank row marking a hole in coverage.
    fn write_gap(&mut self) -> Result<()>;

    /// Make everything written so far durable. Called before each feed
    /// request.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Collects the merged stream in memory.
impl RecordSink for Vec<Item> {
    fn write_tweet(&mut self, tweet: &Tweet) -> Result<()> {
        self.push(Item::Record(tweet.clone()));
        Ok(())
    }

    fn write_gap(&mut self) -> Result<()> {
        self.push(Item::GapMarker);
        Ok(())
    }
}
