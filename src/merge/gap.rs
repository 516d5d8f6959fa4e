//! Gap reporting.

use chrono::NaiveDateTime;
use std::fmt;
use tracing::warn;

use crate::domain::Tweet;
use crate::utils::format_timestamp;

/// One end of a suspected hole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub id: u64,
    pub date: NaiveDateTime,
}

impl From<&Tweet> for Boundary {
    fn from(tweet: &Tweet) -> Self {
        Self { id: tweet.id, date: tweet.date }
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.id, format_timestamp(&self.date))
    }
}

/// A gap marker written to the output, with the records around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapNotice {
    pub after: Boundary,
    /// `None` when the run ended at the gap.
    pub before: Option<Boundary>,
}

impl fmt::Display for GapNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.before {
            Some(before) => {
                write!(f, "Possible missing tweets between id: {} and {}", self.after, before)
            }
            None => write!(f, "Possible missing tweets after id: {}", self.after),
        }
    }
}

/// Describe and log the hole between `last`, the record just written, and
/// `next`, the record about to be written.
pub fn report(last: &Tweet, next: Option<&Tweet>) -> GapNotice {
    let notice = GapNotice { after: last.into(), before: next.map(Boundary::from) };
    warn!("{notice}");
    notice
}
