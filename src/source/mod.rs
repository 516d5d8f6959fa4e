//! Ordered record sources.
//!
//! Every input to the merge, CSV archive or live feed, is read through
//! [`OrderedSource`]: a cursor positioned on one [`Item`] that walks records
//! in strictly descending id order.

use chrono::NaiveDate;
use std::path::Path;

use crate::error::{Error, Result};

pub mod csv_file;

pub use csv_file::CsvSource;

use crate::domain::Tweet;

/// What a source is currently positioned on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Record(Tweet),
    /// A persisted blank row: a previously recorded hole in coverage.
    GapMarker,
    End,
}

impl Item {
    pub fn record(&self) -> Option<&Tweet> {
        match self {
            Item::Record(tweet) => Some(tweet),
            _ => None,
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Item::End)
    }
}

pub trait OrderedSource {
    /// Name used in log lines.
    fn label(&self) -> &str;

    /// The item the source is positioned on. Does not read.
    fn peek(&self) -> &Item;

    /// Move past the current item and return the new one.
    ///
    /// Once [`Item::End`] has been returned every further call returns it again.
    fn advance(&mut self) -> Result<&Item>;
}

/// Calendar-day bracket: `since` is inclusive, `until` exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateWindow {
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
}

impl DateWindow {
    pub fn new(since: Option<NaiveDate>, until: Option<NaiveDate>) -> Self {
        Self { since, until }
    }

    /// True for days at or past `until` (newer than the window).
    pub fn is_after(&self, day: NaiveDate) -> bool {
        self.until.is_some_and(|until| day >= until)
    }

    /// True for days before `since` (older than the window).
    pub fn is_before(&self, day: NaiveDate) -> bool {
        self.since.is_some_and(|since| day < since)
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        !self.is_after(day) && !self.is_before(day)
    }
}

/// Open every input file through `window`, positioned on its first row.
///
/// All files must share the first file's header row; a mismatch is fatal
/// because records could not be written back consistently.
pub fn open_inputs<P: AsRef<Path>>(paths: &[P], window: DateWindow) -> Result<Vec<CsvSource>> {
    let mut sources: Vec<CsvSource> = Vec::with_capacity(paths.len());
    for path in paths {
        let source = CsvSource::open(path.as_ref(), window)?;
        if let Some(first) = sources.first() {
            if first.fieldnames() != source.fieldnames() {
                return Err(Error::FieldMismatch {
                    path: path.as_ref().to_path_buf(),
                    expected: first.fieldnames().to_vec(),
                    found: source.fieldnames().to_vec(),
                });
            }
        }
        sources.push(source);
    }
    Ok(sources)
}
