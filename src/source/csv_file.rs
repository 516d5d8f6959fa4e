//! CSV archive source.
//!
//! Layout: optional leading `#` comment lines (kept verbatim), a header row,
//! then rows in descending id order. A row with an empty `id` field is a gap
//! marker left by an earlier run.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use csv::StringRecord;

use super::{DateWindow, Item, OrderedSource};
use crate::domain::Tweet;
use crate::error::{Error, Result};
use crate::utils::parse_timestamp;

pub struct CsvSource {
    label: String,
    path: PathBuf,
    comments: String,
    fieldnames: Vec<String>,
    id_col: usize,
    date_col: usize,
    reader: csv::Reader<BufReader<File>>,
    window: DateWindow,
    record: StringRecord,
    current: Item,
}

impl CsvSource {
    /// Open `path` and position on the first row inside `window`.
    pub fn open(path: &Path, window: DateWindow) -> Result<Self> {
        let file = File::open(path)?;
        let mut buffered = BufReader::new(file);
        let comments = read_comment_block(&mut buffered)?;

        let mut reader =
            csv::ReaderBuilder::new().flexible(true).has_headers(true).from_reader(buffered);
        let fieldnames: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let id_col = column(&fieldnames, "id")
            .ok_or(Error::MissingColumn { path: path.to_path_buf(), column: "id" })?;
        let date_col = column(&fieldnames, "date")
            .ok_or(Error::MissingColumn { path: path.to_path_buf(), column: "date" })?;

        let mut source = Self {
            label: path.display().to_string(),
            path: path.to_path_buf(),
            comments,
            fieldnames,
            id_col,
            date_col,
            reader,
            window,
            record: StringRecord::new(),
            current: Item::End,
        };
        source.current = source.read_item()?;
        Ok(source)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The leading `#` lines, newline-terminated.
    pub fn comments(&self) -> &str {
        &self.comments
    }

    pub fn fieldnames(&self) -> &[String] {
        &self.fieldnames
    }

    fn read_item(&mut self) -> Result<Item> {
        loop {
            if !self.reader.read_record(&mut self.record)? {
                return Ok(Item::End);
            }
            let line = self.record.position().map(|p| p.line()).unwrap_or(0);

            let id_field = self.record.get(self.id_col).unwrap_or("").trim();
            if id_field.is_empty() {
                return Ok(Item::GapMarker);
            }
            let id: u64 = id_field.parse().map_err(|_| Error::InvalidRecord {
                source_label: self.label.clone(),
                line,
                reason: format!("invalid id '{id_field}'"),
            })?;

            let date_field = self.record.get(self.date_col).unwrap_or("");
            let date = parse_timestamp(date_field).ok_or_else(|| Error::InvalidRecord {
                source_label: self.label.clone(),
                line,
                reason: format!("invalid date '{date_field}'"),
            })?;

            if self.window.is_after(date.date()) {
                continue;
            }
            if self.window.is_before(date.date()) {
                return Ok(Item::End);
            }

            let fields = self
                .fieldnames
                .iter()
                .zip(self.record.iter())
                .map(|(name, value)| (name.clone(), value.to_string()))
                .collect();
            return Ok(Item::Record(Tweet { id, date, fields }));
        }
    }
}

impl OrderedSource for CsvSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn peek(&self) -> &Item {
        &self.current
    }

    fn advance(&mut self) -> Result<&Item> {
        if !self.current.is_end() {
            self.current = self.read_item()?;
        }
        Ok(&self.current)
    }
}

fn column(fieldnames: &[String], name: &str) -> Option<usize> {
    fieldnames.iter().position(|f| f == name)
}

/// Consume leading lines starting with `#`.
fn read_comment_block<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut comments = String::new();
    loop {
        let starts_with_hash = reader.fill_buf()?.first() == Some(&b'#');
        if !starts_with_hash {
            break;
        }
        let mut line = String::new();
        reader.read_line(&mut line)?;
        if !line.ends_with('\n') {
            line.push('\n');
        }
        comments.push_str(&line);
    }
    Ok(comments)
}
