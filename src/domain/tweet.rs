//! The tweet record that flows through every source and sink.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;

use crate::utils::format_timestamp;

/// Column order used when no input file dictates one.
pub const DEFAULT_FIELDNAMES: &[&str] = &[
    "user",
    "date",
    "text",
    "replies",
    "retweets",
    "favorites",
    "reply-to",
    "reply-to-user",
    "reply-to-user-id",
    "quote",
    "lang",
    "geo",
    "mentions",
    "hashtags",
    "user-id",
    "id",
];

pub fn default_fieldnames() -> Vec<String> {
    DEFAULT_FIELDNAMES.iter().map(|s| s.to_string()).collect()
}

/// One normalised tweet.
///
/// `id` and `date` are parsed copies of the `id`/`date` columns; every other
/// column is opaque payload carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tweet {
    pub id: u64,
    pub date: NaiveDateTime,
    pub fields: BTreeMap<String, String>,
}

impl Tweet {
    pub fn new(id: u64, date: NaiveDateTime) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert("id".to_string(), id.to_string());
        fields.insert("date".to_string(), format_timestamp(&date));
        Self { id, date, fields }
    }

    /// Builder-style setter for a payload column.
    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn day(&self) -> NaiveDate {
        self.date.date()
    }

    /// Values in `fieldnames` order, blank for absent columns.
    pub fn to_row<'a>(&'a self, fieldnames: &[String]) -> Vec<&'a str> {
        fieldnames.iter().map(|name| self.field(name)).collect()
    }
}
