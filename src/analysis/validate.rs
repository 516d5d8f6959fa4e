//! Consistency checks for a collected archive.
//!
//! Reports, in file order, runs of more than one blank row, ids that fail
//! to decrease and dates that move forward.

use std::fmt;
use std::path::Path;

use chrono::NaiveDateTime;

use crate::error::Result;
use crate::source::{CsvSource, DateWindow, Item, OrderedSource};
use crate::utils::format_timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindingKind {
    MultipleBlankRows,
    NonDecreasingId,
    IncreasingDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub kind: FindingKind,
    /// Last record before the problem; `None` at the top of the file.
    pub after: Option<(u64, NaiveDateTime)>,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            FindingKind::MultipleBlankRows => "Multiple blank rows",
            FindingKind::NonDecreasingId => "Non-decreasing id",
            FindingKind::IncreasingDate => "Increasing date",
        };
        match self.after {
            Some((id, date)) => write!(f, "{what} after id:{id} - {}", format_timestamp(&date)),
            None => write!(f, "{what} after id: - "),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub records: usize,
    pub blank_rows: usize,
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

pub fn validate_file(path: &Path) -> Result<ValidationReport> {
    let mut source = CsvSource::open(path, DateWindow::default())?;
    validate_source(&mut source)
}

pub fn validate_source(source: &mut dyn OrderedSource) -> Result<ValidationReport> {
    let mut report = ValidationReport::default();
    let mut last: Option<(u64, NaiveDateTime)> = None;
    let mut blanks = 0usize;

    let mut item = source.peek().clone();
    loop {
        match item {
            Item::End => break,
            Item::GapMarker => {
                blanks += 1;
                report.blank_rows += 1;
            }
            Item::Record(tweet) => {
                if blanks > 1 {
                    report.findings.push(Finding { kind: FindingKind::MultipleBlankRows, after: last });
                }
                blanks = 0;
                if let Some((last_id, last_date)) = last {
                    if tweet.id >= last_id {
                        report.findings.push(Finding { kind: FindingKind::NonDecreasingId, after: last });
                    }
                    if tweet.date > last_date {
                        report.findings.push(Finding { kind: FindingKind::IncreasingDate, after: last });
                    }
                }
                report.records += 1;
                last = Some((tweet.id, tweet.date));
            }
        }
        item = source.advance()?.clone();
    }
    if blanks > 1 {
        report.findings.push(Finding { kind: FindingKind::MultipleBlankRows, after: last });
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn validate(body: &str) -> ValidationReport {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("archive.csv");
        fs::write(&path, body).expect("write");
        validate_file(&path).expect("validate")
    }

    #[test]
    fn clean_archive_has_no_findings() {
        let report = validate("id,date\n9,2016-05-02T10:00:00\n,\n8,2016-05-02T09:00:00\n,\n");
        assert!(report.is_clean());
        assert_eq!(report.records, 2);
        assert_eq!(report.blank_rows, 2);
    }

    #[test]
    fn reports_each_kind_in_order() {
        let report = validate(
            "id,date\n9,2016-05-02T10:00:00\n,\n,\n8,2016-05-02T09:00:00\n8,2016-05-02T11:00:00\n",
        );
        let kinds: Vec<FindingKind> = report.findings.iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            vec![FindingKind::MultipleBlankRows, FindingKind::NonDecreasingId, FindingKind::IncreasingDate]
        );
        assert_eq!(report.findings[0].to_string(), "Multiple blank rows after id:9 - 2016-05-02T10:00:00");
        assert_eq!(report.findings[1].to_string(), "Non-decreasing id after id:8 - 2016-05-02T09:00:00");
    }

    #[test]
    fn trailing_blank_run_is_reported() {
        let report = validate("id,date\n9,2016-05-02T10:00:00\n,\n,\n,\n");
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].kind, FindingKind::MultipleBlankRows);
    }
}
