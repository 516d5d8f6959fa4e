//! CSV output of the merged stream.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use csv::QuoteStyle;

use crate::domain::Tweet;
use crate::error::Result;
use crate::merge::RecordSink;

/// Writes records under a fixed header, optionally preceded by a comment
/// block. An existing output file is only replaced once the run finishes.
pub struct TweetWriter {
    writer: csv::Writer<Box<dyn Write>>,
    fieldnames: Vec<String>,
    target: Option<PathBuf>,
    part: Option<PathBuf>,
    count: usize,
}

impl TweetWriter {
    /// Start writing to `outfile`, or stdout when `None`.
    pub fn create(outfile: Option<&Path>, comments: Option<&str>, fieldnames: Vec<String>) -> Result<Self> {
        let (mut sink, target, part) = match outfile {
            Some(path) if path.exists() => {
                let part = part_path(path);
                let file = File::create(&part)?;
                (boxed(BufWriter::new(file)), Some(path.to_path_buf()), Some(part))
            }
            Some(path) => {
                let file = File::create(path)?;
                (boxed(BufWriter::new(file)), Some(path.to_path_buf()), None)
            }
            None => (boxed(io::stdout()), None, None),
        };

        if let Some(comments) = comments {
            sink.write_all(comments.as_bytes())?;
        }

        let mut writer = csv::WriterBuilder::new().quote_style(QuoteStyle::NonNumeric).from_writer(sink);
        writer.write_record(&fieldnames)?;
        Ok(Self { writer, fieldnames, target, part, count: 0 })
    }

    /// Records written so far, gap markers excluded.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Where output is currently going; the `.part` file during an in-place
    /// update.
    pub fn writing_to(&self) -> Option<&Path> {
        self.part.as_deref().or(self.target.as_deref())
    }

    /// Flush and, for an in-place update, move the `.part` file over the
    /// original.
    pub fn finish(self) -> Result<()> {
        let Self { writer, target, part, .. } = self;
        let inner = writer.into_inner().map_err(|e| e.into_error())?;
        drop(inner);
        if let (Some(part), Some(target)) = (part, target) {
            fs::rename(part, target)?;
        }
        Ok(())
    }
}

impl RecordSink for TweetWriter {
    fn write_tweet(&mut self, tweet: &Tweet) -> Result<()> {
        self.writer.write_record(tweet.to_row(&self.fieldnames))?;
        self.count += 1;
        Ok(())
    }

    fn write_gap(&mut self) -> Result<()> {
        self.writer.write_record(self.fieldnames.iter().map(|_| ""))?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn boxed<W: Write + 'static>(writer: W) -> Box<dyn Write> {
    Box::new(writer)
}

/// `<path>.part`, next to the file it will replace.
pub fn part_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{CsvSource, DateWindow, Item, OrderedSource};
    use crate::utils::parse_timestamp;
    use tempfile::TempDir;

    fn fieldnames() -> Vec<String> {
        vec!["user".into(), "date".into(), "text".into(), "id".into()]
    }

    fn tweet(id: u64, text: &str) -> Tweet {
        Tweet::new(id, parse_timestamp("2016-05-01T10:00:00").expect("date"))
            .with_field("user", "alice")
            .with_field("text", text)
    }

    #[test]
    fn writes_comments_header_rows_and_gap() {
        let tmp = TempDir::new().expect("tmp");
        let out = tmp.path().join("out.csv");
        let mut writer = TweetWriter::create(Some(&out), Some("# hello\n"), fieldnames()).expect("create");
        writer.write_tweet(&tweet(9, "hi, there")).expect("write");
        writer.write_gap().expect("gap");
        writer.finish().expect("finish");

        let content = fs::read_to_string(&out).expect("read");
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "# hello");
        assert_eq!(lines[1], "\"user\",\"date\",\"text\",\"id\"");
        assert_eq!(lines[2], "\"alice\",\"2016-05-01T10:00:00\",\"hi, there\",9");
        assert_eq!(lines[3], "\"\",\"\",\"\",\"\"");
    }

    #[test]
    fn gap_rows_read_back_as_markers() {
        let tmp = TempDir::new().expect("tmp");
        let out = tmp.path().join("out.csv");
        let mut writer = TweetWriter::create(Some(&out), None, fieldnames()).expect("create");
        writer.write_tweet(&tweet(9, "a")).expect("write");
        writer.write_gap().expect("gap");
        writer.write_tweet(&tweet(7, "b")).expect("write");
        writer.finish().expect("finish");

        let mut source = CsvSource::open(&out, DateWindow::default()).expect("open");
        assert_eq!(source.peek().record().map(|t| t.id), Some(9));
        assert_eq!(source.advance().expect("advance"), &Item::GapMarker);
        let third = source.advance().expect("advance").record().cloned().expect("record");
        assert_eq!(third.id, 7);
        assert_eq!(third.field("text"), "b");
    }

    #[test]
    fn existing_output_is_replaced_only_on_finish() {
        let tmp = TempDir::new().expect("tmp");
        let out = tmp.path().join("out.csv");
        fs::write(&out, "old\n").expect("seed");

        let mut writer = TweetWriter::create(Some(&out), None, fieldnames()).expect("create");
        assert_eq!(writer.writing_to(), Some(part_path(&out).as_path()));
        writer.write_tweet(&tweet(1, "new")).expect("write");
        writer.flush().expect("flush");
        assert_eq!(fs::read_to_string(&out).expect("read"), "old\n");
        assert_eq!(writer.count(), 1);

        writer.finish().expect("finish");
        assert!(!part_path(&out).exists());
        assert!(fs::read_to_string(&out).expect("read").contains("\"new\""));
    }
}
