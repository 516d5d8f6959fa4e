//! End-to-end merges through the library API: CSV archives on disk, the
//! archive-backed feed, and the CSV writer.

use chrono::NaiveDate;
use similar_asserts::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use tweet_collect::feed::{ArchiveFeed, FeedController, FeedQuery, FeedSettings};
use tweet_collect::merge::{MergeConfig, MergeEngine, MergeSummary};
use tweet_collect::render::TweetWriter;
use tweet_collect::source::{CsvSource, DateWindow, Item, OrderedSource};

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2016, 5, 1).expect("valid date")
}

fn config() -> MergeConfig {
    MergeConfig { since: Some(day()), ..MergeConfig::default() }
}

/// CSV archive whose rows are `ids`, `None` standing for a gap marker.
fn archive(dir: &TempDir, name: &str, ids: &[Option<u64>]) -> PathBuf {
    let mut body = String::from("user,date,text,id\n");
    for id in ids {
        match id {
            Some(id) => body.push_str(&format!("alice,2016-05-01T10:{id:02}:00,rust {id},{id}\n")),
            None => body.push_str(",,,\n"),
        }
    }
    let path = dir.path().join(name);
    fs::write(&path, body).expect("write archive");
    path
}

fn open(paths: &[&Path], config: MergeConfig) -> Vec<Box<dyn OrderedSource>> {
    paths
        .iter()
        .map(|path| {
            let source = CsvSource::open(path, DateWindow::new(config.since, config.until)).expect("open archive");
            Box::new(source) as Box<dyn OrderedSource>
        })
        .collect()
}

fn fieldnames() -> Vec<String> {
    ["user", "date", "text", "id"].iter().map(|s| s.to_string()).collect()
}

fn query() -> FeedQuery {
    FeedQuery { query: Some("rust".to_string()), ..FeedQuery::default() }
}

/// Merge `paths`, with `feed` behind the feed lane when given.
fn merge(paths: &[&Path], feed: Option<&ArchiveFeed>, config: MergeConfig) -> (Vec<Item>, MergeSummary) {
    let controller = feed.map(|feed| FeedController::new(feed, query(), FeedSettings::default()));
    let mut engine = MergeEngine::open(config, open(paths, config), controller).expect("open merge");
    let mut out: Vec<Item> = Vec::new();
    let summary = engine.run(&mut out).expect("merge");
    (out, summary)
}

fn ids(items: &[Item]) -> Vec<Option<u64>> {
    items.iter().map(|item| item.record().map(|t| t.id)).collect()
}

#[test]
fn two_archives_fill_each_others_holes() {
    let tmp = TempDir::new().expect("tmp");
    let a = archive(&tmp, "a.csv", &[Some(50), Some(48), Some(47)]);
    let b = archive(&tmp, "b.csv", &[Some(50), Some(49), Some(47)]);

    let (out, summary) = merge(&[&a, &b], None, config());

    assert_eq!(ids(&out), vec![Some(50), Some(49), Some(48), Some(47), None]);
    assert_eq!(summary.written, 4);
    assert_eq!(summary.gaps.len(), 1);
    assert_eq!(summary.gaps[0].after.id, 47);
    assert_eq!(summary.gaps[0].before, None);
}

#[test]
fn two_archives_and_a_feed_leave_no_hole_between_records() {
    let tmp = TempDir::new().expect("tmp");
    let a = archive(&tmp, "a.csv", &[Some(50), Some(48), Some(47)]);
    let b = archive(&tmp, "b.csv", &[Some(50), Some(49), Some(47)]);
    let feed_rows = archive(&tmp, "feed.csv", &[Some(49), Some(48)]);
    let feed = ArchiveFeed::load(&feed_rows).expect("load feed");

    let (out, summary) = merge(&[&a, &b], Some(&feed), config());

    assert_eq!(ids(&out), vec![Some(50), Some(49), Some(48), Some(47), None]);
    assert_eq!(summary.gaps.len(), 1);
    assert_eq!(summary.gaps[0].after.id, 47);
    assert_eq!(summary.gaps[0].before, None);
}

#[test]
fn contiguous_archive_is_trusted_between_its_rows() {
    // Without a blank row or a disagreeing source, 50 then 47 reads as contiguous.
    let tmp = TempDir::new().expect("tmp");
    let a = archive(&tmp, "a.csv", &[Some(50), Some(47)]);
    let feed = ArchiveFeed::new(Vec::new());

    let (out, summary) = merge(&[&a], Some(&feed), config());

    assert_eq!(ids(&out), vec![Some(50), Some(47), None]);
    assert_eq!(summary.gaps.len(), 1);
    assert_eq!(summary.gaps[0].to_string(), "Possible missing tweets after id: 47 - 2016-05-01T10:47:00");
}

#[test]
fn unfilled_gap_marker_survives_the_merge() {
    let tmp = TempDir::new().expect("tmp");
    let a = archive(&tmp, "a.csv", &[Some(50), None, Some(47)]);
    let feed = ArchiveFeed::new(Vec::new());

    let (out, summary) = merge(&[&a], Some(&feed), config());

    assert_eq!(ids(&out), vec![Some(50), None, Some(47), None]);
    assert_eq!(summary.gaps[0].after.id, 50);
    assert_eq!(summary.gaps[0].before.map(|b| b.id), Some(47));
    assert_eq!(
        summary.gaps[0].to_string(),
        "Possible missing tweets between id: 50 - 2016-05-01T10:50:00 and 47 - 2016-05-01T10:47:00"
    );
    assert!(summary.feed_searches > 0);
}

#[test]
fn feed_covering_the_archive_adds_nothing() {
    let tmp = TempDir::new().expect("tmp");
    let rows: Vec<Option<u64>> = (45..=50).rev().map(Some).collect();
    let a = archive(&tmp, "a.csv", &rows);
    let feed = ArchiveFeed::load(&a).expect("load feed");

    let (out, _) = merge(&[&a], Some(&feed), config());

    let records: Vec<Option<u64>> = ids(&out).into_iter().filter(Option::is_some).collect();
    assert_eq!(records, rows);
    assert_eq!(out.last(), Some(&Item::GapMarker));
    assert_eq!(out.iter().filter(|item| matches!(item, Item::GapMarker)).count(), 1);
}

#[test]
fn merging_twice_gives_the_same_output() {
    let tmp = TempDir::new().expect("tmp");
    let a = archive(&tmp, "a.csv", &[Some(50), Some(48), None, Some(40)]);
    let b = archive(&tmp, "b.csv", &[Some(49), Some(48), Some(41)]);

    let (first, _) = merge(&[&a, &b], None, config());
    let (second, _) = merge(&[&a, &b], None, config());

    assert_eq!(first, second);
}

#[test]
fn written_gap_markers_are_read_back_in_place() {
    let tmp = TempDir::new().expect("tmp");
    let a = archive(&tmp, "a.csv", &[Some(50), None, Some(47)]);
    let feed = ArchiveFeed::new(Vec::new());
    let out_path = tmp.path().join("out.csv");

    let controller = FeedController::new(&feed, query(), FeedSettings::default());
    let mut engine = MergeEngine::open(config(), open(&[&a], config()), Some(controller)).expect("open merge");
    let mut writer = TweetWriter::create(Some(&out_path), None, fieldnames()).expect("create writer");
    engine.run(&mut writer).expect("merge");
    writer.finish().expect("finish");

    let (rerun, summary) = merge(&[&out_path], None, config());

    assert_eq!(ids(&rerun), vec![Some(50), None, Some(47), None]);
    assert_eq!(summary.gaps.len(), 2);
}

#[test]
fn shared_records_are_written_once_across_all_sources() {
    let tmp = TempDir::new().expect("tmp");
    let rows = [Some(50), Some(49), Some(48)];
    let a = archive(&tmp, "a.csv", &rows);
    let b = archive(&tmp, "b.csv", &rows);
    let feed = ArchiveFeed::load(&a).expect("load feed");
    let config = MergeConfig { force: true, ..config() };

    let (out, summary) = merge(&[&a, &b], Some(&feed), config);

    assert_eq!(ids(&out), vec![Some(50), Some(49), Some(48), None]);
    assert_eq!(summary.written, 3);
}

#[test]
fn limit_stops_the_merge_early() {
    let tmp = TempDir::new().expect("tmp");
    let a = archive(&tmp, "a.csv", &[Some(50), Some(49), Some(48)]);
    let config = MergeConfig { limit: Some(2), ..config() };

    let (out, summary) = merge(&[&a], None, config);

    assert_eq!(ids(&out), vec![Some(50), Some(49)]);
    assert!(summary.stopped_at_limit);
    assert!(summary.gaps.is_empty());
}
