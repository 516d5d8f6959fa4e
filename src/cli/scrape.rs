//! Scrape command implementation

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

use crate::config::{load_config, merge_cli_with_config, CliOverrides};
use crate::domain::default_fieldnames;
use crate::feed::{ArchiveFeed, FeedClient, FeedController, SearchClient};
use crate::merge::MergeEngine;
use crate::render::{Provenance, TweetWriter};
use crate::source::{open_inputs, DateWindow, OrderedSource};

#[derive(Args)]
pub struct ScrapeArgs {
    /// Input CSV archives to merge
    #[arg(value_name = "INFILE")]
    pub infiles: Vec<PathBuf>,

    /// Twitter username to match
    #[arg(short, long, value_name = "USER")]
    pub user: Option<String>,

    /// Search string for the feed; the feed is only used with USER or QUERY
    #[arg(short, long, value_name = "QUERY")]
    pub query: Option<String>,

    /// Language filter for the feed
    #[arg(short, long, value_name = "LANG")]
    pub language: Option<String>,

    /// Query the feed over periods the input files already cover
    #[arg(short, long)]
    pub force: bool,

    /// Timeout for each feed request, in seconds
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Lower bound date (inclusive)
    #[arg(long, value_name = "DATE")]
    pub since: Option<String>,

    /// Upper bound date (exclusive)
    #[arg(long, value_name = "DATE")]
    pub until: Option<String>,

    /// Output file, otherwise stdout; an existing file is merged and replaced
    #[arg(short, long, value_name = "FILE")]
    pub outfile: Option<PathBuf>,

    /// Maximum number of records to output
    #[arg(short = 'n', long, value_name = "N")]
    pub number: Option<usize>,

    /// Do not write the provenance comment block
    #[arg(long)]
    pub no_comments: bool,

    /// Path to config file (tweet-collect.toml or .tweet-collect.yml)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Serve the feed from this CSV archive instead of the network
    #[arg(long, value_name = "CSV")]
    pub archive: Option<PathBuf>,
}

pub fn run(args: ScrapeArgs) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed reading current directory")?;
    let file_config = load_config(&cwd, args.config.as_deref())?;

    let cli_overrides = CliOverrides {
        user: args.user.clone(),
        query: args.query.clone(),
        language: args.language.clone(),
        since: args.since.clone(),
        until: args.until.clone(),
        force: args.force,
        timeout_secs: args.timeout,
        number: args.number,
        no_comments: args.no_comments,
    };
    let settings = merge_cli_with_config(file_config, cli_overrides)?;

    // An existing output file is one more input; output goes to `.part`.
    let mut infiles = args.infiles.clone();
    if let Some(outfile) = args.outfile.as_ref().filter(|p| p.is_file()) {
        infiles.push(outfile.clone());
    }

    let window = DateWindow::new(settings.merge.since, settings.merge.until);
    let sources = open_inputs(&infiles, window).context("Failed opening input files")?;
    let fieldnames =
        sources.first().map(|s| s.fieldnames().to_vec()).unwrap_or_else(default_fieldnames);

    let comments = settings.comments.then(|| {
        let inherited: Vec<&str> = sources.iter().map(|s| s.comments()).collect();
        Provenance {
            infiles: infiles.clone(),
            outfile: args.outfile.clone(),
            user: settings.query.user.clone(),
            language: settings.query.language.clone(),
            query: settings.query.query.clone(),
            since: settings.merge.since.map(|d| d.to_string()),
            until: settings.merge.until.map(|d| d.to_string()),
            force: settings.merge.force,
            number: settings.merge.limit,
        }
        .render(&inherited)
    });

    let client: Option<Box<dyn FeedClient>> = match &args.archive {
        _ if !settings.query.is_searchable() => None,
        Some(archive) => {
            let feed = ArchiveFeed::load(archive)
                .with_context(|| format!("Failed loading archive feed: {}", archive.display()))?;
            info!("Serving feed from {} ({} records)", archive.display(), feed.len());
            Some(Box::new(feed))
        }
        None => Some(Box::new(SearchClient::new(&settings.config)?)),
    };
    let feed = client
        .as_deref()
        .map(|client| FeedController::new(client, settings.query.clone(), settings.feed));

    let files: Vec<Box<dyn OrderedSource>> =
        sources.into_iter().map(|s| Box::new(s) as Box<dyn OrderedSource>).collect();
    let mut engine = MergeEngine::open(settings.merge, files, feed)?;
    if !engine.has_records() {
        info!("Nothing to do.");
        return Ok(());
    }

    let mut writer = TweetWriter::create(args.outfile.as_deref(), comments.as_deref(), fieldnames)
        .context("Failed creating output")?;
    let summary = engine.run(&mut writer)?;
    writer.finish().context("Failed finishing output")?;

    info!(
        "Wrote {} records with {} gap markers ({} feed searches)",
        summary.written,
        summary.gaps.len(),
        summary.feed_searches
    );
    Ok(())
}
