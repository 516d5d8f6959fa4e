//! tweet-collect: scrape tweets and merge them with existing CSV archives

use anyhow::Result;

fn main() -> Result<()> {
    tweet_collect::cli::run()
}
