//! Blocking scraper for the search timeline endpoint.
//!
//! Each page is a JSON object whose `items_html` holds rendered tweets and
//! whose `min_position` is the cursor for the next (older) page.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::DateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{self, HeaderMap, HeaderValue};
use scraper::{ElementRef, Html, Node, Selector};
use serde::Deserialize;
use tracing::debug;

use super::{FeedClient, FeedError, FeedQuery, TweetStream};
use crate::domain::{Config, Tweet};

static TWEET: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.js-stream-tweet").expect("Invalid tweet selector"));
static RETWEET: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.js-retweet-text").expect("Invalid retweet selector"));
static TIMESTAMP: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("small.time span.js-short-timestamp").expect("Invalid timestamp selector")
});
static USERNAME: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("span.username.js-action-profile-name b").expect("Invalid username selector")
});
static TEXT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p.js-tweet-text").expect("Invalid text selector"));
static GEO: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.Tweet-geo").expect("Invalid geo selector"));

static MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"@\w*").expect("Invalid mention regex"));
static HASHTAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"#\w*").expect("Invalid hashtag regex"));

/// HTTP client for the live feed.
pub struct SearchClient {
    http: Client,
    endpoint: String,
}

impl SearchClient {
    pub fn new(config: &Config) -> Result<Self, FeedError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
        );
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US;q=0.7,en;q=0.3"));
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));

        let http = Client::builder()
            .cookie_store(true)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FeedError::Transport(e.to_string()))?;

        Ok(Self { http, endpoint: config.endpoint.clone() })
    }

    fn page_url(&self, search: &str, position: &str) -> Result<reqwest::Url, FeedError> {
        reqwest::Url::parse_with_params(
            &self.endpoint,
            &[("f", "tweets"), ("q", search), ("src", "typd"), ("max_position", position)],
        )
        .map_err(|e| FeedError::Unrecognised { url: self.endpoint.clone(), reason: e.to_string() })
    }

    fn fetch_page(&self, search: &str, position: &str) -> Result<TimelinePage, FeedError> {
        let url = self.page_url(search, position)?;
        debug!("GET {url}");
        let response = self
            .http
            .get(url.clone())
            .header(header::REFERER, url.as_str())
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| FeedError::Transport(e.to_string()))?;
        let body = response.text().map_err(|e| FeedError::Transport(e.to_string()))?;
        serde_json::from_str(&body)
            .map_err(|e| FeedError::Unrecognised { url: url.to_string(), reason: e.to_string() })
    }
}

impl FeedClient for SearchClient {
    fn search(&self, query: &FeedQuery) -> Box<dyn TweetStream + '_> {
        Box::new(SearchStream {
            client: self,
            search: query.search_string(),
            position: String::new(),
            page: VecDeque::new(),
            done: false,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TimelinePage {
    #[serde(default)]
    items_html: String,
    #[serde(default)]
    min_position: Option<String>,
}

struct SearchStream<'a> {
    client: &'a SearchClient,
    search: String,
    position: String,
    page: VecDeque<Tweet>,
    done: bool,
}

impl TweetStream for SearchStream<'_> {
    fn next_tweet(&mut self) -> Result<Option<Tweet>, FeedError> {
        loop {
            if let Some(tweet) = self.page.pop_front() {
                return Ok(Some(tweet));
            }
            if self.done {
                return Ok(None);
            }

            let page = self.client.fetch_page(&self.search, &self.position)?;
            if page.items_html.trim().is_empty() {
                self.done = true;
                continue;
            }
            match page.min_position {
                Some(next) if next != self.position => self.position = next,
                _ => self.done = true,
            }
            self.page = parse_items(&page.items_html).into();
        }
    }
}

/// Extract tweets from one `items_html` fragment, skipping retweets and
/// anything without a usable id or timestamp.
pub fn parse_items(html: &str) -> Vec<Tweet> {
    let fragment = Html::parse_fragment(html);
    fragment.select(&TWEET).filter_map(parse_tweet).collect()
}

fn parse_tweet(el: ElementRef<'_>) -> Option<Tweet> {
    let retweet: String = el.select(&RETWEET).flat_map(|e| e.text()).collect();
    if !retweet.trim().is_empty() {
        return None;
    }

    let id: u64 = el.value().attr("data-tweet-id")?.parse().ok()?;
    let seconds: i64 = el.select(&TIMESTAMP).next()?.value().attr("data-time")?.parse().ok()?;
    let date = DateTime::from_timestamp(seconds, 0)?.naive_utc();

    let text_el = el.select(&TEXT).next();
    let text = text_el.map(tweet_text).unwrap_or_default();
    let join = |re: &Regex| re.find_iter(&text).map(|m| m.as_str()).collect::<Vec<_>>().join(" ");
    let mentions = join(&MENTION);
    let hashtags = join(&HASHTAG);

    let mut tweet = Tweet::new(id, date)
        .with_field("user", el.select(&USERNAME).flat_map(|e| e.text()).collect::<String>())
        .with_field("lang", text_el.and_then(|e| e.value().attr("lang")).unwrap_or(""))
        .with_field("replies", action_count(el, "reply"))
        .with_field("retweets", action_count(el, "retweet"))
        .with_field("favorites", action_count(el, "favorite"))
        .with_field("geo", el.select(&GEO).next().and_then(|e| e.value().attr("title")).unwrap_or(""))
        .with_field("user-id", el.value().attr("data-user-id").unwrap_or(""))
        .with_field("mentions", mentions)
        .with_field("hashtags", hashtags);
    if let Some(path) = el.value().attr("data-permalink-path") {
        tweet = tweet.with_field("permalink", format!("https://twitter.com{path}"));
    }
    Some(tweet.with_field("text", text))
}

/// Text of the tweet body. Links get a leading space so URLs and
/// `@`/`#` entities stay separated from surrounding words.
fn tweet_text(el: ElementRef<'_>) -> String {
    let mut text = String::new();
    for node in el.descendants() {
        match node.value() {
            Node::Element(e) if e.name() == "a" => text.push(' '),
            Node::Text(t) => text.push_str(t),
            _ => {}
        }
    }
    text
}

fn action_count(el: ElementRef<'_>, action: &str) -> String {
    let selector = format!("span.ProfileTweet-action--{action} span.ProfileTweet-actionCount");
    Selector::parse(&selector)
        .ok()
        .and_then(|s| el.select(&s).next().and_then(|e| e.value().attr("data-tweet-stat-count")))
        .map(|count| count.replace(',', ""))
        .unwrap_or_default()
}
