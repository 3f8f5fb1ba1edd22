//! News and research retrieval
//!
//! [`NewsFetcher`] turns a symbol or free-text query into a deduplicated list
//! of headlines. [`NewsFeed`] is the session-wide list that the first
//! symbol's news seeds and a background task extends for the rest.

use crate::api::{NewsProvider, RawNewsItem};
use crate::error::Result;
use crate::models::{NewsItem, PublishedAt};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Fetches news and research items for the tickers mentioned in some text
pub struct NewsFetcher {
    provider: Arc<dyn NewsProvider>,
    news_count: usize,
    term_pattern: Regex,
}

impl NewsFetcher {
    /// Create a fetcher requesting `news_count` news items per term
    pub fn new(provider: Arc<dyn NewsProvider>, news_count: usize) -> Result<Self> {
        Ok(Self {
            provider,
            news_count,
            term_pattern: Regex::new(r"\b[A-Z0-9]{1,6}\b")?,
        })
    }

    /// Ticker-like terms in `input`, uppercased and deduplicated in order
    pub fn terms(&self, input: &str) -> Vec<String> {
        let upper = input.to_uppercase();
        let mut seen = HashSet::new();
        self.term_pattern
            .find_iter(&upper)
            .map(|m| m.as_str().to_string())
            .filter(|t| seen.insert(t.clone()))
            .collect()
    }

    /// News then research for every term in `input`
    ///
    /// Items without a link are skipped and URLs are unique across the whole
    /// result. A failing term is logged and skipped. When nothing is found
    /// the result is a single placeholder item with an empty URL.
    pub async fn fetch_news(&self, input: &str) -> Vec<NewsItem> {
        let mut items = Vec::new();
        let mut seen_urls = HashSet::new();

        for term in self.terms(input) {
            match self.fetch_term(&term, &mut seen_urls).await {
                Ok(found) => {
                    debug!("Found {} news items for {}", found.len(), term);
                    items.extend(found);
                }
                Err(e) => warn!("Error fetching news/research for {}: {}", term, e),
            }
        }

        if items.is_empty() {
            items.push(placeholder(input));
        }
        items
    }

    async fn fetch_term(
        &self,
        term: &str,
        seen_urls: &mut HashSet<String>,
    ) -> Result<Vec<NewsItem>> {
        let mut found = Vec::new();

        let news = self.provider.search_news(term, self.news_count).await?;
        collect_unique(news, &format!("{term} News"), seen_urls, &mut found);

        // A research failure keeps the news already collected
        match self.provider.search_research(term).await {
            Ok(research) => {
                collect_unique(research, &format!("{term} Research"), seen_urls, &mut found);
            }
            Err(e) => warn!("Error fetching research for {}: {}", term, e),
        }

        Ok(found)
    }
}

fn collect_unique(
    raw: Vec<RawNewsItem>,
    default_title: &str,
    seen_urls: &mut HashSet<String>,
    out: &mut Vec<NewsItem>,
) {
    for item in raw {
        let Some(url) = item.href().map(str::to_string) else {
            continue;
        };
        if !seen_urls.insert(url.clone()) {
            continue;
        }

        let publisher = item.publisher.unwrap_or_default();
        let description = match item.summary {
            Some(summary) => format!("{publisher}: {summary}"),
            None => publisher,
        };

        out.push(NewsItem {
            title: item.title.unwrap_or_else(|| default_title.to_string()),
            description,
            url,
            published_at: item
                .published_at
                .unwrap_or_else(|| PublishedAt::Text(Utc::now().to_rfc3339())),
        });
    }
}

fn placeholder(input: &str) -> NewsItem {
    NewsItem {
        title: format!("No news found for {input}"),
        description: String::new(),
        url: String::new(),
        published_at: PublishedAt::Text(Utc::now().to_rfc3339()),
    }
}

/// Render a publication time as `YYYY-MM-DD HH:MM`
///
/// Epoch seconds are tried first, then RFC 3339, then naive ISO-8601
/// date-times and plain dates. Anything else is returned verbatim.
pub fn format_published(value: &PublishedAt) -> String {
    let text = match value {
        PublishedAt::Epoch(secs) => {
            return DateTime::<Utc>::from_timestamp(*secs, 0)
                .map_or_else(|| secs.to_string(), |dt| dt.format(DISPLAY_FORMAT).to_string());
        }
        PublishedAt::Text(text) => text.trim(),
    };

    if let Some(dt) = text
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    {
        return dt.format(DISPLAY_FORMAT).to_string();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return dt.format(DISPLAY_FORMAT).to_string();
    }
    if let Some(dt) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
    {
        return dt.format(DISPLAY_FORMAT).to_string();
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return format!("{} 00:00", date.format("%Y-%m-%d"));
    }

    text.to_string()
}

/// Session-wide news list shared with the background fetch task
///
/// Appends are deduplicated by URL. Placeholder items survive only while the
/// feed holds no real item. Every change bumps a version counter that
/// subscribers can await.
#[derive(Clone)]
pub struct NewsFeed {
    items: Arc<RwLock<Vec<NewsItem>>>,
    version: Arc<watch::Sender<u64>>,
}

impl Default for NewsFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl NewsFeed {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            items: Arc::new(RwLock::new(Vec::new())),
            version: Arc::new(tx),
        }
    }

    /// Merge `incoming` and return the number of items actually added
    pub fn extend(&self, incoming: Vec<NewsItem>) -> usize {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        let before = items.len();

        for item in incoming {
            let duplicate = items.iter().any(|existing| {
                if item.is_placeholder() {
                    existing.is_placeholder() && existing.title == item.title
                } else {
                    existing.url == item.url
                }
            });
            if !duplicate {
                items.push(item);
            }
        }

        if items.iter().any(|i| !i.is_placeholder()) {
            items.retain(|i| !i.is_placeholder());
        }

        let added = items.len().saturating_sub(before);
        drop(items);
        self.version.send_modify(|v| *v += 1);
        added
    }

    /// Current items in arrival order
    pub fn snapshot(&self) -> Vec<NewsItem> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receiver that changes whenever the feed does
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    pub fn clear(&self) {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.version.send_modify(|v| *v += 1);
    }
}

/// Fetch news for `symbols` one after another in a background task
///
/// Each symbol's items are merged into `feed` and `on_update` receives the
/// new feed length. Failures never abort the loop.
pub fn spawn_remaining<F>(
    fetcher: Arc<NewsFetcher>,
    feed: NewsFeed,
    symbols: Vec<String>,
    on_update: F,
) -> JoinHandle<()>
where
    F: Fn(usize) + Send + 'static,
{
    tokio::spawn(async move {
        for symbol in symbols {
            let items = fetcher.fetch_news(&symbol).await;
            let added = feed.extend(items);
            debug!("Background news for {}: {} new items", symbol, added);
            on_update(feed.len());
        }
        info!("Background news fetch finished with {} items", feed.len());
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockNewsProvider;
    use crate::error::FinanceError;
    use mockall::predicate::eq;

    fn raw(title: &str, link: &str) -> RawNewsItem {
        RawNewsItem {
            title: Some(title.to_string()),
            publisher: Some("Reuters".to_string()),
            link: Some(link.to_string()),
            published_at: Some(PublishedAt::Epoch(1_700_000_000)),
            ..RawNewsItem::default()
        }
    }

    fn item(title: &str, url: &str) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            description: String::new(),
            url: url.to_string(),
            published_at: PublishedAt::Epoch(0),
        }
    }

    fn fetcher(mock: MockNewsProvider) -> NewsFetcher {
        NewsFetcher::new(Arc::new(mock), 10).unwrap()
    }

    #[test]
    fn test_terms_are_uppercased_and_deduped() {
        let f = fetcher(MockNewsProvider::new());
        assert_eq!(f.terms("aapl vs msft vs AAPL"), vec!["AAPL", "VS", "MSFT"]);
        assert_eq!(f.terms("BRKB1234"), Vec::<String>::new());
    }

    #[tokio::test]
    async fn test_fetch_news_dedups_by_url() {
        let mut mock = MockNewsProvider::new();
        mock.expect_search_news()
            .with(eq("AAPL"), eq(10))
            .returning(|_, _| {
                Ok(vec![
                    raw("Apple up", "https://e.com/1"),
                    raw("Apple up again", "https://e.com/1"),
                    RawNewsItem::default(),
                ])
            });
        mock.expect_search_research().returning(|_| {
            Ok(vec![RawNewsItem {
                url: Some("https://e.com/2".to_string()),
                summary: Some("Upgrade".to_string()),
                publisher: Some("Argus".to_string()),
                ..RawNewsItem::default()
            }])
        });

        let items = fetcher(mock).fetch_news("AAPL").await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Apple up");
        assert_eq!(items[0].description, "Reuters");
        assert_eq!(items[1].title, "AAPL Research");
        assert_eq!(items[1].description, "Argus: Upgrade");
        assert!(matches!(items[1].published_at, PublishedAt::Text(_)));
    }

    #[tokio::test]
    async fn test_failing_term_is_skipped() {
        let mut mock = MockNewsProvider::new();
        mock.expect_search_news()
            .with(eq("AAPL"), eq(10))
            .returning(|_, _| Err(FinanceError::ApiError("503".to_string())));
        mock.expect_search_news()
            .with(eq("MSFT"), eq(10))
            .returning(|_, _| Ok(vec![raw("Microsoft", "https://e.com/m")]));
        mock.expect_search_research().returning(|_| Ok(Vec::new()));

        let items = fetcher(mock).fetch_news("AAPL MSFT").await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Microsoft");
    }

    #[tokio::test]
    async fn test_research_failure_keeps_news() {
        let mut mock = MockNewsProvider::new();
        mock.expect_search_news()
            .with(eq("AAPL"), eq(10))
            .returning(|_, _| Ok(vec![raw("Apple up", "https://e.com/1")]));
        mock.expect_search_research()
            .with(eq("AAPL"))
            .returning(|_| Err(FinanceError::ApiError("research down".to_string())));

        let items = fetcher(mock).fetch_news("AAPL").await;

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Apple up");
        assert_eq!(items[0].url, "https://e.com/1");
        assert!(!items[0].is_placeholder());
    }

    #[tokio::test]
    async fn test_placeholder_when_nothing_found() {
        let mut mock = MockNewsProvider::new();
        mock.expect_search_news().returning(|_, _| Ok(Vec::new()));
        mock.expect_search_research().returning(|_| Ok(Vec::new()));

        let items = fetcher(mock).fetch_news("ZZZZ").await;
        assert_eq!(items.len(), 1);
        assert!(items[0].is_placeholder());
        assert_eq!(items[0].title, "No news found for ZZZZ");
    }

    #[test]
    fn test_format_published() {
        assert_eq!(
            format_published(&PublishedAt::Epoch(1_700_000_000)),
            "2023-11-14 22:13"
        );
        assert_eq!(
            format_published(&PublishedAt::Text("1700000000".to_string())),
            "2023-11-14 22:13"
        );
        assert_eq!(
            format_published(&PublishedAt::Text("2024-05-01T10:30:00+02:00".to_string())),
            "2024-05-01 10:30"
        );
        assert_eq!(
            format_published(&PublishedAt::Text("2024-05-01T10:30:15.123456".to_string())),
            "2024-05-01 10:30"
        );
        assert_eq!(
            format_published(&PublishedAt::Text("2024-05-01".to_string())),
            "2024-05-01 00:00"
        );
        assert_eq!(
            format_published(&PublishedAt::Text("yesterday".to_string())),
            "yesterday"
        );
    }

    #[test]
    fn test_feed_dedup_and_placeholder_policy() {
        let feed = NewsFeed::new();
        let mut rx = feed.subscribe();

        assert_eq!(feed.extend(vec![item("No news found for AAPL", "")]), 1);
        assert!(rx.has_changed().unwrap());
        rx.mark_unchanged();

        let added = feed.extend(vec![item("A", "https://e.com/a"), item("B", "https://e.com/b")]);
        assert_eq!(added, 1);
        let titles: Vec<String> = feed.snapshot().into_iter().map(|i| i.title).collect();
        assert_eq!(titles, vec!["A", "B"]);

        assert_eq!(feed.extend(vec![item("A again", "https://e.com/a")]), 0);
        assert_eq!(feed.extend(vec![item("No news found for MSFT", "")]), 0);
        assert_eq!(feed.len(), 2);
        assert!(rx.has_changed().unwrap());

        feed.clear();
        assert!(feed.is_empty());
    }

    #[tokio::test]
    async fn test_spawn_remaining_appends_each_symbol() {
        let mut mock = MockNewsProvider::new();
        mock.expect_search_news()
            .with(eq("MSFT"), eq(10))
            .returning(|_, _| Ok(vec![raw("Microsoft", "https://e.com/m")]));
        mock.expect_search_news()
            .with(eq("TSLA"), eq(10))
            .returning(|_, _| Err(FinanceError::ApiError("down".to_string())));
        mock.expect_search_research().returning(|_| Ok(Vec::new()));

        let feed = NewsFeed::new();
        feed.extend(vec![item("Apple", "https://e.com/a")]);

        let updates = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&updates);
        let handle = spawn_remaining(
            Arc::new(fetcher(mock)),
            feed.clone(),
            vec!["MSFT".to_string(), "TSLA".to_string()],
            move |len| sink.lock().unwrap().push(len),
        );
        handle.await.unwrap();

        let titles: Vec<String> = feed.snapshot().into_iter().map(|i| i.title).collect();
        assert_eq!(titles, vec!["Apple", "Microsoft"]);
        assert_eq!(*updates.lock().unwrap(), vec![2, 2]);
    }
}
