//! In-memory collaborators shared by unit tests.

use crate::browser::rasterizer::{part_paths, Rasterizer};
use crate::browser::scraper::RecapSource;
use crate::delivery::ghost::{BlogPublisher, PostDraft};
use crate::delivery::telegram::PhotoSender;
use crate::domain::market::{Constituent, Quote};
use crate::domain::rates::RateSnapshot;
use crate::ingest::provider::{MarketDataProvider, NewsFeed};
use crate::ingest::types::NewsRow;
use crate::llm::{GenerateInput, JsonSchema, LlmClient, Provider};
use anyhow::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct FakeProvider {
    pub quotes: HashMap<String, Quote>,
    pub constituents: Vec<String>,
    /// `None` makes the treasury fetch fail.
    pub treasury: Option<RateSnapshot>,
    pub news: HashMap<(NewsFeed, String), Vec<NewsRow>>,
    pub latest_news_symbols: Vec<String>,
    pub quote_batches: Mutex<Vec<usize>>,
}

impl FakeProvider {
    pub fn with_quote(mut self, symbol: &str, price: f64, change: f64) -> Self {
        self.quotes.insert(
            symbol.to_string(),
            Quote {
                symbol: symbol.to_string(),
                price: Some(price),
                change_percent: Some(change),
            },
        );
        self
    }

    pub fn with_news(mut self, feed: NewsFeed, symbol: &str, rows: Vec<NewsRow>) -> Self {
        self.news.insert((feed, symbol.to_string()), rows);
        self
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for FakeProvider {
    fn provider_name(&self) -> &'static str {
        "fake"
    }

    async fn fetch_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>> {
        self.quote_batches.lock().unwrap().push(symbols.len());
        Ok(symbols
            .iter()
            .filter_map(|s| self.quotes.get(s).cloned())
            .collect())
    }

    async fn fetch_constituents(&self) -> Result<Vec<Constituent>> {
        Ok(self
            .constituents
            .iter()
            .map(|s| Constituent {
                symbol: s.clone(),
                name: None,
                sector: None,
            })
            .collect())
    }

    async fn fetch_treasury_rates(&self) -> Result<RateSnapshot> {
        self.treasury
            .clone()
            .ok_or_else(|| anyhow::anyhow!("treasury-rate response was empty"))
    }

    async fn fetch_news(&self, feed: NewsFeed, symbol: &str) -> Result<Vec<NewsRow>> {
        self.news
            .get(&(feed, symbol.to_string()))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no news registered for {symbol} on {feed:?}"))
    }

    async fn fetch_latest_news_symbols(&self) -> Result<Vec<String>> {
        Ok(self.latest_news_symbols.clone())
    }
}

#[derive(Default)]
pub struct FakeLlm {
    text: Option<String>,
    json: Option<serde_json::Value>,
    fail: Option<String>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl FakeLlm {
    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn with_json(mut self, value: serde_json::Value) -> Self {
        self.json = Some(value);
        self
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            fail: Some(msg.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn record(&self, input: &GenerateInput) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(input.prompt.clone());
        match &self.fail {
            Some(msg) => Err(anyhow::anyhow!("{msg}")),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for FakeLlm {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn generate_text(&self, input: GenerateInput) -> Result<String> {
        self.record(&input)?;
        Ok(self.text.clone().unwrap_or_default())
    }

    async fn generate_json(&self, input: GenerateInput, _schema: JsonSchema) -> Result<serde_json::Value> {
        self.record(&input)?;
        Ok(self.json.clone().unwrap_or(serde_json::Value::Null))
    }
}

pub struct FixedRecap(pub String);

#[async_trait::async_trait]
impl RecapSource for FixedRecap {
    async fn fetch_recap(&self) -> String {
        self.0.clone()
    }
}

/// Writes two placeholder PNGs beside the HTML file.
#[derive(Default)]
pub struct FakeRasterizer {
    pub captured: Mutex<Vec<PathBuf>>,
}

#[async_trait::async_trait]
impl Rasterizer for FakeRasterizer {
    async fn capture(&self, html_path: &Path) -> Result<Vec<PathBuf>> {
        self.captured.lock().unwrap().push(html_path.to_path_buf());
        let (a, b) = part_paths(html_path);
        std::fs::write(&a, b"png")?;
        std::fs::write(&b, b"png")?;
        Ok(vec![a, b])
    }
}

#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(PathBuf, String)>>,
}

impl RecordingSender {
    pub fn sent(&self) -> Vec<(PathBuf, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl PhotoSender for RecordingSender {
    async fn send_photo(&self, image: &Path, caption: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((image.to_path_buf(), caption.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    posts: Mutex<Vec<PostDraft>>,
}

impl RecordingPublisher {
    pub fn posts(&self) -> Vec<PostDraft> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl BlogPublisher for RecordingPublisher {
    async fn create_post(&self, post: &PostDraft) -> Option<serde_json::Value> {
        self.posts.lock().unwrap().push(post.clone());
        Some(serde_json::json!({"posts": [{"title": post.title}]}))
    }
}
