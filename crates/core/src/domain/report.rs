use crate::domain::market::Mover;
use crate::domain::rates::RateView;
use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::path::PathBuf;

pub const NO_NEWS_PLACEHOLDER: &str = "No relevant news available.";

/// One structured point from the scraped daily recap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecapPoint {
    pub topic: String,
    pub summary: String,
}

/// Per-symbol news summaries, kept in the order symbols were first seen
/// (mover ranking or feed order). Serializes as a JSON object in that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolSummaries(Vec<(String, String)>);

impl SymbolSummaries {
    /// Returns false and keeps the first entry when `symbol` is already present.
    pub fn insert(&mut self, symbol: impl Into<String>, summary: impl Into<String>) -> bool {
        let symbol = symbol.into();
        if self.contains(&symbol) {
            return false;
        }
        self.0.push((symbol, summary.into()));
        true
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.0.iter().any(|(s, _)| s == symbol)
    }

    pub fn get(&self, symbol: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, summary)| summary.as_str())
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(s, _)| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for SymbolSummaries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (symbol, summary) in &self.0 {
            map.serialize_entry(symbol, summary)?;
        }
        map.end()
    }
}

/// Everything collected for one run. Built once, then only read.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketDataBag {
    pub index_lines: Vec<String>,
    /// `None` when neither a fresh fetch nor history produced a view.
    pub rate_view: Option<RateView>,
    pub movers: Vec<Mover>,
    pub symbol_summaries: SymbolSummaries,
    pub trending_summaries: SymbolSummaries,
    pub recap_points: Vec<RecapPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    /// Grid layout, rasterized into images for the chat channel.
    Dashboard,
    /// Table layout, published to the blog.
    Email,
}

impl LayoutKind {
    pub fn template_file(self) -> &'static str {
        match self {
            LayoutKind::Dashboard => "dashboard_template.html",
            LayoutKind::Email => "email_template.html",
        }
    }

    pub fn file_prefix(self) -> &'static str {
        match self {
            LayoutKind::Dashboard => "market_report",
            LayoutKind::Email => "email_report",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub layout: LayoutKind,
    pub target_date: NaiveDate,
    pub html: String,
    pub path: PathBuf,
}

/// `2026 / 01 / 27`, the form used in titles and templates.
pub fn display_date(date: NaiveDate) -> String {
    date.format("%Y / %m / %d").to_string()
}
