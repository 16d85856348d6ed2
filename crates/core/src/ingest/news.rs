use crate::domain::news::{NewsItem, PUBLISHED_DATE_FORMAT};
use crate::domain::report::SymbolSummaries;
use crate::ingest::provider::{MarketDataProvider, NewsFeed};
use crate::ingest::types::NewsRow;
use crate::pipeline::stage::StageOutcome;
use crate::summarize::Summarizer;
use chrono::{Duration, NaiveDate, NaiveDateTime};

pub struct NewsAggregator<'a> {
    provider: &'a dyn MarketDataProvider,
    summarizer: &'a Summarizer<'a>,
}

impl<'a> NewsAggregator<'a> {
    pub fn new(provider: &'a dyn MarketDataProvider, summarizer: &'a Summarizer<'a>) -> Self {
        Self {
            provider,
            summarizer,
        }
    }

    /// Summarizes recent news per symbol, sequentially and independently.
    ///
    /// Output follows the order of `symbols`. A failed fetch counts as
    /// "no news" for that symbol.
    pub async fn fetch_and_summarize(
        &self,
        symbols: &[String],
        feed: NewsFeed,
        today: NaiveDate,
    ) -> StageOutcome<SymbolSummaries> {
        let mut out = SymbolSummaries::default();
        let mut failed = Vec::new();

        for symbol in symbols {
            if out.contains(symbol) {
                continue;
            }

            let rows = match self.provider.fetch_news(feed, symbol).await {
                Ok(rows) => rows,
                Err(err) => {
                    tracing::warn!(%symbol, ?feed, error = %format!("{err:#}"), "news fetch failed");
                    failed.push(symbol.as_str());
                    Vec::new()
                }
            };

            let items = filter_recent(rows, today, feed.window_days());
            tracing::debug!(%symbol, ?feed, items = items.len(), "recent news collected");

            let summary = self.summarizer.summarize_news(symbol, &items).await;
            out.insert(symbol.as_str(), summary);
        }

        if failed.is_empty() {
            StageOutcome::Complete(out)
        } else {
            let reason = format!("news unavailable for {}", failed.join(", "));
            StageOutcome::degraded(out, reason)
        }
    }
}

/// Keeps items published on or after `today - window_days`.
///
/// Items without a parseable `YYYY-MM-DD HH:MM:SS` timestamp are dropped.
pub fn filter_recent(rows: Vec<NewsRow>, today: NaiveDate, window_days: i64) -> Vec<NewsItem> {
    let cutoff = today - Duration::days(window_days);

    rows.into_iter()
        .filter_map(|row| {
            let published =
                NaiveDateTime::parse_from_str(row.published_date.as_deref()?, PUBLISHED_DATE_FORMAT)
                    .ok()?;
            if published.date() < cutoff {
                return None;
            }
            Some(NewsItem {
                title: row.title.unwrap_or_else(|| "No Title".to_string()),
                text: row.text.unwrap_or_else(|| "No Content".to_string()),
                published,
            })
        })
        .collect()
}
