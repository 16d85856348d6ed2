use crate::domain::market::{Mover, MoverKind, Quote, SectorPerformance};
use crate::ingest::provider::{MarketDataProvider, MAX_QUOTE_BATCH};
use crate::pipeline::stage::StageOutcome;
use crate::storage::universe::read_universe;
use anyhow::Context;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::PathBuf;

pub const MOVERS_PER_SIDE: usize = 6;
const SECTORS_KEEP_ALL_MAX: usize = 6;
const SECTORS_PER_SIDE: usize = 3;

/// Where the biggest-mover universe comes from.
#[derive(Debug, Clone)]
pub enum UniverseSource {
    /// Static symbol list on disk; falls back to the constituent list if unreadable or empty.
    File(PathBuf),
    Constituents,
}

pub struct MarketGatherer<'a> {
    provider: &'a dyn MarketDataProvider,
}

impl<'a> MarketGatherer<'a> {
    pub fn new(provider: &'a dyn MarketDataProvider) -> Self {
        Self { provider }
    }

    /// `(price, changePercent)` for one symbol.
    pub async fn fetch_quote(&self, symbol: &str) -> anyhow::Result<(f64, f64)> {
        let quotes = self.provider.fetch_quotes(&[symbol.to_string()]).await?;
        let quote = quotes
            .into_iter()
            .next()
            .with_context(|| format!("no quote returned for {symbol}"))?;
        let price = quote.price.with_context(|| format!("{symbol} quote has no price"))?;
        let change = quote
            .change_percent
            .with_context(|| format!("{symbol} quote has no change"))?;
        Ok((price, change))
    }

    /// One `Name: Price p, Change c%` line per instrument; failures become `Name: N/A`.
    pub async fn index_lines(&self, instruments: &[(&str, &str)]) -> StageOutcome<Vec<String>> {
        let mut lines = Vec::with_capacity(instruments.len());
        let mut failed = Vec::new();

        for (name, symbol) in instruments {
            match self.fetch_quote(symbol).await {
                Ok((price, change)) => {
                    lines.push(format!("{name}: Price {price}, Change {change}%"));
                }
                Err(err) => {
                    tracing::warn!(%name, %symbol, error = %format!("{err:#}"), "quote fetch failed");
                    lines.push(format!("{name}: N/A"));
                    failed.push(*symbol);
                }
            }
        }

        if failed.is_empty() {
            StageOutcome::Complete(lines)
        } else {
            StageOutcome::degraded(lines, format!("quotes unavailable for {}", failed.join(", ")))
        }
    }

    pub async fn sector_performance(
        &self,
        sectors: &[(&str, &str)],
    ) -> StageOutcome<Vec<SectorPerformance>> {
        let mut results = Vec::with_capacity(sectors.len());
        let mut failed = Vec::new();

        for (name, symbol) in sectors {
            match self.fetch_quote(symbol).await {
                Ok((price, change_percent)) => results.push(SectorPerformance {
                    name: name.to_string(),
                    symbol: symbol.to_string(),
                    price,
                    change_percent,
                }),
                Err(err) => {
                    tracing::warn!(%name, %symbol, error = %format!("{err:#}"), "sector quote fetch failed");
                    failed.push(*symbol);
                }
            }
        }

        let selected = select_sectors(results);
        if failed.is_empty() {
            StageOutcome::Complete(selected)
        } else {
            StageOutcome::degraded(
                selected,
                format!("sector quotes unavailable for {}", failed.join(", ")),
            )
        }
    }

    pub async fn resolve_universe(&self, source: &UniverseSource) -> anyhow::Result<Vec<String>> {
        if let UniverseSource::File(path) = source {
            match read_universe(path) {
                Ok(symbols) if !symbols.is_empty() => return Ok(symbols),
                Ok(_) => {
                    tracing::warn!(path = %path.display(), "universe file is empty; using constituent list")
                }
                Err(err) => tracing::warn!(
                    path = %path.display(),
                    error = %format!("{err:#}"),
                    "universe file unreadable; using constituent list"
                ),
            }
        }

        let constituents = self.provider.fetch_constituents().await?;
        Ok(constituents.into_iter().map(|c| c.symbol).collect())
    }

    pub async fn biggest_movers(&self, source: &UniverseSource) -> StageOutcome<Vec<Mover>> {
        let symbols = match self.resolve_universe(source).await {
            Ok(s) => s,
            Err(err) => {
                tracing::error!(error = %format!("{err:#}"), "could not resolve mover universe");
                return StageOutcome::degraded(Vec::new(), "mover universe unavailable");
            }
        };

        let mut quotes = Vec::with_capacity(symbols.len());
        let mut failed_batches = 0usize;
        for (batch_idx, chunk) in symbols.chunks(MAX_QUOTE_BATCH).enumerate() {
            match self.provider.fetch_quotes(chunk).await {
                Ok(batch) => quotes.extend(batch),
                Err(err) => {
                    failed_batches += 1;
                    tracing::warn!(
                        batch_idx,
                        batch_size = chunk.len(),
                        error = %format!("{err:#}"),
                        "batch quote fetch failed; skipping batch"
                    );
                }
            }
        }

        tracing::info!(universe = symbols.len(), quotes = quotes.len(), "universe quotes fetched");

        if quotes.is_empty() {
            return StageOutcome::degraded(Vec::new(), "no quotes for mover universe");
        }

        let movers = select_movers(quotes);
        if failed_batches > 0 {
            StageOutcome::degraded(movers, format!("{failed_batches} quote batch(es) failed"))
        } else {
            StageOutcome::Complete(movers)
        }
    }

    /// The `k` symbols mentioned most often in the latest-news stream.
    pub async fn most_mentioned_symbols(&self, k: usize) -> anyhow::Result<Vec<String>> {
        let symbols = self.provider.fetch_latest_news_symbols().await?;
        Ok(top_mentioned(symbols, k))
    }
}

fn by_change_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Ranks sectors by change, descending.
///
/// Up to six sectors are all kept. Above that, the three best gainers (> 0) and the three
/// least-negative losers (< 0) are kept, gainers first. Flat sectors are dropped.
pub fn select_sectors(mut sectors: Vec<SectorPerformance>) -> Vec<SectorPerformance> {
    sectors.sort_by(|a, b| by_change_desc(a.change_percent, b.change_percent));

    if sectors.len() <= SECTORS_KEEP_ALL_MAX {
        return sectors;
    }

    let gainers = sectors
        .iter()
        .filter(|s| s.change_percent > 0.0)
        .take(SECTORS_PER_SIDE)
        .cloned();
    let losers = sectors
        .iter()
        .filter(|s| s.change_percent < 0.0)
        .take(SECTORS_PER_SIDE)
        .cloned();
    gainers.chain(losers).collect()
}

/// First six of the descending ranking are gainers, last six are losers.
///
/// Losers keep their descending order. With fewer than twelve valid quotes the two groups
/// overlap; that is accepted.
pub fn select_movers(quotes: Vec<Quote>) -> Vec<Mover> {
    let mut valid: Vec<(Quote, f64)> = quotes
        .into_iter()
        .filter_map(|q| q.change_percent.filter(|c| !c.is_nan()).map(|c| (q, c)))
        .collect();
    valid.sort_by(|a, b| by_change_desc(a.1, b.1));

    let to_mover = |(q, change): &(Quote, f64), kind: MoverKind| Mover {
        symbol: q.symbol.clone(),
        change_percent: *change,
        price: q.price,
        kind,
    };

    let bottom_start = valid.len().saturating_sub(MOVERS_PER_SIDE);
    valid
        .iter()
        .take(MOVERS_PER_SIDE)
        .map(|v| to_mover(v, MoverKind::TopGainer))
        .chain(valid[bottom_start..].iter().map(|v| to_mover(v, MoverKind::TopLoser)))
        .collect()
}

/// Most frequent first; ties keep first-seen order.
pub fn top_mentioned(symbols: Vec<String>, k: usize) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (idx, s) in symbols.into_iter().enumerate() {
        counts.entry(s).or_insert((0, idx)).0 += 1;
    }
    let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    ranked.into_iter().take(k).map(|(s, _)| s).collect()
}
