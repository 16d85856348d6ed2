use serde::{Deserialize, Serialize};

/// A fresh quote for one symbol. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: Option<f64>,
    pub change_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorPerformance {
    pub name: String,
    pub symbol: String,
    pub price: f64,
    pub change_percent: f64,
}

impl SectorPerformance {
    pub fn line(&self) -> String {
        format!(
            "{}: Price {}, Change {}%",
            self.name, self.price, self.change_percent
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MoverKind {
    #[serde(rename = "Top Gainer")]
    TopGainer,
    #[serde(rename = "Top Loser")]
    TopLoser,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mover {
    pub symbol: String,
    #[serde(rename = "changesPercentage")]
    pub change_percent: f64,
    pub price: Option<f64>,
    #[serde(rename = "type")]
    pub kind: MoverKind,
}

/// One index-constituent row from the provider's constituent list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constituent {
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
}

/// Display name and provider symbol for the headline instruments.
pub const MARKET_SYMBOLS: &[(&str, &str)] = &[
    ("S&P 500", "^GSPC"),
    ("Dow Jones", "^DJI"),
    ("NASDAQ", "^IXIC"),
    ("Russell 2000", "^RUT"),
    ("VIX", "^VIX"),
    ("Gold", "xauusd"),
];

pub const SECTOR_ETFS: &[(&str, &str)] = &[
    ("Communication Services", "XLC"),
    ("Consumer Cyclical", "XLY"),
    ("Consumer Defensive", "XLP"),
    ("Energy", "XLE"),
    ("Financial Services", "XLF"),
    ("Healthcare", "XLV"),
    ("Industrials", "XLI"),
    ("Basic Materials", "XLB"),
    ("Real Estate", "XLRE"),
    ("Technology", "XLK"),
    ("Utilities", "XLU"),
];
