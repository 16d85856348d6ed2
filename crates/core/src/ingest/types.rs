use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteRow {
    pub symbol: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(rename = "changesPercentage", default)]
    pub changes_percentage: Option<f64>,
}

/// One row of the treasury-rate endpoint. Other maturities are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct TreasuryRow {
    pub date: String,
    #[serde(default)]
    pub year2: Option<f64>,
    #[serde(default)]
    pub year10: Option<f64>,
    #[serde(default)]
    pub year30: Option<f64>,
}

/// Common projection of both news feeds.
#[derive(Debug, Clone, Deserialize)]
pub struct NewsRow {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(rename = "publishedDate", default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}
