use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// One day's treasury yields. `date` is the unique key within a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    pub date: NaiveDate,
    pub year2: Option<f64>,
    pub year10: Option<f64>,
    pub year30: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Maturity {
    Year2,
    Year10,
    Year30,
}

impl Maturity {
    pub const ALL: [Maturity; 3] = [Maturity::Year2, Maturity::Year10, Maturity::Year30];

    pub fn label(self) -> &'static str {
        match self {
            Maturity::Year2 => "US 2Y",
            Maturity::Year10 => "US 10Y",
            Maturity::Year30 => "US 30Y",
        }
    }

    pub fn value(self, snapshot: &RateSnapshot) -> Option<f64> {
        let v = match self {
            Maturity::Year2 => snapshot.year2,
            Maturity::Year10 => snapshot.year10,
            Maturity::Year30 => snapshot.year30,
        };
        v.filter(|x| !x.is_nan())
    }
}

/// A single yield cell. Absent values render as `N/A`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateCell {
    Value(f64),
    Missing,
}

impl RateCell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RateCell::Value(v) => Some(*v),
            RateCell::Missing => None,
        }
    }
}

impl From<Option<f64>> for RateCell {
    fn from(v: Option<f64>) -> Self {
        match v {
            Some(x) if !x.is_nan() => RateCell::Value(x),
            _ => RateCell::Missing,
        }
    }
}

impl fmt::Display for RateCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateCell::Value(v) => write!(f, "{v}"),
            RateCell::Missing => f.write_str("N/A"),
        }
    }
}

impl Serialize for RateCell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RateCell::Value(v) => serializer.serialize_f64(*v),
            RateCell::Missing => serializer.serialize_str("N/A"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaturityView {
    pub current: RateCell,
    pub prev: RateCell,
    #[serde(rename = "5d")]
    pub five_day: RateCell,
    #[serde(rename = "lm")]
    pub last_month: RateCell,
}

/// Derived current / previous / 5-day / last-month view of a rate series.
#[derive(Debug, Clone, PartialEq)]
pub struct RateView {
    pub as_of: Option<NaiveDate>,
    pub maturities: Vec<(Maturity, MaturityView)>,
}

impl RateView {
    pub fn get(&self, maturity: Maturity) -> Option<&MaturityView> {
        self.maturities
            .iter()
            .find(|(m, _)| *m == maturity)
            .map(|(_, v)| v)
    }

    /// Keyed by display label, e.g. `{"US 2Y": {"current": 4.1, "prev": "N/A", ...}}`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut out = serde_json::Map::new();
        for (maturity, view) in &self.maturities {
            out.insert(
                maturity.label().to_string(),
                serde_json::to_value(view).unwrap_or(serde_json::Value::Null),
            );
        }
        serde_json::Value::Object(out)
    }
}
