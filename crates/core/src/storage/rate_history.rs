use crate::domain::rates::{Maturity, MaturityView, RateCell, RateSnapshot, RateView};
use anyhow::Context;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

const DATE_FORMAT: &str = "%Y-%m-%d";

const IDX_CURRENT: usize = 0;
const IDX_PREV: usize = 1;
const IDX_FIVE_DAY: usize = 5;
// Used when no row exists at any of the 1..=30 calendar-day offsets.
const IDX_LAST_MONTH_FALLBACK: usize = 21;
const LAST_MONTH_MAX_DAYS_BACK: i64 = 30;

/// Treasury-rate history persisted as a CSV file, fully rewritten on every upsert.
///
/// The in-memory series is always deduplicated by date and sorted newest first.
/// Single writer: concurrent runs against the same file are not coordinated.
#[derive(Debug, Clone)]
pub struct RateHistoryStore {
    path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct RateRow {
    date: String,
    year2: Option<f64>,
    year10: Option<f64>,
    year30: Option<f64>,
}

impl RateHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Missing or unreadable history is an empty series, never an error.
    pub fn load(&self) -> Vec<RateSnapshot> {
        if !self.path.exists() {
            tracing::warn!(path = %self.path.display(), "rate history not found; starting empty");
            return Vec::new();
        }

        match read_series(&self.path) {
            Ok(series) => series,
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %format!("{err:#}"),
                    "could not read existing rate history; treating as empty"
                );
                Vec::new()
            }
        }
    }

    pub fn persist(&self, series: &[RateSnapshot]) -> anyhow::Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .context("failed to create temporary rate history file")?;
        {
            let mut wtr = csv::Writer::from_writer(tmp.as_file_mut());
            for s in series {
                wtr.serialize(RateRow {
                    date: s.date.format(DATE_FORMAT).to_string(),
                    year2: s.year2.filter(|v| !v.is_nan()),
                    year10: s.year10.filter(|v| !v.is_nan()),
                    year30: s.year30.filter(|v| !v.is_nan()),
                })
                .context("failed to serialize rate row")?;
            }
            wtr.flush().context("failed to flush rate history")?;
        }
        tmp.as_file_mut().flush()?;
        tmp.persist(&self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }

    /// Read-modify-write: merge `snapshot` into history, persist, and return the view.
    ///
    /// A persistence failure is logged and the in-memory view is still returned.
    pub fn upsert_and_query(&self, snapshot: RateSnapshot) -> RateView {
        let existing = self.load();
        let series = merge(existing, snapshot);

        if let Err(err) = self.persist(&series) {
            tracing::error!(
                path = %self.path.display(),
                error = %format!("{err:#}"),
                "failed to save rate history"
            );
        } else {
            tracing::debug!(rows = series.len(), path = %self.path.display(), "rate history saved");
        }

        compute_view(&series)
    }

    /// View over the stored history alone, without fetching or writing.
    pub fn query(&self) -> RateView {
        compute_view(&self.load())
    }
}

fn read_series(path: &Path) -> anyhow::Result<Vec<RateSnapshot>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut out = Vec::new();
    for (line, row) in rdr.deserialize::<RateRow>().enumerate() {
        let row = row.with_context(|| format!("invalid rate row {}", line + 1))?;
        out.push(RateSnapshot {
            date: parse_date(&row.date)?,
            year2: row.year2,
            year10: row.year10,
            year30: row.year30,
        });
    }

    // Normalise whatever order the file had.
    Ok(dedupe_sorted(out))
}

/// Accepts plain dates and date-times, so older exports with a time part still load.
pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, DATE_FORMAT) {
        return Ok(d);
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.date())
        .with_context(|| format!("unparseable date {s:?}"))
}

/// Upsert by date; the new snapshot wins on conflict.
pub fn merge(existing: Vec<RateSnapshot>, new: RateSnapshot) -> Vec<RateSnapshot> {
    let mut all = existing;
    all.push(new);
    dedupe_sorted(all)
}

// Later entries win; result is newest first.
fn dedupe_sorted(rows: Vec<RateSnapshot>) -> Vec<RateSnapshot> {
    let mut by_date = BTreeMap::new();
    for row in rows {
        by_date.insert(row.date, row);
    }
    by_date.into_values().rev().collect()
}

/// Row index used for the "last month" column.
///
/// Walks offsets from 30 calendar days back towards 1 and takes the first exact date hit.
pub fn last_month_index(series: &[RateSnapshot]) -> usize {
    let Some(current) = series.first() else {
        return IDX_LAST_MONTH_FALLBACK;
    };

    for days_back in (1..=LAST_MONTH_MAX_DAYS_BACK).rev() {
        let target = current.date - Duration::days(days_back);
        if let Some(idx) = series.iter().position(|s| s.date == target) {
            return idx;
        }
    }

    IDX_LAST_MONTH_FALLBACK
}

pub fn compute_view(series: &[RateSnapshot]) -> RateView {
    let idx_lm = last_month_index(series);
    let cell = |idx: usize, m: Maturity| -> RateCell {
        series
            .get(idx)
            .map(|s| RateCell::from(m.value(s)))
            .unwrap_or(RateCell::Missing)
    };

    let maturities = Maturity::ALL
        .iter()
        .map(|&m| {
            (
                m,
                MaturityView {
                    current: cell(IDX_CURRENT, m),
                    prev: cell(IDX_PREV, m),
                    five_day: cell(IDX_FIVE_DAY, m),
                    last_month: cell(idx_lm, m),
                },
            )
        })
        .collect();

    RateView {
        as_of: series.first().map(|s| s.date),
        maturities,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn snap(date: NaiveDate, y2: f64) -> RateSnapshot {
        RateSnapshot {
            date,
            year2: Some(y2),
            year10: Some(y2 + 0.5),
            year30: Some(y2 + 1.0),
        }
    }

    #[test]
    fn first_upsert_without_history_yields_single_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = RateHistoryStore::new(dir.path().join("treasury.csv"));

        let view = store.upsert_and_query(snap(d(2026, 1, 27), 4.1));
        let y2 = view.get(Maturity::Year2).unwrap();
        assert_eq!(y2.current, RateCell::Value(4.1));
        assert_eq!(y2.prev, RateCell::Missing);
        assert_eq!(y2.five_day, RateCell::Missing);
        assert_eq!(y2.last_month, RateCell::Missing);

        assert_eq!(store.load().len(), 1);
    }

    #[test]
    fn failed_persist_still_returns_view() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let store = RateHistoryStore::new(blocker.join("treasury.csv"));

        assert!(store.persist(&[snap(d(2026, 1, 27), 4.1)]).is_err());

        let view = store.upsert_and_query(snap(d(2026, 1, 27), 4.1));
        assert_eq!(view.as_of, Some(d(2026, 1, 27)));
        assert_eq!(view.get(Maturity::Year2).unwrap().current, RateCell::Value(4.1));
        assert!(store.load().is_empty());
    }

    #[test]
    fn same_date_upserted_twice_keeps_later_values() {
        let dir = tempfile::tempdir().unwrap();
        let store = RateHistoryStore::new(dir.path().join("treasury.csv"));

        store.upsert_and_query(snap(d(2026, 1, 26), 4.0));
        store.upsert_and_query(snap(d(2026, 1, 27), 4.1));
        let view = store.upsert_and_query(snap(d(2026, 1, 27), 4.3));

        let series = store.load();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].date, d(2026, 1, 27));
        assert_eq!(series[0].year2, Some(4.3));
        assert_eq!(view.get(Maturity::Year2).unwrap().prev, RateCell::Value(4.0));
    }

    #[test]
    fn persisted_series_is_unique_and_strictly_descending() {
        let dir = tempfile::tempdir().unwrap();
        let store = RateHistoryStore::new(dir.path().join("treasury.csv"));

        for day in [5u32, 1, 3, 5, 2, 4, 1] {
            store.upsert_and_query(snap(d(2026, 3, day), day as f64));
            let series = store.load();
            assert!(series.windows(2).all(|w| w[0].date > w[1].date));
        }
        assert_eq!(store.load().len(), 5);
    }

    #[test]
    fn persisted_file_uses_iso_dates_and_empty_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("treasury.csv");
        let store = RateHistoryStore::new(&path);
        store.upsert_and_query(RateSnapshot {
            date: d(2026, 1, 27),
            year2: Some(4.1),
            year10: None,
            year30: Some(4.9),
        });

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "date,year2,year10,year30\n2026-01-27,4.1,,4.9\n");
    }

    #[test]
    fn corrupt_history_is_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("treasury.csv");
        std::fs::write(&path, "date,year2,year10,year30\nnot-a-date,x,y,z\n").unwrap();

        let store = RateHistoryStore::new(&path);
        assert!(store.load().is_empty());

        let view = store.upsert_and_query(snap(d(2026, 1, 27), 4.1));
        assert_eq!(view.as_of, Some(d(2026, 1, 27)));
        assert_eq!(store.load().len(), 1);
    }

    #[test]
    fn last_month_prefers_exact_calendar_match() {
        let current = d(2026, 2, 27);
        let series = vec![snap(current, 4.5), snap(current - Duration::days(21), 3.9)];

        assert_eq!(last_month_index(&series), 1);
        let view = compute_view(&series);
        assert_eq!(
            view.get(Maturity::Year2).unwrap().last_month,
            RateCell::Value(3.9)
        );
    }

    #[test]
    fn last_month_takes_furthest_offset_first() {
        let current = d(2026, 2, 27);
        let series = vec![
            snap(current, 4.5),
            snap(current - Duration::days(10), 4.2),
            snap(current - Duration::days(28), 4.0),
        ];
        assert_eq!(last_month_index(&series), 2);
    }

    #[test]
    fn last_month_falls_back_to_fixed_row() {
        let current = d(2026, 6, 30);
        // 31..=60 days back: nothing inside the 1..=30 window.
        let mut series = vec![snap(current, 5.0)];
        for back in 31..=60 {
            series.push(snap(current - Duration::days(back), back as f64));
        }

        assert_eq!(last_month_index(&series), 21);
        let view = compute_view(&series);
        assert_eq!(
            view.get(Maturity::Year2).unwrap().last_month,
            RateCell::Value(series[21].year2.unwrap())
        );

        let short = vec![snap(current, 5.0), snap(current - Duration::days(45), 4.0)];
        let view = compute_view(&short);
        assert_eq!(view.get(Maturity::Year2).unwrap().last_month, RateCell::Missing);
    }

    #[test]
    fn query_reads_history_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("treasury.csv");
        std::fs::write(
            &path,
            "date,year2,year10,year30\n2026-01-26,4.0,4.5,5.0\n2026-01-27,4.1,4.6,5.1\n",
        )
        .unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        let view = RateHistoryStore::new(&path).query();
        assert_eq!(view.as_of, Some(d(2026, 1, 27)));
        assert_eq!(view.get(Maturity::Year10).unwrap().prev, RateCell::Value(4.5));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }
}
