use anyhow::Context;
use std::path::Path;

/// Reads the static symbol universe.
///
/// Uses the `Symbol` column when present (case-insensitive), otherwise the first column.
pub fn read_universe(path: &Path) -> anyhow::Result<Vec<String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open universe file {}", path.display()))?;

    let headers = rdr.headers().context("failed to read universe header")?.clone();
    let column = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("symbol"))
        .unwrap_or(0);

    let mut out = Vec::new();
    for record in rdr.records() {
        let record = record.context("invalid universe row")?;
        if let Some(symbol) = record.get(column) {
            let symbol = symbol.trim();
            if !symbol.is_empty() {
                out.push(symbol.to_string());
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_symbol_column_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("u.csv");
        std::fs::write(&path, "Name,Symbol\nApple,AAPL\nBlank,\nMicrosoft,MSFT\n").unwrap();
        assert_eq!(read_universe(&path).unwrap(), vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn falls_back_to_first_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("u.csv");
        std::fs::write(&path, "ticker,weight\nNVDA,0.07\nAMZN,0.04\n").unwrap();
        assert_eq!(read_universe(&path).unwrap(), vec!["NVDA", "AMZN"]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_universe(&dir.path().join("absent.csv")).is_err());
    }
}
