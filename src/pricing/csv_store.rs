//! File-backed price provider: one `<ticker>.csv` per instrument in a
//! directory, columns `date,close`. This is the thin stand-in for a live
//! market-data feed; the engine only ever sees the `PriceProvider` trait.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::warn;

use crate::error::{FolioError, Result};
use crate::model::{PricePoint, PriceSeries};
use crate::pricing::PriceProvider;

pub struct CsvPriceStore {
    dir: PathBuf,
}

impl CsvPriceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{ticker}.csv"))
    }

    fn read_series(path: &Path) -> Result<PriceSeries> {
        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| FolioError::Pricing(e.to_string()))
            .with_context(|| format!("failed to open price file {}", path.display()))?;
        let headers = reader.headers()?.clone();
        let date_col = headers.iter().position(|h| h.eq_ignore_ascii_case("date"));
        let close_col = headers.iter().position(|h| h.eq_ignore_ascii_case("close"));
        let (date_col, close_col) = match (date_col, close_col) {
            (Some(d), Some(c)) => (d, c),
            _ => {
                warn!("price file {} missing date/close columns", path.display());
                return Ok(PriceSeries::default());
            }
        };

        let mut points = Vec::new();
        for record in reader.records() {
            let record = record?;
            let date = record
                .get(date_col)
                .and_then(|s| NaiveDate::from_str(s.trim()).ok());
            let close = record
                .get(close_col)
                .and_then(|s| Decimal::from_str(s.trim()).ok());
            match (date, close) {
                (Some(date), Some(close)) => points.push(PricePoint { date, close }),
                _ => {
                    // bad cell: skip the row, never abort the series
                    warn!("unparsable price row in {}, skipped", path.display());
                }
            }
        }
        Ok(PriceSeries::from_points(points))
    }
}

impl PriceProvider for CsvPriceStore {
    fn get(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        multiplier: Decimal,
    ) -> Result<PriceSeries> {
        let path = self.path_for(ticker);
        if !path.exists() {
            warn!(
                "no price file for {}, returning zero placeholder {}..{}",
                ticker, start, end
            );
            return Ok(PriceSeries::placeholder(start, end));
        }
        // Zero closes are bad data, dropped before the builder's
        // forward-fill join. The placeholder above bypasses this on purpose.
        Ok(Self::read_series(&path)?
            .sanitized()
            .scaled(multiplier)
            .slice(start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::TempDir;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn write_prices(dir: &TempDir, ticker: &str, body: &str) {
        let mut file = std::fs::File::create(dir.path().join(format!("{ticker}.csv"))).unwrap();
        writeln!(file, "date,close").unwrap();
        write!(file, "{body}").unwrap();
    }

    #[test]
    fn test_reads_scales_and_slices() {
        let dir = TempDir::new().unwrap();
        write_prices(&dir, "ACME", "2024-01-08,100\n2024-01-09,110\n2024-01-10,120\n");
        let store = CsvPriceStore::new(dir.path());

        let series = store.get("ACME", d(9), d(10), dec!(0.01)).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[0].close, dec!(1.10));
        assert_eq!(series.points()[1].close, dec!(1.20));
    }

    #[test]
    fn test_zero_closes_dropped() {
        let dir = TempDir::new().unwrap();
        write_prices(&dir, "ACME", "2024-01-08,100\n2024-01-09,0\n2024-01-10,120\n");
        let store = CsvPriceStore::new(dir.path());

        let series = store.get("ACME", d(8), d(10), Decimal::ONE).unwrap();
        assert_eq!(series.len(), 2);
        assert!(series.points().iter().all(|p| p.close != Decimal::ZERO));
    }

    #[test]
    fn test_bad_rows_skipped_not_fatal() {
        let dir = TempDir::new().unwrap();
        write_prices(&dir, "ACME", "2024-01-08,100\nnot-a-date,110\n2024-01-10,oops\n");
        let store = CsvPriceStore::new(dir.path());

        let series = store.get("ACME", d(8), d(10), Decimal::ONE).unwrap();
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn test_missing_file_yields_placeholder() {
        let dir = TempDir::new().unwrap();
        let store = CsvPriceStore::new(dir.path());

        let series = store.get("GLOBEX", d(8), d(10), Decimal::ONE).unwrap();
        assert_eq!(series.len(), 3); // Mon..Wed
        assert!(series.points().iter().all(|p| p.close == Decimal::ZERO));
    }
}
