//! Input readers: transaction and income CSVs plus the static position
//! metadata JSON.
//!
//! Data-shape problems recover locally. An unparsable numeric cell becomes
//! a null that downstream maths treats as zero contribution; a row missing
//! its settle date or position name cannot be keyed and is skipped; a file
//! whose header lacks the key columns produces an empty table, which the
//! report layer surfaces. Nothing here aborts the run.

use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use chrono::NaiveDate;
use csv::StringRecord;
use rust_decimal::Decimal;
use tracing::warn;

use crate::error::{FolioError, Result};
use crate::model::{IncomeEvent, PositionStatic, Trade};

/// A trade tagged with the position it belongs to.
#[derive(Debug, Clone)]
pub struct PositionTrade {
    pub position: String,
    pub trade: Trade,
}

/// An income event tagged with the position it belongs to.
#[derive(Debug, Clone)]
pub struct PositionIncome {
    pub position: String,
    pub event: IncomeEvent,
}

fn column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
}

fn cell<'a>(record: &'a StringRecord, col: Option<usize>) -> Option<&'a str> {
    col.and_then(|i| record.get(i)).map(str::trim)
}

fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::from_str(s).ok())
}

/// Numeric coercion: empty or unparsable cells become null, never an error.
fn parse_decimal(raw: Option<&str>, context: &str) -> Option<Decimal> {
    match raw {
        None | Some("") => None,
        Some(s) => match Decimal::from_str(s) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("unparsable numeric {:?} in {}, coerced to null", s, context);
                None
            }
        },
    }
}

/// Reads the transactions CSV. Expected columns (case-insensitive):
/// date, position, reference, quantity, value.
pub fn read_trades(path: &Path) -> Result<Vec<PositionTrade>> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| FolioError::Ingest(e.to_string()))
        .with_context(|| format!("failed to open transactions file {}", path.display()))?;
    let headers = reader.headers()?.clone();

    let date_col = column(&headers, "date");
    let position_col = column(&headers, "position");
    if date_col.is_none() || position_col.is_none() {
        warn!(
            "transactions file {} missing date/position columns, no rows read",
            path.display()
        );
        return Ok(Vec::new());
    }
    let reference_col = column(&headers, "reference");
    let quantity_col = column(&headers, "quantity");
    let value_col = column(&headers, "value");

    let mut trades = Vec::new();
    for record in reader.records() {
        let record = record?;
        let date = match parse_date(cell(&record, date_col)) {
            Some(date) => date,
            None => {
                warn!("transaction row with unusable date skipped");
                continue;
            }
        };
        let position = match cell(&record, position_col) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                warn!("transaction row on {} with no position skipped", date);
                continue;
            }
        };
        trades.push(PositionTrade {
            position,
            trade: Trade {
                date,
                reference: cell(&record, reference_col).unwrap_or("").to_string(),
                quantity: parse_decimal(cell(&record, quantity_col), "transactions.quantity"),
                value: parse_decimal(cell(&record, value_col), "transactions.value"),
            },
        });
    }
    Ok(trades)
}

/// Reads the income CSV. Expected columns (case-insensitive):
/// date, position, quantity, value.
pub fn read_income(path: &Path) -> Result<Vec<PositionIncome>> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| FolioError::Ingest(e.to_string()))
        .with_context(|| format!("failed to open income file {}", path.display()))?;
    let headers = reader.headers()?.clone();

    let date_col = column(&headers, "date");
    let position_col = column(&headers, "position");
    if date_col.is_none() || position_col.is_none() {
        warn!(
            "income file {} missing date/position columns, no rows read",
            path.display()
        );
        return Ok(Vec::new());
    }
    let quantity_col = column(&headers, "quantity");
    let value_col = column(&headers, "value");

    let mut events = Vec::new();
    for record in reader.records() {
        let record = record?;
        let date = match parse_date(cell(&record, date_col)) {
            Some(date) => date,
            None => {
                warn!("income row with unusable date skipped");
                continue;
            }
        };
        let position = match cell(&record, position_col) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };
        events.push(PositionIncome {
            position,
            event: IncomeEvent {
                date,
                quantity: parse_decimal(cell(&record, quantity_col), "income.quantity"),
                value: parse_decimal(cell(&record, value_col), "income.value"),
            },
        });
    }
    Ok(events)
}

/// Reads the static position metadata JSON (an array of entries).
pub fn read_statics(path: &Path) -> Result<Vec<PositionStatic>> {
    let raw = std::fs::read_to_string(path)
        .map_err(FolioError::Io)
        .with_context(|| format!("failed to read static file {}", path.display()))?;
    let statics: Vec<PositionStatic> = serde_json::from_str(&raw)
        .map_err(|e| FolioError::Schema(e.to_string()))
        .with_context(|| format!("malformed static file {}", path.display()))?;
    Ok(statics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{body}").unwrap();
        file
    }

    #[test]
    fn test_read_trades_basic() {
        let file = write_file(
            "date,position,reference,quantity,value\n\
             2024-01-08,Acme Fund,T1,10,100.50\n\
             2024-01-09,Acme Fund,L1,-4,39\n",
        );
        let trades = read_trades(file.path()).unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].position, "Acme Fund");
        assert_eq!(trades[0].trade.quantity, Some(dec!(10)));
        assert_eq!(trades[0].trade.value, Some(dec!(100.50)));
        assert_eq!(trades[1].trade.quantity, Some(dec!(-4)));
        assert_eq!(trades[1].trade.reference, "L1");
    }

    #[test]
    fn test_unparsable_numeric_coerces_to_null() {
        let file = write_file(
            "date,position,reference,quantity,value\n\
             2024-01-08,Acme,T1,ten,100\n",
        );
        let trades = read_trades(file.path()).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].trade.quantity, None);
        assert_eq!(trades[0].trade.value, Some(dec!(100)));
    }

    #[test]
    fn test_rows_without_keys_are_skipped() {
        let file = write_file(
            "date,position,reference,quantity,value\n\
             not-a-date,Acme,T1,1,1\n\
             2024-01-08,,T2,1,1\n\
             2024-01-09,Acme,T3,1,1\n",
        );
        let trades = read_trades(file.path()).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].trade.reference, "T3");
    }

    #[test]
    fn test_missing_key_column_yields_empty_table() {
        let file = write_file("date,reference,quantity,value\n2024-01-08,T1,1,1\n");
        let trades = read_trades(file.path()).unwrap();
        assert!(trades.is_empty());
    }

    #[test]
    fn test_missing_optional_column_coerces_to_null() {
        // no value column at all
        let file = write_file("date,position,reference,quantity\n2024-01-08,Acme,T1,5\n");
        let trades = read_trades(file.path()).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].trade.value, None);
    }

    #[test]
    fn test_read_income() {
        let file = write_file(
            "date,position,quantity,value\n\
             2024-01-09,Acme,0,5.25\n",
        );
        let income = read_income(file.path()).unwrap();
        assert_eq!(income.len(), 1);
        assert_eq!(income[0].event.value, Some(dec!(5.25)));
    }

    #[test]
    fn test_read_statics() {
        let file = write_file(
            r#"[
                {"name": "Acme Fund", "ticker": "ACME.L", "multiplier": 0.01},
                {"name": "Sterling Cash", "cash": true}
            ]"#,
        );
        let statics = read_statics(file.path()).unwrap();
        assert_eq!(statics.len(), 2);
        assert_eq!(statics[0].ticker.as_deref(), Some("ACME.L"));
        assert_eq!(statics[0].multiplier, dec!(0.01));
        assert!(statics[1].cash);
        assert_eq!(statics[1].multiplier, Decimal::ONE);
    }
}
