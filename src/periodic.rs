//! Periodic aggregator: resamples the daily portfolio summary to coarser
//! calendar buckets with OHLC semantics on market value.
//!
//! Book cost takes the period max (peak exposure), capital and the
//! point-in-time measures (ITD PnL, composite returns) take the last
//! value, income sums. Periods with no underlying daily rows are simply
//! absent from the output.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use itertools::Itertools;
use rust_decimal::Decimal;

use crate::portfolio::DailySummaryRow;

/// Resampling bucket width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Periodicity {
    Weekly,
    Monthly,
    Quarterly,
    Annual,
}

/// One resampled period of the portfolio summary.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodRow {
    /// Calendar end of the bucket (month/quarter/year end; Sunday for
    /// weekly buckets), not the last trading day within it.
    pub period_end: NaiveDate,
    pub book_cost: Decimal,
    pub capital: Decimal,
    pub open_market_value: Decimal,
    pub high_market_value: Decimal,
    pub low_market_value: Decimal,
    pub close_market_value: Decimal,
    pub income: Decimal,
    pub itd_pnl: Decimal,
    pub itd_return_pct: Option<Decimal>,
    pub ann_itd_return_pct: Option<Decimal>,
    pub one_year_pct: Option<Decimal>,
    pub three_year_pct: Option<Decimal>,
    pub five_year_pct: Option<Decimal>,
}

fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.checked_sub_days(Days::new(1)))
        .expect("valid month arithmetic")
}

/// Calendar end of the bucket containing `date`.
pub fn period_end(date: NaiveDate, periodicity: Periodicity) -> NaiveDate {
    match periodicity {
        Periodicity::Weekly => {
            let to_sunday = Weekday::Sun.num_days_from_monday()
                - date.weekday().num_days_from_monday();
            date.checked_add_days(Days::new(u64::from(to_sunday)))
                .expect("valid week arithmetic")
        }
        Periodicity::Monthly => last_day_of_month(date.year(), date.month()),
        Periodicity::Quarterly => {
            let quarter_end_month = ((date.month() - 1) / 3) * 3 + 3;
            last_day_of_month(date.year(), quarter_end_month)
        }
        Periodicity::Annual => last_day_of_month(date.year(), 12),
    }
}

/// Resamples a date-sorted daily summary into `periodicity` buckets.
pub fn resample(summary: &[DailySummaryRow], periodicity: Periodicity) -> Vec<PeriodRow> {
    summary
        .iter()
        .chunk_by(|row| period_end(row.date, periodicity))
        .into_iter()
        .map(|(end, group)| {
            let rows: Vec<&DailySummaryRow> = group.collect();
            let first = rows.first().expect("chunk is non-empty");
            let last = rows.last().expect("chunk is non-empty");
            PeriodRow {
                period_end: end,
                book_cost: rows.iter().map(|r| r.book_cost).max().unwrap_or(Decimal::ZERO),
                capital: last.capital,
                open_market_value: first.market_value,
                high_market_value: rows
                    .iter()
                    .map(|r| r.market_value)
                    .max()
                    .unwrap_or(Decimal::ZERO),
                low_market_value: rows
                    .iter()
                    .map(|r| r.market_value)
                    .min()
                    .unwrap_or(Decimal::ZERO),
                close_market_value: last.market_value,
                income: rows.iter().map(|r| r.income).sum(),
                itd_pnl: last.itd_pnl,
                itd_return_pct: last.itd_return_pct,
                ann_itd_return_pct: last.ann_itd_return_pct,
                one_year_pct: last.one_year_pct,
                three_year_pct: last.three_year_pct,
                five_year_pct: last.five_year_pct,
            }
        })
        .collect()
}
