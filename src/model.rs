//! Typed records for the analytics engine.
//!
//! The source data for a run is three event streams keyed by settle date
//! (trades, income events and close prices) plus static per-position
//! metadata. Every component boundary exchanges these explicit records
//! rather than loosely-labelled columns.
//!
//! Cells that can legitimately be undefined (no price yet, degenerate
//! division, insufficient history) are `Option<Decimal>` and stay `None`;
//! downstream consumers treat a null cell as zero contribution.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calendar;

/// A single buy or sell. `quantity` is signed (buys positive); `value` is
/// the absolute cash amount as recorded, signed later by the quantity's
/// sign, not its own.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub date: NaiveDate,
    /// Broker reference/memo. Capital movements (lodgements, subscriptions)
    /// are identified by this tag.
    pub reference: String,
    pub quantity: Option<Decimal>,
    pub value: Option<Decimal>,
}

/// A dividend/interest event. `quantity` tracks reinvested units.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomeEvent {
    pub date: NaiveDate,
    pub quantity: Option<Decimal>,
    pub value: Option<Decimal>,
}

/// One close price on one trading day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: Decimal,
}

/// A date-sorted close-price series for one instrument. Days with no
/// trading are simply absent; the holding builder forward-fills across
/// them after the join.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series from unordered points; sorts by date and keeps the
    /// last point for any duplicated date.
    pub fn from_points(mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        points.dedup_by(|later, earlier| {
            if later.date == earlier.date {
                earlier.close = later.close;
                true
            } else {
                false
            }
        });
        Self { points }
    }

    /// All-zero placeholder spanning the business days of `[start, end]`,
    /// returned by providers for unfetchable instruments. Flows through the
    /// builder as ordinary data and values the position at zero.
    pub fn placeholder(start: NaiveDate, end: NaiveDate) -> Self {
        let points = calendar::business_days(start, end)
            .into_iter()
            .map(|date| PricePoint {
                date,
                close: Decimal::ZERO,
            })
            .collect();
        Self { points }
    }

    /// Constant-value series over a date grid. Cash positions are priced
    /// this way at 1.0.
    pub fn constant(dates: &[NaiveDate], close: Decimal) -> Self {
        let points = dates.iter().map(|&date| PricePoint { date, close }).collect();
        Self { points }
    }

    /// Drops `close == 0` rows: a zero close is missing/bad data, excluded
    /// before the forward-fill join. Providers apply this to fetched data;
    /// the all-zero placeholder deliberately bypasses it.
    pub fn sanitized(&self) -> Self {
        Self {
            points: self
                .points
                .iter()
                .copied()
                .filter(|p| p.close != Decimal::ZERO)
                .collect(),
        }
    }

    /// Scales every close by `multiplier` (e.g. pence-quoted instruments).
    pub fn scaled(&self, multiplier: Decimal) -> Self {
        Self {
            points: self
                .points
                .iter()
                .map(|p| PricePoint {
                    date: p.date,
                    close: p.close * multiplier,
                })
                .collect(),
        }
    }

    /// Sub-series within `[start, end]`.
    pub fn slice(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            points: self
                .points
                .iter()
                .copied()
                .filter(|p| p.date >= start && p.date <= end)
                .collect(),
        }
    }

    /// Merges two series; `other` wins on duplicated dates.
    pub fn merged(&self, other: &PriceSeries) -> Self {
        let mut points = self.points.clone();
        points.extend(other.points.iter().copied());
        Self::from_points(points)
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// True when the series spans the whole of `[start, end]`.
    pub fn covers(&self, start: NaiveDate, end: NaiveDate) -> bool {
        match (self.first_date(), self.last_date()) {
            (Some(first), Some(last)) => first <= start && last >= end,
            _ => false,
        }
    }
}

/// Static per-position metadata from the portfolio's JSON sidecar file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionStatic {
    pub name: String,
    #[serde(default)]
    pub ticker: Option<String>,
    /// Price multiplier applied to the fetched series (pence -> pounds).
    #[serde(default = "default_multiplier")]
    pub multiplier: Decimal,
    /// Cash positions are valued at a constant unit price of 1.0.
    #[serde(default)]
    pub cash: bool,
}

fn default_multiplier() -> Decimal {
    Decimal::ONE
}

/// How inception-to-date PnL accumulates.
///
/// The source system carries two formulations and it is not clear which is
/// intended, so both are exposed and the caller picks (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItdPnlMode {
    /// Cumulative sum of (day PnL + income). Default.
    #[default]
    BridgedDaily,
    /// Cumulative sum of income alone, ignoring market moves. Reproduced
    /// as-is for reconciliation against outputs that used it.
    IncomeOnly,
}

/// Which daily-return formulation the returns engine applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnBasis {
    /// (MV_t - MV_{t-1}) / BookCost_{t-1}. Default.
    #[default]
    BookCost,
    /// ((Close_t - Close_{t-1}) + IncomePerShare_t) / Close_{t-1}, with the
    /// prior close back-filled only at the very start of the series.
    CloseIncome,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn pt(date: NaiveDate, close: Decimal) -> PricePoint {
        PricePoint { date, close }
    }

    #[test]
    fn test_from_points_sorts_and_dedupes_keeping_last() {
        let series = PriceSeries::from_points(vec![
            pt(d(2024, 1, 3), dec!(3)),
            pt(d(2024, 1, 2), dec!(2)),
            pt(d(2024, 1, 2), dec!(9)),
        ]);
        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[0], pt(d(2024, 1, 2), dec!(9)));
        assert_eq!(series.points()[1], pt(d(2024, 1, 3), dec!(3)));
    }

    #[test]
    fn test_sanitized_drops_zero_closes() {
        let series = PriceSeries::from_points(vec![
            pt(d(2024, 1, 2), dec!(2)),
            pt(d(2024, 1, 3), Decimal::ZERO),
            pt(d(2024, 1, 4), dec!(4)),
        ]);
        let clean = series.sanitized();
        assert_eq!(clean.len(), 2);
        assert!(clean.points().iter().all(|p| p.close != Decimal::ZERO));
    }

    #[test]
    fn test_placeholder_spans_business_days_at_zero() {
        // Thu .. Mon = Thu, Fri, Mon
        let series = PriceSeries::placeholder(d(2024, 1, 4), d(2024, 1, 8));
        assert_eq!(series.len(), 3);
        assert!(series.points().iter().all(|p| p.close == Decimal::ZERO));
    }

    #[test]
    fn test_merged_prefers_other_on_duplicates() {
        let a = PriceSeries::from_points(vec![pt(d(2024, 1, 2), dec!(2))]);
        let b = PriceSeries::from_points(vec![
            pt(d(2024, 1, 2), dec!(5)),
            pt(d(2024, 1, 3), dec!(6)),
        ]);
        let merged = a.merged(&b);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.points()[0].close, dec!(5));
    }

    #[test]
    fn test_covers_and_slice() {
        let series = PriceSeries::from_points(vec![
            pt(d(2024, 1, 2), dec!(2)),
            pt(d(2024, 1, 5), dec!(5)),
        ]);
        assert!(series.covers(d(2024, 1, 2), d(2024, 1, 5)));
        assert!(!series.covers(d(2024, 1, 1), d(2024, 1, 5)));
        let sliced = series.slice(d(2024, 1, 3), d(2024, 1, 5));
        assert_eq!(sliced.len(), 1);
        assert_eq!(sliced.first_date(), Some(d(2024, 1, 5)));
    }

    #[test]
    fn test_static_defaults() {
        let parsed: PositionStatic =
            serde_json::from_str(r#"{"name": "Acme Fund"}"#).unwrap();
        assert_eq!(parsed.multiplier, Decimal::ONE);
        assert!(!parsed.cash);
        assert!(parsed.ticker.is_none());
    }
}
