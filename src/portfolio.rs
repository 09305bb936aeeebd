//! Portfolio assembler: concatenates per-position holding records into one
//! long table and derives the cross-sectional measures: per-date totals,
//! position weights and the daily summary.
//!
//! Ordering contract: every function here sorts or expects rows sorted by
//! (settle date, position name). Sequence-dependent maths downstream
//! (prefix products, shifts, rolling windows) silently breaks otherwise.

use std::collections::HashMap;

use chrono::NaiveDate;
use itertools::Itertools;
use rust_decimal::Decimal;
use tracing::debug;

use crate::holdings::HoldingRow;

/// A holding row augmented with its portfolio weight and the return
/// measures filled in by the returns engine. Undefined cells stay `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionDay {
    pub holding: HoldingRow,
    /// market value / total market value that day, x100. None on days with
    /// zero total market value or while market value is undefined.
    pub weight_pct: Option<Decimal>,
    pub daily_return_pct: Option<Decimal>,
    /// daily return x weight / 100: this position's contribution to the
    /// portfolio's daily return.
    pub portfolio_return_pct: Option<Decimal>,
    /// Chain-linked own daily returns since inception.
    pub itd_return_pct: Option<Decimal>,
    /// ITD return x weight / 100.
    pub portfolio_itd_return_pct: Option<Decimal>,
    /// Chain-linked weighted daily returns since inception.
    pub cum_portfolio_return_pct: Option<Decimal>,
    pub ann_itd_return_pct: Option<Decimal>,
    pub one_year_pct: Option<Decimal>,
    pub three_year_pct: Option<Decimal>,
    pub five_year_pct: Option<Decimal>,
}

impl PositionDay {
    fn new(holding: HoldingRow, weight_pct: Option<Decimal>) -> Self {
        Self {
            holding,
            weight_pct,
            daily_return_pct: None,
            portfolio_return_pct: None,
            itd_return_pct: None,
            portfolio_itd_return_pct: None,
            cum_portfolio_return_pct: None,
            ann_itd_return_pct: None,
            one_year_pct: None,
            five_year_pct: None,
            three_year_pct: None,
        }
    }
}

/// Cross-sectional sums for one settle date, plus the portfolio-level
/// return measures filled in by the returns engine.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySummaryRow {
    pub date: NaiveDate,
    pub capital: Decimal,
    pub book_cost: Decimal,
    /// Sum of defined market values; null cells contribute zero.
    pub market_value: Decimal,
    pub income: Decimal,
    pub itd_pnl: Decimal,
    pub portfolio_return_pct: Option<Decimal>,
    pub itd_return_pct: Option<Decimal>,
    pub ann_itd_return_pct: Option<Decimal>,
    pub one_year_pct: Option<Decimal>,
    pub three_year_pct: Option<Decimal>,
    pub five_year_pct: Option<Decimal>,
}

/// Concatenates per-position series into one long table ordered by
/// (settle date, position name).
pub fn assemble(holdings: Vec<Vec<HoldingRow>>) -> Vec<HoldingRow> {
    let mut rows: Vec<HoldingRow> = holdings.into_iter().flatten().collect();
    rows.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.position.cmp(&b.position)));
    rows
}

/// Total defined market value per settle date.
fn total_market_value_by_date(rows: &[HoldingRow]) -> HashMap<NaiveDate, Decimal> {
    let mut totals: HashMap<NaiveDate, Decimal> = HashMap::new();
    for row in rows {
        if let Some(mv) = row.market_value {
            *totals.entry(row.date).or_insert(Decimal::ZERO) += mv;
        }
    }
    totals
}

/// Attaches weight % to each row. A day whose total market value is zero
/// (all positions closed or unpriced) yields null weights rather than an
/// error; consumers treat null weight as zero contribution.
pub fn attach_weights(rows: Vec<HoldingRow>) -> Vec<PositionDay> {
    let totals = total_market_value_by_date(&rows);
    rows.into_iter()
        .map(|holding| {
            let weight = match (holding.market_value, totals.get(&holding.date)) {
                (Some(mv), Some(total)) if *total != Decimal::ZERO => {
                    Some(mv / total * Decimal::ONE_HUNDRED)
                }
                (Some(_), Some(_)) => {
                    debug!("zero total market value on {}, weight undefined", holding.date);
                    None
                }
                _ => None,
            };
            PositionDay::new(holding, weight)
        })
        .collect()
}

/// Groups the long table by settle date and sums the stock/flow measures.
/// The portfolio return is the sum of per-position weighted contributions;
/// it is `None` only when no position carries a computed contribution.
pub fn daily_summary(days: &[PositionDay]) -> Vec<DailySummaryRow> {
    days.iter()
        .chunk_by(|day| day.holding.date)
        .into_iter()
        .map(|(date, group)| {
            let mut row = DailySummaryRow {
                date,
                capital: Decimal::ZERO,
                book_cost: Decimal::ZERO,
                market_value: Decimal::ZERO,
                income: Decimal::ZERO,
                itd_pnl: Decimal::ZERO,
                portfolio_return_pct: None,
                itd_return_pct: None,
                ann_itd_return_pct: None,
                one_year_pct: None,
                three_year_pct: None,
                five_year_pct: None,
            };
            for day in group {
                row.capital += day.holding.capital;
                row.book_cost += day.holding.book_cost;
                row.market_value += day.holding.market_value.unwrap_or(Decimal::ZERO);
                row.income += day.holding.income;
                row.itd_pnl += day.holding.itd_pnl;
                if let Some(contribution) = day.portfolio_return_pct {
                    row.portfolio_return_pct =
                        Some(row.portfolio_return_pct.unwrap_or(Decimal::ZERO) + contribution);
                }
            }
            row
        })
        .collect()
}
