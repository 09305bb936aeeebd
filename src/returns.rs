//! Returns engine: single-day returns per position, portfolio-weighted
//! contributions, and the composite family (ITD, annualised ITD, trailing
//! 1/3/5-year) chain-linked from daily returns.
//!
//! Chain-linking is multiplicative (the cumulative product of 1 + r),
//! never an additive sum. Every percentage is stored as 100x the fraction.
//! Degenerate cells (zero divisor, non-real power) are null, not zero;
//! composite windows are null until enough history exists.

use std::collections::HashMap;

use rust_decimal::{Decimal, MathematicalOps};

use crate::calendar::business_days_between;
use crate::model::ReturnBasis;
use crate::portfolio::{DailySummaryRow, PositionDay};

/// Assumed trading days per year for annualisation and window sizing.
pub const TRADING_DAYS_PER_YEAR: i64 = 260;

/// Multiplicative growth factor for a percent return.
fn growth_factor(r_pct: Decimal) -> Decimal {
    Decimal::ONE + r_pct / Decimal::ONE_HUNDRED
}

/// 100 x (factor - 1).
fn factor_to_pct(factor: Decimal) -> Decimal {
    (factor - Decimal::ONE) * Decimal::ONE_HUNDRED
}

/// Raises a cumulative growth (in percent) to `exponent` and re-expresses
/// it as a percent. None when the power is not real (growth below -100%).
fn annualize_pct(growth_pct: Decimal, exponent: f64) -> Option<Decimal> {
    growth_factor(growth_pct)
        .checked_powf(exponent)
        .map(factor_to_pct)
}

/// Index lists per position, preserving the (date, position) sort so each
/// list is that position's own date-ordered sub-sequence. Returns never
/// cross position boundaries.
fn indices_by_position(days: &[PositionDay]) -> Vec<Vec<usize>> {
    let mut order: Vec<&str> = Vec::new();
    let mut map: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, day) in days.iter().enumerate() {
        let name = day.holding.position.as_str();
        if !map.contains_key(name) {
            order.push(name);
        }
        map.entry(name).or_default().push(i);
    }
    order.into_iter().filter_map(|name| map.remove(name)).collect()
}

fn daily_return(days: &[PositionDay], idx: &[usize], pos: usize, basis: ReturnBasis) -> Option<Decimal> {
    let row = &days[idx[pos]].holding;
    match basis {
        ReturnBasis::BookCost => {
            if pos == 0 {
                // first observation has no prior value: return 0, not null
                return Some(Decimal::ZERO);
            }
            let prev = &days[idx[pos - 1]].holding;
            match (row.market_value, prev.market_value) {
                (Some(mv), Some(prev_mv)) => {
                    if prev.book_cost == Decimal::ZERO {
                        None
                    } else {
                        Some((mv - prev_mv) / prev.book_cost * Decimal::ONE_HUNDRED)
                    }
                }
                // undefined market value on either side contributes nothing
                _ => Some(Decimal::ZERO),
            }
        }
        ReturnBasis::CloseIncome => {
            let close = row.close?;
            // prior close back-fills only at the very start of the series
            let prev_close = if pos == 0 {
                close
            } else {
                match days[idx[pos - 1]].holding.close {
                    Some(c) => c,
                    None => close,
                }
            };
            if prev_close == Decimal::ZERO {
                return None;
            }
            let income_per_share = if row.income_qty > Decimal::ZERO {
                row.income / row.income_qty
            } else {
                Decimal::ZERO
            };
            Some(((close - prev_close) + income_per_share) / prev_close * Decimal::ONE_HUNDRED)
        }
    }
}

/// Fills in daily returns, weighted contributions and the chain-linked ITD
/// measures for every position. `days` must already be sorted by
/// (settle date, position name) with weights attached.
pub fn compute_returns(days: &mut [PositionDay], basis: ReturnBasis) {
    let groups = indices_by_position(days);
    for idx in groups {
        let mut own_factor = Decimal::ONE;
        let mut weighted_factor = Decimal::ONE;
        for pos in 0..idx.len() {
            let r = daily_return(days, &idx, pos, basis);

            let weight = days[idx[pos]].weight_pct;
            let contribution = match (r, weight) {
                (Some(r), Some(w)) => Some(r * w / Decimal::ONE_HUNDRED),
                // null weight means zero contribution, not a poisoned cell
                (Some(_), None) => Some(Decimal::ZERO),
                (None, _) => None,
            };

            if let Some(r) = r {
                own_factor *= growth_factor(r);
            }
            if let Some(c) = contribution {
                weighted_factor *= growth_factor(c);
            }

            let itd = factor_to_pct(own_factor);
            let day = &mut days[idx[pos]];
            day.daily_return_pct = r;
            day.portfolio_return_pct = contribution;
            day.itd_return_pct = Some(itd);
            day.portfolio_itd_return_pct = match weight {
                Some(w) => Some(itd * w / Decimal::ONE_HUNDRED),
                None => Some(Decimal::ZERO),
            };
            day.cum_portfolio_return_pct = Some(factor_to_pct(weighted_factor));
        }
    }
}

/// Chain-links a contiguous window of percent returns into one percent.
fn window_growth_pct(returns: &[Option<Decimal>]) -> Decimal {
    let factor = returns
        .iter()
        .map(|r| growth_factor(r.unwrap_or(Decimal::ZERO)))
        .product::<Decimal>();
    factor_to_pct(factor)
}

/// Trailing N-year annualised return at `pos`, or None while fewer than
/// 260 x N observations exist.
fn trailing_pct(returns: &[Option<Decimal>], pos: usize, years: u32) -> Option<Decimal> {
    let window = (TRADING_DAYS_PER_YEAR as usize) * years as usize;
    if pos + 1 < window {
        return None;
    }
    let windowed = window_growth_pct(&returns[pos + 1 - window..=pos]);
    annualize_pct(windowed, 1.0 / f64::from(years))
}

/// Annualised ITD: the ITD growth raised to 260 / business-days-since-
/// inception, denominator floored at 1 so day one never divides by zero.
fn annualized_itd_pct(
    itd_pct: Decimal,
    first_date: chrono::NaiveDate,
    date: chrono::NaiveDate,
) -> Option<Decimal> {
    let elapsed = business_days_between(first_date, date).max(1);
    annualize_pct(itd_pct, TRADING_DAYS_PER_YEAR as f64 / elapsed as f64)
}

/// Composite returns per position, chain-linking each position's weighted
/// daily return series over its full history and over trailing windows.
pub fn position_composites(days: &mut [PositionDay]) {
    let groups = indices_by_position(days);
    for idx in groups {
        let returns: Vec<Option<Decimal>> =
            idx.iter().map(|&i| days[i].portfolio_return_pct).collect();
        let first_date = days[idx[0]].holding.date;

        let mut factor = Decimal::ONE;
        for pos in 0..idx.len() {
            factor *= growth_factor(returns[pos].unwrap_or(Decimal::ZERO));
            let itd = factor_to_pct(factor);
            let date = days[idx[pos]].holding.date;

            let day = &mut days[idx[pos]];
            day.cum_portfolio_return_pct = Some(itd);
            day.ann_itd_return_pct = annualized_itd_pct(itd, first_date, date);
            day.one_year_pct = trailing_pct(&returns, pos, 1);
            day.three_year_pct = trailing_pct(&returns, pos, 3);
            day.five_year_pct = trailing_pct(&returns, pos, 5);
        }
    }
}

/// Composite returns at the portfolio level, from the daily summary's
/// weighted-sum return series (missing returns count as zero).
pub fn portfolio_composites(summary: &mut [DailySummaryRow]) {
    if summary.is_empty() {
        return;
    }
    let returns: Vec<Option<Decimal>> =
        summary.iter().map(|row| row.portfolio_return_pct).collect();
    let first_date = summary[0].date;

    let mut factor = Decimal::ONE;
    for pos in 0..summary.len() {
        factor *= growth_factor(returns[pos].unwrap_or(Decimal::ZERO));
        let itd = factor_to_pct(factor);
        let date = summary[pos].date;

        let row = &mut summary[pos];
        row.itd_return_pct = Some(itd);
        row.ann_itd_return_pct = annualized_itd_pct(itd, first_date, date);
        row.one_year_pct = trailing_pct(&returns, pos, 1);
        row.three_year_pct = trailing_pct(&returns, pos, 3);
        row.five_year_pct = trailing_pct(&returns, pos, 5);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::business_days;
    use crate::holdings::HoldingRow;
    use crate::portfolio::{assemble, attach_weights};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn holding(
        date: NaiveDate,
        position: &str,
        book_cost: Decimal,
        market_value: Decimal,
    ) -> HoldingRow {
        HoldingRow {
            date,
            position: position.to_string(),
            capital: Decimal::ZERO,
            quantity: dec!(1),
            book_cost,
            income_qty: Decimal::ZERO,
            income: Decimal::ZERO,
            close: Some(market_value),
            market_value: Some(market_value),
            day_pnl: Decimal::ZERO,
            itd_pnl: Decimal::ZERO,
        }
    }

    fn summary_row(date: NaiveDate, r: Option<Decimal>) -> DailySummaryRow {
        DailySummaryRow {
            date,
            capital: Decimal::ZERO,
            book_cost: Decimal::ZERO,
            market_value: Decimal::ZERO,
            income: Decimal::ZERO,
            itd_pnl: Decimal::ZERO,
            portfolio_return_pct: r,
            itd_return_pct: None,
            ann_itd_return_pct: None,
            one_year_pct: None,
            three_year_pct: None,
            five_year_pct: None,
        }
    }

    #[test]
    fn test_first_observation_returns_zero_not_null() {
        let rows = assemble(vec![vec![holding(d(8), "Alpha", dec!(100), dec!(110))]]);
        let mut days = attach_weights(rows);
        compute_returns(&mut days, ReturnBasis::BookCost);
        assert_eq!(days[0].daily_return_pct, Some(Decimal::ZERO));
    }

    #[test]
    fn test_daily_return_book_cost_basis() {
        let rows = assemble(vec![vec![
            holding(d(8), "Alpha", dec!(100), dec!(100)),
            holding(d(9), "Alpha", dec!(100), dec!(104)),
        ]]);
        let mut days = attach_weights(rows);
        compute_returns(&mut days, ReturnBasis::BookCost);
        // (104 - 100) / 100 x 100 = 4%
        assert_eq!(days[1].daily_return_pct, Some(dec!(4)));
    }

    #[test]
    fn test_zero_prior_book_cost_is_null_not_zero() {
        let rows = assemble(vec![vec![
            holding(d(8), "Alpha", Decimal::ZERO, dec!(100)),
            holding(d(9), "Alpha", dec!(100), dec!(104)),
        ]]);
        let mut days = attach_weights(rows);
        compute_returns(&mut days, ReturnBasis::BookCost);
        assert_eq!(days[1].daily_return_pct, None);
    }

    #[test]
    fn test_returns_never_cross_position_boundaries() {
        let rows = assemble(vec![
            vec![
                holding(d(8), "Alpha", dec!(100), dec!(100)),
                holding(d(9), "Alpha", dec!(100), dec!(102)),
            ],
            vec![holding(d(9), "Beta", dec!(50), dec!(500))],
        ]);
        let mut days = attach_weights(rows);
        compute_returns(&mut days, ReturnBasis::BookCost);
        let beta = days.iter().find(|x| x.holding.position == "Beta").unwrap();
        // Beta's single row is a first observation regardless of Alpha
        assert_eq!(beta.daily_return_pct, Some(Decimal::ZERO));
    }

    #[test]
    fn test_close_income_basis() {
        let mut first = holding(d(8), "Alpha", dec!(100), dec!(100));
        first.close = Some(dec!(100));
        let mut second = holding(d(9), "Alpha", dec!(100), dec!(102));
        second.close = Some(dec!(102));
        second.income_qty = dec!(1);
        second.income = dec!(1);

        let rows = assemble(vec![vec![first, second]]);
        let mut days = attach_weights(rows);
        compute_returns(&mut days, ReturnBasis::CloseIncome);
        // start-only back-fill: day one compares the close to itself
        assert_eq!(days[0].daily_return_pct, Some(Decimal::ZERO));
        // ((102 - 100) + 1) / 100 x 100 = 3%
        assert_eq!(days[1].daily_return_pct, Some(dec!(3)));
    }

    #[test]
    fn test_weighted_contribution_uses_weight_over_one_hundred() {
        // Two positions, 25% / 75% by market value on day two.
        let rows = assemble(vec![
            vec![
                holding(d(8), "Alpha", dec!(100), dec!(100)),
                holding(d(9), "Alpha", dec!(100), dec!(110)),
            ],
            vec![
                holding(d(8), "Beta", dec!(300), dec!(300)),
                holding(d(9), "Beta", dec!(300), dec!(330)),
            ],
        ]);
        let mut days = attach_weights(rows);
        compute_returns(&mut days, ReturnBasis::BookCost);

        let alpha = days
            .iter()
            .find(|x| x.holding.position == "Alpha" && x.holding.date == d(9))
            .unwrap();
        // daily 10%, weight 25% -> contribution 2.5
        assert_eq!(alpha.weight_pct, Some(dec!(25)));
        assert_eq!(alpha.portfolio_return_pct, Some(dec!(2.5)));

        let beta = days
            .iter()
            .find(|x| x.holding.position == "Beta" && x.holding.date == d(9))
            .unwrap();
        assert_eq!(beta.portfolio_return_pct, Some(dec!(7.5)));
    }

    #[test]
    fn test_null_weight_is_zero_contribution() {
        let mut row = holding(d(8), "Alpha", dec!(100), dec!(100));
        row.market_value = Some(Decimal::ZERO);
        row.close = Some(Decimal::ZERO);
        let rows = assemble(vec![vec![row]]);
        let mut days = attach_weights(rows);
        assert_eq!(days[0].weight_pct, None);
        compute_returns(&mut days, ReturnBasis::BookCost);
        assert_eq!(days[0].portfolio_return_pct, Some(Decimal::ZERO));
    }

    #[test]
    fn test_chain_link_worked_example() {
        // Daily returns 10%, -5%, 2% must compound to 6.59%, not sum to 7%.
        let dates = business_days(d(8), d(10));
        let mut summary: Vec<DailySummaryRow> = vec![
            summary_row(dates[0], Some(dec!(10))),
            summary_row(dates[1], Some(dec!(-5))),
            summary_row(dates[2], Some(dec!(2))),
        ];
        portfolio_composites(&mut summary);
        assert_eq!(summary[2].itd_return_pct, Some(dec!(6.5900)));
        assert_ne!(summary[2].itd_return_pct, Some(dec!(7)));
    }

    #[test]
    fn test_missing_summary_returns_count_as_zero() {
        let mut summary = vec![
            summary_row(d(8), Some(dec!(10))),
            summary_row(d(9), None),
            summary_row(d(10), Some(dec!(10))),
        ];
        portfolio_composites(&mut summary);
        // 1.1 x 1.0 x 1.1 - 1 = 21%
        assert_eq!(summary[2].itd_return_pct, Some(dec!(21.000)));
    }

    #[test]
    fn test_annualization_floor_on_day_one() {
        let mut summary = vec![summary_row(d(8), Some(dec!(5)))];
        portfolio_composites(&mut summary);
        // zero business days elapsed floors to 1; must be defined, no panic
        assert!(summary[0].ann_itd_return_pct.is_some());
    }

    #[test]
    fn test_trailing_windows_null_until_enough_history() {
        // 261 business days of flat zero returns.
        let dates = business_days(
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2021, 1, 29).unwrap(),
        );
        assert!(dates.len() >= 261);
        let mut summary: Vec<DailySummaryRow> = dates[..261]
            .iter()
            .map(|&date| summary_row(date, Some(Decimal::ZERO)))
            .collect();
        portfolio_composites(&mut summary);

        assert_eq!(summary[258].one_year_pct, None);
        // 260th observation (index 259) is the first defined window
        assert_eq!(summary[259].one_year_pct, Some(Decimal::ZERO));
        assert_eq!(summary[260].one_year_pct, Some(Decimal::ZERO));
        // longer horizons still undefined
        assert_eq!(summary[260].three_year_pct, None);
        assert_eq!(summary[260].five_year_pct, None);
    }

    #[test]
    fn test_position_composites_chain_weighted_series() {
        let rows = assemble(vec![vec![
            holding(d(8), "Alpha", dec!(100), dec!(100)),
            holding(d(9), "Alpha", dec!(100), dec!(110)),
        ]]);
        let mut days = attach_weights(rows);
        compute_returns(&mut days, ReturnBasis::BookCost);
        position_composites(&mut days);

        // single position: weight 100%, contribution = daily return
        assert_eq!(days[1].portfolio_return_pct, Some(dec!(10)));
        assert_eq!(days[1].cum_portfolio_return_pct, Some(dec!(10.00)));
        assert!(days[1].ann_itd_return_pct.is_some());
        assert_eq!(days[1].one_year_pct, None);
    }

    #[test]
    fn test_itd_return_chain_links_own_daily_returns() {
        let rows = assemble(vec![vec![
            holding(d(8), "Alpha", dec!(100), dec!(100)),
            holding(d(9), "Alpha", dec!(100), dec!(110)),
            holding(d(10), "Alpha", dec!(100), dec!(99)),
        ]]);
        let mut days = attach_weights(rows);
        compute_returns(&mut days, ReturnBasis::BookCost);
        // day returns: 0, 10%, -11%; chained: 1.10 x 0.89 - 1 = -2.1%
        assert_eq!(days[2].itd_return_pct, Some(dec!(-2.1000)));
    }
}
