//! End-to-end portfolio computation: walks distinct positions, builds each
//! position's daily holding record over its active life, assembles the long
//! table and computes the measures the selected report requires.
//!
//! Each run is a fresh, idempotent recomputation from the source events;
//! nothing persists between runs apart from whatever cache the price
//! provider keeps for itself.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::calendar::{business_days, last_complete_business_day};
use crate::error::Result;
use crate::holdings::build_holding;
use crate::ingest::{PositionIncome, PositionTrade};
use crate::model::{ItdPnlMode, PositionStatic, PriceSeries, ReturnBasis};
use crate::portfolio::{assemble, attach_weights, daily_summary, DailySummaryRow, PositionDay};
use crate::pricing::PriceProvider;
use crate::returns::{compute_returns, portfolio_composites, position_composites};

/// Input measures a report can require; the pipeline computes only what is
/// asked for (holdings and ITD PnL always exist).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    ItdPnl,
    Weight,
    DailyReturn,
}

/// Knobs for one run.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// "Today" for the run; open positions extend to the last complete
    /// business day before this date.
    pub as_of: NaiveDate,
    pub itd_mode: ItdPnlMode,
    pub basis: ReturnBasis,
}

/// The computed portfolio: the long per-position table and the daily
/// cross-sectional summary, both sorted by settle date.
#[derive(Debug, Clone)]
pub struct PortfolioData {
    pub days: Vec<PositionDay>,
    pub summary: Vec<DailySummaryRow>,
}

/// Distinct position names in first-seen order.
fn distinct_positions(trades: &[PositionTrade]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for t in trades {
        if !seen.iter().any(|name| name == &t.position) {
            seen.push(t.position.clone());
        }
    }
    seen
}

/// A position's active range: first trade date through last trade date,
/// extended to the last complete business day while the position is open
/// (cumulative quantity not back at zero). The builder itself never makes
/// this call; the boundary belongs here.
fn active_range(trades: &[&PositionTrade], as_of: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let first = trades.iter().map(|t| t.trade.date).min()?;
    let mut last = trades.iter().map(|t| t.trade.date).max()?;

    let net_quantity: Decimal = trades
        .iter()
        .filter_map(|t| t.trade.quantity)
        .sum();
    if net_quantity != Decimal::ZERO {
        last = last.max(last_complete_business_day(as_of));
    }
    Some((first, last))
}

/// Runs the full computation for every position found in `trades`.
pub fn run(
    trades: &[PositionTrade],
    income: &[PositionIncome],
    statics: &[PositionStatic],
    provider: &dyn PriceProvider,
    measures: &[Measure],
    opts: PipelineOptions,
) -> Result<PortfolioData> {
    let static_by_name: HashMap<&str, &PositionStatic> =
        statics.iter().map(|s| (s.name.as_str(), s)).collect();

    let mut holdings = Vec::new();
    for name in distinct_positions(trades) {
        let position_trades: Vec<&PositionTrade> =
            trades.iter().filter(|t| t.position == name).collect();
        let position_income: Vec<_> = income
            .iter()
            .filter(|i| i.position == name)
            .map(|i| i.event.clone())
            .collect();

        let Some((first, last)) = active_range(&position_trades, opts.as_of) else {
            continue;
        };
        let dates = business_days(first, last);
        if dates.is_empty() {
            warn!("position {} has no business days in range, skipped", name);
            continue;
        }

        let static_info = static_by_name.get(name.as_str()).copied();
        let prices = position_prices(&name, static_info, first, last, &dates, provider)?;

        info!("building holding for {} over {} days", name, dates.len());
        let owned_trades: Vec<_> = position_trades.iter().map(|t| t.trade.clone()).collect();
        holdings.push(build_holding(
            &name,
            &owned_trades,
            &position_income,
            &dates,
            &prices,
            opts.itd_mode,
        ));
    }

    let mut days = attach_weights(assemble(holdings));

    if measures.contains(&Measure::DailyReturn) {
        compute_returns(&mut days, opts.basis);
        position_composites(&mut days);
    }

    let mut summary = daily_summary(&days);
    if measures.contains(&Measure::DailyReturn) {
        portfolio_composites(&mut summary);
    }

    Ok(PortfolioData { days, summary })
}

/// Prices for one position: constant 1.0 for cash, the provider's series
/// for anything with a ticker, and the zero placeholder when no instrument
/// is known (the position is carried but valued at zero).
fn position_prices(
    name: &str,
    static_info: Option<&PositionStatic>,
    first: NaiveDate,
    last: NaiveDate,
    dates: &[NaiveDate],
    provider: &dyn PriceProvider,
) -> Result<PriceSeries> {
    match static_info {
        Some(info) if info.cash => Ok(PriceSeries::constant(dates, Decimal::ONE)),
        Some(info) => match &info.ticker {
            Some(ticker) => provider.get(ticker, first, last, info.multiplier),
            None => {
                warn!("position {} has no ticker, using zero placeholder", name);
                Ok(PriceSeries::placeholder(first, last))
            }
        },
        None => {
            warn!("position {} missing from static metadata, using zero placeholder", name);
            Ok(PriceSeries::placeholder(first, last))
        }
    }
}
