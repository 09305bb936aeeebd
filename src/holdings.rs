//! Holding builder: folds one position's trades, income and close prices
//! onto a business-day grid, producing a dense daily record of quantity,
//! book cost, income, market value and PnL.
//!
//! Quantity and book cost are prefix sums over zero-filled per-day deltas,
//! so no-trade days carry forward automatically and a position that closes
//! to zero and later re-opens needs no special handling. Prices are
//! stock-like and forward-fill across gaps; income is a flow and does not.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use tracing::debug;

use crate::model::{IncomeEvent, ItdPnlMode, PriceSeries, Trade};

/// Reference labels (lowercased) that mark a trade as an external cash
/// movement rather than a market trade.
static CAPITAL_LABELS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| HashSet::from(["fpc", "card web", "contrib", "bacs"]));

/// One day of one position: the central derived record.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldingRow {
    pub date: NaiveDate,
    pub position: String,
    /// Cumulative external capital lodged into the position.
    pub capital: Decimal,
    /// Cumulative quantity, clamped at zero (no short exposure).
    pub quantity: Decimal,
    /// Cumulative cash basis; opening a long is positive book cost.
    pub book_cost: Decimal,
    pub income_qty: Decimal,
    pub income: Decimal,
    /// Forward-filled close; None until the first known price.
    pub close: Option<Decimal>,
    /// quantity x close; None while close is unknown.
    pub market_value: Option<Decimal>,
    /// Market value delta vs the prior day; zero on the first day and
    /// while market value is undefined.
    pub day_pnl: Decimal,
    pub itd_pnl: Decimal,
}

/// True when a trade's reference tags it as a capital movement: an `L`
/// prefix (lodgements) or one of the subscription labels, case-insensitive.
pub fn is_capital_reference(reference: &str) -> bool {
    let lower = reference.trim().to_lowercase();
    lower.starts_with('l') || CAPITAL_LABELS.contains(lower.as_str())
}

/// Per-day trade deltas after same-day aggregation.
#[derive(Debug, Default, Clone, Copy)]
struct DayDelta {
    quantity: Decimal,
    book_cost: Decimal,
    capital: Decimal,
}

fn aggregate_trades(trades: &[Trade]) -> HashMap<NaiveDate, DayDelta> {
    let mut by_date: HashMap<NaiveDate, DayDelta> = HashMap::new();
    for trade in trades {
        // Unparsable cells arrive as None and contribute nothing.
        let quantity = trade.quantity.unwrap_or_else(|| {
            debug!("trade on {} has null quantity, treated as zero", trade.date);
            Decimal::ZERO
        });
        let value = trade.value.unwrap_or(Decimal::ZERO).abs();
        // Sign the cash value by the trade direction, not the value's own
        // sign, which may already be recorded unsigned.
        let signed_value = if quantity >= Decimal::ZERO { value } else { -value };

        let entry = by_date.entry(trade.date).or_default();
        entry.quantity += quantity;
        entry.book_cost += signed_value;
        if is_capital_reference(&trade.reference) {
            entry.capital += value;
        }
    }
    by_date
}

fn aggregate_income(income: &[IncomeEvent]) -> HashMap<NaiveDate, (Decimal, Decimal)> {
    let mut by_date: HashMap<NaiveDate, (Decimal, Decimal)> = HashMap::new();
    for event in income {
        let entry = by_date.entry(event.date).or_insert((Decimal::ZERO, Decimal::ZERO));
        entry.0 += event.quantity.unwrap_or(Decimal::ZERO);
        entry.1 += event.value.unwrap_or(Decimal::ZERO);
    }
    by_date
}

/// Builds the dense daily record for one position over `dates`.
///
/// Output guarantee: exactly one row per input date, sorted, with running
/// totals maintained without look-ahead. The price series is joined by
/// exact date then carried forward; prices dated outside the grid are
/// ignored. Providers are expected to have dropped zero closes already.
pub fn build_holding(
    position: &str,
    trades: &[Trade],
    income: &[IncomeEvent],
    dates: &[NaiveDate],
    prices: &PriceSeries,
    itd_mode: ItdPnlMode,
) -> Vec<HoldingRow> {
    let trade_deltas = aggregate_trades(trades);
    let income_by_date = aggregate_income(income);
    let close_by_date: HashMap<NaiveDate, Decimal> = prices
        .points()
        .iter()
        .map(|p| (p.date, p.close))
        .collect();

    let mut rows = Vec::with_capacity(dates.len());

    // Running state across the grid. raw_quantity is the unclamped prefix
    // sum: the clamp is applied per row, never to the running value, so a
    // later buy re-opens the position from the true cumulative quantity.
    let mut raw_quantity = Decimal::ZERO;
    let mut book_cost = Decimal::ZERO;
    let mut capital = Decimal::ZERO;
    let mut last_close: Option<Decimal> = None;
    let mut prev_market_value: Option<Decimal> = None;
    let mut itd_pnl = Decimal::ZERO;

    for &date in dates {
        if let Some(delta) = trade_deltas.get(&date) {
            raw_quantity += delta.quantity;
            book_cost += delta.book_cost;
            capital += delta.capital;
        }
        let (income_qty, income_value) = income_by_date
            .get(&date)
            .copied()
            .unwrap_or((Decimal::ZERO, Decimal::ZERO));

        if let Some(close) = close_by_date.get(&date) {
            last_close = Some(*close);
        }

        let quantity = raw_quantity.max(Decimal::ZERO);
        let market_value = last_close.map(|close| quantity * close);

        let day_pnl = match (market_value, prev_market_value) {
            (Some(mv), Some(prev)) => mv - prev,
            _ => Decimal::ZERO,
        };

        itd_pnl += match itd_mode {
            ItdPnlMode::BridgedDaily => day_pnl + income_value,
            ItdPnlMode::IncomeOnly => income_value,
        };

        rows.push(HoldingRow {
            date,
            position: position.to_string(),
            capital,
            quantity,
            book_cost,
            income_qty,
            income: income_value,
            close: last_close,
            market_value,
            day_pnl,
            itd_pnl,
        });

        prev_market_value = market_value;
    }

    rows
}
