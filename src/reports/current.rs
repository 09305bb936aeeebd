//! Current-holdings snapshot: one line per open position as of the latest
//! computed date, with lifetime income, holding period and total/annualised
//! return. Sorted by total PnL, best first.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps};

use crate::pipeline::PortfolioData;
use crate::portfolio::PositionDay;
use crate::reports::Artifact;
use crate::utils::{csv_cell, csv_cell_opt};

const DAYS_PER_YEAR: Decimal = Decimal::from_parts(365, 0, 0, false, 0);

/// One open position in the snapshot.
#[derive(Debug, Clone)]
pub struct CurrentHolding {
    pub position: String,
    pub first_acquired: NaiveDate,
    pub quantity: Decimal,
    pub book_cost: Decimal,
    pub market_value: Decimal,
    /// Lifetime income received, summed over the position's history.
    pub income: Decimal,
    /// market value + lifetime income − book cost.
    pub total_pnl: Decimal,
    pub total_return_pct: Option<Decimal>,
    pub annualised_return_pct: Option<Decimal>,
    /// Calendar years held, to two decimals.
    pub held_years: Decimal,
}

/// Builds the snapshot rows. A position is open when its latest record
/// carries a nonzero quantity.
pub fn snapshot(data: &PortfolioData) -> Vec<CurrentHolding> {
    let mut holdings: Vec<CurrentHolding> = Vec::new();
    for (position, rows) in positions(data) {
        let first = rows.first().expect("position has rows");
        let last = rows.last().expect("position has rows");
        let h = &last.holding;
        if h.quantity == Decimal::ZERO {
            continue;
        }

        let market_value = h.market_value.unwrap_or(Decimal::ZERO);
        // income is a daily flow, not a running total: sum the history
        let income: Decimal = rows.iter().map(|r| r.holding.income).sum();
        let total_pnl = market_value + income - h.book_cost;
        let held_days = Decimal::from((h.date - first.holding.date).num_days().max(1));
        let held_years = held_days / DAYS_PER_YEAR;

        let total_return_pct = if h.book_cost == Decimal::ZERO {
            None
        } else {
            Some(total_pnl / h.book_cost * Decimal::ONE_HUNDRED)
        };
        let annualised_return_pct = total_return_pct.and_then(|total| {
            let growth = Decimal::ONE + total / Decimal::ONE_HUNDRED;
            if growth <= Decimal::ZERO {
                return None;
            }
            let exponent = (Decimal::ONE / held_years).to_f64()?;
            growth
                .checked_powf(exponent)
                .map(|g| (g - Decimal::ONE) * Decimal::ONE_HUNDRED)
        });

        holdings.push(CurrentHolding {
            position,
            first_acquired: first.holding.date,
            quantity: h.quantity,
            book_cost: h.book_cost,
            market_value,
            income,
            total_pnl,
            total_return_pct,
            annualised_return_pct,
            held_years: held_years.round_dp(2),
        });
    }
    holdings.sort_by(|a, b| b.total_pnl.cmp(&a.total_pnl));
    holdings
}

/// The snapshot as an output table.
pub fn current_holdings(data: &PortfolioData) -> Artifact {
    let mut artifact = Artifact {
        name: "current_holdings".to_string(),
        headers: [
            "Position",
            "First Acquired",
            "Quantity",
            "Book Cost",
            "Market Value",
            "Income",
            "Total PnL",
            "Total Return %",
            "Annualised Return %",
            "Years Held",
        ]
        .iter()
        .map(|h| h.to_string())
        .collect(),
        rows: Vec::new(),
    };
    for holding in snapshot(data) {
        artifact.rows.push(vec![
            holding.position,
            holding.first_acquired.to_string(),
            csv_cell(holding.quantity),
            csv_cell(holding.book_cost),
            csv_cell(holding.market_value),
            csv_cell(holding.income),
            csv_cell(holding.total_pnl),
            csv_cell_opt(holding.total_return_pct.map(|v| v.round_dp(4))),
            csv_cell_opt(holding.annualised_return_pct.map(|v| v.round_dp(4))),
            csv_cell(holding.held_years),
        ]);
    }
    artifact
}

/// Rows grouped by position, first-seen order, each group date-sorted
/// (the long table already is).
fn positions(data: &PortfolioData) -> Vec<(String, Vec<&PositionDay>)> {
    let mut groups: Vec<(String, Vec<&PositionDay>)> = Vec::new();
    for day in &data.days {
        let name = &day.holding.position;
        match groups.iter_mut().find(|(n, _)| n == name) {
            Some((_, rows)) => rows.push(day),
            None => groups.push((name.clone(), vec![day])),
        }
    }
    groups
}
