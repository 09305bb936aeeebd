//! Report variants over the computed portfolio.
//!
//! A closed set of kinds dispatched by tag: each kind names the measures
//! the pipeline must compute for it and turns [`PortfolioData`] into one or
//! more [`Artifact`] tables. Artifacts are plain named string tables; the
//! binary decides whether they land in CSV files or on the terminal.

pub mod current;
pub mod projection;

pub use current::current_holdings;
pub use projection::forward_projection;

use crate::periodic::{resample, PeriodRow, Periodicity};
use crate::pipeline::{Measure, PortfolioData};
use crate::utils::{csv_cell, csv_cell_opt};

/// One output table: a name, a header row and string cells. Null measures
/// are empty cells.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Artifact {
    fn new(name: &str, headers: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }
}

/// Report-level knobs the pipeline does not care about.
#[derive(Debug, Clone, Copy)]
pub struct ReportArgs {
    /// Business days to project forward.
    pub fwd_periods: usize,
    /// When set, the forward projection is resampled to this bucket width.
    pub fwd_periodicity: Option<Periodicity>,
}

impl Default for ReportArgs {
    fn default() -> Self {
        Self {
            fwd_periods: 260,
            fwd_periodicity: None,
        }
    }
}

/// The report selected at the CLI boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    DailyDetails,
    DailySummary,
    MonthlySummary,
    QuarterlySummary,
    AnnualSummary,
    CurrentHoldings,
    ForwardProjection,
    All,
}

const FULL: &[Measure] = &[Measure::ItdPnl, Measure::Weight, Measure::DailyReturn];
const SNAPSHOT: &[Measure] = &[Measure::ItdPnl, Measure::Weight];

impl ReportKind {
    /// Input measures the pipeline must compute before this report runs.
    pub fn required_measures(&self) -> &'static [Measure] {
        match self {
            ReportKind::CurrentHoldings => SNAPSHOT,
            _ => FULL,
        }
    }

    /// Produces this report's artifacts from the computed portfolio.
    pub fn generate(&self, data: &PortfolioData, args: &ReportArgs) -> Vec<Artifact> {
        match self {
            ReportKind::DailyDetails => vec![daily_details(data)],
            ReportKind::DailySummary => vec![daily_summary_artifact(data)],
            ReportKind::MonthlySummary => {
                vec![periodic_artifact(data, Periodicity::Monthly, "monthly_summary")]
            }
            ReportKind::QuarterlySummary => {
                vec![periodic_artifact(data, Periodicity::Quarterly, "quarterly_summary")]
            }
            ReportKind::AnnualSummary => {
                vec![periodic_artifact(data, Periodicity::Annual, "annual_summary")]
            }
            ReportKind::CurrentHoldings => vec![current_holdings(data)],
            ReportKind::ForwardProjection => vec![forward_projection(data, args)],
            ReportKind::All => vec![
                daily_details(data),
                daily_summary_artifact(data),
                periodic_artifact(data, Periodicity::Monthly, "monthly_summary"),
                periodic_artifact(data, Periodicity::Quarterly, "quarterly_summary"),
                periodic_artifact(data, Periodicity::Annual, "annual_summary"),
                current_holdings(data),
            ],
        }
    }
}

/// The long table: every position, every day, all measures.
fn daily_details(data: &PortfolioData) -> Artifact {
    let mut artifact = Artifact::new(
        "daily_details",
        &[
            "Date",
            "Position",
            "Capital",
            "Quantity",
            "Book Cost",
            "Income Qty",
            "Income",
            "Close",
            "Market Value",
            "Day PnL",
            "ITD PnL",
            "Weight %",
            "Daily Return %",
            "Portfolio Return %",
            "ITD Return %",
            "Portfolio ITD Return %",
            "Cm. Portfolio Return %",
            "Ann. ITD Return %",
            "1 Year %",
            "3 Year %",
            "5 Year %",
        ],
    );
    for day in &data.days {
        let h = &day.holding;
        artifact.rows.push(vec![
            h.date.to_string(),
            h.position.clone(),
            csv_cell(h.capital),
            csv_cell(h.quantity),
            csv_cell(h.book_cost),
            csv_cell(h.income_qty),
            csv_cell(h.income),
            csv_cell_opt(h.close),
            csv_cell_opt(h.market_value),
            csv_cell(h.day_pnl),
            csv_cell(h.itd_pnl),
            csv_cell_opt(day.weight_pct),
            csv_cell_opt(day.daily_return_pct),
            csv_cell_opt(day.portfolio_return_pct),
            csv_cell_opt(day.itd_return_pct),
            csv_cell_opt(day.portfolio_itd_return_pct),
            csv_cell_opt(day.cum_portfolio_return_pct),
            csv_cell_opt(day.ann_itd_return_pct),
            csv_cell_opt(day.one_year_pct),
            csv_cell_opt(day.three_year_pct),
            csv_cell_opt(day.five_year_pct),
        ]);
    }
    artifact
}

fn daily_summary_artifact(data: &PortfolioData) -> Artifact {
    let mut artifact = Artifact::new(
        "daily_summary",
        &[
            "Date",
            "Capital",
            "Book Cost",
            "Market Value",
            "Income",
            "ITD PnL",
            "Portfolio Return %",
            "ITD Return %",
            "Ann. ITD Return %",
            "1 Year %",
            "3 Year %",
            "5 Year %",
        ],
    );
    for row in &data.summary {
        artifact.rows.push(vec![
            row.date.to_string(),
            csv_cell(row.capital),
            csv_cell(row.book_cost),
            csv_cell(row.market_value),
            csv_cell(row.income),
            csv_cell(row.itd_pnl),
            csv_cell_opt(row.portfolio_return_pct),
            csv_cell_opt(row.itd_return_pct),
            csv_cell_opt(row.ann_itd_return_pct),
            csv_cell_opt(row.one_year_pct),
            csv_cell_opt(row.three_year_pct),
            csv_cell_opt(row.five_year_pct),
        ]);
    }
    artifact
}

fn periodic_artifact(data: &PortfolioData, periodicity: Periodicity, name: &str) -> Artifact {
    let mut artifact = Artifact::new(
        name,
        &[
            "Period End",
            "Book Cost",
            "Capital",
            "Open MV",
            "High MV",
            "Low MV",
            "Close MV",
            "Income",
            "ITD PnL",
            "ITD Return %",
            "Ann. ITD Return %",
            "1 Year %",
            "3 Year %",
            "5 Year %",
        ],
    );
    for period in resample(&data.summary, periodicity) {
        artifact.rows.push(period_cells(&period));
    }
    artifact
}

fn period_cells(period: &PeriodRow) -> Vec<String> {
    vec![
        period.period_end.to_string(),
        csv_cell(period.book_cost),
        csv_cell(period.capital),
        csv_cell(period.open_market_value),
        csv_cell(period.high_market_value),
        csv_cell(period.low_market_value),
        csv_cell(period.close_market_value),
        csv_cell(period.income),
        csv_cell(period.itd_pnl),
        csv_cell_opt(period.itd_return_pct),
        csv_cell_opt(period.ann_itd_return_pct),
        csv_cell_opt(period.one_year_pct),
        csv_cell_opt(period.three_year_pct),
        csv_cell_opt(period.five_year_pct),
    ]
}
