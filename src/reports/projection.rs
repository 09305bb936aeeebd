//! Forward projection: compounds the latest portfolio market value over a
//! future business-day grid at the daily rates implied by the annualised
//! ITD and trailing 1/3/5-year composites. A horizon with no history yet
//! projects as empty cells.

use chrono::{Days, NaiveDate};
use rust_decimal::{Decimal, MathematicalOps};

use crate::calendar::is_business_day;
use crate::pipeline::PortfolioData;
use crate::reports::{Artifact, ReportArgs};
use crate::returns::TRADING_DAYS_PER_YEAR;
use crate::utils::csv_cell_opt;

/// Daily growth factor implied by an annualised percentage.
fn daily_factor(annual_pct: Option<Decimal>) -> Option<Decimal> {
    let growth = Decimal::ONE + annual_pct? / Decimal::ONE_HUNDRED;
    if growth <= Decimal::ZERO {
        return None;
    }
    let exponent = 1.0 / TRADING_DAYS_PER_YEAR as f64;
    growth.checked_powf(exponent)
}

/// The next `count` business days strictly after `date`.
fn future_business_days(date: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(count);
    let mut cursor = date;
    while days.len() < count {
        cursor = match cursor.checked_add_days(Days::new(1)) {
            Some(next) => next,
            None => break,
        };
        if is_business_day(cursor) {
            days.push(cursor);
        }
    }
    days
}

pub fn forward_projection(data: &PortfolioData, args: &ReportArgs) -> Artifact {
    let mut artifact = Artifact {
        name: "forward_projection".to_string(),
        headers: [
            "Date",
            "Projected MV (ITD rate)",
            "Projected MV (1Y rate)",
            "Projected MV (3Y rate)",
            "Projected MV (5Y rate)",
        ]
        .iter()
        .map(|h| h.to_string())
        .collect(),
        rows: Vec::new(),
    };

    let Some(latest) = data.summary.last() else {
        return artifact;
    };
    let start_value = latest.market_value;
    let factors = [
        daily_factor(latest.ann_itd_return_pct),
        daily_factor(latest.one_year_pct),
        daily_factor(latest.three_year_pct),
        daily_factor(latest.five_year_pct),
    ];

    let mut running = [Some(start_value); 4];
    let mut rows: Vec<(NaiveDate, [Option<Decimal>; 4])> = Vec::new();
    for date in future_business_days(latest.date, args.fwd_periods) {
        for (value, factor) in running.iter_mut().zip(factors.iter()) {
            *value = value.zip(*factor).map(|(v, f)| v * f);
        }
        rows.push((date, running));
    }

    // Optional coarsening: keep the last row of each calendar bucket.
    if let Some(periodicity) = args.fwd_periodicity {
        use crate::periodic::period_end;
        let mut kept = Vec::new();
        for (i, row) in rows.iter().enumerate() {
            let this_end = period_end(row.0, periodicity);
            let next_end = rows.get(i + 1).map(|next| period_end(next.0, periodicity));
            if next_end != Some(this_end) {
                kept.push(*row);
            }
        }
        rows = kept;
    }

    for (date, values) in rows {
        artifact.rows.push(vec![
            date.to_string(),
            csv_cell_opt(values[0].map(|v| v.round_dp(4))),
            csv_cell_opt(values[1].map(|v| v.round_dp(4))),
            csv_cell_opt(values[2].map(|v| v.round_dp(4))),
            csv_cell_opt(values[3].map(|v| v.round_dp(4))),
        ]);
    }
    artifact
}
