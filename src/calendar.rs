//! Business-day calendar used as the settle-date axis.
//!
//! A plain Monday-Friday calendar with no holiday table. Every downstream
//! series (holdings, weights, returns) is keyed to the dates produced here,
//! so the generator is deliberately dumb: ordered, unique, inclusive of both
//! endpoints, and empty (not an error) when the range is reversed.

use chrono::{Datelike, Days, NaiveDate, Weekday};

/// True for Monday through Friday.
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Ordered business days in `[start, end]`. Empty when `start > end`;
/// callers guarding a reversed range clamp the start themselves.
pub fn business_days(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut d = start;
    while d <= end {
        if is_business_day(d) {
            days.push(d);
        }
        match d.checked_add_days(Days::new(1)) {
            Some(next) => d = next,
            None => break,
        }
    }
    days
}

/// Number of business days in the half-open interval `[from, to)`.
/// Zero when `to <= from`. Used as the annualisation denominator.
pub fn business_days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    if to <= from {
        return 0;
    }
    let mut count = 0;
    let mut d = from;
    while d < to {
        if is_business_day(d) {
            count += 1;
        }
        match d.checked_add_days(Days::new(1)) {
            Some(next) => d = next,
            None => break,
        }
    }
    count
}

/// Most recent complete business day strictly before `today`. Open
/// positions extend their date grid to this boundary.
pub fn last_complete_business_day(today: NaiveDate) -> NaiveDate {
    let mut d = today
        .checked_sub_days(Days::new(1))
        .unwrap_or(today);
    while !is_business_day(d) {
        d = match d.checked_sub_days(Days::new(1)) {
            Some(prev) => prev,
            None => break,
        };
    }
    d
}
