//! Price provision for the engine.
//!
//! The core never fetches anything itself: it depends on [`PriceProvider`],
//! a key-value contract of `get(ticker, start, end) -> series`. Providers
//! return daily closes in the reporting currency with non-trading days
//! absent, and an all-zero placeholder for unfetchable instruments.
//! [`CachedPrices`] wraps any provider with a per-ticker cache that merges
//! and extends partially covered ranges.

pub mod csv_store;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::error::Result;
use crate::model::PriceSeries;

/// Daily close-price source for one instrument over a date range.
///
/// Contract: prices are already adjusted for corporate actions and
/// currency; zero closes are dropped as bad data; an instrument the
/// provider cannot price comes back as `PriceSeries::placeholder`.
pub trait PriceProvider {
    fn get(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        multiplier: Decimal,
    ) -> Result<PriceSeries>;
}

/// Reversed ranges are a caller bug we tolerate: clamp the start to five
/// days before the end rather than failing the run.
pub fn clamp_range(start: NaiveDate, end: NaiveDate) -> (NaiveDate, NaiveDate) {
    if start > end {
        debug!("reversed price range {}..{}, clamping start", start, end);
        let clamped = end.checked_sub_days(Days::new(5)).unwrap_or(end);
        (clamped, end)
    } else {
        (start, end)
    }
}

/// Per-ticker price cache over an inner provider.
///
/// A request fully inside the cached span is served as a slice. A request
/// reaching earlier or later than the cached span fetches only the missing
/// head/tail and merges it, so repeated runs over a growing portfolio touch
/// the inner provider once per new stretch of dates.
pub struct CachedPrices<P: PriceProvider> {
    inner: P,
    cache: Arc<Mutex<HashMap<String, PriceSeries>>>,
}

impl<P: PriceProvider> CachedPrices<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of tickers currently cached.
    pub fn cached_tickers(&self) -> usize {
        self.cache.lock().unwrap().len()
    }
}

impl<P: PriceProvider> PriceProvider for CachedPrices<P> {
    fn get(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        multiplier: Decimal,
    ) -> Result<PriceSeries> {
        let (start, end) = clamp_range(start, end);

        let cached = self.cache.lock().unwrap().get(ticker).cloned();
        let series = match cached {
            Some(series) if series.covers(start, end) => {
                debug!("price cache covers {} {}..{}", ticker, start, end);
                series
            }
            Some(series) => {
                let mut merged = series.clone();
                if let Some(first) = series.first_date() {
                    if first > start {
                        let head_end = first.checked_sub_days(Days::new(1)).unwrap_or(first);
                        info!("extending {} price cache back to {}", ticker, start);
                        merged = self
                            .inner
                            .get(ticker, start, head_end, multiplier)?
                            .merged(&merged);
                    }
                }
                if let Some(last) = series.last_date() {
                    if last < end {
                        let tail_start = last.checked_add_days(Days::new(1)).unwrap_or(last);
                        info!("extending {} price cache forward to {}", ticker, end);
                        merged =
                            merged.merged(&self.inner.get(ticker, tail_start, end, multiplier)?);
                    }
                }
                self.cache
                    .lock()
                    .unwrap()
                    .insert(ticker.to_string(), merged.clone());
                merged
            }
            None => {
                info!("no cached prices for {}, fetching {}..{}", ticker, start, end);
                let fetched = self.inner.get(ticker, start, end, multiplier)?;
                self.cache
                    .lock()
                    .unwrap()
                    .insert(ticker.to_string(), fetched.clone());
                fetched
            }
        };

        Ok(series.slice(start, end))
    }
}
