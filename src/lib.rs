//! Folio - portfolio holdings and returns analytics
//!
//! This library turns raw buy/sell transactions, income events and daily
//! close prices into a daily position- and portfolio-level time series of
//! holdings, valuations and compounding returns, plus periodic (monthly,
//! quarterly, annual) resamples and snapshot reports.

pub mod calendar;
pub mod error;
pub mod holdings;
pub mod ingest;
pub mod model;
pub mod periodic;
pub mod pipeline;
pub mod portfolio;
pub mod pricing;
pub mod reports;
pub mod returns;
pub mod utils;
