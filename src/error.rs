//! Error handling for the folio engine
//!
//! Defines custom error types and establishes a unified Result type
//! using anyhow for context chaining and error propagation.
//!
//! The engine recovers from data-shape problems by coercing bad cells to
//! null; these variants cover the conditions that genuinely cannot proceed
//! (unreadable files, malformed static metadata).

use thiserror::Error;

/// Core error types for portfolio analytics operations
#[derive(Error, Debug)]
pub enum FolioError {
    #[error("ingest error: {0}")]
    Ingest(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("pricing error: {0}")]
    Pricing(String),

    #[error("report error: {0}")]
    Report(String),

    #[error("io error")]
    Io(#[from] std::io::Error),
}

/// Result type alias for portfolio analytics operations
pub type Result<T> = anyhow::Result<T>;
