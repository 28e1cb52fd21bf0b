//! Error types for the pricescout crate.
//!
//! All errors use stable string messages suitable for display and
//! programmatic handling. Connection-class failures are a distinct
//! variant so the orchestrator can log them differently from
//! unexpected adapter failures.

use crate::storage::StoreError;

/// Errors that can occur during a price search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// A network/connection-class failure talking to a store.
    /// Recoverable; the orchestrator skips the adapter with a warning.
    #[error("connection error: {0}")]
    Connection(String),

    /// A non-connection HTTP failure (bad status, body read, client build).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Failed to parse a store's response HTML.
    #[error("parse error: {0}")]
    Parse(String),

    /// A scrape exceeded the enforced per-adapter deadline.
    #[error("scrape timed out: {0}")]
    Timeout(String),

    /// The backing counter/result store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid search configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias for pricescout results.
pub type Result<T> = std::result::Result<T, SearchError>;
