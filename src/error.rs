//! Error types for the Tern library.
//!
//! This module provides error handling for all Tern operations. All errors
//! are represented by the [`TernError`] enum.
//!
//! # Examples
//!
//! ```
//! use tern::error::{Result, TernError};
//!
//! fn example_operation() -> Result<()> {
//!     Err(TernError::configuration("Invalid mapping"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

/// The main error type for Tern operations.
///
/// It uses the `thiserror` crate for automatic `Error` trait implementation
/// and provides convenient constructor methods for creating specific error
/// types.
#[derive(Error, Debug)]
pub enum TernError {
    /// Indexer configuration errors. Always fatal to the compile that
    /// produced them; the previous mapping model stays in effect.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A record does not exist in the record store.
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// A record exists but has no version matching the requested vtag.
    #[error("Version not found: {0}")]
    VersionNotFound(String),

    /// The record lock could not be acquired within the configured wait time.
    #[error("Lock timeout: {0}")]
    LockTimeout(String),

    /// Lock ownership mismatch or other lock protocol violation.
    #[error("Lock error: {0}")]
    Lock(String),

    /// Coordination service errors (connection loss, protocol failures).
    #[error("Coordination error: {0}")]
    Coordination(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with TernError.
pub type Result<T> = std::result::Result<T, TernError>;

impl TernError {
    /// Create a new configuration error.
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        TernError::Configuration(msg.into())
    }

    /// Create a new record-not-found error.
    pub fn record_not_found<S: Into<String>>(msg: S) -> Self {
        TernError::RecordNotFound(msg.into())
    }

    /// Create a new version-not-found error.
    pub fn version_not_found<S: Into<String>>(msg: S) -> Self {
        TernError::VersionNotFound(msg.into())
    }

    /// Create a new lock timeout error.
    pub fn lock_timeout<S: Into<String>>(msg: S) -> Self {
        TernError::LockTimeout(msg.into())
    }

    /// Create a new lock error.
    pub fn lock<S: Into<String>>(msg: S) -> Self {
        TernError::Lock(msg.into())
    }

    /// Create a new coordination error.
    pub fn coordination<S: Into<String>>(msg: S) -> Self {
        TernError::Coordination(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        TernError::Other(msg.into())
    }

    /// Whether the error signals a missing record or version, i.e. a
    /// condition the dependency walker degrades to an absent value.
    pub fn is_absent_record(&self) -> bool {
        matches!(
            self,
            TernError::RecordNotFound(_) | TernError::VersionNotFound(_)
        )
    }
}
