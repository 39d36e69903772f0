//! Error types for the Dualdex library.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`DualdexError`] enum. The variants follow the failure classes of the
//! engine: configuration, input, cursor and backend errors are fatal and
//! propagate to the caller untouched.
//!
//! Running out of search budget is *not* an error. A search that stops early
//! returns a partial result together with a continuation cursor.
//!
//! # Examples
//!
//! ```
//! use dualdex::error::{DualdexError, Result};
//!
//! fn require_field(value: Option<&str>) -> Result<&str> {
//!     value.ok_or_else(|| DualdexError::input("primary field is missing"))
//! }
//!
//! let err = require_field(None).unwrap_err();
//! assert_eq!(err.to_string(), "Input error: primary field is missing");
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Dualdex operations.
#[derive(Error, Debug)]
pub enum DualdexError {
    /// No usable backend or an invalid engine configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed document or request input.
    #[error("Input error: {0}")]
    Input(String),

    /// Undecodable or mismatched pagination cursor.
    #[error("Cursor error: {0}")]
    Cursor(String),

    /// Failure reported by (or capability missing from) an index backend.
    #[error("Backend error: {0}")]
    Backend(String),

    /// I/O errors (config files, CLI input).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with DualdexError.
pub type Result<T> = std::result::Result<T, DualdexError>;

impl DualdexError {
    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        DualdexError::Config(msg.into())
    }

    /// Create a new input error.
    pub fn input<S: Into<String>>(msg: S) -> Self {
        DualdexError::Input(msg.into())
    }

    /// Create a new cursor error.
    pub fn cursor<S: Into<String>>(msg: S) -> Self {
        DualdexError::Cursor(msg.into())
    }

    /// Create a new backend error.
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        DualdexError::Backend(msg.into())
    }

    /// Error returned when an optional backend capability is invoked but not provided.
    pub fn unsupported(capability: &str) -> Self {
        DualdexError::Backend(format!("unsupported capability: {capability}"))
    }

    /// Whether this error came from decoding a cursor.
    pub fn is_cursor_error(&self) -> bool {
        matches!(self, DualdexError::Cursor(_))
    }
}
