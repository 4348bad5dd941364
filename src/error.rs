//! # Error Types
//!
//! This module defines all error types for the stratum tab engine.
//!
//! Most editing failures are not errors at all: invalid fret input is silently
//! rejected and the decoder always degrades to best-effort output. What remains
//! here are programming errors (bad coordinates), explicit import failures, and
//! the I/O boundaries (storage, configuration).
//!
//! ## Error Types
//! - `OutOfRange` - A grid coordinate outside the current sheet
//! - `InvalidCell` - A cell string that does not follow the cell grammar
//! - `EmptyImport` - Decoded text contained no staves
//! - `Storage` / `Config` / `Io` - Boundary failures
//!
//! ## Usage
//! ```rust
//! use stratum::{import_tab, StratumError};
//!
//! match import_tab("just some prose") {
//!     Ok(sheet) => println!("{} rows", sheet.rows.len()),
//!     Err(StratumError::EmptyImport) => eprintln!("No tablature found"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StratumError {
    /// A coordinate outside the sheet.
    ///
    /// The cursor owner is responsible for clamping, so this indicates a caller bug.
    ///
    /// # Example
    /// ```
    /// # use stratum::StratumError;
    /// let err = StratumError::OutOfRange { row: 3, column: 40, string: 0 };
    /// assert_eq!(err.to_string(), "Position out of range: row 3, column 40, string 0");
    /// ```
    #[error("Position out of range: row {row}, column {column}, string {string}")]
    OutOfRange {
        row: usize,
        column: usize,
        string: usize,
    },

    /// A cell value that is not part of the cell grammar.
    ///
    /// # Example
    /// ```
    /// # use stratum::StratumError;
    /// let err = StratumError::InvalidCell {
    ///     value: "25".to_string(),
    ///     message: "fret 25 exceeds 24".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Invalid cell '25': fret 25 exceeds 24");
    /// ```
    #[error("Invalid cell '{value}': {message}")]
    InvalidCell { value: String, message: String },

    /// Imported text produced no staves.
    #[error("Import produced no tablature staves")]
    EmptyImport,

    /// The storage medium rejected a read or write.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StratumError {
    fn from(e: serde_json::Error) -> Self {
        StratumError::Storage(e.to_string())
    }
}

impl From<serde_yaml::Error> for StratumError {
    fn from(e: serde_yaml::Error) -> Self {
        StratumError::Config(e.to_string())
    }
}
