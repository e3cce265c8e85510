//! Error types for vaersmine.
//!
//! This module defines all error types used throughout the vaersmine crate,
//! providing enough context (file, line, column) to locate bad input data.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for vaersmine operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Input Errors ===
    /// Failed to open or read a VAERS CSV file.
    #[error("failed to read {path}: {source}")]
    CsvRead {
        /// Path to the CSV file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: csv::Error,
    },

    /// A required column is absent from a CSV header.
    #[error("{path} is missing required column '{column}'")]
    MissingColumn {
        /// Path to the CSV file.
        path: PathBuf,
        /// Name of the missing column.
        column: &'static str,
    },

    /// A field could not be parsed into its expected type.
    #[error("{path}:{line}: invalid value '{value}' in column '{column}'")]
    InvalidField {
        /// Path to the CSV file.
        path: PathBuf,
        /// 1-based line number in the file.
        line: u64,
        /// Name of the offending column.
        column: &'static str,
        /// The raw cell content.
        value: String,
    },

    // === Mining Errors ===
    /// A mining parameter is out of range.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Description of the problem.
        message: String,
    },

    /// An unknown rule metric name was given.
    #[error("unknown metric '{0}'")]
    UnknownMetric(String),

    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// No run exists with the given id.
    #[error("run {0} not found")]
    RunNotFound(i64),

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for vaersmine operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create an invalid parameter error.
    #[must_use]
    pub fn invalid_parameter(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            message: message.into(),
        }
    }

    /// Check if this error was caused by malformed input data.
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::CsvRead { .. } | Self::MissingColumn { .. } | Self::InvalidField { .. }
        )
    }
}
