//! Error types for qualair.
//!
//! One enum covers the whole crate. The web layer maps
//! [`Error::InvalidTableName`] to a 400 page and everything else to a 500.

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong while serving the dashboard.
#[derive(Error, Debug)]
pub enum Error {
    // === Data Access Errors ===
    /// The requested table is not one of the five browsable tables.
    #[error("invalid table name: '{name}'")]
    InvalidTableName {
        /// The rejected name, as submitted.
        name: String,
    },

    /// The measurement database could not be opened read-only.
    #[error("cannot open database {path}: {source}")]
    DatabaseOpen {
        /// Location that was tried.
        path: PathBuf,
        /// Error reported by `SQLite`.
        #[source]
        source: rusqlite::Error,
    },

    /// A statement failed to prepare or run.
    #[error("query execution failed: {0}")]
    QueryExecution(#[from] rusqlite::Error),

    // === Aggregation Errors ===
    /// A measurement value could not be read as a number.
    #[error("value is not numeric: {value}")]
    ValueCoercion {
        /// Textual form of the offending value.
        value: String,
    },

    /// A reporting date window could not be built.
    #[error("invalid date window: {message}")]
    InvalidDateWindow {
        /// Why the window was rejected.
        message: String,
    },

    // === Rendering Errors ===
    /// Drawing a chart failed.
    #[error("chart rendering failed: {0}")]
    ChartRender(String),

    /// Encoding a rendered chart to PNG failed.
    #[error("image encoding failed: {0}")]
    ImageEncode(#[from] image::ImageError),

    /// A page template failed to compile or render.
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    // === Configuration Errors ===
    /// The configuration sources could not be merged or deserialized.
    #[error("cannot read configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// A configuration value is out of range or malformed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// The offending setting and value.
        message: String,
    },

    /// Binding the listener or another OS-level operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A failure that indicates a bug, such as a panicked worker task.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias used across qualair.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create an invalid table name error.
    #[must_use]
    pub fn invalid_table_name(name: impl Into<String>) -> Self {
        Self::InvalidTableName { name: name.into() }
    }

    /// Create a value coercion error.
    #[must_use]
    pub fn value_coercion(value: impl Into<String>) -> Self {
        Self::ValueCoercion {
            value: value.into(),
        }
    }

    /// Create an invalid date window error.
    #[must_use]
    pub fn invalid_date_window(message: impl Into<String>) -> Self {
        Self::InvalidDateWindow {
            message: message.into(),
        }
    }

    /// Create a chart rendering error.
    #[must_use]
    pub fn chart_render(message: impl Into<String>) -> Self {
        Self::ChartRender(message.into())
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether a client submitted an unknown table name.
    #[must_use]
    pub fn is_invalid_table_name(&self) -> bool {
        matches!(self, Self::InvalidTableName { .. })
    }

    /// Whether the database failed to open or to answer a query.
    #[must_use]
    pub fn is_database_error(&self) -> bool {
        matches!(self, Self::DatabaseOpen { .. } | Self::QueryExecution(_))
    }
}
