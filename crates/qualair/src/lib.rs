//! `qualair` - Air quality measurement dashboard
//!
//! This library provides read-only access to a QUALAIR `SQLite` database,
//! per-pollutant aggregation, PNG chart rendering and the HTTP dashboard
//! that ties them together.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod chart;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod report;
pub mod storage;
pub mod web;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use report::DateWindow;
pub use storage::{Database, Table};
