//! In-memory result types returned by the data access layer.

use rusqlite::types::ValueRef;
use serde::Serialize;

/// A single cell as read from `SQLite`, keeping its storage class.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    /// SQL `NULL`.
    Null,
    /// An `INTEGER` cell.
    Integer(i64),
    /// A `REAL` cell.
    Real(f64),
    /// A `TEXT` cell, or a placeholder describing a `BLOB`.
    Text(String),
}

impl From<ValueRef<'_>> for CellValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(i) => Self::Integer(i),
            ValueRef::Real(f) => Self::Real(f),
            ValueRef::Text(bytes) => Self::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(bytes) => Self::Text(format!("<{} bytes>", bytes.len())),
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r:?}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Rows of one query with their column names.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordSet {
    /// Column names in select order.
    pub columns: Vec<String>,
    /// Row values, one entry per column.
    pub rows: Vec<Vec<CellValue>>,
}

impl RecordSet {
    /// An empty record set with no columns.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A surveillance zone as listed in selection menus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneSummary {
    /// Short zone code, e.g. `FR01`.
    pub code: String,
    /// Display name.
    pub name: String,
}

/// A surveillance zone with its database identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Zone {
    /// Primary key (`id_zas`).
    pub id: i64,
    /// Short zone code.
    pub code: String,
    /// Display name.
    pub name: String,
}

/// One row of the zone filter join.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementRow {
    /// Zone display name.
    pub zone: String,
    /// Site name.
    pub site: String,
    /// Start date, `YYYY-MM-DD`.
    pub date_debut: Option<String>,
    /// End date, `YYYY-MM-DD`.
    pub date_fin: Option<String>,
    /// Pollutant name.
    pub pollutant: String,
    /// Validated value.
    pub valeur: CellValue,
    /// Raw value.
    pub valeur_brute: CellValue,
    /// Measurement unit.
    pub unite_mesure: Option<String>,
    /// Data-quality flag, stored but not interpreted.
    pub code_qualite: CellValue,
}

/// A pollutant name paired with one raw measured value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollutantSample {
    /// Pollutant name.
    pub pollutant: String,
    /// Value as stored; may be null or non-numeric.
    pub value: CellValue,
}

impl PollutantSample {
    /// Build a sample.
    #[must_use]
    pub fn new(pollutant: impl Into<String>, value: CellValue) -> Self {
        Self {
            pollutant: pollutant.into(),
            value,
        }
    }
}

/// Number of rows held by one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableCount {
    /// The table counted.
    pub table: super::Table,
    /// Its row count.
    pub rows: i64,
}
