//! Data access layer for qualair.
//!
//! This module provides read-only access to the `SQLite` measurement
//! database: table browsing, zone listings, the zone filter join, free-text
//! search, and the raw samples behind the aggregation pages.
//!
//! Every operation opens its own connection and drops it before returning,
//! so no handle outlives a single call.

#[cfg(test)]
pub(crate) mod fixtures;
pub mod record;
pub mod schema;

use std::path::{Path, PathBuf};

use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, Params, Row};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::report::DateWindow;

pub use record::{
    CellValue, MeasurementRow, PollutantSample, RecordSet, TableCount, Zone, ZoneSummary,
};
pub use schema::Table;

/// Default row cap of the table browser.
pub const DEFAULT_TABLE_ROWS: usize = 50_000;

/// Default row cap of the zone filter.
pub const DEFAULT_FILTER_ROWS: usize = 10_000;

/// Handle on the measurement database.
///
/// Holds only the location and row caps; connections are opened per call.
#[derive(Debug, Clone)]
pub struct Database {
    /// Path to the database file.
    path: PathBuf,
    /// Row cap of the zone filter.
    filter_rows: usize,
    /// Row cap of free-text search.
    search_rows: usize,
}

impl Database {
    /// Create a handle for the database at `path` with the default row caps.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            filter_rows: DEFAULT_FILTER_ROWS,
            search_rows: DEFAULT_TABLE_ROWS,
        }
    }

    /// Create a handle from the application configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            path: config.database_path(),
            filter_rows: config.limits.filter_rows,
            search_rows: config.limits.table_rows,
        }
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a read-only connection.
    fn connect(&self) -> Result<Connection> {
        debug!("Opening database at {}", self.path.display());
        Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| Error::DatabaseOpen {
            path: self.path.clone(),
            source,
        })
    }

    /// Fetch up to `limit` rows of the table called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTableName`] without touching the database if
    /// `name` is not one of the five tables, or a database error if the
    /// query fails.
    pub fn fetch_table(&self, name: &str, limit: usize) -> Result<RecordSet> {
        let table: Table = name.parse()?;
        self.fetch(table, limit)
    }

    /// Fetch up to `limit` rows of `table`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the query fails.
    pub fn fetch(&self, table: Table, limit: usize) -> Result<RecordSet> {
        let conn = self.connect()?;
        let rows = query_record_set(&conn, table.select_sql(), [to_sql_limit(limit)])?;
        debug!("Fetched {} rows from {}", rows.len(), table);
        Ok(rows)
    }

    /// List zones as (code, name), ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the query fails.
    pub fn list_zones(&self) -> Result<Vec<ZoneSummary>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(schema::LIST_ZONES)?;
        let zones = stmt
            .query_map([], |row| {
                Ok(ZoneSummary {
                    code: text_cell(row, 0)?.unwrap_or_default(),
                    name: text_cell(row, 1)?.unwrap_or_default(),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(zones)
    }

    /// List zones as (id, code, name), ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the query fails.
    pub fn list_zones_with_id(&self) -> Result<Vec<Zone>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(schema::LIST_ZONES_WITH_ID)?;
        let zones = stmt
            .query_map([], |row| {
                Ok(Zone {
                    id: row.get(0)?,
                    code: text_cell(row, 1)?.unwrap_or_default(),
                    name: text_cell(row, 2)?.unwrap_or_default(),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(zones)
    }

    /// Measurements of the zone with code `zone_code`, by ascending value.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the query fails.
    pub fn try_filtered_measurements(&self, zone_code: &str) -> Result<Vec<MeasurementRow>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(schema::FILTERED_MEASUREMENTS)?;
        let rows = stmt
            .query_map(
                params![zone_code, to_sql_limit(self.filter_rows)],
                row_to_measurement,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Lenient form of [`Self::try_filtered_measurements`].
    ///
    /// Failures are logged and yield an empty list.
    #[must_use]
    pub fn filtered_measurements(&self, zone_code: &str) -> Vec<MeasurementRow> {
        match self.try_filtered_measurements(zone_code) {
            Ok(rows) => {
                debug!("Zone {} matched {} measurements", zone_code, rows.len());
                rows
            }
            Err(e) => {
                warn!("Zone filter query failed for {}: {}", zone_code, e);
                Vec::new()
            }
        }
    }

    /// Case-insensitive partial match of `text` over the search columns of
    /// `table`. Blank text yields an empty set without querying.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the query fails.
    pub fn try_search(&self, table: Table, text: &str) -> Result<RecordSet> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(RecordSet::empty());
        }

        let conn = self.connect()?;
        register_fold_case(&conn)?;
        query_record_set(
            &conn,
            table.search_sql(),
            params![schema::like_pattern(text), to_sql_limit(self.search_rows)],
        )
    }

    /// Lenient search by table name.
    ///
    /// Unknown tables, blank text and query failures all yield an empty set.
    #[must_use]
    pub fn search(&self, table_name: &str, text: &str) -> RecordSet {
        let table = match table_name.parse::<Table>() {
            Ok(table) => table,
            Err(_) => {
                warn!("Search is not supported for table '{}'", table_name);
                return RecordSet::empty();
            }
        };

        match self.try_search(table, text) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Search in {} failed: {}", table, e);
                RecordSet::empty()
            }
        }
    }

    /// Pollutant name and raw value of every measurement starting inside
    /// `window`, optionally restricted to one zone id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the query fails.
    pub fn pollutant_samples(
        &self,
        zone_id: Option<i64>,
        window: &DateWindow,
    ) -> Result<Vec<PollutantSample>> {
        let conn = self.connect()?;
        let start = window.start_param();
        let end = window.end_param();

        let samples = match zone_id {
            Some(id) => {
                let mut stmt = conn.prepare(schema::SAMPLES_ONE_ZONE)?;
                let rows = stmt
                    .query_map(params![start, end, id], row_to_sample)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(schema::SAMPLES_ALL_ZONES)?;
                let rows = stmt
                    .query_map(params![start, end], row_to_sample)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };

        debug!(
            "Loaded {} samples between {} and {} (zone {:?})",
            samples.len(),
            start,
            end,
            zone_id
        );
        Ok(samples)
    }

    /// Row count of every table.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or a table is missing.
    pub fn table_counts(&self) -> Result<Vec<TableCount>> {
        let conn = self.connect()?;
        Table::ALL
            .into_iter()
            .map(|table| -> Result<TableCount> {
                let rows: i64 = conn.query_row(table.count_sql(), [], |row| row.get(0))?;
                Ok(TableCount { table, rows })
            })
            .collect()
    }
}

/// Install [`schema::FOLD_CASE`] on `conn`.
fn register_fold_case(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        schema::FOLD_CASE,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(fold_case(ctx.get_raw(0))),
    )?;
    Ok(())
}

/// Unicode lowercase of a cell's text; `NULL` stays `NULL`.
fn fold_case(value: ValueRef<'_>) -> Option<String> {
    match CellValue::from(value) {
        CellValue::Null => None,
        cell => Some(cell.to_string().to_lowercase()),
    }
}

fn to_sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Run `sql` and keep every column in select order.
fn query_record_set<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<RecordSet> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();
    let width = columns.len();

    let rows = stmt
        .query_map(params, |row| {
            (0..width)
                .map(|i| row.get_ref(i).map(CellValue::from))
                .collect::<rusqlite::Result<Vec<_>>>()
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(RecordSet { columns, rows })
}

/// Read a cell as text whatever its storage class.
fn text_cell(row: &Row, index: usize) -> rusqlite::Result<Option<String>> {
    Ok(match CellValue::from(row.get_ref(index)?) {
        CellValue::Null => None,
        other => Some(other.to_string()),
    })
}

fn row_to_measurement(row: &Row) -> rusqlite::Result<MeasurementRow> {
    Ok(MeasurementRow {
        zone: text_cell(row, 0)?.unwrap_or_default(),
        site: text_cell(row, 1)?.unwrap_or_default(),
        date_debut: text_cell(row, 2)?,
        date_fin: text_cell(row, 3)?,
        pollutant: text_cell(row, 4)?.unwrap_or_default(),
        valeur: row.get_ref(5)?.into(),
        valeur_brute: row.get_ref(6)?.into(),
        unite_mesure: text_cell(row, 7)?,
        code_qualite: row.get_ref(8)?.into(),
    })
}

fn row_to_sample(row: &Row) -> rusqlite::Result<PollutantSample> {
    Ok(PollutantSample {
        pollutant: text_cell(row, 0)?.unwrap_or_default(),
        value: row.get_ref(1)?.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::fixtures::sample_database;
    use super::*;

    fn missing_database() -> Database {
        Database::new("/nonexistent/qualair/QUALAIR.db")
    }

    #[test]
    fn test_fetch_table_rejects_unknown_name_before_connecting() {
        // The path does not exist: reaching the database would yield DatabaseOpen
        let db = missing_database();
        for name in ["users", "sqlite_master", "Site--", "Zas WHERE 1=1"] {
            let err = db.fetch_table(name, 10).unwrap_err();
            assert!(err.is_invalid_table_name(), "{name}: {err}");
        }
    }

    #[test]
    fn test_fetch_table_returns_table_columns() {
        let (_dir, db) = sample_database();

        let sites = db.fetch_table("Site", DEFAULT_TABLE_ROWS).unwrap();
        assert_eq!(sites.columns, Table::Site.columns());
        assert_eq!(sites.len(), 4);

        let mesures = db.fetch_table("Mesure", DEFAULT_TABLE_ROWS).unwrap();
        assert_eq!(mesures.columns, Table::Mesure.columns());
        assert_eq!(mesures.len(), 10);
    }

    #[test]
    fn test_fetch_table_respects_limit() {
        let (_dir, db) = sample_database();

        let mesures = db.fetch_table("Mesure", 3).unwrap();
        assert_eq!(mesures.len(), 3);

        let none = db.fetch_table("Mesure", 0).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_fetch_every_table() {
        let (_dir, db) = sample_database();
        for table in Table::ALL {
            let rows = db.fetch(table, DEFAULT_TABLE_ROWS).unwrap();
            assert!(!rows.is_empty(), "{table} is empty");
            assert_eq!(rows.columns.len(), table.columns().len());
        }
    }

    #[test]
    fn test_fetch_missing_database() {
        let err = missing_database().fetch(Table::Zas, 10).unwrap_err();
        assert!(matches!(err, Error::DatabaseOpen { .. }));
    }

    #[test]
    fn test_list_zones_ordered_by_name() {
        let (_dir, db) = sample_database();

        let zones = db.list_zones().unwrap();
        let names: Vec<_> = zones.iter().map(|z| z.name.as_str()).collect();
        assert_eq!(names, ["Agglomération Beta", "Zone Alpha", "Zone Vide"]);
        assert_eq!(zones[1].code, "FR01");
    }

    #[test]
    fn test_list_zones_with_id() {
        let (_dir, db) = sample_database();

        let zones = db.list_zones_with_id().unwrap();
        assert_eq!(zones.len(), 3);
        assert_eq!(
            zones[0],
            Zone {
                id: 2,
                code: "FR02".to_string(),
                name: "Agglomération Beta".to_string(),
            }
        );
    }

    #[test]
    fn test_filtered_measurements_joins_and_orders() {
        let (_dir, db) = sample_database();

        let rows = db.filtered_measurements("FR01");
        assert_eq!(rows.len(), 6);

        let values: Vec<_> = rows.iter().map(|r| r.valeur.clone()).collect();
        assert_eq!(
            values,
            [8.0, 12.5, 15.0, 22.0, 30.0, 41.0].map(CellValue::Real)
        );
        assert!(rows.iter().all(|r| r.zone == "Zone Alpha"));
        assert_eq!(rows[0].site, "Alpha Nord");
        assert_eq!(rows[0].pollutant, "NO2");
    }

    #[test]
    fn test_filtered_measurements_formats_dates() {
        let (_dir, db) = sample_database();

        let rows = db.filtered_measurements("FR01");
        assert_eq!(rows[0].date_debut.as_deref(), Some("2023-01-05"));
        assert_eq!(rows[0].date_fin.as_deref(), Some("2023-01-05"));
    }

    #[test]
    fn test_filtered_measurements_unknown_zone_is_empty() {
        let (_dir, db) = sample_database();

        assert!(db.try_filtered_measurements("FR99").unwrap().is_empty());
        // Zone without sites
        assert!(db.filtered_measurements("FR03").is_empty());
    }

    #[test]
    fn test_filtered_measurements_swallows_errors() {
        let db = missing_database();
        assert!(db.try_filtered_measurements("FR01").is_err());
        assert!(db.filtered_measurements("FR01").is_empty());
    }

    #[test]
    fn test_filtered_measurements_respects_cap() {
        let (dir, _) = sample_database();
        let mut config = Config::default();
        config.database.path = dir.path().join("QUALAIR.db");
        config.limits.filter_rows = 2;

        let rows = Database::from_config(&config).filtered_measurements("FR01");
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_search_is_case_insensitive_partial_match() {
        let (_dir, db) = sample_database();

        let sites = db.search("Site", "alpha");
        assert_eq!(sites.len(), 3);
        assert_eq!(sites.columns, Table::Site.columns());

        let pollutants = db.search("Polluant", "pm");
        assert_eq!(pollutants.len(), 1);
        assert_eq!(pollutants.rows[0][1], CellValue::Text("PM10".to_string()));
    }

    #[test]
    fn test_search_folds_accented_capitals() {
        let (_dir, db) = sample_database();

        assert_eq!(db.search("Zas", "agglomération").len(), 1);
        assert_eq!(db.search("Zas", "AGGLOMÉRATION").len(), 1);
        assert_eq!(db.search("Site", "ALPHA NORD").len(), 1);
    }

    #[test]
    fn test_fold_case_keeps_null_and_numbers() {
        assert_eq!(fold_case(ValueRef::Null), None);
        assert_eq!(fold_case(ValueRef::Integer(10)), Some("10".to_string()));
        assert_eq!(
            fold_case(ValueRef::Text("Église".as_bytes())),
            Some("église".to_string())
        );
    }

    #[test]
    fn test_search_zone_by_code_or_name() {
        let (_dir, db) = sample_database();

        assert_eq!(db.search("Zas", "FR02").len(), 1);
        assert_eq!(db.search("Zas", "zone").len(), 2);
    }

    #[test]
    fn test_search_measurements_by_id() {
        let (_dir, db) = sample_database();

        // id_mesure 10 and id_site/id_polluant never contain "10" otherwise
        let rows = db.search("Mesure", "10");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.rows[0][0], CellValue::Integer(10));
    }

    #[test]
    fn test_search_empty_text_does_not_match_all() {
        let (_dir, db) = sample_database();

        assert!(db.search("Site", "").is_empty());
        assert!(db.search("Site", "   ").is_empty());
    }

    #[test]
    fn test_search_blank_text_skips_database() {
        // No connection is attempted for blank text
        let rows = missing_database().try_search(Table::Site, "").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_search_unknown_table_is_empty() {
        let (_dir, db) = sample_database();
        assert!(db.search("Capteur", "alpha").is_empty());
    }

    #[test]
    fn test_search_wildcards_are_literal() {
        let (_dir, db) = sample_database();
        assert!(db.search("Site", "%").is_empty());
        assert!(db.search("Site", "_").is_empty());
    }

    #[test]
    fn test_search_swallows_errors() {
        assert!(missing_database().search("Site", "alpha").is_empty());
    }

    #[test]
    fn test_pollutant_samples_all_zones() {
        let (_dir, db) = sample_database();
        let window = DateWindow::month_days(2023, 1, 1, 1).unwrap();

        let samples = db.pollutant_samples(None, &window).unwrap();
        // Measurements 1, 2, 7, 8, 9 and 10 start on January 1st
        assert_eq!(samples.len(), 6);
        assert_eq!(samples[0].pollutant, "NO2");
        assert_eq!(samples[0].value, CellValue::Real(12.5));
    }

    #[test]
    fn test_pollutant_samples_one_zone() {
        let (_dir, db) = sample_database();
        let window = DateWindow::month_days(2023, 1, 1, 31).unwrap();

        let samples = db.pollutant_samples(Some(2), &window).unwrap();
        assert_eq!(samples.len(), 4);
        assert!(samples
            .iter()
            .any(|s| s.value == CellValue::Text("x".to_string())));
    }

    #[test]
    fn test_pollutant_samples_empty_window() {
        let (_dir, db) = sample_database();
        let window = DateWindow::month_days(2023, 2, 1, 28).unwrap();

        assert!(db.pollutant_samples(None, &window).unwrap().is_empty());
    }

    #[test]
    fn test_table_counts() {
        let (_dir, db) = sample_database();

        let counts = db.table_counts().unwrap();
        let rows: Vec<_> = counts.iter().map(|c| (c.table, c.rows)).collect();
        assert_eq!(
            rows,
            [
                (Table::Site, 4),
                (Table::Zas, 3),
                (Table::Organisme, 2),
                (Table::Polluant, 3),
                (Table::Mesure, 10),
            ]
        );
    }

    #[test]
    fn test_connections_are_read_only() {
        let (_dir, db) = sample_database();
        let conn = db.connect().unwrap();
        assert!(conn.execute("DELETE FROM Mesure", []).is_err());
    }

    #[test]
    fn test_path() {
        let db = Database::new("/srv/QUALAIR.db");
        assert_eq!(db.path(), Path::new("/srv/QUALAIR.db"));
    }
}
