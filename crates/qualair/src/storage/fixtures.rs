//! Test databases shared by the unit tests.

use rusqlite::Connection;
use tempfile::TempDir;

use super::Database;

/// Schema of the production measurement database.
pub(crate) const SCHEMA: &str = include_str!("../../tests/fixtures/schema.sql");

/// Three zones, four sites and ten measurements, some of them unusable.
pub(crate) const SAMPLE_DATA: &str = include_str!("../../tests/fixtures/sample_data.sql");

/// Create a populated database in a fresh temporary directory.
///
/// The directory must outlive the returned handle.
pub(crate) fn sample_database() -> (TempDir, Database) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("QUALAIR.db");

    let conn = Connection::open(&path).expect("failed to create fixture database");
    conn.execute_batch(SCHEMA).expect("failed to create schema");
    conn.execute_batch(SAMPLE_DATA).expect("failed to insert sample data");
    drop(conn);

    (dir, Database::new(path))
}
