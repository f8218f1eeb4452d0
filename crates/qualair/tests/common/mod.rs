//! Shared fixtures for the dashboard integration tests.

#![allow(dead_code)]

use std::path::Path;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use qualair::web::{router, AppState};
use qualair::Config;
use rusqlite::Connection;
use tempfile::TempDir;
use tower::ServiceExt;

const SCHEMA: &str = include_str!("../fixtures/schema.sql");

const DATA: &str = include_str!("../fixtures/sample_data.sql");

/// A dashboard over a populated temporary database.
pub struct TestApp {
    pub dir: TempDir,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join("QUALAIR.db");
        create_database(&path);
        let router = app_for(&path);
        Self { dir, router }
    }

    /// A dashboard whose database file does not exist.
    pub fn without_database() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let router = app_for(&dir.path().join("missing.db"));
        Self { dir, router }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("invalid request");
        self.send(request).await
    }

    pub async fn post_form(&self, uri: &str, form: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .expect("invalid request");
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read body");
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn create_database(path: &Path) {
    let conn = Connection::open(path).expect("failed to create fixture database");
    conn.execute_batch(SCHEMA).expect("failed to create schema");
    conn.execute_batch(DATA).expect("failed to insert data");
}

fn app_for(path: &Path) -> Router {
    let mut config = Config::default();
    config.database.path = path.to_path_buf();
    router(AppState::new(config).expect("templates must compile"))
}

/// Byte offset of `needle` in `haystack`, failing the test when absent.
pub fn position(haystack: &str, needle: &str) -> usize {
    haystack
        .find(needle)
        .unwrap_or_else(|| panic!("'{needle}' not found in page"))
}
