//! HTTP dashboard.
//!
//! Routes:
//!   GET  /                  home page with table row counts
//!   GET  /apropos           about page
//!   GET  /afficher_tables   table browser; POST `table_name`
//!   GET  /filtre            zone filter; POST `zas`
//!   POST /rechercher        free-text search; `table_name`, `search_query`
//!   GET  /histogramme       pollutant averages; POST `selected_zas`, `start_date`, `end_date`
//!   GET  /statistiques      per-pollutant statistics and box plot

pub mod error;
mod handlers;
mod templates;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::chart;
use crate::config::Config;
use crate::error::Result;
use crate::storage::Database;

pub use error::WebError;
pub use templates::Templates;

/// Shared state of every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Measurement database handle.
    pub db: Database,
    /// Loaded configuration.
    pub config: Arc<Config>,
    /// Compiled page templates.
    pub templates: Arc<Templates>,
}

impl AppState {
    /// Build the state from a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a page template fails to compile.
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            db: Database::from_config(&config),
            config: Arc::new(config),
            templates: Arc::new(Templates::new()?),
        })
    }
}

/// Build the dashboard router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/apropos", get(handlers::apropos))
        .route(
            "/afficher_tables",
            get(handlers::tables_page).post(handlers::tables_submit),
        )
        .route(
            "/filtre",
            get(handlers::filter_page).post(handlers::filter_submit),
        )
        .route("/rechercher", post(handlers::search))
        .route(
            "/histogramme",
            get(handlers::histogram_page).post(handlers::histogram_submit),
        )
        .route("/statistiques", get(handlers::statistics))
        .fallback(handlers::not_found)
        .with_state(state)
}

/// Serve the dashboard until interrupted.
///
/// # Errors
///
/// Returns an error if the bind address is invalid, the templates fail to
/// compile, or the listener cannot be bound.
pub async fn serve(config: Config) -> Result<()> {
    let addr = config.bind_addr()?;
    chart::init_fonts(config.charts.font_path.as_deref());

    if !config.database_path().exists() {
        warn!(
            "Database {} does not exist; pages will report errors",
            config.database_path().display()
        );
    }

    let state = AppState::new(config)?;
    let listener = TcpListener::bind(addr).await?;
    info!("Dashboard listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Dashboard stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
