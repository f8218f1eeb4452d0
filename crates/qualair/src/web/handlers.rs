//! Route handlers.
//!
//! Each handler parses its form, runs the database and chart work on the
//! blocking pool, then renders one page template.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Form;
use minijinja::context;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{AppState, WebError};
use crate::chart;
use crate::error::{Error, Result};
use crate::report::{self, DateWindow, PollutantAverage};
use crate::storage::{RecordSet, Table, Zone};

/// Default first day of the histogram window.
const DEFAULT_START_DAY: u32 = 1;

/// Default last day of the histogram window.
const DEFAULT_END_DAY: u32 = 31;

type PageResult = std::result::Result<Response, WebError>;

/// `/afficher_tables` form.
#[derive(Debug, Default, Deserialize)]
pub struct TablesForm {
    table_name: Option<String>,
}

/// `/filtre` form.
#[derive(Debug, Default, Deserialize)]
pub struct FilterForm {
    zas: Option<String>,
}

/// `/rechercher` form.
#[derive(Debug, Default, Deserialize)]
pub struct SearchForm {
    table_name: Option<String>,
    search_query: Option<String>,
}

/// `/histogramme` form.
#[derive(Debug, Default, Deserialize)]
pub struct HistogramForm {
    selected_zas: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

/// Run blocking database or rendering work off the async runtime.
async fn blocking<T, F>(work: F) -> std::result::Result<T, WebError>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::internal(format!("blocking task failed: {e}")))?
        .map_err(WebError::from)
}

fn page<S: serde::Serialize>(
    state: &AppState,
    status: StatusCode,
    template: &str,
    context: S,
) -> PageResult {
    let html = state.templates.render(template, context)?;
    Ok((status, Html(html)).into_response())
}

fn table_names() -> Vec<&'static str> {
    Table::ALL.iter().map(|t| t.name()).collect()
}

/// `GET /`
pub async fn index(State(state): State<AppState>) -> PageResult {
    let db = state.db.clone();
    let counts = match blocking(move || db.table_counts()).await {
        Ok(counts) => Some(counts),
        Err(e) => {
            warn!("Table counts unavailable: {}", e.message());
            None
        }
    };

    page(
        &state,
        StatusCode::OK,
        "index.html",
        context! { counts => counts },
    )
}

/// `GET /apropos`
pub async fn apropos(State(state): State<AppState>) -> PageResult {
    page(&state, StatusCode::OK, "apropos.html", ())
}

/// `GET /afficher_tables`
pub async fn tables_page(State(state): State<AppState>) -> PageResult {
    render_tables(&state, None, RecordSet::empty(), None)
}

/// `POST /afficher_tables`
pub async fn tables_submit(
    State(state): State<AppState>,
    Form(form): Form<TablesForm>,
) -> PageResult {
    let name = form.table_name.unwrap_or_default();
    debug!("Table browser request for '{}'", name);

    let db = state.db.clone();
    let limit = state.config.limits.table_rows;
    let requested = name.clone();
    match blocking(move || db.fetch_table(&requested, limit)).await {
        Ok(set) => render_tables(&state, Some(&name), set, None),
        Err(e) if e.status() == StatusCode::BAD_REQUEST => {
            warn!("Rejected table name '{}'", name);
            let message = format!("La table « {name} » n'existe pas.");
            let mut response = render_tables(&state, None, RecordSet::empty(), Some(&message))?;
            *response.status_mut() = StatusCode::BAD_REQUEST;
            Ok(response)
        }
        Err(e) => Err(e),
    }
}

fn render_tables(
    state: &AppState,
    table_name: Option<&str>,
    set: RecordSet,
    error: Option<&str>,
) -> PageResult {
    page(
        state,
        StatusCode::OK,
        "afficher_tables.html",
        context! {
            tables => table_names(),
            table_name => table_name,
            columns => set.columns,
            rows => set.rows,
            error => error,
        },
    )
}

/// `GET /filtre`
pub async fn filter_page(State(state): State<AppState>) -> PageResult {
    render_filter(&state, None).await
}

/// `POST /filtre`
pub async fn filter_submit(
    State(state): State<AppState>,
    Form(form): Form<FilterForm>,
) -> PageResult {
    let code = form.zas.map(|z| z.trim().to_string()).filter(|z| !z.is_empty());
    debug!("Zone filter request for {:?}", code);
    render_filter(&state, code).await
}

async fn render_filter(state: &AppState, code: Option<String>) -> PageResult {
    let db = state.db.clone();
    let selected = code.clone();
    let (zones, results) = blocking(move || {
        let zones = db.list_zones()?;
        let results = code
            .as_deref()
            .map(|code| db.filtered_measurements(code))
            .unwrap_or_default();
        Ok((zones, results))
    })
    .await?;

    page(
        state,
        StatusCode::OK,
        "filtre.html",
        context! {
            zas_options => zones,
            selected_zas => selected,
            results => results,
        },
    )
}

/// `POST /rechercher`
pub async fn search(State(state): State<AppState>, Form(form): Form<SearchForm>) -> PageResult {
    let table_name = form.table_name.unwrap_or_default();
    let query = form.search_query.unwrap_or_default();
    debug!("Search in '{}' for '{}'", table_name, query);

    let db = state.db.clone();
    let (name, text) = (table_name.clone(), query.clone());
    let set = blocking(move || Ok(db.search(&name, &text))).await?;

    page(
        &state,
        StatusCode::OK,
        "resultats_recherche.html",
        context! {
            table_name => table_name,
            search_query => query,
            columns => set.columns,
            rows => set.rows,
        },
    )
}

/// Histogram form, once read and checked.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HistogramRequest {
    zone_id: Option<i64>,
    start_day: u32,
    end_day: u32,
}

impl HistogramRequest {
    fn from_form(form: &HistogramForm) -> std::result::Result<Self, String> {
        let start_day = parse_day(form.start_date.as_deref(), DEFAULT_START_DAY);
        let end_day = parse_day(form.end_date.as_deref(), DEFAULT_END_DAY);
        if start_day > end_day {
            return Err(format!(
                "Le jour de début ({start_day}) est postérieur au jour de fin ({end_day})."
            ));
        }

        let zone_id = match form.selected_zas.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<i64>()
                    .map_err(|_| format!("Identifiant de zone invalide : « {raw} »."))?,
            ),
        };

        Ok(Self {
            zone_id,
            start_day,
            end_day,
        })
    }
}

/// Day of month from a form field, defaulted when absent or unreadable and
/// clamped to `1..=31`.
fn parse_day(raw: Option<&str>, default: u32) -> u32 {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<i64>().ok())
        .map_or(default, |day| {
            u32::try_from(day.clamp(1, 31)).unwrap_or(default)
        })
}

/// What the histogram page shows below its form.
#[derive(Debug, Default)]
struct HistogramView {
    zone_name: Option<String>,
    image: Option<String>,
    averages: Vec<PollutantAverage>,
    error: Option<String>,
}

/// `GET /histogramme`
pub async fn histogram_page(State(state): State<AppState>) -> PageResult {
    let db = state.db.clone();
    let zones = blocking(move || db.list_zones_with_id()).await?;
    render_histogram(
        &state,
        &zones,
        DEFAULT_START_DAY,
        DEFAULT_END_DAY,
        None,
        HistogramView::default(),
    )
}

/// `POST /histogramme`
pub async fn histogram_submit(
    State(state): State<AppState>,
    Form(form): Form<HistogramForm>,
) -> PageResult {
    debug!("Histogram request {:?}", form);
    let db = state.db.clone();
    let zones = blocking(move || db.list_zones_with_id()).await?;

    let request = match HistogramRequest::from_form(&form) {
        Ok(request) => request,
        Err(message) => {
            let view = HistogramView {
                error: Some(message),
                ..HistogramView::default()
            };
            let start = parse_day(form.start_date.as_deref(), DEFAULT_START_DAY);
            let end = parse_day(form.end_date.as_deref(), DEFAULT_END_DAY);
            return render_histogram(&state, &zones, start, end, None, view);
        }
    };

    let zone_name = match request.zone_id {
        None => None,
        Some(id) => match zones.iter().find(|zone| zone.id == id) {
            Some(zone) => Some(zone.name.clone()),
            None => {
                let view = HistogramView {
                    error: Some(format!("La zone {id} n'existe pas.")),
                    ..HistogramView::default()
                };
                return render_histogram(
                    &state,
                    &zones,
                    request.start_day,
                    request.end_day,
                    None,
                    view,
                );
            }
        },
    };

    let db = state.db.clone();
    let (year, month) = (state.config.report.year, state.config.report.month);
    let (start_day, end_day, zone_id) = (request.start_day, request.end_day, request.zone_id);
    let (averages, image) = blocking(move || {
        let window = DateWindow::month_days(year, month, start_day, end_day)?;
        let averages = report::average_by_pollutant(&db, zone_id, &window)?;
        let labels: Vec<String> = averages.iter().map(|a| a.pollutant.clone()).collect();
        let values: Vec<f64> = averages.iter().map(|a| a.mean).collect();
        let image = chart::render_bar_chart(&labels, &values)?;
        Ok((averages, image))
    })
    .await?;

    let view = HistogramView {
        zone_name: Some(zone_name.unwrap_or_else(|| "Toutes les zones".to_string())),
        image: Some(image),
        averages,
        error: None,
    };
    render_histogram(
        &state,
        &zones,
        request.start_day,
        request.end_day,
        request.zone_id,
        view,
    )
}

fn render_histogram(
    state: &AppState,
    zones: &[Zone],
    start_day: u32,
    end_day: u32,
    selected: Option<i64>,
    view: HistogramView,
) -> PageResult {
    page(
        state,
        StatusCode::OK,
        "histogramme.html",
        context! {
            zas_options => zones,
            selected_zas => selected,
            selected_zas_name => view.zone_name,
            selected_start_date => start_day,
            selected_end_date => end_day,
            histogram_image => view.image,
            averages => view.averages,
            year => state.config.report.year,
            month => state.config.report.month,
            error => view.error,
        },
    )
}

/// `GET /statistiques`
pub async fn statistics(State(state): State<AppState>) -> PageResult {
    let db = state.db.clone();
    let config = state.config.clone();
    let (window, stats, image) = blocking(move || {
        let window = config.stats_window()?;
        let samples = db.pollutant_samples(None, &window)?;
        let stats = report::descriptive_stats(&samples);
        let image = chart::render_box_plot(&samples)?;
        Ok((window, stats, image))
    })
    .await?;

    page(
        &state,
        StatusCode::OK,
        "statistiques.html",
        context! {
            start => window.start_param(),
            end => window.end_param(),
            stats_par_polluant => stats,
            img_bytes => image,
        },
    )
}

/// Fallback for unknown routes.
pub async fn not_found(State(state): State<AppState>) -> PageResult {
    page(&state, StatusCode::NOT_FOUND, "error/404.html", ())
}
