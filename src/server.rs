use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::diff::DiffMode;
use crate::report::{self, PairingStrategy, ReportFormat, ReportOptions};
use crate::store::{SharedStore, SnapshotSource};
use crate::{info_time, Error, Result};

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({ "error": msg }))).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidOption { .. } => ApiError::BadRequest(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// `?pairing=adjacent|fixed-offset&offset_hours=3&mode=positional|address`
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub pairing: Option<String>,
    pub offset_hours: Option<i64>,
    pub mode: Option<String>,
}

impl ReportQuery {
    pub fn options(&self, format: ReportFormat) -> Result<ReportOptions> {
        let pairing = match &self.pairing {
            Some(name) => PairingStrategy::from_name(name, self.offset_hours)?,
            None => PairingStrategy::default(),
        };
        let diff_mode = match &self.mode {
            Some(name) => name.parse()?,
            None => DiffMode::default(),
        };
        Ok(ReportOptions {
            pairing,
            diff_mode,
            format,
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/report", get(report_html))
        .route("/report.txt", get(report_text))
        .with_state(state)
}

/// Serves until `shutdown` is cancelled.
pub async fn serve(host: &str, port: u16, state: AppState, shutdown: CancellationToken) -> Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info_time!("Listening on http://{}", addr);
    info_time!("  Status: GET http://{}/", addr);
    info_time!("  Report: GET http://{}/report", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    info_time!("Server stopped");
    Ok(())
}

pub async fn status(State(state): State<AppState>) -> core::result::Result<Json<Value>, ApiError> {
    let (snapshots, rows) = state
        .store
        .run(|store| Ok((store.select_distinct_timestamps()?.len(), store.row_count()?)))
        .await?;
    Ok(Json(json!({
        "message": "Bitcoin Rich List Scraper is running",
        "snapshots": snapshots,
        "rows": rows,
    })))
}

pub async fn report_html(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> core::result::Result<Html<String>, ApiError> {
    let options = query.options(ReportFormat::Html)?;
    let body = state.store.run(move |store| report::render(&*store, &options)).await?;
    Ok(Html(report::html_page(&body)))
}

pub async fn report_text(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> core::result::Result<String, ApiError> {
    let options = query.options(ReportFormat::Text)?;
    Ok(state.store.run(move |store| report::render(&*store, &options)).await?)
}
