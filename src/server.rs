use crate::pipeline::{batch_spec, NewsPipeline};
use crate::store::ScriptStore;
use crate::types::{DailyNewsItem, Result};
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

pub struct AppState {
    pub pipeline: NewsPipeline,
    pub store: Arc<dyn ScriptStore>,
    pub cron_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CronParams {
    batch: Option<u32>,
}

#[derive(Debug, Serialize)]
struct CronSuccess {
    success: bool,
    message: String,
    date: String,
    batch: u32,
}

#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiError {
            error: message.into(),
        }),
    )
        .into_response()
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/api/cron/generate-news", get(generate_news))
        .route("/api/daily-news", get(daily_news))
        .with_state(Arc::new(state))
}

/// Cron-triggered batch run. When a shared secret is configured the caller
/// must present it as a bearer token.
async fn generate_news(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CronParams>,
    headers: HeaderMap,
) -> Response {
    if let Some(secret) = &state.cron_secret {
        let expected = format!("Bearer {secret}");
        let provided = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        if provided != Some(expected.as_str()) {
            return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
        }
    }

    let batch = match params.batch {
        Some(batch) if batch_spec(batch).is_some() => batch,
        Some(batch) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("invalid batch number: {batch}"),
            );
        }
        None => {
            return error_response(StatusCode::BAD_REQUEST, "missing batch parameter");
        }
    };

    let date = Utc::now().date_naive();
    info!("Cron request accepted for batch {} on {}", batch, date);

    match state.pipeline.run_batch(date, batch).await {
        Ok(report) => (
            StatusCode::OK,
            Json(CronSuccess {
                success: true,
                message: format!(
                    "Generated {} of {} news items ({} skipped)",
                    report.persisted, report.fetched, report.skipped
                ),
                date: date.to_string(),
                batch,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Batch {} failed: {}", batch, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DailyNewsParams {
    date: Option<String>,
}

/// Read path for generated lessons: the rows persisted for one day.
async fn daily_news(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DailyNewsParams>,
) -> Response {
    let date = match params.date {
        Some(raw) => match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => {
                return error_response(StatusCode::BAD_REQUEST, format!("invalid date: {raw}"));
            }
        },
        None => Utc::now().date_naive(),
    };

    match state.store.fetch_by_date(date).await {
        Ok(items) => (StatusCode::OK, Json::<Vec<DailyNewsItem>>(items)).into_response(),
        Err(e) => {
            error!("Failed to load daily news for {}: {}", date, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Listening on port {}", port);
    axum::serve(listener, app).await?;
    Ok(())
}
