mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use daily_news_pipeline::{create_app, AppState, ScriptStore};
use std::sync::Arc;
use tower::ServiceExt;

const BATCH2_CATEGORIES: &[&str] = &["entertainment", "world", "science"];

async fn stub_state(tmp: &std::path::Path, cron_secret: Option<&str>) -> AppState {
    let base = common::spawn_stub_server().await;
    let stub = common::stub_pipeline(
        &base,
        BATCH2_CATEGORIES,
        &[],
        common::valid_script_json(),
        tmp,
    );

    AppState {
        pipeline: stub.pipeline,
        store: stub.store as Arc<dyn ScriptStore>,
        cron_secret: cron_secret.map(|s| s.to_string()),
    }
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn cron_rejects_missing_bearer_token() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let app = create_app(stub_state(tmp.path(), Some("test-secret")).await);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/cron/generate-news?batch=2")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert!(body["error"].is_string());

    Ok(())
}

#[tokio::test]
async fn cron_rejects_wrong_bearer_token() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let app = create_app(stub_state(tmp.path(), Some("test-secret")).await);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/cron/generate-news?batch=2")
                .header("Authorization", "Bearer wrong-secret")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn cron_rejects_out_of_range_batch() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let app = create_app(stub_state(tmp.path(), Some("test-secret")).await);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/cron/generate-news?batch=9")
                .header("Authorization", "Bearer test-secret")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("9"));

    Ok(())
}

#[tokio::test]
async fn cron_rejects_missing_batch_parameter() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let app = create_app(stub_state(tmp.path(), Some("test-secret")).await);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/cron/generate-news")
                .header("Authorization", "Bearer test-secret")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn cron_runs_batch_and_reports_success() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let app = create_app(stub_state(tmp.path(), Some("test-secret")).await);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/cron/generate-news?batch=2")
                .header("Authorization", "Bearer test-secret")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["batch"], 2);
    assert!(body["message"].as_str().unwrap().contains("6"));
    assert!(body["date"].is_string());

    Ok(())
}

#[tokio::test]
async fn cron_allows_unauthenticated_requests_without_configured_secret() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let app = create_app(stub_state(tmp.path(), None).await);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/cron/generate-news?batch=2")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn daily_news_returns_persisted_rows() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let app = create_app(stub_state(tmp.path(), None).await);

    let run = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/cron/generate-news?batch=2")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(run.status(), StatusCode::OK);
    let run_body = body_json(run).await;
    let date = run_body["date"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/daily-news?date={date}"))
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 6);
    assert!(rows.iter().all(|row| row["audio_url"].is_string()));

    Ok(())
}

#[tokio::test]
async fn daily_news_rejects_malformed_date() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let app = create_app(stub_state(tmp.path(), None).await);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/daily-news?date=07-08-2025")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    Ok(())
}
