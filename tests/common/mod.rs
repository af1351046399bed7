#![allow(dead_code)]

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use daily_news_pipeline::{
    FetchConfig, LocalAudioStore, MemoryStore, MockScriptModel, MockSynthesizer, NewsPipeline,
    RssFetcher,
};
use std::path::Path as FsPath;
use std::sync::Arc;

/// Serves deterministic feed content on a loopback port so tests never
/// touch real networks: `/feeds/:category` returns a three-item RSS
/// document, `/broken` always fails, and the storage upload route always
/// rejects.
pub async fn spawn_stub_server() -> String {
    let app = Router::new()
        .route("/feeds/:category", get(feed_handler))
        .route("/broken", get(broken_handler))
        .route("/storage/v1/object/:bucket/:object", post(failing_upload));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

async fn feed_handler(Path(category): Path<String>) -> impl IntoResponse {
    let mut items = String::new();
    for n in 1..=3 {
        items.push_str(&format!(
            r#"<item>
      <title>{category} headline {n}</title>
      <link>https://example.com/{category}/{n}</link>
      <description>{category} description {n}</description>
      <pubDate>Thu, 07 Aug 2025 0{n}:00:00 GMT</pubDate>
    </item>
"#
        ));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>{category} stub feed</title>
    <link>https://example.com/{category}</link>
    <description>Stub feed for {category}</description>
    {items}
  </channel>
</rss>"#
    )
}

async fn broken_handler() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn failing_upload() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "storage unavailable")
}

/// A fetcher whose category table points at the stub server. Categories in
/// `broken` resolve to the always-failing route.
pub fn stub_fetcher(base: &str, categories: &[&str], broken: &[&str]) -> RssFetcher {
    let feeds = categories
        .iter()
        .map(|&category| {
            let url = if broken.contains(&category) {
                format!("{base}/broken")
            } else {
                format!("{base}/feeds/{category}")
            };
            (category.to_string(), url)
        })
        .collect();
    RssFetcher::with_feeds(FetchConfig::default(), feeds)
}

/// A completion payload that satisfies the strict script schema.
pub fn valid_script_json() -> String {
    serde_json::json!({
        "originalTitle": "Test Headline",
        "category": "technology",
        "englishScript": "Good morning. Here is today's news story, explained slowly and clearly for learners.",
        "japaneseTranslation": "おはようございます。本日のニュースをわかりやすくお伝えします。",
        "keyVocabulary": [
            {"word": "story", "meaning": "物語"},
            {"word": "explain", "meaning": "説明する"},
            {"word": "clearly", "meaning": "はっきりと"},
            {"word": "learner", "meaning": "学習者"},
            {"word": "today", "meaning": "今日"},
            {"word": "news", "meaning": "ニュース"}
        ],
        "level": "intermediate"
    })
    .to_string()
}

pub struct StubPipeline {
    pub pipeline: NewsPipeline,
    pub store: Arc<MemoryStore>,
    pub model: Arc<MockScriptModel>,
    pub backup_dir: std::path::PathBuf,
    pub audio_dir: std::path::PathBuf,
}

/// Wire a pipeline out of the stub fetcher, mock model and synthesizer, a
/// local audio store and an in-memory script store, all rooted in `tmp`.
pub fn stub_pipeline(
    base: &str,
    categories: &[&str],
    broken: &[&str],
    completion: String,
    tmp: &FsPath,
) -> StubPipeline {
    let backup_dir = tmp.join("backups");
    let audio_dir = tmp.join("audio");

    let store = Arc::new(MemoryStore::new());
    let model = Arc::new(MockScriptModel::new(completion));
    let pipeline = NewsPipeline::new(
        Arc::new(stub_fetcher(base, categories, broken)),
        model.clone(),
        Arc::new(MockSynthesizer),
        Arc::new(LocalAudioStore::new(
            audio_dir.clone(),
            "http://localhost:3000".to_string(),
        )),
        store.clone(),
        backup_dir.clone(),
        "alloy".to_string(),
    );

    StubPipeline {
        pipeline,
        store,
        model,
        backup_dir,
        audio_dir,
    }
}
