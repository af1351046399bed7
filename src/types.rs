use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single item pulled from an RSS feed. Built per fetch cycle and
/// discarded once a script has been generated for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    pub published_at: Option<DateTime<Utc>>,
    pub description: String,
    pub source: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    pub word: String,
    pub meaning: String,
}

/// Structured broadcast script decoded from the model completion.
///
/// Field names are camelCase on the wire to match the JSON schema the
/// prompt asks the model for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsScript {
    pub original_title: String,
    pub category: String,
    pub english_script: String,
    pub japanese_translation: String,
    pub key_vocabulary: Vec<VocabularyEntry>,
    pub level: String,
}

/// A fully assembled record, keyed by the deterministic per-day ID and
/// persisted via upsert so re-running a day overwrites instead of
/// duplicating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyNewsItem {
    pub id: String,
    pub news_date: NaiveDate,
    pub category: String,
    pub original_title: String,
    pub english_script: String,
    pub japanese_translation: String,
    pub key_vocabulary: Vec<VocabularyEntry>,
    pub level: String,
    pub audio_url: String,
    pub source: String,
    pub is_published: bool,
}

/// Deterministic record ID: `N{YY}{MM}{DD}_{index+1}`.
///
/// `index` is the item's global position within the day, so batches with
/// fixed start indices never collide.
pub fn news_id(date: NaiveDate, index: usize) -> String {
    format!("N{}_{}", date.format("%y%m%d"), index + 1)
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Model response contained no JSON object")]
    MissingJson,

    #[error("Script failed validation: {0}")]
    InvalidScript(String),

    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("Audio storage failed: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
