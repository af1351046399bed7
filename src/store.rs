use crate::types::{DailyNewsItem, Result, VocabularyEntry};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Pool, Postgres, Row};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Persistence for assembled daily news records.
#[async_trait]
pub trait ScriptStore: Send + Sync {
    /// Bulk upsert keyed by the deterministic ID. Re-running a day
    /// overwrites existing rows instead of duplicating them. Any database
    /// error aborts the whole batch.
    async fn upsert_batch(&self, items: &[DailyNewsItem]) -> Result<usize>;

    async fn fetch_by_date(&self, date: NaiveDate) -> Result<Vec<DailyNewsItem>>;
}

pub struct PostgresStore {
    db: Pool<Postgres>,
}

impl PostgresStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let db = PgPool::connect(database_url).await?;
        Ok(Self { db })
    }

    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS daily_news (
                id TEXT PRIMARY KEY,
                news_date DATE NOT NULL,
                category TEXT NOT NULL,
                original_title TEXT NOT NULL,
                english_script TEXT NOT NULL,
                japanese_translation TEXT NOT NULL,
                key_vocabulary JSONB NOT NULL DEFAULT '[]',
                level TEXT NOT NULL,
                audio_url TEXT NOT NULL,
                source TEXT NOT NULL,
                is_published BOOLEAN NOT NULL DEFAULT false
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_daily_news_date ON daily_news (news_date)")
            .execute(&self.db)
            .await?;

        debug!("Ensured daily_news schema");
        Ok(())
    }
}

#[async_trait]
impl ScriptStore for PostgresStore {
    async fn upsert_batch(&self, items: &[DailyNewsItem]) -> Result<usize> {
        let mut stored = 0;

        for item in items {
            let vocabulary = serde_json::to_value(&item.key_vocabulary)?;

            let result = sqlx::query(
                r#"
                INSERT INTO daily_news (
                    id, news_date, category, original_title, english_script,
                    japanese_translation, key_vocabulary, level, audio_url,
                    source, is_published
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                ON CONFLICT (id) DO UPDATE SET
                    news_date = EXCLUDED.news_date,
                    category = EXCLUDED.category,
                    original_title = EXCLUDED.original_title,
                    english_script = EXCLUDED.english_script,
                    japanese_translation = EXCLUDED.japanese_translation,
                    key_vocabulary = EXCLUDED.key_vocabulary,
                    level = EXCLUDED.level,
                    audio_url = EXCLUDED.audio_url,
                    source = EXCLUDED.source,
                    is_published = EXCLUDED.is_published
                "#,
            )
            .bind(&item.id)
            .bind(item.news_date)
            .bind(&item.category)
            .bind(&item.original_title)
            .bind(&item.english_script)
            .bind(&item.japanese_translation)
            .bind(vocabulary)
            .bind(&item.level)
            .bind(&item.audio_url)
            .bind(&item.source)
            .bind(item.is_published)
            .execute(&self.db)
            .await?;

            if result.rows_affected() > 0 {
                stored += 1;
            }
        }

        info!("Upserted {} of {} daily news records", stored, items.len());
        Ok(stored)
    }

    async fn fetch_by_date(&self, date: NaiveDate) -> Result<Vec<DailyNewsItem>> {
        let rows = sqlx::query("SELECT * FROM daily_news WHERE news_date = $1 ORDER BY id")
            .bind(date)
            .fetch_all(&self.db)
            .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let vocabulary_json: serde_json::Value = row.try_get("key_vocabulary")?;
            let key_vocabulary: Vec<VocabularyEntry> = serde_json::from_value(vocabulary_json)?;

            items.push(DailyNewsItem {
                id: row.try_get("id")?,
                news_date: row.try_get("news_date")?,
                category: row.try_get("category")?,
                original_title: row.try_get("original_title")?,
                english_script: row.try_get("english_script")?,
                japanese_translation: row.try_get("japanese_translation")?,
                key_vocabulary,
                level: row.try_get("level")?,
                audio_url: row.try_get("audio_url")?,
                source: row.try_get("source")?,
                is_published: row.try_get("is_published")?,
            });
        }

        Ok(items)
    }
}

/// In-memory store used by tests.
#[derive(Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, DailyNewsItem>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn get(&self, id: &str) -> Option<DailyNewsItem> {
        self.items.read().await.get(id).cloned()
    }
}

#[async_trait]
impl ScriptStore for MemoryStore {
    async fn upsert_batch(&self, items: &[DailyNewsItem]) -> Result<usize> {
        let mut map = self.items.write().await;
        for item in items {
            map.insert(item.id.clone(), item.clone());
        }
        Ok(items.len())
    }

    async fn fetch_by_date(&self, date: NaiveDate) -> Result<Vec<DailyNewsItem>> {
        let map = self.items.read().await;
        let mut items: Vec<DailyNewsItem> = map
            .values()
            .filter(|item| item.news_date == date)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }
}
