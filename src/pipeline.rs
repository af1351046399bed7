use crate::audio::{AudioStore, SpeechSynthesizer};
use crate::fetcher::{all_categories, NewsSource};
use crate::scriptgen::{ScriptGenerator, ScriptModel};
use crate::store::ScriptStore;
use crate::types::{news_id, DailyNewsItem, PipelineError, Result};
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// One row of the fixed cron partition: which categories a scheduled
/// invocation covers, how many items per category, and the day-global
/// index its IDs start at.
#[derive(Debug, Clone, Copy)]
pub struct BatchSpec {
    pub number: u32,
    pub categories: &'static [&'static str],
    pub per_category: usize,
    pub start_index: usize,
}

pub const BATCHES: &[BatchSpec] = &[
    BatchSpec {
        number: 1,
        categories: &["politics", "technology", "business", "sports", "health"],
        per_category: 1,
        start_index: 0,
    },
    BatchSpec {
        number: 2,
        categories: &["entertainment", "world", "science"],
        per_category: 2,
        start_index: 5,
    },
    BatchSpec {
        number: 3,
        categories: &["education", "culture"],
        per_category: 2,
        start_index: 11,
    },
    BatchSpec {
        number: 4,
        categories: &["travel", "lifestyle"],
        per_category: 2,
        start_index: 15,
    },
];

pub fn batch_spec(number: u32) -> Option<&'static BatchSpec> {
    BATCHES.iter().find(|spec| spec.number == number)
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RunReport {
    pub date: NaiveDate,
    pub fetched: usize,
    pub generated: usize,
    pub persisted: usize,
    pub skipped: usize,
}

/// Drives the four stages sequentially per item, skipping failed items and
/// accumulating the rest. All stage implementations are injected.
pub struct NewsPipeline {
    source: Arc<dyn NewsSource>,
    generator: ScriptGenerator,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    audio_store: Arc<dyn AudioStore>,
    store: Arc<dyn ScriptStore>,
    backup_dir: PathBuf,
    voice: String,
}

impl NewsPipeline {
    pub fn new(
        source: Arc<dyn NewsSource>,
        model: Arc<dyn ScriptModel>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        audio_store: Arc<dyn AudioStore>,
        store: Arc<dyn ScriptStore>,
        backup_dir: PathBuf,
        voice: String,
    ) -> Self {
        Self {
            source,
            generator: ScriptGenerator::new(model),
            synthesizer,
            audio_store,
            store,
            backup_dir,
            voice,
        }
    }

    /// Run one scheduled batch for the given date.
    pub async fn run_batch(&self, date: NaiveDate, number: u32) -> Result<RunReport> {
        let spec = batch_spec(number)
            .ok_or_else(|| PipelineError::General(format!("unknown batch number: {number}")))?;

        let categories: Vec<String> = spec.categories.iter().map(|c| c.to_string()).collect();
        info!(
            "Running batch {} ({} categories, {} per category, start index {})",
            spec.number,
            categories.len(),
            spec.per_category,
            spec.start_index
        );
        self.run(date, &categories, spec.per_category, spec.start_index)
            .await
    }

    /// Process every configured category in one call.
    pub async fn run_full(&self, date: NaiveDate) -> Result<RunReport> {
        let categories = all_categories();
        info!("Running full pipeline over {} categories", categories.len());
        self.run(date, &categories, 1, 0).await
    }

    /// The single parameterized implementation behind both entry points.
    ///
    /// Item indices are positional within the fetched list, so a skipped
    /// item leaves a gap in the day's ID sequence rather than shifting
    /// later IDs.
    pub async fn run(
        &self,
        date: NaiveDate,
        categories: &[String],
        per_category: usize,
        start_index: usize,
    ) -> Result<RunReport> {
        let items = self.source.fetch_batch(categories, per_category).await;
        info!("Fetched {} news items for {}", items.len(), date);

        let mut records = Vec::new();
        let mut skipped = 0;

        for (offset, item) in items.iter().enumerate() {
            let id = news_id(date, start_index + offset);

            let script = match self.generator.generate(item).await {
                Ok(script) => script,
                Err(e) => {
                    warn!("Skipping {} ('{}'): {}", id, item.title, e);
                    skipped += 1;
                    continue;
                }
            };

            let audio = match self
                .synthesizer
                .synthesize(&script.english_script, &self.voice)
                .await
            {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Skipping {} ('{}'): {}", id, item.title, e);
                    skipped += 1;
                    continue;
                }
            };

            let audio_url = match self.audio_store.store(&id, &audio).await {
                Ok(url) => url,
                Err(e) => {
                    warn!("Skipping {} ('{}'): {}", id, item.title, e);
                    skipped += 1;
                    continue;
                }
            };

            records.push(DailyNewsItem {
                id,
                news_date: date,
                category: script.category,
                original_title: script.original_title,
                english_script: script.english_script,
                japanese_translation: script.japanese_translation,
                key_vocabulary: script.key_vocabulary,
                level: script.level,
                audio_url,
                source: item.source.clone(),
                is_published: true,
            });
        }

        // Snapshot to disk before touching the database so a failed upsert
        // never loses generated content.
        if !records.is_empty() {
            let backup_path = self.write_backup(date, &records).await?;
            info!("Wrote backup {}", backup_path.display());
        }

        let persisted = self.store.upsert_batch(&records).await?;

        let report = RunReport {
            date,
            fetched: items.len(),
            generated: records.len(),
            persisted,
            skipped,
        };
        info!(
            "Pipeline run complete for {}: fetched {}, generated {}, persisted {}, skipped {}",
            report.date, report.fetched, report.generated, report.persisted, report.skipped
        );
        Ok(report)
    }

    async fn write_backup(&self, date: NaiveDate, records: &[DailyNewsItem]) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.backup_dir).await?;
        let path = self.backup_dir.join(format!("news_{date}.json"));
        let payload = serde_json::to_vec_pretty(records)?;
        tokio::fs::write(&path, payload).await?;
        Ok(path)
    }
}
