use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use daily_news_pipeline::{
    AppState, AudioConfig, AudioStore, FetchConfig, LocalAudioStore, NewsPipeline,
    ObjectStorageStore, OpenAiChatModel, OpenAiSpeech, PipelineConfig, PostgresStore, RssFetcher,
    ScriptStore,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "daily-news-pipeline")]
#[command(about = "Generates daily news listening lessons from RSS feeds")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pipeline once and exit
    Run {
        /// Scheduled batch number (1-4)
        #[arg(long, conflicts_with = "full")]
        batch: Option<u32>,

        /// Process every category in one call
        #[arg(long)]
        full: bool,

        /// Target date, defaults to today (UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Serve the cron and read endpoints over HTTP
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
}

async fn build_pipeline(config: &PipelineConfig) -> Result<(NewsPipeline, Arc<dyn ScriptStore>)> {
    let api_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()?;

    let source = Arc::new(RssFetcher::new(FetchConfig::default()));
    let model = Arc::new(OpenAiChatModel::new(
        api_client.clone(),
        config.openai_api_key.clone(),
        config.openai_base_url.clone(),
        config.chat_model.clone(),
    ));
    let synthesizer = Arc::new(OpenAiSpeech::new(
        api_client.clone(),
        config.openai_api_key.clone(),
        config.openai_base_url.clone(),
        config.tts_model.clone(),
    ));

    let audio_store: Arc<dyn AudioStore> = match &config.audio {
        AudioConfig::Local {
            dir,
            public_base_url,
        } => Arc::new(LocalAudioStore::new(dir.clone(), public_base_url.clone())),
        AudioConfig::ObjectStorage {
            base_url,
            service_key,
            bucket,
        } => Arc::new(ObjectStorageStore::new(
            api_client,
            base_url.clone(),
            service_key.clone(),
            bucket.clone(),
        )),
    };

    let postgres = PostgresStore::connect(&config.database_url).await?;
    postgres.init_schema().await?;
    let store: Arc<dyn ScriptStore> = Arc::new(postgres);

    let pipeline = NewsPipeline::new(
        source,
        model,
        synthesizer,
        audio_store,
        store.clone(),
        config.backup_dir.clone(),
        config.tts_voice.clone(),
    );

    Ok((pipeline, store))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = PipelineConfig::from_env()?;

    match cli.command {
        Command::Run { batch, full, date } => {
            let (pipeline, _store) = build_pipeline(&config).await?;
            let date = date.unwrap_or_else(|| Utc::now().date_naive());

            let report = if full {
                pipeline.run_full(date).await?
            } else {
                let batch = batch.unwrap_or(1);
                pipeline.run_batch(date, batch).await?
            };

            info!(
                "Done: fetched {}, generated {}, persisted {}, skipped {}",
                report.fetched, report.generated, report.persisted, report.skipped
            );
        }
        Command::Serve { port } => {
            let (pipeline, store) = build_pipeline(&config).await?;
            let state = AppState {
                pipeline,
                store,
                cron_secret: config.cron_secret.clone(),
            };
            daily_news_pipeline::serve(state, port.unwrap_or(config.port)).await?;
        }
    }

    Ok(())
}
