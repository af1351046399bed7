pub mod audio;
pub mod config;
pub mod fetcher;
pub mod pipeline;
pub mod scriptgen;
pub mod server;
pub mod store;
pub mod types;

pub use audio::{AudioStore, LocalAudioStore, MockSynthesizer, ObjectStorageStore, OpenAiSpeech, SpeechSynthesizer};
pub use config::{AudioConfig, PipelineConfig};
pub use fetcher::{FetchConfig, NewsSource, RssFetcher};
pub use pipeline::{batch_spec, BatchSpec, NewsPipeline, RunReport, BATCHES};
pub use scriptgen::{MockScriptModel, OpenAiChatModel, ScriptGenerator, ScriptModel};
pub use server::{create_app, serve, AppState};
pub use store::{MemoryStore, PostgresStore, ScriptStore};
pub use types::*;
