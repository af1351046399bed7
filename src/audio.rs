use crate::types::{PipelineError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Text-to-speech backend.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize MP3 bytes for the given text and voice.
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>>;
}

#[derive(Serialize)]
struct SpeechRequest {
    model: String,
    input: String,
    voice: String,
    response_format: String,
}

pub struct OpenAiSpeech {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiSpeech {
    pub fn new(client: Client, api_key: String, base_url: String, model: String) -> Self {
        Self {
            client,
            api_key,
            base_url,
            model,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeech {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        let request = SpeechRequest {
            model: self.model.clone(),
            input: text.to_string(),
            voice: voice.to_string(),
            response_format: "mp3".to_string(),
        };

        let response = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Synthesis(format!("HTTP {status}")));
        }

        let bytes = response.bytes().await?;
        debug!("Synthesized {} bytes of audio", bytes.len());
        Ok(bytes.to_vec())
    }
}

/// Canned synthesizer for development and testing.
pub struct MockSynthesizer;

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, _text: &str, _voice: &str) -> Result<Vec<u8>> {
        Ok(b"ID3mock-mp3-bytes".to_vec())
    }
}

/// Destination for synthesized audio artifacts.
///
/// `store` returns the public URL of the artifact on success. An upload
/// failure is an error; no URL is fabricated for a missing artifact.
#[async_trait]
pub trait AudioStore: Send + Sync {
    async fn store(&self, id: &str, bytes: &[u8]) -> Result<String>;
}

/// Writes MP3 files under a directory served as static content.
pub struct LocalAudioStore {
    dir: PathBuf,
    public_base_url: String,
}

impl LocalAudioStore {
    pub fn new(dir: PathBuf, public_base_url: String) -> Self {
        Self {
            dir,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AudioStore for LocalAudioStore {
    async fn store(&self, id: &str, bytes: &[u8]) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(format!("{id}.mp3"));
        tokio::fs::write(&path, bytes).await?;

        info!("Wrote audio file {}", path.display());
        Ok(format!("{}/audio/news/{id}.mp3", self.public_base_url))
    }
}

/// Uploads MP3 files to an object-storage bucket over HTTP.
pub struct ObjectStorageStore {
    client: Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

impl ObjectStorageStore {
    pub fn new(client: Client, base_url: String, service_key: String, bucket: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            bucket,
        }
    }
}

#[async_trait]
impl AudioStore for ObjectStorageStore {
    async fn store(&self, id: &str, bytes: &[u8]) -> Result<String> {
        let upload_url = format!(
            "{}/storage/v1/object/{}/{id}.mp3",
            self.base_url, self.bucket
        );

        let response = self
            .client
            .post(&upload_url)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .header("Content-Type", "audio/mpeg")
            .header("x-upsert", "true")
            .body(bytes.to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Audio upload failed for {}: HTTP {}", id, status);
            return Err(PipelineError::Storage(format!(
                "upload of {id}.mp3 failed: HTTP {status}"
            )));
        }

        info!("Uploaded audio object {}.mp3 to bucket {}", id, self.bucket);
        Ok(format!(
            "{}/storage/v1/object/public/{}/{id}.mp3",
            self.base_url, self.bucket
        ))
    }
}
