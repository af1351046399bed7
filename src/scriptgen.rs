use crate::types::{NewsItem, NewsScript, PipelineError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Chat-completion backend for script generation.
#[async_trait]
pub trait ScriptModel: Send + Sync {
    fn model_name(&self) -> String;

    /// Request a single completion for the prompt.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

pub struct OpenAiChatModel {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OpenAiChatModel {
    pub fn new(client: Client, api_key: String, base_url: String, model: String) -> Self {
        Self {
            client,
            api_key,
            base_url,
            model,
            temperature: 0.7,
        }
    }
}

#[async_trait]
impl ScriptModel for OpenAiChatModel {
    fn model_name(&self) -> String {
        self.model.clone()
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::General(format!(
                "Chat completion failed: HTTP {status}"
            )));
        }

        let body = response.json::<ChatResponse>().await?;
        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::General("Chat completion had no choices".to_string()))?;

        Ok(choice.message.content)
    }
}

/// Canned-response model for development and testing. Records every prompt
/// it receives.
pub struct MockScriptModel {
    response: String,
    prompts: Mutex<Vec<String>>,
}

impl MockScriptModel {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScriptModel for MockScriptModel {
    fn model_name(&self) -> String {
        "mock".to_string()
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.response.clone())
    }
}

/// Builds the prompt, requests a completion and decodes the structured
/// script out of it.
pub struct ScriptGenerator {
    model: Arc<dyn ScriptModel>,
}

impl ScriptGenerator {
    pub fn new(model: Arc<dyn ScriptModel>) -> Self {
        Self { model }
    }

    pub fn build_prompt(item: &NewsItem) -> String {
        format!(
            "You are writing a short English listening lesson from a news item.\n\
             \n\
             News title: {title}\n\
             News summary: {description}\n\
             Category: {category}\n\
             \n\
             Write a natural broadcast-style English script of 300-400 words based on\n\
             this news item, suitable for intermediate learners, together with a\n\
             Japanese translation of the full script and a vocabulary list of 5-8 key\n\
             words with Japanese meanings.\n\
             \n\
             Respond with a single JSON object and nothing else, using exactly these\n\
             keys:\n\
             {{\n\
               \"originalTitle\": string,\n\
               \"category\": string,\n\
               \"englishScript\": string,\n\
               \"japaneseTranslation\": string,\n\
               \"keyVocabulary\": [{{\"word\": string, \"meaning\": string}}],\n\
               \"level\": \"beginner\" | \"intermediate\" | \"advanced\"\n\
             }}",
            title = item.title,
            description = item.description,
            category = item.category,
        )
    }

    pub async fn generate(&self, item: &NewsItem) -> Result<NewsScript> {
        let prompt = Self::build_prompt(item);
        debug!(
            "Requesting script for '{}' from model {}",
            item.title,
            self.model.model_name()
        );

        let completion = self.model.complete(&prompt).await?;
        let payload = extract_json_object(&completion).ok_or(PipelineError::MissingJson)?;

        let script: NewsScript = serde_json::from_str(payload)
            .map_err(|e| PipelineError::InvalidScript(e.to_string()))?;
        validate_script(&script)?;

        info!(
            "Generated script for '{}' ({} vocabulary entries, level {})",
            script.original_title,
            script.key_vocabulary.len(),
            script.level
        );
        Ok(script)
    }
}

/// Locate the first balanced `{...}` span in the completion text.
///
/// Brace depth is tracked outside of JSON string literals so braces inside
/// script text do not end the span early.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

fn validate_script(script: &NewsScript) -> Result<()> {
    if script.original_title.trim().is_empty() {
        return Err(PipelineError::InvalidScript(
            "originalTitle is empty".to_string(),
        ));
    }
    if script.english_script.trim().is_empty() {
        return Err(PipelineError::InvalidScript(
            "englishScript is empty".to_string(),
        ));
    }
    if script.japanese_translation.trim().is_empty() {
        return Err(PipelineError::InvalidScript(
            "japaneseTranslation is empty".to_string(),
        ));
    }
    if script.key_vocabulary.is_empty() {
        return Err(PipelineError::InvalidScript(
            "keyVocabulary is empty".to_string(),
        ));
    }
    if script
        .key_vocabulary
        .iter()
        .any(|v| v.word.trim().is_empty() || v.meaning.trim().is_empty())
    {
        return Err(PipelineError::InvalidScript(
            "keyVocabulary contains an empty word or meaning".to_string(),
        ));
    }
    if script.level.trim().is_empty() {
        return Err(PipelineError::InvalidScript("level is empty".to_string()));
    }
    Ok(())
}
