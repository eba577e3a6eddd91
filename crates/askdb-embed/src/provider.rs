//! OpenAI-compatible HTTP providers.
//!
//! One client per concern: `HttpEmbedder` for `POST /embeddings`,
//! `HttpGenerator` for `POST /chat/completions`. Both carry a bounded
//! request timeout so a stalled provider degrades a search instead of
//! hanging it.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use askdb_core::traits::{Embedder, TextGenerator};

/// Request timeout for provider calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Completion budget for reformulation prompts.
const MAX_COMPLETION_TOKENS: u32 = 256;

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-large".to_string()
}

fn default_embedding_dim() -> usize {
    3072
}

fn default_generation_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Where and how to reach the embedding endpoint. `api_key` is the only
/// required field; the rest default to the hosted OpenAI surface.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Output width of `model`. Responses of any other width are rejected.
    #[serde(default = "default_embedding_dim")]
    pub dim: usize,
}

/// Chat-completion endpoint used for query reformulation.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
}

fn build_client() -> Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("build http client")
}

/// Embedding client for any OpenAI-compatible `/embeddings` endpoint.
pub struct HttpEmbedder {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dim: usize,
}

impl HttpEmbedder {
    pub fn new(config: &EmbeddingProviderConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(anyhow!("embedding provider api_key is not set"));
        }
        Ok(Self {
            client: build_client()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            dim: config.dim,
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest { model: &self.model, input: texts })
            .send()
            .await
            .with_context(|| format!("embedding request to {url}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("embedding endpoint returned {status}: {body}"));
        }

        let parsed: EmbeddingResponse = response.json().await.context("decode embedding response")?;
        if parsed.data.len() != texts.len() {
            return Err(anyhow!(
                "embedding endpoint returned {} vectors for {} inputs",
                parsed.data.len(),
                texts.len()
            ));
        }

        // Responses may arrive out of order; reassemble by declared index.
        let mut rows: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        for row in parsed.data {
            if row.embedding.len() != self.dim {
                return Err(anyhow!(
                    "embedding width {} does not match configured dim {}",
                    row.embedding.len(),
                    self.dim
                ));
            }
            let slot = rows
                .get_mut(row.index)
                .ok_or_else(|| anyhow!("embedding index {} out of range", row.index))?;
            if slot.is_some() {
                return Err(anyhow!("duplicate embedding index {}", row.index));
            }
            *slot = Some(row.embedding);
        }
        rows.into_iter()
            .enumerate()
            .map(|(i, slot)| slot.ok_or_else(|| anyhow!("missing embedding for input {i}")))
            .collect()
    }
}

/// Chat-completion client for any OpenAI-compatible `/chat/completions`
/// endpoint. Used only for short reformulation prompts.
pub struct HttpGenerator {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpGenerator {
    pub fn new(config: &GenerationProviderConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(anyhow!("generation provider api_key is not set"));
        }
        Ok(Self {
            client: build_client()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl TextGenerator for HttpGenerator {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: prompt },
            ],
            max_tokens: MAX_COMPLETION_TOKENS,
        };
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("completion request to {url}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("completion endpoint returned {status}: {body}"));
        }

        let parsed: ChatResponse = response.json().await.context("decode completion response")?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        Ok(content.trim().to_string())
    }
}
