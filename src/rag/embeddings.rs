//! Embedding provider clients.
//!
//! The [`EmbeddingClient`] trait is the crate's only contract with an
//! embedding model: text in, fixed-length vector out. Two HTTP-backed
//! implementations are provided, one for OpenAI-compatible APIs and one
//! for a local Ollama server. Provider failures surface as
//! [`AppError::Embedding`]; whether that is fatal depends on the caller
//! (ingestion absorbs per-chunk failures, query-time embedding does not).

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::types::{AppError, Result};
use crate::utils::config::Config;

/// Produces fixed-length float vectors from text. Repeated calls on
/// identical text should be stable enough for caching, though exact
/// determinism is not required.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Batch variant; returns one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn model_name(&self) -> &str;
}

/// Build the configured embedding client.
pub fn create_embedder(config: &Config) -> Result<Arc<dyn EmbeddingClient>> {
    match config.rag.embedding_provider.as_str() {
        "openai" => {
            let api_key = config.llm.openai_api_key.clone().ok_or_else(|| {
                AppError::InvalidInput(
                    "OPENAI_API_KEY is required for the openai embedding provider".to_string(),
                )
            })?;
            Ok(Arc::new(OpenAiEmbedder::new(
                api_key,
                config.llm.openai_api_base.clone(),
                config.rag.embedding_model.clone(),
            )?))
        }
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(
            config.llm.ollama_url.clone(),
            config.rag.embedding_model.clone(),
        )?)),
        other => Err(AppError::InvalidInput(format!(
            "unknown embedding provider '{}', expected 'openai' or 'ollama'",
            other
        ))),
    }
}

/// Cosine similarity between two vectors, 0.0 for mismatched or
/// zero-length input.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn parse_vector(value: &serde_json::Value) -> Result<Vec<f32>> {
    value
        .as_array()
        .map(|arr| {
            arr.iter()
                .map(|v| v.as_f64().unwrap_or(0.0) as f32)
                .collect()
        })
        .ok_or_else(|| AppError::Embedding("response vector is not an array".to_string()))
}

// ============= OpenAI-compatible =============

/// Client for the OpenAI `POST {base}/embeddings` endpoint (and
/// compatible servers).
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(api_key: String, api_base: String, model: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_base,
            api_key,
            model,
        })
    }

    async fn request(&self, input: serde_json::Value) -> Result<serde_json::Value> {
        let response = self
            .client
            .post(format!("{}/embeddings", self.api_base.trim_end_matches('/')))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({ "model": self.model, "input": input }))
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("embedding request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Embedding(format!(
                "embedding API error {}: {}",
                status, body
            )));
        }
        response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("invalid embedding response: {}", e)))
    }

    fn parse_data(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
        json.get("data")
            .and_then(|d| d.as_array())
            .ok_or_else(|| AppError::Embedding("missing data array in response".to_string()))?
            .iter()
            .map(|item| {
                item.get("embedding")
                    .ok_or_else(|| {
                        AppError::Embedding("missing embedding in response item".to_string())
                    })
                    .and_then(parse_vector)
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let json = self.request(json!(text)).await?;
        Self::parse_data(&json)?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Embedding("empty embedding response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let json = self.request(json!(texts)).await?;
        let vectors = Self::parse_data(&json)?;
        if vectors.len() != texts.len() {
            return Err(AppError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============= Ollama =============

/// Client for a local Ollama server's `POST /api/embeddings` endpoint.
pub struct OllamaEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(base_url: String, model: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url,
            model,
        })
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(format!(
                "{}/api/embeddings",
                self.base_url.trim_end_matches('/')
            ))
            .json(&json!({ "model": self.model, "prompt": text }))
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("embedding request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Embedding(format!(
                "Ollama embedding error {}: {}",
                status, body
            )));
        }
        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("invalid embedding response: {}", e)))?;
        json.get("embedding")
            .ok_or_else(|| AppError::Embedding("missing embedding in response".to_string()))
            .and_then(parse_vector)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // The embeddings endpoint is single-input; issue one request per
        // text, preserving input order.
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
