//! Mock implementations for testing.
//!
//! Scripted LLM clients and a deterministic embedder, shared across
//! test files so the pipeline can run without network access.

use async_trait::async_trait;
use futures::Stream;
use parking_lot::Mutex;
use std::sync::Arc;

use tome::llm::client::LlmClient;
use tome::llm::prompt::ChatPrompt;
use tome::rag::embeddings::EmbeddingClient;
use tome::types::{AppError, Result};

/// Mock LLM client that plays back a script of responses.
///
/// Each generation request consumes the next scripted response; when
/// the script runs out, the last response repeats. Prompts seen by the
/// client are recorded for assertion.
pub struct ScriptedLlm {
    responses: Vec<String>,
    calls: Mutex<usize>,
    prompts: Mutex<Vec<ChatPrompt>>,
    fail: bool,
}

impl ScriptedLlm {
    pub fn new(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: responses.iter().map(|r| r.to_string()).collect(),
            calls: Mutex::new(0),
            prompts: Mutex::new(Vec::new()),
            fail: false,
        })
    }

    /// A client whose every request fails.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            responses: Vec::new(),
            calls: Mutex::new(0),
            prompts: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }

    pub fn seen_prompts(&self) -> Vec<ChatPrompt> {
        self.prompts.lock().clone()
    }

    fn next_response(&self, prompt: &ChatPrompt) -> Result<String> {
        if self.fail {
            return Err(AppError::Llm("scripted failure".to_string()));
        }
        self.prompts.lock().push(prompt.clone());
        let mut calls = self.calls.lock();
        let index = (*calls).min(self.responses.len().saturating_sub(1));
        *calls += 1;
        self.responses
            .get(index)
            .cloned()
            .ok_or_else(|| AppError::Llm("script is empty".to_string()))
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat(&self, prompt: &ChatPrompt) -> Result<String> {
        self.next_response(prompt)
    }

    async fn chat_stream(
        &self,
        prompt: &ChatPrompt,
    ) -> Result<Box<dyn Stream<Item = Result<String>> + Send + Unpin>> {
        let text = self.next_response(prompt)?;
        // Deliver in small pieces so delta handling is exercised.
        let pieces: Vec<Result<String>> = text
            .chars()
            .collect::<Vec<_>>()
            .chunks(7)
            .map(|c| Ok(c.iter().collect::<String>()))
            .collect();
        Ok(Box::new(Box::pin(futures::stream::iter(pieces))))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Deterministic embedder: an 8-bucket byte histogram, normalized.
/// Texts sharing vocabulary land near each other, which is enough for
/// retrieval tests without a model.
pub struct HistogramEmbedder;

fn histogram(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; 8];
    for b in text.bytes() {
        v[(b % 8) as usize] += 1.0;
    }
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

#[async_trait]
impl EmbeddingClient for HistogramEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(histogram(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| histogram(t)).collect())
    }

    fn model_name(&self) -> &str {
        "histogram"
    }
}

/// Embedder whose every call fails, for ingestion fault tests.
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingClient for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(AppError::Embedding("embedder offline".to_string()))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(AppError::Embedding("embedder offline".to_string()))
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}
