//! Retrieval Augmented Generation (RAG) pipeline.
//!
//! # Module Structure
//!
//! - [`splitter`] - Text segmentation into bounded, overlapping chunks
//! - [`embeddings`] - Embedding provider clients (OpenAI-compatible, Ollama)
//! - [`extract`] - Binary-to-text extraction seam
//! - [`retriever`] - Similarity retrieval with MMR diversity reranking
//! - [`ingest`] - Document ingestion pipeline (checksum, split, embed, store)
//!
//! # Pipeline
//!
//! Ingestion: raw bytes → extract → split → embed (one task per chunk) →
//! chunk store. Query: text → embed → over-fetched nearest neighbors →
//! MMR rerank → context-budget truncation → snippets for the prompt.

pub mod embeddings;
pub mod extract;
pub mod ingest;
pub mod retriever;
pub mod splitter;
