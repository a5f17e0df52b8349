//! # Tome - Retrieval-Augmented Chat Engine
//!
//! A RAG core in Rust: document ingestion with sentence-aware chunking,
//! embedding-backed retrieval with MMR reranking, prompt assembly, and a
//! tool-augmented generation loop over multiple LLM providers.
//!
//! ## Overview
//!
//! Tome can be used in two ways:
//!
//! 1. **As a CLI** - Run the `tome` binary to ingest documents and chat
//! 2. **As a library** - Import the pipeline into your own Rust project
//!
//! ### Basic Example
//!
//! ```rust,ignore
//! use tome::llm::{Provider, PromptBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = Provider::Ollama {
//!         base_url: "http://localhost:11434".to_string(),
//!         model: "llama3.2".to_string(),
//!     };
//!
//!     let client = provider.create_client().await?;
//!     let prompt = PromptBuilder::new("You are a helpful assistant.")
//!         .user_message("Hello, world!")
//!         .build();
//!     let response = client.chat(&prompt).await?;
//!     println!("{}", response);
//!
//!     Ok(())
//! }
//! ```
//!
//! ### Ingest and Retrieve
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tome::rag::{IngestService, Retriever};
//! use tome::store::MemoryStore;
//!
//! let outcome = ingest
//!     .ingest("guide.md", "text/markdown", bytes, vec![])
//!     .await?;
//! let snippets = retriever.retrieve("how do I configure it?", 6).await?;
//! ```
//!
//! ## Modules
//!
//! - [`rag`] - Ingestion, chunking, embeddings, and retrieval
//! - [`llm`] - LLM provider clients, prompt assembly, tool-call parsing
//! - [`chat`] - The per-turn generation orchestrator
//! - [`tools`] - Tool registry and built-in tools
//! - [`store`] - Storage seams and the in-memory implementation
//! - [`types`] - Core types and error handling

/// Chat turn orchestration.
pub mod chat;
/// LLM provider clients, prompt assembly, tool-call parsing.
pub mod llm;
/// Ingestion, chunking, embeddings, and retrieval.
pub mod rag;
/// Storage abstractions and the in-memory store.
pub mod store;
/// Built-in tools (calculator, current time).
pub mod tools;
/// Core types and error handling.
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use chat::{ChatRequest, ChatResponse, ChatService};
pub use llm::{ChatPrompt, LlmClient, PromptBuilder, Provider};
pub use rag::ingest::IngestService;
pub use rag::retriever::Retriever;
pub use rag::splitter::TextSplitter;
pub use store::MemoryStore;
pub use tools::ToolRegistry;
pub use types::{AppError, Result};
pub use utils::config::Config;
