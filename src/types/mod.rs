//! Core data model and error types shared across the crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============= Document & Chunk Types =============

/// An ingested document. Content-addressed by checksum: ingesting
/// byte-identical content resolves to the same record. Immutable after
/// creation except for `tags`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: u64,
    /// SHA-256 of the raw bytes, hex-encoded.
    pub checksum: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn new(filename: &str, content_type: &str, size_bytes: u64, checksum: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            size_bytes,
            checksum: checksum.to_string(),
            tags: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// A bounded slice of a document's text, the unit of embedding and
/// retrieval. Owned exclusively by its document (deleted with it).
/// Indices per document are contiguous starting at 0. An embedded chunk
/// is never patched in place; re-embedding replaces the whole record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub document_id: Uuid,
    pub chunk_index: usize,
    pub text: String,
    /// Absent until computed; chunks without a vector are invisible to
    /// similarity search.
    pub embedding: Option<Vec<f32>>,
    pub metadata: serde_json::Value,
}

impl Chunk {
    pub fn new(document_id: Uuid, chunk_index: usize, text: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            chunk_index,
            text: text.to_string(),
            embedding: None,
            metadata: serde_json::Value::Null,
        }
    }
}

/// Transient retrieval result for one query. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSnippet {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub document_name: String,
    pub chunk_index: usize,
    pub text: String,
    pub metadata: serde_json::Value,
    /// Relevance score; only internally consistent ordering is promised.
    pub score: f32,
}

impl ContextSnippet {
    /// Citation prefix injected into the prompt context block.
    pub fn source_reference(&self) -> String {
        format!("[Source: {}#{}]", self.document_name, self.chunk_index)
    }
}

// ============= Chat Types =============

/// A conversation owned by one user, holding an ordered message sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(user_id: &str, title: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Append-only conversation record. The orchestrator is the only writer
/// of `assistant` and `tool` messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(
        session_id: Uuid,
        role: MessageRole,
        content: &str,
        tokens_in: u32,
        tokens_out: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            role,
            content: content.to_string(),
            tokens_in,
            tokens_out,
            created_at: Utc::now(),
        }
    }
}

// ============= Tool Types =============

/// A structured invocation request parsed out of model output text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub args: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema for the tool's arguments.
    pub parameters: serde_json::Value,
}

// ============= Streaming Events =============

/// Events emitted over the streaming chat entry point, in turn order:
/// zero or more `delta`/`tool_call`/`tool_result`, then exactly one
/// terminal `done` or `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Delta {
        text: String,
    },
    ToolCall {
        name: String,
        args: serde_json::Value,
    },
    ToolResult {
        name: String,
        result: String,
    },
    Done {
        text: String,
        session_id: Uuid,
    },
    Error {
        message: String,
    },
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Unreadable or corrupt document bytes; fatal for that document.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Embedding provider failure. Non-fatal per chunk at ingestion,
    /// fatal for a query-time embed.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Chat-completion provider failure; fatal to the current turn.
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
