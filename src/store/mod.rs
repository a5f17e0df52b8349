//! Storage abstraction traits.
//!
//! The document, chunk, and session stores are the only shared mutable
//! state in the engine. All writes are inserts or whole-record replaces,
//! never partial in-place mutation, so implementations only need the
//! concurrency guarantees a store naturally provides.
//!
//! [`memory::MemoryStore`] implements all three traits for local use and
//! testing; production deployments can back them with a database.

use crate::types::{ChatMessage, ChatSession, Chunk, Document, Result};
use async_trait::async_trait;
use uuid::Uuid;

pub mod memory;

pub use memory::MemoryStore;

/// Persistence for document descriptors. Deleting a document cascades to
/// its chunks.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_document(&self, document: Document) -> Result<Document>;

    /// Content-addressed lookup used to short-circuit re-ingestion.
    async fn find_by_checksum(&self, checksum: &str) -> Result<Option<Document>>;

    async fn find_document(&self, id: Uuid) -> Result<Option<Document>>;

    async fn list_documents(&self) -> Result<Vec<Document>>;

    /// Removes the document and all of its chunks.
    async fn delete_document(&self, id: Uuid) -> Result<()>;
}

/// Persistence and nearest-neighbor lookup for chunks.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Inserts or replaces the whole chunk record (keyed by chunk id).
    async fn upsert_chunk(&self, chunk: Chunk) -> Result<()>;

    /// Returns up to `limit` chunks nearest to `query_vector`, best
    /// first, each with its similarity score. Chunks without an
    /// embedding are never returned. `document_id` scopes the search to
    /// one document.
    async fn similar_chunks(
        &self,
        query_vector: &[f32],
        limit: usize,
        document_id: Option<Uuid>,
    ) -> Result<Vec<(Chunk, f32)>>;

    /// All chunks of one document in chunk-index order.
    async fn chunks_for_document(&self, document_id: Uuid) -> Result<Vec<Chunk>>;

    async fn delete_by_document(&self, document_id: Uuid) -> Result<()>;
}

/// Persistence for chat sessions and their append-only messages.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, user_id: &str, title: &str) -> Result<ChatSession>;

    async fn find_session(&self, id: Uuid) -> Result<Option<ChatSession>>;

    /// Sessions for one user, newest first.
    async fn list_sessions(&self, user_id: &str) -> Result<Vec<ChatSession>>;

    async fn append_message(&self, message: ChatMessage) -> Result<()>;

    /// The most recent `limit` messages of a session, in creation order.
    async fn recent_messages(&self, session_id: Uuid, limit: usize) -> Result<Vec<ChatMessage>>;
}
