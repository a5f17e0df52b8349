//! In-memory store backing all three storage traits.
//!
//! Suitable for local runs and tests. Similarity search is exact cosine
//! over every embedded chunk, which is fine at this scale; swap in a
//! vector database behind [`ChunkStore`] for large corpora.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::rag::embeddings::cosine_similarity;
use crate::store::{ChunkStore, DocumentStore, SessionStore};
use crate::types::{ChatMessage, ChatSession, Chunk, Document, Result};

#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<Uuid, Document>>,
    chunks: RwLock<HashMap<Uuid, Chunk>>,
    sessions: RwLock<HashMap<Uuid, ChatSession>>,
    messages: RwLock<Vec<ChatMessage>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_document(&self, document: Document) -> Result<Document> {
        self.documents
            .write()
            .insert(document.id, document.clone());
        Ok(document)
    }

    async fn find_by_checksum(&self, checksum: &str) -> Result<Option<Document>> {
        Ok(self
            .documents
            .read()
            .values()
            .find(|d| d.checksum == checksum)
            .cloned())
    }

    async fn find_document(&self, id: Uuid) -> Result<Option<Document>> {
        Ok(self.documents.read().get(&id).cloned())
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        let mut documents: Vec<Document> = self.documents.read().values().cloned().collect();
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(documents)
    }

    async fn delete_document(&self, id: Uuid) -> Result<()> {
        self.documents.write().remove(&id);
        self.chunks.write().retain(|_, c| c.document_id != id);
        Ok(())
    }
}

#[async_trait]
impl ChunkStore for MemoryStore {
    async fn upsert_chunk(&self, chunk: Chunk) -> Result<()> {
        self.chunks.write().insert(chunk.id, chunk);
        Ok(())
    }

    async fn similar_chunks(
        &self,
        query_vector: &[f32],
        limit: usize,
        document_id: Option<Uuid>,
    ) -> Result<Vec<(Chunk, f32)>> {
        let mut scored: Vec<(Chunk, f32)> = self
            .chunks
            .read()
            .values()
            .filter(|c| document_id.map_or(true, |id| c.document_id == id))
            .filter_map(|c| {
                c.embedding
                    .as_ref()
                    .map(|v| (c.clone(), cosine_similarity(query_vector, v)))
            })
            .collect();

        // Deterministic order: score descending, then document and index.
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.document_id.cmp(&b.0.document_id))
                .then_with(|| a.0.chunk_index.cmp(&b.0.chunk_index))
        });
        scored.truncate(limit);
        Ok(scored)
    }

    async fn chunks_for_document(&self, document_id: Uuid) -> Result<Vec<Chunk>> {
        let mut chunks: Vec<Chunk> = self
            .chunks
            .read()
            .values()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect();
        chunks.sort_by_key(|c| c.chunk_index);
        Ok(chunks)
    }

    async fn delete_by_document(&self, document_id: Uuid) -> Result<()> {
        self.chunks
            .write()
            .retain(|_, c| c.document_id != document_id);
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, user_id: &str, title: &str) -> Result<ChatSession> {
        let session = ChatSession::new(user_id, title);
        self.sessions.write().insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<ChatSession>> {
        Ok(self.sessions.read().get(&id).cloned())
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<ChatSession>> {
        let mut sessions: Vec<ChatSession> = self
            .sessions
            .read()
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn append_message(&self, message: ChatMessage) -> Result<()> {
        self.messages.write().push(message);
        Ok(())
    }

    async fn recent_messages(&self, session_id: Uuid, limit: usize) -> Result<Vec<ChatMessage>> {
        let messages = self.messages.read();
        let session_messages: Vec<&ChatMessage> = messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .collect();
        let skip = session_messages.len().saturating_sub(limit);
        Ok(session_messages
            .into_iter()
            .skip(skip)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageRole;

    #[tokio::test]
    async fn test_document_checksum_lookup() {
        let store = MemoryStore::new();
        let doc = Document::new("a.txt", "text/plain", 3, "abc123");
        store.insert_document(doc.clone()).await.unwrap();

        let found = store.find_by_checksum("abc123").await.unwrap().unwrap();
        assert_eq!(found.id, doc.id);
        assert!(store.find_by_checksum("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_document_cascades_chunks() {
        let store = MemoryStore::new();
        let doc = Document::new("a.txt", "text/plain", 3, "abc");
        store.insert_document(doc.clone()).await.unwrap();
        for i in 0..3 {
            store
                .upsert_chunk(Chunk::new(doc.id, i, "text"))
                .await
                .unwrap();
        }
        assert_eq!(store.chunks_for_document(doc.id).await.unwrap().len(), 3);

        store.delete_document(doc.id).await.unwrap();
        assert!(store.chunks_for_document(doc.id).await.unwrap().is_empty());
        assert!(store.find_document(doc.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_similar_chunks_skips_unembedded_and_scopes() {
        let store = MemoryStore::new();
        let doc_a = Document::new("a.txt", "text/plain", 1, "a");
        let doc_b = Document::new("b.txt", "text/plain", 1, "b");

        let mut embedded = Chunk::new(doc_a.id, 0, "embedded");
        embedded.embedding = Some(vec![1.0, 0.0]);
        store.upsert_chunk(embedded).await.unwrap();
        // No vector yet: must never be returned.
        store
            .upsert_chunk(Chunk::new(doc_a.id, 1, "pending"))
            .await
            .unwrap();
        let mut other = Chunk::new(doc_b.id, 0, "other");
        other.embedding = Some(vec![0.9, 0.1]);
        store.upsert_chunk(other).await.unwrap();

        let results = store
            .similar_chunks(&[1.0, 0.0], 10, None)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.text, "embedded");

        let scoped = store
            .similar_chunks(&[1.0, 0.0], 10, Some(doc_b.id))
            .await
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].0.text, "other");
    }

    #[tokio::test]
    async fn test_recent_messages_window_and_order() {
        let store = MemoryStore::new();
        let session = store.create_session("u1", "Chat").await.unwrap();
        for i in 0..5 {
            store
                .append_message(ChatMessage::new(
                    session.id,
                    MessageRole::User,
                    &format!("m{}", i),
                    0,
                    0,
                ))
                .await
                .unwrap();
        }

        let recent = store.recent_messages(session.id, 3).await.unwrap();
        let contents: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
    }

    #[tokio::test]
    async fn test_list_sessions_filters_by_user() {
        let store = MemoryStore::new();
        store.create_session("u1", "A").await.unwrap();
        store.create_session("u2", "B").await.unwrap();
        store.create_session("u1", "C").await.unwrap();

        let sessions = store.list_sessions("u1").await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert!(sessions.iter().all(|s| s.user_id == "u1"));
    }
}
