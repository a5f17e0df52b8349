//! Document ingestion pipeline.
//!
//! One call takes raw bytes through extraction, chunking, and
//! embedding, and lands the result in the stores. Content addressing
//! makes the pipeline idempotent: byte-identical uploads resolve to the
//! already-ingested document without re-chunking or re-embedding.

use futures::future::join_all;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::rag::embeddings::EmbeddingClient;
use crate::rag::extract::TextExtractor;
use crate::rag::retriever::Retriever;
use crate::rag::splitter::TextSplitter;
use crate::store::{ChunkStore, DocumentStore};
use crate::types::{AppError, Chunk, Document, Result};

/// Result of one ingestion call.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub document: Document,
    /// Chunks created for the document. Zero when deduplicated.
    pub chunks_created: usize,
    /// Of those, chunks whose embedding attempt failed (stored without
    /// a vector; they are invisible to similarity search).
    pub chunks_unembedded: usize,
    /// True when the content checksum matched an existing document and
    /// the pipeline was short-circuited.
    pub deduplicated: bool,
}

pub struct IngestService {
    documents: Arc<dyn DocumentStore>,
    chunks: Arc<dyn ChunkStore>,
    embedder: Arc<dyn EmbeddingClient>,
    extractor: Arc<dyn TextExtractor>,
    splitter: TextSplitter,
    retriever: Arc<Retriever>,
}

impl IngestService {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        chunks: Arc<dyn ChunkStore>,
        embedder: Arc<dyn EmbeddingClient>,
        extractor: Arc<dyn TextExtractor>,
        splitter: TextSplitter,
        retriever: Arc<Retriever>,
    ) -> Self {
        Self {
            documents,
            chunks,
            embedder,
            extractor,
            splitter,
            retriever,
        }
    }

    /// Ingest one document: extract text, chunk it, embed each chunk
    /// concurrently, and persist everything. Blocks until every chunk's
    /// embedding attempt has completed.
    pub async fn ingest(
        &self,
        filename: &str,
        content_type: &str,
        data: &[u8],
        tags: Vec<String>,
    ) -> Result<IngestOutcome> {
        if data.is_empty() {
            return Err(AppError::InvalidInput("empty document".to_string()));
        }

        let checksum = hex::encode(Sha256::digest(data));
        if let Some(existing) = self.documents.find_by_checksum(&checksum).await? {
            info!(
                filename,
                document_id = %existing.id,
                "checksum match, skipping re-ingestion"
            );
            return Ok(IngestOutcome {
                document: existing,
                chunks_created: 0,
                chunks_unembedded: 0,
                deduplicated: true,
            });
        }

        // Extraction failure is fatal for the document; nothing is stored.
        let text = self.extractor.extract(data, content_type)?;
        let pieces = self.splitter.split(&text);

        let document = Document {
            id: Uuid::new_v4(),
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            size_bytes: data.len() as u64,
            checksum,
            tags,
            created_at: chrono::Utc::now(),
        };
        self.documents.insert_document(document.clone()).await?;

        // Fan out one embedding task per chunk, join on all of them.
        let tasks: Vec<_> = pieces
            .into_iter()
            .map(|piece| {
                let embedder = Arc::clone(&self.embedder);
                tokio::spawn(async move {
                    let embedding = embedder.embed(&piece.text).await;
                    (piece, embedding)
                })
            })
            .collect();

        let mut created = 0usize;
        let mut unembedded = 0usize;
        for joined in join_all(tasks).await {
            let (piece, embedding) = joined
                .map_err(|e| AppError::Internal(format!("embedding task panicked: {}", e)))?;
            let embedding = match embedding {
                Ok(vector) => Some(vector),
                Err(e) => {
                    warn!(
                        filename,
                        chunk_index = piece.index,
                        error = %e,
                        "chunk embedding failed, storing without vector"
                    );
                    unembedded += 1;
                    None
                }
            };
            let chunk = Chunk {
                id: Uuid::new_v4(),
                document_id: document.id,
                chunk_index: piece.index,
                text: piece.text,
                embedding,
                metadata: serde_json::json!({ "filename": document.filename }),
            };
            self.chunks.upsert_chunk(chunk).await?;
            created += 1;
        }

        self.retriever.invalidate();
        info!(
            filename,
            document_id = %document.id,
            chunks = created,
            unembedded,
            "document ingested"
        );
        Ok(IngestOutcome {
            document,
            chunks_created: created,
            chunks_unembedded: unembedded,
            deduplicated: false,
        })
    }

    pub async fn list_documents(&self) -> Result<Vec<Document>> {
        self.documents.list_documents().await
    }

    pub async fn find_document(&self, document_id: Uuid) -> Result<Option<Document>> {
        self.documents.find_document(document_id).await
    }

    /// Delete a document and all of its chunks.
    pub async fn delete_document(&self, document_id: Uuid) -> Result<()> {
        self.documents.delete_document(document_id).await?;
        self.retriever.invalidate();
        info!(document_id = %document_id, "document deleted");
        Ok(())
    }
}
