//! Context retrieval with MMR reranking.
//!
//! The retriever embeds a query, over-fetches nearest-neighbor
//! candidates from the chunk store, reranks them with Maximal Marginal
//! Relevance to trade relevance against diversity, and finally clamps
//! the selection to a total character budget. Results for a given
//! `(query, k)` pair are cached for a short window since embeddings and
//! documents rarely change mid-session; ingestion and deletion flush
//! the cache.

use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

use crate::rag::embeddings::EmbeddingClient;
use crate::store::{ChunkStore, DocumentStore};
use crate::types::{Chunk, ContextSnippet, Result};

const CACHE_CAPACITY: usize = 128;
const CACHE_TTL: Duration = Duration::from_secs(60);

/// Minimum characters worth keeping when the last snippet has to be cut
/// to fit the context budget; anything shorter is dropped instead.
const MIN_TRUNCATED_CHARS: usize = 100;

/// Weights for the MMR combined score. Heuristic defaults; tune per
/// corpus rather than treating them as fixed.
#[derive(Debug, Clone, Copy)]
pub struct MmrWeights {
    /// Weight on raw query similarity.
    pub relevance: f32,
    /// Weight on redundancy against already-selected snippets.
    pub diversity: f32,
    /// Redundancy bonus for sharing a document with a selected snippet.
    pub same_document: f32,
    /// Additional bonus when chunk indices differ by at most 2.
    pub near_neighbor: f32,
    /// Additional bonus when chunk indices differ by at most 5.
    pub far_neighbor: f32,
}

impl Default for MmrWeights {
    fn default() -> Self {
        Self {
            relevance: 0.7,
            diversity: 0.3,
            same_document: 0.5,
            near_neighbor: 0.3,
            far_neighbor: 0.1,
        }
    }
}

struct CachedResult {
    snippets: Vec<ContextSnippet>,
    at: Instant,
}

pub struct Retriever {
    embedder: Arc<dyn EmbeddingClient>,
    chunks: Arc<dyn ChunkStore>,
    documents: Arc<dyn DocumentStore>,
    max_context_chars: usize,
    weights: MmrWeights,
    cache: Mutex<LruCache<(String, usize), CachedResult>>,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        chunks: Arc<dyn ChunkStore>,
        documents: Arc<dyn DocumentStore>,
        max_context_chars: usize,
    ) -> Self {
        Self {
            embedder,
            chunks,
            documents,
            max_context_chars,
            weights: MmrWeights::default(),
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }

    pub fn with_weights(mut self, weights: MmrWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Retrieve up to `k` context snippets for a query, most relevant
    /// first, bounded by the total character budget.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ContextSnippet>> {
        let key = (query.to_string(), k);
        {
            let mut cache = self.cache.lock();
            if let Some(cached) = cache.get(&key) {
                if cached.at.elapsed() < CACHE_TTL {
                    debug!(query, k, "retrieval cache hit");
                    return Ok(cached.snippets.clone());
                }
                cache.pop(&key);
            }
        }

        let snippets = self.retrieve_uncached(query, k, None).await?;
        self.cache.lock().put(
            key,
            CachedResult {
                snippets: snippets.clone(),
                at: Instant::now(),
            },
        );
        Ok(snippets)
    }

    /// Like [`retrieve`](Self::retrieve), scoped to one document.
    /// Document-scoped lookups bypass the cache.
    pub async fn retrieve_in_document(
        &self,
        query: &str,
        k: usize,
        document_id: Uuid,
    ) -> Result<Vec<ContextSnippet>> {
        self.retrieve_uncached(query, k, Some(document_id)).await
    }

    /// Flush the retrieval cache. Called after ingestion or deletion.
    pub fn invalidate(&self) {
        self.cache.lock().clear();
    }

    async fn retrieve_uncached(
        &self,
        query: &str,
        k: usize,
        document_id: Option<Uuid>,
    ) -> Result<Vec<ContextSnippet>> {
        if query.trim().is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let started = Instant::now();

        let query_vector = self.embedder.embed(query).await?;
        // Over-fetch by 2x so the reranker has room to diversify.
        let candidates = self
            .chunks
            .similar_chunks(&query_vector, k * 2, document_id)
            .await?;
        let selected = mmr_rerank(&candidates, k, &self.weights);

        let mut names: HashMap<Uuid, String> = HashMap::new();
        let mut snippets = Vec::with_capacity(selected.len());
        for (chunk, score) in selected {
            let name = match names.get(&chunk.document_id) {
                Some(name) => name.clone(),
                None => {
                    let name = self
                        .documents
                        .find_document(chunk.document_id)
                        .await?
                        .map(|d| d.filename)
                        .unwrap_or_else(|| chunk.document_id.to_string());
                    names.insert(chunk.document_id, name.clone());
                    name
                }
            };
            snippets.push(ContextSnippet {
                chunk_id: chunk.id,
                document_id: chunk.document_id,
                document_name: name,
                chunk_index: chunk.chunk_index,
                text: chunk.text,
                metadata: chunk.metadata,
                score,
            });
        }

        let snippets = apply_char_budget(snippets, self.max_context_chars);
        debug!(
            query,
            k,
            results = snippets.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "retrieval complete"
        );
        Ok(snippets)
    }
}

/// MMR reranking over similarity-scored candidates. The input is
/// assumed sorted by raw similarity descending; the first selection is
/// always the top raw candidate, and ties in combined score keep the
/// earlier similarity rank.
fn mmr_rerank(candidates: &[(Chunk, f32)], k: usize, weights: &MmrWeights) -> Vec<(Chunk, f32)> {
    if candidates.is_empty() || k == 0 {
        return Vec::new();
    }

    let mut remaining: Vec<usize> = (1..candidates.len()).collect();
    let mut selected: Vec<usize> = vec![0];

    while selected.len() < k && !remaining.is_empty() {
        let mut best_pos = 0;
        let mut best_score = f32::NEG_INFINITY;
        for (pos, &idx) in remaining.iter().enumerate() {
            let (ref chunk, similarity) = candidates[idx];
            let redundancy = selected
                .iter()
                .map(|&s| redundancy_to(chunk, &candidates[s].0, weights))
                .fold(0.0_f32, f32::max);
            let score = weights.relevance * similarity - weights.diversity * redundancy;
            // Strict comparison keeps the earlier similarity rank on ties.
            if score > best_score {
                best_score = score;
                best_pos = pos;
            }
        }
        selected.push(remaining.remove(best_pos));
    }

    selected
        .into_iter()
        .map(|idx| candidates[idx].clone())
        .collect()
}

fn redundancy_to(candidate: &Chunk, chosen: &Chunk, weights: &MmrWeights) -> f32 {
    if candidate.document_id != chosen.document_id {
        return 0.0;
    }
    let gap = candidate.chunk_index.abs_diff(chosen.chunk_index);
    let proximity = if gap <= 2 {
        weights.near_neighbor
    } else if gap <= 5 {
        weights.far_neighbor
    } else {
        0.0
    };
    weights.same_document + proximity
}

/// Clamp snippets to a total character budget. The snippet that would
/// cross the budget is truncated to the remainder when enough room is
/// left to be useful, otherwise dropped; everything after it is dropped.
fn apply_char_budget(snippets: Vec<ContextSnippet>, budget: usize) -> Vec<ContextSnippet> {
    let mut used = 0usize;
    let mut out = Vec::with_capacity(snippets.len());
    for mut snippet in snippets {
        let len = snippet.text.chars().count();
        if used + len <= budget {
            used += len;
            out.push(snippet);
            continue;
        }
        let remaining = budget - used;
        if remaining >= MIN_TRUNCATED_CHARS {
            // Reserve room for the ellipsis so the budget still holds.
            let keep = remaining.saturating_sub(3);
            let cut: String = snippet.text.chars().take(keep).collect();
            snippet.text = format!("{}...", cut);
            out.push(snippet);
        }
        break;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chunk(document_id: Uuid, index: usize, text: &str) -> Chunk {
        Chunk {
            id: Uuid::new_v4(),
            document_id,
            chunk_index: index,
            text: text.to_string(),
            embedding: None,
            metadata: json!({}),
        }
    }

    fn snippet(text: &str) -> ContextSnippet {
        ContextSnippet {
            chunk_id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            document_name: "doc.txt".to_string(),
            chunk_index: 0,
            text: text.to_string(),
            metadata: json!({}),
            score: 0.9,
        }
    }

    #[test]
    fn test_mmr_first_pick_is_top_similarity() {
        let doc = Uuid::new_v4();
        let candidates = vec![
            (chunk(doc, 0, "best"), 0.95),
            (chunk(doc, 1, "second"), 0.90),
            (chunk(doc, 9, "third"), 0.85),
        ];
        let out = mmr_rerank(&candidates, 2, &MmrWeights::default());
        assert_eq!(out[0].0.text, "best");
    }

    #[test]
    fn test_mmr_no_duplicates_and_bounded() {
        let doc = Uuid::new_v4();
        let candidates: Vec<_> = (0..6)
            .map(|i| (chunk(doc, i, &format!("c{}", i)), 0.9 - i as f32 * 0.01))
            .collect();
        let out = mmr_rerank(&candidates, 4, &MmrWeights::default());
        assert_eq!(out.len(), 4);
        let mut ids: Vec<_> = out.iter().map(|(c, _)| c.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 4);

        let out = mmr_rerank(&candidates[..2], 4, &MmrWeights::default());
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_mmr_diversifies_across_documents() {
        // Chunks 0-4 of document A score highest; a chunk from document
        // B trails them. With the adjacency penalty, at most one more
        // A-chunk within index distance 2 of the first pick should be
        // taken before B appears.
        let doc_a = Uuid::new_v4();
        let doc_b = Uuid::new_v4();
        let mut candidates: Vec<_> = (0..5)
            .map(|i| (chunk(doc_a, i, &format!("a{}", i)), 0.90 - i as f32 * 0.005))
            .collect();
        candidates.push((chunk(doc_b, 0, "b0"), 0.70));

        let out = mmr_rerank(&candidates, 3, &MmrWeights::default());
        assert_eq!(out[0].0.text, "a0");
        // a1: 0.7*0.895 - 0.3*(0.5+0.3) = 0.3865
        // b0: 0.7*0.70  - 0          = 0.49 -> b0 beats every remaining a chunk
        assert_eq!(out[1].0.text, "b0");
        let from_a = out.iter().filter(|(c, _)| c.document_id == doc_a).count();
        assert!(from_a <= 2);
    }

    #[test]
    fn test_mmr_tie_keeps_similarity_rank() {
        let doc_a = Uuid::new_v4();
        let doc_b = Uuid::new_v4();
        // Two candidates from distinct documents with equal similarity:
        // identical combined scores, so the earlier-ranked one wins.
        let candidates = vec![
            (chunk(doc_a, 0, "first"), 0.9),
            (chunk(doc_b, 0, "tie-a"), 0.8),
            (chunk(Uuid::new_v4(), 0, "tie-b"), 0.8),
        ];
        let out = mmr_rerank(&candidates, 2, &MmrWeights::default());
        assert_eq!(out[1].0.text, "tie-a");
    }

    #[test]
    fn test_char_budget_accumulates_in_order() {
        let snippets = vec![snippet(&"a".repeat(400)), snippet(&"b".repeat(400))];
        let out = apply_char_budget(snippets, 1000);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_char_budget_truncates_last_snippet() {
        let snippets = vec![snippet(&"a".repeat(400)), snippet(&"b".repeat(400))];
        let out = apply_char_budget(snippets, 550);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].text.chars().count(), 150);
        assert!(out[1].text.ends_with("..."));
        let total: usize = out.iter().map(|s| s.text.chars().count()).sum();
        assert!(total <= 550);
    }

    #[test]
    fn test_char_budget_drops_tiny_remainder() {
        let snippets = vec![
            snippet(&"a".repeat(400)),
            snippet(&"b".repeat(400)),
            snippet(&"c".repeat(400)),
        ];
        let out = apply_char_budget(snippets, 450);
        // 50 chars left after the first snippet: not worth keeping.
        assert_eq!(out.len(), 1);
    }
}
