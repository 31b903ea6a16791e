// Retrieval module
// Embeds a query once and searches the resolved collections for context passages

pub mod expansion;

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::database::{CollectionHandle, CollectionRegistry, ScopeKey};
use crate::embeddings::Embedder;

pub use expansion::{QueryExpander, SYNONYM_TABLE, SynonymGroup};

/// One passage found for a query
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub scope: ScopeKey,
    pub doc_id: String,
    pub chunk_id: String,
    pub text: String,
    pub distance: f32,
}

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    registry: Arc<CollectionRegistry>,
    expander: QueryExpander,
}

impl Retriever {
    #[inline]
    pub fn new(embedder: Arc<dyn Embedder>, registry: Arc<CollectionRegistry>) -> Self {
        Self {
            embedder,
            registry,
            expander: QueryExpander::default(),
        }
    }

    #[inline]
    pub fn with_expander(mut self, expander: QueryExpander) -> Self {
        self.expander = expander;
        self
    }

    /// Up to `k` context texts for `query`
    #[inline]
    pub async fn retrieve(&self, query: &str, k: usize, scopes: &[ScopeKey]) -> Result<Vec<String>> {
        Ok(self
            .retrieve_chunks(query, k, scopes)
            .await?
            .into_iter()
            .map(|chunk| chunk.text)
            .collect())
    }

    /// Search every resolved scope for up to `k` hits each, then keep the
    /// first `k` of the concatenation in scope order.
    ///
    /// Results are not re-ranked across scopes: a close hit from a later
    /// scope can be cut while a distant hit from an earlier scope is kept.
    /// With no scopes the global collection is searched. A scope that cannot
    /// be opened or searched contributes nothing. Embedding failures and an
    /// unreadable global collection are errors.
    #[inline]
    pub async fn retrieve_chunks(
        &self,
        query: &str,
        k: usize,
        scopes: &[ScopeKey],
    ) -> Result<Vec<RetrievedChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let expanded = self.expander.expand(query);
        let embedding = self
            .embedder
            .encode_one(&expanded)
            .await
            .context("Failed to embed query")?;

        let resolved = self.registry.resolve(scopes).await?;
        let searches = resolved
            .iter()
            .map(|(scope, handle)| search_scope(scope, handle, &embedding, k));
        let per_scope = join_all(searches).await;

        let mut chunks: Vec<RetrievedChunk> = per_scope.into_iter().flatten().collect();
        chunks.truncate(k);

        debug!(
            "Retrieved {} chunks from {} scopes for query ({} chars)",
            chunks.len(),
            resolved.len(),
            query.len()
        );
        Ok(chunks)
    }
}

async fn search_scope(
    scope: &ScopeKey,
    handle: &CollectionHandle,
    embedding: &[f32],
    k: usize,
) -> Vec<RetrievedChunk> {
    let collection = handle.read().await;
    let hits = match collection.search(embedding, k) {
        Ok(hits) => hits,
        Err(e) => {
            warn!("Search failed for scope {}: {:#}", scope, e);
            return Vec::new();
        }
    };

    hits.into_iter()
        .filter_map(|hit| match collection.entry(hit.position) {
            Some(entry) => Some(RetrievedChunk {
                scope: scope.clone(),
                doc_id: entry.doc_id.clone(),
                chunk_id: entry.chunk_id.clone(),
                text: entry.chunk_text.clone(),
                distance: hit.distance,
            }),
            None => {
                warn!(
                    "Dropping position {} in scope {}: metadata has only {} entries",
                    hit.position,
                    scope,
                    collection.metadata_len()
                );
                None
            }
        })
        .collect()
}
