// Indexer module
// Chunks, embeds and appends documents to a collection

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::{CollectionRegistry, MetadataEntry, ScopeKey};
use crate::embeddings::chunking::{ChunkingConfig, ChunkingPolicy, chunk_document};
use crate::embeddings::{Embedder, check_embeddings};

/// Outcome of one ingestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexReport {
    pub doc_id: String,
    pub chunk_count: usize,
}

/// Turns documents into vectors in their scope's collection
pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    registry: Arc<CollectionRegistry>,
    chunking: ChunkingConfig,
}

impl Indexer {
    #[inline]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        registry: Arc<CollectionRegistry>,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            embedder,
            registry,
            chunking,
        }
    }

    #[inline]
    pub fn chunking(&self) -> &ChunkingConfig {
        &self.chunking
    }

    /// Ingest a document into the global collection with the document policy
    #[inline]
    pub async fn index_document(&self, text: &str) -> Result<IndexReport> {
        let doc_id = Uuid::new_v4().to_string();
        let chunk_count = self
            .index_into(ScopeKey::Global, &doc_id, text, self.chunking.document)
            .await?;

        info!("Indexed document {} into {} chunks", doc_id, chunk_count);
        Ok(IndexReport {
            doc_id,
            chunk_count,
        })
    }

    /// Chunk `text` with `policy`, embed every chunk and append to `scope`.
    ///
    /// Embedding happens before the collection is locked. Either every chunk
    /// is appended and persisted or none is.
    #[inline]
    pub async fn index_into(
        &self,
        scope: ScopeKey,
        doc_id: &str,
        text: &str,
        policy: ChunkingPolicy,
    ) -> Result<usize> {
        let chunks = chunk_document(doc_id, text, policy);
        if chunks.is_empty() {
            debug!("No chunks produced for document {}", doc_id);
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self
            .embedder
            .encode(&texts)
            .await
            .with_context(|| format!("Failed to embed {} chunks of {}", texts.len(), doc_id))?;
        check_embeddings(&embeddings, chunks.len(), self.embedder.dimension())?;

        let created_at = Utc::now();
        let tenant_id = scope.tenant_id().map(str::to_string);
        let folder_id = scope.folder_id().map(str::to_string);
        let entries = chunks
            .into_iter()
            .map(|chunk| MetadataEntry {
                doc_id: chunk.doc_id,
                chunk_id: chunk.chunk_id,
                chunk_text: chunk.text,
                tenant_id: tenant_id.clone(),
                folder_id: folder_id.clone(),
                created_at,
            })
            .collect::<Vec<_>>();
        let count = entries.len();

        let handle = self.registry.open_or_create(scope.clone()).await?;
        let mut collection = handle.write_owned().await;
        tokio::task::spawn_blocking(move || collection.add(&embeddings, entries))
            .await
            .context("Collection write task panicked")?
            .with_context(|| format!("Failed to append to collection {scope}"))?;

        debug!("Appended {} chunks of {} to {}", count, doc_id, scope);
        Ok(count)
    }

    /// Empty the global collection
    #[inline]
    pub async fn reset_global(&self) -> Result<()> {
        let handle = self.registry.global().await?;
        let mut collection = handle.write_owned().await;
        tokio::task::spawn_blocking(move || collection.reset())
            .await
            .context("Collection reset task panicked")?
    }
}
