// Embeddings module
// Character-window chunking and the embedding model behind the `Embedder` seam

pub mod chunking;
pub mod ollama;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

pub use chunking::{Chunk, ChunkingConfig, ChunkingPolicy, chunk, chunk_document};
pub use ollama::OllamaClient;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmbeddingError {
    #[error("Embedding model returned {actual} vectors for {expected} inputs")]
    CountMismatch { expected: usize, actual: usize },
    #[error("Embedding has dimension {actual}, deployment expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Maps text to fixed-dimension vectors.
///
/// Output order matches input order and every vector has `dimension()`
/// components. Model failures are returned as errors; implementations never
/// substitute placeholder vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;

    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn encode_one(&self, text: &str) -> Result<Vec<f32>> {
        let vectors = self.encode(&[text.to_string()]).await?;
        let actual = vectors.len();
        match <[Vec<f32>; 1]>::try_from(vectors) {
            Ok([vector]) => Ok(vector),
            Err(_) => Err(EmbeddingError::CountMismatch {
                expected: 1,
                actual,
            }
            .into()),
        }
    }
}

/// Check a model's output against the request and the deployment dimension
#[inline]
pub fn check_embeddings(
    vectors: &[Vec<f32>],
    expected_count: usize,
    dimension: usize,
) -> Result<(), EmbeddingError> {
    if vectors.len() != expected_count {
        return Err(EmbeddingError::CountMismatch {
            expected: expected_count,
            actual: vectors.len(),
        });
    }

    if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
        return Err(EmbeddingError::DimensionMismatch {
            expected: dimension,
            actual: bad.len(),
        });
    }

    Ok(())
}
