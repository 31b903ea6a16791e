
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A window of document text ready for embedding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// `{doc_id}_{sequence_index}`, unique across all documents
    pub chunk_id: String,
    pub doc_id: String,
    pub text: String,
    /// Position of this chunk within its document
    pub sequence_index: usize,
}

/// Window size and overlap, both counted in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingPolicy {
    pub size: usize,
    pub overlap: usize,
}

impl ChunkingPolicy {
    /// Policy for documents ingested into the global collection
    pub const DOCUMENT: Self = Self {
        size: 1500,
        overlap: 300,
    };

    /// Policy for files uploaded into a folder
    pub const FOLDER_FILE: Self = Self {
        size: 1000,
        overlap: 0,
    };

    #[inline]
    pub const fn new(size: usize, overlap: usize) -> Self {
        Self { size, overlap }
    }

    /// Distance between the starts of consecutive windows
    #[inline]
    pub const fn stride(&self) -> usize {
        self.size.saturating_sub(self.overlap)
    }
}

/// The two chunking policies used by the ingestion paths
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub document: ChunkingPolicy,
    pub folder_file: ChunkingPolicy,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            document: ChunkingPolicy::DOCUMENT,
            folder_file: ChunkingPolicy::FOLDER_FILE,
        }
    }
}

/// Split `text` into overlapping windows of at most `size` characters.
///
/// Consecutive windows share exactly `overlap` characters and the last window
/// always ends at the end of the input, so the windows cover the text with no
/// gaps. For inputs longer than `overlap` the number of windows is
/// `ceil((len - overlap) / (size - overlap))`; shorter non-empty inputs yield a
/// single window. Empty input yields no windows.
///
/// Returns an empty vector if `overlap >= size`, which configuration
/// validation rules out.
#[inline]
pub fn chunk(text: &str, size: usize, overlap: usize) -> Vec<String> {
    if text.is_empty() || size == 0 || overlap >= size {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let stride = size - overlap;
    let mut windows = Vec::with_capacity(window_count(chars.len(), size, overlap));
    let mut start = 0;

    loop {
        let end = (start + size).min(chars.len());
        windows.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += stride;
    }

    windows
}

/// Number of windows `chunk` produces for an input of `len` characters
#[inline]
pub fn window_count(len: usize, size: usize, overlap: usize) -> usize {
    if len == 0 || size == 0 || overlap >= size {
        return 0;
    }
    if len <= overlap {
        return 1;
    }
    (len - overlap).div_ceil(size - overlap)
}

/// Chunk a document under `policy`, deriving chunk identifiers from `doc_id`
#[inline]
pub fn chunk_document(doc_id: &str, text: &str, policy: ChunkingPolicy) -> Vec<Chunk> {
    let chunks: Vec<Chunk> = chunk(text, policy.size, policy.overlap)
        .into_iter()
        .enumerate()
        .map(|(sequence_index, text)| Chunk {
            chunk_id: format!("{doc_id}_{sequence_index}"),
            doc_id: doc_id.to_string(),
            text,
            sequence_index,
        })
        .collect();

    debug!(
        "Split document {} ({} chars) into {} chunks (size {}, overlap {})",
        doc_id,
        text.chars().count(),
        chunks.len(),
        policy.size,
        policy.overlap
    );

    chunks
}
