
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::database::write_atomically;

pub const VECTOR_FILE_MAGIC: [u8; 4] = *b"DVEC";
pub const VECTOR_FILE_VERSION: u32 = 1;

const HEADER_LEN: usize = 4 + 4 + 4 + 8;
const GLOBAL_TENANT_DIR: &str = "_global";

/// Identifies which collection an operation targets
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeKey {
    Global,
    Folder { tenant_id: String, folder_id: String },
}

impl ScopeKey {
    /// Build a folder scope; both parts end up in file names so they must be plain identifiers
    #[inline]
    pub fn folder(
        tenant_id: impl Into<String>,
        folder_id: impl Into<String>,
    ) -> Result<Self, CollectionError> {
        let tenant_id = tenant_id.into();
        let folder_id = folder_id.into();
        validate_identifier(&tenant_id)?;
        validate_identifier(&folder_id)?;
        Ok(Self::Folder {
            tenant_id,
            folder_id,
        })
    }

    #[inline]
    pub fn tenant_id(&self) -> Option<&str> {
        match self {
            Self::Global => None,
            Self::Folder { tenant_id, .. } => Some(tenant_id),
        }
    }

    #[inline]
    pub fn folder_id(&self) -> Option<&str> {
        match self {
            Self::Global => None,
            Self::Folder { folder_id, .. } => Some(folder_id),
        }
    }
}

impl fmt::Display for ScopeKey {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Folder {
                tenant_id,
                folder_id,
            } => write!(f, "{tenant_id}/{folder_id}"),
        }
    }
}

/// Accepts ASCII alphanumerics, `-` and `_`
#[inline]
pub fn validate_identifier(value: &str) -> Result<(), CollectionError> {
    let valid = !value.is_empty()
        && value.len() <= 128
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(CollectionError::InvalidIdentifier(value.to_string()))
    }
}

/// Text and provenance for one stored vector, matched to it by position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub doc_id: String,
    pub chunk_id: String,
    pub chunk_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub position: usize,
    pub distance: f32,
}

#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("No collection is persisted for scope {0}")]
    NotFound(ScopeKey),
    #[error("Collection for scope {scope} is corrupt: {reason}")]
    Corrupt { scope: ScopeKey, reason: String },
    #[error("Vector has dimension {actual}, collection expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Cannot add {vectors} vectors with {entries} metadata entries")]
    LengthMismatch { vectors: usize, entries: usize },
    #[error("Invalid scope identifier: {0:?}")]
    InvalidIdentifier(String),
}

/// Where every collection keeps its two files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    vector_dir: PathBuf,
    users_dir: PathBuf,
}

/// The vector file and metadata log of one scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionPaths {
    pub vectors: PathBuf,
    pub metadata: PathBuf,
}

impl StorageLayout {
    #[inline]
    pub fn new(vector_dir: impl Into<PathBuf>, users_dir: impl Into<PathBuf>) -> Self {
        Self {
            vector_dir: vector_dir.into(),
            users_dir: users_dir.into(),
        }
    }

    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.vector_database_path(), config.users_path())
    }

    /// Resolve the files of `scope`. Folder identifiers are checked here as
    /// well as in `ScopeKey::folder`, since the variant can be built directly.
    #[inline]
    pub fn paths(&self, scope: &ScopeKey) -> Result<CollectionPaths, CollectionError> {
        match scope {
            ScopeKey::Global => Ok(CollectionPaths {
                vectors: self.vector_dir.join("global.bin"),
                metadata: self.users_dir.join(GLOBAL_TENANT_DIR).join("metadata.jsonl"),
            }),
            ScopeKey::Folder {
                tenant_id,
                folder_id,
            } => {
                validate_identifier(tenant_id)?;
                validate_identifier(folder_id)?;
                Ok(CollectionPaths {
                    vectors: self.vector_dir.join(format!("{tenant_id}_{folder_id}.bin")),
                    metadata: self.folder_dir(tenant_id, folder_id).join("metadata.jsonl"),
                })
            }
        }
    }

    fn folder_dir(&self, tenant_id: &str, folder_id: &str) -> PathBuf {
        self.users_dir.join(tenant_id).join("folders").join(folder_id)
    }
}

/// Append-only vectors plus a parallel metadata log for one scope.
///
/// Position `i` of the vectors corresponds to position `i` of the metadata.
/// Both grow together through `add` and shrink only through `reset`.
/// Collections loaded from files that disagree in length are still
/// searchable, but refuse further appends until reset.
#[derive(Debug)]
pub struct VectorCollection {
    scope: ScopeKey,
    paths: CollectionPaths,
    dimension: usize,
    vectors: Vec<f32>,
    metadata: Vec<MetadataEntry>,
}

impl VectorCollection {
    /// Open the persisted collection, creating and persisting an empty one if none exists
    #[inline]
    pub fn open_or_create(layout: &StorageLayout, scope: ScopeKey, dimension: usize) -> Result<Self> {
        let paths = layout.paths(&scope)?;
        let vectors_exist = paths.vectors.exists();
        let metadata_exists = paths.metadata.exists();

        match (vectors_exist, metadata_exists) {
            (true, true) => Self::load(scope, paths, dimension),
            (false, false) => {
                let collection = Self {
                    scope,
                    paths,
                    dimension,
                    vectors: Vec::new(),
                    metadata: Vec::new(),
                };
                collection.persist(&[], &[])?;
                info!("Created empty collection for scope {}", collection.scope);
                Ok(collection)
            }
            _ => Err(CollectionError::Corrupt {
                reason: format!(
                    "only one of {} and {} exists",
                    paths.vectors.display(),
                    paths.metadata.display()
                ),
                scope,
            }
            .into()),
        }
    }

    /// Open a persisted collection; a missing file is `CollectionError::NotFound`
    #[inline]
    pub fn open_existing(layout: &StorageLayout, scope: ScopeKey, dimension: usize) -> Result<Self> {
        let paths = layout.paths(&scope)?;
        if !paths.vectors.exists() || !paths.metadata.exists() {
            return Err(CollectionError::NotFound(scope).into());
        }
        Self::load(scope, paths, dimension)
    }

    /// Remove both backing files, ignoring files that are already gone
    #[inline]
    pub fn destroy(layout: &StorageLayout, scope: &ScopeKey) -> Result<()> {
        let paths = layout.paths(scope)?;
        for path in [&paths.vectors, &paths.metadata] {
            match fs::remove_file(path) {
                Ok(()) => debug!("Removed {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to remove {}", path.display()));
                }
            }
        }

        if let ScopeKey::Folder {
            tenant_id,
            folder_id,
        } = scope
        {
            // Identifiers were validated by `paths`, so this stays under users_dir
            let folder_dir = layout.folder_dir(tenant_id, folder_id);
            match fs::remove_dir_all(&folder_dir) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove {}: {}", folder_dir.display(), e),
            }
        }

        Ok(())
    }

    fn load(scope: ScopeKey, paths: CollectionPaths, dimension: usize) -> Result<Self> {
        let bytes = fs::read(&paths.vectors)
            .with_context(|| format!("Failed to read {}", paths.vectors.display()))?;
        let vectors = decode_vectors(&bytes, dimension).map_err(|reason| {
            CollectionError::Corrupt {
                scope: scope.clone(),
                reason,
            }
        })?;

        let content = fs::read_to_string(&paths.metadata)
            .with_context(|| format!("Failed to read {}", paths.metadata.display()))?;
        let metadata = decode_metadata(&content).map_err(|reason| CollectionError::Corrupt {
            scope: scope.clone(),
            reason,
        })?;

        let collection = Self {
            scope,
            paths,
            dimension,
            vectors,
            metadata,
        };

        if !collection.is_consistent() {
            warn!(
                "Collection {} has {} vectors but {} metadata entries",
                collection.scope,
                collection.len(),
                collection.metadata_len()
            );
        }

        debug!(
            "Loaded collection {} with {} vectors",
            collection.scope,
            collection.len()
        );
        Ok(collection)
    }

    #[inline]
    pub fn scope(&self) -> &ScopeKey {
        &self.scope
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors
    #[inline]
    pub fn len(&self) -> usize {
        self.vectors.len() / self.dimension.max(1)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    #[inline]
    pub fn metadata_len(&self) -> usize {
        self.metadata.len()
    }

    #[inline]
    pub fn is_consistent(&self) -> bool {
        self.len() == self.metadata_len()
    }

    #[inline]
    pub fn entry(&self, position: usize) -> Option<&MetadataEntry> {
        self.metadata.get(position)
    }

    /// Append vectors and their metadata. Both files are written before the
    /// in-memory state changes, so a failed call leaves this handle untouched.
    #[inline]
    pub fn add(&mut self, embeddings: &[Vec<f32>], entries: Vec<MetadataEntry>) -> Result<()> {
        if embeddings.len() != entries.len() {
            return Err(CollectionError::LengthMismatch {
                vectors: embeddings.len(),
                entries: entries.len(),
            }
            .into());
        }

        if let Some(bad) = embeddings.iter().find(|v| v.len() != self.dimension) {
            return Err(CollectionError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            }
            .into());
        }

        if !self.is_consistent() {
            return Err(CollectionError::Corrupt {
                scope: self.scope.clone(),
                reason: format!(
                    "{} vectors but {} metadata entries; reset before adding",
                    self.len(),
                    self.metadata_len()
                ),
            }
            .into());
        }

        if embeddings.is_empty() {
            return Ok(());
        }

        let flat: Vec<f32> = embeddings.iter().flatten().copied().collect();
        self.persist(&flat, &entries)?;

        self.vectors.extend_from_slice(&flat);
        self.metadata.extend(entries);

        debug!(
            "Added {} vectors to collection {} (now {})",
            embeddings.len(),
            self.scope,
            self.len()
        );
        Ok(())
    }

    /// Exact nearest neighbours by Euclidean distance, closest first
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimension {
            return Err(CollectionError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            }
            .into());
        }

        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let hits = self
            .vectors
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, vector)| SearchHit {
                position,
                distance: euclidean_distance(vector, query),
            })
            .k_smallest_by(k, |a, b| {
                a.distance
                    .total_cmp(&b.distance)
                    .then(a.position.cmp(&b.position))
            })
            .collect();

        Ok(hits)
    }

    /// Persist an empty collection, then truncate both sequences
    #[inline]
    pub fn reset(&mut self) -> Result<()> {
        write_atomically(&self.paths.vectors, &encode_vectors(self.dimension, &[])?)?;
        write_atomically(&self.paths.metadata, b"")?;
        self.vectors.clear();
        self.metadata.clear();
        info!("Reset collection {}", self.scope);
        Ok(())
    }

    /// Write the current contents plus `extra_*` to disk
    fn persist(&self, extra_vectors: &[f32], extra_entries: &[MetadataEntry]) -> Result<()> {
        let vector_bytes = encode_vectors(self.dimension, &[&self.vectors, extra_vectors])?;
        let metadata_text = encode_metadata(self.metadata.iter().chain(extra_entries))?;

        write_atomically(&self.paths.vectors, &vector_bytes)?;
        write_atomically(&self.paths.metadata, metadata_text.as_bytes())?;
        Ok(())
    }
}

#[inline]
fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

fn encode_vectors(dimension: usize, parts: &[&[f32]]) -> Result<Vec<u8>> {
    let total: usize = parts.iter().map(|p| p.len()).sum();
    let count = total / dimension.max(1);
    let dimension_u32 = u32::try_from(dimension).context("Dimension does not fit in u32")?;

    let mut buf = Vec::with_capacity(HEADER_LEN + total * 4);
    buf.extend_from_slice(&VECTOR_FILE_MAGIC);
    buf.extend_from_slice(&VECTOR_FILE_VERSION.to_le_bytes());
    buf.extend_from_slice(&dimension_u32.to_le_bytes());
    buf.extend_from_slice(&(count as u64).to_le_bytes());
    for value in parts.iter().flat_map(|p| p.iter()) {
        buf.extend_from_slice(&value.to_le_bytes());
    }
    Ok(buf)
}

fn decode_vectors(bytes: &[u8], dimension: usize) -> Result<Vec<f32>, String> {
    let (header, body) = bytes
        .split_at_checked(HEADER_LEN)
        .ok_or_else(|| format!("vector file is {} bytes, shorter than its header", bytes.len()))?;

    if header[0..4] != VECTOR_FILE_MAGIC {
        return Err("vector file has an unknown magic number".to_string());
    }

    let version = read_u32(&header[4..8])?;
    if version != VECTOR_FILE_VERSION {
        return Err(format!("unsupported vector file version {version}"));
    }

    let stored_dimension = read_u32(&header[8..12])? as usize;
    if stored_dimension != dimension {
        return Err(format!(
            "stored dimension {stored_dimension} does not match deployment dimension {dimension}"
        ));
    }

    let count = u64::from_le_bytes(
        header[12..20]
            .try_into()
            .map_err(|_| "truncated vector count".to_string())?,
    );
    let expected_len = usize::try_from(count)
        .ok()
        .and_then(|c| c.checked_mul(dimension))
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| format!("vector count {count} overflows"))?;
    if body.len() != expected_len {
        return Err(format!(
            "expected {expected_len} bytes of vector data for {count} vectors, found {}",
            body.len()
        ));
    }

    body.chunks_exact(4)
        .map(|b| {
            <[u8; 4]>::try_from(b)
                .map(f32::from_le_bytes)
                .map_err(|_| "truncated vector component".to_string())
        })
        .collect()
}

fn read_u32(bytes: &[u8]) -> Result<u32, String> {
    <[u8; 4]>::try_from(bytes)
        .map(u32::from_le_bytes)
        .map_err(|_| "truncated header field".to_string())
}

fn encode_metadata<'a>(entries: impl Iterator<Item = &'a MetadataEntry>) -> Result<String> {
    let mut text = String::new();
    for entry in entries {
        text.push_str(&serde_json::to_string(entry).context("Failed to serialize metadata entry")?);
        text.push('\n');
    }
    Ok(text)
}

fn decode_metadata(content: &str) -> Result<Vec<MetadataEntry>, String> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(number, line)| {
            serde_json::from_str(line)
                .map_err(|e| format!("metadata line {} is not valid: {}", number + 1, e))
        })
        .collect()
}

/// Does a persisted collection exist for `scope`?
#[inline]
pub fn collection_exists(layout: &StorageLayout, scope: &ScopeKey) -> bool {
    layout
        .paths(scope)
        .is_ok_and(|paths| paths.vectors.exists() && paths.metadata.exists())
}
