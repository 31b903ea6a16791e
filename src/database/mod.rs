// Database module
// SQLite for folder records, flat files for vector collections

pub mod collection;
pub mod registry;
pub mod sqlite;

pub use collection::{
    CollectionError, MetadataEntry, ScopeKey, SearchHit, StorageLayout, VectorCollection,
    validate_identifier,
};
pub use registry::{CollectionHandle, CollectionRegistry};
pub use sqlite::*;

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Replace `path` with `bytes` through a sibling temp file and a rename, so
/// readers see either the old or the new contents, never a partial write
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let temp_path = temp_path_for(path)?;
    let mut file = File::create(&temp_path)
        .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;
    file.write_all(bytes)
        .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;
    file.sync_all()
        .with_context(|| format!("Failed to sync temp file: {}", temp_path.display()))?;
    drop(file);

    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to move temp file into place: {}", path.display()))?;
    Ok(())
}

fn temp_path_for(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Path has no file name: {}", path.display()))?;
    let mut temp_name = OsString::from(".");
    temp_name.push(file_name);
    temp_name.push(".tmp");
    Ok(path.with_file_name(temp_name))
}
