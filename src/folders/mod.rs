// Folders module
// Tenant-owned document folders: a SQLite row plus a vector collection each


use anyhow::{Context, Result};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::{
    CollectionRegistry, Database, Folder, FolderFile, FolderFileQueries, FolderQueries, NewFolder,
    NewFolderFile, is_unique_violation, validate_identifier,
};
use crate::indexer::Indexer;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FolderError {
    #[error("Folder name cannot be empty")]
    EmptyName,
    #[error("A folder named '{name}' already exists for this tenant")]
    DuplicateName { name: String },
    #[error("Folder {folder_id} not found")]
    NotFound { folder_id: String },
}

/// A file stored into a folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedFile {
    pub file: FolderFile,
    pub chunk_count: usize,
}

pub struct FolderService {
    database: Database,
    registry: Arc<CollectionRegistry>,
    indexer: Indexer,
}

impl FolderService {
    #[inline]
    pub fn new(database: Database, registry: Arc<CollectionRegistry>, indexer: Indexer) -> Self {
        Self {
            database,
            registry,
            indexer,
        }
    }

    /// Create a folder and its empty collection
    #[inline]
    pub async fn create_folder(&self, tenant_id: &str, name: &str) -> Result<Folder> {
        let folder_name = name.trim();
        if folder_name.is_empty() {
            return Err(FolderError::EmptyName.into());
        }
        validate_identifier(tenant_id)?;

        let pool = self.database.pool();
        if FolderQueries::get_by_name(pool, tenant_id, folder_name)
            .await?
            .is_some()
        {
            return Err(duplicate(folder_name));
        }

        let folder = match FolderQueries::create(
            pool,
            NewFolder {
                tenant_id: tenant_id.to_string(),
                folder_name: folder_name.to_string(),
            },
        )
        .await
        {
            Ok(folder) => folder,
            Err(e) if is_unique_violation(&e) => return Err(duplicate(folder_name)),
            Err(e) => return Err(e),
        };

        self.registry.open_or_create(folder.scope()?).await?;
        info!(
            "Created folder {} ({}) for tenant {}",
            folder.folder_id, folder.folder_name, tenant_id
        );
        Ok(folder)
    }

    /// Newest first
    #[inline]
    pub async fn list_folders(&self, tenant_id: &str) -> Result<Vec<Folder>> {
        self.database.list_folders(tenant_id).await
    }

    #[inline]
    pub async fn get_folder(&self, tenant_id: &str, folder_id: &str) -> Result<Option<Folder>> {
        self.database.get_folder(tenant_id, folder_id).await
    }

    /// Delete the row, then the collection files; returns whether the folder existed
    #[inline]
    pub async fn delete_folder(&self, tenant_id: &str, folder_id: &str) -> Result<bool> {
        let Some(folder) = self.get_folder(tenant_id, folder_id).await? else {
            return Ok(false);
        };

        let deleted = FolderQueries::delete(self.database.pool(), tenant_id, folder_id).await?;
        let scope = folder.scope()?;
        if let Err(e) = self.registry.destroy(&scope).await {
            warn!("Failed to remove collection files for {}: {:#}", scope, e);
        }

        info!("Deleted folder {} for tenant {}", folder_id, tenant_id);
        Ok(deleted)
    }

    /// Chunk, embed and append a file's text to the folder collection, then
    /// record the file
    #[inline]
    pub async fn ingest_file(
        &self,
        tenant_id: &str,
        folder_id: &str,
        original_name: &str,
        text: &str,
    ) -> Result<IngestedFile> {
        let folder = self
            .get_folder(tenant_id, folder_id)
            .await?
            .ok_or_else(|| FolderError::NotFound {
                folder_id: folder_id.to_string(),
            })?;

        let file_id = Uuid::new_v4().to_string();
        let policy = self.indexer.chunking().folder_file;
        let chunk_count = self
            .indexer
            .index_into(folder.scope()?, &file_id, text, policy)
            .await
            .with_context(|| format!("Failed to ingest {original_name} into folder {folder_id}"))?;

        let pool = self.database.pool();
        let recorded = FolderFileQueries::create(
            pool,
            NewFolderFile {
                file_id: file_id.clone(),
                folder_id: folder.folder_id.clone(),
                original_name: original_name.to_string(),
                file_size: i64::try_from(text.len()).unwrap_or(i64::MAX),
                chunk_count: i64::try_from(chunk_count).unwrap_or(i64::MAX),
            },
        )
        .await;
        // The chunks are already appended; nothing removes them from the collection
        let file = match recorded {
            Ok(file) => file,
            Err(e) => {
                warn!(
                    "{} chunks of {} are in folder {} without a file record",
                    chunk_count, file_id, folder.folder_id
                );
                return Err(e.context(format!(
                    "Appended {chunk_count} chunks of {original_name} but the file was not recorded"
                )));
            }
        };
        FolderQueries::increment_file_count(pool, &folder.folder_id).await?;

        info!(
            "Ingested {} into folder {} ({} chunks)",
            original_name, folder.folder_id, chunk_count
        );
        Ok(IngestedFile { file, chunk_count })
    }

    #[inline]
    pub async fn list_files(&self, tenant_id: &str, folder_id: &str) -> Result<Vec<FolderFile>> {
        if self.get_folder(tenant_id, folder_id).await?.is_none() {
            return Err(FolderError::NotFound {
                folder_id: folder_id.to_string(),
            }
            .into());
        }
        self.database.list_folder_files(folder_id).await
    }
}

fn duplicate(name: &str) -> anyhow::Error {
    FolderError::DuplicateName {
        name: name.to_string(),
    }
    .into()
}
