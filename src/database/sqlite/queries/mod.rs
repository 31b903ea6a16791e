#[cfg(test)]
mod tests;

use super::models::*;
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

const FOLDER_COLUMNS: &str = "folder_id, folder_name, tenant_id, created_at, file_count";
const FOLDER_FILE_COLUMNS: &str =
    "file_id, folder_id, original_name, file_size, chunk_count, created_at";

pub struct FolderQueries;

impl FolderQueries {
    #[inline]
    pub async fn create(pool: &SqlitePool, new_folder: NewFolder) -> Result<Folder> {
        let folder = Folder {
            folder_id: Uuid::new_v4().to_string(),
            folder_name: new_folder.folder_name,
            tenant_id: new_folder.tenant_id,
            created_at: Utc::now(),
            file_count: 0,
        };

        sqlx::query(
            "INSERT INTO folders (folder_id, folder_name, tenant_id, created_at, file_count) VALUES (?, ?, ?, ?, 0)",
        )
        .bind(&folder.folder_id)
        .bind(&folder.folder_name)
        .bind(&folder.tenant_id)
        .bind(folder.created_at)
        .execute(pool)
        .await
        .context("Failed to create folder")?;

        debug!(
            "Created folder {} ({}) for tenant {}",
            folder.folder_id, folder.folder_name, folder.tenant_id
        );
        Ok(folder)
    }

    /// Look up a folder, only if `tenant_id` owns it
    #[inline]
    pub async fn get(
        pool: &SqlitePool,
        tenant_id: &str,
        folder_id: &str,
    ) -> Result<Option<Folder>> {
        let sql = format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE tenant_id = ? AND folder_id = ?");
        sqlx::query_as::<_, Folder>(&sql)
            .bind(tenant_id)
            .bind(folder_id)
            .fetch_optional(pool)
            .await
            .context("Failed to get folder")
    }

    #[inline]
    pub async fn get_by_name(
        pool: &SqlitePool,
        tenant_id: &str,
        folder_name: &str,
    ) -> Result<Option<Folder>> {
        let sql =
            format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE tenant_id = ? AND folder_name = ?");
        sqlx::query_as::<_, Folder>(&sql)
            .bind(tenant_id)
            .bind(folder_name)
            .fetch_optional(pool)
            .await
            .context("Failed to get folder by name")
    }

    /// Newest first
    #[inline]
    pub async fn list_by_tenant(pool: &SqlitePool, tenant_id: &str) -> Result<Vec<Folder>> {
        let sql = format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE tenant_id = ? ORDER BY created_at DESC, rowid DESC"
        );
        sqlx::query_as::<_, Folder>(&sql)
            .bind(tenant_id)
            .fetch_all(pool)
            .await
            .context("Failed to list folders")
    }

    /// Returns whether a row was deleted
    #[inline]
    pub async fn delete(pool: &SqlitePool, tenant_id: &str, folder_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM folders WHERE tenant_id = ? AND folder_id = ?")
            .bind(tenant_id)
            .bind(folder_id)
            .execute(pool)
            .await
            .context("Failed to delete folder")?;

        Ok(result.rows_affected() > 0)
    }

    #[inline]
    pub async fn increment_file_count(pool: &SqlitePool, folder_id: &str) -> Result<()> {
        sqlx::query("UPDATE folders SET file_count = file_count + 1 WHERE folder_id = ?")
            .bind(folder_id)
            .execute(pool)
            .await
            .context("Failed to update folder file count")?;
        Ok(())
    }
}

pub struct FolderFileQueries;

impl FolderFileQueries {
    #[inline]
    pub async fn create(pool: &SqlitePool, new_file: NewFolderFile) -> Result<FolderFile> {
        let file = FolderFile {
            file_id: new_file.file_id,
            folder_id: new_file.folder_id,
            original_name: new_file.original_name,
            file_size: new_file.file_size,
            chunk_count: new_file.chunk_count,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO folder_files (file_id, folder_id, original_name, file_size, chunk_count, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&file.file_id)
        .bind(&file.folder_id)
        .bind(&file.original_name)
        .bind(file.file_size)
        .bind(file.chunk_count)
        .bind(file.created_at)
        .execute(pool)
        .await
        .context("Failed to record folder file")?;

        Ok(file)
    }

    #[inline]
    pub async fn list_by_folder(pool: &SqlitePool, folder_id: &str) -> Result<Vec<FolderFile>> {
        let sql = format!(
            "SELECT {FOLDER_FILE_COLUMNS} FROM folder_files WHERE folder_id = ? ORDER BY created_at DESC, rowid DESC"
        );
        sqlx::query_as::<_, FolderFile>(&sql)
            .bind(folder_id)
            .fetch_all(pool)
            .await
            .context("Failed to list folder files")
    }
}

/// Did this error come from a UNIQUE constraint?
#[inline]
pub fn is_unique_violation(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<sqlx::Error>()
        .and_then(sqlx::Error::as_database_error)
        .is_some_and(|e| e.is_unique_violation())
}
