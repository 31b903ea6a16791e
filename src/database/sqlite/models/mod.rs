#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::collection::{CollectionError, ScopeKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Folder {
    pub folder_id: String,
    pub folder_name: String,
    pub tenant_id: String,
    pub created_at: DateTime<Utc>,
    pub file_count: i64,
}

impl Folder {
    /// The vector collection this folder owns
    #[inline]
    pub fn scope(&self) -> Result<ScopeKey, CollectionError> {
        ScopeKey::folder(&self.tenant_id, &self.folder_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFolder {
    pub tenant_id: String,
    pub folder_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FolderFile {
    pub file_id: String,
    pub folder_id: String,
    pub original_name: String,
    pub file_size: i64,
    pub chunk_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFolderFile {
    /// Also the document id of the file's chunks
    pub file_id: String,
    pub folder_id: String,
    pub original_name: String,
    pub file_size: i64,
    pub chunk_count: i64,
}
