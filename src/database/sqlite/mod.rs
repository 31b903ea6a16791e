use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};


pub mod models;
pub mod queries;

pub use models::{Folder, FolderFile, NewFolder, NewFolderFile};
pub use queries::{FolderFileQueries, FolderQueries, is_unique_violation};

pub type DbPool = Pool<Sqlite>;

/// Folder and file records
#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    #[inline]
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    #[inline]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    #[inline]
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/database/sqlite/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    #[inline]
    pub async fn initialize_from_config_dir(config_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        Self::new(config_dir.join("metadata.db")).await
    }

    // Folder operations
    #[inline]
    pub async fn get_folder(&self, tenant_id: &str, folder_id: &str) -> Result<Option<Folder>> {
        FolderQueries::get(&self.pool, tenant_id, folder_id).await
    }

    #[inline]
    pub async fn list_folders(&self, tenant_id: &str) -> Result<Vec<Folder>> {
        FolderQueries::list_by_tenant(&self.pool, tenant_id).await
    }

    // Folder file operations
    #[inline]
    pub async fn list_folder_files(&self, folder_id: &str) -> Result<Vec<FolderFile>> {
        FolderFileQueries::list_by_folder(&self.pool, folder_id).await
    }
}
