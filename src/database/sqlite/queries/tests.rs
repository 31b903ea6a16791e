use super::*;
use crate::database::sqlite::Database;
use tempfile::TempDir;

async fn create_test_database() -> Result<(TempDir, Database)> {
    let temp_dir = TempDir::new()?;
    let database = Database::initialize_from_config_dir(temp_dir.path()).await?;
    Ok((temp_dir, database))
}

fn new_folder(tenant_id: &str, folder_name: &str) -> NewFolder {
    NewFolder {
        tenant_id: tenant_id.to_string(),
        folder_name: folder_name.to_string(),
    }
}

#[tokio::test]
async fn create_and_get_folder() -> Result<()> {
    let (_temp_dir, database) = create_test_database().await?;

    let folder = FolderQueries::create(database.pool(), new_folder("t1", "Biology")).await?;
    assert_eq!(folder.file_count, 0);

    let fetched = FolderQueries::get(database.pool(), "t1", &folder.folder_id).await?;
    assert_eq!(fetched, Some(folder));
    Ok(())
}

#[tokio::test]
async fn get_is_scoped_to_owner() -> Result<()> {
    let (_temp_dir, database) = create_test_database().await?;

    let folder = FolderQueries::create(database.pool(), new_folder("t1", "Biology")).await?;
    let other = FolderQueries::get(database.pool(), "t2", &folder.folder_id).await?;
    assert!(other.is_none());
    Ok(())
}

#[tokio::test]
async fn duplicate_name_for_tenant_is_unique_violation() -> Result<()> {
    let (_temp_dir, database) = create_test_database().await?;

    FolderQueries::create(database.pool(), new_folder("t1", "Biology")).await?;
    let error = FolderQueries::create(database.pool(), new_folder("t1", "Biology"))
        .await
        .expect_err("duplicate name should fail");
    assert!(is_unique_violation(&error));

    FolderQueries::create(database.pool(), new_folder("t2", "Biology")).await?;
    Ok(())
}

#[tokio::test]
async fn list_by_tenant_is_newest_first() -> Result<()> {
    let (_temp_dir, database) = create_test_database().await?;

    let first = FolderQueries::create(database.pool(), new_folder("t1", "first")).await?;
    let second = FolderQueries::create(database.pool(), new_folder("t1", "second")).await?;
    FolderQueries::create(database.pool(), new_folder("t2", "elsewhere")).await?;

    let folders = FolderQueries::list_by_tenant(database.pool(), "t1").await?;
    let ids: Vec<&str> = folders.iter().map(|f| f.folder_id.as_str()).collect();
    assert_eq!(ids, vec![second.folder_id.as_str(), first.folder_id.as_str()]);
    Ok(())
}

#[tokio::test]
async fn files_are_counted_and_cascade_on_delete() -> Result<()> {
    let (_temp_dir, database) = create_test_database().await?;

    let folder = FolderQueries::create(database.pool(), new_folder("t1", "Biology")).await?;
    FolderFileQueries::create(
        database.pool(),
        NewFolderFile {
            file_id: "file-1".to_string(),
            folder_id: folder.folder_id.clone(),
            original_name: "cells.txt".to_string(),
            file_size: 42,
            chunk_count: 1,
        },
    )
    .await?;
    FolderQueries::increment_file_count(database.pool(), &folder.folder_id).await?;

    let updated = FolderQueries::get(database.pool(), "t1", &folder.folder_id)
        .await?
        .expect("should find folder");
    assert_eq!(updated.file_count, 1);

    let files = FolderFileQueries::list_by_folder(database.pool(), &folder.folder_id).await?;
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].original_name, "cells.txt");

    assert!(FolderQueries::delete(database.pool(), "t1", &folder.folder_id).await?);
    assert!(!FolderQueries::delete(database.pool(), "t1", &folder.folder_id).await?);

    let files = FolderFileQueries::list_by_folder(database.pool(), &folder.folder_id).await?;
    assert!(files.is_empty());
    Ok(())
}
