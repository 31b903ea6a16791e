use super::*;
use crate::database::StorageLayout;
use crate::testing::{FailingEmbedder, FakeEmbedder, TEST_DIMENSION};
use tempfile::TempDir;

fn registry(temp_dir: &TempDir) -> Arc<CollectionRegistry> {
    Arc::new(CollectionRegistry::new(
        StorageLayout::new(
            temp_dir.path().join("vector_dbs"),
            temp_dir.path().join("users"),
        ),
        TEST_DIMENSION,
    ))
}

fn small_chunks() -> ChunkingConfig {
    ChunkingConfig {
        document: ChunkingPolicy::new(10, 2),
        folder_file: ChunkingPolicy::new(8, 0),
    }
}

#[tokio::test]
async fn reset_then_index_then_search() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let registry = registry(&temp_dir);
    let indexer = Indexer::new(Arc::new(FakeEmbedder::default()), registry.clone(), small_chunks());

    indexer.reset_global().await.expect("should reset");
    // 26 chars, size 10, overlap 2: ceil((26 - 2) / 8) = 3 chunks
    let report = indexer
        .index_document("abcdefghijklmnopqrstuvwxyz")
        .await
        .expect("should index");
    assert_eq!(report.chunk_count, 3);

    let handle = registry.global().await.expect("should open global");
    let collection = handle.read().await;
    assert_eq!(collection.len(), 3);
    assert!(collection.is_consistent());

    let hits = collection
        .search(&FakeEmbedder::default().vector_for("abc"), 5)
        .expect("should search");
    assert_eq!(hits.len(), 3);
    assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));

    for (i, hit) in hits.iter().enumerate() {
        let entry = collection.entry(hit.position).expect("text should be recoverable");
        assert_eq!(entry.doc_id, report.doc_id);
        assert!(entry.tenant_id.is_none(), "hit {i} should have no tenant");
    }
    assert_eq!(
        collection.entry(0).map(|e| e.chunk_id.clone()),
        Some(format!("{}_0", report.doc_id))
    );
}

#[tokio::test]
async fn empty_document_is_a_noop_with_an_id() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let embedder = Arc::new(FakeEmbedder::default());
    let indexer = Indexer::new(embedder.clone(), registry(&temp_dir), small_chunks());

    let report = indexer.index_document("").await.expect("should index");
    assert_eq!(report.chunk_count, 0);
    assert!(!report.doc_id.is_empty());
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn folder_ingestion_tags_entries() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let registry = registry(&temp_dir);
    let indexer = Indexer::new(Arc::new(FakeEmbedder::default()), registry.clone(), small_chunks());
    let scope = ScopeKey::folder("t1", "f1").expect("should build scope");

    let count = indexer
        .index_into(scope.clone(), "file-1", "0123456789abcdef", small_chunks().folder_file)
        .await
        .expect("should index");
    assert_eq!(count, 2);

    let handle = registry.open_existing(&scope).await.expect("should open");
    let collection = handle.read().await;
    let entry = collection.entry(1).expect("should have second entry");
    assert_eq!(entry.chunk_text, "89abcdef");
    assert_eq!(entry.tenant_id.as_deref(), Some("t1"));
    assert_eq!(entry.folder_id.as_deref(), Some("f1"));
}

#[tokio::test]
async fn embedding_failure_leaves_collection_untouched() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let registry = registry(&temp_dir);
    let indexer = Indexer::new(Arc::new(FailingEmbedder), registry.clone(), small_chunks());

    let result = indexer.index_document("some text to index").await;
    assert!(result.is_err());

    let handle = registry.global().await.expect("should open global");
    assert!(handle.read().await.is_empty());
}

#[tokio::test]
async fn wrong_dimension_model_is_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let indexer = Indexer::new(
        Arc::new(FakeEmbedder::new(TEST_DIMENSION * 2)),
        registry(&temp_dir),
        small_chunks(),
    );

    let error = indexer
        .index_document("some text")
        .await
        .expect_err("dimension mismatch should fail");
    assert!(format!("{error:#}").contains("dimension"));
}
