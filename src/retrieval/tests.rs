use super::*;
use crate::database::{MetadataEntry, StorageLayout};
use crate::testing::{FailingEmbedder, FakeEmbedder, TEST_DIMENSION};
use chrono::Utc;
use std::fs;
use tempfile::TempDir;

struct Fixture {
    _temp_dir: TempDir,
    embedder: Arc<FakeEmbedder>,
    registry: Arc<CollectionRegistry>,
}

impl Fixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("should create temp dir");
        let layout = StorageLayout::new(
            temp_dir.path().join("vector_dbs"),
            temp_dir.path().join("users"),
        );
        Self {
            _temp_dir: temp_dir,
            embedder: Arc::new(FakeEmbedder::default()),
            registry: Arc::new(CollectionRegistry::new(layout, TEST_DIMENSION)),
        }
    }

    fn retriever(&self) -> Retriever {
        Retriever::new(self.embedder.clone(), self.registry.clone())
            .with_expander(QueryExpander::new(false))
    }

    async fn add(&self, scope: ScopeKey, texts: &[&str]) {
        let handle = self
            .registry
            .open_or_create(scope.clone())
            .await
            .expect("should open collection");
        let vectors: Vec<Vec<f32>> = texts.iter().map(|t| self.embedder.vector_for(t)).collect();
        let entries = texts
            .iter()
            .enumerate()
            .map(|(i, text)| MetadataEntry {
                doc_id: "doc".to_string(),
                chunk_id: format!("doc_{i}"),
                chunk_text: (*text).to_string(),
                tenant_id: scope.tenant_id().map(str::to_string),
                folder_id: scope.folder_id().map(str::to_string),
                created_at: Utc::now(),
            })
            .collect();
        handle
            .write()
            .await
            .add(&vectors, entries)
            .expect("should add vectors");
    }
}

fn folder(name: &str) -> ScopeKey {
    ScopeKey::folder("tenant", name).expect("should build scope")
}

#[tokio::test]
async fn global_results_are_nearest_first() {
    let fixture = Fixture::new();
    fixture
        .add(ScopeKey::Global, &["zzzz", "aaab", "aaaa"])
        .await;

    let chunks = fixture
        .retriever()
        .retrieve_chunks("aaaa", 5, &[])
        .await
        .expect("should retrieve");

    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["aaaa", "aaab", "zzzz"]);
    assert!(chunks.windows(2).all(|w| w[0].distance <= w[1].distance));
}

#[tokio::test]
async fn scopes_are_concatenated_in_order_then_truncated() {
    let fixture = Fixture::new();
    fixture.add(folder("far"), &["zzzz", "yyyy", "xxxx"]).await;
    fixture.add(folder("near"), &["aaaa", "aaab", "aabb"]).await;

    let texts = fixture
        .retriever()
        .retrieve("aaaa", 4, &[folder("far"), folder("near")])
        .await
        .expect("should retrieve");

    assert_eq!(texts.len(), 4);
    assert_eq!(&texts[3], "aaaa");
    assert!(texts[..3].iter().all(|t| ["zzzz", "yyyy", "xxxx"].contains(&t.as_str())));
}

#[tokio::test]
async fn results_never_exceed_k() {
    let fixture = Fixture::new();
    let scopes: Vec<ScopeKey> = (0..5).map(|i| folder(&format!("f{i}"))).collect();
    for scope in &scopes {
        fixture.add(scope.clone(), &["abc", "def", "ghi"]).await;
    }

    for k in [1, 2, 7, 15, 40] {
        let texts = fixture
            .retriever()
            .retrieve("abc", k, &scopes)
            .await
            .expect("should retrieve");
        assert_eq!(texts.len(), k.min(15));
    }
}

#[tokio::test]
async fn empty_folder_yields_no_context() {
    let fixture = Fixture::new();
    fixture
        .registry
        .open_or_create(folder("empty"))
        .await
        .expect("should create folder collection");

    let texts = fixture
        .retriever()
        .retrieve("anything", 12, &[folder("empty")])
        .await
        .expect("should retrieve");
    assert!(texts.is_empty());
}

#[tokio::test]
async fn missing_scope_contributes_nothing() {
    let fixture = Fixture::new();
    fixture.add(folder("present"), &["hello"]).await;

    let texts = fixture
        .retriever()
        .retrieve("hello", 12, &[folder("absent"), folder("present")])
        .await
        .expect("should retrieve");
    assert_eq!(texts, vec!["hello".to_string()]);
}

#[tokio::test]
async fn positions_past_metadata_are_dropped() {
    let fixture = Fixture::new();
    fixture.add(folder("desync"), &["aaaa", "bbbb"]).await;

    // Keep only the first metadata line, as after a crash between the two writes
    let paths = fixture.registry.layout().paths(&folder("desync")).expect("should resolve paths");
    let metadata = fs::read_to_string(&paths.metadata).expect("should read metadata");
    let first_line = metadata.lines().next().expect("should have a line");
    fs::write(&paths.metadata, format!("{first_line}\n")).expect("should truncate metadata");
    fixture.registry.evict(&folder("desync")).await;

    let texts = fixture
        .retriever()
        .retrieve("bbbb", 5, &[folder("desync")])
        .await
        .expect("should retrieve");
    assert_eq!(texts, vec!["aaaa".to_string()]);
}

#[tokio::test]
async fn query_is_embedded_once_for_many_scopes() {
    let fixture = Fixture::new();
    fixture.add(folder("a"), &["x"]).await;
    fixture.add(folder("b"), &["y"]).await;

    fixture
        .retriever()
        .retrieve("q", 3, &[folder("a"), folder("b")])
        .await
        .expect("should retrieve");
    assert_eq!(fixture.embedder.calls(), 1);
}

#[tokio::test]
async fn embedding_failure_is_an_error() {
    let fixture = Fixture::new();
    let retriever = Retriever::new(Arc::new(FailingEmbedder), fixture.registry.clone());

    let error = retriever
        .retrieve("anything", 3, &[])
        .await
        .expect_err("should propagate embedding failure");
    assert!(format!("{error:#}").contains("embedding model unavailable"));
}

#[tokio::test]
async fn zero_k_returns_nothing_without_embedding() {
    let fixture = Fixture::new();
    let texts = fixture
        .retriever()
        .retrieve("anything", 0, &[])
        .await
        .expect("should retrieve");
    assert!(texts.is_empty());
    assert_eq!(fixture.embedder.calls(), 0);
}
