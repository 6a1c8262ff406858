use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use intellidoc::config::{parse_config, Config, HybridStrategy};
use intellidoc::embedding::HashEmbedder;
use intellidoc::error::Error;
use intellidoc::ingest::ingest_pages;
use intellidoc::migrate::run_migrations;
use intellidoc::models::NewChunk;
use intellidoc::search::{SearchMode, Searcher};
use intellidoc::sqlite_store::SqliteStore;
use intellidoc::store::{InMemoryStore, Store};

const DIMS: usize = 64;

fn intellidoc_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_intellidoc"))
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/intellidoc.sqlite"

[embedding]
provider = "hash"
dims = {dims}

[output]
dir = "{root}/output"
"#,
        root = root.display(),
        dims = DIMS
    );

    let config_path = config_dir.join("intellidoc.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_intellidoc(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = intellidoc_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run intellidoc binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.db.path = root.join("data/intellidoc.sqlite");
    config.embedding.provider = "hash".into();
    config.embedding.dims = DIMS;
    config
}

/// Fresh database with the two-chunk animals document.
async fn seeded_store(root: &Path) -> (Config, SqliteStore, i64) {
    let config = test_config(root);
    run_migrations(&config.db.path).await.unwrap();
    let store = SqliteStore::open(&config.db.path).unwrap();
    let embedder = HashEmbedder::new(DIMS);

    let report = ingest_pages(
        &config,
        &store,
        &embedder,
        "animals.pdf",
        &[
            "cats are mammals".to_string(),
            "the stock market fell".to_string(),
        ],
    )
    .await
    .unwrap();

    (config, store, report.document_id)
}

// ============ Library against SQLite ============

#[tokio::test]
async fn test_lexical_search_uses_stemming() {
    let tmp = TempDir::new().unwrap();
    let (config, store, doc) = seeded_store(tmp.path()).await;
    let embedder = HashEmbedder::new(DIMS);
    let searcher = Searcher::new(&store, &embedder, &config.retrieval);

    let rows = searcher.lexical_search("cat", doc).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].content, "cats are mammals");
    assert_eq!(rows[0].page_number, 1);
    assert!(rows[0].rank >= 0.0);
    assert_eq!(rows[0].distance, 0.0);

    let rows = searcher.lexical_search("falling markets", doc).await.unwrap();
    assert_eq!(rows.len(), 0, "fall/fell are different porter stems");

    let rows = searcher.lexical_search("markets", doc).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].page_number, 2);
}

#[tokio::test]
async fn test_lexical_grammar_on_fts5() {
    let tmp = TempDir::new().unwrap();
    let (config, store, doc) = seeded_store(tmp.path()).await;
    let embedder = HashEmbedder::new(DIMS);
    let searcher = Searcher::new(&store, &embedder, &config.retrieval);

    let rows = searcher.lexical_search("\"stock market\"", doc).await.unwrap();
    assert_eq!(rows.len(), 1);

    let rows = searcher.lexical_search("\"market stock\"", doc).await.unwrap();
    assert!(rows.is_empty());

    let rows = searcher.lexical_search("cats OR stock", doc).await.unwrap();
    assert_eq!(rows.len(), 2);

    let rows = searcher.lexical_search("cats stock", doc).await.unwrap();
    assert!(rows.is_empty());

    let rows = searcher.lexical_search("-cats", doc).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].content, "the stock market fell");
    assert_eq!(rows[0].rank, 0.0);

    let rows = searcher.lexical_search("the and of", doc).await.unwrap();
    assert!(rows.is_empty());
}

const MIXED_PAGES: [&str; 4] = [
    "the bank of america reported state-of-the-art results while running",
    "a bank in america runs the markets",
    "cats are mammals",
    "the stock market fell",
];

async fn ingest_mixed(config: &Config, store: &dyn Store) -> i64 {
    let pages: Vec<String> = MIXED_PAGES.iter().map(|p| p.to_string()).collect();
    ingest_pages(config, store, &HashEmbedder::new(DIMS), "mixed.pdf", &pages)
        .await
        .unwrap()
        .document_id
}

async fn matched_pages(store: &dyn Store, config: &Config, query: &str, doc: i64) -> Vec<i64> {
    let embedder = HashEmbedder::new(DIMS);
    let searcher = Searcher::new(store, &embedder, &config.retrieval);
    let mut pages: Vec<i64> = searcher
        .lexical_search(query, doc)
        .await
        .unwrap()
        .iter()
        .map(|r| r.page_number)
        .collect();
    pages.sort();
    pages
}

#[tokio::test]
async fn test_phrases_with_stop_words_on_fts5() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    run_migrations(&config.db.path).await.unwrap();
    let store = SqliteStore::open(&config.db.path).unwrap();
    let doc = ingest_mixed(&config, &store).await;

    assert_eq!(matched_pages(&store, &config, "\"bank of america\"", doc).await, vec![1]);
    assert_eq!(matched_pages(&store, &config, "state-of-the-art", doc).await, vec![1]);
    assert_eq!(matched_pages(&store, &config, "run", doc).await, vec![1, 2]);
    assert!(matched_pages(&store, &config, "\"bank america\"", doc).await.is_empty());
}

#[tokio::test]
async fn test_lexical_predicate_agrees_across_stores() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    run_migrations(&config.db.path).await.unwrap();
    let sqlite = SqliteStore::open(&config.db.path).unwrap();
    let memory = InMemoryStore::new();
    let sqlite_doc = ingest_mixed(&config, &sqlite).await;
    let memory_doc = ingest_mixed(&config, &memory).await;

    let queries = [
        "\"bank of america\"",
        "\"bank america\"",
        "state-of-the-art",
        "run",
        "bank america",
        "bank -reported",
        "markets",
        "mammal",
        "results",
        "cats or stock",
        "-bank",
        "the of",
    ];
    for query in queries {
        assert_eq!(
            matched_pages(&sqlite, &config, query, sqlite_doc).await,
            matched_pages(&memory, &config, query, memory_doc).await,
            "query {:?}",
            query
        );
    }
}

#[tokio::test]
async fn test_vector_search_orders_by_distance() {
    let tmp = TempDir::new().unwrap();
    let (config, store, doc) = seeded_store(tmp.path()).await;
    let embedder = HashEmbedder::new(DIMS);
    let searcher = Searcher::new(&store, &embedder, &config.retrieval);

    let rows = searcher.vector_search("cats", doc).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].content, "cats are mammals");
    assert!(rows[0].distance <= rows[1].distance);
    assert!(rows.iter().all(|r| r.rank == 0.0));
}

#[tokio::test]
async fn test_hybrid_union_returns_three_rows() {
    let tmp = TempDir::new().unwrap();
    let (config, store, doc) = seeded_store(tmp.path()).await;
    let embedder = HashEmbedder::new(DIMS);
    let searcher = Searcher::new(&store, &embedder, &config.retrieval);

    let rows = searcher.hybrid_search("cats", doc, 10).await.unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].content, "cats are mammals");
    assert_eq!(rows[0].distance, 0.0);
    assert_eq!(rows.iter().filter(|r| r.content == "cats are mammals").count(), 2);
    for w in rows.windows(2) {
        assert!(w[0].combined_score() >= w[1].combined_score());
    }

    let rows = searcher.hybrid_search("cats", doc, 1).await.unwrap();
    assert_eq!(rows.len(), 1);

    let rows = searcher.hybrid_search("bonds", doc, 10).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.rank == 0.0));
}

#[tokio::test]
async fn test_hybrid_fused_strategy() {
    let tmp = TempDir::new().unwrap();
    let (mut config, store, doc) = seeded_store(tmp.path()).await;
    config.retrieval.hybrid_strategy = HybridStrategy::Fused;
    let embedder = HashEmbedder::new(DIMS);
    let searcher = Searcher::new(&store, &embedder, &config.retrieval);

    let rows = searcher.hybrid_search("cats", doc, 10).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].content, "cats are mammals");
    assert!(rows[0].distance > 0.0);
}

#[tokio::test]
async fn test_searches_are_scoped_to_document() {
    let tmp = TempDir::new().unwrap();
    let (config, store, doc) = seeded_store(tmp.path()).await;
    let embedder = HashEmbedder::new(DIMS);
    let other = ingest_pages(
        &config,
        &store,
        &embedder,
        "pets.pdf",
        &["cats and dogs".to_string()],
    )
    .await
    .unwrap();
    let searcher = Searcher::new(&store, &embedder, &config.retrieval);

    for mode in SearchMode::ALL {
        let rows = searcher.search(mode, "cats", other.document_id, None).await.unwrap();
        assert!(rows.iter().all(|r| r.content == "cats and dogs"), "{}", mode);
    }
    let rows = searcher.vector_search("cats", doc).await.unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_failed_chunk_rolls_back_document() {
    let tmp = TempDir::new().unwrap();
    let (_config, store, _doc) = seeded_store(tmp.path()).await;

    let good = NewChunk {
        page_number: 1,
        page_title: None,
        entities: Some(vec!["ACME".into()]),
        content: "valid chunk".into(),
        tokens: 2,
        embedding: vec![0.1; DIMS],
    };
    let bad = NewChunk {
        tokens: 0,
        ..good.clone()
    };

    let err = store
        .insert_document("broken.pdf", &[good, bad])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Storage(_)));

    let docs = store.list_documents().await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].document.file_name, "animals.pdf");
    assert_eq!(docs[0].chunk_count, 2);
}

#[tokio::test]
async fn test_stored_chunk_round_trip() {
    let tmp = TempDir::new().unwrap();
    let (_config, store, _doc) = seeded_store(tmp.path()).await;

    let chunk = NewChunk {
        page_number: 4,
        page_title: Some("Results".into()),
        entities: Some(vec!["ACME".into(), "Q3".into()]),
        content: "revenue grew".into(),
        tokens: 2,
        embedding: vec![0.25; DIMS],
    };
    let id = store.insert_document("report.pdf", &[chunk]).await.unwrap();

    let doc = store.get_document(id).await.unwrap().unwrap();
    assert_eq!(doc.file_name, "report.pdf");
    assert!(doc.upload_date > 0);

    let stored = store.document_chunks(id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].page_title.as_deref(), Some("Results"));
    assert_eq!(stored[0].entities, Some(vec!["ACME".to_string(), "Q3".to_string()]));
    assert_eq!(stored[0].embedding, vec![0.25; DIMS]);

    assert!(store.get_document(id + 100).await.unwrap().is_none());
}

#[tokio::test]
async fn test_double_ingest_creates_disjoint_documents() {
    let tmp = TempDir::new().unwrap();
    let (config, store, first) = seeded_store(tmp.path()).await;
    let embedder = HashEmbedder::new(DIMS);

    let second = ingest_pages(
        &config,
        &store,
        &embedder,
        "animals.pdf",
        &[
            "cats are mammals".to_string(),
            "the stock market fell".to_string(),
        ],
    )
    .await
    .unwrap();
    assert_ne!(first, second.document_id);

    let a: Vec<i64> = store.document_chunks(first).await.unwrap().iter().map(|c| c.id).collect();
    let b: Vec<i64> = store
        .document_chunks(second.document_id)
        .await
        .unwrap()
        .iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(a.len(), 2);
    assert_eq!(b.len(), 2);
    assert!(a.iter().all(|id| !b.contains(id)));
}

#[tokio::test]
async fn test_missing_database_degrades_to_empty() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let store = SqliteStore::open(&tmp.path().join("nope/missing.sqlite")).unwrap();
    let embedder = HashEmbedder::new(DIMS);
    let searcher = Searcher::new(&store, &embedder, &config.retrieval);

    for mode in SearchMode::ALL {
        let rows = searcher.search(mode, "cats", 1, None).await.unwrap();
        assert!(rows.is_empty());
    }

    let err = store.list_documents().await.unwrap_err();
    assert!(err.is_connection());
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let tmp = TempDir::new().unwrap();
    let (config, store, _doc) = seeded_store(tmp.path()).await;
    run_migrations(&config.db.path).await.unwrap();
    assert_eq!(store.list_documents().await.unwrap().len(), 1);
}

#[test]
fn test_example_config_parses() {
    let content = fs::read_to_string(
        Path::new(env!("CARGO_MANIFEST_DIR")).join("config/intellidoc.example.toml"),
    )
    .unwrap();
    let config = parse_config(&content).unwrap();
    assert_eq!(config.retrieval.hybrid_limit, 10);
}

// ============ Binary ============

#[test]
fn test_init_is_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_intellidoc(&config_path, &["init"]);
    assert!(success, "init failed: {}", stderr);
    assert!(stdout.contains("Database initialized"));

    let (_, stderr, success) = run_intellidoc(&config_path, &["init"]);
    assert!(success, "second init failed: {}", stderr);

    let (stdout, _, success) = run_intellidoc(&config_path, &["documents"]);
    assert!(success);
    assert!(stdout.contains("No documents."));
}

#[test]
fn test_unknown_mode_fails_without_output() {
    let (tmp, config_path) = setup_test_env();
    run_intellidoc(&config_path, &["init"]);

    let (_, stderr, success) =
        run_intellidoc(&config_path, &["search", "foo", "cats", "--document", "1"]);
    assert!(!success);
    assert!(stderr.contains("unknown search mode"), "stderr: {}", stderr);

    let (_, stderr, success) = run_intellidoc(
        &config_path,
        &["qa", "foo", "cats", "--document", "1", "--question", "why?"],
    );
    assert!(!success);
    assert!(stderr.contains("unknown search mode"), "stderr: {}", stderr);

    assert!(!tmp.path().join("output").exists());
}

#[test]
fn test_zero_limit_fails_without_output() {
    let (tmp, config_path) = setup_test_env();
    run_intellidoc(&config_path, &["init"]);

    let (_, stderr, success) = run_intellidoc(
        &config_path,
        &["search", "hybrid", "cats", "--document", "1", "--limit", "0"],
    );
    assert!(!success);
    assert!(stderr.contains("limit must be >= 1"), "stderr: {}", stderr);
    assert!(!tmp.path().join("output").exists());
}

#[test]
fn test_search_writes_csv() {
    let (tmp, config_path) = setup_test_env();
    run_intellidoc(&config_path, &["init"]);

    let (stdout, stderr, success) = run_intellidoc(
        &config_path,
        &["search", "full_text", "Stock Market", "--document", "1"],
    );
    assert!(success, "search failed: {}", stderr);
    assert!(stdout.contains("No results."));

    let files: Vec<_> = fs::read_dir(tmp.path().join("output"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("lexical_search_stock_market_doc1_"));

    let body = fs::read_to_string(tmp.path().join("output").join(&files[0])).unwrap();
    assert_eq!(body.trim_end(), "ID,Page Number,Content,Rank,Distance");
}

#[test]
fn test_search_before_init_returns_no_results() {
    let (tmp, config_path) = setup_test_env();
    let out = tmp.path().join("elsewhere");

    let (stdout, stderr, success) = run_intellidoc(
        &config_path,
        &[
            "search",
            "hybrid",
            "cats",
            "--document",
            "1",
            "--output",
            out.to_str().unwrap(),
        ],
    );
    assert!(success, "search failed: {}", stderr);
    assert!(stdout.contains("No results."));
    assert_eq!(fs::read_dir(&out).unwrap().count(), 1);
}

#[test]
fn test_ingest_invalid_pdf_fails() {
    let (tmp, config_path) = setup_test_env();
    run_intellidoc(&config_path, &["init"]);

    let pdf = tmp.path().join("bad.pdf");
    fs::write(&pdf, b"not a valid pdf").unwrap();

    let (_, stderr, success) = run_intellidoc(&config_path, &["ingest", pdf.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("PDF extraction failed"), "stderr: {}", stderr);

    let (stdout, _, _) = run_intellidoc(&config_path, &["documents"]);
    assert!(stdout.contains("No documents."));
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) =
        run_intellidoc(&tmp.path().join("absent.toml"), &["documents"]);
    assert!(!success);
    assert!(stderr.contains("failed to read config file"));
}
