use serde_json::json;

use overlay_rag::core::config::AppPaths;
use overlay_rag::rag::{SqliteVectorStore, VectorRecord, VectorStore};

fn record(id: &str, vector: Vec<f32>, text: &str) -> VectorRecord {
    VectorRecord::new(id, vector, json!({ "source_text": text, "file_type": "text" }))
}

#[tokio::test]
async fn vectors_survive_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let paths = AppPaths::with_data_dir(dir.path().to_path_buf(), dir.path().to_path_buf());

    {
        let store = SqliteVectorStore::new(&paths).await.unwrap();
        store
            .upsert(
                "game_docs",
                vec![
                    record("a", vec![1.0, 0.0, 0.0], "Margit is weak to bleed."),
                    record("b", vec![0.0, 1.0, 0.0], "Ranni waits at her Rise."),
                ],
            )
            .await
            .unwrap();
    }

    let store = SqliteVectorStore::new(&paths).await.unwrap();
    assert_eq!(store.db_path(), &paths.vector_db_path);
    assert_eq!(store.count("game_docs").await.unwrap(), 2);
    assert!(store.exists("game_docs", "a").await.unwrap());
    assert!(!store.exists("game_queries", "a").await.unwrap());

    let hits = store.query("game_docs", &[0.9, 0.1, 0.0], 1).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "a");
    assert_eq!(hits[0].metadata["source_text"], "Margit is weak to bleed.");
}

#[tokio::test]
async fn upsert_replaces_metadata_and_ties_break_by_id() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteVectorStore::with_path(dir.path().join("vectors.db"))
        .await
        .unwrap();

    store
        .upsert(
            "game_docs",
            vec![
                record("z", vec![0.0, 1.0], "first"),
                record("m", vec![0.0, 1.0], "twin"),
            ],
        )
        .await
        .unwrap();
    store
        .upsert("game_docs", vec![record("z", vec![0.0, 1.0], "second")])
        .await
        .unwrap();

    let hits = store.query("game_docs", &[0.0, 1.0], 10).await.unwrap();
    let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["m", "z"]);
    assert_eq!(hits[1].metadata["source_text"], "second");
    assert_eq!(store.count("game_docs").await.unwrap(), 2);
}

#[tokio::test]
async fn empty_namespace_returns_no_matches() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteVectorStore::with_path(dir.path().join("vectors.db"))
        .await
        .unwrap();

    assert!(store.query("game_queries", &[1.0, 0.0], 3).await.unwrap().is_empty());
    assert_eq!(store.count("game_queries").await.unwrap(), 0);
}
