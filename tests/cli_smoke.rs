use std::{path::Path, process::Command};

use mathsearch::{PointDb, VectorStore, vector_store::Distance};

fn mathsearch(data_dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mathsearch"));
    cmd.arg("--data-dir")
        .arg(data_dir)
        .env_remove("MATHSEARCH_COLLECTION")
        .env_remove("MATHSEARCH_MODEL")
        .env("MATHSEARCH_LOG", "off");
    cmd
}

#[test]
fn status_on_fresh_data_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let output = mathsearch(tmp.path())
        .args(["status", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let status: serde_json::Value =
        serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["collection"], "math_problems");
    assert_eq!(status["model"], "BAAI/bge-small-en-v1.5");
    assert!(status["current"].is_null());
    assert_eq!(status["collections"].as_array().unwrap().len(), 0);
}

#[test]
fn search_missing_collection_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let output = mathsearch(tmp.path())
        .args(["search", "quadratic formula"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn search_empty_collection_returns_no_results() {
    let tmp = tempfile::tempdir().unwrap();
    {
        let store = PointDb::open(&tmp.path().join("points.redb")).unwrap();
        store
            .create_collection("math_problems", 384, Distance::Cosine)
            .unwrap();
    }

    let output = mathsearch(tmp.path())
        .args(["search", "quadratic formula", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["query"], "quadratic formula");
    assert_eq!(value["resultCount"], 0);

    let output = mathsearch(tmp.path())
        .args(["search", "quadratic formula"])
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Search results for: 'quadratic formula'"));
    assert!(stdout.contains("No results found."));
}

#[test]
fn reset_requires_confirmation() {
    let tmp = tempfile::tempdir().unwrap();
    {
        let store = PointDb::open(&tmp.path().join("points.redb")).unwrap();
        store
            .create_collection("math_problems", 384, Distance::Cosine)
            .unwrap();
    }

    let refused = mathsearch(tmp.path()).arg("reset").output().unwrap();
    assert!(!refused.status.success());

    let confirmed = mathsearch(tmp.path())
        .args(["reset", "--yes"])
        .output()
        .unwrap();
    assert!(confirmed.status.success());

    let status = mathsearch(tmp.path())
        .args(["status", "--json"])
        .output()
        .unwrap();
    let status: serde_json::Value =
        serde_json::from_slice(&status.stdout).unwrap();
    assert!(status["current"].is_null());
}

#[test]
fn ingest_skips_populated_collection_without_model() {
    use mathsearch::{record::ProblemRecord, vector_store::StoredPoint};

    let tmp = tempfile::tempdir().unwrap();
    {
        let store = PointDb::open(&tmp.path().join("points.redb")).unwrap();
        store
            .create_collection("math_problems", 2, Distance::Cosine)
            .unwrap();
        store
            .upsert(
                "math_problems",
                &[StoredPoint {
                    id: 0,
                    vector: vec![1.0, 0.0],
                    payload: ProblemRecord {
                        problem: "1 + 1".to_string(),
                        solution: "2".to_string(),
                        level: String::new(),
                        kind: String::new(),
                        subject: "prealgebra".to_string(),
                        filename: "0.json".to_string(),
                    },
                }],
            )
            .unwrap();
    }

    let output = mathsearch(tmp.path())
        .args(["ingest", "--no-progress"])
        .arg(tmp.path().join("corpus"))
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("already contains 1 points"));
}

#[test]
fn completions_are_generated() {
    let tmp = tempfile::tempdir().unwrap();
    let output = mathsearch(tmp.path())
        .args(["completions", "bash"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("mathsearch"));
}
