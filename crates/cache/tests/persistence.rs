//! Durability behavior of the processing cache: reopen, version handling,
//! and recovery from corrupt or partially malformed durable files.

use doclens_cache::{ArtifactMetadata, CacheConfig, ProcessingCache, DURABLE_FORMAT_VERSION};
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct Outline {
    headings: Vec<String>,
}

fn config(dir: &Path, strategy: &str) -> CacheConfig {
    CacheConfig::new(dir.join(format!("{strategy}-cache.json")), strategy)
}

fn meta(strategy: &str) -> ArtifactMetadata {
    ArtifactMetadata::new(strategy, 500)
}

#[tokio::test]
async fn entries_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let url = "https://example.com/spec.pdf";

    {
        let cache: ProcessingCache<String> = ProcessingCache::open(config(dir.path(), "summary")).await;
        cache.set(url, "persisted summary".to_string(), meta("summary")).await;
    }

    let reopened: ProcessingCache<String> =
        ProcessingCache::open(config(dir.path(), "summary")).await;
    assert_eq!(reopened.get(url).await.as_deref(), Some("persisted summary"));
}

#[tokio::test]
async fn structured_artifacts_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let url = "https://example.com/spec.pdf";
    let outline = Outline {
        headings: vec!["Intro".to_string(), "Methods".to_string()],
    };

    {
        let cache: ProcessingCache<Outline> = ProcessingCache::open(config(dir.path(), "outline")).await;
        cache.set(url, outline.clone(), meta("outline")).await;
    }

    let reopened: ProcessingCache<Outline> =
        ProcessingCache::open(config(dir.path(), "outline")).await;
    assert_eq!(reopened.get(url).await, Some(outline));
}

#[tokio::test]
async fn namespaces_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let url = "https://example.com/spec.pdf";

    let summaries: ProcessingCache<String> =
        ProcessingCache::open(config(dir.path(), "summary")).await;
    let outlines: ProcessingCache<String> =
        ProcessingCache::open(config(dir.path(), "outline")).await;

    summaries.set(url, "the summary".to_string(), meta("summary")).await;

    assert!(outlines.get(url).await.is_none());
    assert_eq!(summaries.get(url).await.as_deref(), Some("the summary"));
}

#[tokio::test]
async fn version_mismatch_discards_file() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), "summary");

    let stale = json!({
        "version": "0-legacy",
        "entries": {
            "somekey": {
                "data": "old artifact",
                "created_at_ms": 1u64,
                "content_fingerprint": "fp",
                "byte_size": 0u64,
                "last_modified_ms": 1u64,
                "source_locator": "https://example.com/spec.pdf",
                "processing_strategy": "summary",
                "input_text_length": 10usize
            }
        }
    });
    std::fs::write(&cfg.path, serde_json::to_vec_pretty(&stale).unwrap()).unwrap();

    let cache: ProcessingCache<String> = ProcessingCache::open(cfg).await;
    assert!(cache.is_empty().await);
    assert!(cache.get("https://example.com/spec.pdf").await.is_none());
}

#[tokio::test]
async fn unparsable_file_is_deleted_and_store_functions() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), "summary");
    std::fs::write(&cfg.path, b"{ not json at all").unwrap();

    let cache: ProcessingCache<String> = ProcessingCache::open(cfg.clone()).await;
    assert!(cache.is_empty().await);
    assert!(!cfg.path.exists(), "corrupt file should be deleted");

    // The store keeps working after recovery.
    let url = "https://example.com/spec.pdf";
    cache.set(url, "fresh".to_string(), meta("summary")).await;
    assert_eq!(cache.get(url).await.as_deref(), Some("fresh"));
    assert!(cfg.path.exists());
}

#[tokio::test]
async fn malformed_entries_are_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), "summary");

    let mixed = json!({
        "version": DURABLE_FORMAT_VERSION,
        "entries": {
            "good": {
                "data": "valid artifact",
                "created_at_ms": u64::MAX / 2,
                "content_fingerprint": "fp",
                "byte_size": 0u64,
                "last_modified_ms": 1u64,
                "source_locator": "https://example.com/good.pdf",
                "processing_strategy": "summary",
                "input_text_length": 10usize
            },
            "missing-fields": {
                "data": "no snapshot fields"
            },
            "wrong-types": {
                "data": 42,
                "created_at_ms": "not a number",
                "content_fingerprint": "fp",
                "byte_size": 0u64,
                "last_modified_ms": 1u64,
                "source_locator": "https://example.com/bad.pdf",
                "processing_strategy": "summary",
                "input_text_length": 10usize
            }
        }
    });
    std::fs::write(&cfg.path, serde_json::to_vec_pretty(&mixed).unwrap()).unwrap();

    let cache: ProcessingCache<String> = ProcessingCache::open(cfg).await;
    assert_eq!(cache.len().await, 1);

    let all = cache.list_all().await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].source_locator, "https://example.com/good.pdf");
    assert_eq!(all[0].data, "valid artifact");
}

#[tokio::test]
async fn durable_file_carries_version_tag() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), "summary");

    let cache: ProcessingCache<String> = ProcessingCache::open(cfg.clone()).await;
    cache
        .set("https://example.com/spec.pdf", "s".to_string(), meta("summary"))
        .await;

    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&cfg.path).unwrap()).unwrap();
    assert_eq!(raw["version"], DURABLE_FORMAT_VERSION);
    assert_eq!(raw["entries"].as_object().unwrap().len(), 1);
}
