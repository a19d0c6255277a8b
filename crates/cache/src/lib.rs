//! # Doclens Cache
//!
//! Persistent, validity-checked storage for expensive per-document
//! processing results (summaries, outlines), keyed by a content-aware
//! fingerprint of the source document.
//!
//! ## Lifecycle
//!
//! ```text
//! ProcessingCache::open(config)
//!     │
//!     ├──> get(locator) ── hit (fresh, source unchanged) → artifact
//!     │                └── miss/expired/changed → caller reprocesses
//!     │
//!     └──> set(locator, artifact, metadata)
//!            ├─> snapshot source (size, mtime, content hash)
//!            ├─> evict (TTL first, then oldest-by-creation)
//!            └─> rewrite the durable JSON file
//! ```
//!
//! The cache is a pure optimization: every failure path inside it degrades
//! to "not cached" and is never surfaced to the caller.
//!
//! ## Example
//!
//! ```no_run
//! use doclens_cache::{ArtifactMetadata, CacheConfig, ProcessingCache};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = CacheConfig::new(".doclens/summary-cache.json", "summary");
//!     let cache: ProcessingCache<String> = ProcessingCache::open(config).await;
//!
//!     if cache.get("/docs/report.pdf").await.is_none() {
//!         let summary = "derived elsewhere".to_string();
//!         let meta = ArtifactMetadata::new("summary", summary.len());
//!         cache.set("/docs/report.pdf", summary, meta).await;
//!     }
//! }
//! ```

mod config;
mod entry;
mod error;
mod key;
mod stats;
mod store;

pub use config::{
    CacheConfig, DEFAULT_CAPACITY, DEFAULT_HASH_LIMIT_BYTES, DEFAULT_TTL, DURABLE_FORMAT_VERSION,
};
pub use entry::{ArtifactMetadata, CacheEntry, CachedDocument};
pub use error::{CacheError, Result};
pub use key::{cache_key, is_remote_locator, normalize_locator};
pub use stats::CacheStats;
pub use store::ProcessingCache;
