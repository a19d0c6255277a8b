use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A stored processing result plus the source snapshot taken at creation.
///
/// Entries are immutable once written; an update replaces the entry
/// wholesale under the same key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// The cached artifact
    pub data: T,

    /// Creation timestamp (unix ms)
    pub created_at_ms: u64,

    /// SHA-256 of the source bytes (local) or of the URL string (remote)
    pub content_fingerprint: String,

    /// Source file size at creation (0 for remote sources)
    pub byte_size: u64,

    /// Source file mtime at creation, unix ms ("now" for remote sources)
    pub last_modified_ms: u64,

    /// Original, non-normalized locator, kept for diagnostics
    pub source_locator: String,

    /// Which derivation pipeline produced the artifact
    pub processing_strategy: String,

    /// Length of the text that was processed
    pub input_text_length: usize,
}

impl<T> CacheEntry<T> {
    /// Whether the entry has outlived `ttl`
    #[must_use]
    pub fn is_expired(&self, ttl: Duration) -> bool {
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        unix_now_ms().saturating_sub(self.created_at_ms) > ttl_ms
    }
}

/// Caller-supplied metadata recorded alongside an artifact on `set`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Which derivation pipeline produced the artifact
    pub processing_strategy: String,

    /// Length of the text that was processed
    pub input_text_length: usize,
}

impl ArtifactMetadata {
    /// Create artifact metadata
    pub fn new(processing_strategy: impl Into<String>, input_text_length: usize) -> Self {
        Self {
            processing_strategy: processing_strategy.into(),
            input_text_length,
        }
    }
}

/// One row of the diagnostic enumeration produced by `list_all`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedDocument<T> {
    /// Original locator as passed to `set`
    pub source_locator: String,

    /// The cached artifact
    pub data: T,

    /// Creation timestamp (unix ms)
    pub created_at_ms: u64,
}

pub(crate) fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
