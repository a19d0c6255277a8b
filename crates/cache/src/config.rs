use std::path::PathBuf;
use std::time::Duration;

/// Version tag of the durable file format. A bump is an intentional full
/// invalidation: files carrying any other tag are discarded on load.
pub const DURABLE_FORMAT_VERSION: &str = "1";

/// Entries older than this are treated as misses and removed.
pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Eviction trims the store back to this many entries after a `set`.
pub const DEFAULT_CAPACITY: usize = 100;

/// Local files at or above this size skip the content re-hash on lookup;
/// a size+mtime match is accepted as evidence of non-modification.
pub const DEFAULT_HASH_LIMIT_BYTES: u64 = 50 * 1024 * 1024;

/// Configuration for a processing cache instance
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// Durable file backing this store; exclusively owned by one instance
    pub path: PathBuf,

    /// Processing-strategy namespace (e.g. "summary", "outline")
    pub strategy: String,

    /// Time-to-live for entries
    pub ttl: Duration,

    /// Maximum entry count retained after eviction
    pub capacity: usize,

    /// Size threshold above which lookup skips the content re-hash
    pub hash_limit_bytes: u64,
}

impl CacheConfig {
    /// Create a config with default TTL, capacity and hash limit
    pub fn new(path: impl Into<PathBuf>, strategy: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            strategy: strategy.into(),
            ttl: DEFAULT_TTL,
            capacity: DEFAULT_CAPACITY,
            hash_limit_bytes: DEFAULT_HASH_LIMIT_BYTES,
        }
    }

    /// Builder: override the TTL
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Builder: override the capacity
    #[must_use]
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Builder: override the hash re-check limit
    #[must_use]
    pub const fn with_hash_limit_bytes(mut self, limit: u64) -> Self {
        self.hash_limit_bytes = limit;
        self
    }
}
