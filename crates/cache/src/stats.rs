use serde::{Deserialize, Serialize};

/// Aggregate figures for a cache store, for the diagnostics surface
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of entries currently held
    pub total_entries: usize,

    /// Approximate payload size: serialized byte length of each artifact
    pub total_size_kb: u64,

    /// Creation timestamp of the oldest entry, unix ms
    pub oldest_entry_ms: Option<u64>,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Entries: {} | Size: {} KB | Oldest: {}",
            self.total_entries,
            self.total_size_kb,
            self.oldest_entry_ms
                .map_or_else(|| "none".to_string(), |ms| ms.to_string())
        )
    }
}
