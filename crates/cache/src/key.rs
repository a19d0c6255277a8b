use sha2::{Digest, Sha256};
use std::path::Path;

/// Check whether a locator names a remote source (URL convention)
#[must_use]
pub fn is_remote_locator(locator: &str) -> bool {
    locator.starts_with("http")
}

/// Normalize a locator for key derivation.
///
/// Local paths resolve to their canonical absolute form when possible, so
/// `./doc.pdf` and `/abs/path/doc.pdf` key identically; everything is
/// lower-cased. Normalization affects only the key, never file access.
#[must_use]
pub fn normalize_locator(locator: &str) -> String {
    if is_remote_locator(locator) {
        return locator.to_lowercase();
    }

    match std::fs::canonicalize(Path::new(locator)) {
        Ok(canonical) => canonical.to_string_lossy().to_lowercase(),
        Err(_) => locator.to_lowercase(),
    }
}

/// Deterministic cache key for a (strategy, locator) pair.
///
/// Distinct strategies never collide for the same locator: both inputs are
/// hashed with a separator that cannot appear in a strategy name boundary.
#[must_use]
pub fn cache_key(strategy: &str, locator: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(strategy.as_bytes());
    hasher.update(b"|");
    hasher.update(normalize_locator(locator).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Hex-encoded SHA-256 of a byte buffer
#[must_use]
pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
