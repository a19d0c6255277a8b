use thiserror::Error;

/// Result type for internal cache operations.
///
/// Public store operations never return this: failures are logged and
/// degrade to a cache miss or a no-op at the operation boundary.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors that can occur inside cache operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Durable file (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
