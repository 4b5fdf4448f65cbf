use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by a distributed store.
pub enum StoreError {
    /// Could not connect to the store endpoint.
    #[error("failed to connect to store at '{url}': {message}")]
    ConnectionFailed {
        /// Endpoint URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// The store did not answer the availability probe.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Error message.
        message: String,
    },

    /// A keyed command failed.
    #[error("{operation} failed for '{key}': {message}")]
    CommandFailed {
        /// Command name (GET, SET, DEL).
        operation: &'static str,
        /// Fully-qualified key.
        key: String,
        /// Error message.
        message: String,
    },

    /// Key enumeration failed.
    #[error("scan failed for pattern '{pattern}': {message}")]
    ScanFailed {
        /// Glob pattern passed to the scan.
        pattern: String,
        /// Error message.
        message: String,
    },
}

/// Convenience result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
