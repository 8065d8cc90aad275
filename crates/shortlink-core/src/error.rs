use thiserror::Error;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors returned by every storage backend.
///
/// Backends map their native failures onto these variants so callers can
/// branch on the kind of failure without inspecting messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// No link is stored under the requested key.
    #[error("link not found: {0}")]
    NotFound(String),
    /// A backend invariant was violated, e.g. an upsert touched an
    /// unexpected number of rows.
    #[error("storage invariant violated: {0}")]
    Validation(String),
    /// The backend answered with something outside the wire contract.
    #[error("storage protocol error: {0}")]
    Protocol(String),
    /// The backend reported a logical failure. The message is the
    /// backend's own text.
    #[error("storage backend error: {0}")]
    Application(String),
    /// Network, file or connection failure.
    #[error("storage I/O failed: {0}")]
    Io(String),
}

impl StorageError {
    /// Returns `true` for [`StorageError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }

    /// Returns `true` when retrying the same call may succeed.
    ///
    /// Backends never retry on their own; this is a hint for callers.
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Io(_))
    }
}
