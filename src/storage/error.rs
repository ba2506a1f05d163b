//! Store error types.

/// Errors raised by a [`DocumentStore`](super::DocumentStore) backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The path is malformed or has the wrong parity for the call.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// The offending path.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The document does not exist.
    #[error("document not found: {path}")]
    NotFound {
        /// Path of the missing document.
        path: String,
    },

    /// A filesystem operation failed.
    #[error("{operation} failed for '{path}': {source}")]
    Io {
        /// The operation that failed.
        operation: &'static str,
        /// Filesystem path involved.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Stored content could not be encoded or decoded.
    #[error("malformed document '{path}': {cause}")]
    Serialization {
        /// Document path.
        path: String,
        /// Decoder message.
        cause: String,
    },

    /// A field transform could not be applied at commit time.
    #[error("cannot apply {transform} to field '{field}' of '{path}': {cause}")]
    Transform {
        /// Document path.
        path: String,
        /// Dotted field path.
        field: String,
        /// Transform name.
        transform: &'static str,
        /// Why it failed.
        cause: String,
    },

    /// The store refused the batch as a whole.
    #[error("batch commit rejected: {cause}")]
    CommitRejected {
        /// Reason given by the store.
        cause: String,
    },

    /// Any other backend failure (network, permission, quota).
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Builds an [`StoreError::InvalidPath`].
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Builds an [`StoreError::Io`] from a filesystem path.
    pub fn io(operation: &'static str, path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.display().to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::invalid_path("users", "expected a document path");
        assert_eq!(
            err.to_string(),
            "invalid path 'users': expected a document path"
        );

        let err = StoreError::CommitRejected {
            cause: "quota".to_string(),
        };
        assert_eq!(err.to_string(), "batch commit rejected: quota");
    }
}
