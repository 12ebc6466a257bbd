use thiserror::Error;

/// Errors surfaced by the clustering engine itself.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("bad parameter: {0}")]
    BadParameter(String),

    #[error("shape mismatch: expected dimension {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("degenerate vector: zero norm")]
    DegenerateVector,

    #[error("vectors were not retained by this engine")]
    NotRetained,

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors surfaced by a [`crate::storage::ClusterStore`] implementation.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("index out of bounds: {index} (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_wraps_into_cluster_error() {
        let storage_err = StorageError::NotFound("abc".to_string());
        let cluster_err: ClusterError = storage_err.into();
        assert!(matches!(cluster_err, ClusterError::Storage(_)));
    }

    #[test]
    fn shape_mismatch_message_includes_both_dimensions() {
        let err = ClusterError::ShapeMismatch {
            expected: 128,
            actual: 64,
        };
        let msg = err.to_string();
        assert!(msg.contains("128"));
        assert!(msg.contains("64"));
    }
}
