//! Local store error types.

use vertex_storage::DatabaseError;
use vertex_swarm_primitives::ChunkAddress;

/// Errors from local store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocalStoreError {
    /// The entry a mode relies on is missing from an index.
    #[error("{address} not found in {index} index")]
    NotFound {
        /// Index that was consulted.
        index: &'static str,
        /// Address that was looked up.
        address: ChunkAddress,
    },

    /// The store is inconsistent or was opened with incompatible settings.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Database error.
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl LocalStoreError {
    pub(crate) const fn not_found(index: &'static str, address: ChunkAddress) -> Self {
        Self::NotFound { index, address }
    }

    /// Whether this is a [`LocalStoreError::NotFound`].
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for local store operations.
pub type LocalStoreResult<T> = Result<T, LocalStoreError>;
