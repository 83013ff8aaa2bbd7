use thiserror::Error;

/// Errors surfaced by the frontier and its host queues.
///
/// Every fault in the underlying store collapses into the single `Storage`
/// variant with the original cause preserved, so callers can treat "the
/// database broke" uniformly regardless of which redb operation failed.
/// `InvalidState` marks contract violations (caller bugs), not runtime
/// conditions, and should never be silently absorbed.
#[derive(Error, Debug)]
pub enum FrontierError {
    #[error("storage failure: {0}")]
    Storage(#[from] redb::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The frontier has been terminated; dispatch will never return work again.
    #[error("frontier terminated")]
    Ended,
}

impl From<redb::DatabaseError> for FrontierError {
    fn from(e: redb::DatabaseError) -> Self {
        Self::Storage(e.into())
    }
}

impl From<redb::TransactionError> for FrontierError {
    fn from(e: redb::TransactionError) -> Self {
        Self::Storage(e.into())
    }
}

impl From<redb::TableError> for FrontierError {
    fn from(e: redb::TableError) -> Self {
        Self::Storage(e.into())
    }
}

impl From<redb::StorageError> for FrontierError {
    fn from(e: redb::StorageError) -> Self {
        Self::Storage(e.into())
    }
}

impl From<redb::CommitError> for FrontierError {
    fn from(e: redb::CommitError) -> Self {
        Self::Storage(e.into())
    }
}

impl FrontierError {
    /// True for faults that should disable one origin rather than stop the crawl.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Serialization(_))
    }
}
