//! Persistence error types.

use crate::engine::BoxError;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by persisters and document stores.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The store no longer holds the expected state. The entity's in-memory
    /// marker has already been refreshed to `actual`.
    #[error("stale state: expected '{expected}', store holds '{actual}'")]
    StaleState { expected: String, actual: String },

    #[error("entity has no identifier")]
    MissingId,

    #[error("state document {0} not found")]
    DocumentNotFound(Uuid),

    #[error("state document {0} already exists")]
    DuplicateDocument(Uuid),

    #[error("entity {0} already has a state document")]
    DuplicateOwner(String),

    #[error("saving the entity failed")]
    Save(#[source] BoxError),

    #[error("invalid SQL identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("stored value is malformed: {0}")]
    Malformed(String),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    Sql(#[from] rusqlite::Error),
}

impl PersistError {
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleState { .. })
    }

    pub(crate) fn stale(expected: &str, actual: &str) -> Self {
        Self::StaleState {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}
