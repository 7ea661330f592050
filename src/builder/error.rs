//! Build errors for state catalogs and machine builders.

use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// Errors that can occur when building catalogs and machines.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BuildError {
    #[error("State catalog is empty. Provide at least the start state")]
    EmptyCatalog,

    #[error("State name '{name}' is registered more than once")]
    DuplicateState { name: String },

    #[error("Start state '{name}' is not part of the catalog")]
    UnknownStartState { name: String },

    #[error("State '{name}' is not part of the catalog")]
    UnknownState { name: String },

    #[error("Event '{event}' already has a transition from '{state}'")]
    DuplicateTransition { state: String, event: String },

    #[error("Event '{event}' already has an any-state transition")]
    DuplicateAnyStateTransition { event: String },

    #[error("Retry budget must allow at least one attempt")]
    ZeroRetries,

    #[error("Persister not specified. Call .persister(p) before .build()")]
    MissingPersister,

    #[error("{} configuration errors: {}", .0.len(), join(.0))]
    Multiple(Vec<BuildError>),
}

fn join(errors: &[BuildError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Collapse accumulated validation failures into a single error.
pub(crate) fn collect<T>(
    validation: Validation<T, NonEmptyVec<BuildError>>,
) -> Result<T, BuildError> {
    match validation {
        Validation::Success(value) => Ok(value),
        Validation::Failure(errors) => {
            let mut errors: Vec<BuildError> = errors.iter().cloned().collect();
            if errors.len() == 1 {
                Err(errors.remove(0))
            } else {
                Err(BuildError::Multiple(errors))
            }
        }
    }
}
