//! Persistence of the current state with compare-and-swap semantics.
//!
//! A [`Persister`] reads an entity's current state and advances it only if
//! the backing store still holds the state the caller observed. Backends
//! differ in how they make that comparison atomic:
//!
//! - [`MemoryPersister`]: one process-local lock around a map
//! - [`SqlPersister`]: a single conditional `UPDATE` (feature `sqlite`)
//! - [`document::DocumentPersister`]: find-and-modify on a side record
//!
//! Entities are reached only through the accessor traits in this module, so
//! any caller type can be managed.

pub mod document;
mod error;
mod memory;
#[cfg(feature = "sqlite")]
mod sql;

pub use error::PersistError;
pub use memory::MemoryPersister;
#[cfg(feature = "sqlite")]
pub use sql::{SqlPersister, TableMapping};

use crate::core::{State, StateCatalog};
use std::fmt::Display;
use std::hash::Hash;

/// Access to a managed entity's identifier.
///
/// `None` means the entity has not been durably saved yet.
pub trait HasId {
    type Id: Clone + Eq + Hash + Display + Send + Sync;

    fn id(&self) -> Option<Self::Id>;
}

/// Access to a managed entity's string state marker.
pub trait HasStateMarker {
    fn state_marker(&self) -> Option<&str>;

    fn set_state_marker(&mut self, marker: Option<String>);
}

/// Reads and atomically advances an entity's state.
pub trait Persister<S: State, T>: Send + Sync {
    /// The entity's current state; the start state when none is recorded.
    fn current(&self, entity: &T) -> S;

    /// Move from `expected` to `next` if the store still holds `expected`.
    ///
    /// On conflict returns [`PersistError::StaleState`] after refreshing the
    /// entity's in-memory marker to the store's actual value.
    fn set_current(&self, entity: &mut T, expected: &S, next: &S) -> Result<(), PersistError>;
}

/// Compare-and-set on the entity's own marker, for entities not yet durable.
///
/// `&mut` access already makes this exclusive, so no lock is taken.
pub(crate) fn set_marker_in_process<S, T>(
    catalog: &StateCatalog<S>,
    entity: &mut T,
    expected: &S,
    next: &S,
) -> Result<(), PersistError>
where
    S: State,
    T: HasStateMarker,
{
    let actual = catalog.resolve(entity.state_marker());
    if actual != *expected {
        return Err(PersistError::stale(expected.name(), actual.name()));
    }
    entity.set_state_marker(Some(next.name().to_string()));
    Ok(())
}
