//! Process-local persister for tests and entities without durable storage.

use crate::core::{State, StateCatalog};
use crate::persist::{set_marker_in_process, HasId, HasStateMarker, PersistError, Persister};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;

/// Keeps each entity's state in a map keyed by entity id.
///
/// A single lock covers both the read and the compare-and-set, which makes
/// the swap atomic within this process only. Separate instances never share
/// state, and nothing here protects against another process.
///
/// Entities without an id have no key in the map; their state marker is the
/// record instead. The marker of an entity with an id mirrors the map.
pub struct MemoryPersister<S: State, K> {
    catalog: StateCatalog<S>,
    states: Mutex<HashMap<K, S>>,
}

impl<S: State, K: Eq + Hash> MemoryPersister<S, K> {
    pub fn new(catalog: StateCatalog<S>) -> Self {
        Self {
            catalog,
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &StateCatalog<S> {
        &self.catalog
    }

    /// Number of entities with a recorded state.
    pub fn len(&self) -> usize {
        self.states.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.lock().is_empty()
    }
}

impl<S, T> Persister<S, T> for MemoryPersister<S, T::Id>
where
    S: State,
    T: HasId + HasStateMarker,
{
    fn current(&self, entity: &T) -> S {
        let Some(id) = entity.id() else {
            return self.catalog.resolve(entity.state_marker());
        };
        self.states
            .lock()
            .get(&id)
            .cloned()
            .unwrap_or_else(|| self.catalog.start().clone())
    }

    fn set_current(&self, entity: &mut T, expected: &S, next: &S) -> Result<(), PersistError> {
        let Some(id) = entity.id() else {
            return set_marker_in_process(&self.catalog, entity, expected, next);
        };
        let mut states = self.states.lock();

        let actual = states
            .get(&id)
            .cloned()
            .unwrap_or_else(|| self.catalog.start().clone());

        if actual != *expected {
            tracing::warn!(
                %id,
                expected = expected.name(),
                actual = actual.name(),
                "stale state in memory persister"
            );
            entity.set_state_marker(Some(actual.name().to_string()));
            return Err(PersistError::stale(expected.name(), actual.name()));
        }

        states.insert(id, next.clone());
        entity.set_state_marker(Some(next.name().to_string()));
        Ok(())
    }
}
