//! Persister keeping state in a side document.

use super::model::{HasStateDocument, StateDocument};
use super::store::DocumentStore;
use crate::core::{State, StateCatalog};
use crate::engine::BoxError;
use crate::persist::{HasId, PersistError, Persister};
use chrono::Utc;
use std::sync::Arc;

/// Keeps an entity's state in a [`StateDocument`] held by a [`DocumentStore`].
///
/// Persisted documents are advanced with the store's find-and-modify keyed by
/// document id and expected state. Documents that only exist in memory are
/// compared and updated in place. Call [`on_saved`](Self::on_saved) after the
/// entity itself is durably saved so its document is created alongside it.
pub struct DocumentPersister<S: State> {
    catalog: StateCatalog<S>,
    store: Arc<dyn DocumentStore>,
}

impl<S: State> DocumentPersister<S> {
    pub fn new(catalog: StateCatalog<S>, store: Arc<dyn DocumentStore>) -> Self {
        Self { catalog, store }
    }

    pub fn catalog(&self) -> &StateCatalog<S> {
        &self.catalog
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Run the caller's save, then the post-save hook.
    ///
    /// The document is only created once `save` has succeeded, so a failed
    /// save leaves the store untouched.
    pub fn save_with<T, F, E>(&self, entity: &mut T, save: F) -> Result<(), PersistError>
    where
        T: HasId + HasStateDocument,
        F: FnOnce(&mut T) -> Result<(), E>,
        E: Into<BoxError>,
    {
        save(entity).map_err(|err| PersistError::Save(err.into()))?;
        self.on_saved(entity)
    }

    /// Post-save hook: create and store the entity's state document.
    ///
    /// Does nothing if the entity already references a persisted document.
    /// If another copy of the entity saved first, its document is adopted
    /// rather than a second one created. Otherwise a transient document keeps
    /// its state and a missing one starts in the start state. The document is
    /// linked to the entity's id, so the entity must have one by now.
    pub fn on_saved<T>(&self, entity: &mut T) -> Result<(), PersistError>
    where
        T: HasId + HasStateDocument,
    {
        if entity.state_document().is_some_and(|doc| doc.persisted) {
            return Ok(());
        }
        let owner = entity.id().ok_or(PersistError::MissingId)?.to_string();

        if let Some(existing) = self.store.find_by_owner(&owner)? {
            adopt(entity, existing);
            return Ok(());
        }

        let mut document = entity
            .state_document()
            .cloned()
            .unwrap_or_else(|| StateDocument::transient(self.catalog.start().name()));
        document.owner = Some(owner.clone());
        document.persisted = true;

        match self.store.insert(&document) {
            Ok(()) => {}
            Err(PersistError::DuplicateOwner(_)) => {
                // Lost the race against another copy's save.
                let existing = self
                    .store
                    .find_by_owner(&owner)?
                    .ok_or_else(|| PersistError::DuplicateOwner(owner.clone()))?;
                adopt(entity, existing);
                return Ok(());
            }
            Err(err) => return Err(err),
        }

        tracing::info!(
            document = %document.id,
            %owner,
            state = %document.state,
            "state document created"
        );
        entity.set_state_document(document);
        Ok(())
    }

    fn set_persisted<T>(
        &self,
        entity: &mut T,
        id: uuid::Uuid,
        expected: &S,
        next: &S,
    ) -> Result<(), PersistError>
    where
        T: HasStateDocument,
    {
        let modified = self
            .store
            .find_and_modify(id, expected.name(), next.name(), Utc::now())?;
        if let Some(updated) = modified {
            tracing::debug!(
                document = %id,
                from = expected.name(),
                to = next.name(),
                "state document advanced"
            );
            entity.set_state_document(updated);
            return Ok(());
        }

        let fresh = self
            .store
            .find_by_id(id)?
            .ok_or(PersistError::DocumentNotFound(id))?;
        let actual = self.catalog.resolve(Some(&fresh.state));
        tracing::warn!(
            document = %id,
            expected = expected.name(),
            actual = actual.name(),
            "find-and-modify matched nothing, refreshing state document"
        );
        entity.set_state_document(fresh);
        Err(PersistError::stale(expected.name(), actual.name()))
    }
}

fn adopt<T: HasStateDocument>(entity: &mut T, existing: StateDocument) {
    if let Some(local) = entity.state_document() {
        if local.state != existing.state {
            tracing::warn!(
                document = %existing.id,
                local = %local.state,
                stored = %existing.state,
                "entity already has a state document, dropping transient state"
            );
        }
    }
    tracing::debug!(document = %existing.id, "adopted existing state document");
    entity.set_state_document(existing);
}

impl<S, T> Persister<S, T> for DocumentPersister<S>
where
    S: State,
    T: HasId + HasStateDocument,
{
    fn current(&self, entity: &T) -> S {
        self.catalog
            .resolve(entity.state_document().map(|doc| doc.state.as_str()))
    }

    fn set_current(&self, entity: &mut T, expected: &S, next: &S) -> Result<(), PersistError> {
        if let Some(doc) = entity.state_document().filter(|doc| doc.persisted) {
            let id = doc.id;
            return self.set_persisted(entity, id, expected, next);
        }

        let mut document = entity
            .state_document()
            .cloned()
            .unwrap_or_else(|| StateDocument::transient(self.catalog.start().name()));
        let actual = self.catalog.resolve(Some(&document.state));
        if actual != *expected {
            return Err(PersistError::stale(expected.name(), actual.name()));
        }

        document.advance(next.name(), Utc::now());
        entity.set_state_document(document);
        Ok(())
    }
}
