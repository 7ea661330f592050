//! Document stores with an atomic find-and-modify.

use super::model::StateDocument;
use crate::persist::PersistError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// A collection of state documents.
///
/// `find_and_modify` must be atomic with respect to every other caller of the
/// same store, including callers in other processes for durable stores.
pub trait DocumentStore: Send + Sync {
    /// Insert a new document.
    ///
    /// Fails with `DuplicateDocument` if the id is taken and with
    /// `DuplicateOwner` if the owner already has a document.
    fn insert(&self, document: &StateDocument) -> Result<(), PersistError>;

    fn find_by_id(&self, id: Uuid) -> Result<Option<StateDocument>, PersistError>;

    /// The live document of the entity identified by `owner`, if any.
    fn find_by_owner(&self, owner: &str) -> Result<Option<StateDocument>, PersistError>;

    /// If document `id` is in state `expected`, move it to `next` and return
    /// the updated document; otherwise return `None` and change nothing.
    fn find_and_modify(
        &self,
        id: Uuid,
        expected: &str,
        next: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<StateDocument>, PersistError>;
}

/// In-process document collection.
///
/// Documents are kept as JSON values, the way a document database holds
/// them. Persisters sharing one store behave like separate processes sharing
/// one database.
#[derive(Default)]
pub struct MemoryDocumentStore {
    inner: Mutex<Collection>,
}

#[derive(Default)]
struct Collection {
    documents: HashMap<Uuid, Value>,
    owners: HashMap<String, Uuid>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().documents.is_empty()
    }
}

fn decode(value: &Value) -> Result<StateDocument, PersistError> {
    serde_json::from_value(value.clone()).map_err(|e| PersistError::Malformed(e.to_string()))
}

impl DocumentStore for MemoryDocumentStore {
    fn insert(&self, document: &StateDocument) -> Result<(), PersistError> {
        let value =
            serde_json::to_value(document).map_err(|e| PersistError::Malformed(e.to_string()))?;
        let mut inner = self.inner.lock();
        if inner.documents.contains_key(&document.id) {
            return Err(PersistError::DuplicateDocument(document.id));
        }
        if let Some(owner) = &document.owner {
            if inner.owners.contains_key(owner) {
                return Err(PersistError::DuplicateOwner(owner.clone()));
            }
            inner.owners.insert(owner.clone(), document.id);
        }
        inner.documents.insert(document.id, value);
        Ok(())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<StateDocument>, PersistError> {
        self.inner.lock().documents.get(&id).map(decode).transpose()
    }

    fn find_by_owner(&self, owner: &str) -> Result<Option<StateDocument>, PersistError> {
        let inner = self.inner.lock();
        inner
            .owners
            .get(owner)
            .and_then(|id| inner.documents.get(id))
            .map(decode)
            .transpose()
    }

    fn find_and_modify(
        &self,
        id: Uuid,
        expected: &str,
        next: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<StateDocument>, PersistError> {
        let updated_at =
            serde_json::to_value(at).map_err(|e| PersistError::Malformed(e.to_string()))?;
        let mut inner = self.inner.lock();
        let Some(value) = inner.documents.get_mut(&id) else {
            return Ok(None);
        };
        if value.get("state").and_then(Value::as_str) != Some(expected) {
            return Ok(None);
        }

        let Some(fields) = value.as_object_mut() else {
            return Err(PersistError::Malformed(format!("document {id} is not an object")));
        };
        fields.insert("previous_state".to_string(), json!(expected));
        fields.insert("state".to_string(), json!(next));
        fields.insert("updated_at".to_string(), updated_at);

        decode(value).map(Some)
    }
}
