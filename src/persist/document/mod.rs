//! Document-store backend.
//!
//! The managed entity holds a [`StateDocument`] rather than a plain marker.
//! The document has its own id, is created lazily when the entity is first
//! saved, and is advanced with the store's atomic find-and-modify.

mod model;
mod persister;
#[cfg(feature = "sqlite")]
mod sqlite;
mod store;

pub use model::{HasStateDocument, StateDocument};
pub use persister::DocumentPersister;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDocumentStore;
pub use store::{DocumentStore, MemoryDocumentStore};
