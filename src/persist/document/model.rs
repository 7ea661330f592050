//! The side record holding an entity's state in the document backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// State record referenced from a managed entity.
///
/// A document starts out transient (in process memory only) and becomes
/// persisted once it has been inserted into a [`DocumentStore`]. From then on
/// the stored `state` is the single source of truth.
///
/// [`DocumentStore`]: super::DocumentStore
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    pub id: Uuid,
    pub state: String,
    pub previous_state: Option<String>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub persisted: bool,
    /// Identifier of the managed entity this document belongs to.
    pub owner: Option<String>,
}

impl StateDocument {
    /// A fresh transient document in `state`.
    pub fn transient(state: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: state.to_string(),
            previous_state: None,
            updated_at: Utc::now(),
            persisted: false,
            owner: None,
        }
    }

    /// Record a move to `next`, remembering where we came from.
    pub fn advance(&mut self, next: &str, at: DateTime<Utc>) {
        self.previous_state = Some(std::mem::replace(&mut self.state, next.to_string()));
        self.updated_at = at;
    }
}

/// Access to a managed entity's state document.
pub trait HasStateDocument {
    fn state_document(&self) -> Option<&StateDocument>;

    fn set_state_document(&mut self, document: StateDocument);
}
