//! Durable document store on SQLite.

use super::model::StateDocument;
use super::store::DocumentStore;
use crate::persist::PersistError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS state_documents (
    id TEXT PRIMARY KEY,
    state TEXT NOT NULL,
    previous_state TEXT,
    updated_at TEXT NOT NULL,
    owner TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS state_documents_owner ON state_documents (owner);";

const SELECT: &str = "SELECT id, state, previous_state, updated_at, owner FROM state_documents";

type RawDocument = (String, String, Option<String>, String, Option<String>);

/// State documents in a `state_documents` table.
///
/// A unique index on `owner` keeps one document per entity even when several
/// connections save the same entity.
///
/// Find-and-modify is a conditional `UPDATE` followed by a read-back inside
/// one immediate transaction, so the returned document is exactly the one
/// this caller wrote.
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

impl SqliteDocumentStore {
    /// Wrap a connection, creating the documents table if needed.
    pub fn new(conn: Connection) -> Result<Self, PersistError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::new(conn)
    }

    // `column` is one of our own column names, never caller input.
    fn fetch(
        conn: &Connection,
        column: &str,
        key: &str,
    ) -> Result<Option<StateDocument>, PersistError> {
        let raw: Option<RawDocument> = conn
            .query_row(
                &format!("{SELECT} WHERE {column} = ?1"),
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )
            .optional()?;
        raw.map(into_document).transpose()
    }
}

fn into_document(raw: RawDocument) -> Result<StateDocument, PersistError> {
    let (id, state, previous_state, updated_at, owner) = raw;
    let id = Uuid::parse_str(&id).map_err(|e| PersistError::Malformed(e.to_string()))?;
    let updated_at = DateTime::parse_from_rfc3339(&updated_at)
        .map_err(|e| PersistError::Malformed(e.to_string()))?
        .with_timezone(&Utc);

    Ok(StateDocument {
        id,
        state,
        previous_state,
        updated_at,
        persisted: true,
        owner,
    })
}

impl DocumentStore for SqliteDocumentStore {
    fn insert(&self, document: &StateDocument) -> Result<(), PersistError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let Some(owner) = &document.owner {
            if Self::fetch(&tx, "owner", owner)?.is_some() {
                return Err(PersistError::DuplicateOwner(owner.clone()));
            }
        }

        let inserted = tx.execute(
            "INSERT INTO state_documents (id, state, previous_state, updated_at, owner)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (id) DO NOTHING",
            params![
                document.id.to_string(),
                document.state,
                document.previous_state,
                document.updated_at.to_rfc3339(),
                document.owner,
            ],
        )?;
        if inserted == 0 {
            return Err(PersistError::DuplicateDocument(document.id));
        }
        tx.commit()?;
        Ok(())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<StateDocument>, PersistError> {
        let conn = self.conn.lock();
        Self::fetch(&conn, "id", &id.to_string())
    }

    fn find_by_owner(&self, owner: &str) -> Result<Option<StateDocument>, PersistError> {
        let conn = self.conn.lock();
        Self::fetch(&conn, "owner", owner)
    }

    fn find_and_modify(
        &self,
        id: Uuid,
        expected: &str,
        next: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<StateDocument>, PersistError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let updated = tx.execute(
            "UPDATE state_documents
             SET previous_state = state, state = ?3, updated_at = ?4
             WHERE id = ?1 AND state = ?2",
            params![id.to_string(), expected, next, at.to_rfc3339()],
        )?;
        if updated == 0 {
            return Ok(None);
        }

        let document = Self::fetch(&tx, "id", &id.to_string())?;
        tx.commit()?;
        Ok(document)
    }
}
