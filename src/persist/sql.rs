//! Relational persister: compare-and-swap through one conditional UPDATE.

use crate::core::{State, StateCatalog};
use crate::persist::{set_marker_in_process, HasId, HasStateMarker, PersistError, Persister};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use std::path::Path;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where a managed entity lives: its table, id column and state column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableMapping {
    table: String,
    id_column: String,
    state_column: String,
}

impl TableMapping {
    pub fn new(
        table: impl Into<String>,
        id_column: impl Into<String>,
        state_column: impl Into<String>,
    ) -> Result<Self, PersistError> {
        let mapping = Self {
            table: identifier(table.into())?,
            id_column: identifier(id_column.into())?,
            state_column: identifier(state_column.into())?,
        };
        Ok(mapping)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn update_sql(&self) -> String {
        format!(
            "UPDATE {t} SET {s} = ?1 WHERE {id} = ?2 AND ({s} = ?3 OR (?4 AND {s} IS NULL))",
            t = self.table,
            s = self.state_column,
            id = self.id_column,
        )
    }

    fn select_sql(&self) -> String {
        format!(
            "SELECT {s} FROM {t} WHERE {id} = ?1",
            t = self.table,
            s = self.state_column,
            id = self.id_column,
        )
    }
}

// Identifiers are spliced into SQL text, so only plain names are accepted.
fn identifier(name: String) -> Result<String, PersistError> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(PersistError::InvalidIdentifier(name))
    }
}

/// Persists state in a row's state column, backed by SQLite.
///
/// Rows are advanced with a single conditional `UPDATE` scoped by id and the
/// expected state, so persisters in different processes (each with its own
/// connection to the same database) race safely. A `NULL` state column counts
/// as the start state. Schema management is left to the caller.
pub struct SqlPersister<S: State> {
    catalog: StateCatalog<S>,
    mapping: TableMapping,
    conn: Mutex<Connection>,
    update_sql: String,
    select_sql: String,
}

impl<S: State> SqlPersister<S> {
    pub fn new(conn: Connection, catalog: StateCatalog<S>, mapping: TableMapping) -> Self {
        let update_sql = mapping.update_sql();
        let select_sql = mapping.select_sql();
        Self {
            catalog,
            mapping,
            conn: Mutex::new(conn),
            update_sql,
            select_sql,
        }
    }

    /// Open a database file with a busy timeout suited to contended writers.
    pub fn open(
        path: impl AsRef<Path>,
        catalog: StateCatalog<S>,
        mapping: TableMapping,
    ) -> Result<Self, PersistError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self::new(conn, catalog, mapping))
    }

    pub fn catalog(&self) -> &StateCatalog<S> {
        &self.catalog
    }

    pub fn mapping(&self) -> &TableMapping {
        &self.mapping
    }

    /// Borrow the underlying connection, e.g. to insert the entity's row.
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }
}

impl<S, T> Persister<S, T> for SqlPersister<S>
where
    S: State,
    T: HasId + HasStateMarker,
    T::Id: ToSql,
{
    fn current(&self, entity: &T) -> S {
        self.catalog.resolve(entity.state_marker())
    }

    fn set_current(&self, entity: &mut T, expected: &S, next: &S) -> Result<(), PersistError> {
        let Some(id) = entity.id() else {
            return set_marker_in_process(&self.catalog, entity, expected, next);
        };

        let conn = self.conn.lock();
        let is_start = expected == self.catalog.start();
        let updated = conn.execute(
            &self.update_sql,
            params![next.name(), id, expected.name(), is_start],
        )?;

        if updated == 0 {
            let actual: Option<Option<String>> = conn
                .query_row(&self.select_sql, params![id], |row| row.get(0))
                .optional()?;
            let Some(actual) = actual else {
                // An assigned id whose row is not inserted yet: not durable.
                drop(conn);
                tracing::debug!(
                    table = %self.mapping.table,
                    %id,
                    "no row yet, advancing state marker in process"
                );
                return set_marker_in_process(&self.catalog, entity, expected, next);
            };

            let actual_state = self.catalog.resolve(actual.as_deref());
            tracing::warn!(
                table = %self.mapping.table,
                %id,
                expected = expected.name(),
                actual = actual_state.name(),
                "conditional update matched no row, refreshing state marker"
            );
            entity.set_state_marker(actual);
            return Err(PersistError::stale(expected.name(), actual_state.name()));
        }

        tracing::debug!(
            table = %self.mapping.table,
            %id,
            from = expected.name(),
            to = next.name(),
            "row state advanced"
        );
        entity.set_state_marker(Some(next.name().to_string()));
        Ok(())
    }
}
