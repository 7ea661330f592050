//! Several connections to one SQLite file, standing in for separate processes.

#![cfg(feature = "sqlite")]

mod common;

use common::{init_tracing, next_stage, stage_catalog, Stage, STAGES};
use rusqlite::{params, Connection, OptionalExtension};
use statekeeper::persist::{HasId, HasStateMarker, SqlPersister, TableMapping};
use statekeeper::{ActionError, Fsm, FsmBuilder};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

#[derive(Clone, Debug)]
struct Loan {
    id: Option<i64>,
    state: Option<String>,
    note: Option<String>,
}

impl Loan {
    fn tracked(id: i64) -> Self {
        Self {
            id: Some(id),
            state: None,
            note: None,
        }
    }
}

impl HasId for Loan {
    type Id = i64;

    fn id(&self) -> Option<i64> {
        self.id
    }
}

impl HasStateMarker for Loan {
    fn state_marker(&self) -> Option<&str> {
        self.state.as_deref()
    }

    fn set_state_marker(&mut self, marker: Option<String>) {
        self.state = marker;
    }
}

fn database() -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loans.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE loans (id INTEGER PRIMARY KEY, status TEXT, note TEXT);
         INSERT INTO loans (id, status, note) VALUES (1, NULL, NULL);",
    )
    .unwrap();
    (dir, path)
}

fn persister(path: &Path) -> Arc<SqlPersister<Stage>> {
    let mapping = TableMapping::new("loans", "id", "status").unwrap();
    Arc::new(SqlPersister::open(path, stage_catalog(), mapping).unwrap())
}

fn pipeline(persister: Arc<SqlPersister<Stage>>) -> Fsm<Stage, Loan> {
    let mut builder = FsmBuilder::<Stage, Loan>::new("loans", stage_catalog()).persister(persister);
    for stage in STAGES {
        if let Some(next) = next_stage(stage) {
            builder = builder.transition(stage, "advance", next);
        }
    }
    builder.build().unwrap()
}

fn stored_status(path: &Path, id: i64) -> Option<String> {
    Connection::open(path)
        .unwrap()
        .query_row("SELECT status FROM loans WHERE id = ?1", params![id], |row| {
            row.get(0)
        })
        .unwrap()
}

fn stored_status_if_any(path: &Path, id: i64) -> Option<Option<String>> {
    Connection::open(path)
        .unwrap()
        .query_row("SELECT status FROM loans WHERE id = ?1", params![id], |row| {
            row.get(0)
        })
        .optional()
        .unwrap()
}

#[test]
fn racing_connections_serialize_on_the_row() {
    init_tracing();
    let (_dir, path) = database();
    let workers = 4;
    let barrier = Arc::new(Barrier::new(workers));

    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let fsm = pipeline(persister(&path));
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut loan = Loan::tracked(1);
                barrier.wait();
                fsm.on_event(&mut loan, "advance", &mut ())
            })
        })
        .collect();

    let reached: HashSet<Stage> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .collect();

    assert_eq!(reached.len(), workers);
    assert_eq!(stored_status(&path, 1).as_deref(), Some("S4"));
}

#[test]
fn stale_copy_catches_up_and_applies_its_event() {
    let (_dir, path) = database();
    let first = pipeline(persister(&path));
    let second = pipeline(persister(&path));

    let mut ours = Loan::tracked(1);
    let mut theirs = ours.clone();
    assert_eq!(first.on_event(&mut ours, "advance", &mut ()).unwrap(), Stage::S1);

    // The other copy still believes the row is in the start state.
    assert_eq!(second.current(&theirs), Stage::S0);
    assert_eq!(second.on_event(&mut theirs, "advance", &mut ()).unwrap(), Stage::S2);

    assert_eq!(theirs.state.as_deref(), Some("S2"));
    assert_eq!(stored_status(&path, 1).as_deref(), Some("S2"));
}

#[test]
fn reloader_reads_the_row_between_attempts() {
    let (_dir, path) = database();
    let shared = persister(&path);
    let source = Arc::clone(&shared);
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);

    let fsm = FsmBuilder::<Stage, Loan>::new("loans", stage_catalog())
        .persister(shared)
        .dynamic(Stage::S0, "approve", move |loan: &Loan, _, _| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(ActionError::retry());
            }
            assert_eq!(loan.note.as_deref(), Some("reviewed"));
            Ok(statekeeper::StateActionPair::to(Stage::S1))
        })
        .reloader(move |loan: &Loan, _: &str, _: &()| {
            let conn = source.connection();
            let (state, note): (Option<String>, Option<String>) = conn.query_row(
                "SELECT status, note FROM loans WHERE id = ?1",
                params![loan.id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok(Loan {
                id: loan.id,
                state,
                note,
            })
        })
        .build()
        .unwrap();

    Connection::open(&path)
        .unwrap()
        .execute("UPDATE loans SET note = 'reviewed' WHERE id = 1", [])
        .unwrap();

    let mut loan = Loan::tracked(1);
    assert_eq!(fsm.on_event(&mut loan, "approve", &mut ()).unwrap(), Stage::S1);
    assert_eq!(loan.note.as_deref(), Some("reviewed"));
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn unsaved_entity_advances_before_its_row_exists() {
    let (_dir, path) = database();
    let shared = persister(&path);
    let fsm = pipeline(Arc::clone(&shared));
    let mut loan = Loan {
        id: None,
        state: None,
        note: None,
    };

    assert_eq!(fsm.on_event(&mut loan, "advance", &mut ()).unwrap(), Stage::S1);
    assert_eq!(loan.state.as_deref(), Some("S1"));

    shared
        .connection()
        .execute(
            "INSERT INTO loans (id, status) VALUES (2, ?1)",
            params![loan.state],
        )
        .unwrap();
    loan.id = Some(2);

    assert_eq!(fsm.on_event(&mut loan, "advance", &mut ()).unwrap(), Stage::S2);
    assert_eq!(stored_status(&path, 2).as_deref(), Some("S2"));
}

#[test]
fn assigned_id_advances_in_process_until_its_row_is_inserted() {
    let (_dir, path) = database();
    let shared = persister(&path);
    let fsm = pipeline(Arc::clone(&shared));
    let mut loan = Loan::tracked(404);

    assert_eq!(fsm.on_event(&mut loan, "advance", &mut ()).unwrap(), Stage::S1);
    assert_eq!(loan.state.as_deref(), Some("S1"));
    assert_eq!(stored_status_if_any(&path, 404), None);

    shared
        .connection()
        .execute(
            "INSERT INTO loans (id, status) VALUES (?1, ?2)",
            params![loan.id, loan.state],
        )
        .unwrap();

    assert_eq!(fsm.on_event(&mut loan, "advance", &mut ()).unwrap(), Stage::S2);
    assert_eq!(stored_status(&path, 404).as_deref(), Some("S2"));
}
