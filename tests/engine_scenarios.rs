//! End-to-end engine behaviour over the in-memory persister.

mod common;

use common::{init_tracing, next_stage, stage_catalog, Stage, STAGES};
use statekeeper::core::{action_fn, ActionRef, Composite, StateActionPair};
use statekeeper::persist::{HasId, HasStateMarker, MemoryPersister};
use statekeeper::{ActionError, Fsm, FsmBuilder, FsmError, RetryPolicy, Transition};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

#[derive(Clone, Debug)]
struct Job {
    id: u64,
    state: Option<String>,
}

impl Job {
    fn new(id: u64) -> Self {
        Self { id, state: None }
    }
}

impl HasId for Job {
    type Id = u64;

    fn id(&self) -> Option<u64> {
        Some(self.id)
    }
}

impl HasStateMarker for Job {
    fn state_marker(&self) -> Option<&str> {
        self.state.as_deref()
    }

    fn set_state_marker(&mut self, marker: Option<String>) {
        self.state = marker;
    }
}

/// Never saved, so it has no id.
#[derive(Default)]
struct Sketch {
    state: Option<String>,
}

impl HasId for Sketch {
    type Id = u64;

    fn id(&self) -> Option<u64> {
        None
    }
}

impl HasStateMarker for Sketch {
    fn state_marker(&self) -> Option<&str> {
        self.state.as_deref()
    }

    fn set_state_marker(&mut self, marker: Option<String>) {
        self.state = marker;
    }
}

fn pipeline(max_retries: usize) -> Fsm<Stage, Job> {
    let catalog = stage_catalog();
    let mut builder = FsmBuilder::<Stage, Job>::new("pipeline", catalog.clone())
        .persister(Arc::new(MemoryPersister::<Stage, u64>::new(catalog)))
        .max_retries(max_retries);
    for stage in STAGES {
        if let Some(next) = next_stage(stage) {
            builder = builder.transition(stage, "advance", next);
        }
    }
    builder.build().unwrap()
}

#[test]
fn concurrent_events_are_each_applied_once() {
    init_tracing();
    let fsm = Arc::new(pipeline(RetryPolicy::DEFAULT_MAX_RETRIES));
    let workers = 8;
    let barrier = Arc::new(Barrier::new(workers));

    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let fsm = Arc::clone(&fsm);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut job = Job::new(7);
                barrier.wait();
                fsm.on_event(&mut job, "advance", &mut ())
            })
        })
        .collect();

    let reached: HashSet<Stage> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .collect();

    // Every worker observed a different state: the events were serialized.
    assert_eq!(reached.len(), workers);
    assert_eq!(fsm.current(&Job::new(7)), Stage::S8);
}

#[test]
fn entities_do_not_interfere() {
    let fsm = pipeline(RetryPolicy::DEFAULT_MAX_RETRIES);
    let mut first = Job::new(1);
    let mut second = Job::new(2);

    fsm.on_event(&mut first, "advance", &mut ()).unwrap();
    fsm.on_event(&mut first, "advance", &mut ()).unwrap();
    fsm.on_event(&mut second, "advance", &mut ()).unwrap();

    assert_eq!(fsm.current(&first), Stage::S2);
    assert_eq!(fsm.current(&second), Stage::S1);
}

#[test]
fn entity_without_id_moves_through_the_pipeline() {
    let catalog = stage_catalog();
    let persister = Arc::new(MemoryPersister::<Stage, u64>::new(catalog.clone()));
    let fsm = FsmBuilder::<Stage, Sketch>::new("sketches", catalog)
        .persister(persister.clone())
        .transition(Stage::S0, "advance", Stage::S1)
        .transition(Stage::S1, "advance", Stage::S2)
        .build()
        .unwrap();
    let mut sketch = Sketch::default();

    assert_eq!(fsm.on_event(&mut sketch, "advance", &mut ()).unwrap(), Stage::S1);
    assert_eq!(fsm.on_event(&mut sketch, "advance", &mut ()).unwrap(), Stage::S2);

    assert_eq!(sketch.state.as_deref(), Some("S2"));
    assert!(persister.is_empty());
}

#[test]
fn terminal_state_ignores_further_events() {
    let fsm = pipeline(RetryPolicy::DEFAULT_MAX_RETRIES);
    let mut job = Job::new(3);
    for _ in 0..STAGES.len() + 2 {
        fsm.on_event(&mut job, "advance", &mut ()).unwrap();
    }

    let state = fsm.current(&job);
    assert_eq!(state, Stage::S8);
    assert!(fsm.node(&state).unwrap().is_terminal());
}

#[test]
fn dynamic_transition_routes_by_call_count() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let catalog = stage_catalog();
    let fsm = FsmBuilder::<Stage, Job>::new("router", catalog.clone())
        .persister(Arc::new(MemoryPersister::<Stage, u64>::new(catalog)))
        .dynamic(Stage::S0, "route", move |_, _, _| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Ok(StateActionPair::to(Stage::S0))
            } else {
                Ok(StateActionPair::to(Stage::S5))
            }
        })
        .build()
        .unwrap();
    let mut job = Job::new(1);

    assert_eq!(fsm.on_event(&mut job, "route", &mut ()).unwrap(), Stage::S0);
    assert_eq!(fsm.on_event(&mut job, "route", &mut ()).unwrap(), Stage::S0);
    assert_eq!(fsm.on_event(&mut job, "route", &mut ()).unwrap(), Stage::S5);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn composite_action_runs_every_step_in_order() {
    let catalog = stage_catalog();
    let steps: ActionRef<Job, Vec<String>> = Arc::new(Composite::new(vec![
        action_fn(|_: &mut Job, _: &str, log: &mut Vec<String>| {
            log.push("reserve".to_string());
            Ok(())
        }),
        action_fn(|job: &mut Job, _: &str, log: &mut Vec<String>| {
            log.push(format!("notify {}", job.id));
            Ok(())
        }),
    ]));
    let fsm = FsmBuilder::<Stage, Job, Vec<String>>::new("composite", catalog.clone())
        .persister(Arc::new(MemoryPersister::<Stage, u64>::new(catalog)))
        .on(Stage::S0, "start", Transition::with_action(Stage::S1, steps))
        .build()
        .unwrap();
    let mut job = Job::new(4);
    let mut log = Vec::new();

    fsm.on_event(&mut job, "start", &mut log).unwrap();

    assert_eq!(log, vec!["reserve".to_string(), "notify 4".to_string()]);
}

#[test]
fn action_retry_restarts_from_persisted_state() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let catalog = stage_catalog();
    let fsm = FsmBuilder::<Stage, Job>::new("restart", catalog.clone())
        .persister(Arc::new(MemoryPersister::<Stage, u64>::new(catalog)))
        .transition_with(Stage::S0, "go", Stage::S1, move |_, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ActionError::retry())
        })
        .transition(Stage::S1, "go", Stage::S2)
        .build()
        .unwrap();
    let mut job = Job::new(1);

    assert_eq!(fsm.on_event(&mut job, "go", &mut ()).unwrap(), Stage::S2);
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[test]
fn too_busy_reports_attempts() {
    let catalog = stage_catalog();
    let fsm = FsmBuilder::<Stage, Job>::new("busy", catalog.clone())
        .persister(Arc::new(MemoryPersister::<Stage, u64>::new(catalog)))
        .max_retries(2)
        .dynamic(Stage::S0, "go", |_, _, _| Err(ActionError::retry()))
        .build()
        .unwrap();
    let mut job = Job::new(1);

    let err = fsm.on_event(&mut job, "go", &mut ()).unwrap_err();

    assert!(err.is_too_busy());
    assert!(matches!(err, FsmError::TooBusy { attempts: 2, ref event } if event == "go"));
}
