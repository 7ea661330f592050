#![allow(dead_code)]

use statekeeper::core::StateCatalog;
use statekeeper::state_enum;
use tracing_subscriber::EnvFilter;

/// Route engine logs to the test harness; `RUST_LOG=statekeeper=debug` shows them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

state_enum! {
    pub enum Stage {
        S0,
        S1,
        S2,
        S3,
        S4,
        S5,
        S6,
        S7,
        S8,
    }
    terminal: [S8]
}

pub const STAGES: [Stage; 9] = [
    Stage::S0,
    Stage::S1,
    Stage::S2,
    Stage::S3,
    Stage::S4,
    Stage::S5,
    Stage::S6,
    Stage::S7,
    Stage::S8,
];

pub fn stage_catalog() -> StateCatalog<Stage> {
    StateCatalog::new(STAGES.to_vec(), Stage::S0).unwrap()
}

pub fn next_stage(stage: Stage) -> Option<Stage> {
    let index = STAGES.iter().position(|s| *s == stage)?;
    STAGES.get(index + 1).copied()
}
