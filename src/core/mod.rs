//! Core state machine types.
//!
//! This module contains the data model the engine runs on:
//! - States via the `State` trait, grouped in a `StateCatalog`
//! - Transitions, fixed or resolved per call, and the `StateNode` tables
//! - Actions bound to transitions

mod action;
mod catalog;
mod state;
mod transition;

pub use action::{action_fn, Action, ActionRef, Composite};
pub use catalog::StateCatalog;
pub use state::State;
pub use transition::{Resolver, StateActionPair, StateNode, Transition};
