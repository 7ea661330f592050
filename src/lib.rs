//! Statekeeper: a persistent finite state machine engine
//!
//! Statekeeper drives entities through named states in response to named
//! events and keeps each entity's current state in a backing store. Every
//! state change is a compare-and-swap: it succeeds only if the store still
//! holds the state the engine read, so concurrent callers never both win.
//! Losers are told their view was stale and the engine retries them.
//!
//! # Core Concepts
//!
//! - **State**: user types implementing [`State`], listed in a [`StateCatalog`]
//! - **Transition**: fixed or computed per call, optionally with an [`Action`]
//! - **Persister**: the compare-and-swap boundary; in-memory, SQL row or
//!   side document
//! - **Fsm**: the retry loop tying them together
//!
//! # Example
//!
//! ```rust
//! use statekeeper::builder::FsmBuilder;
//! use statekeeper::core::StateCatalog;
//! use statekeeper::persist::{HasId, HasStateMarker, MemoryPersister};
//! use statekeeper::state_enum;
//! use std::sync::Arc;
//!
//! state_enum! {
//!     enum Ticket {
//!         Open,
//!         Resolved,
//!         Closed,
//!     }
//!     terminal: [Closed]
//! }
//!
//! struct Issue {
//!     id: u64,
//!     status: Option<String>,
//! }
//!
//! impl HasId for Issue {
//!     type Id = u64;
//!
//!     fn id(&self) -> Option<u64> {
//!         Some(self.id)
//!     }
//! }
//!
//! impl HasStateMarker for Issue {
//!     fn state_marker(&self) -> Option<&str> {
//!         self.status.as_deref()
//!     }
//!
//!     fn set_state_marker(&mut self, marker: Option<String>) {
//!         self.status = marker;
//!     }
//! }
//!
//! let catalog = StateCatalog::new(vec![Ticket::Open, Ticket::Resolved, Ticket::Closed], Ticket::Open)?;
//! let fsm = FsmBuilder::<Ticket, Issue>::new("tickets", catalog.clone())
//!     .persister(Arc::new(MemoryPersister::<Ticket, u64>::new(catalog)))
//!     .transition(Ticket::Open, "resolve", Ticket::Resolved)
//!     .transition(Ticket::Resolved, "close", Ticket::Closed)
//!     .build()?;
//!
//! let mut issue = Issue { id: 7, status: None };
//! assert_eq!(fsm.on_event(&mut issue, "resolve", &mut ())?, Ticket::Resolved);
//! assert_eq!(fsm.on_event(&mut issue, "close", &mut ())?, Ticket::Closed);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod builder;
pub mod core;
pub mod engine;
pub mod persist;

// Re-export commonly used types
pub use builder::{BuildError, FsmBuilder};
pub use crate::core::{Action, State, StateActionPair, StateCatalog, Transition};
pub use engine::{ActionError, Fsm, FsmError, RetryPolicy, RetrySignal};
pub use persist::{HasId, HasStateMarker, PersistError, Persister};
