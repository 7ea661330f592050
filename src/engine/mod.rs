//! The event-driven engine and its retry loop.
//!
//! [`Fsm::on_event`] reads the entity's state, resolves the transition bound
//! to the event, persists the new state with compare-and-swap and then runs
//! the transition's action. Retry signals, whether raised by the persister
//! on a conflict or by an action, are handled inside the loop; only
//! exhausting the budget surfaces as [`FsmError::TooBusy`].

mod error;
mod fsm;
mod reload;
mod retry;

pub use error::{ActionError, BoxError, FsmError, RetrySignal};
pub use fsm::Fsm;
pub use reload::Reloader;
pub use retry::RetryPolicy;
