//! Event dispatch with compare-and-swap persistence and bounded retries.

use crate::core::{State, StateCatalog, StateNode, Transition};
use crate::engine::{ActionError, FsmError, Reloader, RetryPolicy, RetrySignal};
use crate::persist::Persister;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

/// Outcome of a single attempt at an event.
enum Attempt<S> {
    Done(S),
    Retry(RetrySignal),
}

/// A configured state machine bound to a persister.
///
/// Built with [`FsmBuilder`](crate::builder::FsmBuilder). An `Fsm` holds no
/// per-entity data, so one instance serves any number of entities and threads.
pub struct Fsm<S: State, T, A = ()> {
    pub(crate) name: String,
    pub(crate) catalog: StateCatalog<S>,
    pub(crate) nodes: HashMap<String, StateNode<S, T, A>>,
    pub(crate) any_state: HashMap<String, Transition<S, T, A>>,
    pub(crate) persister: Arc<dyn Persister<S, T>>,
    pub(crate) policy: RetryPolicy,
    pub(crate) reloader: Option<Arc<dyn Reloader<T, A>>>,
}

impl<S: State, T, A> Fsm<S, T, A> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn catalog(&self) -> &StateCatalog<S> {
        &self.catalog
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The entity's current state as the persister sees it.
    pub fn current(&self, entity: &T) -> S {
        self.persister.current(entity)
    }

    /// The event table of `state`.
    pub fn node(&self, state: &S) -> Option<&StateNode<S, T, A>> {
        self.nodes.get(state.name())
    }

    /// Deliver `event` to `entity`.
    ///
    /// Returns the state the entity is in afterwards. An event with no
    /// transition from the current state (and no any-state transition) leaves
    /// the entity alone and returns its current state.
    ///
    /// The new state is persisted before the transition's action runs. If the
    /// action then asks for a retry, the next attempt starts from the new
    /// state.
    pub fn on_event(&self, entity: &mut T, event: &str, args: &mut A) -> Result<S, FsmError> {
        let max = self.policy.max_retries;
        let mut attempts = 0;

        while attempts < max {
            let signal = match self.attempt(entity, event, args)? {
                Attempt::Done(state) => return Ok(state),
                Attempt::Retry(signal) => signal,
            };
            attempts += 1;

            tracing::warn!(
                fsm = %self.name,
                event,
                attempt = attempts,
                max,
                ?signal,
                "retrying event"
            );

            if let Some(pause) = self.policy.pause_for(&signal) {
                thread::sleep(pause);
            }

            if attempts < max {
                if let Some(reloader) = &self.reloader {
                    *entity = reloader
                        .reload(entity, event, args)
                        .map_err(|source| FsmError::Reload {
                            event: event.to_string(),
                            source,
                        })?;
                }
            }
        }

        tracing::error!(fsm = %self.name, event, attempts, "retry budget exhausted");
        Err(FsmError::TooBusy {
            event: event.to_string(),
            attempts,
        })
    }

    fn transition_for(&self, current: &S, event: &str) -> Option<&Transition<S, T, A>> {
        self.nodes
            .get(current.name())
            .and_then(|node| node.transition(event))
            .or_else(|| self.any_state.get(event))
    }

    fn attempt(&self, entity: &mut T, event: &str, args: &mut A) -> Result<Attempt<S>, FsmError> {
        let current = self.persister.current(entity);

        let Some(transition) = self.transition_for(&current, event) else {
            tracing::debug!(
                fsm = %self.name,
                event,
                state = current.name(),
                "no transition for event, ignoring"
            );
            return Ok(Attempt::Done(current));
        };

        let pair = match transition.resolve(entity, event, args) {
            Ok(pair) => pair,
            Err(err) => return self.on_action_error(event, err),
        };

        if let Err(err) = self.persister.set_current(entity, &current, &pair.state) {
            if err.is_stale() {
                return Ok(Attempt::Retry(RetrySignal::StaleState));
            }
            return Err(err.into());
        }

        tracing::debug!(
            fsm = %self.name,
            event,
            from = current.name(),
            to = pair.state.name(),
            "transition committed"
        );

        if let Some(action) = &pair.action {
            if let Err(err) = action.execute(entity, event, args) {
                return self.on_action_error(event, err);
            }
        }

        Ok(Attempt::Done(pair.state))
    }

    fn on_action_error(&self, event: &str, err: ActionError) -> Result<Attempt<S>, FsmError> {
        match err {
            ActionError::Retry(signal) => Ok(Attempt::Retry(signal)),
            ActionError::Failed(source) => Err(FsmError::Action {
                event: event.to_string(),
                source,
            }),
        }
    }
}
