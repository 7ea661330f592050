//! Transitions and their resolution into a next state plus action.

use crate::core::action::ActionRef;
use crate::core::State;
use crate::engine::ActionError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The outcome of resolving a transition.
pub struct StateActionPair<S, T, A> {
    pub state: S,
    pub action: Option<ActionRef<T, A>>,
}

impl<S, T, A> StateActionPair<S, T, A> {
    pub fn new(state: S, action: Option<ActionRef<T, A>>) -> Self {
        Self { state, action }
    }

    /// Move to `state` without running anything.
    pub fn to(state: S) -> Self {
        Self {
            state,
            action: None,
        }
    }
}

impl<S: Clone, T, A> Clone for StateActionPair<S, T, A> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            action: self.action.clone(),
        }
    }
}

impl<S: fmt::Debug, T, A> fmt::Debug for StateActionPair<S, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateActionPair")
            .field("state", &self.state)
            .field("action", &self.action.is_some())
            .finish()
    }
}

/// Resolver for transitions whose target is decided per call.
pub type Resolver<S, T, A> =
    Arc<dyn Fn(&T, &str, &A) -> Result<StateActionPair<S, T, A>, ActionError> + Send + Sync>;

/// An event-triggered rule.
pub enum Transition<S, T, A> {
    /// Next state and action fixed when the machine is built.
    Deterministic(StateActionPair<S, T, A>),
    /// Next state and action computed from the entity, event and arguments.
    Dynamic(Resolver<S, T, A>),
}

impl<S: State, T, A> Transition<S, T, A> {
    pub fn to(state: S) -> Self {
        Self::Deterministic(StateActionPair::to(state))
    }

    pub fn with_action(state: S, action: ActionRef<T, A>) -> Self {
        Self::Deterministic(StateActionPair::new(state, Some(action)))
    }

    pub fn dynamic<F>(resolver: F) -> Self
    where
        F: Fn(&T, &str, &A) -> Result<StateActionPair<S, T, A>, ActionError>
            + Send
            + Sync
            + 'static,
    {
        Self::Dynamic(Arc::new(resolver))
    }

    /// Produce the next state and optional action for this invocation.
    pub fn resolve(
        &self,
        entity: &T,
        event: &str,
        args: &A,
    ) -> Result<StateActionPair<S, T, A>, ActionError> {
        match self {
            Self::Deterministic(pair) => Ok(pair.clone()),
            Self::Dynamic(resolver) => resolver(entity, event, args),
        }
    }

    /// The fixed target, if this transition has one.
    pub fn target(&self) -> Option<&S> {
        match self {
            Self::Deterministic(pair) => Some(&pair.state),
            Self::Dynamic(_) => None,
        }
    }
}

impl<S: Clone, T, A> Clone for Transition<S, T, A> {
    fn clone(&self) -> Self {
        match self {
            Self::Deterministic(pair) => Self::Deterministic(pair.clone()),
            Self::Dynamic(resolver) => Self::Dynamic(Arc::clone(resolver)),
        }
    }
}

impl<S: fmt::Debug, T, A> fmt::Debug for Transition<S, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deterministic(pair) => f.debug_tuple("Deterministic").field(pair).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// A state together with its event table.
pub struct StateNode<S, T, A> {
    state: S,
    transitions: HashMap<String, Transition<S, T, A>>,
}

impl<S: State, T, A> StateNode<S, T, A> {
    pub fn new(state: S) -> Self {
        Self {
            state,
            transitions: HashMap::new(),
        }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn transition(&self, event: &str) -> Option<&Transition<S, T, A>> {
        self.transitions.get(event)
    }

    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.transitions.keys().map(String::as_str)
    }

    /// Register a transition; returns `false` if the event was already bound.
    pub(crate) fn insert(&mut self, event: &str, transition: Transition<S, T, A>) -> bool {
        if self.transitions.contains_key(event) {
            return false;
        }
        self.transitions.insert(event.to_string(), transition);
        true
    }
}
