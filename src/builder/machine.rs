//! Builder for constructing machines.

use crate::builder::error::{collect, BuildError};
use crate::core::{action_fn, State, StateActionPair, StateCatalog, StateNode, Transition};
use crate::engine::{ActionError, BoxError, Fsm, Reloader, RetryPolicy};
use crate::persist::Persister;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Builder for [`Fsm`] with a fluent API.
///
/// Problems are collected rather than reported one at a time: `build()`
/// returns every unknown state, duplicate transition and missing setting it
/// found.
///
/// # Example
///
/// ```rust
/// use statekeeper::builder::FsmBuilder;
/// use statekeeper::core::StateCatalog;
/// use statekeeper::persist::{HasId, HasStateMarker, MemoryPersister};
/// use statekeeper::state_enum;
/// use std::sync::Arc;
///
/// state_enum! {
///     enum Light { Red, Green, Yellow }
/// }
///
/// struct Crossing { id: u32, light: Option<String> }
///
/// impl HasId for Crossing {
///     type Id = u32;
///     fn id(&self) -> Option<u32> { Some(self.id) }
/// }
///
/// impl HasStateMarker for Crossing {
///     fn state_marker(&self) -> Option<&str> { self.light.as_deref() }
///     fn set_state_marker(&mut self, marker: Option<String>) { self.light = marker; }
/// }
///
/// let catalog = StateCatalog::new(vec![Light::Red, Light::Green, Light::Yellow], Light::Red)?;
/// let fsm = FsmBuilder::<Light, Crossing>::new("lights", catalog.clone())
///     .persister(Arc::new(MemoryPersister::<Light, u32>::new(catalog)))
///     .transition(Light::Red, "next", Light::Green)
///     .transition(Light::Green, "next", Light::Yellow)
///     .transition(Light::Yellow, "next", Light::Red)
///     .build()?;
///
/// let mut crossing = Crossing { id: 1, light: None };
/// assert_eq!(fsm.on_event(&mut crossing, "next", &mut ())?, Light::Green);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct FsmBuilder<S: State, T, A = ()> {
    name: String,
    catalog: StateCatalog<S>,
    transitions: Vec<(S, String, Transition<S, T, A>)>,
    any_state: Vec<(String, Transition<S, T, A>)>,
    persister: Option<Arc<dyn Persister<S, T>>>,
    policy: RetryPolicy,
    reloader: Option<Arc<dyn Reloader<T, A>>>,
}

impl<S: State, T: 'static, A: 'static> FsmBuilder<S, T, A> {
    pub fn new(name: impl Into<String>, catalog: StateCatalog<S>) -> Self {
        Self {
            name: name.into(),
            catalog,
            transitions: Vec::new(),
            any_state: Vec::new(),
            persister: None,
            policy: RetryPolicy::default(),
            reloader: None,
        }
    }

    /// Set the persister (required).
    pub fn persister(mut self, persister: Arc<dyn Persister<S, T>>) -> Self {
        self.persister = Some(persister);
        self
    }

    /// Register a prebuilt transition.
    pub fn on(mut self, from: S, event: &str, transition: Transition<S, T, A>) -> Self {
        self.transitions.push((from, event.to_string(), transition));
        self
    }

    /// Move from `from` to `to` on `event` without an action.
    pub fn transition(self, from: S, event: &str, to: S) -> Self {
        self.on(from, event, Transition::to(to))
    }

    /// Move from `from` to `to` on `event`, then run `action`.
    pub fn transition_with<F>(self, from: S, event: &str, to: S, action: F) -> Self
    where
        F: Fn(&mut T, &str, &mut A) -> Result<(), ActionError> + Send + Sync + 'static,
    {
        self.on(from, event, Transition::with_action(to, action_fn(action)))
    }

    /// Decide the next state and action per call.
    pub fn dynamic<F>(self, from: S, event: &str, resolver: F) -> Self
    where
        F: Fn(&T, &str, &A) -> Result<StateActionPair<S, T, A>, ActionError>
            + Send
            + Sync
            + 'static,
    {
        self.on(from, event, Transition::dynamic(resolver))
    }

    /// Register a transition valid from every state.
    ///
    /// State-specific transitions for the same event take precedence.
    pub fn any_state(mut self, event: &str, transition: Transition<S, T, A>) -> Self {
        self.any_state.push((event.to_string(), transition));
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn max_retries(mut self, n: usize) -> Self {
        self.policy.max_retries = n;
        self
    }

    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.policy = self.policy.with_interval(interval);
        self
    }

    /// Refresh the entity before each retry.
    pub fn reloader<F>(mut self, reloader: F) -> Self
    where
        F: Fn(&T, &str, &A) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.reloader = Some(Arc::new(reloader));
        self
    }

    fn check_state(&self, state: &S) -> Validation<(), NonEmptyVec<BuildError>> {
        if self.catalog.contains(state) {
            Validation::success(())
        } else {
            Validation::fail(BuildError::UnknownState {
                name: state.name().to_string(),
            })
        }
    }

    fn check_target(
        &self,
        transition: &Transition<S, T, A>,
    ) -> Validation<(), NonEmptyVec<BuildError>> {
        match transition.target() {
            Some(target) => self.check_state(target),
            None => Validation::success(()),
        }
    }

    /// Build the machine.
    pub fn build(self) -> Result<Fsm<S, T, A>, BuildError> {
        let mut checks: Vec<Validation<(), NonEmptyVec<BuildError>>> = Vec::new();

        if self.persister.is_none() {
            checks.push(Validation::fail(BuildError::MissingPersister));
        }
        if self.policy.max_retries == 0 {
            checks.push(Validation::fail(BuildError::ZeroRetries));
        }

        for (from, _, transition) in &self.transitions {
            checks.push(self.check_state(from));
            checks.push(self.check_target(transition));
        }
        for (_, transition) in &self.any_state {
            checks.push(self.check_target(transition));
        }

        let mut nodes: HashMap<String, StateNode<S, T, A>> = self
            .catalog
            .states()
            .iter()
            .map(|s| (s.name().to_string(), StateNode::new(s.clone())))
            .collect();

        for (from, event, transition) in self.transitions {
            let Some(node) = nodes.get_mut(from.name()) else {
                continue;
            };
            if !node.insert(&event, transition) {
                checks.push(Validation::fail(BuildError::DuplicateTransition {
                    state: from.name().to_string(),
                    event,
                }));
            }
        }

        let mut any_state = HashMap::new();
        for (event, transition) in self.any_state {
            if any_state.contains_key(&event) {
                checks.push(Validation::fail(BuildError::DuplicateAnyStateTransition {
                    event,
                }));
                continue;
            }
            any_state.insert(event, transition);
        }

        collect(Validation::all_vec(checks))?;
        let persister = self.persister.ok_or(BuildError::MissingPersister)?;

        Ok(Fsm {
            name: self.name,
            catalog: self.catalog,
            nodes,
            any_state,
            persister,
            policy: self.policy,
            reloader: self.reloader,
        })
    }
}
