//! The configured set of states for one machine.

use crate::builder::error::{collect, BuildError};
use crate::core::State;
use std::collections::HashSet;
use std::sync::Arc;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Ordered set of states plus the distinguished start state.
///
/// Persisters resolve stored state names through the catalog, which is what
/// keeps `current()` inside the configured set. Cloning is cheap.
#[derive(Debug)]
pub struct StateCatalog<S: State> {
    inner: Arc<Inner<S>>,
}

#[derive(Debug)]
struct Inner<S> {
    states: Vec<S>,
    start: S,
}

impl<S: State> Clone for StateCatalog<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: State> StateCatalog<S> {
    /// Build a catalog, reporting every configuration problem at once.
    ///
    /// # Example
    ///
    /// ```rust
    /// use statekeeper::core::StateCatalog;
    /// use statekeeper::state_enum;
    ///
    /// state_enum! {
    ///     enum Light { Red, Green, Yellow }
    /// }
    ///
    /// let catalog = StateCatalog::new(vec![Light::Red, Light::Green, Light::Yellow], Light::Red)
    ///     .unwrap();
    /// assert_eq!(catalog.find("Green"), Some(&Light::Green));
    /// assert_eq!(catalog.resolve(None), Light::Red);
    /// ```
    pub fn new(states: Vec<S>, start: S) -> Result<Self, BuildError> {
        let mut checks: Vec<Validation<(), NonEmptyVec<BuildError>>> = Vec::new();

        if states.is_empty() {
            checks.push(Validation::fail(BuildError::EmptyCatalog));
        }

        let mut seen = HashSet::new();
        for state in &states {
            if !seen.insert(state.name()) {
                checks.push(Validation::fail(BuildError::DuplicateState {
                    name: state.name().to_string(),
                }));
            }
        }

        if !states.is_empty() && !states.contains(&start) {
            checks.push(Validation::fail(BuildError::UnknownStartState {
                name: start.name().to_string(),
            }));
        }

        collect(Validation::all_vec(checks))?;

        Ok(Self {
            inner: Arc::new(Inner { states, start }),
        })
    }

    pub fn start(&self) -> &S {
        &self.inner.start
    }

    pub fn states(&self) -> &[S] {
        &self.inner.states
    }

    pub fn contains(&self, state: &S) -> bool {
        self.inner.states.contains(state)
    }

    /// Look up a state by its stored name.
    pub fn find(&self, name: &str) -> Option<&S> {
        self.inner.states.iter().find(|s| s.name() == name)
    }

    /// Map a stored marker to a catalog state.
    ///
    /// An unset marker is the start state. So is a name the catalog does not
    /// know, which is logged since it means the store holds foreign data.
    pub fn resolve(&self, marker: Option<&str>) -> S {
        match marker {
            None => self.inner.start.clone(),
            Some(name) => match self.find(name) {
                Some(state) => state.clone(),
                None => {
                    tracing::warn!(
                        marker = name,
                        start = self.inner.start.name(),
                        "unknown state marker, defaulting to start state"
                    );
                    self.inner.start.clone()
                }
            },
        }
    }
}
