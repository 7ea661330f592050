//! Actions bound to transitions.

use crate::engine::ActionError;
use std::sync::Arc;

/// Side-effecting unit of work run after a transition is persisted.
///
/// Actions may run again when the engine retries an event, and they run after
/// the new state is already durable, so they should tolerate repetition.
/// Values meant for the caller go into `args`.
pub trait Action<T, A>: Send + Sync {
    fn execute(&self, entity: &mut T, event: &str, args: &mut A) -> Result<(), ActionError>;
}

impl<T, A, F> Action<T, A> for F
where
    F: Fn(&mut T, &str, &mut A) -> Result<(), ActionError> + Send + Sync,
{
    fn execute(&self, entity: &mut T, event: &str, args: &mut A) -> Result<(), ActionError> {
        self(entity, event, args)
    }
}

/// Shared handle to an action.
pub type ActionRef<T, A> = Arc<dyn Action<T, A>>;

/// Wrap a closure as a shared action.
///
/// Going through this function pins the closure's signature, which plain
/// `Arc::new` cannot infer for the borrowed arguments.
pub fn action_fn<T, A, F>(f: F) -> ActionRef<T, A>
where
    F: Fn(&mut T, &str, &mut A) -> Result<(), ActionError> + Send + Sync + 'static,
    T: 'static,
    A: 'static,
{
    Arc::new(f)
}

/// Runs several actions in order, stopping at the first error.
pub struct Composite<T, A> {
    actions: Vec<ActionRef<T, A>>,
}

impl<T, A> Composite<T, A> {
    pub fn new(actions: Vec<ActionRef<T, A>>) -> Self {
        Self { actions }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl<T, A> Action<T, A> for Composite<T, A> {
    fn execute(&self, entity: &mut T, event: &str, args: &mut A) -> Result<(), ActionError> {
        for action in &self.actions {
            action.execute(entity, event, args)?;
        }
        Ok(())
    }
}
