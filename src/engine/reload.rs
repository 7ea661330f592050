//! Hook for refreshing a stale entity between attempts.

use crate::engine::BoxError;

/// Fetches a fresh copy of an entity before the engine retries an event.
///
/// Implemented by the surrounding layer (typically a repository lookup by
/// id). The returned value replaces the caller's entity.
pub trait Reloader<T, A>: Send + Sync {
    fn reload(&self, entity: &T, event: &str, args: &A) -> Result<T, BoxError>;
}

impl<T, A, F> Reloader<T, A> for F
where
    F: Fn(&T, &str, &A) -> Result<T, BoxError> + Send + Sync,
{
    fn reload(&self, entity: &T, event: &str, args: &A) -> Result<T, BoxError> {
        self(entity, event, args)
    }
}
