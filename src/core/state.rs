//! Core State trait for machine states.
//!
//! States are plain values; the persistence layer only ever stores their
//! `name()`, so names must be unique within one machine.

use std::fmt::Debug;

/// Trait for state machine states.
///
/// # Required Traits
///
/// - `Clone`: states are handed out by value from the catalog
/// - `PartialEq`: the compare-and-swap contract compares states
/// - `Debug`: states appear in errors and log fields
/// - `Send` + `Sync`: a machine is shared between threads
///
/// # Example
///
/// ```rust
/// use statekeeper::core::State;
///
/// #[derive(Clone, PartialEq, Debug)]
/// enum OrderState {
///     Placed,
///     Shipped,
///     Delivered,
/// }
///
/// impl State for OrderState {
///     fn name(&self) -> &str {
///         match self {
///             Self::Placed => "Placed",
///             Self::Shipped => "Shipped",
///             Self::Delivered => "Delivered",
///         }
///     }
///
///     fn is_terminal(&self) -> bool {
///         matches!(self, Self::Delivered)
///     }
/// }
/// ```
pub trait State: Clone + PartialEq + Debug + Send + Sync + 'static {
    /// The state's name, as written to the backing store.
    fn name(&self) -> &str;

    /// Check if this is a terminal state.
    ///
    /// Default implementation returns `false`.
    fn is_terminal(&self) -> bool {
        false
    }
}
