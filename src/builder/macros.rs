//! Macros for declaring machine states.

/// Generate a `State` implementation for a fieldless enum.
///
/// Each variant's stored name is its identifier.
///
/// # Example
///
/// ```
/// use statekeeper::state_enum;
/// use statekeeper::core::State;
///
/// state_enum! {
///     pub enum TicketState {
///         Open,
///         InProgress,
///         Closed,
///     }
///     terminal: [Closed]
/// }
///
/// assert_eq!(TicketState::InProgress.name(), "InProgress");
/// assert!(TicketState::Closed.is_terminal());
/// ```
#[macro_export]
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }

        $(terminal: [$($terminal:ident),* $(,)?])?
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::State for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }

            fn is_terminal(&self) -> bool {
                match self {
                    $($(Self::$terminal => true,)*)?
                    #[allow(unreachable_patterns)]
                    _ => false,
                }
            }
        }
    };
}
