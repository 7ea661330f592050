//! Builder API for machine construction.
//!
//! [`FsmBuilder`] registers transitions against a [`StateCatalog`] and
//! validates the whole configuration at `build()`. The [`state_enum!`]
//! macro removes the boilerplate of implementing `State` for plain enums.
//!
//! [`StateCatalog`]: crate::core::StateCatalog
//! [`state_enum!`]: crate::state_enum

pub mod error;
pub mod machine;
pub mod macros;

pub use error::BuildError;
pub use machine::FsmBuilder;
