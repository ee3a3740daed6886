//! Core session state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod entry;
pub mod event;
pub mod state;
pub(crate) mod transition;
pub mod triggers;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{Session, SessionContext, SessionState};
pub use transition::{transition, TransitionError};
