//! USSD session state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! the runtime loads a session, asks [`transition`] what to do with the
//! keypress, and commits the resulting effects.

mod effect;
pub mod event;
pub(crate) mod reply;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use reply::Reply;
pub use state::{SessionContext, Step};
pub use transition::transition;
