//! Runtime for executing USSD events
//!
//! Serializes events per session, reads state fresh from storage, runs the
//! pure transition and commits its writes as one unit.

mod executor;
mod locks;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::UssdRuntime;
pub use traits::*;

/// Runtime wired to the SQLite database
pub type ProductionRuntime = UssdRuntime<DatabaseStorage>;
