//! Testcase Ports
//!
//! Port definitions (traits) for the testcase clock.
//! These define the boundaries between the clock engine, the code that
//! reads time, and the host test runner that scopes alterations.

mod clock;
mod error;
mod scope;

pub use clock::Clock;
pub use error::{ClockError, ClockResult};
pub use scope::Scope;
