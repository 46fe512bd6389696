//! Testcase Core Domain
//!
//! Pure domain types for the controllable test clock.
//! This crate contains no async, no locks, and is 100% unit testable:
//! every translation takes the wall instant as an argument.

pub mod timeline;
pub mod travel;
pub mod values;

pub use timeline::Timeline;
pub use travel::{Destination, TravelFlags, TravelOption};
pub use values::{Timestamp, scale_delta, shift, to_delta, to_std};
