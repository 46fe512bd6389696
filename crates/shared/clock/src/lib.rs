//! Testcase Clock
//!
//! A process-wide time source tests can control: jump forward or back,
//! freeze, deep-freeze and change speed, while sleeps, tickers and timers
//! built on it stay consistent.
//!
//! ## Architecture
//!
//! ```text
//!  application code            test code
//!  now / sleep / after         travel / set_speed (scoped)
//!  ticker / timer                     │
//!        │                            ▼
//!        ▼                     sentinel (TEST_CASE_TIMECOP_IN_USE)
//!    façade ──► Dispatch              │
//!                 │                   ▼
//!     ┌───────────┴──────┐      ControlledClock ── Timeline (RwLock)
//!     ▼                  ▼            │
//! SystemClock     ControlledClock     ▼
//! (tokio/chrono)   (test binaries)  Notifier ──► after / Ticker / Timer
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use chrono::{TimeZone, Utc};
//! use std::time::Duration;
//! use testcase_clock::{self as clock, TestCase, TravelOption};
//!
//! let case = TestCase::new("report_at_noon");
//! let noon = Utc.with_ymd_and_hms(2022, 1, 1, 12, 0, 0).unwrap();
//!
//! clock::travel(&case, noon, &[TravelOption::Freeze])?;
//! assert_eq!(clock::now(), noon);
//!
//! clock::set_speed(&case, 10.0)?;
//! clock::sleep(Duration::from_secs(1)).await; // ~100ms of wall time
//!
//! // Dropping (or finishing) the case restores the clock
//! assert!(case.finish().is_empty());
//! ```

mod after;
mod case;
mod config;
mod control;
mod controlled;
mod dispatch;
mod facade;
mod lock;
mod notifier;
mod sentinel;
mod system;
mod ticker;
mod timer;

pub use case::TestCase;
pub use config::{BackendChoice, ClockConfig, ConfigError, DEFAULT_TICKER_CAPACITY};
pub use controlled::ControlledClock;
pub use dispatch::{Backend, backend, install};
pub use facade::{after, controlled, now, set_speed, since, sleep, ticker, timer, travel};
pub use notifier::{Change, Listener};
pub use sentinel::SENTINEL_KEY;
pub use system::SystemClock;
pub use ticker::Ticker;
pub use timer::Timer;

pub use testcase_core::{Destination, Timeline, Timestamp, TravelOption};
pub use testcase_ports::{Clock, ClockError, ClockResult, Scope};
