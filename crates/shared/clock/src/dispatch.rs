//! Backend binding for the façade
//!
//! The façade binds once per process: to the wall clock in production, or
//! to a process-wide [`ControlledClock`] in test binaries. Tests never
//! toggle it at runtime.

use crate::config::{BackendChoice, ClockConfig};
use crate::controlled::ControlledClock;
use crate::system::SystemClock;
use crate::ticker::Ticker;
use crate::timer::Timer;
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use testcase_core::Timestamp;
use testcase_ports::{ClockError, ClockResult};
use tokio::sync::oneshot;

/// Which time source the façade is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Native,
    Controlled,
}

/// A bound time source
#[derive(Clone)]
pub enum Dispatch {
    Native(SystemClock),
    Controlled(ControlledClock),
}

impl Dispatch {
    pub fn from_config(config: &ClockConfig) -> Self {
        match config.backend.resolve() {
            Backend::Native => Dispatch::Native(SystemClock::with_ticker_capacity(
                config.ticker_capacity,
            )),
            Backend::Controlled => Dispatch::Controlled(ControlledClock::with_config(config.clone())),
        }
    }

    pub fn backend(&self) -> Backend {
        match self {
            Dispatch::Native(_) => Backend::Native,
            Dispatch::Controlled(_) => Backend::Controlled,
        }
    }

    pub fn now(&self) -> Timestamp {
        match self {
            Dispatch::Native(clock) => clock.now(),
            Dispatch::Controlled(clock) => clock.now(),
        }
    }

    pub fn after(&self, d: Duration) -> oneshot::Receiver<Timestamp> {
        match self {
            Dispatch::Native(clock) => clock.after(d),
            Dispatch::Controlled(clock) => clock.after(d),
        }
    }

    pub fn ticker(&self, period: Duration) -> Ticker {
        match self {
            Dispatch::Native(clock) => clock.ticker(period),
            Dispatch::Controlled(clock) => clock.ticker(period),
        }
    }

    pub fn timer(&self, d: Duration) -> Timer {
        Timer::new(self.clone(), d)
    }
}

impl BackendChoice {
    /// Pick the backend, detecting test binaries for `Auto`
    pub fn resolve(&self) -> Backend {
        match self {
            BackendChoice::Native => Backend::Native,
            BackendChoice::Controlled => Backend::Controlled,
            BackendChoice::Auto if is_test_binary() => Backend::Controlled,
            BackendChoice::Auto => Backend::Native,
        }
    }
}

/// Test harness executables are built into cargo's `deps/` directory
fn is_test_binary() -> bool {
    if cfg!(any(test, feature = "testing")) {
        return true;
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| {
            exe.parent()
                .and_then(|dir| dir.file_name())
                .map(|name| name == "deps")
        })
        .unwrap_or(false)
}

static BOUND: OnceLock<Dispatch> = OnceLock::new();

/// Bind the façade explicitly; only the first binding succeeds
///
/// The config is validated before anything is bound.
pub fn install(config: ClockConfig) -> ClockResult<Backend> {
    config
        .validate()
        .map_err(|err| ClockError::InvalidConfig(err.to_string()))?;

    let mut installed = false;
    let bound = BOUND.get_or_init(|| {
        installed = true;
        Dispatch::from_config(&config)
    });
    if !installed {
        return Err(ClockError::AlreadyInstalled);
    }
    debug!("clock façade bound to {:?} backend", bound.backend());
    Ok(bound.backend())
}

/// The façade's time source, bound on first use
pub fn bound() -> &'static Dispatch {
    BOUND.get_or_init(|| {
        let dispatch = Dispatch::from_config(&ClockConfig::default());
        debug!("clock façade bound to {:?} backend", dispatch.backend());
        dispatch
    })
}

/// Backend the façade is bound to
pub fn backend() -> Backend {
    bound().backend()
}
