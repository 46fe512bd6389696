use log::warn;
use parking_lot::Mutex;
use std::sync::Arc;
use testcase_ports::{ClockError, ClockResult, Scope};

/// Name under which the clock's exclusive use is advertised
pub const SENTINEL_KEY: &str = "TEST_CASE_TIMECOP_IN_USE";

#[derive(Debug, Clone)]
struct Holder {
    id: String,
    name: String,
}

/// Guard against two tests altering the same clock concurrently
///
/// The first scope to alter the clock holds it until that scope's
/// cleanups run; any other scope trying to alter it meanwhile is failed.
/// Scopes that declared themselves parallel are always refused.
pub(crate) struct Sentinel {
    holder: Arc<Mutex<Option<Holder>>>,
}

impl Sentinel {
    pub fn new() -> Self {
        Self {
            holder: Arc::new(Mutex::new(None)),
        }
    }

    pub fn acquire<S: Scope + ?Sized>(&self, scope: &S) -> ClockResult<()> {
        if scope.is_parallel() {
            return Err(ClockError::ParallelTest {
                scope: scope.name(),
            });
        }

        let id = scope.id();
        {
            let mut holder = self.holder.lock();
            match holder.as_ref() {
                Some(current) if current.id == id => return Ok(()),
                Some(current) => {
                    return Err(ClockError::ClockInUse {
                        holder: current.name.clone(),
                        scope: scope.name(),
                    });
                }
                None => {
                    *holder = Some(Holder {
                        id: id.clone(),
                        name: scope.name(),
                    });
                }
            }
        }

        let shared = Arc::clone(&self.holder);
        scope.cleanup(Box::new(move || {
            let mut holder = shared.lock();
            if holder.as_ref().is_some_and(|current| current.id == id) {
                *holder = None;
            }
        }));
        Ok(())
    }

    pub fn holder(&self) -> Option<String> {
        self.holder.lock().as_ref().map(|holder| holder.name.clone())
    }
}

/// Report a refused control operation to the scope and hand the error back
pub(crate) fn report<S: Scope + ?Sized>(scope: &S, error: ClockError) -> ClockError {
    warn!("{SENTINEL_KEY}: {} ({})", error, scope.name());
    scope.fail(error.to_string());
    error
}
