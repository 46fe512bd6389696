use log::debug;
use parking_lot::Mutex;
use testcase_ports::Scope;
use uuid::Uuid;

type Cleanup = Box<dyn FnOnce() + Send + 'static>;

/// Minimal test scope for tokio tests
///
/// Runs its cleanups in reverse order when finished or dropped. Failures
/// reported through [`Scope::fail`] that nobody collected with
/// [`TestCase::finish`] fail the test when the case is dropped.
///
/// ```ignore
/// let case = TestCase::new("frozen_noon");
/// clock::travel(&case, noon, &[TravelOption::Freeze])?;
/// // ...
/// assert!(case.finish().is_empty());
/// ```
pub struct TestCase {
    id: Uuid,
    name: String,
    parallel: bool,
    cleanups: Mutex<Vec<Cleanup>>,
    failures: Mutex<Vec<String>>,
}

impl TestCase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            parallel: false,
            cleanups: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
        }
    }

    /// A case that declared itself parallel to its siblings
    pub fn parallel(name: impl Into<String>) -> Self {
        let mut case = Self::new(name);
        case.parallel = true;
        case
    }

    /// Failures reported so far
    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().clone()
    }

    /// End the case: run cleanups and hand back the collected failures
    pub fn finish(self) -> Vec<String> {
        self.run_cleanups();
        std::mem::take(&mut *self.failures.lock())
    }

    fn run_cleanups(&self) {
        let cleanups = std::mem::take(&mut *self.cleanups.lock());
        if !cleanups.is_empty() {
            debug!("{}: running {} cleanups", self.name, cleanups.len());
        }
        for cleanup in cleanups.into_iter().rev() {
            cleanup();
        }
    }
}

impl Scope for TestCase {
    fn id(&self) -> String {
        self.id.to_string()
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn is_parallel(&self) -> bool {
        self.parallel
    }

    fn cleanup(&self, f: Box<dyn FnOnce() + Send + 'static>) {
        self.cleanups.lock().push(f);
    }

    fn fail(&self, message: String) {
        self.failures.lock().push(message);
    }
}

impl Drop for TestCase {
    fn drop(&mut self) {
        self.run_cleanups();
        let failures = std::mem::take(&mut *self.failures.lock());
        if !failures.is_empty() && !std::thread::panicking() {
            panic!("{} failed: {}", self.name, failures.join("; "));
        }
    }
}
