/// Capabilities the clock requires from the host test runner
///
/// A scope is one running test. Alterations made through a scope are torn
/// down by the cleanups it runs when the test ends, and misuse is reported
/// by marking the test failed without aborting it.
pub trait Scope: Send + Sync {
    /// Unique identity of this scope while it is alive
    fn id(&self) -> String;

    /// Human readable name used in failure messages
    fn name(&self) -> String {
        self.id()
    }

    /// Whether the test declared itself parallel to its siblings
    fn is_parallel(&self) -> bool {
        false
    }

    /// Register a function to run when the scope ends
    ///
    /// Cleanups run in reverse registration order.
    fn cleanup(&self, f: Box<dyn FnOnce() + Send + 'static>);

    /// Mark the test failed; the test keeps running
    fn fail(&self, message: String);
}
