use testcase_core::Timestamp;

/// Port for time abstraction
///
/// This allows consumers to read time from different sources:
/// - Real system time for production
/// - Altered time (travel, speed, freeze) in tests
pub trait Clock: Send + Sync {
    /// Get the current time according to this clock
    fn now(&self) -> Timestamp;

    /// Time elapsed since `start` according to this clock
    fn since(&self, start: Timestamp) -> chrono::Duration {
        self.now() - start
    }

    /// Get the clock's name/identifier for debugging
    fn name(&self) -> &str {
        "Clock"
    }
}
