use thiserror::Error;

/// Errors raised by clock control operations
///
/// Control operations report these through [`crate::Scope::fail`] as well
/// as returning them, so a test fails even if the result is ignored.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClockError {
    #[error("Invalid speed multiplier: {0} (must be a finite value above zero)")]
    InvalidSpeed(f64),

    #[error("Clock control is not allowed in parallel test {scope}")]
    ParallelTest { scope: String },

    #[error("TEST_CASE_TIMECOP_IN_USE is held by {holder}; {scope} must not alter the clock concurrently")]
    ClockInUse { holder: String, scope: String },

    #[error("Travel by {0} leaves the representable time range")]
    OutOfRange(String),

    #[error("Invalid clock config: {0}")]
    InvalidConfig(String),

    #[error("Clock is bound to native time; alterations have no effect")]
    NativeBackend,

    #[error("Clock backend is already installed")]
    AlreadyInstalled,
}

pub type ClockResult<T> = std::result::Result<T, ClockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_use_names_both_scopes() {
        let err = ClockError::ClockInUse {
            holder: "first".to_string(),
            scope: "second".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("TEST_CASE_TIMECOP_IN_USE"));
        assert!(message.contains("first"));
        assert!(message.contains("second"));
    }

    #[test]
    fn test_invalid_speed_message() {
        let err = ClockError::InvalidSpeed(-2.0);
        assert!(err.to_string().contains("-2"));
    }
}
