//! Attempt controller states and process-wide outcome counters.
//!
//! The controller moves Idle → Running → (Success | ExhaustedRetries) → Idle.
//! Timeouts and aborts leave Running straight back to Idle.

use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Ready to accept a start request
    Idle,
    /// Recognition attempts in progress
    Running,
    /// Text recognized and injected
    Success,
    /// Every attempt came back without a result
    ExhaustedRetries,
}

impl std::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerState::Idle => write!(f, "Idle"),
            ControllerState::Running => write!(f, "Running"),
            ControllerState::Success => write!(f, "Success"),
            ControllerState::ExhaustedRetries => write!(f, "Exhausted retries"),
        }
    }
}

/// Success and failure counts, kept until the process exits.
#[derive(Debug, Default)]
pub struct AttemptStats {
    success: AtomicU32,
    failure: AtomicU32,
}

impl AttemptStats {
    pub fn record_success(&self) {
        self.success.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_failure(&self) {
        self.failure.fetch_add(1, Ordering::SeqCst);
    }

    pub fn success_count(&self) -> u32 {
        self.success.load(Ordering::SeqCst)
    }

    pub fn failure_count(&self) -> u32 {
        self.failure.load(Ordering::SeqCst)
    }
}

impl std::fmt::Display for AttemptStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} solved, {} failed",
            self.success_count(),
            self.failure_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = AttemptStats::default();
        stats.record_failure();
        stats.record_failure();
        stats.record_success();

        assert_eq!(stats.success_count(), 1);
        assert_eq!(stats.failure_count(), 2);
        assert_eq!(stats.to_string(), "1 solved, 2 failed");
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ControllerState::ExhaustedRetries.to_string(), "Exhausted retries");
        assert_eq!(ControllerState::Running.to_string(), "Running");
    }
}
