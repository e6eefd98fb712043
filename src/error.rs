//! Error types surfaced by the solver.
//!
//! Only [`SolveError`] ever reaches the caller of the attempt controller.
//! [`TransformError`] is produced per strategy and absorbed by the pipeline.

use std::time::Duration;
use thiserror::Error;

/// User-visible outcome of a rejected or failed solve run.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolveError {
    #[error("Configuration invalid: {0}")]
    ConfigurationInvalid(String),

    #[error("A solve run is already in progress")]
    AlreadyRunning,

    #[error("No captcha text recognized after {attempts} attempt(s)")]
    Exhausted { attempts: u32 },

    #[error("Solve run timed out after {}ms", after.as_millis())]
    Timeout { after: Duration },

    #[error("Solve run aborted")]
    Aborted,
}

/// Failure of a single image-variant strategy.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransformError {
    #[error("source image is empty")]
    EmptyInput,

    #[error("strategy produced a degenerate {width}x{height} image")]
    Degenerate { width: u32, height: u32 },

    #[error("strategy panicked: {0}")]
    Panicked(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            SolveError::Exhausted { attempts: 3 }.to_string(),
            "No captcha text recognized after 3 attempt(s)"
        );
        assert_eq!(
            SolveError::Timeout { after: Duration::from_millis(1500) }.to_string(),
            "Solve run timed out after 1500ms"
        );
        assert_eq!(
            TransformError::Degenerate { width: 0, height: 4 }.to_string(),
            "strategy produced a degenerate 0x4 image"
        );
    }
}
