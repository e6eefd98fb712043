//! Solve-run control for the captcha solver.
//!
//! This module provides:
//! - Configuration loading, snapshots and calibration setters
//! - The attempt controller state machine and outcome counters
//! - Input injection into the target window

pub mod config;
pub mod input;
pub mod runner;
pub mod state;

pub use config::{ConfigStore, SolverConfig};
pub use input::InputInjector;
#[cfg(windows)]
pub use input::SendInputInjector;
pub use runner::{AttemptController, Solved};
pub use state::{AttemptStats, ControllerState};
