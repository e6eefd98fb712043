//! Calibration of the manual capture area and the input/confirm points.
//!
//! The session logic in `state` is platform independent; `coords` and
//! `wizard` wire it to the cursor and global hotkeys on Windows.

#[cfg(windows)]
pub mod coords;
pub mod state;
#[cfg(windows)]
pub mod wizard;

pub use state::{CalibrationOutcome, CalibrationSession, CalibrationStep, ClientFrame};
#[cfg(windows)]
pub use wizard::{
    handle_calibration_hotkey, register_calibration_hotkeys, step_for_hotkey,
    unregister_calibration_hotkeys,
};
