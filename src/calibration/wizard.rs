//! Hotkey-driven calibration.
//!
//! Hover the cursor and press Ctrl+Shift+F1..F4 to record the captcha area
//! corners and the input/confirm points. Each completed item is saved
//! immediately.

use anyhow::Result;
use std::sync::Mutex;
use tracing::{info, warn};
use windows::Win32::Foundation::HWND;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    RegisterHotKey, UnregisterHotKey, MOD_CONTROL, MOD_NOREPEAT, MOD_SHIFT, VK_F1, VK_F2, VK_F3,
    VK_F4,
};

use crate::automation::config::ConfigStore;
use crate::calibration::coords::{client_frame, get_cursor_position};
use crate::calibration::state::{CalibrationSession, CalibrationStep};
use crate::capture::window::find_window_by_process;

// Calibration hotkey IDs (must not conflict with main hotkeys)
pub const HOTKEY_CAL_AREA_TOP_LEFT: i32 = 100;
pub const HOTKEY_CAL_AREA_BOTTOM_RIGHT: i32 = 101;
pub const HOTKEY_CAL_INPUT_POINT: i32 = 102;
pub const HOTKEY_CAL_CONFIRM_POINT: i32 = 103;

const HOTKEYS: [(i32, u32, CalibrationStep); 4] = [
    (HOTKEY_CAL_AREA_TOP_LEFT, VK_F1.0 as u32, CalibrationStep::AreaTopLeft),
    (HOTKEY_CAL_AREA_BOTTOM_RIGHT, VK_F2.0 as u32, CalibrationStep::AreaBottomRight),
    (HOTKEY_CAL_INPUT_POINT, VK_F3.0 as u32, CalibrationStep::InputPoint),
    (HOTKEY_CAL_CONFIRM_POINT, VK_F4.0 as u32, CalibrationStep::ConfirmPoint),
];

static SESSION: Mutex<Option<CalibrationSession>> = Mutex::new(None);

pub fn step_for_hotkey(hotkey_id: i32) -> Option<CalibrationStep> {
    HOTKEYS
        .iter()
        .find(|(id, _, _)| *id == hotkey_id)
        .map(|(_, _, step)| *step)
}

pub fn register_calibration_hotkeys(hwnd: HWND) -> Result<()> {
    for (id, vk, step) in HOTKEYS {
        unsafe { RegisterHotKey(hwnd, id, MOD_CONTROL | MOD_SHIFT | MOD_NOREPEAT, vk)? };
        info!("Hotkey: Ctrl+Shift+F{} ({})", id - HOTKEY_CAL_AREA_TOP_LEFT + 1, step.description());
    }
    *SESSION.lock().unwrap_or_else(|p| p.into_inner()) = Some(CalibrationSession::new());
    Ok(())
}

pub fn unregister_calibration_hotkeys(hwnd: HWND) {
    for (id, _, _) in HOTKEYS {
        unsafe {
            let _ = UnregisterHotKey(hwnd, id);
        }
    }
}

/// Records the cursor position for the step bound to `hotkey_id`.
pub fn handle_calibration_hotkey(hotkey_id: i32, store: &ConfigStore) -> Result<()> {
    let Some(step) = step_for_hotkey(hotkey_id) else {
        return Ok(());
    };

    let cursor = get_cursor_position()?;
    let frame = match step {
        CalibrationStep::InputPoint | CalibrationStep::ConfirmPoint => {
            let target = store.snapshot().target_process;
            match find_window_by_process(&target).and_then(client_frame) {
                Ok(frame) => Some(frame),
                Err(e) => {
                    warn!("Calibration: {}", e);
                    None
                }
            }
        }
        _ => None,
    };

    let mut guard = SESSION.lock().unwrap_or_else(|p| p.into_inner());
    let session = guard.get_or_insert_with(CalibrationSession::new);
    session.record(step, cursor, frame, store)?;
    Ok(())
}
