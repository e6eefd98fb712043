//! Cursor and client-area queries for calibration.

use anyhow::Result;
use windows::Win32::Foundation::POINT;
use windows::Win32::UI::WindowsAndMessaging::GetCursorPos;

use crate::calibration::state::ClientFrame;
use crate::capture::source::WindowHandle;
use crate::capture::window::{client_origin, client_size};

/// Gets the current cursor position in screen coordinates.
pub fn get_cursor_position() -> Result<(i32, i32)> {
    let mut pt = POINT::default();
    unsafe {
        GetCursorPos(&mut pt)?;
    }
    Ok((pt.x, pt.y))
}

pub fn client_frame(handle: WindowHandle) -> Result<ClientFrame> {
    let origin = client_origin(handle)?;
    Ok(ClientFrame {
        origin: (origin.x, origin.y),
        size: client_size(handle)?,
    })
}
