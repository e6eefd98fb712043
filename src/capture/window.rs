//! Window discovery and geometry queries for the target application.

use anyhow::{anyhow, Result};
use std::ffi::OsString;
use std::os::windows::ffi::OsStringExt;
use tracing::{debug, info};

use windows::Win32::Foundation::{CloseHandle, BOOL, HWND, LPARAM, POINT, RECT, TRUE};
use windows::Win32::Graphics::Gdi::ClientToScreen;
use windows::Win32::System::Threading::{
    OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION,
};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetClientRect, GetSystemMetrics, GetWindowTextLengthW, GetWindowThreadProcessId,
    IsWindow, IsWindowVisible, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN,
    SM_YVIRTUALSCREEN,
};

use super::rect::CaptureRect;
use super::source::{WindowHandle, WindowState};

pub fn to_hwnd(handle: WindowHandle) -> HWND {
    HWND(handle.0 as *mut std::ffi::c_void)
}

pub fn from_hwnd(hwnd: HWND) -> WindowHandle {
    WindowHandle(hwnd.0 as isize)
}

/// Executable file name of the process owning `hwnd`, e.g. `game.exe`.
fn process_name_of(hwnd: HWND) -> Option<String> {
    unsafe {
        let mut process_id: u32 = 0;
        GetWindowThreadProcessId(hwnd, Some(&mut process_id));
        if process_id == 0 {
            return None;
        }

        let process = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, process_id).ok()?;
        let mut name_buf: Vec<u16> = vec![0; 1024];
        let mut len = name_buf.len() as u32;
        let result = QueryFullProcessImageNameW(
            process,
            PROCESS_NAME_WIN32,
            windows::core::PWSTR(name_buf.as_mut_ptr()),
            &mut len,
        );
        let _ = CloseHandle(process);

        if result.is_err() || len == 0 {
            return None;
        }

        let full_path = OsString::from_wide(&name_buf[..len as usize])
            .to_string_lossy()
            .to_string();
        full_path.rsplit('\\').next().map(str::to_string)
    }
}

/// Finds the first visible, titled window whose process executable is
/// `process_name` (case-insensitive).
pub fn find_window_by_process(process_name: &str) -> Result<WindowHandle> {
    struct Search {
        wanted: String,
        found: Option<HWND>,
    }

    unsafe extern "system" fn enum_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
        unsafe {
            let search = &mut *(lparam.0 as *mut Search);

            if !IsWindowVisible(hwnd).as_bool() || GetWindowTextLengthW(hwnd) == 0 {
                return TRUE;
            }

            match process_name_of(hwnd) {
                Some(name) if name.to_lowercase() == search.wanted => {
                    search.found = Some(hwnd);
                    BOOL(0)
                }
                _ => TRUE,
            }
        }
    }

    let mut search = Search {
        wanted: process_name.to_lowercase(),
        found: None,
    };
    unsafe {
        // EnumWindows reports an error when the callback stops early
        let _ = EnumWindows(Some(enum_callback), LPARAM(&mut search as *mut _ as isize));
    }

    let hwnd = search
        .found
        .ok_or_else(|| anyhow!("Could not find a window for {}. Is it running?", process_name))?;
    info!("Found {} window: {:?}", process_name, hwnd);
    Ok(from_hwnd(hwnd))
}

/// Bounds of the virtual desktop spanning all monitors.
pub fn virtual_screen() -> CaptureRect {
    unsafe {
        CaptureRect::screen(
            GetSystemMetrics(SM_XVIRTUALSCREEN),
            GetSystemMetrics(SM_YVIRTUALSCREEN),
            GetSystemMetrics(SM_CXVIRTUALSCREEN),
            GetSystemMetrics(SM_CYVIRTUALSCREEN),
        )
    }
}

/// Screen position of the client area's top-left corner.
pub fn client_origin(handle: WindowHandle) -> Result<POINT> {
    let mut origin = POINT { x: 0, y: 0 };
    unsafe {
        if !ClientToScreen(to_hwnd(handle), &mut origin).as_bool() {
            return Err(anyhow!("ClientToScreen failed"));
        }
    }
    Ok(origin)
}

pub fn client_size(handle: WindowHandle) -> Result<(u32, u32)> {
    let mut rect = RECT::default();
    unsafe { GetClientRect(to_hwnd(handle), &mut rect)? };
    Ok((
        (rect.right - rect.left).max(0) as u32,
        (rect.bottom - rect.top).max(0) as u32,
    ))
}

/// Snapshot of the target window's geometry. A missing or closed window
/// yields a detached state rather than an error.
pub fn probe(process_name: &str) -> WindowState {
    let screen = virtual_screen();

    let handle = match find_window_by_process(process_name) {
        Ok(handle) => handle,
        Err(e) => {
            debug!("Window probe: {}", e);
            return WindowState::detached(screen);
        }
    };

    if !unsafe { IsWindow(to_hwnd(handle)) }.as_bool() {
        return WindowState::detached(screen);
    }

    match client_size(handle) {
        Ok(size) => WindowState {
            handle: Some(handle),
            client_size: Some(size),
            virtual_screen: screen,
        },
        Err(e) => {
            debug!("Window probe: GetClientRect failed: {}", e);
            WindowState {
                handle: Some(handle),
                client_size: None,
                virtual_screen: screen,
            }
        }
    }
}
