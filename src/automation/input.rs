//! Input-injection collaborator.
//!
//! The Windows implementation uses SendInput, which the target application
//! handles like hardware input. The window is brought to the foreground
//! first and the real cursor moves.

use crate::capture::rect::ClientPoint;
use crate::capture::source::WindowHandle;

/// Fire-and-forget input into the target window.
pub trait InputInjector: Send + Sync {
    fn click(&self, window: Option<WindowHandle>, point: ClientPoint);
    fn send_text(&self, window: Option<WindowHandle>, text: &str);
}

#[cfg(windows)]
pub use self::windows_impl::SendInputInjector;

#[cfg(windows)]
mod windows_impl {
    use anyhow::{anyhow, Result};
    use std::time::Duration;
    use tracing::{debug, warn};

    use windows::Win32::Foundation::POINT;
    use windows::Win32::Graphics::Gdi::ClientToScreen;
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT, KEYEVENTF_KEYUP,
        KEYEVENTF_UNICODE, MOUSEEVENTF_ABSOLUTE, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP,
        MOUSEEVENTF_MOVE, MOUSEEVENTF_VIRTUALDESK, MOUSEINPUT, MOUSE_EVENT_FLAGS,
    };
    use windows::Win32::UI::WindowsAndMessaging::SetForegroundWindow;

    use super::InputInjector;
    use crate::capture::rect::ClientPoint;
    use crate::capture::source::WindowHandle;
    use crate::capture::window::{to_hwnd, virtual_screen};

    pub struct SendInputInjector;

    fn focus(window: Option<WindowHandle>) {
        if let Some(handle) = window {
            unsafe {
                let _ = SetForegroundWindow(to_hwnd(handle));
            }
            // Give window time to activate
            std::thread::sleep(Duration::from_millis(100));
        }
    }

    fn mouse(norm_x: i32, norm_y: i32, flags: MOUSE_EVENT_FLAGS) -> INPUT {
        INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 {
                mi: MOUSEINPUT {
                    dx: norm_x,
                    dy: norm_y,
                    dwFlags: flags | MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE | MOUSEEVENTF_VIRTUALDESK,
                    ..Default::default()
                },
            },
        }
    }

    fn send(inputs: &[INPUT]) -> u32 {
        unsafe { SendInput(inputs, std::mem::size_of::<INPUT>() as i32) }
    }

    /// Client point to the 0-65535 range SendInput expects over the virtual desktop.
    fn normalize(handle: WindowHandle, point: ClientPoint) -> Result<(i32, i32)> {
        let mut screen = POINT { x: point.x, y: point.y };
        unsafe {
            if !ClientToScreen(to_hwnd(handle), &mut screen).as_bool() {
                return Err(anyhow!("ClientToScreen failed"));
            }
        }

        let desk = virtual_screen();
        if !desk.is_valid() {
            return Err(anyhow!("Virtual screen has no size"));
        }
        let norm_x = ((screen.x - desk.x) as i64 * 65535 / desk.width as i64) as i32;
        let norm_y = ((screen.y - desk.y) as i64 * 65535 / desk.height as i64) as i32;
        Ok((norm_x, norm_y))
    }

    impl InputInjector for SendInputInjector {
        fn click(&self, window: Option<WindowHandle>, point: ClientPoint) {
            let Some(handle) = window else {
                warn!("Click at ({}, {}) skipped: no window", point.x, point.y);
                return;
            };
            focus(window);

            let (norm_x, norm_y) = match normalize(handle, point) {
                Ok(norm) => norm,
                Err(e) => {
                    warn!("Click at ({}, {}) skipped: {}", point.x, point.y, e);
                    return;
                }
            };

            send(&[mouse(norm_x, norm_y, MOUSE_EVENT_FLAGS(0))]);
            std::thread::sleep(Duration::from_millis(50));
            send(&[mouse(norm_x, norm_y, MOUSEEVENTF_LEFTDOWN)]);
            std::thread::sleep(Duration::from_millis(50));
            let sent = send(&[mouse(norm_x, norm_y, MOUSEEVENTF_LEFTUP)]);
            debug!("Clicked client ({}, {}), {} input(s) sent", point.x, point.y, sent);
        }

        fn send_text(&self, window: Option<WindowHandle>, text: &str) {
            focus(window);

            let mut inputs = Vec::with_capacity(text.len() * 2);
            for unit in text.encode_utf16() {
                for flags in [KEYEVENTF_UNICODE, KEYEVENTF_UNICODE | KEYEVENTF_KEYUP] {
                    inputs.push(INPUT {
                        r#type: INPUT_KEYBOARD,
                        Anonymous: INPUT_0 {
                            ki: KEYBDINPUT {
                                wScan: unit,
                                dwFlags: flags,
                                ..Default::default()
                            },
                        },
                    });
                }
            }

            let sent = send(&inputs);
            if sent as usize != inputs.len() {
                warn!("SendInput delivered {}/{} key events", sent, inputs.len());
            }
        }
    }
}
