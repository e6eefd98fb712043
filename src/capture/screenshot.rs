//! Desktop capture through GDI.
//!
//! Rectangles are copied from the screen DC with `BitBlt`, so the target
//! window must be visible. Client-space rectangles are shifted by the
//! window's client origin before the copy.

use anyhow::{anyhow, Result};
use image::RgbaImage;
use tracing::{debug, warn};

use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC, GetDIBits,
    ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, SRCCOPY,
};

use super::rect::{CaptureRect, CoordSpace};
use super::source::{CaptureSource, WindowHandle};
use super::window::client_origin;

/// Copies a screen-space rectangle into an RGBA image.
pub fn capture_screen_rect(x: i32, y: i32, width: i32, height: i32) -> Result<RgbaImage> {
    if width <= 0 || height <= 0 {
        return Err(anyhow!("Invalid capture size {}x{}", width, height));
    }

    let mut pixels = vec![0u8; (width * height * 4) as usize];

    unsafe {
        let screen_dc = GetDC(HWND::default());
        if screen_dc.is_invalid() {
            return Err(anyhow!("Failed to get screen DC"));
        }
        let mem_dc = CreateCompatibleDC(screen_dc);
        let bitmap = CreateCompatibleBitmap(screen_dc, width, height);
        let old = SelectObject(mem_dc, bitmap);

        let blit = BitBlt(mem_dc, 0, 0, width, height, screen_dc, x, y, SRCCOPY);
        SelectObject(mem_dc, old);

        let lines = if blit.is_ok() {
            let mut bmi = BITMAPINFO {
                bmiHeader: BITMAPINFOHEADER {
                    biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: width,
                    // Negative height requests a top-down DIB
                    biHeight: -height,
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB.0,
                    ..Default::default()
                },
                ..Default::default()
            };
            GetDIBits(
                mem_dc,
                bitmap,
                0,
                height as u32,
                Some(pixels.as_mut_ptr() as *mut _),
                &mut bmi,
                DIB_RGB_COLORS,
            )
        } else {
            0
        };

        let _ = DeleteObject(bitmap);
        let _ = DeleteDC(mem_dc);
        ReleaseDC(HWND::default(), screen_dc);

        blit.map_err(|e| anyhow!("BitBlt failed: {}", e))?;
        if lines == 0 {
            return Err(anyhow!("GetDIBits returned no scan lines"));
        }
    }

    // BGRA to RGBA, forcing opaque alpha
    for chunk in pixels.chunks_exact_mut(4) {
        chunk.swap(0, 2);
        chunk[3] = 255;
    }

    RgbaImage::from_raw(width as u32, height as u32, pixels)
        .ok_or_else(|| anyhow!("Failed to create image buffer"))
}

/// Live capture collaborator backed by the desktop.
pub struct GdiCapture;

impl GdiCapture {
    fn to_screen(window: Option<WindowHandle>, rect: CaptureRect) -> Result<(i32, i32)> {
        match rect.space {
            CoordSpace::Screen => Ok((rect.x, rect.y)),
            CoordSpace::Client => {
                let handle = window.ok_or_else(|| anyhow!("Client-space capture without a window"))?;
                let origin = client_origin(handle)?;
                Ok((origin.x + rect.x, origin.y + rect.y))
            }
        }
    }
}

impl CaptureSource for GdiCapture {
    fn capture(&self, window: Option<WindowHandle>, rect: CaptureRect) -> Option<RgbaImage> {
        if !rect.is_valid() {
            warn!("Capture skipped: degenerate rectangle {}", rect);
            return None;
        }

        let result = Self::to_screen(window, rect)
            .and_then(|(x, y)| capture_screen_rect(x, y, rect.width, rect.height));
        match result {
            Ok(img) => {
                debug!("Captured {} -> {}x{}", rect, img.width(), img.height());
                Some(img)
            }
            Err(e) => {
                warn!("Capture of {} failed: {}", rect, e);
                None
            }
        }
    }
}
