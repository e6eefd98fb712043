//! The capture collaborator contract and a still-image implementation.

use anyhow::{Context, Result};
use image::RgbaImage;
use std::path::Path;
use tracing::debug;

use super::rect::{CaptureRect, CoordSpace};

/// Opaque native window handle, safe to move across threads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

/// Geometry of the target window at the start of an attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowState {
    pub handle: Option<WindowHandle>,
    /// Client area size in pixels
    pub client_size: Option<(u32, u32)>,
    /// Virtual desktop bounds in screen space
    pub virtual_screen: CaptureRect,
}

impl WindowState {
    /// No target window; only screen-space strategies can resolve.
    pub fn detached(virtual_screen: CaptureRect) -> Self {
        Self {
            handle: None,
            client_size: None,
            virtual_screen,
        }
    }

    /// True when a handle is known and the client area is non-empty.
    pub fn is_live(&self) -> bool {
        self.handle.is_some() && matches!(self.client_size, Some((w, h)) if w > 0 && h > 0)
    }

    pub fn client_bounds(&self) -> Option<CaptureRect> {
        let (w, h) = self.client_size?;
        let rect = CaptureRect::client(0, 0, w as i32, h as i32);
        rect.is_valid().then_some(rect)
    }

    /// Bounds that rectangles in `space` must be clamped to.
    pub fn bounds_for(&self, space: CoordSpace) -> Option<CaptureRect> {
        match space {
            CoordSpace::Screen => self.virtual_screen.is_valid().then_some(self.virtual_screen),
            CoordSpace::Client => self.client_bounds(),
        }
    }
}

/// Grabs pixels for a rectangle. `None` signals capture failure.
///
/// Screen-space rectangles are captured directly from the desktop;
/// client-space rectangles are offset by the window's client origin.
pub trait CaptureSource: Send + Sync {
    fn capture(&self, window: Option<WindowHandle>, rect: CaptureRect) -> Option<RgbaImage>;
}

/// Crops `rect` out of `img`, treating the image origin as the rectangle origin.
///
/// Returns `None` if the rectangle is degenerate or not fully inside the image.
pub fn crop_checked(img: &RgbaImage, rect: &CaptureRect) -> Option<RgbaImage> {
    if !rect.is_valid() || rect.x < 0 || rect.y < 0 {
        return None;
    }
    let (w, h) = img.dimensions();
    if rect.right() as i64 > w as i64 || rect.bottom() as i64 > h as i64 {
        return None;
    }

    Some(
        image::imageops::crop_imm(
            img,
            rect.x as u32,
            rect.y as u32,
            rect.width as u32,
            rect.height as u32,
        )
        .to_image(),
    )
}

/// A saved screenshot standing in for both the desktop and the window client area.
pub struct StillImageCapture {
    image: RgbaImage,
}

impl StillImageCapture {
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn open(path: &Path) -> Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("Failed to load {}", path.display()))?
            .to_rgba8();
        Ok(Self::new(image))
    }

    /// Window state whose client area and desktop both equal the image.
    pub fn window_state(&self) -> WindowState {
        let (w, h) = self.image.dimensions();
        WindowState {
            handle: Some(WindowHandle(0)),
            client_size: Some((w, h)),
            virtual_screen: CaptureRect::screen(0, 0, w as i32, h as i32),
        }
    }
}

impl CaptureSource for StillImageCapture {
    fn capture(&self, _window: Option<WindowHandle>, rect: CaptureRect) -> Option<RgbaImage> {
        let cropped = crop_checked(&self.image, &rect);
        if cropped.is_none() {
            debug!("Still image capture: {} is outside the image", rect);
        }
        cropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_crop_checked_inside() {
        let img = RgbaImage::from_fn(100, 50, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        let cropped = crop_checked(&img, &CaptureRect::client(10, 5, 20, 10)).unwrap();

        assert_eq!(cropped.dimensions(), (20, 10));
        assert_eq!(cropped.get_pixel(0, 0)[0], 10);
        assert_eq!(cropped.get_pixel(0, 0)[1], 5);
    }

    #[test]
    fn test_crop_checked_rejects_out_of_bounds() {
        let img = RgbaImage::new(100, 50);
        assert!(crop_checked(&img, &CaptureRect::client(90, 0, 20, 10)).is_none());
        assert!(crop_checked(&img, &CaptureRect::client(-1, 0, 20, 10)).is_none());
        assert!(crop_checked(&img, &CaptureRect::client(0, 0, 0, 10)).is_none());
    }

    #[test]
    fn test_still_image_window_state() {
        let capture = StillImageCapture::new(RgbaImage::new(640, 480));
        let state = capture.window_state();

        assert!(state.is_live());
        assert_eq!(state.client_bounds(), Some(CaptureRect::client(0, 0, 640, 480)));
        assert_eq!(
            state.bounds_for(CoordSpace::Screen),
            Some(CaptureRect::screen(0, 0, 640, 480))
        );
    }

    #[test]
    fn test_detached_window_has_no_client_bounds() {
        let state = WindowState::detached(CaptureRect::screen(0, 0, 1920, 1080));
        assert!(!state.is_live());
        assert!(state.bounds_for(CoordSpace::Client).is_none());
    }
}
