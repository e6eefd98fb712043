//! Region Resolver: picks the captcha rectangle from the configured strategies.
//!
//! Priority, highest first: manual area, auto-detect, absolute coordinates,
//! relative coordinates, fixed coordinates. The first strategy that is
//! enabled and usable wins; fixed coordinates always resolve.

use tracing::{debug, info};

use super::detect::RegionDetector;
use super::rect::{CaptureRect, CoordSpace};
use super::source::{CaptureSource, WindowState};
use crate::automation::config::CaptureConfig;

/// Manual rectangles must exceed this size in both dimensions.
pub const MIN_MANUAL_SIZE: i32 = 10;

/// Which strategy produced a rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionMethod {
    Manual,
    AutoDetect,
    Absolute,
    Relative,
    Fixed,
}

impl RegionMethod {
    pub fn label(&self) -> &'static str {
        match self {
            RegionMethod::Manual => "manual",
            RegionMethod::AutoDetect => "auto_detect",
            RegionMethod::Absolute => "absolute",
            RegionMethod::Relative => "relative",
            RegionMethod::Fixed => "fixed",
        }
    }
}

impl std::fmt::Display for RegionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedRegion {
    pub rect: CaptureRect,
    pub method: RegionMethod,
}

impl ResolvedRegion {
    /// Pads and clamps to the bounds of the rectangle's own space.
    pub fn padded(&self, window: &WindowState) -> Option<CaptureRect> {
        let bounds = window.bounds_for(self.rect.space)?;
        self.rect.padded(&bounds)
    }
}

/// True when a manual rectangle is large enough to use.
pub fn manual_area_usable(config: &CaptureConfig) -> bool {
    let rect = config.manual_area.rect;
    rect.width > MIN_MANUAL_SIZE && rect.height > MIN_MANUAL_SIZE
}

pub struct RegionResolver<'a> {
    capture: &'a dyn CaptureSource,
    detector: Option<&'a dyn RegionDetector>,
}

impl<'a> RegionResolver<'a> {
    pub fn new(capture: &'a dyn CaptureSource, detector: Option<&'a dyn RegionDetector>) -> Self {
        Self { capture, detector }
    }

    pub fn resolve(&self, config: &CaptureConfig, window: &WindowState) -> ResolvedRegion {
        if config.manual_area.enabled && manual_area_usable(config) {
            return self.chosen(config.manual_area.rect.in_space(CoordSpace::Screen), RegionMethod::Manual);
        }

        if config.auto_detect.enabled {
            if let Some(rect) = self.auto_detect(window) {
                return self.chosen(rect, RegionMethod::AutoDetect);
            }
        }

        if config.absolute_coords.enabled {
            let abs = config.absolute_coords;
            let rect = CaptureRect::screen(abs.left, abs.top, abs.right - abs.left, abs.bottom - abs.top);
            return self.chosen(rect, RegionMethod::Absolute);
        }

        if config.relative_coords.enabled {
            if let Some((cw, ch)) = window.client_size.filter(|_| window.handle.is_some()) {
                let rel = config.relative_coords.rect;
                let scale = |fraction: f32, size: u32| (fraction * size as f32).round() as i32;
                let rect = CaptureRect::client(
                    scale(rel.x, cw),
                    scale(rel.y, ch),
                    scale(rel.width, cw).max(1),
                    scale(rel.height, ch).max(1),
                );
                return self.chosen(rect, RegionMethod::Relative);
            }
            debug!("Relative coordinates enabled but no window is available");
        }

        self.chosen(config.fixed_coords.in_space(CoordSpace::Client), RegionMethod::Fixed)
    }

    fn auto_detect(&self, window: &WindowState) -> Option<CaptureRect> {
        let detector = self.detector?;
        if !window.is_live() {
            debug!("Auto-detect skipped: no live window");
            return None;
        }

        let full = self.capture.capture(window.handle, window.client_bounds()?)?;
        let detection = detector.detect(&full);
        if detection.success && detection.rect.is_valid() {
            info!(
                "Auto-detect ({}) found {} with confidence {:.2}",
                detection.method_label, detection.rect, detection.confidence
            );
            Some(detection.rect)
        } else {
            debug!(
                "Auto-detect ({}) failed: {}",
                detection.method_label, detection.debug_info
            );
            None
        }
    }

    fn chosen(&self, rect: CaptureRect, method: RegionMethod) -> ResolvedRegion {
        debug!("Region resolved by {}: {}", method, rect);
        ResolvedRegion { rect, method }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::config::{AbsoluteCoords, AutoDetect, ManualArea, RelativeCoords, RelativeRect};
    use crate::capture::detect::Detection;
    use crate::capture::rect::PixelRect;
    use crate::capture::source::{StillImageCapture, WindowHandle};
    use image::RgbaImage;

    struct FixedDetector(bool);

    impl RegionDetector for FixedDetector {
        fn detect(&self, _full_window: &RgbaImage) -> Detection {
            if self.0 {
                Detection {
                    success: true,
                    rect: CaptureRect::client(40, 50, 60, 20),
                    confidence: 0.9,
                    method_label: "fake".to_string(),
                    debug_info: String::new(),
                }
            } else {
                Detection::failed("fake", "nothing".to_string())
            }
        }
    }

    fn window() -> WindowState {
        WindowState {
            handle: Some(WindowHandle(1)),
            client_size: Some((800, 600)),
            virtual_screen: CaptureRect::screen(0, 0, 1920, 1080),
        }
    }

    fn none_enabled() -> CaptureConfig {
        CaptureConfig {
            manual_area: ManualArea { enabled: false, rect: PixelRect::new(100, 100, 200, 50) },
            auto_detect: AutoDetect { enabled: false },
            absolute_coords: AbsoluteCoords { enabled: false, left: 10, top: 20, right: 110, bottom: 70 },
            relative_coords: RelativeCoords {
                enabled: false,
                rect: RelativeRect { x: 0.5, y: 0.5, width: 0.25, height: 0.1 },
            },
            fixed_coords: PixelRect::new(300, 250, 200, 60),
        }
    }

    fn resolve(config: &CaptureConfig, detector_ok: bool) -> ResolvedRegion {
        let capture = StillImageCapture::new(RgbaImage::new(800, 600));
        let detector = FixedDetector(detector_ok);
        RegionResolver::new(&capture, Some(&detector)).resolve(config, &window())
    }

    #[test]
    fn test_none_enabled_falls_through_to_fixed() {
        let region = resolve(&none_enabled(), true);
        assert_eq!(region.method, RegionMethod::Fixed);
        assert_eq!(region.rect, CaptureRect::client(300, 250, 200, 60));
    }

    #[test]
    fn test_single_strategy_wins() {
        let mut config = none_enabled();
        config.manual_area.enabled = true;
        let region = resolve(&config, true);
        assert_eq!(region.method.label(), "manual");
        assert_eq!(region.rect, CaptureRect::screen(100, 100, 200, 50));

        let mut config = none_enabled();
        config.auto_detect.enabled = true;
        let region = resolve(&config, true);
        assert_eq!(region.method.label(), "auto_detect");
        assert_eq!(region.rect, CaptureRect::client(40, 50, 60, 20));

        let mut config = none_enabled();
        config.absolute_coords.enabled = true;
        let region = resolve(&config, true);
        assert_eq!(region.method.label(), "absolute");
        assert_eq!(region.rect, CaptureRect::screen(10, 20, 100, 50));

        let mut config = none_enabled();
        config.relative_coords.enabled = true;
        let region = resolve(&config, true);
        assert_eq!(region.method.label(), "relative");
        assert_eq!(region.rect, CaptureRect::client(400, 300, 200, 60));
    }

    #[test]
    fn test_small_manual_area_is_skipped() {
        let mut config = none_enabled();
        config.manual_area = ManualArea { enabled: true, rect: PixelRect::new(5, 5, 10, 40) };
        assert_eq!(resolve(&config, true).method, RegionMethod::Fixed);
    }

    #[test]
    fn test_failed_detection_falls_through() {
        let mut config = none_enabled();
        config.auto_detect.enabled = true;
        config.absolute_coords.enabled = true;
        assert_eq!(resolve(&config, false).method, RegionMethod::Absolute);
    }

    #[test]
    fn test_priority_order() {
        let mut config = none_enabled();
        config.manual_area.enabled = true;
        config.auto_detect.enabled = true;
        config.absolute_coords.enabled = true;
        config.relative_coords.enabled = true;
        assert_eq!(resolve(&config, true).method, RegionMethod::Manual);

        config.manual_area.enabled = false;
        assert_eq!(resolve(&config, true).method, RegionMethod::AutoDetect);
    }

    #[test]
    fn test_relative_needs_window_and_has_min_size() {
        let mut config = none_enabled();
        config.relative_coords.enabled = true;
        config.relative_coords.rect = RelativeRect { x: 0.1, y: 0.1, width: 0.0, height: 0.0 };

        let capture = StillImageCapture::new(RgbaImage::new(800, 600));
        let resolver = RegionResolver::new(&capture, None);

        let region = resolver.resolve(&config, &window());
        assert_eq!(region.rect, CaptureRect::client(80, 60, 1, 1));

        let detached = WindowState::detached(CaptureRect::screen(0, 0, 1920, 1080));
        assert_eq!(resolver.resolve(&config, &detached).method, RegionMethod::Fixed);
    }

    #[test]
    fn test_padded_uses_own_space_bounds() {
        let region = ResolvedRegion {
            rect: CaptureRect::client(780, 590, 40, 12),
            method: RegionMethod::Fixed,
        };
        let padded = region.padded(&window()).unwrap();
        assert_eq!(padded.right(), 800);
        assert_eq!(padded.bottom(), 600);
        assert_eq!(padded.space, CoordSpace::Client);
    }
}
