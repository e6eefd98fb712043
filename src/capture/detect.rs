//! Region-detection collaborator: locates the captcha in a full-window image.

use image::RgbaImage;
use tracing::debug;

use super::rect::CaptureRect;
use crate::ocr::preprocess::{hue_mask, HueRange};
use crate::ocr::variants::TEXT_HUES;

/// Result of a detection pass over a full client-area screenshot.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub success: bool,
    /// Client-space bounding box, meaningful only when `success` is set
    pub rect: CaptureRect,
    pub confidence: f32,
    pub method_label: String,
    pub debug_info: String,
}

impl Detection {
    pub fn failed(method_label: &str, debug_info: String) -> Self {
        Self {
            success: false,
            rect: CaptureRect::client(0, 0, 0, 0),
            confidence: 0.0,
            method_label: method_label.to_string(),
            debug_info,
        }
    }
}

pub trait RegionDetector: Send + Sync {
    fn detect(&self, full_window: &RgbaImage) -> Detection;
}

/// Finds the bounding box of pixels in the captcha text colours.
pub struct HueRegionDetector {
    ranges: Vec<HueRange>,
    min_saturation: u8,
    min_value: u8,
    min_pixels: u32,
}

impl Default for HueRegionDetector {
    fn default() -> Self {
        Self {
            ranges: TEXT_HUES.to_vec(),
            min_saturation: 60,
            min_value: 60,
            min_pixels: 20,
        }
    }
}

impl HueRegionDetector {
    pub const LABEL: &'static str = "hue_mask";

    pub fn new(ranges: Vec<HueRange>, min_saturation: u8, min_value: u8, min_pixels: u32) -> Self {
        Self {
            ranges,
            min_saturation,
            min_value,
            min_pixels,
        }
    }
}

impl RegionDetector for HueRegionDetector {
    fn detect(&self, full_window: &RgbaImage) -> Detection {
        let mask = hue_mask(full_window, &self.ranges, self.min_saturation, self.min_value);

        let mut count = 0u32;
        let (mut min_x, mut min_y) = (u32::MAX, u32::MAX);
        let (mut max_x, mut max_y) = (0u32, 0u32);
        for (x, y, p) in mask.enumerate_pixels() {
            if p[0] > 0 {
                count += 1;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }

        if count < self.min_pixels {
            return Detection::failed(
                Self::LABEL,
                format!("{} matching pixels, need {}", count, self.min_pixels),
            );
        }

        let width = max_x - min_x + 1;
        let height = max_y - min_y + 1;
        let confidence = count as f32 / (width * height) as f32;
        debug!(
            "Hue detector: {} pixels in {}x{} box at ({}, {})",
            count, width, height, min_x, min_y
        );

        Detection {
            success: true,
            rect: CaptureRect::client(min_x as i32, min_y as i32, width as i32, height as i32),
            confidence,
            method_label: Self::LABEL.to_string(),
            debug_info: format!("{} pixels", count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn window_with_text(x0: u32, y0: u32, w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(200, 100, |x, y| {
            if (x0..x0 + w).contains(&x) && (y0..y0 + h).contains(&y) {
                Rgba([200, 0, 180, 255])
            } else {
                Rgba([40, 40, 40, 255])
            }
        })
    }

    #[test]
    fn test_detects_bounding_box() {
        let detection = HueRegionDetector::default().detect(&window_with_text(50, 30, 40, 10));

        assert!(detection.success);
        assert_eq!(detection.rect, CaptureRect::client(50, 30, 40, 10));
        assert_eq!(detection.method_label, "hue_mask");
        assert!((detection.confidence - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_too_few_pixels_fails() {
        let detection = HueRegionDetector::default().detect(&window_with_text(50, 30, 3, 3));

        assert!(!detection.success);
        assert!(detection.debug_info.contains("9 matching pixels"));
    }

    #[test]
    fn test_grey_window_fails() {
        let img = RgbaImage::from_pixel(64, 64, Rgba([128, 128, 128, 255]));
        assert!(!HueRegionDetector::default().detect(&img).success);
    }

    #[test]
    fn test_custom_ranges_and_pixel_floor() {
        use crate::ocr::variants::{MAGENTA_HUES, RED_HUES};

        let img = window_with_text(50, 30, 3, 3);

        let magenta = HueRegionDetector::new(MAGENTA_HUES.to_vec(), 60, 60, 4);
        let detection = magenta.detect(&img);
        assert!(detection.success);
        assert_eq!(detection.rect, CaptureRect::client(50, 30, 3, 3));

        let red = HueRegionDetector::new(RED_HUES.to_vec(), 60, 60, 4);
        assert!(!red.detect(&img).success);
    }
}
