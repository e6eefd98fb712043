//! OCR Invocation Adapter: one guarded engine call per variant.

use chrono::Local;
use image::imageops::{self, FilterType};
use image::GrayImage;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use super::engine::OcrEngine;
use crate::logging::panic_message;

/// Images smaller than this in either dimension are upscaled before OCR.
pub const MIN_OCR_WIDTH: u32 = 200;
pub const MIN_OCR_HEIGHT: u32 = 50;

#[derive(Clone)]
pub struct OcrAdapter {
    engine: Arc<dyn OcrEngine>,
    debug_dir: Option<PathBuf>,
}

impl OcrAdapter {
    pub fn new(engine: Arc<dyn OcrEngine>) -> Self {
        Self {
            engine,
            debug_dir: None,
        }
    }

    /// Also writes every OCR input image into `dir`.
    pub fn with_debug_dir(mut self, dir: PathBuf) -> Self {
        self.debug_dir = Some(dir);
        self
    }

    /// Raw engine text for `image`; any failure yields an empty string.
    pub fn recognize(&self, image: &GrayImage, strategy: &str) -> String {
        if image.width() == 0 || image.height() == 0 {
            warn!("OCR skipped for {}: empty image", strategy);
            return String::new();
        }

        let prepared = ensure_min_size(image);
        if let Some(dir) = &self.debug_dir {
            save_debug_image(dir, &prepared, strategy);
        }

        match catch_unwind(AssertUnwindSafe(|| self.engine.process(&prepared))) {
            Ok(Ok(text)) => {
                debug!("OCR {}: {:?}", strategy, text);
                text
            }
            Ok(Err(e)) => {
                warn!("OCR failed for {}: {:#}", strategy, e);
                String::new()
            }
            Err(payload) => {
                warn!("OCR panicked for {}: {}", strategy, panic_message(payload.as_ref()));
                String::new()
            }
        }
    }
}

/// Nearest-neighbour upscale by `max(200/w, 50/h)` when below the minimum size.
pub fn ensure_min_size(image: &GrayImage) -> GrayImage {
    let (w, h) = image.dimensions();
    if w >= MIN_OCR_WIDTH && h >= MIN_OCR_HEIGHT {
        return image.clone();
    }

    let factor = (MIN_OCR_WIDTH as f32 / w as f32).max(MIN_OCR_HEIGHT as f32 / h as f32);
    let new_w = (w as f32 * factor).round() as u32;
    let new_h = (h as f32 * factor).round() as u32;
    imageops::resize(image, new_w, new_h, FilterType::Nearest)
}

fn save_debug_image(dir: &std::path::Path, image: &GrayImage, strategy: &str) {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S_%3f");
    let path = dir.join(format!("{}_{}.png", timestamp, strategy));
    if let Err(e) = image.save(&path) {
        warn!("Failed to save debug image {}: {}", path.display(), e);
    }
}
