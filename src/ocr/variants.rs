//! The fixed catalogue of image-transformation strategies.
//!
//! Every strategy is a pure `RgbaImage -> GrayImage` function producing a
//! dark-on-light image ready for OCR. Catalogue order is the tie-break order
//! used by candidate selection, so entries are only ever appended.

use std::panic::{catch_unwind, AssertUnwindSafe};

use image::imageops::{self, FilterType};
use image::{GrayImage, RgbaImage};
use imageproc::contrast::{threshold, ThresholdType};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::median_filter;
use imageproc::morphology::{close, dilate, open};
use tracing::{debug, warn};

use super::preprocess::{
    adaptive_mean, channel, clahe, hue_mask, inverted, mask_to_white, otsu,
    threshold_bright_pixels, to_gray, union, upscale, HueRange,
};
use crate::error::TransformError;
use crate::logging::panic_message;

/// Magenta/purple glyphs.
pub const MAGENTA_HUES: &[HueRange] = &[HueRange::new(140, 170)];
/// Red wraps around both ends of the hue circle.
pub const RED_HUES: &[HueRange] = &[HueRange::new(0, 10), HueRange::new(170, 179)];
/// Every hue the captcha text is expected to use.
pub const TEXT_HUES: &[HueRange] = &[HueRange::new(0, 10), HueRange::new(140, 179)];
/// Orange/brown captcha background.
pub const BACKGROUND_HUES: &[HueRange] = &[HueRange::new(10, 30)];

const TEXT_MIN_SATURATION: u8 = 70;
const TEXT_MIN_VALUE: u8 = 50;
const BACKGROUND_MIN_SATURATION: u8 = 80;

const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 150.0;

/// Minimum RGB level for the light-text strategy.
const BRIGHT_TEXT_THRESHOLD: u8 = 190;

pub type StrategyFn = fn(&RgbaImage) -> GrayImage;

/// A named transformation in the catalogue.
#[derive(Clone, Copy)]
pub struct Strategy {
    pub name: &'static str,
    pub apply: StrategyFn,
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy").field("name", &self.name).finish()
    }
}

/// A transformed image tagged with the strategy that produced it.
#[derive(Clone, Debug)]
pub struct ImageVariant {
    pub strategy: &'static str,
    pub image: GrayImage,
}

/// All strategies, in tie-break order.
pub const CATALOGUE: &[Strategy] = &[
    Strategy { name: "otsu", apply: otsu_direct },
    Strategy { name: "otsu_inv", apply: otsu_inverted },
    Strategy { name: "adaptive_mean", apply: adaptive },
    Strategy { name: "blur_otsu", apply: blur_otsu },
    Strategy { name: "median_otsu", apply: median_otsu },
    Strategy { name: "morph_clean", apply: morph_clean },
    Strategy { name: "scale2_clahe", apply: scale2_clahe },
    Strategy { name: "scale3_sharpen", apply: scale3_sharpen },
    Strategy { name: "scale4_denoise", apply: scale4_denoise },
    Strategy { name: "scale5_clahe_sharpen", apply: scale5_clahe_sharpen },
    Strategy { name: "scale2_adaptive", apply: scale2_adaptive },
    Strategy { name: "hue_magenta", apply: hue_magenta },
    Strategy { name: "hue_red", apply: hue_red },
    Strategy { name: "hue_text", apply: hue_text },
    Strategy { name: "edge_dilate", apply: edge_dilate },
    Strategy { name: "background_suppress", apply: background_suppress },
    Strategy { name: "channel_union", apply: channel_union },
    Strategy { name: "channel_edges", apply: channel_edges },
    Strategy { name: "bright_text", apply: bright_text },
];

/// Runs one strategy, turning empty input, empty output and panics into errors.
pub fn run_strategy(strategy: &Strategy, source: &RgbaImage) -> Result<ImageVariant, TransformError> {
    if source.width() == 0 || source.height() == 0 {
        return Err(TransformError::EmptyInput);
    }

    let image = catch_unwind(AssertUnwindSafe(|| (strategy.apply)(source)))
        .map_err(|payload| TransformError::Panicked(panic_message(payload.as_ref())))?;

    if image.width() == 0 || image.height() == 0 {
        return Err(TransformError::Degenerate {
            width: image.width(),
            height: image.height(),
        });
    }

    Ok(ImageVariant {
        strategy: strategy.name,
        image,
    })
}

/// Applies every strategy in `catalogue` order, skipping the ones that fail.
pub fn generate_variants(source: &RgbaImage, catalogue: &[Strategy]) -> Vec<ImageVariant> {
    let variants: Vec<ImageVariant> = catalogue
        .iter()
        .filter_map(|strategy| match run_strategy(strategy, source) {
            Ok(variant) => Some(variant),
            Err(e) => {
                warn!("Strategy {} skipped: {}", strategy.name, e);
                None
            }
        })
        .collect();

    debug!("Generated {}/{} variants", variants.len(), catalogue.len());
    variants
}

fn otsu_direct(src: &RgbaImage) -> GrayImage {
    otsu(&to_gray(src), false)
}

fn otsu_inverted(src: &RgbaImage) -> GrayImage {
    otsu(&to_gray(src), true)
}

fn adaptive(src: &RgbaImage) -> GrayImage {
    adaptive_mean(&to_gray(src), 7, 5)
}

fn blur_otsu(src: &RgbaImage) -> GrayImage {
    otsu(&imageops::blur(&to_gray(src), 1.0), false)
}

fn median_otsu(src: &RgbaImage) -> GrayImage {
    otsu(&median_filter(&to_gray(src), 1, 1), false)
}

/// Otsu, then closing and opening on the ink to fill gaps and drop specks.
fn morph_clean(src: &RgbaImage) -> GrayImage {
    let ink = otsu(&to_gray(src), true);
    let cleaned = open(&close(&ink, Norm::LInf, 1), Norm::LInf, 1);
    inverted(&cleaned)
}

fn scale2_clahe(src: &RgbaImage) -> GrayImage {
    let big = upscale(&to_gray(src), 2, FilterType::CatmullRom);
    otsu(&clahe(&big, 8, 2.0), false)
}

fn scale3_sharpen(src: &RgbaImage) -> GrayImage {
    let big = upscale(&to_gray(src), 3, FilterType::CatmullRom);
    otsu(&imageops::unsharpen(&big, 1.0, 5), false)
}

fn scale4_denoise(src: &RgbaImage) -> GrayImage {
    let big = upscale(&to_gray(src), 4, FilterType::CatmullRom);
    otsu(&median_filter(&big, 2, 2), false)
}

fn scale5_clahe_sharpen(src: &RgbaImage) -> GrayImage {
    let big = upscale(&to_gray(src), 5, FilterType::CatmullRom);
    otsu(&imageops::unsharpen(&clahe(&big, 8, 2.0), 1.5, 3), false)
}

fn scale2_adaptive(src: &RgbaImage) -> GrayImage {
    let big = upscale(&to_gray(src), 2, FilterType::CatmullRom);
    adaptive_mean(&clahe(&big, 8, 2.0), 15, 7)
}

/// Masks the given hues, cleans the mask and returns it as dark ink on white.
fn hue_isolate(src: &RgbaImage, ranges: &[HueRange]) -> GrayImage {
    let mask = hue_mask(src, ranges, TEXT_MIN_SATURATION, TEXT_MIN_VALUE);
    let cleaned = open(&close(&mask, Norm::LInf, 1), Norm::LInf, 1);
    inverted(&cleaned)
}

fn hue_magenta(src: &RgbaImage) -> GrayImage {
    hue_isolate(src, MAGENTA_HUES)
}

fn hue_red(src: &RgbaImage) -> GrayImage {
    hue_isolate(src, RED_HUES)
}

fn hue_text(src: &RgbaImage) -> GrayImage {
    hue_isolate(src, TEXT_HUES)
}

fn edge_dilate(src: &RgbaImage) -> GrayImage {
    let edges = canny(&to_gray(src), CANNY_LOW, CANNY_HIGH);
    let thick = dilate(&edges, Norm::LInf, 1);
    threshold(&thick, 127, ThresholdType::BinaryInverted)
}

/// Whites out the known background hue before thresholding.
fn background_suppress(src: &RgbaImage) -> GrayImage {
    let background = hue_mask(src, BACKGROUND_HUES, BACKGROUND_MIN_SATURATION, TEXT_MIN_VALUE);
    let keep = inverted(&background);
    otsu(&mask_to_white(&to_gray(src), &keep), false)
}

/// Ink found by Otsu in any of the R, G, B channels.
fn channel_union(src: &RgbaImage) -> GrayImage {
    let mut ink = otsu(&channel(src, 0), true);
    for index in 1..3 {
        ink = union(&ink, &otsu(&channel(src, index), true));
    }
    inverted(&ink)
}

/// Edges found in any of the R, G, B channels, thickened.
fn channel_edges(src: &RgbaImage) -> GrayImage {
    let mut edges = canny(&channel(src, 0), CANNY_LOW, CANNY_HIGH);
    for index in 1..3 {
        edges = union(&edges, &canny(&channel(src, index), CANNY_LOW, CANNY_HIGH));
    }
    inverted(&dilate(&edges, Norm::LInf, 1))
}

fn bright_text(src: &RgbaImage) -> GrayImage {
    threshold_bright_pixels(src, BRIGHT_TEXT_THRESHOLD)
}
