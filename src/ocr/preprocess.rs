//! Image primitives shared by the variant catalogue and the region detector.
//!
//! Binary outputs use 255 for background and 0 for ink unless a function
//! says otherwise. Hue values follow the 0-179 half-degree convention.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbaImage};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::definitions::Image;
use imageproc::integral_image::{integral_image, sum_image_pixels};

/// Inclusive hue interval on the 0-179 scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HueRange {
    pub min: u8,
    pub max: u8,
}

impl HueRange {
    pub const fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, hue: u8) -> bool {
        hue >= self.min && hue <= self.max
    }
}

/// Light-text binarization: pixels brighter than `threshold` in all three
/// channels become black ink, everything else white.
pub fn threshold_bright_pixels(img: &RgbaImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let p = img.get_pixel(x, y);
        let bright = p[0] > threshold && p[1] > threshold && p[2] > threshold;
        Luma([if bright { 0 } else { 255 }])
    })
}

pub fn to_gray(img: &RgbaImage) -> GrayImage {
    imageops::grayscale(img)
}

/// Global binarization at the Otsu level.
pub fn otsu(img: &GrayImage, invert: bool) -> GrayImage {
    let kind = if invert {
        ThresholdType::BinaryInverted
    } else {
        ThresholdType::Binary
    };
    threshold(img, otsu_level(img), kind)
}

/// Local mean binarization over a `(2r+1)^2` window.
///
/// A pixel is white when it is brighter than the local mean minus `offset`.
pub fn adaptive_mean(img: &GrayImage, block_radius: u32, offset: i32) -> GrayImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return img.clone();
    }
    let integral: Image<Luma<u64>> = integral_image(img);

    GrayImage::from_fn(w, h, |x, y| {
        let left = x.saturating_sub(block_radius);
        let top = y.saturating_sub(block_radius);
        let right = (x + block_radius).min(w - 1);
        let bottom = (y + block_radius).min(h - 1);

        let [sum] = sum_image_pixels(&integral, left, top, right, bottom);
        let count = ((right - left + 1) * (bottom - top + 1)) as f64;
        let mean = sum as f64 / count;

        let value = img.get_pixel(x, y)[0] as f64;
        Luma([if value > mean - offset as f64 { 255 } else { 0 }])
    })
}

/// Contrast-limited adaptive histogram equalization.
///
/// The image is split into roughly `tiles x tiles` cells, each cell's
/// histogram is clipped at `clip_limit` times the uniform bin height, and the
/// per-cell mappings are bilinearly blended between cell centres.
pub fn clahe(img: &GrayImage, tiles: u32, clip_limit: f32) -> GrayImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return img.clone();
    }

    let tile_w = w.div_ceil(tiles.clamp(1, w));
    let tile_h = h.div_ceil(tiles.clamp(1, h));
    let tiles_x = w.div_ceil(tile_w);
    let tiles_y = h.div_ceil(tile_h);

    let mut luts = vec![[0u8; 256]; (tiles_x * tiles_y) as usize];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(w);
            let y1 = (y0 + tile_h).min(h);

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[img.get_pixel(x, y)[0] as usize] += 1;
                }
            }

            let area = (x1 - x0) * (y1 - y0);
            let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);
            let mut excess = 0u32;
            for bin in hist.iter_mut() {
                if *bin > limit {
                    excess += *bin - limit;
                    *bin = limit;
                }
            }
            let bonus = excess / 256;
            for bin in hist.iter_mut() {
                *bin += bonus;
            }

            let total: u32 = hist.iter().sum();
            let lut = &mut luts[(ty * tiles_x + tx) as usize];
            let mut cdf = 0u32;
            for (value, bin) in hist.iter().enumerate() {
                cdf += bin;
                lut[value] = ((cdf as f32 / total.max(1) as f32) * 255.0).round() as u8;
            }
        }
    }

    // Neighbouring cell indices and blend weight along one axis
    let cell = |pos: u32, size: u32, count: u32| -> (u32, u32, f32) {
        let f = (pos as f32 + 0.5) / size as f32 - 0.5;
        let t0 = (f.floor().max(0.0) as u32).min(count - 1);
        let t1 = (t0 + 1).min(count - 1);
        (t0, t1, (f - t0 as f32).clamp(0.0, 1.0))
    };

    GrayImage::from_fn(w, h, |x, y| {
        let (tx0, tx1, ax) = cell(x, tile_w, tiles_x);
        let (ty0, ty1, ay) = cell(y, tile_h, tiles_y);
        let v = img.get_pixel(x, y)[0] as usize;

        let lut = |tx: u32, ty: u32| luts[(ty * tiles_x + tx) as usize][v] as f32;
        let top = lut(tx0, ty0) * (1.0 - ax) + lut(tx1, ty0) * ax;
        let bottom = lut(tx0, ty1) * (1.0 - ax) + lut(tx1, ty1) * ax;
        Luma([(top * (1.0 - ay) + bottom * ay).round().clamp(0.0, 255.0) as u8])
    })
}

/// Scales both dimensions by an integer factor.
pub fn upscale(img: &GrayImage, factor: u32, filter: FilterType) -> GrayImage {
    imageops::resize(img, img.width() * factor, img.height() * factor, filter)
}

/// Converts an RGB triple to `[hue 0-179, saturation 0-255, value 0-255]`.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let saturation = if max == 0.0 { 0.0 } else { 255.0 * delta / max };
    let mut hue = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    if hue < 0.0 {
        hue += 360.0;
    }

    [
        ((hue / 2.0).round() as u32 % 180) as u8,
        saturation.round() as u8,
        max as u8,
    ]
}

/// White where the pixel's hue falls in any range and saturation/value reach
/// the given floors, black elsewhere.
pub fn hue_mask(img: &RgbaImage, ranges: &[HueRange], min_saturation: u8, min_value: u8) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let p = img.get_pixel(x, y);
        let [hue, sat, val] = rgb_to_hsv(p[0], p[1], p[2]);
        let hit = sat >= min_saturation && val >= min_value && ranges.iter().any(|r| r.contains(hue));
        Luma([if hit { 255 } else { 0 }])
    })
}

pub fn inverted(img: &GrayImage) -> GrayImage {
    let mut out = img.clone();
    imageops::invert(&mut out);
    out
}

/// Pixel-wise logical OR of two binary images of equal size.
pub fn union(a: &GrayImage, b: &GrayImage) -> GrayImage {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        Luma([a.get_pixel(x, y)[0].max(b.get_pixel(x, y)[0])])
    })
}

/// Keeps `img` where `keep` is set and paints white elsewhere.
pub fn mask_to_white(img: &GrayImage, keep: &GrayImage) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        if keep.get_pixel(x, y)[0] > 0 {
            *img.get_pixel(x, y)
        } else {
            Luma([255])
        }
    })
}

/// Extracts one colour channel (0 = R, 1 = G, 2 = B) as a grayscale image.
pub fn channel(img: &RgbaImage, index: usize) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| Luma([img.get_pixel(x, y)[index]]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_threshold_bright_pixels() {
        let mut img = RgbaImage::new(3, 1);
        img.put_pixel(0, 0, Rgba([100, 100, 100, 255]));
        img.put_pixel(1, 0, Rgba([250, 250, 250, 255]));
        img.put_pixel(2, 0, Rgba([250, 250, 100, 255]));

        let result = threshold_bright_pixels(&img, 190);

        assert_eq!(result.get_pixel(0, 0)[0], 255, "Dark pixel should become white");
        assert_eq!(result.get_pixel(1, 0)[0], 0, "Bright pixel should become black");
        assert_eq!(result.get_pixel(2, 0)[0], 255, "Partially dark pixel should become white");
    }

    #[test]
    fn test_otsu_separates_two_levels() {
        let img = GrayImage::from_fn(20, 10, |x, _| Luma([if x < 10 { 30 } else { 220 }]));
        let out = otsu(&img, false);

        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(19, 0)[0], 255);

        let inverse = otsu(&img, true);
        assert_eq!(inverse.get_pixel(0, 0)[0], 255);
        assert_eq!(inverse.get_pixel(19, 0)[0], 0);
    }

    #[test]
    fn test_adaptive_mean_uniform_is_white() {
        let img = GrayImage::from_pixel(16, 16, Luma([120]));
        let out = adaptive_mean(&img, 3, 5);
        assert!(out.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_adaptive_mean_empty_image() {
        let out = adaptive_mean(&GrayImage::new(0, 0), 3, 5);
        assert_eq!(out.dimensions(), (0, 0));
    }

    #[test]
    fn test_adaptive_mean_marks_dark_stroke() {
        let img = GrayImage::from_fn(15, 15, |x, _| Luma([if x == 7 { 20 } else { 200 }]));
        let out = adaptive_mean(&img, 3, 5);

        assert_eq!(out.get_pixel(7, 7)[0], 0);
        assert_eq!(out.get_pixel(0, 7)[0], 255);
    }

    #[test]
    fn test_clahe_preserves_size_and_spreads_contrast() {
        let img = GrayImage::from_fn(40, 20, |x, _| Luma([100 + (x % 4) as u8 * 5]));
        let out = clahe(&img, 4, 2.0);

        assert_eq!(out.dimensions(), (40, 20));
        let min = out.pixels().map(|p| p[0]).min().unwrap();
        let max = out.pixels().map(|p| p[0]).max().unwrap();
        assert!(max - min > 15, "expected stretched range, got {}..{}", min, max);
    }

    #[test]
    fn test_clahe_tiny_image() {
        let img = GrayImage::from_pixel(3, 2, Luma([50]));
        assert_eq!(clahe(&img, 8, 2.0).dimensions(), (3, 2));
    }

    #[test]
    fn test_rgb_to_hsv_primaries() {
        assert_eq!(rgb_to_hsv(255, 0, 0), [0, 255, 255]);
        assert_eq!(rgb_to_hsv(0, 255, 0), [60, 255, 255]);
        assert_eq!(rgb_to_hsv(0, 0, 255), [120, 255, 255]);
        assert_eq!(rgb_to_hsv(255, 0, 255), [150, 255, 255]);
        assert_eq!(rgb_to_hsv(128, 128, 128), [0, 0, 128]);
    }

    #[test]
    fn test_hue_mask_selects_magenta() {
        let mut img = RgbaImage::from_pixel(2, 1, Rgba([255, 0, 255, 255]));
        img.put_pixel(1, 0, Rgba([0, 255, 0, 255]));

        let mask = hue_mask(&img, &[HueRange::new(140, 170)], 60, 60);
        assert_eq!(mask.as_raw(), &vec![255, 0]);
    }

    #[test]
    fn test_union_and_mask_to_white() {
        let a = GrayImage::from_raw(3, 1, vec![255, 0, 0]).unwrap();
        let b = GrayImage::from_raw(3, 1, vec![0, 0, 255]).unwrap();
        assert_eq!(union(&a, &b).as_raw(), &vec![255, 0, 255]);

        let img = GrayImage::from_raw(3, 1, vec![10, 20, 30]).unwrap();
        assert_eq!(mask_to_white(&img, &a).as_raw(), &vec![10, 255, 255]);
    }
}
