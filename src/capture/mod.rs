//! Capture region resolution and pixel capture.
//!
//! This module provides:
//! - Coordinate-space tagged rectangles and padding (`rect`)
//! - The Region Resolver (`region`) and the hue-based detector (`detect`)
//! - The capture collaborator trait and a still-image source (`source`)
//! - Window discovery and GDI capture on Windows (`window`, `screenshot`)

pub mod detect;
pub mod rect;
pub mod region;
#[cfg(windows)]
pub mod screenshot;
pub mod source;
#[cfg(windows)]
pub mod window;

pub use detect::{HueRegionDetector, RegionDetector};
pub use rect::{CaptureRect, ClientPoint, CoordSpace, PixelRect};
pub use region::{RegionMethod, RegionResolver, ResolvedRegion};
pub use source::{CaptureSource, StillImageCapture, WindowHandle, WindowState};
