//! Rectangles tagged with the coordinate space they are expressed in.
//!
//! Screen-space rectangles are relative to the virtual desktop origin,
//! client-space rectangles to the target window's content area. Keeping the
//! space on the value stops resolver, capture and input stages from mixing them.

use serde::{Deserialize, Serialize};

/// Coordinate space of a rectangle or point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordSpace {
    Screen,
    Client,
}

impl std::fmt::Display for CoordSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoordSpace::Screen => write!(f, "screen"),
            CoordSpace::Client => write!(f, "client"),
        }
    }
}

/// An untagged pixel rectangle as stored in the configuration file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Builds a rectangle from two corners given in any order.
    pub fn from_corners(a: (i32, i32), b: (i32, i32)) -> Self {
        let left = a.0.min(b.0);
        let top = a.1.min(b.1);
        Self {
            x: left,
            y: top,
            width: a.0.max(b.0) - left,
            height: a.1.max(b.1) - top,
        }
    }

    pub fn in_space(self, space: CoordSpace) -> CaptureRect {
        CaptureRect {
            space,
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }
}

/// A point in the target window's client area.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientPoint {
    pub x: i32,
    pub y: i32,
}

impl ClientPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Unset points are stored as the origin.
    pub fn is_origin(&self) -> bool {
        self.x == 0 && self.y == 0
    }
}

/// A capture rectangle together with its coordinate space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureRect {
    pub space: CoordSpace,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl CaptureRect {
    pub fn screen(x: i32, y: i32, width: i32, height: i32) -> Self {
        PixelRect::new(x, y, width, height).in_space(CoordSpace::Screen)
    }

    pub fn client(x: i32, y: i32, width: i32, height: i32) -> Self {
        PixelRect::new(x, y, width, height).in_space(CoordSpace::Client)
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Intersects with `bounds`. Returns `None` when the spaces differ or
    /// nothing of the rectangle lies inside the bounds.
    pub fn clamp_to(&self, bounds: &CaptureRect) -> Option<CaptureRect> {
        if self.space != bounds.space {
            return None;
        }

        let left = self.x.max(bounds.x);
        let top = self.y.max(bounds.y);
        let right = self.right().min(bounds.right());
        let bottom = self.bottom().min(bounds.bottom());

        let clamped = CaptureRect {
            space: self.space,
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
        };
        clamped.is_valid().then_some(clamped)
    }

    /// Expands by `max(2, width/8)` horizontally and `max(2, height/6)`
    /// vertically on each side, then clamps to `bounds`.
    pub fn padded(&self, bounds: &CaptureRect) -> Option<CaptureRect> {
        let pad_x = (self.width / 8).max(2);
        let pad_y = (self.height / 6).max(2);

        let grown = CaptureRect {
            space: self.space,
            x: self.x - pad_x,
            y: self.y - pad_y,
            width: self.width + 2 * pad_x,
            height: self.height + 2 * pad_y,
        };
        grown.clamp_to(bounds)
    }
}

impl std::fmt::Display for CaptureRect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}, {}) {}x{}",
            self.space, self.x, self.y, self.width, self.height
        )
    }
}
