//! Coordinate transformation between viewer space and PDF content space
//!
//! The frontend draws in what-the-user-sees space: top-left origin, after
//! the page's `/Rotate` has been applied. Page content streams are defined
//! pre-rotation with a bottom-left origin. This module is the single seam
//! reconciling the two; every drawing call goes through it exactly once.

use shared_types::{Point, ViewportOverride};

/// Cardinal page rotation as stored in the PDF `/Rotate` entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Rotation {
    #[default]
    None,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Normalize a stored `/Rotate` value. Negative multiples of 90 wrap
    /// (−90 ≡ 270); anything off the cardinal grid falls back to no
    /// rotation rather than failing the page.
    pub fn from_degrees(degrees: i64) -> Self {
        match degrees.rem_euclid(360) {
            90 => Rotation::Deg90,
            180 => Rotation::Deg180,
            270 => Rotation::Deg270,
            _ => Rotation::None,
        }
    }

    /// Quarter-turn rotations swap the rendered width/height relative to
    /// the unrotated media box.
    pub fn swaps_axes(&self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

/// One page's transform context: the unrotated media box dimensions, the
/// stored rotation, and the rotated viewport height the viewer rendered
/// into (needed by the 270° mapping).
#[derive(Debug, Clone, Copy)]
pub struct PageFrame {
    content_w: f64,
    content_h: f64,
    rotation: Rotation,
    viewport_h: f64,
}

impl PageFrame {
    /// `content_w`/`content_h` are the media box as stored, never swapped.
    /// The rotated viewport height comes from the frontend override when
    /// present, otherwise from the media box (axes swapped for 90/270).
    pub fn new(
        content_w: f64,
        content_h: f64,
        rotation: Rotation,
        viewport: &ViewportOverride,
    ) -> Self {
        let viewport_h = viewport.height.unwrap_or(if rotation.swaps_axes() {
            content_w
        } else {
            content_h
        });
        Self {
            content_w,
            content_h,
            rotation,
            viewport_h,
        }
    }

    /// Map a viewer-space point (top-left origin, post-rotation) into PDF
    /// content space (bottom-left origin, unrotated).
    pub fn to_content_space(&self, p: Point) -> Point {
        match self.rotation {
            Rotation::None => Point::new(p.x, self.content_h - p.y),
            Rotation::Deg90 => Point::new(p.y, self.content_w - p.x),
            Rotation::Deg180 => Point::new(self.content_w - p.x, p.y),
            Rotation::Deg270 => Point::new(self.viewport_h - p.y, self.content_h - p.x),
        }
    }

    /// Inverse of [`to_content_space`](Self::to_content_space), used for
    /// hit-testing stored annotations against viewer clicks.
    pub fn from_content_space(&self, p: Point) -> Point {
        match self.rotation {
            Rotation::None => Point::new(p.x, self.content_h - p.y),
            Rotation::Deg90 => Point::new(self.content_w - p.y, p.x),
            Rotation::Deg180 => Point::new(self.content_w - p.x, p.y),
            Rotation::Deg270 => Point::new(self.content_h - p.y, self.viewport_h - p.x),
        }
    }
}
