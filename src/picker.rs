//! Colour picking from an image surface.

use crate::types::{Bitmap, Colour};

/// A pixel coordinate, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Something that can report the colour under a coordinate.
///
/// Hosts with their own surfaces (a window, a canvas) implement this to feed
/// picked colours into rules.
pub trait PickColour {
    /// The RGB colour at `point`, or `None` when it lies outside the surface.
    fn pick_colour_at(&self, point: Point) -> Option<Colour>;
}

impl PickColour for Bitmap {
    fn pick_colour_at(&self, point: Point) -> Option<Colour> {
        self.pixel(point.x, point.y).map(Colour::from_rgba)
    }
}
