//! Core domain types for recolour.
//!
//! - `Colour` - RGB colour values, hex parsing and distance
//! - `ColourRule` / `RuleList` - ordered substitution rules
//! - `Bitmap` - decoded RGBA images

mod bitmap;
mod colour;
mod rule;

pub use bitmap::{check_dimensions, Bitmap, CHANNELS};
pub use colour::{distance, parse_colour, Colour};
pub use rule::{ColourRule, RuleEdit, RuleList, DEFAULT_TOLERANCE};
