//! Colour type, hex parsing and RGB distance.

use std::fmt;
use std::str::FromStr;

use crate::error::{RecolourError, Result};

/// An RGB colour value. Alpha is carried by the bitmap, never by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Colour {
    /// Create a new colour from RGB components.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    /// White.
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Red.
    pub const RED: Self = Self::rgb(255, 0, 0);

    /// Green.
    pub const GREEN: Self = Self::rgb(0, 255, 0);

    /// Parse a `#RRGGBB` hex colour, reporting why it was rejected.
    ///
    /// The leading `#` is optional and digits are case-insensitive. Short
    /// forms, alpha suffixes and named colours are not accepted.
    pub fn from_hex(s: &str) -> Result<Self> {
        let hex = s.strip_prefix('#').unwrap_or(s);

        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(RecolourError::Parse {
                message: format!("Invalid hex colour: {:?}", s),
                help: Some("Use six hex digits, e.g. #ff0000".to_string()),
            });
        }

        Ok(Self::rgb(
            parse_hex_byte(&hex[0..2])?,
            parse_hex_byte(&hex[2..4])?,
            parse_hex_byte(&hex[4..6])?,
        ))
    }

    /// Build a colour from the RGB channels of an RGBA pixel.
    pub fn from_rgba(pixel: [u8; 4]) -> Self {
        Self::rgb(pixel[0], pixel[1], pixel[2])
    }

    /// Convert to an RGB array.
    pub fn to_rgb(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl FromStr for Colour {
    type Err = RecolourError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Parse colour text, returning `None` for anything that is not `#RRGGBB`.
pub fn parse_colour(text: &str) -> Option<Colour> {
    Colour::from_hex(text).ok()
}

/// Euclidean distance between two colours in RGB space.
///
/// Ranges from 0 (identical) to about 441.67 (black to white).
pub fn distance(a: Colour, b: Colour) -> f64 {
    let dr = f64::from(a.r) - f64::from(b.r);
    let dg = f64::from(a.g) - f64::from(b.g);
    let db = f64::from(a.b) - f64::from(b.b);
    (dr * dr + dg * dg + db * db).sqrt()
}

/// Parse a two-character hex byte.
fn parse_hex_byte(s: &str) -> Result<u8> {
    u8::from_str_radix(s, 16).map_err(|_| RecolourError::Parse {
        message: format!("Invalid hex byte: {}", s),
        help: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex_6digit() {
        let c = Colour::from_hex("#FF0000").unwrap();
        assert_eq!(c, Colour::RED);

        let c = Colour::from_hex("#1a1a2e").unwrap();
        assert_eq!(c, Colour::rgb(0x1a, 0x1a, 0x2e));
    }

    #[test]
    fn test_from_hex_no_hash() {
        assert_eq!(Colour::from_hex("00ff00").unwrap(), Colour::GREEN);
    }

    #[test]
    fn test_from_hex_mixed_case() {
        assert_eq!(Colour::from_hex("#aBcDeF").unwrap(), Colour::rgb(0xab, 0xcd, 0xef));
    }

    #[test]
    fn test_parse_colour_rejects_other_formats() {
        assert_eq!(parse_colour("#f00"), None);
        assert_eq!(parse_colour("#ff000080"), None);
        assert_eq!(parse_colour("red"), None);
        assert_eq!(parse_colour("notacolor"), None);
        assert_eq!(parse_colour(""), None);
        assert_eq!(parse_colour("#"), None);
        assert_eq!(parse_colour("##ff0000"), None);
        assert_eq!(parse_colour(" #ff0000"), None);
        assert_eq!(parse_colour("#ff00zz"), None);
        assert_eq!(parse_colour("+fff00f"), None);
    }

    #[test]
    fn test_parse_colour_rejects_multibyte() {
        // Six bytes but not six hex digits
        assert_eq!(parse_colour("#ééé"), None);
    }

    #[test]
    fn test_from_hex_error_has_help() {
        match Colour::from_hex("#abc") {
            Err(RecolourError::Parse { help, .. }) => assert!(help.is_some()),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_display_round_trip() {
        let c = Colour::rgb(0x0a, 0xbc, 0xff);
        assert_eq!(c.to_string(), "#0abcff");
        assert_eq!(c.to_string().parse::<Colour>().unwrap(), c);
    }

    #[test]
    fn test_distance_identical_is_zero() {
        assert_eq!(distance(Colour::RED, Colour::RED), 0.0);
    }

    #[test]
    fn test_distance_single_channel() {
        assert_eq!(distance(Colour::RED, Colour::rgb(10, 0, 0)), 245.0);
    }

    #[test]
    fn test_distance_black_to_white() {
        let d = distance(Colour::BLACK, Colour::WHITE);
        assert!((d - 441.672_955_930_063_7).abs() < 1e-9);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = Colour::rgb(12, 200, 7);
        let b = Colour::rgb(90, 3, 250);
        assert_eq!(distance(a, b), distance(b, a));
    }
}
