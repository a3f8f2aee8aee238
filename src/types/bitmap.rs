//! Decoded RGBA bitmaps.

use image::RgbaImage;

use crate::error::{RecolourError, Result};

/// Bytes per RGBA pixel.
pub const CHANNELS: usize = 4;

/// A decoded raster image: packed row-major RGBA, 8 bits per channel.
///
/// The buffer length is always `width * height * 4`; construction fails
/// otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Bitmap {
    /// Wrap an RGBA buffer, checking it against the dimensions.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        check_dimensions(width, height, pixels.len())?;
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Reassemble a bitmap whose buffer was produced from an already
    /// checked bitmap of the same dimensions.
    pub(crate) fn from_checked(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize * CHANNELS);
        Self {
            width,
            height,
            pixels,
        }
    }

    /// A bitmap filled with one RGBA value.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        let count = width as usize * height as usize;
        Self::new(width, height, rgba.repeat(count))
    }

    /// Build a bitmap from a list of RGBA pixels in row-major order.
    pub fn from_pixels(width: u32, height: u32, pixels: &[[u8; 4]]) -> Result<Self> {
        Self::new(width, height, pixels.concat())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of pixels.
    pub fn len(&self) -> usize {
        self.pixels.len() / CHANNELS
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// The raw RGBA buffer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.pixels
    }

    /// RGBA value of the pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        let p = &self.pixels[i..i + CHANNELS];
        Some([p[0], p[1], p[2], p[3]])
    }

    /// Iterate over pixels as RGBA arrays.
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 4]> + '_ {
        self.pixels
            .chunks_exact(CHANNELS)
            .map(|p| [p[0], p[1], p[2], p[3]])
    }

    /// Whether any pixel is not fully opaque.
    pub fn has_transparency(&self) -> bool {
        self.pixels.chunks_exact(CHANNELS).any(|p| p[3] != 255)
    }
}

impl TryFrom<RgbaImage> for Bitmap {
    type Error = RecolourError;

    fn try_from(img: RgbaImage) -> Result<Self> {
        let (width, height) = img.dimensions();
        Self::new(width, height, img.into_raw())
    }
}

impl From<Bitmap> for RgbaImage {
    fn from(bitmap: Bitmap) -> Self {
        let (width, height) = (bitmap.width, bitmap.height);
        // The length invariant guarantees the buffer fits
        RgbaImage::from_raw(width, height, bitmap.pixels)
            .unwrap_or_else(|| RgbaImage::new(width, height))
    }
}

/// Check that a buffer of `len` bytes holds exactly `width * height` RGBA
/// pixels and that neither dimension is zero.
pub fn check_dimensions(width: u32, height: u32, len: usize) -> Result<()> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(CHANNELS));

    match expected {
        Some(expected) if width > 0 && height > 0 && expected == len => Ok(()),
        expected => Err(RecolourError::Dimensions {
            width,
            height,
            expected: expected.unwrap_or(usize::MAX),
            actual: len,
        }),
    }
}
