//! Image decoding and encoding at the edges of the engine.
//!
//! The output format comes from the file extension. When a transparency
//! rule is active the format must be able to carry alpha; otherwise the
//! result is flattened to RGB for formats without an alpha channel.

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::error::{RecolourError, Result};
use crate::types::Bitmap;

/// Decode an image file into an RGBA bitmap.
pub fn load_bitmap(path: &Path) -> Result<Bitmap> {
    let img = image::open(path)
        .map_err(|e| RecolourError::Io {
            path: path.to_path_buf(),
            message: format!("Failed to decode image: {}", e),
        })?
        .to_rgba8();

    Bitmap::try_from(img)
}

/// Encode `bitmap` to `path`.
///
/// `needs_alpha` is set when any active rule makes pixels transparent; the
/// write is refused for formats that would drop the alpha channel.
pub fn write_bitmap(bitmap: &Bitmap, path: &Path, needs_alpha: bool) -> Result<()> {
    let format = output_format(path)?;

    if needs_alpha && !supports_alpha(format) {
        return Err(RecolourError::Encode {
            message: format!("{} cannot store transparency", path.display()),
            help: Some("Write a lossless format with alpha, e.g. a .png file".to_string()),
        });
    }

    let img: RgbaImage = bitmap.clone().into();
    let result = if supports_alpha(format) {
        img.save_with_format(path, format)
    } else {
        DynamicImage::ImageRgba8(img)
            .to_rgb8()
            .save_with_format(path, format)
    };

    result.map_err(|e| RecolourError::Io {
        path: path.to_path_buf(),
        message: format!("Failed to write image: {}", e),
    })
}

/// Format implied by a path's extension.
pub fn output_format(path: &Path) -> Result<ImageFormat> {
    ImageFormat::from_path(path).map_err(|_| RecolourError::Encode {
        message: format!("Unknown image format for {}", path.display()),
        help: Some("Use an extension such as .png, .webp or .jpg".to_string()),
    })
}

/// Whether `format` keeps an alpha channel when written.
pub fn supports_alpha(format: ImageFormat) -> bool {
    matches!(
        format,
        ImageFormat::Png
            | ImageFormat::WebP
            | ImageFormat::Tiff
            | ImageFormat::Tga
            | ImageFormat::Bmp
            | ImageFormat::Ico
            | ImageFormat::Qoi
    )
}

/// `photo.jpg` → `photo-recoloured.png`, next to the input.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");

    input.with_file_name(format!("{}-recoloured.png", stem))
}
