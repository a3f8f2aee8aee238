//! Pick command implementation.
//!
//! Prints the colour under a pixel as `#rrggbb`, ready to paste into a rule.

use std::path::PathBuf;

use clap::Args;

use crate::error::{RecolourError, Result};
use crate::output::{display_path, Printer};
use crate::picker::{PickColour, Point};
use crate::render::load_bitmap;

/// Print the colour of a pixel
#[derive(Args, Debug)]
pub struct PickArgs {
    /// Image to sample
    pub image: PathBuf,

    /// Column, from the left edge
    pub x: u32,

    /// Row, from the top edge
    pub y: u32,
}

pub fn run(args: PickArgs, printer: &Printer) -> Result<()> {
    let bitmap = load_bitmap(&args.image)?;
    let point = Point::new(args.x, args.y);

    let colour = bitmap.pick_colour_at(point).ok_or_else(|| RecolourError::Parse {
        message: format!(
            "({}, {}) is outside {} ({}x{})",
            args.x,
            args.y,
            display_path(&args.image),
            bitmap.width(),
            bitmap.height()
        ),
        help: None,
    })?;

    printer.status(
        "Sampled",
        &format!("({}, {}) of {}", args.x, args.y, display_path(&args.image)),
    );
    println!("{}", colour);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::write_bitmap;
    use crate::types::Bitmap;
    use tempfile::tempdir;

    fn image(dir: &std::path::Path) -> PathBuf {
        let path = dir.join("pick.png");
        let bitmap = Bitmap::from_pixels(2, 1, &[[0, 0, 0, 255], [0x12, 0x34, 0x56, 255]]).unwrap();
        write_bitmap(&bitmap, &path, false).unwrap();
        path
    }

    #[test]
    fn test_pick_inside() {
        let dir = tempdir().unwrap();
        let args = PickArgs {
            image: image(dir.path()),
            x: 1,
            y: 0,
        };
        assert!(run(args, &Printer::plain()).is_ok());
    }

    #[test]
    fn test_pick_outside() {
        let dir = tempdir().unwrap();
        let args = PickArgs {
            image: image(dir.path()),
            x: 0,
            y: 1,
        };
        assert!(run(args, &Printer::plain()).is_err());
    }
}
