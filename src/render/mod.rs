//! Codec boundary for recolour.
//!
//! Decoding turns files into bitmaps for the engine; encoding writes results
//! back out in a format that can hold whatever the rules produced.

mod codec;

pub use codec::{default_output_path, load_bitmap, output_format, supports_alpha, write_bitmap};
