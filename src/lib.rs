//! recolour - Tolerance-based colour replacement for raster images
//!
//! A library for swapping colours in decoded RGBA bitmaps using ordered,
//! first-match-wins rules, with an incremental engine mode for keeping an
//! interactive preview responsive.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod picker;
pub mod pipeline;
pub mod render;
pub mod types;

pub use config::{RulesFile, RULES_FILENAME};
pub use engine::{
    apply, apply_raw, compile_rules, drive, CompiledRule, Control, ExecutionMode, Host,
    IncrementalRun, Job, Outcome, Progress, RunToken, RunTracker, Slicing, Turn,
    DEFAULT_CHUNK_PIXELS,
};
pub use error::{RecolourError, Result};
pub use picker::{PickColour, Point};
pub use pipeline::{Preview, PreviewState};
pub use render::{default_output_path, load_bitmap, write_bitmap};
pub use types::{distance, parse_colour, Bitmap, Colour, ColourRule, RuleEdit, RuleList};
