//! Colour substitution engine.
//!
//! Each pixel is compared against the valid rules in list order and the
//! first rule within tolerance is applied. A pixel's outcome depends only on
//! its own RGB and the rule list, so a bitmap can be processed in one call
//! ([`apply`]) or in resumable slices ([`IncrementalRun`]) with byte-identical
//! results.

mod schedule;

use std::ops::Range;

use crate::error::Result;
use crate::types::{check_dimensions, distance, Bitmap, Colour, ColourRule, CHANNELS};

pub use schedule::{drive, Control, Host, Job, Outcome, Progress, RunToken, RunTracker, Turn};

/// Pixels processed per incremental step unless configured otherwise.
pub const DEFAULT_CHUNK_PIXELS: usize = 10_000;

/// What a matching rule does to a pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Overwrite RGB, keep alpha.
    Replace(Colour),
    /// Zero alpha, keep RGB.
    Transparent,
}

/// A rule with its colours parsed, ready for per-pixel matching.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompiledRule {
    pub from: Colour,
    pub tolerance: f64,
    pub action: Action,
}

impl CompiledRule {
    /// Compile a rule, or `None` if the engine should skip it.
    pub fn compile(rule: &ColourRule) -> Option<Self> {
        let from = rule.from_colour()?;
        let action = if rule.make_transparent {
            Action::Transparent
        } else {
            Action::Replace(rule.to_colour()?)
        };

        Some(Self {
            from,
            tolerance: rule.tolerance,
            action,
        })
    }

    /// Inclusive tolerance test.
    pub fn matches(&self, colour: Colour) -> bool {
        distance(colour, self.from) <= self.tolerance
    }
}

/// Compile the valid rules, preserving order. Invalid rules are dropped.
pub fn compile_rules<'a>(rules: impl IntoIterator<Item = &'a ColourRule>) -> Vec<CompiledRule> {
    rules.into_iter().filter_map(CompiledRule::compile).collect()
}

/// Apply the first matching rule, if any, to one RGBA pixel.
///
/// Returns true if the pixel was changed by a rule.
pub fn substitute_pixel(pixel: &mut [u8; CHANNELS], rules: &[CompiledRule]) -> bool {
    let colour = Colour::rgb(pixel[0], pixel[1], pixel[2]);

    let Some(rule) = rules.iter().find(|r| r.matches(colour)) else {
        return false;
    };

    match rule.action {
        Action::Transparent => pixel[3] = 0,
        Action::Replace(to) => pixel[..3].copy_from_slice(&to.to_rgb()),
    }
    true
}

/// Substitute the pixels with indices in `range` (pixel indices, not bytes).
///
/// The range is clamped to the buffer. Returns the number of pixels changed.
pub fn substitute_range(pixels: &mut [u8], range: Range<usize>, rules: &[CompiledRule]) -> usize {
    let total = pixels.len() / CHANNELS;
    let end = range.end.min(total);
    let start = range.start.min(end);

    if rules.is_empty() {
        return 0;
    }

    pixels[start * CHANNELS..end * CHANNELS]
        .chunks_exact_mut(CHANNELS)
        .filter_map(|chunk| <&mut [u8; CHANNELS]>::try_from(chunk).ok())
        .map(|pixel| substitute_pixel(pixel, rules))
        .filter(|&changed| changed)
        .count()
}

/// Apply `rules` to `bitmap` in one call, returning a new bitmap.
pub fn apply(bitmap: &Bitmap, rules: &[ColourRule]) -> Result<Bitmap> {
    apply_raw(bitmap.width(), bitmap.height(), bitmap.as_bytes(), rules)
}

/// Apply `rules` to a raw RGBA buffer.
///
/// Fails if `pixels` is not exactly `width * height * 4` bytes; nothing is
/// written in that case.
pub fn apply_raw(width: u32, height: u32, pixels: &[u8], rules: &[ColourRule]) -> Result<Bitmap> {
    check_dimensions(width, height, pixels.len())?;

    let compiled = compile_rules(rules);
    let mut output = pixels.to_vec();
    let total = output.len() / CHANNELS;
    substitute_range(&mut output, 0..total, &compiled);

    Ok(Bitmap::from_checked(width, height, output))
}

/// How an incremental run divides the bitmap into steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slicing {
    /// A fixed number of pixels per step.
    Pixels(usize),
    /// A fixed number of whole rows per step.
    Rows(u32),
}

impl Default for Slicing {
    fn default() -> Self {
        Slicing::Pixels(DEFAULT_CHUNK_PIXELS)
    }
}

impl Slicing {
    /// Pixels per step for a bitmap `width` pixels wide. Never zero.
    pub fn pixels_per_step(self, width: u32) -> usize {
        let n = match self {
            Slicing::Pixels(n) => n,
            Slicing::Rows(rows) => rows as usize * width as usize,
        };
        n.max(1)
    }
}

/// Whether a bitmap is processed in one call or incrementally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Atomic,
    Incremental,
}

impl ExecutionMode {
    /// Atomic when the bitmap fits in a single step.
    pub fn for_bitmap(bitmap: &Bitmap, slicing: Slicing) -> Self {
        if bitmap.len() <= slicing.pixels_per_step(bitmap.width()) {
            ExecutionMode::Atomic
        } else {
            ExecutionMode::Incremental
        }
    }
}

/// A resumable substitution over a private copy of the source pixels.
///
/// Each [`step`](Self::step) processes the next slice in increasing pixel
/// order. The only state between steps is the cursor.
#[derive(Debug, Clone)]
pub struct IncrementalRun {
    width: u32,
    height: u32,
    output: Vec<u8>,
    rules: Vec<CompiledRule>,
    cursor: usize,
    step: usize,
}

impl IncrementalRun {
    pub fn new(bitmap: &Bitmap, rules: &[ColourRule], slicing: Slicing) -> Self {
        Self {
            width: bitmap.width(),
            height: bitmap.height(),
            output: bitmap.as_bytes().to_vec(),
            rules: compile_rules(rules),
            cursor: 0,
            step: slicing.pixels_per_step(bitmap.width()),
        }
    }

    /// Start a run over a raw RGBA buffer, checking its length first.
    pub fn from_raw(
        width: u32,
        height: u32,
        pixels: &[u8],
        rules: &[ColourRule],
        slicing: Slicing,
    ) -> Result<Self> {
        check_dimensions(width, height, pixels.len())?;
        Ok(Self {
            width,
            height,
            output: pixels.to_vec(),
            rules: compile_rules(rules),
            cursor: 0,
            step: slicing.pixels_per_step(width),
        })
    }

    /// Process the next slice, returning the pixel range it covered, or
    /// `None` once every pixel has been processed.
    pub fn step(&mut self) -> Option<Range<usize>> {
        let total = self.total();
        if self.cursor >= total {
            return None;
        }

        let range = self.cursor..(self.cursor + self.step).min(total);
        substitute_range(&mut self.output, range.clone(), &self.rules);
        self.cursor = range.end;
        Some(range)
    }

    /// Pixels processed so far.
    pub fn processed(&self) -> usize {
        self.cursor
    }

    /// Total pixels in the bitmap.
    pub fn total(&self) -> usize {
        self.output.len() / CHANNELS
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= self.total()
    }

    /// The partially processed buffer. Pixels at and after
    /// [`processed`](Self::processed) still hold source values.
    pub fn snapshot(&self) -> &[u8] {
        &self.output
    }

    /// The finished bitmap, or `None` if slices remain.
    pub fn finish(self) -> Option<Bitmap> {
        if self.is_complete() {
            Some(Bitmap::from_checked(self.width, self.height, self.output))
        } else {
            None
        }
    }

    /// Process every remaining slice and return the finished bitmap.
    pub fn run_to_end(mut self) -> Bitmap {
        while self.step().is_some() {}
        Bitmap::from_checked(self.width, self.height, self.output)
    }
}

impl Iterator for IncrementalRun {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        self.step()
    }
}
