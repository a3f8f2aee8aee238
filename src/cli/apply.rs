//! Apply command implementation.
//!
//! Loads an image, applies the rules and writes the result.

use std::path::PathBuf;

use clap::Args;

use crate::engine::{
    self, drive, Control, ExecutionMode, Job, Outcome, Progress, RunTracker, Slicing,
};
use crate::error::{RecolourError, Result};
use crate::output::{display_path, plural, Printer};
use crate::render::{default_output_path, load_bitmap, write_bitmap};
use crate::types::{Bitmap, ColourRule, RuleList};

use super::{describe_source, report_invalid, resolve_rules};

/// Apply colour rules to an image
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Image to recolour
    pub image: PathBuf,

    /// Rules file (default: recolour.yaml if present)
    #[arg(long, short)]
    pub rules: Option<PathBuf>,

    /// Extra rule as FROM:TO[:TOLERANCE] or FROM:transparent[:TOLERANCE]
    #[arg(long, value_name = "RULE")]
    pub rule: Vec<ColourRule>,

    /// Output file (default: <image>-recoloured.png)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Pixels processed per step
    #[arg(long)]
    pub chunk: Option<usize>,
}

pub fn run(args: ApplyArgs, printer: &Printer) -> Result<()> {
    let (settings, source) = resolve_rules(args.rules.as_deref(), &args.rule)?;
    let rules = settings.rule_list();

    if rules.is_empty() {
        return Err(RecolourError::Parse {
            message: "No rules given".to_string(),
            help: Some("Pass --rule FROM:TO:TOLERANCE or run `recolour init`".to_string()),
        });
    }

    let output = args
        .output
        .or(settings.output.clone())
        .unwrap_or_else(|| default_output_path(&args.image));

    let bitmap = load_bitmap(&args.image)?;
    printer.status(
        "Loaded",
        &format!(
            "{} ({}x{})",
            display_path(&args.image),
            bitmap.width(),
            bitmap.height()
        ),
    );
    printer.info(
        "Rules",
        &format!(
            "{} from {}",
            plural(rules.len(), "rule", "rules"),
            describe_source(source.as_deref())
        ),
    );
    report_invalid(&rules, printer);

    let slicing = args.chunk.map(Slicing::Pixels).unwrap_or_else(|| settings.slicing());
    let result = recolour(&bitmap, &rules, slicing)?;

    let changed = bitmap
        .pixels()
        .zip(result.pixels())
        .filter(|(before, after)| before != after)
        .count();
    printer.status("Recoloured", &plural(changed, "pixel", "pixels"));

    write_bitmap(&result, &output, rules.has_transparency())?;
    printer.success("Wrote", &display_path(&output));

    Ok(())
}

/// Run the engine, incrementally when the image spans more than one step.
fn recolour(bitmap: &Bitmap, rules: &RuleList, slicing: Slicing) -> Result<Bitmap> {
    match ExecutionMode::for_bitmap(bitmap, slicing) {
        ExecutionMode::Atomic => engine::apply(bitmap, rules.as_slice()),
        ExecutionMode::Incremental => {
            let tracker = RunTracker::new();
            let job = Job::start(&tracker, bitmap, rules.as_slice(), slicing);
            match drive(job, &mut |_: Progress| Control::Continue) {
                Outcome::Complete(result) => Ok(result),
                // Nothing else holds the tracker, so the run cannot go stale
                Outcome::Cancelled => engine::apply(bitmap, rules.as_slice()),
            }
        }
    }
}
