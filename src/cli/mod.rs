pub mod apply;
pub mod completions;
pub mod init;
pub mod pick;
pub mod watch;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::config::{RulesFile, RULES_FILENAME};
use crate::error::Result;
use crate::output::{display_path, Printer};
use crate::types::{ColourRule, RuleList};

/// recolour - Replace colours in images within a tolerance
#[derive(Parser, Debug)]
#[command(name = "recolour")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply colour rules to an image
    Apply(apply::ApplyArgs),

    /// Re-apply rules whenever the rules file or image changes
    Watch(watch::WatchArgs),

    /// Print the colour of a pixel
    Pick(pick::PickArgs),

    /// Write a starter recolour.yaml
    Init(init::InitArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Load the rules file named on the command line, or `recolour.yaml` in the
/// working directory when present, then append any `--rule` flags.
pub(crate) fn resolve_rules(
    rules_path: Option<&Path>,
    extra: &[ColourRule],
) -> Result<(RulesFile, Option<PathBuf>)> {
    let path = match rules_path {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let local = PathBuf::from(RULES_FILENAME);
            local.exists().then_some(local)
        }
    };

    let mut file = match &path {
        Some(path) => RulesFile::load(path)?,
        None => RulesFile::default(),
    };
    file.rules.extend(extra.iter().cloned());

    Ok((file, path))
}

/// Warn about rules the engine will skip.
pub(crate) fn report_invalid(rules: &RuleList, printer: &Printer) {
    for (index, rule) in rules.invalid() {
        printer.warning("Ignoring", &format!("rule {} ({}): invalid colour", index + 1, rule));
    }
}

/// Status line naming a rules source.
pub(crate) fn describe_source(path: Option<&Path>) -> String {
    match path {
        Some(path) => display_path(path),
        None => "command line".to_string(),
    }
}
