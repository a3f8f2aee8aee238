//! Init command implementation.
//!
//! Writes a starter rules file holding the default rule.

use std::fs;
use std::path::PathBuf;

use clap::Args;

use crate::config::{RulesFile, RULES_FILENAME};
use crate::error::{RecolourError, Result};
use crate::output::{display_path, Printer};

/// Write a starter recolour.yaml
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to write into, or a rules file path ending in .yaml/.json
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite an existing rules file
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs, printer: &Printer) -> Result<()> {
    let rules_path = if args.path.is_dir() {
        args.path.join(RULES_FILENAME)
    } else {
        args.path.clone()
    };

    if rules_path.exists() && !args.force {
        return Err(RecolourError::Io {
            path: rules_path,
            message: "Rules file already exists".to_string(),
        });
    }

    let content = RulesFile::starter().to_string_for(&rules_path)?;
    fs::write(&rules_path, content).map_err(|e| RecolourError::Io {
        path: rules_path.clone(),
        message: format!("Failed to write rules file: {}", e),
    })?;

    printer.success("Created", &display_path(&rules_path));
    Ok(())
}
