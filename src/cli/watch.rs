//! Watch command implementation.
//!
//! Keeps a live preview file in sync with a rules file. File events are
//! debounced by the watcher, rule edits are debounced again by the preview,
//! and the engine runs one slice per loop turn so a newer edit can supersede
//! a run that is still in flight.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use clap::Args;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, DebouncedEventKind};

use crate::config::{RulesFile, RULES_FILENAME};
use crate::error::{RecolourError, Result};
use crate::output::{display_path, plural, Printer};
use crate::pipeline::{Preview, PreviewState};
use crate::render::{default_output_path, load_bitmap, write_bitmap};

use super::report_invalid;

/// Quiet period the file watcher waits for before reporting a change.
const FS_DEBOUNCE: Duration = Duration::from_millis(50);

/// How long an idle-but-dirty loop waits for events between polls.
const WAIT_TICK: Duration = Duration::from_millis(10);

/// Re-apply rules whenever the rules file or image changes
///
/// Every setting in the rules file is picked up again on reload. Flags given
/// here take precedence over the file's `output` and `debounce_ms`.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Image to recolour
    pub image: PathBuf,

    /// Rules file to watch
    #[arg(long, short, default_value = RULES_FILENAME)]
    pub rules: PathBuf,

    /// Preview file rewritten after each run (default: <image>-recoloured.png)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Milliseconds to wait after the last edit before re-running
    #[arg(long)]
    pub debounce_ms: Option<u64>,
}

/// Messages from the file watcher thread.
enum WatchEvent {
    Changed(Vec<PathBuf>),
    Failed(String),
}

pub fn run(args: WatchArgs, printer: &Printer) -> Result<()> {
    let mut session = Session::open(&args)?;
    printer.status(
        "Watching",
        &format!(
            "{} and {}",
            display_path(&session.rules_path),
            display_path(&session.image_path)
        ),
    );
    report_invalid(session.preview.rules(), printer);

    let (tx, rx) = mpsc::channel();
    let mut debouncer = new_debouncer(
        FS_DEBOUNCE,
        move |result: std::result::Result<Vec<DebouncedEvent>, notify::Error>| {
            let event = match result {
                Ok(events) => WatchEvent::Changed(
                    events
                        .into_iter()
                        .filter(|e| e.kind == DebouncedEventKind::Any)
                        .map(|e| e.path)
                        .collect(),
                ),
                Err(e) => WatchEvent::Failed(e.to_string()),
            };
            // Receiver is gone once the loop exits
            let _ = tx.send(event);
        },
    )
    .map_err(watch_error)?;

    for dir in session.watch_dirs() {
        debouncer
            .watcher()
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(watch_error)?;
    }

    loop {
        let event = if session.is_busy() {
            // Mid-run the loop only peeks, so each slice is one turn
            let wait = if session.preview.is_processing() {
                Duration::ZERO
            } else {
                WAIT_TICK
            };
            match rx.recv_timeout(wait) {
                Ok(event) => Some(event),
                Err(mpsc::RecvTimeoutError::Timeout) => None,
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match rx.recv() {
                Ok(event) => Some(event),
                Err(_) => break,
            }
        };

        match event {
            Some(WatchEvent::Changed(paths)) => {
                session.handle_change(&paths, Instant::now(), printer)
            }
            Some(WatchEvent::Failed(message)) => printer.error("Watch", &message),
            None => {}
        }

        session.tick(Instant::now(), printer)?;
    }

    Ok(())
}

fn watch_error(e: notify::Error) -> RecolourError {
    RecolourError::Watch {
        message: e.to_string(),
    }
}

/// Watch-mode state, separate from the file watcher so it can be driven
/// directly.
struct Session {
    rules_path: PathBuf,
    image_path: PathBuf,
    output: PathBuf,
    preview: Preview,
    needs_alpha: bool,
    // Command-line values win over the rules file on every reload
    output_flag: Option<PathBuf>,
    debounce_flag: Option<u64>,
}

impl Session {
    fn open(args: &WatchArgs) -> Result<Self> {
        if !args.rules.exists() {
            return Err(RecolourError::Io {
                path: args.rules.clone(),
                message: "Rules file not found".to_string(),
            });
        }

        let settings = RulesFile::load(&args.rules)?;
        let mut session = Self {
            rules_path: canonical(&args.rules),
            image_path: canonical(&args.image),
            output: PathBuf::new(),
            preview: Preview::default(),
            needs_alpha: false,
            output_flag: args.output.clone(),
            debounce_flag: args.debounce_ms,
        };

        let now = Instant::now();
        session.apply_settings(&settings, now);
        session.preview.set_image(load_bitmap(&args.image)?, now);
        Ok(session)
    }

    /// Take rules, slicing, debounce and output from a freshly loaded file.
    fn apply_settings(&mut self, settings: &RulesFile, now: Instant) {
        let rules = settings.rule_list();
        let debounce = self
            .debounce_flag
            .map(Duration::from_millis)
            .unwrap_or_else(|| settings.debounce());

        self.output = self
            .output_flag
            .clone()
            .or_else(|| settings.output.clone())
            .unwrap_or_else(|| default_output_path(&self.image_path));
        self.needs_alpha = rules.has_transparency();
        self.preview.configure(debounce, settings.slicing());
        self.preview.set_rules(rules, now);
    }

    /// Parent directories to watch, so editors that save by rename are seen.
    fn watch_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = [&self.rules_path, &self.image_path]
            .iter()
            .map(|p| {
                p.parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."))
            })
            .collect();
        dirs.dedup();
        dirs
    }

    fn is_busy(&self) -> bool {
        self.preview.is_processing() || self.preview.is_dirty()
    }

    fn handle_change(&mut self, paths: &[PathBuf], now: Instant, printer: &Printer) {
        let touched = |target: &Path| paths.iter().any(|p| canonical(p) == target);

        if touched(&self.rules_path) {
            match RulesFile::load(&self.rules_path) {
                Ok(settings) => {
                    let rules = settings.rule_list();
                    printer.info(
                        "Reloaded",
                        &format!(
                            "{} ({})",
                            display_path(&self.rules_path),
                            plural(rules.len(), "rule", "rules")
                        ),
                    );
                    report_invalid(&rules, printer);
                    self.apply_settings(&settings, now);
                }
                // Keep previewing with the last good rules
                Err(e) => printer.error("Failed", &e.to_string()),
            }
        }

        if touched(&self.image_path) {
            match load_bitmap(&self.image_path) {
                Ok(bitmap) => {
                    printer.info("Reloaded", &display_path(&self.image_path));
                    self.preview.set_image(bitmap, now);
                }
                Err(e) => printer.error("Failed", &e.to_string()),
            }
        }
    }

    /// Advance the preview one step, writing the output when a run lands.
    fn tick(&mut self, now: Instant, printer: &Printer) -> Result<bool> {
        if self.preview.poll(now) != PreviewState::Ready {
            return Ok(false);
        }

        if let Some(result) = self.preview.result() {
            match write_bitmap(result, &self.output, self.needs_alpha) {
                Ok(()) => printer.success("Wrote", &display_path(&self.output)),
                // An unsupported format is fixable by editing rules; keep going
                Err(e @ RecolourError::Encode { .. }) => printer.error("Failed", &e.to_string()),
                Err(e) => return Err(e),
            }
        }
        Ok(true)
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
