//! Cooperative scheduling of incremental runs.
//!
//! A [`RunTracker`] holds the caller's "latest run" generation. Starting a
//! run bumps the generation, which turns every older [`RunToken`] stale. A
//! [`Job`] checks its token on every turn, so a superseded run stops at its
//! next slice boundary and never delivers a result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::types::{Bitmap, ColourRule};

use super::{IncrementalRun, Slicing};

/// Issues run tokens; only the most recently issued one is current.
#[derive(Debug, Clone, Default)]
pub struct RunTracker {
    latest: Arc<AtomicU64>,
}

impl RunTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new run, invalidating all earlier tokens.
    pub fn begin(&self) -> RunToken {
        let id = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        RunToken {
            id,
            latest: Arc::clone(&self.latest),
        }
    }

    /// Invalidate all outstanding tokens without starting a run.
    pub fn cancel(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }
}

/// Proof that a run was the latest one when it started.
#[derive(Debug, Clone)]
pub struct RunToken {
    id: u64,
    latest: Arc<AtomicU64>,
}

impl RunToken {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// False once a newer run has begun or the tracker was cancelled.
    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.id
    }
}

/// How far a run has got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

impl Progress {
    /// Completed fraction in `[0, 1]`.
    pub fn fraction(self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.done as f64 / self.total as f64
        }
    }
}

/// Result of one scheduling turn.
#[derive(Debug)]
pub enum Turn {
    /// A slice was processed; more remain.
    Progress(Progress),
    /// The final slice was processed.
    Complete(Bitmap),
    /// The run was superseded. No result will be produced.
    Cancelled,
    /// The job already delivered its result or was cancelled earlier.
    Spent,
}

/// An incremental run bound to a run token.
#[derive(Debug)]
pub struct Job {
    token: RunToken,
    run: Option<IncrementalRun>,
}

impl Job {
    pub fn new(token: RunToken, run: IncrementalRun) -> Self {
        Self {
            token,
            run: Some(run),
        }
    }

    /// Begin a run on `tracker`, superseding whatever was current.
    pub fn start(
        tracker: &RunTracker,
        bitmap: &Bitmap,
        rules: &[ColourRule],
        slicing: Slicing,
    ) -> Self {
        Self::new(tracker.begin(), IncrementalRun::new(bitmap, rules, slicing))
    }

    pub fn token(&self) -> &RunToken {
        &self.token
    }

    pub fn is_current(&self) -> bool {
        self.run.is_some() && self.token.is_current()
    }

    pub fn progress(&self) -> Option<Progress> {
        self.run.as_ref().map(|run| Progress {
            done: run.processed(),
            total: run.total(),
        })
    }

    /// Process one slice.
    pub fn turn(&mut self) -> Turn {
        if self.run.is_none() {
            return Turn::Spent;
        }
        if !self.token.is_current() {
            self.run = None;
            return Turn::Cancelled;
        }

        let Some(run) = self.run.as_mut() else {
            return Turn::Spent;
        };
        run.step();

        if !run.is_complete() {
            return Turn::Progress(Progress {
                done: run.processed(),
                total: run.total(),
            });
        }

        match self.run.take().and_then(IncrementalRun::finish) {
            Some(bitmap) => Turn::Complete(bitmap),
            None => Turn::Spent,
        }
    }
}

/// What the host wants after a yield.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Cancel,
}

/// The scheduler a job yields to between slices.
pub trait Host {
    /// Called after every slice except the last. This is where a host
    /// services its event loop or renders a frame.
    fn yield_now(&mut self, progress: Progress) -> Control;
}

impl<F> Host for F
where
    F: FnMut(Progress) -> Control,
{
    fn yield_now(&mut self, progress: Progress) -> Control {
        self(progress)
    }
}

/// How a driven job ended.
#[derive(Debug)]
pub enum Outcome {
    Complete(Bitmap),
    Cancelled,
}

/// Run `job` to the end, yielding to `host` between slices.
///
/// The job stops early if the host asks it to or its token goes stale.
pub fn drive(mut job: Job, host: &mut impl Host) -> Outcome {
    loop {
        match job.turn() {
            Turn::Progress(progress) => {
                if host.yield_now(progress) == Control::Cancel {
                    return Outcome::Cancelled;
                }
            }
            Turn::Complete(bitmap) => return Outcome::Complete(bitmap),
            Turn::Cancelled | Turn::Spent => return Outcome::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::apply;

    fn sample() -> (Bitmap, Vec<ColourRule>) {
        let bitmap = Bitmap::filled(50, 20, [255, 0, 0, 255]).unwrap();
        (bitmap, vec![ColourRule::replace("#ff0000", "#0000ff", 0.0)])
    }

    #[test]
    fn test_begin_invalidates_previous_token() {
        let tracker = RunTracker::new();
        let first = tracker.begin();
        assert!(first.is_current());

        let second = tracker.begin();
        assert!(!first.is_current());
        assert!(second.is_current());
        assert!(second.id() > first.id());
    }

    #[test]
    fn test_cancel_invalidates_everything() {
        let tracker = RunTracker::new();
        let token = tracker.begin();
        tracker.cancel();
        assert!(!token.is_current());
    }

    #[test]
    fn test_job_completes_with_atomic_result() {
        let (bitmap, rules) = sample();
        let tracker = RunTracker::new();
        let mut job = Job::start(&tracker, &bitmap, &rules, Slicing::Pixels(300));

        let mut progress = Vec::new();
        let result = loop {
            match job.turn() {
                Turn::Progress(p) => progress.push(p.done),
                Turn::Complete(b) => break b,
                other => panic!("unexpected turn {:?}", other),
            }
        };

        assert_eq!(progress, vec![300, 600, 900]);
        assert_eq!(result, apply(&bitmap, &rules).unwrap());
        assert!(matches!(job.turn(), Turn::Spent));
    }

    #[test]
    fn test_stale_job_never_completes() {
        let (bitmap, rules) = sample();
        let tracker = RunTracker::new();
        let mut old = Job::start(&tracker, &bitmap, &rules, Slicing::Pixels(100));

        assert!(matches!(old.turn(), Turn::Progress(_)));

        let mut new = Job::start(&tracker, &bitmap, &rules, Slicing::Pixels(2000));
        assert!(matches!(old.turn(), Turn::Cancelled));
        assert!(matches!(old.turn(), Turn::Spent));
        assert!(!old.is_current());

        assert!(matches!(new.turn(), Turn::Complete(_)));
    }

    #[test]
    fn test_drive_yields_between_slices() {
        let (bitmap, rules) = sample();
        let tracker = RunTracker::new();
        let job = Job::start(&tracker, &bitmap, &rules, Slicing::Rows(5));

        let mut yields = 0;
        let outcome = drive(job, &mut |_: Progress| {
            yields += 1;
            Control::Continue
        });

        // 20 rows in steps of 5: three yields before the final slice
        assert_eq!(yields, 3);
        match outcome {
            Outcome::Complete(b) => assert_eq!(b, apply(&bitmap, &rules).unwrap()),
            Outcome::Cancelled => panic!("run should complete"),
        }
    }

    #[test]
    fn test_drive_host_cancel() {
        let (bitmap, rules) = sample();
        let tracker = RunTracker::new();
        let job = Job::start(&tracker, &bitmap, &rules, Slicing::Pixels(10));

        let outcome = drive(job, &mut |p: Progress| {
            if p.done >= 50 {
                Control::Cancel
            } else {
                Control::Continue
            }
        });

        assert!(matches!(outcome, Outcome::Cancelled));
    }

    #[test]
    fn test_drive_superseded_mid_run() {
        let (bitmap, rules) = sample();
        let tracker = RunTracker::new();
        let job = Job::start(&tracker, &bitmap, &rules, Slicing::Pixels(100));

        let outcome = drive(job, &mut |p: Progress| {
            if p.done == 200 {
                // A new edit arrives while the host has control
                tracker.begin();
            }
            Control::Continue
        });

        assert!(matches!(outcome, Outcome::Cancelled));
    }

    #[test]
    fn test_progress_fraction() {
        assert_eq!(Progress { done: 1, total: 4 }.fraction(), 0.25);
        assert_eq!(Progress { done: 0, total: 0 }.fraction(), 1.0);
    }
}
