//! Live preview: a derived bitmap recomputed when its inputs change.
//!
//! Every change to the image or the rules marks the preview dirty, cancels
//! any run still in flight and restarts a trailing debounce window. Once the
//! window passes, [`Preview::poll`] starts a fresh incremental run and later
//! polls advance it one slice at a time. Time is passed in by the
//! caller so the host owns the clock.

use std::time::{Duration, Instant};

use crate::engine::{Job, RunTracker, Slicing, Turn};
use crate::types::{Bitmap, ColourRule, RuleEdit, RuleList};

/// Debounce window for rule edits unless configured otherwise.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// What a poll did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewState {
    /// No image loaded.
    Empty,
    /// Result is up to date.
    Idle,
    /// A change is waiting for the debounce window to pass.
    Waiting,
    /// A run is in progress.
    Processing { done: usize, total: usize },
    /// A run finished during this poll and its result is now available.
    Ready,
}

/// Preview state for one loaded image and its rule list.
#[derive(Debug)]
pub struct Preview {
    source: Option<Bitmap>,
    rules: RuleList,
    result: Option<Bitmap>,
    tracker: RunTracker,
    job: Option<Job>,
    changed_at: Option<Instant>,
    debounce: Duration,
    slicing: Slicing,
}

impl Default for Preview {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE, Slicing::default())
    }
}

impl Preview {
    pub fn new(debounce: Duration, slicing: Slicing) -> Self {
        Self {
            source: None,
            rules: RuleList::default(),
            result: None,
            tracker: RunTracker::new(),
            job: None,
            changed_at: None,
            debounce,
            slicing,
        }
    }

    /// Replace the rule list.
    pub fn with_rules(mut self, rules: RuleList) -> Self {
        self.rules = rules;
        self
    }

    pub fn source(&self) -> Option<&Bitmap> {
        self.source.as_ref()
    }

    pub fn rules(&self) -> &RuleList {
        &self.rules
    }

    /// Latest completed result.
    pub fn result(&self) -> Option<&Bitmap> {
        self.result.as_ref()
    }

    /// Whether a run is in flight. Never true while a change is waiting out
    /// the debounce window.
    pub fn is_processing(&self) -> bool {
        self.job.as_ref().is_some_and(Job::is_current)
    }

    /// Whether a change is waiting to be processed.
    pub fn is_dirty(&self) -> bool {
        self.changed_at.is_some()
    }

    /// Load a new source image.
    pub fn set_image(&mut self, bitmap: Bitmap, now: Instant) {
        self.source = Some(bitmap);
        self.result = None;
        self.invalidate(now);
    }

    /// Drop the image and result and restore the default rules.
    pub fn clear(&mut self) {
        self.tracker.cancel();
        self.job = None;
        self.source = None;
        self.result = None;
        self.rules = RuleList::default();
        self.changed_at = None;
    }

    /// Mutate the rule list in place.
    pub fn edit<F>(&mut self, now: Instant, f: F)
    where
        F: FnOnce(&mut RuleList),
    {
        f(&mut self.rules);
        self.invalidate(now);
    }

    /// Replace every rule.
    pub fn set_rules(&mut self, rules: RuleList, now: Instant) {
        self.edit(now, |current| *current = rules);
    }

    /// Append the default rule.
    pub fn add_rule(&mut self, now: Instant) {
        self.edit(now, |rules| rules.push(ColourRule::default()));
    }

    pub fn remove_rule(&mut self, index: usize, now: Instant) -> Option<ColourRule> {
        let removed = self.rules.remove(index);
        if removed.is_some() {
            self.invalidate(now);
        }
        removed
    }

    pub fn update_rule(&mut self, index: usize, edit: RuleEdit, now: Instant) -> bool {
        let updated = self.rules.update(index, edit);
        if updated {
            self.invalidate(now);
        }
        updated
    }

    /// Mark the result stale and discard any in-flight run.
    ///
    /// The previous result stays visible until the next run completes.
    pub fn invalidate(&mut self, now: Instant) {
        self.tracker.cancel();
        self.job = None;
        self.changed_at = Some(now);
    }

    /// Change the debounce window and slicing used by later runs.
    pub fn configure(&mut self, debounce: Duration, slicing: Slicing) {
        self.debounce = debounce;
        self.slicing = slicing;
    }

    /// Advance the preview by at most one slice.
    pub fn poll(&mut self, now: Instant) -> PreviewState {
        let Some(source) = self.source.as_ref() else {
            return PreviewState::Empty;
        };

        if let Some(changed_at) = self.changed_at {
            if now.saturating_duration_since(changed_at) < self.debounce {
                return PreviewState::Waiting;
            }
            self.changed_at = None;
            self.job = Some(Job::start(
                &self.tracker,
                source,
                self.rules.as_slice(),
                self.slicing,
            ));
        }

        let Some(job) = self.job.as_mut() else {
            return PreviewState::Idle;
        };

        match job.turn() {
            Turn::Progress(p) => PreviewState::Processing {
                done: p.done,
                total: p.total,
            },
            Turn::Complete(bitmap) => {
                self.job = None;
                self.result = Some(bitmap);
                PreviewState::Ready
            }
            Turn::Cancelled | Turn::Spent => {
                self.job = None;
                PreviewState::Idle
            }
        }
    }

    /// Poll until the next result is ready or nothing is left to do,
    /// ignoring the debounce window.
    pub fn settle(&mut self, now: Instant) -> Option<&Bitmap> {
        if self.changed_at.is_some() {
            self.changed_at = Some(now.checked_sub(self.debounce).unwrap_or(now));
        }
        loop {
            match self.poll(now) {
                PreviewState::Processing { .. } => continue,
                PreviewState::Waiting => {
                    // Debounce could not be back-dated; start immediately
                    self.changed_at = None;
                    self.job = self.source.as_ref().map(|source| {
                        Job::start(&self.tracker, source, self.rules.as_slice(), self.slicing)
                    });
                }
                _ => break,
            }
        }
        self.result.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::apply;

    const MS: Duration = Duration::from_millis(1);

    fn red_image() -> Bitmap {
        Bitmap::filled(10, 10, [255, 0, 0, 255]).unwrap()
    }

    fn preview() -> Preview {
        Preview::new(300 * MS, Slicing::Pixels(40))
    }

    /// Poll until the preview stops processing.
    fn run_out(preview: &mut Preview, now: Instant) -> PreviewState {
        loop {
            match preview.poll(now) {
                PreviewState::Processing { .. } => continue,
                state => return state,
            }
        }
    }

    #[test]
    fn test_empty_without_image() {
        let mut preview = preview();
        assert_eq!(preview.poll(Instant::now()), PreviewState::Empty);
    }

    #[test]
    fn test_debounce_delays_first_run() {
        let t0 = Instant::now();
        let mut preview = preview();
        preview.set_image(red_image(), t0);

        assert_eq!(preview.poll(t0 + 100 * MS), PreviewState::Waiting);
        assert!(preview.result().is_none());

        assert_eq!(
            preview.poll(t0 + 300 * MS),
            PreviewState::Processing { done: 40, total: 100 }
        );
        assert_eq!(run_out(&mut preview, t0 + 300 * MS), PreviewState::Ready);

        let expected = apply(&red_image(), preview.rules().as_slice()).unwrap();
        assert_eq!(preview.result(), Some(&expected));
        assert_eq!(preview.poll(t0 + 400 * MS), PreviewState::Idle);
    }

    #[test]
    fn test_rapid_edits_restart_debounce() {
        let t0 = Instant::now();
        let mut preview = preview();
        preview.set_image(red_image(), t0);

        preview.update_rule(0, RuleEdit::Tolerance(5.0), t0 + 200 * MS);
        preview.update_rule(0, RuleEdit::To("#0000ff".to_string()), t0 + 400 * MS);

        // 300ms after the first edit, but only 100ms after the last
        assert_eq!(preview.poll(t0 + 500 * MS), PreviewState::Waiting);
        assert!(matches!(
            preview.poll(t0 + 700 * MS),
            PreviewState::Processing { .. }
        ));
    }

    #[test]
    fn test_new_change_supersedes_running_job() {
        let t0 = Instant::now();
        let mut preview = preview();
        preview.set_image(red_image(), t0);

        let t1 = t0 + 300 * MS;
        assert!(matches!(preview.poll(t1), PreviewState::Processing { .. }));

        // Edit mid-run: the old run is dropped while the debounce runs
        preview.update_rule(0, RuleEdit::To("#0000ff".to_string()), t1);
        assert_eq!(preview.poll(t1 + 10 * MS), PreviewState::Waiting);
        assert!(!preview.is_processing());

        let t2 = t1 + 300 * MS;
        assert_eq!(run_out(&mut preview, t2), PreviewState::Ready);

        let result = preview.result().unwrap();
        assert!(result.pixels().all(|p| p == [0, 0, 255, 255]));
    }

    #[test]
    fn test_stale_run_does_not_overwrite_newer_result() {
        let t0 = Instant::now();
        let mut preview = preview();
        preview.set_image(red_image(), t0);

        // Keep a handle on the first run's tracker generation
        let t1 = t0 + 300 * MS;
        preview.poll(t1);
        let stale_token = preview.job.as_ref().unwrap().token().clone();

        preview.update_rule(0, RuleEdit::MakeTransparent(true), t1);
        run_out(&mut preview, t1 + 300 * MS);

        assert!(!stale_token.is_current());
        assert!(preview.result().unwrap().pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn test_add_and_remove_rules() {
        let t0 = Instant::now();
        let mut preview = preview();
        preview.add_rule(t0);
        assert_eq!(preview.rules().len(), 2);
        assert!(preview.is_dirty());

        assert!(preview.remove_rule(1, t0).is_some());
        assert!(preview.remove_rule(4, t0).is_none());
        assert!(!preview.update_rule(4, RuleEdit::Tolerance(1.0), t0));
        assert_eq!(preview.rules().len(), 1);
    }

    #[test]
    fn test_clear_resets() {
        let t0 = Instant::now();
        let mut preview = preview().with_rules(RuleList::new());
        preview.set_image(red_image(), t0);
        preview.settle(t0);
        assert!(preview.result().is_some());

        preview.clear();
        assert!(preview.result().is_none());
        assert!(preview.source().is_none());
        assert_eq!(preview.rules(), &RuleList::default());
        assert_eq!(preview.poll(t0), PreviewState::Empty);
    }

    #[test]
    fn test_settle_skips_debounce() {
        let t0 = Instant::now();
        let mut preview = preview();
        preview.set_image(red_image(), t0);
        preview.set_rules(
            RuleList::from(vec![ColourRule::replace("#ff0000", "#ffffff", 0.0)]),
            t0,
        );

        let result = preview.settle(t0).unwrap();
        assert!(result.pixels().all(|p| p == [255, 255, 255, 255]));
        assert!(!preview.is_processing());
        assert!(!preview.is_dirty());
    }

    #[test]
    fn test_waiting_is_not_processing() {
        let t0 = Instant::now();
        let mut preview = Preview::new(300 * MS, Slicing::Pixels(10));
        preview.set_image(red_image(), t0);

        let t1 = t0 + 300 * MS;
        assert_eq!(preview.poll(t1), PreviewState::Processing { done: 10, total: 100 });
        assert!(preview.is_processing());

        preview.update_rule(0, RuleEdit::Tolerance(1.0), t1);
        for step in 1..=3 {
            assert_eq!(preview.poll(t1 + step * 10 * MS), PreviewState::Waiting);
            assert!(!preview.is_processing());
            assert!(preview.is_dirty());
        }

        // Restarts from the first slice once the window passes
        assert_eq!(
            preview.poll(t1 + 300 * MS),
            PreviewState::Processing { done: 10, total: 100 }
        );
    }

    #[test]
    fn test_configure_applies_to_next_run() {
        let t0 = Instant::now();
        let mut preview = preview();
        preview.configure(50 * MS, Slicing::Pixels(25));
        preview.set_image(red_image(), t0);

        assert_eq!(
            preview.poll(t0 + 50 * MS),
            PreviewState::Processing { done: 25, total: 100 }
        );
    }
}
