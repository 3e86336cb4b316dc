//! In-process host session
//!
//! Bundles a [`Document`], a fixed page environment, the virtual-clock
//! scheduler and a [`ChangeWatcher`]. The host mutates the document, calls
//! [`Session::deliver`] to hand the recorded batch to the watcher, and moves
//! time with [`Session::advance`].

use std::time::Duration;

use tracing::{debug, instrument};

use crate::application::services::{ChangeWatcher, SweepOutcome, WatcherState};
use crate::domain::{Document, TimerHandle};
use crate::infrastructure::traits::{ManualScheduler, StaticEnvironment};

#[derive(Debug)]
pub struct Session {
    document: Document,
    env: StaticEnvironment,
    scheduler: ManualScheduler,
    watcher: ChangeWatcher,
}

impl Session {
    pub fn new(document: Document, env: StaticEnvironment, watcher: ChangeWatcher) -> Self {
        Self {
            document,
            env,
            scheduler: ManualScheduler::new(),
            watcher,
        }
    }

    /// Start watching, then run the initial sweep.
    #[instrument(skip(self))]
    pub fn start(&mut self) -> Option<SweepOutcome> {
        self.watcher.start(&mut self.document);
        let outcome = self.watcher.sweep_now(&mut self.document, &self.env);
        self.drain();
        outcome
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Mutations made through this handle reach the watcher on the next
    /// [`Session::deliver`].
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn environment(&self) -> &StaticEnvironment {
        &self.env
    }

    pub fn watcher(&self) -> &ChangeWatcher {
        &self.watcher
    }

    pub fn state(&self) -> WatcherState {
        self.watcher.state()
    }

    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending()
    }

    /// Hand the mutations recorded since the last call to the watcher as one
    /// batch. Returns the timer scheduled for it, if any.
    pub fn deliver(&mut self) -> Option<TimerHandle> {
        let batch = self.document.take_records();
        if batch.is_empty() {
            return None;
        }
        self.watcher.on_mutations(&batch, &mut self.scheduler)
    }

    /// Move the virtual clock forward by `by`. Due timers fire at their own
    /// deadlines, in order; each sweep is returned with the time it ran.
    pub fn advance(&mut self, by: Duration) -> Vec<(Duration, SweepOutcome)> {
        let target = self.now() + by;
        let mut outcomes = Vec::new();
        while let Some(deadline) = self.scheduler.next_deadline().filter(|&d| d <= target) {
            let fired = self.scheduler.advance(deadline.saturating_sub(self.now()));
            self.fire(fired, &mut outcomes);
        }
        let fired = self.scheduler.advance(target.saturating_sub(self.now()));
        self.fire(fired, &mut outcomes);
        outcomes
    }

    fn fire(&mut self, fired: Vec<TimerHandle>, outcomes: &mut Vec<(Duration, SweepOutcome)>) {
        for handle in fired {
            if let Some(outcome) = self.watcher.on_timer(handle, &mut self.document, &self.env) {
                debug!(%handle, %outcome, "debounced sweep");
                outcomes.push((self.now(), outcome));
            }
            self.drain();
        }
    }

    /// Advance to an absolute virtual time; earlier times are a no-op.
    pub fn advance_to(&mut self, at: Duration) -> Vec<(Duration, SweepOutcome)> {
        let by = at.saturating_sub(self.now());
        self.advance(by)
    }

    /// Advance until no sweep is pending.
    pub fn settle(&mut self) -> Vec<(Duration, SweepOutcome)> {
        let mut outcomes = Vec::new();
        while let Some(deadline) = self.scheduler.next_deadline() {
            outcomes.extend(self.advance_to(deadline));
        }
        outcomes
    }

    /// Sweep immediately, bypassing the debounce.
    pub fn sweep_now(&mut self) -> Option<SweepOutcome> {
        let outcome = self.watcher.sweep_now(&mut self.document, &self.env);
        self.drain();
        outcome
    }

    /// Sweeps only add tags and styles; pass their records on so they are
    /// not folded into the next host batch.
    fn drain(&mut self) {
        self.deliver();
    }
}
