//! Change watcher: debounced re-sweeps on tree mutations
//!
//! Host-driven state machine; it owns no clock and no tree. The host feeds it
//! mutation batches and fired timers.
//!
//! ```text
//! Stopped ──start──► Watching ──stop──► Stopped
//!    │
//!    └──start fails──► Degraded (manual sweep_now only)
//!
//! batch with added nodes ─► cancel pending timer ─► schedule(quiet interval)
//! pending timer fires ────► one sweep
//! ```

use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::application::services::sweep::{SweepOutcome, SweepService};
use crate::application::{ApplicationError, ApplicationResult, SweepError};
use crate::domain::{MutationRecord, ObserveOptions, SubscriptionId, TimerHandle};
use crate::infrastructure::traits::{DomTree, MutationSource, PageEnvironment, Scheduler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Stopped,
    Watching(SubscriptionId),
    /// Subscription setup failed; no automatic sweeps.
    Degraded,
}

#[derive(Debug)]
pub struct ChangeWatcher {
    sweeper: SweepService,
    quiet: Duration,
    state: WatcherState,
    pending: Option<TimerHandle>,
    sweeps_run: usize,
    last_error: Option<SweepError>,
}

impl ChangeWatcher {
    pub fn new(sweeper: SweepService) -> Self {
        let quiet = sweeper.settings().debounce();
        Self {
            sweeper,
            quiet,
            state: WatcherState::Stopped,
            pending: None,
            sweeps_run: 0,
            last_error: None,
        }
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    pub fn pending(&self) -> Option<TimerHandle> {
        self.pending
    }

    pub fn sweeps_run(&self) -> usize {
        self.sweeps_run
    }

    pub fn last_error(&self) -> Option<&SweepError> {
        self.last_error.as_ref()
    }

    pub fn quiet_interval(&self) -> Duration {
        self.quiet
    }

    pub fn sweeper(&self) -> &SweepService {
        &self.sweeper
    }

    /// Subscribe to tree mutations. A setup failure is logged and leaves the
    /// watcher `Degraded`; it is never propagated.
    #[instrument(skip(self, tree))]
    pub fn start<T>(&mut self, tree: &mut T) -> WatcherState
    where
        T: DomTree + MutationSource + ?Sized,
    {
        if let WatcherState::Watching(_) = self.state {
            return self.state;
        }
        self.state = match self.subscribe(tree) {
            Ok(subscription) => {
                info!(?subscription, "watching for mutations");
                WatcherState::Watching(subscription)
            }
            Err(e) => {
                warn!("live updates disabled: {e}");
                WatcherState::Degraded
            }
        };
        self.state
    }

    /// Observe the document root. Rules match anywhere in the document and the
    /// main content root may be replaced while watching.
    fn subscribe<T>(&self, tree: &mut T) -> ApplicationResult<SubscriptionId>
    where
        T: DomTree + MutationSource + ?Sized,
    {
        let target = tree
            .root()
            .ok_or_else(|| ApplicationError::WatcherSetup {
                message: "document has no root".into(),
            })?;
        tree.subscribe(target, ObserveOptions::all())
            .map_err(|e| ApplicationError::WatcherSetup {
                message: e.to_string(),
            })
    }

    /// Unsubscribe and drop any pending sweep.
    pub fn stop<M, S>(&mut self, source: &mut M, scheduler: &mut S)
    where
        M: MutationSource + ?Sized,
        S: Scheduler + ?Sized,
    {
        if let WatcherState::Watching(subscription) = self.state {
            source.unsubscribe(subscription);
        }
        if let Some(handle) = self.pending.take() {
            scheduler.cancel(handle);
        }
        self.state = WatcherState::Stopped;
    }

    /// Handle one mutation batch. Returns the newly scheduled timer when the
    /// batch added nodes; any earlier pending timer is canceled first.
    pub fn on_mutations<S: Scheduler + ?Sized>(
        &mut self,
        batch: &[MutationRecord],
        scheduler: &mut S,
    ) -> Option<TimerHandle> {
        if !matches!(self.state, WatcherState::Watching(_)) {
            return None;
        }
        if !batch.iter().any(MutationRecord::adds_nodes) {
            return None;
        }
        if let Some(previous) = self.pending.take() {
            scheduler.cancel(previous);
        }
        let handle = scheduler.schedule_after(self.quiet);
        debug!(records = batch.len(), %handle, "sweep scheduled");
        self.pending = Some(handle);
        Some(handle)
    }

    /// Run the debounced sweep if `handle` is the pending timer. Stale
    /// handles are ignored.
    pub fn on_timer<T, E>(&mut self, handle: TimerHandle, tree: &mut T, env: &E) -> Option<SweepOutcome>
    where
        T: DomTree + ?Sized,
        E: PageEnvironment + ?Sized,
    {
        if self.pending != Some(handle) {
            debug!(%handle, "ignoring stale timer");
            return None;
        }
        self.pending = None;
        self.sweep_now(tree, env)
    }

    /// Run one sweep immediately, in any state. A failed sweep is logged and
    /// yields `None`; the next mutation gets a fresh attempt.
    pub fn sweep_now<T, E>(&mut self, tree: &mut T, env: &E) -> Option<SweepOutcome>
    where
        T: DomTree + ?Sized,
        E: PageEnvironment + ?Sized,
    {
        self.sweeps_run += 1;
        match self.sweeper.run(tree, env) {
            Ok(outcome) => {
                self.last_error = None;
                Some(outcome)
            }
            Err(e) => {
                warn!("sweep aborted: {e}");
                self.last_error = Some(e);
                None
            }
        }
    }
}
