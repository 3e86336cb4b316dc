//! Application services
//!
//! Concrete service implementations that orchestrate the engine.
//! Services depend on the collaborator traits (DomTree, Scheduler, etc.)
//! but are themselves concrete structs, not traits.

mod sweep;
mod watcher;

pub use sweep::{SweepOutcome, SweepReport, SweepService};
pub use watcher::{ChangeWatcher, WatcherState};
