//! Application layer: the suppression engine
//!
//! Navigation, matching, deduplication and rules are pure functions over the
//! `DomTree` boundary trait; services orchestrate them.

pub mod dedupe;
pub mod error;
pub mod error_ext;
pub mod matcher;
pub mod navigator;
pub mod rules;
pub mod services;

pub use error::{ApplicationError, ApplicationResult, SweepError};
pub use error_ext::PathContextExt;
pub use rules::{Rule, RuleBook, RuleName, Scope, Strategy};
