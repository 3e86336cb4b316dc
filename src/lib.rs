//! declutter: tag low-value sections of a page tree so a host can hide them.
//!
//! Layers, innermost first:
//! - [`domain`]: the page tree arena, selectors, mutation records
//! - [`application`]: matching, deduplication, rules, sweep and watcher services
//! - [`infrastructure`]: collaborator traits, in-process implementations, DI
//! - [`cli`]: the `declutter` binary

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
