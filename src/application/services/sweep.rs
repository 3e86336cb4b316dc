//! Sweep orchestration
//!
//! One sweep: locate the main content root, decide the page mode, run the
//! rules for that mode and collect the newly marked nodes.
//!
//! ```text
//! main root absent ─────────────────────────────► NotRendered
//! title ends with site suffix ─► widen column ─► rules 1-4 ─► Completed
//! path == feed path ───────────────────────────► rule 5 ───► Completed
//! otherwise ────────────────────────────────────► Idle
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::rules::{RuleBook, RuleName};
use crate::application::{ApplicationResult, SweepError};
use crate::config::Settings;
use crate::domain::{NodeId, PageMode};
use crate::infrastructure::traits::{DomTree, PageEnvironment};

/// Nodes newly marked during one completed sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub mode: PageMode,
    /// Per rule, in table order; rules that marked nothing are listed too.
    pub marks: Vec<(RuleName, Vec<NodeId>)>,
}

impl SweepReport {
    pub fn total_marked(&self) -> usize {
        self.marks.iter().map(|(_, nodes)| nodes.len()).sum()
    }

    pub fn marked_by(&self, rule: RuleName) -> &[NodeId] {
        self.marks
            .iter()
            .find(|(name, _)| *name == rule)
            .map(|(_, nodes)| nodes.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    /// The main content root does not exist yet.
    NotRendered,
    /// Neither an article nor the feed.
    Idle,
    Completed(SweepReport),
}

impl SweepOutcome {
    pub fn total_marked(&self) -> usize {
        match self {
            SweepOutcome::Completed(report) => report.total_marked(),
            _ => 0,
        }
    }

    pub fn report(&self) -> Option<&SweepReport> {
        match self {
            SweepOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }
}

impl fmt::Display for SweepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepOutcome::NotRendered => write!(f, "not rendered"),
            SweepOutcome::Idle => write!(f, "idle"),
            SweepOutcome::Completed(report) => {
                write!(f, "{} page, {} marked", report.mode, report.total_marked())
            }
        }
    }
}

/// Runs sweeps against any tree and page environment.
#[derive(Debug, Clone)]
pub struct SweepService {
    settings: Arc<Settings>,
    rules: RuleBook,
}

impl SweepService {
    /// Fails only when a configured shape does not parse.
    pub fn new(settings: Arc<Settings>) -> ApplicationResult<Self> {
        let rules = RuleBook::from_settings(&settings)?;
        Ok(Self { settings, rules })
    }

    pub fn rules(&self) -> &RuleBook {
        &self.rules
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Page mode from the title and path signals; title wins.
    pub fn detect_mode<E: PageEnvironment + ?Sized>(&self, env: &E) -> Option<PageMode> {
        if env.page_title().ends_with(&self.settings.site_suffix) {
            Some(PageMode::Article)
        } else if env.current_path() == self.settings.feed_path {
            Some(PageMode::Feed)
        } else {
            None
        }
    }

    /// Run one sweep. The first collaborator failure ends the sweep.
    #[instrument(skip(self, tree, env))]
    pub fn run<T, E>(&self, tree: &mut T, env: &E) -> Result<SweepOutcome, SweepError>
    where
        T: DomTree + ?Sized,
        E: PageEnvironment + ?Sized,
    {
        let Some(main) = tree.find_by_id(&self.settings.main_content_id) else {
            debug!(id = %self.settings.main_content_id, "main content root not rendered yet");
            return Ok(SweepOutcome::NotRendered);
        };

        let Some(mode) = self.detect_mode(env) else {
            debug!("page is neither an article nor the feed");
            return Ok(SweepOutcome::Idle);
        };

        if mode == PageMode::Article {
            self.widen_column(tree, main)?;
        }

        let mut marks = Vec::new();
        for rule in self.rules.for_mode(mode) {
            let marked = rule
                .apply(tree, main, &self.settings.mark_tag)
                .map_err(|source| SweepError::Rule {
                    rule: rule.name,
                    source,
                })?;
            marks.push((rule.name, marked));
        }

        let report = SweepReport { mode, marks };
        debug!(%mode, marked = report.total_marked(), "sweep completed");
        Ok(SweepOutcome::Completed(report))
    }

    fn widen_column<T: DomTree + ?Sized>(&self, tree: &mut T, main: NodeId) -> Result<(), SweepError> {
        let style = &self.settings.column_style;
        let current = tree.attribute(main, "style").map_err(SweepError::Layout)?;
        if current.as_deref() != Some(style.as_str()) {
            tree.set_attribute(main, "style", style)
                .map_err(SweepError::Layout)?;
        }
        Ok(())
    }
}
