//! Command dispatch

use std::io;
use std::path::Path;
use std::time::Duration;

use clap::CommandFactory;
use clap_complete::generate;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::application::services::SweepOutcome;
use crate::application::{ApplicationError, PathContextExt};
use crate::cli::args::{Cli, Commands, ConfigCommands, PageArgs};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, Settings};
use crate::domain::{Document, DocumentBuilder, DomainError, NodeDescription, TreeDescription};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::traits::StaticEnvironment;
use crate::infrastructure::InfraError;
use crate::util::path::collect_tree_files;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Sweep { input, page }) => _sweep(&container(cli)?, input, page),
        Some(Commands::Tree { file, page, sweep }) => _tree(&container(cli)?, file, page, *sweep),
        Some(Commands::Replay { file, script, page }) => {
            _replay(&container(cli)?, file, script, page)
        }
        Some(Commands::Rules) => _rules(&container(cli)?),
        Some(Commands::Config { command }) => _config(cli, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Err(CliError::Usage("no command given, see --help".into())),
    }
}

fn container(cli: &Cli) -> CliResult<ServiceContainer> {
    let settings = Settings::load(cli.config.as_deref())?;
    Ok(ServiceContainer::new(settings)?)
}

/// A parsed tree file with the page signals resolved against `page`.
struct LoadedTree {
    document: Document,
    env: StaticEnvironment,
}

fn load_tree(path: &Path, page: &PageArgs) -> CliResult<LoadedTree> {
    let content = std::fs::read_to_string(path).with_path_context("read tree", path)?;
    let description = TreeDescription::from_toml(&content).map_err(|e| match e {
        DomainError::InvalidTree { message } => DomainError::InvalidTree {
            message: format!("{}: {message}", path.display()),
        },
        other => other,
    })?;
    let document = DocumentBuilder::new().build(&description)?;

    let title = page
        .title
        .clone()
        .or(description.page.title)
        .unwrap_or_default();
    let current = page
        .path
        .clone()
        .or(description.page.path)
        .unwrap_or_default();

    Ok(LoadedTree {
        document,
        env: StaticEnvironment::new(title, current),
    })
}

fn print_outcome(outcome: &SweepOutcome, document: &Document) {
    output::action("outcome", outcome);
    if let Some(report) = outcome.report() {
        for (rule, nodes) in &report.marks {
            for node in nodes {
                let label = document
                    .get_node(*node)
                    .map(|entry| entry.data.to_string())
                    .unwrap_or_else(|| node.to_string());
                output::marked(&format!("{label} ({rule})"));
            }
        }
    }
}

#[instrument(skip(container))]
fn _sweep(container: &ServiceContainer, path: &Path, page: &PageArgs) -> CliResult<()> {
    let files = collect_tree_files(path)
        .map_err(|e| InfraError::io(format!("collect trees: {}", path.display()), e))?;
    debug!(count = files.len(), "tree files");
    if files.is_empty() {
        output::warning(&format!("no tree files under {}", path.display()));
        return Ok(());
    }

    let sweeper = container.sweep_service();
    let mut last_failure = None;
    for file in &files {
        output::header(&file.display());
        let mut loaded = load_tree(file, page)?;
        match sweeper.run(&mut loaded.document, &loaded.env) {
            Ok(outcome) => print_outcome(&outcome, &loaded.document),
            Err(e) => {
                output::error(&e);
                last_failure = Some(e);
            }
        }
    }

    match last_failure {
        Some(e) => Err(ApplicationError::from(e).into()),
        None => Ok(()),
    }
}

#[instrument(skip(container))]
fn _tree(container: &ServiceContainer, file: &Path, page: &PageArgs, sweep: bool) -> CliResult<()> {
    let mut loaded = load_tree(file, page)?;
    if sweep {
        let outcome = container
            .sweep_service()
            .run(&mut loaded.document, &loaded.env)
            .map_err(ApplicationError::from)?;
        output::action("outcome", &outcome);
    }
    output::info(&output::tree_view(
        &loaded.document,
        &container.settings.mark_tag,
    ));
    Ok(())
}

/// One scripted mutation: insert `node` under `parent`, or remove the
/// element whose id is `remove`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayStep {
    /// Virtual time of the mutation
    #[serde(default)]
    pub at_ms: u64,
    /// `id` of the parent element; the document root when absent
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub node: Option<NodeDescription>,
    #[serde(default)]
    pub remove: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplayScript {
    #[serde(default, rename = "step")]
    pub steps: Vec<ReplayStep>,
}

impl ReplayScript {
    pub fn from_toml(content: &str) -> Result<Self, String> {
        let mut script: Self = toml::from_str(content).map_err(|e| e.to_string())?;
        if let Some(step) = script
            .steps
            .iter()
            .find(|step| step.node.is_some() == step.remove.is_some())
        {
            return Err(format!(
                "step at {}ms needs exactly one of `node` or `remove`",
                step.at_ms
            ));
        }
        script.steps.sort_by_key(|step| step.at_ms);
        Ok(script)
    }
}

/// Totals of a replay run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplaySummary {
    pub sweeps: usize,
    pub marked: usize,
}

/// Drive a session through `script` on the virtual clock.
pub fn replay(
    container: &ServiceContainer,
    document: Document,
    env: StaticEnvironment,
    script: &ReplayScript,
    mut on_sweep: impl FnMut(Duration, &SweepOutcome, &Document),
) -> Result<ReplaySummary, InfraError> {
    let mut session = container.session(document, env);
    let mut summary = ReplaySummary::default();
    let mut record = |summary: &mut ReplaySummary, at: Duration, outcome: &SweepOutcome, doc: &Document| {
        summary.sweeps += 1;
        summary.marked += outcome.total_marked();
        on_sweep(at, outcome, doc);
    };

    if let Some(outcome) = session.start() {
        record(&mut summary, session.now(), &outcome, session.document());
    }

    let builder = DocumentBuilder::new();
    for step in &script.steps {
        for (at, outcome) in session.advance_to(Duration::from_millis(step.at_ms)) {
            record(&mut summary, at, &outcome, session.document());
        }

        let missing = |id: &str| InfraError::Script {
            path: format!("step at {}ms", step.at_ms),
            message: format!("no element with id {id}"),
        };
        if let Some(id) = &step.remove {
            let node = session.document().find_by_id(id).ok_or_else(|| missing(id.as_str()))?;
            session.document_mut().remove_node(node)?;
        } else if let Some(node) = &step.node {
            let parent = match &step.parent {
                Some(id) => session.document().find_by_id(id).ok_or_else(|| missing(id.as_str()))?,
                None => session.document().root().ok_or_else(|| missing("<root>"))?,
            };
            builder.append(session.document_mut(), Some(parent), node)?;
        }
        session.deliver();
    }

    for (at, outcome) in session.settle() {
        record(&mut summary, at, &outcome, session.document());
    }
    Ok(summary)
}

#[instrument(skip(container))]
fn _replay(
    container: &ServiceContainer,
    file: &Path,
    script_path: &Path,
    page: &PageArgs,
) -> CliResult<()> {
    let loaded = load_tree(file, page)?;
    let content = std::fs::read_to_string(script_path).with_path_context("read script", script_path)?;
    let script = ReplayScript::from_toml(&content).map_err(|message| InfraError::Script {
        path: script_path.display().to_string(),
        message,
    })?;

    let summary = replay(container, loaded.document, loaded.env, &script, |at, outcome, doc| {
        output::header(&format!("t={}ms", at.as_millis()));
        print_outcome(outcome, doc);
    })?;

    output::success(&format!(
        "{} steps, {} sweeps, {} nodes marked",
        script.steps.len(),
        summary.sweeps,
        summary.marked
    ));
    Ok(())
}

fn _rules(container: &ServiceContainer) -> CliResult<()> {
    for rule in container.sweep_service().rules().rules() {
        output::header(&format!("{} [{}]", rule.name, rule.mode));
        let phrases = if rule.phrases.is_empty() {
            "(none)".to_string()
        } else {
            rule.phrases
                .iter()
                .map(|p| format!("{p:?}"))
                .collect::<Vec<_>>()
                .join(" + ")
        };
        output::detail(&format!("phrases:   {phrases}"));
        output::detail(&format!("predicate: {} ({:?})", rule.predicate, rule.scope));
        output::detail(&format!("marks:     {}", rule.strategy.describe()));
    }
    Ok(())
}

fn _config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(cli.config.as_deref())?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => match global_config_path() {
            Some(path) => {
                let state = if path.exists() { "exists" } else { "not created" };
                output::info(&format!("{} ({state})", path.display()));
            }
            None => output::warning("cannot determine config directory"),
        },
    }
    Ok(())
}
