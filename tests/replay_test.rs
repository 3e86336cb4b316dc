//! Integration tests for scripted replays on the virtual clock.

use std::fs;

use declutter::cli::commands::{replay, ReplayScript, ReplaySummary};
use declutter::config::Settings;
use declutter::domain::Document;
use declutter::infrastructure::di::ServiceContainer;
use declutter::infrastructure::traits::StaticEnvironment;
use declutter::util::testing::{fixture_document, init_test_setup, resources_dir};

#[ctor::ctor]
fn init() {
    init_test_setup();
}

fn stream_script() -> ReplayScript {
    let content = fs::read_to_string(resources_dir().join("stream.toml")).unwrap();
    ReplayScript::from_toml(&content).unwrap()
}

fn article_env() -> StaticEnvironment {
    StaticEnvironment::new("Why is the sky blue? - Quora", "/Why-is-the-sky-blue")
}

#[test]
fn given_streamed_answers_when_replaying_then_burst_collapses_into_one_sweep() {
    let container = ServiceContainer::new(Settings::default()).unwrap();
    let mut sweep_times = Vec::new();

    let summary = replay(
        &container,
        fixture_document("shell.toml"),
        article_env(),
        &stream_script(),
        |at, _, _| sweep_times.push(at.as_millis()),
    )
    .unwrap();

    // initial sweep, the 0/40/80ms burst at 180ms, the 500ms step at 600ms
    assert_eq!(sweep_times, vec![0, 180, 600]);
    assert_eq!(summary, ReplaySummary { sweeps: 3, marked: 3 });
}

#[test]
fn given_replay_when_finished_then_document_marks_match_report() {
    let container = ServiceContainer::new(Settings::default()).unwrap();
    let mut final_marked = 0;

    replay(
        &container,
        fixture_document("shell.toml"),
        article_env(),
        &stream_script(),
        |_, _, doc: &Document| {
            final_marked = doc
                .iter()
                .filter(|(_, node)| node.data.tags.contains("declutter-hidden"))
                .count();
        },
    )
    .unwrap();

    assert_eq!(final_marked, 3);
}

#[test]
fn given_feed_page_when_replaying_article_script_then_nothing_marked() {
    let container = ServiceContainer::new(Settings::default()).unwrap();

    let summary = replay(
        &container,
        fixture_document("shell.toml"),
        StaticEnvironment::new("Quora", "/"),
        &stream_script(),
        |_, _, _| {},
    )
    .unwrap();

    assert_eq!(summary.sweeps, 3);
    assert_eq!(summary.marked, 0);
}

#[test]
fn given_empty_script_when_replaying_then_only_initial_sweep() {
    let container = ServiceContainer::new(Settings::default()).unwrap();
    let script = ReplayScript::from_toml("").unwrap();

    let summary = replay(
        &container,
        fixture_document("article.toml"),
        article_env(),
        &script,
        |_, _, _| {},
    )
    .unwrap();

    assert_eq!(summary, ReplaySummary { sweeps: 1, marked: 4 });
}
