//! Integration tests for Settings config loading with layered merge semantics.
//!
//! Merge Semantics:
//! - Defaults → Global: REPLACE (global defines the real baseline)
//! - Global → Local: UNION with negation support
//! - Any → Env vars: REPLACE (explicit user override)
//!
//! Note: These tests run without a global config (temp directories only),
//! so they effectively test local config merging with defaults.

use std::fs;

use tempfile::TempDir;

use declutter::application::ApplicationError;
use declutter::config::Settings;
use declutter::infrastructure::di::ServiceContainer;

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("declutter.toml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn given_local_item_tags_when_load_then_unions_with_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[rules]
item_tags = ["question_item"]
"#,
    );

    let settings = Settings::load(Some(path.as_path())).expect("load settings");

    assert_eq!(
        settings.rules.item_tags,
        vec!["dom_annotate_question_answer_item", "question_item"]
    );
}

#[test]
fn given_local_negation_when_load_then_removes_inherited_tag() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[rules]
item_tags = ["!dom_annotate_question_answer_item", "answer_card"]
"#,
    );

    let settings = Settings::load(Some(path.as_path())).expect("load settings");

    assert_eq!(settings.rules.item_tags, vec!["answer_card"]);
}

#[test]
fn given_local_scalars_when_load_then_override_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r##"
mark_tag = "muted"
site_suffix = " | Example"
debounce_ms = 40

[rules]
feed_shape = "#mainContent > *"
"##,
    );

    let settings = Settings::load(Some(path.as_path())).expect("load settings");

    assert_eq!(settings.mark_tag, "muted");
    assert_eq!(settings.site_suffix, " | Example");
    assert_eq!(settings.debounce_ms, 40);
    assert_eq!(settings.rules.feed_shape, "#mainContent > *");
    // untouched values keep their defaults
    assert_eq!(settings.main_content_id, "mainContent");
    assert_eq!(settings.rules.content_block_tag, "q-box");
}

#[test]
fn given_missing_local_file_when_load_then_config_error() {
    let dir = TempDir::new().unwrap();

    let result = Settings::load(Some(dir.path().join("absent.toml").as_path()));

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_malformed_local_file_when_load_then_config_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "debounce_ms = \"soon\"\n");

    let result = Settings::load(Some(path.as_path()));

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_invalid_feed_shape_in_config_when_building_container_then_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[rules]\nfeed_shape = \"#mainContent >\"\n");
    let settings = Settings::load(Some(path.as_path())).expect("load settings");

    assert!(ServiceContainer::new(settings).is_err());
}

#[test]
fn given_template_when_parsed_then_equals_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, &Settings::template());

    let settings = Settings::load(Some(path.as_path())).expect("template must parse");

    assert_eq!(settings.rules, Settings::default().rules);
    assert_eq!(settings.debounce_ms, 100);
}

#[test]
fn given_effective_settings_when_serialized_then_loadable_again() {
    let dir = TempDir::new().unwrap();
    let original = Settings {
        mark_tag: "muted".into(),
        ..Settings::default()
    };
    let path = write_config(&dir, &original.to_toml().unwrap());

    let loaded = Settings::load(Some(path.as_path())).unwrap();

    assert_eq!(loaded.mark_tag, "muted");
}
