//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/declutter/declutter.toml`
//! 3. Local config: file passed with `--config`
//! 4. Environment variables: `DECLUTTER_*` prefix

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::util::path::expand_env_vars;

/// Site-structure knobs used to build the rule table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RulesConfig {
    /// Tags marking a recognized answer/question item container
    pub item_tags: Vec<String>,
    /// Tag of direct main-content children that are regular content blocks
    pub content_block_tag: String,
    /// Shape of a feed post (ad posts are marked at this level)
    pub feed_shape: String,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            item_tags: vec!["dom_annotate_question_answer_item".into()],
            content_block_tag: "q-box".into(),
            feed_shape: "#mainContent > * > *".into(),
        }
    }
}

/// Raw rules config for intermediate parsing (arrays are Option to detect "not specified").
///
/// Used during layered config merging to distinguish between:
/// - `None` → field not specified, inherit from base
/// - `Some([])` → explicit empty array
/// - `Some([...])` → explicit values to merge
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawRulesConfig {
    pub item_tags: Option<Vec<String>>,
    pub content_block_tag: Option<String>,
    pub feed_shape: Option<String>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub mark_tag: Option<String>,
    pub main_content_id: Option<String>,
    pub site_suffix: Option<String>,
    pub feed_path: Option<String>,
    pub column_style: Option<String>,
    pub debounce_ms: Option<u64>,
    #[serde(default)]
    pub rules: RawRulesConfig,
}

impl RulesConfig {
    /// Merge arrays with union semantics and negation support.
    ///
    /// - Items from overlay are added to base
    /// - Items prefixed with `!` remove the corresponding item from the result
    /// - Duplicates are de-duplicated
    ///
    /// # Examples
    /// ```ignore
    /// merge_array(&["a", "b"], &["c"])       // → ["a", "b", "c"]
    /// merge_array(&["a", "b"], &["!a", "c"]) // → ["b", "c"]
    /// ```
    pub fn merge_array(base: &[String], overlay: &[String]) -> Vec<String> {
        let mut result: HashSet<String> = base.iter().cloned().collect();

        for pattern in overlay {
            if let Some(negated) = pattern.strip_prefix('!') {
                result.remove(negated);
            } else {
                result.insert(pattern.clone());
            }
        }

        // Convert to sorted Vec for deterministic output
        let mut vec: Vec<String> = result.into_iter().collect();
        vec.sort();
        vec
    }

    /// Merge overlay config onto self (base).
    ///
    /// - Scalar options: overlay wins if Some, otherwise keep base
    /// - Arrays: union merge with negation support (if overlay specified)
    pub fn merge(&self, overlay: &RawRulesConfig) -> Self {
        Self {
            item_tags: overlay
                .item_tags
                .as_ref()
                .map(|o| Self::merge_array(&self.item_tags, o))
                .unwrap_or_else(|| self.item_tags.clone()),
            content_block_tag: overlay
                .content_block_tag
                .clone()
                .unwrap_or_else(|| self.content_block_tag.clone()),
            feed_shape: overlay
                .feed_shape
                .clone()
                .unwrap_or_else(|| self.feed_shape.clone()),
        }
    }

    /// Apply global config onto defaults.
    ///
    /// Unlike `merge()`, arrays use REPLACE semantics: a global array
    /// completely replaces the compiled default.
    pub fn apply_global(&self, global: &RawRulesConfig) -> Self {
        Self {
            item_tags: global
                .item_tags
                .clone()
                .unwrap_or_else(|| self.item_tags.clone()),
            content_block_tag: global
                .content_block_tag
                .clone()
                .unwrap_or_else(|| self.content_block_tag.clone()),
            feed_shape: global
                .feed_shape
                .clone()
                .unwrap_or_else(|| self.feed_shape.clone()),
        }
    }
}

/// Unified configuration for declutter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Tag added to suppressed nodes
    pub mark_tag: String,
    /// `id` of the main content root
    pub main_content_id: String,
    /// Page-title suffix that identifies article pages
    pub site_suffix: String,
    /// Path of the home feed
    pub feed_path: String,
    /// `style` applied to the main content root in article mode
    pub column_style: String,
    /// Quiet interval before a sweep runs
    pub debounce_ms: u64,
    /// Rule table knobs
    pub rules: RulesConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mark_tag: "declutter-hidden".into(),
            main_content_id: "mainContent".into(),
            site_suffix: " - Quora".into(),
            feed_path: "/".into(),
            column_style: "width: 100%; max-width: none".into(),
            debounce_ms: 100,
            rules: RulesConfig::default(),
        }
    }
}

/// Get the XDG config directory for declutter.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "declutter").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("declutter.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    fn apply_scalars(&self, raw: &RawSettings) -> Self {
        Self {
            mark_tag: raw.mark_tag.clone().unwrap_or_else(|| self.mark_tag.clone()),
            main_content_id: raw
                .main_content_id
                .clone()
                .unwrap_or_else(|| self.main_content_id.clone()),
            site_suffix: raw
                .site_suffix
                .clone()
                .unwrap_or_else(|| self.site_suffix.clone()),
            feed_path: raw
                .feed_path
                .clone()
                .unwrap_or_else(|| self.feed_path.clone()),
            column_style: raw
                .column_style
                .clone()
                .unwrap_or_else(|| self.column_style.clone()),
            debounce_ms: raw.debounce_ms.unwrap_or(self.debounce_ms),
            rules: self.rules.clone(),
        }
    }

    /// Merge overlay config onto self (base) with union semantics for arrays.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        let mut merged = self.apply_scalars(overlay);
        merged.rules = self.rules.merge(&overlay.rules);
        merged
    }

    /// Apply global config onto defaults with REPLACE semantics for arrays.
    fn apply_global(&self, global: &RawSettings) -> Self {
        let mut applied = self.apply_scalars(global);
        applied.rules = self.rules.apply_global(&global.rules);
        applied
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local` - Optional local config file (`--config`)
    ///
    /// # Array Merge Semantics
    /// - Defaults → Global: REPLACE (global defines the real baseline)
    /// - Global → Local: UNION with negation support
    /// - Any → Env vars: REPLACE (explicit user override)
    pub fn load(local: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.apply_global(&raw);
            }
        }

        if let Some(local) = local {
            let local_path = PathBuf::from(expand_env_vars(&local.to_string_lossy()));
            if !local_path.exists() {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", local_path.display()),
                });
            }
            let raw = load_raw_settings(&local_path)?;
            current = current.merge_with(&raw);
        }

        current = Self::apply_env_overrides(current)?;

        Ok(current)
    }

    /// Apply DECLUTTER_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("DECLUTTER")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("rules.item_tags"),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_string("mark_tag") {
            settings.mark_tag = val;
        }
        if let Ok(val) = config.get_string("main_content_id") {
            settings.main_content_id = val;
        }
        if let Ok(val) = config.get_string("site_suffix") {
            settings.site_suffix = val;
        }
        if let Ok(val) = config.get_string("feed_path") {
            settings.feed_path = val;
        }
        if let Ok(val) = config.get_string("column_style") {
            settings.column_style = val;
        }
        if let Ok(val) = config.get_int("debounce_ms") {
            settings.debounce_ms = u64::try_from(val).map_err(|_| ApplicationError::Config {
                message: format!("debounce_ms must not be negative: {val}"),
            })?;
        }
        if let Ok(val) = config.get::<Vec<String>>("rules.item_tags") {
            settings.rules.item_tags = val;
        }
        if let Ok(val) = config.get_string("rules.content_block_tag") {
            settings.rules.content_block_tag = val;
        }
        if let Ok(val) = config.get_string("rules.feed_shape") {
            settings.rules.feed_shape = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r##"# declutter configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/declutter/declutter.toml  (defines your baseline)
#   Local:  file given with --config            (per-site additions)
#   Env:    DECLUTTER_* environment variables   (explicit overrides)
#
# Array Merge Semantics:
#   Global config REPLACES compiled defaults.
#   Local config UNIONS with global.
#   Use "!item" in local config to REMOVE an inherited item:
#     item_tags = ["question_item", "!dom_annotate_question_answer_item"]

# Tag added to every suppressed node
# mark_tag = "declutter-hidden"

# id of the main content root
# main_content_id = "mainContent"

# Page titles ending with this suffix are article pages
# site_suffix = " - Quora"

# Path of the home feed
# feed_path = "/"

# style applied to the content column in article mode
# column_style = "width: 100%; max-width: none"

# Quiet interval (ms) before a sweep runs after the tree changes
# debounce_ms = 100

[rules]
# Tags of recognized answer/question item containers
# item_tags = ["dom_annotate_question_answer_item"]

# Tag of regular content blocks directly below the main content root
# content_block_tag = "q-box"

# Shape of a feed post
# feed_shape = "#mainContent > * > *"
"##
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_no_config_when_loading_then_uses_defaults() {
        let settings = Settings::load(None).expect("load defaults");
        assert!(!settings.mark_tag.is_empty());
        assert!(!settings.main_content_id.is_empty());
        assert!(settings.debounce() > Duration::ZERO);
    }

    #[test]
    fn given_default_rules_config_when_created_then_has_answer_item_tag() {
        let rules = RulesConfig::default();
        assert!(rules
            .item_tags
            .contains(&"dom_annotate_question_answer_item".to_string()));
        assert_eq!(rules.content_block_tag, "q-box");
    }

    #[test]
    fn given_default_settings_when_serialized_then_parses_back() {
        let settings = Settings::default();
        let text = settings.to_toml().unwrap();
        let parsed: Settings = toml::from_str(&text).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn given_template_when_parsed_then_is_valid_toml() {
        let raw: RawSettings = toml::from_str(&Settings::template()).unwrap();
        assert!(raw.mark_tag.is_none());
        assert!(raw.rules.item_tags.is_none());
    }

    // ========================================
    // Tests for merge_array union semantics
    // ========================================

    #[test]
    fn test_merge_array_union() {
        let base = vec!["a".to_string(), "b".to_string()];
        let overlay = vec!["c".to_string()];
        let result = RulesConfig::merge_array(&base, &overlay);

        assert_eq!(result, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_merge_array_negation() {
        let base = vec!["a".to_string(), "b".to_string()];
        let overlay = vec!["!a".to_string(), "c".to_string()];
        let result = RulesConfig::merge_array(&base, &overlay);

        assert!(
            !result.contains(&"a".to_string()),
            "a should be removed by !a"
        );
        assert_eq!(result, vec!["b", "c"]);
    }

    #[test]
    fn test_merge_array_duplicates() {
        let base = vec!["a".to_string(), "b".to_string()];
        let overlay = vec!["a".to_string(), "c".to_string()];
        let result = RulesConfig::merge_array(&base, &overlay);

        assert_eq!(result.len(), 3);
    }

    #[test]
    fn test_merge_rules_config() {
        let base = RulesConfig::default();
        let overlay = RawRulesConfig {
            item_tags: Some(vec!["question_item".to_string()]),
            content_block_tag: None,
            feed_shape: Some("#feed > * > *".to_string()),
        };

        let result = base.merge(&overlay);

        assert_eq!(
            result.item_tags,
            vec!["dom_annotate_question_answer_item", "question_item"]
        );
        assert_eq!(result.content_block_tag, "q-box");
        assert_eq!(result.feed_shape, "#feed > * > *");
    }

    #[test]
    fn test_apply_global_replaces_arrays() {
        let base = RulesConfig::default();
        let global = RawRulesConfig {
            item_tags: Some(vec!["question_item".to_string()]),
            ..RawRulesConfig::default()
        };

        let result = base.apply_global(&global);

        assert_eq!(
            result.item_tags,
            vec!["question_item".to_string()],
            "Global should REPLACE default item_tags"
        );
        assert_eq!(result.feed_shape, base.feed_shape);
    }

    #[test]
    fn test_apply_scalars_keeps_unspecified_values() {
        let base = Settings::default();
        let raw = RawSettings {
            debounce_ms: Some(250),
            ..RawSettings::default()
        };

        let result = base.merge_with(&raw);

        assert_eq!(result.debounce(), Duration::from_millis(250));
        assert_eq!(result.mark_tag, base.mark_tag);
        assert_eq!(result.rules, base.rules);
    }

    #[test]
    fn given_template_when_generated_then_documents_every_default_selector() {
        let template = Settings::template();

        assert!(template.starts_with("# declutter configuration"));
        assert!(template.contains(r##"# feed_shape = "#mainContent > * > *""##));
        assert!(template.trim_end().ends_with("> * > *\""));
        toml::from_str::<toml::Table>(&template).expect("template is valid toml");
    }
}
