//! Layered configuration for the index: defaults → `.pui/config.json` → environment.
//!
//! # Environment Variables
//!
//! Environment variables are prefixed with `PUI_` and use double underscores
//! to separate nested levels:
//! - `PUI_INDEXING__BATCH_SIZE=250` sets `indexing.batch_size`
//! - `PUI_BUDGETS__REPOMAP=12000` sets `budgets.repomap`
//! - `PUI_OUTPUT__VERBOSE=true` sets `output.verbose`

use figment::providers::{Env, Format, Json, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The `.pui/` directory name at the repository root (§6).
pub const STATE_DIR: &str = ".pui";
pub const CONFIG_FILE: &str = "config.json";
pub const DB_FILE: &str = "index.db";
pub const LOCK_FILE: &str = "index.lock";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub budgets: Budgets,

    #[serde(default)]
    pub languages: Languages,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub ignore: IgnoreConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Budgets {
    #[serde(default = "default_repomap_budget")]
    pub repomap: usize,
    #[serde(default = "default_zoom_budget")]
    pub zoom: usize,
    #[serde(default = "default_impact_budget")]
    pub impact: usize,
    #[serde(default = "default_find_budget")]
    pub find: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Languages {
    #[serde(default = "default_enabled_languages")]
    pub enabled: Vec<String>,
    #[serde(default = "default_extensions")]
    pub extensions: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct IndexingConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default)]
    pub follow_symlinks: bool,
    #[serde(default)]
    pub include_hidden: bool,
    /// Not part of the stable JSON schema (§6); overridable via CLI/env only.
    #[serde(default = "default_parallel_threads", skip_serializing)]
    pub parallel_threads: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct IgnoreConfig {
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct OutputConfig {
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default = "default_true")]
    pub color: bool,
}

fn default_version() -> u32 {
    1
}
fn default_repomap_budget() -> usize {
    8000
}
fn default_zoom_budget() -> usize {
    4000
}
fn default_impact_budget() -> usize {
    6000
}
fn default_find_budget() -> usize {
    2000
}
fn default_batch_size() -> usize {
    100
}
fn default_max_file_size() -> u64 {
    1_048_576
}
fn default_parallel_threads() -> usize {
    num_cpus::get()
}
fn default_format() -> String {
    "markdown".to_string()
}
fn default_true() -> bool {
    true
}

fn default_enabled_languages() -> Vec<String> {
    vec![
        "python".into(),
        "javascript".into(),
        "typescript".into(),
        "go".into(),
        "rust".into(),
        "c".into(),
        "cpp".into(),
    ]
}

fn default_extensions() -> HashMap<String, String> {
    let mut m = HashMap::new();
    for (ext, lang) in [
        (".py", "python"),
        (".js", "javascript"),
        (".jsx", "javascript"),
        (".mjs", "javascript"),
        (".ts", "typescript"),
        (".tsx", "typescript"),
        (".go", "go"),
        (".rs", "rust"),
        (".c", "c"),
        (".h", "c"),
        (".cpp", "cpp"),
        (".cc", "cpp"),
        (".cxx", "cpp"),
        (".hpp", "cpp"),
    ] {
        m.insert(ext.to_string(), lang.to_string());
    }
    m
}

impl Default for Budgets {
    fn default() -> Self {
        Self {
            repomap: default_repomap_budget(),
            zoom: default_zoom_budget(),
            impact: default_impact_budget(),
            find: default_find_budget(),
        }
    }
}

impl Default for Languages {
    fn default() -> Self {
        Self { enabled: default_enabled_languages(), extensions: default_extensions() }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_file_size: default_max_file_size(),
            follow_symlinks: false,
            include_hidden: false,
            parallel_threads: default_parallel_threads(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { format: default_format(), verbose: false, color: true }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            budgets: Budgets::default(),
            languages: Languages::default(),
            indexing: IndexingConfig::default(),
            ignore: IgnoreConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Settings {
    /// Load configuration for a repository rooted at `repo_root`, layering
    /// defaults, `<repo_root>/.pui/config.json` (if present) and `PUI_`
    /// environment variables. Unknown keys are ignored; malformed JSON is
    /// returned as an `Err` so the caller can log it and fall back to
    /// `Settings::default()` (§7 Configuration errors) rather than abort.
    pub fn load(repo_root: &Path) -> Result<Self, figment::Error> {
        let config_path = repo_root.join(STATE_DIR).join(CONFIG_FILE);
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Json::file(config_path))
            .merge(Env::prefixed("PUI_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
    }

    pub fn config_path(repo_root: &Path) -> PathBuf {
        repo_root.join(STATE_DIR).join(CONFIG_FILE)
    }

    pub fn db_path(repo_root: &Path) -> PathBuf {
        repo_root.join(STATE_DIR).join(DB_FILE)
    }

    pub fn lock_path(repo_root: &Path) -> PathBuf {
        repo_root.join(STATE_DIR).join(LOCK_FILE)
    }

    /// Write the current settings as the repository's config file, creating
    /// `.pui/` if needed. Used by `pui init`.
    pub fn save(&self, repo_root: &Path) -> std::io::Result<PathBuf> {
        let path = Self::config_path(repo_root);
        std::fs::create_dir_all(path.parent().unwrap())?;
        let json = serde_json::to_string_pretty(self)
            .expect("Settings serialization is infallible for well-formed defaults");
        std::fs::write(&path, json)?;
        Ok(path)
    }

    pub fn extension_language(&self, ext: &str) -> Option<&str> {
        self.languages.extensions.get(ext).map(String::as_str).filter(|lang| {
            self.languages.enabled.iter().any(|l| l == lang)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_settings_match_spec_defaults() {
        let s = Settings::default();
        assert_eq!(s.version, 1);
        assert_eq!(s.budgets.repomap, 8000);
        assert_eq!(s.budgets.zoom, 4000);
        assert_eq!(s.budgets.impact, 6000);
        assert_eq!(s.budgets.find, 2000);
        assert_eq!(s.indexing.batch_size, 100);
        assert_eq!(s.indexing.max_file_size, 1_048_576);
        assert!(!s.indexing.follow_symlinks);
        assert_eq!(s.output.format, "markdown");
    }

    #[test]
    fn load_falls_back_to_defaults_when_no_config_file() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(dir.path()).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn load_merges_partial_json_config() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(STATE_DIR)).unwrap();
        std::fs::write(
            Settings::config_path(dir.path()),
            r#"{"budgets": {"repomap": 20000}, "indexing": {"batch_size": 500}}"#,
        )
        .unwrap();

        let settings = Settings::load(dir.path()).unwrap();
        assert_eq!(settings.budgets.repomap, 20000);
        assert_eq!(settings.budgets.zoom, 4000); // untouched default survives
        assert_eq!(settings.indexing.batch_size, 500);
    }

    #[test]
    fn extension_language_respects_enabled_list() {
        let mut s = Settings::default();
        s.languages.enabled.retain(|l| l != "python");
        assert_eq!(s.extension_language(".rs"), Some("rust"));
        assert_eq!(s.extension_language(".py"), None);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let mut s = Settings::default();
        s.budgets.zoom = 9999;
        s.save(dir.path()).unwrap();

        let loaded = Settings::load(dir.path()).unwrap();
        assert_eq!(loaded.budgets.zoom, 9999);
    }
}
