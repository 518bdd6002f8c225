//! Three-tier ignore-pattern precedence for the file scanner (§4.2).
//!
//! Precedence, highest first:
//! 1. CLI `--include` patterns force a path back in regardless of anything
//!    below.
//! 2. CLI `--exclude` patterns force a path out.
//! 3. Default patterns + `.gitignore`, evaluated in file order so a later
//!    negation (`!pattern`) can re-include something an earlier pattern
//!    excluded.
//!
//! Hidden entries (dotfiles/dotdirs other than `.`/`..`) are excluded ahead
//! of tier 3 unless a CLI include pattern already matched.

use std::path::Path;

const DEFAULT_PATTERNS: &[&str] = &[
    ".git/",
    "node_modules/",
    "target/",
    "dist/",
    "build/",
    "__pycache__/",
    "*.pyc",
    ".venv/",
    "venv/",
    ".pui/",
];

#[derive(Debug, Clone)]
pub struct IgnorePattern {
    raw: String,
    is_negation: bool,
    is_directory: bool,
    is_anchored: bool,
    glob: glob::Pattern,
}

impl IgnorePattern {
    pub fn new(pattern: &str) -> Option<Self> {
        let mut p = pattern.trim();
        if p.is_empty() || p.starts_with('#') {
            return None;
        }

        let is_negation = p.starts_with('!');
        if is_negation {
            p = &p[1..];
        }

        let is_directory = p.ends_with('/');
        if is_directory {
            p = &p[..p.len() - 1];
        }

        let is_anchored = p.starts_with('/');
        if is_anchored {
            p = &p[1..];
        }

        let glob = glob::Pattern::new(p).ok()?;

        Some(Self { raw: p.to_string(), is_negation, is_directory, is_anchored, glob })
    }

    pub fn matches(&self, path: &str, is_dir: bool) -> bool {
        if self.is_directory && !is_dir {
            return false;
        }

        if self.is_anchored {
            return path == self.raw || path.starts_with(&format!("{}/", self.raw));
        }

        if self.glob.matches(path) {
            return true;
        }

        if path.split('/').any(|part| self.glob.matches(part)) {
            return true;
        }

        glob::Pattern::new(&format!("**/{}", self.raw))
            .map(|p| p.matches(path))
            .unwrap_or(false)
    }
}

pub struct IgnoreEngine {
    patterns: Vec<IgnorePattern>,
    include: Vec<IgnorePattern>,
    exclude: Vec<IgnorePattern>,
}

impl IgnoreEngine {
    /// Build an engine from default patterns plus an optional `.gitignore`
    /// file content, then layer the CLI-level include/exclude overrides.
    pub fn new(gitignore_content: Option<&str>, include: &[String], exclude: &[String]) -> Self {
        let mut patterns: Vec<IgnorePattern> =
            DEFAULT_PATTERNS.iter().filter_map(|p| IgnorePattern::new(p)).collect();

        if let Some(content) = gitignore_content {
            patterns.extend(content.lines().filter_map(IgnorePattern::new));
        }

        Self {
            patterns,
            include: include.iter().filter_map(|p| IgnorePattern::new(p)).collect(),
            exclude: exclude.iter().filter_map(|p| IgnorePattern::new(p)).collect(),
        }
    }

    /// Decide whether `path` (relative to the repo root, forward-slash
    /// separated) should be skipped during a scan.
    pub fn should_ignore(&self, path: &str, is_dir: bool) -> bool {
        let path = path.replace('\\', "/");

        if self.include.iter().any(|p| p.matches(&path, is_dir)) {
            return false;
        }

        if self.exclude.iter().any(|p| p.matches(&path, is_dir)) {
            return true;
        }

        if is_hidden(&path) {
            return true;
        }

        let mut ignored = false;
        for pattern in &self.patterns {
            if pattern.matches(&path, is_dir) {
                ignored = !pattern.is_negation;
            }
        }
        ignored
    }
}

fn is_hidden(path: &str) -> bool {
    let basename = Path::new(path).file_name().and_then(|n| n.to_str()).unwrap_or(path);
    basename.starts_with('.') && basename != "." && basename != ".."
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_patterns_ignore_common_build_dirs() {
        let engine = IgnoreEngine::new(None, &[], &[]);
        assert!(engine.should_ignore("target", true));
        assert!(engine.should_ignore("target/debug/binary", false));
        assert!(engine.should_ignore("node_modules", true));
    }

    #[test]
    fn hidden_entries_are_ignored_by_default() {
        let engine = IgnoreEngine::new(None, &[], &[]);
        assert!(engine.should_ignore(".env", false));
        assert!(engine.should_ignore("src/.hidden_dir", true));
    }

    #[test]
    fn cli_include_overrides_default_ignore() {
        let engine = IgnoreEngine::new(None, &["target/keep.txt".to_string()], &[]);
        assert!(!engine.should_ignore("target/keep.txt", false));
    }

    #[test]
    fn cli_exclude_overrides_gitignore_negation() {
        let gitignore = "*.log\n!important.log\n";
        let engine =
            IgnoreEngine::new(Some(gitignore), &[], &["important.log".to_string()]);
        assert!(engine.should_ignore("important.log", false));
    }

    #[test]
    fn gitignore_negation_reincludes_a_previously_matched_path() {
        let gitignore = "*.log\n!important.log\n";
        let engine = IgnoreEngine::new(Some(gitignore), &[], &[]);
        assert!(engine.should_ignore("debug.log", false));
        assert!(!engine.should_ignore("important.log", false));
    }

    #[test]
    fn anchored_pattern_only_matches_at_root() {
        let gitignore = "/build\n";
        let engine = IgnoreEngine::new(Some(gitignore), &[], &[]);
        assert!(engine.should_ignore("build", true));
        assert!(!engine.should_ignore("src/build", true));
    }

    #[test]
    fn unanchored_pattern_matches_at_any_depth() {
        let gitignore = "*.pyc\n";
        let engine = IgnoreEngine::new(Some(gitignore), &[], &[]);
        assert!(engine.should_ignore("pkg/module.pyc", false));
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let gitignore = "# a comment\n\n*.tmp\n";
        let engine = IgnoreEngine::new(Some(gitignore), &[], &[]);
        assert!(engine.should_ignore("scratch.tmp", false));
        assert!(!engine.should_ignore("# a comment", false));
    }
}
