//! Lazy, restartable filesystem walk honoring ignore rules (§4.4).
//!
//! The scanner never materializes the full candidate list up front (§9) —
//! [`Scanner::candidates`] returns an iterator that filters and descends the
//! tree as it is consumed.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::Settings;
use crate::ignore_engine::IgnoreEngine;

/// Identity of one candidate file, before its bytes are read.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub path: PathBuf,
    pub relative_path: String,
    pub mtime: i64,
    pub size: u64,
    pub language: Option<String>,
}

pub struct Scanner<'a> {
    repo_root: PathBuf,
    ignore: IgnoreEngine,
    settings: &'a Settings,
}

impl<'a> Scanner<'a> {
    pub fn new(repo_root: &Path, settings: &'a Settings) -> Self {
        let gitignore_content = fs::read_to_string(repo_root.join(".gitignore")).ok();
        let ignore = IgnoreEngine::new(
            gitignore_content.as_deref(),
            &settings.ignore.include,
            &settings.ignore.exclude,
        );
        Self { repo_root: repo_root.to_path_buf(), ignore, settings }
    }

    /// A lazy iterator over every candidate file under the repository root,
    /// honoring ignore rules, symlink policy and the maximum file size.
    pub fn candidates(&self) -> impl Iterator<Item = Candidate> + '_ {
        let follow_symlinks = self.settings.indexing.follow_symlinks;
        let max_size = self.settings.indexing.max_file_size;
        let repo_root = self.repo_root.clone();

        WalkDir::new(&self.repo_root)
            .follow_links(follow_symlinks)
            .into_iter()
            .filter_entry(move |entry| {
                let Ok(relative) = entry.path().strip_prefix(&repo_root) else {
                    return true;
                };
                if relative.as_os_str().is_empty() {
                    return true;
                }
                let relative_str = relative.to_string_lossy().replace('\\', "/");
                !self.ignore.should_ignore(&relative_str, entry.file_type().is_dir())
            })
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(move |entry| self.to_candidate(entry.path(), max_size))
    }

    fn to_candidate(&self, path: &Path, max_size: u64) -> Option<Candidate> {
        if !follow_symlinks_ok(path, self.settings.indexing.follow_symlinks) {
            return None;
        }

        let metadata = fs::symlink_metadata(path).ok()?;
        if metadata.len() > max_size {
            return None;
        }

        let extension = path.extension().map(|e| format!(".{}", e.to_string_lossy()))?;
        let language = self.settings.extension_language(&extension)?.to_string();

        let relative_path = path.strip_prefix(&self.repo_root).ok()?.to_string_lossy().replace('\\', "/");
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        Some(Candidate { path: path.to_path_buf(), relative_path, mtime, size: metadata.len(), language: Some(language) })
    }
}

fn follow_symlinks_ok(path: &Path, follow: bool) -> bool {
    if follow {
        return true;
    }
    fs::symlink_metadata(path).map(|m| !m.file_type().is_symlink()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn scanner_finds_recognized_extensions_only() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.rs", "fn main() {}");
        write(dir.path(), "readme.txt", "hello");

        let settings = Settings::default();
        let scanner = Scanner::new(dir.path(), &settings);
        let found: Vec<_> = scanner.candidates().map(|c| c.relative_path).collect();

        assert!(found.contains(&"a.rs".to_string()));
        assert!(!found.contains(&"readme.txt".to_string()));
    }

    #[test]
    fn scanner_skips_default_ignored_directories() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "target/debug/build.rs", "fn x() {}");
        write(dir.path(), "src/main.rs", "fn main() {}");

        let settings = Settings::default();
        let scanner = Scanner::new(dir.path(), &settings);
        let found: Vec<_> = scanner.candidates().map(|c| c.relative_path).collect();

        assert!(found.iter().any(|p| p == "src/main.rs"));
        assert!(!found.iter().any(|p| p.starts_with("target/")));
    }

    #[test]
    fn scanner_skips_files_over_max_size() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "big.py", &"x".repeat(200));

        let mut settings = Settings::default();
        settings.indexing.max_file_size = 50;
        let scanner = Scanner::new(dir.path(), &settings);
        let found: Vec<_> = scanner.candidates().collect();

        assert!(found.is_empty());
    }
}
