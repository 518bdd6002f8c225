//! Orchestrates a single index pass: scan, diff, parse, write, resolve (§4.5).

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::unbounded;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::{IndexError, IndexResult};
use crate::hash::hash_file;
use crate::lock::WriterLock;
use crate::parsing::{self, Language, ParseOutput};
use crate::scanner::{Candidate, Scanner};
use crate::storage::{NewSymbol, Store};
use crate::types::{EdgeKind, FileId, SymbolId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexStats {
    pub files_scanned: usize,
    pub files_new: usize,
    pub files_changed: usize,
    pub files_unchanged: usize,
    pub files_deleted: usize,
    pub files_errored: usize,
    pub symbols_added: usize,
    pub symbols_removed: usize,
    pub edges_added: usize,
    pub edges_removed: usize,
    pub duration: Duration,
}

enum Classification {
    Unchanged,
    Changed,
    New,
}

struct WorkItem {
    candidate: Candidate,
}

struct ParsedFile {
    candidate: Candidate,
    output: Option<ParseOutput>,
}

/// Orchestrates one `index()` call against a repository rooted at `repo_root`.
pub struct Indexer<'a> {
    repo_root: &'a Path,
    settings: &'a Settings,
    store: &'a Store,
}

impl<'a> Indexer<'a> {
    pub fn new(repo_root: &'a Path, settings: &'a Settings, store: &'a Store) -> Self {
        Self { repo_root, settings, store }
    }

    /// Run a full index pass. `force` re-parses every candidate regardless
    /// of hash/mtime agreement. `cancel` is polled between files.
    pub fn run(&self, force: bool, cancel: &Arc<AtomicBool>) -> IndexResult<IndexStats> {
        self.run_limited(force, None, cancel)
    }

    /// As [`Indexer::run`], but stops scanning after `max_files` candidates
    /// (lexical walk order) when `max_files` is `Some` — a CLI-only escape
    /// hatch for trying the tool on a slice of a very large repository.
    pub fn run_limited(
        &self,
        force: bool,
        max_files: Option<usize>,
        cancel: &Arc<AtomicBool>,
    ) -> IndexResult<IndexStats> {
        let start = Instant::now();
        let lock_path = Settings::lock_path(self.repo_root);
        let _lock = WriterLock::acquire(&lock_path).map_err(IndexError::Store)?;
        info!(path = %lock_path.display(), "writer lock acquired");

        let mut stats = IndexStats::default();

        let scanner = Scanner::new(self.repo_root, self.settings);
        let mut candidates: Vec<Candidate> = scanner.candidates().collect();
        if let Some(max_files) = max_files {
            candidates.truncate(max_files);
        }
        stats.files_scanned = candidates.len();

        let stored_paths: HashSet<String> =
            self.store.all_file_paths().map_err(IndexError::Store)?.into_iter().collect();
        let mut seen_paths: HashSet<String> = HashSet::new();

        let mut work = Vec::new();
        for candidate in candidates {
            seen_paths.insert(candidate.relative_path.clone());
            let classification = self.classify(&candidate, force)?;
            match classification {
                Classification::Unchanged => stats.files_unchanged += 1,
                Classification::Changed => stats.files_changed += 1,
                Classification::New => stats.files_new += 1,
            }
            if !matches!(classification, Classification::Unchanged) {
                work.push(WorkItem { candidate });
            }
        }

        for stale in stored_paths.difference(&seen_paths) {
            if self.store.delete_file(stale).map_err(IndexError::Store)? {
                stats.files_deleted += 1;
            }
        }

        let (tx, rx) = unbounded::<ParsedFile>();
        let cancel_flag = cancel.clone();
        rayon::scope(|scope| {
            scope.spawn(|_| {
                work.into_par_iter().for_each_with(tx, |tx, item| {
                    if cancel_flag.load(Ordering::Relaxed) {
                        return;
                    }
                    let output = read_and_parse(&item.candidate);
                    let _ = tx.send(ParsedFile { candidate: item.candidate, output });
                });
            });
        });

        let mut touched_files: Vec<FileId> = Vec::new();
        for parsed in rx {
            if cancel.load(Ordering::Relaxed) {
                return Err(IndexError::Cancelled { files_completed: touched_files.len() });
            }
            match parsed.output {
                None => {
                    stats.files_errored += 1;
                    warn!(path = %parsed.candidate.relative_path, "parse failed");
                }
                Some(output) => {
                    let file_id = self.write_file(&parsed.candidate, &output, &mut stats)?;
                    touched_files.push(file_id);
                }
            }
        }

        self.resolve_edges(&touched_files, &mut stats)?;

        let counts = self.store.counts().map_err(IndexError::Store)?;
        self.store.update_stats(counts.files, counts.symbols).map_err(IndexError::Store)?;

        stats.duration = start.elapsed();
        info!(?stats, "index run complete");
        Ok(stats)
    }

    fn classify(&self, candidate: &Candidate, force: bool) -> IndexResult<Classification> {
        let Some(existing) = self.store.get_file_by_path(&candidate.relative_path).map_err(IndexError::Store)?
        else {
            return Ok(Classification::New);
        };

        if force || existing.mtime != candidate.mtime || existing.size != candidate.size {
            let hash = hash_file(&candidate.path).map_err(|source| IndexError::FileRead {
                path: candidate.path.clone(),
                source,
            })?;
            if hash != existing.content_hash {
                return Ok(Classification::Changed);
            }
        }
        Ok(Classification::Unchanged)
    }

    fn write_file(
        &self,
        candidate: &Candidate,
        output: &ParseOutput,
        stats: &mut IndexStats,
    ) -> IndexResult<FileId> {
        let hash = hash_file(&candidate.path)
            .map_err(|source| IndexError::FileRead { path: candidate.path.clone(), source })?;
        let file_id = self
            .store
            .upsert_file(
                &candidate.relative_path,
                candidate.mtime,
                candidate.size,
                &hash,
                candidate.language.as_deref(),
            )
            .map_err(IndexError::Store)?;

        let removed = self.store.delete_symbols_for_file(file_id).map_err(IndexError::Store)?;
        stats.symbols_removed += removed;

        let mut local_ids: Vec<Option<SymbolId>> = vec![None; output.symbols.len()];
        for (idx, symbol) in output.symbols.iter().enumerate() {
            let parent_id = symbol.parent_index.and_then(|p| local_ids.get(p).copied().flatten());
            let new_symbol = NewSymbol {
                name: symbol.name.clone(),
                kind: symbol.kind,
                line_start: symbol.span.start_line,
                line_end: symbol.span.end_line,
                column_start: Some(symbol.span.start_column),
                column_end: symbol.span.end_column,
                signature: symbol.signature.clone(),
                docstring: symbol.docstring.clone(),
                parent_id,
            };
            let id = self.store.add_symbol(file_id, &new_symbol).map_err(IndexError::Store)?;
            local_ids[idx] = Some(id);
            stats.symbols_added += 1;
        }

        debug!(path = %candidate.relative_path, symbols = output.symbols.len(), "file written");
        Ok(file_id)
    }

    /// Second pass (§4.3, §4.5): re-reads each touched file's callsites and
    /// imports and resolves them against symbols now present anywhere in the
    /// index, writing `call`/`import` edges. Unresolvable callsites/imports
    /// stay as data the store already holds but never become edges.
    fn resolve_edges(&self, touched_files: &[FileId], stats: &mut IndexStats) -> IndexResult<()> {
        for &file_id in touched_files {
            let symbols = self.store.symbols_for_file(file_id).map_err(IndexError::Store)?;
            let Some(file) = self.store.get_file(file_id).map_err(IndexError::Store)? else {
                continue;
            };
            let Some(language_str) = file.language.as_deref() else { continue };
            let Some(language) = parsing::language_for_extension(&guess_extension(language_str)) else {
                continue;
            };

            let Ok(source) = std::fs::read_to_string(self.repo_root.join(&file.path)) else {
                continue;
            };
            let output = parsing::parse_file(language, &source);

            let name_to_scope: HashMap<usize, SymbolId> = output
                .symbols
                .iter()
                .enumerate()
                .filter_map(|(i, _)| symbols.get(i).map(|s| (i, s.id)))
                .collect();

            for callsite in &output.callsites {
                let Some(&scope_id) = callsite.scope_symbol_index.as_ref().and_then(|i| name_to_scope.get(i))
                else {
                    continue;
                };
                let callee_name = callsite.callee_text.rsplit('.').next().unwrap_or(&callsite.callee_text);
                if let Some(target) = self.store.get_symbol_by_name(callee_name).map_err(IndexError::Store)? {
                    let mut metadata = HashMap::new();
                    metadata.insert("line".to_string(), callsite.line.to_string());
                    if output.used_fallback {
                        metadata.insert("extractor".to_string(), "fallback".to_string());
                    }
                    let edge = self
                        .store
                        .add_edge(scope_id, target.id, EdgeKind::Call, file_id, callsite.confidence, &metadata)
                        .map_err(IndexError::Store)?;
                    self.store
                        .add_callsite(edge, callsite.line, Some(callsite.column), None)
                        .map_err(IndexError::Store)?;
                    stats.edges_added += 1;
                }
            }

            for import in &output.imports {
                let target_name = import.name.clone().unwrap_or_else(|| import.module.clone());
                if let Some(target) = self.store.get_symbol_by_name(&target_name).map_err(IndexError::Store)? {
                    if let Some(source_symbol) = symbols.first() {
                        let mut metadata = HashMap::new();
                        metadata.insert("line".to_string(), import.line.to_string());
                        self.store
                            .add_edge(source_symbol.id, target.id, EdgeKind::Import, file_id, 0.85, &metadata)
                            .map_err(IndexError::Store)?;
                        stats.edges_added += 1;
                    }
                }
            }
        }
        Ok(())
    }
}

fn read_and_parse(candidate: &Candidate) -> Option<ParseOutput> {
    let extension = candidate.path.extension().map(|e| format!(".{}", e.to_string_lossy()))?;
    let language = parsing::language_for_extension(&extension)?;
    let content = std::fs::read_to_string(&candidate.path).ok()?;
    Some(parsing::parse_file(language, &content))
}

fn guess_extension(language: &str) -> String {
    match language {
        "python" => ".py",
        "javascript" => ".js",
        "typescript" => ".ts",
        "go" => ".go",
        "rust" => ".rs",
        "c" => ".c",
        "cpp" => ".cpp",
        _ => "",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn indexing_an_empty_repository_yields_zero_counters() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::default();
        let store = Store::open_in_memory().unwrap();
        let indexer = Indexer::new(dir.path(), &settings, &store);

        let cancel = Arc::new(AtomicBool::new(false));
        let stats = indexer.run(false, &cancel).unwrap();

        assert_eq!(stats.files_scanned, 0);
        assert_eq!(stats.files_new, 0);
    }

    #[test]
    fn indexing_twice_with_no_changes_reports_all_unchanged() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.py", "def foo():\n    pass\n");

        let settings = Settings::default();
        let store = Store::open_in_memory().unwrap();
        let indexer = Indexer::new(dir.path(), &settings, &store);
        let cancel = Arc::new(AtomicBool::new(false));

        let first = indexer.run(false, &cancel).unwrap();
        assert_eq!(first.files_new, 1);

        let second = indexer.run(false, &cancel).unwrap();
        assert_eq!(second.files_unchanged, 1);
        assert_eq!(second.files_new, 0);
        assert_eq!(second.files_changed, 0);
    }

    #[test]
    fn deleted_file_is_removed_from_store_on_reindex() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.py", "def foo():\n    pass\n");

        let settings = Settings::default();
        let store = Store::open_in_memory().unwrap();
        let indexer = Indexer::new(dir.path(), &settings, &store);
        let cancel = Arc::new(AtomicBool::new(false));
        indexer.run(false, &cancel).unwrap();

        std::fs::remove_file(dir.path().join("a.py")).unwrap();
        let second = indexer.run(false, &cancel).unwrap();
        assert_eq!(second.files_deleted, 1);
        assert!(store.get_file_by_path("a.py").unwrap().is_none());
    }

    #[test]
    fn content_change_without_mtime_change_is_detected_via_hash() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.py", "def foo():\n    pass\n");

        let settings = Settings::default();
        let store = Store::open_in_memory().unwrap();
        let indexer = Indexer::new(dir.path(), &settings, &store);
        let cancel = Arc::new(AtomicBool::new(false));
        indexer.run(false, &cancel).unwrap();

        // Force mode bypasses the mtime/size shortcut, exercising the hash path.
        write(dir.path(), "a.py", "def bar():\n    pass\n");
        let second = indexer.run(true, &cancel).unwrap();
        assert_eq!(second.files_changed, 1);
    }
}
