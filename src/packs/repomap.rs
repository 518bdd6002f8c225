//! Repository overview: directory tree, top files, key symbols, totals (§4.7.1).

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::json;

use crate::budget::{estimate_tokens, truncate_to_budget};
use crate::error::PackError;
use crate::storage::{FileRecord, Store, StoreCounts};
use crate::types::SymbolKind;

const DEFAULT_TOP_FILES: usize = 20;
const MAX_TREE_DEPTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedFile {
    pub path: String,
    pub score: f64,
    pub reason: String,
    pub symbol_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSymbolEntry {
    pub name: String,
    pub kind: String,
    pub signature: String,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencySummary {
    pub file_count: usize,
    pub symbol_count: usize,
    pub edge_count: usize,
    pub callsite_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepoMapPack {
    pub directory_tree: String,
    pub top_files: Vec<RankedFile>,
    pub file_symbols: BTreeMap<String, Vec<FileSymbolEntry>>,
    pub dependency_summary: DependencySummary,
}

impl RepoMapPack {
    pub fn generate(store: &Store, budget_tokens: usize, focus: Option<&str>) -> Result<Self, PackError> {
        let mut files = store.all_files()?;
        if let Some(focus) = focus {
            let prefix = focus.trim_end_matches('/');
            files.retain(|f| f.path.starts_with(prefix));
        }

        let directory_tree = build_directory_tree(&files, MAX_TREE_DEPTH);
        let top_files = rank_files(store, &files)?;
        let file_symbols = file_symbols(store, &top_files[..top_files.len().min(DEFAULT_TOP_FILES)], 5)?;
        let dependency_summary = dependency_summary(store.counts()?);

        let mut pack = RepoMapPack { directory_tree, top_files, file_symbols, dependency_summary };

        if estimate_tokens(&pack.to_markdown(), true) > budget_tokens {
            pack.truncate(budget_tokens);
        }
        Ok(pack)
    }

    /// Trim the top-files tail, then shrink per-file symbols 5→2, per §4.7.1's
    /// truncation policy. The directory tree and dependency summary are
    /// never touched.
    fn truncate(&mut self, budget_tokens: usize) {
        while self.top_files.len() > 1 && estimate_tokens(&self.to_markdown(), true) > budget_tokens {
            if let Some(dropped) = self.top_files.pop() {
                self.file_symbols.remove(&dropped.path);
            }
        }

        if estimate_tokens(&self.to_markdown(), true) > budget_tokens {
            for symbols in self.file_symbols.values_mut() {
                while symbols.len() > 2 {
                    symbols.pop();
                }
            }
        }

        // Still over budget even with two symbols per file: drop the
        // top-files/key-symbols sections entirely rather than touch the
        // directory tree or dependency summary (§4.7.1).
        if estimate_tokens(&self.to_markdown(), true) > budget_tokens {
            self.top_files.clear();
            self.file_symbols.clear();

            if estimate_tokens(&self.to_markdown(), true) > budget_tokens {
                self.directory_tree = truncate_to_budget(&self.directory_tree, budget_tokens / 2, true);
            }
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::from("# Repository Overview\n\n## Directory Structure\n\n");
        out.push_str(&self.directory_tree);
        out.push_str("\n\n## Top Files by Importance\n\n");
        for (i, f) in self.top_files.iter().enumerate() {
            out.push_str(&format!("{}. `{}` - {}\n", i + 1, f.path, f.reason));
        }
        out.push_str("\n## Key Symbols by File\n\n");
        for (path, symbols) in &self.file_symbols {
            out.push_str(&format!("### {path}\n"));
            for sym in symbols {
                out.push_str(&format!("- `{}` ({})\n", sym.signature, sym.kind));
            }
            out.push('\n');
        }
        out.push_str("## Dependency Summary\n\n");
        out.push_str(&format!("Total files: {}\n", self.dependency_summary.file_count));
        out.push_str(&format!("Total symbols: {}\n", self.dependency_summary.symbol_count));
        out.push_str(&format!("Total edges: {}\n", self.dependency_summary.edge_count));
        out
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "directory_tree": self.directory_tree,
            "top_files": self.top_files,
            "file_symbols": self.file_symbols,
            "dependency_summary": self.dependency_summary,
        })
    }
}

fn build_directory_tree(files: &[FileRecord], max_depth: usize) -> String {
    if files.is_empty() {
        return "(no files)".to_string();
    }

    #[derive(Default)]
    struct Node {
        children: BTreeMap<String, Node>,
    }

    let mut root = Node::default();
    for file in files {
        let mut current = &mut root;
        for part in file.path.split('/').take(max_depth) {
            current = current.children.entry(part.to_string()).or_default();
        }
    }

    fn render(node: &Node, prefix: &str, lines: &mut Vec<String>) {
        let count = node.children.len();
        for (i, (name, child)) in node.children.iter().enumerate() {
            let is_last = i + 1 == count;
            let connector = if is_last { "└── " } else { "├── " };
            lines.push(format!("{prefix}{connector}{name}"));
            if !child.children.is_empty() {
                let extension = if is_last { "    " } else { "│   " };
                render(child, &format!("{prefix}{extension}"), lines);
            }
        }
    }

    let mut lines = Vec::new();
    render(&root, "", &mut lines);
    if lines.is_empty() { "(empty)".to_string() } else { lines.join("\n") }
}

fn rank_files(store: &Store, files: &[FileRecord]) -> Result<Vec<RankedFile>, PackError> {
    let mut scored = Vec::with_capacity(files.len());
    for file in files {
        let symbols = store.symbols_for_file(file.id)?;
        let symbol_count = symbols.len();
        let mut score = 0.0;
        let mut reasons = Vec::new();

        if symbol_count > 0 {
            score += (symbol_count as f64 / 10.0).min(1.0) * 0.3;
            reasons.push(format!("{symbol_count} symbols"));
        }
        if is_entry_point(&file.path) {
            score += 0.5;
            reasons.push("entry point".to_string());
        }
        if ["core/", "lib/", "utils/", "common/"].iter().any(|m| file.path.contains(m)) {
            score += 0.2;
            reasons.push("core module".to_string());
        }
        if [".json", ".yaml", ".yml", ".toml"].iter().any(|ext| file.path.ends_with(ext)) {
            score += 0.1;
        }

        scored.push(RankedFile {
            path: file.path.clone(),
            score,
            reason: if reasons.is_empty() { "standard file".to_string() } else { reasons.join(", ") },
            symbol_count,
        });
    }

    scored.sort_by(|a, b| {
        b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.path.cmp(&b.path))
    });
    Ok(scored)
}

fn is_entry_point(path: &str) -> bool {
    let basename = path.rsplit('/').next().unwrap_or(path);
    ["__init__.", "main.", "app.", "index."].iter().any(|prefix| basename.starts_with(prefix))
}

fn file_symbols(
    store: &Store,
    files: &[RankedFile],
    max_per_file: usize,
) -> Result<BTreeMap<String, Vec<FileSymbolEntry>>, PackError> {
    let mut result = BTreeMap::new();
    for file in files {
        let Some(record) = store.get_file_by_path(&file.path)? else { continue };
        let mut symbols = store.symbols_for_file(record.id)?;
        symbols.sort_by(|a, b| {
            let rank = |k: SymbolKind| if matches!(k, SymbolKind::Class | SymbolKind::Function) { 0 } else { 1 };
            rank(a.kind).cmp(&rank(b.kind)).then_with(|| {
                let len_a = a.signature.as_deref().unwrap_or("").len();
                let len_b = b.signature.as_deref().unwrap_or("").len();
                len_b.cmp(&len_a)
            })
        });

        let entries = symbols
            .into_iter()
            .take(max_per_file)
            .map(|s| FileSymbolEntry {
                signature: s.signature.clone().unwrap_or_else(|| s.name.clone()),
                name: s.name,
                kind: s.kind.as_str().to_string(),
                line: s.line_start,
            })
            .collect();
        result.insert(file.path.clone(), entries);
    }
    Ok(result)
}

fn dependency_summary(counts: StoreCounts) -> DependencySummary {
    DependencySummary {
        file_count: counts.files,
        symbol_count: counts.symbols,
        edge_count: counts.edges,
        callsite_count: counts.callsites,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::NewSymbol;
    use crate::types::SymbolKind;

    fn symbol(name: &str, kind: SymbolKind, line: u32) -> NewSymbol {
        NewSymbol {
            name: name.to_string(),
            kind,
            line_start: line,
            line_end: Some(line),
            column_start: Some(0),
            column_end: None,
            signature: Some(format!("fn {name}()")),
            docstring: None,
            parent_id: None,
        }
    }

    #[test]
    fn empty_repository_produces_empty_tree() {
        let store = Store::open_in_memory().unwrap();
        let pack = RepoMapPack::generate(&store, 8000, None).unwrap();
        assert_eq!(pack.directory_tree, "(no files)");
        assert!(pack.top_files.is_empty());
    }

    #[test]
    fn entry_point_and_core_module_bonuses_rank_above_plain_files() {
        let store = Store::open_in_memory().unwrap();
        let main = store.upsert_file("src/main.rs", 1, 1, "h", Some("rust")).unwrap();
        store.add_symbol(main, &symbol("main", SymbolKind::Function, 1)).unwrap();
        let plain = store.upsert_file("src/zzz.rs", 1, 1, "h", Some("rust")).unwrap();
        store.add_symbol(plain, &symbol("helper", SymbolKind::Function, 1)).unwrap();

        let pack = RepoMapPack::generate(&store, 8000, None).unwrap();
        assert_eq!(pack.top_files[0].path, "src/main.rs");
    }

    #[test]
    fn focus_restricts_to_subdirectory_prefix() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_file("src/a.rs", 1, 1, "h", Some("rust")).unwrap();
        store.upsert_file("docs/readme.md", 1, 1, "h", None).unwrap();

        let pack = RepoMapPack::generate(&store, 8000, Some("src")).unwrap();
        assert!(pack.top_files.iter().all(|f| f.path.starts_with("src")));
    }

    #[test]
    fn truncation_preserves_dependency_summary_and_tree() {
        let store = Store::open_in_memory().unwrap();
        for i in 0..30 {
            let file = store.upsert_file(&format!("src/file_{i}.rs"), 1, 1, "h", Some("rust")).unwrap();
            store.add_symbol(file, &symbol(&format!("f{i}"), SymbolKind::Function, 1)).unwrap();
        }

        let pack = RepoMapPack::generate(&store, 50, None).unwrap();
        assert!(estimate_tokens(&pack.to_markdown(), true) <= 55);
        assert!(pack.to_markdown().contains("Dependency Summary"));
    }
}
