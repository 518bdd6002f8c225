//! Focused single-symbol slice: signature, docstring, code, callers/callees (§4.7.2).

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::json;

use crate::budget::estimate_tokens;
use crate::error::PackError;
use crate::graph::GraphEngine;
use crate::storage::{Store, SymbolRecord};
use crate::types::SymbolKind;

const CONTEXT_LINES: u32 = 2;
const MIN_CODE_LINES: usize = 10;
const CODE_LINE_STEP: usize = 10;
const MIN_CALLERS_CALLEES: usize = 3;
const FILE_CONTEXT_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetIdentity {
    pub name: String,
    pub file_path: String,
    pub kind: String,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborSymbol {
    pub name: String,
    pub file_path: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoomPack {
    pub target: TargetIdentity,
    pub signature: String,
    pub docstring: Option<String>,
    pub code_slice: String,
    pub callers: Vec<NeighborSymbol>,
    pub callees: Vec<NeighborSymbol>,
    pub file_context: String,
}

impl ZoomPack {
    /// Resolves `target` (integer id, bare name, or `path:line`) and builds
    /// the slice. Returns `Ok(None)` when nothing resolves (§4.7.2: a null
    /// pack, not an error).
    pub fn generate(
        store: &Store,
        graph: &GraphEngine,
        repo_root: &Path,
        target: &str,
        budget_tokens: usize,
    ) -> Result<Option<Self>, PackError> {
        let Some(symbol) = resolve_target(store, target)? else { return Ok(None) };
        let file = store.get_file(symbol.file_id)?;
        let Some(file) = file else { return Ok(None) };

        let code_slice = load_code_slice(repo_root, &file.path, &symbol);
        let callers = graph
            .callers(symbol.id, 1, 0.0)?
            .into_iter()
            .map(|n| to_neighbor(store, n.symbol_id, n.confidence))
            .collect::<Result<Vec<_>, PackError>>()?;
        let callees = graph
            .callees(symbol.id, 1, 0.0)?
            .into_iter()
            .map(|n| to_neighbor(store, n.symbol_id, n.confidence))
            .collect::<Result<Vec<_>, PackError>>()?;
        let file_context = build_file_context(store, &symbol)?;

        let mut pack = ZoomPack {
            target: TargetIdentity {
                name: symbol.name.clone(),
                file_path: file.path,
                kind: symbol.kind.as_str().to_string(),
                line: symbol.line_start,
            },
            signature: symbol.signature.clone().unwrap_or_else(|| symbol.name.clone()),
            docstring: symbol.docstring.clone(),
            code_slice,
            callers,
            callees,
            file_context,
        };

        if estimate_tokens(&pack.to_markdown(), true) > budget_tokens {
            pack.truncate(budget_tokens);
        }
        Ok(Some(pack))
    }

    /// Code slice tail-trimmed in 10-line steps (min 10 lines), then
    /// callers/callees to 3 each, then the docstring is dropped. Signature
    /// and identity block are never trimmed (§4.7.2).
    fn truncate(&mut self, budget_tokens: usize) {
        let mut keep = self.code_slice.lines().count();
        while keep > MIN_CODE_LINES && estimate_tokens(&self.to_markdown(), true) > budget_tokens {
            keep = keep.saturating_sub(CODE_LINE_STEP).max(MIN_CODE_LINES);
            self.code_slice = self.code_slice.lines().take(keep).collect::<Vec<_>>().join("\n");
        }

        while self.callers.len() > MIN_CALLERS_CALLEES && estimate_tokens(&self.to_markdown(), true) > budget_tokens {
            self.callers.pop();
        }
        while self.callees.len() > MIN_CALLERS_CALLEES && estimate_tokens(&self.to_markdown(), true) > budget_tokens {
            self.callees.pop();
        }

        if estimate_tokens(&self.to_markdown(), true) > budget_tokens {
            self.docstring = None;
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut out = format!(
            "# Zoom: {}\n\n**File:** `{}`\n**Kind:** {}\n**Line:** {}\n\n## Signature\n\n```\n{}\n```\n\n",
            self.target.name, self.target.file_path, self.target.kind, self.target.line, self.signature
        );
        if let Some(doc) = &self.docstring {
            out.push_str(&format!("## Documentation\n\n{doc}\n\n"));
        }
        out.push_str(&format!("## Code\n\n```\n{}\n```\n\n## Callers\n\n", self.code_slice));
        for c in &self.callers {
            out.push_str(&format!("- `{}` in `{}` (confidence: {:.2})\n", c.name, c.file_path, c.confidence));
        }
        out.push_str("\n## Callees\n\n");
        for c in &self.callees {
            out.push_str(&format!("- `{}` in `{}` (confidence: {:.2})\n", c.name, c.file_path, c.confidence));
        }
        out.push_str("\n## File Context\n\n");
        out.push_str(&self.file_context);
        out
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "target_symbol": self.target,
            "signature": self.signature,
            "docstring": self.docstring,
            "code_slice": self.code_slice,
            "callers": self.callers,
            "callees": self.callees,
        })
    }
}

fn to_neighbor(store: &Store, id: crate::types::SymbolId, confidence: f64) -> Result<NeighborSymbol, PackError> {
    let symbol = store.get_symbol(id)?;
    let (name, file_path) = match symbol {
        Some(s) => {
            let path = store.get_file(s.file_id)?.map(|f| f.path).unwrap_or_default();
            (s.name, path)
        }
        None => (String::new(), String::new()),
    };
    Ok(NeighborSymbol { name, file_path, confidence })
}

fn resolve_target(store: &Store, target: &str) -> Result<Option<SymbolRecord>, PackError> {
    if let Ok(id) = target.parse::<i64>() {
        if id > 0 {
            return Ok(store.get_symbol(crate::types::SymbolId::new(id))?);
        }
    }

    if let Some((path, line_str)) = target.rsplit_once(':') {
        if let Ok(line) = line_str.parse::<u32>() {
            if let Some(file) = store.get_file_by_path(path)? {
                let mut candidates: Vec<SymbolRecord> = store
                    .symbols_for_file(file.id)?
                    .into_iter()
                    .filter(|s| s.line_start <= line && s.line_end.map(|e| e >= line).unwrap_or(true))
                    .collect();
                candidates.sort_by_key(|s| std::cmp::Reverse(s.line_start));
                if let Some(found) = candidates.into_iter().next() {
                    return Ok(Some(found));
                }
            }
        }
    }

    Ok(store.get_symbol_by_name(target)?)
}

fn load_code_slice(repo_root: &Path, file_path: &str, symbol: &SymbolRecord) -> String {
    let full_path = repo_root.join(file_path);
    let Ok(content) = fs::read_to_string(&full_path) else {
        return format!("# File not found: {file_path}");
    };
    let lines: Vec<&str> = content.lines().collect();

    let line_start = symbol.line_start.saturating_sub(1) as usize;
    let line_end = symbol.line_end.unwrap_or(symbol.line_start) as usize;

    let context_start = line_start.saturating_sub(CONTEXT_LINES as usize);
    let context_end = (line_end + CONTEXT_LINES as usize).min(lines.len());

    lines[context_start.min(lines.len())..context_end].join("\n")
}

fn build_file_context(store: &Store, target: &SymbolRecord) -> Result<String, PackError> {
    let mut symbols = store.symbols_for_file(target.file_id)?;
    symbols.retain(|s| s.id != target.id && matches!(s.kind, SymbolKind::Class | SymbolKind::Function | SymbolKind::Method));
    symbols.sort_by_key(|s| s.line_start);

    if symbols.is_empty() {
        return Ok("(no other major symbols)".to_string());
    }

    let lines: Vec<String> = symbols
        .into_iter()
        .take(FILE_CONTEXT_LIMIT)
        .map(|s| format!("Line {}: {}", s.line_start, s.signature.unwrap_or(s.name)))
        .collect();
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::NewSymbol;
    use crate::types::{EdgeKind, SymbolKind};
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn symbol(name: &str, line: u32) -> NewSymbol {
        NewSymbol {
            name: name.to_string(),
            kind: SymbolKind::Function,
            line_start: line,
            line_end: Some(line),
            column_start: Some(0),
            column_end: None,
            signature: Some(format!("fn {name}()")),
            docstring: Some("does a thing".to_string()),
            parent_id: None,
        }
    }

    #[test]
    fn unresolved_target_returns_null_pack() {
        let store = Store::open_in_memory().unwrap();
        let graph = GraphEngine::new(&store);
        let dir = TempDir::new().unwrap();
        let pack = ZoomPack::generate(&store, &graph, dir.path(), "nonexistent", 4000).unwrap();
        assert!(pack.is_none());
    }

    #[test]
    fn resolves_by_name_and_includes_code_slice() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn target() {\n    1\n}\n").unwrap();

        let store = Store::open_in_memory().unwrap();
        let file = store.upsert_file("a.rs", 1, 1, "h", Some("rust")).unwrap();
        store.add_symbol(file, &symbol("target", 1)).unwrap();

        let graph = GraphEngine::new(&store);
        let pack = ZoomPack::generate(&store, &graph, dir.path(), "target", 4000).unwrap().unwrap();
        assert!(pack.code_slice.contains("fn target"));
        assert_eq!(pack.docstring.as_deref(), Some("does a thing"));
    }

    #[test]
    fn includes_direct_callers_and_callees() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn target() {}\nfn caller() {}\n").unwrap();

        let store = Store::open_in_memory().unwrap();
        let file = store.upsert_file("a.rs", 1, 1, "h", Some("rust")).unwrap();
        let target = store.add_symbol(file, &symbol("target", 1)).unwrap();
        let caller = store.add_symbol(file, &symbol("caller", 2)).unwrap();
        store.add_edge(caller, target, EdgeKind::Call, file, 0.9, &HashMap::new()).unwrap();

        let graph = GraphEngine::new(&store);
        let pack = ZoomPack::generate(&store, &graph, dir.path(), "target", 4000).unwrap().unwrap();
        assert_eq!(pack.callers.len(), 1);
        assert_eq!(pack.callers[0].name, "caller");
    }
}
