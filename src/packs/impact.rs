//! Upstream blast radius for a set of changed symbols/files (§4.7.3).

use serde::Serialize;
use serde_json::json;

use crate::budget::estimate_tokens;
use crate::error::PackError;
use crate::graph::{GraphEngine, ImpactTarget};
use crate::storage::Store;

const MIN_AFFECTED_SYMBOLS: usize = 20;
const MIN_AFFECTED_FILES: usize = 15;
const MIN_RANKED_INSPECTION: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AffectedSymbolEntry {
    pub name: String,
    pub file_path: String,
    pub depth: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedInspectionEntry {
    pub path: String,
    pub score: f64,
    pub reason: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImpactPack {
    pub changed_items: Vec<String>,
    pub affected_symbols: Vec<AffectedSymbolEntry>,
    pub affected_files: Vec<String>,
    pub affected_tests: Vec<String>,
    pub ranked_inspection: Vec<RankedInspectionEntry>,
}

impl ImpactPack {
    pub fn generate(
        store: &Store,
        graph: &GraphEngine,
        targets: Vec<String>,
        depth: u32,
        budget_tokens: usize,
    ) -> Result<Self, PackError> {
        let resolved = targets
            .iter()
            .map(|t| match t.parse::<i64>() {
                Ok(id) if id > 0 => ImpactTarget::Symbol(crate::types::SymbolId::new(id)),
                _ => ImpactTarget::Name(t.clone()),
            })
            .collect();

        let result = graph.impact(resolved, depth)?;

        let mut affected_symbols = Vec::with_capacity(result.affected_symbols.len());
        for entry in &result.affected_symbols {
            let Some(symbol) = store.get_symbol(entry.symbol_id)? else { continue };
            let file_path = store.get_file(symbol.file_id)?.map(|f| f.path).unwrap_or_default();
            affected_symbols.push(AffectedSymbolEntry { name: symbol.name, file_path, depth: entry.depth });
        }

        let mut affected_files = Vec::with_capacity(result.affected_files.len());
        for file_id in &result.affected_files {
            if let Some(file) = store.get_file(*file_id)? {
                affected_files.push(file.path);
            }
        }
        affected_files.sort();

        let mut affected_tests = Vec::with_capacity(result.affected_tests.len());
        for file_id in &result.affected_tests {
            if let Some(file) = store.get_file(*file_id)? {
                affected_tests.push(file.path);
            }
        }
        affected_tests.sort();

        let ranked_inspection = result
            .ranked_inspection
            .into_iter()
            .map(|r| RankedInspectionEntry { path: r.path, score: r.score, reason: r.reason })
            .collect();

        let mut pack =
            ImpactPack { changed_items: targets, affected_symbols, affected_files, affected_tests, ranked_inspection };

        if estimate_tokens(&pack.to_markdown(), true) > budget_tokens {
            pack.truncate(budget_tokens);
        }
        Ok(pack)
    }

    /// Trims affected symbols, then affected files, then the ranked
    /// inspection queue, in that order, down to the floors above (§4.7.3).
    fn truncate(&mut self, budget_tokens: usize) {
        while self.affected_symbols.len() > MIN_AFFECTED_SYMBOLS
            && estimate_tokens(&self.to_markdown(), true) > budget_tokens
        {
            self.affected_symbols.pop();
        }
        while self.affected_files.len() > MIN_AFFECTED_FILES && estimate_tokens(&self.to_markdown(), true) > budget_tokens
        {
            self.affected_files.pop();
        }
        while self.ranked_inspection.len() > MIN_RANKED_INSPECTION
            && estimate_tokens(&self.to_markdown(), true) > budget_tokens
        {
            self.ranked_inspection.pop();
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::from("# Impact Analysis\n\n## Changed Items\n\n");
        for item in &self.changed_items {
            out.push_str(&format!("- `{item}`\n"));
        }

        out.push_str(&format!("\n## Affected Files\n\nTotal: {}\n\n", self.affected_files.len()));
        for f in &self.affected_files {
            out.push_str(&format!("- `{f}`\n"));
        }

        out.push_str("\n## Affected Tests\n\n");
        if self.affected_tests.is_empty() {
            out.push_str("No affected tests found.\n");
        } else {
            for f in &self.affected_tests {
                out.push_str(&format!("- `{f}`\n"));
            }
        }

        out.push_str("\n## Recommended Inspection Order\n\n");
        out.push_str("Files ranked by importance (fan-in, test proximity, centrality):\n\n");
        for (i, item) in self.ranked_inspection.iter().enumerate() {
            out.push_str(&format!("{}. `{}` (score: {:.3}, reason: {})\n", i + 1, item.path, item.score, item.reason));
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "changed_items": self.changed_items,
            "affected_symbols": self.affected_symbols,
            "affected_files": self.affected_files,
            "affected_tests": self.affected_tests,
            "ranked_inspection": self.ranked_inspection,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::NewSymbol;
    use crate::types::{EdgeKind, SymbolKind};
    use std::collections::HashMap;

    fn symbol(name: &str, line: u32) -> NewSymbol {
        NewSymbol {
            name: name.to_string(),
            kind: SymbolKind::Function,
            line_start: line,
            line_end: Some(line),
            column_start: Some(0),
            column_end: None,
            signature: None,
            docstring: None,
            parent_id: None,
        }
    }

    #[test]
    fn impact_by_file_path_seeds_all_its_symbols() {
        let store = Store::open_in_memory().unwrap();
        let file = store.upsert_file("a.rs", 1, 1, "h", Some("rust")).unwrap();
        let a = store.add_symbol(file, &symbol("a", 1)).unwrap();
        let other_file = store.upsert_file("b.rs", 1, 1, "h", Some("rust")).unwrap();
        let caller = store.add_symbol(other_file, &symbol("caller", 1)).unwrap();
        store.add_edge(caller, a, EdgeKind::Call, other_file, 0.9, &HashMap::new()).unwrap();

        let graph = GraphEngine::new(&store);
        let pack = ImpactPack::generate(&store, &graph, vec!["a.rs".to_string()], 3, 8000).unwrap();
        assert!(pack.affected_files.contains(&"b.rs".to_string()));
    }

    #[test]
    fn test_files_are_surfaced_in_affected_tests() {
        let store = Store::open_in_memory().unwrap();
        let file = store.upsert_file("a.rs", 1, 1, "h", Some("rust")).unwrap();
        let a = store.add_symbol(file, &symbol("a", 1)).unwrap();
        let test_file = store.upsert_file("tests/a_test.rs", 1, 1, "h", Some("rust")).unwrap();
        let caller = store.add_symbol(test_file, &symbol("test_a", 1)).unwrap();
        store.add_edge(caller, a, EdgeKind::Call, test_file, 0.9, &HashMap::new()).unwrap();

        let graph = GraphEngine::new(&store);
        let pack = ImpactPack::generate(&store, &graph, vec!["a".to_string()], 3, 8000).unwrap();
        assert!(pack.affected_tests.contains(&"tests/a_test.rs".to_string()));
    }
}
