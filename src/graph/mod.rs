//! Cycle-safe traversal with confidence aggregation (§4.6).

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::GraphError;
use crate::storage::{Store, SymbolRecord};
use crate::types::{FileId, SymbolId};

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub symbol_id: SymbolId,
    pub name: String,
    pub confidence: f64,
    pub depth: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AffectedSymbol {
    pub symbol_id: SymbolId,
    pub depth: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedFile {
    pub path: String,
    pub score: f64,
    pub reason: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImpactResult {
    pub affected_symbols: Vec<AffectedSymbol>,
    pub affected_files: Vec<FileId>,
    pub affected_tests: Vec<FileId>,
    pub ranked_inspection: Vec<RankedFile>,
}

/// A target passed to `impact()`: either a resolved symbol id or a string
/// tried first as an exact symbol name, then as a file path (§4.6).
pub enum ImpactTarget {
    Symbol(SymbolId),
    Name(String),
}

/// Borrows the store for its lifetime; never outlives it (§9). Caches
/// symbol rows looked up during a traversal; the cache does not survive
/// past the engine instance (no live invalidation mid-run).
pub struct GraphEngine<'a> {
    store: &'a Store,
    cache: std::cell::RefCell<HashMap<SymbolId, SymbolRecord>>,
}

impl<'a> GraphEngine<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store, cache: std::cell::RefCell::new(HashMap::new()) }
    }

    fn symbol(&self, id: SymbolId) -> Result<Option<SymbolRecord>, GraphError> {
        if let Some(cached) = self.cache.borrow().get(&id) {
            return Ok(Some(cached.clone()));
        }
        let row = self.store.get_symbol(id)?;
        if let Some(row) = &row {
            self.cache.borrow_mut().insert(id, row.clone());
        }
        Ok(row)
    }

    /// Symbols reachable by following incoming edges from `target`.
    pub fn callers(&self, target: SymbolId, depth: u32, min_conf: f64) -> Result<Vec<Node>, GraphError> {
        self.traverse(target, depth, min_conf, Direction::Incoming)
    }

    /// Symbols reachable by following outgoing edges from `target`.
    pub fn callees(&self, target: SymbolId, depth: u32, min_conf: f64) -> Result<Vec<Node>, GraphError> {
        self.traverse(target, depth, min_conf, Direction::Outgoing)
    }

    fn traverse(
        &self,
        target: SymbolId,
        depth: u32,
        min_conf: f64,
        direction: Direction,
    ) -> Result<Vec<Node>, GraphError> {
        let mut visited: HashSet<SymbolId> = HashSet::from([target]);
        let mut queue: VecDeque<(SymbolId, u32, f64)> = VecDeque::from([(target, 0, 1.0)]);
        let mut results = Vec::new();

        while let Some((current, current_depth, path_confidence)) = queue.pop_front() {
            if current_depth >= depth {
                continue;
            }

            let edges = match direction {
                Direction::Incoming => self.store.get_incoming_edges(current)?,
                Direction::Outgoing => self.store.get_outgoing_edges(current)?,
            };

            for edge in edges {
                if visited.contains(&edge.opposing.id) {
                    continue;
                }
                visited.insert(edge.opposing.id);

                let edge_confidence = edge.confidence.max(edge.kind.confidence_floor());
                let new_path_confidence = path_confidence * edge_confidence;

                if new_path_confidence >= min_conf {
                    results.push(Node {
                        symbol_id: edge.opposing.id,
                        name: edge.opposing.name.clone(),
                        confidence: new_path_confidence,
                        depth: current_depth + 1,
                    });
                }

                queue.push_back((edge.opposing.id, current_depth + 1, new_path_confidence));
            }
        }

        results.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(results)
    }

    /// The upstream closure of a set of changed symbols/files (§4.6).
    pub fn impact(&self, targets: Vec<ImpactTarget>, depth: u32) -> Result<ImpactResult, GraphError> {
        let mut seeds: HashSet<SymbolId> = HashSet::new();
        let mut changed_files: HashSet<FileId> = HashSet::new();

        for target in targets {
            match target {
                ImpactTarget::Symbol(id) => {
                    seeds.insert(id);
                    if let Some(sym) = self.symbol(id)? {
                        changed_files.insert(sym.file_id);
                    }
                }
                ImpactTarget::Name(name) => {
                    if let Some(sym) = self.store.get_symbol_by_name(&name)? {
                        seeds.insert(sym.id);
                        changed_files.insert(sym.file_id);
                    } else if let Some(file) = self.store.get_file_by_path(&name)? {
                        changed_files.insert(file.id);
                        for sym in self.store.symbols_for_file(file.id)? {
                            seeds.insert(sym.id);
                        }
                    }
                }
            }
        }

        let mut visited: HashSet<SymbolId> = seeds.clone();
        let mut queue: VecDeque<(SymbolId, u32)> = seeds.iter().map(|&s| (s, 0)).collect();
        let mut affected_symbols = Vec::new();
        let mut affected_files: HashSet<FileId> = HashSet::new();

        while let Some((current, current_depth)) = queue.pop_front() {
            affected_symbols.push(AffectedSymbol { symbol_id: current, depth: current_depth });
            if let Some(sym) = self.symbol(current)? {
                affected_files.insert(sym.file_id);
            }

            if current_depth >= depth {
                continue;
            }

            for edge in self.store.get_incoming_edges(current)? {
                if visited.insert(edge.opposing.id) {
                    queue.push_back((edge.opposing.id, current_depth + 1));
                }
            }
        }

        let non_seed_files: HashSet<FileId> =
            affected_files.difference(&changed_files).copied().collect();

        let mut fan_in_by_file: HashMap<FileId, usize> = HashMap::new();
        let mut affected_count_by_file: HashMap<FileId, usize> = HashMap::new();
        for symbol in &affected_symbols {
            if let Some(sym) = self.symbol(symbol.symbol_id)? {
                *affected_count_by_file.entry(sym.file_id).or_insert(0) += 1;
                *fan_in_by_file.entry(sym.file_id).or_insert(0) += self.store.fan_in(symbol.symbol_id)?;
            }
        }

        let mut affected_tests = Vec::new();
        let mut ranked_inspection = Vec::new();
        for &file_id in &non_seed_files {
            let Some(file) = self.store.get_file(file_id)? else { continue };
            let is_test = is_test_file(&file.path);
            if is_test {
                affected_tests.push(file_id);
            }

            let fan_in_score = (fan_in_by_file.get(&file_id).copied().unwrap_or(0) as f64 / 10.0).min(1.0);
            let test_score = if is_test { 0.3 } else { 0.0 };
            let centrality_score =
                (affected_count_by_file.get(&file_id).copied().unwrap_or(0) as f64 / 5.0).min(1.0) * 0.2;
            let composite = fan_in_score + test_score + centrality_score;

            let reason = if test_score > 0.0 {
                "test_file"
            } else if fan_in_score >= 0.7 {
                "high_fan_in"
            } else if fan_in_score >= 0.3 {
                "moderate_fan_in"
            } else {
                "low_fan_in"
            };

            ranked_inspection.push(RankedFile { path: file.path, score: composite, reason });
        }

        ranked_inspection.sort_by(|a, b| {
            b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.path.cmp(&b.path))
        });

        affected_symbols.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.symbol_id.cmp(&b.symbol_id)));

        Ok(ImpactResult {
            affected_symbols,
            affected_files: affected_files.into_iter().collect(),
            affected_tests,
            ranked_inspection,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Incoming,
    Outgoing,
}

/// Case-insensitive match against the conventional test-file markers (§4.6).
fn is_test_file(path: &str) -> bool {
    let lower = path.to_lowercase();
    const MARKERS: &[&str] =
        &["test_", "_test.", "_spec.", ".spec.", "tests/", "/tests/", "__tests__/", "/__tests__/"];
    MARKERS.iter().any(|m| lower.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::NewSymbol;
    use crate::types::{EdgeKind, SymbolKind};
    use std::collections::HashMap as StdHashMap;

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
    fn callers_excludes_the_originating_symbol() {
        let store = Store::open_in_memory().unwrap();
        let file = store.upsert_file("a.rs", 1, 1, "h", Some("rust")).unwrap();
        let target = store.add_symbol(file, &symbol("target", 1)).unwrap();
        let caller = store.add_symbol(file, &symbol("caller", 2)).unwrap();
        store.add_edge(caller, target, EdgeKind::Call, file, 0.9, &StdHashMap::new()).unwrap();

        let engine = GraphEngine::new(&store);
        let callers = engine.callers(target, 5, 0.0).unwrap();
        assert_eq!(callers.len(), 1);
        assert_eq!(callers[0].symbol_id, caller);
        assert!(!callers.iter().any(|n| n.symbol_id == target));
    }

    #[test]
    fn cycle_terminates_and_excludes_origin() {
        let store = Store::open_in_memory().unwrap();
        let file = store.upsert_file("a.rs", 1, 1, "h", Some("rust")).unwrap();
        let a = store.add_symbol(file, &symbol("a", 1)).unwrap();
        let b = store.add_symbol(file, &symbol("b", 2)).unwrap();
        store.add_edge(a, b, EdgeKind::Call, file, 0.9, &StdHashMap::new()).unwrap();
        store.add_edge(b, a, EdgeKind::Call, file, 0.9, &StdHashMap::new()).unwrap();

        let engine = GraphEngine::new(&store);
        let callers = engine.callers(a, 10, 0.0).unwrap();
        assert!(!callers.iter().any(|n| n.symbol_id == a));
    }

    #[test]
    fn confidence_floor_applies_per_edge_before_the_path_decays() {
        let store = Store::open_in_memory().unwrap();
        let file = store.upsert_file("a.rs", 1, 1, "h", Some("rust")).unwrap();
        let a = store.add_symbol(file, &symbol("a", 1)).unwrap();
        let b = store.add_symbol(file, &symbol("b", 2)).unwrap();
        let c = store.add_symbol(file, &symbol("c", 3)).unwrap();
        store.add_edge(b, a, EdgeKind::Call, file, 0.5, &StdHashMap::new()).unwrap();
        store.add_edge(c, b, EdgeKind::Call, file, 0.5, &StdHashMap::new()).unwrap();

        let engine = GraphEngine::new(&store);
        let callers = engine.callers(a, 5, 0.0).unwrap();
        // Each edge's own 0.5 confidence is floored to 0.9 before multiplying
        // into the running path product, so the path genuinely decays:
        // hop 1 = 0.9, hop 2 = 0.9 * 0.9 = 0.81.
        let hop1 = callers.iter().find(|n| n.symbol_id == b).unwrap();
        assert_eq!(hop1.confidence, 0.9);
        let hop2 = callers.iter().find(|n| n.symbol_id == c).unwrap();
        assert!((hop2.confidence - 0.81).abs() < 1e-9);
        assert!(hop2.confidence < hop1.confidence);
    }

    #[test]
    fn results_are_sorted_by_confidence_then_name() {
        let store = Store::open_in_memory().unwrap();
        let file = store.upsert_file("a.rs", 1, 1, "h", Some("rust")).unwrap();
        let target = store.add_symbol(file, &symbol("target", 1)).unwrap();
        let zeta = store.add_symbol(file, &symbol("zeta", 2)).unwrap();
        let alpha = store.add_symbol(file, &symbol("alpha", 3)).unwrap();
        store.add_edge(zeta, target, EdgeKind::Call, file, 0.9, &StdHashMap::new()).unwrap();
        store.add_edge(alpha, target, EdgeKind::Call, file, 0.9, &StdHashMap::new()).unwrap();

        let engine = GraphEngine::new(&store);
        let callers = engine.callers(target, 5, 0.0).unwrap();
        assert_eq!(callers[0].symbol_id, alpha);
        assert_eq!(callers[1].symbol_id, zeta);
    }

    #[test]
    fn impact_seeds_from_file_path_include_all_its_symbols() {
        let store = Store::open_in_memory().unwrap();
        let file = store.upsert_file("a.rs", 1, 1, "h", Some("rust")).unwrap();
        store.add_symbol(file, &symbol("a", 1)).unwrap();
        store.add_symbol(file, &symbol("b", 2)).unwrap();

        let engine = GraphEngine::new(&store);
        let result = engine.impact(vec![ImpactTarget::Name("a.rs".to_string())], 3).unwrap();
        assert_eq!(result.affected_symbols.len(), 2);
    }

    #[test]
    fn test_file_detection_matches_conventional_markers() {
        assert!(is_test_file("src/tests/foo.rs"));
        assert!(is_test_file("pkg/test_bar.py"));
        assert!(!is_test_file("src/main.rs"));
    }
}
