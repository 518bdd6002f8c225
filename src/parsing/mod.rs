//! Language-aware extraction of symbols, imports and callsites (§4.3).
//!
//! Every extractor implements [`LanguageExtractor`], a common, object-safe,
//! `Send + Sync` trait. The tree-sitter-backed extractors are thin
//! [`treesitter::TreeSitterExtractor`] instances configured per language by a
//! static [`treesitter::LanguageSpec`] table (most grammars name their
//! definition/call nodes similarly enough that one walker serves all six
//! languages); [`fallback::FallbackExtractor`] implements the same trait with
//! line-oriented regular expressions and is substituted automatically when
//! the structured parse is unusable.

mod fallback;
mod languages;
mod treesitter;

use std::collections::HashMap;

use crate::types::{SymbolKind, Span};

pub use fallback::FallbackExtractor;
pub use languages::{extractor_for, language_for_extension};
pub use treesitter::TreeSitterExtractor;

/// One of the six source languages this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Go,
    Rust,
    C,
    Cpp,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::C => "c",
            Language::Cpp => "cpp",
        }
    }
}

/// A single syntactic definition found in a file, not yet assigned a store id.
#[derive(Debug, Clone)]
pub struct ExtractedSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub span: Span,
    pub signature: Option<String>,
    pub docstring: Option<String>,
    /// Index into the same file's symbol list, filled in by the parent-assignment
    /// post-pass (§4.3); `None` until then and for top-level symbols.
    pub parent_index: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ExtractedImport {
    pub module: String,
    pub name: Option<String>,
    pub alias: Option<String>,
    pub line: u32,
    pub raw: String,
}

#[derive(Debug, Clone)]
pub struct ExtractedCallsite {
    pub callee_text: String,
    pub line: u32,
    pub column: u32,
    pub confidence: f64,
    /// Index into the file's symbol list of the innermost enclosing symbol,
    /// assigned by the same post-pass that fills `ExtractedSymbol::parent_index`.
    pub scope_symbol_index: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub language: Language,
    pub symbols: Vec<ExtractedSymbol>,
    pub imports: Vec<ExtractedImport>,
    pub callsites: Vec<ExtractedCallsite>,
    /// Whether the regex fallback produced this output instead of tree-sitter.
    pub used_fallback: bool,
}

/// Per-file symbol cap (§4.3, §5): files producing more defy the budget and
/// are truncated with a sentinel symbol recording the drop count.
pub const MAX_SYMBOLS_PER_FILE: usize = 1000;
/// Per-symbol outgoing-callsite cap (§4.3, §5).
pub const MAX_CALLSITES_PER_SYMBOL: usize = 100;

/// An extractor for one language, producing symbols/imports/callsites from
/// raw source bytes. Implementations must never panic on malformed input;
/// a parse that cannot proceed structurally should return as much as it can
/// with lowered confidence rather than erroring.
pub trait LanguageExtractor: Send + Sync {
    fn language(&self) -> Language;
    fn extract(&self, source: &str) -> ParseOutput;
}

/// Run the structured extractor for `language`, falling back to the
/// regex-based extractor when the structured parse is unusable (§4.3).
pub fn parse_file(language: Language, source: &str) -> ParseOutput {
    let primary = extractor_for(language);
    let mut output = primary.extract(source);

    if should_fall_back(&output, source) {
        output = FallbackExtractor::new(language).extract(source);
    }

    apply_parent_assignment(&mut output);
    enforce_budgets(&mut output);
    output
}

/// A structured parse is unusable when it found nothing at all in
/// non-trivial source — tree-sitter's error recovery means a malformed file
/// still produces a tree, so "zero symbols in a file with real content" is
/// the practical signal that the grammar gave up.
fn should_fall_back(output: &ParseOutput, source: &str) -> bool {
    !output.used_fallback
        && output.symbols.is_empty()
        && output.imports.is_empty()
        && source.trim().len() > 40
}

/// Assign `parent_index` to each symbol (innermost enclosing symbol whose
/// span covers it) and `scope_symbol_index` to each callsite, per §4.3.
fn apply_parent_assignment(output: &mut ParseOutput) {
    let spans: Vec<Span> = output.symbols.iter().map(|s| s.span).collect();

    for i in 0..output.symbols.len() {
        let mut best: Option<usize> = None;
        for (j, candidate) in spans.iter().enumerate() {
            if i == j {
                continue;
            }
            if !matches!(output.symbols[j].kind, SymbolKind::Class | SymbolKind::Function | SymbolKind::Method) {
                continue;
            }
            if candidate.encloses(&spans[i]) {
                let tighter = best
                    .map(|b| spans[b].line_count() > candidate.line_count())
                    .unwrap_or(true);
                if tighter {
                    best = Some(j);
                }
            }
        }
        output.symbols[i].parent_index = best;
    }

    for callsite in &mut output.callsites {
        let mut best: Option<usize> = None;
        for (j, span) in spans.iter().enumerate() {
            if span.contains_line(callsite.line) {
                let tighter = best.map(|b| spans[b].line_count() > span.line_count()).unwrap_or(true);
                if tighter {
                    best = Some(j);
                }
            }
        }
        callsite.scope_symbol_index = best;
    }
}

fn enforce_budgets(output: &mut ParseOutput) {
    if output.symbols.len() > MAX_SYMBOLS_PER_FILE {
        let dropped = output.symbols.len() - MAX_SYMBOLS_PER_FILE;
        output.symbols.truncate(MAX_SYMBOLS_PER_FILE);
        output.symbols.push(ExtractedSymbol {
            name: "<truncated>".to_string(),
            kind: SymbolKind::Class,
            span: Span::point(0, 0),
            signature: None,
            docstring: Some(format!("{dropped} additional symbols were dropped")),
            parent_index: None,
        });
    }

    let mut per_scope: HashMap<Option<usize>, usize> = HashMap::new();
    let mut dropped_scopes: HashMap<Option<usize>, u32> = HashMap::new();
    let mut kept = Vec::with_capacity(output.callsites.len());
    for callsite in output.callsites.drain(..) {
        let count = per_scope.entry(callsite.scope_symbol_index).or_insert(0);
        *count += 1;
        if *count <= MAX_CALLSITES_PER_SYMBOL {
            kept.push(callsite);
        } else {
            *dropped_scopes.entry(callsite.scope_symbol_index).or_insert(0) += 1;
        }
    }
    for (scope, dropped) in dropped_scopes {
        kept.push(ExtractedCallsite {
            callee_text: format!("<truncated: {dropped} more>"),
            line: 0,
            column: 0,
            confidence: 0.0,
            scope_symbol_index: scope,
        });
    }
    output.callsites = kept;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_file_routes_python_through_tree_sitter() {
        let source = "def outer():\n    def inner():\n        helper()\n    return inner\n";
        let output = parse_file(Language::Python, source);
        assert!(!output.used_fallback);
        assert!(output.symbols.iter().any(|s| s.name == "outer"));
        assert!(output.symbols.iter().any(|s| s.name == "inner"));
    }

    #[test]
    fn nested_function_gets_parent_assigned() {
        let source = "def outer():\n    def inner():\n        pass\n";
        let output = parse_file(Language::Python, source);
        let outer_idx = output.symbols.iter().position(|s| s.name == "outer").unwrap();
        let inner = output.symbols.iter().find(|s| s.name == "inner").unwrap();
        assert_eq!(inner.parent_index, Some(outer_idx));
    }

    #[test]
    fn symbol_cap_truncates_and_adds_sentinel() {
        let mut output = ParseOutput {
            language: Language::Python,
            symbols: (0..1010)
                .map(|i| ExtractedSymbol {
                    name: format!("f{i}"),
                    kind: SymbolKind::Function,
                    span: Span::point(i as u32 + 1, 0),
                    signature: None,
                    docstring: None,
                    parent_index: None,
                })
                .collect(),
            imports: vec![],
            callsites: vec![],
            used_fallback: false,
        };
        enforce_budgets(&mut output);
        assert_eq!(output.symbols.len(), MAX_SYMBOLS_PER_FILE + 1);
        assert_eq!(output.symbols.last().unwrap().name, "<truncated>");
    }
}
