//! A single tree-sitter-backed walker configured per language by a static
//! node-kind table (§4.3). Most of the six supported grammars name their
//! definition/call nodes closely enough that one walker, parameterized by
//! [`LanguageSpec`], covers all of them; only import syntax genuinely
//! differs per language, so each [`LanguageSpec`] carries its own import
//! extraction function.

use tree_sitter::{Node, Parser, Tree};

use crate::types::{SymbolKind, Span};

use super::{ExtractedCallsite, ExtractedImport, ExtractedSymbol, Language, LanguageExtractor, ParseOutput};

/// Maps one tree-sitter node kind to the `SymbolKind` it defines.
pub struct SymbolNodeKind {
    pub node_kind: &'static str,
    pub symbol_kind: SymbolKind,
}

/// Per-language configuration for [`TreeSitterExtractor`].
pub struct LanguageSpec {
    pub language: Language,
    pub ts_language: fn() -> tree_sitter::Language,
    pub symbol_nodes: &'static [SymbolNodeKind],
    pub call_node_kinds: &'static [&'static str],
    pub call_function_field: &'static str,
    pub extract_imports: fn(&Tree, &str) -> Vec<ExtractedImport>,
}

pub struct TreeSitterExtractor {
    spec: &'static LanguageSpec,
}

impl TreeSitterExtractor {
    pub fn new(spec: &'static LanguageSpec) -> Self {
        Self { spec }
    }

    fn symbol_kind_for(&self, node_kind: &str) -> Option<SymbolKind> {
        self.spec
            .symbol_nodes
            .iter()
            .find(|entry| entry.node_kind == node_kind)
            .map(|entry| entry.symbol_kind)
    }
}

impl LanguageExtractor for TreeSitterExtractor {
    fn language(&self) -> Language {
        self.spec.language
    }

    fn extract(&self, source: &str) -> ParseOutput {
        let mut parser = Parser::new();
        let empty = ParseOutput {
            language: self.spec.language,
            symbols: vec![],
            imports: vec![],
            callsites: vec![],
            used_fallback: false,
        };

        if parser.set_language(&(self.spec.ts_language)()).is_err() {
            return empty;
        }

        let Some(tree) = parser.parse(source, None) else {
            return empty;
        };

        let bytes = source.as_bytes();
        let mut symbols = Vec::new();
        let mut callsites = Vec::new();

        walk(tree.root_node(), &mut |node| {
            if let Some(kind) = self.symbol_kind_for(node.kind()) {
                if let Some(symbol) = self.extract_symbol(node, bytes, kind) {
                    symbols.push(symbol);
                }
            } else if self.spec.call_node_kinds.contains(&node.kind()) {
                if let Some(callsite) = self.extract_callsite(node, bytes) {
                    callsites.push(callsite);
                }
            }
        });

        let imports = (self.spec.extract_imports)(&tree, source);

        ParseOutput { language: self.spec.language, symbols, imports, callsites, used_fallback: false }
    }
}

impl TreeSitterExtractor {
    fn extract_symbol(&self, node: Node, source: &[u8], kind: SymbolKind) -> Option<ExtractedSymbol> {
        let name = extract_name(node, source)?;
        let span = node_span(node);
        let signature = first_line_clipped(node, source, 200);
        let docstring = extract_docstring(node, source);

        Some(ExtractedSymbol { name, kind, span, signature, docstring, parent_index: None })
    }

    fn extract_callsite(&self, node: Node, source: &[u8]) -> Option<ExtractedCallsite> {
        let callee = node
            .child_by_field_name(self.spec.call_function_field)
            .or_else(|| node.named_child(0))?;
        let text = callee.utf8_text(source).ok()?.to_string();

        let mut confidence: f64 = 0.5;
        if text.contains('.') {
            confidence += 0.2;
        }
        if text.chars().all(|c| c.is_alphanumeric() || c == '_') {
            confidence += 0.1;
        }
        confidence = confidence.min(1.0);

        let point = node.start_position();
        Some(ExtractedCallsite {
            callee_text: text,
            line: point.row as u32 + 1,
            column: point.column as u32,
            confidence,
            scope_symbol_index: None,
        })
    }
}

fn walk(node: Node, visit: &mut impl FnMut(Node)) {
    visit(node);
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, visit);
    }
}

fn node_span(node: Node) -> Span {
    let start = node.start_position();
    let end = node.end_position();
    Span::range(start.row as u32 + 1, start.column as u32, end.row as u32 + 1, end.column as u32)
}

/// Try the conventional `name` field first; fall back to the first
/// identifier-shaped descendant, which covers C's declarator-buried names.
fn extract_name(node: Node, source: &[u8]) -> Option<String> {
    if let Some(name_node) = node.child_by_field_name("name") {
        return name_node.utf8_text(source).ok().map(String::from);
    }

    let mut found = None;
    walk(node, &mut |n| {
        if found.is_none() && (n.kind() == "identifier" || n.kind() == "field_identifier") {
            found = n.utf8_text(source).ok().map(String::from);
        }
    });
    found
}

fn first_line_clipped(node: Node, source: &[u8], max_len: usize) -> Option<String> {
    let text = node.utf8_text(source).ok()?;
    let first_line = text.lines().next().unwrap_or(text);
    if first_line.chars().count() > max_len {
        Some(format!("{}…", first_line.chars().take(max_len).collect::<String>()))
    } else {
        Some(first_line.to_string())
    }
}

/// A docstring is either the definition's leading string-literal statement
/// (Python) or a comment node immediately preceding the definition
/// (JS/TS/Go/Rust/C/C++ doc-comment conventions).
fn extract_docstring(node: Node, source: &[u8]) -> Option<String> {
    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        if let Some(first_stmt) = body.named_children(&mut cursor).next() {
            if first_stmt.kind().contains("string") {
                let text = first_stmt.utf8_text(source).ok()?;
                return Some(strip_quotes(text));
            }
        }
    }

    let mut sibling = node.prev_sibling();
    let mut comments = Vec::new();
    while let Some(s) = sibling {
        if s.kind().contains("comment") {
            comments.push(s.utf8_text(source).ok()?.to_string());
            sibling = s.prev_sibling();
        } else {
            break;
        }
    }
    if comments.is_empty() {
        None
    } else {
        comments.reverse();
        Some(comments.join("\n"))
    }
}

fn strip_quotes(text: &str) -> String {
    text.trim_matches(|c| c == '"' || c == '\'').trim().to_string()
}
