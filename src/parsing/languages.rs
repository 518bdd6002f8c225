//! Language registry: extension mapping and the static [`LanguageSpec`]
//! table feeding [`super::treesitter::TreeSitterExtractor`] (§4.3).

use tree_sitter::{Node, Tree};

use crate::types::SymbolKind;

use super::treesitter::{LanguageSpec, SymbolNodeKind, TreeSitterExtractor};
use super::{ExtractedImport, Language, LanguageExtractor};

pub fn language_for_extension(ext: &str) -> Option<Language> {
    Some(match ext {
        ".py" => Language::Python,
        ".js" | ".jsx" | ".mjs" => Language::JavaScript,
        ".ts" | ".tsx" => Language::TypeScript,
        ".go" => Language::Go,
        ".rs" => Language::Rust,
        ".c" | ".h" => Language::C,
        ".cpp" | ".cc" | ".cxx" | ".hpp" => Language::Cpp,
        _ => return None,
    })
}

pub fn extractor_for(language: Language) -> Box<dyn LanguageExtractor> {
    let spec: &'static LanguageSpec = match language {
        Language::Python => &PYTHON,
        Language::JavaScript => &JAVASCRIPT,
        Language::TypeScript => &TYPESCRIPT,
        Language::Go => &GO,
        Language::Rust => &RUST,
        Language::C => &C,
        Language::Cpp => &CPP,
    };
    Box::new(TreeSitterExtractor::new(spec))
}

fn walk_all<'a>(node: Node<'a>, visit: &mut impl FnMut(Node<'a>)) {
    visit(node);
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_all(child, visit);
    }
}

fn line_of(node: Node) -> u32 {
    node.start_position().row as u32 + 1
}

static PYTHON: LanguageSpec = LanguageSpec {
    language: Language::Python,
    ts_language: || tree_sitter_python::LANGUAGE.into(),
    symbol_nodes: &[
        SymbolNodeKind { node_kind: "function_definition", symbol_kind: SymbolKind::Function },
        SymbolNodeKind { node_kind: "class_definition", symbol_kind: SymbolKind::Class },
    ],
    call_node_kinds: &["call"],
    call_function_field: "function",
    extract_imports: extract_python_imports,
};

fn extract_python_imports(tree: &Tree, source: &str) -> Vec<ExtractedImport> {
    let bytes = source.as_bytes();
    let mut imports = Vec::new();
    walk_all(tree.root_node(), &mut |node| match node.kind() {
        "import_statement" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                if let Ok(text) = child.utf8_text(bytes) {
                    let (module, alias) = split_as(text);
                    imports.push(ExtractedImport {
                        module,
                        name: None,
                        alias,
                        line: line_of(node),
                        raw: node.utf8_text(bytes).unwrap_or_default().to_string(),
                    });
                }
            }
        }
        "import_from_statement" => {
            let module = node
                .child_by_field_name("module_name")
                .and_then(|n| n.utf8_text(bytes).ok())
                .unwrap_or_default()
                .to_string();
            let mut cursor = node.walk();
            let mut any = false;
            for child in node.named_children(&mut cursor) {
                if child.kind() == "dotted_name" && any_eq(child, bytes, &module) {
                    continue;
                }
                if matches!(child.kind(), "dotted_name" | "aliased_import" | "wildcard_import") {
                    any = true;
                    if let Ok(text) = child.utf8_text(bytes) {
                        let (name, alias) = split_as(text);
                        imports.push(ExtractedImport {
                            module: module.clone(),
                            name: Some(name),
                            alias,
                            line: line_of(node),
                            raw: node.utf8_text(bytes).unwrap_or_default().to_string(),
                        });
                    }
                }
            }
            if !any {
                imports.push(ExtractedImport {
                    module,
                    name: None,
                    alias: None,
                    line: line_of(node),
                    raw: node.utf8_text(bytes).unwrap_or_default().to_string(),
                });
            }
        }
        _ => {}
    });
    imports
}

fn any_eq(node: Node, bytes: &[u8], other: &str) -> bool {
    node.utf8_text(bytes).map(|t| t == other).unwrap_or(false)
}

/// Splits `"X as Y"` into `(X, Some(Y))`, or `(X, None)` with no alias.
fn split_as(text: &str) -> (String, Option<String>) {
    match text.split_once(" as ") {
        Some((name, alias)) => (name.trim().to_string(), Some(alias.trim().to_string())),
        None => (text.trim().to_string(), None),
    }
}

static JAVASCRIPT: LanguageSpec = LanguageSpec {
    language: Language::JavaScript,
    ts_language: || tree_sitter_javascript::LANGUAGE.into(),
    symbol_nodes: &[
        SymbolNodeKind { node_kind: "function_declaration", symbol_kind: SymbolKind::Function },
        SymbolNodeKind { node_kind: "method_definition", symbol_kind: SymbolKind::Method },
        SymbolNodeKind { node_kind: "class_declaration", symbol_kind: SymbolKind::Class },
    ],
    call_node_kinds: &["call_expression"],
    call_function_field: "function",
    extract_imports: extract_js_imports,
};

static TYPESCRIPT: LanguageSpec = LanguageSpec {
    language: Language::TypeScript,
    ts_language: || tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
    symbol_nodes: &[
        SymbolNodeKind { node_kind: "function_declaration", symbol_kind: SymbolKind::Function },
        SymbolNodeKind { node_kind: "method_definition", symbol_kind: SymbolKind::Method },
        SymbolNodeKind { node_kind: "class_declaration", symbol_kind: SymbolKind::Class },
        SymbolNodeKind { node_kind: "interface_declaration", symbol_kind: SymbolKind::Class },
    ],
    call_node_kinds: &["call_expression"],
    call_function_field: "function",
    extract_imports: extract_js_imports,
};

fn extract_js_imports(tree: &Tree, source: &str) -> Vec<ExtractedImport> {
    let bytes = source.as_bytes();
    let mut imports = Vec::new();
    walk_all(tree.root_node(), &mut |node| {
        if node.kind() != "import_statement" {
            return;
        }
        let module = node
            .child_by_field_name("source")
            .and_then(|n| n.utf8_text(bytes).ok())
            .map(|s| s.trim_matches(|c| c == '"' || c == '\'').to_string())
            .unwrap_or_default();

        let clause = node.named_children(&mut node.walk()).find(|c| c.kind() == "import_clause");
        let name = clause.and_then(|c| c.utf8_text(bytes).ok()).map(str::to_string);

        imports.push(ExtractedImport {
            module,
            name,
            alias: None,
            line: line_of(node),
            raw: node.utf8_text(bytes).unwrap_or_default().to_string(),
        });
    });
    imports
}

static GO: LanguageSpec = LanguageSpec {
    language: Language::Go,
    ts_language: || tree_sitter_go::LANGUAGE.into(),
    symbol_nodes: &[
        SymbolNodeKind { node_kind: "function_declaration", symbol_kind: SymbolKind::Function },
        SymbolNodeKind { node_kind: "method_declaration", symbol_kind: SymbolKind::Method },
    ],
    call_node_kinds: &["call_expression"],
    call_function_field: "function",
    extract_imports: extract_go_imports,
};

fn extract_go_imports(tree: &Tree, source: &str) -> Vec<ExtractedImport> {
    let bytes = source.as_bytes();
    let mut imports = Vec::new();
    walk_all(tree.root_node(), &mut |node| {
        if node.kind() != "import_spec" {
            return;
        }
        let path = node
            .child_by_field_name("path")
            .and_then(|n| n.utf8_text(bytes).ok())
            .map(|s| s.trim_matches('"').to_string())
            .unwrap_or_default();
        let alias = node.child_by_field_name("name").and_then(|n| n.utf8_text(bytes).ok()).map(str::to_string);

        imports.push(ExtractedImport {
            module: path,
            name: None,
            alias,
            line: line_of(node),
            raw: node.utf8_text(bytes).unwrap_or_default().to_string(),
        });
    });
    imports
}

static RUST: LanguageSpec = LanguageSpec {
    language: Language::Rust,
    ts_language: || tree_sitter_rust::LANGUAGE.into(),
    symbol_nodes: &[
        SymbolNodeKind { node_kind: "function_item", symbol_kind: SymbolKind::Function },
        SymbolNodeKind { node_kind: "struct_item", symbol_kind: SymbolKind::Class },
        SymbolNodeKind { node_kind: "enum_item", symbol_kind: SymbolKind::Class },
        SymbolNodeKind { node_kind: "trait_item", symbol_kind: SymbolKind::Class },
        SymbolNodeKind { node_kind: "mod_item", symbol_kind: SymbolKind::Namespace },
    ],
    call_node_kinds: &["call_expression"],
    call_function_field: "function",
    extract_imports: extract_rust_imports,
};

fn extract_rust_imports(tree: &Tree, source: &str) -> Vec<ExtractedImport> {
    let bytes = source.as_bytes();
    let mut imports = Vec::new();
    walk_all(tree.root_node(), &mut |node| {
        if node.kind() != "use_declaration" {
            return;
        }
        let text = node.utf8_text(bytes).unwrap_or_default();
        let body = text.trim_start_matches("use").trim().trim_end_matches(';').trim();
        let (path, alias) = split_as_rust(body);
        imports.push(ExtractedImport { module: path, name: None, alias, line: line_of(node), raw: text.to_string() });
    });
    imports
}

fn split_as_rust(text: &str) -> (String, Option<String>) {
    match text.split_once(" as ") {
        Some((path, alias)) => (path.trim().to_string(), Some(alias.trim().to_string())),
        None => (text.trim().to_string(), None),
    }
}

static C: LanguageSpec = LanguageSpec {
    language: Language::C,
    ts_language: || tree_sitter_c::LANGUAGE.into(),
    symbol_nodes: &[SymbolNodeKind { node_kind: "function_definition", symbol_kind: SymbolKind::Function }],
    call_node_kinds: &["call_expression"],
    call_function_field: "function",
    extract_imports: extract_c_imports,
};

static CPP: LanguageSpec = LanguageSpec {
    language: Language::Cpp,
    ts_language: || tree_sitter_cpp::LANGUAGE.into(),
    symbol_nodes: &[
        SymbolNodeKind { node_kind: "function_definition", symbol_kind: SymbolKind::Function },
        SymbolNodeKind { node_kind: "class_specifier", symbol_kind: SymbolKind::Class },
        SymbolNodeKind { node_kind: "struct_specifier", symbol_kind: SymbolKind::Class },
    ],
    call_node_kinds: &["call_expression"],
    call_function_field: "function",
    extract_imports: extract_c_imports,
};

fn extract_c_imports(tree: &Tree, source: &str) -> Vec<ExtractedImport> {
    let bytes = source.as_bytes();
    let mut imports = Vec::new();
    walk_all(tree.root_node(), &mut |node| {
        if node.kind() != "preproc_include" {
            return;
        }
        let module = node
            .child_by_field_name("path")
            .and_then(|n| n.utf8_text(bytes).ok())
            .map(|s| s.trim_matches(|c| c == '"' || c == '<' || c == '>').to_string())
            .unwrap_or_default();
        imports.push(ExtractedImport {
            module,
            name: None,
            alias: None,
            line: line_of(node),
            raw: node.utf8_text(bytes).unwrap_or_default().to_string(),
        });
    });
    imports
}
