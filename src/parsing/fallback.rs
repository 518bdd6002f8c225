//! Line-oriented regex extractor used when the structured tree-sitter parse
//! fails or produces nothing usable (§4.3). Every symbol and edge it
//! produces carries a confidence ceiling of 0.6, recorded in edge metadata
//! as `"extractor": "fallback"` by the caller that turns callsites into
//! edges — this module only emits the ceiling via `ExtractedCallsite.confidence`.

use regex::Regex;
use std::sync::OnceLock;

use crate::types::{SymbolKind, Span};

use super::{ExtractedCallsite, ExtractedImport, ExtractedSymbol, Language, LanguageExtractor, ParseOutput};

const FALLBACK_CONFIDENCE_CEILING: f64 = 0.6;

pub struct FallbackExtractor {
    language: Language,
}

impl FallbackExtractor {
    pub fn new(language: Language) -> Self {
        Self { language }
    }
}

fn def_pattern(language: Language) -> &'static Regex {
    static PATTERNS: OnceLock<std::collections::HashMap<&'static str, Regex>> = OnceLock::new();
    let map = PATTERNS.get_or_init(|| {
        let mut m = std::collections::HashMap::new();
        m.insert("python", Regex::new(r"^\s*(def|class)\s+(\w+)").unwrap());
        m.insert(
            "js",
            Regex::new(r"^\s*(?:export\s+)?(?:async\s+)?function\s+(\w+)|^\s*(?:export\s+)?class\s+(\w+)").unwrap(),
        );
        m.insert("go", Regex::new(r"^\s*func\s+(?:\([^)]*\)\s*)?(\w+)").unwrap());
        m.insert("rust", Regex::new(r"^\s*(?:pub\s+)?(?:fn|struct|enum|trait)\s+(\w+)").unwrap());
        m.insert("c", Regex::new(r"^\s*[\w\*\s]+\s+(\w+)\s*\([^;{]*\)\s*\{").unwrap());
        m
    });

    let key = match language {
        Language::Python => "python",
        Language::JavaScript | Language::TypeScript => "js",
        Language::Go => "go",
        Language::Rust => "rust",
        Language::C | Language::Cpp => "c",
    };
    map.get(key).expect("all languages have a fallback pattern")
}

fn call_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"([A-Za-z_][\w.]*)\s*\(").unwrap())
}

impl LanguageExtractor for FallbackExtractor {
    fn language(&self) -> Language {
        self.language
    }

    fn extract(&self, source: &str) -> ParseOutput {
        let def_re = def_pattern(self.language);
        let call_re = call_pattern();
        let mut symbols = Vec::new();
        let mut callsites = Vec::new();
        let mut imports = Vec::new();

        for (idx, line) in source.lines().enumerate() {
            let line_no = idx as u32 + 1;

            if let Some(caps) = def_re.captures(line) {
                let name = caps
                    .iter()
                    .skip(1)
                    .flatten()
                    .last()
                    .map(|m| m.as_str().to_string());
                if let Some(name) = name {
                    let kind = if line.contains("class") || line.contains("struct") || line.contains("trait") {
                        SymbolKind::Class
                    } else {
                        SymbolKind::Function
                    };
                    symbols.push(ExtractedSymbol {
                        name,
                        kind,
                        span: Span::point(line_no, 0),
                        signature: Some(line.trim().chars().take(200).collect()),
                        docstring: None,
                        parent_index: None,
                    });
                    continue;
                }
            }

            if let Some(module) = import_line(self.language, line) {
                imports.push(ExtractedImport { module, name: None, alias: None, line: line_no, raw: line.to_string() });
            }

            for caps in call_re.captures_iter(line) {
                let text = caps.get(1).unwrap().as_str().to_string();
                if def_re.is_match(line) {
                    continue;
                }
                let mut confidence: f64 = 0.5;
                if text.contains('.') {
                    confidence += 0.2;
                }
                confidence = confidence.min(FALLBACK_CONFIDENCE_CEILING);
                callsites.push(ExtractedCallsite {
                    callee_text: text,
                    line: line_no,
                    column: caps.get(1).unwrap().start() as u32,
                    confidence,
                    scope_symbol_index: None,
                });
            }
        }

        // Line-point symbols have no end: close each over the following
        // definition or end of file so parent assignment still has a range.
        close_symbol_spans(&mut symbols, source.lines().count() as u32);

        ParseOutput { language: self.language, symbols, imports, callsites, used_fallback: true }
    }
}

fn close_symbol_spans(symbols: &mut [ExtractedSymbol], last_line: u32) {
    let starts: Vec<u32> = symbols.iter().map(|s| s.span.start_line).collect();
    for (i, symbol) in symbols.iter_mut().enumerate() {
        let end = starts
            .iter()
            .skip(i + 1)
            .find(|&&s| s > symbol.span.start_line)
            .map(|&s| s - 1)
            .unwrap_or(last_line);
        symbol.span = Span::range(symbol.span.start_line, 0, end.max(symbol.span.start_line), 0);
    }
}

fn import_line(language: Language, line: &str) -> Option<String> {
    let trimmed = line.trim();
    match language {
        Language::Python => {
            if let Some(rest) = trimmed.strip_prefix("import ") {
                Some(rest.split_whitespace().next()?.trim_end_matches(',').to_string())
            } else {
                trimmed.strip_prefix("from ").map(|rest| rest.split_whitespace().next().unwrap_or("").to_string())
            }
        }
        Language::JavaScript | Language::TypeScript => {
            if trimmed.starts_with("import ") {
                trimmed.split('"').nth(1).or_else(|| trimmed.split('\'').nth(1)).map(str::to_string)
            } else {
                None
            }
        }
        Language::Go => {
            if trimmed.starts_with('"') {
                Some(trimmed.trim_matches('"').to_string())
            } else {
                None
            }
        }
        Language::Rust => trimmed.strip_prefix("use ").map(|rest| rest.trim_end_matches(';').to_string()),
        Language::C | Language::Cpp => {
            trimmed.strip_prefix("#include ").map(|rest| rest.trim_matches(|c| c == '"' || c == '<' || c == '>').to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_finds_python_definitions() {
        let output = FallbackExtractor::new(Language::Python).extract("def foo():\n    pass\n");
        assert_eq!(output.symbols.len(), 1);
        assert_eq!(output.symbols[0].name, "foo");
        assert!(output.used_fallback);
    }

    #[test]
    fn fallback_confidence_never_exceeds_ceiling() {
        let output = FallbackExtractor::new(Language::Python).extract("helper.call_thing()\n");
        for callsite in &output.callsites {
            assert!(callsite.confidence <= FALLBACK_CONFIDENCE_CEILING);
        }
    }

    #[test]
    fn fallback_extracts_rust_use_as_import() {
        let output = FallbackExtractor::new(Language::Rust).extract("use std::collections::HashMap;\n");
        assert_eq!(output.imports.len(), 1);
        assert_eq!(output.imports[0].module, "std::collections::HashMap");
    }
}
