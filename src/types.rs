//! Core identifier and geometry types shared across the store, parser and graph engine.

use std::num::NonZeroI64;
use serde::{Deserialize, Serialize};

/// Stable row id for a `File`. Backed by SQLite's `INTEGER PRIMARY KEY` (1-based, never zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileId(NonZeroI64);

/// Stable row id for a `Symbol`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SymbolId(NonZeroI64);

/// Stable row id for an `Edge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(NonZeroI64);

macro_rules! sqlite_id {
    ($ty:ident) => {
        impl $ty {
            /// Wrap a raw SQLite rowid. Panics if `value` is not positive; SQLite
            /// `INTEGER PRIMARY KEY` columns never hand out zero or negative ids.
            pub fn new(value: i64) -> Self {
                Self(NonZeroI64::new(value).expect("SQLite rowid must be positive"))
            }

            pub fn get(self) -> i64 {
                self.0.get()
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0.get())
            }
        }
    };
}

sqlite_id!(FileId);
sqlite_id!(SymbolId);
sqlite_id!(EdgeId);

/// A 1-indexed line/column span, end-inclusive. Columns are 0-indexed per the
/// extraction contract; `end_line`/`end_column` are `None` when the extractor
/// could not determine the closing boundary (e.g. fallback regex extraction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: Option<u32>,
    pub end_column: Option<u32>,
}

impl Span {
    pub fn point(line: u32, column: u32) -> Self {
        Self { start_line: line, start_column: column, end_line: None, end_column: None }
    }

    pub fn range(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            start_line,
            start_column,
            end_line: Some(end_line),
            end_column: Some(end_column),
        }
    }

    /// Whether this span fully encloses `other` (used to find the innermost
    /// enclosing symbol for parent assignment and for scope resolution of call sites).
    pub fn encloses(&self, other: &Span) -> bool {
        let self_end = self.end_line.unwrap_or(self.start_line);
        let other_end = other.end_line.unwrap_or(other.start_line);
        self.start_line <= other.start_line && other_end <= self_end
    }

    pub fn contains_line(&self, line: u32) -> bool {
        let end = self.end_line.unwrap_or(self.start_line);
        self.start_line <= line && line <= end
    }

    pub fn line_count(&self) -> u32 {
        self.end_line.unwrap_or(self.start_line).saturating_sub(self.start_line) + 1
    }
}

/// The kind of a `Symbol` definition, collapsed to the set the store recognizes
/// (struct/trait/enum/interface in source languages all collapse to `Class`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    /// Whole-file placeholder symbol, used when a file has no recognized
    /// definitions but is still worth a RepoMap entry.
    File,
    Namespace,
}

impl SymbolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Class => "class",
            SymbolKind::File => "file",
            SymbolKind::Namespace => "namespace",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "function" => SymbolKind::Function,
            "method" => SymbolKind::Method,
            "class" => SymbolKind::Class,
            "file" => SymbolKind::File,
            "namespace" => SymbolKind::Namespace,
            _ => return None,
        })
    }
}

/// The kind of a directed `Edge` between two symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Call,
    Import,
    /// Reserved: not emitted by any extractor in this crate, but a recognized
    /// store value so a future extractor can add inheritance edges without a migration.
    Inherit,
}

impl EdgeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeKind::Call => "call",
            EdgeKind::Import => "import",
            EdgeKind::Inherit => "inherit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "call" => EdgeKind::Call,
            "import" => EdgeKind::Import,
            "inherit" => EdgeKind::Inherit,
            _ => return None,
        })
    }

    /// Confidence floor applied once to the final aggregated path confidence
    /// during graph traversal (never per-hop — see the graph module).
    pub fn confidence_floor(self) -> f64 {
        match self {
            EdgeKind::Call => 0.9,
            EdgeKind::Import => 0.85,
            EdgeKind::Inherit => 0.85,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_encloses_is_inclusive() {
        let outer = Span::range(10, 0, 20, 1);
        let inner = Span::range(10, 0, 20, 1);
        assert!(outer.encloses(&inner));
        assert!(outer.encloses(&Span::range(12, 0, 15, 0)));
        assert!(!outer.encloses(&Span::range(9, 0, 15, 0)));
        assert!(!outer.encloses(&Span::range(12, 0, 21, 0)));
    }

    #[test]
    fn symbol_kind_round_trips() {
        for kind in [
            SymbolKind::Function,
            SymbolKind::Method,
            SymbolKind::Class,
            SymbolKind::File,
            SymbolKind::Namespace,
        ] {
            assert_eq!(SymbolKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn edge_kind_confidence_floors_match_spec() {
        assert_eq!(EdgeKind::Call.confidence_floor(), 0.9);
        assert_eq!(EdgeKind::Import.confidence_floor(), 0.85);
    }

    #[test]
    fn ids_are_display_and_comparable() {
        let a = SymbolId::new(1);
        let b = SymbolId::new(2);
        assert!(a < b);
        assert_eq!(format!("{a}"), "1");
    }
}
