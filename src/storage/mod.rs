//! Persistent relational + full-text store (§4.1).
//!
//! Backed by `rusqlite` (bundled SQLite) rather than a document-search
//! engine: the data model's cascade-delete foreign keys and multi-table
//! joins are native to a relational engine, and FTS5 covers the one
//! full-text need (symbol name search) via sync triggers instead of a
//! second index to keep consistent.

mod schema;

use std::collections::HashMap;
use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StoreError;
use crate::types::{EdgeId, EdgeKind, FileId, SymbolId, SymbolKind};

/// A row from the `files` table.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub id: FileId,
    pub path: String,
    pub mtime: i64,
    pub size: u64,
    pub content_hash: String,
    pub indexed_at: i64,
    pub language: Option<String>,
}

/// A new symbol awaiting insertion; `parent_id` is filled in by the indexer
/// once all of a file's symbols have local ids assigned.
#[derive(Debug, Clone)]
pub struct NewSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub line_start: u32,
    pub line_end: Option<u32>,
    pub column_start: Option<u32>,
    pub column_end: Option<u32>,
    pub signature: Option<String>,
    pub docstring: Option<String>,
    pub parent_id: Option<SymbolId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolRecord {
    pub id: SymbolId,
    pub file_id: FileId,
    pub name: String,
    pub kind: SymbolKind,
    pub line_start: u32,
    pub line_end: Option<u32>,
    pub column_start: Option<u32>,
    pub column_end: Option<u32>,
    pub signature: Option<String>,
    pub docstring: Option<String>,
    pub parent_id: Option<SymbolId>,
}

/// Minimal identity of the opposing symbol in an edge join (§4.1).
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolIdentity {
    pub id: SymbolId,
    pub name: String,
    pub kind: SymbolKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRecord {
    pub id: EdgeId,
    pub source_id: SymbolId,
    pub target_id: SymbolId,
    pub kind: EdgeKind,
    pub file_id: FileId,
    pub confidence: f64,
    pub metadata: HashMap<String, String>,
    pub opposing: SymbolIdentity,
}

/// The persistent store. Wraps a single `rusqlite::Connection` behind a
/// mutex so `&Store` (not `&mut Store`) is enough for every operation —
/// the writer thread and read-only callers share one handle (§9: owning
/// store, borrowed views).
pub struct Store {
    conn: Mutex<Connection>,
    batch_size: usize,
}

impl Store {
    /// Open (creating if absent) the database at `path`, running schema
    /// creation or forward migration as needed.
    pub fn open(path: &Path, batch_size: usize) -> Result<Self, StoreError> {
        let conn = Connection::open(path)
            .map_err(|source| StoreError::Sqlite { operation: "open", source })?;
        schema::configure_pragmas(&conn)?;
        schema::ensure_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn), batch_size })
    }

    /// An in-memory store, used by tests and by short-lived CLI invocations
    /// that only read a snapshot someone else built (never used for `index`).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|source| StoreError::Sqlite { operation: "open_in_memory", source })?;
        schema::configure_pragmas(&conn)?;
        schema::ensure_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn), batch_size: 100 })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    // -- Files --------------------------------------------------------

    pub fn upsert_file(
        &self,
        path: &str,
        mtime: i64,
        size: u64,
        hash: &str,
        language: Option<&str>,
    ) -> Result<FileId, StoreError> {
        let conn = self.conn.lock();
        let indexed_at = now_unix();
        let id: i64 = conn
            .query_row(
                "INSERT INTO files (path, mtime, size, content_hash, indexed_at, language)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(path) DO UPDATE SET
                    mtime = excluded.mtime,
                    size = excluded.size,
                    content_hash = excluded.content_hash,
                    indexed_at = excluded.indexed_at,
                    language = excluded.language
                 RETURNING id",
                params![path, mtime, size as i64, hash, indexed_at, language],
                |row| row.get(0),
            )
            .map_err(|source| StoreError::Sqlite { operation: "upsert_file", source })?;
        Ok(FileId::new(id))
    }

    pub fn get_file_by_path(&self, path: &str) -> Result<Option<FileRecord>, StoreError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, path, mtime, size, content_hash, indexed_at, language
             FROM files WHERE path = ?1",
            params![path],
            row_to_file,
        )
        .optional()
        .map_err(|source| StoreError::Sqlite { operation: "get_file_by_path", source })
    }

    /// Every row in `files`, in no particular order (callers sort as needed).
    pub fn all_files(&self) -> Result<Vec<FileRecord>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT id, path, mtime, size, content_hash, indexed_at, language FROM files")
            .map_err(|source| StoreError::Sqlite { operation: "all_files", source })?;
        let rows = stmt
            .query_map([], row_to_file)
            .map_err(|source| StoreError::Sqlite { operation: "all_files", source })?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|source| StoreError::Sqlite { operation: "all_files", source })
    }

    pub fn all_file_paths(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT path FROM files")
            .map_err(|source| StoreError::Sqlite { operation: "all_file_paths", source })?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|source| StoreError::Sqlite { operation: "all_file_paths", source })?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|source| StoreError::Sqlite { operation: "all_file_paths", source })
    }

    pub fn get_file(&self, id: FileId) -> Result<Option<FileRecord>, StoreError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, path, mtime, size, content_hash, indexed_at, language
             FROM files WHERE id = ?1",
            params![id.get()],
            row_to_file,
        )
        .optional()
        .map_err(|source| StoreError::Sqlite { operation: "get_file", source })
    }

    /// Cascade-deletes the file and every descendant symbol/edge/callsite.
    /// Returns whether a row was actually removed.
    pub fn delete_file(&self, path: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        let affected = conn
            .execute("DELETE FROM files WHERE path = ?1", params![path])
            .map_err(|source| StoreError::Sqlite { operation: "delete_file", source })?;
        Ok(affected > 0)
    }

    // -- Symbols --------------------------------------------------------

    pub fn add_symbol(&self, file_id: FileId, symbol: &NewSymbol) -> Result<SymbolId, StoreError> {
        let conn = self.conn.lock();
        let id: i64 = conn
            .query_row(
                "INSERT INTO symbols
                    (file_id, name, kind, line_start, line_end, column_start, column_end,
                     signature, docstring, parent_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 RETURNING id",
                params![
                    file_id.get(),
                    symbol.name,
                    symbol.kind.as_str(),
                    symbol.line_start,
                    symbol.line_end,
                    symbol.column_start,
                    symbol.column_end,
                    symbol.signature,
                    symbol.docstring,
                    symbol.parent_id.map(SymbolId::get),
                ],
                |row| row.get(0),
            )
            .map_err(|source| StoreError::Sqlite { operation: "add_symbol", source })?;
        Ok(SymbolId::new(id))
    }

    /// Cascade removes all symbols (and their edges/callsites) under a file.
    /// Used before re-indexing that file.
    pub fn delete_symbols_for_file(&self, file_id: FileId) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM symbols WHERE file_id = ?1", params![file_id.get()])
            .map_err(|source| StoreError::Sqlite { operation: "delete_symbols_for_file", source })
    }

    pub fn get_symbol(&self, id: SymbolId) -> Result<Option<SymbolRecord>, StoreError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, file_id, name, kind, line_start, line_end, column_start, column_end,
                    signature, docstring, parent_id
             FROM symbols WHERE id = ?1",
            params![id.get()],
            row_to_symbol,
        )
        .optional()
        .map_err(|source| StoreError::Sqlite { operation: "get_symbol", source })
    }

    pub fn get_symbol_by_name(&self, name: &str) -> Result<Option<SymbolRecord>, StoreError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, file_id, name, kind, line_start, line_end, column_start, column_end,
                    signature, docstring, parent_id
             FROM symbols WHERE name = ?1 ORDER BY id LIMIT 1",
            params![name],
            row_to_symbol,
        )
        .optional()
        .map_err(|source| StoreError::Sqlite { operation: "get_symbol_by_name", source })
    }

    /// Every symbol belonging to `file_id`, in declaration order.
    pub fn symbols_for_file(&self, file_id: FileId) -> Result<Vec<SymbolRecord>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, file_id, name, kind, line_start, line_end, column_start, column_end,
                        signature, docstring, parent_id
                 FROM symbols WHERE file_id = ?1 ORDER BY line_start",
            )
            .map_err(|source| StoreError::Sqlite { operation: "symbols_for_file", source })?;
        let rows = stmt
            .query_map(params![file_id.get()], row_to_symbol)
            .map_err(|source| StoreError::Sqlite { operation: "symbols_for_file", source })?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|source| StoreError::Sqlite { operation: "symbols_for_file", source })
    }

    /// Full-text search over symbol names using FTS5 MATCH syntax
    /// (bareword AND, `"phrase"`, `prefix*`), ordered by relevance rank.
    pub fn search_symbols(&self, query: &str, limit: usize) -> Result<Vec<SymbolRecord>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT s.id, s.file_id, s.name, s.kind, s.line_start, s.line_end,
                        s.column_start, s.column_end, s.signature, s.docstring, s.parent_id
                 FROM symbols_fts f
                 JOIN symbols s ON s.id = f.rowid
                 WHERE symbols_fts MATCH ?1
                 ORDER BY rank
                 LIMIT ?2",
            )
            .map_err(|source| StoreError::Sqlite { operation: "search_symbols", source })?;
        let rows = stmt
            .query_map(params![query, limit as i64], row_to_symbol)
            .map_err(|source| StoreError::Sqlite { operation: "search_symbols", source })?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|source| StoreError::Sqlite { operation: "search_symbols", source })
    }

    // -- Edges ------------------------------------------------------------

    /// Idempotent by `(source, target, kind, file)`; returns the existing id
    /// if the tuple is already present.
    pub fn add_edge(
        &self,
        source: SymbolId,
        target: SymbolId,
        kind: EdgeKind,
        file_id: FileId,
        confidence: f64,
        metadata: &HashMap<String, String>,
    ) -> Result<EdgeId, StoreError> {
        let conn = self.conn.lock();
        let metadata_json = serde_json::to_string(metadata).unwrap_or_else(|_| "{}".to_string());

        if let Some(existing) = conn
            .query_row(
                "SELECT id FROM edges WHERE source_id = ?1 AND target_id = ?2
                 AND kind = ?3 AND file_id = ?4",
                params![source.get(), target.get(), kind.as_str(), file_id.get()],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .map_err(|source| StoreError::Sqlite { operation: "add_edge_lookup", source })?
        {
            return Ok(EdgeId::new(existing));
        }

        let id: i64 = conn
            .query_row(
                "INSERT INTO edges (source_id, target_id, kind, file_id, confidence, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 RETURNING id",
                params![
                    source.get(),
                    target.get(),
                    kind.as_str(),
                    file_id.get(),
                    confidence,
                    metadata_json
                ],
                |row| row.get(0),
            )
            .map_err(|source| StoreError::Sqlite { operation: "add_edge", source })?;
        Ok(EdgeId::new(id))
    }

    pub fn get_outgoing_edges(&self, symbol_id: SymbolId) -> Result<Vec<EdgeRecord>, StoreError> {
        self.get_edges_joined(symbol_id, Direction::Outgoing)
    }

    pub fn get_incoming_edges(&self, symbol_id: SymbolId) -> Result<Vec<EdgeRecord>, StoreError> {
        self.get_edges_joined(symbol_id, Direction::Incoming)
    }

    fn get_edges_joined(
        &self,
        symbol_id: SymbolId,
        direction: Direction,
    ) -> Result<Vec<EdgeRecord>, StoreError> {
        let conn = self.conn.lock();
        let sql = match direction {
            Direction::Outgoing => {
                "SELECT e.id, e.source_id, e.target_id, e.kind, e.file_id, e.confidence, e.metadata,
                        s.id, s.name, s.kind
                 FROM edges e JOIN symbols s ON s.id = e.target_id
                 WHERE e.source_id = ?1"
            }
            Direction::Incoming => {
                "SELECT e.id, e.source_id, e.target_id, e.kind, e.file_id, e.confidence, e.metadata,
                        s.id, s.name, s.kind
                 FROM edges e JOIN symbols s ON s.id = e.source_id
                 WHERE e.target_id = ?1"
            }
        };
        let mut stmt = conn
            .prepare(sql)
            .map_err(|source| StoreError::Sqlite { operation: "get_edges_joined", source })?;
        let rows = stmt
            .query_map(params![symbol_id.get()], row_to_edge)
            .map_err(|source| StoreError::Sqlite { operation: "get_edges_joined", source })?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|source| StoreError::Sqlite { operation: "get_edges_joined", source })
    }

    /// Count of distinct incoming edges to `symbol_id` (fan-in, §4.6).
    pub fn fan_in(&self, symbol_id: SymbolId) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(DISTINCT source_id) FROM edges WHERE target_id = ?1",
                params![symbol_id.get()],
                |row| row.get(0),
            )
            .map_err(|source| StoreError::Sqlite { operation: "fan_in", source })?;
        Ok(count as usize)
    }

    pub fn add_callsite(
        &self,
        edge_id: EdgeId,
        line: u32,
        column: Option<u32>,
        context: Option<&str>,
    ) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        let id: i64 = conn
            .query_row(
                "INSERT INTO callsites (edge_id, line, column, context)
                 VALUES (?1, ?2, ?3, ?4) RETURNING id",
                params![edge_id.get(), line, column, context],
                |row| row.get(0),
            )
            .map_err(|source| StoreError::Sqlite { operation: "add_callsite", source })?;
        Ok(id)
    }

    // -- Meta / stats -------------------------------------------------------

    pub fn get_meta(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock();
        conn.query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| row.get(0))
            .optional()
            .map_err(|source| StoreError::Sqlite { operation: "get_meta", source })
    }

    pub fn set_meta(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .map_err(|source| StoreError::Sqlite { operation: "set_meta", source })?;
        Ok(())
    }

    pub fn update_stats(&self, file_count: usize, symbol_count: usize) -> Result<(), StoreError> {
        self.set_meta("last_indexed_at", &now_unix().to_string())?;
        self.set_meta("file_count", &file_count.to_string())?;
        self.set_meta("symbol_count", &symbol_count.to_string())?;
        Ok(())
    }

    /// Aggregate row counts for the dependency-summary section of RepoMap.
    pub fn counts(&self) -> Result<StoreCounts, StoreError> {
        let conn = self.conn.lock();
        let files = count_rows(&conn, "files")?;
        let symbols = count_rows(&conn, "symbols")?;
        let edges = count_rows(&conn, "edges")?;
        let callsites = count_rows(&conn, "callsites")?;
        Ok(StoreCounts { files, symbols, edges, callsites })
    }

    /// Run `body` inside a single SQLite transaction; on `Err` the
    /// transaction rolls back, undoing every write `body` made (§5, §9).
    pub fn in_transaction<T>(
        &self,
        body: impl FnOnce() -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        {
            let conn = self.conn.lock();
            conn.execute_batch("BEGIN IMMEDIATE")
                .map_err(|source| StoreError::Sqlite { operation: "begin_transaction", source })?;
        }

        match body() {
            Ok(value) => {
                let conn = self.conn.lock();
                conn.execute_batch("COMMIT")
                    .map_err(|source| StoreError::Sqlite { operation: "commit", source })?;
                Ok(value)
            }
            Err(e) => {
                let conn = self.conn.lock();
                let _ = conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Outgoing,
    Incoming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCounts {
    pub files: usize,
    pub symbols: usize,
    pub edges: usize,
    pub callsites: usize,
}

fn count_rows(conn: &Connection, table: &str) -> Result<usize, StoreError> {
    // `table` is always one of the fixed literals above, never user input.
    let sql = format!("SELECT COUNT(*) FROM {table}");
    let count: i64 = conn
        .query_row(&sql, [], |row| row.get(0))
        .map_err(|source| StoreError::Sqlite { operation: "count_rows", source })?;
    Ok(count as usize)
}

fn row_to_file(row: &rusqlite::Row) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        id: FileId::new(row.get(0)?),
        path: row.get(1)?,
        mtime: row.get(2)?,
        size: row.get::<_, i64>(3)? as u64,
        content_hash: row.get(4)?,
        indexed_at: row.get(5)?,
        language: row.get(6)?,
    })
}

fn row_to_symbol(row: &rusqlite::Row) -> rusqlite::Result<SymbolRecord> {
    let kind_str: String = row.get(3)?;
    Ok(SymbolRecord {
        id: SymbolId::new(row.get(0)?),
        file_id: FileId::new(row.get(1)?),
        name: row.get(2)?,
        kind: SymbolKind::parse(&kind_str).unwrap_or(SymbolKind::Function),
        line_start: row.get(4)?,
        line_end: row.get(5)?,
        column_start: row.get(6)?,
        column_end: row.get(7)?,
        signature: row.get(8)?,
        docstring: row.get(9)?,
        parent_id: row.get::<_, Option<i64>>(10)?.map(SymbolId::new),
    })
}

fn row_to_edge(row: &rusqlite::Row) -> rusqlite::Result<EdgeRecord> {
    let kind_str: String = row.get(3)?;
    let metadata_json: Option<String> = row.get(6)?;
    let metadata = metadata_json
        .and_then(|j| serde_json::from_str(&j).ok())
        .unwrap_or_default();
    let opposing_kind_str: String = row.get(9)?;
    Ok(EdgeRecord {
        id: EdgeId::new(row.get(0)?),
        source_id: SymbolId::new(row.get(1)?),
        target_id: SymbolId::new(row.get(2)?),
        kind: EdgeKind::parse(&kind_str).unwrap_or(EdgeKind::Call),
        file_id: FileId::new(row.get(4)?),
        confidence: row.get(5)?,
        metadata,
        opposing: SymbolIdentity {
            id: SymbolId::new(row.get(7)?),
            name: row.get(8)?,
            kind: SymbolKind::parse(&opposing_kind_str).unwrap_or(SymbolKind::Function),
        },
    })
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_symbol(name: &str, kind: SymbolKind, line: u32) -> NewSymbol {
        NewSymbol {
            name: name.to_string(),
            kind,
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
    fn upsert_file_returns_stable_id_across_updates() {
        let store = Store::open_in_memory().unwrap();
        let id1 = store.upsert_file("a.rs", 1, 10, "hash1", Some("rust")).unwrap();
        let id2 = store.upsert_file("a.rs", 2, 20, "hash2", Some("rust")).unwrap();
        assert_eq!(id1, id2);

        let row = store.get_file_by_path("a.rs").unwrap().unwrap();
        assert_eq!(row.content_hash, "hash2");
        assert_eq!(row.size, 20);
    }

    #[test]
    fn delete_file_cascades_to_symbols_and_edges() {
        let store = Store::open_in_memory().unwrap();
        let file = store.upsert_file("a.rs", 1, 10, "h", Some("rust")).unwrap();
        let sym_a = store.add_symbol(file, &new_symbol("a", SymbolKind::Function, 1)).unwrap();
        let sym_b = store.add_symbol(file, &new_symbol("b", SymbolKind::Function, 2)).unwrap();
        store.add_edge(sym_a, sym_b, EdgeKind::Call, file, 0.9, &HashMap::new()).unwrap();

        assert!(store.delete_file("a.rs").unwrap());
        assert!(store.get_symbol(sym_a).unwrap().is_none());
        assert!(store.get_outgoing_edges(sym_a).unwrap().is_empty());
    }

    #[test]
    fn add_edge_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        let file = store.upsert_file("a.rs", 1, 10, "h", Some("rust")).unwrap();
        let sym_a = store.add_symbol(file, &new_symbol("a", SymbolKind::Function, 1)).unwrap();
        let sym_b = store.add_symbol(file, &new_symbol("b", SymbolKind::Function, 2)).unwrap();

        let e1 = store.add_edge(sym_a, sym_b, EdgeKind::Call, file, 0.9, &HashMap::new()).unwrap();
        let e2 = store.add_edge(sym_a, sym_b, EdgeKind::Call, file, 0.5, &HashMap::new()).unwrap();
        assert_eq!(e1, e2);

        let outgoing = store.get_outgoing_edges(sym_a).unwrap();
        assert_eq!(outgoing.len(), 1);
    }

    #[test]
    fn search_symbols_matches_fts_prefix_queries() {
        let store = Store::open_in_memory().unwrap();
        let file = store.upsert_file("a.rs", 1, 10, "h", Some("rust")).unwrap();
        store.add_symbol(file, &new_symbol("render_widget", SymbolKind::Function, 1)).unwrap();
        store.add_symbol(file, &new_symbol("parse_config", SymbolKind::Function, 2)).unwrap();

        let hits = store.search_symbols("render*", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "render_widget");
    }

    #[test]
    fn fan_in_counts_distinct_incoming_edges() {
        let store = Store::open_in_memory().unwrap();
        let file = store.upsert_file("a.rs", 1, 10, "h", Some("rust")).unwrap();
        let target = store.add_symbol(file, &new_symbol("target", SymbolKind::Function, 1)).unwrap();
        let caller1 = store.add_symbol(file, &new_symbol("c1", SymbolKind::Function, 2)).unwrap();
        let caller2 = store.add_symbol(file, &new_symbol("c2", SymbolKind::Function, 3)).unwrap();

        store.add_edge(caller1, target, EdgeKind::Call, file, 0.9, &HashMap::new()).unwrap();
        store.add_edge(caller2, target, EdgeKind::Call, file, 0.9, &HashMap::new()).unwrap();

        assert_eq!(store.fan_in(target).unwrap(), 2);
    }

    #[test]
    fn in_transaction_rolls_back_on_error() {
        let store = Store::open_in_memory().unwrap();
        let result: Result<(), StoreError> = store.in_transaction(|| {
            store.upsert_file("a.rs", 1, 10, "h", Some("rust"))?;
            Err(StoreError::ConnectionLost)
        });
        assert!(result.is_err());
        assert!(store.get_file_by_path("a.rs").unwrap().is_none());
    }

    #[test]
    fn counts_reflect_inserted_rows() {
        let store = Store::open_in_memory().unwrap();
        let file = store.upsert_file("a.rs", 1, 10, "h", Some("rust")).unwrap();
        store.add_symbol(file, &new_symbol("a", SymbolKind::Function, 1)).unwrap();

        let counts = store.counts().unwrap();
        assert_eq!(counts.files, 1);
        assert_eq!(counts.symbols, 1);
    }
}
