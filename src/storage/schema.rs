//! DDL, FTS5 sync triggers and forward-only schema migrations (§4.1, §9).

use rusqlite::Connection;

use crate::error::StoreError;

/// Current schema version this build writes and understands.
pub const SCHEMA_VERSION: u32 = 1;

const CREATE_TABLES_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    path          TEXT UNIQUE NOT NULL,
    mtime         INTEGER NOT NULL,
    size          INTEGER NOT NULL,
    content_hash  TEXT NOT NULL,
    indexed_at    INTEGER NOT NULL,
    language      TEXT
);

CREATE TABLE IF NOT EXISTS symbols (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    file_id       INTEGER NOT NULL,
    name          TEXT NOT NULL,
    kind          TEXT NOT NULL,
    line_start    INTEGER NOT NULL,
    line_end      INTEGER,
    column_start  INTEGER,
    column_end    INTEGER,
    signature     TEXT,
    docstring     TEXT,
    parent_id     INTEGER,
    FOREIGN KEY (file_id) REFERENCES files(id) ON DELETE CASCADE,
    FOREIGN KEY (parent_id) REFERENCES symbols(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS edges (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    source_id     INTEGER NOT NULL,
    target_id     INTEGER NOT NULL,
    kind          TEXT NOT NULL,
    file_id       INTEGER NOT NULL,
    confidence    REAL NOT NULL,
    metadata      TEXT,
    FOREIGN KEY (source_id) REFERENCES symbols(id) ON DELETE CASCADE,
    FOREIGN KEY (target_id) REFERENCES symbols(id) ON DELETE CASCADE,
    FOREIGN KEY (file_id) REFERENCES files(id) ON DELETE CASCADE,
    UNIQUE (source_id, target_id, kind, file_id)
);

CREATE TABLE IF NOT EXISTS callsites (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    edge_id       INTEGER NOT NULL,
    line          INTEGER NOT NULL,
    column        INTEGER,
    context       TEXT,
    FOREIGN KEY (edge_id) REFERENCES edges(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_files_path ON files(path);
CREATE INDEX IF NOT EXISTS idx_files_language ON files(language);
CREATE INDEX IF NOT EXISTS idx_symbols_file ON symbols(file_id);
CREATE INDEX IF NOT EXISTS idx_symbols_name ON symbols(name);
CREATE INDEX IF NOT EXISTS idx_symbols_kind ON symbols(kind);
CREATE INDEX IF NOT EXISTS idx_symbols_parent ON symbols(parent_id);
CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source_id);
CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id);
CREATE INDEX IF NOT EXISTS idx_edges_kind ON edges(kind);
CREATE INDEX IF NOT EXISTS idx_edges_file ON edges(file_id);
CREATE INDEX IF NOT EXISTS idx_callsites_edge ON callsites(edge_id);
CREATE INDEX IF NOT EXISTS idx_callsites_line ON callsites(line);
"#;

const CREATE_FTS_SQL: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS symbols_fts USING fts5(
    name,
    content='symbols',
    content_rowid='id',
    tokenize='porter'
);

CREATE TRIGGER IF NOT EXISTS symbols_ai AFTER INSERT ON symbols BEGIN
    INSERT INTO symbols_fts(rowid, name) VALUES (new.id, new.name);
END;

CREATE TRIGGER IF NOT EXISTS symbols_ad AFTER DELETE ON symbols BEGIN
    INSERT INTO symbols_fts(symbols_fts, rowid, name) VALUES ('delete', old.id, old.name);
END;

CREATE TRIGGER IF NOT EXISTS symbols_au AFTER UPDATE ON symbols BEGIN
    INSERT INTO symbols_fts(symbols_fts, rowid, name) VALUES ('delete', old.id, old.name);
    INSERT INTO symbols_fts(rowid, name) VALUES (new.id, new.name);
END;
"#;

pub fn configure_pragmas(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;",
    )
    .map_err(|source| StoreError::Sqlite { operation: "configure_pragmas", source })?;
    Ok(())
}

/// Create the schema on a fresh database, or run forward migrations on an
/// existing one. Rejects a database written by a newer build.
pub fn ensure_schema(conn: &Connection) -> Result<(), StoreError> {
    let found = read_schema_version(conn)?;

    match found {
        None => {
            conn.execute_batch(CREATE_TABLES_SQL)
                .map_err(|source| StoreError::Sqlite { operation: "create_tables", source })?;
            conn.execute_batch(CREATE_FTS_SQL)
                .map_err(|source| StoreError::Sqlite { operation: "create_fts", source })?;
            write_schema_version(conn, SCHEMA_VERSION)?;
            write_meta(conn, "created_at", &now_unix().to_string())?;
        }
        Some(version) if version == SCHEMA_VERSION => {}
        Some(version) if version < SCHEMA_VERSION => {
            run_migrations(conn, version)?;
            write_schema_version(conn, SCHEMA_VERSION)?;
            write_meta(conn, "migrated_at", &now_unix().to_string())?;
        }
        Some(version) => {
            return Err(StoreError::SchemaTooNew { found: version, supported: SCHEMA_VERSION });
        }
    }

    Ok(())
}

/// No migrations exist yet beyond version 1; this is the hook future schema
/// changes extend.
fn run_migrations(_conn: &Connection, _from: u32) -> Result<(), StoreError> {
    Ok(())
}

fn read_schema_version(conn: &Connection) -> Result<Option<u32>, StoreError> {
    let table_exists: bool = conn
        .query_row(
            "SELECT count(*) FROM sqlite_master WHERE type='table' AND name='meta'",
            [],
            |row| row.get::<_, i64>(0),
        )
        .map_err(|source| StoreError::Sqlite { operation: "check_meta_table", source })?
        > 0;

    if !table_exists {
        return Ok(None);
    }

    let raw: Option<String> = conn
        .query_row("SELECT value FROM meta WHERE key = 'schema_version'", [], |row| row.get(0))
        .ok();

    Ok(raw.and_then(|v| v.parse().ok()))
}

fn write_schema_version(conn: &Connection, version: u32) -> Result<(), StoreError> {
    write_meta(conn, "schema_version", &version.to_string())
}

fn write_meta(conn: &Connection, key: &str, value: &str) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO meta (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        rusqlite::params![key, value],
    )
    .map_err(|source| StoreError::Sqlite { operation: "write_meta", source })?;
    Ok(())
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
