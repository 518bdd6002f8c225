use std::path::Path;

use pui::{Settings, Store};

pub fn run(repo_root: &Path, query: String, limit: usize) -> i32 {
    let settings = Settings::load(repo_root).unwrap_or_default();
    let store = match Store::open(&Settings::db_path(repo_root), settings.indexing.batch_size) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };

    let symbols = match store.search_symbols(&query, limit) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };

    if symbols.is_empty() {
        println!("No symbols matching: {query}");
        return 0;
    }

    for symbol in symbols {
        let path = store
            .get_file(symbol.file_id)
            .ok()
            .flatten()
            .map(|f| f.path)
            .unwrap_or_else(|| "<unknown>".to_string());
        println!(
            "{:<8} {:<10} {}:{}",
            symbol.kind.as_str(),
            symbol.name,
            path,
            symbol.line_start,
        );
    }
    0
}
