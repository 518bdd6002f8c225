use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use pui::{IndexError, Indexer, Settings, Store};

pub fn run(repo_root: &Path, force: bool, threads: Option<usize>, max_files: Option<usize>) -> i32 {
    let mut settings = match Settings::load(repo_root) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            Settings::default()
        }
    };
    if let Some(threads) = threads {
        settings.indexing.parallel_threads = threads;
    }

    let store = match Store::open(&Settings::db_path(repo_root), settings.indexing.batch_size) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            return IndexError::Store(e).exit_code();
        }
    };

    let pool = rayon::ThreadPoolBuilder::new().num_threads(settings.indexing.parallel_threads).build();
    let pool = match pool {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error building worker pool: {e}");
            return 1;
        }
    };

    let indexer = Indexer::new(repo_root, &settings, &store);
    let cancel = Arc::new(AtomicBool::new(false));

    let result = pool.install(|| indexer.run_limited(force, max_files, &cancel));
    match result {
        Ok(stats) => {
            println!(
                "scanned {} files: {} new, {} changed, {} unchanged, {} deleted, {} errored ({} symbols, {} edges) in {:.2?}",
                stats.files_scanned,
                stats.files_new,
                stats.files_changed,
                stats.files_unchanged,
                stats.files_deleted,
                stats.files_errored,
                stats.symbols_added,
                stats.edges_added,
                stats.duration,
            );
            0
        }
        Err(e) => {
            eprintln!("Error: {e}");
            for suggestion in e.recovery_suggestions() {
                eprintln!("  - {suggestion}");
            }
            e.exit_code()
        }
    }
}
