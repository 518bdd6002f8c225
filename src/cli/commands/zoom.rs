use std::path::Path;

use pui::{GraphEngine, PackFormat, Settings, Store, ZoomPack};

pub fn run(repo_root: &Path, target: String, budget: Option<usize>, format: PackFormat) -> i32 {
    let settings = Settings::load(repo_root).unwrap_or_default();
    let store = match Store::open(&Settings::db_path(repo_root), settings.indexing.batch_size) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };
    let graph = GraphEngine::new(&store);

    let budget = budget.unwrap_or(settings.budgets.zoom);
    match ZoomPack::generate(&store, &graph, repo_root, &target, budget) {
        Ok(Some(pack)) => {
            match format {
                PackFormat::Markdown => println!("{}", pack.to_markdown()),
                PackFormat::Json => println!("{}", pack.to_json()),
            }
            0
        }
        Ok(None) => {
            eprintln!("No symbol found matching: {target}");
            1
        }
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    }
}
