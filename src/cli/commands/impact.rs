use std::path::Path;

use pui::{GraphEngine, ImpactPack, PackFormat, Settings, Store};

pub fn run(
    repo_root: &Path,
    targets: Vec<String>,
    depth: u32,
    budget: Option<usize>,
    format: PackFormat,
) -> i32 {
    if targets.is_empty() {
        eprintln!("Error: impact requires at least one target (symbol id, name, or file path)");
        return 1;
    }

    let settings = Settings::load(repo_root).unwrap_or_default();
    let store = match Store::open(&Settings::db_path(repo_root), settings.indexing.batch_size) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };
    let graph = GraphEngine::new(&store);

    let budget = budget.unwrap_or(settings.budgets.impact);
    match ImpactPack::generate(&store, &graph, targets, depth, budget) {
        Ok(pack) => {
            match format {
                PackFormat::Markdown => println!("{}", pack.to_markdown()),
                PackFormat::Json => println!("{}", pack.to_json()),
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    }
}
