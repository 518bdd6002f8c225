use std::path::Path;

use pui::{PackFormat, RepoMapPack, Settings, Store};

pub fn run(repo_root: &Path, budget: Option<usize>, focus: Option<String>, format: PackFormat) -> i32 {
    let settings = Settings::load(repo_root).unwrap_or_default();
    let store = match Store::open(&Settings::db_path(repo_root), settings.indexing.batch_size) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };

    let budget = budget.unwrap_or(settings.budgets.repomap);
    match RepoMapPack::generate(&store, budget, focus.as_deref()) {
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
