use std::path::Path;

use pui::Settings;

pub fn run(repo_root: &Path) -> i32 {
    let settings = match Settings::load(repo_root) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };

    match serde_json::to_string_pretty(&settings) {
        Ok(json) => {
            println!("{json}");
            0
        }
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    }
}
