use std::path::Path;

use pui::Settings;

pub fn run(repo_root: &Path, force: bool) -> i32 {
    let config_path = Settings::config_path(repo_root);
    if config_path.exists() && !force {
        eprintln!("Configuration file already exists at: {}", config_path.display());
        eprintln!("Use --force to overwrite");
        return 1;
    }

    match Settings::default().save(repo_root) {
        Ok(path) => {
            println!("Created configuration file at: {}", path.display());
            0
        }
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    }
}
