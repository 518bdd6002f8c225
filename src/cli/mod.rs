//! The CLI shell: parse argv, resolve the repo root, dispatch to a
//! `commands::*::run`. No business logic lives here.

pub mod args;
pub mod commands;

use std::env;
use std::path::PathBuf;

use args::{Cli, Commands};
use commands::resolve_format;

pub fn run(cli: Cli) -> i32 {
    let repo_root = cli
        .repo
        .unwrap_or_else(|| env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    match cli.command {
        Commands::Init { force } => commands::init::run(&repo_root, force),
        Commands::Index { path, force, threads, max_files } => {
            commands::index::run(&path, force, threads, max_files)
        }
        Commands::Repomap { budget, focus, format } => {
            commands::repomap::run(&repo_root, budget, focus, resolve_format(&format))
        }
        Commands::Zoom { target, budget, format } => {
            commands::zoom::run(&repo_root, target, budget, resolve_format(&format))
        }
        Commands::Impact { targets, depth, budget, format } => {
            commands::impact::run(&repo_root, targets, depth, budget, resolve_format(&format))
        }
        Commands::Find { query, limit } => commands::find::run(&repo_root, query, limit),
        Commands::Config => commands::config::run(&repo_root),
    }
}
