//! Argument surface (§4.9/§6). No business logic lives here — each variant
//! is decoded and handed straight to the matching `commands::*` function.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pui")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Incremental code intelligence index: RepoMap, Zoom and Impact packs")]
pub struct Cli {
    /// Repository root (defaults to the current directory).
    #[arg(long, global = true)]
    pub repo: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create `.pui/config.json` with default settings.
    Init {
        #[arg(short, long)]
        force: bool,
    },

    /// Scan and (re-)index the repository rooted at `path`.
    Index {
        path: PathBuf,
        #[arg(short, long)]
        force: bool,
        #[arg(short, long)]
        threads: Option<usize>,
        #[arg(long)]
        max_files: Option<usize>,
    },

    /// Repository overview: directory tree, top files, key symbols.
    Repomap {
        #[arg(short, long)]
        budget: Option<usize>,
        #[arg(long)]
        focus: Option<String>,
        #[arg(long, default_value = "markdown")]
        format: String,
    },

    /// Focused slice of a single symbol: signature, code, callers/callees.
    Zoom {
        target: String,
        #[arg(short, long)]
        budget: Option<usize>,
        #[arg(long, default_value = "markdown")]
        format: String,
    },

    /// Upstream blast radius of a set of changed symbols or files.
    Impact {
        targets: Vec<String>,
        #[arg(short, long, default_value = "2")]
        depth: u32,
        #[arg(short, long)]
        budget: Option<usize>,
        #[arg(long, default_value = "markdown")]
        format: String,
    },

    /// Full-text symbol search (FTS5 MATCH syntax).
    Find {
        query: String,
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Print the effective configuration.
    Config,
}
