pub mod config;
pub mod find;
pub mod impact;
pub mod index;
pub mod init;
pub mod repomap;
pub mod zoom;

use pui::PackFormat;

/// Resolves a `--format` flag, defaulting to Markdown on anything
/// unrecognized rather than failing the whole command over a typo.
pub fn resolve_format(raw: &str) -> PackFormat {
    PackFormat::parse(raw).unwrap_or(PackFormat::Markdown)
}
