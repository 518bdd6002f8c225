//! Unified logging for debug output.
//!
//! Provides compact timestamped logging. Supports `RUST_LOG` environment
//! variable overrides; without it, verbosity follows `output.verbose` from
//! the repository's settings (warn by default, info when verbose).

use std::sync::Once;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static INIT: Once = Once::new();

/// Compact time format: HH:MM:SS.mmm
struct CompactTime;

impl FormatTime for CompactTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// Initialize logging. Call once at process startup; safe to call more than
/// once (only the first call takes effect).
///
/// `RUST_LOG` always takes precedence. Without it, `verbose` selects between
/// `warn` (quiet operation, the default) and `info`.
pub fn init(verbose: bool) {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if verbose {
            EnvFilter::new("info")
        } else {
            EnvFilter::new("warn")
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_timer(CompactTime)
            .with_level(true)
            .with_filter(filter);

        tracing_subscriber::registry().with(fmt_layer).init();
    });
}
