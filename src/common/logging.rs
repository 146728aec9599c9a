//! Logging initialization using `tracing`, `tracing-subscriber` and
//! `tracing-appender`.
//!
//! Console text meant for the operator goes through `cli::output`; these
//! events are the diagnostic trail. They reach stderr only with `--verbose`
//! and otherwise land in a daily-rotated file under `~/.svnfix/logs`.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "svnfix.log";

/// Initialize the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the lifetime of the process. Calling this more than once is a no-op.
pub fn init(verbose: bool, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    if tracing::dispatcher::has_been_set() {
        return None;
    }

    let console = verbose.then(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("svnfix=debug"));
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(filter)
    });

    let mut guard = None;
    let file = log_dir.and_then(|dir| {
        std::fs::create_dir_all(dir).ok()?;
        let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
        let (writer, g) = tracing_appender::non_blocking(appender);
        guard = Some(g);
        Some(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(EnvFilter::new("svnfix=debug")),
        )
    });

    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init();

    guard
}
