// SPDX-License-Identifier: MIT
//
// File logging.
//
// The viewer owns the terminal, so log lines can never go to stdout or
// stderr without corrupting the screen. Logging is therefore off unless a
// log directory is given; then every event goes to `<dir>/cedit.log` through
// a non-blocking appender. `RUST_LOG` overrides the default filter.

use std::fs;
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Name of the log file inside the log directory.
pub const LOG_FILE: &str = "cedit.log";

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "cedit=info,cedit_term=info,cedit_editor=info";

/// Keeps the background log writer alive; drop it to flush.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

/// Route `tracing` events to `<log_dir>/cedit.log`.
///
/// Returns `None` when the directory can't be created or a global subscriber
/// is already installed. Logging is best-effort and never stops the viewer.
pub fn init(log_dir: &Path) -> Option<LoggingGuard> {
    prepare_dir(log_dir).ok()?;

    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_file(true)
            .with_line_number(true),
    );

    if subscriber.try_init().is_err() {
        return None;
    }

    // Runs before raw mode exists, so the terminal session's own panic hook
    // wraps this one: on a panic the terminal is restored first, then the
    // panic is logged, then the default handler prints it.
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        tracing::error!(panic = %panic_info, "panic");
        previous(panic_info);
    }));

    tracing::info!(log_dir = %log_dir.display(), "tracing initialized");

    Some(LoggingGuard { _guard: guard })
}

fn prepare_dir(log_dir: &Path) -> io::Result<()> {
    fs::create_dir_all(log_dir)?;
    if fs::metadata(log_dir)?.is_dir() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "log path is not a directory",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_dir_creates_nested_directories() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        prepare_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn prepare_dir_rejects_a_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(prepare_dir(file.path()).is_err());
    }

    #[test]
    fn default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }
}
