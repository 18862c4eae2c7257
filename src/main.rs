// SPDX-License-Identifier: MIT
//
// cedit — a minimal full-screen terminal text viewer.
//
// This is the main binary that wires the two crates together:
//
//   cedit-term   → raw mode, geometry, key decoding, frame output, event loop
//   cedit-editor → row store, cursor navigation, frame rendering
//
// The Viewer struct implements cedit-term's App trait. Each keypress flows
// through:
//
//   stdin → KeyDecoder → on_key → CursorPosition::moved
//   paint → view::render → FrameBuffer → one write to stdout
//
// Start-up follows the terminal first, file second order: raw mode and the
// geometry probe run before the file is opened, so every failure (including
// a missing file) goes through the same clear-screen-and-exit path.

mod logging;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use tracing::{error, info};

use cedit_editor::cursor::CursorPosition;
use cedit_editor::row::RowStore;
use cedit_editor::view;

use cedit_term::TermError;
use cedit_term::ansi;
use cedit_term::event_loop::{Action, App, EventLoop, LoopConfig};
use cedit_term::geometry::ViewportGeometry;
use cedit_term::input::LogicalKey;
use cedit_term::output::FrameBuffer;

use crate::logging::LoggingGuard;

// ─── Command Line ───────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "cedit")]
#[command(about = "A minimal full-screen terminal text viewer", long_about = None)]
#[command(version)]
struct Cli {
    /// File to view. Without one, the viewer starts empty.
    file: Option<PathBuf>,

    /// Write logs to `cedit.log` in this directory (off by default).
    #[arg(long, env = "CEDIT_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// How long to wait for the rest of an escape sequence, in milliseconds.
    #[arg(
        long,
        default_value_t = 100,
        value_parser = clap::value_parser!(u64).range(1..=10_000)
    )]
    escape_timeout_ms: u64,
}

impl Cli {
    const fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            escape_timeout: Duration::from_millis(self.escape_timeout_ms),
        }
    }
}

// ─── Fatal Errors ───────────────────────────────────────────────────────────

/// Everything that ends the viewer early.
#[derive(Debug, Error)]
enum Fatal {
    #[error(transparent)]
    Term(#[from] TermError),

    #[error("fopen: {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Fatal {
    /// Exit status: the negated OS error code, or `-1` without one.
    fn exit_code(&self) -> i32 {
        match self {
            Self::Term(e) => e.exit_code(),
            Self::Open { source, .. } => source.raw_os_error().map_or(-1, |code| -code),
        }
    }
}

/// Clear the screen, report `fatal` and exit.
///
/// `process::exit` skips destructors. The terminal is put back by the exit
/// hook that raw mode registered, and the log writer is flushed here by
/// dropping its guard before exiting.
fn die(fatal: &Fatal, log_guard: Option<LoggingGuard>) -> ! {
    let mut stdout = io::stdout();
    let _ = ansi::clear_and_home(&mut stdout).and_then(|()| stdout.flush());
    error!(error = %fatal, code = fatal.exit_code(), "fatal");
    drop(log_guard);
    eprintln!("cedit: {fatal}");
    process::exit(fatal.exit_code());
}

// ─── Viewer ─────────────────────────────────────────────────────────────────

/// The viewer's whole state: the file's rows and the cursor.
struct Viewer {
    rows: RowStore,
    cursor: CursorPosition,
}

impl Viewer {
    const fn new(rows: RowStore) -> Self {
        Self {
            rows,
            cursor: CursorPosition::ORIGIN,
        }
    }

    /// Load the file named on the command line, if any.
    fn open(path: Option<&Path>) -> Result<Self, Fatal> {
        let rows = match path {
            Some(path) => RowStore::from_file(path).map_err(|source| Fatal::Open {
                path: path.to_path_buf(),
                source,
            })?,
            None => RowStore::new(),
        };
        Ok(Self::new(rows))
    }
}

impl App for Viewer {
    fn on_key(&mut self, key: LogicalKey, geometry: ViewportGeometry) -> Action {
        if key == LogicalKey::Quit {
            return Action::Quit;
        }
        self.cursor = self.cursor.moved(key, geometry);
        Action::Continue
    }

    fn paint(&mut self, frame: &mut FrameBuffer, geometry: ViewportGeometry) -> io::Result<()> {
        view::render(&self.rows, self.cursor, geometry, frame)
    }
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn run(cli: &Cli) -> Result<(), Fatal> {
    let mut event_loop = EventLoop::start(cli.loop_config())?;
    let mut viewer = Viewer::open(cli.file.as_deref())?;
    event_loop.run(&mut viewer)?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let log_guard = cli.log_dir.as_deref().and_then(logging::init);
    info!(file = ?cli.file, "starting");

    if let Err(fatal) = run(&cli) {
        die(&fatal, log_guard);
    }
    info!("exiting");
    drop(log_guard);
}

// ─── Tests ──────────────────────────────────────────────────────────────────
