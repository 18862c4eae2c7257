// SPDX-License-Identifier: MIT
//
// Event loop — the heartbeat of the viewer.
//
// This module wires the terminal pieces together: raw mode, geometry, the
// key decoder and frame output. The loop itself is as plain as it gets:
//
//   loop {
//       paint a whole frame, write it in one go
//       block until one key is decoded
//       hand the key to the application
//   }
//
// There is no tick, no diffing, no background thread. The viewer only
// changes state in response to a key, so repainting once per key is exactly
// enough. Waiting for a key costs nothing: the decoder sleeps in `poll()`.
//
// # Quitting
//
// When the application answers a key with `Action::Quit`, the loop clears
// the screen, restores the terminal and returns `Ok(())`. Every other way
// out of the loop is an error for the caller to treat as fatal. Raw mode is
// still undone on those paths by the session guard's drop and exit hooks.

use std::io::{self, Write};
use std::time::Duration;

use tracing::{debug, info};

use crate::ansi;
use crate::error::TermError;
use crate::geometry::{self, ViewportGeometry};
use crate::input::{KeyDecoder, LogicalKey};
use crate::output::FrameBuffer;
use crate::reader::{ByteSource, DEFAULT_TIMEOUT, TtyReader};
use crate::terminal::RawMode;

// ─── App Trait ───────────────────────────────────────────────────────────────

/// What the application tells the event loop to do after handling a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Continue running.
    Continue,
    /// Exit the event loop cleanly.
    Quit,
}

/// Application interface for the event loop.
///
/// Each iteration the loop calls [`paint`](App::paint) with a fresh, empty
/// frame, writes the frame, then calls [`on_key`](App::on_key) with the next
/// decoded key.
pub trait App {
    /// Handle one decoded key.
    ///
    /// Return [`Action::Quit`] to exit the event loop.
    fn on_key(&mut self, key: LogicalKey, geometry: ViewportGeometry) -> Action;

    /// Paint the complete screen into `frame`.
    ///
    /// The frame starts empty every time; nothing carries over from the
    /// previous refresh.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding into the frame fails.
    fn paint(&mut self, frame: &mut FrameBuffer, geometry: ViewportGeometry) -> io::Result<()>;
}

// ─── Loop Config ─────────────────────────────────────────────────────────────

/// Configuration for the event loop timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// How long to wait for each further byte after an ESC (and for each
    /// byte of a cursor position report) before giving up on a sequence.
    pub escape_timeout: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            escape_timeout: DEFAULT_TIMEOUT,
        }
    }
}

// ─── EventLoop ───────────────────────────────────────────────────────────────

/// The terminal event loop.
///
/// Owns the raw-mode session, the input source, the output stream and the
/// viewport geometry. Call [`run`](Self::run) to enter the loop; it returns
/// when the application signals [`Action::Quit`].
///
/// # Example
///
/// ```no_run
/// use std::io;
/// use cedit_term::event_loop::{Action, App, EventLoop, LoopConfig};
/// use cedit_term::geometry::ViewportGeometry;
/// use cedit_term::input::LogicalKey;
/// use cedit_term::output::FrameBuffer;
///
/// struct Blank;
///
/// impl App for Blank {
///     fn on_key(&mut self, key: LogicalKey, _: ViewportGeometry) -> Action {
///         if key == LogicalKey::Quit { Action::Quit } else { Action::Continue }
///     }
///
///     fn paint(&mut self, _: &mut FrameBuffer, _: ViewportGeometry) -> io::Result<()> {
///         Ok(())
///     }
/// }
///
/// let mut event_loop = EventLoop::start(LoopConfig::default())?;
/// event_loop.run(&mut Blank)?;
/// # Ok::<(), cedit_term::TermError>(())
/// ```
pub struct EventLoop<I = TtyReader, W = io::Stdout> {
    session: Option<RawMode>,
    input: I,
    output: W,
    decoder: KeyDecoder,
    geometry: ViewportGeometry,
}

impl EventLoop {
    /// Take over the controlling terminal: enter raw mode on stdin, then
    /// discover the window size of that same terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if raw mode can't be entered or the geometry probe
    /// fails. Raw mode is restored before a probe error is returned.
    pub fn start(config: LoopConfig) -> Result<Self, TermError> {
        let session = RawMode::enter()?;
        let mut input = TtyReader::stdin();
        let mut output = io::stdout();
        let geometry = geometry::probe(
            libc::STDIN_FILENO,
            &mut output,
            &mut input,
            config.escape_timeout,
        )?;
        info!(rows = geometry.rows, cols = geometry.cols, "viewport ready");

        Ok(Self {
            session: Some(session),
            input,
            output,
            decoder: KeyDecoder::new(config.escape_timeout),
            geometry,
        })
    }
}

impl<I: ByteSource, W: Write> EventLoop<I, W> {
    /// Build a loop over arbitrary input and output with a known geometry.
    ///
    /// No raw-mode session is attached; the caller owns the terminal state.
    #[must_use]
    pub const fn with_io(input: I, output: W, geometry: ViewportGeometry, config: LoopConfig) -> Self {
        Self {
            session: None,
            input,
            output,
            decoder: KeyDecoder::new(config.escape_timeout),
            geometry,
        }
    }

    /// The viewport geometry discovered at start-up.
    #[inline]
    #[must_use]
    pub const fn geometry(&self) -> ViewportGeometry {
        self.geometry
    }

    /// The output stream (for inspection in tests).
    #[inline]
    #[must_use]
    pub const fn output(&self) -> &W {
        &self.output
    }

    /// Paint one frame and write it to the output in a single call.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::Write`] if painting or writing fails.
    pub fn refresh(&mut self, app: &mut impl App) -> Result<(), TermError> {
        let mut frame = FrameBuffer::new();
        app.paint(&mut frame, self.geometry).map_err(TermError::Write)?;
        frame.flush_to(&mut self.output).map_err(TermError::Write)
    }

    /// Run until the application returns [`Action::Quit`].
    ///
    /// On quit the screen is cleared and raw mode restored.
    ///
    /// # Errors
    ///
    /// Returns an error if reading a key, writing a frame, or restoring the
    /// terminal fails.
    pub fn run(&mut self, app: &mut impl App) -> Result<(), TermError> {
        loop {
            self.refresh(app)?;
            let key = self.decoder.read_key(&mut self.input)?;
            if app.on_key(key, self.geometry) == Action::Quit {
                debug!("quit requested");
                return self.shutdown();
            }
        }
    }

    /// Clear the screen and hand the terminal back.
    fn shutdown(&mut self) -> Result<(), TermError> {
        ansi::clear_and_home(&mut self.output)
            .and_then(|()| self.output.flush())
            .map_err(TermError::Write)?;
        if let Some(session) = self.session.as_mut() {
            session.restore()?;
        }
        info!("event loop finished");
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Scripted input: `Some(b)` delivers a byte, `None` is a read timeout.
    struct Script(VecDeque<Option<u8>>);

    impl Script {
        fn bytes(bytes: &[u8]) -> Self {
            Self(bytes.iter().copied().map(Some).collect())
        }
    }

    impl ByteSource for Script {
        fn read_byte(&mut self, _timeout: Duration) -> io::Result<Option<u8>> {
            self.0
                .pop_front()
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))
        }
    }

    /// App that records keys and paints a frame counter.
    #[derive(Default)]
    struct Recorder {
        keys: Vec<LogicalKey>,
        paints: usize,
    }

    impl App for Recorder {
        fn on_key(&mut self, key: LogicalKey, _geometry: ViewportGeometry) -> Action {
            self.keys.push(key);
            if key == LogicalKey::Quit {
                Action::Quit
            } else {
                Action::Continue
            }
        }

        fn paint(&mut self, frame: &mut FrameBuffer, _geometry: ViewportGeometry) -> io::Result<()> {
            self.paints += 1;
            write!(frame, "<frame {}>", self.paints)
        }
    }

    fn geometry() -> ViewportGeometry {
        ViewportGeometry::new(24, 80).unwrap()
    }

    // ── LoopConfig ──────────────────────────────────────────────

    #[test]
    fn default_config_uses_decisecond_timeout() {
        let config = LoopConfig::default();
        assert_eq!(config.escape_timeout, Duration::from_millis(100));
    }

    // ── Action ──────────────────────────────────────────────────

    #[test]
    fn action_equality() {
        assert_eq!(Action::Continue, Action::Continue);
        assert_ne!(Action::Continue, Action::Quit);
    }

    // ── run ─────────────────────────────────────────────────────

    #[test]
    fn quit_returns_ok_and_clears_screen() {
        let mut event_loop =
            EventLoop::with_io(Script::bytes(b"\x11"), Vec::new(), geometry(), LoopConfig::default());
        let mut app = Recorder::default();

        event_loop.run(&mut app).unwrap();

        assert_eq!(app.keys, vec![LogicalKey::Quit]);
        assert_eq!(event_loop.output().as_slice(), b"<frame 1>\x1b[2J\x1b[1;1H");
    }

    #[test]
    fn repaints_before_every_key() {
        let mut event_loop = EventLoop::with_io(
            Script::bytes(b"\x1b[Bx\x11"),
            Vec::new(),
            geometry(),
            LoopConfig::default(),
        );
        let mut app = Recorder::default();

        event_loop.run(&mut app).unwrap();

        assert_eq!(
            app.keys,
            vec![LogicalKey::ArrowDown, LogicalKey::Char(b'x'), LogicalKey::Quit]
        );
        assert_eq!(app.paints, 3);
        let out = String::from_utf8(event_loop.output().clone()).unwrap();
        assert!(out.starts_with("<frame 1><frame 2><frame 3>"));
    }

    #[test]
    fn idle_timeouts_do_not_repaint() {
        let input = Script([None, None, Some(0x11)].into_iter().collect());
        let mut event_loop = EventLoop::with_io(input, Vec::new(), geometry(), LoopConfig::default());
        let mut app = Recorder::default();

        event_loop.run(&mut app).unwrap();
        assert_eq!(app.paints, 1);
    }

    #[test]
    fn input_failure_is_a_read_error() {
        let mut event_loop =
            EventLoop::with_io(Script::bytes(b"ab"), Vec::new(), geometry(), LoopConfig::default());
        let mut app = Recorder::default();

        let err = event_loop.run(&mut app).unwrap_err();
        assert!(matches!(err, TermError::Read(_)));
        assert_eq!(app.keys.len(), 2);
    }

    #[test]
    fn refresh_writes_one_frame() {
        let mut event_loop =
            EventLoop::with_io(Script::bytes(b""), Vec::new(), geometry(), LoopConfig::default());
        let mut app = Recorder::default();
        event_loop.refresh(&mut app).unwrap();
        assert_eq!(event_loop.output().as_slice(), b"<frame 1>");
    }

    #[test]
    fn geometry_is_exposed() {
        let event_loop =
            EventLoop::with_io(Script::bytes(b""), Vec::new(), geometry(), LoopConfig::default());
        assert_eq!(event_loop.geometry(), geometry());
    }
}
