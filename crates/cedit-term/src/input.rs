// SPDX-License-Identifier: MIT
//
// Key decoder.
//
// Turns the raw terminal byte stream into logical keys. Plain bytes are keys
// on their own. Special keys (arrows, Home/End, Page Up/Down, Delete) arrive
// as escape sequences with no length prefix:
//
//   ESC [ A .. D        arrows
//   ESC [ H / ESC [ F   Home / End
//   ESC O H / ESC O F   Home / End (application cursor mode)
//   ESC [ n ~           n = 1,7 Home · 3 Delete · 4,8 End · 5 PgUp · 6 PgDn
//
// # Design
//
// The decoder is a small synchronous state machine that pulls bytes through a
// `ByteSource` one at a time:
//
//   Start   — wait for a byte. Timeouts here just mean the user is idle, so
//             keep waiting. Anything but ESC is returned as a literal key.
//   Escape  — read up to two more bytes (three for `ESC [ n ~`), each with the
//             escape timeout. A timeout means there is no sequence: the user
//             pressed Escape. Anything we don't recognize also becomes Escape.
//
// Malformed input never produces an error, only an Escape key. The only
// errors are failures of the underlying read.

use std::time::Duration;

use tracing::trace;

use crate::error::TermError;
use crate::reader::{ByteSource, DEFAULT_TIMEOUT};

// ─── Keys ───────────────────────────────────────────────────────────────────

/// The escape byte (0x1B) that starts every multi-byte key sequence.
pub const ESC: u8 = 0x1B;

/// The byte a terminal sends for Ctrl+`key`: the low five bits of `key`.
#[inline]
#[must_use]
pub const fn ctrl_key(key: u8) -> u8 {
    key & 0x1F
}

/// Byte that quits the viewer: Ctrl+Q.
pub const QUIT_BYTE: u8 = ctrl_key(b'q');

/// A decoded key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalKey {
    /// A byte with no special meaning, passed through as-is.
    Char(u8),
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    PageUp,
    PageDown,
    Home,
    End,
    Delete,
    /// A bare Escape press, or an escape sequence we don't recognize.
    Escape,
    /// Ctrl+Q.
    Quit,
}

// ─── KeyDecoder ─────────────────────────────────────────────────────────────

/// Reads one logical key at a time from a [`ByteSource`].
///
/// # Example
///
/// ```no_run
/// use cedit_term::input::{KeyDecoder, LogicalKey};
/// use cedit_term::reader::TtyReader;
///
/// let decoder = KeyDecoder::default();
/// let mut input = TtyReader::stdin();
/// if decoder.read_key(&mut input)? == LogicalKey::Quit {
///     // ...
/// }
/// # Ok::<(), cedit_term::TermError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDecoder {
    timeout: Duration,
}

impl KeyDecoder {
    /// A decoder that waits `timeout` for each byte of an escape sequence.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// The escape disambiguation window.
    #[inline]
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Block until a key arrives and decode it.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::Read`] if reading from `input` fails.
    pub fn read_key(&self, input: &mut impl ByteSource) -> Result<LogicalKey, TermError> {
        let byte = loop {
            if let Some(b) = self.next_byte(input)? {
                break b;
            }
        };

        let key = if byte == ESC {
            self.decode_escape(input)?
        } else {
            literal(byte)
        };
        trace!(?key, "decoded key");
        Ok(key)
    }

    /// Decode what follows an ESC. Every read here is bounded.
    fn decode_escape(&self, input: &mut impl ByteSource) -> Result<LogicalKey, TermError> {
        let Some(first) = self.next_byte(input)? else {
            return Ok(LogicalKey::Escape);
        };
        let Some(second) = self.next_byte(input)? else {
            return Ok(LogicalKey::Escape);
        };

        let key = match (first, second) {
            (b'[', digit @ b'1'..=b'9') => match self.next_byte(input)? {
                Some(b'~') => tilde_key(digit),
                _ => LogicalKey::Escape,
            },
            (b'[', last) => csi_key(last),
            (b'O', last) => ss3_key(last),
            _ => LogicalKey::Escape,
        };
        Ok(key)
    }

    fn next_byte(&self, input: &mut impl ByteSource) -> Result<Option<u8>, TermError> {
        input.read_byte(self.timeout).map_err(TermError::Read)
    }
}

impl Default for KeyDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

// ─── Sequence Tables ────────────────────────────────────────────────────────
//
// Pure lookups from the distinguishing byte of a sequence to its key.

/// A single non-ESC byte.
const fn literal(byte: u8) -> LogicalKey {
    if byte == QUIT_BYTE {
        LogicalKey::Quit
    } else {
        LogicalKey::Char(byte)
    }
}

/// `ESC [ digit ~`
const fn tilde_key(digit: u8) -> LogicalKey {
    match digit {
        b'1' | b'7' => LogicalKey::Home,
        b'3' => LogicalKey::Delete,
        b'4' | b'8' => LogicalKey::End,
        b'5' => LogicalKey::PageUp,
        b'6' => LogicalKey::PageDown,
        _ => LogicalKey::Escape,
    }
}

/// `ESC [ letter`
const fn csi_key(last: u8) -> LogicalKey {
    match last {
        b'A' => LogicalKey::ArrowUp,
        b'B' => LogicalKey::ArrowDown,
        b'C' => LogicalKey::ArrowRight,
        b'D' => LogicalKey::ArrowLeft,
        b'H' => LogicalKey::Home,
        b'F' => LogicalKey::End,
        _ => LogicalKey::Escape,
    }
}

/// `ESC O letter`
const fn ss3_key(last: u8) -> LogicalKey {
    match last {
        b'H' => LogicalKey::Home,
        b'F' => LogicalKey::End,
        _ => LogicalKey::Escape,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
