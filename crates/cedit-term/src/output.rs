// SPDX-License-Identifier: MIT
//
// Frame output buffering.
//
// A refresh never writes to the terminal piecemeal. Every escape sequence and
// every row byte of a frame goes into a `FrameBuffer` first, and the finished
// frame is handed to the terminal in a single write. The terminal never sees
// a half-drawn screen, and a frame costs one syscall instead of hundreds.
//
// Buffers are not reused across frames: each refresh builds a fresh one and
// drops it after the flush.

use std::io::{self, Write};

// ─── FrameBuffer ─────────────────────────────────────────────────────────────

/// A byte buffer that accumulates one frame of terminal output.
///
/// Implements [`Write`] so the [`ansi`](crate::ansi) helpers can encode
/// straight into it. Writes into the buffer never fail.
pub struct FrameBuffer {
    buf: Vec<u8>,
}

/// Starting capacity: a full 80×24 screen of text plus per-line escapes.
const DEFAULT_CAPACITY: usize = 4096;

impl FrameBuffer {
    /// Create an empty frame.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(DEFAULT_CAPACITY),
        }
    }

    /// Number of bytes accumulated.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the frame is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The accumulated bytes (for testing and debugging).
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Append raw bytes (row content, padding).
    #[inline]
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Append `n` copies of `byte`.
    #[inline]
    pub fn push_repeated(&mut self, byte: u8, n: usize) {
        self.buf.resize(self.buf.len() + n, byte);
    }

    /// Write the whole frame to `w` in one call and consume the buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails.
    pub fn flush_to(self, w: &mut impl Write) -> io::Result<()> {
        if !self.buf.is_empty() {
            w.write_all(&self.buf)?;
            w.flush()?;
        }
        Ok(())
    }
}

impl Write for FrameBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Nothing leaves the buffer until flush_to().
        Ok(())
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
