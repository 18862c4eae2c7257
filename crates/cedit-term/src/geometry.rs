// SPDX-License-Identifier: MIT
//
// Window geometry discovery.
//
// Safety: `ioctl(TIOCGWINSZ)` is the only way to ask the kernel for the
// window size. The one unsafe block is the ioctl call itself.
#![allow(unsafe_code)]
//
// Two ways to learn how big the screen is:
//
//   1. Ask the kernel (`ioctl(TIOCGWINSZ)`). Fast and exact, but some
//      terminals and serial lines report nothing, or zero columns.
//
//   2. Ask the terminal. Push the cursor to row 999, column 999: the terminal
//      clamps it to its real bottom-right corner. Then request a cursor
//      position report (`ESC [ 6 n`) and read the reply, `ESC [ rows ; cols R`,
//      off the input stream. The reply is collected into a small fixed-size
//      buffer, byte by byte, each read bounded by the escape timeout, so a
//      terminal that never answers can't hang us.
//
// If both fail the viewer cannot lay out a frame and must not start.

use std::io::{self, Write};
use std::os::unix::io::RawFd;
use std::time::Duration;

use tracing::{debug, warn};

use crate::ansi;
use crate::error::TermError;
use crate::reader::ByteSource;

// ─── ViewportGeometry ───────────────────────────────────────────────────────

/// Visible extent of the terminal window, in character cells.
///
/// Both fields are always positive; [`new`](Self::new) refuses zeros.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportGeometry {
    /// Number of screen lines.
    pub rows: u16,
    /// Number of columns per line.
    pub cols: u16,
}

impl ViewportGeometry {
    /// Geometry of `rows × cols`, or `None` if either is zero.
    #[must_use]
    pub const fn new(rows: u16, cols: u16) -> Option<Self> {
        if rows == 0 || cols == 0 {
            None
        } else {
            Some(Self { rows, cols })
        }
    }

    /// Index of the last screen line.
    #[inline]
    #[must_use]
    pub const fn last_row(self) -> u16 {
        self.rows.saturating_sub(1)
    }

    /// Index of the last column.
    #[inline]
    #[must_use]
    pub const fn last_col(self) -> u16 {
        self.cols.saturating_sub(1)
    }
}

// ─── Kernel Query ───────────────────────────────────────────────────────────

/// Query the window size of the terminal behind `fd` via `ioctl(TIOCGWINSZ)`.
///
/// Returns `None` if `fd` is not a terminal, the query fails, or the kernel
/// reports a zero dimension.
#[must_use]
pub fn query_window_size(fd: RawFd) -> Option<ViewportGeometry> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &raw mut ws) };

    if result == 0 {
        ViewportGeometry::new(ws.ws_row, ws.ws_col)
    } else {
        None
    }
}

// ─── Cursor Position Report ─────────────────────────────────────────────────

/// Capacity of the cursor report buffer.
///
/// `ESC [ 65535 ; 65535 R` is 15 bytes; anything that doesn't fit in 32 is
/// not a report we can use.
const REPORT_CAPACITY: usize = 32;

/// Parse a cursor position report body: `ESC [ rows ; cols` (the trailing
/// `R` already stripped).
///
/// Returns `None` for anything else, including zero or out-of-range values.
#[must_use]
pub fn parse_cursor_report(report: &[u8]) -> Option<ViewportGeometry> {
    let body = report.strip_prefix(b"\x1b[")?;
    let sep = body.iter().position(|&b| b == b';')?;
    let rows = parse_u16(&body[..sep])?;
    let cols = parse_u16(&body[sep + 1..])?;
    ViewportGeometry::new(rows, cols)
}

/// Parse a non-empty run of ASCII digits. Rejects overflow and stray bytes.
fn parse_u16(digits: &[u8]) -> Option<u16> {
    if digits.is_empty() {
        return None;
    }
    digits.iter().try_fold(0u16, |acc, &b| {
        if b.is_ascii_digit() {
            acc.checked_mul(10)?.checked_add(u16::from(b - b'0'))
        } else {
            None
        }
    })
}

/// Read a cursor position report off `input`.
///
/// Collects bytes until the terminating `R`, a read timeout, or the buffer
/// is full. The `R` itself is not included.
fn read_cursor_report(
    input: &mut impl ByteSource,
    timeout: Duration,
) -> Result<Vec<u8>, TermError> {
    let mut report = Vec::with_capacity(REPORT_CAPACITY);
    while report.len() < REPORT_CAPACITY - 1 {
        match input.read_byte(timeout).map_err(TermError::Read)? {
            None | Some(b'R') => break,
            Some(b) => report.push(b),
        }
    }
    Ok(report)
}

/// Discover the window size by asking the terminal where a far-away cursor
/// ended up.
///
/// # Errors
///
/// Returns [`TermError::Write`] if the requests can't be sent,
/// [`TermError::Read`] if reading the reply fails, and
/// [`TermError::WindowSize`] if the reply is missing or malformed.
pub fn probe_cursor_report(
    output: &mut impl Write,
    input: &mut impl ByteSource,
    timeout: Duration,
) -> Result<ViewportGeometry, TermError> {
    send_probe(output).map_err(TermError::Write)?;
    let report = read_cursor_report(input, timeout)?;
    if report.is_empty() {
        return Err(TermError::WindowSize("no cursor position report"));
    }
    parse_cursor_report(&report).ok_or_else(|| {
        debug!(report = ?String::from_utf8_lossy(&report), "unparseable cursor report");
        TermError::WindowSize("malformed cursor position report")
    })
}

fn send_probe(output: &mut impl Write) -> io::Result<()> {
    ansi::cursor_to_far_corner(output)?;
    ansi::request_cursor_position(output)?;
    output.flush()
}

// ─── Probe ──────────────────────────────────────────────────────────────────

/// Discover the viewport geometry: kernel first, terminal report second.
///
/// `fd` is the descriptor to query with `ioctl`: the raw-mode terminal,
/// stdin in production.
///
/// # Errors
///
/// Returns an error if the kernel query is unusable and the cursor report
/// fallback fails too.
pub fn probe(
    fd: RawFd,
    output: &mut impl Write,
    input: &mut impl ByteSource,
    timeout: Duration,
) -> Result<ViewportGeometry, TermError> {
    if let Some(geometry) = query_window_size(fd) {
        debug!(rows = geometry.rows, cols = geometry.cols, "window size from ioctl");
        return Ok(geometry);
    }

    warn!("ioctl(TIOCGWINSZ) unusable, falling back to cursor position report");
    let geometry = probe_cursor_report(output, input, timeout)?;
    debug!(rows = geometry.rows, cols = geometry.cols, "window size from cursor report");
    Ok(geometry)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
