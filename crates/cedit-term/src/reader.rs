// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Timed byte reads from the terminal.
//
// The key decoder and the geometry probe both need "one byte, or nothing
// after a short wait". A lone ESC and the first byte of an escape sequence
// look identical; the only way to tell them apart is whether more bytes show
// up within a few milliseconds. So every read here takes an explicit timeout.
//
// The production source waits with `poll()` on the terminal descriptor and
// then reads a single byte. No threads, no spinning: the process sleeps in
// the kernel until a byte arrives or the timeout fires.

use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;

/// The escape disambiguation window: one decisecond, the same interval the
/// raw-mode `VTIME` setting uses.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100);

/// A source of single bytes with a per-read timeout.
pub trait ByteSource {
    /// Read one byte, waiting at most `timeout`.
    ///
    /// Returns `Ok(None)` when the timeout fired with nothing to read.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails or the source is closed.
    fn read_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>>;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        (**self).read_byte(timeout)
    }
}

// ─── TtyReader ───────────────────────────────────────────────────────────────

/// Reads bytes from a terminal file descriptor (stdin by default).
#[derive(Debug, Clone, Copy)]
pub struct TtyReader {
    fd: RawFd,
}

impl TtyReader {
    /// Reader over the process's standard input.
    #[must_use]
    pub const fn stdin() -> Self {
        Self {
            fd: libc::STDIN_FILENO,
        }
    }

    /// Reader over an arbitrary descriptor. The caller keeps it open.
    #[must_use]
    pub const fn from_fd(fd: RawFd) -> Self {
        Self { fd }
    }
}

impl Default for TtyReader {
    fn default() -> Self {
        Self::stdin()
    }
}

/// Clamp a timeout to what `poll()` accepts (milliseconds, `c_int`).
fn poll_millis(timeout: Duration) -> libc::c_int {
    libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX)
}

impl ByteSource for TtyReader {
    fn read_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        let ready = unsafe {
            let mut pfd = libc::pollfd {
                fd: self.fd,
                events: libc::POLLIN,
                revents: 0,
            };
            libc::poll(&raw mut pfd, 1, poll_millis(timeout))
        };

        if ready < 0 {
            let err = io::Error::last_os_error();
            return match err.kind() {
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock => Ok(None),
                _ => Err(err),
            };
        }
        if ready == 0 {
            return Ok(None);
        }

        let mut byte = 0u8;
        let n = unsafe { libc::read(self.fd, (&raw mut byte).cast(), 1) };

        match n {
            1 => Ok(Some(byte)),
            // With VMIN=0 a read can still come back empty after poll
            // reported readiness (VTIME expired). Only a hangup is EOF.
            0 => {
                if self.hung_up()? {
                    Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "terminal closed",
                    ))
                } else {
                    Ok(None)
                }
            }
            _ => {
                let err = io::Error::last_os_error();
                match err.kind() {
                    io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock => Ok(None),
                    _ => Err(err),
                }
            }
        }
    }
}

impl TtyReader {
    /// Whether the descriptor reports a hangup or is at end-of-file for good.
    ///
    /// After an empty read, a terminal in raw mode with `VMIN=0` can simply
    /// have had nothing to deliver. A pipe or a closed pty keeps polling as
    /// readable and keeps returning zero bytes: that is the case we treat as
    /// closed.
    fn hung_up(self) -> io::Result<bool> {
        let mut pfd = libc::pollfd {
            fd: self.fd,
            events: libc::POLLIN,
            revents: 0,
        };
        let ready = unsafe { libc::poll(&raw mut pfd, 1, 0) };
        if ready < 0 {
            let err = io::Error::last_os_error();
            return if err.kind() == io::ErrorKind::Interrupted {
                Ok(false)
            } else {
                Err(err)
            };
        }
        if pfd.revents & libc::POLLHUP != 0 {
            return Ok(true);
        }
        let is_tty = unsafe { libc::isatty(self.fd) != 0 };
        Ok(ready > 0 && !is_tty)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
