// SPDX-License-Identifier: MIT
//
// Terminal errors.
//
// Every variant is fatal to the viewer: the binary clears the screen, prints
// the message and exits. Messages lead with the failing operation, the way
// `perror` output reads, so the user sees e.g. `tcsetattr: Input/output error`.

use std::io;

use thiserror::Error;

/// A failure talking to the controlling terminal.
#[derive(Debug, Error)]
pub enum TermError {
    /// Reading the terminal attributes failed (`tcgetattr`).
    #[error("tcgetattr: {0}")]
    GetAttributes(#[source] io::Error),

    /// Applying terminal attributes failed (`tcsetattr`).
    #[error("tcsetattr: {0}")]
    SetAttributes(#[source] io::Error),

    /// Reading from the terminal failed, or the terminal hung up.
    #[error("read: {0}")]
    Read(#[source] io::Error),

    /// Writing to the terminal failed.
    #[error("write: {0}")]
    Write(#[source] io::Error),

    /// Neither the OS query nor the cursor-report fallback produced a usable
    /// window size.
    #[error("getWindowSize: {0}")]
    WindowSize(&'static str),
}

impl TermError {
    /// The underlying OS error, if there is one.
    #[must_use]
    pub fn os_error(&self) -> Option<&io::Error> {
        match self {
            Self::GetAttributes(e) | Self::SetAttributes(e) | Self::Read(e) | Self::Write(e) => {
                Some(e)
            }
            Self::WindowSize(_) => None,
        }
    }

    /// Process exit status for this error: the negated OS error code, or
    /// `-1` when the failure did not come from the OS.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.os_error()
            .and_then(io::Error::raw_os_error)
            .map_or(-1, |code| -code)
    }
}
