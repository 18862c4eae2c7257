// SPDX-License-Identifier: MIT
//
// cedit-term — Terminal layer for cedit.
//
// Everything that touches the controlling terminal lives here: the raw-mode
// session guard, window geometry discovery, the escape-sequence key decoder,
// the byte-level ANSI encoding, and the one-write-per-frame output buffer.
//
// Like its sibling crates this layer talks to the terminal directly through
// termios and ANSI escape sequences rather than through a TUI framework.
// The surface is small on purpose: a viewer needs to read keys, learn the
// window size, and paint whole frames. Nothing else.

#[cfg(not(unix))]
compile_error!("cedit-term drives the terminal through termios and needs a unix target");

pub mod ansi;
pub mod error;
pub mod event_loop;
pub mod geometry;
pub mod input;
pub mod output;
pub mod reader;
pub mod terminal;

pub use error::TermError;
