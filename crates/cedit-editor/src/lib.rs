//! # cedit-editor — Viewer core for cedit
//!
//! The pieces of the viewer that don't talk to the terminal themselves:
//!
//! - **[`row`]** — `TextRow` and the read-only `RowStore` loaded from a file
//! - **[`cursor`]** — `CursorPosition` and the key-driven navigation policy
//! - **[`view`]** — paints rows, placeholders and the welcome banner into a
//!   cedit-term [`FrameBuffer`](cedit_term::output::FrameBuffer)

pub mod cursor;
pub mod row;
pub mod view;
