//! View — paints the row store into one frame.
//!
//! The screen always shows the top of the file: screen line `y` is row `y`.
//! Each line is one of
//!
//! - the row's bytes, truncated to the viewport width (never wrapped),
//! - a `~` placeholder past the end of the file,
//! - the welcome banner, on line `rows / 3` when there is no file at all.
//!
//! Every line is followed by erase-to-end-of-line, so stale characters from
//! the previous frame vanish without clearing the whole screen. The cursor is
//! hidden while the frame is drawn and shown again at the very end, after it
//! has been moved to its position.

use std::io;

use cedit_term::ansi;
use cedit_term::geometry::ViewportGeometry;
use cedit_term::output::FrameBuffer;

use crate::cursor::CursorPosition;
use crate::row::RowStore;

/// Marker drawn on screen lines past the end of the file.
pub const PLACEHOLDER: u8 = b'~';

/// The welcome banner shown on an empty viewer.
#[must_use]
pub fn banner() -> String {
    format!("CEdit editor -- version {}", env!("CARGO_PKG_VERSION"))
}

/// Paint a full frame: every screen line, then the cursor.
///
/// # Errors
///
/// Returns an error only if encoding into `frame` fails.
pub fn render(
    rows: &RowStore,
    cursor: CursorPosition,
    geometry: ViewportGeometry,
    frame: &mut FrameBuffer,
) -> io::Result<()> {
    ansi::cursor_hide(frame)?;
    ansi::cursor_home(frame)?;

    let cols = usize::from(geometry.cols);
    let banner_line = usize::from(geometry.rows / 3);
    for y in 0..usize::from(geometry.rows) {
        match rows.get(y) {
            Some(row) => {
                let content = row.content();
                frame.push_bytes(&content[..content.len().min(cols)]);
            }
            None if rows.is_empty() && y == banner_line => draw_banner(frame, cols),
            None => frame.push_bytes(&[PLACEHOLDER]),
        }

        ansi::erase_line(frame)?;
        if y + 1 < usize::from(geometry.rows) {
            frame.push_bytes(b"\r\n");
        }
    }

    ansi::cursor_to(frame, cursor.x, cursor.y)?;
    ansi::cursor_show(frame)
}

/// Center the banner on a `cols`-wide line, clipping it when too wide.
///
/// The first padding column keeps the placeholder so the left edge stays
/// a continuous column of `~`.
fn draw_banner(frame: &mut FrameBuffer, cols: usize) {
    let banner = banner();
    let text = &banner.as_bytes()[..banner.len().min(cols)];
    let padding = (cols - text.len()) / 2;
    if padding > 0 {
        frame.push_bytes(&[PLACEHOLDER]);
        frame.push_repeated(b' ', padding - 1);
    }
    frame.push_bytes(text);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
