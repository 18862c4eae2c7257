//! Cursor — a screen coordinate and the keys that move it.
//!
//! The viewer has no scroll offset: the cursor lives in screen space, and the
//! screen always shows the top of the file. Movement is a pure function of
//! the key, the current position and the viewport. It never looks at row
//! content.
//!
//! # Clamping
//!
//! Every move keeps `x < cols` and `y < rows`. Single steps stop at the edge
//! instead of wrapping, and Page Up / Page Down are just `rows - 1` single
//! steps, so on a non-scrolling viewport they land on the first or last
//! screen line.

use cedit_term::geometry::ViewportGeometry;
use cedit_term::input::LogicalKey;

/// The cursor's 0-based screen position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CursorPosition {
    /// Column.
    pub x: u16,
    /// Line.
    pub y: u16,
}

impl CursorPosition {
    /// The top-left corner.
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    #[must_use]
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Whether the position lies inside `geometry`.
    #[inline]
    #[must_use]
    pub const fn is_within(self, geometry: ViewportGeometry) -> bool {
        self.x < geometry.cols && self.y < geometry.rows
    }

    /// Apply one key to the cursor and return the new position.
    ///
    /// Keys that don't move the cursor (Delete, Escape, literals, Quit)
    /// return it unchanged.
    #[must_use]
    pub fn moved(self, key: LogicalKey, geometry: ViewportGeometry) -> Self {
        match key {
            LogicalKey::ArrowLeft => self.step_left(),
            LogicalKey::ArrowRight => self.step_right(geometry),
            LogicalKey::ArrowUp => self.step_up(),
            LogicalKey::ArrowDown => self.step_down(geometry),
            LogicalKey::Home => Self { x: 0, ..self },
            LogicalKey::End => Self {
                x: geometry.last_col(),
                ..self
            },
            LogicalKey::PageUp => {
                (0..geometry.last_row()).fold(self, |cursor, _| cursor.step_up())
            }
            LogicalKey::PageDown => {
                (0..geometry.last_row()).fold(self, |cursor, _| cursor.step_down(geometry))
            }
            LogicalKey::Delete | LogicalKey::Escape | LogicalKey::Quit | LogicalKey::Char(_) => {
                self
            }
        }
    }

    // -- Single steps -------------------------------------------------------

    const fn step_left(self) -> Self {
        Self {
            x: self.x.saturating_sub(1),
            ..self
        }
    }

    const fn step_right(self, geometry: ViewportGeometry) -> Self {
        if self.x < geometry.last_col() {
            Self {
                x: self.x + 1,
                ..self
            }
        } else {
            self
        }
    }

    const fn step_up(self) -> Self {
        Self {
            y: self.y.saturating_sub(1),
            ..self
        }
    }

    const fn step_down(self, geometry: ViewportGeometry) -> Self {
        if self.y < geometry.last_row() {
            Self {
                y: self.y + 1,
                ..self
            }
        } else {
            self
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
