//! Text rows and the row store.
//!
//! A file is held as a flat, ordered list of lines. Rows are raw bytes: the
//! viewer never decodes text, so a file in any encoding (or with invalid
//! UTF-8) displays byte-for-byte. Line terminators are stripped on load.
//!
//! The store is filled once, before the event loop starts, and is read-only
//! from then on.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use tracing::info;

// ---------------------------------------------------------------------------
// TextRow
// ---------------------------------------------------------------------------

/// One line of the file, without its line terminator.
#[derive(Clone, PartialEq, Eq)]
pub struct TextRow {
    content: Box<[u8]>,
}

impl TextRow {
    /// Build a row from raw line bytes.
    #[must_use]
    pub fn new(content: impl Into<Box<[u8]>>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// The row's bytes.
    #[inline]
    #[must_use]
    pub const fn content(&self) -> &[u8] {
        &self.content
    }

    /// Length in bytes.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.content.len()
    }

    /// Whether the row is empty.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl std::fmt::Debug for TextRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TextRow({:?})", String::from_utf8_lossy(&self.content))
    }
}

// ---------------------------------------------------------------------------
// RowStore
// ---------------------------------------------------------------------------

/// The ordered rows of the file being viewed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowStore {
    rows: Vec<TextRow>,
}

impl RowStore {
    /// An empty store (no file given).
    #[must_use]
    pub const fn new() -> Self {
        Self { rows: Vec::new() }
    }

    /// Load every line of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be opened or read.
    pub fn from_file(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let store = Self::from_reader(BufReader::new(file))?;
        info!(path = %path.display(), rows = store.len(), "loaded file");
        Ok(store)
    }

    /// Load every line from `reader`, stripping trailing `\n` and `\r`.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails.
    pub fn from_reader(mut reader: impl BufRead) -> io::Result<Self> {
        let mut store = Self::new();
        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            store.append(trim_line_ending(&line));
        }
        Ok(store)
    }

    /// Append a row at the end.
    pub fn append(&mut self, content: &[u8]) {
        self.rows.push(TextRow::new(content));
    }

    /// Number of rows.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the store has no rows.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The row at `index`, if there is one.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&TextRow> {
        self.rows.get(index)
    }

    /// Iterate rows in file order.
    pub fn iter(&self) -> std::slice::Iter<'_, TextRow> {
        self.rows.iter()
    }
}

impl<'a> IntoIterator for &'a RowStore {
    type Item = &'a TextRow;
    type IntoIter = std::slice::Iter<'a, TextRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Strip any run of trailing `\n` / `\r` bytes.
fn trim_line_ending(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|&b| b != b'\n' && b != b'\r')
        .map_or(0, |i| i + 1);
    &line[..end]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn contents(store: &RowStore) -> Vec<&[u8]> {
        store.iter().map(TextRow::content).collect()
    }

    // -- TextRow ------------------------------------------------------------

    #[test]
    fn row_len_matches_content() {
        let row = TextRow::new(b"hello".as_slice());
        assert_eq!(row.len(), 5);
        assert_eq!(row.content(), b"hello");
        assert!(!row.is_empty());
        assert!(TextRow::new(Vec::new()).is_empty());
    }

    #[test]
    fn row_debug_is_readable() {
        let row = TextRow::new(b"abc".as_slice());
        assert_eq!(format!("{row:?}"), "TextRow(\"abc\")");
    }

    // -- trim_line_ending ---------------------------------------------------

    #[test]
    fn trims_lf_and_crlf() {
        assert_eq!(trim_line_ending(b"abc\n"), b"abc");
        assert_eq!(trim_line_ending(b"abc\r\n"), b"abc");
        assert_eq!(trim_line_ending(b"abc"), b"abc");
    }

    #[test]
    fn trims_to_empty() {
        assert_eq!(trim_line_ending(b"\r\n"), b"");
        assert_eq!(trim_line_ending(b""), b"");
    }

    #[test]
    fn keeps_interior_cr() {
        assert_eq!(trim_line_ending(b"a\rb\n"), b"a\rb");
    }

    // -- from_reader --------------------------------------------------------

    #[test]
    fn empty_input_has_no_rows() {
        let store = RowStore::from_reader(&b""[..]).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn keeps_first_line() {
        let store = RowStore::from_reader(&b"first\nsecond\n"[..]).unwrap();
        assert_eq!(store.get(0).unwrap().content(), b"first");
    }

    #[test]
    fn last_line_without_newline() {
        let store = RowStore::from_reader(&b"a\nb"[..]).unwrap();
        assert_eq!(contents(&store), vec![b"a".as_slice(), b"b".as_slice()]);
    }

    #[test]
    fn blank_lines_are_rows() {
        let store = RowStore::from_reader(&b"a\n\n\nb\n"[..]).unwrap();
        assert_eq!(store.len(), 4);
        assert!(store.get(1).unwrap().is_empty());
    }

    #[test]
    fn non_utf8_bytes_survive() {
        let store = RowStore::from_reader(&b"\xff\xfe\n"[..]).unwrap();
        assert_eq!(store.get(0).unwrap().content(), b"\xff\xfe");
    }

    #[test]
    fn get_past_end_is_none() {
        let store = RowStore::from_reader(&b"only\n"[..]).unwrap();
        assert!(store.get(1).is_none());
    }

    #[test]
    fn append_preserves_order() {
        let mut store = RowStore::new();
        store.append(b"one");
        store.append(b"two");
        let collected: Vec<_> = (&store).into_iter().map(TextRow::content).collect();
        assert_eq!(collected, vec![b"one".as_slice(), b"two".as_slice()]);
    }

    // -- from_file ----------------------------------------------------------

    #[test]
    fn three_line_file_loads_in_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"alpha\r\nbeta\ngamma\n").unwrap();

        let store = RowStore::from_file(file.path()).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(
            contents(&store),
            vec![b"alpha".as_slice(), b"beta".as_slice(), b"gamma".as_slice()]
        );
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RowStore::from_file(&dir.path().join("nope.txt")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
