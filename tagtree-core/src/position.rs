//! Source locations for diagnostics.
//!
//! [`LineIndex`] maps byte offsets to 1-based line and column numbers. It is
//! built once per source string in a single pass and answers lookups in
//! constant time. Columns count characters, not bytes, and the first
//! character of every line sits in column 1.

use std::fmt;

use memchr::{memchr, memrchr};

/// A resolved position in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column, counted in characters.
    pub column: u32,
    /// Byte offset into the source.
    pub offset: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Offset to line/column lookup table.
///
/// Holds one `(line, column)` entry per source byte plus a trailing entry for
/// the end-of-input position, so every offset in `0..=len` resolves. Bytes
/// inside a multi-byte character share the entry of that character.
#[derive(Debug, Clone)]
pub struct LineIndex {
    entries: Vec<(u32, u32)>,
}

impl LineIndex {
    /// Build the index for `source`.
    pub fn new(source: &str) -> Self {
        let mut entries = Vec::with_capacity(source.len() + 1);
        let mut line = 1u32;
        let mut column = 0u32;

        for ch in source.chars() {
            column += 1;
            for _ in 0..ch.len_utf8() {
                entries.push((line, column));
            }
            if ch == '\n' {
                line += 1;
                column = 0;
            }
        }
        entries.push((line, column + 1));

        LineIndex { entries }
    }

    /// Line and column of `offset`. Offsets past the end clamp to the
    /// end-of-input position.
    #[inline]
    pub fn line_column(&self, offset: usize) -> (u32, u32) {
        let last = self.entries.len() - 1;
        self.entries[offset.min(last)]
    }

    /// Resolve `offset` into a [`Location`].
    pub fn locate(&self, offset: usize) -> Location {
        let (line, column) = self.line_column(offset);
        Location {
            line,
            column,
            offset,
        }
    }

    /// Length in bytes of the indexed source.
    pub fn source_len(&self) -> usize {
        self.entries.len() - 1
    }
}

/// The full line of `source` containing `offset`, without its line break.
pub(crate) fn line_text(source: &str, offset: usize) -> &str {
    let bytes = source.as_bytes();
    let offset = offset.min(bytes.len());
    let start = memrchr(b'\n', &bytes[..offset]).map_or(0, |i| i + 1);
    let end = memchr(b'\n', &bytes[offset..]).map_or(bytes.len(), |i| offset + i);
    let line = source.get(start..end).unwrap_or("");
    line.strip_suffix('\r').unwrap_or(line)
}
