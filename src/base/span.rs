//! Source text positions and ranges.

use std::fmt;

pub use text_size::TextSize;

/// A line and column position in source text.
///
/// Both line and column are 0-indexed internally, but displayed as 1-indexed.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct LineCol {
    /// 0-indexed line number
    pub line: u32,
    /// 0-indexed column (in UTF-8 bytes, not characters)
    pub col: u32,
}

impl LineCol {
    /// Create a new LineCol position.
    #[inline]
    pub const fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }

    /// Create from 1-indexed line and column (as reported by the validator).
    #[inline]
    pub const fn from_one_indexed(line: u32, col: u32) -> Self {
        Self {
            line: line.saturating_sub(1),
            col: col.saturating_sub(1),
        }
    }

    /// Get 1-indexed line number (for display).
    #[inline]
    pub const fn line_one_indexed(self) -> u32 {
        self.line + 1
    }

    /// Get 1-indexed column number (for display).
    #[inline]
    pub const fn col_one_indexed(self) -> u32 {
        self.col + 1
    }
}

impl fmt::Debug for LineCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line_one_indexed(), self.col_one_indexed())
    }
}

impl fmt::Display for LineCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line_one_indexed(), self.col_one_indexed())
    }
}

/// A half-open range `[start, end)` of source text.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct Range {
    pub start: LineCol,
    pub end: LineCol,
}

impl Range {
    #[inline]
    pub const fn new(start: LineCol, end: LineCol) -> Self {
        Self { start, end }
    }

    /// A range of `len` bytes starting at `(line, col)`.
    #[inline]
    pub const fn on_line(line: u32, col: u32, len: u32) -> Self {
        Self {
            start: LineCol::new(line, col),
            end: LineCol::new(line, col + len),
        }
    }

    /// Like [`Range::on_line`] but drops the first and last character.
    ///
    /// Used for quoted tokens where only the text between the quotes is of
    /// interest. Tokens shorter than two characters collapse to an empty range.
    #[inline]
    pub const fn on_line_trimmed(line: u32, col: u32, len: u32) -> Self {
        if len < 2 {
            return Self::on_line(line, col, 0);
        }
        Self::on_line(line, col + 1, len - 2)
    }

    /// An empty range at a single position.
    #[inline]
    pub const fn empty(at: LineCol) -> Self {
        Self { start: at, end: at }
    }

    /// Inclusive containment, matching how editors treat a cursor sitting
    /// right after the last character of a token.
    pub fn contains(&self, pos: LineCol) -> bool {
        self.start <= pos && pos <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Debug for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}-{:?}", self.start, self.end)
    }
}

/// Index for converting between byte offsets and line/column positions.
#[derive(Clone, Debug)]
pub struct LineIndex {
    /// Byte offset of the start of each line
    line_starts: Vec<TextSize>,
    len: TextSize,
}

impl LineIndex {
    /// Build a line index from source text.
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![TextSize::from(0)];

        for (offset, c) in text.char_indices() {
            if c == '\n' {
                line_starts.push(TextSize::from((offset + 1) as u32));
            }
        }

        Self {
            line_starts,
            len: TextSize::of(text),
        }
    }

    /// Convert a byte offset to a line/column position.
    ///
    /// Offsets past the end of the text clamp to the end.
    pub fn line_col(&self, offset: TextSize) -> LineCol {
        let offset = offset.min(self.len);
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);

        let line_start = self.line_starts[line];
        let col = offset - line_start;

        LineCol {
            line: line as u32,
            col: col.into(),
        }
    }

    /// Range for `len` bytes starting at byte `offset`.
    pub fn range(&self, offset: usize, len: usize) -> Range {
        let start = self.line_col(TextSize::from(offset as u32));
        let end = self.line_col(TextSize::from((offset + len) as u32));
        Range::new(start, end)
    }

    /// Convert a line/column position to a byte offset.
    pub fn offset(&self, line_col: LineCol) -> Option<TextSize> {
        let line_start = self.line_starts.get(line_col.line as usize)?;
        Some(*line_start + TextSize::from(line_col.col))
    }

    /// Get the number of lines.
    pub fn len(&self) -> usize {
        self.line_starts.len()
    }

    /// Check if there are no lines (never true, an empty text has one line).
    pub fn is_empty(&self) -> bool {
        self.line_starts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_display() {
        let pos = LineCol::new(0, 0);
        assert_eq!(format!("{}", pos), "1:1");

        let pos = LineCol::new(5, 10);
        assert_eq!(format!("{}", pos), "6:11");
    }

    #[test]
    fn test_line_col_from_one_indexed() {
        let pos = LineCol::from_one_indexed(1, 1);
        assert_eq!(pos, LineCol::new(0, 0));
    }

    #[test]
    fn test_range_on_line() {
        let range = Range::on_line(3, 4, 6);
        assert_eq!(range.start, LineCol::new(3, 4));
        assert_eq!(range.end, LineCol::new(3, 10));
    }

    #[test]
    fn test_range_trimmed_drops_quotes() {
        // `"User"` at column 2 -> `User`
        let range = Range::on_line_trimmed(0, 2, 6);
        assert_eq!(range.start, LineCol::new(0, 3));
        assert_eq!(range.end, LineCol::new(0, 7));
    }

    #[test]
    fn test_range_trimmed_short_token() {
        let range = Range::on_line_trimmed(0, 2, 1);
        assert!(range.is_empty());
    }

    #[test]
    fn test_range_contains_is_inclusive() {
        let range = Range::on_line(1, 2, 3);
        assert!(range.contains(LineCol::new(1, 2)));
        assert!(range.contains(LineCol::new(1, 5)));
        assert!(!range.contains(LineCol::new(1, 6)));
        assert!(!range.contains(LineCol::new(0, 3)));
    }

    #[test]
    fn test_line_index_multi_line() {
        let index = LineIndex::new("hello\nworld\n!");

        assert_eq!(index.line_col(TextSize::from(0)), LineCol::new(0, 0));
        assert_eq!(index.line_col(TextSize::from(5)), LineCol::new(0, 5));
        assert_eq!(index.line_col(TextSize::from(6)), LineCol::new(1, 0));
        assert_eq!(index.line_col(TextSize::from(11)), LineCol::new(1, 5));
        assert_eq!(index.line_col(TextSize::from(12)), LineCol::new(2, 0));
    }

    #[test]
    fn test_line_index_clamps_past_end() {
        let index = LineIndex::new("ab\ncd");
        assert_eq!(index.line_col(TextSize::from(99)), LineCol::new(1, 2));
    }

    #[test]
    fn test_line_index_range() {
        let index = LineIndex::new("permit(\n  principal\n);");
        let range = index.range(10, 9);
        assert_eq!(range, Range::on_line(1, 2, 9));
    }

    #[test]
    fn test_line_index_offset() {
        let index = LineIndex::new("hello\nworld");

        assert_eq!(index.offset(LineCol::new(0, 0)), Some(TextSize::from(0)));
        assert_eq!(index.offset(LineCol::new(1, 3)), Some(TextSize::from(9)));
        assert_eq!(index.offset(LineCol::new(7, 0)), None);
    }
}
