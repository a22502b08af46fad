//! Text utilities for position conversion.
//!
//! Provides byte offset <-> line/column conversion, plus LSP position conversion
//! with proper UTF-16 handling for the host side.

use tower_lsp::lsp_types::{Position, Range};

use crate::error::{check_offset, check_range, DocumentError, Result};

use super::change::TextSpan;

/// A 0-based line and byte column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineCol {
    pub line: usize,
    pub col: usize,
}

impl LineCol {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

/// Pre-computed line starts.
///
/// `\r\n`, `\r`, `\n`, `\u{2028}`, `\u{2029}` and `\u{0085}` all end a line. The
/// index does not own the text; it only remembers where lines begin and end and
/// how long the indexed text is. Offsets are bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    /// Byte offset where each line starts. Always begins with `0`.
    line_starts: Vec<usize>,
    /// Byte offset where the content of each terminated line ends, before its
    /// line break. The last line has no entry and ends at `len`.
    line_ends: Vec<usize>,
    /// Length of the indexed text.
    len: usize,
}

/// Line breaks in `text` as `(start, end)` byte ranges.
fn line_breaks(text: &str) -> impl Iterator<Item = (usize, usize)> + '_ {
    let bytes = text.as_bytes();
    text.char_indices().filter_map(move |(i, c)| match c {
        '\r' if bytes.get(i + 1) == Some(&b'\n') => None,
        '\n' if i > 0 && bytes[i - 1] == b'\r' => Some((i - 1, i + 1)),
        '\n' | '\r' | '\u{2028}' | '\u{2029}' | '\u{0085}' => Some((i, i + c.len_utf8())),
        _ => None,
    })
}

impl LineIndex {
    /// Build a line index from source text.
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        let mut line_ends = Vec::new();
        for (start, end) in line_breaks(text) {
            line_ends.push(start);
            line_starts.push(end);
        }

        Self {
            line_starts,
            line_ends,
            len: text.len(),
        }
    }

    pub fn line_starts(&self) -> &[usize] {
        &self.line_starts
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Length of the indexed text in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Update the index after `start..end` of the old text was replaced by
    /// `inserted_len` bytes, giving `edited`.
    ///
    /// Only the line breaks touching the replaced span are rescanned, so a `\r`
    /// and `\n` joined or split by the edit are handled; later breaks are shifted.
    /// The result equals `LineIndex::new(edited)`.
    pub fn apply_edit(&mut self, edited: &str, start: usize, end: usize, inserted_len: usize) {
        debug_assert!(start <= end && end <= self.len);
        debug_assert_eq!(edited.len(), self.len - (end - start) + inserted_len);

        // Breaks `first..last` end at or after `start` and begin at or before `end`.
        let first = self.line_starts[1..].partition_point(|&s| s < start);
        let last = self.line_ends.partition_point(|&e| e <= end);

        let (scan_start, old_scan_end) = if first < last {
            (
                start.min(self.line_ends[first]),
                end.max(self.line_starts[last]),
            )
        } else {
            (start, end)
        };
        let scan_end = old_scan_end - (end - start) + inserted_len;

        for line in last..self.line_ends.len() {
            self.line_ends[line] = self.line_ends[line] - (end - start) + inserted_len;
            self.line_starts[line + 1] = self.line_starts[line + 1] - (end - start) + inserted_len;
        }

        let rescanned: Vec<(usize, usize)> = line_breaks(&edited[scan_start..scan_end])
            .map(|(s, e)| (scan_start + s, scan_start + e))
            .collect();
        self.line_ends
            .splice(first..last, rescanned.iter().map(|&(s, _)| s));
        self.line_starts
            .splice(first + 1..last + 1, rescanned.iter().map(|&(_, e)| e));
        self.len = edited.len();
    }

    /// Line containing `offset`. The offset must be in range.
    fn line_of(&self, offset: usize) -> usize {
        // Binary search to find the line
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line,                    // Exact match (start of line)
            Err(line) => line.saturating_sub(1), // In the middle of a line
        }
    }

    /// Byte offset of the end of `line`, excluding its line break.
    fn line_end(&self, line: usize) -> usize {
        self.line_ends.get(line).copied().unwrap_or(self.len)
    }

    fn check_line(&self, line: usize) -> Result<usize> {
        self.line_starts
            .get(line)
            .copied()
            .ok_or(DocumentError::LineOutOfRange {
                line,
                line_count: self.line_count(),
            })
    }

    /// Convert a byte offset to a line and byte column.
    pub fn offset_to_line_col(&self, offset: usize) -> Result<LineCol> {
        if offset > self.len {
            return Err(DocumentError::OffsetOutOfRange {
                offset,
                len: self.len,
            });
        }
        let line = self.line_of(offset);
        Ok(LineCol::new(line, offset - self.line_starts[line]))
    }

    /// Convert a line and byte column to a byte offset.
    ///
    /// The column may point at the line's end or into its line break, never at
    /// the next line's start.
    pub fn line_col_to_offset(&self, line_col: LineCol) -> Result<usize> {
        let line_start = self.check_line(line_col.line)?;
        let limit = self
            .line_starts
            .get(line_col.line + 1)
            .map(|&next| next - 1)
            .unwrap_or(self.len);
        if line_start + line_col.col > limit {
            return Err(DocumentError::ColumnOutOfRange {
                line: line_col.line,
                col: line_col.col,
                line_len: self.line_end(line_col.line) - line_start,
            });
        }
        Ok(line_start + line_col.col)
    }

    /// Convert a byte offset in `text` to an LSP position.
    ///
    /// `text` must be the text this index was built for.
    pub fn offset_to_position(&self, text: &str, offset: usize) -> Result<Position> {
        check_offset(text, offset)?;
        let line = self.line_of(offset);
        let line_start = self.line_starts[line];
        let col = text[line_start..offset].encode_utf16().count();
        Ok(Position::new(line as u32, col as u32))
    }

    /// Convert an LSP position to a byte offset in `text`.
    ///
    /// Fails if the line does not exist, or the UTF-16 column lies past the end of
    /// the line or inside a surrogate pair.
    pub fn position_to_offset(&self, text: &str, position: Position) -> Result<usize> {
        let line = position.line as usize;
        let line_start = self.check_line(line)?;
        let line_end = self.line_end(line);
        let line_slice = &text[line_start..line_end];

        // Walk UTF-16 code units to find byte offset
        let target = position.character as usize;
        let mut utf16_col = 0usize;
        for (i, c) in line_slice.char_indices() {
            if utf16_col == target {
                return Ok(line_start + i);
            }
            if utf16_col > target {
                break;
            }
            utf16_col += c.len_utf16();
        }
        if utf16_col == target {
            return Ok(line_end);
        }

        Err(DocumentError::ColumnOutOfRange {
            line,
            col: target,
            line_len: line_slice.encode_utf16().count(),
        })
    }

    /// Convert a byte span of `text` to an LSP range.
    pub fn span_to_range(&self, text: &str, span: TextSpan) -> Result<Range> {
        check_range(text, span.start, span.end)?;
        let start = self.offset_to_position(text, span.start)?;
        let end = self.offset_to_position(text, span.end)?;
        Ok(Range::new(start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line() {
        let idx = LineIndex::new("hello world");
        assert_eq!(idx.line_starts(), &[0]);
        assert_eq!(idx.offset_to_line_col(0), Ok(LineCol::new(0, 0)));
        assert_eq!(idx.offset_to_line_col(5), Ok(LineCol::new(0, 5)));
        assert_eq!(idx.offset_to_line_col(11), Ok(LineCol::new(0, 11)));
    }

    #[test]
    fn multi_line() {
        let idx = LineIndex::new("hello\nworld\ntest");
        assert_eq!(idx.line_starts(), &[0, 6, 12]);
        assert_eq!(idx.offset_to_line_col(5), Ok(LineCol::new(0, 5))); // the newline itself
        assert_eq!(idx.offset_to_line_col(6), Ok(LineCol::new(1, 0))); // 'w'
        assert_eq!(idx.offset_to_line_col(11), Ok(LineCol::new(1, 5)));
        assert_eq!(idx.offset_to_line_col(12), Ok(LineCol::new(2, 0))); // 't'
    }

    #[test]
    fn trailing_newline_opens_empty_line() {
        let idx = LineIndex::new("a\n");
        assert_eq!(idx.line_count(), 2);
        assert_eq!(idx.offset_to_line_col(2), Ok(LineCol::new(1, 0)));
        assert_eq!(idx.line_col_to_offset(LineCol::new(1, 0)), Ok(2));
    }

    #[test]
    fn line_col_to_offset_multi_line() {
        let idx = LineIndex::new("hello\nworld");
        assert_eq!(idx.line_col_to_offset(LineCol::new(0, 0)), Ok(0));
        assert_eq!(idx.line_col_to_offset(LineCol::new(0, 5)), Ok(5));
        assert_eq!(idx.line_col_to_offset(LineCol::new(1, 0)), Ok(6));
        assert_eq!(idx.line_col_to_offset(LineCol::new(1, 5)), Ok(11));
    }

    #[test]
    fn out_of_bounds() {
        let idx = LineIndex::new("hello\nab");
        assert_eq!(
            idx.offset_to_line_col(9),
            Err(DocumentError::OffsetOutOfRange { offset: 9, len: 8 })
        );
        assert_eq!(
            idx.line_col_to_offset(LineCol::new(5, 0)),
            Err(DocumentError::LineOutOfRange {
                line: 5,
                line_count: 2
            })
        );
        assert_eq!(
            idx.line_col_to_offset(LineCol::new(0, 6)),
            Err(DocumentError::ColumnOutOfRange {
                line: 0,
                col: 6,
                line_len: 5
            })
        );
        assert_eq!(
            idx.line_col_to_offset(LineCol::new(1, 3)),
            Err(DocumentError::ColumnOutOfRange {
                line: 1,
                col: 3,
                line_len: 2
            })
        );
    }

    #[test]
    fn utf16_handling() {
        // '😀' is 4 bytes in UTF-8 but 2 code units in UTF-16
        let text = "a😀b";
        let idx = LineIndex::new(text);
        assert_eq!(idx.offset_to_position(text, 0), Ok(Position::new(0, 0)));
        assert_eq!(idx.offset_to_position(text, 1), Ok(Position::new(0, 1)));
        // 'b' is at byte 5, col 3 (1 + 2 for emoji)
        assert_eq!(idx.offset_to_position(text, 5), Ok(Position::new(0, 3)));

        assert_eq!(idx.position_to_offset(text, Position::new(0, 3)), Ok(5));
        assert_eq!(idx.position_to_offset(text, Position::new(0, 4)), Ok(6));
        // Inside the surrogate pair
        assert!(idx.position_to_offset(text, Position::new(0, 2)).is_err());
        assert_eq!(
            idx.offset_to_position(text, 2),
            Err(DocumentError::NotCharBoundary { offset: 2 })
        );
    }

    #[test]
    fn position_past_line_end_is_rejected() {
        let text = "ab\ncd";
        let idx = LineIndex::new(text);
        assert_eq!(idx.position_to_offset(text, Position::new(0, 2)), Ok(2));
        assert_eq!(
            idx.position_to_offset(text, Position::new(0, 3)),
            Err(DocumentError::ColumnOutOfRange {
                line: 0,
                col: 3,
                line_len: 2
            })
        );
        assert_eq!(
            idx.position_to_offset(text, Position::new(2, 0)),
            Err(DocumentError::LineOutOfRange {
                line: 2,
                line_count: 2
            })
        );
    }

    #[test]
    fn span_to_range() {
        let text = "hello\nworld";
        let idx = LineIndex::new(text);
        let range = idx.span_to_range(text, TextSpan::new(6, 11)).unwrap();
        assert_eq!(range.start, Position::new(1, 0));
        assert_eq!(range.end, Position::new(1, 5));
    }

    #[test]
    fn apply_edit_matches_rebuild() {
        let cases = [
            ("hello\nworld\n", 3, 8, "X\nY\nZ"),
            ("a\nb\nc\nd", 1, 6, ""),
            ("", 0, 0, "\n\n"),
            ("abc", 3, 3, "\n"),
            ("line\n", 0, 5, "single"),
        ];
        for (text, start, end, inserted) in cases {
            let mut idx = LineIndex::new(text);
            let edited = format!("{}{}{}", &text[..start], inserted, &text[end..]);
            idx.apply_edit(&edited, start, end, inserted.len());
            assert_eq!(idx, LineIndex::new(&edited), "editing {text:?}");
        }
    }

    #[test]
    fn all_line_breaks_end_lines() {
        let idx = LineIndex::new("a\rb\r\nc");
        assert_eq!(idx.line_starts(), &[0, 2, 5]);

        let idx = LineIndex::new("a\u{2028}b\u{2029}c\u{0085}d");
        assert_eq!(idx.line_starts(), &[0, 4, 8, 11]);
        assert_eq!(idx.line_col_to_offset(LineCol::new(3, 1)), Ok(12));
    }

    #[test]
    fn positions_skip_whole_line_break() {
        let text = "a\rb\r\nc";
        let idx = LineIndex::new(text);
        assert_eq!(idx.position_to_offset(text, Position::new(1, 0)), Ok(2));
        assert_eq!(idx.position_to_offset(text, Position::new(1, 1)), Ok(3));
        assert_eq!(idx.position_to_offset(text, Position::new(2, 0)), Ok(5));
        assert_eq!(idx.offset_to_position(text, 5), Ok(Position::new(2, 0)));

        let text = "ab\r\ncd";
        let idx = LineIndex::new(text);
        assert_eq!(
            idx.position_to_offset(text, Position::new(0, 3)),
            Err(DocumentError::ColumnOutOfRange {
                line: 0,
                col: 3,
                line_len: 2
            })
        );
    }

    #[test]
    fn offset_inside_crlf_round_trips() {
        let idx = LineIndex::new("ab\r\ncd");
        assert_eq!(idx.offset_to_line_col(3), Ok(LineCol::new(0, 3)));
        assert_eq!(idx.line_col_to_offset(LineCol::new(0, 3)), Ok(3));
        assert!(idx.line_col_to_offset(LineCol::new(0, 4)).is_err());
    }

    #[test]
    fn apply_edit_joins_and_splits_crlf() {
        let cases = [
            // "\r" + "\n" joined into one break.
            ("a\rb\nc", 2, 3, ""),
            ("a\r", 2, 2, "\n"),
            ("\nb", 0, 0, "x\r"),
            // "\r\n" split into two breaks.
            ("a\r\nb", 2, 2, "x"),
            ("a\r\nb", 1, 2, ""),
            ("a\r\nb", 2, 3, "\u{2028}"),
            ("x\r\r\n\ny", 2, 3, ""),
            ("é\u{0085}\r", 2, 4, "\n\r"),
        ];
        for (text, start, end, inserted) in cases {
            let mut idx = LineIndex::new(text);
            let edited = format!("{}{}{}", &text[..start], inserted, &text[end..]);
            idx.apply_edit(&edited, start, end, inserted.len());
            assert_eq!(idx, LineIndex::new(&edited), "editing {text:?}");
        }
    }
}
