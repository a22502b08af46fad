//! Errors surfaced by documents, snapshots and the project manager.

use tower_lsp::lsp_types::Url;

/// Failure of a document query or mutation.
///
/// Offsets are never clamped: a bad offset, line or column always comes back
/// to the caller as one of these variants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    /// An offset past the end of the text.
    #[error("offset {offset} is out of range for text of length {len}")]
    OffsetOutOfRange { offset: usize, len: usize },

    /// A `start..end` pair that is inverted or reaches past the end of the text.
    #[error("range {start}..{end} is out of range for text of length {len}")]
    RangeOutOfRange { start: usize, end: usize, len: usize },

    /// An offset that splits a multi-byte character.
    #[error("offset {offset} is not on a character boundary")]
    NotCharBoundary { offset: usize },

    /// A line number at or past the line count.
    #[error("line {line} is out of range (document has {line_count} lines)")]
    LineOutOfRange { line: usize, line_count: usize },

    /// A column past the end of its line.
    #[error("column {col} is out of range for line {line} of length {line_len}")]
    ColumnOutOfRange {
        line: usize,
        col: usize,
        line_len: usize,
    },

    /// No open document for the given file.
    #[error("no open document for {0}")]
    UnknownFile(Url),
}

pub type Result<T> = std::result::Result<T, DocumentError>;

/// Check that `start..end` is a valid byte range of `text`.
pub(crate) fn check_range(text: &str, start: usize, end: usize) -> Result<()> {
    if start > end || end > text.len() {
        return Err(DocumentError::RangeOutOfRange {
            start,
            end,
            len: text.len(),
        });
    }
    check_boundary(text, start)?;
    check_boundary(text, end)
}

/// Check that `offset` is a valid position in `text`.
pub(crate) fn check_offset(text: &str, offset: usize) -> Result<()> {
    if offset > text.len() {
        return Err(DocumentError::OffsetOutOfRange {
            offset,
            len: text.len(),
        });
    }
    check_boundary(text, offset)
}

fn check_boundary(text: &str, offset: usize) -> Result<()> {
    if text.is_char_boundary(offset) {
        Ok(())
    } else {
        Err(DocumentError::NotCharBoundary { offset })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_checks() {
        assert!(check_range("hello", 0, 5).is_ok());
        assert!(check_range("hello", 5, 5).is_ok());
        assert_eq!(
            check_range("hello", 3, 2),
            Err(DocumentError::RangeOutOfRange {
                start: 3,
                end: 2,
                len: 5
            })
        );
        assert_eq!(
            check_range("hello", 0, 6),
            Err(DocumentError::RangeOutOfRange {
                start: 0,
                end: 6,
                len: 5
            })
        );
    }

    #[test]
    fn boundary_checks() {
        // 'é' is two bytes
        assert_eq!(
            check_offset("é", 1),
            Err(DocumentError::NotCharBoundary { offset: 1 })
        );
        assert!(check_offset("é", 2).is_ok());
        assert_eq!(
            check_offset("é", 3),
            Err(DocumentError::OffsetOutOfRange { offset: 3, len: 2 })
        );
    }

    #[test]
    fn messages() {
        let err = DocumentError::LineOutOfRange {
            line: 4,
            line_count: 2,
        };
        assert_eq!(
            err.to_string(),
            "line 4 is out of range (document has 2 lines)"
        );
    }
}
