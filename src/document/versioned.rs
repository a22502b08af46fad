//! The mutable, versioned document.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::{Position, Url};

use crate::error::{check_offset, check_range, Result};

use super::change::{TextChangeRange, TextSpan};
use super::history::{EditLog, EditRecord, Version};
use super::snapshot::DocumentSnapshot;
use super::text::{LineCol, LineIndex};

/// Byte order mark the host reported for a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ByteOrderMark {
    #[default]
    None,
    Utf8,
    Utf16BigEndian,
    Utf16LittleEndian,
}

/// Text of one file plus its edit history.
///
/// Every content mutation bumps the version by exactly one. Localized edits are
/// logged so that change ranges between versions can be recovered; a wholesale
/// replace restarts the log.
#[derive(Debug)]
pub struct VersionedDocument {
    uri: Url,
    version: Version,
    /// Shared with snapshots; mutation goes through `Arc::make_mut`.
    content: Arc<String>,
    line_index: LineIndex,
    history: Arc<RwLock<EditLog>>,
    byte_order_mark: ByteOrderMark,
}

impl VersionedDocument {
    /// Create a document at version 1.
    pub fn new(uri: Url, text: String) -> Self {
        Self::with_history_limit(uri, text, None)
    }

    /// Create a document at version 1 keeping at most `max_history` edit records.
    pub fn with_history_limit(uri: Url, text: String, max_history: Option<usize>) -> Self {
        let line_index = LineIndex::new(&text);
        let history = EditLog::new(1, text.len(), max_history);
        Self {
            uri,
            version: 1,
            content: Arc::new(text),
            line_index,
            history: Arc::new(RwLock::new(history)),
            byte_order_mark: ByteOrderMark::None,
        }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    pub fn byte_order_mark(&self) -> ByteOrderMark {
        self.byte_order_mark
    }

    pub fn set_byte_order_mark(&mut self, byte_order_mark: ByteOrderMark) {
        self.byte_order_mark = byte_order_mark;
    }

    /// Slice of the current content.
    pub fn text(&self, start: usize, end: usize) -> Result<&str> {
        check_range(&self.content, start, end)?;
        Ok(&self.content[start..end])
    }

    /// Replace the whole content.
    ///
    /// Identical text is a no-op. Otherwise the edit log is cleared, since
    /// incremental history does not survive a wholesale replace.
    /// Returns whether the content changed.
    pub fn replace_all(&mut self, text: &str) -> bool {
        if self.content.as_str() == text {
            tracing::trace!(
                uri = %self.uri,
                version = self.version,
                "replace with identical text skipped"
            );
            return false;
        }

        self.content = Arc::new(text.to_owned());
        self.line_index = LineIndex::new(&self.content);
        self.version += 1;
        self.history.write().reset(self.version, self.content.len());

        tracing::debug!(
            uri = %self.uri,
            version = self.version,
            len = self.content.len(),
            "document content replaced"
        );
        true
    }

    /// Replace `content[start..end]` with `inserted`.
    ///
    /// Covers pure insertion (`start == end`) and pure deletion (empty `inserted`).
    pub fn apply_edit(&mut self, start: usize, end: usize, inserted: &str) -> Result<()> {
        check_range(&self.content, start, end)?;

        // Copies the text only when a snapshot still holds the old content.
        Arc::make_mut(&mut self.content).replace_range(start..end, inserted);
        self.line_index
            .apply_edit(&self.content, start, end, inserted.len());
        self.version += 1;

        let mut history = self.history.write();
        history.push(EditRecord {
            resulting_length: self.content.len(),
            span: TextSpan::new(start, end),
            inserted_length: inserted.len(),
        });
        debug_assert!(history.current_version() == self.version);
        drop(history);

        tracing::debug!(
            uri = %self.uri,
            version = self.version,
            start,
            end,
            inserted = inserted.len(),
            "document edited"
        );
        Ok(())
    }

    /// Edit records since the last wholesale replace (or the oldest retained one), oldest first.
    pub fn edit_records(&self) -> Vec<EditRecord> {
        self.history.read().records().copied().collect()
    }

    /// Oldest version change ranges can still be computed from.
    pub fn history_base_version(&self) -> Version {
        self.history.read().base_version()
    }

    /// Collapsed change range from version `from` to version `to`.
    ///
    /// `None` means unknown: a wholesale replace happened in between, or one of
    /// the versions is no longer (or not yet) covered by the log.
    pub fn change_range_between(&self, from: Version, to: Version) -> Option<TextChangeRange> {
        let range = self.history.read().change_range_between(from, to);
        tracing::trace!(uri = %self.uri, from, to, ?range, "change range query");
        range
    }

    /// Byte offset for a 0-based line and byte column.
    pub fn position_from_line_col(&self, line_col: LineCol) -> Result<usize> {
        let offset = self.line_index.line_col_to_offset(line_col)?;
        check_offset(&self.content, offset)?;
        Ok(offset)
    }

    /// 0-based line and byte column for a byte offset.
    pub fn line_col_from_position(&self, offset: usize) -> Result<LineCol> {
        check_offset(&self.content, offset)?;
        self.line_index.offset_to_line_col(offset)
    }

    /// Byte offset for an LSP (UTF-16) position.
    pub fn offset_from_lsp_position(&self, position: Position) -> Result<usize> {
        self.line_index.position_to_offset(&self.content, position)
    }

    /// LSP (UTF-16) position for a byte offset.
    pub fn lsp_position_from_offset(&self, offset: usize) -> Result<Position> {
        self.line_index.offset_to_position(&self.content, offset)
    }

    /// Immutable view of the current text and version.
    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot::new(
            self.uri.clone(),
            Arc::clone(&self.content),
            self.version,
            Arc::downgrade(&self.history),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TextSnapshot;
    use crate::error::DocumentError;

    fn doc(text: &str) -> VersionedDocument {
        VersionedDocument::new(Url::parse("file:///test.ts").unwrap(), text.to_string())
    }

    #[test]
    fn starts_at_version_one() {
        let d = doc("abc");
        assert_eq!(d.version(), 1);
        assert_eq!(d.content(), "abc");
        assert_eq!(d.byte_order_mark(), ByteOrderMark::None);
    }

    #[test]
    fn worked_example() {
        let mut d = doc("abc");
        d.apply_edit(1, 2, "XY").unwrap();
        assert_eq!(d.content(), "aXYc");
        assert_eq!(d.version(), 2);

        d.apply_edit(0, 0, "Z").unwrap();
        assert_eq!(d.content(), "ZaXYc");
        assert_eq!(d.version(), 3);

        let range = d.change_range_between(1, 3).unwrap();
        assert_eq!(range, TextChangeRange::new(TextSpan::new(0, 2), 4));
        assert_eq!(range.apply("abc", d.content()).as_deref(), Some("ZaXYc"));
    }

    #[test]
    fn pure_deletion_and_insertion() {
        let mut d = doc("hello world");
        d.apply_edit(5, 11, "").unwrap();
        assert_eq!(d.content(), "hello");
        d.apply_edit(5, 5, "!").unwrap();
        assert_eq!(d.content(), "hello!");
        assert_eq!(d.version(), 3);
    }

    #[test]
    fn identical_replace_is_noop() {
        let mut d = doc("abc");
        d.apply_edit(0, 0, "x").unwrap();
        assert!(!d.replace_all("xabc"));
        assert_eq!(d.version(), 2);
        assert_eq!(
            d.change_range_between(1, 2),
            Some(TextChangeRange::new(TextSpan::new(0, 0), 1))
        );
    }

    #[test]
    fn replace_resets_history() {
        let mut d = doc("abc");
        d.apply_edit(0, 1, "z").unwrap();
        assert!(d.replace_all("something else"));
        assert_eq!(d.version(), 3);
        assert_eq!(d.change_range_between(2, 3), None);
        assert_eq!(d.change_range_between(1, 3), None);
        assert_eq!(
            d.change_range_between(3, 3),
            Some(TextChangeRange::UNCHANGED)
        );

        d.apply_edit(0, 0, ">").unwrap();
        assert_eq!(
            d.change_range_between(3, 4),
            Some(TextChangeRange::new(TextSpan::new(0, 0), 1))
        );
    }

    #[test]
    fn rejected_edit_changes_nothing() {
        let mut d = doc("abc");
        assert_eq!(
            d.apply_edit(2, 5, "x"),
            Err(DocumentError::RangeOutOfRange {
                start: 2,
                end: 5,
                len: 3
            })
        );
        assert_eq!(d.version(), 1);
        assert_eq!(d.content(), "abc");
    }

    #[test]
    fn line_index_tracks_edits() {
        let mut d = doc("one\ntwo\nthree");
        d.apply_edit(3, 8, " ").unwrap();
        assert_eq!(d.content(), "one three");
        assert_eq!(d.line_index().line_starts(), &[0]);
        d.apply_edit(3, 4, "\n").unwrap();
        assert_eq!(d.line_col_from_position(4), Ok(LineCol::new(1, 0)));
        assert_eq!(d.position_from_line_col(LineCol::new(1, 2)), Ok(6));
    }

    #[test]
    fn mixed_line_breaks_map_lsp_positions() {
        let d = doc("a\rb\r\nc");
        assert_eq!(d.snapshot().line_start_offsets(), &[0, 2, 5]);
        assert_eq!(d.offset_from_lsp_position(Position::new(1, 0)), Ok(2));
        assert_eq!(d.offset_from_lsp_position(Position::new(2, 0)), Ok(5));
        assert_eq!(d.lsp_position_from_offset(3), Ok(Position::new(1, 1)));
    }

    #[test]
    fn edit_joining_cr_and_lf_merges_lines() {
        let mut d = doc("a\rx\nb");
        assert_eq!(d.line_index().line_count(), 3);
        d.apply_edit(2, 3, "").unwrap();
        assert_eq!(d.content(), "a\r\nb");
        assert_eq!(d.line_index().line_starts(), &[0, 3]);
        assert_eq!(d.line_col_from_position(3), Ok(LineCol::new(1, 0)));
    }

    #[test]
    fn line_col_rejects_split_characters() {
        let d = doc("é\nx");
        assert_eq!(
            d.line_col_from_position(1),
            Err(DocumentError::NotCharBoundary { offset: 1 })
        );
        assert_eq!(
            d.position_from_line_col(LineCol::new(0, 1)),
            Err(DocumentError::NotCharBoundary { offset: 1 })
        );
    }

    #[test]
    fn history_limit_forgets_old_versions() {
        let uri = Url::parse("file:///a").unwrap();
        let mut d = VersionedDocument::with_history_limit(uri, String::new(), Some(1));
        d.apply_edit(0, 0, "a").unwrap();
        d.apply_edit(1, 1, "b").unwrap();
        assert_eq!(d.change_range_between(1, 3), None);
        assert_eq!(
            d.change_range_between(2, 3),
            Some(TextChangeRange::new(TextSpan::new(1, 1), 1))
        );
    }
}
