//! Immutable point-in-time views of a document.

use std::sync::{Arc, OnceLock, Weak};

use parking_lot::RwLock;
use tower_lsp::lsp_types::Url;

use crate::error::{check_range, Result};

use super::change::TextChangeRange;
use super::history::{EditLog, Version};
use super::text::LineIndex;

/// What an analysis engine needs from a file's text.
pub trait TextSnapshot {
    /// Version the text was captured at.
    fn version(&self) -> Version;

    /// Slice `start..end` of the captured text. Never clamps.
    fn text(&self, start: usize, end: usize) -> Result<&str>;

    /// Length of the captured text in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Byte offsets at which each line of the captured text starts.
    fn line_start_offsets(&self) -> &[usize];

    /// Change range from `version` to this snapshot's version, or `None` when it
    /// cannot be determined and the whole text must be treated as changed.
    fn change_range_since(&self, version: Version) -> Option<TextChangeRange>;
}

/// Captured text and version of a [`VersionedDocument`](super::VersionedDocument).
///
/// Later mutation of the document never shows through. The snapshot only keeps a
/// weak handle on the document's edit log, used for change range queries.
#[derive(Debug)]
pub struct DocumentSnapshot {
    uri: Url,
    text: Arc<String>,
    version: Version,
    line_index: OnceLock<LineIndex>,
    history: Weak<RwLock<EditLog>>,
}

impl DocumentSnapshot {
    pub(crate) fn new(
        uri: Url,
        text: Arc<String>,
        version: Version,
        history: Weak<RwLock<EditLog>>,
    ) -> Self {
        Self {
            uri,
            text,
            version,
            line_index: OnceLock::new(),
            history,
        }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// The whole captured text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Line index of the captured text, built on first use.
    pub fn line_index(&self) -> &LineIndex {
        self.line_index.get_or_init(|| LineIndex::new(&self.text))
    }

    /// Whether the document this snapshot came from is still alive.
    pub fn is_attached(&self) -> bool {
        self.history.strong_count() > 0
    }
}

impl TextSnapshot for DocumentSnapshot {
    fn version(&self) -> Version {
        self.version
    }

    fn text(&self, start: usize, end: usize) -> Result<&str> {
        check_range(&self.text, start, end)?;
        Ok(&self.text[start..end])
    }

    fn len(&self) -> usize {
        self.text.len()
    }

    fn line_start_offsets(&self) -> &[usize] {
        self.line_index().line_starts()
    }

    fn change_range_since(&self, version: Version) -> Option<TextChangeRange> {
        if version == self.version {
            return Some(TextChangeRange::UNCHANGED);
        }
        let Some(history) = self.history.upgrade() else {
            tracing::trace!(uri = %self.uri, "change range requested from a closed document");
            return None;
        };
        let range = history.read().change_range_between(version, self.version);
        range
    }
}
