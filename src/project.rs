//! Ownership of open documents.
//!
//! The [`ProjectManager`] is the only place documents are created, mutated and
//! released. Each document sits behind its own `DashMap` entry, so mutations of
//! one file are serialized while different files proceed independently.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::{Position, Range, TextDocumentContentChangeEvent, Url};

use crate::document::{
    ByteOrderMark, DocumentSnapshot, LineCol, TextSpan, Version, VersionedDocument,
};
use crate::error::{DocumentError, Result};
use crate::settings::DocumentSettings;

/// A file lifecycle message from the host bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "camelCase")]
pub enum FileOperation {
    #[serde(rename_all = "camelCase")]
    Open {
        file_id: Url,
        text: String,
        #[serde(default)]
        byte_order_mark: ByteOrderMark,
    },
    #[serde(rename_all = "camelCase")]
    Edit {
        file_id: Url,
        start: usize,
        end: usize,
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    SetContent { file_id: Url, text: String },
    #[serde(rename_all = "camelCase")]
    Close { file_id: Url },
}

/// Thread-safe owner of all open documents.
#[derive(Debug, Default)]
pub struct ProjectManager {
    documents: DashMap<Url, VersionedDocument>,
    settings: RwLock<DocumentSettings>,
}

impl ProjectManager {
    /// Create a new empty project manager.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: DocumentSettings) -> Self {
        Self {
            documents: DashMap::new(),
            settings: RwLock::new(settings),
        }
    }

    /// Replace the settings used for documents opened from now on.
    pub fn configure(&self, settings: DocumentSettings) {
        tracing::debug!(?settings, "document settings updated");
        *self.settings.write() = settings;
    }

    /// Open a document, returning its version.
    ///
    /// A new document starts at version 1. Reopening a known document replaces
    /// its content instead, keeping its version sequence intact.
    pub fn open(&self, uri: Url, text: String, byte_order_mark: ByteOrderMark) -> Version {
        match self.documents.entry(uri) {
            Entry::Occupied(mut entry) => {
                let doc = entry.get_mut();
                doc.replace_all(&text);
                doc.set_byte_order_mark(byte_order_mark);
                tracing::debug!(uri = %doc.uri(), version = doc.version(), "document reopened");
                doc.version()
            }
            Entry::Vacant(entry) => {
                let max_history = self.settings.read().max_edit_history;
                let mut doc =
                    VersionedDocument::with_history_limit(entry.key().clone(), text, max_history);
                doc.set_byte_order_mark(byte_order_mark);
                tracing::debug!(uri = %doc.uri(), len = doc.len(), "document opened");
                entry.insert(doc);
                1
            }
        }
    }

    /// Apply a localized edit, returning the new version.
    pub fn edit(&self, uri: &Url, start: usize, end: usize, text: &str) -> Result<Version> {
        self.with_document_mut(uri, |doc| -> Result<Version> {
            doc.apply_edit(start, end, text)?;
            Ok(doc.version())
        })?
    }

    /// Replace the whole content, returning the (possibly unchanged) version.
    pub fn set_content(&self, uri: &Url, text: &str) -> Result<Version> {
        self.with_document_mut(uri, |doc| {
            doc.replace_all(text);
            doc.version()
        })
    }

    /// Apply LSP content changes in order.
    ///
    /// Ranged changes become edits, with positions resolved against the content
    /// left by the previous change; a change without a range replaces everything.
    /// The batch is applied under one lock. If a change is rejected, the changes
    /// before it stay applied.
    pub fn apply_lsp_changes(
        &self,
        uri: &Url,
        changes: Vec<TextDocumentContentChangeEvent>,
    ) -> Result<Version> {
        self.with_document_mut(uri, |doc| -> Result<Version> {
            for change in changes {
                match change.range {
                    Some(range) => {
                        let start = doc.offset_from_lsp_position(range.start)?;
                        let end = doc.offset_from_lsp_position(range.end)?;
                        doc.apply_edit(start, end, &change.text)?;
                    }
                    None => {
                        doc.replace_all(&change.text);
                    }
                }
            }
            Ok(doc.version())
        })?
    }

    /// Release a document. Existing snapshots stay readable but lose their change history.
    pub fn close(&self, uri: &Url) -> Result<()> {
        match self.documents.remove(uri) {
            Some(_) => {
                tracing::debug!(uri = %uri, "document closed");
                Ok(())
            }
            None => Err(DocumentError::UnknownFile(uri.clone())),
        }
    }

    /// Translate a bridge message into the matching call.
    ///
    /// Returns the document version after the operation, or `None` for `close`.
    pub fn dispatch(&self, operation: FileOperation) -> Result<Option<Version>> {
        match operation {
            FileOperation::Open {
                file_id,
                text,
                byte_order_mark,
            } => Ok(Some(self.open(file_id, text, byte_order_mark))),
            FileOperation::Edit {
                file_id,
                start,
                end,
                text,
            } => self.edit(&file_id, start, end, &text).map(Some),
            FileOperation::SetContent { file_id, text } => {
                self.set_content(&file_id, &text).map(Some)
            }
            FileOperation::Close { file_id } => self.close(&file_id).map(|()| None),
        }
    }

    /// Snapshot of the document's current state.
    pub fn snapshot(&self, uri: &Url) -> Result<DocumentSnapshot> {
        self.with_document(uri, VersionedDocument::snapshot)
    }

    pub fn version(&self, uri: &Url) -> Result<Version> {
        self.with_document(uri, VersionedDocument::version)
    }

    /// Line and byte column for a byte offset.
    pub fn line_col(&self, uri: &Url, offset: usize) -> Result<LineCol> {
        self.with_document(uri, |doc| doc.line_col_from_position(offset))?
    }

    /// Byte offset for a line and byte column.
    pub fn position(&self, uri: &Url, line_col: LineCol) -> Result<usize> {
        self.with_document(uri, |doc| doc.position_from_line_col(line_col))?
    }

    /// Byte offset for an LSP position.
    pub fn offset_from_lsp_position(&self, uri: &Url, position: Position) -> Result<usize> {
        self.with_document(uri, |doc| doc.offset_from_lsp_position(position))?
    }

    /// LSP range for a byte span of the current content, for reporting results to the host.
    pub fn lsp_range(&self, uri: &Url, span: TextSpan) -> Result<Range> {
        self.with_document(uri, |doc| doc.line_index().span_to_range(doc.content(), span))?
    }

    pub fn is_open(&self, uri: &Url) -> bool {
        self.documents.contains_key(uri)
    }

    /// URIs of all open documents, sorted.
    pub fn open_files(&self) -> Vec<Url> {
        let mut uris: Vec<Url> = self.documents.iter().map(|e| e.key().clone()).collect();
        uris.sort();
        uris
    }

    fn with_document<R>(&self, uri: &Url, f: impl FnOnce(&VersionedDocument) -> R) -> Result<R> {
        self.documents
            .get(uri)
            .map(|doc| f(&doc))
            .ok_or_else(|| DocumentError::UnknownFile(uri.clone()))
    }

    fn with_document_mut<R>(
        &self,
        uri: &Url,
        f: impl FnOnce(&mut VersionedDocument) -> R,
    ) -> Result<R> {
        self.documents
            .get_mut(uri)
            .map(|mut doc| f(&mut doc))
            .ok_or_else(|| DocumentError::UnknownFile(uri.clone()))
    }
}
