//! Versioned documents for a background analysis worker.
//!
//! The library half tracks the text of open files across edits, hands out
//! immutable snapshots and reports the change range between any two versions.
//! The [`Backend`] is the host bridge: a language server that feeds editor
//! notifications into the [`ProjectManager`] and answers change range queries.

use serde::{Deserialize, Serialize};
use tower_lsp::jsonrpc::{Error, Result};
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService};

pub mod analysis;
pub mod document;
pub mod error;
pub mod project;
pub mod settings;

pub use analysis::{AnalysisCursor, Reanalysis};
pub use document::{
    ByteOrderMark, DocumentSnapshot, EditRecord, LineCol, LineIndex, TextChangeRange,
    TextSnapshot, TextSpan, Version, VersionedDocument,
};
pub use error::DocumentError;
pub use project::{FileOperation, ProjectManager};
pub use settings::{discover_settings, load_settings, DocumentSettings, Settings};

/// Custom request: change range of a document since a version.
pub const CHANGE_RANGE_METHOD: &str = "scriptsync/changeRange";
/// Custom request: apply a raw [`FileOperation`].
pub const FILE_OPERATION_METHOD: &str = "scriptsync/fileOperation";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRangeParams {
    pub uri: Url,
    pub since_version: Version,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRangeResponse {
    /// Current version of the document.
    pub version: Version,
    /// `null` when the range is unknown and the document must be treated as fully changed.
    pub range: Option<TextChangeRange>,
}

pub struct Backend {
    client: Client,
    documents: ProjectManager,
}

impl Backend {
    pub(crate) fn new(client: Client) -> Self {
        Self {
            client,
            documents: ProjectManager::new(),
        }
    }

    async fn change_range(&self, params: ChangeRangeParams) -> Result<ChangeRangeResponse> {
        let snapshot = self.documents.snapshot(&params.uri).map_err(rpc_error)?;
        Ok(ChangeRangeResponse {
            version: snapshot.version(),
            range: snapshot.change_range_since(params.since_version),
        })
    }

    async fn file_operation(&self, params: FileOperation) -> Result<Option<Version>> {
        self.documents.dispatch(params).map_err(rpc_error)
    }

    /// Report a rejected notification; notifications have no response to carry it.
    async fn report(&self, uri: &Url, err: DocumentError) {
        tracing::warn!(uri = %uri, error = %err, "document notification rejected");
        self.client
            .log_message(MessageType::WARNING, format!("{uri}: {err}"))
            .await;
    }
}

fn rpc_error(err: DocumentError) -> Error {
    Error::invalid_params(err.to_string())
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        // Extract workspace root from params
        let workspace_root = params
            .workspace_folders
            .as_ref()
            .and_then(|folders| folders.first())
            .and_then(|f| f.uri.to_file_path().ok())
            .or_else(|| {
                #[allow(deprecated)]
                params.root_uri.as_ref()?.to_file_path().ok()
            });

        if let Some(root) = workspace_root {
            let (settings, settings_dir) = settings::discover_settings(&root);
            tracing::info!(
                root = %root.display(),
                settings_dir = %settings_dir.display(),
                "workspace initialized"
            );
            self.documents.configure(settings.document_settings());
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::INCREMENTAL),
                        ..Default::default()
                    },
                )),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "scriptsync initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        self.documents.open(
            params.text_document.uri,
            params.text_document.text,
            ByteOrderMark::None,
        );
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        match self.documents.apply_lsp_changes(&uri, params.content_changes) {
            Ok(version) => {
                tracing::trace!(
                    uri = %uri,
                    version,
                    client_version = params.text_document.version,
                    "changes applied"
                );
            }
            Err(err) => self.report(&uri, err).await,
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        if let Err(err) = self.documents.close(&uri) {
            self.report(&uri, err).await;
        }
    }
}

pub fn create_service() -> (LspService<Backend>, tower_lsp::ClientSocket) {
    LspService::build(Backend::new)
        .custom_method(CHANGE_RANGE_METHOD, Backend::change_range)
        .custom_method(FILE_OPERATION_METHOD, Backend::file_operation)
        .finish()
}
