//! Settings infrastructure for scriptsync.
//!
//! Settings come from a `settings.toml` found near the workspace root:
//!
//! ```toml
//! [documents]
//! max_edit_history = 512
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// File name looked up during discovery.
pub const SETTINGS_FILE: &str = "settings.toml";

/// Root settings structure loaded from settings.toml.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Document history configuration.
    pub documents: Option<DocumentSettings>,
}

impl Settings {
    /// Document settings, or the defaults if the section is missing.
    pub fn document_settings(&self) -> DocumentSettings {
        self.documents.clone().unwrap_or_default()
    }
}

/// Settings applied to every document the project manager opens.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct DocumentSettings {
    /// Maximum number of edit records kept per document. Change ranges reaching
    /// back past the oldest kept record are reported as unknown.
    /// Unbounded when absent.
    pub max_edit_history: Option<usize>,
}

/// Load settings from a file, falling back to defaults if it is missing or malformed.
pub fn load_settings(path: &Path) -> Settings {
    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %path.display(), "failed to parse settings: {}", e);
                Settings::default()
            }
        },
        Err(_) => Settings::default(),
    }
}

/// Find settings for a workspace.
///
/// Walks up from `start_dir` first, then checks its immediate child directories.
/// Returns the settings together with the directory they were found in.
pub fn discover_settings(start_dir: &Path) -> (Settings, PathBuf) {
    // Phase 1: Walk up from start_dir
    let mut current = Some(start_dir);
    while let Some(dir) = current {
        let candidate = dir.join(SETTINGS_FILE);
        if candidate.is_file() {
            tracing::info!(path = %candidate.display(), "loading settings");
            return (load_settings(&candidate), dir.to_path_buf());
        }
        current = dir.parent();
    }

    // Phase 2: Check immediate child directories
    if let Ok(entries) = std::fs::read_dir(start_dir) {
        for entry in entries.flatten() {
            if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
                let candidate = entry.path().join(SETTINGS_FILE);
                if candidate.is_file() {
                    tracing::info!(path = %candidate.display(), "loading settings");
                    return (load_settings(&candidate), entry.path());
                }
            }
        }
    }

    (Settings::default(), start_dir.to_path_buf())
}
