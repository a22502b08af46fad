//! Incremental re-analysis planning on the engine side.
//!
//! An engine keeps one [`AnalysisCursor`] per file. At the start of every pass it
//! takes a fresh snapshot, asks the cursor what needs redoing, and commits the
//! snapshot once the pass is done.

use crate::document::{TextChangeRange, TextSnapshot, Version};

/// What the next analysis pass has to cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reanalysis {
    /// The snapshot is the version last analysed.
    UpToDate,
    /// Only the given range changed since the last pass.
    Incremental(TextChangeRange),
    /// No usable history; analyse the whole text.
    Full,
}

/// Remembers the last analysed version of one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisCursor {
    analysed: Option<Version>,
}

impl AnalysisCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Version of the last committed pass.
    pub fn analysed_version(&self) -> Option<Version> {
        self.analysed
    }

    /// Decide how much of `snapshot` needs to be re-analysed.
    pub fn plan(&self, snapshot: &impl TextSnapshot) -> Reanalysis {
        let Some(analysed) = self.analysed else {
            return Reanalysis::Full;
        };
        if analysed == snapshot.version() {
            return Reanalysis::UpToDate;
        }
        match snapshot.change_range_since(analysed) {
            Some(range) if range.is_unchanged() => Reanalysis::UpToDate,
            Some(range) => Reanalysis::Incremental(range),
            None => Reanalysis::Full,
        }
    }

    /// Record that `snapshot` has been fully analysed.
    pub fn commit(&mut self, snapshot: &impl TextSnapshot) {
        self.analysed = Some(snapshot.version());
    }

    /// Forget the last pass, forcing the next one to be full.
    pub fn invalidate(&mut self) {
        self.analysed = None;
    }
}
