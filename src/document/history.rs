//! Per-document edit log.
//!
//! Records are addressed by version through an explicit base: the record at
//! position `i` describes the transition `base_version + i -> base_version + i + 1`.

use std::collections::VecDeque;

use super::change::{TextChangeRange, TextSpan};

/// Document version stamp. The first version of every document is `1`.
pub type Version = u32;

/// One localized edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditRecord {
    /// Total text length after the edit.
    pub resulting_length: usize,
    /// Span of the previous text that was replaced.
    pub span: TextSpan,
    /// Length of the inserted text.
    pub inserted_length: usize,
}

impl EditRecord {
    pub fn change_range(&self) -> TextChangeRange {
        TextChangeRange::new(self.span, self.inserted_length)
    }
}

#[derive(Debug, Clone)]
pub struct EditLog {
    /// Version at the last wholesale reset (or the oldest version still covered).
    base_version: Version,
    /// Text length at `base_version`.
    base_length: usize,
    records: VecDeque<EditRecord>,
    /// Upper bound on retained records; `None` keeps everything.
    max_records: Option<usize>,
}

impl EditLog {
    pub fn new(version: Version, length: usize, max_records: Option<usize>) -> Self {
        Self {
            base_version: version,
            base_length: length,
            records: VecDeque::new(),
            max_records,
        }
    }

    pub fn base_version(&self) -> Version {
        self.base_version
    }

    /// Version reached after the last record.
    pub fn current_version(&self) -> Version {
        self.base_version + self.records.len() as Version
    }

    pub fn records(&self) -> impl Iterator<Item = &EditRecord> {
        self.records.iter()
    }

    /// Append the record producing `current_version() + 1`.
    pub fn push(&mut self, record: EditRecord) {
        self.records.push_back(record);

        if let Some(max) = self.max_records {
            while self.records.len() > max {
                let Some(dropped) = self.records.pop_front() else {
                    break;
                };
                self.base_version += 1;
                self.base_length = dropped.resulting_length;
            }
        }
    }

    /// Forget all records and restart history at `version`.
    pub fn reset(&mut self, version: Version, length: usize) {
        self.records.clear();
        self.base_version = version;
        self.base_length = length;
    }

    /// Text length at `version`, if the log still covers it.
    pub fn length_at(&self, version: Version) -> Option<usize> {
        let index = self.index_of(version)?;
        match index {
            0 => Some(self.base_length),
            i => self.records.get(i - 1).map(|r| r.resulting_length),
        }
    }

    /// Position of `version` relative to the base, if covered.
    fn index_of(&self, version: Version) -> Option<usize> {
        if version < self.base_version || version > self.current_version() {
            return None;
        }
        Some((version - self.base_version) as usize)
    }

    /// Collapsed change range from `from` to `to`.
    ///
    /// `None` means the log cannot describe the transition and the caller has to
    /// assume everything changed.
    pub fn change_range_between(&self, from: Version, to: Version) -> Option<TextChangeRange> {
        if from == to {
            return Some(TextChangeRange::UNCHANGED);
        }
        if from > to {
            return None;
        }
        let start = self.index_of(from)?;
        let end = self.index_of(to)?;

        let collapsed =
            TextChangeRange::collapse(self.records.range(start..end).map(EditRecord::change_range));

        // The collapsed range must explain the recorded lengths on both ends.
        let old_length = self.length_at(from)?;
        let new_length = self.length_at(to)?;
        if collapsed.span.end > old_length
            || old_length - collapsed.span.len() + collapsed.new_length != new_length
        {
            tracing::warn!(
                from,
                to,
                ?collapsed,
                old_length,
                new_length,
                "collapsed change range disagrees with edit log"
            );
            return None;
        }

        Some(collapsed)
    }
}
