//! Versioned documents and their snapshots.
//!
//! This module provides:
//! - `LineIndex` for byte offset <-> line/column and LSP position conversion
//! - `TextChangeRange` and the rule for collapsing sequential edits
//! - `VersionedDocument`, the mutable text of one file with its edit log
//! - `DocumentSnapshot`, an immutable view handed to analysis code

mod change;
mod history;
mod snapshot;
mod text;
mod versioned;

pub use change::{TextChangeRange, TextSpan};
pub use history::{EditRecord, Version};
pub use snapshot::{DocumentSnapshot, TextSnapshot};
pub use text::{LineCol, LineIndex};
pub use versioned::{ByteOrderMark, VersionedDocument};
