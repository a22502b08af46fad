//! Text spans and change ranges.
//!
//! A [`TextChangeRange`] says "the bytes `span` of the old text were replaced by
//! `new_length` bytes". Sequential ranges compose into one range that covers the
//! net effect of the whole chain.

use serde::{Deserialize, Serialize};

/// Half-open byte span `start..end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
}

impl TextSpan {
    /// Build a span from its bounds. `start` must not exceed `end`.
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "inverted span {start}..{end}");
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

impl From<std::ops::Range<usize>> for TextSpan {
    fn from(range: std::ops::Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

/// A replaced span of old text together with the length of the text that replaced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextChangeRange {
    pub span: TextSpan,
    pub new_length: usize,
}

impl Default for TextChangeRange {
    fn default() -> Self {
        Self::UNCHANGED
    }
}

impl TextChangeRange {
    /// The canonical "nothing changed" marker.
    pub const UNCHANGED: TextChangeRange = TextChangeRange {
        span: TextSpan { start: 0, end: 0 },
        new_length: 0,
    };

    pub fn new(span: TextSpan, new_length: usize) -> Self {
        Self { span, new_length }
    }

    /// The span the replacement occupies in the new text.
    pub fn new_span(&self) -> TextSpan {
        TextSpan::new(self.span.start, self.span.start + self.new_length)
    }

    pub fn is_unchanged(&self) -> bool {
        self.span.is_empty() && self.new_length == 0
    }

    /// Signed change in total text length.
    pub fn length_delta(&self) -> isize {
        self.new_length as isize - self.span.len() as isize
    }

    /// Merge `self` followed by `next` into a single range over the text before `self`.
    ///
    /// `next` is expressed in coordinates of the text produced by `self`.
    pub fn compose(self, next: TextChangeRange) -> TextChangeRange {
        let old_start1 = self.span.start;
        let old_end1 = self.span.end;
        let new_end1 = old_start1 + self.new_length;

        let old_start2 = next.span.start;
        let old_end2 = next.span.end;
        let new_end2 = old_start2 + next.new_length;

        // Whatever `next` touches past the end of our replacement maps back into old
        // text one-to-one, and vice versa for our replacement past `next`.
        let start = old_start1.min(old_start2);
        let old_end = old_end1 + old_end2.saturating_sub(new_end1);
        let new_end = new_end2 + new_end1.saturating_sub(old_end2);

        TextChangeRange::new(TextSpan::new(start, old_end), new_end - start)
    }

    /// Collapse a chain of sequential ranges, oldest first. An empty chain is
    /// [`TextChangeRange::UNCHANGED`].
    pub fn collapse<I>(changes: I) -> TextChangeRange
    where
        I: IntoIterator<Item = TextChangeRange>,
    {
        let mut changes = changes.into_iter();
        match changes.next() {
            Some(first) => changes.fold(first, TextChangeRange::compose),
            None => TextChangeRange::UNCHANGED,
        }
    }

    /// Rebuild `new_text` from `old_text` using only the bytes this range marks as new.
    ///
    /// Returns `None` if the range does not fit either text.
    pub fn apply(&self, old_text: &str, new_text: &str) -> Option<String> {
        let new_span = self.new_span();
        let prefix = old_text.get(..self.span.start)?;
        let middle = new_text.get(new_span.start..new_span.end)?;
        let suffix = old_text.get(self.span.end..)?;
        Some(format!("{prefix}{middle}{suffix}"))
    }
}
