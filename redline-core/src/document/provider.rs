// Document Model abstraction for rule application
//
// This module defines the boundary between a concrete document container
// (a word-processor automation handle, an in-memory snapshot, ...) and the
// rule engine. Everything behind this trait is format-specific; everything
// in front of it works with ParagraphSnapshots and UnitRefs.

use crate::error::UnitError;
use crate::types::{FontFormat, Formatting, ParagraphFormat, TextEdit, UnitRef};

/// Read-only view of one paragraph, as the engine sees it
#[derive(Debug, Clone, PartialEq)]
pub struct ParagraphSnapshot {
    pub index: usize,
    pub style: String,
    /// Text assembled from `runs`
    pub text: String,
    pub runs: Vec<String>,
    /// Rendered list label ("A.", "1)", "•") for list items
    pub list_string: Option<String>,
    pub format: ParagraphFormat,
    /// One entry per run, in run order
    pub fonts: Vec<FontFormat>,
}

impl ParagraphSnapshot {
    pub fn is_list(&self) -> bool {
        self.list_string.is_some()
    }

    /// "<label> <text>" for list items, as the paragraph reads on the page
    pub fn labelled_text(&self) -> Option<String> {
        self.list_string
            .as_ref()
            .filter(|label| !label.is_empty())
            .map(|label| format!("{} {}", label, self.text).trim().to_string())
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Provider contract the rule engine depends on
///
/// Implementations are exclusively borrowed for the duration of one engine
/// pass. Every mutation must be all-or-nothing for the unit it addresses:
/// on error, the unit is left exactly as it was.
pub trait DocumentModel {
    /// Human-readable name used in reports and logs
    fn name(&self) -> &str;

    /// Number of paragraphs, in document order
    fn paragraph_count(&self) -> usize;

    /// Read one paragraph: style, assembled text and run texts
    fn read_paragraph(&self, index: usize) -> Result<ParagraphSnapshot, UnitError>;

    /// Replace byte ranges of a paragraph's or run's text as last read.
    /// Returns whether the text actually changed.
    fn replace_text(&mut self, unit: UnitRef, edits: &[TextEdit]) -> Result<bool, UnitError>;

    /// Set the properties present in `formatting` on the unit.
    /// Returns how many properties changed.
    fn apply_formatting(
        &mut self,
        unit: UnitRef,
        formatting: &Formatting,
    ) -> Result<usize, UnitError>;
}

/// Check that edits are in order, non-overlapping and on char boundaries
/// of `text`. Providers call this before touching anything.
pub fn validate_edits(unit: UnitRef, text: &str, edits: &[TextEdit]) -> Result<(), UnitError> {
    let mut last_end = 0;
    for edit in edits {
        let (start, end) = (edit.range.start, edit.range.end);
        if start > end || end > text.len() {
            return Err(UnitError::new(
                unit,
                format!("edit {start}..{end} is outside the text ({} bytes)", text.len()),
            ));
        }
        if start < last_end {
            return Err(UnitError::new(
                unit,
                format!("edit {start}..{end} overlaps the previous edit"),
            ));
        }
        if !text.is_char_boundary(start) || !text.is_char_boundary(end) {
            return Err(UnitError::new(
                unit,
                format!("edit {start}..{end} splits a character"),
            ));
        }
        last_end = end;
    }
    Ok(())
}
