//! Span-based text edits
//!
//! Passes over a syntax tree never mutate source text directly. They plan
//! an immutable list of edits while reading, and the whole list is applied
//! afterwards in one pass. Applying from the highest offset down keeps
//! earlier spans valid; overlapping edits are rejected instead of silently
//! corrupting the file.

use anyhow::{bail, Result};

/// Byte range into the source text, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Insert { offset: usize, text: String },
    Delete { span: Span },
    Replace { span: Span, text: String },
}

impl Edit {
    fn start(&self) -> usize {
        match self {
            Edit::Insert { offset, .. } => *offset,
            Edit::Delete { span } | Edit::Replace { span, .. } => span.start,
        }
    }

    fn end(&self) -> usize {
        match self {
            Edit::Insert { offset, .. } => *offset,
            Edit::Delete { span } | Edit::Replace { span, .. } => span.end,
        }
    }

    fn is_insert(&self) -> bool {
        matches!(self, Edit::Insert { .. })
    }
}

/// Apply a planned edit list to the source, returning the rewritten text.
///
/// Edits are sorted by position and applied back to front. At the same
/// anchor, insertions are applied before deletions so an insert next to a
/// deleted span survives. Overlapping delete/replace spans are an error.
pub fn apply_edits(source: &str, mut edits: Vec<Edit>) -> Result<String> {
    // Stable order: by start, inserts first at equal anchors
    edits.sort_by(|a, b| {
        a.start()
            .cmp(&b.start())
            .then_with(|| b.is_insert().cmp(&a.is_insert()))
    });

    let mut last_end = 0usize;
    for edit in &edits {
        if edit.end() > source.len() {
            bail!("edit out of bounds: {}..{}", edit.start(), edit.end());
        }
        if !edit.is_insert() && edit.start() < last_end {
            bail!(
                "overlapping edits at byte {} (previous edit ends at {})",
                edit.start(),
                last_end
            );
        }
        last_end = last_end.max(edit.end());
    }

    let mut out = source.to_string();
    for edit in edits.iter().rev() {
        match edit {
            Edit::Insert { offset, text } => out.insert_str(*offset, text),
            Edit::Delete { span } => out.replace_range(span.start..span.end, ""),
            Edit::Replace { span, text } => out.replace_range(span.start..span.end, text),
        }
    }
    Ok(out)
}
