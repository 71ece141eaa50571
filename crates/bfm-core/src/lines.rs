//! Output line bookkeeping
//!
//! Every statement owns as many output lines as the source lines it spans
//! (continuation joins, block bodies and multi-line argument lists included).
//! [`line_slots`] is the single answer to that question; the expander pads
//! with it and empty-line collapsing relies on the padded layout.

use crate::ast::Statement;

/// Output lines a statement occupies
pub fn line_slots(stmt: &Statement) -> usize {
    stmt.span().line_count()
}

/// Old → new line numbers (1-based) after collapsing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineRemap {
    mapping: Vec<Option<usize>>,
}

impl LineRemap {
    /// New line for an old line, `None` if the line was removed
    pub fn map(&self, old_line: usize) -> Option<usize> {
        self.mapping
            .get(old_line.checked_sub(1)?)
            .copied()
            .flatten()
    }

    /// New line for the nearest kept line at or before `old_line`
    pub fn map_at_or_before(&self, old_line: usize) -> Option<usize> {
        let last = old_line.min(self.mapping.len());
        (1..=last).rev().find_map(|line| self.map(line))
    }

    pub fn kept_lines(&self) -> usize {
        self.mapping.iter().flatten().count()
    }
}

/// Remove lines that contain only whitespace
pub fn collapse_empty_lines(text: &str) -> (String, LineRemap) {
    let mut kept: Vec<&str> = Vec::new();
    let mut mapping = Vec::new();

    for line in text.split('\n') {
        if line.trim().is_empty() {
            mapping.push(None);
        } else {
            kept.push(line);
            mapping.push(Some(kept.len()));
        }
    }

    (kept.join("\n"), LineRemap { mapping })
}
