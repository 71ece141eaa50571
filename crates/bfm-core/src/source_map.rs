//! Source map between expanded output and macro source
//!
//! Every unit of appended output is recorded with the source range it is
//! attributed to. Inside an active invocation that range is the call site of
//! the innermost invocation; the full call stack is kept per entry so an
//! editor can step into the macro chain.
//!
//! Positions are 1-based `{line, column}` with columns in characters.
//! Ranges are half-open.
//!
//! Two indexes are built (expanded → source, source → expanded), each keyed
//! by exact start position with a per-line fallback for containment queries.
//! When several entries cover a position the deepest expansion wins.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::ast::Span;
use crate::lines::LineRemap;

pub const SOURCE_MAP_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos < self.end
    }

    fn lines(&self) -> std::ops::RangeInclusive<usize> {
        self.start.line..=self.end.line
    }
}

impl From<Span> for Range {
    fn from(span: Span) -> Self {
        Self {
            start: Position::new(span.line, span.column),
            end: Position::new(span.end_line, span.end_column),
        }
    }
}

/// One frame of the invocation chain at the time output was produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStackEntry {
    pub macro_name: String,
    pub call_site: Range,
    pub parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMapEntry {
    pub expanded_range: Range,
    pub source_range: Range,
    pub expansion_depth: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macro_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macro_call_site: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_values: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub macro_call_stack: Vec<CallStackEntry>,
}

// =============================================================================
// BUILDER
// =============================================================================

#[derive(Debug, Default)]
pub struct SourceMapBuilder {
    entries: Vec<SourceMapEntry>,
}

impl SourceMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: SourceMapEntry) {
        self.entries.push(entry);
    }

    pub fn build(self) -> SourceMap {
        SourceMap::from_entries(self.entries)
    }
}

// =============================================================================
// SOURCE MAP
// =============================================================================

#[derive(Debug, Clone, Default)]
struct LookupIndex {
    exact: HashMap<Position, Vec<usize>>,
    by_line: HashMap<usize, Vec<usize>>,
}

impl LookupIndex {
    fn build(entries: &[SourceMapEntry], range_of: fn(&SourceMapEntry) -> &Range) -> Self {
        let mut index = Self::default();
        for (i, entry) in entries.iter().enumerate() {
            let range = range_of(entry);
            index.exact.entry(range.start).or_default().push(i);
            for line in range.lines() {
                index.by_line.entry(line).or_default().push(i);
            }
        }
        index
    }

    /// Entry indexes covering `pos`, in insertion order
    fn covering(
        &self,
        entries: &[SourceMapEntry],
        range_of: fn(&SourceMapEntry) -> &Range,
        pos: Position,
    ) -> Vec<usize> {
        let mut hits: Vec<usize> = self.exact.get(&pos).cloned().unwrap_or_default();
        if let Some(candidates) = self.by_line.get(&pos.line) {
            hits.extend(
                candidates
                    .iter()
                    .copied()
                    .filter(|&i| range_of(&entries[i]).contains(pos)),
            );
        }
        hits.sort_unstable();
        hits.dedup();
        hits
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "SourceMapData", into = "SourceMapData")]
pub struct SourceMap {
    pub version: u32,
    entries: Vec<SourceMapEntry>,
    expanded_index: LookupIndex,
    source_index: LookupIndex,
}

#[derive(Serialize, Deserialize)]
struct SourceMapData {
    version: u32,
    entries: Vec<SourceMapEntry>,
}

impl From<SourceMapData> for SourceMap {
    fn from(data: SourceMapData) -> Self {
        let mut map = SourceMap::from_entries(data.entries);
        map.version = data.version;
        map
    }
}

impl From<SourceMap> for SourceMapData {
    fn from(map: SourceMap) -> Self {
        SourceMapData {
            version: map.version,
            entries: map.entries,
        }
    }
}

fn expanded_range(entry: &SourceMapEntry) -> &Range {
    &entry.expanded_range
}

fn source_range(entry: &SourceMapEntry) -> &Range {
    &entry.source_range
}

impl SourceMap {
    /// Build both lookup indexes from entries
    pub fn from_entries(entries: Vec<SourceMapEntry>) -> Self {
        let expanded_index = LookupIndex::build(&entries, expanded_range);
        let source_index = LookupIndex::build(&entries, source_range);
        Self {
            version: SOURCE_MAP_VERSION,
            entries,
            expanded_index,
            source_index,
        }
    }

    pub fn entries(&self) -> &[SourceMapEntry] {
        &self.entries
    }

    /// Where did the output at this expanded position come from?
    pub fn expanded_to_source(&self, line: usize, column: usize) -> Option<&SourceMapEntry> {
        self.deepest(
            self.expanded_index
                .covering(&self.entries, expanded_range, Position::new(line, column)),
        )
    }

    /// Deepest output produced from this source position
    pub fn source_to_expanded(&self, line: usize, column: usize) -> Option<&SourceMapEntry> {
        self.deepest(
            self.source_index
                .covering(&self.entries, source_range, Position::new(line, column)),
        )
    }

    /// All output produced from this source position, deepest first
    pub fn entries_at_source(&self, line: usize, column: usize) -> Vec<&SourceMapEntry> {
        let mut hits: Vec<&SourceMapEntry> = self
            .source_index
            .covering(&self.entries, source_range, Position::new(line, column))
            .into_iter()
            .map(|i| &self.entries[i])
            .collect();
        hits.sort_by(|a, b| b.expansion_depth.cmp(&a.expansion_depth));
        hits
    }

    /// Rewrite expanded line numbers after line collapsing. Entries that
    /// start on a removed line are dropped.
    pub fn remap_expanded_lines(self, remap: &LineRemap) -> SourceMap {
        let entries = self
            .entries
            .into_iter()
            .filter_map(|mut entry| {
                let start = remap.map(entry.expanded_range.start.line)?;
                let end = remap.map_at_or_before(entry.expanded_range.end.line)?;
                entry.expanded_range.start.line = start;
                entry.expanded_range.end.line = end.max(start);
                Some(entry)
            })
            .collect();
        SourceMap::from_entries(entries)
    }

    /// First entry wins among equal depths
    fn deepest(&self, hits: Vec<usize>) -> Option<&SourceMapEntry> {
        let mut best: Option<&SourceMapEntry> = None;
        for i in hits {
            let entry = &self.entries[i];
            if best.map_or(true, |b| entry.expansion_depth > b.expansion_depth) {
                best = Some(entry);
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lines::collapse_empty_lines;

    fn range(l1: usize, c1: usize, l2: usize, c2: usize) -> Range {
        Range {
            start: Position::new(l1, c1),
            end: Position::new(l2, c2),
        }
    }

    fn entry(expanded: Range, source: Range, depth: usize) -> SourceMapEntry {
        SourceMapEntry {
            expanded_range: expanded,
            source_range: source,
            expansion_depth: depth,
            macro_name: None,
            macro_call_site: None,
            parameter_values: None,
            macro_call_stack: Vec::new(),
        }
    }

    #[test]
    fn test_lookup_by_containment() {
        let mut builder = SourceMapBuilder::new();
        builder.add(entry(range(1, 1, 1, 4), range(2, 1, 2, 6), 0));
        builder.add(entry(range(1, 4, 1, 8), range(3, 1, 3, 3), 0));
        let map = builder.build();

        assert_eq!(map.expanded_to_source(1, 2).unwrap().source_range.start.line, 2);
        assert_eq!(map.expanded_to_source(1, 4).unwrap().source_range.start.line, 3);
        assert!(map.expanded_to_source(1, 8).is_none());
        assert!(map.expanded_to_source(2, 1).is_none());
        assert_eq!(map.source_to_expanded(3, 2).unwrap().expanded_range.start.column, 4);
    }

    #[test]
    fn test_deepest_entry_wins() {
        let mut builder = SourceMapBuilder::new();
        builder.add(entry(range(1, 1, 1, 10), range(1, 1, 1, 5), 1));
        builder.add(entry(range(1, 3, 1, 5), range(1, 1, 1, 5), 3));
        builder.add(entry(range(1, 3, 1, 5), range(1, 1, 1, 5), 2));
        let map = builder.build();

        assert_eq!(map.expanded_to_source(1, 4).unwrap().expansion_depth, 3);
        assert_eq!(map.expanded_to_source(1, 1).unwrap().expansion_depth, 1);
        let depths: Vec<_> = map
            .entries_at_source(1, 2)
            .iter()
            .map(|e| e.expansion_depth)
            .collect();
        assert_eq!(depths, vec![3, 2, 1]);
    }

    #[test]
    fn test_multiline_entry_found_by_line_fallback() {
        let map = SourceMap::from_entries(vec![entry(range(1, 5, 3, 2), range(1, 1, 1, 3), 0)]);
        assert!(map.expanded_to_source(2, 40).is_some());
        assert!(map.expanded_to_source(3, 2).is_none());
    }

    #[test]
    fn test_json_round_trip_rebuilds_indexes() {
        let map = SourceMap::from_entries(vec![entry(range(2, 1, 2, 3), range(5, 1, 5, 4), 1)]);
        let json = serde_json::to_string(&map).unwrap();
        assert!(json.contains("\"version\":1"));
        let back: SourceMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back.entries(), map.entries());
        assert!(back.expanded_to_source(2, 2).is_some());
    }

    #[test]
    fn test_remap_after_collapse() {
        let (_, remap) = collapse_empty_lines("\n+\n\n-");
        let map = SourceMap::from_entries(vec![
            entry(range(2, 1, 2, 2), range(2, 1, 2, 2), 0),
            entry(range(4, 1, 4, 2), range(4, 1, 4, 2), 0),
        ])
        .remap_expanded_lines(&remap);

        let lines: Vec<_> = map
            .entries()
            .iter()
            .map(|e| e.expanded_range.start.line)
            .collect();
        assert_eq!(lines, vec![1, 2]);
        assert_eq!(map.expanded_to_source(2, 1).unwrap().source_range.start.line, 4);
    }
}
