//! Source spans and offset to line mapping

use serde::{Deserialize, Serialize};

/// Contiguous region of a source unit
///
/// Offsets are byte offsets into the unit's text. Lines are 1-indexed,
/// columns are 0-indexed and counted in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceSpan {
    /// Byte offset of the start of the span (inclusive)
    pub start: usize,
    /// Byte offset of the end of the span (exclusive)
    pub end: usize,
    /// Line number of the start (1-indexed)
    pub start_line: u32,
    /// Line number of the end (1-indexed)
    pub end_line: u32,
    /// Column number of the start (0-indexed, in bytes)
    pub start_col: u32,
}

impl SourceSpan {
    /// Create a new source span
    pub fn new(start: usize, end: usize, start_line: u32, end_line: u32, start_col: u32) -> Self {
        SourceSpan {
            start,
            end,
            start_line,
            end_line,
            start_col,
        }
    }

    /// Get the length of the span in bytes
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if the span is empty
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Check if this span contains another span
    pub fn contains(&self, other: &SourceSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Check if this span overlaps with another span
    ///
    /// Zero-width spans don't overlap with anything, including themselves.
    pub fn overlaps(&self, other: &SourceSpan) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.start < other.end && other.start < self.end
    }
}

/// Maps byte offsets of one source unit to (line, column) pairs
///
/// Only `\n` terminates a line, which keeps line numbers identical to the
/// rows reported by tree-sitter. A `\r\n` pair therefore counts once.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    /// Build the index for `source`
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        LineIndex {
            line_starts,
            len: source.len(),
        }
    }

    /// Number of lines in the unit (an empty unit has one empty line)
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// 1-based line and 0-based byte column of `offset`
    ///
    /// Offsets past the end of the unit clamp to the end.
    pub fn line_col(&self, offset: usize) -> (u32, u32) {
        let offset = offset.min(self.len);
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let col = offset - self.line_starts[line - 1];
        (line as u32, col as u32)
    }

    /// 1-based line of `offset`
    pub fn line_of(&self, offset: usize) -> u32 {
        self.line_col(offset).0
    }

    /// Byte offset where 1-based `line` starts, if the line exists
    pub fn line_start(&self, line: u32) -> Option<usize> {
        let index = (line as usize).checked_sub(1)?;
        self.line_starts.get(index).copied()
    }

    /// Build a span with line information for the byte range `start..end`
    pub fn span(&self, start: usize, end: usize) -> SourceSpan {
        let (start_line, start_col) = self.line_col(start);
        let end_line = self.line_of(end).max(start_line);
        SourceSpan::new(start, end, start_line, end_line, start_col)
    }
}
