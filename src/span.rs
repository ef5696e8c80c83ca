//! Byte ranges into an analyzed text snapshot, and line/column conversion.

use serde::Serialize;

/// Half-open byte range `[start, end)` into the analyzed snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// Zero-width span at `offset`.
    pub fn empty(offset: usize) -> Self {
        Span {
            start: offset,
            end: offset,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(&self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Cursor containment: the end offset counts as inside, so a caret
    /// placed right after an identifier still "touches" it.
    pub fn touches(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }

    /// Strict containment, `start <= offset < end`.
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Maps byte offsets to 1-based line/column pairs (columns count chars).
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        LineIndex {
            line_starts,
            len: text.len(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte offset where the 1-based `line` starts.
    pub fn line_start(&self, line: usize) -> Option<usize> {
        line.checked_sub(1)
            .and_then(|idx| self.line_starts.get(idx))
            .copied()
    }

    /// Byte offset where the 1-based `line` ends, excluding the newline.
    pub fn line_end(&self, text: &str, line: usize) -> Option<usize> {
        let start = self.line_start(line)?;
        Some(
            text[start..]
                .find('\n')
                .map(|i| start + i)
                .unwrap_or(self.len),
        )
    }

    /// 1-based `(line, column)` of `offset`.
    pub fn position(&self, text: &str, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.len);
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        let line_start = self.line_starts[line_idx];
        let column = text
            .get(line_start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(offset - line_start);
        (line_idx + 1, column + 1)
    }

    /// Byte offset of a 1-based `(line, column)` pair. Columns past the end
    /// of the line clamp to the line end.
    pub fn offset(&self, text: &str, line: usize, column: usize) -> Option<usize> {
        let start = self.line_start(line)?;
        let end = self.line_end(text, line)?;
        let skip = column.saturating_sub(1);
        Some(
            text[start..end]
                .char_indices()
                .nth(skip)
                .map(|(i, _)| start + i)
                .unwrap_or(end),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_round_trip() {
        let text = "flows:\n  main:\n    - log: \"${x}\"\n";
        let index = LineIndex::new(text);
        let offset = text.find("${x}").unwrap();
        let (line, column) = index.position(text, offset);
        assert_eq!((line, column), (3, 13));
        assert_eq!(index.offset(text, line, column), Some(offset));
    }

    #[test]
    fn test_touches_includes_end() {
        let span = Span::new(2, 5);
        assert!(span.touches(5));
        assert!(!span.contains(5));
        assert!(!span.touches(6));
    }
}
