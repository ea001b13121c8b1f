//! Mapping byte offsets back to line/column positions for diagnostics.

use crate::Span;

/// Precomputed line-start table for one source text.
///
/// Built once per parse; `line_col` is a binary search, so resolving many
/// diagnostic positions against the same source stays cheap.
#[derive(Debug, Clone)]
pub struct LineMap {
    line_starts: Vec<u32>,
    len: u32,
}

impl LineMap {
    /// Index the given source text.
    #[must_use]
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        Self {
            line_starts,
            len: source.len() as u32,
        }
    }

    /// Map a byte offset to a 1-based (line, column) pair.
    ///
    /// Offsets past the end of the source clamp to the last position.
    #[must_use]
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        let col = offset - self.line_starts[line];
        (line as u32 + 1, col + 1)
    }

    /// Map a span's start to a 1-based (line, column) pair.
    ///
    /// Returns `None` for synthetic spans, which have no source position.
    #[must_use]
    pub fn span_start(&self, span: Span) -> Option<(u32, u32)> {
        if span.is_synthetic() {
            None
        } else {
            Some(self.line_col(span.start))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line() {
        let map = LineMap::new("SELECT 1");
        assert_eq!(map.line_col(0), (1, 1));
        assert_eq!(map.line_col(7), (1, 8));
    }

    #[test]
    fn test_multi_line() {
        let map = LineMap::new("SELECT a\nFROM t\nWHERE b");
        assert_eq!(map.line_col(0), (1, 1));
        // 'F' of FROM
        assert_eq!(map.line_col(9), (2, 1));
        // 'W' of WHERE
        assert_eq!(map.line_col(16), (3, 1));
        assert_eq!(map.line_col(18), (3, 3));
    }

    #[test]
    fn test_offset_on_newline_boundary() {
        let map = LineMap::new("a\nb");
        assert_eq!(map.line_col(1), (1, 2));
        assert_eq!(map.line_col(2), (2, 1));
    }

    #[test]
    fn test_clamps_past_end() {
        let map = LineMap::new("ab");
        assert_eq!(map.line_col(100), (1, 3));
    }

    #[test]
    fn test_synthetic_span_has_no_position() {
        let map = LineMap::new("SELECT 1");
        assert_eq!(map.span_start(Span::SYNTHETIC), None);
        assert_eq!(map.span_start(Span::new(0, 6)), Some((1, 1)));
    }
}
