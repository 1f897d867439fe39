use serde::{Deserialize, Serialize};

/// Byte-offset span in source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub file_id: u32,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end, file_id: 0 }
    }

    pub fn with_file(start: usize, end: usize, file_id: u32) -> Self {
        Self { start, end, file_id }
    }

    pub fn dummy() -> Self {
        Self { start: 0, end: 0, file_id: 0 }
    }

    /// Smallest span covering both `self` and `other`. Keeps `self`'s file.
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            file_id: self.file_id,
        }
    }
}

/// A value annotated with its source span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }

    pub fn dummy(node: T) -> Self {
        Self { node, span: Span::dummy() }
    }
}

/// Maps byte offsets to 1-based line:column positions for a single source file.
pub struct LineIndex {
    /// Byte offset of the start of each line. line_starts[0] == 0 always.
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// 1-based (line, column). Columns count bytes, like the Go toolchain does.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(ins) => ins.saturating_sub(1),
        };
        (line + 1, offset - self.line_starts[line] + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_new() {
        let span = Span::new(10, 20);
        assert_eq!(span.start, 10);
        assert_eq!(span.end, 20);
        assert_eq!(span.file_id, 0);
    }

    #[test]
    fn test_span_with_file() {
        let span = Span::with_file(5, 15, 42);
        assert_eq!(span.file_id, 42);
    }

    #[test]
    fn test_span_to_covers_both() {
        let a = Span::with_file(10, 12, 3);
        let b = Span::with_file(4, 8, 3);
        assert_eq!(a.to(b), Span::with_file(4, 12, 3));
    }

    #[test]
    fn test_spanned_roundtrip() {
        let span = Span::new(5, 10);
        let spanned = Spanned::new("test".to_string(), span);
        let json = serde_json::to_string(&spanned).unwrap();
        let back: Spanned<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(spanned, back);
    }

    #[test]
    fn line_col_single_line() {
        let idx = LineIndex::new("hello");
        assert_eq!(idx.line_col(0), (1, 1));
        assert_eq!(idx.line_col(3), (1, 4));
    }

    #[test]
    fn line_col_multi_line() {
        let idx = LineIndex::new("ab\ncd\nef");
        assert_eq!(idx.line_col(2), (1, 3));
        assert_eq!(idx.line_col(3), (2, 1));
        assert_eq!(idx.line_col(4), (2, 2));
        assert_eq!(idx.line_col(6), (3, 1));
    }

    #[test]
    fn line_col_at_newline_belongs_to_its_line() {
        let idx = LineIndex::new("a\n\nb");
        assert_eq!(idx.line_col(1), (1, 2));
        assert_eq!(idx.line_col(2), (2, 1));
        assert_eq!(idx.line_col(3), (3, 1));
    }
}
