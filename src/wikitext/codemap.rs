//! A data structure for tracking source positions in the syntax tree,
//! heavily adapted from [codemap](https://crates.io/crates/codemap).

use serde::Serialize;

/// A range of text within a string.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct Span {
    /// The position of the first byte of the span.
    pub start: usize,

    /// The position after the last byte of the span.
    pub end: usize,
}

impl Span {
    /// Creates a new span.
    #[inline]
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// Returns true if this span is empty.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.start >= self.end
    }

    /// The length of the span, in bytes.
    #[inline]
    pub fn len(self) -> usize {
        self.end - self.start
    }

    #[inline]
    /// Converts the span into a range that can be used for string indexing.
    // This is not just using `From<core::ops::Range<usize>` because type
    // resolution fails in common use with `.into()` which eliminates any
    // benefit of using a standard conversion trait
    pub fn into_range(self) -> core::ops::Range<usize> {
        self.start..self.end
    }
}

/// Associate a Span with a value of arbitrary type (e.g. a syntax node).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
pub struct Spanned<T> {
    /// The value.
    pub node: T,
    /// The span.
    pub span: Span,
}

impl<T> Spanned<T> {
    /// Creates a new [`Spanned`].
    #[inline]
    pub fn new(node: T, start: usize, end: usize) -> Self {
        Self {
            node,
            span: Span { start, end },
        }
    }
}

impl<T> core::ops::Deref for Spanned<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.node
    }
}

/// A line and column position in a source file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LineCol {
    /// The 1-indexed line number.
    pub line: usize,
    /// The 1-indexed column number, in characters.
    pub column: usize,
    /// The byte offset.
    pub offset: usize,
}

impl core::fmt::Display for LineCol {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A record of a source file’s lines.
#[derive(Clone)]
pub struct FileMap<'a> {
    /// The source file.
    source: &'a str,

    /// Byte positions of line beginnings.
    lines: Vec<usize>,
}

impl core::fmt::Debug for FileMap<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let limit = self.source.floor_char_boundary(100);

        f.debug_struct("FileMap")
            .field(
                "source",
                &format!(
                    "{}{}",
                    &self.source[..limit],
                    if self.source.len() > limit { "…" } else { "" }
                ),
            )
            .field("lines", &self.lines.len())
            .finish()
    }
}

impl core::ops::Deref for FileMap<'_> {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.source
    }
}

impl<'a> FileMap<'a> {
    /// Creates a new file map for the given source.
    pub fn new(source: &'a str) -> Self {
        let lines = core::iter::once(0)
            .chain(memchr::memchr_iter(b'\n', source.as_bytes()).map(|p| p + 1))
            .collect();

        Self { source, lines }
    }

    /// Gets the line and column of a byte offset.
    ///
    /// # Panics
    ///
    /// * If `pos` is not within this file
    /// * If `pos` points to a byte in the middle of a UTF-8 character
    pub fn find_line_col(&self, pos: usize) -> LineCol {
        let line = self.find_line(pos);
        let line_span = self.line_span(line);
        let column = self.source[line_span.start..pos].chars().count();
        LineCol {
            line: line + 1,
            column: column + 1,
            offset: pos,
        }
    }

    /// Gets the 0-indexed line number of a byte offset.
    ///
    /// # Panics
    ///
    ///  * If `pos` is not within this file
    fn find_line(&self, pos: usize) -> usize {
        assert!(pos <= self.source.len());
        match self.lines.binary_search(&pos) {
            Ok(i) => i,
            Err(i) => i - 1,
        }
    }

    /// Gets the span representing a line by 0-indexed line number. The
    /// returned span includes the line terminator.
    fn line_span(&self, line: usize) -> Span {
        Span {
            start: self.lines[line],
            end: self
                .lines
                .get(line + 1)
                .copied()
                .unwrap_or(self.source.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col() {
        let map = FileMap::new("ab\ncdé\n\nf");
        assert_eq!(
            map.find_line_col(0),
            LineCol {
                line: 1,
                column: 1,
                offset: 0
            }
        );
        assert_eq!(map.find_line_col(4).to_string(), "2:2");
        // After the two-byte `é`
        assert_eq!(map.find_line_col(7).to_string(), "2:4");
        assert_eq!(map.find_line_col(8).to_string(), "3:1");
        assert_eq!(map.find_line_col(9).to_string(), "4:1");
        assert_eq!(map.find_line_col(10).to_string(), "4:2");
    }

    #[test]
    fn span_len() {
        let span = Span::new(1, 5);
        assert_eq!(span.len(), 4);
        assert_eq!(span.into_range(), 1..5);
        assert!(!span.is_empty());
        assert!(Span::new(2, 2).is_empty());
    }
}
