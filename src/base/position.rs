//! Source locations for schema elements.
//!
//! The semantic layer only uses locations to attribute diagnostics, so a
//! location is a document name plus a 0-based line/column range.
use std::fmt;
use std::sync::Arc;

/// A 0-based line/column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// The range an element occupies in its document. Readers that only know
/// where an element starts produce a point span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn point(position: Position) -> Self {
        Self::new(position, position)
    }

    pub fn is_point(&self) -> bool {
        self.start == self.end
    }
}

/// Where an element was declared: a document name plus a span inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Location {
    pub source: Arc<str>,
    pub span: Span,
}

impl Location {
    pub fn new(source: impl Into<Arc<str>>, span: Span) -> Self {
        Self {
            source: source.into(),
            span,
        }
    }

    /// Location of a single point.
    pub fn at(source: impl Into<Arc<str>>, line: usize, column: usize) -> Self {
        Self::new(source, Span::point(Position::new(line, column)))
    }

    /// Placeholder location for synthesized nodes.
    pub fn unknown() -> Self {
        Self::new("", Span::default())
    }

    pub fn is_unknown(&self) -> bool {
        self.source.is_empty() && self.span == Span::default()
    }

    /// 0-based line the element starts on.
    pub fn line(&self) -> usize {
        self.span.start.line
    }

    pub fn column(&self) -> usize {
        self.span.start.column
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::unknown()
    }
}

/// `source (line:column)`, 1-based; synthesized nodes print `<unknown>`.
impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            return f.write_str("<unknown>");
        }
        write!(f, "{} ({}:{})", self.source, self.line() + 1, self.column() + 1)
    }
}
