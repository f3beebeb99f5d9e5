//! Raw reference records as reported by the reference index.

use serde::{Deserialize, Serialize};

/// Location of a reference occurrence in a document.
///
/// `line` is zero-based; `start`/`end` are byte offsets within that line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Zero-based line number.
    pub line: usize,
    /// Byte offset of the first character of the link syntax.
    pub start: usize,
    /// Byte offset one past the link syntax.
    pub end: usize,
}

impl Span {
    /// Create a new span.
    pub fn new(line: usize, start: usize, end: usize) -> Self {
        Self { line, start, end }
    }
}

/// One outgoing reference occurrence in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReference {
    /// Link text as written, e.g. `Target#Heading|alias`.
    pub link_text: String,
    /// Explicit type annotation supplied by the index, if any.
    pub explicit_type: Option<String>,
    /// Where the reference occurs.
    pub span: Span,
}

impl RawReference {
    /// Create an untyped reference.
    pub fn new(link_text: impl Into<String>, span: Span) -> Self {
        Self {
            link_text: link_text.into(),
            explicit_type: None,
            span,
        }
    }

    /// Attach an explicit type annotation.
    pub fn with_type(mut self, edge_type: impl Into<String>) -> Self {
        self.explicit_type = Some(edge_type.into());
        self
    }

    /// Link target with alias (`|...`) and subpath (`#...`) removed.
    pub fn target(&self) -> &str {
        let text = self.link_text.split('|').next().unwrap_or("");
        text.split('#').next().unwrap_or("").trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_strips_alias_and_subpath() {
        let r = RawReference::new("Note#Section|shown", Span::new(0, 0, 10));
        assert_eq!(r.target(), "Note");
        let r = RawReference::new(" folder/Note ", Span::new(0, 0, 10));
        assert_eq!(r.target(), "folder/Note");
    }
}
