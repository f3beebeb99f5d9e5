//! Reference extraction.
//!
//! Turns a document's lines and its raw reference index into typed edge
//! candidates. A reference is typed when its line starts with the configured
//! prefix followed by a label token, e.g. with prefix `"- "`:
//!
//! ```text
//! - supports [[Claim]], [[Other claim]]
//! ```
//!
//! Both references above have type `supports` and carry the line after the
//! prefix as context. Any other reference is inline and carries its own link
//! text. Repeated references are all reported; merging is the policy's job.

use regex_lite::Regex;

use crate::types::RawReference;
use crate::INLINE_EDGE_TYPE;

/// A reference classified and annotated with its context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedReference {
    /// Normalized link target (alias and subpath removed).
    pub target: String,
    /// Relation label, [`INLINE_EDGE_TYPE`] for untyped references.
    pub edge_type: String,
    /// Text surrounding the reference.
    pub context: String,
}

/// Classifies raw references into typed and inline edges.
#[derive(Debug, Clone)]
pub struct ReferenceExtractor {
    prefix: String,
    typed_line: Regex,
}

impl ReferenceExtractor {
    /// Create an extractor for the given typed-line prefix.
    pub fn new(prefix: &str) -> Result<Self, regex_lite::Error> {
        let pattern = format!(r"^\s*{}([^\s\[\]]+)\s+", regex_lite::escape(prefix));
        Ok(Self {
            prefix: prefix.to_string(),
            typed_line: Regex::new(&pattern)?,
        })
    }

    /// The configured prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Extract candidates from `content` for the given references.
    ///
    /// Output order follows `references`.
    pub fn extract(&self, content: &str, references: &[RawReference]) -> Vec<ExtractedReference> {
        let lines: Vec<&str> = content.lines().collect();
        references
            .iter()
            .filter(|r| !r.target().is_empty())
            .map(|r| self.classify(&lines, r))
            .collect()
    }

    fn classify(&self, lines: &[&str], reference: &RawReference) -> ExtractedReference {
        let target = reference.target().to_string();
        let Some(line) = lines.get(reference.span.line) else {
            return ExtractedReference {
                target,
                edge_type: reference
                    .explicit_type
                    .clone()
                    .unwrap_or_else(|| INLINE_EDGE_TYPE.to_string()),
                context: reference.link_text.clone(),
            };
        };

        if let Some(explicit) = &reference.explicit_type {
            return ExtractedReference {
                target,
                edge_type: explicit.clone(),
                context: line.trim().to_string(),
            };
        }

        if let Some(caps) = self.typed_line.captures(line) {
            let label_end = caps.get(0).map(|m| m.end()).unwrap_or(0);
            let label = caps
                .get(1)
                .map(|m| m.as_str().trim_end_matches(':'))
                .unwrap_or("");
            if reference.span.start >= label_end && !label.is_empty() {
                let body = line.trim_start();
                let body = body.strip_prefix(self.prefix.as_str()).unwrap_or(body);
                return ExtractedReference {
                    target,
                    edge_type: label.to_string(),
                    context: body.trim().to_string(),
                };
            }
        }

        ExtractedReference {
            target,
            edge_type: INLINE_EDGE_TYPE.to_string(),
            context: reference.link_text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Span;

    fn reference(text: &str, line: usize, start: usize) -> RawReference {
        RawReference::new(text, Span::new(line, start, start + text.len() + 4))
    }

    #[test]
    fn test_typed_line() {
        let ex = ReferenceExtractor::new("- ").unwrap();
        let content = "# Title\n- supports [[Claim]], [[Other]]\n";
        let refs = vec![reference("Claim", 1, 11), reference("Other", 1, 22)];
        let out = ex.extract(content, &refs);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| r.edge_type == "supports"));
        assert_eq!(out[0].context, "supports [[Claim]], [[Other]]");
        assert_eq!(out[1].target, "Other");
    }

    #[test]
    fn test_label_colon_trimmed() {
        let ex = ReferenceExtractor::new("- ").unwrap();
        let out = ex.extract("- author: [[Ada]]", &[reference("Ada", 0, 10)]);
        assert_eq!(out[0].edge_type, "author");
    }

    #[test]
    fn test_list_item_with_leading_link_is_inline() {
        let ex = ReferenceExtractor::new("- ").unwrap();
        let out = ex.extract("- [[Ada]] wrote this", &[reference("Ada", 0, 2)]);
        assert_eq!(out[0].edge_type, INLINE_EDGE_TYPE);
        assert_eq!(out[0].context, "Ada");
    }

    #[test]
    fn test_plain_prose_is_inline_and_repeats_kept() {
        let ex = ReferenceExtractor::new("- ").unwrap();
        let content = "See [[B]] here.\nAnd [[B#Part|again]].";
        let out = ex.extract(content, &[reference("B", 0, 4), reference("B#Part|again", 1, 4)]);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| r.edge_type == INLINE_EDGE_TYPE && r.target == "B"));
        assert_eq!(out[0].context, "B");
        assert_eq!(out[1].context, "B#Part|again");
    }

    #[test]
    fn test_explicit_type_wins() {
        let ex = ReferenceExtractor::new("- ").unwrap();
        let r = reference("B", 0, 4).with_type("cites");
        let out = ex.extract("See [[B]]", &[r]);
        assert_eq!(out[0].edge_type, "cites");
    }

    #[test]
    fn test_custom_prefix_and_out_of_range_span() {
        let ex = ReferenceExtractor::new("* ").unwrap();
        let out = ex.extract("* rel [[X]]\n- rel [[Y]]", &[reference("X", 0, 6), reference("Y", 1, 6)]);
        assert_eq!(out[0].edge_type, "rel");
        assert_eq!(out[1].edge_type, INLINE_EDGE_TYPE);

        let out = ex.extract("", &[reference("Z", 5, 0)]);
        assert_eq!(out[0].context, "Z");
        assert_eq!(out[0].edge_type, INLINE_EDGE_TYPE);
    }
}
