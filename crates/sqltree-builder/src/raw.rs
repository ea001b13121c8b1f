//! The raw parse tree handed over by the external grammar.
//!
//! A [`RawNode`] is deliberately untyped: a rule name, the matched source
//! slice, a span, and child nodes. The grammar owns the vocabulary of rule
//! names; the builder owns the mapping from that vocabulary to the canonical
//! node catalog. Keeping the seam this narrow is what lets the grammar stay
//! an external collaborator.

use serde::{Deserialize, Serialize};
use sqltree_ast::Span;

/// One node of the raw parse tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    /// Grammar rule name (e.g. `"select_stmt"`, `"ident"`).
    pub rule: String,
    /// The matched source slice. Empty for interior and marker nodes.
    pub text: String,
    /// Byte range of the match in the original source.
    pub span: Span,
    /// Child matches in source order.
    pub children: Vec<RawNode>,
}

impl RawNode {
    /// A leaf node carrying matched text.
    #[must_use]
    pub fn leaf(rule: impl Into<String>, text: impl Into<String>, span: Span) -> Self {
        Self {
            rule: rule.into(),
            text: text.into(),
            span,
            children: Vec::new(),
        }
    }

    /// A marker node: present-or-absent syntax like `NOT` or `DISTINCT`.
    #[must_use]
    pub fn marker(rule: impl Into<String>, span: Span) -> Self {
        Self::leaf(rule, "", span)
    }

    /// An interior node with children.
    #[must_use]
    pub fn node(rule: impl Into<String>, span: Span, children: Vec<RawNode>) -> Self {
        Self {
            rule: rule.into(),
            text: String::new(),
            span,
            children,
        }
    }

    /// First child with the given rule, if any.
    #[must_use]
    pub fn find(&self, rule: &str) -> Option<&RawNode> {
        self.children.iter().find(|c| c.rule == rule)
    }

    /// Whether a child with the given rule is present.
    #[must_use]
    pub fn has(&self, rule: &str) -> bool {
        self.find(rule).is_some()
    }

    /// Children matching the given rule, in source order.
    pub fn children_of<'a>(&'a self, rule: &'a str) -> impl Iterator<Item = &'a RawNode> {
        self.children.iter().filter(move |c| c.rule == rule)
    }
}
