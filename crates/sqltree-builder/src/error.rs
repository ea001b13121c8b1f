//! Builder error taxonomy.

use thiserror::Error;

use crate::dialect::Dialect;
use sqltree_ast::validate::MalformedNodeError;
use sqltree_ast::Span;

/// Why a raw parse tree could not become a canonical statement.
///
/// The three variants are deliberately distinct: a `SyntaxStructure` failure
/// is a grammar/builder mismatch — a defect to fix, never retried — while an
/// `UnsupportedFeature` marks syntactically valid input the active dialect
/// does not model, which batch callers may choose to skip.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// The raw tree contains a shape the builder does not recognize.
    #[error("unrecognized parse tree shape `{rule}` at {span}: {detail}")]
    SyntaxStructure {
        rule: String,
        span: Span,
        detail: String,
    },

    /// A recognized construct that is not modeled for the active dialect.
    #[error("{feature} is not available under the {dialect} dialect")]
    UnsupportedFeature {
        feature: String,
        dialect: Dialect,
        span: Span,
    },

    /// The finished tree violated a node-model invariant.
    #[error(transparent)]
    Malformed(#[from] MalformedNodeError),
}

impl BuildError {
    /// The source span the error points at.
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::SyntaxStructure { span, .. } | Self::UnsupportedFeature { span, .. } => *span,
            Self::Malformed(
                MalformedNodeError::EmptySequence { span, .. }
                | MalformedNodeError::SpanEscape { child: span, .. },
            ) => *span,
        }
    }
}
