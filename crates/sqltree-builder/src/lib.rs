//! Raw parse tree to canonical AST conversion.
//!
//! The external grammar-driven parser hands this crate a [`RawNode`] tree —
//! rule names, source slices, and spans. [`Builder`] converts that tree into
//! the canonical `sqltree-ast` node model, applying the active
//! [`DialectContext`]'s lexical normalization (quote stripping, case folding)
//! exactly once, at build time.
//!
//! The grammar and the builder must move in lock-step: a raw shape the
//! builder does not recognize is reported as
//! [`BuildError::SyntaxStructure`], the designed seam that catches drift
//! between the two.

pub mod build;
pub mod dialect;
pub mod error;
pub mod raw;

pub use build::{Builder, ScriptBuild, ScriptFailure};
pub use dialect::{CaseFold, Dialect, DialectContext};
pub use error::BuildError;
pub use raw::RawNode;
