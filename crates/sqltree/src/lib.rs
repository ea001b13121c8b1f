//! Public API facade for sqltree.
//!
//! Re-exports the toolkit's surface: the node catalog and traversal engines
//! from `sqltree-ast`, the raw-tree builder from `sqltree-builder`, and the
//! reference analysis passes from `sqltree-analyze`. Integration tests for
//! the whole pipeline live in this crate's `tests/` directory.

pub use sqltree_ast::rewrite::{rewrite, Rewriter};
pub use sqltree_ast::source::LineMap;
pub use sqltree_ast::validate::{validate, MalformedNodeError};
pub use sqltree_ast::visit::{traverse, Flow, Order, Traversal, Visitor};
pub use sqltree_ast::{
    AlterTableAction, AlterTableStatement, Assignment, BinaryOp, ColumnAlias, ColumnDef,
    ColumnRef, CompoundOp, CreateTableBody, CreateTableStatement, Cte, DeleteStatement,
    Distinctness, DropTableStatement, Expr, FromClause, FunctionArgs, InSet, InsertSource,
    InsertStatement, JoinClause, JoinConstraint, JoinType, LikeOp, LimitClause, Literal,
    NullsOrder, OrderingTerm, QualifiedName, ResultColumn, SelectBody, SelectCore,
    SelectStatement, SortDirection, Span, Statement, TableOrSubquery, TruncateStatement,
    TypeName, UnaryOp, UpdateStatement, UseStatement, WithClause,
};

pub use sqltree_builder::{
    BuildError, Builder, CaseFold, Dialect, DialectContext, RawNode, ScriptBuild, ScriptFailure,
};

pub use sqltree_analyze::{
    analyze_metrics_snapshot, collect_columns, collect_tables, reset_analyze_metrics,
    AnalyzeMetricsSnapshot, ColumnSite, ColumnUse,
};

/// Render a statement to canonical SQL text.
///
/// The output re-parses (through the external grammar) to a structurally
/// equal tree for any statement whose nodes came from original source;
/// synthesized nodes are omitted from the rendering.
#[must_use]
pub fn to_sql(stmt: &Statement) -> String {
    stmt.to_string()
}
