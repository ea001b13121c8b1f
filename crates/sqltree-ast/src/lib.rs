//! SQL Abstract Syntax Tree node types for sqltree.
//!
//! This crate defines the canonical AST produced by `sqltree-builder` from an
//! external grammar's raw parse tree. Every syntax-bearing node carries a
//! [`Span`] for error reporting, every node renders back to canonical SQL via
//! `fmt::Display`, and the [`visit`] and [`rewrite`] modules provide generic
//! traversal without per-pass tree-walking.
//!
//! Trees are immutable after construction. Recursive child links use
//! [`Arc`], so a rewriting pass can rebuild just the path from a replaced
//! node to the root while sharing every untouched subtree with the original.

mod display;
pub mod rewrite;
pub mod source;
pub mod validate;
pub mod visit;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Span — source location tracking
// ---------------------------------------------------------------------------

/// A byte-offset range into the original SQL source text.
///
/// Spans exist for diagnostics only and are excluded from node equality:
/// `PartialEq` on any two spans is always true, so `==` on AST nodes compares
/// syntactic structure alone. Tests that assert positions read `start` and
/// `end` directly.
///
/// Nodes inserted by the normalizer carry [`Span::SYNTHETIC`] instead of a
/// real range, which exempts them from the span-containment invariant and
/// lets formatters and diff tools tell generated syntax from original.
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset of the first character (inclusive).
    pub start: u32,
    /// Byte offset one past the last character (exclusive).
    pub end: u32,
}

impl Span {
    /// Sentinel span for nodes synthesized by normalization.
    pub const SYNTHETIC: Self = Self {
        start: u32::MAX,
        end: u32::MAX,
    };

    /// Create a new span from start (inclusive) to end (exclusive) byte offsets.
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Whether this is the synthetic sentinel.
    #[must_use]
    pub const fn is_synthetic(self) -> bool {
        self.start == u32::MAX && self.end == u32::MAX
    }

    /// Merge two spans into one that covers both.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        let start = if self.start < other.start {
            self.start
        } else {
            other.start
        };
        let end = if self.end > other.end {
            self.end
        } else {
            other.end
        };
        Self { start, end }
    }

    /// Whether `other` lies entirely within this span.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Length in bytes.
    #[must_use]
    pub const fn len(self) -> u32 {
        self.end - self.start
    }

    /// Whether the span is empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start == self.end
    }
}

impl PartialEq for Span {
    /// Spans never participate in structural equality.
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for Span {}

impl std::hash::Hash for Span {
    fn hash<H: std::hash::Hasher>(&self, _state: &mut H) {}
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_synthetic() {
            f.write_str("synthetic")
        } else {
            write!(f, "{}..{}", self.start, self.end)
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ---------------------------------------------------------------------------
// Top-level statement
// ---------------------------------------------------------------------------

/// A single parsed SQL statement, the root of one AST.
///
/// A parse of a multi-statement script is an ordered sequence of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    // DML
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),

    // DDL
    CreateTable(CreateTableStatement),
    DropTable(DropTableStatement),
    AlterTable(AlterTableStatement),
    Truncate(TruncateStatement),

    // Session / utility
    Use(UseStatement),
    Explain { stmt: Box<Statement>, span: Span },
}

impl Statement {
    /// Return the source span of this statement.
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Select(s) => s.span,
            Self::Insert(s) => s.span,
            Self::Update(s) => s.span,
            Self::Delete(s) => s.span,
            Self::CreateTable(s) => s.span,
            Self::DropTable(s) => s.span,
            Self::AlterTable(s) => s.span,
            Self::Truncate(s) => s.span,
            Self::Use(s) => s.span,
            Self::Explain { span, .. } => *span,
        }
    }
}

// ---------------------------------------------------------------------------
// Qualified names
// ---------------------------------------------------------------------------

/// A possibly-schema-qualified name like `main.users` or just `users`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Optional schema name.
    pub schema: Option<String>,
    /// The object name.
    pub name: String,
}

impl QualifiedName {
    /// Create an unqualified name.
    #[must_use]
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    /// Create a schema-qualified name.
    #[must_use]
    pub fn qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }
}

/// A reference to a column, possibly qualified with a table name or alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    /// Optional table (or alias) qualifier.
    pub table: Option<String>,
    /// Column name.
    pub column: String,
}

impl ColumnRef {
    /// Create an unqualified column reference.
    #[must_use]
    pub fn bare(column: impl Into<String>) -> Self {
        Self {
            table: None,
            column: column.into(),
        }
    }

    /// Create a table-qualified column reference.
    #[must_use]
    pub fn qualified(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column: column.into(),
        }
    }
}

/// A select-list alias, explicit (`expr AS name`) or synthesized.
///
/// The normalizer fills in an alias for every aliasless select-list
/// expression so downstream passes never handle the absent case. Synthesized
/// aliases carry `synthetic: true` and [`Span::SYNTHETIC`], and canonical
/// rendering omits them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnAlias {
    pub name: String,
    pub synthetic: bool,
    pub span: Span,
}

impl ColumnAlias {
    /// An alias written in the source.
    #[must_use]
    pub fn explicit(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            synthetic: false,
            span,
        }
    }

    /// An alias inserted by normalization.
    #[must_use]
    pub fn synthesized(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            synthetic: true,
            span: Span::SYNTHETIC,
        }
    }
}

// ---------------------------------------------------------------------------
// Type name
// ---------------------------------------------------------------------------

/// A column type name as written in DDL (e.g. `VARCHAR(255)`, `INTEGER`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeName {
    /// The type name (e.g. `"VARCHAR"`).
    pub name: String,
    /// Optional first size parameter.
    pub arg1: Option<String>,
    /// Optional second size parameter (e.g. the scale in `DECIMAL(10,2)`).
    pub arg2: Option<String>,
}

// ---------------------------------------------------------------------------
// Literals
// ---------------------------------------------------------------------------

/// A literal value in SQL source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// Numeric integer literal.
    Integer(i64),
    /// Numeric float literal.
    Float(f64),
    /// String literal (single-quoted).
    String(String),
    /// The keyword `NULL`.
    Null,
    /// The keyword `TRUE`.
    True,
    /// The keyword `FALSE`.
    False,
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,

    // String
    Concat,

    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Logical
    And,
    Or,

    // Bitwise
    BitAnd,
    BitOr,
    ShiftLeft,
    ShiftRight,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Unary minus (`-expr`).
    Negate,
    /// Unary plus (`+expr`).
    Plus,
    /// Bitwise NOT (`~expr`).
    BitNot,
    /// Logical NOT (`NOT expr`).
    Not,
}

/// Pattern-match operator variants. `RLIKE` and `REGEXP` are MySQL/Hive
/// surface; the builder rejects them under dialects that lack them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LikeOp {
    Like,
    Rlike,
    Regexp,
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// An expression node in the AST.
///
/// Every variant carries a [`Span`]. Recursive children are [`Arc`]-linked so
/// rewrites can share untouched subtrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// A literal constant.
    Literal(Literal, Span),

    /// A column reference (possibly table-qualified).
    Column(ColumnRef, Span),

    /// A parenthesized expression. Kept as its own node so source
    /// parenthesization survives the round-trip.
    Paren(Arc<Expr>, Span),

    /// A binary operation: `left op right`.
    BinaryOp {
        left: Arc<Expr>,
        op: BinaryOp,
        right: Arc<Expr>,
        span: Span,
    },

    /// A unary operation: `op expr`.
    UnaryOp {
        op: UnaryOp,
        expr: Arc<Expr>,
        span: Span,
    },

    /// `expr [NOT] BETWEEN low AND high`.
    Between {
        expr: Arc<Expr>,
        low: Arc<Expr>,
        high: Arc<Expr>,
        not: bool,
        span: Span,
    },

    /// `expr [NOT] IN (...)`.
    In {
        expr: Arc<Expr>,
        set: InSet,
        not: bool,
        span: Span,
    },

    /// `expr [NOT] LIKE/RLIKE/REGEXP pattern [ESCAPE escape]`.
    Like {
        expr: Arc<Expr>,
        pattern: Arc<Expr>,
        escape: Option<Arc<Expr>>,
        op: LikeOp,
        not: bool,
        span: Span,
    },

    /// `CASE [operand] WHEN ... THEN ... [ELSE ...] END`.
    Case {
        operand: Option<Arc<Expr>>,
        whens: Vec<(Arc<Expr>, Arc<Expr>)>,
        else_expr: Option<Arc<Expr>>,
        span: Span,
    },

    /// `CAST(expr AS type_name)`.
    Cast {
        expr: Arc<Expr>,
        type_name: TypeName,
        span: Span,
    },

    /// `[NOT] EXISTS (subquery)`.
    Exists {
        subquery: Arc<SelectStatement>,
        not: bool,
        span: Span,
    },

    /// A scalar subquery: `(SELECT ...)`.
    Subquery(Arc<SelectStatement>, Span),

    /// A function call, optionally with DISTINCT.
    FunctionCall {
        name: String,
        args: FunctionArgs,
        distinct: bool,
        span: Span,
    },

    /// `expr IS [NOT] NULL`.
    IsNull {
        expr: Arc<Expr>,
        not: bool,
        span: Span,
    },
}

impl Expr {
    /// Return the span of this expression node.
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Literal(_, s)
            | Self::Column(_, s)
            | Self::Paren(_, s)
            | Self::Subquery(_, s) => *s,
            Self::BinaryOp { span, .. }
            | Self::UnaryOp { span, .. }
            | Self::Between { span, .. }
            | Self::In { span, .. }
            | Self::Like { span, .. }
            | Self::Case { span, .. }
            | Self::Cast { span, .. }
            | Self::Exists { span, .. }
            | Self::FunctionCall { span, .. }
            | Self::IsNull { span, .. } => *span,
        }
    }
}

/// The set of values for an IN expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InSet {
    /// `IN (expr, expr, ...)`
    List(Vec<Arc<Expr>>),
    /// `IN (SELECT ...)`
    Subquery(Arc<SelectStatement>),
}

/// Function argument list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FunctionArgs {
    /// `func(*)` — used for `COUNT(*)`.
    Star,
    /// `func(arg1, arg2, ...)` or `func()`.
    List(Vec<Arc<Expr>>),
}

// ---------------------------------------------------------------------------
// SELECT statement
// ---------------------------------------------------------------------------

/// A full SELECT statement, including WITH, ORDER BY, and LIMIT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectStatement {
    /// Optional common table expressions.
    pub with: Option<WithClause>,
    /// The SELECT body (core + compound operators).
    pub body: SelectBody,
    /// ORDER BY terms.
    pub order_by: Vec<OrderingTerm>,
    /// LIMIT clause.
    pub limit: Option<LimitClause>,
    pub span: Span,
}

/// WITH clause for common table expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithClause {
    /// Whether this is `WITH RECURSIVE`.
    pub recursive: bool,
    /// The CTE definitions.
    pub ctes: Vec<Cte>,
    pub span: Span,
}

/// A single Common Table Expression definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cte {
    /// CTE name.
    pub name: String,
    /// Optional column name list.
    pub columns: Vec<String>,
    /// The CTE body query.
    pub query: Arc<SelectStatement>,
    pub span: Span,
}

/// The body of a SELECT: one or more SELECT cores connected by compound ops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectBody {
    /// The first SELECT core.
    pub select: SelectCore,
    /// Zero or more compound operations.
    pub compounds: Vec<(CompoundOp, SelectCore)>,
}

/// Compound SELECT operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompoundOp {
    Union,
    UnionAll,
    Intersect,
    Except,
}

/// A single SELECT core or VALUES clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectCore {
    /// `SELECT [DISTINCT] columns FROM ... WHERE ... GROUP BY ... HAVING ...`
    Select {
        distinct: Distinctness,
        columns: Vec<ResultColumn>,
        from: Option<Arc<FromClause>>,
        where_clause: Option<Arc<Expr>>,
        group_by: Vec<Arc<Expr>>,
        having: Option<Arc<Expr>>,
        span: Span,
    },
    /// `VALUES (row), (row), ...`
    Values { rows: Vec<Vec<Arc<Expr>>>, span: Span },
}

impl SelectCore {
    /// Return the source span of this core.
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Select { span, .. } | Self::Values { span, .. } => *span,
        }
    }
}

/// DISTINCT / ALL modifier on SELECT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Distinctness {
    #[default]
    All,
    Distinct,
}

/// A single column in the SELECT result list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResultColumn {
    /// `*` — all columns.
    Star(Span),
    /// `table.*` — all columns from one table.
    TableStar(String, Span),
    /// `expr [AS alias]`. After normalization the alias is always present;
    /// implicit ones are marked synthetic.
    Expr {
        expr: Arc<Expr>,
        alias: Option<ColumnAlias>,
    },
}

/// The FROM clause: a first source plus any number of joins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FromClause {
    pub source: TableOrSubquery,
    pub joins: Vec<JoinClause>,
    pub span: Span,
}

/// A table source in a FROM clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableOrSubquery {
    /// A named table: `[schema.]table [AS alias]`.
    Table {
        name: QualifiedName,
        alias: Option<String>,
        span: Span,
    },
    /// A subquery: `(SELECT ...) [AS alias]`.
    Subquery {
        query: Arc<SelectStatement>,
        alias: Option<String>,
        span: Span,
    },
    /// Parenthesized join: `(a JOIN b ...)`.
    ParenJoin { inner: Arc<FromClause>, span: Span },
}

impl TableOrSubquery {
    /// Return the source span of this table source.
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Table { span, .. }
            | Self::Subquery { span, .. }
            | Self::ParenJoin { span, .. } => *span,
        }
    }
}

/// A JOIN clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinClause {
    pub join_type: JoinType,
    /// The right-hand table source.
    pub table: TableOrSubquery,
    /// Join constraint (ON or USING); absent for CROSS joins.
    pub constraint: Option<JoinConstraint>,
    pub span: Span,
}

/// The kind of join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    Cross,
    Inner,
    Left,
    Right,
    Full,
}

impl JoinType {
    /// True for joins that emit unmatched rows padded with NULLs.
    #[must_use]
    pub const fn is_outer(self) -> bool {
        matches!(self, Self::Left | Self::Right | Self::Full)
    }
}

/// Join constraint: ON expression or USING column list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JoinConstraint {
    On(Arc<Expr>),
    Using(Vec<String>),
}

/// ORDER BY term. Its extent is its expression's, so it carries no span of
/// its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderingTerm {
    pub expr: Arc<Expr>,
    pub direction: Option<SortDirection>,
    pub nulls: Option<NullsOrder>,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// NULLS ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NullsOrder {
    First,
    Last,
}

/// LIMIT clause: `LIMIT expr [OFFSET expr]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitClause {
    pub limit: Arc<Expr>,
    pub offset: Option<Arc<Expr>>,
    pub span: Span,
}

// ---------------------------------------------------------------------------
// INSERT statement
// ---------------------------------------------------------------------------

/// An INSERT statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertStatement {
    /// Target table name.
    pub table: QualifiedName,
    /// Optional column name list.
    pub columns: Vec<String>,
    /// The source of rows.
    pub source: InsertSource,
    pub span: Span,
}

/// Source of rows for INSERT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InsertSource {
    /// `VALUES (row), (row), ...`
    Values(Vec<Vec<Arc<Expr>>>),
    /// `SELECT ...`
    Select(Arc<SelectStatement>),
}

// ---------------------------------------------------------------------------
// UPDATE / DELETE statements
// ---------------------------------------------------------------------------

/// An UPDATE statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStatement {
    pub table: QualifiedName,
    /// SET assignments in source order.
    pub assignments: Vec<Assignment>,
    pub where_clause: Option<Arc<Expr>>,
    pub span: Span,
}

/// One `column = expr` in an UPDATE SET clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub column: ColumnRef,
    pub value: Arc<Expr>,
    pub span: Span,
}

/// A DELETE statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteStatement {
    pub table: QualifiedName,
    pub where_clause: Option<Arc<Expr>>,
    pub span: Span,
}

// ---------------------------------------------------------------------------
// DDL statements
// ---------------------------------------------------------------------------

/// A CREATE TABLE statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTableStatement {
    pub name: QualifiedName,
    pub if_not_exists: bool,
    pub body: CreateTableBody,
    pub span: Span,
}

/// Body of a CREATE TABLE: column definitions or `AS SELECT`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CreateTableBody {
    Columns(Vec<ColumnDef>),
    AsSelect(Arc<SelectStatement>),
}

/// A column definition in CREATE TABLE or ALTER TABLE ADD COLUMN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub type_name: TypeName,
    pub not_null: bool,
    pub primary_key: bool,
    pub unique: bool,
    pub default: Option<Arc<Expr>>,
    pub span: Span,
}

/// A DROP TABLE statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropTableStatement {
    pub name: QualifiedName,
    pub if_exists: bool,
    pub span: Span,
}

/// An ALTER TABLE statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlterTableStatement {
    pub name: QualifiedName,
    pub action: AlterTableAction,
    pub span: Span,
}

/// The single action of an ALTER TABLE statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AlterTableAction {
    AddColumn(ColumnDef),
    DropColumn(String),
    RenameColumn { from: String, to: String },
    RenameTable { to: QualifiedName },
}

/// A TRUNCATE TABLE statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TruncateStatement {
    pub name: QualifiedName,
    pub span: Span,
}

/// A USE statement selecting the active database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UseStatement {
    pub database: String,
    pub span: Span,
}
