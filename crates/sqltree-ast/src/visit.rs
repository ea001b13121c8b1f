//! Generic read-only traversal over the node catalog.
//!
//! A pass implements [`Visitor`], overriding only the hooks it cares about;
//! every hook defaults to [`Flow::Continue`], so partial handler sets are
//! legal and new analyses never re-implement tree-walking. [`traverse`]
//! drives the walk in pre- or post-order, visiting child slots in their
//! declaration order — passes that report in source order rely on this.
//!
//! Control is explicit: a hook returns [`Flow::SkipChildren`] to prune a
//! subtree or [`Flow::Stop`] to abort the whole traversal. Both are ordinary
//! return values, never errors.

use crate::{
    Assignment, ColumnDef, CreateTableBody, Cte, Expr, FromClause, FunctionArgs, InSet,
    InsertSource, JoinClause, JoinConstraint, OrderingTerm, ResultColumn, SelectCore,
    SelectStatement, Statement, TableOrSubquery,
};

/// Control signal returned by every visitor hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep going: visit this node's children, then its siblings.
    Continue,
    /// Do not descend into this node's children. Honored in pre-order; a
    /// no-op in post-order, where children have already been visited.
    SkipChildren,
    /// Abort the entire traversal.
    Stop,
}

/// Traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Parents before children (the default for most passes).
    Pre,
    /// Children before parents, for analyses that need children resolved
    /// first.
    Post,
}

/// How a traversal ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    /// Every reachable node was visited.
    Complete,
    /// A hook returned [`Flow::Stop`].
    Stopped,
}

/// Per-discriminant hooks. All default to no-op continue.
#[allow(unused_variables)]
pub trait Visitor {
    fn visit_statement(&mut self, stmt: &Statement) -> Flow {
        Flow::Continue
    }
    fn visit_select(&mut self, stmt: &SelectStatement) -> Flow {
        Flow::Continue
    }
    fn visit_cte(&mut self, cte: &Cte) -> Flow {
        Flow::Continue
    }
    fn visit_select_core(&mut self, core: &SelectCore) -> Flow {
        Flow::Continue
    }
    fn visit_result_column(&mut self, col: &ResultColumn) -> Flow {
        Flow::Continue
    }
    fn visit_from_clause(&mut self, from: &FromClause) -> Flow {
        Flow::Continue
    }
    fn visit_table_ref(&mut self, table: &TableOrSubquery) -> Flow {
        Flow::Continue
    }
    fn visit_join(&mut self, join: &JoinClause) -> Flow {
        Flow::Continue
    }
    fn visit_ordering_term(&mut self, term: &OrderingTerm) -> Flow {
        Flow::Continue
    }
    fn visit_expr(&mut self, expr: &Expr) -> Flow {
        Flow::Continue
    }
    fn visit_assignment(&mut self, assignment: &Assignment) -> Flow {
        Flow::Continue
    }
    fn visit_column_def(&mut self, def: &ColumnDef) -> Flow {
        Flow::Continue
    }
}

/// Traverse a statement tree, invoking `visitor`'s hooks in `order`.
pub fn traverse<V: Visitor>(stmt: &Statement, visitor: &mut V, order: Order) -> Traversal {
    match walk_statement(stmt, visitor, order) {
        Flow::Stop => Traversal::Stopped,
        _ => Traversal::Complete,
    }
}

// Propagate Stop out of a child walk.
macro_rules! walk {
    ($e:expr) => {
        if matches!($e, Flow::Stop) {
            return Flow::Stop;
        }
    };
}

// Run the node's own hook before its children (pre-order).
macro_rules! enter {
    ($order:expr, $call:expr) => {
        if $order == Order::Pre {
            match $call {
                Flow::Stop => return Flow::Stop,
                Flow::SkipChildren => return Flow::Continue,
                Flow::Continue => {}
            }
        }
    };
}

// Run the node's own hook after its children (post-order).
macro_rules! leave {
    ($order:expr, $call:expr) => {
        if $order == Order::Post && matches!($call, Flow::Stop) {
            return Flow::Stop;
        }
    };
}

/// Walk one statement. Child slots are visited in declaration order.
pub fn walk_statement<V: Visitor>(stmt: &Statement, v: &mut V, order: Order) -> Flow {
    enter!(order, v.visit_statement(stmt));
    match stmt {
        Statement::Select(s) => walk!(walk_select(s, v, order)),
        Statement::Insert(s) => match &s.source {
            InsertSource::Values(rows) => {
                for row in rows {
                    for expr in row {
                        walk!(walk_expr(expr, v, order));
                    }
                }
            }
            InsertSource::Select(query) => walk!(walk_select(query, v, order)),
        },
        Statement::Update(s) => {
            for assignment in &s.assignments {
                walk!(walk_assignment(assignment, v, order));
            }
            if let Some(w) = &s.where_clause {
                walk!(walk_expr(w, v, order));
            }
        }
        Statement::Delete(s) => {
            if let Some(w) = &s.where_clause {
                walk!(walk_expr(w, v, order));
            }
        }
        Statement::CreateTable(s) => match &s.body {
            CreateTableBody::Columns(cols) => {
                for def in cols {
                    walk!(walk_column_def(def, v, order));
                }
            }
            CreateTableBody::AsSelect(query) => walk!(walk_select(query, v, order)),
        },
        Statement::AlterTable(s) => {
            if let crate::AlterTableAction::AddColumn(def) = &s.action {
                walk!(walk_column_def(def, v, order));
            }
        }
        Statement::DropTable(_)
        | Statement::Truncate(_)
        | Statement::Use(_) => {}
        Statement::Explain { stmt: inner, .. } => walk!(walk_statement(inner, v, order)),
    }
    leave!(order, v.visit_statement(stmt));
    Flow::Continue
}

/// Walk a SELECT statement: WITH, body cores, ORDER BY, LIMIT.
pub fn walk_select<V: Visitor>(stmt: &SelectStatement, v: &mut V, order: Order) -> Flow {
    enter!(order, v.visit_select(stmt));
    if let Some(with) = &stmt.with {
        for cte in &with.ctes {
            walk!(walk_cte(cte, v, order));
        }
    }
    walk!(walk_select_core(&stmt.body.select, v, order));
    for (_, core) in &stmt.body.compounds {
        walk!(walk_select_core(core, v, order));
    }
    for term in &stmt.order_by {
        walk!(walk_ordering_term(term, v, order));
    }
    if let Some(limit) = &stmt.limit {
        walk!(walk_expr(&limit.limit, v, order));
        if let Some(offset) = &limit.offset {
            walk!(walk_expr(offset, v, order));
        }
    }
    leave!(order, v.visit_select(stmt));
    Flow::Continue
}

pub fn walk_cte<V: Visitor>(cte: &Cte, v: &mut V, order: Order) -> Flow {
    enter!(order, v.visit_cte(cte));
    walk!(walk_select(&cte.query, v, order));
    leave!(order, v.visit_cte(cte));
    Flow::Continue
}

pub fn walk_select_core<V: Visitor>(core: &SelectCore, v: &mut V, order: Order) -> Flow {
    enter!(order, v.visit_select_core(core));
    match core {
        SelectCore::Select {
            columns,
            from,
            where_clause,
            group_by,
            having,
            ..
        } => {
            for col in columns {
                walk!(walk_result_column(col, v, order));
            }
            if let Some(from_clause) = from {
                walk!(walk_from_clause(from_clause, v, order));
            }
            if let Some(w) = where_clause {
                walk!(walk_expr(w, v, order));
            }
            for expr in group_by {
                walk!(walk_expr(expr, v, order));
            }
            if let Some(h) = having {
                walk!(walk_expr(h, v, order));
            }
        }
        SelectCore::Values { rows, .. } => {
            for row in rows {
                for expr in row {
                    walk!(walk_expr(expr, v, order));
                }
            }
        }
    }
    leave!(order, v.visit_select_core(core));
    Flow::Continue
}

pub fn walk_result_column<V: Visitor>(col: &ResultColumn, v: &mut V, order: Order) -> Flow {
    enter!(order, v.visit_result_column(col));
    if let ResultColumn::Expr { expr, .. } = col {
        walk!(walk_expr(expr, v, order));
    }
    leave!(order, v.visit_result_column(col));
    Flow::Continue
}

pub fn walk_from_clause<V: Visitor>(from: &FromClause, v: &mut V, order: Order) -> Flow {
    enter!(order, v.visit_from_clause(from));
    walk!(walk_table_ref(&from.source, v, order));
    for join in &from.joins {
        walk!(walk_join(join, v, order));
    }
    leave!(order, v.visit_from_clause(from));
    Flow::Continue
}

pub fn walk_table_ref<V: Visitor>(table: &TableOrSubquery, v: &mut V, order: Order) -> Flow {
    enter!(order, v.visit_table_ref(table));
    match table {
        TableOrSubquery::Table { .. } => {}
        TableOrSubquery::Subquery { query, .. } => walk!(walk_select(query, v, order)),
        TableOrSubquery::ParenJoin { inner, .. } => walk!(walk_from_clause(inner, v, order)),
    }
    leave!(order, v.visit_table_ref(table));
    Flow::Continue
}

pub fn walk_join<V: Visitor>(join: &JoinClause, v: &mut V, order: Order) -> Flow {
    enter!(order, v.visit_join(join));
    walk!(walk_table_ref(&join.table, v, order));
    if let Some(JoinConstraint::On(expr)) = &join.constraint {
        walk!(walk_expr(expr, v, order));
    }
    leave!(order, v.visit_join(join));
    Flow::Continue
}

pub fn walk_ordering_term<V: Visitor>(term: &OrderingTerm, v: &mut V, order: Order) -> Flow {
    enter!(order, v.visit_ordering_term(term));
    walk!(walk_expr(&term.expr, v, order));
    leave!(order, v.visit_ordering_term(term));
    Flow::Continue
}

pub fn walk_assignment<V: Visitor>(assignment: &Assignment, v: &mut V, order: Order) -> Flow {
    enter!(order, v.visit_assignment(assignment));
    walk!(walk_expr(&assignment.value, v, order));
    leave!(order, v.visit_assignment(assignment));
    Flow::Continue
}

pub fn walk_column_def<V: Visitor>(def: &ColumnDef, v: &mut V, order: Order) -> Flow {
    enter!(order, v.visit_column_def(def));
    if let Some(default) = &def.default {
        walk!(walk_expr(default, v, order));
    }
    leave!(order, v.visit_column_def(def));
    Flow::Continue
}

/// Walk one expression. Child slots in declaration order.
#[allow(clippy::too_many_lines)]
pub fn walk_expr<V: Visitor>(expr: &Expr, v: &mut V, order: Order) -> Flow {
    enter!(order, v.visit_expr(expr));
    match expr {
        Expr::Literal(..) | Expr::Column(..) => {}
        Expr::Paren(inner, _) => walk!(walk_expr(inner, v, order)),
        Expr::BinaryOp { left, right, .. } => {
            walk!(walk_expr(left, v, order));
            walk!(walk_expr(right, v, order));
        }
        Expr::UnaryOp { expr: inner, .. } => walk!(walk_expr(inner, v, order)),
        Expr::Between {
            expr: inner,
            low,
            high,
            ..
        } => {
            walk!(walk_expr(inner, v, order));
            walk!(walk_expr(low, v, order));
            walk!(walk_expr(high, v, order));
        }
        Expr::In {
            expr: inner, set, ..
        } => {
            walk!(walk_expr(inner, v, order));
            match set {
                InSet::List(items) => {
                    for item in items {
                        walk!(walk_expr(item, v, order));
                    }
                }
                InSet::Subquery(query) => walk!(walk_select(query, v, order)),
            }
        }
        Expr::Like {
            expr: inner,
            pattern,
            escape,
            ..
        } => {
            walk!(walk_expr(inner, v, order));
            walk!(walk_expr(pattern, v, order));
            if let Some(esc) = escape {
                walk!(walk_expr(esc, v, order));
            }
        }
        Expr::Case {
            operand,
            whens,
            else_expr,
            ..
        } => {
            if let Some(op) = operand {
                walk!(walk_expr(op, v, order));
            }
            for (cond, then) in whens {
                walk!(walk_expr(cond, v, order));
                walk!(walk_expr(then, v, order));
            }
            if let Some(el) = else_expr {
                walk!(walk_expr(el, v, order));
            }
        }
        Expr::Cast { expr: inner, .. } => walk!(walk_expr(inner, v, order)),
        Expr::Exists { subquery, .. } => walk!(walk_select(subquery, v, order)),
        Expr::Subquery(query, _) => walk!(walk_select(query, v, order)),
        Expr::FunctionCall { args, .. } => {
            if let FunctionArgs::List(items) = args {
                for item in items {
                    walk!(walk_expr(item, v, order));
                }
            }
        }
        Expr::IsNull { expr: inner, .. } => walk!(walk_expr(inner, v, order)),
    }
    leave!(order, v.visit_expr(expr));
    Flow::Continue
}
