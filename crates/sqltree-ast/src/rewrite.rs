//! Copy-on-rewrite transformation over immutable trees.
//!
//! A pass implements [`Rewriter`], returning `Some(replacement)` from a hook
//! to swap a node out or `None` to leave it alone. [`rewrite`] rebuilds only
//! the path from each replaced node up to the root; every untouched
//! `Arc`-linked subtree is carried over by reference, so the result shares
//! structure with the input (observable through `Arc::ptr_eq`). The input
//! tree is never mutated — concurrent readers of the original are safe while
//! a rewrite runs.
//!
//! A replacement subtree is adopted as-is and not re-entered, which keeps a
//! rewrite O(tree) in the worst case and makes termination obvious.

use std::sync::Arc;

use crate::{
    AlterTableAction, AlterTableStatement, Assignment, ColumnDef, CreateTableBody,
    CreateTableStatement, Cte, DeleteStatement, Expr, FromClause, FunctionArgs, InSet,
    InsertSource, InsertStatement, JoinClause, JoinConstraint, LimitClause, OrderingTerm,
    ResultColumn, SelectBody, SelectCore, SelectStatement, Statement, TableOrSubquery,
    UpdateStatement, WithClause,
};

/// Per-discriminant rewrite hooks. All default to "unchanged".
#[allow(unused_variables)]
pub trait Rewriter {
    fn rewrite_statement(&mut self, stmt: &Statement) -> Option<Statement> {
        None
    }
    fn rewrite_select(&mut self, stmt: &SelectStatement) -> Option<SelectStatement> {
        None
    }
    fn rewrite_table_ref(&mut self, table: &TableOrSubquery) -> Option<TableOrSubquery> {
        None
    }
    fn rewrite_expr(&mut self, expr: &Expr) -> Option<Expr> {
        None
    }
}

/// Rewrite a statement tree, returning the (possibly shared) new root.
///
/// If no hook fires, the result is a shallow clone of the root whose
/// `Arc`-linked children are all shared with the input.
pub fn rewrite<R: Rewriter>(stmt: &Statement, rewriter: &mut R) -> Statement {
    rw_statement(stmt, rewriter).unwrap_or_else(|| stmt.clone())
}

// Every rw_* helper returns None when the subtree is untouched, so parents
// can share the original instead of rebuilding.

fn rw_statement<R: Rewriter>(stmt: &Statement, r: &mut R) -> Option<Statement> {
    if let Some(new) = r.rewrite_statement(stmt) {
        return Some(new);
    }
    match stmt {
        Statement::Select(s) => rw_select(s, r).map(Statement::Select),
        Statement::Insert(s) => rw_insert(s, r).map(Statement::Insert),
        Statement::Update(s) => rw_update(s, r).map(Statement::Update),
        Statement::Delete(s) => rw_delete(s, r).map(Statement::Delete),
        Statement::CreateTable(s) => rw_create_table(s, r).map(Statement::CreateTable),
        Statement::AlterTable(s) => rw_alter_table(s, r).map(Statement::AlterTable),
        Statement::DropTable(_) | Statement::Truncate(_) | Statement::Use(_) => None,
        Statement::Explain { stmt: inner, span } => {
            rw_statement(inner, r).map(|new| Statement::Explain {
                stmt: Box::new(new),
                span: *span,
            })
        }
    }
}

fn rw_select<R: Rewriter>(stmt: &SelectStatement, r: &mut R) -> Option<SelectStatement> {
    if let Some(new) = r.rewrite_select(stmt) {
        return Some(new);
    }
    let with = rw_with(&stmt.with, r);
    let select = rw_core(&stmt.body.select, r);
    let compounds = rw_compounds(&stmt.body.compounds, r);
    let order_by = rw_ordering_terms(&stmt.order_by, r);
    let limit = rw_limit(&stmt.limit, r);
    if with.is_none()
        && select.is_none()
        && compounds.is_none()
        && order_by.is_none()
        && limit.is_none()
    {
        return None;
    }
    Some(SelectStatement {
        with: with.unwrap_or_else(|| stmt.with.clone()),
        body: SelectBody {
            select: select.unwrap_or_else(|| stmt.body.select.clone()),
            compounds: compounds.unwrap_or_else(|| stmt.body.compounds.clone()),
        },
        order_by: order_by.unwrap_or_else(|| stmt.order_by.clone()),
        limit: limit.unwrap_or_else(|| stmt.limit.clone()),
        span: stmt.span,
    })
}

fn rw_select_arc<R: Rewriter>(
    query: &Arc<SelectStatement>,
    r: &mut R,
) -> Option<Arc<SelectStatement>> {
    rw_select(query, r).map(Arc::new)
}

fn rw_with<R: Rewriter>(with: &Option<WithClause>, r: &mut R) -> Option<Option<WithClause>> {
    let with = with.as_ref()?;
    let mut changed = false;
    let mut ctes = Vec::with_capacity(with.ctes.len());
    for cte in &with.ctes {
        match rw_select_arc(&cte.query, r) {
            Some(query) => {
                changed = true;
                ctes.push(Cte {
                    name: cte.name.clone(),
                    columns: cte.columns.clone(),
                    query,
                    span: cte.span,
                });
            }
            None => ctes.push(cte.clone()),
        }
    }
    changed.then(|| {
        Some(WithClause {
            recursive: with.recursive,
            ctes,
            span: with.span,
        })
    })
}

fn rw_core<R: Rewriter>(core: &SelectCore, r: &mut R) -> Option<SelectCore> {
    match core {
        SelectCore::Select {
            distinct,
            columns,
            from,
            where_clause,
            group_by,
            having,
            span,
        } => {
            let new_columns = rw_result_columns(columns, r);
            let new_from = match from {
                Some(fc) => rw_from_arc(fc, r).map(Some),
                None => None,
            };
            let new_where = rw_opt_expr(where_clause, r);
            let new_group_by = rw_expr_vec(group_by, r);
            let new_having = rw_opt_expr(having, r);
            if new_columns.is_none()
                && new_from.is_none()
                && new_where.is_none()
                && new_group_by.is_none()
                && new_having.is_none()
            {
                return None;
            }
            Some(SelectCore::Select {
                distinct: *distinct,
                columns: new_columns.unwrap_or_else(|| columns.clone()),
                from: new_from.unwrap_or_else(|| from.clone()),
                where_clause: new_where.unwrap_or_else(|| where_clause.clone()),
                group_by: new_group_by.unwrap_or_else(|| group_by.clone()),
                having: new_having.unwrap_or_else(|| having.clone()),
                span: *span,
            })
        }
        SelectCore::Values { rows, span } => rw_rows(rows, r).map(|rows| SelectCore::Values {
            rows,
            span: *span,
        }),
    }
}

fn rw_compounds<R: Rewriter>(
    compounds: &[(crate::CompoundOp, SelectCore)],
    r: &mut R,
) -> Option<Vec<(crate::CompoundOp, SelectCore)>> {
    let mut changed = false;
    let mut out = Vec::with_capacity(compounds.len());
    for (op, core) in compounds {
        match rw_core(core, r) {
            Some(new) => {
                changed = true;
                out.push((*op, new));
            }
            None => out.push((*op, core.clone())),
        }
    }
    changed.then_some(out)
}

fn rw_result_columns<R: Rewriter>(
    columns: &[ResultColumn],
    r: &mut R,
) -> Option<Vec<ResultColumn>> {
    let mut changed = false;
    let mut out = Vec::with_capacity(columns.len());
    for col in columns {
        match col {
            ResultColumn::Expr { expr, alias } => match rw_expr(expr, r) {
                Some(new) => {
                    changed = true;
                    out.push(ResultColumn::Expr {
                        expr: new,
                        alias: alias.clone(),
                    });
                }
                None => out.push(col.clone()),
            },
            _ => out.push(col.clone()),
        }
    }
    changed.then_some(out)
}

fn rw_from_arc<R: Rewriter>(from: &Arc<FromClause>, r: &mut R) -> Option<Arc<FromClause>> {
    let source = rw_table_ref(&from.source, r);
    let joins = rw_joins(&from.joins, r);
    if source.is_none() && joins.is_none() {
        return None;
    }
    Some(Arc::new(FromClause {
        source: source.unwrap_or_else(|| from.source.clone()),
        joins: joins.unwrap_or_else(|| from.joins.clone()),
        span: from.span,
    }))
}

fn rw_table_ref<R: Rewriter>(table: &TableOrSubquery, r: &mut R) -> Option<TableOrSubquery> {
    if let Some(new) = r.rewrite_table_ref(table) {
        return Some(new);
    }
    match table {
        TableOrSubquery::Table { .. } => None,
        TableOrSubquery::Subquery { query, alias, span } => {
            rw_select_arc(query, r).map(|query| TableOrSubquery::Subquery {
                query,
                alias: alias.clone(),
                span: *span,
            })
        }
        TableOrSubquery::ParenJoin { inner, span } => {
            rw_from_arc(inner, r).map(|inner| TableOrSubquery::ParenJoin {
                inner,
                span: *span,
            })
        }
    }
}

fn rw_joins<R: Rewriter>(joins: &[JoinClause], r: &mut R) -> Option<Vec<JoinClause>> {
    let mut changed = false;
    let mut out = Vec::with_capacity(joins.len());
    for join in joins {
        let table = rw_table_ref(&join.table, r);
        let constraint = match &join.constraint {
            Some(JoinConstraint::On(expr)) => rw_expr(expr, r)
                .map(|new| Some(JoinConstraint::On(new))),
            _ => None,
        };
        if table.is_none() && constraint.is_none() {
            out.push(join.clone());
        } else {
            changed = true;
            out.push(JoinClause {
                join_type: join.join_type,
                table: table.unwrap_or_else(|| join.table.clone()),
                constraint: constraint.unwrap_or_else(|| join.constraint.clone()),
                span: join.span,
            });
        }
    }
    changed.then_some(out)
}

fn rw_ordering_terms<R: Rewriter>(
    terms: &[OrderingTerm],
    r: &mut R,
) -> Option<Vec<OrderingTerm>> {
    let mut changed = false;
    let mut out = Vec::with_capacity(terms.len());
    for term in terms {
        match rw_expr(&term.expr, r) {
            Some(expr) => {
                changed = true;
                out.push(OrderingTerm {
                    expr,
                    direction: term.direction,
                    nulls: term.nulls,
                });
            }
            None => out.push(term.clone()),
        }
    }
    changed.then_some(out)
}

fn rw_limit<R: Rewriter>(limit: &Option<LimitClause>, r: &mut R) -> Option<Option<LimitClause>> {
    let limit = limit.as_ref()?;
    let new_limit = rw_expr(&limit.limit, r);
    let new_offset = rw_opt_expr(&limit.offset, r);
    if new_limit.is_none() && new_offset.is_none() {
        return None;
    }
    Some(Some(LimitClause {
        limit: new_limit.unwrap_or_else(|| Arc::clone(&limit.limit)),
        offset: new_offset.unwrap_or_else(|| limit.offset.clone()),
        span: limit.span,
    }))
}

fn rw_insert<R: Rewriter>(stmt: &InsertStatement, r: &mut R) -> Option<InsertStatement> {
    let source = match &stmt.source {
        InsertSource::Values(rows) => rw_rows(rows, r).map(InsertSource::Values),
        InsertSource::Select(query) => rw_select_arc(query, r).map(InsertSource::Select),
    };
    source.map(|source| InsertStatement {
        table: stmt.table.clone(),
        columns: stmt.columns.clone(),
        source,
        span: stmt.span,
    })
}

fn rw_update<R: Rewriter>(stmt: &UpdateStatement, r: &mut R) -> Option<UpdateStatement> {
    let mut assignments_changed = false;
    let mut assignments = Vec::with_capacity(stmt.assignments.len());
    for assignment in &stmt.assignments {
        match rw_expr(&assignment.value, r) {
            Some(value) => {
                assignments_changed = true;
                assignments.push(Assignment {
                    column: assignment.column.clone(),
                    value,
                    span: assignment.span,
                });
            }
            None => assignments.push(assignment.clone()),
        }
    }
    let where_clause = rw_opt_expr(&stmt.where_clause, r);
    if !assignments_changed && where_clause.is_none() {
        return None;
    }
    Some(UpdateStatement {
        table: stmt.table.clone(),
        assignments,
        where_clause: where_clause.unwrap_or_else(|| stmt.where_clause.clone()),
        span: stmt.span,
    })
}

fn rw_delete<R: Rewriter>(stmt: &DeleteStatement, r: &mut R) -> Option<DeleteStatement> {
    rw_opt_expr(&stmt.where_clause, r).map(|where_clause| DeleteStatement {
        table: stmt.table.clone(),
        where_clause,
        span: stmt.span,
    })
}

fn rw_create_table<R: Rewriter>(
    stmt: &CreateTableStatement,
    r: &mut R,
) -> Option<CreateTableStatement> {
    let body = match &stmt.body {
        CreateTableBody::Columns(cols) => rw_column_defs(cols, r).map(CreateTableBody::Columns),
        CreateTableBody::AsSelect(query) => {
            rw_select_arc(query, r).map(CreateTableBody::AsSelect)
        }
    };
    body.map(|body| CreateTableStatement {
        name: stmt.name.clone(),
        if_not_exists: stmt.if_not_exists,
        body,
        span: stmt.span,
    })
}

fn rw_alter_table<R: Rewriter>(
    stmt: &AlterTableStatement,
    r: &mut R,
) -> Option<AlterTableStatement> {
    let AlterTableAction::AddColumn(def) = &stmt.action else {
        return None;
    };
    rw_column_def(def, r).map(|def| AlterTableStatement {
        name: stmt.name.clone(),
        action: AlterTableAction::AddColumn(def),
        span: stmt.span,
    })
}

fn rw_column_defs<R: Rewriter>(defs: &[ColumnDef], r: &mut R) -> Option<Vec<ColumnDef>> {
    let mut changed = false;
    let mut out = Vec::with_capacity(defs.len());
    for def in defs {
        match rw_column_def(def, r) {
            Some(new) => {
                changed = true;
                out.push(new);
            }
            None => out.push(def.clone()),
        }
    }
    changed.then_some(out)
}

fn rw_column_def<R: Rewriter>(def: &ColumnDef, r: &mut R) -> Option<ColumnDef> {
    rw_opt_expr(&def.default, r).map(|default| ColumnDef {
        name: def.name.clone(),
        type_name: def.type_name.clone(),
        not_null: def.not_null,
        primary_key: def.primary_key,
        unique: def.unique,
        default,
        span: def.span,
    })
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_lines)]
fn rw_expr<R: Rewriter>(expr: &Arc<Expr>, r: &mut R) -> Option<Arc<Expr>> {
    if let Some(new) = r.rewrite_expr(expr) {
        return Some(Arc::new(new));
    }
    let rebuilt = match &**expr {
        Expr::Literal(..) | Expr::Column(..) => return None,
        Expr::Paren(inner, span) => {
            let inner = rw_expr(inner, r)?;
            Expr::Paren(inner, *span)
        }
        Expr::BinaryOp {
            left,
            op,
            right,
            span,
        } => {
            let new_left = rw_expr(left, r);
            let new_right = rw_expr(right, r);
            if new_left.is_none() && new_right.is_none() {
                return None;
            }
            Expr::BinaryOp {
                left: new_left.unwrap_or_else(|| Arc::clone(left)),
                op: *op,
                right: new_right.unwrap_or_else(|| Arc::clone(right)),
                span: *span,
            }
        }
        Expr::UnaryOp { op, expr: inner, span } => {
            let inner = rw_expr(inner, r)?;
            Expr::UnaryOp {
                op: *op,
                expr: inner,
                span: *span,
            }
        }
        Expr::Between {
            expr: inner,
            low,
            high,
            not,
            span,
        } => {
            let new_inner = rw_expr(inner, r);
            let new_low = rw_expr(low, r);
            let new_high = rw_expr(high, r);
            if new_inner.is_none() && new_low.is_none() && new_high.is_none() {
                return None;
            }
            Expr::Between {
                expr: new_inner.unwrap_or_else(|| Arc::clone(inner)),
                low: new_low.unwrap_or_else(|| Arc::clone(low)),
                high: new_high.unwrap_or_else(|| Arc::clone(high)),
                not: *not,
                span: *span,
            }
        }
        Expr::In {
            expr: inner,
            set,
            not,
            span,
        } => {
            let new_inner = rw_expr(inner, r);
            let new_set = match set {
                InSet::List(items) => rw_expr_vec(items, r).map(InSet::List),
                InSet::Subquery(query) => rw_select_arc(query, r).map(InSet::Subquery),
            };
            if new_inner.is_none() && new_set.is_none() {
                return None;
            }
            Expr::In {
                expr: new_inner.unwrap_or_else(|| Arc::clone(inner)),
                set: new_set.unwrap_or_else(|| set.clone()),
                not: *not,
                span: *span,
            }
        }
        Expr::Like {
            expr: inner,
            pattern,
            escape,
            op,
            not,
            span,
        } => {
            let new_inner = rw_expr(inner, r);
            let new_pattern = rw_expr(pattern, r);
            let new_escape = rw_opt_expr(escape, r);
            if new_inner.is_none() && new_pattern.is_none() && new_escape.is_none() {
                return None;
            }
            Expr::Like {
                expr: new_inner.unwrap_or_else(|| Arc::clone(inner)),
                pattern: new_pattern.unwrap_or_else(|| Arc::clone(pattern)),
                escape: new_escape.unwrap_or_else(|| escape.clone()),
                op: *op,
                not: *not,
                span: *span,
            }
        }
        Expr::Case {
            operand,
            whens,
            else_expr,
            span,
        } => {
            let new_operand = rw_opt_expr(operand, r);
            let new_whens = rw_pairs(whens, r);
            let new_else = rw_opt_expr(else_expr, r);
            if new_operand.is_none() && new_whens.is_none() && new_else.is_none() {
                return None;
            }
            Expr::Case {
                operand: new_operand.unwrap_or_else(|| operand.clone()),
                whens: new_whens.unwrap_or_else(|| whens.clone()),
                else_expr: new_else.unwrap_or_else(|| else_expr.clone()),
                span: *span,
            }
        }
        Expr::Cast {
            expr: inner,
            type_name,
            span,
        } => {
            let inner = rw_expr(inner, r)?;
            Expr::Cast {
                expr: inner,
                type_name: type_name.clone(),
                span: *span,
            }
        }
        Expr::Exists {
            subquery,
            not,
            span,
        } => {
            let subquery = rw_select_arc(subquery, r)?;
            Expr::Exists {
                subquery,
                not: *not,
                span: *span,
            }
        }
        Expr::Subquery(query, span) => {
            let query = rw_select_arc(query, r)?;
            Expr::Subquery(query, *span)
        }
        Expr::FunctionCall {
            name,
            args,
            distinct,
            span,
        } => {
            let FunctionArgs::List(items) = args else {
                return None;
            };
            let items = rw_expr_vec(items, r)?;
            Expr::FunctionCall {
                name: name.clone(),
                args: FunctionArgs::List(items),
                distinct: *distinct,
                span: *span,
            }
        }
        Expr::IsNull {
            expr: inner,
            not,
            span,
        } => {
            let inner = rw_expr(inner, r)?;
            Expr::IsNull {
                expr: inner,
                not: *not,
                span: *span,
            }
        }
    };
    Some(Arc::new(rebuilt))
}

fn rw_opt_expr<R: Rewriter>(
    opt: &Option<Arc<Expr>>,
    r: &mut R,
) -> Option<Option<Arc<Expr>>> {
    rw_expr(opt.as_ref()?, r).map(Some)
}

fn rw_expr_vec<R: Rewriter>(items: &[Arc<Expr>], r: &mut R) -> Option<Vec<Arc<Expr>>> {
    let mut changed = false;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match rw_expr(item, r) {
            Some(new) => {
                changed = true;
                out.push(new);
            }
            None => out.push(Arc::clone(item)),
        }
    }
    changed.then_some(out)
}

fn rw_rows<R: Rewriter>(rows: &[Vec<Arc<Expr>>], r: &mut R) -> Option<Vec<Vec<Arc<Expr>>>> {
    let mut changed = false;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match rw_expr_vec(row, r) {
            Some(new) => {
                changed = true;
                out.push(new);
            }
            None => out.push(row.clone()),
        }
    }
    changed.then_some(out)
}

fn rw_pairs<R: Rewriter>(
    pairs: &[(Arc<Expr>, Arc<Expr>)],
    r: &mut R,
) -> Option<Vec<(Arc<Expr>, Arc<Expr>)>> {
    let mut changed = false;
    let mut out = Vec::with_capacity(pairs.len());
    for (a, b) in pairs {
        let new_a = rw_expr(a, r);
        let new_b = rw_expr(b, r);
        if new_a.is_none() && new_b.is_none() {
            out.push((Arc::clone(a), Arc::clone(b)));
        } else {
            changed = true;
            out.push((
                new_a.unwrap_or_else(|| Arc::clone(a)),
                new_b.unwrap_or_else(|| Arc::clone(b)),
            ));
        }
    }
    changed.then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BinaryOp, ColumnRef, Distinctness, Literal, QualifiedName, Span};

    fn sp() -> Span {
        Span::SYNTHETIC
    }

    fn col(name: &str) -> Arc<Expr> {
        Arc::new(Expr::Column(ColumnRef::bare(name), sp()))
    }

    fn int(n: i64) -> Arc<Expr> {
        Arc::new(Expr::Literal(Literal::Integer(n), sp()))
    }

    /// `SELECT * FROM t WHERE a = 1`
    fn sample() -> Statement {
        Statement::Select(SelectStatement {
            with: None,
            body: SelectBody {
                select: SelectCore::Select {
                    distinct: Distinctness::All,
                    columns: vec![ResultColumn::Star(sp())],
                    from: Some(Arc::new(FromClause {
                        source: TableOrSubquery::Table {
                            name: QualifiedName::bare("t"),
                            alias: None,
                            span: sp(),
                        },
                        joins: Vec::new(),
                        span: sp(),
                    })),
                    where_clause: Some(Arc::new(Expr::BinaryOp {
                        left: col("a"),
                        op: BinaryOp::Eq,
                        right: int(1),
                        span: sp(),
                    })),
                    group_by: Vec::new(),
                    having: None,
                    span: sp(),
                },
                compounds: Vec::new(),
            },
            order_by: Vec::new(),
            limit: None,
            span: sp(),
        })
    }

    fn from_of(stmt: &Statement) -> Arc<FromClause> {
        let Statement::Select(s) = stmt else {
            panic!("expected select")
        };
        let SelectCore::Select { from, .. } = &s.body.select else {
            panic!("expected select core")
        };
        Arc::clone(from.as_ref().unwrap())
    }

    /// Replaces the integer literal 1 with 2.
    struct OneToTwo;
    impl Rewriter for OneToTwo {
        fn rewrite_expr(&mut self, expr: &Expr) -> Option<Expr> {
            if matches!(expr, Expr::Literal(Literal::Integer(1), _)) {
                Some(Expr::Literal(Literal::Integer(2), sp()))
            } else {
                None
            }
        }
    }

    #[test]
    fn test_rewrite_replaces_literal_and_shares_from() {
        let stmt = sample();
        let before_from = from_of(&stmt);
        let result = rewrite(&stmt, &mut OneToTwo);
        assert_eq!(result.to_string(), "SELECT * FROM t WHERE a = 2");
        // The untouched FROM subtree is the same allocation.
        let after_from = from_of(&result);
        assert!(Arc::ptr_eq(&before_from, &after_from));
        // The input tree is unchanged.
        assert_eq!(stmt.to_string(), "SELECT * FROM t WHERE a = 1");
    }

    #[test]
    fn test_noop_rewrite_shares_everything() {
        struct Noop;
        impl Rewriter for Noop {}
        let stmt = sample();
        let before_from = from_of(&stmt);
        let result = rewrite(&stmt, &mut Noop);
        assert_eq!(result, stmt);
        assert!(Arc::ptr_eq(&before_from, &from_of(&result)));
    }

    #[test]
    fn test_rewrite_inside_subquery_shares_sibling_columns() {
        // SELECT x FROM (SELECT * FROM t WHERE a = 1) AS sub WHERE x = 9
        let inner = {
            let Statement::Select(s) = sample() else {
                unreachable!()
            };
            s
        };
        let sibling_where = Arc::new(Expr::BinaryOp {
            left: col("x"),
            op: BinaryOp::Eq,
            right: int(9),
            span: sp(),
        });
        let outer = Statement::Select(SelectStatement {
            with: None,
            body: SelectBody {
                select: SelectCore::Select {
                    distinct: Distinctness::All,
                    columns: vec![ResultColumn::Expr {
                        expr: col("x"),
                        alias: None,
                    }],
                    from: Some(Arc::new(FromClause {
                        source: TableOrSubquery::Subquery {
                            query: Arc::new(inner),
                            alias: Some("sub".to_owned()),
                            span: sp(),
                        },
                        joins: Vec::new(),
                        span: sp(),
                    })),
                    where_clause: Some(Arc::clone(&sibling_where)),
                    group_by: Vec::new(),
                    having: None,
                    span: sp(),
                },
                compounds: Vec::new(),
            },
            order_by: Vec::new(),
            limit: None,
            span: sp(),
        });

        let result = rewrite(&outer, &mut OneToTwo);
        assert_eq!(
            result.to_string(),
            "SELECT x FROM (SELECT * FROM t WHERE a = 2) AS sub WHERE x = 9"
        );
        // The outer WHERE was not on the rewrite path and is shared.
        let Statement::Select(s) = &result else {
            unreachable!()
        };
        let SelectCore::Select { where_clause, .. } = &s.body.select else {
            unreachable!()
        };
        assert!(Arc::ptr_eq(where_clause.as_ref().unwrap(), &sibling_where));
    }

    #[test]
    fn test_replacement_subtree_adopted_as_is() {
        // The replacement contains a 1, which must not be re-rewritten.
        struct WrapOnce {
            fired: bool,
        }
        impl Rewriter for WrapOnce {
            fn rewrite_expr(&mut self, expr: &Expr) -> Option<Expr> {
                if self.fired {
                    return None;
                }
                if matches!(expr, Expr::BinaryOp { .. }) {
                    self.fired = true;
                    Some(Expr::Paren(
                        Arc::new(expr.clone()),
                        Span::SYNTHETIC,
                    ))
                } else {
                    None
                }
            }
        }
        let stmt = sample();
        let result = rewrite(&stmt, &mut WrapOnce { fired: false });
        assert_eq!(result.to_string(), "SELECT * FROM t WHERE (a = 1)");
    }

    #[test]
    fn test_table_ref_rewrite() {
        struct RenameTable;
        impl Rewriter for RenameTable {
            fn rewrite_table_ref(&mut self, table: &TableOrSubquery) -> Option<TableOrSubquery> {
                let TableOrSubquery::Table { name, alias, span } = table else {
                    return None;
                };
                if name.name == "t" {
                    Some(TableOrSubquery::Table {
                        name: QualifiedName::bare("t_v2"),
                        alias: alias.clone(),
                        span: *span,
                    })
                } else {
                    None
                }
            }
        }
        let result = rewrite(&sample(), &mut RenameTable);
        assert_eq!(result.to_string(), "SELECT * FROM t_v2 WHERE a = 1");
    }
}
