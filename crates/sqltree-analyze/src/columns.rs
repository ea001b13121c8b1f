//! Column-reference collection with syntactic position tags.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqltree_ast::visit::{walk_expr, Flow, Order, Visitor};
use sqltree_ast::{
    ColumnRef, CreateTableBody, Expr, FromClause, InsertSource, JoinConstraint, ResultColumn,
    SelectCore, SelectStatement, Statement, TableOrSubquery,
};

/// The syntactic position a column reference appears in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnSite {
    /// The select list of a SELECT core.
    SelectList,
    /// A WHERE predicate.
    Predicate,
    /// A GROUP BY expression.
    GroupBy,
    /// A HAVING predicate.
    Having,
    /// An ORDER BY term.
    OrderBy,
    /// A join constraint (ON or USING).
    Join,
    /// An UPDATE SET target or value.
    Assignment,
    /// An INSERT column list.
    InsertColumns,
    /// A VALUES row expression.
    ValuesRow,
    /// A LIMIT or OFFSET expression.
    Limit,
}

/// One collected column reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnUse {
    pub column: ColumnRef,
    pub site: ColumnSite,
}

/// Collect every column reference in a statement, in source order, each
/// tagged with its syntactic position.
///
/// A subquery opens its own positions: a column in the select list of a
/// subquery nested inside a WHERE clause reports `SelectList`, not
/// `Predicate`.
#[must_use]
pub fn collect_columns(stmt: &Statement) -> Vec<ColumnUse> {
    let span = tracing::debug_span!(
        target: "sqltree.analyze",
        "collect_columns",
        columns_found = tracing::field::Empty,
    );
    let _guard = span.enter();

    let mut collector = ColumnCollector {
        out: Vec::new(),
        sites: Vec::new(),
    };
    collector.collect_statement(stmt);

    span.record("columns_found", collector.out.len() as u64);
    crate::record_column_refs(collector.out.len() as u64);
    collector.out
}

/// Clause-level walking is hand-driven here because the position tag depends
/// on which child slot an expression hangs off; expression subtrees are
/// walked by the engine with the site pinned.
struct ColumnCollector {
    out: Vec<ColumnUse>,
    sites: Vec<ColumnSite>,
}

impl ColumnCollector {
    fn record(&mut self, column: &ColumnRef) {
        if let Some(&site) = self.sites.last() {
            self.out.push(ColumnUse {
                column: column.clone(),
                site,
            });
        }
    }

    fn bare(&mut self, name: &str, site: ColumnSite) {
        self.out.push(ColumnUse {
            column: ColumnRef::bare(name),
            site,
        });
    }

    fn expr_site(&mut self, expr: &Arc<Expr>, site: ColumnSite) {
        self.sites.push(site);
        walk_expr(expr, self, Order::Pre);
        self.sites.pop();
    }

    fn collect_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Select(s) => self.collect_select(s),
            Statement::Insert(s) => {
                for col in &s.columns {
                    self.bare(col, ColumnSite::InsertColumns);
                }
                match &s.source {
                    InsertSource::Values(rows) => {
                        for row in rows {
                            for expr in row {
                                self.expr_site(expr, ColumnSite::ValuesRow);
                            }
                        }
                    }
                    InsertSource::Select(query) => self.collect_select(query),
                }
            }
            Statement::Update(s) => {
                for assignment in &s.assignments {
                    self.out.push(ColumnUse {
                        column: assignment.column.clone(),
                        site: ColumnSite::Assignment,
                    });
                    self.expr_site(&assignment.value, ColumnSite::Assignment);
                }
                if let Some(w) = &s.where_clause {
                    self.expr_site(w, ColumnSite::Predicate);
                }
            }
            Statement::Delete(s) => {
                if let Some(w) = &s.where_clause {
                    self.expr_site(w, ColumnSite::Predicate);
                }
            }
            Statement::CreateTable(s) => {
                if let CreateTableBody::AsSelect(query) = &s.body {
                    self.collect_select(query);
                }
            }
            Statement::Explain { stmt: inner, .. } => self.collect_statement(inner),
            _ => {}
        }
    }

    fn collect_select(&mut self, stmt: &SelectStatement) {
        if let Some(with) = &stmt.with {
            for cte in &with.ctes {
                self.collect_select(&cte.query);
            }
        }
        self.collect_core(&stmt.body.select);
        for (_, core) in &stmt.body.compounds {
            self.collect_core(core);
        }
        for term in &stmt.order_by {
            self.expr_site(&term.expr, ColumnSite::OrderBy);
        }
        if let Some(limit) = &stmt.limit {
            self.expr_site(&limit.limit, ColumnSite::Limit);
            if let Some(offset) = &limit.offset {
                self.expr_site(offset, ColumnSite::Limit);
            }
        }
    }

    fn collect_core(&mut self, core: &SelectCore) {
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
                    if let ResultColumn::Expr { expr, .. } = col {
                        self.expr_site(expr, ColumnSite::SelectList);
                    }
                }
                if let Some(from_clause) = from {
                    self.collect_from(from_clause);
                }
                if let Some(w) = where_clause {
                    self.expr_site(w, ColumnSite::Predicate);
                }
                for expr in group_by {
                    self.expr_site(expr, ColumnSite::GroupBy);
                }
                if let Some(h) = having {
                    self.expr_site(h, ColumnSite::Having);
                }
            }
            SelectCore::Values { rows, .. } => {
                for row in rows {
                    for expr in row {
                        self.expr_site(expr, ColumnSite::ValuesRow);
                    }
                }
            }
        }
    }

    fn collect_from(&mut self, from: &FromClause) {
        self.collect_table_ref(&from.source);
        for join in &from.joins {
            self.collect_table_ref(&join.table);
            match &join.constraint {
                Some(JoinConstraint::On(expr)) => self.expr_site(expr, ColumnSite::Join),
                Some(JoinConstraint::Using(cols)) => {
                    for col in cols {
                        self.bare(col, ColumnSite::Join);
                    }
                }
                None => {}
            }
        }
    }

    fn collect_table_ref(&mut self, table: &TableOrSubquery) {
        match table {
            TableOrSubquery::Table { .. } => {}
            TableOrSubquery::Subquery { query, .. } => self.collect_select(query),
            TableOrSubquery::ParenJoin { inner, .. } => self.collect_from(inner),
        }
    }
}

impl Visitor for ColumnCollector {
    fn visit_expr(&mut self, expr: &Expr) -> Flow {
        if let Expr::Column(column, _) = expr {
            self.record(column);
        }
        Flow::Continue
    }

    /// A subquery reached through an expression gets its own clause sites.
    fn visit_select(&mut self, stmt: &SelectStatement) -> Flow {
        self.collect_select(stmt);
        Flow::SkipChildren
    }
}
