//! Node-model invariant checks.
//!
//! [`validate`] rejects trees that violate the construction contract:
//! required sequences that are empty (a select list with zero items, a
//! VALUES clause with no rows) and child spans escaping their parent's span.
//! The builder runs it on every finished statement, so a malformed tree is
//! refused at construction rather than surfacing later as a confusing
//! traversal result.
//!
//! The checker itself is an ordinary [`Visitor`] pass: each node inspects
//! its own direct child slots, so the whole tree is covered in one walk.

use thiserror::Error;

use crate::visit::{traverse, Flow, Order, Traversal, Visitor};
use crate::{
    CreateTableBody, Expr, FromClause, InSet, InsertSource, JoinConstraint, SelectCore,
    SelectStatement, Span, Statement,
};

/// A node was constructed with missing or invalid required slots.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedNodeError {
    /// A sequence slot that must hold at least one element is empty.
    #[error("{node}: required sequence `{slot}` is empty")]
    EmptySequence {
        node: &'static str,
        slot: &'static str,
        span: Span,
    },

    /// A child's span is not contained in its parent's span.
    #[error("child span {child} escapes parent span {parent}")]
    SpanEscape { parent: Span, child: Span },
}

/// Check a statement tree against the node-model invariants.
///
/// Returns the first violation found, in traversal order.
pub fn validate(stmt: &Statement) -> Result<(), MalformedNodeError> {
    let mut checker = Checker { error: None };
    let outcome = traverse(stmt, &mut checker, Order::Pre);
    match checker.error {
        Some(err) => Err(err),
        None => {
            debug_assert_eq!(outcome, Traversal::Complete);
            Ok(())
        }
    }
}

/// Span containment, with synthetic spans exempt on either side.
fn check_within(parent: Span, child: Span) -> Result<(), MalformedNodeError> {
    if parent.is_synthetic() || child.is_synthetic() || parent.contains(child) {
        Ok(())
    } else {
        Err(MalformedNodeError::SpanEscape { parent, child })
    }
}

struct Checker {
    error: Option<MalformedNodeError>,
}

impl Checker {
    fn fail(&mut self, err: MalformedNodeError) -> Flow {
        self.error = Some(err);
        Flow::Stop
    }

    fn check(&mut self, result: Result<(), MalformedNodeError>) -> Flow {
        match result {
            Ok(()) => Flow::Continue,
            Err(err) => self.fail(err),
        }
    }
}

impl Visitor for Checker {
    fn visit_statement(&mut self, stmt: &Statement) -> Flow {
        match stmt {
            Statement::Insert(s) => {
                if let InsertSource::Values(rows) = &s.source {
                    if rows.is_empty() {
                        return self.fail(MalformedNodeError::EmptySequence {
                            node: "InsertStatement",
                            slot: "rows",
                            span: s.span,
                        });
                    }
                    if rows.iter().any(Vec::is_empty) {
                        return self.fail(MalformedNodeError::EmptySequence {
                            node: "InsertStatement",
                            slot: "row",
                            span: s.span,
                        });
                    }
                }
            }
            Statement::Update(s) => {
                if s.assignments.is_empty() {
                    return self.fail(MalformedNodeError::EmptySequence {
                        node: "UpdateStatement",
                        slot: "assignments",
                        span: s.span,
                    });
                }
                for assignment in &s.assignments {
                    if let Flow::Stop =
                        self.check(check_within(s.span, assignment.span))
                    {
                        return Flow::Stop;
                    }
                }
            }
            Statement::CreateTable(s) => {
                if let CreateTableBody::Columns(cols) = &s.body {
                    if cols.is_empty() {
                        return self.fail(MalformedNodeError::EmptySequence {
                            node: "CreateTableStatement",
                            slot: "columns",
                            span: s.span,
                        });
                    }
                }
            }
            _ => {}
        }
        Flow::Continue
    }

    fn visit_select(&mut self, stmt: &SelectStatement) -> Flow {
        if let Some(with) = &stmt.with {
            if with.ctes.is_empty() {
                return self.fail(MalformedNodeError::EmptySequence {
                    node: "WithClause",
                    slot: "ctes",
                    span: with.span,
                });
            }
            if let Flow::Stop = self.check(check_within(stmt.span, with.span)) {
                return Flow::Stop;
            }
        }
        self.check(check_within(stmt.span, stmt.body.select.span()))
    }

    fn visit_select_core(&mut self, core: &SelectCore) -> Flow {
        match core {
            SelectCore::Select {
                columns,
                from,
                where_clause,
                span,
                ..
            } => {
                if columns.is_empty() {
                    return self.fail(MalformedNodeError::EmptySequence {
                        node: "SelectCore",
                        slot: "columns",
                        span: *span,
                    });
                }
                if let Some(from_clause) = from {
                    if let Flow::Stop = self.check(check_within(*span, from_clause.span)) {
                        return Flow::Stop;
                    }
                }
                if let Some(w) = where_clause {
                    if let Flow::Stop = self.check(check_within(*span, w.span())) {
                        return Flow::Stop;
                    }
                }
                Flow::Continue
            }
            SelectCore::Values { rows, span } => {
                if rows.is_empty() || rows.iter().any(Vec::is_empty) {
                    return self.fail(MalformedNodeError::EmptySequence {
                        node: "SelectCore",
                        slot: "rows",
                        span: *span,
                    });
                }
                Flow::Continue
            }
        }
    }

    fn visit_from_clause(&mut self, from: &FromClause) -> Flow {
        if let Flow::Stop = self.check(check_within(from.span, from.source.span())) {
            return Flow::Stop;
        }
        for join in &from.joins {
            if let Flow::Stop = self.check(check_within(from.span, join.span)) {
                return Flow::Stop;
            }
            if let Flow::Stop = self.check(check_within(join.span, join.table.span())) {
                return Flow::Stop;
            }
            if let Some(JoinConstraint::On(expr)) = &join.constraint {
                if let Flow::Stop = self.check(check_within(join.span, expr.span())) {
                    return Flow::Stop;
                }
            }
        }
        Flow::Continue
    }

    fn visit_expr(&mut self, expr: &Expr) -> Flow {
        // Required sequences inside expressions.
        match expr {
            Expr::In {
                set: InSet::List(items),
                span,
                ..
            } if items.is_empty() => {
                return self.fail(MalformedNodeError::EmptySequence {
                    node: "Expr::In",
                    slot: "list",
                    span: *span,
                });
            }
            Expr::Case { whens, span, .. } if whens.is_empty() => {
                return self.fail(MalformedNodeError::EmptySequence {
                    node: "Expr::Case",
                    slot: "whens",
                    span: *span,
                });
            }
            _ => {}
        }
        // Direct expression children stay inside the parent's extent.
        let parent = expr.span();
        let mut children: Vec<Span> = Vec::new();
        match expr {
            Expr::Paren(inner, _) => children.push(inner.span()),
            Expr::BinaryOp { left, right, .. } => {
                children.push(left.span());
                children.push(right.span());
            }
            Expr::UnaryOp { expr: inner, .. }
            | Expr::Cast { expr: inner, .. }
            | Expr::IsNull { expr: inner, .. } => children.push(inner.span()),
            Expr::Between {
                expr: inner,
                low,
                high,
                ..
            } => {
                children.push(inner.span());
                children.push(low.span());
                children.push(high.span());
            }
            Expr::Like {
                expr: inner,
                pattern,
                escape,
                ..
            } => {
                children.push(inner.span());
                children.push(pattern.span());
                if let Some(esc) = escape {
                    children.push(esc.span());
                }
            }
            _ => {}
        }
        for child in children {
            if let Flow::Stop = self.check(check_within(parent, child)) {
                return Flow::Stop;
            }
        }
        Flow::Continue
    }
}
