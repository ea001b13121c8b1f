//! Property tests over generated expression trees: traversal totality,
//! no-op rewrite identity, and rendering determinism.

use std::sync::Arc;

use proptest::prelude::*;
use sqltree::{
    rewrite, traverse, validate, BinaryOp, ColumnRef, Distinctness, Expr, Flow, FromClause,
    Literal, Order, QualifiedName, ResultColumn, Rewriter, SelectBody, SelectCore,
    SelectStatement, Span, Statement, TableOrSubquery, Traversal, UnaryOp, Visitor,
};

fn sp() -> Span {
    Span::SYNTHETIC
}

fn arb_binary_op() -> impl Strategy<Value = BinaryOp> {
    prop_oneof![
        Just(BinaryOp::Add),
        Just(BinaryOp::Subtract),
        Just(BinaryOp::Multiply),
        Just(BinaryOp::Eq),
        Just(BinaryOp::Lt),
        Just(BinaryOp::And),
        Just(BinaryOp::Or),
        Just(BinaryOp::Concat),
    ]
}

fn arb_expr() -> impl Strategy<Value = Arc<Expr>> {
    let leaf = prop_oneof![
        any::<i64>().prop_map(|n| Arc::new(Expr::Literal(Literal::Integer(n), sp()))),
        prop_oneof![Just("a"), Just("b"), Just("c"), Just("x"), Just("y")]
            .prop_map(|name| Arc::new(Expr::Column(ColumnRef::bare(name), sp()))),
        Just(Arc::new(Expr::Literal(Literal::Null, sp()))),
    ];
    leaf.prop_recursive(4, 48, 3, |inner| {
        prop_oneof![
            (inner.clone(), arb_binary_op(), inner.clone()).prop_map(|(left, op, right)| {
                Arc::new(Expr::BinaryOp {
                    left,
                    op,
                    right,
                    span: sp(),
                })
            }),
            inner
                .clone()
                .prop_map(|e| Arc::new(Expr::Paren(e, sp()))),
            inner.clone().prop_map(|e| {
                Arc::new(Expr::UnaryOp {
                    op: UnaryOp::Negate,
                    expr: e,
                    span: sp(),
                })
            }),
            inner.clone().prop_map(|e| {
                Arc::new(Expr::IsNull {
                    expr: e,
                    not: false,
                    span: sp(),
                })
            }),
            (inner.clone(), inner.clone(), inner).prop_map(|(e, low, high)| {
                Arc::new(Expr::Between {
                    expr: e,
                    low,
                    high,
                    not: false,
                    span: sp(),
                })
            }),
        ]
    })
}

/// Wrap an expression as `SELECT expr FROM t WHERE expr`-shaped statement.
fn stmt_around(expr: Arc<Expr>) -> Statement {
    Statement::Select(SelectStatement {
        with: None,
        body: SelectBody {
            select: SelectCore::Select {
                distinct: Distinctness::All,
                columns: vec![ResultColumn::Expr {
                    expr: Arc::clone(&expr),
                    alias: None,
                }],
                from: Some(Arc::new(FromClause {
                    source: TableOrSubquery::Table {
                        name: QualifiedName::bare("t"),
                        alias: None,
                        span: sp(),
                    },
                    joins: Vec::new(),
                    span: sp(),
                })),
                where_clause: Some(expr),
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

#[derive(Default)]
struct NodeCounter(usize);

impl Visitor for NodeCounter {
    fn visit_expr(&mut self, _: &Expr) -> Flow {
        self.0 += 1;
        Flow::Continue
    }
}

proptest! {
    #[test]
    fn prop_traversal_is_total_and_order_independent(expr in arb_expr()) {
        let stmt = stmt_around(expr);
        let mut pre = NodeCounter::default();
        let mut post = NodeCounter::default();
        prop_assert_eq!(traverse(&stmt, &mut pre, Order::Pre), Traversal::Complete);
        prop_assert_eq!(traverse(&stmt, &mut post, Order::Post), Traversal::Complete);
        prop_assert_eq!(pre.0, post.0);
        prop_assert!(pre.0 >= 2);
    }

    #[test]
    fn prop_noop_rewrite_is_identity(expr in arb_expr()) {
        struct Noop;
        impl Rewriter for Noop {}
        let stmt = stmt_around(expr);
        let rewritten = rewrite(&stmt, &mut Noop);
        prop_assert_eq!(&rewritten, &stmt);
    }

    #[test]
    fn prop_rendering_is_deterministic(expr in arb_expr()) {
        let stmt = stmt_around(expr);
        let first = stmt.to_string();
        let second = stmt.to_string();
        prop_assert!(!first.is_empty());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_generated_trees_are_well_formed(expr in arb_expr()) {
        let stmt = stmt_around(expr);
        prop_assert!(validate(&stmt).is_ok());
    }

    #[test]
    fn prop_rewrite_replaces_every_target_literal(expr in arb_expr()) {
        struct NullOutIntegers;
        impl Rewriter for NullOutIntegers {
            fn rewrite_expr(&mut self, expr: &Expr) -> Option<Expr> {
                if matches!(expr, Expr::Literal(Literal::Integer(_), _)) {
                    Some(Expr::Literal(Literal::Null, Span::SYNTHETIC))
                } else {
                    None
                }
            }
        }

        struct CountIntegers(usize);
        impl Visitor for CountIntegers {
            fn visit_expr(&mut self, expr: &Expr) -> Flow {
                if matches!(expr, Expr::Literal(Literal::Integer(_), _)) {
                    self.0 += 1;
                }
                Flow::Continue
            }
        }

        let stmt = stmt_around(expr);
        let rewritten = rewrite(&stmt, &mut NullOutIntegers);
        let mut count = CountIntegers(0);
        traverse(&rewritten, &mut count, Order::Pre);
        prop_assert_eq!(count.0, 0);
    }
}
