//! Base-table reference collection.

use std::collections::HashSet;

use sqltree_ast::visit::{traverse, Flow, Order, Visitor};
use sqltree_ast::{Cte, QualifiedName, Statement, TableOrSubquery};

/// Collect every distinct base table referenced anywhere in a statement —
/// subqueries and CTE bodies included — in first-occurrence order,
/// deduplicated by fully-qualified name.
///
/// FROM aliases are not table references, and a name bound by any CTE in the
/// statement is never reported as a base table (CTE names shadow tables for
/// the whole statement; finer lexical scoping belongs to a resolver, not
/// this collector). Qualified names (`schema.t`) never match a CTE.
#[must_use]
pub fn collect_tables(stmt: &Statement) -> Vec<QualifiedName> {
    let span = tracing::debug_span!(
        target: "sqltree.analyze",
        "collect_tables",
        tables_found = tracing::field::Empty,
    );
    let _guard = span.enter();

    let mut collector = TableCollector {
        seen: HashSet::new(),
        cte_names: HashSet::new(),
        out: Vec::new(),
    };
    traverse(stmt, &mut collector, Order::Pre);

    span.record("tables_found", collector.out.len() as u64);
    crate::record_table_refs(collector.out.len() as u64);
    collector.out
}

struct TableCollector {
    /// Fully-qualified names already reported.
    seen: HashSet<String>,
    /// Names bound by a CTE anywhere in the statement.
    cte_names: HashSet<String>,
    out: Vec<QualifiedName>,
}

fn full_name(name: &QualifiedName) -> String {
    match &name.schema {
        Some(schema) => format!("{schema}.{}", name.name),
        None => name.name.clone(),
    }
}

impl TableCollector {
    fn record(&mut self, name: &QualifiedName) {
        if name.schema.is_none() && self.cte_names.contains(&name.name) {
            return;
        }
        if self.seen.insert(full_name(name)) {
            self.out.push(name.clone());
        }
    }
}

impl Visitor for TableCollector {
    fn visit_statement(&mut self, stmt: &Statement) -> Flow {
        // Statement targets are table references too.
        match stmt {
            Statement::Insert(s) => self.record(&s.table),
            Statement::Update(s) => self.record(&s.table),
            Statement::Delete(s) => self.record(&s.table),
            Statement::CreateTable(s) => self.record(&s.name),
            Statement::DropTable(s) => self.record(&s.name),
            Statement::AlterTable(s) => self.record(&s.name),
            Statement::Truncate(s) => self.record(&s.name),
            _ => {}
        }
        Flow::Continue
    }

    fn visit_cte(&mut self, cte: &Cte) -> Flow {
        // WITH precedes the body in traversal order, so the binding is
        // registered before any reference to it is walked.
        self.cte_names.insert(cte.name.clone());
        Flow::Continue
    }

    fn visit_table_ref(&mut self, table: &TableOrSubquery) -> Flow {
        if let TableOrSubquery::Table { name, .. } = table {
            self.record(name);
        }
        Flow::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqltree_builder::{Builder, Dialect, DialectContext, RawNode};
    use sqltree_ast::Span;

    fn sp(start: u32, end: u32) -> Span {
        Span::new(start, end)
    }

    fn ident(text: &str, start: u32, end: u32) -> RawNode {
        RawNode::leaf("ident", text, sp(start, end))
    }

    fn table(name: &str, start: u32, end: u32) -> RawNode {
        RawNode::node(
            "table",
            sp(start, end),
            vec![RawNode::node(
                "qualified_name",
                sp(start, end),
                vec![ident(name, start, end)],
            )],
        )
    }

    fn column(name: &str, start: u32, end: u32) -> RawNode {
        RawNode::node("column_ref", sp(start, end), vec![ident(name, start, end)])
    }

    fn result_column(child: RawNode) -> RawNode {
        let span = child.span;
        RawNode::node("result_column", span, vec![child])
    }

    fn build(raw: &RawNode) -> Statement {
        let ctx = DialectContext::new(Dialect::Ansi);
        Builder::new(&ctx).build(raw).expect("statement should build")
    }

    /// `SELECT a, b FROM t1 WHERE a = 1`
    fn simple_select() -> RawNode {
        RawNode::node(
            "select_stmt",
            sp(0, 31),
            vec![RawNode::node(
                "select_core",
                sp(0, 31),
                vec![
                    RawNode::node(
                        "select_list",
                        sp(7, 11),
                        vec![
                            result_column(column("a", 7, 8)),
                            result_column(column("b", 10, 11)),
                        ],
                    ),
                    RawNode::node("from_clause", sp(17, 19), vec![table("t1", 17, 19)]),
                    RawNode::node(
                        "where_clause",
                        sp(26, 31),
                        vec![RawNode::node(
                            "binary_expr",
                            sp(26, 31),
                            vec![
                                column("a", 26, 27),
                                RawNode::leaf("op", "=", sp(28, 29)),
                                RawNode::leaf("integer", "1", sp(30, 31)),
                            ],
                        )],
                    ),
                ],
            )],
        )
    }

    #[test]
    fn test_simple_select_tables() {
        let stmt = build(&simple_select());
        let tables = collect_tables(&stmt);
        assert_eq!(tables, vec![QualifiedName::bare("t1")]);
    }

    #[test]
    fn test_subquery_table_alias_is_not_a_reference() {
        // SELECT x FROM (SELECT x FROM t2) AS sub
        let inner = RawNode::node(
            "select_stmt",
            sp(15, 31),
            vec![RawNode::node(
                "select_core",
                sp(15, 31),
                vec![
                    RawNode::node(
                        "select_list",
                        sp(22, 23),
                        vec![result_column(column("x", 22, 23))],
                    ),
                    RawNode::node("from_clause", sp(29, 31), vec![table("t2", 29, 31)]),
                ],
            )],
        );
        let outer = RawNode::node(
            "select_stmt",
            sp(0, 40),
            vec![RawNode::node(
                "select_core",
                sp(0, 40),
                vec![
                    RawNode::node(
                        "select_list",
                        sp(7, 8),
                        vec![result_column(column("x", 7, 8))],
                    ),
                    RawNode::node(
                        "from_clause",
                        sp(14, 40),
                        vec![RawNode::node(
                            "derived_table",
                            sp(14, 40),
                            vec![
                                inner,
                                RawNode::node(
                                    "alias",
                                    sp(36, 39),
                                    vec![ident("sub", 36, 39)],
                                ),
                            ],
                        )],
                    ),
                ],
            )],
        );
        let stmt = build(&outer);
        let tables = collect_tables(&stmt);
        assert_eq!(tables, vec![QualifiedName::bare("t2")]);
    }

    #[test]
    fn test_cte_name_is_not_a_base_table() {
        // WITH c AS (SELECT a FROM t) SELECT a FROM c
        let cte_body = RawNode::node(
            "select_stmt",
            sp(11, 26),
            vec![RawNode::node(
                "select_core",
                sp(11, 26),
                vec![
                    RawNode::node(
                        "select_list",
                        sp(18, 19),
                        vec![result_column(column("a", 18, 19))],
                    ),
                    RawNode::node("from_clause", sp(25, 26), vec![table("t", 25, 26)]),
                ],
            )],
        );
        let stmt_raw = RawNode::node(
            "select_stmt",
            sp(0, 43),
            vec![
                RawNode::node(
                    "with_clause",
                    sp(0, 27),
                    vec![RawNode::node(
                        "cte",
                        sp(5, 27),
                        vec![ident("c", 5, 6), cte_body],
                    )],
                ),
                RawNode::node(
                    "select_core",
                    sp(28, 43),
                    vec![
                        RawNode::node(
                            "select_list",
                            sp(35, 36),
                            vec![result_column(column("a", 35, 36))],
                        ),
                        RawNode::node("from_clause", sp(42, 43), vec![table("c", 42, 43)]),
                    ],
                ),
            ],
        );
        let stmt = build(&stmt_raw);
        let tables = collect_tables(&stmt);
        assert_eq!(tables, vec![QualifiedName::bare("t")]);
    }

    #[test]
    fn test_insert_target_and_source_in_order() {
        // INSERT INTO a SELECT x FROM b
        let select = RawNode::node(
            "select_stmt",
            sp(14, 29),
            vec![RawNode::node(
                "select_core",
                sp(14, 29),
                vec![
                    RawNode::node(
                        "select_list",
                        sp(21, 22),
                        vec![result_column(column("x", 21, 22))],
                    ),
                    RawNode::node("from_clause", sp(28, 29), vec![table("b", 28, 29)]),
                ],
            )],
        );
        let raw = RawNode::node(
            "insert_stmt",
            sp(0, 29),
            vec![
                RawNode::node("qualified_name", sp(12, 13), vec![ident("a", 12, 13)]),
                select,
            ],
        );
        let stmt = build(&raw);
        let tables = collect_tables(&stmt);
        assert_eq!(
            tables,
            vec![QualifiedName::bare("a"), QualifiedName::bare("b")]
        );
    }

    #[test]
    fn test_duplicates_collapse_to_first_occurrence() {
        // SELECT a FROM t1 JOIN t1 ON a = b — t1 reported once.
        let raw = RawNode::node(
            "select_stmt",
            sp(0, 40),
            vec![RawNode::node(
                "select_core",
                sp(0, 40),
                vec![
                    RawNode::node(
                        "select_list",
                        sp(7, 8),
                        vec![result_column(column("a", 7, 8))],
                    ),
                    RawNode::node(
                        "from_clause",
                        sp(14, 40),
                        vec![
                            table("t1", 14, 16),
                            RawNode::node(
                                "join",
                                sp(17, 40),
                                vec![
                                    RawNode::marker("inner_join", sp(17, 21)),
                                    table("t1", 22, 24),
                                    RawNode::node(
                                        "on_clause",
                                        sp(28, 40),
                                        vec![RawNode::node(
                                            "binary_expr",
                                            sp(31, 40),
                                            vec![
                                                column("a", 31, 32),
                                                RawNode::leaf("op", "=", sp(33, 34)),
                                                column("b", 35, 36),
                                            ],
                                        )],
                                    ),
                                ],
                            ),
                        ],
                    ),
                ],
            )],
        );
        let stmt = build(&raw);
        assert_eq!(collect_tables(&stmt), vec![QualifiedName::bare("t1")]);
    }

    #[test]
    fn test_determinism() {
        let stmt = build(&simple_select());
        assert_eq!(collect_tables(&stmt), collect_tables(&stmt));
    }
}
