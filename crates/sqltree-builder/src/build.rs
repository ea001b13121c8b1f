//! The builder proper: raw rule nodes in, canonical statements out.
//!
//! Builders are keyed on the grammar's rule names. Every function takes the
//! raw node for its rule, converts children bottom-up, and normalizes
//! lexical forms through the dialect context on the way. Unknown rules and
//! missing children surface as [`BuildError::SyntaxStructure`] with the
//! offending span — never a panic, never a partially-initialized node.

use std::sync::Arc;

use sqltree_ast::validate::validate;
use sqltree_ast::{
    AlterTableAction, AlterTableStatement, Assignment, BinaryOp, ColumnAlias, ColumnDef,
    ColumnRef, CompoundOp, CreateTableBody, CreateTableStatement, Cte, DeleteStatement,
    Distinctness, DropTableStatement, Expr, FromClause, FunctionArgs, InSet, InsertSource,
    InsertStatement, JoinClause, JoinConstraint, JoinType, LikeOp, LimitClause, Literal,
    NullsOrder, OrderingTerm, QualifiedName, ResultColumn, SelectBody, SelectCore,
    SelectStatement, SortDirection, Span, Statement, TableOrSubquery, TruncateStatement,
    TypeName, UnaryOp, UpdateStatement, UseStatement, WithClause,
};

use crate::dialect::DialectContext;
use crate::error::BuildError;
use crate::raw::RawNode;

/// Statement rules the builder recognizes at the top level.
const STATEMENT_RULES: &[&str] = &[
    "select_stmt",
    "insert_stmt",
    "update_stmt",
    "delete_stmt",
    "create_table_stmt",
    "drop_table_stmt",
    "alter_table_stmt",
    "truncate_stmt",
    "use_stmt",
    "explain_stmt",
];

/// Result of building a multi-statement script.
///
/// One malformed statement aborts only itself; the rest of the script still
/// builds, with the failure recorded in source order.
#[derive(Debug, Clone)]
pub struct ScriptBuild {
    /// Successfully built statements, in source order.
    pub statements: Vec<Statement>,
    /// Per-statement failures, in source order.
    pub failures: Vec<ScriptFailure>,
}

/// One recorded failure from a script build.
#[derive(Debug, Clone)]
pub struct ScriptFailure {
    /// Zero-based index of the statement within the script.
    pub index: usize,
    /// Span of the failed statement's raw node.
    pub span: Span,
    pub error: BuildError,
}

/// Converts raw parse trees into canonical statements.
pub struct Builder<'a> {
    ctx: &'a DialectContext,
}

fn structure(node: &RawNode, detail: impl Into<String>) -> BuildError {
    BuildError::SyntaxStructure {
        rule: node.rule.clone(),
        span: node.span,
        detail: detail.into(),
    }
}

impl<'a> Builder<'a> {
    /// Create a builder over a resolved dialect context.
    #[must_use]
    pub const fn new(ctx: &'a DialectContext) -> Self {
        Self { ctx }
    }

    /// Build one statement from its raw node.
    ///
    /// The finished tree is checked against the node-model invariants before
    /// it is returned, so callers never observe a malformed statement.
    pub fn build(&self, raw: &RawNode) -> Result<Statement, BuildError> {
        let span = tracing::debug_span!(
            target: "sqltree.build",
            "build_statement",
            rule = %raw.rule,
            dialect = %self.ctx.dialect(),
        );
        let _guard = span.enter();

        let stmt = self.statement(raw)?;
        validate(&stmt)?;
        Ok(stmt)
    }

    /// Build every statement of a `script` node.
    ///
    /// Returns an error only when the root is not a script; per-statement
    /// failures are recorded, not propagated.
    pub fn build_script(&self, raw: &RawNode) -> Result<ScriptBuild, BuildError> {
        if raw.rule != "script" {
            return Err(structure(raw, "expected a script root"));
        }
        let span = tracing::debug_span!(
            target: "sqltree.build",
            "build_script",
            dialect = %self.ctx.dialect(),
            statements = tracing::field::Empty,
            failures = tracing::field::Empty,
        );
        let _guard = span.enter();

        let mut statements = Vec::new();
        let mut failures = Vec::new();
        for (index, child) in raw.children.iter().enumerate() {
            match self.build(child) {
                Ok(stmt) => statements.push(stmt),
                Err(error) => {
                    tracing::warn!(
                        target: "sqltree.build",
                        index,
                        %error,
                        "statement failed to build; continuing with the rest of the script"
                    );
                    failures.push(ScriptFailure {
                        index,
                        span: child.span,
                        error,
                    });
                }
            }
        }
        span.record("statements", statements.len() as u64);
        span.record("failures", failures.len() as u64);
        Ok(ScriptBuild {
            statements,
            failures,
        })
    }

    fn statement(&self, node: &RawNode) -> Result<Statement, BuildError> {
        match node.rule.as_str() {
            "select_stmt" => Ok(Statement::Select(self.select_stmt(node)?)),
            "insert_stmt" => Ok(Statement::Insert(self.insert_stmt(node)?)),
            "update_stmt" => Ok(Statement::Update(self.update_stmt(node)?)),
            "delete_stmt" => Ok(Statement::Delete(self.delete_stmt(node)?)),
            "create_table_stmt" => Ok(Statement::CreateTable(self.create_table_stmt(node)?)),
            "drop_table_stmt" => Ok(Statement::DropTable(self.drop_table_stmt(node)?)),
            "alter_table_stmt" => Ok(Statement::AlterTable(self.alter_table_stmt(node)?)),
            "truncate_stmt" => Ok(Statement::Truncate(TruncateStatement {
                name: self.qualified_name(self.expect(node, "qualified_name")?)?,
                span: node.span,
            })),
            "use_stmt" => Ok(Statement::Use(UseStatement {
                database: self.ident(self.expect(node, "ident")?)?,
                span: node.span,
            })),
            "explain_stmt" => {
                let inner = node
                    .children
                    .iter()
                    .find(|c| STATEMENT_RULES.contains(&c.rule.as_str()))
                    .ok_or_else(|| structure(node, "EXPLAIN without a statement"))?;
                Ok(Statement::Explain {
                    stmt: Box::new(self.statement(inner)?),
                    span: node.span,
                })
            }
            _ => Err(structure(node, "not a statement rule")),
        }
    }

    // -----------------------------------------------------------------------
    // Identifiers and names
    // -----------------------------------------------------------------------

    /// Normalize one identifier: strip this dialect's quotes or fold case.
    ///
    /// Applied once, here; traversals never re-normalize.
    fn ident(&self, node: &RawNode) -> Result<String, BuildError> {
        if node.rule != "ident" {
            return Err(structure(node, "expected an identifier"));
        }
        let text = node.text.as_str();
        let quote = self.ctx.quote_char();
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            let inner = &text[1..text.len() - 1];
            if inner.is_empty() {
                return Err(structure(node, "empty quoted identifier"));
            }
            let doubled: String = [quote, quote].iter().collect();
            return Ok(inner.replace(&doubled, &quote.to_string()));
        }
        if text.starts_with('"') || text.starts_with('`') {
            return Err(structure(
                node,
                format!(
                    "identifier {text} not quoted with `{quote}`, the {} dialect's quote character",
                    self.ctx.dialect()
                ),
            ));
        }
        if text.is_empty() {
            return Err(structure(node, "empty identifier"));
        }
        if self.ctx.is_reserved(text) {
            return Err(structure(
                node,
                format!("reserved word `{text}` used as a bare identifier"),
            ));
        }
        Ok(self.ctx.fold(text))
    }

    fn qualified_name(&self, node: &RawNode) -> Result<QualifiedName, BuildError> {
        if node.rule != "qualified_name" {
            return Err(structure(node, "expected a qualified name"));
        }
        let idents: Vec<&RawNode> = node.children_of("ident").collect();
        match idents.as_slice() {
            [name] => Ok(QualifiedName::bare(self.ident(name)?)),
            [schema, name] => Ok(QualifiedName::qualified(
                self.ident(schema)?,
                self.ident(name)?,
            )),
            _ => Err(structure(node, "expected one or two name parts")),
        }
    }

    fn alias_of(&self, node: &RawNode) -> Result<Option<String>, BuildError> {
        match node.find("alias") {
            Some(alias) => {
                let ident = self.expect(alias, "ident")?;
                Ok(Some(self.ident(ident)?))
            }
            None => Ok(None),
        }
    }

    fn ident_list(&self, node: &RawNode) -> Result<Vec<String>, BuildError> {
        node.children_of("ident")
            .map(|c| self.ident(c))
            .collect()
    }

    // -----------------------------------------------------------------------
    // SELECT
    // -----------------------------------------------------------------------

    fn select_stmt(&self, node: &RawNode) -> Result<SelectStatement, BuildError> {
        let mut with = None;
        let mut select: Option<SelectCore> = None;
        let mut compounds = Vec::new();
        let mut pending_op: Option<CompoundOp> = None;
        let mut order_by = Vec::new();
        let mut limit = None;

        for child in &node.children {
            match child.rule.as_str() {
                "with_clause" => with = Some(self.with_clause(child)?),
                "select_core" => {
                    let core = self.select_core(child)?;
                    match pending_op.take() {
                        None if select.is_none() => select = Some(core),
                        Some(op) => compounds.push((op, core)),
                        None => {
                            return Err(structure(
                                child,
                                "second select core without a compound operator",
                            ))
                        }
                    }
                }
                "compound_op" => {
                    if pending_op.is_some() {
                        return Err(structure(child, "consecutive compound operators"));
                    }
                    pending_op = Some(self.compound_op(child)?);
                }
                "order_by_clause" => order_by = self.order_by_clause(child)?,
                "limit_clause" => limit = Some(self.limit_clause(child)?),
                _ => return Err(structure(child, "unexpected clause in a select statement")),
            }
        }

        let Some(select) = select else {
            return Err(structure(node, "select statement without a select core"));
        };
        if pending_op.is_some() {
            return Err(structure(node, "dangling compound operator"));
        }
        Ok(SelectStatement {
            with,
            body: SelectBody { select, compounds },
            order_by,
            limit,
            span: node.span,
        })
    }

    fn with_clause(&self, node: &RawNode) -> Result<WithClause, BuildError> {
        let mut ctes = Vec::new();
        for cte in node.children_of("cte") {
            let name = self.ident(self.expect(cte, "ident")?)?;
            let columns = match cte.find("column_list") {
                Some(list) => self.ident_list(list)?,
                None => Vec::new(),
            };
            let query = self.select_stmt(self.expect(cte, "select_stmt")?)?;
            ctes.push(Cte {
                name,
                columns,
                query: Arc::new(query),
                span: cte.span,
            });
        }
        Ok(WithClause {
            recursive: node.has("recursive"),
            ctes,
            span: node.span,
        })
    }

    fn compound_op(&self, node: &RawNode) -> Result<CompoundOp, BuildError> {
        let canon = node
            .text
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();
        match canon.as_str() {
            "UNION" => Ok(CompoundOp::Union),
            "UNION ALL" => Ok(CompoundOp::UnionAll),
            "INTERSECT" => Ok(CompoundOp::Intersect),
            "EXCEPT" => Ok(CompoundOp::Except),
            _ => Err(structure(node, "unknown compound operator")),
        }
    }

    fn select_core(&self, node: &RawNode) -> Result<SelectCore, BuildError> {
        if let Some(values) = node.find("values_clause") {
            return Ok(SelectCore::Values {
                rows: self.value_rows(values)?,
                span: node.span,
            });
        }

        let mut columns = Vec::new();
        let mut from = None;
        let mut where_clause = None;
        let mut group_by = Vec::new();
        let mut having = None;

        for child in &node.children {
            match child.rule.as_str() {
                "distinct" => {}
                "select_list" => columns = self.select_list(child)?,
                "from_clause" => from = Some(Arc::new(self.from_clause(child)?)),
                "where_clause" => where_clause = Some(self.clause_expr(child)?),
                "group_by_clause" => {
                    group_by = child
                        .children
                        .iter()
                        .map(|c| self.expr(c))
                        .collect::<Result<_, _>>()?;
                }
                "having_clause" => having = Some(self.clause_expr(child)?),
                "sort_by_clause" | "distribute_by_clause" | "cluster_by_clause" => {
                    // Hive surface we deliberately do not model.
                    let feature = match child.rule.as_str() {
                        "sort_by_clause" => "the SORT BY clause",
                        "distribute_by_clause" => "the DISTRIBUTE BY clause",
                        _ => "the CLUSTER BY clause",
                    };
                    return Err(BuildError::UnsupportedFeature {
                        feature: feature.to_owned(),
                        dialect: self.ctx.dialect(),
                        span: child.span,
                    });
                }
                _ => return Err(structure(child, "unexpected clause in a select core")),
            }
        }

        Ok(SelectCore::Select {
            distinct: if node.has("distinct") {
                Distinctness::Distinct
            } else {
                Distinctness::All
            },
            columns,
            from,
            where_clause,
            group_by,
            having,
            span: node.span,
        })
    }

    fn select_list(&self, node: &RawNode) -> Result<Vec<ResultColumn>, BuildError> {
        let mut columns = Vec::new();
        for child in &node.children {
            match child.rule.as_str() {
                "star" => columns.push(ResultColumn::Star(child.span)),
                "table_star" => {
                    let table = self.ident(self.expect(child, "ident")?)?;
                    columns.push(ResultColumn::TableStar(table, child.span));
                }
                "result_column" => {
                    let expr_node = child
                        .children
                        .iter()
                        .find(|c| c.rule != "alias")
                        .ok_or_else(|| structure(child, "result column without an expression"))?;
                    let expr = self.expr(expr_node)?;
                    let alias = match self.alias_of(child)? {
                        Some(name) => ColumnAlias::explicit(
                            name,
                            child.find("alias").map_or(Span::SYNTHETIC, |a| a.span),
                        ),
                        // Normalization: an aliasless column gets its
                        // expression's canonical text as a synthetic alias.
                        None => ColumnAlias::synthesized(expr.to_string()),
                    };
                    columns.push(ResultColumn::Expr {
                        expr,
                        alias: Some(alias),
                    });
                }
                _ => return Err(structure(child, "unexpected select list item")),
            }
        }
        Ok(columns)
    }

    fn from_clause(&self, node: &RawNode) -> Result<FromClause, BuildError> {
        let mut source = None;
        let mut joins = Vec::new();
        for child in &node.children {
            match child.rule.as_str() {
                "table" | "derived_table" | "paren_join" => {
                    if source.is_some() {
                        return Err(structure(child, "multiple FROM sources without a join"));
                    }
                    source = Some(self.table_ref(child)?);
                }
                "join" => joins.push(self.join_clause(child)?),
                _ => return Err(structure(child, "unexpected item in a FROM clause")),
            }
        }
        let Some(source) = source else {
            return Err(structure(node, "FROM clause without a source"));
        };
        Ok(FromClause {
            source,
            joins,
            span: node.span,
        })
    }

    fn table_ref(&self, node: &RawNode) -> Result<TableOrSubquery, BuildError> {
        match node.rule.as_str() {
            "table" => Ok(TableOrSubquery::Table {
                name: self.qualified_name(self.expect(node, "qualified_name")?)?,
                alias: self.alias_of(node)?,
                span: node.span,
            }),
            "derived_table" => Ok(TableOrSubquery::Subquery {
                query: Arc::new(self.select_stmt(self.expect(node, "select_stmt")?)?),
                alias: self.alias_of(node)?,
                span: node.span,
            }),
            "paren_join" => Ok(TableOrSubquery::ParenJoin {
                inner: Arc::new(self.from_clause(self.expect(node, "from_clause")?)?),
                span: node.span,
            }),
            _ => Err(structure(node, "expected a table source")),
        }
    }

    fn join_clause(&self, node: &RawNode) -> Result<JoinClause, BuildError> {
        let join_type = if node.has("inner_join") {
            JoinType::Inner
        } else if node.has("left_join") {
            JoinType::Left
        } else if node.has("right_join") {
            JoinType::Right
        } else if node.has("full_join") {
            if !self.ctx.supports_full_join() {
                return Err(BuildError::UnsupportedFeature {
                    feature: "FULL JOIN".to_owned(),
                    dialect: self.ctx.dialect(),
                    span: node.span,
                });
            }
            JoinType::Full
        } else if node.has("cross_join") {
            JoinType::Cross
        } else {
            return Err(structure(node, "join without a join kind"));
        };

        let table_node = node
            .children
            .iter()
            .find(|c| matches!(c.rule.as_str(), "table" | "derived_table" | "paren_join"))
            .ok_or_else(|| structure(node, "join without a table source"))?;
        let table = self.table_ref(table_node)?;

        let constraint = if let Some(on) = node.find("on_clause") {
            Some(JoinConstraint::On(self.clause_expr(on)?))
        } else if let Some(using) = node.find("using_clause") {
            Some(JoinConstraint::Using(self.ident_list(using)?))
        } else {
            None
        };
        if join_type == JoinType::Cross && constraint.is_some() {
            return Err(structure(node, "CROSS JOIN cannot take a constraint"));
        }

        Ok(JoinClause {
            join_type,
            table,
            constraint,
            span: node.span,
        })
    }

    fn order_by_clause(&self, node: &RawNode) -> Result<Vec<OrderingTerm>, BuildError> {
        let mut terms = Vec::new();
        for term in node.children_of("ordering_term") {
            let expr_node = term
                .children
                .iter()
                .find(|c| {
                    !matches!(
                        c.rule.as_str(),
                        "asc" | "desc" | "nulls_first" | "nulls_last"
                    )
                })
                .ok_or_else(|| structure(term, "ordering term without an expression"))?;
            let direction = if term.has("asc") {
                Some(SortDirection::Asc)
            } else if term.has("desc") {
                Some(SortDirection::Desc)
            } else {
                None
            };
            let nulls = if term.has("nulls_first") {
                Some(NullsOrder::First)
            } else if term.has("nulls_last") {
                Some(NullsOrder::Last)
            } else {
                None
            };
            terms.push(OrderingTerm {
                expr: self.expr(expr_node)?,
                direction,
                nulls,
            });
        }
        if terms.is_empty() {
            return Err(structure(node, "ORDER BY without ordering terms"));
        }
        Ok(terms)
    }

    fn limit_clause(&self, node: &RawNode) -> Result<LimitClause, BuildError> {
        let mut exprs = node.children.iter();
        let limit = exprs
            .next()
            .ok_or_else(|| structure(node, "LIMIT without a count"))
            .and_then(|c| self.expr(c))?;
        let offset = exprs.next().map(|c| self.expr(c)).transpose()?;
        if exprs.next().is_some() {
            return Err(structure(node, "LIMIT with more than two expressions"));
        }
        Ok(LimitClause {
            limit,
            offset,
            span: node.span,
        })
    }

    /// A clause that wraps exactly one expression (WHERE, HAVING, ON, ...).
    fn clause_expr(&self, node: &RawNode) -> Result<Arc<Expr>, BuildError> {
        match node.children.as_slice() {
            [child] => self.expr(child),
            _ => Err(structure(node, "expected exactly one expression")),
        }
    }

    // -----------------------------------------------------------------------
    // DML
    // -----------------------------------------------------------------------

    fn insert_stmt(&self, node: &RawNode) -> Result<InsertStatement, BuildError> {
        let table = self.qualified_name(self.expect(node, "qualified_name")?)?;
        let columns = match node.find("column_list") {
            Some(list) => self.ident_list(list)?,
            None => Vec::new(),
        };
        let source = if let Some(values) = node.find("values_clause") {
            InsertSource::Values(self.value_rows(values)?)
        } else if let Some(select) = node.find("select_stmt") {
            InsertSource::Select(Arc::new(self.select_stmt(select)?))
        } else {
            return Err(structure(node, "INSERT without VALUES or SELECT"));
        };
        Ok(InsertStatement {
            table,
            columns,
            source,
            span: node.span,
        })
    }

    fn value_rows(&self, node: &RawNode) -> Result<Vec<Vec<Arc<Expr>>>, BuildError> {
        node.children_of("value_row")
            .map(|row| row.children.iter().map(|c| self.expr(c)).collect())
            .collect()
    }

    fn update_stmt(&self, node: &RawNode) -> Result<UpdateStatement, BuildError> {
        let table = self.qualified_name(self.expect(node, "qualified_name")?)?;
        let set = self.expect(node, "set_clause")?;
        let mut assignments = Vec::new();
        for assignment in set.children_of("assignment") {
            let column_node = self.expect(assignment, "column_ref")?;
            let value_node = assignment
                .children
                .iter()
                .find(|c| c.rule != "column_ref")
                .ok_or_else(|| structure(assignment, "assignment without a value"))?;
            assignments.push(Assignment {
                column: self.column_ref(column_node)?,
                value: self.expr(value_node)?,
                span: assignment.span,
            });
        }
        let where_clause = node
            .find("where_clause")
            .map(|w| self.clause_expr(w))
            .transpose()?;
        Ok(UpdateStatement {
            table,
            assignments,
            where_clause,
            span: node.span,
        })
    }

    fn delete_stmt(&self, node: &RawNode) -> Result<DeleteStatement, BuildError> {
        Ok(DeleteStatement {
            table: self.qualified_name(self.expect(node, "qualified_name")?)?,
            where_clause: node
                .find("where_clause")
                .map(|w| self.clause_expr(w))
                .transpose()?,
            span: node.span,
        })
    }

    // -----------------------------------------------------------------------
    // DDL
    // -----------------------------------------------------------------------

    fn create_table_stmt(&self, node: &RawNode) -> Result<CreateTableStatement, BuildError> {
        let name = self.qualified_name(self.expect(node, "qualified_name")?)?;
        let body = if let Some(defs) = node.find("column_defs") {
            let columns = defs
                .children_of("column_def")
                .map(|def| self.column_def(def))
                .collect::<Result<Vec<_>, _>>()?;
            CreateTableBody::Columns(columns)
        } else if let Some(select) = node.find("select_stmt") {
            CreateTableBody::AsSelect(Arc::new(self.select_stmt(select)?))
        } else {
            return Err(structure(node, "CREATE TABLE without columns or AS SELECT"));
        };
        Ok(CreateTableStatement {
            name,
            if_not_exists: node.has("if_not_exists"),
            body,
            span: node.span,
        })
    }

    fn column_def(&self, node: &RawNode) -> Result<ColumnDef, BuildError> {
        let name = self.ident(self.expect(node, "ident")?)?;
        let type_name = self.type_name(self.expect(node, "type_name")?)?;
        let default = match node.find("default_clause") {
            Some(d) => Some(self.clause_expr(d)?),
            None => None,
        };
        Ok(ColumnDef {
            name,
            type_name,
            not_null: node.has("not_null"),
            primary_key: node.has("primary_key"),
            unique: node.has("unique"),
            default,
            span: node.span,
        })
    }

    fn type_name(&self, node: &RawNode) -> Result<TypeName, BuildError> {
        if node.text.is_empty() {
            return Err(structure(node, "empty type name"));
        }
        let mut args = node.children_of("type_arg").map(|c| c.text.clone());
        Ok(TypeName {
            // Type names are keywords, not identifiers: canonical form is
            // uppercase regardless of dialect folding.
            name: node.text.to_ascii_uppercase(),
            arg1: args.next(),
            arg2: args.next(),
        })
    }

    fn drop_table_stmt(&self, node: &RawNode) -> Result<DropTableStatement, BuildError> {
        Ok(DropTableStatement {
            name: self.qualified_name(self.expect(node, "qualified_name")?)?,
            if_exists: node.has("if_exists"),
            span: node.span,
        })
    }

    fn alter_table_stmt(&self, node: &RawNode) -> Result<AlterTableStatement, BuildError> {
        let name = self.qualified_name(self.expect(node, "qualified_name")?)?;
        let action = if let Some(add) = node.find("add_column") {
            AlterTableAction::AddColumn(self.column_def(self.expect(add, "column_def")?)?)
        } else if let Some(drop) = node.find("drop_column") {
            AlterTableAction::DropColumn(self.ident(self.expect(drop, "ident")?)?)
        } else if let Some(rename) = node.find("rename_column") {
            let idents: Vec<&RawNode> = rename.children_of("ident").collect();
            let [from, to] = idents.as_slice() else {
                return Err(structure(rename, "RENAME COLUMN takes two names"));
            };
            AlterTableAction::RenameColumn {
                from: self.ident(from)?,
                to: self.ident(to)?,
            }
        } else if let Some(rename) = node.find("rename_table") {
            AlterTableAction::RenameTable {
                to: self.qualified_name(self.expect(rename, "qualified_name")?)?,
            }
        } else {
            return Err(structure(node, "ALTER TABLE without a recognized action"));
        };
        Ok(AlterTableStatement {
            name,
            action,
            span: node.span,
        })
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn column_ref(&self, node: &RawNode) -> Result<ColumnRef, BuildError> {
        if node.rule != "column_ref" {
            return Err(structure(node, "expected a column reference"));
        }
        let idents: Vec<&RawNode> = node.children_of("ident").collect();
        match idents.as_slice() {
            [column] => Ok(ColumnRef::bare(self.ident(column)?)),
            [table, column] => Ok(ColumnRef::qualified(
                self.ident(table)?,
                self.ident(column)?,
            )),
            _ => Err(structure(node, "expected one or two name parts")),
        }
    }

    #[allow(clippy::too_many_lines)]
    fn expr(&self, node: &RawNode) -> Result<Arc<Expr>, BuildError> {
        let expr = match node.rule.as_str() {
            "integer" => {
                let value = node
                    .text
                    .parse::<i64>()
                    .map_err(|_| structure(node, "integer literal out of range"))?;
                Expr::Literal(Literal::Integer(value), node.span)
            }
            "float" => {
                let value = node
                    .text
                    .parse::<f64>()
                    .map_err(|_| structure(node, "malformed float literal"))?;
                Expr::Literal(Literal::Float(value), node.span)
            }
            "string" => Expr::Literal(Literal::String(self.string_literal(node)?), node.span),
            "null" => Expr::Literal(Literal::Null, node.span),
            "true" => Expr::Literal(Literal::True, node.span),
            "false" => Expr::Literal(Literal::False, node.span),
            "column_ref" => Expr::Column(self.column_ref(node)?, node.span),
            "paren_expr" => {
                let inner = self.clause_expr(node)?;
                Expr::Paren(inner, node.span)
            }
            "binary_expr" => {
                let [left, op, right] = node.children.as_slice() else {
                    return Err(structure(node, "binary expression takes three children"));
                };
                Expr::BinaryOp {
                    left: self.expr(left)?,
                    op: self.binary_op(op)?,
                    right: self.expr(right)?,
                    span: node.span,
                }
            }
            "unary_expr" => {
                let [op, operand] = node.children.as_slice() else {
                    return Err(structure(node, "unary expression takes two children"));
                };
                Expr::UnaryOp {
                    op: self.unary_op(op)?,
                    expr: self.expr(operand)?,
                    span: node.span,
                }
            }
            "between_expr" => {
                let operands = self.operands(node, &["not"]);
                let [expr, low, high] = operands.as_slice() else {
                    return Err(structure(node, "BETWEEN takes three operands"));
                };
                Expr::Between {
                    expr: self.expr(expr)?,
                    low: self.expr(low)?,
                    high: self.expr(high)?,
                    not: node.has("not"),
                    span: node.span,
                }
            }
            "in_expr" => {
                let operand = node
                    .children
                    .iter()
                    .find(|c| !matches!(c.rule.as_str(), "not" | "in_list" | "select_stmt"))
                    .ok_or_else(|| structure(node, "IN without a left operand"))?;
                let set = if let Some(list) = node.find("in_list") {
                    InSet::List(
                        list.children
                            .iter()
                            .map(|c| self.expr(c))
                            .collect::<Result<_, _>>()?,
                    )
                } else if let Some(select) = node.find("select_stmt") {
                    InSet::Subquery(Arc::new(self.select_stmt(select)?))
                } else {
                    return Err(structure(node, "IN without a list or subquery"));
                };
                Expr::In {
                    expr: self.expr(operand)?,
                    set,
                    not: node.has("not"),
                    span: node.span,
                }
            }
            "like_expr" => {
                let op = self.like_op(self.expect(node, "like_op")?)?;
                let operands = self.operands(node, &["not", "like_op", "escape"]);
                let [expr, pattern] = operands.as_slice() else {
                    return Err(structure(node, "pattern match takes two operands"));
                };
                let escape = match node.find("escape") {
                    Some(esc) => Some(self.clause_expr(esc)?),
                    None => None,
                };
                Expr::Like {
                    expr: self.expr(expr)?,
                    pattern: self.expr(pattern)?,
                    escape,
                    op,
                    not: node.has("not"),
                    span: node.span,
                }
            }
            "case_expr" => {
                let operand = match node.find("case_operand") {
                    Some(op) => Some(self.clause_expr(op)?),
                    None => None,
                };
                let mut whens = Vec::new();
                for when in node.children_of("when_clause") {
                    let [cond, then] = when.children.as_slice() else {
                        return Err(structure(when, "WHEN takes a condition and a result"));
                    };
                    whens.push((self.expr(cond)?, self.expr(then)?));
                }
                let else_expr = match node.find("else_clause") {
                    Some(el) => Some(self.clause_expr(el)?),
                    None => None,
                };
                Expr::Case {
                    operand,
                    whens,
                    else_expr,
                    span: node.span,
                }
            }
            "cast_expr" => {
                let type_name = self.type_name(self.expect(node, "type_name")?)?;
                let operand = node
                    .children
                    .iter()
                    .find(|c| c.rule != "type_name")
                    .ok_or_else(|| structure(node, "CAST without an operand"))?;
                Expr::Cast {
                    expr: self.expr(operand)?,
                    type_name,
                    span: node.span,
                }
            }
            "exists_expr" => Expr::Exists {
                subquery: Arc::new(self.select_stmt(self.expect(node, "select_stmt")?)?),
                not: node.has("not"),
                span: node.span,
            },
            "subquery_expr" => Expr::Subquery(
                Arc::new(self.select_stmt(self.expect(node, "select_stmt")?)?),
                node.span,
            ),
            "function_call" => self.function_call(node)?,
            "is_null_expr" => {
                let operand = node
                    .children
                    .iter()
                    .find(|c| c.rule != "not")
                    .ok_or_else(|| structure(node, "IS NULL without an operand"))?;
                Expr::IsNull {
                    expr: self.expr(operand)?,
                    not: node.has("not"),
                    span: node.span,
                }
            }
            _ => return Err(structure(node, "unrecognized expression")),
        };
        Ok(Arc::new(expr))
    }

    fn function_call(&self, node: &RawNode) -> Result<Expr, BuildError> {
        let name_node = self.expect(node, "ident")?;
        // Function names fold like identifiers but are exempt from the
        // reserved-word check (LEFT(), RIGHT() and friends are legal calls).
        let name = self.ctx.fold(&name_node.text);
        if name.is_empty() {
            return Err(structure(name_node, "empty function name"));
        }
        let distinct = node.has("distinct");
        let args_node = self.expect(node, "args")?;
        let args = if args_node.has("star") {
            if distinct {
                return Err(structure(node, "DISTINCT cannot combine with `*`"));
            }
            FunctionArgs::Star
        } else {
            FunctionArgs::List(
                args_node
                    .children
                    .iter()
                    .map(|c| self.expr(c))
                    .collect::<Result<_, _>>()?,
            )
        };
        Ok(Expr::FunctionCall {
            name,
            args,
            distinct,
            span: node.span,
        })
    }

    fn string_literal(&self, node: &RawNode) -> Result<String, BuildError> {
        let text = node.text.as_str();
        if text.len() >= 2 && text.starts_with('\'') && text.ends_with('\'') {
            Ok(text[1..text.len() - 1].replace("''", "'"))
        } else {
            Err(structure(node, "string literal without quotes"))
        }
    }

    fn binary_op(&self, node: &RawNode) -> Result<BinaryOp, BuildError> {
        let canon = node.text.to_ascii_uppercase();
        Ok(match canon.as_str() {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Subtract,
            "*" => BinaryOp::Multiply,
            "/" => BinaryOp::Divide,
            "%" => BinaryOp::Modulo,
            "||" => BinaryOp::Concat,
            "=" | "==" => BinaryOp::Eq,
            "!=" | "<>" => BinaryOp::Ne,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            "AND" => BinaryOp::And,
            "OR" => BinaryOp::Or,
            "&" => BinaryOp::BitAnd,
            "|" => BinaryOp::BitOr,
            "<<" => BinaryOp::ShiftLeft,
            ">>" => BinaryOp::ShiftRight,
            _ => return Err(structure(node, "unknown binary operator")),
        })
    }

    fn unary_op(&self, node: &RawNode) -> Result<UnaryOp, BuildError> {
        Ok(match node.text.to_ascii_uppercase().as_str() {
            "-" => UnaryOp::Negate,
            "+" => UnaryOp::Plus,
            "~" => UnaryOp::BitNot,
            "NOT" => UnaryOp::Not,
            _ => return Err(structure(node, "unknown unary operator")),
        })
    }

    fn like_op(&self, node: &RawNode) -> Result<LikeOp, BuildError> {
        let op = match node.text.to_ascii_uppercase().as_str() {
            "LIKE" => LikeOp::Like,
            "RLIKE" => LikeOp::Rlike,
            "REGEXP" => LikeOp::Regexp,
            _ => return Err(structure(node, "unknown pattern-match operator")),
        };
        if !self.ctx.supports_like_op(op) {
            return Err(BuildError::UnsupportedFeature {
                feature: format!("the {op} operator"),
                dialect: self.ctx.dialect(),
                span: node.span,
            });
        }
        Ok(op)
    }

    // -----------------------------------------------------------------------
    // Small raw-tree helpers
    // -----------------------------------------------------------------------

    fn expect<'n>(&self, node: &'n RawNode, rule: &str) -> Result<&'n RawNode, BuildError> {
        node.find(rule)
            .ok_or_else(|| structure(node, format!("missing `{rule}` child")))
    }

    fn operands<'n>(&self, node: &'n RawNode, skip: &[&str]) -> Vec<&'n RawNode> {
        node.children
            .iter()
            .filter(|c| !skip.contains(&c.rule.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use sqltree_ast::validate::MalformedNodeError;

    fn sp() -> Span {
        Span::SYNTHETIC
    }

    fn ident(text: &str) -> RawNode {
        RawNode::leaf("ident", text, sp())
    }

    fn qname(name: &str) -> RawNode {
        RawNode::node("qualified_name", sp(), vec![ident(name)])
    }

    fn column(name: &str) -> RawNode {
        RawNode::node("column_ref", sp(), vec![ident(name)])
    }

    fn int_lit(text: &str) -> RawNode {
        RawNode::leaf("integer", text, sp())
    }

    fn op(text: &str) -> RawNode {
        RawNode::leaf("op", text, sp())
    }

    fn result_column(child: RawNode) -> RawNode {
        RawNode::node("result_column", sp(), vec![child])
    }

    fn table(name: &str) -> RawNode {
        RawNode::node("table", sp(), vec![qname(name)])
    }

    fn select_list(items: Vec<RawNode>) -> RawNode {
        RawNode::node("select_list", sp(), items)
    }

    fn select_core(children: Vec<RawNode>) -> RawNode {
        RawNode::node("select_core", sp(), children)
    }

    fn select_stmt(children: Vec<RawNode>) -> RawNode {
        RawNode::node("select_stmt", sp(), children)
    }

    /// `SELECT a, b FROM t1 WHERE a = 1`
    fn canonical_select() -> RawNode {
        select_stmt(vec![select_core(vec![
            select_list(vec![
                result_column(column("a")),
                result_column(column("b")),
            ]),
            RawNode::node("from_clause", sp(), vec![table("t1")]),
            RawNode::node(
                "where_clause",
                sp(),
                vec![RawNode::node(
                    "binary_expr",
                    sp(),
                    vec![column("a"), op("="), int_lit("1")],
                )],
            ),
        ])])
    }

    fn ansi() -> DialectContext {
        DialectContext::new(Dialect::Ansi)
    }

    fn build_with(ctx: &DialectContext, raw: &RawNode) -> Result<Statement, BuildError> {
        Builder::new(ctx).build(raw)
    }

    // ── Statement building ──

    #[test]
    fn test_build_canonical_select() {
        let ctx = ansi();
        let stmt = build_with(&ctx, &canonical_select()).unwrap();
        assert_eq!(stmt.to_string(), "SELECT a, b FROM t1 WHERE a = 1");
    }

    #[test]
    fn test_synthetic_alias_inserted() {
        let ctx = ansi();
        let stmt = build_with(&ctx, &canonical_select()).unwrap();
        let Statement::Select(s) = &stmt else { panic!("expected select") };
        let SelectCore::Select { columns, .. } = &s.body.select else {
            panic!("expected select core")
        };
        let ResultColumn::Expr { alias, .. } = &columns[0] else {
            panic!("expected expression column")
        };
        let alias = alias.as_ref().unwrap();
        assert!(alias.synthetic);
        assert_eq!(alias.name, "a");
        assert!(alias.span.is_synthetic());
    }

    #[test]
    fn test_explicit_alias_survives() {
        let ctx = ansi();
        let raw = select_stmt(vec![select_core(vec![select_list(vec![RawNode::node(
            "result_column",
            sp(),
            vec![
                column("a"),
                RawNode::node("alias", sp(), vec![ident("x")]),
            ],
        )])])]);
        let stmt = build_with(&ctx, &raw).unwrap();
        assert_eq!(stmt.to_string(), "SELECT a AS x");
    }

    #[test]
    fn test_unknown_statement_rule() {
        let ctx = ansi();
        let raw = RawNode::node("merge_stmt", sp(), Vec::new());
        let err = build_with(&ctx, &raw).unwrap_err();
        assert!(matches!(err, BuildError::SyntaxStructure { .. }));
    }

    #[test]
    fn test_unknown_clause_is_syntax_structure() {
        let ctx = ansi();
        let raw = select_stmt(vec![select_core(vec![
            select_list(vec![result_column(column("a"))]),
            RawNode::node("qualify_clause", sp(), Vec::new()),
        ])]);
        let err = build_with(&ctx, &raw).unwrap_err();
        let BuildError::SyntaxStructure { rule, .. } = err else {
            panic!("expected structure error, got {err:?}");
        };
        assert_eq!(rule, "qualify_clause");
    }

    #[test]
    fn test_empty_select_list_is_malformed() {
        let ctx = ansi();
        let raw = select_stmt(vec![select_core(vec![
            select_list(Vec::new()),
            RawNode::node("from_clause", sp(), vec![table("t")]),
        ])]);
        let err = build_with(&ctx, &raw).unwrap_err();
        assert!(matches!(
            err,
            BuildError::Malformed(MalformedNodeError::EmptySequence { .. })
        ));
    }

    // ── Identifier normalization ──

    #[test]
    fn test_ansi_folds_unquoted_identifiers() {
        let ctx = ansi();
        let raw = select_stmt(vec![select_core(vec![
            select_list(vec![result_column(column("Amount"))]),
            RawNode::node("from_clause", sp(), vec![table("USERS")]),
        ])]);
        let stmt = build_with(&ctx, &raw).unwrap();
        assert_eq!(stmt.to_string(), "SELECT amount FROM users");
    }

    #[test]
    fn test_mysql_preserves_identifier_case() {
        let ctx = DialectContext::new(Dialect::MySql);
        let raw = select_stmt(vec![select_core(vec![
            select_list(vec![result_column(column("Amount"))]),
            RawNode::node("from_clause", sp(), vec![table("Users")]),
        ])]);
        let stmt = build_with(&ctx, &raw).unwrap();
        assert_eq!(stmt.to_string(), "SELECT Amount FROM Users");
    }

    #[test]
    fn test_quoted_identifier_keeps_case_and_escapes() {
        let ctx = ansi();
        let raw = select_stmt(vec![select_core(vec![select_list(vec![result_column(
            RawNode::node(
                "column_ref",
                sp(),
                vec![RawNode::leaf("ident", "\"Order\"", sp())],
            ),
        )])])]);
        let stmt = build_with(&ctx, &raw).unwrap();
        // Case preserved, and "Order" is re-quoted on render as a reserved word.
        assert_eq!(stmt.to_string(), "SELECT \"Order\"");
    }

    #[test]
    fn test_wrong_quote_character_is_drift() {
        let ctx = ansi();
        let raw = select_stmt(vec![select_core(vec![select_list(vec![result_column(
            RawNode::node(
                "column_ref",
                sp(),
                vec![RawNode::leaf("ident", "`a`", sp())],
            ),
        )])])]);
        let err = build_with(&ctx, &raw).unwrap_err();
        assert!(matches!(err, BuildError::SyntaxStructure { .. }));
    }

    #[test]
    fn test_reserved_word_as_bare_identifier_rejected() {
        let ctx = ansi();
        let raw = select_stmt(vec![select_core(vec![
            select_list(vec![result_column(column("a"))]),
            RawNode::node("from_clause", sp(), vec![table("select")]),
        ])]);
        let err = build_with(&ctx, &raw).unwrap_err();
        assert!(matches!(err, BuildError::SyntaxStructure { .. }));
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let ctx = ansi();
        let raw = select_stmt(vec![select_core(vec![
            select_list(vec![result_column(column("A"))]),
            RawNode::node("from_clause", sp(), vec![table("T1")]),
        ])]);
        let normalized = select_stmt(vec![select_core(vec![
            select_list(vec![result_column(column("a"))]),
            RawNode::node("from_clause", sp(), vec![table("t1")]),
        ])]);
        let once = build_with(&ctx, &raw).unwrap();
        let again = build_with(&ctx, &normalized).unwrap();
        assert_eq!(once, again);
    }

    // ── Dialect feature gating ──

    #[test]
    fn test_rlike_rejected_under_ansi() {
        let like = RawNode::node(
            "like_expr",
            sp(),
            vec![
                RawNode::leaf("like_op", "RLIKE", sp()),
                column("a"),
                RawNode::leaf("string", "'x.*'", sp()),
            ],
        );
        let raw = select_stmt(vec![select_core(vec![
            select_list(vec![result_column(column("a"))]),
            RawNode::node("from_clause", sp(), vec![table("t")]),
            RawNode::node("where_clause", sp(), vec![like]),
        ])]);
        let err = build_with(&ansi(), &raw).unwrap_err();
        assert!(matches!(err, BuildError::UnsupportedFeature { .. }));

        let hive = DialectContext::new(Dialect::Hive);
        assert!(build_with(&hive, &raw).is_ok());
    }

    #[test]
    fn test_full_join_rejected_under_mysql() {
        let raw = select_stmt(vec![select_core(vec![
            select_list(vec![result_column(column("a"))]),
            RawNode::node(
                "from_clause",
                sp(),
                vec![
                    table("t1"),
                    RawNode::node(
                        "join",
                        sp(),
                        vec![
                            RawNode::marker("full_join", sp()),
                            table("t2"),
                            RawNode::node(
                                "on_clause",
                                sp(),
                                vec![RawNode::node(
                                    "binary_expr",
                                    sp(),
                                    vec![column("a"), op("="), column("b")],
                                )],
                            ),
                        ],
                    ),
                ],
            ),
        ])]);
        let mysql = DialectContext::new(Dialect::MySql);
        let err = build_with(&mysql, &raw).unwrap_err();
        let BuildError::UnsupportedFeature { feature, .. } = err else {
            panic!("expected unsupported feature");
        };
        assert_eq!(feature, "FULL JOIN");
        assert!(build_with(&ansi(), &raw).is_ok());
    }

    #[test]
    fn test_sort_by_clause_not_modeled() {
        let raw = select_stmt(vec![select_core(vec![
            select_list(vec![result_column(column("a"))]),
            RawNode::node("from_clause", sp(), vec![table("t")]),
            RawNode::node("sort_by_clause", sp(), vec![column("a")]),
        ])]);
        let hive = DialectContext::new(Dialect::Hive);
        let err = build_with(&hive, &raw).unwrap_err();
        assert!(matches!(err, BuildError::UnsupportedFeature { .. }));
    }

    // ── Literals and expressions ──

    #[test]
    fn test_string_literal_unescaping() {
        let ctx = ansi();
        let raw = select_stmt(vec![select_core(vec![select_list(vec![result_column(
            RawNode::leaf("string", "'it''s'", sp()),
        )])])]);
        let stmt = build_with(&ctx, &raw).unwrap();
        assert_eq!(stmt.to_string(), "SELECT 'it''s'");
    }

    #[test]
    fn test_integer_out_of_range() {
        let ctx = ansi();
        let raw = select_stmt(vec![select_core(vec![select_list(vec![result_column(
            int_lit("99999999999999999999"),
        )])])]);
        let err = build_with(&ctx, &raw).unwrap_err();
        assert!(matches!(err, BuildError::SyntaxStructure { .. }));
    }

    #[test]
    fn test_count_star() {
        let ctx = ansi();
        let call = RawNode::node(
            "function_call",
            sp(),
            vec![
                ident("count"),
                RawNode::node("args", sp(), vec![RawNode::marker("star", sp())]),
            ],
        );
        let raw = select_stmt(vec![select_core(vec![
            select_list(vec![result_column(call)]),
            RawNode::node("from_clause", sp(), vec![table("t")]),
        ])]);
        let stmt = build_with(&ctx, &raw).unwrap();
        assert_eq!(stmt.to_string(), "SELECT count(*) FROM t");
    }

    // ── DML / DDL ──

    #[test]
    fn test_insert_values() {
        let ctx = ansi();
        let raw = RawNode::node(
            "insert_stmt",
            sp(),
            vec![
                qname("t"),
                RawNode::node("column_list", sp(), vec![ident("a"), ident("b")]),
                RawNode::node(
                    "values_clause",
                    sp(),
                    vec![RawNode::node(
                        "value_row",
                        sp(),
                        vec![int_lit("1"), int_lit("2")],
                    )],
                ),
            ],
        );
        let stmt = build_with(&ctx, &raw).unwrap();
        assert_eq!(stmt.to_string(), "INSERT INTO t (a, b) VALUES (1, 2)");
    }

    #[test]
    fn test_create_table_columns() {
        let ctx = ansi();
        let raw = RawNode::node(
            "create_table_stmt",
            sp(),
            vec![
                qname("users"),
                RawNode::node(
                    "column_defs",
                    sp(),
                    vec![RawNode::node(
                        "column_def",
                        sp(),
                        vec![
                            ident("id"),
                            RawNode::leaf("type_name", "integer", sp()),
                            RawNode::marker("primary_key", sp()),
                            RawNode::marker("not_null", sp()),
                        ],
                    )],
                ),
            ],
        );
        let stmt = build_with(&ctx, &raw).unwrap();
        assert_eq!(
            stmt.to_string(),
            "CREATE TABLE users (id INTEGER PRIMARY KEY NOT NULL)"
        );
    }

    #[test]
    fn test_empty_create_table_is_malformed() {
        let ctx = ansi();
        let raw = RawNode::node(
            "create_table_stmt",
            sp(),
            vec![qname("t"), RawNode::node("column_defs", sp(), Vec::new())],
        );
        let err = build_with(&ctx, &raw).unwrap_err();
        assert!(matches!(
            err,
            BuildError::Malformed(MalformedNodeError::EmptySequence { .. })
        ));
    }

    // ── Script building ──

    #[test]
    fn test_script_continues_past_failed_statement() {
        let ctx = ansi();
        let good_one = canonical_select();
        let bad = select_stmt(vec![select_core(vec![
            select_list(Vec::new()),
            RawNode::node("from_clause", sp(), vec![table("t")]),
        ])]);
        let good_two = RawNode::node(
            "drop_table_stmt",
            sp(),
            vec![qname("old_logs")],
        );
        let script = RawNode::node("script", sp(), vec![good_one, bad, good_two]);
        let result = Builder::new(&ctx).build_script(&script).unwrap();
        assert_eq!(result.statements.len(), 2);
        assert_eq!(result.statements[1].to_string(), "DROP TABLE old_logs");
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].index, 1);
        assert!(matches!(
            result.failures[0].error,
            BuildError::Malformed(MalformedNodeError::EmptySequence { .. })
        ));
    }

    #[test]
    fn test_script_root_required() {
        let ctx = ansi();
        let err = Builder::new(&ctx)
            .build_script(&canonical_select())
            .unwrap_err();
        assert!(matches!(err, BuildError::SyntaxStructure { .. }));
    }
}
