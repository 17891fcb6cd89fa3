//! Lowering from the `sqlparser` AST into [`Statement`].
//!
//! Anything outside the supported subset becomes `ParseError::Unsupported`
//! here, except WHERE shapes: those are kept as [`Expr`] so the analyzer can
//! reject them with full context.

use sqlparser::ast as sql_ast;

use super::statement::*;
use super::{ParseError, ParseResult};
use crate::types::ScalarType;

/// Converts one parsed statement.
pub(super) fn lower_statement(stmt: sql_ast::Statement) -> ParseResult<Statement> {
    match stmt {
        sql_ast::Statement::Query(query) => lower_query(*query),
        sql_ast::Statement::Insert {
            table_name,
            columns,
            source,
            ..
        } => lower_insert(table_name, columns, source),
        sql_ast::Statement::Update {
            table,
            assignments,
            from,
            selection,
            ..
        } => lower_update(table, assignments, from, selection),
        sql_ast::Statement::CreateTable {
            name,
            columns,
            constraints,
            if_not_exists,
            ..
        } => lower_create_table(name, columns, constraints, if_not_exists),
        sql_ast::Statement::CreateIndex {
            name,
            table_name,
            columns,
            unique,
            if_not_exists,
            ..
        } => {
            let name = name.ok_or_else(|| {
                ParseError::Unsupported("CREATE INDEX without an index name".to_string())
            })?;
            let columns = columns
                .into_iter()
                .map(|c| match c.expr {
                    sql_ast::Expr::Identifier(ident) => Ok(ident.value),
                    other => Err(ParseError::Unsupported(format!(
                        "index on expression {}",
                        other
                    ))),
                })
                .collect::<ParseResult<Vec<_>>>()?;
            Ok(Statement::CreateIndex(CreateIndexStatement {
                name: object_ref(&name)?,
                table: object_ref(&table_name)?,
                columns,
                unique,
                if_not_exists,
            }))
        }
        sql_ast::Statement::CreateDatabase {
            db_name,
            if_not_exists,
            ..
        } => Ok(Statement::CreateDatabase {
            name: single_name(&db_name)?,
            if_not_exists,
        }),
        sql_ast::Statement::Drop {
            object_type,
            if_exists,
            names,
            ..
        } => {
            let name = match names.as_slice() {
                [only] => only,
                _ => {
                    return Err(ParseError::Unsupported(
                        "DROP of more than one object".to_string(),
                    ))
                }
            };
            match object_type {
                sql_ast::ObjectType::Table => Ok(Statement::DropTable {
                    table: object_ref(name)?,
                    if_exists,
                }),
                sql_ast::ObjectType::Schema => Ok(Statement::DropDatabase {
                    name: single_name(name)?,
                    if_exists,
                }),
                other => Err(ParseError::Unsupported(format!("DROP {}", other))),
            }
        }
        sql_ast::Statement::Use { db_name, .. } => Ok(Statement::Use {
            database: db_name.value,
        }),
        sql_ast::Statement::ShowTables { .. } => Ok(Statement::Show(ShowKind::Tables)),
        sql_ast::Statement::ShowVariable { variable, .. } => match show_kind(&variable) {
            Some(kind) => Ok(Statement::Show(kind)),
            None => Err(ParseError::Unsupported(format!(
                "SHOW {}",
                variable
                    .iter()
                    .map(|i| i.value.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            ))),
        },
        other => Err(ParseError::Unsupported(format!("statement: {}", other))),
    }
}

fn show_kind(words: &[sql_ast::Ident]) -> Option<ShowKind> {
    match words {
        [word] if word.quote_style.is_none() => {
            if word.value.eq_ignore_ascii_case("databases") {
                Some(ShowKind::Databases)
            } else if word.value.eq_ignore_ascii_case("tables") {
                Some(ShowKind::Tables)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn object_ref(name: &sql_ast::ObjectName) -> ParseResult<ObjectRef> {
    match name.0.as_slice() {
        [table] => Ok(ObjectRef::new(&table.value)),
        [schema, table] => Ok(ObjectRef::qualified(&schema.value, &table.value)),
        _ => Err(ParseError::InvalidIdentifier(name.to_string())),
    }
}

fn single_name(name: &sql_ast::ObjectName) -> ParseResult<String> {
    match name.0.as_slice() {
        [only] => Ok(only.value.clone()),
        _ => Err(ParseError::InvalidIdentifier(name.to_string())),
    }
}

fn lower_query(query: sql_ast::Query) -> ParseResult<Statement> {
    if query.with.is_some() {
        return Err(ParseError::Unsupported("WITH".to_string()));
    }
    if !query.order_by.is_empty() {
        return Err(ParseError::Unsupported("ORDER BY".to_string()));
    }
    if query.offset.is_some() {
        return Err(ParseError::Unsupported("OFFSET".to_string()));
    }

    let limit = query.limit.as_ref().map(extract_limit).transpose()?;

    let select = match *query.body {
        sql_ast::SetExpr::Select(select) => *select,
        other => {
            return Err(ParseError::Unsupported(format!(
                "set expression: {}",
                other
            )))
        }
    };

    if select.distinct.is_some() {
        return Err(ParseError::Unsupported("DISTINCT".to_string()));
    }
    if select.having.is_some() {
        return Err(ParseError::Unsupported("HAVING".to_string()));
    }
    match &select.group_by {
        sql_ast::GroupByExpr::Expressions(exprs) if exprs.is_empty() => {}
        _ => return Err(ParseError::Unsupported("GROUP BY".to_string())),
    }

    let from = match select.from.as_slice() {
        [] => None,
        [table] => Some(lower_table(table)?),
        _ => return Err(ParseError::Unsupported("multiple tables in FROM".to_string())),
    };

    // `SELECT DATABASES` is accepted as a spelling of SHOW DATABASES.
    if from.is_none() && select.selection.is_none() {
        if let [sql_ast::SelectItem::UnnamedExpr(sql_ast::Expr::Identifier(ident))] =
            select.projection.as_slice()
        {
            if let Some(kind) = show_kind(std::slice::from_ref(ident)) {
                return Ok(Statement::Show(kind));
            }
        }
    }

    let items = select
        .projection
        .into_iter()
        .map(lower_select_item)
        .collect::<ParseResult<Vec<_>>>()?;

    let selection = select.selection.map(lower_expr).transpose()?;

    Ok(Statement::Select(SelectStatement {
        from,
        items,
        selection,
        limit,
    }))
}

fn lower_table(table: &sql_ast::TableWithJoins) -> ParseResult<ObjectRef> {
    if !table.joins.is_empty() {
        return Err(ParseError::Unsupported("JOIN".to_string()));
    }
    match &table.relation {
        sql_ast::TableFactor::Table { name, .. } => object_ref(name),
        other => Err(ParseError::Unsupported(format!("table factor: {}", other))),
    }
}

fn lower_select_item(item: sql_ast::SelectItem) -> ParseResult<SelectItem> {
    match item {
        sql_ast::SelectItem::UnnamedExpr(expr) => Ok(SelectItem::Expr {
            expr: lower_expr(expr)?,
            alias: None,
        }),
        sql_ast::SelectItem::ExprWithAlias { expr, alias } => Ok(SelectItem::Expr {
            expr: lower_expr(expr)?,
            alias: Some(alias.value),
        }),
        sql_ast::SelectItem::Wildcard(_) => Ok(SelectItem::Wildcard),
        sql_ast::SelectItem::QualifiedWildcard(name, _) => Err(ParseError::Unsupported(
            format!("qualified wildcard {}.*", name),
        )),
    }
}

fn lower_insert(
    table_name: sql_ast::ObjectName,
    columns: Vec<sql_ast::Ident>,
    source: Option<Box<sql_ast::Query>>,
) -> ParseResult<Statement> {
    let table = object_ref(&table_name)?;
    let columns = columns.into_iter().map(|c| c.value).collect();

    let source = source.ok_or_else(|| ParseError::Syntax("INSERT without VALUES".to_string()))?;
    let rows = match *source.body {
        sql_ast::SetExpr::Values(values) => values
            .rows
            .into_iter()
            .map(|row| row.into_iter().map(lower_expr).collect())
            .collect::<ParseResult<Vec<Vec<_>>>>()?,
        _ => return Err(ParseError::Unsupported("INSERT ... SELECT".to_string())),
    };

    Ok(Statement::Insert(InsertStatement {
        table,
        columns,
        rows,
    }))
}

fn lower_update(
    table: sql_ast::TableWithJoins,
    assignments: Vec<sql_ast::Assignment>,
    from: Option<sql_ast::TableWithJoins>,
    selection: Option<sql_ast::Expr>,
) -> ParseResult<Statement> {
    if from.is_some() {
        return Err(ParseError::Unsupported("UPDATE ... FROM".to_string()));
    }
    let table = lower_table(&table)?;

    let assignments = assignments
        .into_iter()
        .map(|a| {
            Ok(Assignment {
                target: a.id.into_iter().map(|i| i.value).collect(),
                value: lower_expr(a.value)?,
            })
        })
        .collect::<ParseResult<Vec<_>>>()?;

    let selection = selection.map(lower_expr).transpose()?;

    Ok(Statement::Update(UpdateStatement {
        table,
        assignments,
        selection,
    }))
}

fn lower_create_table(
    name: sql_ast::ObjectName,
    columns: Vec<sql_ast::ColumnDef>,
    constraints: Vec<sql_ast::TableConstraint>,
    if_not_exists: bool,
) -> ParseResult<Statement> {
    let mut specs = columns
        .into_iter()
        .map(lower_column)
        .collect::<ParseResult<Vec<_>>>()?;

    for constraint in constraints {
        match constraint {
            sql_ast::TableConstraint::Unique {
                columns,
                is_primary,
                ..
            } => {
                for col in columns {
                    let spec = specs
                        .iter_mut()
                        .find(|s| s.name.eq_ignore_ascii_case(&col.value))
                        .ok_or_else(|| {
                            ParseError::InvalidIdentifier(format!(
                                "constraint on unknown column {}",
                                col.value
                            ))
                        })?;
                    if is_primary {
                        spec.primary_key = true;
                        spec.nullable = false;
                    } else {
                        spec.unique = true;
                    }
                }
            }
            other => {
                return Err(ParseError::Unsupported(format!("constraint {}", other)));
            }
        }
    }

    Ok(Statement::CreateTable(CreateTableStatement {
        table: object_ref(&name)?,
        columns: specs,
        if_not_exists,
    }))
}

fn lower_column(col: sql_ast::ColumnDef) -> ParseResult<ColumnSpec> {
    let mut spec = ColumnSpec {
        scalar_type: lower_type(&col.data_type)?,
        name: col.name.value,
        nullable: true,
        primary_key: false,
        unique: false,
    };

    for opt in col.options {
        match opt.option {
            sql_ast::ColumnOption::Null => spec.nullable = true,
            sql_ast::ColumnOption::NotNull => spec.nullable = false,
            sql_ast::ColumnOption::Unique { is_primary, .. } => {
                if is_primary {
                    spec.primary_key = true;
                    spec.nullable = false;
                } else {
                    spec.unique = true;
                }
            }
            other => {
                return Err(ParseError::Unsupported(format!(
                    "column option {} on {}",
                    other, spec.name
                )))
            }
        }
    }
    Ok(spec)
}

fn lower_type(data_type: &sql_ast::DataType) -> ParseResult<ScalarType> {
    match data_type {
        sql_ast::DataType::TinyInt(_)
        | sql_ast::DataType::SmallInt(_)
        | sql_ast::DataType::MediumInt(_)
        | sql_ast::DataType::Int(_)
        | sql_ast::DataType::Integer(_)
        | sql_ast::DataType::BigInt(_) => Ok(ScalarType::Int64),
        sql_ast::DataType::Char(_)
        | sql_ast::DataType::Varchar(_)
        | sql_ast::DataType::Text => Ok(ScalarType::String),
        other => {
            // Unsigned and dialect-specific spellings, e.g. `INT UNSIGNED`, `STRING`.
            let spelled = other.to_string().to_ascii_uppercase();
            let word = spelled
                .split(|c: char| !c.is_ascii_alphabetic())
                .next()
                .unwrap_or_default();
            match word {
                "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" | "BIGINT" => {
                    Ok(ScalarType::Int64)
                }
                "STRING" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "CHARACTER" => {
                    Ok(ScalarType::String)
                }
                _ => Err(ParseError::Unsupported(format!("column type {}", other))),
            }
        }
    }
}

fn extract_limit(expr: &sql_ast::Expr) -> ParseResult<u64> {
    match expr {
        sql_ast::Expr::Value(sql_ast::Value::Number(n, _)) => n
            .parse()
            .map_err(|_| ParseError::InvalidLiteral(format!("LIMIT {}", n))),
        other => Err(ParseError::Unsupported(format!("LIMIT {}", other))),
    }
}

/// Converts an expression. Shapes outside the supported set become
/// [`Expr::Unsupported`] rather than errors.
fn lower_expr(expr: sql_ast::Expr) -> ParseResult<Expr> {
    match expr {
        sql_ast::Expr::Identifier(ident) => match ident.value.strip_prefix("@@") {
            Some(var) if ident.quote_style.is_none() => Ok(Expr::SessionVar(var.to_string())),
            _ => Ok(Expr::column(ident.value)),
        },
        sql_ast::Expr::CompoundIdentifier(idents) => match idents.as_slice() {
            [scope, var] if is_variable_scope(&scope.value) => {
                Ok(Expr::SessionVar(var.value.clone()))
            }
            [table, column] => Ok(Expr::Column {
                table: Some(table.value.clone()),
                name: column.value.clone(),
            }),
            _ => Err(ParseError::InvalidIdentifier(
                idents
                    .iter()
                    .map(|i| i.value.as_str())
                    .collect::<Vec<_>>()
                    .join("."),
            )),
        },
        sql_ast::Expr::Value(value) => Ok(Expr::Literal(lower_value(&value, false)?)),
        sql_ast::Expr::UnaryOp {
            op: sql_ast::UnaryOperator::Minus,
            expr,
        } => match *expr {
            sql_ast::Expr::Value(value @ sql_ast::Value::Number(..)) => {
                Ok(Expr::Literal(lower_value(&value, true)?))
            }
            other => Ok(Expr::Unsupported(format!("-{}", other))),
        },
        sql_ast::Expr::Nested(inner) => lower_expr(*inner),
        sql_ast::Expr::BinaryOp { left, op, right } => {
            let op = match op {
                sql_ast::BinaryOperator::Eq => BinaryOp::Eq,
                other => BinaryOp::Other(other.to_string()),
            };
            Ok(Expr::Binary {
                left: Box::new(lower_expr(*left)?),
                op,
                right: Box::new(lower_expr(*right)?),
            })
        }
        other => Ok(Expr::Unsupported(other.to_string())),
    }
}

fn is_variable_scope(word: &str) -> bool {
    ["@@session", "@@global", "@@local"]
        .iter()
        .any(|s| word.eq_ignore_ascii_case(s))
}

fn lower_value(value: &sql_ast::Value, negate: bool) -> ParseResult<Literal> {
    match value {
        sql_ast::Value::Null => Ok(Literal::Null),
        sql_ast::Value::Number(n, _) => {
            let text = if negate { format!("-{}", n) } else { n.clone() };
            text.parse::<i64>()
                .map(Literal::Int)
                .map_err(|_| ParseError::Unsupported(format!("numeric literal {}", text)))
        }
        sql_ast::Value::SingleQuotedString(s) | sql_ast::Value::DoubleQuotedString(s) => {
            Ok(Literal::String(s.clone()))
        }
        other => Err(ParseError::Unsupported(format!("literal {}", other))),
    }
}
