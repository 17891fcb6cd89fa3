//! Name resolution.
//!
//! The analyzer binds a statement's identifiers against the catalog and
//! produces a [`ResolvedQuery`]. Table metadata is read fresh for every
//! statement.
//!
//! Target lists are laid out so that the planner can project by prefix:
//! requested targets come first, WHERE operands are appended after them,
//! and each operand's `target_id` is its 1-based slot in that list.

mod index;
mod query;
mod write;

pub use query::*;

use tracing::debug;

use crate::catalog::{qualified_name, Catalog};
use crate::error::{SqlError, SqlResult};
use crate::parser::{BinaryOp, Expr, ObjectRef, SelectItem, SelectStatement, Statement};
use crate::result::EXPRESSION;
use crate::sysvar::SystemVariables;
use crate::types::TableInfo;

/// Resolves statements for one session.
#[derive(Debug)]
pub struct Analyzer<'a> {
    catalog: &'a Catalog,
    sysvars: &'a SystemVariables,
    current_db: &'a str,
}

impl<'a> Analyzer<'a> {
    /// Creates an analyzer bound to the session's current database.
    pub fn new(catalog: &'a Catalog, sysvars: &'a SystemVariables, current_db: &'a str) -> Self {
        Self {
            catalog,
            sysvars,
            current_db,
        }
    }

    /// Resolves one statement.
    pub fn analyze(&self, stmt: &Statement) -> SqlResult<ResolvedQuery> {
        let resolved = match stmt {
            Statement::Select(select) => ResolvedQuery::Select(self.analyze_select(select)?),
            Statement::Insert(insert) => ResolvedQuery::Insert(self.analyze_insert(insert)?),
            Statement::Update(update) => ResolvedQuery::Update(self.analyze_update(update)?),
            Statement::CreateIndex(create) => {
                ResolvedQuery::CreateIndex(self.analyze_create_index(create)?)
            }
            Statement::Show(kind) => ResolvedQuery::Show(ShowQuery {
                kind: *kind,
                database: self.current_db.to_string(),
            }),
            Statement::CreateDatabase { .. }
            | Statement::DropDatabase { .. }
            | Statement::CreateTable(_)
            | Statement::DropTable { .. }
            | Statement::Use { .. } => {
                return Err(SqlError::unsupported(format!(
                    "{} is executed against the catalog, not analyzed",
                    stmt.tag()
                )))
            }
        };
        debug!(statement = stmt.tag(), "analyzed");
        Ok(resolved)
    }

    fn load_table(&self, table: &ObjectRef) -> SqlResult<TableInfo> {
        self.catalog
            .table_info(&qualified_name(self.current_db, table))
    }

    fn analyze_select(&self, select: &SelectStatement) -> SqlResult<SelectQuery> {
        let table = select
            .from
            .as_ref()
            .map(|from| self.load_table(from))
            .transpose()?;

        let mut fields = Vec::new();
        for item in &select.items {
            match item {
                SelectItem::Wildcard => {
                    let table = table
                        .as_ref()
                        .ok_or_else(|| SqlError::schema("'*' requires a FROM table"))?;
                    push_all_columns(&mut fields, table);
                }
                SelectItem::Expr { expr, alias } => {
                    let mut target = self.resolve_target(expr, table.as_ref(), fields.len() + 1)?;
                    if let Some(alias) = alias {
                        target.name = alias.clone();
                    }
                    fields.push(target);
                }
            }
        }
        let requested = fields.len();

        let predicate = match &select.selection {
            None => None,
            Some(_) if table.is_none() => {
                return Err(SqlError::unsupported("WHERE without FROM"));
            }
            Some(expr) => Some(self.resolve_predicate(expr, table.as_ref(), &mut fields)?),
        };

        Ok(SelectQuery {
            table,
            fields,
            requested,
            predicate,
            limit: select.limit.unwrap_or(0),
        })
    }

    /// Resolves a WHERE clause into an equality predicate, appending both
    /// operands to `fields`.
    fn resolve_predicate(
        &self,
        expr: &Expr,
        table: Option<&TableInfo>,
        fields: &mut Vec<TargetRef>,
    ) -> SqlResult<EqualityPredicate> {
        let (left, right) = match expr {
            Expr::Binary {
                left,
                op: BinaryOp::Eq,
                right,
            } => (left, right),
            other => {
                return Err(SqlError::unsupported(format!(
                    "WHERE must be a single equality, got {}",
                    other
                )))
            }
        };

        let left = self.resolve_target(left, table, fields.len() + 1)?;
        fields.push(left.clone());
        let right = self.resolve_target(right, table, fields.len() + 1)?;
        fields.push(right.clone());

        Ok(EqualityPredicate { left, right })
    }

    /// Resolves a single operand to a target occupying slot `target_id`.
    fn resolve_target(
        &self,
        expr: &Expr,
        table: Option<&TableInfo>,
        target_id: usize,
    ) -> SqlResult<TargetRef> {
        match expr {
            Expr::Column {
                table: qualifier,
                name,
            } => {
                let table = table.ok_or_else(|| {
                    SqlError::schema(format!("unknown column '{}' in field list", name))
                })?;
                if let Some(q) = qualifier {
                    if !q.eq_ignore_ascii_case(table.table()) && q != &table.name {
                        return Err(SqlError::schema(format!(
                            "unknown column '{}.{}'",
                            q, name
                        )));
                    }
                }
                let def = table.column_by_name(name).ok_or_else(|| {
                    SqlError::schema(format!(
                        "unknown column '{}' in table '{}'",
                        name, table.name
                    ))
                })?;
                Ok(TargetRef::new(
                    target_id,
                    def.name.clone(),
                    TargetKind::Column(def.position),
                ))
            }
            Expr::SessionVar(name) => {
                if self.sysvars.get(name).is_none() {
                    return Err(SqlError::schema(format!(
                        "unknown system variable '{}'",
                        name
                    )));
                }
                Ok(TargetRef::new(
                    target_id,
                    format!("@@{}", name),
                    TargetKind::SessionVar(name.clone()),
                ))
            }
            Expr::Literal(lit) => Ok(TargetRef::new(
                target_id,
                EXPRESSION,
                TargetKind::Literal(lit.to_datum()),
            )),
            Expr::Binary { .. } | Expr::Unsupported(_) => Err(SqlError::unsupported(format!(
                "expression {}",
                expr
            ))),
        }
    }
}

/// Appends every column of `table` in position order.
fn push_all_columns(fields: &mut Vec<TargetRef>, table: &TableInfo) {
    for def in table.columns() {
        let id = fields.len() + 1;
        fields.push(TargetRef::new(
            id,
            def.name.clone(),
            TargetKind::Column(def.position),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use nesoi_kv::MemoryDriver;

    use crate::catalog::execute_ddl;
    use crate::parser::Parser;
    use crate::types::Datum;

    pub(super) fn setup() -> Catalog {
        let catalog = Catalog::new(Arc::new(MemoryDriver::new()), 10);
        catalog.put_database("d").unwrap();
        let stmt = Parser::parse_one(
            "CREATE TABLE t (id INT PRIMARY KEY, name STRING NOT NULL, age INT, tag STRING)",
        )
        .unwrap();
        execute_ddl(&catalog, "d", &stmt).unwrap();
        catalog
    }

    pub(super) fn analyze(catalog: &Catalog, sql: &str) -> SqlResult<ResolvedQuery> {
        let vars = SystemVariables::defaults();
        let stmt = Parser::parse_one(sql)?;
        Analyzer::new(catalog, &vars, "d").analyze(&stmt)
    }

    fn select(catalog: &Catalog, sql: &str) -> SqlResult<SelectQuery> {
        match analyze(catalog, sql)? {
            ResolvedQuery::Select(q) => Ok(q),
            other => panic!("expected select, got {:?}", other),
        }
    }

    #[test]
    fn test_wildcard_expands_in_position_order() {
        let cat = setup();
        let q = select(&cat, "SELECT * FROM t").unwrap();
        let positions: Vec<_> = q.fields.iter().map(|f| f.position()).collect();
        assert_eq!(positions, vec![Some(1), Some(2), Some(3), Some(4)]);
        let ids: Vec<_> = q.fields.iter().map(|f| f.target_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(q.requested, 4);
        assert_eq!(q.limit, 0);
    }

    #[test]
    fn test_predicate_operands_follow_targets() {
        let cat = setup();
        let q = select(&cat, "SELECT name, age FROM t WHERE id = 5 LIMIT 2").unwrap();
        assert_eq!(q.requested, 2);
        assert_eq!(q.fields.len(), 4);

        let p = q.predicate.unwrap();
        assert_eq!(p.left.target_id, 3);
        assert_eq!(p.left.kind, TargetKind::Column(1));
        assert_eq!(p.right.target_id, 4);
        assert_eq!(p.right.kind, TargetKind::Literal(Datum::int(5)));
        assert_eq!(q.limit, 2);
    }

    #[test]
    fn test_alias_and_case_insensitive_columns() {
        let cat = setup();
        let q = select(&cat, "SELECT NAME AS who, t.age FROM d.t").unwrap();
        assert_eq!(q.fields[0].name, "who");
        assert_eq!(q.fields[0].kind, TargetKind::Column(2));
        assert_eq!(q.fields[1].kind, TargetKind::Column(3));
    }

    #[test]
    fn test_session_variables() {
        let cat = setup();
        let q = select(&cat, "SELECT @@version_comment, 7").unwrap();
        assert!(q.table.is_none());
        assert_eq!(
            q.fields[0].kind,
            TargetKind::SessionVar("version_comment".to_string())
        );
        assert_eq!(q.fields[1].name, EXPRESSION);

        assert!(matches!(
            select(&cat, "SELECT @@no_such_thing"),
            Err(SqlError::Schema(_))
        ));
    }

    #[test]
    fn test_unsupported_where_shapes() {
        let cat = setup();
        assert!(matches!(
            select(&cat, "SELECT * FROM t WHERE id > 1"),
            Err(SqlError::Unsupported(_))
        ));
        assert!(matches!(
            select(&cat, "SELECT * FROM t WHERE id = 1 AND age = 2"),
            Err(SqlError::Unsupported(_))
        ));
        assert!(matches!(
            select(&cat, "SELECT 1 WHERE 1 = 1"),
            Err(SqlError::Unsupported(_))
        ));
    }

    #[test]
    fn test_unknown_names() {
        let cat = setup();
        assert!(matches!(
            select(&cat, "SELECT nope FROM t"),
            Err(SqlError::Schema(_))
        ));
        assert!(matches!(
            select(&cat, "SELECT id FROM missing"),
            Err(SqlError::Schema(_))
        ));
        assert!(matches!(
            select(&cat, "SELECT other.id FROM t"),
            Err(SqlError::Schema(_))
        ));
        assert!(matches!(select(&cat, "SELECT *"), Err(SqlError::Schema(_))));
    }

    #[test]
    fn test_show_uses_current_database() {
        let cat = setup();
        match analyze(&cat, "SHOW TABLES").unwrap() {
            ResolvedQuery::Show(show) => assert_eq!(show.database, "d"),
            other => panic!("expected show, got {:?}", other),
        }
    }

    #[test]
    fn test_ddl_is_not_analyzed() {
        let cat = setup();
        assert!(matches!(
            analyze(&cat, "DROP TABLE t"),
            Err(SqlError::Unsupported(_))
        ));
    }
}
