//! INSERT and UPDATE resolution.

use std::collections::{BTreeMap, HashSet};

use nesoi_kv::Namespace;

use super::{push_all_columns, Analyzer, InsertQuery, InsertRow, UpdateQuery};
use crate::encoding;
use crate::error::{SqlError, SqlResult};
use crate::parser::{Expr, InsertStatement, UpdateStatement};
use crate::types::{ColumnDef, Datum, TableInfo};

impl<'a> Analyzer<'a> {
    pub(super) fn analyze_insert(&self, insert: &InsertStatement) -> SqlResult<InsertQuery> {
        let table = self.load_table(&insert.table)?;

        let positions = if insert.columns.is_empty() {
            table.columns().map(|c| c.position).collect::<Vec<_>>()
        } else {
            let mut seen = HashSet::new();
            insert
                .columns
                .iter()
                .map(|name| {
                    let def = lookup_column(&table, name)?;
                    if !seen.insert(def.position) {
                        return Err(SqlError::schema(format!(
                            "column '{}' specified twice",
                            def.name
                        )));
                    }
                    Ok(def.position)
                })
                .collect::<SqlResult<Vec<_>>>()?
        };

        let mut keys = HashSet::new();
        let mut rows = Vec::with_capacity(insert.rows.len());
        for (n, values) in insert.rows.iter().enumerate() {
            if values.len() != positions.len() {
                return Err(SqlError::schema(format!(
                    "column count doesn't match value count at row {}",
                    n + 1
                )));
            }

            let mut datums = vec![Datum::Null; table.num_columns()];
            for (&pos, expr) in positions.iter().zip(values) {
                let def = column_at(&table, pos)?;
                datums[pos - 1] = literal_for(def, expr)?;
            }

            for def in table.columns() {
                if def.requires_value() && datums[def.position - 1].is_null() {
                    return Err(SqlError::NullConstraint(def.name.clone()));
                }
            }

            let pk: Vec<&Datum> = table
                .primary_key()
                .iter()
                .map(|c| &datums[c.position - 1])
                .collect();
            let key = encoding::row_key(&table.name, pk.iter().copied());
            let duplicate = !keys.insert(key.clone())
                || self
                    .catalog
                    .driver()
                    .get(Namespace::User, &key)?
                    .is_some();
            if duplicate {
                return Err(SqlError::DuplicateKey(format!(
                    "'{}' in table '{}'",
                    pk.iter()
                        .map(|d| d.to_string())
                        .collect::<Vec<_>>()
                        .join("-"),
                    table.name
                )));
            }

            rows.push(InsertRow { key, datums });
        }

        Ok(InsertQuery { table, rows })
    }

    pub(super) fn analyze_update(&self, update: &UpdateStatement) -> SqlResult<UpdateQuery> {
        let table = self.load_table(&update.table)?;

        let mut assignments = BTreeMap::new();
        for assignment in &update.assignments {
            let name = match assignment.target.as_slice() {
                [column] => column,
                [qualifier, column]
                    if qualifier.eq_ignore_ascii_case(table.table())
                        || qualifier == &table.name =>
                {
                    column
                }
                other => {
                    return Err(SqlError::unsupported(format!(
                        "SET target {}",
                        other.join(".")
                    )))
                }
            };
            let def = lookup_column(&table, name)?;
            if def.primary_key {
                return Err(SqlError::unsupported(format!(
                    "updating primary key column '{}'",
                    def.name
                )));
            }
            let value = literal_for(def, &assignment.value)?;
            if def.requires_value() && value.is_null() {
                return Err(SqlError::NullConstraint(def.name.clone()));
            }
            assignments.insert(def.position, value);
        }

        let mut fields = Vec::with_capacity(table.num_columns() + 2);
        push_all_columns(&mut fields, &table);
        let requested = fields.len();

        let predicate = update
            .selection
            .as_ref()
            .map(|expr| self.resolve_predicate(expr, Some(&table), &mut fields))
            .transpose()?;

        Ok(UpdateQuery {
            table,
            fields,
            requested,
            assignments,
            predicate,
        })
    }
}

pub(super) fn lookup_column<'t>(table: &'t TableInfo, name: &str) -> SqlResult<&'t ColumnDef> {
    table.column_by_name(name).ok_or_else(|| {
        SqlError::schema(format!(
            "unknown column '{}' in table '{}'",
            name, table.name
        ))
    })
}

fn column_at(table: &TableInfo, pos: usize) -> SqlResult<&ColumnDef> {
    table
        .column(pos)
        .ok_or_else(|| SqlError::corrupt(format!("{} has no position {}", table.name, pos)))
}

/// Converts a value expression for `def`, checking its type.
fn literal_for(def: &ColumnDef, expr: &Expr) -> SqlResult<Datum> {
    let datum = match expr {
        Expr::Literal(lit) => lit.to_datum(),
        other => {
            return Err(SqlError::unsupported(format!(
                "value {} for column '{}' is not a literal",
                other, def.name
            )))
        }
    };
    if !datum.fits(def.scalar_type) {
        return Err(SqlError::Type(format!(
            "column '{}' is {}, got {}",
            def.name,
            def.scalar_type,
            datum.kind_name()
        )));
    }
    Ok(datum)
}
