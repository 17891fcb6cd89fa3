//! Catalog statements.
//!
//! DDL has no plan: each statement is a single-shot mutation of catalog
//! entries (and, for drops, of the rows and index entries they own).

use std::collections::HashSet;

use nesoi_kv::Namespace;
use tracing::info;

use super::{check_object_name, qualified_name, Catalog};
use crate::encoding;
use crate::error::{SqlError, SqlResult};
use crate::parser::{CreateTableStatement, ObjectRef, Statement};
use crate::types::ColumnDef;

/// What a catalog statement did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DdlOutcome {
    /// The catalog was changed.
    Done,
    /// IF [NOT] EXISTS turned the statement into a no-op; carries the
    /// warning text.
    Skipped(String),
    /// USE succeeded; the session should switch to this database.
    UseDatabase(String),
}

/// Executes a catalog statement against `catalog`.
pub fn execute_ddl(catalog: &Catalog, current_db: &str, stmt: &Statement) -> SqlResult<DdlOutcome> {
    match stmt {
        Statement::CreateDatabase {
            name,
            if_not_exists,
        } => create_database(catalog, name, *if_not_exists),
        Statement::DropDatabase { name, if_exists } => drop_database(catalog, name, *if_exists),
        Statement::CreateTable(create) => create_table(catalog, current_db, create),
        Statement::DropTable { table, if_exists } => {
            drop_table(catalog, current_db, table, *if_exists)
        }
        Statement::Use { database } => {
            if catalog.database_exists(database)? {
                Ok(DdlOutcome::UseDatabase(database.clone()))
            } else {
                Err(unknown_database(database))
            }
        }
        Statement::CreateIndex(_)
        | Statement::Show(_)
        | Statement::Select(_)
        | Statement::Insert(_)
        | Statement::Update(_) => Err(SqlError::unsupported(format!(
            "{} is not a catalog statement",
            stmt.tag()
        ))),
    }
}

fn unknown_database(name: &str) -> SqlError {
    SqlError::schema(format!("unknown database '{}'", name))
}

fn create_database(catalog: &Catalog, name: &str, if_not_exists: bool) -> SqlResult<DdlOutcome> {
    check_object_name("database", name)?;
    if catalog.database_exists(name)? {
        if if_not_exists {
            return Ok(DdlOutcome::Skipped(format!(
                "database '{}' already exists",
                name
            )));
        }
        return Err(SqlError::schema(format!("database '{}' already exists", name)));
    }
    catalog.put_database(name)?;
    info!(database = name, "created database");
    Ok(DdlOutcome::Done)
}

fn drop_database(catalog: &Catalog, name: &str, if_exists: bool) -> SqlResult<DdlOutcome> {
    if !catalog.database_exists(name)? {
        if if_exists {
            return Ok(DdlOutcome::Skipped(format!("database '{}' doesn't exist", name)));
        }
        return Err(unknown_database(name));
    }
    let tables = catalog.list_tables(name)?;
    for table in &tables {
        drop_table_contents(catalog, &format!("{}.{}", name, table))?;
    }
    catalog.delete_database(name)?;
    info!(database = name, tables = tables.len(), "dropped database");
    Ok(DdlOutcome::Done)
}

fn create_table(
    catalog: &Catalog,
    current_db: &str,
    create: &CreateTableStatement,
) -> SqlResult<DdlOutcome> {
    check_object_name("table", &create.table.name)?;
    let db = create.table.schema.as_deref().unwrap_or(current_db);
    if !catalog.database_exists(db)? {
        return Err(unknown_database(db));
    }

    let qualified = qualified_name(current_db, &create.table);
    if catalog.table_exists(&qualified)? {
        if create.if_not_exists {
            return Ok(DdlOutcome::Skipped(format!(
                "table '{}' already exists",
                qualified
            )));
        }
        return Err(SqlError::schema(format!("table '{}' already exists", qualified)));
    }

    if catalog.index_meta(&qualified)?.is_some() {
        return Err(SqlError::schema(format!(
            "table '{}' collides with an index of the same name",
            qualified
        )));
    }

    if create.columns.is_empty() {
        return Err(SqlError::schema(format!("table '{}' has no columns", qualified)));
    }

    let mut seen = HashSet::new();
    let mut defs = Vec::with_capacity(create.columns.len());
    for (i, spec) in create.columns.iter().enumerate() {
        if !seen.insert(spec.name.to_ascii_lowercase()) {
            return Err(SqlError::schema(format!("duplicate column name '{}'", spec.name)));
        }
        defs.push(ColumnDef {
            name: spec.name.clone(),
            position: i + 1,
            scalar_type: spec.scalar_type,
            nullable: spec.nullable && !spec.primary_key,
            primary_key: spec.primary_key,
            unique: spec.unique,
        });
    }

    if !defs.iter().any(|d| d.primary_key) {
        return Err(SqlError::schema(format!(
            "table '{}' must have a primary key",
            qualified
        )));
    }

    catalog.put_column_defs(&qualified, &defs)?;
    info!(table = %qualified, columns = defs.len(), "created table");
    Ok(DdlOutcome::Done)
}

fn drop_table(
    catalog: &Catalog,
    current_db: &str,
    table: &ObjectRef,
    if_exists: bool,
) -> SqlResult<DdlOutcome> {
    let qualified = qualified_name(current_db, table);
    if !catalog.table_exists(&qualified)? {
        if if_exists {
            return Ok(DdlOutcome::Skipped(format!("table '{}' doesn't exist", qualified)));
        }
        return Err(SqlError::schema(format!("table '{}' doesn't exist", qualified)));
    }
    drop_table_contents(catalog, &qualified)?;
    Ok(DdlOutcome::Done)
}

/// Removes a table's rows, its indexes and their entries, then the table
/// entry itself.
fn drop_table_contents(catalog: &Catalog, qualified: &str) -> SqlResult<()> {
    for index in catalog.table_indexes(qualified)? {
        catalog.delete_prefix(Namespace::User, &encoding::index_prefix(&index.name))?;
        catalog.unregister_index(&index)?;
    }
    let rows = catalog.delete_prefix(Namespace::User, &encoding::row_prefix(qualified))?;
    catalog.delete_table(qualified)?;
    info!(table = qualified, rows, "dropped table");
    Ok(())
}
