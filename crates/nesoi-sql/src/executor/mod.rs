//! Pull-based execution.
//!
//! Each plan node becomes an [`Operator`]. A parent calls `next()` on its
//! child exactly when it needs another row, and no operator holds more than
//! one upstream row at a time. End of stream is `Ok(None)`; errors abort the
//! statement and leave already-issued writes in place.
//!
//! # Example
//!
//! ```ignore
//! let ctx = Arc::new(ExecContext::new(driver, sysvars, "Nesoi", 10));
//! let mut op = build_operator(&ctx, plan)?;
//! while let Some(record) = op.next()? {
//!     // ...
//! }
//! ```

mod index;
mod relational;
mod scan;
mod show;
mod write;

pub use index::{decode_index_entry, remove_index_entry, write_index_entry, IndexEntry};
pub use relational::{FilterExec, LimitExec, ProjectionExec};
pub use scan::{PointLookupExec, ScanExec};
pub use show::{CatalogListExec, ConstantRowExec, CreateIndexExec};
pub use write::{InsertExec, UpdateExec};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use nesoi_kv::KvDriver;

use crate::analyzer::{TargetKind, TargetRef};
use crate::catalog::Catalog;
use crate::error::{SqlError, SqlResult};
use crate::planner::PlanNode;
use crate::result::{ColumnMeta, ResultSet};
use crate::sysvar::SystemVariables;
use crate::types::{Datum, Record, ScalarType, TableInfo};

/// A Volcano-style iterator.
pub trait Operator: fmt::Debug {
    /// Metadata of the columns this operator produces.
    fn columns(&self) -> SqlResult<Vec<ColumnMeta>>;

    /// Produces the next row, or `None` at end of stream.
    fn next(&mut self) -> SqlResult<Option<Record>>;

    /// Returns true once the operator will produce no more rows.
    fn done(&self) -> bool;
}

/// State shared by the operators of one statement.
pub struct ExecContext {
    driver: Arc<dyn KvDriver>,
    sysvars: Arc<SystemVariables>,
    current_db: String,
    batch_size: usize,
    affected_rows: AtomicU64,
    warnings: AtomicU64,
}

impl fmt::Debug for ExecContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecContext")
            .field("current_db", &self.current_db)
            .field("batch_size", &self.batch_size)
            .field("affected_rows", &self.affected_rows())
            .field("warnings", &self.warnings())
            .finish_non_exhaustive()
    }
}

impl ExecContext {
    /// Creates a context for one statement.
    pub fn new(
        driver: Arc<dyn KvDriver>,
        sysvars: Arc<SystemVariables>,
        current_db: impl Into<String>,
        batch_size: usize,
    ) -> Self {
        Self {
            driver,
            sysvars,
            current_db: current_db.into(),
            batch_size: batch_size.max(1),
            affected_rows: AtomicU64::new(0),
            warnings: AtomicU64::new(0),
        }
    }

    /// The KV driver.
    pub fn driver(&self) -> &dyn KvDriver {
        self.driver.as_ref()
    }

    /// A catalog accessor over the same driver.
    pub fn catalog(&self) -> Catalog {
        Catalog::new(self.driver.clone(), self.batch_size)
    }

    /// Keys requested per scan page.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// The session's current database.
    pub fn current_db(&self) -> &str {
        &self.current_db
    }

    /// Looks up a system variable.
    pub fn sysvar(&self, name: &str) -> SqlResult<&Datum> {
        self.sysvars
            .get(name)
            .ok_or_else(|| SqlError::schema(format!("unknown system variable '{}'", name)))
    }

    /// Rows changed so far.
    pub fn affected_rows(&self) -> u64 {
        self.affected_rows.load(Ordering::Relaxed)
    }

    pub(crate) fn add_affected_rows(&self, n: u64) {
        self.affected_rows.fetch_add(n, Ordering::Relaxed);
    }

    /// Warnings raised so far.
    pub fn warnings(&self) -> u64 {
        self.warnings.load(Ordering::Relaxed)
    }

    pub(crate) fn add_warning(&self) {
        self.warnings.fetch_add(1, Ordering::Relaxed);
    }
}

/// Builds the operator tree for a plan.
pub fn build_operator(ctx: &Arc<ExecContext>, plan: PlanNode) -> SqlResult<Box<dyn Operator>> {
    let op: Box<dyn Operator> = match plan {
        PlanNode::Scan { table, fields } => Box::new(ScanExec::new(ctx.clone(), table, fields)),
        PlanNode::ScanByPrimaryKey { table, fields, key } => {
            Box::new(PointLookupExec::new(ctx.clone(), table, fields, &key))
        }
        PlanNode::Filter { input, predicate } => {
            Box::new(FilterExec::new(build_operator(ctx, *input)?, predicate))
        }
        PlanNode::Projection { input, count } => {
            Box::new(ProjectionExec::new(build_operator(ctx, *input)?, count))
        }
        PlanNode::Limit { input, count } => {
            Box::new(LimitExec::new(build_operator(ctx, *input)?, count))
        }
        PlanNode::Insert { table, rows } => Box::new(InsertExec::new(ctx.clone(), table, rows)),
        PlanNode::Update {
            input,
            table,
            assignments,
        } => Box::new(UpdateExec::new(
            ctx.clone(),
            build_operator(ctx, *input)?,
            table,
            assignments,
        )),
        PlanNode::CatalogList { kind, database } => {
            Box::new(CatalogListExec::new(ctx.clone(), kind, database))
        }
        PlanNode::ConstantRow { fields } => Box::new(ConstantRowExec::new(ctx.clone(), fields)),
        PlanNode::CreateIndex(create) => Box::new(CreateIndexExec::new(ctx.clone(), create)),
    };
    Ok(op)
}

/// Runs a plan to completion. Plans that return rows yield a result set.
pub fn execute(ctx: &Arc<ExecContext>, plan: PlanNode) -> SqlResult<Option<ResultSet>> {
    let returns_rows = plan.returns_rows();
    let mut op = build_operator(ctx, plan)?;

    if !returns_rows {
        while op.next()?.is_some() {}
        return Ok(None);
    }

    let mut result = ResultSet::new(op.columns()?);
    while let Some(record) = op.next()? {
        result.rows.push(record);
    }
    Ok(Some(result))
}

/// Produces the requested fields from a full table row (empty when there is
/// no table).
pub(crate) fn materialize(
    ctx: &ExecContext,
    fields: &[TargetRef],
    row: &[Datum],
) -> SqlResult<Record> {
    fields
        .iter()
        .map(|field| match &field.kind {
            TargetKind::Column(pos) => pos
                .checked_sub(1)
                .and_then(|i| row.get(i))
                .cloned()
                .ok_or_else(|| {
                    SqlError::decode(format!(
                        "field {} refers to position {} of a {}-column row",
                        field.name,
                        pos,
                        row.len()
                    ))
                }),
            TargetKind::SessionVar(name) => ctx.sysvar(name).cloned(),
            TargetKind::Literal(datum) => Ok(datum.clone()),
        })
        .collect::<SqlResult<Vec<_>>>()
        .map(Record::new)
}

/// Column metadata for one field.
pub(crate) fn field_meta(
    ctx: &ExecContext,
    table: Option<&TableInfo>,
    field: &TargetRef,
) -> SqlResult<ColumnMeta> {
    match &field.kind {
        TargetKind::Column(pos) => {
            let table = table.ok_or_else(|| {
                SqlError::schema(format!("column '{}' without a table", field.name))
            })?;
            let def = table.column(*pos).ok_or_else(|| {
                SqlError::corrupt(format!("{} has no position {}", table.name, pos))
            })?;
            Ok(ColumnMeta::from_column(table.schema(), table.table(), def)
                .with_alias(field.name.clone()))
        }
        TargetKind::SessionVar(name) => {
            let ty = ctx
                .sysvar(name)?
                .scalar_type()
                .unwrap_or(ScalarType::String);
            Ok(ColumnMeta::dual(ctx.current_db(), &field.name, ty))
        }
        TargetKind::Literal(datum) => Ok(ColumnMeta::dual(
            ctx.current_db(),
            &field.name,
            datum.scalar_type().unwrap_or(ScalarType::String),
        )),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{DUAL, TYPE_LONG, TYPE_STRING};

    #[test]
    fn test_materialize() {
        let ctx = test_util::context();
        let fields = vec![
            TargetRef::new(1, "b", TargetKind::Column(2)),
            TargetRef::new(2, "@@autocommit", TargetKind::SessionVar("autocommit".into())),
            TargetRef::new(3, "EXPRESSION", TargetKind::Literal(Datum::from("x"))),
        ];
        let row = vec![Datum::int(1), Datum::from("two")];
        let record = materialize(&ctx, &fields, &row).unwrap();
        assert_eq!(
            record.datums(),
            &[Datum::from("two"), Datum::int(1), Datum::from("x")]
        );

        let bad = vec![TargetRef::new(1, "z", TargetKind::Column(3))];
        assert!(materialize(&ctx, &bad, &row).is_err());
    }

    #[test]
    fn test_field_meta() {
        let ctx = test_util::context();
        let table = ctx.catalog().table_info("d.t").unwrap();

        let meta = field_meta(&ctx, Some(&table), &TargetRef::new(1, "n", TargetKind::Column(2)))
            .unwrap();
        assert_eq!(meta.table, "t");
        assert_eq!(meta.schema, "d");
        assert_eq!(meta.name, "n");
        assert_eq!(meta.org_name, "name");
        assert_eq!(meta.column_type, TYPE_STRING);

        let meta = field_meta(
            &ctx,
            None,
            &TargetRef::new(1, "EXPRESSION", TargetKind::Literal(Datum::int(1))),
        )
        .unwrap();
        assert_eq!(meta.table, DUAL);
        assert_eq!(meta.column_type, TYPE_LONG);
    }

    #[test]
    fn test_counters() {
        let ctx = test_util::context();
        ctx.add_affected_rows(2);
        ctx.add_warning();
        assert_eq!(ctx.affected_rows(), 2);
        assert_eq!(ctx.warnings(), 1);
    }
}
