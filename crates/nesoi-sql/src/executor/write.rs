//! Row writes with index fan-out.
//!
//! The row write and each index write are separate KV operations. A
//! failure part way leaves earlier writes in place.

use std::collections::BTreeMap;
use std::sync::Arc;

use nesoi_kv::{Namespace, NO_EXPIRY};
use tracing::debug;

use super::index::check_unique;
use super::{remove_index_entry, write_index_entry, ExecContext, Operator};
use crate::analyzer::InsertRow;
use crate::catalog::IndexMeta;
use crate::encoding::{self, encode_row};
use crate::error::SqlResult;
use crate::result::ColumnMeta;
use crate::types::{Datum, Record, TableInfo};

fn index_key(index: &IndexMeta, row: &[Datum]) -> SqlResult<Vec<u8>> {
    Ok(encoding::index_key(&index.name, index.key_values(row)?))
}

/// Writes every row of an INSERT on its first pull.
#[derive(Debug)]
pub struct InsertExec {
    ctx: Arc<ExecContext>,
    table: TableInfo,
    rows: Vec<InsertRow>,
    done: bool,
}

impl InsertExec {
    /// Creates an insert of `rows` into `table`.
    pub fn new(ctx: Arc<ExecContext>, table: TableInfo, rows: Vec<InsertRow>) -> Self {
        Self {
            ctx,
            table,
            rows,
            done: false,
        }
    }
}

impl Operator for InsertExec {
    fn columns(&self) -> SqlResult<Vec<ColumnMeta>> {
        Ok(Vec::new())
    }

    fn next(&mut self) -> SqlResult<Option<Record>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;

        let driver = self.ctx.driver();
        let indexes = self.ctx.catalog().table_indexes(&self.table.name)?;
        let types = self.table.column_types();

        for row in &self.rows {
            let value = encode_row(&types, &row.datums)?;
            let index_keys = indexes
                .iter()
                .map(|index| Ok((index.unique, index_key(index, &row.datums)?)))
                .collect::<SqlResult<Vec<_>>>()?;

            // Unique violations are caught before the row is written.
            for (_, key) in index_keys.iter().filter(|(unique, _)| *unique) {
                check_unique(driver, key, &row.key)?;
            }

            driver.set(Namespace::User, &row.key, &value, NO_EXPIRY)?;
            self.ctx.add_affected_rows(1);

            for (unique, key) in &index_keys {
                write_index_entry(driver, *unique, key, &row.key)?;
            }
        }

        debug!(
            table = %self.table.name,
            rows = self.rows.len(),
            indexes = indexes.len(),
            "inserted"
        );
        Ok(None)
    }

    fn done(&self) -> bool {
        self.done
    }
}

/// Rewrites each row pulled from its child.
///
/// Yields the new row after each write so the caller can keep pulling;
/// the rows are not returned to the client.
#[derive(Debug)]
pub struct UpdateExec {
    ctx: Arc<ExecContext>,
    child: Box<dyn Operator>,
    table: TableInfo,
    assignments: BTreeMap<usize, Datum>,
    indexes: Option<Vec<IndexMeta>>,
    done: bool,
}

impl UpdateExec {
    /// Creates an update of the rows `child` produces.
    pub fn new(
        ctx: Arc<ExecContext>,
        child: Box<dyn Operator>,
        table: TableInfo,
        assignments: BTreeMap<usize, Datum>,
    ) -> Self {
        Self {
            ctx,
            child,
            table,
            assignments,
            indexes: None,
            done: false,
        }
    }

    /// Indexes with at least one assigned column.
    fn touched_indexes(&mut self) -> SqlResult<Vec<IndexMeta>> {
        if let Some(indexes) = &self.indexes {
            return Ok(indexes.clone());
        }
        let indexes: Vec<IndexMeta> = self
            .ctx
            .catalog()
            .table_indexes(&self.table.name)?
            .into_iter()
            .filter(|index| index.touches(self.assignments.keys().copied()))
            .collect();
        self.indexes = Some(indexes.clone());
        Ok(indexes)
    }
}

impl Operator for UpdateExec {
    fn columns(&self) -> SqlResult<Vec<ColumnMeta>> {
        Ok(Vec::new())
    }

    fn next(&mut self) -> SqlResult<Option<Record>> {
        if self.done {
            return Ok(None);
        }
        let Some(record) = self.child.next()? else {
            self.done = true;
            return Ok(None);
        };

        let mut old = record.into_datums();
        old.truncate(self.table.num_columns());
        let mut new = old.clone();
        for (pos, value) in &self.assignments {
            if let Some(slot) = new.get_mut(pos - 1) {
                *slot = value.clone();
            }
        }

        let pk: Vec<&Datum> = self
            .table
            .primary_key()
            .iter()
            .map(|c| &old[c.position - 1])
            .collect();
        let row_key = encoding::row_key(&self.table.name, pk);
        let value = encode_row(&self.table.column_types(), &new)?;

        let mut moves = Vec::new();
        for index in self.touched_indexes()? {
            let old_key = index_key(&index, &old)?;
            let new_key = index_key(&index, &new)?;
            if old_key != new_key {
                moves.push((index.unique, old_key, new_key));
            }
        }
        for (_, _, new_key) in moves.iter().filter(|(unique, _, _)| *unique) {
            check_unique(self.ctx.driver(), new_key, &row_key)?;
        }

        let driver = self.ctx.driver();
        driver.set(Namespace::User, &row_key, &value, NO_EXPIRY)?;
        self.ctx.add_affected_rows(1);

        for (unique, old_key, new_key) in &moves {
            remove_index_entry(driver, old_key, &row_key)?;
            write_index_entry(driver, *unique, new_key, &row_key)?;
        }

        Ok(Some(Record::new(new)))
    }

    fn done(&self) -> bool {
        self.done
    }
}
