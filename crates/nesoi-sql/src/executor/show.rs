//! Catalog listings, constant rows and index creation.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use nesoi_kv::Namespace;
use tracing::{info, warn};

use super::scan::ScanExec;
use super::{field_meta, materialize, write_index_entry, ExecContext, Operator};
use crate::analyzer::{CreateIndexQuery, TargetRef};
use crate::encoding;
use crate::error::SqlResult;
use crate::parser::ShowKind;
use crate::result::ColumnMeta;
use crate::types::{Datum, Record, ScalarType};

/// Streams database or table names from the SYSTEM namespace.
#[derive(Debug)]
pub struct CatalogListExec {
    ctx: Arc<ExecContext>,
    kind: ShowKind,
    prefix: Vec<u8>,
    pattern: Vec<u8>,
    cursor: u64,
    pending: VecDeque<Bytes>,
    last_page: bool,
    done: bool,
}

impl CatalogListExec {
    /// Creates a listing. `database` is only consulted for tables.
    pub fn new(ctx: Arc<ExecContext>, kind: ShowKind, database: String) -> Self {
        let prefix = match kind {
            ShowKind::Databases => encoding::database_prefix(),
            ShowKind::Tables => encoding::table_prefix(&database),
        };
        let pattern = encoding::glob(&prefix);
        Self {
            ctx,
            kind,
            prefix,
            pattern,
            cursor: 0,
            pending: VecDeque::new(),
            last_page: false,
            done: false,
        }
    }
}

impl Operator for CatalogListExec {
    fn columns(&self) -> SqlResult<Vec<ColumnMeta>> {
        let name = match self.kind {
            ShowKind::Databases => "DATABASES",
            ShowKind::Tables => "TABLES",
        };
        Ok(vec![ColumnMeta::dual(
            self.ctx.current_db(),
            name,
            ScalarType::String,
        )])
    }

    fn next(&mut self) -> SqlResult<Option<Record>> {
        loop {
            if let Some(key) = self.pending.pop_front() {
                let Some(name) = key.strip_prefix(self.prefix.as_slice()) else {
                    continue;
                };
                return Ok(Some(Record::new(vec![Datum::string(name)])));
            }
            if self.last_page {
                self.done = true;
                return Ok(None);
            }
            let page = self.ctx.driver().scan(
                Namespace::System,
                self.cursor,
                &self.pattern,
                self.ctx.batch_size(),
            )?;
            self.last_page = page.is_last();
            self.cursor = page.cursor;
            self.pending.extend(page.keys);
        }
    }

    fn done(&self) -> bool {
        self.done
    }
}

/// Yields exactly one row of literals and system variables.
#[derive(Debug)]
pub struct ConstantRowExec {
    ctx: Arc<ExecContext>,
    fields: Vec<TargetRef>,
    done: bool,
}

impl ConstantRowExec {
    /// Creates the operator.
    pub fn new(ctx: Arc<ExecContext>, fields: Vec<TargetRef>) -> Self {
        Self {
            ctx,
            fields,
            done: false,
        }
    }
}

impl Operator for ConstantRowExec {
    fn columns(&self) -> SqlResult<Vec<ColumnMeta>> {
        self.fields
            .iter()
            .map(|f| field_meta(&self.ctx, None, f))
            .collect()
    }

    fn next(&mut self) -> SqlResult<Option<Record>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;
        materialize(&self.ctx, &self.fields, &[]).map(Some)
    }

    fn done(&self) -> bool {
        self.done
    }
}

/// Backfills a new index from the existing rows, then registers it.
///
/// Entries written by a failed backfill are removed again and no metadata
/// is written.
#[derive(Debug)]
pub struct CreateIndexExec {
    ctx: Arc<ExecContext>,
    create: CreateIndexQuery,
    done: bool,
}

impl CreateIndexExec {
    /// Creates the operator.
    pub fn new(ctx: Arc<ExecContext>, create: CreateIndexQuery) -> Self {
        Self {
            ctx,
            create,
            done: false,
        }
    }

    fn backfill(&self) -> SqlResult<usize> {
        let index = &self.create.index;
        let mut scan = ScanExec::new(self.ctx.clone(), self.create.table.clone(), Vec::new());
        let mut rows = 0;
        while let Some((row_key, row)) = scan.next_entry()? {
            let key = encoding::index_key(&index.name, index.key_values(&row)?);
            write_index_entry(self.ctx.driver(), index.unique, &key, &row_key)?;
            rows += 1;
        }
        Ok(rows)
    }
}

impl Operator for CreateIndexExec {
    fn columns(&self) -> SqlResult<Vec<ColumnMeta>> {
        Ok(Vec::new())
    }

    fn next(&mut self) -> SqlResult<Option<Record>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;

        let index = &self.create.index;
        if self.create.skip {
            self.ctx.add_warning();
            return Ok(None);
        }

        let rows = match self.backfill() {
            Ok(rows) => rows,
            Err(err) => {
                warn!(index = %index.name, error = %err, "index backfill failed");
                let catalog = self.ctx.catalog();
                catalog.delete_prefix(Namespace::User, &encoding::index_prefix(&index.name))?;
                return Err(err);
            }
        };

        self.ctx.catalog().register_index(index)?;
        info!(
            index = %index.name,
            table = %index.table,
            unique = index.unique,
            rows,
            "created index"
        );
        Ok(None)
    }

    fn done(&self) -> bool {
        self.done
    }
}
