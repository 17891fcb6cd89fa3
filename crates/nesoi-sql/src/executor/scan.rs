//! Table access operators.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use nesoi_kv::Namespace;
use tracing::trace;

use super::{field_meta, materialize, ExecContext, Operator};
use crate::analyzer::TargetRef;
use crate::encoding::{self, decode_row};
use crate::error::SqlResult;
use crate::result::ColumnMeta;
use crate::types::{Datum, Record, ScalarType, TableInfo};

/// Full table scan over the row key prefix.
///
/// Keys arrive in pages from the driver's cursor scan; the pagination state
/// belongs to this operator alone.
#[derive(Debug)]
pub struct ScanExec {
    ctx: Arc<ExecContext>,
    table: TableInfo,
    fields: Vec<TargetRef>,
    types: Vec<ScalarType>,
    pattern: Vec<u8>,
    cursor: u64,
    pending: VecDeque<Bytes>,
    last_page: bool,
    done: bool,
}

impl ScanExec {
    /// Creates a scan producing `fields` for each row of `table`.
    pub fn new(ctx: Arc<ExecContext>, table: TableInfo, fields: Vec<TargetRef>) -> Self {
        let types = table.column_types();
        let pattern = encoding::glob(&encoding::row_prefix(&table.name));
        Self {
            ctx,
            table,
            fields,
            types,
            pattern,
            cursor: 0,
            pending: VecDeque::new(),
            last_page: false,
            done: false,
        }
    }

    /// Returns the next row key with its fully decoded row.
    pub fn next_entry(&mut self) -> SqlResult<Option<(Bytes, Vec<Datum>)>> {
        loop {
            if let Some(key) = self.pending.pop_front() {
                // A key can vanish between the scan and the read.
                let Some(value) = self.ctx.driver().get(Namespace::User, &key)? else {
                    continue;
                };
                let row = decode_row(&self.types, &value)?;
                return Ok(Some((key, row)));
            }

            if self.last_page {
                self.done = true;
                return Ok(None);
            }

            let page = self.ctx.driver().scan(
                Namespace::User,
                self.cursor,
                &self.pattern,
                self.ctx.batch_size(),
            )?;
            trace!(
                table = %self.table.name,
                cursor = self.cursor,
                keys = page.keys.len(),
                next = page.cursor,
                "scan page"
            );
            self.last_page = page.is_last();
            self.cursor = page.cursor;
            self.pending.extend(page.keys);
        }
    }
}

impl Operator for ScanExec {
    fn columns(&self) -> SqlResult<Vec<ColumnMeta>> {
        self.fields
            .iter()
            .map(|f| field_meta(&self.ctx, Some(&self.table), f))
            .collect()
    }

    fn next(&mut self) -> SqlResult<Option<Record>> {
        match self.next_entry()? {
            Some((_, row)) => materialize(&self.ctx, &self.fields, &row).map(Some),
            None => Ok(None),
        }
    }

    fn done(&self) -> bool {
        self.done
    }
}

/// Single-key fetch by primary key.
#[derive(Debug)]
pub struct PointLookupExec {
    ctx: Arc<ExecContext>,
    table: TableInfo,
    fields: Vec<TargetRef>,
    key: Vec<u8>,
    done: bool,
}

impl PointLookupExec {
    /// Creates a lookup of the row whose single primary key column equals
    /// `pk`.
    pub fn new(ctx: Arc<ExecContext>, table: TableInfo, fields: Vec<TargetRef>, pk: &Datum) -> Self {
        let key = encoding::row_key(&table.name, [pk]);
        Self {
            ctx,
            table,
            fields,
            key,
            done: false,
        }
    }
}

impl Operator for PointLookupExec {
    fn columns(&self) -> SqlResult<Vec<ColumnMeta>> {
        self.fields
            .iter()
            .map(|f| field_meta(&self.ctx, Some(&self.table), f))
            .collect()
    }

    fn next(&mut self) -> SqlResult<Option<Record>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;

        let Some(value) = self.ctx.driver().get(Namespace::User, &self.key)? else {
            return Ok(None);
        };
        let row = decode_row(&self.table.column_types(), &value)?;
        materialize(&self.ctx, &self.fields, &row).map(Some)
    }

    fn done(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::TargetKind;
    use crate::encoding::encode_row;
    use crate::executor::test_util::context;
    use nesoi_kv::NO_EXPIRY;

    fn put_row(ctx: &ExecContext, id: i64, name: &str) {
        let table = ctx.catalog().table_info("d.t").unwrap();
        let row = vec![Datum::int(id), Datum::from(name), Datum::Null];
        let value = encode_row(&table.column_types(), &row).unwrap();
        let key = encoding::row_key("d.t", &row[..1]);
        ctx.driver()
            .set(Namespace::User, &key, &value, NO_EXPIRY)
            .unwrap();
    }

    fn name_field() -> Vec<TargetRef> {
        vec![TargetRef::new(1, "name", TargetKind::Column(2))]
    }

    #[test]
    fn test_scan_follows_cursor_across_pages() {
        let ctx = context();
        for id in 1..=5 {
            put_row(&ctx, id, &format!("n{}", id));
        }
        let table = ctx.catalog().table_info("d.t").unwrap();
        let mut scan = ScanExec::new(ctx.clone(), table, name_field());

        let mut names = Vec::new();
        while let Some(record) = scan.next().unwrap() {
            names.push(record.datums()[0].to_string());
        }
        assert_eq!(names, vec!["n1", "n2", "n3", "n4", "n5"]);
        assert!(scan.done());
        assert!(scan.next().unwrap().is_none());
    }

    #[test]
    fn test_scan_empty_table() {
        let ctx = context();
        let table = ctx.catalog().table_info("d.t").unwrap();
        let mut scan = ScanExec::new(ctx, table, name_field());
        assert!(scan.next().unwrap().is_none());
        assert!(scan.done());
    }

    #[test]
    fn test_scan_does_not_cross_into_other_tables() {
        let ctx = context();
        put_row(&ctx, 1, "a");
        ctx.driver()
            .set(Namespace::User, b"USER/d.tt/\x01", b"garbage", NO_EXPIRY)
            .unwrap();
        let table = ctx.catalog().table_info("d.t").unwrap();
        let mut scan = ScanExec::new(ctx, table, name_field());
        assert!(scan.next().unwrap().is_some());
        assert!(scan.next().unwrap().is_none());
    }

    #[test]
    fn test_point_lookup() {
        let ctx = context();
        put_row(&ctx, 1, "a");
        put_row(&ctx, 2, "b");
        let table = ctx.catalog().table_info("d.t").unwrap();

        let mut lookup = PointLookupExec::new(ctx.clone(), table.clone(), name_field(), &Datum::int(2));
        assert!(!lookup.done());
        let record = lookup.next().unwrap().unwrap();
        assert_eq!(record.datums(), &[Datum::from("b")]);
        assert!(lookup.done());
        assert!(lookup.next().unwrap().is_none());

        let mut miss = PointLookupExec::new(ctx, table, name_field(), &Datum::int(9));
        assert!(miss.next().unwrap().is_none());
        assert!(miss.done());
    }

    #[test]
    fn test_corrupt_row_is_an_error() {
        let ctx = context();
        ctx.driver()
            .set(Namespace::User, b"USER/d.t/\x01", b"1\x01", NO_EXPIRY)
            .unwrap();
        let table = ctx.catalog().table_info("d.t").unwrap();
        let mut scan = ScanExec::new(ctx, table, name_field());
        assert!(scan.next().is_err());
    }
}
