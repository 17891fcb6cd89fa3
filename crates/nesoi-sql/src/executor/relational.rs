//! Filter, projection and limit.

use super::Operator;
use crate::analyzer::{EqualityPredicate, TargetRef};
use crate::error::{SqlError, SqlResult};
use crate::result::ColumnMeta;
use crate::types::{Datum, Record};

/// Passes rows whose two predicate operands are equal.
#[derive(Debug)]
pub struct FilterExec {
    child: Box<dyn Operator>,
    predicate: EqualityPredicate,
    done: bool,
}

impl FilterExec {
    /// Creates a filter over `child`.
    pub fn new(child: Box<dyn Operator>, predicate: EqualityPredicate) -> Self {
        Self {
            child,
            predicate,
            done: false,
        }
    }

    fn operand<'r>(record: &'r Record, target: &TargetRef) -> SqlResult<&'r Datum> {
        target
            .target_id
            .checked_sub(1)
            .and_then(|i| record.get(i))
            .ok_or_else(|| {
                SqlError::decode(format!(
                    "predicate operand {} missing from a {}-field row",
                    target.target_id,
                    record.len()
                ))
            })
    }
}

impl Operator for FilterExec {
    fn columns(&self) -> SqlResult<Vec<ColumnMeta>> {
        self.child.columns()
    }

    fn next(&mut self) -> SqlResult<Option<Record>> {
        if self.done {
            return Ok(None);
        }
        while let Some(record) = self.child.next()? {
            let left = Self::operand(&record, &self.predicate.left)?;
            let right = Self::operand(&record, &self.predicate.right)?;
            if left == right {
                return Ok(Some(record));
            }
        }
        self.done = true;
        Ok(None)
    }

    fn done(&self) -> bool {
        self.done
    }
}

/// Keeps the first `count` fields of every row.
#[derive(Debug)]
pub struct ProjectionExec {
    child: Box<dyn Operator>,
    count: usize,
}

impl ProjectionExec {
    /// Creates a projection over `child`.
    pub fn new(child: Box<dyn Operator>, count: usize) -> Self {
        Self { child, count }
    }
}

impl Operator for ProjectionExec {
    fn columns(&self) -> SqlResult<Vec<ColumnMeta>> {
        let mut columns = self.child.columns()?;
        columns.truncate(self.count);
        Ok(columns)
    }

    fn next(&mut self) -> SqlResult<Option<Record>> {
        Ok(self.child.next()?.map(|mut record| {
            record.truncate(self.count);
            record
        }))
    }

    fn done(&self) -> bool {
        self.child.done()
    }
}

/// Passes at most `count` rows.
#[derive(Debug)]
pub struct LimitExec {
    child: Box<dyn Operator>,
    count: u64,
    emitted: u64,
}

impl LimitExec {
    /// Creates a limit over `child`.
    pub fn new(child: Box<dyn Operator>, count: u64) -> Self {
        Self {
            child,
            count,
            emitted: 0,
        }
    }
}

impl Operator for LimitExec {
    fn columns(&self) -> SqlResult<Vec<ColumnMeta>> {
        self.child.columns()
    }

    fn next(&mut self) -> SqlResult<Option<Record>> {
        if self.emitted >= self.count {
            return Ok(None);
        }
        let record = self.child.next()?;
        if record.is_some() {
            self.emitted += 1;
        } else {
            // Child exhausted early.
            self.emitted = self.count;
        }
        Ok(record)
    }

    fn done(&self) -> bool {
        self.emitted >= self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::TargetKind;

    /// Yields fixed rows.
    #[derive(Debug)]
    struct RowsExec {
        rows: Vec<Record>,
    }

    impl RowsExec {
        fn boxed(rows: Vec<Vec<Datum>>) -> Box<dyn Operator> {
            Box::new(Self {
                rows: rows.into_iter().map(Record::new).rev().collect(),
            })
        }
    }

    impl Operator for RowsExec {
        fn columns(&self) -> SqlResult<Vec<ColumnMeta>> {
            Ok(Vec::new())
        }

        fn next(&mut self) -> SqlResult<Option<Record>> {
            Ok(self.rows.pop())
        }

        fn done(&self) -> bool {
            self.rows.is_empty()
        }
    }

    fn rows() -> Vec<Vec<Datum>> {
        vec![
            vec![Datum::int(1), Datum::from("a"), Datum::from("a")],
            vec![Datum::int(2), Datum::from("b"), Datum::from("a")],
            vec![Datum::int(3), Datum::Null, Datum::Null],
            vec![Datum::int(4), Datum::int(7), Datum::from("7")],
        ]
    }

    fn predicate() -> EqualityPredicate {
        EqualityPredicate {
            left: TargetRef::new(2, "x", TargetKind::Column(2)),
            right: TargetRef::new(3, "EXPRESSION", TargetKind::Literal(Datum::Null)),
        }
    }

    #[test]
    fn test_filter_uses_datum_equality() {
        let mut filter = FilterExec::new(RowsExec::boxed(rows()), predicate());
        let mut ids = Vec::new();
        while let Some(record) = filter.next().unwrap() {
            ids.push(record.datums()[0].clone());
        }
        // NULL equals NULL; INT 7 never equals STRING "7".
        assert_eq!(ids, vec![Datum::int(1), Datum::int(3)]);
        assert!(filter.done());
    }

    #[test]
    fn test_filter_missing_operand() {
        let mut pred = predicate();
        pred.right.target_id = 9;
        let mut filter = FilterExec::new(RowsExec::boxed(rows()), pred);
        assert!(filter.next().is_err());
    }

    #[test]
    fn test_projection_truncates() {
        let mut projection = ProjectionExec::new(RowsExec::boxed(rows()), 1);
        let record = projection.next().unwrap().unwrap();
        assert_eq!(record.datums(), &[Datum::int(1)]);
    }

    #[test]
    fn test_limit_stops_pulling() {
        let mut limit = LimitExec::new(RowsExec::boxed(rows()), 2);
        assert!(limit.next().unwrap().is_some());
        assert!(!limit.done());
        assert!(limit.next().unwrap().is_some());
        assert!(limit.done());
        assert!(limit.next().unwrap().is_none());
    }

    #[test]
    fn test_limit_larger_than_input() {
        let mut limit = LimitExec::new(RowsExec::boxed(rows()), 10);
        let mut n = 0;
        while limit.next().unwrap().is_some() {
            n += 1;
        }
        assert_eq!(n, 4);
        assert!(limit.done());
    }
}
