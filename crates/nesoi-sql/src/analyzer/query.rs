//! Resolved query values produced by the analyzer.

use std::collections::BTreeMap;
use std::fmt;

use crate::catalog::IndexMeta;
use crate::parser::ShowKind;
use crate::types::{Datum, TableInfo};

/// What a resolved operand refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetKind {
    /// A table column, by 1-based position.
    Column(usize),
    /// A system variable, by name (without `@@`).
    SessionVar(String),
    /// A constant.
    Literal(Datum),
}

/// A resolved projection or predicate operand.
///
/// `target_id` is the operand's 1-based slot in the field list an operator
/// produces; the filter uses it to find the operand in a pulled record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRef {
    /// 1-based slot in the produced record.
    pub target_id: usize,
    /// Output column name.
    pub name: String,
    /// Operand kind.
    pub kind: TargetKind,
}

impl TargetRef {
    /// Creates a target.
    pub fn new(target_id: usize, name: impl Into<String>, kind: TargetKind) -> Self {
        Self {
            target_id,
            name: name.into(),
            kind,
        }
    }

    /// Column position, if this is a column reference.
    pub fn position(&self) -> Option<usize> {
        match self.kind {
            TargetKind::Column(pos) => Some(pos),
            _ => None,
        }
    }

    /// Constant value, if this is a literal.
    pub fn literal(&self) -> Option<&Datum> {
        match &self.kind {
            TargetKind::Literal(d) => Some(d),
            _ => None,
        }
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TargetKind::Column(pos) => write!(f, "{}#{}", self.name, pos),
            TargetKind::SessionVar(name) => write!(f, "@@{}", name),
            TargetKind::Literal(d @ Datum::String(_)) => write!(f, "'{}'", d),
            TargetKind::Literal(d) => write!(f, "{}", d),
        }
    }
}

/// `left = right`, the only predicate shape the engine evaluates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EqualityPredicate {
    /// Left operand.
    pub left: TargetRef,
    /// Right operand.
    pub right: TargetRef,
}

impl EqualityPredicate {
    /// Returns the column position and constant when the predicate compares
    /// a column with a literal, in either order.
    pub fn column_literal(&self) -> Option<(usize, &Datum)> {
        match (&self.left.kind, &self.right.kind) {
            (TargetKind::Column(pos), TargetKind::Literal(d))
            | (TargetKind::Literal(d), TargetKind::Column(pos)) => Some((*pos, d)),
            _ => None,
        }
    }
}

impl fmt::Display for EqualityPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.left, self.right)
    }
}

/// A resolved SELECT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    /// FROM table, if any.
    pub table: Option<TableInfo>,
    /// Requested targets followed by predicate operands.
    pub fields: Vec<TargetRef>,
    /// Number of leading fields returned to the client.
    pub requested: usize,
    /// WHERE predicate.
    pub predicate: Option<EqualityPredicate>,
    /// Row limit; zero means unlimited.
    pub limit: u64,
}

/// One row to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertRow {
    /// Primary key row key.
    pub key: Vec<u8>,
    /// Values of every column in position order.
    pub datums: Vec<Datum>,
}

/// A resolved INSERT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertQuery {
    /// Target table.
    pub table: TableInfo,
    /// Rows, with keys already computed and checked.
    pub rows: Vec<InsertRow>,
}

/// A resolved UPDATE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateQuery {
    /// Target table.
    pub table: TableInfo,
    /// Every column in position order, followed by predicate operands.
    pub fields: Vec<TargetRef>,
    /// Number of table columns at the front of `fields`.
    pub requested: usize,
    /// New values keyed by 1-based column position.
    pub assignments: BTreeMap<usize, Datum>,
    /// WHERE predicate.
    pub predicate: Option<EqualityPredicate>,
}

/// A resolved CREATE INDEX.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIndexQuery {
    /// Index to create.
    pub index: IndexMeta,
    /// Indexed table.
    pub table: TableInfo,
    /// IF NOT EXISTS matched an existing index; nothing is written.
    pub skip: bool,
}

/// A resolved SHOW.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowQuery {
    /// What to list.
    pub kind: ShowKind,
    /// Database whose tables are listed.
    pub database: String,
}

/// Output of the analyzer, one per non-catalog statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedQuery {
    /// SELECT.
    Select(SelectQuery),
    /// INSERT.
    Insert(InsertQuery),
    /// UPDATE.
    Update(UpdateQuery),
    /// CREATE INDEX.
    CreateIndex(CreateIndexQuery),
    /// SHOW.
    Show(ShowQuery),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_literal_either_order() {
        let col = TargetRef::new(2, "id", TargetKind::Column(1));
        let lit = TargetRef::new(3, "EXPRESSION", TargetKind::Literal(Datum::int(5)));

        let p = EqualityPredicate {
            left: col.clone(),
            right: lit.clone(),
        };
        assert_eq!(p.column_literal(), Some((1, &Datum::int(5))));

        let p = EqualityPredicate {
            left: lit,
            right: col.clone(),
        };
        assert_eq!(p.column_literal(), Some((1, &Datum::int(5))));

        let p = EqualityPredicate {
            left: col.clone(),
            right: col,
        };
        assert!(p.column_literal().is_none());
    }

    #[test]
    fn test_display() {
        let p = EqualityPredicate {
            left: TargetRef::new(2, "name", TargetKind::Column(2)),
            right: TargetRef::new(3, "EXPRESSION", TargetKind::Literal(Datum::from("a"))),
        };
        assert_eq!(p.to_string(), "name#2 = 'a'");
    }
}
