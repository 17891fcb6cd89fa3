//! A single output row.

use std::fmt;

use super::Datum;

/// Ordered sequence of datums, one per target, produced by one operator pull.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Record {
    datums: Vec<Datum>,
}

impl Record {
    /// Creates a record from datums.
    pub fn new(datums: Vec<Datum>) -> Self {
        Self { datums }
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.datums.len()
    }

    /// Returns true if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.datums.is_empty()
    }

    /// Returns the field at a zero-based index.
    pub fn get(&self, index: usize) -> Option<&Datum> {
        self.datums.get(index)
    }

    /// Keeps only the first `n` fields.
    pub fn truncate(&mut self, n: usize) {
        self.datums.truncate(n);
    }

    /// Returns the fields as a slice.
    pub fn datums(&self) -> &[Datum] {
        &self.datums
    }

    /// Consumes the record and returns its fields.
    pub fn into_datums(self) -> Vec<Datum> {
        self.datums
    }
}

impl From<Vec<Datum>> for Record {
    fn from(datums: Vec<Datum>) -> Self {
        Self::new(datums)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, d) in self.datums.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, ")")
    }
}
