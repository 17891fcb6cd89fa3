//! Column definitions and per-statement table metadata.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SqlError, SqlResult};

/// Declared column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScalarType {
    /// 64-bit signed integer.
    Int64,
    /// Byte string.
    String,
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarType::Int64 => write!(f, "INT64"),
            ScalarType::String => write!(f, "STRING"),
        }
    }
}

/// A column as stored in the catalog.
///
/// Positions are 1-based and fixed for the lifetime of the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name as declared.
    pub name: String,
    /// 1-based position in declaration order.
    #[serde(rename = "pos")]
    pub position: usize,
    /// Declared type.
    #[serde(rename = "type")]
    pub scalar_type: ScalarType,
    /// Whether NULL is accepted.
    pub nullable: bool,
    /// Part of the primary key.
    pub primary_key: bool,
    /// Declared UNIQUE.
    pub unique: bool,
}

impl ColumnDef {
    /// Creates a nullable, non-key column.
    pub fn new(name: impl Into<String>, position: usize, scalar_type: ScalarType) -> Self {
        Self {
            name: name.into(),
            position,
            scalar_type,
            nullable: true,
            primary_key: false,
            unique: false,
        }
    }

    /// Marks the column as part of the primary key (implies NOT NULL).
    pub fn with_primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Marks the column NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Marks the column UNIQUE.
    pub fn with_unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Returns true if a value must always be supplied.
    pub fn requires_value(&self) -> bool {
        self.primary_key || !self.nullable
    }
}

/// Resolved table metadata, rebuilt from the catalog for every statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    /// Qualified name, `<schema>.<table>`.
    pub name: String,
    /// Columns keyed by 1-based position.
    columns: BTreeMap<usize, ColumnDef>,
}

impl TableInfo {
    /// Builds table metadata from stored column definitions.
    ///
    /// Positions must be exactly `1..=n` with no gaps or repeats.
    pub fn new(name: impl Into<String>, defs: Vec<ColumnDef>) -> SqlResult<Self> {
        let name = name.into();
        let n = defs.len();
        let mut columns = BTreeMap::new();
        for def in defs {
            if def.position == 0 || def.position > n {
                return Err(SqlError::corrupt(format!(
                    "column '{}' of {} has position {}",
                    def.name, name, def.position
                )));
            }
            let pos = def.position;
            if columns.insert(pos, def).is_some() {
                return Err(SqlError::corrupt(format!(
                    "position {} repeated in {}",
                    pos, name
                )));
            }
        }
        Ok(Self { name, columns })
    }

    /// Schema part of the qualified name.
    pub fn schema(&self) -> &str {
        self.name.split_once('.').map_or("", |(s, _)| s)
    }

    /// Table part of the qualified name.
    pub fn table(&self) -> &str {
        self.name.split_once('.').map_or(self.name.as_str(), |(_, t)| t)
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Looks up a column by 1-based position.
    pub fn column(&self, position: usize) -> Option<&ColumnDef> {
        self.columns.get(&position)
    }

    /// Looks up a column by name, ignoring case.
    pub fn column_by_name(&self, name: &str) -> Option<&ColumnDef> {
        self.columns
            .values()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Iterates columns in position order.
    pub fn columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.values()
    }

    /// Column types in position order.
    pub fn column_types(&self) -> Vec<ScalarType> {
        self.columns.values().map(|c| c.scalar_type).collect()
    }

    /// Primary key columns in position order.
    pub fn primary_key(&self) -> Vec<&ColumnDef> {
        self.columns.values().filter(|c| c.primary_key).collect()
    }

    /// Returns the position of the single primary key column, if the key has
    /// exactly one column.
    pub fn single_primary_key(&self) -> Option<usize> {
        match self.primary_key().as_slice() {
            [only] => Some(only.position),
            _ => None,
        }
    }
}
