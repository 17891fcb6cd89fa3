//! Result streams handed to the serving layer.

use std::fmt;

use crate::types::{ColumnDef, Record, ScalarType};

/// MySQL column type `LONG`.
pub const TYPE_LONG: u8 = 0x03;
/// MySQL column type `LONGLONG`.
pub const TYPE_LONGLONG: u8 = 0x08;
/// MySQL column type `STRING`.
pub const TYPE_STRING: u8 = 0xfe;

/// Column flag: NOT NULL.
pub const NOT_NULL_FLAG: u16 = 1;
/// Column flag: part of the primary key.
pub const PRI_KEY_FLAG: u16 = 2;
/// Column flag: declared UNIQUE.
pub const UNIQUE_KEY_FLAG: u16 = 4;

/// Table name reported for columns not backed by a table.
pub const DUAL: &str = "dual";

/// Column name reported for literal targets.
pub const EXPRESSION: &str = "EXPRESSION";

/// Metadata for one result column, shaped after the MySQL column
/// definition packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    /// Database.
    pub schema: String,
    /// Table (or alias).
    pub table: String,
    /// Physical table.
    pub org_table: String,
    /// Column name (or alias).
    pub name: String,
    /// Physical column name.
    pub org_name: String,
    /// MySQL type code.
    pub column_type: u8,
    /// Maximum display length.
    pub column_length: u32,
    /// MySQL column flags.
    pub flags: u16,
}

impl ColumnMeta {
    /// Metadata for a table column.
    pub fn from_column(schema: &str, table: &str, def: &ColumnDef) -> Self {
        let mut flags = 0;
        if !def.nullable {
            flags |= NOT_NULL_FLAG;
        }
        if def.primary_key {
            flags |= PRI_KEY_FLAG;
        }
        if def.unique {
            flags |= UNIQUE_KEY_FLAG;
        }
        let (column_type, column_length) = type_code(def.scalar_type);
        Self {
            schema: schema.to_string(),
            table: table.to_string(),
            org_table: table.to_string(),
            name: def.name.clone(),
            org_name: def.name.clone(),
            column_type,
            column_length,
            flags,
        }
    }

    /// Metadata for a column not backed by any table.
    pub fn dual(schema: &str, name: &str, scalar_type: ScalarType) -> Self {
        let (column_type, column_length) = type_code(scalar_type);
        Self {
            schema: schema.to_string(),
            table: DUAL.to_string(),
            org_table: DUAL.to_string(),
            name: name.to_string(),
            org_name: name.to_string(),
            column_type,
            column_length,
            flags: 0,
        }
    }

    /// Renames the column, keeping `org_name`.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.name = alias.into();
        self
    }
}

fn type_code(ty: ScalarType) -> (u8, u32) {
    match ty {
        ScalarType::Int64 => (TYPE_LONG, 4),
        ScalarType::String => (TYPE_STRING, 0),
    }
}

/// Rows produced by one SELECT or SHOW statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    /// Column metadata.
    pub columns: Vec<ColumnMeta>,
    /// Rows, each with one datum per column.
    pub rows: Vec<Record>,
}

impl ResultSet {
    /// Creates an empty result set with the given columns.
    pub fn new(columns: Vec<ColumnMeta>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl fmt::Display for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.column_names().join("\t"))?;
        for row in &self.rows {
            let fields: Vec<String> = row.datums().iter().map(|d| d.to_string()).collect();
            writeln!(f, "{}", fields.join("\t"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_flags() {
        let def = ColumnDef::new("id", 1, ScalarType::Int64).with_primary_key();
        let meta = ColumnMeta::from_column("d", "t", &def);
        assert_eq!(meta.flags, NOT_NULL_FLAG | PRI_KEY_FLAG);
        assert_eq!(meta.column_type, TYPE_LONG);

        let def = ColumnDef::new("tag", 2, ScalarType::String).with_unique();
        let meta = ColumnMeta::from_column("d", "t", &def);
        assert_eq!(meta.flags, UNIQUE_KEY_FLAG);
        assert_eq!(meta.column_type, TYPE_STRING);
    }

    #[test]
    fn test_dual() {
        let meta = ColumnMeta::dual("Nesoi", EXPRESSION, ScalarType::Int64).with_alias("x");
        assert_eq!(meta.table, "dual");
        assert_eq!(meta.name, "x");
        assert_eq!(meta.org_name, EXPRESSION);
    }
}
