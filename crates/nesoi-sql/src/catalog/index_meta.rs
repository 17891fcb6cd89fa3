//! Secondary index metadata.
//!
//! Forward value stored at `SYSTEM/INDEX/TABLE/<db>.<index>`:
//!
//! ```text
//!   ('1' | '0') ++ str(table) ++ int(n) ++ int(pos)*n
//! ```
//!
//! The reverse key `SYSTEM/TABLE/INDEX/<body>` uses the same bytes without
//! the uniqueness flag, so one (table, positions) pair maps to at most one
//! index.

use crate::encoding::{decode_int, decode_string, put_int, put_string, ABSENT, PRESENT};
use crate::error::{SqlError, SqlResult};
use crate::types::Datum;

/// A secondary index as recorded in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMeta {
    /// Qualified index name, `<db>.<index>`.
    pub name: String,
    /// Qualified name of the indexed table.
    pub table: String,
    /// Whether duplicate values are rejected.
    pub unique: bool,
    /// 1-based column positions, in key order.
    pub positions: Vec<usize>,
}

impl IndexMeta {
    /// Creates index metadata.
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        unique: bool,
        positions: Vec<usize>,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            unique,
            positions,
        }
    }

    /// The (table, positions) body shared by the forward value and reverse key.
    pub fn body(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        put_string(&mut buf, self.table.as_bytes());
        put_int(&mut buf, self.positions.len() as u64);
        for pos in &self.positions {
            put_int(&mut buf, *pos as u64);
        }
        buf
    }

    /// Encodes the forward catalog value.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![if self.unique { PRESENT } else { ABSENT }];
        buf.extend_from_slice(&self.body());
        buf
    }

    /// Decodes a forward catalog value stored under `name`.
    pub fn decode(name: &str, buf: &[u8]) -> SqlResult<Self> {
        let (flag, rest) = buf
            .split_first()
            .ok_or_else(|| SqlError::corrupt(format!("empty index entry {}", name)))?;
        let unique = match *flag {
            PRESENT => true,
            ABSENT => false,
            other => {
                return Err(SqlError::corrupt(format!(
                    "index {} has flag byte {:#04x}",
                    name, other
                )))
            }
        };

        let bad = |_| SqlError::corrupt(format!("index entry {}", name));
        let (table, mut off) = decode_string(rest).map_err(bad)?;
        let table = String::from_utf8(table.to_vec()).map_err(|_| {
            SqlError::corrupt(format!("index {} names a non-UTF-8 table", name))
        })?;
        let (n, used) = decode_int(&rest[off..]).map_err(bad)?;
        off += used;

        let mut positions = Vec::with_capacity(n.min(64) as usize);
        for _ in 0..n {
            let (pos, used) = decode_int(&rest[off..]).map_err(bad)?;
            off += used;
            positions.push(pos as usize);
        }
        if off != rest.len() {
            return Err(SqlError::corrupt(format!(
                "index entry {} has {} trailing bytes",
                name,
                rest.len() - off
            )));
        }

        Ok(Self {
            name: name.to_string(),
            table,
            unique,
            positions,
        })
    }

    /// Picks the indexed values out of a full row in position order.
    pub fn key_values<'a>(&self, row: &'a [Datum]) -> SqlResult<Vec<&'a Datum>> {
        self.positions
            .iter()
            .map(|&pos| {
                pos.checked_sub(1)
                    .and_then(|i| row.get(i))
                    .ok_or_else(|| {
                        SqlError::corrupt(format!(
                            "index {} refers to position {} of a {}-column row",
                            self.name,
                            pos,
                            row.len()
                        ))
                    })
            })
            .collect()
    }

    /// Returns true if any indexed column is in `positions`.
    pub fn touches(&self, mut positions: impl Iterator<Item = usize>) -> bool {
        positions.any(|p| self.positions.contains(&p))
    }
}
