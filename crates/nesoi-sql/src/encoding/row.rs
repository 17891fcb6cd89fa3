//! Packed row format.

use bytes::Bytes;

use super::codec::{decode_int, decode_string, put_int, put_string};
use crate::error::{SqlError, SqlResult};
use crate::types::{Datum, ScalarType};

/// Presence byte for a non-NULL column.
pub const PRESENT: u8 = b'1';
/// Presence byte for a NULL column.
pub const ABSENT: u8 = b'0';

/// Packs one datum per column, in position order.
///
/// Fails with a type error if a datum does not match its column type.
pub fn encode_row(types: &[ScalarType], datums: &[Datum]) -> SqlResult<Vec<u8>> {
    if types.len() != datums.len() {
        return Err(SqlError::Schema(format!(
            "row has {} values for {} columns",
            datums.len(),
            types.len()
        )));
    }

    let mut buf = Vec::with_capacity(datums.len() * 4);
    for (i, (ty, datum)) in types.iter().zip(datums).enumerate() {
        match (ty, datum) {
            (_, Datum::Null) => buf.push(ABSENT),
            (ScalarType::Int64, Datum::Int64(v)) => {
                buf.push(PRESENT);
                put_int(&mut buf, *v as u64);
            }
            (ScalarType::String, Datum::String(b)) => {
                buf.push(PRESENT);
                put_string(&mut buf, b);
            }
            (ty, datum) => {
                return Err(SqlError::Type(format!(
                    "column {} expects {}, got {}",
                    i + 1,
                    ty,
                    datum.kind_name()
                )))
            }
        }
    }
    Ok(buf)
}

/// Unpacks exactly `types.len()` columns.
///
/// A short buffer, an unknown presence byte, or trailing bytes are errors.
pub fn decode_row(types: &[ScalarType], buf: &[u8]) -> SqlResult<Vec<Datum>> {
    let mut datums = Vec::with_capacity(types.len());
    let mut off = 0;

    for (i, ty) in types.iter().enumerate() {
        let flag = *buf.get(off).ok_or_else(|| {
            SqlError::decode(format!(
                "row ends after {} of {} columns",
                i,
                types.len()
            ))
        })?;
        off += 1;

        match flag {
            ABSENT => datums.push(Datum::Null),
            PRESENT => match ty {
                ScalarType::Int64 => {
                    let (v, used) = decode_int(&buf[off..])?;
                    datums.push(Datum::Int64(v as i64));
                    off += used;
                }
                ScalarType::String => {
                    let (b, used) = decode_string(&buf[off..])?;
                    datums.push(Datum::String(Bytes::copy_from_slice(b)));
                    off += used;
                }
            },
            other => {
                return Err(SqlError::decode(format!(
                    "invalid presence byte 0x{:02X} in column {}",
                    other,
                    i + 1
                )))
            }
        }
    }

    if off != buf.len() {
        return Err(SqlError::decode(format!(
            "{} trailing bytes after {} columns",
            buf.len() - off,
            types.len()
        )));
    }
    Ok(datums)
}
