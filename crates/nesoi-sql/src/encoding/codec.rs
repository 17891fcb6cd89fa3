//! Length-encoded integers and strings.

use crate::error::{SqlError, SqlResult};
use crate::types::Datum;

/// Marks a NULL inside a key. Never the first byte of an encoded value.
pub const NULL_MARKER: u8 = 0xFB;

const TAG_U16: u8 = 0xFC;
const TAG_U24: u8 = 0xFD;
const TAG_U64: u8 = 0xFE;

/// Appends the length-encoded form of `v`.
pub fn put_int(buf: &mut Vec<u8>, v: u64) {
    if v < 251 {
        buf.push(v as u8);
    } else if v <= 0xffff {
        buf.push(TAG_U16);
        buf.extend_from_slice(&(v as u16).to_le_bytes());
    } else if v <= 0xff_ffff {
        buf.push(TAG_U24);
        buf.extend_from_slice(&(v as u32).to_le_bytes()[..3]);
    } else {
        buf.push(TAG_U64);
        buf.extend_from_slice(&v.to_le_bytes());
    }
}

/// Appends `int(len) ++ bytes`.
pub fn put_string(buf: &mut Vec<u8>, bytes: &[u8]) {
    put_int(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Appends the key form of a datum: NULL becomes [`NULL_MARKER`].
pub fn put_datum(buf: &mut Vec<u8>, datum: &Datum) {
    match datum {
        Datum::Null => buf.push(NULL_MARKER),
        Datum::Int64(v) => put_int(buf, *v as u64),
        Datum::String(b) => put_string(buf, b),
    }
}

/// Length-encodes an integer.
pub fn encode_int(v: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(9);
    put_int(&mut buf, v);
    buf
}

/// Length-encodes a byte string.
pub fn encode_string(bytes: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(bytes.len() + 9);
    put_string(&mut buf, bytes);
    buf
}

/// Decodes a length-encoded integer, returning the value and bytes consumed.
pub fn decode_int(buf: &[u8]) -> SqlResult<(u64, usize)> {
    let first = *buf
        .first()
        .ok_or_else(|| SqlError::decode("empty length-encoded integer"))?;

    let width = match first {
        0..=250 => return Ok((first as u64, 1)),
        TAG_U16 => 2,
        TAG_U24 => 3,
        TAG_U64 => 8,
        other => {
            return Err(SqlError::decode(format!(
                "invalid length-encoded integer tag 0x{:02X}",
                other
            )))
        }
    };

    if buf.len() < 1 + width {
        return Err(SqlError::decode(format!(
            "length-encoded integer truncated: need {} bytes, have {}",
            1 + width,
            buf.len()
        )));
    }

    let mut raw = [0u8; 8];
    raw[..width].copy_from_slice(&buf[1..1 + width]);
    Ok((u64::from_le_bytes(raw), 1 + width))
}

/// Decodes a length-encoded string, returning the bytes and bytes consumed.
pub fn decode_string(buf: &[u8]) -> SqlResult<(&[u8], usize)> {
    let (len, header) = decode_int(buf)?;
    let len = usize::try_from(len).map_err(|_| SqlError::decode("string length overflow"))?;
    let end = header
        .checked_add(len)
        .ok_or_else(|| SqlError::decode("string length overflow"))?;
    if buf.len() < end {
        return Err(SqlError::decode(format!(
            "string truncated: need {} bytes, have {}",
            end,
            buf.len()
        )));
    }
    Ok((&buf[header..end], end))
}
