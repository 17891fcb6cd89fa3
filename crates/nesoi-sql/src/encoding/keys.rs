//! Key construction for catalog and user namespaces.

use super::codec::{put_datum, put_string};
use crate::types::Datum;

/// Prefix of every catalog key.
pub const SYSTEM_FLAG: &str = "SYSTEM/";
/// Prefix of every row and index key.
pub const USER_FLAG: &str = "USER/";
/// Database marker segment.
pub const DB_FLAG: &str = "DB/";
/// Table segment.
pub const TABLE_FLAG: &str = "TABLE/";
/// Index segment.
pub const INDEX_FLAG: &str = "INDEX/";

/// Appends the scan wildcard to a key prefix.
pub fn glob(prefix: &[u8]) -> Vec<u8> {
    let mut pattern = Vec::with_capacity(prefix.len() + 1);
    pattern.extend_from_slice(prefix);
    pattern.push(b'*');
    pattern
}

fn concat(parts: &[&[u8]]) -> Vec<u8> {
    parts.concat()
}

/// `SYSTEM/DB/`
pub fn database_prefix() -> Vec<u8> {
    concat(&[SYSTEM_FLAG.as_bytes(), DB_FLAG.as_bytes()])
}

/// `SYSTEM/DB/<db>`
pub fn database_key(db: &str) -> Vec<u8> {
    concat(&[&database_prefix(), db.as_bytes()])
}

/// `SYSTEM/TABLE/<db>.`
pub fn table_prefix(db: &str) -> Vec<u8> {
    concat(&[
        SYSTEM_FLAG.as_bytes(),
        TABLE_FLAG.as_bytes(),
        db.as_bytes(),
        b".",
    ])
}

/// `SYSTEM/TABLE/<db>.<table>`
pub fn table_key(qualified: &str) -> Vec<u8> {
    concat(&[SYSTEM_FLAG.as_bytes(), TABLE_FLAG.as_bytes(), qualified.as_bytes()])
}

/// `SYSTEM/INDEX/TABLE/<db>.<index>`
pub fn index_table_key(index: &str) -> Vec<u8> {
    concat(&[
        SYSTEM_FLAG.as_bytes(),
        INDEX_FLAG.as_bytes(),
        TABLE_FLAG.as_bytes(),
        index.as_bytes(),
    ])
}

/// `SYSTEM/TABLE/INDEX/` followed by an encoded (table, positions) body.
pub fn table_index_key(body: &[u8]) -> Vec<u8> {
    concat(&[
        SYSTEM_FLAG.as_bytes(),
        TABLE_FLAG.as_bytes(),
        INDEX_FLAG.as_bytes(),
        body,
    ])
}

/// Prefix shared by every reverse index mapping of one table.
pub fn table_index_prefix(qualified: &str) -> Vec<u8> {
    let mut body = Vec::new();
    put_string(&mut body, qualified.as_bytes());
    table_index_key(&body)
}

/// `USER/<db>.<table>/`
pub fn row_prefix(qualified: &str) -> Vec<u8> {
    concat(&[USER_FLAG.as_bytes(), qualified.as_bytes(), b"/"])
}

/// Row key: the table prefix followed by the encoded primary key values.
pub fn row_key<'a>(qualified: &str, pk: impl IntoIterator<Item = &'a Datum>) -> Vec<u8> {
    let mut key = row_prefix(qualified);
    for datum in pk {
        put_datum(&mut key, datum);
    }
    key
}

/// `USER/<db>.<index>/`
pub fn index_prefix(index: &str) -> Vec<u8> {
    row_prefix(index)
}

/// Index key: the index prefix followed by the encoded indexed values.
pub fn index_key<'a>(index: &str, values: impl IntoIterator<Item = &'a Datum>) -> Vec<u8> {
    row_key(index, values)
}
