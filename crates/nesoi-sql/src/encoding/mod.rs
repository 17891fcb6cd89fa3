//! Binary layout of rows, index entries and keys in the KV store.
//!
//! # Value encoding
//!
//! Integers use the MySQL length-encoded form:
//!
//! ```text
//!   v < 251          1 byte      v
//!   v <= 0xffff      3 bytes     0xFC lo hi
//!   v <= 0xffffff    4 bytes     0xFD b0 b1 b2
//!   otherwise        9 bytes     0xFE b0 .. b7
//! ```
//!
//! Strings are `int(len) ++ bytes`. Signed integers are stored as their
//! two's complement `u64`, so negative values always take the 9-byte form.
//!
//! # Packed row
//!
//! One entry per column in position order: `'0'` for NULL, or `'1'`
//! followed by the int or string encoding of the value.
//!
//! # Keys
//!
//! ```text
//!   SYSTEM/DB/<db>                         database marker
//!   SYSTEM/TABLE/<db>.<table>              column definitions (JSON)
//!   SYSTEM/INDEX/TABLE/<db>.<index>        index -> (unique, table, positions)
//!   SYSTEM/TABLE/INDEX/<table,positions>   (table, positions) -> index
//!   USER/<db>.<table>/<pk values>          packed row
//!   USER/<db>.<index>/<indexed values>     count ++ row keys
//! ```

mod codec;
mod keys;
mod row;

pub use codec::{
    decode_int, decode_string, encode_int, encode_string, put_datum, put_int, put_string,
    NULL_MARKER,
};
pub use keys::*;
pub use row::{decode_row, encode_row, PRESENT, ABSENT};
