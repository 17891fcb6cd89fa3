//! Secondary index maintenance.
//!
//! An index key maps to a count-prefixed list of row keys:
//!
//! ```text
//!   USER/<db>.<index>/<values>  ->  int(n) ++ str(row_key)*n
//! ```
//!
//! A unique index holds at most one row key per value. Nothing here is
//! atomic with the row write it accompanies; a failure between the two
//! leaves the index behind the row.

use bytes::Bytes;
use nesoi_kv::{KvDriver, Namespace, NO_EXPIRY};
use tracing::trace;

use crate::encoding::{decode_int, decode_string, put_int, put_string};
use crate::error::{SqlError, SqlResult};

/// Decoded value of one index key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexEntry {
    /// Row keys in the order they were added.
    pub row_keys: Vec<Bytes>,
}

impl IndexEntry {
    /// Number of row keys.
    pub fn count(&self) -> usize {
        self.row_keys.len()
    }

    /// Returns true if `row_key` is listed.
    pub fn contains(&self, row_key: &[u8]) -> bool {
        self.row_keys.iter().any(|k| k.as_ref() == row_key)
    }

    /// Encodes the entry.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        put_int(&mut buf, self.row_keys.len() as u64);
        for key in &self.row_keys {
            put_string(&mut buf, key);
        }
        buf
    }
}

/// Decodes an index value. The declared count must match the payload
/// exactly.
pub fn decode_index_entry(buf: &[u8]) -> SqlResult<IndexEntry> {
    let (count, mut off) = decode_int(buf)?;
    let mut row_keys = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        let (key, used) = decode_string(&buf[off..])?;
        row_keys.push(Bytes::copy_from_slice(key));
        off += used;
    }
    if off != buf.len() {
        return Err(SqlError::decode(format!(
            "index entry has {} trailing bytes",
            buf.len() - off
        )));
    }
    Ok(IndexEntry { row_keys })
}

/// Adds `row_key` under `index_key`.
///
/// An absent entry is created with a count of one. An existing entry on a
/// unique index fails with [`SqlError::DuplicateIndex`] and is left
/// unchanged. Otherwise the row key is appended and the count incremented.
/// Adding a row key that is already listed is a no-op.
pub fn write_index_entry(
    driver: &dyn KvDriver,
    unique: bool,
    index_key: &[u8],
    row_key: &[u8],
) -> SqlResult<()> {
    let mut entry = match driver.get(Namespace::User, index_key)? {
        Some(raw) => decode_index_entry(&raw)?,
        None => IndexEntry::default(),
    };

    if entry.contains(row_key) {
        return Ok(());
    }
    if unique && entry.count() > 0 {
        return Err(SqlError::DuplicateIndex(format!(
            "value {} already indexed",
            String::from_utf8_lossy(index_key)
        )));
    }

    entry.row_keys.push(Bytes::copy_from_slice(row_key));
    driver.set(Namespace::User, index_key, &entry.encode(), NO_EXPIRY)?;
    trace!(count = entry.count(), "wrote index entry");
    Ok(())
}

/// Removes `row_key` from under `index_key`, deleting the entry when no row
/// keys remain.
pub fn remove_index_entry(driver: &dyn KvDriver, index_key: &[u8], row_key: &[u8]) -> SqlResult<()> {
    let Some(raw) = driver.get(Namespace::User, index_key)? else {
        return Ok(());
    };
    let mut entry = decode_index_entry(&raw)?;
    let before = entry.count();
    entry.row_keys.retain(|k| k.as_ref() != row_key);
    if entry.count() == before {
        return Ok(());
    }

    if entry.row_keys.is_empty() {
        driver.delete(Namespace::User, index_key)?;
    } else {
        driver.set(Namespace::User, index_key, &entry.encode(), NO_EXPIRY)?;
    }
    Ok(())
}

/// Checks whether adding `row_key` under `index_key` would violate a
/// unique index, without writing anything.
pub(crate) fn check_unique(driver: &dyn KvDriver, index_key: &[u8], row_key: &[u8]) -> SqlResult<()> {
    if let Some(raw) = driver.get(Namespace::User, index_key)? {
        let entry = decode_index_entry(&raw)?;
        if entry.count() > 0 && !entry.contains(row_key) {
            return Err(SqlError::DuplicateIndex(format!(
                "value {} already indexed",
                String::from_utf8_lossy(index_key)
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nesoi_kv::MemoryDriver;

    fn read(driver: &MemoryDriver, key: &[u8]) -> Option<IndexEntry> {
        driver
            .get(Namespace::User, key)
            .unwrap()
            .map(|raw| decode_index_entry(&raw).unwrap())
    }

    #[test]
    fn test_first_entry_layout() {
        let driver = MemoryDriver::new();
        write_index_entry(&driver, false, b"USER/d.i/\x05", b"USER/d.t/\x01").unwrap();
        let raw = driver.get(Namespace::User, b"USER/d.i/\x05").unwrap().unwrap();
        assert_eq!(raw.as_ref(), b"\x01\x0aUSER/d.t/\x01");
    }

    #[test]
    fn test_non_unique_appends_in_order() {
        let driver = MemoryDriver::new();
        for pk in [b"k1", b"k2", b"k3"] {
            write_index_entry(&driver, false, b"idx", pk).unwrap();
        }
        let entry = read(&driver, b"idx").unwrap();
        assert_eq!(entry.count(), 3);
        assert_eq!(
            entry.row_keys,
            vec![
                Bytes::from_static(b"k1"),
                Bytes::from_static(b"k2"),
                Bytes::from_static(b"k3")
            ]
        );
    }

    #[test]
    fn test_unique_rejects_second_row() {
        let driver = MemoryDriver::new();
        write_index_entry(&driver, true, b"idx", b"k1").unwrap();
        let before = driver.get(Namespace::User, b"idx").unwrap();

        let err = write_index_entry(&driver, true, b"idx", b"k2").unwrap_err();
        assert!(matches!(err, SqlError::DuplicateIndex(_)));
        assert_eq!(driver.get(Namespace::User, b"idx").unwrap(), before);

        // Re-adding the same row is not a violation.
        write_index_entry(&driver, true, b"idx", b"k1").unwrap();
        assert!(check_unique(&driver, b"idx", b"k1").is_ok());
        assert!(check_unique(&driver, b"idx", b"k2").is_err());
        assert!(check_unique(&driver, b"other", b"k2").is_ok());
    }

    #[test]
    fn test_remove() {
        let driver = MemoryDriver::new();
        write_index_entry(&driver, false, b"idx", b"k1").unwrap();
        write_index_entry(&driver, false, b"idx", b"k2").unwrap();

        remove_index_entry(&driver, b"idx", b"k1").unwrap();
        assert_eq!(read(&driver, b"idx").unwrap().row_keys, vec![Bytes::from_static(b"k2")]);

        remove_index_entry(&driver, b"idx", b"missing").unwrap();
        remove_index_entry(&driver, b"idx", b"k2").unwrap();
        assert!(read(&driver, b"idx").is_none());
        remove_index_entry(&driver, b"idx", b"k2").unwrap();
    }

    #[test]
    fn test_decode_rejects_mismatched_count() {
        assert!(decode_index_entry(b"\x02\x01a").is_err());
        assert!(decode_index_entry(b"\x01\x01ab").is_err());
        assert_eq!(decode_index_entry(b"\x00").unwrap().count(), 0);
    }
}
