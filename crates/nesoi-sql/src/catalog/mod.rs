//! Catalog accessor.
//!
//! All schema metadata lives in the system namespace of the KV store and is
//! re-read by every statement; nothing is cached here. The accessor is a
//! thin, typed layer over the key layout in [`crate::encoding`].

mod ddl;
mod index_meta;

pub use ddl::{execute_ddl, DdlOutcome};
pub use index_meta::IndexMeta;

use std::sync::Arc;

use bytes::Bytes;
use nesoi_kv::{KvDriver, Namespace, NO_EXPIRY};
use tracing::{debug, trace};

use crate::encoding::{self, glob};
use crate::error::{SqlError, SqlResult};
use crate::parser::ObjectRef;
use crate::types::{ColumnDef, TableInfo};

/// Default number of keys requested per scan page.
pub const DEFAULT_SCAN_BATCH: usize = 10;

/// Qualifies an object name with the current database if it has none.
pub fn qualified_name(current_db: &str, object: &ObjectRef) -> String {
    match &object.schema {
        Some(schema) => format!("{}.{}", schema, object.name),
        None => format!("{}.{}", current_db, object.name),
    }
}

/// Checks a database, table or index name before it becomes part of a key.
///
/// `.` separates database and object in qualified names and `/` ends the
/// object segment of row and index keys, so a name containing either would
/// make one object's key prefix cover another object's keys.
pub fn check_object_name(kind: &str, name: &str) -> SqlResult<()> {
    if name.is_empty() {
        return Err(SqlError::schema(format!("{} name must not be empty", kind)));
    }
    if let Some(c) = name.chars().find(|c| matches!(c, '.' | '/')) {
        return Err(SqlError::schema(format!(
            "{} name '{}' must not contain '{}'",
            kind, name, c
        )));
    }
    Ok(())
}

/// Typed access to catalog entries.
#[derive(Clone)]
pub struct Catalog {
    driver: Arc<dyn KvDriver>,
    batch_size: usize,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl Catalog {
    /// Creates an accessor over `driver`.
    pub fn new(driver: Arc<dyn KvDriver>, batch_size: usize) -> Self {
        Self {
            driver,
            batch_size: batch_size.max(1),
        }
    }

    /// The underlying driver.
    pub fn driver(&self) -> &Arc<dyn KvDriver> {
        &self.driver
    }

    /// Keys requested per scan page.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    // --- Databases ---

    /// Returns true if the database marker exists.
    pub fn database_exists(&self, db: &str) -> SqlResult<bool> {
        Ok(self
            .driver
            .get(Namespace::System, &encoding::database_key(db))?
            .is_some())
    }

    /// Writes the database marker.
    pub fn put_database(&self, db: &str) -> SqlResult<()> {
        self.driver
            .set(Namespace::System, &encoding::database_key(db), b"", NO_EXPIRY)?;
        Ok(())
    }

    /// Removes the database marker.
    pub fn delete_database(&self, db: &str) -> SqlResult<()> {
        self.driver
            .delete(Namespace::System, &encoding::database_key(db))?;
        Ok(())
    }

    /// Lists database names in key order.
    pub fn list_databases(&self) -> SqlResult<Vec<String>> {
        let prefix = encoding::database_prefix();
        self.list_suffixes(&prefix)
    }

    // --- Tables ---

    /// Lists table names (unqualified) of one database in key order.
    pub fn list_tables(&self, db: &str) -> SqlResult<Vec<String>> {
        let prefix = encoding::table_prefix(db);
        self.list_suffixes(&prefix)
    }

    /// Returns true if the table entry exists.
    pub fn table_exists(&self, qualified: &str) -> SqlResult<bool> {
        Ok(self
            .driver
            .get(Namespace::System, &encoding::table_key(qualified))?
            .is_some())
    }

    /// Reads a table's stored column definitions.
    ///
    /// Fails with a schema error if the table is absent or its entry does
    /// not deserialize.
    pub fn get_column_defs(&self, qualified: &str) -> SqlResult<Vec<ColumnDef>> {
        let raw = self
            .driver
            .get(Namespace::System, &encoding::table_key(qualified))?
            .ok_or_else(|| SqlError::schema(format!("table '{}' doesn't exist", qualified)))?;

        serde_json::from_slice(&raw)
            .map_err(|e| SqlError::corrupt(format!("table {}: {}", qualified, e)))
    }

    /// Loads a table's metadata.
    pub fn table_info(&self, qualified: &str) -> SqlResult<TableInfo> {
        let defs = self.get_column_defs(qualified)?;
        TableInfo::new(qualified, defs)
    }

    /// Stores a table's column definitions.
    pub fn put_column_defs(&self, qualified: &str, defs: &[ColumnDef]) -> SqlResult<()> {
        let raw = serde_json::to_vec(defs)
            .map_err(|e| SqlError::Storage(format!("serialize table {}: {}", qualified, e)))?;
        self.driver
            .set(Namespace::System, &encoding::table_key(qualified), &raw, NO_EXPIRY)?;
        debug!(table = qualified, columns = defs.len(), "stored table definition");
        Ok(())
    }

    /// Removes a table's entry. Rows and indexes are left to the caller.
    pub fn delete_table(&self, qualified: &str) -> SqlResult<()> {
        self.driver
            .delete(Namespace::System, &encoding::table_key(qualified))?;
        Ok(())
    }

    // --- Indexes ---

    /// Reads an index's forward entry.
    pub fn index_meta(&self, index: &str) -> SqlResult<Option<IndexMeta>> {
        self.driver
            .get(Namespace::System, &encoding::index_table_key(index))?
            .map(|raw| IndexMeta::decode(index, &raw))
            .transpose()
    }

    /// Name of the index already covering exactly this (table, positions)
    /// pair, if any.
    pub fn index_on(&self, meta: &IndexMeta) -> SqlResult<Option<String>> {
        self.driver
            .get(Namespace::System, &encoding::table_index_key(&meta.body()))?
            .map(|raw| {
                String::from_utf8(raw.to_vec())
                    .map_err(|_| SqlError::corrupt("non-UTF-8 index name"))
            })
            .transpose()
    }

    /// Every index registered on a table, discovered through the reverse
    /// mapping.
    pub fn table_indexes(&self, qualified: &str) -> SqlResult<Vec<IndexMeta>> {
        let prefix = encoding::table_index_prefix(qualified);
        let mut indexes = Vec::new();
        for key in self.scan_keys(Namespace::System, &prefix)? {
            let Some(name) = self.driver.get(Namespace::System, &key)? else {
                continue;
            };
            let name = String::from_utf8(name.to_vec())
                .map_err(|_| SqlError::corrupt("non-UTF-8 index name"))?;
            let meta = self.index_meta(&name)?.ok_or_else(|| {
                SqlError::corrupt(format!("reverse mapping names missing index {}", name))
            })?;
            if meta.table == qualified {
                indexes.push(meta);
            }
        }
        trace!(table = qualified, count = indexes.len(), "loaded table indexes");
        Ok(indexes)
    }

    /// Writes both index mappings.
    pub fn register_index(&self, meta: &IndexMeta) -> SqlResult<()> {
        self.driver.set(
            Namespace::System,
            &encoding::index_table_key(&meta.name),
            &meta.encode(),
            NO_EXPIRY,
        )?;
        self.driver.set(
            Namespace::System,
            &encoding::table_index_key(&meta.body()),
            meta.name.as_bytes(),
            NO_EXPIRY,
        )?;
        debug!(index = %meta.name, table = %meta.table, unique = meta.unique, "registered index");
        Ok(())
    }

    /// Removes both index mappings.
    pub fn unregister_index(&self, meta: &IndexMeta) -> SqlResult<()> {
        self.driver
            .delete(Namespace::System, &encoding::index_table_key(&meta.name))?;
        self.driver
            .delete(Namespace::System, &encoding::table_index_key(&meta.body()))?;
        Ok(())
    }

    // --- Scanning ---

    /// Collects every key under `prefix`, following the cursor to the last
    /// page.
    pub fn scan_keys(&self, ns: Namespace, prefix: &[u8]) -> SqlResult<Vec<Bytes>> {
        let pattern = glob(prefix);
        let mut keys = Vec::new();
        let mut cursor = 0;
        loop {
            let page = self.driver.scan(ns, cursor, &pattern, self.batch_size)?;
            trace!(%ns, cursor, matched = page.keys.len(), next = page.cursor, "catalog scan page");
            keys.extend(page.keys.into_iter().filter(|k| k.starts_with(prefix)));
            if page.cursor == 0 {
                break;
            }
            cursor = page.cursor;
        }
        Ok(keys)
    }

    /// Deletes every key under `prefix`. Keys are collected first so the
    /// scan cursor is not disturbed by the deletes.
    pub fn delete_prefix(&self, ns: Namespace, prefix: &[u8]) -> SqlResult<usize> {
        let keys = self.scan_keys(ns, prefix)?;
        for key in &keys {
            self.driver.delete(ns, key)?;
        }
        Ok(keys.len())
    }

    fn list_suffixes(&self, prefix: &[u8]) -> SqlResult<Vec<String>> {
        self.scan_keys(Namespace::System, prefix)?
            .into_iter()
            .map(|key| {
                String::from_utf8(key[prefix.len()..].to_vec())
                    .map_err(|_| SqlError::corrupt("non-UTF-8 catalog key"))
            })
            .collect()
    }
}
