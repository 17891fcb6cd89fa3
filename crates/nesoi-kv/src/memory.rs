//! In-memory KV driver.
//!
//! Each namespace is an ordered map guarded by its own reader/writer lock, so
//! prefix scans walk keys in byte order and pages are deterministic.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::RwLock;
use tracing::trace;

use crate::driver::{glob_prefix, KvDriver, Namespace, ScanPage};
use crate::error::{KvError, KvResult};

/// Maximum key size in bytes (16 KB).
pub const MAX_KEY_SIZE: usize = 16 * 1024;

#[derive(Debug, Clone)]
struct Entry {
    value: Bytes,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

type Tree = BTreeMap<Bytes, Entry>;

/// Non-persistent [`KvDriver`] backed by two ordered maps.
///
/// The scan cursor is the number of matching keys already handed out, so a
/// scan that races with inserts under the same prefix may see a key twice or
/// miss one. Callers that delete while scanning should collect keys first.
#[derive(Debug, Default)]
pub struct MemoryDriver {
    system: RwLock<Tree>,
    user: RwLock<Tree>,
}

impl MemoryDriver {
    /// Creates an empty driver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live keys in a namespace.
    pub fn len(&self, ns: Namespace) -> usize {
        let now = Instant::now();
        self.tree(ns)
            .read()
            .values()
            .filter(|e| e.is_live(now))
            .count()
    }

    /// Returns true if the namespace holds no live keys.
    pub fn is_empty(&self, ns: Namespace) -> bool {
        self.len(ns) == 0
    }

    fn tree(&self, ns: Namespace) -> &RwLock<Tree> {
        match ns {
            Namespace::System => &self.system,
            Namespace::User => &self.user,
        }
    }
}

impl KvDriver for MemoryDriver {
    fn get(&self, ns: Namespace, key: &[u8]) -> KvResult<Option<Bytes>> {
        let tree = self.tree(ns).read();
        Ok(tree
            .get(key)
            .filter(|e| e.is_live(Instant::now()))
            .map(|e| e.value.clone()))
    }

    fn set(&self, ns: Namespace, key: &[u8], value: &[u8], ttl: Duration) -> KvResult<()> {
        if key.len() > MAX_KEY_SIZE {
            return Err(KvError::KeyTooLarge {
                size: key.len(),
                max: MAX_KEY_SIZE,
            });
        }

        let expires_at = if ttl.is_zero() {
            None
        } else {
            Some(Instant::now() + ttl)
        };
        let entry = Entry {
            value: Bytes::copy_from_slice(value),
            expires_at,
        };
        self.tree(ns)
            .write()
            .insert(Bytes::copy_from_slice(key), entry);
        Ok(())
    }

    fn delete(&self, ns: Namespace, key: &[u8]) -> KvResult<()> {
        self.tree(ns).write().remove(key);
        Ok(())
    }

    fn scan(&self, ns: Namespace, cursor: u64, pattern: &[u8], count: usize) -> KvResult<ScanPage> {
        let (prefix, wildcard) = glob_prefix(pattern);
        let count = count.max(1);
        let skip = usize::try_from(cursor).map_err(|_| KvError::InvalidCursor(cursor))?;
        let now = Instant::now();

        let tree = self.tree(ns).read();
        let mut matched = tree
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
            .filter(|(k, _)| wildcard || k.len() == prefix.len())
            .filter(|(_, e)| e.is_live(now))
            .map(|(k, _)| k.clone())
            .skip(skip);

        let keys: Vec<Bytes> = matched.by_ref().take(count).collect();
        let more = matched.next().is_some();
        let next = if more { cursor + keys.len() as u64 } else { 0 };

        trace!(%ns, cursor, returned = keys.len(), next, "scan page");
        Ok(ScanPage { keys, cursor: next })
    }
}
