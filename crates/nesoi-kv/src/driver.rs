//! The driver trait and scan helpers.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;

use crate::error::KvResult;

/// TTL value meaning "never expires".
pub const NO_EXPIRY: Duration = Duration::ZERO;

/// Logical key namespace.
///
/// Both namespaces are addressed identically, but a driver must keep them
/// apart so that a user key can never shadow a catalog key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Catalog metadata.
    System,
    /// Table rows and index entries.
    User,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::System => write!(f, "system"),
            Namespace::User => write!(f, "user"),
        }
    }
}

/// One page of a cursor-paginated scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Keys matched in this page, in key order.
    pub keys: Vec<Bytes>,
    /// Continuation cursor. Zero marks the final page.
    pub cursor: u64,
}

impl ScanPage {
    /// Returns true if no further page follows this one.
    pub fn is_last(&self) -> bool {
        self.cursor == 0
    }
}

/// Narrow storage contract consumed by the SQL layer.
///
/// Implementations must be safe to share between connections; every call is
/// independently visible to other callers as soon as it returns.
pub trait KvDriver: Send + Sync {
    /// Reads a key. Returns `Ok(None)` when the key is absent or expired.
    fn get(&self, ns: Namespace, key: &[u8]) -> KvResult<Option<Bytes>>;

    /// Writes a key. A `ttl` of [`NO_EXPIRY`] keeps the value forever.
    fn set(&self, ns: Namespace, key: &[u8], value: &[u8], ttl: Duration) -> KvResult<()>;

    /// Removes a key. Removing an absent key is not an error.
    fn delete(&self, ns: Namespace, key: &[u8]) -> KvResult<()>;

    /// Scans keys matching `pattern`, at most `count` per page.
    ///
    /// Pass cursor `0` to start. Keep calling with the returned cursor until
    /// it comes back as `0`. A page may be empty while the cursor is nonzero.
    fn scan(&self, ns: Namespace, cursor: u64, pattern: &[u8], count: usize) -> KvResult<ScanPage>;
}

/// Splits a scan pattern into its literal prefix.
///
/// Only a trailing `*` is a wildcard: `prefix*` yields `(prefix, true)`.
/// Any other pattern, including one with an inner `*`, is an exact key and
/// yields `(pattern, false)`. Encoded key bytes may legitimately contain `*`.
pub fn glob_prefix(pattern: &[u8]) -> (&[u8], bool) {
    match pattern.split_last() {
        Some((&b'*', prefix)) => (prefix, true),
        _ => (pattern, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_prefix() {
        assert_eq!(glob_prefix(b"USER/t/*"), (&b"USER/t/"[..], true));
        assert_eq!(glob_prefix(b"USER/t/1"), (&b"USER/t/1"[..], false));
        assert_eq!(glob_prefix(b"*"), (&b""[..], true));
        assert_eq!(glob_prefix(b""), (&b""[..], false));
    }

    #[test]
    fn test_glob_prefix_inner_star_is_literal() {
        assert_eq!(glob_prefix(b"USER/*/1"), (&b"USER/*/1"[..], false));
        assert_eq!(glob_prefix(b"USER/*/*"), (&b"USER/*/"[..], true));
    }

    #[test]
    fn test_scan_page_last() {
        let page = ScanPage::default();
        assert!(page.is_last());
        let page = ScanPage {
            keys: vec![],
            cursor: 3,
        };
        assert!(!page.is_last());
    }
}
