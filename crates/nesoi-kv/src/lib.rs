//! # nesoi-kv
//!
//! Key-value driver contract for Nesoi.
//!
//! The SQL layer never talks to a concrete store. It goes through the narrow
//! [`KvDriver`] trait, which exposes point reads, writes, deletes and a
//! cursor-paginated prefix scan over two logically separate namespaces:
//!
//! - [`Namespace::System`] holds catalog entries (`SYSTEM/...` keys)
//! - [`Namespace::User`] holds table rows and secondary index entries (`USER/...` keys)
//!
//! [`MemoryDriver`] is the in-process implementation used by the embedded
//! shell, the server's memory mode, and the test suites.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod driver;
mod error;
mod memory;

pub use driver::{glob_prefix, KvDriver, Namespace, ScanPage, NO_EXPIRY};
pub use error::{KvError, KvResult};
pub use memory::MemoryDriver;
