//! Plan construction.
//!
//! A plan is a linear chain of nodes, built once per statement and dropped
//! after execution. For queries with a FROM table:
//!
//! ```text
//!   Limit?            LIMIT n, n > 0
//!     Projection?     more fields materialized than requested
//!       Filter?       predicate present and not answered by the lookup
//!         Scan | ScanByPrimaryKey
//! ```
//!
//! UPDATE wraps the same scan chain in an `Update` node. Queries without a
//! FROM table, SHOW, INSERT and CREATE INDEX each become a single node.

mod optimizer;
mod plan;

pub use optimizer::optimize;
pub use plan::PlanNode;
