//! Runtime values, records and column definitions.

mod column;
mod datum;
mod record;

pub use column::{ColumnDef, ScalarType, TableInfo};
pub use datum::Datum;
pub use record::Record;
