//! Plan nodes.

use std::collections::BTreeMap;
use std::fmt;

use crate::analyzer::{CreateIndexQuery, EqualityPredicate, InsertRow, TargetRef};
use crate::parser::ShowKind;
use crate::types::{Datum, TableInfo};

/// One node of a plan chain. Every node owns at most one child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanNode {
    /// Full scan of a table's rows.
    Scan {
        /// Scanned table.
        table: TableInfo,
        /// Fields produced for each row.
        fields: Vec<TargetRef>,
    },
    /// Single-key fetch of the row whose primary key equals `key`.
    ScanByPrimaryKey {
        /// Scanned table.
        table: TableInfo,
        /// Fields produced for the row.
        fields: Vec<TargetRef>,
        /// Primary key value.
        key: Datum,
    },
    /// Passes rows whose predicate operands are equal.
    Filter {
        /// Child.
        input: Box<PlanNode>,
        /// Predicate.
        predicate: EqualityPredicate,
    },
    /// Keeps the first `count` fields of each row.
    Projection {
        /// Child.
        input: Box<PlanNode>,
        /// Fields kept.
        count: usize,
    },
    /// Passes at most `count` rows.
    Limit {
        /// Child.
        input: Box<PlanNode>,
        /// Row budget.
        count: u64,
    },
    /// Writes rows and their index entries.
    Insert {
        /// Target table.
        table: TableInfo,
        /// Rows to write.
        rows: Vec<InsertRow>,
    },
    /// Rewrites each row its child produces.
    Update {
        /// Child producing current rows.
        input: Box<PlanNode>,
        /// Target table.
        table: TableInfo,
        /// New values by 1-based position.
        assignments: BTreeMap<usize, Datum>,
    },
    /// Lists databases or tables.
    CatalogList {
        /// What to list.
        kind: ShowKind,
        /// Database whose tables are listed.
        database: String,
    },
    /// One row of constants and system variables.
    ConstantRow {
        /// Fields.
        fields: Vec<TargetRef>,
    },
    /// Backfills and registers a secondary index.
    CreateIndex(CreateIndexQuery),
}

impl PlanNode {
    /// Node name as shown by EXPLAIN.
    pub fn name(&self) -> &'static str {
        match self {
            PlanNode::Scan { .. } => "Scan",
            PlanNode::ScanByPrimaryKey { .. } => "ScanByPrimaryKey",
            PlanNode::Filter { .. } => "Filter",
            PlanNode::Projection { .. } => "Projection",
            PlanNode::Limit { .. } => "Limit",
            PlanNode::Insert { .. } => "Insert",
            PlanNode::Update { .. } => "Update",
            PlanNode::CatalogList { .. } => "CatalogList",
            PlanNode::ConstantRow { .. } => "ConstantRow",
            PlanNode::CreateIndex(_) => "CreateIndex",
        }
    }

    /// The child node, if any.
    pub fn child(&self) -> Option<&PlanNode> {
        match self {
            PlanNode::Filter { input, .. }
            | PlanNode::Projection { input, .. }
            | PlanNode::Limit { input, .. }
            | PlanNode::Update { input, .. } => Some(input.as_ref()),
            PlanNode::Scan { .. }
            | PlanNode::ScanByPrimaryKey { .. }
            | PlanNode::Insert { .. }
            | PlanNode::CatalogList { .. }
            | PlanNode::ConstantRow { .. }
            | PlanNode::CreateIndex(_) => None,
        }
    }

    /// Returns true if executing the plan yields a result set.
    pub fn returns_rows(&self) -> bool {
        !matches!(
            self,
            PlanNode::Insert { .. } | PlanNode::Update { .. } | PlanNode::CreateIndex(_)
        )
    }

    /// Renders the chain as an indented tree, root first.
    pub fn explain(&self) -> String {
        let mut output = String::new();
        let mut node = Some(self);
        let mut indent = 0;
        while let Some(op) = node {
            output.push_str(&"  ".repeat(indent));
            output.push_str(op.name());
            op.explain_details(&mut output);
            output.push('\n');
            node = op.child();
            indent += 1;
        }
        output
    }

    fn explain_details(&self, output: &mut String) {
        match self {
            PlanNode::Scan { table, fields } => {
                output.push_str(&format!(" (table={}, fields={})", table.name, fields.len()));
            }
            PlanNode::ScanByPrimaryKey { table, fields, key } => {
                output.push_str(&format!(
                    " (table={}, key={}, fields={})",
                    table.name,
                    key,
                    fields.len()
                ));
            }
            PlanNode::Filter { predicate, .. } => {
                output.push_str(&format!(" ({})", predicate));
            }
            PlanNode::Projection { count, .. } => {
                output.push_str(&format!(" (fields={})", count));
            }
            PlanNode::Limit { count, .. } => {
                output.push_str(&format!(" (count={})", count));
            }
            PlanNode::Insert { table, rows } => {
                output.push_str(&format!(" (table={}, rows={})", table.name, rows.len()));
            }
            PlanNode::Update {
                table, assignments, ..
            } => {
                let cols: Vec<String> = assignments
                    .keys()
                    .filter_map(|pos| table.column(*pos).map(|c| c.name.clone()))
                    .collect();
                output.push_str(&format!(" (table={}, set=[{}])", table.name, cols.join(", ")));
            }
            PlanNode::CatalogList { kind, database } => match kind {
                ShowKind::Databases => output.push_str(" (DATABASES)"),
                ShowKind::Tables => output.push_str(&format!(" (TABLES in {})", database)),
            },
            PlanNode::ConstantRow { fields } => {
                let names: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
                output.push_str(&format!(" ({})", names.join(", ")));
            }
            PlanNode::CreateIndex(create) => {
                output.push_str(&format!(
                    " (index={}, table={}, unique={})",
                    create.index.name, create.table.name, create.index.unique
                ));
            }
        }
    }
}

impl fmt::Display for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.explain())
    }
}
