//! Rule-based plan selection. Pure and deterministic; performs no I/O.

use tracing::debug;

use super::PlanNode;
use crate::analyzer::{EqualityPredicate, ResolvedQuery, SelectQuery, TargetRef};
use crate::types::TableInfo;

/// Builds the plan for a resolved query.
pub fn optimize(query: ResolvedQuery) -> PlanNode {
    let plan = match query {
        ResolvedQuery::Select(select) => plan_select(select),
        ResolvedQuery::Insert(insert) => PlanNode::Insert {
            table: insert.table,
            rows: insert.rows,
        },
        ResolvedQuery::Update(update) => {
            let input = scan_chain(
                update.table.clone(),
                update.fields,
                update.requested,
                update.predicate,
            );
            PlanNode::Update {
                input: Box::new(input),
                table: update.table,
                assignments: update.assignments,
            }
        }
        ResolvedQuery::CreateIndex(create) => PlanNode::CreateIndex(create),
        ResolvedQuery::Show(show) => PlanNode::CatalogList {
            kind: show.kind,
            database: show.database,
        },
    };
    debug!(root = plan.name(), "planned");
    plan
}

fn plan_select(select: SelectQuery) -> PlanNode {
    let Some(table) = select.table else {
        return PlanNode::ConstantRow {
            fields: select.fields,
        };
    };

    let mut plan = scan_chain(table, select.fields, select.requested, select.predicate);
    if select.limit > 0 {
        plan = PlanNode::Limit {
            input: Box::new(plan),
            count: select.limit,
        };
    }
    plan
}

/// Picks the access path for a table and wraps it in filter and
/// projection as needed.
fn scan_chain(
    table: TableInfo,
    fields: Vec<TargetRef>,
    requested: usize,
    predicate: Option<EqualityPredicate>,
) -> PlanNode {
    let materialized = fields.len();

    let point_key = predicate
        .as_ref()
        .and_then(|p| p.column_literal())
        .filter(|(pos, _)| table.single_primary_key() == Some(*pos))
        .map(|(_, key)| key.clone());

    let mut plan = match (point_key, predicate) {
        (Some(key), _) => PlanNode::ScanByPrimaryKey { table, fields, key },
        (None, Some(predicate)) => PlanNode::Filter {
            input: Box::new(PlanNode::Scan { table, fields }),
            predicate,
        },
        (None, None) => PlanNode::Scan { table, fields },
    };

    if materialized > requested {
        plan = PlanNode::Projection {
            input: Box::new(plan),
            count: requested,
        };
    }
    plan
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::analyzer::{ShowQuery, TargetKind, UpdateQuery};
    use crate::parser::ShowKind;
    use crate::types::{ColumnDef, Datum, ScalarType};

    fn table() -> TableInfo {
        TableInfo::new(
            "d.t",
            vec![
                ColumnDef::new("id", 1, ScalarType::Int64).with_primary_key(),
                ColumnDef::new("name", 2, ScalarType::String),
            ],
        )
        .unwrap()
    }

    fn column(id: usize, name: &str, pos: usize) -> TargetRef {
        TargetRef::new(id, name, TargetKind::Column(pos))
    }

    fn literal(id: usize, value: Datum) -> TargetRef {
        TargetRef::new(id, "EXPRESSION", TargetKind::Literal(value))
    }

    fn select_where(pos: usize, limit: u64) -> SelectQuery {
        let name = if pos == 1 { "id" } else { "name" };
        SelectQuery {
            table: Some(table()),
            fields: vec![
                column(1, "name", 2),
                column(2, name, pos),
                literal(3, Datum::int(5)),
            ],
            requested: 1,
            predicate: Some(EqualityPredicate {
                left: column(2, name, pos),
                right: literal(3, Datum::int(5)),
            }),
            limit,
        }
    }

    #[test]
    fn test_primary_key_equality_uses_point_lookup() {
        let plan = optimize(ResolvedQuery::Select(select_where(1, 0)));
        assert_eq!(plan.name(), "Projection");
        match plan.child() {
            Some(PlanNode::ScanByPrimaryKey { key, .. }) => assert_eq!(key, &Datum::int(5)),
            other => panic!("expected point lookup, got {:?}", other),
        }
    }

    #[test]
    fn test_non_key_equality_uses_filtered_scan() {
        let plan = optimize(ResolvedQuery::Select(select_where(2, 0)));
        let filter = plan.child().unwrap();
        assert_eq!(filter.name(), "Filter");
        assert_eq!(filter.child().unwrap().name(), "Scan");
    }

    #[test]
    fn test_composite_key_is_not_point_lookup() {
        let composite = TableInfo::new(
            "d.c",
            vec![
                ColumnDef::new("a", 1, ScalarType::Int64).with_primary_key(),
                ColumnDef::new("b", 2, ScalarType::Int64).with_primary_key(),
            ],
        )
        .unwrap();
        let mut query = select_where(1, 0);
        query.table = Some(composite);
        let plan = optimize(ResolvedQuery::Select(query));
        assert_eq!(plan.child().unwrap().name(), "Filter");
    }

    #[test]
    fn test_limit_wraps_projection() {
        let plan = optimize(ResolvedQuery::Select(select_where(2, 3)));
        assert_eq!(
            plan.explain(),
            "Limit (count=3)\n  Projection (fields=1)\n    Filter (name#2 = 5)\n      Scan (table=d.t, fields=3)\n"
        );
    }

    #[test]
    fn test_plain_scan_has_no_wrappers() {
        let query = SelectQuery {
            table: Some(table()),
            fields: vec![column(1, "id", 1), column(2, "name", 2)],
            requested: 2,
            predicate: None,
            limit: 0,
        };
        let plan = optimize(ResolvedQuery::Select(query));
        assert_eq!(plan.name(), "Scan");
        assert!(plan.returns_rows());
    }

    #[test]
    fn test_without_from_is_constant_row() {
        let query = SelectQuery {
            table: None,
            fields: vec![TargetRef::new(
                1,
                "@@version",
                TargetKind::SessionVar("version".into()),
            )],
            requested: 1,
            predicate: None,
            limit: 1,
        };
        let plan = optimize(ResolvedQuery::Select(query));
        assert_eq!(plan.name(), "ConstantRow");
    }

    #[test]
    fn test_update_wraps_scan_chain() {
        let mut assignments = BTreeMap::new();
        assignments.insert(2, Datum::from("z"));
        let query = UpdateQuery {
            table: table(),
            fields: vec![
                column(1, "id", 1),
                column(2, "name", 2),
                column(3, "id", 1),
                literal(4, Datum::int(1)),
            ],
            requested: 2,
            assignments,
            predicate: Some(EqualityPredicate {
                left: column(3, "id", 1),
                right: literal(4, Datum::int(1)),
            }),
        };
        let plan = optimize(ResolvedQuery::Update(query));
        assert!(!plan.returns_rows());
        assert_eq!(
            plan.explain(),
            "Update (table=d.t, set=[name])\n  Projection (fields=2)\n    ScanByPrimaryKey (table=d.t, key=1, fields=4)\n"
        );
    }

    #[test]
    fn test_show() {
        let plan = optimize(ResolvedQuery::Show(ShowQuery {
            kind: ShowKind::Tables,
            database: "d".into(),
        }));
        assert_eq!(plan.explain(), "CatalogList (TABLES in d)\n");
    }
}
