//! CREATE INDEX resolution.

use std::collections::HashSet;

use super::write::lookup_column;
use super::{Analyzer, CreateIndexQuery};
use crate::catalog::{check_object_name, qualified_name, IndexMeta};
use crate::error::{SqlError, SqlResult};
use crate::parser::CreateIndexStatement;

impl<'a> Analyzer<'a> {
    pub(super) fn analyze_create_index(
        &self,
        create: &CreateIndexStatement,
    ) -> SqlResult<CreateIndexQuery> {
        check_object_name("index", &create.name.name)?;
        let table = self.load_table(&create.table)?;

        // An unqualified index lives in its table's database.
        let name = qualified_name(table.schema(), &create.name);

        let mut seen = HashSet::new();
        let mut positions = Vec::with_capacity(create.columns.len());
        for column in &create.columns {
            let def = lookup_column(&table, column)?;
            if !seen.insert(def.position) {
                return Err(SqlError::schema(format!(
                    "duplicate column '{}' in index '{}'",
                    def.name, name
                )));
            }
            positions.push(def.position);
        }

        let index = IndexMeta::new(name, table.name.clone(), create.unique, positions);

        if self.catalog.index_meta(&index.name)?.is_some() {
            if create.if_not_exists {
                return Ok(CreateIndexQuery {
                    index,
                    table,
                    skip: true,
                });
            }
            return Err(SqlError::DuplicateIndex(format!(
                "index '{}' already exists",
                index.name
            )));
        }

        // Rows and index entries share the USER/ prefix space.
        if self.catalog.table_exists(&index.name)? {
            return Err(SqlError::schema(format!(
                "index '{}' collides with a table of the same name",
                index.name
            )));
        }

        if let Some(existing) = self.catalog.index_on(&index)? {
            return Err(SqlError::DuplicateIndex(format!(
                "columns of '{}' are already indexed by '{}'",
                index.name, existing
            )));
        }

        Ok(CreateIndexQuery {
            index,
            table,
            skip: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{analyze, setup};
    use super::super::ResolvedQuery;
    use super::*;

    fn create(cat: &crate::catalog::Catalog, sql: &str) -> SqlResult<CreateIndexQuery> {
        match analyze(cat, sql)? {
            ResolvedQuery::CreateIndex(q) => Ok(q),
            other => panic!("expected create index, got {:?}", other),
        }
    }

    #[test]
    fn test_resolves_positions() {
        let cat = setup();
        let q = create(&cat, "CREATE UNIQUE INDEX by_tag ON t (tag, age)").unwrap();
        assert_eq!(q.index.name, "d.by_tag");
        assert_eq!(q.index.table, "d.t");
        assert_eq!(q.index.positions, vec![4, 3]);
        assert!(q.index.unique);
        assert!(!q.skip);
    }

    #[test]
    fn test_rejects_table_name() {
        let cat = setup();
        let err = create(&cat, "CREATE INDEX t ON t (age)").unwrap_err();
        assert!(matches!(err, SqlError::Schema(_)));
    }

    #[test]
    fn test_rejects_key_delimiters_in_name() {
        let cat = setup();
        for sql in [
            "CREATE INDEX `by/age` ON t (age)",
            "CREATE INDEX `by.age` ON t (age)",
        ] {
            assert!(matches!(create(&cat, sql), Err(SqlError::Schema(_))), "{}", sql);
        }
    }

    #[test]
    fn test_rejects_duplicates() {
        let cat = setup();
        cat.register_index(&IndexMeta::new("d.by_age", "d.t", false, vec![3]))
            .unwrap();

        assert!(matches!(
            create(&cat, "CREATE INDEX by_age ON t (name)"),
            Err(SqlError::DuplicateIndex(_))
        ));
        assert!(matches!(
            create(&cat, "CREATE INDEX other ON t (age)"),
            Err(SqlError::DuplicateIndex(_))
        ));
        assert!(matches!(
            create(&cat, "CREATE INDEX other ON t (age, age)"),
            Err(SqlError::Schema(_))
        ));
        assert!(matches!(
            create(&cat, "CREATE INDEX other ON t (nope)"),
            Err(SqlError::Schema(_))
        ));

        let q = create(&cat, "CREATE INDEX IF NOT EXISTS by_age ON t (name)").unwrap();
        assert!(q.skip);
    }
}
