//! End-to-end statement tests against the in-memory KV driver.
//!
//! Each test drives a [`Session`] with SQL text and, where the on-disk
//! layout matters, inspects the raw keys through the same driver.

use std::sync::Arc;

use nesoi_kv::{KvDriver, MemoryDriver, Namespace};
use nesoi_sql::encoding::{index_key, row_key};
use nesoi_sql::executor::decode_index_entry;
use nesoi_sql::{Datum, ResultSet, Session, SessionConfig, SqlError, SystemVariables};

/// A session over a fresh store with database `Nesoi` selected and a small
/// scan batch so multi-page scans are exercised.
fn open() -> (Session, Arc<MemoryDriver>) {
    let driver = Arc::new(MemoryDriver::new());
    let config = SessionConfig {
        scan_batch_size: 2,
        ..SessionConfig::default()
    };
    let mut session = Session::new(
        driver.clone(),
        Arc::new(SystemVariables::defaults()),
        config,
    );
    session.execute("CREATE DATABASE Nesoi").unwrap();
    (session, driver)
}

fn query(session: &mut Session, sql: &str) -> ResultSet {
    let mut results = session.execute(sql).unwrap();
    assert_eq!(results.len(), 1, "expected one result set for {sql}");
    results.remove(0)
}

fn column(rs: &ResultSet, i: usize) -> Vec<Datum> {
    rs.rows.iter().map(|r| r.datums()[i].clone()).collect()
}

fn index_rows(driver: &MemoryDriver, index: &str, value: Datum) -> Option<Vec<Vec<u8>>> {
    let key = index_key(index, [&value]);
    driver.get(Namespace::User, &key).unwrap().map(|raw| {
        decode_index_entry(&raw)
            .unwrap()
            .row_keys
            .iter()
            .map(|k| k.to_vec())
            .collect()
    })
}

#[test]
fn test_point_lookup_round_trip() {
    let (mut s, _) = open();
    s.execute("CREATE TABLE t (id INT PRIMARY KEY, name STRING)")
        .unwrap();
    s.execute("INSERT INTO t VALUES (1, 'a')").unwrap();
    assert_eq!(s.affected_rows(), 1);

    let rs = query(&mut s, "SELECT name FROM t WHERE id = 1");
    assert_eq!(rs.column_names(), vec!["name"]);
    assert_eq!(column(&rs, 0), vec![Datum::from("a")]);

    let rs = query(&mut s, "SELECT name FROM t WHERE id = 2");
    assert!(rs.is_empty());

    let rs = query(&mut s, "SHOW DATABASES");
    assert_eq!(rs.column_names(), vec!["DATABASES"]);
    assert!(column(&rs, 0).contains(&Datum::from("Nesoi")));
}

#[test]
fn test_duplicate_primary_key_keeps_first_row() {
    let (mut s, _) = open();
    s.execute("CREATE TABLE t (id INT PRIMARY KEY, name STRING)")
        .unwrap();
    s.execute("INSERT INTO t VALUES (1, 'a')").unwrap();

    let err = s.execute("INSERT INTO t VALUES (1, 'b')").unwrap_err();
    assert!(matches!(err, SqlError::DuplicateKey(_)));
    assert_eq!(err.code(), 1062);

    let err = s
        .execute("INSERT INTO t VALUES (2, 'x'), (2, 'y')")
        .unwrap_err();
    assert!(matches!(err, SqlError::DuplicateKey(_)));

    let rs = query(&mut s, "SELECT id, name FROM t");
    assert_eq!(rs.len(), 1);
    assert_eq!(rs.rows[0].datums(), &[Datum::int(1), Datum::from("a")]);
}

#[test]
fn test_non_unique_index_lists_rows_in_insert_order() {
    let (mut s, driver) = open();
    s.execute("CREATE TABLE t (id INT PRIMARY KEY, name STRING, age INT)")
        .unwrap();
    s.execute("CREATE INDEX by_age ON t (age)").unwrap();
    s.execute("INSERT INTO t VALUES (3, 'c', 30)").unwrap();
    s.execute("INSERT INTO t VALUES (1, 'a', 30), (2, 'b', 30)")
        .unwrap();

    let keys = index_rows(&driver, "Nesoi.by_age", Datum::int(30)).unwrap();
    assert_eq!(
        keys,
        vec![
            row_key("Nesoi.t", [&Datum::int(3)]),
            row_key("Nesoi.t", [&Datum::int(1)]),
            row_key("Nesoi.t", [&Datum::int(2)]),
        ]
    );
}

#[test]
fn test_unique_index_violation() {
    let (mut s, driver) = open();
    s.execute("CREATE TABLE t (id INT PRIMARY KEY, email STRING)")
        .unwrap();
    s.execute("CREATE UNIQUE INDEX by_email ON t (email)")
        .unwrap();
    s.execute("INSERT INTO t VALUES (1, 'x@y')").unwrap();

    let err = s.execute("INSERT INTO t VALUES (2, 'x@y')").unwrap_err();
    assert!(matches!(err, SqlError::DuplicateIndex(_)));

    let keys = index_rows(&driver, "Nesoi.by_email", Datum::from("x@y")).unwrap();
    assert_eq!(keys, vec![row_key("Nesoi.t", [&Datum::int(1)])]);
    assert!(query(&mut s, "SELECT id FROM t WHERE id = 2").is_empty());
}

#[test]
fn test_create_unique_index_over_duplicates_fails_cleanly() {
    let (mut s, driver) = open();
    s.execute("CREATE TABLE t (id INT PRIMARY KEY, age INT)")
        .unwrap();
    s.execute("INSERT INTO t VALUES (1, 5), (2, 5), (3, 6)")
        .unwrap();

    let err = s.execute("CREATE UNIQUE INDEX by_age ON t (age)").unwrap_err();
    assert!(matches!(err, SqlError::DuplicateIndex(_)));
    assert!(index_rows(&driver, "Nesoi.by_age", Datum::int(5)).is_none());
    assert!(index_rows(&driver, "Nesoi.by_age", Datum::int(6)).is_none());

    // The name is free again.
    s.execute("CREATE INDEX by_age ON t (age)").unwrap();
    assert_eq!(
        index_rows(&driver, "Nesoi.by_age", Datum::int(5)).unwrap().len(),
        2
    );
}

#[test]
fn test_create_index_if_not_exists_warns() {
    let (mut s, _) = open();
    s.execute("CREATE TABLE t (id INT PRIMARY KEY, age INT)")
        .unwrap();
    s.execute("CREATE INDEX by_age ON t (age)").unwrap();
    assert_eq!(s.warning_count(), 0);

    s.execute("CREATE INDEX IF NOT EXISTS by_age ON t (age)")
        .unwrap();
    assert_eq!(s.warning_count(), 1);

    let err = s.execute("CREATE INDEX by_age ON t (age)").unwrap_err();
    assert!(matches!(err, SqlError::DuplicateIndex(_)));
    let err = s.execute("CREATE INDEX other ON t (age)").unwrap_err();
    assert!(matches!(err, SqlError::DuplicateIndex(_)));
}

#[test]
fn test_update_reindexes_changed_rows() {
    let (mut s, driver) = open();
    s.execute("CREATE TABLE t (id INT PRIMARY KEY, name STRING, age INT)")
        .unwrap();
    s.execute("CREATE INDEX by_age ON t (age)").unwrap();
    s.execute("INSERT INTO t VALUES (1, 'a', 30), (2, 'b', 30), (3, 'c', 40)")
        .unwrap();

    s.execute("UPDATE t SET age = 41 WHERE name = 'b'").unwrap();
    assert_eq!(s.affected_rows(), 1);

    assert_eq!(
        index_rows(&driver, "Nesoi.by_age", Datum::int(30)).unwrap(),
        vec![row_key("Nesoi.t", [&Datum::int(1)])]
    );
    assert_eq!(
        index_rows(&driver, "Nesoi.by_age", Datum::int(41)).unwrap(),
        vec![row_key("Nesoi.t", [&Datum::int(2)])]
    );

    s.execute("UPDATE t SET age = 50").unwrap();
    assert_eq!(s.affected_rows(), 3);
    assert!(index_rows(&driver, "Nesoi.by_age", Datum::int(30)).is_none());
    assert!(index_rows(&driver, "Nesoi.by_age", Datum::int(40)).is_none());
    assert_eq!(
        index_rows(&driver, "Nesoi.by_age", Datum::int(50)).unwrap().len(),
        3
    );

    let rs = query(&mut s, "SELECT name, age FROM t WHERE id = 2");
    assert_eq!(rs.rows[0].datums(), &[Datum::from("b"), Datum::int(50)]);
}

#[test]
fn test_update_rejects_primary_key_change() {
    let (mut s, _) = open();
    s.execute("CREATE TABLE t (id INT PRIMARY KEY, name STRING)")
        .unwrap();
    let err = s.execute("UPDATE t SET id = 2").unwrap_err();
    assert!(matches!(err, SqlError::Unsupported(_)));
}

#[test]
fn test_wide_table_positions() {
    let (mut s, _) = open();
    s.execute(
        "CREATE TABLE wide (k INT PRIMARY KEY, c2 STRING, c3 INT, c4 STRING, c5 INT, c6 STRING)",
    )
    .unwrap();
    s.execute(
        "INSERT INTO wide (c6, k, c5, c3) VALUES ('six', 1, 5, 3), ('other', 2, 50, 30)",
    )
    .unwrap();

    let rs = query(&mut s, "SELECT c5, c2, c6 FROM wide WHERE c6 = 'six'");
    assert_eq!(rs.column_names(), vec!["c5", "c2", "c6"]);
    assert_eq!(
        rs.rows[0].datums(),
        &[Datum::int(5), Datum::Null, Datum::from("six")]
    );

    let rs = query(&mut s, "SELECT * FROM wide WHERE k = 2");
    assert_eq!(rs.column_names().len(), 6);
    assert_eq!(rs.rows[0].datums()[4], Datum::int(50));
}

#[test]
fn test_limit_across_scan_pages() {
    let (mut s, _) = open();
    s.execute("CREATE TABLE t (id INT PRIMARY KEY, v INT)")
        .unwrap();
    s.execute("INSERT INTO t VALUES (1, 0), (2, 0), (3, 0), (4, 1), (5, 0)")
        .unwrap();

    assert_eq!(query(&mut s, "SELECT id FROM t").len(), 5);
    assert_eq!(query(&mut s, "SELECT id FROM t LIMIT 3").len(), 3);
    assert_eq!(query(&mut s, "SELECT id FROM t LIMIT 0").len(), 5);
    assert_eq!(query(&mut s, "SELECT id FROM t WHERE v = 0 LIMIT 10").len(), 4);
}

#[test]
fn test_show_tables_and_system_variables() {
    let (mut s, _) = open();
    s.execute("CREATE TABLE b (id INT PRIMARY KEY); CREATE TABLE a (id INT PRIMARY KEY)")
        .unwrap();
    s.execute("CREATE DATABASE other; CREATE TABLE other.z (id INT PRIMARY KEY)")
        .unwrap();

    let rs = query(&mut s, "SHOW TABLES");
    assert_eq!(rs.column_names(), vec!["TABLES"]);
    assert_eq!(column(&rs, 0), vec![Datum::from("a"), Datum::from("b")]);

    let rs = query(&mut s, "SHOW DATABASES");
    assert_eq!(column(&rs, 0), vec![Datum::from("Nesoi"), Datum::from("other")]);

    let rs = query(&mut s, "SELECT @@version_comment, 1");
    assert_eq!(rs.column_names(), vec!["@@version_comment", "EXPRESSION"]);
    assert_eq!(
        rs.rows[0].datums(),
        &[Datum::from("MySQL Community Server (GPL)"), Datum::int(1)]
    );

    let err = s.execute("SELECT @@no_such_variable").unwrap_err();
    assert!(matches!(err, SqlError::Schema(_)));
}

#[test]
fn test_drop_table_and_database() {
    let (mut s, driver) = open();
    s.execute("CREATE TABLE t (id INT PRIMARY KEY, age INT)")
        .unwrap();
    s.execute("CREATE INDEX by_age ON t (age)").unwrap();
    s.execute("INSERT INTO t VALUES (1, 7), (2, 8)").unwrap();

    s.execute("DROP TABLE t").unwrap();
    assert!(driver.is_empty(Namespace::User));
    assert!(matches!(
        s.execute("SELECT id FROM t"),
        Err(SqlError::Schema(_))
    ));
    s.execute("DROP TABLE IF EXISTS t").unwrap();
    assert_eq!(s.warning_count(), 1);

    s.execute("CREATE TABLE t2 (id INT PRIMARY KEY)").unwrap();
    s.execute("INSERT INTO t2 VALUES (1)").unwrap();
    s.execute("DROP DATABASE Nesoi").unwrap();
    assert!(driver.is_empty(Namespace::User));
    assert!(driver.is_empty(Namespace::System));
}

#[test]
fn test_unsupported_shapes() {
    let (mut s, _) = open();
    s.execute("CREATE TABLE t (id INT PRIMARY KEY, v INT)")
        .unwrap();
    for sql in [
        "SELECT id FROM t ORDER BY id",
        "SELECT id FROM t WHERE id > 1",
        "SELECT a.id FROM t a JOIN t b ON a.id = b.id",
        "DELETE FROM t",
    ] {
        assert!(
            matches!(s.execute(sql), Err(SqlError::Unsupported(_))),
            "{sql} should be unsupported"
        );
    }
}

#[test]
fn test_key_delimiters_rejected_in_names() {
    let (mut s, driver) = open();
    s.execute("CREATE TABLE t (id INT PRIMARY KEY, age INT)")
        .unwrap();
    s.execute("INSERT INTO t VALUES (1, 7)").unwrap();

    for sql in [
        "CREATE TABLE `t/x` (id INT PRIMARY KEY)",
        "CREATE TABLE `t.x` (id INT PRIMARY KEY)",
        "CREATE DATABASE `a.b`",
        "CREATE DATABASE `a/b`",
        "CREATE INDEX `by/age` ON t (age)",
        "CREATE INDEX `by.age` ON t (age)",
    ] {
        assert!(
            matches!(s.execute(sql), Err(SqlError::Schema(_))),
            "{sql} should be rejected"
        );
    }

    // Only the row of `t` is stored; nothing else shares its prefix.
    let rs = query(&mut s, "SHOW TABLES");
    assert_eq!(column(&rs, 0), vec![Datum::from("t")]);
    let rs = query(&mut s, "SHOW DATABASES");
    assert_eq!(column(&rs, 0), vec![Datum::from("Nesoi")]);
    assert!(index_rows(&driver, "Nesoi.by/age", Datum::int(7)).is_none());
    let rs = query(&mut s, "SELECT id FROM t");
    assert_eq!(column(&rs, 0), vec![Datum::int(1)]);
}

#[test]
fn test_databases_sharing_a_name_prefix_stay_isolated() {
    let (mut s, driver) = open();
    s.execute("CREATE DATABASE a; CREATE DATABASE ab").unwrap();
    s.execute("CREATE TABLE a.x (id INT PRIMARY KEY)").unwrap();
    s.execute("CREATE TABLE ab.y (id INT PRIMARY KEY)").unwrap();
    s.execute("INSERT INTO ab.y VALUES (1)").unwrap();

    s.execute("USE a").unwrap();
    let rs = query(&mut s, "SHOW TABLES");
    assert_eq!(column(&rs, 0), vec![Datum::from("x")]);

    s.execute("DROP DATABASE a").unwrap();
    s.execute("USE ab").unwrap();
    let rs = query(&mut s, "SHOW TABLES");
    assert_eq!(column(&rs, 0), vec![Datum::from("y")]);
    let rs = query(&mut s, "SELECT id FROM y");
    assert_eq!(column(&rs, 0), vec![Datum::int(1)]);
    assert!(driver
        .get(Namespace::User, &row_key("ab.y", [&Datum::int(1)]))
        .unwrap()
        .is_some());
}

#[test]
fn test_null_values_in_non_unique_index() {
    let (mut s, driver) = open();
    s.execute("CREATE TABLE t (id INT PRIMARY KEY, age INT)")
        .unwrap();
    s.execute("CREATE INDEX by_age ON t (age)").unwrap();
    s.execute("INSERT INTO t VALUES (1, NULL), (2, NULL)").unwrap();

    assert_eq!(
        index_rows(&driver, "Nesoi.by_age", Datum::Null).unwrap(),
        vec![
            row_key("Nesoi.t", [&Datum::int(1)]),
            row_key("Nesoi.t", [&Datum::int(2)]),
        ]
    );

    s.execute("UPDATE t SET age = 5 WHERE id = 1").unwrap();
    assert_eq!(s.affected_rows(), 1);
    assert_eq!(
        index_rows(&driver, "Nesoi.by_age", Datum::Null).unwrap(),
        vec![row_key("Nesoi.t", [&Datum::int(2)])]
    );
    assert_eq!(
        index_rows(&driver, "Nesoi.by_age", Datum::int(5)).unwrap(),
        vec![row_key("Nesoi.t", [&Datum::int(1)])]
    );

    s.execute("UPDATE t SET age = 6 WHERE id = 2").unwrap();
    assert!(index_rows(&driver, "Nesoi.by_age", Datum::Null).is_none());
}

#[test]
fn test_unique_index_admits_one_null() {
    let (mut s, driver) = open();
    s.execute("CREATE TABLE t (id INT PRIMARY KEY, email STRING)")
        .unwrap();
    s.execute("CREATE UNIQUE INDEX by_email ON t (email)")
        .unwrap();
    s.execute("INSERT INTO t VALUES (1, NULL)").unwrap();

    let err = s.execute("INSERT INTO t VALUES (2, NULL)").unwrap_err();
    assert!(matches!(err, SqlError::DuplicateIndex(_)));
    assert_eq!(err.code(), 1062);

    assert_eq!(
        index_rows(&driver, "Nesoi.by_email", Datum::Null).unwrap(),
        vec![row_key("Nesoi.t", [&Datum::int(1)])]
    );
    let rs = query(&mut s, "SELECT id FROM t");
    assert_eq!(column(&rs, 0), vec![Datum::int(1)]);
}
