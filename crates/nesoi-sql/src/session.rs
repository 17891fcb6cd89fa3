//! Per-connection statement pipeline.
//!
//! A [`Session`] owns the connection-level state: the current database and
//! the counters reported after each statement. Statements run one at a
//! time, each through parse, then either the DDL path or
//! analyze / optimize / execute.

use std::sync::Arc;
use std::time::{Duration, Instant};

use nesoi_kv::KvDriver;
use tracing::{debug, warn};

use crate::analyzer::Analyzer;
use crate::catalog::{execute_ddl, Catalog, DdlOutcome, DEFAULT_SCAN_BATCH};
use crate::error::{SqlError, SqlResult};
use crate::executor::{self, ExecContext};
use crate::parser::{Parser, Statement};
use crate::planner::{optimize, PlanNode};
use crate::result::ResultSet;
use crate::sysvar::SystemVariables;

/// Database selected when a connection opens.
pub const DEFAULT_DATABASE: &str = "Nesoi";

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Database selected on open.
    pub default_database: String,
    /// Keys requested per KV scan page.
    pub scan_batch_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_database: DEFAULT_DATABASE.to_string(),
            scan_batch_size: DEFAULT_SCAN_BATCH,
        }
    }
}

/// What one statement produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementOutcome {
    /// A row stream (SELECT, SHOW).
    Rows(ResultSet),
    /// Any other statement.
    Done {
        /// Rows written.
        affected_rows: u64,
        /// IF [NOT] EXISTS no-ops.
        warnings: u64,
    },
}

/// Outcomes of a statement batch that may have stopped early.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Outcomes of the statements that completed, in order.
    pub completed: Vec<StatementOutcome>,
    /// The error that stopped the batch. Statements after it did not run.
    pub error: Option<SqlError>,
}

impl BatchOutcome {
    /// All outcomes, or the error if the batch stopped early.
    pub fn into_result(self) -> SqlResult<Vec<StatementOutcome>> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.completed),
        }
    }
}

/// A client connection.
pub struct Session {
    driver: Arc<dyn KvDriver>,
    sysvars: Arc<SystemVariables>,
    config: SessionConfig,
    current_db: String,
    affected_rows: u64,
    warnings: u64,
    statement_count: u64,
    created_at: Instant,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("current_db", &self.current_db)
            .field("config", &self.config)
            .field("statement_count", &self.statement_count)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Opens a session over `driver`.
    pub fn new(
        driver: Arc<dyn KvDriver>,
        sysvars: Arc<SystemVariables>,
        config: SessionConfig,
    ) -> Self {
        let current_db = config.default_database.clone();
        Self {
            driver,
            sysvars,
            config,
            current_db,
            affected_rows: 0,
            warnings: 0,
            statement_count: 0,
            created_at: Instant::now(),
        }
    }

    /// The database unqualified names resolve against.
    pub fn current_database(&self) -> &str {
        &self.current_db
    }

    /// Rows written by the last statement.
    pub fn affected_rows(&self) -> u64 {
        self.affected_rows
    }

    /// Warnings raised by the last statement.
    pub fn warning_count(&self) -> u64 {
        self.warnings
    }

    /// Statements executed so far.
    pub fn statement_count(&self) -> u64 {
        self.statement_count
    }

    /// Time since the session opened.
    pub fn uptime(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// The session's configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // =========================================================================
    // SQL Execution
    // =========================================================================

    /// Executes every statement in `sql` and returns the row streams, in
    /// order. Statements that return no rows contribute nothing.
    ///
    /// Execution stops at the first error. Statements before it stay
    /// applied.
    pub fn execute(&mut self, sql: &str) -> SqlResult<Vec<ResultSet>> {
        Ok(self
            .run(sql)?
            .into_iter()
            .filter_map(|outcome| match outcome {
                StatementOutcome::Rows(rows) => Some(rows),
                StatementOutcome::Done { .. } => None,
            })
            .collect())
    }

    /// Executes every statement in `sql`, reporting each outcome.
    pub fn run(&mut self, sql: &str) -> SqlResult<Vec<StatementOutcome>> {
        self.run_batch(sql).into_result()
    }

    /// Executes statements in `sql` until one fails, keeping the outcomes
    /// of those that ran before it. A parse error runs nothing.
    pub fn run_batch(&mut self, sql: &str) -> BatchOutcome {
        let statements = match Parser::parse(sql) {
            Ok(statements) => statements,
            Err(e) => {
                return BatchOutcome {
                    completed: Vec::new(),
                    error: Some(e.into()),
                }
            }
        };
        let mut completed = Vec::with_capacity(statements.len());
        for statement in &statements {
            match self.execute_statement(statement) {
                Ok(outcome) => completed.push(outcome),
                Err(e) => {
                    return BatchOutcome {
                        completed,
                        error: Some(e),
                    }
                }
            }
        }
        BatchOutcome {
            completed,
            error: None,
        }
    }

    /// Renders the plan of every statement in `sql` without executing it.
    pub fn explain(&self, sql: &str) -> SqlResult<String> {
        let mut out = String::new();
        for statement in Parser::parse(sql)? {
            if statement.is_ddl() {
                out.push_str(&format!("CatalogOperation: {}\n", statement.tag()));
            } else {
                out.push_str(&self.plan(&statement)?.explain());
            }
        }
        Ok(out)
    }

    fn execute_statement(&mut self, statement: &Statement) -> SqlResult<StatementOutcome> {
        self.statement_count += 1;
        self.affected_rows = 0;
        self.warnings = 0;
        let start = Instant::now();

        let result = if statement.is_ddl() {
            self.execute_ddl(statement)
        } else {
            self.execute_query(statement)
        };

        match &result {
            Ok(_) => debug!(
                statement = statement.tag(),
                db = %self.current_db,
                affected = self.affected_rows,
                warnings = self.warnings,
                elapsed_us = start.elapsed().as_micros() as u64,
                "statement complete"
            ),
            Err(e) => warn!(statement = statement.tag(), error = %e, "statement failed"),
        }
        result
    }

    fn execute_ddl(&mut self, statement: &Statement) -> SqlResult<StatementOutcome> {
        match execute_ddl(&self.catalog(), &self.current_db, statement)? {
            DdlOutcome::Done => {}
            DdlOutcome::Skipped(reason) => {
                debug!(%reason, "skipped");
                self.warnings += 1;
            }
            DdlOutcome::UseDatabase(db) => self.current_db = db,
        }
        Ok(StatementOutcome::Done {
            affected_rows: 0,
            warnings: self.warnings,
        })
    }

    fn execute_query(&mut self, statement: &Statement) -> SqlResult<StatementOutcome> {
        let plan = self.plan(statement)?;
        let ctx = Arc::new(ExecContext::new(
            self.driver.clone(),
            self.sysvars.clone(),
            self.current_db.clone(),
            self.config.scan_batch_size,
        ));

        let rows = executor::execute(&ctx, plan);
        // Counters reflect writes issued even when the statement fails.
        self.affected_rows = ctx.affected_rows();
        self.warnings = ctx.warnings();

        Ok(match rows? {
            Some(rows) => StatementOutcome::Rows(rows),
            None => StatementOutcome::Done {
                affected_rows: self.affected_rows,
                warnings: self.warnings,
            },
        })
    }

    fn plan(&self, statement: &Statement) -> SqlResult<PlanNode> {
        let catalog = self.catalog();
        let analyzer = Analyzer::new(&catalog, &self.sysvars, &self.current_db);
        let resolved = analyzer.analyze(statement)?;
        Ok(optimize(resolved))
    }

    fn catalog(&self) -> Catalog {
        Catalog::new(self.driver.clone(), self.config.scan_batch_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Datum;
    use nesoi_kv::MemoryDriver;

    fn session() -> Session {
        let mut session = Session::new(
            Arc::new(MemoryDriver::new()),
            Arc::new(SystemVariables::defaults()),
            SessionConfig::default(),
        );
        session
            .execute("CREATE DATABASE Nesoi; CREATE TABLE t (id INT PRIMARY KEY, name STRING)")
            .unwrap();
        session
    }

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.default_database, "Nesoi");
        assert_eq!(config.scan_batch_size, 10);
    }

    #[test]
    fn test_counters_reset_per_statement() {
        let mut s = session();
        s.execute("INSERT INTO t VALUES (1, 'a'), (2, 'b')").unwrap();
        assert_eq!(s.affected_rows(), 2);
        s.execute("SELECT name FROM t").unwrap();
        assert_eq!(s.affected_rows(), 0);

        s.execute("CREATE TABLE IF NOT EXISTS t (id INT PRIMARY KEY)")
            .unwrap();
        assert_eq!(s.warning_count(), 1);
        s.execute("SELECT 1").unwrap();
        assert_eq!(s.warning_count(), 0);
    }

    #[test]
    fn test_run_reports_outcomes() {
        let mut s = session();
        let outcomes = s
            .run("INSERT INTO t VALUES (1, 'a'); SELECT id FROM t")
            .unwrap();
        assert_eq!(
            outcomes[0],
            StatementOutcome::Done {
                affected_rows: 1,
                warnings: 0
            }
        );
        match &outcomes[1] {
            StatementOutcome::Rows(rows) => assert_eq!(rows.rows[0].datums(), &[Datum::int(1)]),
            other => panic!("expected rows, got {:?}", other),
        }
    }

    #[test]
    fn test_use_switches_database() {
        let mut s = session();
        s.execute("CREATE DATABASE shop; USE shop").unwrap();
        assert_eq!(s.current_database(), "shop");
        assert!(matches!(s.execute("USE nowhere"), Err(SqlError::Schema(_))));
        assert_eq!(s.current_database(), "shop");
    }

    #[test]
    fn test_error_stops_batch() {
        let mut s = session();
        let err = s
            .execute("INSERT INTO t VALUES (1, 'a'); INSERT INTO t VALUES (1, 'b'); INSERT INTO t VALUES (3, 'c')")
            .unwrap_err();
        assert!(matches!(err, SqlError::DuplicateKey(_)));
        let rows = s.execute("SELECT id FROM t").unwrap();
        assert_eq!(rows[0].len(), 1);
        assert_eq!(s.statement_count(), 5);
    }

    #[test]
    fn test_batch_keeps_outcomes_before_error() {
        let mut s = session();
        let batch = s.run_batch(
            "INSERT INTO t VALUES (1, 'a'); SELECT id FROM t WHERE id = 1; INSERT INTO t VALUES (1, 'b'); INSERT INTO t VALUES (3, 'c')",
        );
        assert_eq!(batch.completed.len(), 2);
        assert_eq!(
            batch.completed[0],
            StatementOutcome::Done {
                affected_rows: 1,
                warnings: 0
            }
        );
        match &batch.completed[1] {
            StatementOutcome::Rows(rows) => assert_eq!(rows.rows[0].datums(), &[Datum::int(1)]),
            other => panic!("expected rows, got {:?}", other),
        }
        assert!(matches!(batch.error, Some(SqlError::DuplicateKey(_))));

        let batch = s.run_batch("SELEKT 1; INSERT INTO t VALUES (4, 'd')");
        assert!(batch.completed.is_empty());
        assert!(batch.error.is_some());
        let rows = s.run_batch("SELECT id FROM t").into_result().unwrap();
        assert_eq!(rows.len(), 1);
        assert!(matches!(&rows[0], StatementOutcome::Rows(r) if r.len() == 1));
    }

    #[test]
    fn test_explain() {
        let s = session();
        let plan = s.explain("SELECT name FROM t WHERE id = 1").unwrap();
        assert!(plan.starts_with("Projection"));
        assert!(plan.contains("ScanByPrimaryKey"));
        assert_eq!(
            s.explain("DROP TABLE t").unwrap(),
            "CatalogOperation: DROP TABLE\n"
        );
    }
}
