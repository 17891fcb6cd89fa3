//! Shared database handle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use nesoi_kv::{KvDriver, MemoryDriver};
use nesoi_sql::catalog::{check_object_name, Catalog};
use nesoi_sql::{ResultSet, Session, SessionConfig, SystemVariables};
use parking_lot::RwLock;
use tracing::{debug, info};

use super::error::{DatabaseError, DatabaseResult};

/// Database configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Maximum number of open connections.
    pub max_connections: usize,
    /// Configuration handed to each new session.
    pub session: SessionConfig,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: 100,
            session: SessionConfig::default(),
        }
    }
}

/// Unique connection identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a connection ID.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the numeric ID.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn_{}", self.0)
    }
}

/// Registry entry for one open connection.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// Connection ID.
    pub id: ConnectionId,
    /// Remote address, when there is one.
    pub peer: Option<String>,
    /// When the connection opened.
    pub opened_at: Instant,
}

/// Database statistics.
#[derive(Debug, Default)]
pub struct DatabaseStats {
    /// Open connections.
    pub active_connections: usize,
    /// Connections opened since start.
    pub total_connections: u64,
    /// Uptime.
    pub uptime: Duration,
}

/// The state shared by every connection.
pub struct Database {
    config: DatabaseConfig,
    driver: Arc<dyn KvDriver>,
    sysvars: Arc<SystemVariables>,
    connections: RwLock<HashMap<ConnectionId, ConnectionInfo>>,
    next_connection_id: AtomicU64,
    total_connections: AtomicU64,
    started_at: Instant,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.config)
            .field("active_connections", &self.active_connections())
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Opens a database over `driver`, creating the default database if
    /// the store does not have it yet.
    pub fn open(driver: Arc<dyn KvDriver>, config: DatabaseConfig) -> DatabaseResult<Self> {
        let catalog = Catalog::new(driver.clone(), config.session.scan_batch_size);
        let default_db = &config.session.default_database;
        check_object_name("database", default_db)?;
        if !catalog.database_exists(default_db)? {
            catalog.put_database(default_db)?;
            info!(database = %default_db, "created default database");
        }

        Ok(Self {
            config,
            driver,
            sysvars: Arc::new(SystemVariables::defaults()),
            connections: RwLock::new(HashMap::new()),
            next_connection_id: AtomicU64::new(1),
            total_connections: AtomicU64::new(0),
            started_at: Instant::now(),
        })
    }

    /// Opens a database over a fresh in-memory store.
    pub fn open_memory() -> DatabaseResult<Self> {
        Self::open(Arc::new(MemoryDriver::new()), DatabaseConfig::default())
    }

    /// Returns the configuration.
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Returns the KV driver.
    pub fn driver(&self) -> &Arc<dyn KvDriver> {
        &self.driver
    }

    // =========================================================================
    // Connection Management
    // =========================================================================

    /// Registers a connection and returns its session.
    pub fn open_session(&self, peer: Option<String>) -> DatabaseResult<(ConnectionId, Session)> {
        let id = {
            let mut connections = self.connections.write();
            if connections.len() >= self.config.max_connections {
                return Err(DatabaseError::TooManyConnections(
                    self.config.max_connections,
                ));
            }
            let id = ConnectionId::new(self.next_connection_id.fetch_add(1, Ordering::SeqCst));
            connections.insert(
                id,
                ConnectionInfo {
                    id,
                    peer,
                    opened_at: Instant::now(),
                },
            );
            id
        };
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        debug!(%id, "opened session");

        let session = Session::new(
            self.driver.clone(),
            self.sysvars.clone(),
            self.config.session.clone(),
        );
        Ok((id, session))
    }

    /// Removes a connection from the registry. Returns false if it was not
    /// registered.
    pub fn close_session(&self, id: ConnectionId) -> bool {
        let removed = self.connections.write().remove(&id).is_some();
        if removed {
            debug!(%id, "closed session");
        }
        removed
    }

    /// Returns the number of open connections.
    pub fn active_connections(&self) -> usize {
        self.connections.read().len()
    }

    /// Snapshot of the registry, ordered by ID.
    pub fn connections(&self) -> Vec<ConnectionInfo> {
        let mut list: Vec<ConnectionInfo> = self.connections.read().values().cloned().collect();
        list.sort_by_key(|c| c.id);
        list
    }

    /// Returns database statistics.
    pub fn stats(&self) -> DatabaseStats {
        DatabaseStats {
            active_connections: self.active_connections(),
            total_connections: self.total_connections.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
        }
    }

    // =========================================================================
    // Quick Execute API
    // =========================================================================

    /// Executes SQL using a temporary session.
    pub fn execute(&self, sql: &str) -> DatabaseResult<Vec<ResultSet>> {
        let (id, mut session) = self.open_session(None)?;
        let result = session.execute(sql);
        self.close_session(id);
        Ok(result?)
    }
}
