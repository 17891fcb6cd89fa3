//! Line-oriented TCP front end.
//!
//! Each request line is a statement batch. The reply to every statement
//! in the batch is either a result set (a header line of column names,
//! then one line per row, fields separated by tabs) followed by
//! `OK <rows>`, or just `OK <affected rows>`. The first failing statement
//! ends the batch with `ERR <code> <message>`, after the replies of the
//! statements that ran before it.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use nesoi_sql::session::StatementOutcome;
use nesoi_sql::Session;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{debug, error, info, warn};

use crate::database::{Database, DatabaseError};

/// Pause after a failed accept. Errors such as EMFILE repeat until a
/// descriptor frees up.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accepts connections and serves each on its own task.
#[derive(Debug)]
pub struct Server {
    db: Arc<Database>,
    listener: TcpListener,
}

impl Server {
    /// Binds the listening socket.
    pub async fn bind(db: Arc<Database>, addr: impl ToSocketAddrs) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { db, listener })
    }

    /// The bound address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop until the listener fails.
    pub async fn serve(self) -> io::Result<()> {
        info!("Nesoi server listening on {}", self.local_addr()?);
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    debug!("Accepted connection from {}", peer);
                    let db = Arc::clone(&self.db);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(db, stream, peer).await {
                            warn!("Connection {} error: {}", peer, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }
}

async fn handle_connection(db: Arc<Database>, stream: TcpStream, peer: SocketAddr) -> io::Result<()> {
    let (reader, mut writer) = stream.into_split();

    let (id, mut session) = match db.open_session(Some(peer.to_string())) {
        Ok(opened) => opened,
        Err(e) => {
            writer.write_all(error_line(&e).as_bytes()).await?;
            return Ok(());
        }
    };

    let mut lines = BufReader::new(reader).lines();
    let result = async {
        while let Some(line) = lines.next_line().await? {
            let sql = line.trim();
            if sql.is_empty() {
                continue;
            }
            if sql.eq_ignore_ascii_case("quit") || sql.eq_ignore_ascii_case("exit") {
                break;
            }
            let reply = respond(&mut session, sql);
            writer.write_all(reply.as_bytes()).await?;
            writer.flush().await?;
        }
        Ok::<_, io::Error>(())
    }
    .await;

    db.close_session(id);
    result
}

/// Runs one request line and renders the reply.
pub fn respond(session: &mut Session, sql: &str) -> String {
    let batch = session.run_batch(sql);
    let mut reply = String::new();
    for outcome in batch.completed {
        match outcome {
            StatementOutcome::Rows(rows) => {
                reply.push_str(&rows.to_string());
                reply.push_str(&format!("OK {}\n", rows.len()));
            }
            StatementOutcome::Done { affected_rows, .. } => {
                reply.push_str(&format!("OK {}\n", affected_rows));
            }
        }
    }
    if let Some(e) = batch.error {
        reply.push_str(&error_line(&DatabaseError::from(e)));
    }
    reply
}

fn error_line(e: &DatabaseError) -> String {
    // Replies are line framed.
    let message = e.to_string().replace('\n', " ");
    format!("ERR {} {}\n", e.code(), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseConfig;
    use nesoi_kv::MemoryDriver;
    use tokio::io::AsyncReadExt;

    #[test]
    fn test_respond_formats() {
        let db = Database::open_memory().unwrap();
        let (_, mut session) = db.open_session(None).unwrap();

        assert_eq!(
            respond(&mut session, "CREATE TABLE t (id INT PRIMARY KEY, name STRING)"),
            "OK 0\n"
        );
        assert_eq!(
            respond(&mut session, "INSERT INTO t VALUES (1, 'a'), (2, 'b')"),
            "OK 2\n"
        );
        assert_eq!(
            respond(&mut session, "SELECT id, name FROM t WHERE id = 2"),
            "id\tname\n2\tb\nOK 1\n"
        );
        assert!(respond(&mut session, "INSERT INTO t VALUES (1, 'z')").starts_with("ERR 1062 "));
    }

    #[test]
    fn test_respond_keeps_replies_before_error() {
        let db = Database::open_memory().unwrap();
        let (_, mut session) = db.open_session(None).unwrap();
        respond(&mut session, "CREATE TABLE t (id INT PRIMARY KEY, name STRING)");

        let reply = respond(
            &mut session,
            "INSERT INTO t VALUES (3, 'c'); SELECT id FROM t WHERE id = 3; INSERT INTO t VALUES (3, 'z'); INSERT INTO t VALUES (4, 'd')",
        );
        let lines: Vec<&str> = reply.lines().collect();
        assert_eq!(&lines[..4], &["OK 1", "id", "3", "OK 1"]);
        assert_eq!(lines.len(), 5);
        assert!(lines[4].starts_with("ERR 1062 "));

        assert_eq!(respond(&mut session, "SELECT id FROM t WHERE id = 4"), "id\nOK 0\n");
    }

    #[test]
    fn test_accept_backoff_is_positive() {
        assert!(ACCEPT_BACKOFF > Duration::ZERO);
    }

    #[tokio::test]
    async fn test_serves_over_tcp() {
        let db = Arc::new(Database::open_memory().unwrap());
        let server = Server::bind(db.clone(), "127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        let handle = tokio::spawn(server.serve());

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"SELECT @@version_comment\nquit\n")
            .await
            .unwrap();
        let mut reply = String::new();
        stream.read_to_string(&mut reply).await.unwrap();
        assert_eq!(
            reply,
            "@@version_comment\nMySQL Community Server (GPL)\nOK 1\n"
        );

        handle.abort();
    }

    #[tokio::test]
    async fn test_rejects_over_limit() {
        let config = DatabaseConfig {
            max_connections: 0,
            ..DatabaseConfig::default()
        };
        let db = Arc::new(Database::open(Arc::new(MemoryDriver::new()), config).unwrap());
        let server = Server::bind(db, "127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        let handle = tokio::spawn(server.serve());

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let mut reply = String::new();
        stream.read_to_string(&mut reply).await.unwrap();
        assert!(reply.starts_with("ERR 1040 "));

        handle.abort();
    }
}
