//! SQLite driver (rusqlite).
//!
//! Required property: `database`, the database file path (or `:memory:`),
//! non-empty. Display URI is `sqlite://<path>`.

mod engine;

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::connection::Connection;
use crate::engine::{EngineConnection, EngineStatement};
use crate::error::{DbError, DbResult};
use crate::props::{Props, required_prop};
use crate::registry::{Driver, DriverRegistry};

use engine::SqliteStatement;

pub struct SqliteDriver;

impl Driver for SqliteDriver {
    fn open(&self, source: &Path, props: &Props) -> Option<Connection> {
        let Some(database) = required_prop(props, "database") else {
            warn!("sqlite driver: invalid configuration (missing `database')");
            return None;
        };
        match SqliteConnection::connect(database) {
            Ok(engine) => {
                debug!(database, "sqlite: connected");
                Some(Connection::from_engine(Box::new(engine), source))
            }
            Err(err) => {
                warn!(database, %err, "sqlite: cannot connect");
                None
            }
        }
    }
}

struct SqliteConnection {
    conn: rusqlite::Connection,
    uri: String,
}

impl SqliteConnection {
    fn connect(database: &str) -> DbResult<Self> {
        let conn = rusqlite::Connection::open(database)?;
        Ok(SqliteConnection {
            conn,
            uri: format!("sqlite://{database}"),
        })
    }
}

impl EngineConnection for SqliteConnection {
    fn ping(&self) -> bool {
        self.conn.query_row("SELECT 1", [], |_| Ok(())).is_ok()
    }

    fn exec(&self, sql: &str) -> DbResult<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn begin(&self) -> DbResult<()> {
        self.exec("BEGIN")
    }

    fn commit(&self) -> DbResult<()> {
        self.exec("COMMIT")
    }

    fn rollback(&self) -> DbResult<()> {
        self.exec("ROLLBACK")
    }

    fn prepare<'c>(&'c self, sql: &str) -> DbResult<Box<dyn EngineStatement<'c> + 'c>> {
        let stmt = self.conn.prepare(sql)?;
        Ok(Box::new(SqliteStatement::new(stmt)))
    }

    fn reconnect(&mut self, props: &Props) -> DbResult<()> {
        let database = required_prop(props, "database").ok_or_else(|| {
            DbError::Config("sqlite driver: invalid configuration (missing `database')".into())
        })?;
        let fresh = SqliteConnection::connect(database)?;
        *self = fresh;
        Ok(())
    }

    fn uri(&self) -> &str {
        &self.uri
    }
}

/// Register the sqlite driver under `sqlite`.
pub fn startup_driver(registry: &mut DriverRegistry) -> bool {
    registry.register("sqlite", Arc::new(SqliteDriver));
    true
}

pub fn shutdown_driver() {}
