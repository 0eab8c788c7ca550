//! An open handle to a database.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::engine::EngineConnection;
use crate::error::DbError;
use crate::props::read_props;
use crate::statement::Statement;

/// An open connection to one database, engine held behind the
/// [`EngineConnection`] capability.
///
/// The connection and everything it produces form a single-threaded-use
/// chain: statements borrow the connection, cursors borrow their statement,
/// and all buffer-sets are mutated in place.
///
/// Failed operations return `false`/`None`; the most recent failure stays
/// readable through [`error_message`](Connection::error_message) /
/// [`error_code`](Connection::error_code) until the next operation
/// overwrites it.
pub struct Connection {
    engine: Box<dyn EngineConnection>,
    source: PathBuf,
    connected: bool,
    last_error: RefCell<Option<DbError>>,
}

impl Connection {
    /// Wrap a freshly opened engine handle. Drivers call this at the end of
    /// a successful `open`; `source` is kept for [`reconnect`](Self::reconnect).
    #[must_use]
    pub fn from_engine(engine: Box<dyn EngineConnection>, source: &Path) -> Self {
        debug!(uri = engine.uri(), "connection opened");
        Connection {
            engine,
            source: source.to_path_buf(),
            connected: true,
            last_error: RefCell::new(None),
        }
    }

    fn fail(&self, err: DbError) -> bool {
        *self.last_error.borrow_mut() = Some(err);
        false
    }

    /// Engine-native ping. Does not attempt reconnection.
    #[must_use]
    pub fn is_still_alive(&self) -> bool {
        self.connected && self.engine.ping()
    }

    /// Display identifier for diagnostics; never used for reconnection.
    #[must_use]
    pub fn uri(&self) -> &str {
        self.engine.uri()
    }

    pub fn begin_transaction(&self) -> bool {
        match self.engine.begin() {
            Ok(()) => true,
            Err(err) => self.fail(err),
        }
    }

    pub fn commit_transaction(&self) -> bool {
        match self.engine.commit() {
            Ok(()) => true,
            Err(err) => self.fail(err),
        }
    }

    pub fn rollback_transaction(&self) -> bool {
        match self.engine.rollback() {
            Ok(()) => true,
            Err(err) => self.fail(err),
        }
    }

    /// Run a non-parameterized statement directly.
    pub fn exec(&self, sql: &str) -> bool {
        match self.engine.exec(sql) {
            Ok(()) => true,
            Err(err) => self.fail(err),
        }
    }

    /// Compile `sql` into a reusable parameterized statement. The
    /// statement's parameter buffer-set is sized to the count the engine
    /// reports.
    #[must_use]
    pub fn prepare(&self, sql: &str) -> Option<Statement<'_>> {
        match self.engine.prepare(sql) {
            Ok(native) => Some(Statement::new(native)),
            Err(err) => {
                self.fail(err);
                None
            }
        }
    }

    /// Convenience pagination: appends ` LIMIT low, hi` before preparing.
    /// The caller is responsible for `sql` not already carrying a
    /// conflicting limit clause.
    #[must_use]
    pub fn prepare_with_limit(&self, sql: &str, low: i64, hi: i64) -> Option<Statement<'_>> {
        self.prepare(&format!("{sql} LIMIT {low}, {hi}"))
    }

    /// Re-read the original config source and re-establish the native
    /// handle in place. Taking `&mut self` retires every outstanding
    /// statement before the handle can be replaced.
    pub fn reconnect(&mut self) -> bool {
        let props = match read_props(&self.source) {
            Ok(props) => props,
            Err(err) => {
                warn!(source = %self.source.display(), "reconnect: cannot re-read config");
                self.connected = false;
                return self.fail(err);
            }
        };
        match self.engine.reconnect(&props) {
            Ok(()) => {
                debug!(uri = self.engine.uri(), "reconnected");
                self.connected = true;
                true
            }
            Err(err) => {
                self.connected = false;
                self.fail(err)
            }
        }
    }

    /// Message of the most recent failed operation, empty if none.
    #[must_use]
    pub fn error_message(&self) -> String {
        self.last_error
            .borrow()
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    /// Code of the most recent failed operation, 0 if none.
    #[must_use]
    pub fn error_code(&self) -> i64 {
        self.last_error.borrow().as_ref().map_or(0, DbError::code)
    }
}
