//! In-memory engine for exercising the binding protocol.
//!
//! The mock engine is the reference implementation of the engine
//! capability: scripted result sets, recorded statements, failure
//! injection, and a targeted-refetch counter so tests can pin down exactly
//! when the negotiation algorithm goes back to the engine.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::buffers::{BindSlot, ResultBuffers, decode_slot};
use crate::connection::Connection;
use crate::engine::{ColumnMeta, EngineConnection, EngineCursor, EngineStatement, FetchOutcome};
use crate::error::{DbError, DbResult};
use crate::props::{Props, required_prop};
use crate::registry::{Driver, DriverRegistry};
use crate::value::{NativeType, Value, encode_as};

/// A statement the engine saw, with its parameters decoded back into typed
/// values.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// One scripted result set.
#[derive(Debug, Clone, Default)]
pub struct MockResult {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<Value>>,
}

/// Builder for scripted result sets.
#[derive(Default)]
pub struct MockResultBuilder {
    result: MockResult,
}

impl MockResultBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn column(mut self, name: &str, ty: NativeType) -> Self {
        self.result.columns.push(ColumnMeta {
            name: name.to_string(),
            ty,
        });
        self
    }

    #[must_use]
    pub fn row(mut self, values: Vec<Value>) -> Self {
        self.result.rows.push(values);
        self
    }

    #[must_use]
    pub fn build(self) -> MockResult {
        self.result
    }
}

#[derive(Default)]
struct MockState {
    results: VecDeque<MockResult>,
    statements: Vec<RecordedStatement>,
    exec_log: Vec<String>,
    refetches: usize,
    fail_next: bool,
    dead: bool,
}

/// Shared scriptable engine state. Hand the same server to a [`MockDriver`]
/// and to the test that wants to script responses and inspect traffic.
#[derive(Default)]
pub struct MockServer {
    state: Mutex<MockState>,
}

impl MockServer {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a result set for the next `query()`, FIFO order.
    pub fn push_result(&self, result: MockResult) {
        self.state.lock().unwrap().results.push_back(result);
    }

    /// Make the next fallible engine operation fail.
    pub fn fail_next(&self) {
        self.state.lock().unwrap().fail_next = true;
    }

    /// Toggle what the liveness probe reports.
    pub fn set_dead(&self, dead: bool) {
        self.state.lock().unwrap().dead = dead;
    }

    /// Every prepared statement the engine executed or queried.
    #[must_use]
    pub fn statements(&self) -> Vec<RecordedStatement> {
        self.state.lock().unwrap().statements.clone()
    }

    /// Every direct SQL the engine ran, including transaction control.
    #[must_use]
    pub fn exec_log(&self) -> Vec<String> {
        self.state.lock().unwrap().exec_log.clone()
    }

    /// Total targeted single-column refetches issued so far.
    #[must_use]
    pub fn refetches(&self) -> usize {
        self.state.lock().unwrap().refetches
    }

    fn take_failure(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        std::mem::take(&mut state.fail_next)
    }

    fn native_failure(&self, what: &str) -> DbError {
        DbError::Native {
            code: 2013,
            message: format!("mock engine: injected {what} failure"),
        }
    }
}

/// Driver for the in-memory engine. Requires the four standard keys
/// (`user`, `password`, `server`, `database`), all non-empty; `server` may
/// carry a `host:port` suffix whose port must parse.
pub struct MockDriver {
    server: Arc<MockServer>,
}

impl MockDriver {
    #[must_use]
    pub fn new(server: Arc<MockServer>) -> Self {
        MockDriver { server }
    }

    #[must_use]
    pub fn server(&self) -> Arc<MockServer> {
        Arc::clone(&self.server)
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        MockDriver::new(MockServer::new())
    }
}

fn mock_uri(props: &Props) -> Option<String> {
    let user = required_prop(props, "user")?;
    required_prop(props, "password")?;
    let host = required_prop(props, "server")?;
    let database = required_prop(props, "database")?;
    if let Some((_, port)) = host.rsplit_once(':')
        && port.parse::<u16>().is_err()
    {
        warn!(server = host, "invalid port in server address");
        return None;
    }
    Some(format!("mock://{user}@{host}/{database}"))
}

impl Driver for MockDriver {
    fn open(&self, source: &Path, props: &Props) -> Option<Connection> {
        let Some(uri) = mock_uri(props) else {
            warn!("mock driver: invalid configuration");
            return None;
        };
        if self.server.take_failure() {
            warn!(uri, "mock driver: cannot connect");
            return None;
        }
        let engine = MockConnection {
            server: Arc::clone(&self.server),
            uri,
        };
        Some(Connection::from_engine(Box::new(engine), source))
    }
}

struct MockConnection {
    server: Arc<MockServer>,
    uri: String,
}

impl MockConnection {
    fn run(&self, sql: &str) -> DbResult<()> {
        if self.server.take_failure() {
            return Err(self.server.native_failure("exec"));
        }
        self.server
            .state
            .lock()
            .unwrap()
            .exec_log
            .push(sql.to_string());
        Ok(())
    }
}

impl EngineConnection for MockConnection {
    fn ping(&self) -> bool {
        !self.server.state.lock().unwrap().dead
    }

    fn exec(&self, sql: &str) -> DbResult<()> {
        self.run(sql)
    }

    fn begin(&self) -> DbResult<()> {
        self.run("START TRANSACTION")
    }

    fn commit(&self) -> DbResult<()> {
        self.run("COMMIT")
    }

    fn rollback(&self) -> DbResult<()> {
        self.run("ROLLBACK")
    }

    fn prepare<'c>(&'c self, sql: &str) -> DbResult<Box<dyn EngineStatement<'c> + 'c>> {
        if self.server.take_failure() {
            return Err(DbError::Prepare(format!("mock engine rejects `{sql}`")));
        }
        Ok(Box::new(MockStatement {
            server: Arc::clone(&self.server),
            sql: sql.to_string(),
            param_count: sql.bytes().filter(|b| *b == b'?').count(),
        }))
    }

    fn reconnect(&mut self, props: &Props) -> DbResult<()> {
        let uri = mock_uri(props)
            .ok_or_else(|| DbError::Config("mock driver: invalid configuration".into()))?;
        if self.server.take_failure() {
            return Err(self.server.native_failure("reconnect"));
        }
        self.uri = uri;
        Ok(())
    }

    fn uri(&self) -> &str {
        &self.uri
    }
}

struct MockStatement {
    server: Arc<MockServer>,
    sql: String,
    param_count: usize,
}

impl MockStatement {
    fn record(&self, params: &[BindSlot]) {
        self.server
            .state
            .lock()
            .unwrap()
            .statements
            .push(RecordedStatement {
                sql: self.sql.clone(),
                params: params.iter().map(decode_slot).collect(),
            });
    }
}

impl<'c> EngineStatement<'c> for MockStatement {
    fn param_count(&self) -> usize {
        self.param_count
    }

    fn execute(&mut self, params: &[BindSlot]) -> DbResult<()> {
        if self.server.take_failure() {
            return Err(self.server.native_failure("execute"));
        }
        self.record(params);
        Ok(())
    }

    fn open_cursor<'s>(
        &'s mut self,
        params: &[BindSlot],
    ) -> DbResult<(Vec<ColumnMeta>, Box<dyn EngineCursor + 's>)> {
        if self.server.take_failure() {
            return Err(self.server.native_failure("query"));
        }
        self.record(params);
        let result = self
            .server
            .state
            .lock()
            .unwrap()
            .results
            .pop_front()
            .unwrap_or_default();
        let cursor = MockCursor {
            server: Arc::clone(&self.server),
            rows: result.rows,
            next_row: 0,
            current: None,
        };
        Ok((result.columns, Box::new(cursor)))
    }
}

struct MockCursor {
    server: Arc<MockServer>,
    rows: Vec<Vec<Value>>,
    next_row: usize,
    current: Option<Vec<Value>>,
}

impl EngineCursor for MockCursor {
    fn fetch(&mut self, out: &mut ResultBuffers) -> FetchOutcome {
        if self.server.take_failure() {
            return FetchOutcome::Err(self.server.native_failure("fetch"));
        }
        let Some(row) = self.rows.get(self.next_row).cloned() else {
            return FetchOutcome::Done;
        };
        self.next_row += 1;

        let any_truncated = match out.store_row(&row) {
            Ok(truncated) => truncated,
            Err(err) => return FetchOutcome::Err(err),
        };
        self.current = Some(row);
        if any_truncated {
            FetchOutcome::Truncated
        } else {
            FetchOutcome::Row
        }
    }

    fn refetch(&mut self, column: usize, ty: NativeType, out: &mut [u8]) -> DbResult<()> {
        self.server.state.lock().unwrap().refetches += 1;
        let row = self
            .current
            .as_ref()
            .ok_or_else(|| DbError::Execution("refetch before any row was fetched".into()))?;
        let value = row
            .get(column)
            .ok_or_else(|| DbError::Execution(format!("refetch column {column} out of range")))?;
        let bytes = encode_as(value, ty)?;
        let n = out.len().min(bytes.len());
        out[..n].copy_from_slice(&bytes[..n]);
        Ok(())
    }
}

/// Register the mock driver (fresh private server) under `mock`.
pub fn startup_driver(registry: &mut DriverRegistry) -> bool {
    registry.register("mock", Arc::new(MockDriver::default()));
    true
}

pub fn shutdown_driver() {}
