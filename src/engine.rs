//! The opaque native-engine capability.
//!
//! A driver brings the whole stack to life by implementing these three
//! traits. The generic [`Connection`](crate::Connection) /
//! [`Statement`](crate::Statement) / [`Cursor`](crate::Cursor) layer owns
//! the buffer-sets and the negotiation algorithm; the engine only moves
//! bytes between its wire and the slots it is handed.

use crate::buffers::{BindSlot, ResultBuffers};
use crate::error::{DbError, DbResult};
use crate::props::Props;
use crate::value::NativeType;

/// Result column metadata, fixed at query time.
#[derive(Debug, Clone)]
pub struct ColumnMeta {
    pub name: String,
    pub ty: NativeType,
}

/// Outcome of a bulk row fetch.
///
/// `Truncated` is non-fatal: the row counts as fetched and the per-column
/// truncation flags in the buffer-set say which columns need the targeted
/// refetch. `Done` and `Err` both end iteration; only `Err` carries a
/// diagnostic for the statement's error surface.
#[derive(Debug)]
pub enum FetchOutcome {
    Row,
    Truncated,
    Done,
    Err(DbError),
}

/// An open native connection.
pub trait EngineConnection {
    /// Lightweight liveness probe; never reconnects.
    fn ping(&self) -> bool;

    /// Run a non-parameterized statement (DDL, one-offs).
    fn exec(&self, sql: &str) -> DbResult<()>;

    /// Engine-native transaction primitives. Ordering is the caller's
    /// problem, guarded by [`Transaction`](crate::Transaction).
    fn begin(&self) -> DbResult<()>;
    fn commit(&self) -> DbResult<()>;
    fn rollback(&self) -> DbResult<()>;

    /// Compile `sql` into a native prepared statement.
    fn prepare<'c>(&'c self, sql: &str) -> DbResult<Box<dyn EngineStatement<'c> + 'c>>;

    /// Re-establish the native handle from freshly re-read properties.
    fn reconnect(&mut self, props: &Props) -> DbResult<()>;

    /// Display identifier (`scheme://user@host/database`), diagnostics only.
    fn uri(&self) -> &str;
}

/// A native prepared statement.
pub trait EngineStatement<'c> {
    /// Parameter count reported at preparation; fixes the statement's
    /// buffer-set length.
    fn param_count(&self) -> usize;

    /// Rebind the parameter buffer-set and run without producing rows.
    fn execute(&mut self, params: &[BindSlot]) -> DbResult<()>;

    /// Rebind parameters, request a server-side cursor, execute, and return
    /// the result metadata together with the native cursor.
    fn open_cursor<'s>(
        &'s mut self,
        params: &[BindSlot],
    ) -> DbResult<(Vec<ColumnMeta>, Box<dyn EngineCursor + 's>)>;
}

/// A native forward-only result cursor.
pub trait EngineCursor {
    /// Fetch the next row into the buffer-set: write each column's bytes up
    /// to the slot's current capacity and record length/null/truncation via
    /// [`ResultBuffers::store`].
    fn fetch(&mut self, out: &mut ResultBuffers) -> FetchOutcome;

    /// Targeted single-column fetch of the current row, encoded as `ty`,
    /// into a caller-sized buffer. This is the second leg of the
    /// probe-then-refetch scheme and the uniform path for scalar reads.
    fn refetch(&mut self, column: usize, ty: NativeType, out: &mut [u8]) -> DbResult<()>;
}
