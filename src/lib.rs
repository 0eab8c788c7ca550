//! Engine-agnostic database access layer.
//!
//! A small set of polymorphic abstractions ([`Connection`], [`Statement`],
//! [`Cursor`], [`Transaction`]) plus a pluggable [`DriverRegistry`], so
//! application code can issue SQL without depending on any engine's native
//! API. Drivers implement the [`engine`] capability traits; the generic
//! layer owns the parameter/result buffer-sets and the probe-then-refetch
//! negotiation that sizes variable-width result columns lazily.
//!
//! ```no_run
//! use std::path::Path;
//! use sql_access::{DriverRegistry, Environment, RowMapper, builtin_driver_libs};
//!
//! #[derive(Default)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! let mut registry = DriverRegistry::new();
//! let env = Environment::activate(&mut registry, &builtin_driver_libs());
//! assert!(!env.failed());
//!
//! let conn = registry.open(Path::new("db.cfg")).expect("cannot open database");
//! let mut stmt = conn.prepare("SELECT id, name FROM users WHERE id > ?").unwrap();
//! stmt.bind_long(0, 100);
//!
//! let mapper = RowMapper::<User>::new()
//!     .long(0, |u, v| u.id = v)
//!     .text(1, |u, v| u.name = v);
//!
//! let mut cursor = stmt.query().unwrap();
//! let mut users = Vec::new();
//! assert!(mapper.map_all(&mut cursor, &mut users));
//! ```

pub mod buffers;
pub mod connection;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod mapper;
pub mod mock;
pub mod props;
pub mod registry;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod statement;
pub mod transaction;
pub mod value;

pub use buffers::{BindSlot, ParamBuffers, ResultBuffers};
pub use connection::Connection;
pub use cursor::Cursor;
pub use engine::{ColumnMeta, EngineConnection, EngineCursor, EngineStatement, FetchOutcome};
pub use error::{DbError, DbResult};
pub use mapper::RowMapper;
pub use props::{Props, get_prop, read_props, required_prop};
pub use registry::{Driver, DriverLib, DriverRegistry, Environment, builtin_driver_libs};
pub use statement::Statement;
pub use transaction::{Transaction, TxState};
pub use value::{NativeType, Value};
