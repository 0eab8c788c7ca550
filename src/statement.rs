//! Prepared, parameterized statements.

use std::cell::RefCell;

use chrono::NaiveDateTime;

use crate::buffers::ParamBuffers;
use crate::cursor::Cursor;
use crate::engine::EngineStatement;
use crate::error::DbError;
use crate::value::{NativeType, Value, encode_timestamp};

/// A prepared statement bound to one connection.
///
/// Binding is positional (0-based) and strongly typed. Every bind
/// reallocates its slot's buffer to exactly fit the encoded value;
/// out-of-range binds fail without corrupting other slots.
pub struct Statement<'c> {
    native: Box<dyn EngineStatement<'c> + 'c>,
    params: ParamBuffers,
    last_error: RefCell<Option<DbError>>,
}

impl<'c> Statement<'c> {
    pub(crate) fn new(native: Box<dyn EngineStatement<'c> + 'c>) -> Self {
        let count = native.param_count();
        Statement {
            native,
            params: ParamBuffers::new(count),
            last_error: RefCell::new(None),
        }
    }

    #[must_use]
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub fn bind_small(&mut self, index: usize, value: i16) -> bool {
        self.params
            .bind(index, NativeType::Short, value.to_le_bytes().to_vec())
    }

    pub fn bind_int(&mut self, index: usize, value: i32) -> bool {
        self.params
            .bind(index, NativeType::Long, value.to_le_bytes().to_vec())
    }

    pub fn bind_long(&mut self, index: usize, value: i64) -> bool {
        self.params
            .bind(index, NativeType::LongLong, value.to_le_bytes().to_vec())
    }

    pub fn bind_double(&mut self, index: usize, value: f64) -> bool {
        self.params
            .bind(index, NativeType::Double, value.to_le_bytes().to_vec())
    }

    pub fn bind_text(&mut self, index: usize, value: &str) -> bool {
        self.params
            .bind(index, NativeType::Text, value.as_bytes().to_vec())
    }

    pub fn bind_blob(&mut self, index: usize, value: &[u8]) -> bool {
        self.params.bind(index, NativeType::Blob, value.to_vec())
    }

    /// Bind a calendar timestamp. The value is decomposed into its UTC
    /// calendar fields; no timezone offset is applied.
    pub fn bind_time(&mut self, index: usize, value: &NaiveDateTime) -> bool {
        self.params
            .bind(index, NativeType::Timestamp, encode_timestamp(value).to_vec())
    }

    pub fn bind_null(&mut self, index: usize) -> bool {
        self.params.bind_null(index)
    }

    /// Dispatching bind over the [`Value`] enum.
    pub fn bind_value(&mut self, index: usize, value: &Value) -> bool {
        match value {
            Value::Small(v) => self.bind_small(index, *v),
            Value::Int(v) => self.bind_int(index, *v),
            Value::Long(v) => self.bind_long(index, *v),
            Value::Double(v) => self.bind_double(index, *v),
            Value::Text(v) => self.bind_text(index, v),
            Value::Blob(v) => self.bind_blob(index, v),
            Value::Timestamp(v) => self.bind_time(index, v),
            Value::Null => self.bind_null(index),
        }
    }

    /// Rebind the current buffer-set and run the statement. For
    /// INSERT/UPDATE/DELETE.
    pub fn execute(&mut self) -> bool {
        match self.native.execute(self.params.slots()) {
            Ok(()) => true,
            Err(err) => {
                *self.last_error.borrow_mut() = Some(err);
                false
            }
        }
    }

    /// Rebind parameters, request a server-side cursor, execute, and build
    /// a cursor over the result metadata. Any step failing yields `None`;
    /// no partial cursor is returned.
    #[must_use]
    pub fn query(&mut self) -> Option<Cursor<'_>> {
        let Statement {
            native,
            params,
            last_error,
        } = self;
        match native.open_cursor(params.slots()) {
            Ok((meta, cursor)) => Some(Cursor::new(cursor, meta, last_error)),
            Err(err) => {
                *last_error.borrow_mut() = Some(err);
                None
            }
        }
    }

    /// Message of the most recent failure on this statement or its cursor,
    /// empty if none.
    #[must_use]
    pub fn error_message(&self) -> String {
        self.last_error
            .borrow()
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    /// Code of the most recent failure, 0 if none.
    #[must_use]
    pub fn error_code(&self) -> i64 {
        self.last_error.borrow().as_ref().map_or(0, DbError::code)
    }
}
