//! Declarative column-to-field row mapping.
//!
//! A mapper is an ordered list of (column index, typed accessor, setter)
//! bindings built once per record shape by the registration methods below.
//! No reflection: each binding wraps one cursor accessor and one closure
//! writing into the target field.

use chrono::NaiveDateTime;

use crate::cursor::Cursor;

type Binding<T> = Box<dyn Fn(&mut Cursor<'_>, &mut T) -> bool>;

/// Declarative row-to-record mapping for a record shape `T`.
///
/// Stateless beyond its binding list; reusable across any number of cursors
/// of matching shape. Numeric and timestamp bindings write their type's
/// zero sentinel on SQL NULL; [`text`](RowMapper::text) treats NULL as a
/// mapping failure (use [`text_opt`](RowMapper::text_opt) for nullable
/// fields). Out-of-range columns always fail.
pub struct RowMapper<T> {
    bindings: Vec<Binding<T>>,
}

impl<T> RowMapper<T> {
    #[must_use]
    pub fn new() -> Self {
        RowMapper {
            bindings: Vec::new(),
        }
    }

    fn push(mut self, binding: Binding<T>) -> Self {
        self.bindings.push(binding);
        self
    }

    #[must_use]
    pub fn int(self, column: usize, set: impl Fn(&mut T, i32) + 'static) -> Self {
        self.push(Box::new(move |cursor, record| {
            if column >= cursor.column_count() {
                return false;
            }
            if cursor.is_null(column) {
                set(record, 0);
                return true;
            }
            match cursor.get_int(column) {
                Some(value) => {
                    set(record, value);
                    true
                }
                None => false,
            }
        }))
    }

    #[must_use]
    pub fn long(self, column: usize, set: impl Fn(&mut T, i64) + 'static) -> Self {
        self.push(Box::new(move |cursor, record| {
            if column >= cursor.column_count() {
                return false;
            }
            if cursor.is_null(column) {
                set(record, 0);
                return true;
            }
            match cursor.get_long(column) {
                Some(value) => {
                    set(record, value);
                    true
                }
                None => false,
            }
        }))
    }

    #[must_use]
    pub fn double(self, column: usize, set: impl Fn(&mut T, f64) + 'static) -> Self {
        self.push(Box::new(move |cursor, record| {
            if column >= cursor.column_count() {
                return false;
            }
            if cursor.is_null(column) {
                set(record, 0.0);
                return true;
            }
            match cursor.get_double(column) {
                Some(value) => {
                    set(record, value);
                    true
                }
                None => false,
            }
        }))
    }

    /// Timestamp field; SQL NULL writes the epoch sentinel.
    #[must_use]
    pub fn timestamp(self, column: usize, set: impl Fn(&mut T, NaiveDateTime) + 'static) -> Self {
        self.push(Box::new(move |cursor, record| {
            if column >= cursor.column_count() {
                return false;
            }
            if cursor.is_null(column) {
                set(record, NaiveDateTime::default());
                return true;
            }
            match cursor.get_timestamp(column) {
                Some(value) => {
                    set(record, value);
                    true
                }
                None => false,
            }
        }))
    }

    /// Non-nullable text field: SQL NULL fails the mapping.
    #[must_use]
    pub fn text(self, column: usize, set: impl Fn(&mut T, String) + 'static) -> Self {
        self.push(Box::new(move |cursor, record| {
            match cursor.get_text(column) {
                Some(value) => {
                    set(record, value.to_string());
                    true
                }
                None => false,
            }
        }))
    }

    /// Nullable text field: SQL NULL maps to `None`.
    #[must_use]
    pub fn text_opt(self, column: usize, set: impl Fn(&mut T, Option<String>) + 'static) -> Self {
        self.push(Box::new(move |cursor, record| {
            if column >= cursor.column_count() {
                return false;
            }
            if cursor.is_null(column) {
                set(record, None);
                return true;
            }
            match cursor.get_text(column) {
                Some(value) => {
                    set(record, Some(value.to_string()));
                    true
                }
                None => false,
            }
        }))
    }

    /// Binary field; SQL NULL writes an empty buffer.
    #[must_use]
    pub fn blob(self, column: usize, set: impl Fn(&mut T, Vec<u8>) + 'static) -> Self {
        self.push(Box::new(move |cursor, record| {
            if column >= cursor.column_count() {
                return false;
            }
            if cursor.is_null(column) {
                set(record, Vec::new());
                return true;
            }
            match cursor.get_blob(column) {
                Some(value) => {
                    let owned = value.to_vec();
                    set(record, owned);
                    true
                }
                None => false,
            }
        }))
    }

    /// Apply every binding in order to the current row. Stops at the first
    /// failing binding, leaving `record` partially populated; discard it on
    /// failure.
    pub fn map_one(&self, cursor: &mut Cursor<'_>, record: &mut T) -> bool {
        for binding in &self.bindings {
            if !binding(cursor, record) {
                return false;
            }
        }
        true
    }

    /// Fetch-and-map loop: appends one record per row in fetch order. Stops
    /// at the first row that fails to map and returns `false`; records
    /// already appended stay in `out`.
    pub fn map_all(&self, cursor: &mut Cursor<'_>, out: &mut Vec<T>) -> bool
    where
        T: Default,
    {
        while cursor.next() {
            let mut record = T::default();
            if !self.map_one(cursor, &mut record) {
                return false;
            }
            out.push(record);
        }
        true
    }
}

impl<T> Default for RowMapper<T> {
    fn default() -> Self {
        Self::new()
    }
}
