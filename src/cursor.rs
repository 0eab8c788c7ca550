//! Forward-only result cursors and the buffer-negotiation algorithm.
//!
//! Fixed-width columns get exact buffers at query time. Variable-width
//! columns start with a zero-size probe: the first bulk fetch exposes the
//! true length through the truncation indicator, and the first read of such
//! a column resizes its slot and issues a single-column targeted refetch.
//! Only columns that are both variable-width and actually read ever pay the
//! second round trip.

use std::cell::RefCell;

use chrono::NaiveDateTime;
use tracing::warn;

use crate::buffers::ResultBuffers;
use crate::engine::{ColumnMeta, EngineCursor, FetchOutcome};
use crate::error::DbError;
use crate::value::{NativeType, WIRE_TIME_LEN, decode_timestamp};

/// A forward-only iterator over one executed statement's result rows.
///
/// Hard fetch errors are recorded on the owning statement's error surface;
/// `next()` alone does not distinguish them from the end of the result set.
pub struct Cursor<'s> {
    native: Box<dyn EngineCursor + 's>,
    meta: Vec<ColumnMeta>,
    bufs: ResultBuffers,
    errors: &'s RefCell<Option<DbError>>,
}

impl<'s> Cursor<'s> {
    pub(crate) fn new(
        native: Box<dyn EngineCursor + 's>,
        meta: Vec<ColumnMeta>,
        errors: &'s RefCell<Option<DbError>>,
    ) -> Self {
        let bufs = ResultBuffers::for_columns(&meta);
        Cursor {
            native,
            meta,
            bufs,
            errors,
        }
    }

    fn fail<T>(&self, err: DbError) -> Option<T> {
        *self.errors.borrow_mut() = Some(err);
        None
    }

    fn check(&self, column: usize, what: &str) -> bool {
        if column >= self.meta.len() {
            warn!(count = self.meta.len(), column, what, "column out of bounds");
            return false;
        }
        true
    }

    /// Advance to the next row. Truncation is a row-level informational
    /// condition, not a failure: the row counts as fetched and truncated
    /// columns are resolved lazily when read.
    pub fn next(&mut self) -> bool {
        match self.native.fetch(&mut self.bufs) {
            FetchOutcome::Row | FetchOutcome::Truncated => true,
            FetchOutcome::Done => false,
            FetchOutcome::Err(err) => {
                *self.errors.borrow_mut() = Some(err);
                false
            }
        }
    }

    /// Column count, fixed at query time.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.meta.len()
    }

    /// Column name from the result metadata.
    #[must_use]
    pub fn column_name(&self, column: usize) -> Option<&str> {
        self.meta.get(column).map(|col| col.name.as_str())
    }

    /// Per-row null indicator populated by the bulk fetch. Out-of-range
    /// columns read as null.
    #[must_use]
    pub fn is_null(&self, column: usize) -> bool {
        if !self.check(column, "is_null") {
            return true;
        }
        self.bufs.is_null(column)
    }

    /// Targeted scalar fetch into a stack-local buffer. Used uniformly for
    /// all scalar reads: it sidesteps type mismatches between the generic
    /// bulk bind and the precise requested type.
    fn scalar<const N: usize>(&mut self, column: usize, ty: NativeType, what: &str) -> Option<[u8; N]> {
        if !self.check(column, what) || self.bufs.is_null(column) {
            return None;
        }
        let mut raw = [0u8; N];
        match self.native.refetch(column, ty, &mut raw) {
            Ok(()) => Some(raw),
            Err(err) => self.fail(err),
        }
    }

    #[must_use]
    pub fn get_int(&mut self, column: usize) -> Option<i32> {
        self.scalar::<4>(column, NativeType::Long, "get_int")
            .map(i32::from_le_bytes)
    }

    #[must_use]
    pub fn get_long(&mut self, column: usize) -> Option<i64> {
        self.scalar::<8>(column, NativeType::LongLong, "get_long")
            .map(i64::from_le_bytes)
    }

    #[must_use]
    pub fn get_double(&mut self, column: usize) -> Option<f64> {
        self.scalar::<8>(column, NativeType::Double, "get_double")
            .map(f64::from_le_bytes)
    }

    #[must_use]
    pub fn get_timestamp(&mut self, column: usize) -> Option<NaiveDateTime> {
        let raw = self.scalar::<WIRE_TIME_LEN>(column, NativeType::Timestamp, "get_timestamp")?;
        decode_timestamp(&raw)
    }

    /// Resolve a variable-width column: resize-and-refetch if the probe was
    /// too small, otherwise serve straight from the negotiated buffer.
    fn resolve(&mut self, column: usize, ty: NativeType, what: &str) -> Option<usize> {
        if !self.check(column, what) || self.bufs.is_null(column) {
            return None;
        }
        let len = self.bufs.length(column);
        if self.bufs.needs_refetch(column) {
            // One byte of slack for a terminator keeps a same-length value
            // on the next row from looking truncated.
            let mut fresh = vec![0u8; len + 1];
            if let Err(err) = self.native.refetch(column, ty, &mut fresh[..len]) {
                return self.fail(err);
            }
            self.bufs.install(column, ty, fresh);
        }
        Some(len)
    }

    /// Text view of the column, sized to the engine-reported length.
    /// Reading the same column again on the same row reuses the resized
    /// buffer without another engine fetch.
    #[must_use]
    pub fn get_text(&mut self, column: usize) -> Option<&str> {
        let len = self.resolve(column, NativeType::Text, "get_text")?;
        let bytes = &self.bufs.bytes(column)?[..len];
        match std::str::from_utf8(bytes) {
            Ok(text) => Some(text),
            Err(_) => {
                *self.errors.borrow_mut() = Some(DbError::Execution(format!(
                    "column {column} is not valid UTF-8"
                )));
                None
            }
        }
    }

    /// Binary view of the column, sized to the engine-reported length.
    #[must_use]
    pub fn get_blob(&mut self, column: usize) -> Option<&[u8]> {
        let len = self.resolve(column, NativeType::Blob, "get_blob")?;
        Some(&self.bufs.bytes(column)?[..len])
    }

    /// Engine-reported length of the column in the current row; 0 when out
    /// of range.
    #[must_use]
    pub fn blob_size(&self, column: usize) -> usize {
        if !self.check(column, "blob_size") {
            return 0;
        }
        self.bufs.length(column)
    }
}
