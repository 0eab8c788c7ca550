//! Statement and cursor adapters over rusqlite.
//!
//! SQLite types values per cell, not per column, so the adapter keeps the
//! current row's values and serves both the bulk fetch and targeted
//! refetches from it, converting to whatever type the read requests.

use crate::buffers::{BindSlot, ResultBuffers, decode_slot};
use crate::engine::{ColumnMeta, EngineCursor, EngineStatement, FetchOutcome};
use crate::error::{DbError, DbResult};
use crate::value::{NativeType, Value, encode_as, format_timestamp_text};

/// Map a column's declared type to a native tag, following SQLite's
/// affinity keyword rules. Untyped (expression) columns are treated as
/// variable-width.
fn decl_to_native(decl: Option<&str>) -> NativeType {
    let Some(decl) = decl else {
        return NativeType::Blob;
    };
    let decl = decl.to_ascii_uppercase();
    if decl.contains("INT") {
        NativeType::LongLong
    } else if decl.contains("CHAR") || decl.contains("CLOB") || decl.contains("TEXT") {
        NativeType::Text
    } else if decl.contains("BLOB") {
        NativeType::Blob
    } else if decl.contains("REAL") || decl.contains("FLOA") || decl.contains("DOUB") {
        NativeType::Double
    } else if decl.contains("DATE") || decl.contains("TIME") {
        NativeType::Timestamp
    } else {
        NativeType::Decimal
    }
}

fn to_sqlite(value: Value) -> rusqlite::types::Value {
    match value {
        Value::Small(v) => rusqlite::types::Value::Integer(i64::from(v)),
        Value::Int(v) => rusqlite::types::Value::Integer(i64::from(v)),
        Value::Long(v) => rusqlite::types::Value::Integer(v),
        Value::Double(v) => rusqlite::types::Value::Real(v),
        Value::Text(v) => rusqlite::types::Value::Text(v),
        Value::Blob(v) => rusqlite::types::Value::Blob(v),
        Value::Timestamp(ts) => rusqlite::types::Value::Text(format_timestamp_text(&ts)),
        Value::Null => rusqlite::types::Value::Null,
    }
}

fn from_sqlite(value: rusqlite::types::Value) -> Value {
    match value {
        rusqlite::types::Value::Null => Value::Null,
        rusqlite::types::Value::Integer(v) => Value::Long(v),
        rusqlite::types::Value::Real(v) => Value::Double(v),
        rusqlite::types::Value::Text(v) => Value::Text(v),
        rusqlite::types::Value::Blob(v) => Value::Blob(v),
    }
}

fn params_to_values(params: &[BindSlot]) -> Vec<rusqlite::types::Value> {
    params
        .iter()
        .map(|slot| to_sqlite(decode_slot(slot)))
        .collect()
}

pub(super) struct SqliteStatement<'c> {
    stmt: rusqlite::Statement<'c>,
}

impl<'c> SqliteStatement<'c> {
    pub(super) fn new(stmt: rusqlite::Statement<'c>) -> Self {
        SqliteStatement { stmt }
    }
}

impl<'c> EngineStatement<'c> for SqliteStatement<'c> {
    fn param_count(&self) -> usize {
        self.stmt.parameter_count()
    }

    fn execute(&mut self, params: &[BindSlot]) -> DbResult<()> {
        self.stmt
            .execute(rusqlite::params_from_iter(params_to_values(params)))?;
        Ok(())
    }

    fn open_cursor<'s>(
        &'s mut self,
        params: &[BindSlot],
    ) -> DbResult<(Vec<ColumnMeta>, Box<dyn EngineCursor + 's>)> {
        let meta: Vec<ColumnMeta> = self
            .stmt
            .columns()
            .iter()
            .map(|col| ColumnMeta {
                name: col.name().to_string(),
                ty: decl_to_native(col.decl_type()),
            })
            .collect();
        let column_count = meta.len();
        let rows = self
            .stmt
            .query(rusqlite::params_from_iter(params_to_values(params)))?;
        let cursor = SqliteCursor {
            rows,
            column_count,
            current: None,
        };
        Ok((meta, Box::new(cursor)))
    }
}

struct SqliteCursor<'s> {
    rows: rusqlite::Rows<'s>,
    column_count: usize,
    current: Option<Vec<Value>>,
}

impl EngineCursor for SqliteCursor<'_> {
    fn fetch(&mut self, out: &mut ResultBuffers) -> FetchOutcome {
        let row = match self.rows.next() {
            Ok(Some(row)) => row,
            Ok(None) => return FetchOutcome::Done,
            Err(err) => return FetchOutcome::Err(err.into()),
        };
        let mut values = Vec::with_capacity(self.column_count);
        for column in 0..self.column_count {
            match row.get::<_, rusqlite::types::Value>(column) {
                Ok(value) => values.push(from_sqlite(value)),
                Err(err) => return FetchOutcome::Err(err.into()),
            }
        }
        let any_truncated = match out.store_row(&values) {
            Ok(truncated) => truncated,
            Err(err) => return FetchOutcome::Err(err),
        };
        self.current = Some(values);
        if any_truncated {
            FetchOutcome::Truncated
        } else {
            FetchOutcome::Row
        }
    }

    fn refetch(&mut self, column: usize, ty: NativeType, out: &mut [u8]) -> DbResult<()> {
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
