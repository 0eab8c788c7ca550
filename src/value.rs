//! Typed values and their wire encodings.
//!
//! Every value crossing the statement/cursor boundary travels as a tagged
//! byte buffer. Integers and floats are little-endian; timestamps use a
//! compact 7-byte calendar form (year/month/day/hour/minute/second, UTC
//! decomposition, no timezone offset); text and blobs are raw bytes.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::error::{DbError, DbResult};

/// Engine-level column/parameter type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeType {
    Tiny,
    Short,
    Long,
    LongLong,
    Float,
    Double,
    Timestamp,
    Text,
    Blob,
    Decimal,
    Null,
}

impl NativeType {
    /// Buffer size for fixed-width types. Variable-width types (text, blob,
    /// decimal-as-text) return `None`: their true size is unknown until a
    /// row arrives, so their probe buffers start at zero.
    #[must_use]
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            NativeType::Tiny => Some(1),
            NativeType::Short => Some(2),
            NativeType::Long | NativeType::Float => Some(4),
            NativeType::LongLong | NativeType::Double => Some(8),
            NativeType::Timestamp => Some(WIRE_TIME_LEN),
            NativeType::Null => Some(0),
            NativeType::Text | NativeType::Blob | NativeType::Decimal => None,
        }
    }

    #[must_use]
    pub fn is_variable(self) -> bool {
        self.fixed_size().is_none()
    }
}

/// A typed application value, used for parameter dispatch and by engines
/// that hold rows in memory.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Small(i16),
    Int(i32),
    Long(i64),
    Double(f64),
    Text(String),
    Blob(Vec<u8>),
    Timestamp(NaiveDateTime),
    Null,
}

impl Value {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[must_use]
    pub fn native_type(&self) -> NativeType {
        match self {
            Value::Small(_) => NativeType::Short,
            Value::Int(_) => NativeType::Long,
            Value::Long(_) => NativeType::LongLong,
            Value::Double(_) => NativeType::Double,
            Value::Text(_) => NativeType::Text,
            Value::Blob(_) => NativeType::Blob,
            Value::Timestamp(_) => NativeType::Timestamp,
            Value::Null => NativeType::Null,
        }
    }

    #[must_use]
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Small(v) => Some(i64::from(*v)),
            Value::Int(v) => Some(i64::from(*v)),
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let Value::Text(s) = self { Some(s) } else { None }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<&NaiveDateTime> {
        if let Value::Timestamp(ts) = self {
            Some(ts)
        } else {
            None
        }
    }
}

/// Wire length of the calendar timestamp form.
pub const WIRE_TIME_LEN: usize = 7;

/// Encode a calendar timestamp into its 7-byte wire form.
#[must_use]
pub fn encode_timestamp(ts: &NaiveDateTime) -> [u8; WIRE_TIME_LEN] {
    let year = ts.year().clamp(0, i32::from(u16::MAX)) as u16;
    let y = year.to_le_bytes();
    [
        y[0],
        y[1],
        ts.month() as u8,
        ts.day() as u8,
        ts.hour() as u8,
        ts.minute() as u8,
        ts.second() as u8,
    ]
}

/// Decode the 7-byte wire form back into a calendar timestamp.
#[must_use]
pub fn decode_timestamp(buf: &[u8]) -> Option<NaiveDateTime> {
    if buf.len() < WIRE_TIME_LEN {
        return None;
    }
    let year = i32::from(u16::from_le_bytes([buf[0], buf[1]]));
    NaiveDate::from_ymd_opt(year, u32::from(buf[2]), u32::from(buf[3]))?.and_hms_opt(
        u32::from(buf[4]),
        u32::from(buf[5]),
        u32::from(buf[6]),
    )
}

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse an engine textual timestamp (`YYYY-MM-DD HH:MM:SS`, optional
/// fractional seconds).
#[must_use]
pub fn parse_timestamp_text(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

/// Format a timestamp in the engine textual form.
#[must_use]
pub fn format_timestamp_text(ts: &NaiveDateTime) -> String {
    ts.format(TIME_FORMAT).to_string()
}

fn long_of(value: &Value) -> DbResult<i64> {
    match value {
        Value::Small(_) | Value::Int(_) | Value::Long(_) => Ok(value.as_long().unwrap_or(0)),
        Value::Double(f) => Ok(*f as i64),
        Value::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| DbError::Bind(format!("cannot read `{s}` as an integer"))),
        other => Err(DbError::Bind(format!(
            "cannot convert {other:?} to an integer"
        ))),
    }
}

fn double_of(value: &Value) -> DbResult<f64> {
    match value {
        Value::Double(f) => Ok(*f),
        Value::Small(_) | Value::Int(_) | Value::Long(_) => {
            Ok(value.as_long().unwrap_or(0) as f64)
        }
        Value::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| DbError::Bind(format!("cannot read `{s}` as a float"))),
        other => Err(DbError::Bind(format!("cannot convert {other:?} to a float"))),
    }
}

fn text_of(value: &Value) -> Vec<u8> {
    match value {
        Value::Small(v) => v.to_string().into_bytes(),
        Value::Int(v) => v.to_string().into_bytes(),
        Value::Long(v) => v.to_string().into_bytes(),
        Value::Double(f) => f.to_string().into_bytes(),
        Value::Text(s) => s.clone().into_bytes(),
        Value::Blob(b) => b.clone(),
        Value::Timestamp(ts) => format_timestamp_text(ts).into_bytes(),
        Value::Null => Vec::new(),
    }
}

/// Encode `value` in the wire form of the requested type.
///
/// This is the conversion surface behind targeted single-column fetches: the
/// caller names the precise type it wants, independent of how the engine
/// holds the value.
///
/// # Errors
///
/// Returns `DbError::Bind` when the value cannot be represented as `ty`.
pub fn encode_as(value: &Value, ty: NativeType) -> DbResult<Vec<u8>> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    match ty {
        NativeType::Tiny => Ok(vec![long_of(value)? as u8]),
        NativeType::Short => Ok((long_of(value)? as i16).to_le_bytes().to_vec()),
        NativeType::Long => Ok((long_of(value)? as i32).to_le_bytes().to_vec()),
        NativeType::LongLong => Ok(long_of(value)?.to_le_bytes().to_vec()),
        NativeType::Float => Ok((double_of(value)? as f32).to_le_bytes().to_vec()),
        NativeType::Double => Ok(double_of(value)?.to_le_bytes().to_vec()),
        NativeType::Timestamp => match value {
            Value::Timestamp(ts) => Ok(encode_timestamp(ts).to_vec()),
            Value::Text(s) => parse_timestamp_text(s)
                .map(|ts| encode_timestamp(&ts).to_vec())
                .ok_or_else(|| DbError::Bind(format!("cannot read `{s}` as a timestamp"))),
            other => Err(DbError::Bind(format!(
                "cannot convert {other:?} to a timestamp"
            ))),
        },
        NativeType::Text | NativeType::Decimal | NativeType::Blob => Ok(text_of(value)),
        NativeType::Null => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn timestamp_wire_round_trip() {
        for stamp in [
            ts(2021, 3, 15, 10, 30, 0),
            ts(2020, 2, 29, 0, 0, 0),
            ts(1999, 12, 31, 23, 59, 59),
            ts(2024, 1, 1, 0, 0, 0),
        ] {
            let wire = encode_timestamp(&stamp);
            assert_eq!(decode_timestamp(&wire), Some(stamp));
        }
    }

    #[test]
    fn timestamp_text_round_trip() {
        let stamp = ts(2021, 3, 15, 10, 30, 0);
        assert_eq!(
            parse_timestamp_text(&format_timestamp_text(&stamp)),
            Some(stamp)
        );
        assert_eq!(parse_timestamp_text("not a date"), None);
    }

    #[test]
    fn numeric_conversions() {
        assert_eq!(
            encode_as(&Value::Long(77), NativeType::Long).unwrap(),
            77i32.to_le_bytes().to_vec()
        );
        assert_eq!(
            encode_as(&Value::Text("42".into()), NativeType::LongLong).unwrap(),
            42i64.to_le_bytes().to_vec()
        );
        assert!(encode_as(&Value::Blob(vec![1]), NativeType::Long).is_err());
    }

    #[test]
    fn null_encodes_empty_for_every_type() {
        for ty in [NativeType::Long, NativeType::Text, NativeType::Timestamp] {
            assert!(encode_as(&Value::Null, ty).unwrap().is_empty());
        }
    }

    #[test]
    fn integers_render_as_text() {
        assert_eq!(
            encode_as(&Value::Int(123), NativeType::Text).unwrap(),
            b"123".to_vec()
        );
    }
}
