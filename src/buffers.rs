//! Buffer-sets for native parameter/result marshalling.
//!
//! A buffer-set is an array of (type tag, byte buffer) slots, one per
//! ordinal position. Each slot owns its buffer, so reallocating one slot
//! never disturbs the others. Statements hold a [`ParamBuffers`]; cursors
//! hold a [`ResultBuffers`] with the per-column length/null/truncation
//! indicators the negotiation algorithm works from.

use tracing::warn;

use crate::engine::ColumnMeta;
use crate::value::{NativeType, Value, decode_timestamp};

/// One (type tag, buffer) slot of a buffer-set.
#[derive(Debug, Clone)]
pub struct BindSlot {
    pub ty: NativeType,
    pub buf: Option<Vec<u8>>,
}

impl BindSlot {
    #[must_use]
    pub fn null() -> Self {
        BindSlot {
            ty: NativeType::Null,
            buf: None,
        }
    }

    /// Current negotiated capacity; zero while the probe buffer is absent.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.as_ref().map_or(0, Vec::len)
    }
}

/// Decode a parameter slot back into a typed value. Used by engines that
/// consume parameters as values rather than raw buffers.
#[must_use]
pub fn decode_slot(slot: &BindSlot) -> Value {
    let Some(buf) = slot.buf.as_ref() else {
        return Value::Null;
    };
    match slot.ty {
        NativeType::Null => Value::Null,
        NativeType::Tiny => buf
            .first()
            .map_or(Value::Null, |b| Value::Small(i16::from(*b as i8))),
        NativeType::Short => slice_as::<2>(buf).map_or(Value::Null, |b| {
            Value::Small(i16::from_le_bytes(b))
        }),
        NativeType::Long => {
            slice_as::<4>(buf).map_or(Value::Null, |b| Value::Int(i32::from_le_bytes(b)))
        }
        NativeType::LongLong => {
            slice_as::<8>(buf).map_or(Value::Null, |b| Value::Long(i64::from_le_bytes(b)))
        }
        NativeType::Float => slice_as::<4>(buf).map_or(Value::Null, |b| {
            Value::Double(f64::from(f32::from_le_bytes(b)))
        }),
        NativeType::Double => {
            slice_as::<8>(buf).map_or(Value::Null, |b| Value::Double(f64::from_le_bytes(b)))
        }
        NativeType::Timestamp => decode_timestamp(buf).map_or(Value::Null, Value::Timestamp),
        NativeType::Text | NativeType::Decimal => {
            Value::Text(String::from_utf8_lossy(buf).into_owned())
        }
        NativeType::Blob => Value::Blob(buf.clone()),
    }
}

fn slice_as<const N: usize>(buf: &[u8]) -> Option<[u8; N]> {
    buf.get(..N)?.try_into().ok()
}

/// The parameter buffer-set of a prepared statement, sized to the parameter
/// count the engine reported at preparation time.
#[derive(Debug)]
pub struct ParamBuffers {
    slots: Vec<BindSlot>,
}

impl ParamBuffers {
    #[must_use]
    pub fn new(count: usize) -> Self {
        ParamBuffers {
            slots: (0..count).map(|_| BindSlot::null()).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn slots(&self) -> &[BindSlot] {
        &self.slots
    }

    /// Bind `bytes` under `ty` at `index`. The slot's buffer is replaced by
    /// one exactly fitting the encoded value. Out-of-range binds fail
    /// without touching any slot.
    pub fn bind(&mut self, index: usize, ty: NativeType, bytes: Vec<u8>) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            warn!(count = self.slots.len(), index, "bind index out of bounds");
            return false;
        };
        slot.ty = ty;
        slot.buf = Some(bytes);
        true
    }

    /// Release the slot's buffer and tag it as SQL NULL.
    pub fn bind_null(&mut self, index: usize) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            warn!(count = self.slots.len(), index, "bind index out of bounds");
            return false;
        };
        slot.ty = NativeType::Null;
        slot.buf = None;
        true
    }
}

/// The result buffer-set of a cursor: one slot per column plus the per-row
/// indicator arrays populated by the bulk fetch.
#[derive(Debug)]
pub struct ResultBuffers {
    slots: Vec<BindSlot>,
    lengths: Vec<usize>,
    nulls: Vec<bool>,
    truncated: Vec<bool>,
}

impl ResultBuffers {
    /// Allocate slots from result metadata: fixed-width columns get their
    /// exact buffer up front, variable-width columns start with a zero-size
    /// probe.
    #[must_use]
    pub fn for_columns(meta: &[ColumnMeta]) -> Self {
        let slots = meta
            .iter()
            .map(|col| BindSlot {
                ty: col.ty,
                buf: col.ty.fixed_size().map(|size| vec![0u8; size]),
            })
            .collect();
        ResultBuffers {
            slots,
            lengths: vec![0; meta.len()],
            nulls: vec![false; meta.len()],
            truncated: vec![false; meta.len()],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Store one column of the current row. Copies as much as the slot's
    /// current capacity allows, records the engine-reported full length, and
    /// flags truncation when the value did not fit. Returns the truncation
    /// flag.
    pub fn store(&mut self, index: usize, bytes: &[u8], is_null: bool) -> bool {
        self.lengths[index] = bytes.len();
        self.nulls[index] = is_null;
        if let Some(buf) = self.slots[index].buf.as_mut() {
            let n = buf.len().min(bytes.len());
            buf[..n].copy_from_slice(&bytes[..n]);
        }
        let truncated = !is_null && bytes.len() > self.slots[index].capacity();
        self.truncated[index] = truncated;
        truncated
    }

    /// Replace a column's buffer after a targeted refetch resolved its true
    /// length; clears the truncation flag.
    pub fn install(&mut self, index: usize, ty: NativeType, buf: Vec<u8>) {
        let slot = &mut self.slots[index];
        slot.ty = ty;
        slot.buf = Some(buf);
        self.truncated[index] = false;
    }

    #[must_use]
    pub fn length(&self, index: usize) -> usize {
        self.lengths[index]
    }

    #[must_use]
    pub fn is_null(&self, index: usize) -> bool {
        self.nulls[index]
    }

    #[must_use]
    pub fn is_truncated(&self, index: usize) -> bool {
        self.truncated[index]
    }

    /// A column needs the probe-then-refetch step when its buffer was never
    /// sized (variable-width probe) or the last bulk fetch truncated it.
    #[must_use]
    pub fn needs_refetch(&self, index: usize) -> bool {
        self.slots[index].buf.is_none() || self.truncated[index]
    }

    #[must_use]
    pub fn slot_ty(&self, index: usize) -> NativeType {
        self.slots[index].ty
    }

    /// View of the column's buffer trimmed to the reported length.
    #[must_use]
    pub fn bytes(&self, index: usize) -> Option<&[u8]> {
        let len = self.lengths[index];
        self.slots[index].buf.as_ref().map(|buf| &buf[..len])
    }

    /// Store a whole row of typed values, encoding each under its slot's
    /// negotiated type. Returns whether any column was truncated.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Bind` when a value cannot be encoded as its
    /// column's type.
    pub fn store_row(&mut self, values: &[Value]) -> crate::error::DbResult<bool> {
        let mut any_truncated = false;
        for column in 0..self.len() {
            let value = values.get(column).unwrap_or(&Value::Null);
            let bytes = crate::value::encode_as(value, self.slot_ty(column))?;
            any_truncated |= self.store(column, &bytes, value.is_null());
        }
        Ok(any_truncated)
    }
}
