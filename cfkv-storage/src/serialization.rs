//! Array persistence for the flat Arrow arrays behind every stored value.
//!
//! Each blob is a fixed 24-byte header followed by the array's raw buffers.
//! There is no Arrow IPC framing or schema object: the array store already
//! knows the logical shape of every record, so the blob only needs enough to
//! rebuild one flat `ArrayData`.
//!
//! Header:
//!   bytes 0..=3  : MAGIC = b"CFA0"
//!   byte  4      : layout code (see `Layout`)
//!   byte  5      : element type code (see `PrimType`)
//!   bytes 6..=7  : reserved (0)
//!   bytes 8..=15 : len (u64), number of elements
//!   bytes 16..=19: extra_a (u32), layout-specific
//!   bytes 20..=23: extra_b (u32), layout-specific
//!   bytes 24..   : payload
//!
//! Layouts:
//! - `Primitive`: fixed-width values (Int64, Float64) or a bit-packed
//!   Boolean buffer. extra_a = values byte length.
//! - `Varlen`: Utf8 offsets followed by values. extra_a = offsets byte
//!   length, extra_b = values byte length.
//!
//! Nulls are not representable; stored values never contain them.

use std::convert::TryFrom;

use arrow::array::{Array, ArrayData, ArrayRef, BooleanArray, StringArray, make_array};
use arrow::buffer::Buffer;
use arrow::datatypes::DataType;
use bytes::Bytes;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::codecs::{read_u32_le, read_u64_le, write_u32_le, write_u64_le};
use cfkv_result::{Error, Result};

const MAGIC: [u8; 4] = *b"CFA0";
const HEADER_LEN: usize = 24;

#[repr(u8)]
enum Layout {
    Primitive = 0,
    Varlen = 1,
}

/// Stable on-disk element type codes. Do not reorder; append only.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
enum PrimType {
    Int64 = 1,
    Float64 = 2,
    Boolean = 3,
    Utf8 = 4,
}

fn prim_from_datatype(dt: &DataType) -> Result<PrimType> {
    match dt {
        DataType::Int64 => Ok(PrimType::Int64),
        DataType::Float64 => Ok(PrimType::Float64),
        DataType::Boolean => Ok(PrimType::Boolean),
        DataType::Utf8 => Ok(PrimType::Utf8),
        other => Err(Error::Internal(format!(
            "unsupported Arrow type for storage: {other}"
        ))),
    }
}

fn datatype_from_prim(p: PrimType) -> DataType {
    match p {
        PrimType::Int64 => DataType::Int64,
        PrimType::Float64 => DataType::Float64,
        PrimType::Boolean => DataType::Boolean,
        PrimType::Utf8 => DataType::Utf8,
    }
}

fn write_header(out: &mut Vec<u8>, layout: Layout, code: PrimType, len: u64, a: u32, b: u32) {
    out.extend_from_slice(&MAGIC);
    out.push(layout as u8);
    out.push(u8::from(code));
    out.extend_from_slice(&[0u8; 2]);
    write_u64_le(out, len);
    write_u32_le(out, a);
    write_u32_le(out, b);
}

/// Serialize a flat, null-free array.
pub fn serialize_array(arr: &dyn Array) -> Result<Vec<u8>> {
    if arr.null_count() != 0 {
        return Err(Error::Internal("nulls are not supported in stored arrays".into()));
    }
    let code = prim_from_datatype(arr.data_type())?;
    match code {
        PrimType::Utf8 => serialize_utf8(arr),
        PrimType::Boolean => serialize_boolean(arr),
        PrimType::Int64 | PrimType::Float64 => serialize_primitive(arr, code, 8),
    }
}

fn serialize_primitive(arr: &dyn Array, code: PrimType, width: usize) -> Result<Vec<u8>> {
    let data = arr.to_data();
    let values = data
        .buffers()
        .first()
        .ok_or_else(|| Error::Internal("missing values buffer".into()))?;
    let start = data.offset() * width;
    let values_bytes = &values.as_slice()[start..start + data.len() * width];
    let values_len = u32::try_from(values_bytes.len())
        .map_err(|_| Error::Internal("values too large".into()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + values_bytes.len());
    write_header(
        &mut out,
        Layout::Primitive,
        code,
        data.len() as u64,
        values_len,
        0,
    );
    out.extend_from_slice(values_bytes);
    Ok(out)
}

fn serialize_boolean(arr: &dyn Array) -> Result<Vec<u8>> {
    let bools = arr
        .as_any()
        .downcast_ref::<BooleanArray>()
        .ok_or_else(|| Error::Internal("boolean downcast failed".into()))?;
    // Re-pack when sliced so the bitmap starts at bit 0.
    let packed;
    let bools = if bools.offset() != 0 {
        packed = BooleanArray::from((0..bools.len()).map(|i| bools.value(i)).collect::<Vec<_>>());
        &packed
    } else {
        bools
    };
    let bytes_needed = bools.len().div_ceil(8);
    let bits = &bools.values().inner().as_slice()[..bytes_needed];
    let values_len =
        u32::try_from(bits.len()).map_err(|_| Error::Internal("values too large".into()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + bits.len());
    write_header(
        &mut out,
        Layout::Primitive,
        PrimType::Boolean,
        bools.len() as u64,
        values_len,
        0,
    );
    out.extend_from_slice(bits);
    Ok(out)
}

fn serialize_utf8(arr: &dyn Array) -> Result<Vec<u8>> {
    let strings = arr
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| Error::Internal("utf8 downcast failed".into()))?;
    // Rebase offsets when sliced.
    let rebased;
    let strings = if strings.offset() != 0 {
        rebased = StringArray::from_iter_values((0..strings.len()).map(|i| strings.value(i)));
        &rebased
    } else {
        strings
    };
    let offsets_bytes: &[u8] = strings.offsets().inner().inner().as_slice();
    let offsets_bytes = &offsets_bytes[..(strings.len() + 1) * 4];
    let values_bytes = strings.values().as_slice();
    let end = strings.value_offsets()[strings.len()] as usize;
    let values_bytes = &values_bytes[..end];

    let offsets_len = u32::try_from(offsets_bytes.len())
        .map_err(|_| Error::Internal("offsets buffer too large".into()))?;
    let values_len = u32::try_from(values_bytes.len())
        .map_err(|_| Error::Internal("values buffer too large".into()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + offsets_bytes.len() + values_bytes.len());
    write_header(
        &mut out,
        Layout::Varlen,
        PrimType::Utf8,
        strings.len() as u64,
        offsets_len,
        values_len,
    );
    out.extend_from_slice(offsets_bytes);
    out.extend_from_slice(values_bytes);
    Ok(out)
}

/// Rebuild an array from a pager blob, borrowing the blob's memory where the
/// buffer alignment allows it.
pub fn deserialize_array(blob: Bytes) -> Result<ArrayRef> {
    let raw = blob.as_ref();
    if raw.len() < HEADER_LEN || raw[0..4] != MAGIC {
        return Err(Error::Internal("bad array blob magic/size".into()));
    }

    let layout = raw[4];
    let type_code = raw[5];

    let mut o = 8usize;
    let len = read_u64_le(raw, &mut o) as usize;
    let extra_a = read_u32_le(raw, &mut o) as usize;
    let extra_b = read_u32_le(raw, &mut o) as usize;

    let p = PrimType::try_from(type_code)
        .map_err(|_| Error::Internal(format!("unsupported type code {type_code}")))?;
    let data_type = datatype_from_prim(p);

    let whole = Buffer::from(blob);
    let payload = whole.slice_with_length(o, whole.len() - o);

    match layout {
        x if x == Layout::Primitive as u8 => {
            if payload.len() != extra_a {
                return Err(Error::Internal("primitive payload length mismatch".into()));
            }
            let data = ArrayData::builder(data_type)
                .len(len)
                .add_buffer(payload)
                .align_buffers(true)
                .build()?;
            Ok(make_array(data))
        }
        x if x == Layout::Varlen as u8 => {
            if payload.len() != extra_a + extra_b {
                return Err(Error::Internal("varlen payload length mismatch".into()));
            }
            let offsets = payload.slice_with_length(0, extra_a);
            let values = payload.slice_with_length(extra_a, extra_b);
            let data = ArrayData::builder(data_type)
                .len(len)
                .add_buffer(offsets)
                .add_buffer(values)
                .align_buffers(true)
                .build()?;
            Ok(make_array(data))
        }
        other => Err(Error::Internal(format!("unknown layout {other}"))),
    }
}

/* ---- Compile-time pinning of on-disk codes ------------------------------- */
#[allow(clippy::no_effect)]
const _: () = {
    ["code changed"][!(PrimType::Int64 as u8 == 1) as usize];
    ["code changed"][!(PrimType::Float64 as u8 == 2) as usize];
    ["code changed"][!(PrimType::Boolean as u8 == 3) as usize];
    ["code changed"][!(PrimType::Utf8 as u8 == 4) as usize];
};
