//! Canonical byte encoding.
//!
//! Every value is written with an explicit length or fixed width so that no
//! two different field sequences produce the same byte string.

use cfkv_types::{DType, NdArray};

#[derive(Debug, Default)]
pub struct CanonicalEncoder {
    buf: Vec<u8>,
}

impl CanonicalEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn u64(&mut self, v: u64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn i64(&mut self, v: i64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    /// `-0.0` is written as `0.0`.
    pub fn f64(&mut self, v: f64) -> &mut Self {
        let v = if v == 0.0 { 0.0 } else { v };
        self.buf.extend_from_slice(&v.to_bits().to_le_bytes());
        self
    }

    pub fn bool(&mut self, v: bool) -> &mut Self {
        self.buf.push(v as u8);
        self
    }

    pub fn bytes(&mut self, v: &[u8]) -> &mut Self {
        self.u64(v.len() as u64);
        self.buf.extend_from_slice(v);
        self
    }

    pub fn str(&mut self, v: &str) -> &mut Self {
        self.bytes(v.as_bytes())
    }

    /// dtype tag, rank, extents, then elements in row-major order.
    pub fn nd(&mut self, v: &NdArray) -> &mut Self {
        self.buf.push(v.dtype().tag());
        self.u64(v.rank() as u64);
        for &d in v.shape() {
            self.u64(d as u64);
        }
        match v.dtype() {
            DType::Float64 => {
                for &x in v.as_f64().unwrap_or_default() {
                    self.f64(x);
                }
            }
            DType::Int64 => {
                for &x in v.as_i64().unwrap_or_default() {
                    self.i64(x);
                }
            }
            DType::Bool => {
                for x in v.to_bool_vec().unwrap_or_default() {
                    self.bool(x);
                }
            }
            DType::Utf8 => {
                for s in v.to_string_vec().unwrap_or_default() {
                    self.str(&s);
                }
            }
        }
        self
    }
}
