//! Shaped values backed by flat Arrow arrays.
//!
//! An [`NdArray`] is a row-major buffer of one of four element types plus a
//! shape. Rank-0 arrays are scalars. The array store stacks `NdArray`s along
//! their leading axis, so `leading_extent` and `trailing_shape` are the two
//! views that matter for concatenation.

use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::DataType;
use cfkv_result::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Element type of an [`NdArray`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Float64,
    Int64,
    Bool,
    Utf8,
}

impl DType {
    pub fn arrow_type(self) -> DataType {
        match self {
            DType::Float64 => DataType::Float64,
            DType::Int64 => DataType::Int64,
            DType::Bool => DataType::Boolean,
            DType::Utf8 => DataType::Utf8,
        }
    }

    pub fn from_arrow(dt: &DataType) -> Option<Self> {
        match dt {
            DataType::Float64 => Some(DType::Float64),
            DataType::Int64 => Some(DType::Int64),
            DataType::Boolean => Some(DType::Bool),
            DataType::Utf8 => Some(DType::Utf8),
            _ => None,
        }
    }

    /// Stable one-byte tag used in canonical encodings.
    pub fn tag(self) -> u8 {
        match self {
            DType::Float64 => 1,
            DType::Int64 => 2,
            DType::Bool => 3,
            DType::Utf8 => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DType::Float64 => "float64",
            DType::Int64 => "int64",
            DType::Bool => "bool",
            DType::Utf8 => "utf8",
        }
    }
}

/// A shaped, non-null value.
#[derive(Clone, Debug)]
pub struct NdArray {
    shape: Vec<usize>,
    dtype: DType,
    values: ArrayRef,
}

impl NdArray {
    /// Wraps a flat Arrow array. The element count must equal the product of
    /// `shape` (1 for scalars) and the array must not contain nulls.
    pub fn try_new(shape: Vec<usize>, values: ArrayRef) -> Result<Self> {
        let dtype = DType::from_arrow(values.data_type()).ok_or_else(|| {
            Error::InvalidArgumentError(format!(
                "unsupported element type {}",
                values.data_type()
            ))
        })?;
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(Error::InvalidArgumentError(format!(
                "shape {shape:?} needs {expected} elements, got {}",
                values.len()
            )));
        }
        if values.null_count() != 0 {
            return Err(Error::InvalidArgumentError(
                "array values must not contain nulls".into(),
            ));
        }
        Ok(Self {
            shape,
            dtype,
            values,
        })
    }

    pub fn from_f64(shape: Vec<usize>, values: Vec<f64>) -> Result<Self> {
        Self::try_new(shape, Arc::new(Float64Array::from(values)))
    }

    pub fn from_i64(shape: Vec<usize>, values: Vec<i64>) -> Result<Self> {
        Self::try_new(shape, Arc::new(Int64Array::from(values)))
    }

    pub fn from_bool(shape: Vec<usize>, values: Vec<bool>) -> Result<Self> {
        Self::try_new(shape, Arc::new(BooleanArray::from(values)))
    }

    pub fn from_strings<S: AsRef<str>>(shape: Vec<usize>, values: &[S]) -> Result<Self> {
        let arr: StringArray = values.iter().map(|s| Some(s.as_ref())).collect();
        Self::try_new(shape, Arc::new(arr))
    }

    /// Builds an `[n, 3]` float array from rows.
    pub fn from_rows(rows: &[[f64; 3]]) -> Self {
        let flat: Vec<f64> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Self {
            shape: vec![rows.len(), 3],
            dtype: DType::Float64,
            values: Arc::new(Float64Array::from(flat)),
        }
    }

    pub fn scalar_f64(v: f64) -> Self {
        Self {
            shape: Vec::new(),
            dtype: DType::Float64,
            values: Arc::new(Float64Array::from(vec![v])),
        }
    }

    pub fn scalar_i64(v: i64) -> Self {
        Self {
            shape: Vec::new(),
            dtype: DType::Int64,
            values: Arc::new(Int64Array::from(vec![v])),
        }
    }

    pub fn scalar_bool(v: bool) -> Self {
        Self {
            shape: Vec::new(),
            dtype: DType::Bool,
            values: Arc::new(BooleanArray::from(vec![v])),
        }
    }

    pub fn scalar_str(v: &str) -> Self {
        Self {
            shape: Vec::new(),
            dtype: DType::Utf8,
            values: Arc::new(StringArray::from(vec![v])),
        }
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn values(&self) -> &ArrayRef {
        &self.values
    }

    /// Rows contributed when stacking along axis 0. Scalars contribute one.
    #[inline]
    pub fn leading_extent(&self) -> usize {
        self.shape.first().copied().unwrap_or(1)
    }

    /// Shape excluding the leading axis; empty for scalars and vectors.
    #[inline]
    pub fn trailing_shape(&self) -> &[usize] {
        self.shape.get(1..).unwrap_or(&[])
    }

    /// Elements per leading-axis row.
    #[inline]
    pub fn row_width(&self) -> usize {
        self.trailing_shape().iter().product()
    }

    pub fn as_f64(&self) -> Option<&[f64]> {
        self.values
            .as_any()
            .downcast_ref::<Float64Array>()
            .map(|a| &a.values()[..])
    }

    pub fn as_i64(&self) -> Option<&[i64]> {
        self.values
            .as_any()
            .downcast_ref::<Int64Array>()
            .map(|a| &a.values()[..])
    }

    pub fn to_bool_vec(&self) -> Option<Vec<bool>> {
        self.values
            .as_any()
            .downcast_ref::<BooleanArray>()
            .map(|a| (0..a.len()).map(|i| a.value(i)).collect())
    }

    pub fn to_string_vec(&self) -> Option<Vec<String>> {
        self.values
            .as_any()
            .downcast_ref::<StringArray>()
            .map(|a| (0..a.len()).map(|i| a.value(i).to_string()).collect())
    }

    /// Numeric values widened to `f64`; `None` for bool and string arrays.
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        match self.dtype {
            DType::Float64 => self.as_f64().map(<[f64]>::to_vec),
            DType::Int64 => self
                .as_i64()
                .map(|v| v.iter().map(|&x| x as f64).collect()),
            DType::Bool | DType::Utf8 => None,
        }
    }

    /// Returns a float copy with `f` applied to every element.
    pub fn map_f64(&self, f: impl Fn(f64) -> f64) -> Result<Self> {
        let values = self.to_f64_vec().ok_or_else(|| {
            Error::InvalidArgumentError(format!(
                "cannot apply numeric map to {} array",
                self.dtype.name()
            ))
        })?;
        Self::from_f64(self.shape.clone(), values.into_iter().map(f).collect())
    }

    /// Same values viewed with a different shape of equal element count.
    pub fn reshaped(&self, shape: Vec<usize>) -> Result<Self> {
        Self::try_new(shape, Arc::clone(&self.values))
    }
}

impl PartialEq for NdArray {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape
            && self.dtype == other.dtype
            && self.values.to_data() == other.values.to_data()
    }
}
