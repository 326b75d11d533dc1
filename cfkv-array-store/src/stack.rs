//! Shape rules for stacking values along their leading axis.
//!
//! Values stack when they share an element type and either are all scalars
//! or all have rank >= 1 with identical trailing extents. The leading extent
//! may differ per value: `[n_i, 3]` values stack to `[sum(n_i), 3]`, scalars
//! to `[N]`.

use arrow::array::{Array, ArrayRef, new_empty_array};
use arrow::compute;
use cfkv_result::{Error, Result};
use cfkv_types::{DType, NdArray};
use serde::{Deserialize, Serialize};

/// The part of a value's shape that must agree across a stacked group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowLayout {
    pub dtype: DType,
    pub scalar: bool,
    pub trailing: Vec<usize>,
}

impl RowLayout {
    pub fn of(dtype: DType, shape: &[usize]) -> Self {
        Self {
            dtype,
            scalar: shape.is_empty(),
            trailing: shape.get(1..).unwrap_or(&[]).to_vec(),
        }
    }

    pub fn of_value(value: &NdArray) -> Self {
        Self::of(value.dtype(), value.shape())
    }

    /// Elements per leading-axis row.
    #[inline]
    pub fn row_width(&self) -> usize {
        self.trailing.iter().product()
    }

    /// Shape of `rows` stacked rows.
    pub fn stacked_shape(&self, rows: usize) -> Vec<usize> {
        let mut shape = Vec::with_capacity(1 + self.trailing.len());
        shape.push(rows);
        shape.extend_from_slice(&self.trailing);
        shape
    }

    /// Rows a value of `shape` contributes.
    #[inline]
    pub fn rows_of(shape: &[usize]) -> usize {
        shape.first().copied().unwrap_or(1)
    }

    /// Checks that a member of `shape` can join a group laid out as `self`.
    pub fn check_member(
        &self,
        path: &str,
        id: i64,
        dtype: DType,
        shape: &[usize],
    ) -> Result<()> {
        let other = RowLayout::of(dtype, shape);
        if other == *self {
            return Ok(());
        }
        let reason = if other.dtype != self.dtype {
            format!(
                "record {id} has element type {}, group holds {}",
                other.dtype.name(),
                self.dtype.name()
            )
        } else if other.scalar != self.scalar {
            format!("record {id} mixes scalar and array values")
        } else {
            format!(
                "record {id} has shape {shape:?}; trailing extents {:?} differ from {:?}",
                other.trailing, self.trailing
            )
        };
        Err(Error::concatenation(path, reason))
    }
}

/// Concatenates flat arrays of one element type.
pub fn concat_flat(dtype: DType, parts: &[ArrayRef]) -> Result<ArrayRef> {
    match parts {
        [] => Ok(new_empty_array(&dtype.arrow_type())),
        [one] => Ok(one.clone()),
        many => {
            let refs: Vec<&dyn Array> = many.iter().map(|a| &**a).collect();
            Ok(compute::concat(&refs)?)
        }
    }
}

/// Stacks in-memory values along axis 0, refusing ragged input.
pub fn stack_values(path: &str, values: &[(i64, NdArray)]) -> Result<NdArray> {
    let Some((_, first)) = values.first() else {
        return Err(Error::InvalidArgumentError(format!(
            "nothing to stack for '{path}'"
        )));
    };
    let layout = RowLayout::of_value(first);
    let mut rows = 0usize;
    for (id, v) in values {
        layout.check_member(path, *id, v.dtype(), v.shape())?;
        rows += v.leading_extent();
    }
    let parts: Vec<ArrayRef> = values.iter().map(|(_, v)| v.values().clone()).collect();
    let flat = concat_flat(layout.dtype, &parts)?;
    NdArray::try_new(layout.stacked_shape(rows), flat)
}
