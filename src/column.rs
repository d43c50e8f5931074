use arrow_array::{Array, ArrayRef, Date32Array, Int8Array, Int16Array, Int32Array, Int64Array};
use arrow_schema::DataType;

use crate::{ConvertError, path::Path};

/// Signed integer column of any width, read as `i64`.
#[derive(Debug, Clone)]
pub(crate) enum IntColumn {
    Int8(Int8Array),
    Int16(Int16Array),
    Int32(Int32Array),
    Int64(Int64Array),
    Date32(Date32Array),
}

impl IntColumn {
    pub(crate) fn try_new(array: &ArrayRef, path: &Path) -> Result<Self, ConvertError> {
        let any = array.as_any();
        let column = match array.data_type() {
            DataType::Int8 => any.downcast_ref::<Int8Array>().cloned().map(IntColumn::Int8),
            DataType::Int16 => any.downcast_ref::<Int16Array>().cloned().map(IntColumn::Int16),
            DataType::Int32 => any.downcast_ref::<Int32Array>().cloned().map(IntColumn::Int32),
            DataType::Int64 => any.downcast_ref::<Int64Array>().cloned().map(IntColumn::Int64),
            DataType::Date32 => any
                .downcast_ref::<Date32Array>()
                .cloned()
                .map(IntColumn::Date32),
            _ => None,
        };
        column.ok_or_else(|| {
            ConvertError::schema(
                path,
                format!("expected a signed integer column, found {}", array.data_type()),
            )
        })
    }

    #[inline]
    pub(crate) fn value(&self, row: usize) -> i64 {
        match self {
            IntColumn::Int8(a) => i64::from(a.value(row)),
            IntColumn::Int16(a) => i64::from(a.value(row)),
            IntColumn::Int32(a) => i64::from(a.value(row)),
            IntColumn::Int64(a) => a.value(row),
            IntColumn::Date32(a) => i64::from(a.value(row)),
        }
    }

    #[inline]
    pub(crate) fn is_null(&self, row: usize) -> bool {
        self.as_array().is_null(row)
    }

    /// Value at `row`, or `None` when the slot is null.
    #[inline]
    pub(crate) fn get(&self, row: usize) -> Option<i64> {
        if self.is_null(row) {
            None
        } else {
            Some(self.value(row))
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.as_array().len()
    }

    fn as_array(&self) -> &dyn Array {
        match self {
            IntColumn::Int8(a) => a,
            IntColumn::Int16(a) => a,
            IntColumn::Int32(a) => a,
            IntColumn::Int64(a) => a,
            IntColumn::Date32(a) => a,
        }
    }
}
