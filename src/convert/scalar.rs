use arrow_array::{
    Array, ArrayRef, BinaryArray, BooleanArray, FixedSizeBinaryArray, Float32Array, Float64Array,
    LargeBinaryArray, LargeStringArray, StringArray,
};
use arrow_schema::DataType;

use super::{ColumnConverter, downcast};
use crate::{
    ConvertError, Value,
    column::IntColumn,
    path::Path,
    value::date_from_epoch_days,
};

/// FIXED with scale 0: the stored integer, widened to `i64`.
#[derive(Debug)]
pub struct IntConverter {
    values: IntColumn,
}

impl IntConverter {
    pub(crate) fn try_new(array: &ArrayRef, path: &Path) -> Result<Self, ConvertError> {
        Ok(Self {
            values: IntColumn::try_new(array, path)?,
        })
    }
}

impl ColumnConverter for IntConverter {
    fn convert(&self, row: usize) -> Result<Option<Value>, ConvertError> {
        Ok(self.values.get(row).map(Value::Int))
    }
}

/// BOOLEAN.
#[derive(Debug)]
pub struct BoolConverter {
    array: BooleanArray,
}

impl BoolConverter {
    pub(crate) fn try_new(array: &ArrayRef, path: &Path) -> Result<Self, ConvertError> {
        let array = downcast::<BooleanArray>(array.as_ref(), "boolean", path)?.clone();
        Ok(Self { array })
    }
}

impl ColumnConverter for BoolConverter {
    fn convert(&self, row: usize) -> Result<Option<Value>, ConvertError> {
        if self.array.is_null(row) {
            return Ok(None);
        }
        Ok(Some(Value::Bool(self.array.value(row))))
    }
}

#[derive(Debug)]
enum FloatColumn {
    F32(Float32Array),
    F64(Float64Array),
}

/// REAL.
#[derive(Debug)]
pub struct FloatConverter {
    column: FloatColumn,
}

impl FloatConverter {
    pub(crate) fn try_new(array: &ArrayRef, path: &Path) -> Result<Self, ConvertError> {
        let column = match array.data_type() {
            DataType::Float32 => FloatColumn::F32(
                downcast::<Float32Array>(array.as_ref(), "float32", path)?.clone(),
            ),
            _ => FloatColumn::F64(
                downcast::<Float64Array>(array.as_ref(), "float64", path)?.clone(),
            ),
        };
        Ok(Self { column })
    }
}

impl ColumnConverter for FloatConverter {
    fn convert(&self, row: usize) -> Result<Option<Value>, ConvertError> {
        let value = match &self.column {
            FloatColumn::F32(a) if a.is_valid(row) => f64::from(a.value(row)),
            FloatColumn::F64(a) if a.is_valid(row) => a.value(row),
            _ => return Ok(None),
        };
        Ok(Some(Value::Float(value)))
    }
}

#[derive(Debug)]
enum TextColumn {
    Utf8(StringArray),
    LargeUtf8(LargeStringArray),
}

/// Text passed through as-is: TEXT, CHAR, ANY, VARIANT and JSON-encoded
/// ARRAY/OBJECT.
#[derive(Debug)]
pub struct TextConverter {
    column: TextColumn,
}

impl TextConverter {
    pub(crate) fn try_new(array: &ArrayRef, path: &Path) -> Result<Self, ConvertError> {
        let column = match array.data_type() {
            DataType::LargeUtf8 => TextColumn::LargeUtf8(
                downcast::<LargeStringArray>(array.as_ref(), "large utf8", path)?.clone(),
            ),
            _ => TextColumn::Utf8(downcast::<StringArray>(array.as_ref(), "utf8", path)?.clone()),
        };
        Ok(Self { column })
    }
}

impl ColumnConverter for TextConverter {
    fn convert(&self, row: usize) -> Result<Option<Value>, ConvertError> {
        let text = match &self.column {
            TextColumn::Utf8(a) if a.is_valid(row) => a.value(row),
            TextColumn::LargeUtf8(a) if a.is_valid(row) => a.value(row),
            _ => return Ok(None),
        };
        Ok(Some(Value::Text(text.to_owned())))
    }
}

#[derive(Debug)]
enum BinaryColumn {
    Binary(BinaryArray),
    LargeBinary(LargeBinaryArray),
    Fixed(FixedSizeBinaryArray),
}

/// BINARY: each value is copied into an owned buffer.
#[derive(Debug)]
pub struct BinaryConverter {
    column: BinaryColumn,
}

impl BinaryConverter {
    pub(crate) fn try_new(array: &ArrayRef, path: &Path) -> Result<Self, ConvertError> {
        let any = array.as_ref();
        let column = match array.data_type() {
            DataType::LargeBinary => BinaryColumn::LargeBinary(
                downcast::<LargeBinaryArray>(any, "large binary", path)?.clone(),
            ),
            DataType::FixedSizeBinary(_) => BinaryColumn::Fixed(
                downcast::<FixedSizeBinaryArray>(any, "fixed-size binary", path)?.clone(),
            ),
            _ => BinaryColumn::Binary(downcast::<BinaryArray>(any, "binary", path)?.clone()),
        };
        Ok(Self { column })
    }
}

impl ColumnConverter for BinaryConverter {
    fn convert(&self, row: usize) -> Result<Option<Value>, ConvertError> {
        let bytes = match &self.column {
            BinaryColumn::Binary(a) if a.is_valid(row) => a.value(row),
            BinaryColumn::LargeBinary(a) if a.is_valid(row) => a.value(row),
            BinaryColumn::Fixed(a) if a.is_valid(row) => a.value(row),
            _ => return Ok(None),
        };
        Ok(Some(Value::Binary(bytes.to_vec())))
    }
}

/// DATE stored as days since 1970-01-01.
#[derive(Debug)]
pub struct DateConverter {
    days: IntColumn,
    columnar: bool,
    path: String,
}

impl DateConverter {
    pub(crate) fn try_new(
        array: &ArrayRef,
        columnar: bool,
        path: &Path,
    ) -> Result<Self, ConvertError> {
        Ok(Self {
            days: IntColumn::try_new(array, path)?,
            columnar,
            path: path.into(),
        })
    }
}

impl ColumnConverter for DateConverter {
    fn convert(&self, row: usize) -> Result<Option<Value>, ConvertError> {
        let Some(days) = self.days.get(row) else {
            return Ok(None);
        };
        if self.columnar {
            return Ok(Some(Value::EpochDays(days)));
        }
        let date = date_from_epoch_days(days).ok_or_else(|| {
            ConvertError::value(
                &self.path,
                format!("{days} days from 1970-01-01 falls outside 0001-01-01..=9999-12-31"),
            )
        })?;
        Ok(Some(Value::Date(date)))
    }
}
