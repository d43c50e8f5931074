use arrow_array::{Array, ArrayRef, Decimal128Array};
use arrow_buffer::Buffer;
use arrow_data::ArrayData;

use super::{ColumnConverter, downcast};
use crate::{ConvertError, Decimal, Value, column::IntColumn, path::Path};

const DECIMAL128_WIDTH: usize = 16;

/// FIXED with scale > 0 on an integer column: `value × 10^-scale`, exact.
#[derive(Debug)]
pub struct ScaledIntConverter {
    values: IntColumn,
    scale: u8,
    columnar: bool,
}

impl ScaledIntConverter {
    pub(crate) fn try_new(
        array: &ArrayRef,
        scale: u8,
        columnar: bool,
        path: &Path,
    ) -> Result<Self, ConvertError> {
        Ok(Self {
            values: IntColumn::try_new(array, path)?,
            scale,
            columnar,
        })
    }
}

impl ColumnConverter for ScaledIntConverter {
    fn convert(&self, row: usize) -> Result<Option<Value>, ConvertError> {
        let Some(raw) = self.values.get(row) else {
            return Ok(None);
        };
        let decimal = Decimal::new(i128::from(raw), self.scale);
        Ok(Some(if self.columnar {
            Value::Float(decimal.to_f64())
        } else {
            Value::Decimal(decimal)
        }))
    }
}

/// Little-endian `i128` slots of a `Decimal128` column, read straight from
/// the value buffer.
///
/// The stride and the buffer bounds are checked once at construction, so
/// [`RawDecimal128::bytes`] only needs a slice lookup per row.
#[derive(Debug, Clone)]
pub(crate) struct RawDecimal128 {
    buffer: Buffer,
    offset: usize,
    len: usize,
}

impl RawDecimal128 {
    pub(crate) fn try_new(array: &Decimal128Array, path: &Path) -> Result<Self, ConvertError> {
        let data: ArrayData = array.to_data();
        let buffer = data.buffers().first().cloned().ok_or_else(|| {
            ConvertError::schema(path, "decimal128 column has no value buffer")
        })?;
        let needed = DECIMAL128_WIDTH * (data.offset() + data.len());
        if buffer.len() < needed {
            return Err(ConvertError::schema(
                path,
                format!(
                    "decimal128 value buffer holds {} bytes, {needed} required",
                    buffer.len()
                ),
            ));
        }
        Ok(Self {
            buffer,
            offset: data.offset(),
            len: data.len(),
        })
    }

    #[inline]
    pub(crate) fn bytes(&self, row: usize) -> Option<[u8; 16]> {
        if row >= self.len {
            return None;
        }
        let start = DECIMAL128_WIDTH * (self.offset + row);
        self.buffer
            .as_slice()
            .get(start..start + DECIMAL128_WIDTH)?
            .try_into()
            .ok()
    }
}

/// FIXED on a `Decimal128` column.
#[derive(Debug)]
pub struct Decimal128Converter {
    array: Decimal128Array,
    raw: RawDecimal128,
    scale: u8,
    columnar: bool,
    path: String,
}

impl Decimal128Converter {
    pub(crate) fn try_new(
        array: &ArrayRef,
        scale: u8,
        columnar: bool,
        path: &Path,
    ) -> Result<Self, ConvertError> {
        let array = downcast::<Decimal128Array>(array.as_ref(), "decimal128", path)?.clone();
        let raw = RawDecimal128::try_new(&array, path)?;
        Ok(Self {
            array,
            raw,
            scale,
            columnar,
            path: path.into(),
        })
    }
}

impl ColumnConverter for Decimal128Converter {
    fn convert(&self, row: usize) -> Result<Option<Value>, ConvertError> {
        if self.array.is_null(row) {
            return Ok(None);
        }
        let bytes = self.raw.bytes(row).ok_or_else(|| {
            ConvertError::value(
                &self.path,
                format!("row {row} is outside {} decimal slots", self.array.len()),
            )
        })?;
        let decimal = Decimal::from_le_bytes(bytes, self.scale);
        Ok(Some(if self.columnar {
            Value::Float(decimal.to_f64())
        } else {
            Value::Decimal(decimal)
        }))
    }
}

/// Descale a FIXED integer to `f64`.
///
/// Below scale 9 this divides directly. From scale 9 on, the quotient is
/// parsed from the exact decimal text instead.
pub(crate) fn fixed_to_f64(value: i64, scale: u8) -> f64 {
    Decimal::new(i128::from(value), scale).to_f64()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow_array::{Array, ArrayRef, Decimal128Array, Int32Array, Int64Array};
    use proptest::prelude::*;

    use super::{RawDecimal128, fixed_to_f64};
    use crate::{
        ConvertError, ConvertOptions, ConverterContext, Decimal, NumericMode, Value,
        convert::{ColumnConverter, build_converter, test_util::{build_for, tagged}},
        path::Path,
    };

    fn decimal_column(values: Vec<Option<i128>>, scale: i8) -> Decimal128Array {
        Decimal128Array::from(values)
            .with_precision_and_scale(38, scale)
            .unwrap()
    }

    #[test]
    fn scaled_integers_are_exact() {
        let array: ArrayRef = Arc::new(Int64Array::from(vec![Some(12_345), Some(-5), None]));
        let conv = build_for(array, &[("logicalType", "FIXED"), ("scale", "2")]);
        assert_eq!(
            conv.convert(0).unwrap(),
            Some(Value::Decimal(Decimal::new(12_345, 2)))
        );
        let Some(Value::Decimal(d)) = conv.convert(1).unwrap() else {
            panic!("expected decimal");
        };
        assert_eq!(d.to_string(), "-0.05");
        assert_eq!(conv.convert(2).unwrap(), None);
    }

    #[test]
    fn columnar_mode_yields_floats() {
        let array: ArrayRef = Arc::new(Int32Array::from(vec![250]));
        let field = tagged(
            "c",
            array.data_type().clone(),
            &[("logicalType", "FIXED"), ("scale", "2")],
        );
        let ctx = ConverterContext::new(
            &ConvertOptions::new().with_numeric_mode(NumericMode::Columnar),
        )
        .unwrap();
        let conv = build_converter(&field, &array, &ctx).unwrap();
        assert_eq!(conv.convert(0).unwrap(), Some(Value::Float(2.5)));
    }

    #[test]
    fn decimal128_rows_respect_slicing_and_nulls() {
        let array = decimal_column(vec![Some(1), Some(-2_500), None, Some(i128::MAX)], 3);
        let sliced: ArrayRef = Arc::new(array.slice(1, 3));
        let conv = build_for(sliced, &[("logicalType", "FIXED"), ("scale", "3")]);
        assert_eq!(
            conv.convert(0).unwrap(),
            Some(Value::Decimal(Decimal::new(-2_500, 3)))
        );
        assert_eq!(conv.convert(1).unwrap(), None);
        assert_eq!(
            conv.convert(2).unwrap(),
            Some(Value::Decimal(Decimal::new(i128::MAX, 3)))
        );
    }

    #[test]
    fn raw_reader_rejects_rows_past_the_end() {
        let array = decimal_column(vec![Some(7)], 0);
        let raw = RawDecimal128::try_new(&array, &Path::new(0, "d")).unwrap();
        assert_eq!(raw.bytes(0), Some(7i128.to_le_bytes()));
        assert_eq!(raw.bytes(1), None);
    }

    #[test]
    fn high_scale_double_goes_through_text() {
        assert_eq!(fixed_to_f64(1_234_567_890_123, 9), 1234.567890123);
        assert_eq!(fixed_to_f64(-1, 18), -1e-18);
        assert_eq!(fixed_to_f64(150, 2), 1.5);
        assert!(matches!(
            build_converter(
                &tagged("c", arrow_schema::DataType::Utf8, &[("logicalType", "FIXED")]),
                &(Arc::new(arrow_array::StringArray::from(vec!["1"])) as ArrayRef),
                &ConverterContext::default(),
            )
            .unwrap_err(),
            ConvertError::NotSupported { .. }
        ));
    }

    proptest! {
        #[test]
        fn direct_read_matches_value_accessor(
            values in prop::collection::vec(any::<i128>(), 1..32),
            scale in 0i8..=37,
            start in 0usize..8,
        ) {
            let array = decimal_column(values.iter().copied().map(Some).collect(), scale);
            let start = start.min(values.len() - 1);
            let sliced = array.slice(start, values.len() - start);
            let raw = RawDecimal128::try_new(&sliced, &Path::new(0, "d")).unwrap();
            for row in 0..sliced.len() {
                let direct = Decimal::from_le_bytes(raw.bytes(row).unwrap(), scale as u8);
                let generic = Decimal::new(sliced.value(row), scale as u8);
                prop_assert_eq!(direct, generic);
                prop_assert_eq!(direct.to_string(), generic.to_string());
            }
        }

        #[test]
        fn scaled_integer_decimal_is_exact(raw in any::<i64>(), scale in 1u8..=9) {
            let decimal = Decimal::new(i128::from(raw), scale);
            let text = decimal.to_string();
            let (int, frac) = text.trim_start_matches('-').split_once('.').unwrap();
            prop_assert_eq!(frac.len(), usize::from(scale));
            let digits: i128 = format!("{int}{frac}").parse().unwrap();
            let signed = if raw < 0 { -digits } else { digits };
            prop_assert_eq!(signed, i128::from(raw));
        }
    }
}
