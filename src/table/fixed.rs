use std::sync::Arc;

use arrow_array::{
    ArrayRef,
    builder::{Decimal128Builder, Float64Builder},
};
use arrow_schema::DECIMAL128_MAX_PRECISION;

use crate::{ConvertError, column::IntColumn, convert::fixed_to_f64, path::Path};

/// Rewrite a scaled FIXED integer column as `Decimal128(38, scale)` or
/// `Float64`.
pub(super) fn rewrite_fixed(
    array: &ArrayRef,
    scale: u8,
    to_decimal: bool,
    path: &Path,
) -> Result<ArrayRef, ConvertError> {
    let values = IntColumn::try_new(array, path)?;
    let len = values.len();
    if to_decimal {
        let mut builder = Decimal128Builder::with_capacity(len)
            .with_precision_and_scale(DECIMAL128_MAX_PRECISION, scale as i8)?;
        for row in 0..len {
            builder.append_option(values.get(row).map(i128::from));
        }
        Ok(Arc::new(builder.finish()))
    } else {
        let mut builder = Float64Builder::with_capacity(len);
        for row in 0..len {
            builder.append_option(values.get(row).map(|v| fixed_to_f64(v, scale)));
        }
        Ok(Arc::new(builder.finish()))
    }
}
