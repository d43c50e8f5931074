use std::sync::Arc;

use arrow_array::{
    ArrayRef, ArrowPrimitiveType,
    builder::PrimitiveBuilder,
    types::{
        ArrowTimestampType, Time32MillisecondType, Time32SecondType, Time64MicrosecondType,
        TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
        TimestampSecondType,
    },
};
use arrow_schema::DataType;
use log::warn;

use crate::{
    ConvertError, ConverterContext, LogicalType,
    column::IntColumn,
    convert::TimestampParts,
    metadata::ColumnMeta,
    path::Path,
    value::pow10,
};

const NANOS_PER_SECOND: i64 = 1_000_000_000;
const MAX_NANO_EPOCH: i64 = i64::MAX / NANOS_PER_SECOND;
const MIN_NANO_EPOCH: i64 = i64::MIN / NANOS_PER_SECOND;

/// Target resolution of a rewritten time or timestamp column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Second,
    Milli,
    Micro,
    Nano,
}

impl Unit {
    fn for_timestamp(scale: u8) -> Self {
        match scale {
            0 => Unit::Second,
            1..=3 => Unit::Milli,
            4..=6 => Unit::Micro,
            _ => Unit::Nano,
        }
    }

    fn for_time(scale: u8) -> Self {
        match scale {
            0 => Unit::Second,
            1..=3 => Unit::Milli,
            _ => Unit::Micro,
        }
    }

    fn scale(self) -> u8 {
        match self {
            Unit::Second => 0,
            Unit::Milli => 3,
            Unit::Micro => 6,
            Unit::Nano => 9,
        }
    }
}

/// Move `value` from `10^-from` to `10^-to` second units, truncating when
/// precision is dropped.
fn rescale(value: i64, from: u8, to: u8) -> Option<i64> {
    if to >= from {
        value.checked_mul(pow10(to - from))
    } else {
        Some(value / pow10(from - to))
    }
}

/// Rewrite a TIME column as `Time32(Second)`, `Time32(Millisecond)` or
/// `Time64(Microsecond)`.
pub(super) fn rewrite_time(
    array: &ArrayRef,
    scale: u8,
    path: &Path,
) -> Result<ArrayRef, ConvertError> {
    let units = IntColumn::try_new(array, path)?;
    let unit = Unit::for_time(scale);
    let value = |row: usize| -> Result<Option<i64>, ConvertError> {
        let Some(v) = units.get(row) else {
            return Ok(None);
        };
        rescale(v, scale, unit.scale()).map(Some).ok_or_else(|| {
            ConvertError::value(path, format!("time {v} at scale {scale} overflows {unit:?}"))
        })
    };
    let narrow = |row: usize| -> Result<Option<i32>, ConvertError> {
        value(row)?
            .map(|v| {
                i32::try_from(v).map_err(|_| {
                    ConvertError::value(path, format!("time {v} does not fit Time32 ({unit:?})"))
                })
            })
            .transpose()
    };
    let len = units.len();
    match unit {
        Unit::Second => build::<Time32SecondType>(len, narrow),
        Unit::Milli => build::<Time32MillisecondType>(len, narrow),
        _ => build::<Time64MicrosecondType>(len, value),
    }
}

fn build<T: ArrowPrimitiveType>(
    len: usize,
    mut value: impl FnMut(usize) -> Result<Option<T::Native>, ConvertError>,
) -> Result<ArrayRef, ConvertError> {
    let mut builder = PrimitiveBuilder::<T>::with_capacity(len);
    for row in 0..len {
        builder.append_option(value(row)?);
    }
    Ok(Arc::new(builder.finish()))
}

fn build_timestamp<T: ArrowTimestampType>(
    len: usize,
    tz: Option<Arc<str>>,
    mut value: impl FnMut(usize) -> Result<Option<i64>, ConvertError>,
) -> Result<ArrayRef, ConvertError> {
    let mut builder = PrimitiveBuilder::<T>::with_capacity(len).with_timezone_opt(tz);
    for row in 0..len {
        builder.append_option(value(row)?);
    }
    Ok(Arc::new(builder.finish()))
}

/// Rewrite a TIMESTAMP_NTZ/LTZ/TZ column as a native `Timestamp`.
///
/// LTZ and TZ columns carry the session zone name (UTC when none is set).
/// Struct layouts at scale > 6 whose epochs fall outside the nanosecond
/// range are written at microsecond resolution instead.
pub(super) fn rewrite_timestamp(
    array: &ArrayRef,
    meta: &ColumnMeta,
    ctx: &ConverterContext,
    path: &Path,
) -> Result<ArrayRef, ConvertError> {
    let tz: Option<Arc<str>> = match meta.logical {
        LogicalType::TimestampNtz => None,
        _ => Some(ctx.session_tz_name().unwrap_or("UTC").into()),
    };
    let scale = meta.scale;
    let unit = Unit::for_timestamp(scale);
    let overflow = |v: i64, to: Unit| {
        ConvertError::value(
            path,
            format!("timestamp {v} at scale {scale} overflows i64 at {to:?} resolution"),
        )
    };

    match (meta.logical, array.data_type()) {
        (LogicalType::TimestampTz, _) if meta.byte_length == 8 => {
            let parts = TimestampParts::split(array, false, true, path)?;
            let len = parts.epoch.len();
            emit(unit, len, tz, |row| {
                if is_null(&parts, row) {
                    return Ok(None);
                }
                let v = parts.epoch.value(row);
                rescale(v, scale, unit.scale())
                    .map(Some)
                    .ok_or_else(|| overflow(v, unit))
            })
        }
        (LogicalType::TimestampTz, _) | (_, DataType::Struct(_)) => {
            let with_timezone = meta.logical == LogicalType::TimestampTz;
            if with_timezone && meta.byte_length != 16 {
                return Err(ConvertError::schema(
                    path,
                    format!(
                        "byteLength {} for TIMESTAMP_TZ must be 8 or 16",
                        meta.byte_length
                    ),
                ));
            }
            let parts = TimestampParts::split(array, true, with_timezone, path)?;
            let unit = if unit == Unit::Nano {
                nano_or_downgrade(&parts, path)?
            } else {
                unit
            };
            let len = parts.epoch.len();
            emit(unit, len, tz, |row| {
                if is_null(&parts, row) {
                    return Ok(None);
                }
                let epoch = parts.epoch.value(row);
                let fraction = parts.fraction.as_ref().map_or(0, |f| f.value(row));
                epoch
                    .checked_mul(pow10(unit.scale()))
                    .and_then(|v| v.checked_add(fraction / pow10(9 - unit.scale())))
                    .map(Some)
                    .ok_or_else(|| overflow(epoch, unit))
            })
        }
        _ => {
            let units = IntColumn::try_new(array, path)?;
            emit(unit, units.len(), tz, |row| {
                let Some(v) = units.get(row) else {
                    return Ok(None);
                };
                rescale(v, scale, unit.scale())
                    .map(Some)
                    .ok_or_else(|| overflow(v, unit))
            })
        }
    }
}

fn emit(
    unit: Unit,
    len: usize,
    tz: Option<Arc<str>>,
    value: impl FnMut(usize) -> Result<Option<i64>, ConvertError>,
) -> Result<ArrayRef, ConvertError> {
    match unit {
        Unit::Second => build_timestamp::<TimestampSecondType>(len, tz, value),
        Unit::Milli => build_timestamp::<TimestampMillisecondType>(len, tz, value),
        Unit::Micro => build_timestamp::<TimestampMicrosecondType>(len, tz, value),
        Unit::Nano => build_timestamp::<TimestampNanosecondType>(len, tz, value),
    }
}

fn is_null(parts: &TimestampParts, row: usize) -> bool {
    parts.is_null(row) || parts.epoch.is_null(row)
}

/// Decide the resolution of a high-scale struct timestamp column.
///
/// Nanoseconds unless some epoch lies outside `[i64::MIN / 10^9, i64::MAX / 10^9]`;
/// then microseconds, provided every such row has a whole number of
/// microseconds in its fraction.
fn nano_or_downgrade(parts: &TimestampParts, path: &Path) -> Result<Unit, ConvertError> {
    let mut out_of_range = 0usize;
    for row in 0..parts.epoch.len() {
        if is_null(parts, row) {
            continue;
        }
        let epoch = parts.epoch.value(row);
        if (MIN_NANO_EPOCH..=MAX_NANO_EPOCH).contains(&epoch) {
            continue;
        }
        let fraction = parts.fraction.as_ref().map_or(0, |f| f.value(row));
        if fraction % 1_000 != 0 {
            return Err(ConvertError::value(
                path,
                format!(
                    "epoch {epoch} at row {row} lies outside [{MIN_NANO_EPOCH}, {MAX_NANO_EPOCH}] \
                     and fraction {fraction}ns is not a whole number of microseconds"
                ),
            ));
        }
        out_of_range += 1;
    }
    if out_of_range > 0 {
        warn!(
            "column {} ({path}): {out_of_range} epochs outside the nanosecond range, \
             writing microseconds instead",
            path.column
        );
        Ok(Unit::Micro)
    } else {
        Ok(Unit::Nano)
    }
}
