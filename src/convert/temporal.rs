use arrow_array::ArrayRef;
use arrow_schema::DataType;
use jiff::{
    Timestamp,
    tz::{Offset, TimeZone},
};

use super::{ColumnConverter, TimestampParts};
use crate::{
    ConvertError, ConverterContext, LogicalType, NumericMode, TimeSpec, Value, ZonedParts,
    column::IntColumn,
    metadata::ColumnMeta,
    path::Path,
    value::{pow10, time_from_units},
};

/// TIME stored as `10^-scale` second units since midnight.
#[derive(Debug)]
pub struct TimeConverter {
    units: IntColumn,
    scale: u8,
    path: String,
}

impl TimeConverter {
    pub(crate) fn try_new(array: &ArrayRef, scale: u8, path: &Path) -> Result<Self, ConvertError> {
        Ok(Self {
            units: IntColumn::try_new(array, path)?,
            scale,
            path: path.into(),
        })
    }
}

impl ColumnConverter for TimeConverter {
    fn convert(&self, row: usize) -> Result<Option<Value>, ConvertError> {
        let Some(units) = self.units.get(row) else {
            return Ok(None);
        };
        let time = time_from_units(units, self.scale).ok_or_else(|| {
            ConvertError::value(
                &self.path,
                format!("{units} at scale {} is not a time of day", self.scale),
            )
        })?;
        Ok(Some(Value::Time(time)))
    }
}

#[derive(Debug)]
enum Source {
    /// One integer of `10^-scale` second units.
    Single(IntColumn),
    /// `epoch` seconds plus a nanosecond `fraction`.
    Split(TimestampParts),
}

#[derive(Debug)]
enum Rendering {
    Naive,
    NaiveNanos,
    Local(TimeZone),
}

/// TIMESTAMP_NTZ and TIMESTAMP_LTZ.
#[derive(Debug)]
pub struct TimestampConverter {
    source: Source,
    scale: u8,
    rendering: Rendering,
    path: String,
}

impl TimestampConverter {
    pub(crate) fn try_new(
        array: &ArrayRef,
        meta: &ColumnMeta,
        ctx: &ConverterContext,
        path: &Path,
    ) -> Result<Self, ConvertError> {
        let source = match array.data_type() {
            DataType::Struct(_) => Source::Split(TimestampParts::split(array, true, false, path)?),
            _ => Source::Single(IntColumn::try_new(array, path)?),
        };
        let rendering = match (meta.logical, ctx.numeric_mode()) {
            (LogicalType::TimestampLtz, _) => Rendering::Local(ctx.session_tz().clone()),
            (_, NumericMode::Columnar) => Rendering::NaiveNanos,
            (_, NumericMode::Host) => Rendering::Naive,
        };
        Ok(Self {
            source,
            scale: meta.scale,
            rendering,
            path: path.into(),
        })
    }

    /// Seconds/microseconds split of the value at `row`, `None` when null.
    pub fn time_spec(&self, row: usize) -> Option<TimeSpec> {
        match &self.source {
            Source::Single(units) => units.get(row).map(|v| TimeSpec::new(v, self.scale)),
            Source::Split(parts) => {
                if parts.is_null(row) || parts.epoch.is_null(row) {
                    return None;
                }
                let fraction = parts.fraction.as_ref().map_or(0, |f| f.value(row));
                Some(TimeSpec::from_epoch_fraction(parts.epoch.value(row), fraction))
            }
        }
    }

    fn epoch_nanos(&self, row: usize) -> Option<i64> {
        match &self.source {
            Source::Single(units) => {
                let v = units.value(row);
                if self.scale <= 9 {
                    v.checked_mul(pow10(9 - self.scale))
                } else {
                    Some(v / pow10(self.scale - 9))
                }
            }
            Source::Split(parts) => {
                let fraction = parts.fraction.as_ref().map_or(0, |f| f.value(row));
                parts
                    .epoch
                    .value(row)
                    .checked_mul(1_000_000_000)?
                    .checked_add(fraction)
            }
        }
    }

    fn out_of_range(&self, spec: TimeSpec) -> ConvertError {
        ConvertError::value(
            &self.path,
            format!(
                "timestamp {}s {}us is outside the supported range",
                spec.seconds, spec.micros
            ),
        )
    }
}

impl ColumnConverter for TimestampConverter {
    fn convert(&self, row: usize) -> Result<Option<Value>, ConvertError> {
        let Some(spec) = self.time_spec(row) else {
            return Ok(None);
        };
        let value = match &self.rendering {
            Rendering::NaiveNanos => {
                let nanos = self
                    .epoch_nanos(row)
                    .ok_or_else(|| self.out_of_range(spec))?;
                Value::EpochNanos(nanos)
            }
            Rendering::Naive => {
                let ts = spec.to_timestamp().ok_or_else(|| self.out_of_range(spec))?;
                Value::TimestampNtz(TimeZone::UTC.to_datetime(ts))
            }
            Rendering::Local(tz) => {
                let ts = spec.to_timestamp().ok_or_else(|| self.out_of_range(spec))?;
                Value::Timestamp(ts.to_zoned(tz.clone()))
            }
        };
        Ok(Some(value))
    }
}

/// TIMESTAMP_TZ: `{epoch, timezone}` (byte length 8) or
/// `{epoch, fraction, timezone}` (byte length 16).
#[derive(Debug)]
pub struct ZonedTimestampConverter {
    parts: TimestampParts,
    scale: u8,
    path: String,
}

impl ZonedTimestampConverter {
    pub(crate) fn try_new(
        array: &ArrayRef,
        meta: &ColumnMeta,
        path: &Path,
    ) -> Result<Self, ConvertError> {
        let with_fraction = match meta.byte_length {
            8 => false,
            16 => true,
            other => {
                return Err(ConvertError::schema(
                    path,
                    format!("byteLength {other} for TIMESTAMP_TZ must be 8 or 16"),
                ));
            }
        };
        Ok(Self {
            parts: TimestampParts::split(array, with_fraction, true, path)?,
            scale: meta.scale,
            path: path.into(),
        })
    }

    /// Instant and encoded zone at `row`, `None` when null.
    pub fn parts(&self, row: usize) -> Option<ZonedParts> {
        if self.parts.is_null(row) || self.parts.epoch.is_null(row) {
            return None;
        }
        let epoch = self.parts.epoch.value(row);
        let time = match &self.parts.fraction {
            Some(fraction) => TimeSpec::from_epoch_fraction(epoch, fraction.value(row)),
            None => TimeSpec::new(epoch, self.scale),
        };
        let timezone = self.parts.timezone.as_ref().map_or(1440, |tz| tz.value(row));
        Some(ZonedParts { time, timezone })
    }

    fn zoned(&self, parts: ZonedParts) -> Option<jiff::Zoned> {
        let offset = Offset::from_seconds(i32::try_from(parts.offset_seconds()).ok()?).ok()?;
        let ts: Timestamp = parts.time.to_timestamp()?;
        Some(ts.to_zoned(TimeZone::fixed(offset)))
    }
}

impl ColumnConverter for ZonedTimestampConverter {
    fn convert(&self, row: usize) -> Result<Option<Value>, ConvertError> {
        let Some(parts) = self.parts(row) else {
            return Ok(None);
        };
        let zoned = self.zoned(parts).ok_or_else(|| {
            ConvertError::value(
                &self.path,
                format!(
                    "timestamp {}s {}us at zone index {} is outside the supported range",
                    parts.time.seconds, parts.time.micros, parts.timezone
                ),
            )
        })?;
        Ok(Some(Value::Timestamp(zoned)))
    }
}
