//! Owned values produced by row-mode converters.

use std::fmt;

use jiff::{
    Span, Timestamp, Zoned,
    civil::{self, Date, DateTime, Time},
};

/// Days between 0001-01-01 (ordinal 1) and 1970-01-01.
pub(crate) const EPOCH_ORDINAL: i64 = 719_163;

const MICROS_PER_SECOND: i64 = 1_000_000;

/// A decoded, non-null cell.
///
/// Null cells are `None` wherever a `Value` can appear.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// BOOLEAN.
    Bool(bool),
    /// FIXED with scale 0.
    Int(i64),
    /// REAL, or scaled FIXED in columnar numeric mode.
    Float(f64),
    /// Scaled FIXED.
    Decimal(Decimal),
    /// TEXT, CHAR, ANY, VARIANT, and string-encoded ARRAY/OBJECT.
    Text(String),
    /// BINARY.
    Binary(Vec<u8>),
    /// DATE.
    Date(Date),
    /// TIME, microsecond resolution.
    Time(Time),
    /// TIMESTAMP_NTZ as a UTC wall-clock reading.
    TimestampNtz(DateTime),
    /// TIMESTAMP_LTZ in the session zone, or TIMESTAMP_TZ at its own offset.
    Timestamp(Zoned),
    /// DATE in columnar numeric mode: days since 1970-01-01.
    EpochDays(i64),
    /// TIMESTAMP_NTZ in columnar numeric mode: nanoseconds since the epoch.
    EpochNanos(i64),
    /// Structured ARRAY.
    Array(Vec<Option<Value>>),
    /// MAP entries in source order; a repeated key keeps its first position
    /// and its last value.
    Map(Vec<(Value, Option<Value>)>),
    /// Structured OBJECT, children in schema order.
    Object(Vec<(String, Option<Value>)>),
    /// VECTOR elements.
    Vector(Vec<Value>),
}

impl Value {
    /// Returns the field of an `Object` value by name.
    pub fn field(&self, name: &str) -> Option<&Option<Value>> {
        match self {
            Value::Object(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Looks up a `Map` value by key.
    pub fn get(&self, key: &Value) -> Option<&Option<Value>> {
        match self {
            Value::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

/// Exact fixed-point number: `unscaled × 10^-scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal {
    unscaled: i128,
    scale: u8,
}

impl Decimal {
    /// Build a decimal from its unscaled integer and scale.
    pub const fn new(unscaled: i128, scale: u8) -> Self {
        Self { unscaled, scale }
    }

    /// Build a decimal from 16 little-endian two's-complement bytes.
    pub fn from_le_bytes(bytes: [u8; 16], scale: u8) -> Self {
        Self::new(i128::from_le_bytes(bytes), scale)
    }

    /// Unscaled integer.
    pub fn unscaled(&self) -> i128 {
        self.unscaled
    }

    /// Number of fractional digits.
    pub fn scale(&self) -> u8 {
        self.scale
    }

    /// Nearest `f64`.
    ///
    /// Scales below 9 divide in floating point. Higher scales go through the
    /// decimal text so the result is correctly rounded.
    pub fn to_f64(&self) -> f64 {
        if self.scale < 9 {
            self.unscaled as f64 / 10f64.powi(i32::from(self.scale))
        } else {
            // A rendered decimal always parses.
            self.to_string().parse().unwrap_or(f64::NAN)
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.unscaled.unsigned_abs().to_string();
        if self.unscaled < 0 {
            f.write_str("-")?;
        }
        let scale = usize::from(self.scale);
        if scale == 0 {
            return f.write_str(&digits);
        }
        if digits.len() <= scale {
            write!(f, "0.{}{digits}", "0".repeat(scale - digits.len()))
        } else {
            let (int, frac) = digits.split_at(digits.len() - scale);
            write!(f, "{int}.{frac}")
        }
    }
}

/// An instant split into whole seconds and microseconds since the epoch.
///
/// Both parts carry the sign of the instant, so the instant is always
/// `seconds × 10^6 + micros` microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeSpec {
    /// Whole seconds since 1970-01-01T00:00:00Z.
    pub seconds: i64,
    /// Microseconds within the second, in `(-10^6, 10^6)`.
    pub micros: i64,
}

impl TimeSpec {
    /// Split a count of `10^-scale` second units.
    ///
    /// Scales above 6 drop the sub-microsecond digits, flooring negative
    /// values so the result never lies after the stored instant.
    pub fn new(units: i64, scale: u8) -> Self {
        match scale {
            0 => Self {
                seconds: units,
                micros: 0,
            },
            1..=6 => {
                let divisor = pow10(scale);
                Self {
                    seconds: units / divisor,
                    micros: (units % divisor) * pow10(6 - scale),
                }
            }
            _ => Self::from_micros(units.div_euclid(pow10(scale - 6))),
        }
    }

    /// Combine a whole-second epoch with a nanosecond fraction.
    pub fn from_epoch_fraction(epoch: i64, fraction_nanos: i64) -> Self {
        Self {
            seconds: epoch,
            micros: fraction_nanos / 1_000,
        }
    }

    fn from_micros(micros: i64) -> Self {
        Self {
            seconds: micros / MICROS_PER_SECOND,
            micros: micros % MICROS_PER_SECOND,
        }
    }

    /// Total microseconds since the epoch, or `None` on overflow.
    pub fn total_micros(&self) -> Option<i64> {
        self.seconds
            .checked_mul(MICROS_PER_SECOND)?
            .checked_add(self.micros)
    }

    /// The instant, or `None` outside the supported timestamp range.
    pub fn to_timestamp(&self) -> Option<Timestamp> {
        Timestamp::from_microsecond(self.total_micros()?).ok()
    }
}

/// Decoded parts of a zoned timestamp before a time zone is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ZonedParts {
    /// The instant.
    pub time: TimeSpec,
    /// Encoded zone: UTC offset in minutes plus 1440.
    pub timezone: i64,
}

impl ZonedParts {
    /// UTC offset in seconds.
    pub fn offset_seconds(&self) -> i64 {
        (self.timezone - 1440) * 60
    }
}

pub(crate) const fn pow10(exp: u8) -> i64 {
    10i64.pow(exp as u32)
}

/// Calendar date `days` after 1970-01-01, or `None` before 0001-01-01 or
/// past the supported range.
pub(crate) fn date_from_epoch_days(days: i64) -> Option<Date> {
    if days.checked_add(EPOCH_ORDINAL)? < 1 {
        return None;
    }
    let span = Span::new().try_days(days).ok()?;
    civil::date(1970, 1, 1).checked_add(span).ok()
}

/// Time of day from a count of `10^-scale` second units since midnight.
pub(crate) fn time_from_units(units: i64, scale: u8) -> Option<Time> {
    let divisor = pow10(scale);
    let secs = units / divisor;
    let remainder = units % divisor;
    let micros = if scale > 6 {
        remainder / pow10(scale - 6)
    } else {
        remainder * pow10(6 - scale)
    };
    Time::new(
        i8::try_from(secs / 3600).ok()?,
        i8::try_from(secs % 3600 / 60).ok()?,
        i8::try_from(secs % 60).ok()?,
        i32::try_from(micros * 1_000).ok()?,
    )
    .ok()
}

#[cfg(test)]
mod tests {
    use jiff::civil::{date, time};

    use super::*;

    #[test]
    fn decimal_display_is_exact() {
        assert_eq!(Decimal::new(12345, 2).to_string(), "123.45");
        assert_eq!(Decimal::new(-5, 3).to_string(), "-0.005");
        assert_eq!(Decimal::new(7, 0).to_string(), "7");
        assert_eq!(Decimal::new(0, 4).to_string(), "0.0000");
        assert_eq!(
            Decimal::new(i128::MIN, 38).to_string(),
            "-1.70141183460469231731687303715884105728"
        );
    }

    #[test]
    fn decimal_to_f64_paths() {
        assert_eq!(Decimal::new(250, 2).to_f64(), 2.5);
        assert_eq!(Decimal::new(123_456_789_012, 10).to_f64(), 12.3456789012);
        assert_eq!(Decimal::new(-1, 12).to_f64(), -1e-12);
    }

    #[test]
    fn time_spec_splits_per_scale() {
        assert_eq!(
            TimeSpec::new(1_700_000_000, 0),
            TimeSpec {
                seconds: 1_700_000_000,
                micros: 0
            }
        );
        assert_eq!(
            TimeSpec::new(-1_500, 3),
            TimeSpec {
                seconds: -1,
                micros: -500_000
            }
        );
        assert_eq!(
            TimeSpec::new(1_000_000_000_123_456_789, 9),
            TimeSpec {
                seconds: 1_000_000_000,
                micros: 123_456
            }
        );
        assert_eq!(TimeSpec::new(-1, 9).total_micros(), Some(-1));
        assert_eq!(TimeSpec::new(3_000_001, 6).total_micros(), Some(3_000_001));
    }

    #[test]
    fn two_field_combination() {
        let spec = TimeSpec::from_epoch_fraction(1_700_000_000, 500_000_000);
        assert_eq!(spec.micros, 500_000);
        assert_eq!(spec.total_micros(), Some(1_700_000_000_500_000));
    }

    #[test]
    fn dates_from_epoch_days() {
        assert_eq!(date_from_epoch_days(0), Some(date(1970, 1, 1)));
        assert_eq!(date_from_epoch_days(-EPOCH_ORDINAL + 1), Some(date(1, 1, 1)));
        assert_eq!(date_from_epoch_days(-EPOCH_ORDINAL), None);
        assert_eq!(date_from_epoch_days(2_932_896), Some(date(9999, 12, 31)));
    }

    #[test]
    fn time_decomposition_truncates_nanos() {
        let units =
            12 * 3600 * 1_000_000_000 + 34 * 60 * 1_000_000_000 + 56 * 1_000_000_000 + 789_123_456;
        assert_eq!(time_from_units(units, 9), Some(time(12, 34, 56, 789_123_000)));
        assert_eq!(time_from_units(452_965, 1), Some(time(12, 34, 56, 500_000_000)));
        assert_eq!(time_from_units(86_400, 0), None);
    }

    #[test]
    fn zoned_offsets() {
        let parts = ZonedParts {
            time: TimeSpec::new(0, 0),
            timezone: 1440 + 330,
        };
        assert_eq!(parts.offset_seconds(), 19_800);
    }
}
