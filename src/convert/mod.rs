//! Row-mode converters and the dispatcher that builds them.
//!
//! [`build_converter`] reads a field's logical type, checks it against the
//! physical Arrow type and returns a fully materialized [`Converter`] tree.
//! Nested converters own their children, so a tree lives exactly as long as
//! the batch it was built for.

use arrow_array::{Array, ArrayRef, StructArray};
use arrow_buffer::NullBuffer;
use arrow_schema::{DataType, Field, Fields};
use log::{error, trace};

use crate::{
    ConvertError, ConverterContext, LogicalType, NumericMode, Value,
    column::IntColumn,
    logical::is_string,
    metadata::{ColumnMeta, FIELD_NAME_EPOCH, FIELD_NAME_FRACTION, FIELD_NAME_TIME_ZONE},
    path::Path,
};

mod decimal;
mod nested;
mod scalar;
mod temporal;

pub(crate) use decimal::fixed_to_f64;
pub use decimal::{Decimal128Converter, ScaledIntConverter};
pub use nested::{ArrayConverter, MapConverter, ObjectConverter, VectorConverter};
pub use scalar::{
    BinaryConverter, BoolConverter, DateConverter, FloatConverter, IntConverter, TextConverter,
};
pub use temporal::{TimeConverter, TimestampConverter, ZonedTimestampConverter};

/// Decodes one value at a row index.
pub trait ColumnConverter {
    /// Value at `row`, or `None` if the slot is null.
    ///
    /// # Errors
    /// Returns `ConvertError::Value` if the stored value cannot be represented,
    /// such as a date before year 1.
    fn convert(&self, row: usize) -> Result<Option<Value>, ConvertError>;
}

/// One converter per supported (logical type, physical type) combination.
#[derive(Debug)]
pub enum Converter {
    /// FIXED with scale 0 on an integer column.
    Int(IntConverter),
    /// BOOLEAN.
    Bool(BoolConverter),
    /// REAL.
    Float(FloatConverter),
    /// Text-like tags and string-encoded ARRAY/OBJECT.
    Text(TextConverter),
    /// BINARY.
    Binary(BinaryConverter),
    /// DATE.
    Date(DateConverter),
    /// FIXED with scale > 0 on an integer column.
    ScaledInt(ScaledIntConverter),
    /// FIXED on a `Decimal128` column.
    Decimal128(Decimal128Converter),
    /// TIME.
    Time(TimeConverter),
    /// TIMESTAMP_NTZ/LTZ, single integer or `{epoch, fraction}` struct.
    Timestamp(TimestampConverter),
    /// TIMESTAMP_TZ.
    ZonedTimestamp(ZonedTimestampConverter),
    /// Structured ARRAY.
    Array(ArrayConverter),
    /// MAP.
    Map(MapConverter),
    /// Structured OBJECT.
    Object(ObjectConverter),
    /// VECTOR.
    Vector(VectorConverter),
}

impl ColumnConverter for Converter {
    fn convert(&self, row: usize) -> Result<Option<Value>, ConvertError> {
        match self {
            Converter::Int(c) => c.convert(row),
            Converter::Bool(c) => c.convert(row),
            Converter::Float(c) => c.convert(row),
            Converter::Text(c) => c.convert(row),
            Converter::Binary(c) => c.convert(row),
            Converter::Date(c) => c.convert(row),
            Converter::ScaledInt(c) => c.convert(row),
            Converter::Decimal128(c) => c.convert(row),
            Converter::Time(c) => c.convert(row),
            Converter::Timestamp(c) => c.convert(row),
            Converter::ZonedTimestamp(c) => c.convert(row),
            Converter::Array(c) => c.convert(row),
            Converter::Map(c) => c.convert(row),
            Converter::Object(c) => c.convert(row),
            Converter::Vector(c) => c.convert(row),
        }
    }
}

/// Build the converter tree for a top-level column.
///
/// Every nested child is resolved eagerly, so a schema problem anywhere in the
/// tree surfaces here rather than on the first row that reaches it.
///
/// # Errors
/// Returns `ConvertError::Schema` for missing or malformed metadata and bad
/// nested layouts, and `ConvertError::NotSupported` when the logical type
/// cannot sit on the physical type.
pub fn build_converter(
    field: &Field,
    array: &ArrayRef,
    ctx: &ConverterContext,
) -> Result<Converter, ConvertError> {
    build(field, array, ctx, &Path::new(0, field.name()))
}

/// Like [`build_converter`], recording `column` in the path.
pub(crate) fn build_column(
    column: usize,
    field: &Field,
    array: &ArrayRef,
    ctx: &ConverterContext,
) -> Result<Converter, ConvertError> {
    build(field, array, ctx, &Path::new(column, field.name()))
}

pub(crate) fn build(
    field: &Field,
    array: &ArrayRef,
    ctx: &ConverterContext,
    path: &Path,
) -> Result<Converter, ConvertError> {
    let meta = ColumnMeta::read(field, path)?;
    let dt = array.data_type();
    if !meta.logical.accepts(dt) {
        error!(
            "no converter for {} over {dt} at column {} ({path})",
            meta.logical, path.column
        );
        return Err(ConvertError::not_supported(path, meta.logical, dt));
    }
    let columnar = ctx.numeric_mode() == NumericMode::Columnar;

    let converter = match meta.logical {
        LogicalType::Any | LogicalType::Char | LogicalType::Text | LogicalType::Variant => {
            Converter::Text(TextConverter::try_new(array, path)?)
        }
        LogicalType::Array | LogicalType::Object if is_string(dt) => {
            Converter::Text(TextConverter::try_new(array, path)?)
        }
        LogicalType::Boolean => Converter::Bool(BoolConverter::try_new(array, path)?),
        LogicalType::Real => Converter::Float(FloatConverter::try_new(array, path)?),
        LogicalType::Binary => Converter::Binary(BinaryConverter::try_new(array, path)?),
        LogicalType::Date => Converter::Date(DateConverter::try_new(array, columnar, path)?),
        LogicalType::Fixed => match dt {
            DataType::Decimal128(_, _) => Converter::Decimal128(Decimal128Converter::try_new(
                array, meta.scale, columnar, path,
            )?),
            _ if meta.scale == 0 => Converter::Int(IntConverter::try_new(array, path)?),
            _ => Converter::ScaledInt(ScaledIntConverter::try_new(
                array, meta.scale, columnar, path,
            )?),
        },
        LogicalType::Time => Converter::Time(TimeConverter::try_new(array, meta.scale, path)?),
        LogicalType::TimestampNtz | LogicalType::TimestampLtz => {
            Converter::Timestamp(TimestampConverter::try_new(array, &meta, ctx, path)?)
        }
        LogicalType::TimestampTz => {
            Converter::ZonedTimestamp(ZonedTimestampConverter::try_new(array, &meta, path)?)
        }
        LogicalType::Array => Converter::Array(ArrayConverter::try_new(array, ctx, path)?),
        LogicalType::Map => Converter::Map(MapConverter::try_new(array, ctx, path)?),
        LogicalType::Object => Converter::Object(ObjectConverter::try_new(array, ctx, path)?),
        LogicalType::Vector => Converter::Vector(VectorConverter::try_new(array, path)?),
        LogicalType::Timestamp => {
            return Err(ConvertError::not_supported(path, meta.logical, dt));
        }
    };
    trace!(
        "column {} ({path}): {} over {dt} -> {}",
        path.column,
        meta.logical,
        converter.kind()
    );
    Ok(converter)
}

impl Converter {
    fn kind(&self) -> &'static str {
        match self {
            Converter::Int(_) => "int",
            Converter::Bool(_) => "bool",
            Converter::Float(_) => "float",
            Converter::Text(_) => "text",
            Converter::Binary(_) => "binary",
            Converter::Date(_) => "date",
            Converter::ScaledInt(_) => "scaled-int decimal",
            Converter::Decimal128(_) => "decimal128",
            Converter::Time(_) => "time",
            Converter::Timestamp(_) => "timestamp",
            Converter::ZonedTimestamp(_) => "zoned timestamp",
            Converter::Array(_) => "array",
            Converter::Map(_) => "map",
            Converter::Object(_) => "object",
            Converter::Vector(_) => "vector",
        }
    }
}

pub(crate) fn downcast<'a, T: 'static>(
    array: &'a dyn Array,
    expected: &str,
    path: &Path,
) -> Result<&'a T, ConvertError> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        ConvertError::schema(
            path,
            format!("expected {expected} array, found {}", array.data_type()),
        )
    })
}

#[inline]
pub(crate) fn is_null_at(nulls: Option<&NullBuffer>, row: usize) -> bool {
    nulls.is_some_and(|n| n.is_null(row))
}

/// Children of a struct-encoded timestamp, checked against the expected names.
#[derive(Debug)]
pub(crate) struct TimestampParts {
    pub(crate) nulls: Option<NullBuffer>,
    pub(crate) epoch: IntColumn,
    pub(crate) fraction: Option<IntColumn>,
    pub(crate) timezone: Option<IntColumn>,
}

impl TimestampParts {
    /// Split `array` into its `epoch`, `fraction` and `timezone` children.
    ///
    /// The child set must match exactly: `epoch` always, `fraction` when
    /// `with_fraction`, `timezone` when `with_timezone`, and nothing else.
    pub(crate) fn split(
        array: &ArrayRef,
        with_fraction: bool,
        with_timezone: bool,
        path: &Path,
    ) -> Result<Self, ConvertError> {
        let structure = downcast::<StructArray>(array.as_ref(), "struct", path)?;
        let mut expected = vec![FIELD_NAME_EPOCH];
        if with_fraction {
            expected.push(FIELD_NAME_FRACTION);
        }
        if with_timezone {
            expected.push(FIELD_NAME_TIME_ZONE);
        }
        check_children(structure.fields(), &expected, path)?;

        let child = |name: &str| -> Result<IntColumn, ConvertError> {
            let column = structure
                .column_by_name(name)
                .ok_or_else(|| ConvertError::schema(path, format!("missing '{name}' child")))?;
            IntColumn::try_new(column, &path.push_field(name))
        };
        Ok(Self {
            nulls: structure.nulls().cloned(),
            epoch: child(FIELD_NAME_EPOCH)?,
            fraction: with_fraction.then(|| child(FIELD_NAME_FRACTION)).transpose()?,
            timezone: with_timezone.then(|| child(FIELD_NAME_TIME_ZONE)).transpose()?,
        })
    }

    #[inline]
    pub(crate) fn is_null(&self, row: usize) -> bool {
        is_null_at(self.nulls.as_ref(), row)
    }
}

fn check_children(fields: &Fields, expected: &[&str], path: &Path) -> Result<(), ConvertError> {
    let names: Vec<&str> = fields.iter().map(|f| f.name().as_str()).collect();
    let matches =
        names.len() == expected.len() && expected.iter().all(|name| names.contains(name));
    if matches {
        Ok(())
    } else {
        Err(ConvertError::schema(
            path,
            format!("timestamp struct must have children {expected:?}, found {names:?}"),
        ))
    }
}
