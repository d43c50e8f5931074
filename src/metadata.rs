//! Reading the logical type and numeric parameters out of field metadata.

use std::collections::HashMap;

use arrow_schema::{DataType, Field};

use crate::{ConvertError, logical::LogicalType, path::Path};

/// Metadata key naming the logical type.
pub const LOGICAL_TYPE_KEY: &str = "logicalType";
/// Metadata key holding the scale.
pub const SCALE_KEY: &str = "scale";
/// Metadata key holding the precision.
pub const PRECISION_KEY: &str = "precision";
/// Metadata key holding the byte length of zoned timestamps.
pub const BYTE_LENGTH_KEY: &str = "byteLength";

/// Child name carrying whole epoch seconds (or scaled units) of a struct timestamp.
pub(crate) const FIELD_NAME_EPOCH: &str = "epoch";
/// Child name carrying nanoseconds within the second.
pub(crate) const FIELD_NAME_FRACTION: &str = "fraction";
/// Child name carrying the encoded timezone offset.
pub(crate) const FIELD_NAME_TIME_ZONE: &str = "timezone";

const DEFAULT_PRECISION: u8 = 38;
const DEFAULT_BYTE_LENGTH: u8 = 16;
const MAX_TIME_SCALE: u8 = 9;
const MAX_FIXED_SCALE: u8 = 38;

/// Logical type plus numeric parameters for one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMeta {
    /// Resolved logical type.
    pub logical: LogicalType,
    /// Number of fractional decimal digits.
    pub scale: u8,
    /// Total number of decimal digits.
    pub precision: u8,
    /// Byte length of a zoned timestamp (8 or 16).
    pub byte_length: u8,
    /// Whether the physical struct carries a `timezone` child.
    pub has_timezone: bool,
}

impl ColumnMeta {
    /// Read the metadata attached to `field`.
    ///
    /// # Errors
    /// Returns `ConvertError::Schema` if `logicalType` is missing or unknown,
    /// if a numeric entry is not a decimal integer, or if a time scale lies
    /// outside `[0, 9]`.
    pub fn from_field(field: &Field) -> Result<Self, ConvertError> {
        Self::read(field, &Path::new(0, field.name()))
    }

    pub(crate) fn read(field: &Field, path: &Path) -> Result<Self, ConvertError> {
        let metadata = field.metadata();
        let raw = metadata.get(LOGICAL_TYPE_KEY).ok_or_else(|| {
            ConvertError::schema(path, format!("missing '{LOGICAL_TYPE_KEY}' in field metadata"))
        })?;
        let logical = LogicalType::from_name(raw).ok_or_else(|| {
            ConvertError::schema(path, format!("unknown logical type '{raw}'"))
        })?;

        let scale = parse_u8(metadata, SCALE_KEY, path)?.unwrap_or(logical.default_scale());
        let precision = parse_u8(metadata, PRECISION_KEY, path)?.unwrap_or(DEFAULT_PRECISION);
        // Byte length may be unset when a zoned timestamp sits inside a
        // structured type; rely on the default then.
        let byte_length = parse_u8(metadata, BYTE_LENGTH_KEY, path)?.unwrap_or(DEFAULT_BYTE_LENGTH);

        if logical.is_temporal() && scale > MAX_TIME_SCALE {
            return Err(ConvertError::schema(
                path,
                format!("scale {scale} for {logical} must lie in [0, {MAX_TIME_SCALE}]"),
            ));
        }
        if logical == LogicalType::Fixed && scale > MAX_FIXED_SCALE {
            return Err(ConvertError::schema(
                path,
                format!("scale {scale} for FIXED exceeds {MAX_FIXED_SCALE}"),
            ));
        }

        let has_timezone = match field.data_type() {
            DataType::Struct(children) => children.iter().any(|c| c.name() == FIELD_NAME_TIME_ZONE),
            _ => false,
        };

        Ok(Self {
            logical,
            scale,
            precision,
            byte_length,
            has_timezone,
        })
    }
}

fn parse_u8(
    metadata: &HashMap<String, String>,
    key: &str,
    path: &Path,
) -> Result<Option<u8>, ConvertError> {
    match metadata.get(key) {
        None => Ok(None),
        Some(text) => text.trim().parse::<u8>().map(Some).map_err(|_| {
            ConvertError::schema(path, format!("metadata '{key}' is not a valid integer: '{text}'"))
        }),
    }
}
