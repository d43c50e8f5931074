//! Logical type tags carried in the `logicalType` field metadata entry.

use std::fmt;

use arrow_schema::DataType;

/// Application-level type annotation refining a column's physical Arrow type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalType {
    /// Untyped value, transferred as text.
    Any,
    /// Semi-structured array; text (JSON) or a structured `List`.
    Array,
    /// Raw bytes.
    Binary,
    /// Boolean.
    Boolean,
    /// Single character text.
    Char,
    /// Calendar date stored as days since the UNIX epoch.
    Date,
    /// Fixed-point number stored as a scaled integer or `Decimal128`.
    Fixed,
    /// Semi-structured object; text (JSON) or a structured `Struct`.
    Object,
    /// Double precision floating point.
    Real,
    /// UTF-8 text.
    Text,
    /// Time of day as a scaled count since midnight.
    Time,
    /// Generic timestamp tag; no converter is defined for it.
    Timestamp,
    /// Timestamp rendered in the session time zone.
    TimestampLtz,
    /// Timestamp without time zone.
    TimestampNtz,
    /// Timestamp with an explicit per-value offset.
    TimestampTz,
    /// Variant value, transferred as text.
    Variant,
    /// Fixed-length numeric vector.
    Vector,
    /// Structured map with typed keys and values.
    Map,
}

impl LogicalType {
    /// All tags, in declaration order.
    pub const ALL: [LogicalType; 18] = [
        LogicalType::Any,
        LogicalType::Array,
        LogicalType::Binary,
        LogicalType::Boolean,
        LogicalType::Char,
        LogicalType::Date,
        LogicalType::Fixed,
        LogicalType::Object,
        LogicalType::Real,
        LogicalType::Text,
        LogicalType::Time,
        LogicalType::Timestamp,
        LogicalType::TimestampLtz,
        LogicalType::TimestampNtz,
        LogicalType::TimestampTz,
        LogicalType::Variant,
        LogicalType::Vector,
        LogicalType::Map,
    ];

    /// Resolve a metadata string, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(name.trim()))
    }

    /// Canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalType::Any => "ANY",
            LogicalType::Array => "ARRAY",
            LogicalType::Binary => "BINARY",
            LogicalType::Boolean => "BOOLEAN",
            LogicalType::Char => "CHAR",
            LogicalType::Date => "DATE",
            LogicalType::Fixed => "FIXED",
            LogicalType::Object => "OBJECT",
            LogicalType::Real => "REAL",
            LogicalType::Text => "TEXT",
            LogicalType::Time => "TIME",
            LogicalType::Timestamp => "TIMESTAMP",
            LogicalType::TimestampLtz => "TIMESTAMP_LTZ",
            LogicalType::TimestampNtz => "TIMESTAMP_NTZ",
            LogicalType::TimestampTz => "TIMESTAMP_TZ",
            LogicalType::Variant => "VARIANT",
            LogicalType::Vector => "VECTOR",
            LogicalType::Map => "MAP",
        }
    }

    /// Default scale when the metadata carries none.
    pub fn default_scale(&self) -> u8 {
        if self.is_temporal() { 9 } else { 0 }
    }

    /// True for TIME and every TIMESTAMP variant.
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            LogicalType::Time
                | LogicalType::Timestamp
                | LogicalType::TimestampLtz
                | LogicalType::TimestampNtz
                | LogicalType::TimestampTz
        )
    }

    /// Whether this tag can sit on top of the physical type `dt`.
    ///
    /// This is the coarse physical sub-matrix per tag. Finer checks (child
    /// names and counts, byte length) happen when the converter is built.
    pub fn accepts(&self, dt: &DataType) -> bool {
        match self {
            LogicalType::Any | LogicalType::Char | LogicalType::Text | LogicalType::Variant => {
                is_string(dt)
            }
            LogicalType::Boolean => matches!(dt, DataType::Boolean),
            LogicalType::Real => matches!(dt, DataType::Float64 | DataType::Float32),
            LogicalType::Date => matches!(dt, DataType::Int32 | DataType::Int64 | DataType::Date32),
            LogicalType::Binary => matches!(
                dt,
                DataType::Binary | DataType::LargeBinary | DataType::FixedSizeBinary(_)
            ),
            LogicalType::Fixed => is_signed_int(dt) || matches!(dt, DataType::Decimal128(_, _)),
            LogicalType::Time => matches!(dt, DataType::Int32 | DataType::Int64),
            LogicalType::TimestampNtz | LogicalType::TimestampLtz => {
                matches!(dt, DataType::Int64 | DataType::Struct(_))
            }
            LogicalType::TimestampTz => matches!(dt, DataType::Struct(_)),
            LogicalType::Array => is_string(dt) || matches!(dt, DataType::List(_)),
            LogicalType::Object => is_string(dt) || matches!(dt, DataType::Struct(_)),
            LogicalType::Map => matches!(dt, DataType::Map(_, _)),
            LogicalType::Vector => matches!(dt, DataType::FixedSizeList(_, _)),
            LogicalType::Timestamp => false,
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn is_string(dt: &DataType) -> bool {
    matches!(dt, DataType::Utf8 | DataType::LargeUtf8)
}

pub(crate) fn is_signed_int(dt: &DataType) -> bool {
    matches!(
        dt,
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64
    )
}
