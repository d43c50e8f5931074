//! Error types for converter builds, row decoding and table reconstruction.

use arrow_schema::{ArrowError, DataType};
use thiserror::Error;

use crate::logical::LogicalType;

/// Errors raised while building converters or rewriting columns.
///
/// Every variant except [`ConvertError::Arrow`] and [`ConvertError::Config`]
/// carries the dot/index annotated path of the offending column so nested
/// failures can be traced back to their top-level field.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The column metadata or nested layout does not describe a valid column.
    #[error("schema error at {path}: {message}")]
    Schema {
        /// Path to the offending field (e.g., `col.child[0]`).
        path: String,
        /// What was wrong with the schema.
        message: String,
    },

    /// A value could not be represented in the requested output type.
    #[error("value error at {path}: {message}")]
    Value {
        /// Path to the offending field.
        path: String,
        /// Description of the value and the representable bound.
        message: String,
    },

    /// The logical type is not supported on top of this physical type.
    #[error("unsupported physical type {physical} for logical type {logical} at {path}")]
    NotSupported {
        /// Path to the offending field.
        path: String,
        /// Logical type resolved from the field metadata.
        logical: LogicalType,
        /// Physical Arrow type found in the batch.
        physical: DataType,
    },

    /// The conversion options could not be resolved.
    #[error("invalid configuration: {message}")]
    Config {
        /// Human-readable reason.
        message: String,
    },

    /// Error reported by an Arrow builder, array constructor or reader.
    #[error(transparent)]
    Arrow(#[from] ArrowError),
}

impl ConvertError {
    /// Build a [`ConvertError::Schema`] for `path`.
    pub(crate) fn schema(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Build a [`ConvertError::Value`] for `path`.
    pub(crate) fn value(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Value {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Build a [`ConvertError::NotSupported`] for `path`.
    pub(crate) fn not_supported(
        path: impl Into<String>,
        logical: LogicalType,
        physical: &DataType,
    ) -> Self {
        Self::NotSupported {
            path: path.into(),
            logical,
            physical: physical.clone(),
        }
    }

    /// Returns true if this error only concerns a single column.
    ///
    /// Hosts that tolerate partial batches may use this to decide whether a
    /// failed column can be skipped.
    pub fn is_column_scoped(&self) -> bool {
        matches!(
            self,
            ConvertError::Schema { .. }
                | ConvertError::Value { .. }
                | ConvertError::NotSupported { .. }
        )
    }
}
