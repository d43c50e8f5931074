#![deny(missing_docs)]
//! Logical-type aware conversion of annotated Arrow data.
//!
//! Every column in the incoming record batches carries a `logicalType` entry
//! (plus optional `scale`, `precision` and `byteLength`) in its field metadata.
//! The physical Arrow type alone does not say whether an `Int64` column is a
//! plain integer, a scaled fixed-point number or a timestamp; the metadata
//! does. This crate offers two ways to consume such batches:
//!
//! - [`RowIterator`] builds one [`Converter`] tree per column for each batch
//!   and yields rows of owned [`Value`]s.
//! - [`TableReconstructor`] rewrites the columns of every batch into plain
//!   Arrow types (`Float64`/`Decimal128`, `Time32`/`Time64`, `Timestamp`) so
//!   the whole set can be handed to a dataframe library.

mod column;
mod context;
pub mod convert;
mod error;
mod logical;
mod metadata;
mod path;
mod rows;
#[cfg(feature = "ipc")]
pub mod source;
mod table;
mod value;

// Re-export Arrow crates so downstream users don't need to depend on Arrow
// directly.
pub use arrow_array;
pub use arrow_buffer;
pub use arrow_schema;

pub use context::{ConvertOptions, ConverterContext, NumericMode, RowShape};
pub use convert::{ColumnConverter, Converter, build_converter};
pub use error::ConvertError;
pub use logical::LogicalType;
pub use metadata::{BYTE_LENGTH_KEY, ColumnMeta, LOGICAL_TYPE_KEY, PRECISION_KEY, SCALE_KEY};
pub use rows::{Row, RowIterator};
pub use table::TableReconstructor;
pub use value::{Decimal, TimeSpec, Value, ZonedParts};
