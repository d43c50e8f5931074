//! Table-mode reconstruction: rewrite annotated columns into plain Arrow types.
//!
//! Scaled FIXED integers become `Decimal128` or `Float64`, TIME becomes
//! `Time32`/`Time64` and every TIMESTAMP variant becomes a native `Timestamp`.
//! Nested columns are rebuilt only when one of their children changes;
//! everything else is passed through without copying.

use std::sync::Arc;

use arrow_array::{Array, ArrayRef, ListArray, MapArray, RecordBatch, StructArray};
use arrow_schema::{ArrowError, DataType, Field, FieldRef, Fields, Schema, SchemaRef};
use log::{debug, error};

use crate::{
    ConvertError, ConvertOptions, ConverterContext, LogicalType,
    convert::downcast,
    logical::is_string,
    metadata::ColumnMeta,
    path::Path,
};

mod fixed;
mod temporal;

/// Owns a set of record batches and rewrites them once for dataframe hand-off.
#[derive(Debug)]
pub struct TableReconstructor {
    batches: Vec<RecordBatch>,
    ctx: ConverterContext,
    materialized: bool,
}

impl TableReconstructor {
    /// Collect `batches` for reconstruction with `options`.
    ///
    /// # Errors
    /// Returns `ConvertError::Arrow` if the source yields an error, or
    /// `ConvertError::Config` if the options do not resolve.
    pub fn new<I>(batches: I, options: &ConvertOptions) -> Result<Self, ConvertError>
    where
        I: IntoIterator<Item = Result<RecordBatch, ArrowError>>,
    {
        Self::with_context(batches, ConverterContext::new(options)?)
    }

    /// Collect `batches` for reconstruction with an already resolved context.
    ///
    /// # Errors
    /// Returns `ConvertError::Arrow` if the source yields an error.
    pub fn with_context<I>(batches: I, ctx: ConverterContext) -> Result<Self, ConvertError>
    where
        I: IntoIterator<Item = Result<RecordBatch, ArrowError>>,
    {
        let batches = batches.into_iter().collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            batches,
            ctx,
            materialized: false,
        })
    }

    /// Collect the batches of an Arrow IPC stream.
    ///
    /// # Errors
    /// Returns `ConvertError::Arrow` if the stream is malformed, or
    /// `ConvertError::Config` if the options do not resolve.
    #[cfg(feature = "ipc")]
    pub fn from_ipc_bytes(bytes: &[u8], options: &ConvertOptions) -> Result<Self, ConvertError> {
        let batches = crate::source::read_ipc_stream(bytes)?;
        Self::new(batches.into_iter().map(Ok::<_, ArrowError>), options)
    }

    /// Rewrite every batch in place.
    ///
    /// Returns `true` on the first call when there is data to rewrite, and
    /// `false` when the batches were already materialized or there are none.
    /// The rewrite is all-or-nothing: on error no batch is replaced and a
    /// later call may retry.
    ///
    /// # Errors
    /// Returns the first schema, value or Arrow error hit in any column.
    pub fn materialize(&mut self) -> Result<bool, ConvertError> {
        if self.materialized || self.batches.is_empty() {
            return Ok(false);
        }
        let rewritten = self
            .batches
            .iter()
            .enumerate()
            .map(|(index, batch)| rewrite_batch(index, batch, &self.ctx))
            .collect::<Result<Vec<_>, _>>()?;
        self.batches = rewritten;
        self.materialized = true;
        Ok(true)
    }

    /// Whether [`TableReconstructor::materialize`] has completed.
    pub fn is_materialized(&self) -> bool {
        self.materialized
    }

    /// The batches, rewritten once materialized.
    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    /// Schema of the first batch, if any.
    pub fn schema(&self) -> Option<SchemaRef> {
        self.batches.first().map(RecordBatch::schema)
    }

    /// Schema of every batch, in order.
    pub fn schemas(&self) -> Vec<SchemaRef> {
        self.batches.iter().map(RecordBatch::schema).collect()
    }

    /// Hand the batches over, rewritten or not.
    pub fn into_batches(self) -> Vec<RecordBatch> {
        self.batches
    }
}

fn rewrite_batch(
    index: usize,
    batch: &RecordBatch,
    ctx: &ConverterContext,
) -> Result<RecordBatch, ConvertError> {
    let schema = batch.schema();
    let mut fields: Vec<FieldRef> = Vec::with_capacity(batch.num_columns());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(batch.num_columns());
    let mut changed = 0usize;
    for (column, (field, array)) in schema.fields().iter().zip(batch.columns()).enumerate() {
        let path = Path::new(column, field.name());
        match rewrite(field, array, ctx, &path)? {
            Some(new) => {
                debug!(
                    "batch {index}: column {column} ({path}) {} -> {}",
                    array.data_type(),
                    new.data_type()
                );
                fields.push(with_type(field, new.data_type()));
                columns.push(new);
                changed += 1;
            }
            None => {
                fields.push(Arc::clone(field));
                columns.push(Arc::clone(array));
            }
        }
    }
    debug!(
        "batch {index}: {} rows, rewrote {changed} of {} columns",
        batch.num_rows(),
        batch.num_columns()
    );
    let schema = Schema::new_with_metadata(fields, schema.metadata().clone());
    Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
}

fn with_type(field: &FieldRef, data_type: &DataType) -> FieldRef {
    Arc::new(field.as_ref().clone().with_data_type(data_type.clone()))
}

/// Rewrite one column, or `None` when it can be kept as is.
fn rewrite(
    field: &Field,
    array: &ArrayRef,
    ctx: &ConverterContext,
    path: &Path,
) -> Result<Option<ArrayRef>, ConvertError> {
    let meta = ColumnMeta::read(field, path)?;
    let dt = array.data_type();
    if !meta.logical.accepts(dt) {
        error!(
            "cannot rewrite {} over {dt} at column {} ({path})",
            meta.logical, path.column
        );
        return Err(ConvertError::not_supported(path, meta.logical, dt));
    }
    let rewritten = match meta.logical {
        LogicalType::Fixed if meta.scale > 0 && !matches!(dt, DataType::Decimal128(_, _)) => {
            Some(fixed::rewrite_fixed(
                array,
                meta.scale,
                ctx.options().number_to_decimal,
                path,
            )?)
        }
        LogicalType::Time => Some(temporal::rewrite_time(array, meta.scale, path)?),
        LogicalType::TimestampNtz | LogicalType::TimestampLtz | LogicalType::TimestampTz => {
            Some(temporal::rewrite_timestamp(array, &meta, ctx, path)?)
        }
        LogicalType::Array if !is_string(dt) => rewrite_list(array, ctx, path)?,
        LogicalType::Object if !is_string(dt) => rewrite_struct(array, ctx, path)?,
        LogicalType::Map => rewrite_map(array, ctx, path)?,
        _ => None,
    };
    Ok(rewritten)
}

fn rewrite_list(
    array: &ArrayRef,
    ctx: &ConverterContext,
    path: &Path,
) -> Result<Option<ArrayRef>, ConvertError> {
    let list = downcast::<ListArray>(array.as_ref(), "list", path)?;
    let DataType::List(item_field) = list.data_type() else {
        return Err(ConvertError::schema(path, "ARRAY requires a list with one item child"));
    };
    let Some(values) = rewrite(item_field, list.values(), ctx, &path.push_item())? else {
        return Ok(None);
    };
    let rebuilt = ListArray::try_new(
        with_type(item_field, values.data_type()),
        list.offsets().clone(),
        values,
        list.nulls().cloned(),
    )?;
    Ok(Some(Arc::new(rebuilt)))
}

fn rewrite_struct(
    array: &ArrayRef,
    ctx: &ConverterContext,
    path: &Path,
) -> Result<Option<ArrayRef>, ConvertError> {
    let structure = downcast::<StructArray>(array.as_ref(), "struct", path)?;
    match rewrite_children(structure, ctx, path, |field| path.push_field(field.name()))? {
        Some((fields, columns)) => Ok(Some(Arc::new(StructArray::try_new(
            fields,
            columns,
            structure.nulls().cloned(),
        )?))),
        None => Ok(None),
    }
}

fn rewrite_map(
    array: &ArrayRef,
    ctx: &ConverterContext,
    path: &Path,
) -> Result<Option<ArrayRef>, ConvertError> {
    let map = downcast::<MapArray>(array.as_ref(), "map", path)?;
    let DataType::Map(entries_field, ordered) = map.data_type() else {
        return Err(ConvertError::schema(path, "MAP requires an Arrow map column"));
    };
    let entries = map.entries();
    if entries.num_columns() != 2 {
        return Err(ConvertError::schema(
            path,
            format!(
                "map entries must have a key and a value child, found {}",
                entries.num_columns()
            ),
        ));
    }
    let mut position = 0;
    let child_path = |_: &Field| {
        position += 1;
        if position == 1 {
            path.push_key()
        } else {
            path.push_value()
        }
    };
    let Some((fields, columns)) = rewrite_children(entries, ctx, path, child_path)? else {
        return Ok(None);
    };
    let entries = StructArray::try_new(fields.clone(), columns, entries.nulls().cloned())?;
    let rebuilt = MapArray::try_new(
        with_type(entries_field, &DataType::Struct(fields)),
        map.offsets().clone(),
        entries,
        map.nulls().cloned(),
        *ordered,
    )?;
    Ok(Some(Arc::new(rebuilt)))
}

/// Rewrite the children of `structure`; `None` when none of them changed.
fn rewrite_children(
    structure: &StructArray,
    ctx: &ConverterContext,
    path: &Path,
    mut child_path: impl FnMut(&Field) -> Path,
) -> Result<Option<(Fields, Vec<ArrayRef>)>, ConvertError> {
    let mut fields: Vec<FieldRef> = Vec::with_capacity(structure.num_columns());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(structure.num_columns());
    let mut changed = false;
    for (field, column) in structure.fields().iter().zip(structure.columns()) {
        match rewrite(field, column, ctx, &child_path(field.as_ref()))? {
            Some(new) => {
                fields.push(with_type(field, new.data_type()));
                columns.push(new);
                changed = true;
            }
            None => {
                fields.push(Arc::clone(field));
                columns.push(Arc::clone(column));
            }
        }
    }
    if !changed {
        return Ok(None);
    }
    debug!("column {} ({path}): rebuilt nested children", path.column);
    Ok(Some((Fields::from(fields), columns)))
}
