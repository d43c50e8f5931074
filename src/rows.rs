//! Row-mode iteration over a stream of annotated record batches.

use arrow_array::RecordBatch;
use arrow_schema::ArrowError;
use log::debug;

use crate::{
    ConvertError, ConvertOptions, ConverterContext, RowShape, Value,
    convert::{ColumnConverter, Converter, build_column},
};

type BatchStream = Box<dyn Iterator<Item = Result<RecordBatch, ArrowError>>>;

/// One decoded row.
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    /// Values in schema order.
    Positional(Vec<Option<Value>>),
    /// `(field name, value)` pairs in schema order.
    Named(Vec<(String, Option<Value>)>),
}

impl Row {
    /// Number of columns.
    pub fn len(&self) -> usize {
        match self {
            Row::Positional(values) => values.len(),
            Row::Named(values) => values.len(),
        }
    }

    /// Returns true when the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value of the column at `index`; the inner `None` is a null cell.
    pub fn get(&self, index: usize) -> Option<&Option<Value>> {
        match self {
            Row::Positional(values) => values.get(index),
            Row::Named(values) => values.get(index).map(|(_, v)| v),
        }
    }

    /// Value of the column called `name`. Always `None` for positional rows.
    pub fn get_named(&self, name: &str) -> Option<&Option<Value>> {
        match self {
            Row::Positional(_) => None,
            Row::Named(values) => values.iter().find(|(n, _)| n == name).map(|(_, v)| v),
        }
    }

    /// Drop the names and keep the values in schema order.
    pub fn into_values(self) -> Vec<Option<Value>> {
        match self {
            Row::Positional(values) => values,
            Row::Named(values) => values.into_iter().map(|(_, v)| v).collect(),
        }
    }
}

#[derive(Debug)]
struct BatchState {
    index: usize,
    row: usize,
    rows: usize,
    names: Vec<String>,
    converters: Vec<Converter>,
}

impl BatchState {
    fn decode(&self, row: usize, shape: RowShape) -> Result<Row, ConvertError> {
        let values = self
            .converters
            .iter()
            .map(|c| c.convert(row))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(match shape {
            RowShape::Positional => Row::Positional(values),
            RowShape::Named => Row::Named(self.names.iter().cloned().zip(values).collect()),
        })
    }
}

#[derive(Debug)]
enum State {
    BeforeFirstBatch,
    InBatch(BatchState),
    Exhausted,
}

/// Pull-based iterator yielding one [`Row`] at a time.
///
/// A converter tree is built for every column when a batch is entered and
/// reused for all of that batch's rows. Any error ends the iteration.
pub struct RowIterator {
    batches: BatchStream,
    ctx: ConverterContext,
    shape: RowShape,
    state: State,
    batches_seen: usize,
}

impl std::fmt::Debug for RowIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowIterator")
            .field("ctx", &self.ctx)
            .field("shape", &self.shape)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl RowIterator {
    /// Iterate the rows of `batches` with `options`.
    ///
    /// # Errors
    /// Returns `ConvertError::Config` if the options do not resolve.
    pub fn new<I>(batches: I, options: &ConvertOptions) -> Result<Self, ConvertError>
    where
        I: IntoIterator<Item = Result<RecordBatch, ArrowError>>,
        I::IntoIter: 'static,
    {
        Ok(Self::with_context(batches, ConverterContext::new(options)?))
    }

    /// Iterate the rows of `batches` with an already resolved context.
    pub fn with_context<I>(batches: I, ctx: ConverterContext) -> Self
    where
        I: IntoIterator<Item = Result<RecordBatch, ArrowError>>,
        I::IntoIter: 'static,
    {
        let shape = ctx.options().row_shape;
        debug!("row iterator created, shape {shape:?}");
        Self {
            batches: Box::new(batches.into_iter()),
            ctx,
            shape,
            state: State::BeforeFirstBatch,
            batches_seen: 0,
        }
    }

    /// Iterate the rows of an Arrow IPC stream.
    ///
    /// # Errors
    /// Returns `ConvertError::Arrow` if the stream header cannot be read, or
    /// `ConvertError::Config` if the options do not resolve.
    #[cfg(feature = "ipc")]
    pub fn from_ipc_bytes(bytes: Vec<u8>, options: &ConvertOptions) -> Result<Self, ConvertError> {
        let reader = crate::source::ipc_stream(bytes)?;
        Self::new(reader, options)
    }

    /// Number of batches entered so far.
    pub fn batches_seen(&self) -> usize {
        self.batches_seen
    }

    fn enter(&mut self, batch: RecordBatch) -> Result<BatchState, ConvertError> {
        let index = self.batches_seen;
        self.batches_seen += 1;
        debug!(
            "row iterator entering batch {index}: {} rows, {} columns",
            batch.num_rows(),
            batch.num_columns()
        );
        let schema = batch.schema();
        let converters = schema
            .fields()
            .iter()
            .zip(batch.columns())
            .enumerate()
            .map(|(column, (field, array))| build_column(column, field, array, &self.ctx))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(BatchState {
            index,
            row: 0,
            rows: batch.num_rows(),
            names: schema.fields().iter().map(|f| f.name().clone()).collect(),
            converters,
        })
    }
}

impl Iterator for RowIterator {
    type Item = Result<Row, ConvertError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match &mut self.state {
                State::Exhausted => return None,
                State::InBatch(batch) if batch.row < batch.rows => {
                    let row = batch.row;
                    batch.row += 1;
                    let result = batch.decode(row, self.shape);
                    if result.is_err() {
                        self.state = State::Exhausted;
                    }
                    return Some(result);
                }
                State::InBatch(_) | State::BeforeFirstBatch => {}
            }
            if let State::InBatch(done) = &self.state {
                debug!("row iterator finished batch {} ({} rows)", done.index, done.rows);
            }
            let next = match self.batches.next() {
                None => {
                    self.state = State::Exhausted;
                    return None;
                }
                Some(Err(e)) => Err(ConvertError::from(e)),
                Some(Ok(batch)) => self.enter(batch),
            };
            match next {
                Ok(state) => self.state = State::InBatch(state),
                Err(e) => {
                    self.state = State::Exhausted;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc};

    use arrow_array::{ArrayRef, Int64Array, RecordBatch, StringArray};
    use arrow_schema::{ArrowError, DataType, Field, Schema};
    use pretty_assertions::assert_eq;

    use super::{Row, RowIterator};
    use crate::{ConvertError, ConvertOptions, RowShape, Value};

    fn tagged(name: &str, dt: DataType, tag: &str) -> Field {
        Field::new(name, dt, true)
            .with_metadata(HashMap::from([("logicalType".to_string(), tag.to_string())]))
    }

    fn batch(ids: Vec<Option<i64>>, names: Vec<Option<&str>>) -> RecordBatch {
        let schema = Schema::new(vec![
            tagged("id", DataType::Int64, "FIXED"),
            tagged("name", DataType::Utf8, "TEXT"),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Int64Array::from(ids)) as ArrayRef,
                Arc::new(StringArray::from(names)) as ArrayRef,
            ],
        )
        .unwrap()
    }

    #[test]
    fn walks_batches_in_order() {
        let batches = vec![
            Ok(batch(vec![Some(1), Some(2)], vec![Some("a"), None])),
            Ok(batch(vec![], vec![])),
            Ok(batch(vec![None], vec![Some("c")])),
        ];
        let mut rows = RowIterator::new(batches, &ConvertOptions::new()).unwrap();
        let collected: Vec<Row> = rows.by_ref().collect::<Result<_, _>>().unwrap();
        assert_eq!(
            collected,
            vec![
                Row::Positional(vec![Some(Value::Int(1)), Some(Value::Text("a".into()))]),
                Row::Positional(vec![Some(Value::Int(2)), None]),
                Row::Positional(vec![None, Some(Value::Text("c".into()))]),
            ]
        );
        assert_eq!(rows.batches_seen(), 3);
        assert!(rows.next().is_none());
    }

    #[test]
    fn named_rows_keep_nulls_in_schema_order() {
        let options = ConvertOptions::new().with_row_shape(RowShape::Named);
        let mut rows =
            RowIterator::new(vec![Ok(batch(vec![Some(7)], vec![None]))], &options).unwrap();
        let row = rows.next().unwrap().unwrap();
        assert_eq!(
            row,
            Row::Named(vec![
                ("id".to_string(), Some(Value::Int(7))),
                ("name".to_string(), None),
            ])
        );
        assert_eq!(row.get_named("name"), Some(&None));
        assert_eq!(row.into_values(), vec![Some(Value::Int(7)), None]);
    }

    #[test]
    fn errors_end_the_iteration() {
        let batches = vec![
            Err(ArrowError::IpcError("truncated".into())),
            Ok(batch(vec![Some(1)], vec![Some("a")])),
        ];
        let mut rows = RowIterator::new(batches, &ConvertOptions::new()).unwrap();
        assert!(matches!(rows.next(), Some(Err(ConvertError::Arrow(_)))));
        assert!(rows.next().is_none());
    }

    #[test]
    fn schema_errors_surface_on_batch_entry() {
        let schema = Schema::new(vec![Field::new("raw", DataType::Int64, true)]);
        let bad = RecordBatch::try_new(
            Arc::new(schema),
            vec![Arc::new(Int64Array::from(vec![1])) as ArrayRef],
        )
        .unwrap();
        let mut rows = RowIterator::new(vec![Ok(bad)], &ConvertOptions::new()).unwrap();
        let err = rows.next().unwrap().unwrap_err();
        assert!(err.is_column_scoped());
        assert!(err.to_string().contains("missing 'logicalType'"));
        assert!(rows.next().is_none());
    }
}
