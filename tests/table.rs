use std::{collections::HashMap, sync::Arc};

use arrow_array::{
    Array, ArrayRef, BooleanArray, Decimal128Array, Float64Array, Int32Array, Int64Array,
    ListArray, MapArray, RecordBatch, StringArray, StructArray, Time32MillisecondArray,
    TimestampMicrosecondArray, TimestampNanosecondArray,
};
use arrow_buffer::{NullBuffer, OffsetBuffer};
use arrow_ipc::writer::StreamWriter;
use arrow_logical::{ConvertError, ConvertOptions, TableReconstructor};
use arrow_schema::{DataType, Field, Fields, Schema, TimeUnit};
use pretty_assertions::assert_eq;

fn tagged(name: &str, dt: DataType, entries: &[(&str, &str)]) -> Field {
    let metadata: HashMap<String, String> = entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Field::new(name, dt, true).with_metadata(metadata)
}

fn ledger_batch(amounts: Vec<Option<i64>>) -> RecordBatch {
    let rows = amounts.len();
    let schema = Schema::new(vec![
        tagged(
            "amount",
            DataType::Int64,
            &[("logicalType", "FIXED"), ("scale", "2")],
        ),
        tagged(
            "booked",
            DataType::Int32,
            &[("logicalType", "TIME"), ("scale", "3")],
        ),
        tagged("memo", DataType::Utf8, &[("logicalType", "TEXT")]),
    ]);
    RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(Int64Array::from(amounts)) as ArrayRef,
            Arc::new(Int32Array::from(vec![3_600_000; rows])) as ArrayRef,
            Arc::new(StringArray::from(vec!["m"; rows])) as ArrayRef,
        ],
    )
    .unwrap()
}

fn to_ipc(batches: &[RecordBatch]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut writer = StreamWriter::try_new(&mut buf, &batches[0].schema()).unwrap();
        for batch in batches {
            writer.write(batch).unwrap();
        }
        writer.finish().unwrap();
    }
    buf
}

#[test]
fn materialize_runs_once() {
    let batches = vec![
        Ok(ledger_batch(vec![Some(150), None])),
        Ok(ledger_batch(vec![Some(-1)])),
    ];
    let mut table = TableReconstructor::new(batches, &ConvertOptions::new()).unwrap();
    assert!(!table.is_materialized());
    assert!(table.materialize().unwrap());
    assert!(table.is_materialized());

    let first = Arc::clone(table.batches()[0].column(0));
    assert!(!table.materialize().unwrap());
    assert!(Arc::ptr_eq(table.batches()[0].column(0), &first));

    let schemas = table.schemas();
    assert_eq!(schemas.len(), 2);
    for schema in &schemas {
        assert_eq!(schema.field(0).data_type(), &DataType::Float64);
        assert_eq!(
            schema.field(1).data_type(),
            &DataType::Time32(TimeUnit::Millisecond)
        );
        assert_eq!(schema.field(2).data_type(), &DataType::Utf8);
    }

    let batches = table.into_batches();
    let amounts = batches[1]
        .column(0)
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap();
    assert_eq!(amounts.value(0), -0.01);
    let booked = batches[0]
        .column(1)
        .as_any()
        .downcast_ref::<Time32MillisecondArray>()
        .unwrap();
    assert_eq!(booked.value(1), 3_600_000);
}

#[test]
fn number_to_decimal_keeps_exact_values() {
    let options = ConvertOptions::new().with_number_to_decimal(true);
    let mut table =
        TableReconstructor::new(vec![Ok(ledger_batch(vec![Some(150), None]))], &options).unwrap();
    table.materialize().unwrap();
    let column = table.batches()[0].column(0);
    assert_eq!(column.data_type(), &DataType::Decimal128(38, 2));
    let decimals = column.as_any().downcast_ref::<Decimal128Array>().unwrap();
    assert_eq!(decimals.value_as_string(0), "1.50");
    assert!(decimals.is_null(1));
}

#[test]
fn ipc_input_is_collected_and_rewritten() {
    let bytes = to_ipc(&[ledger_batch(vec![Some(1)]), ledger_batch(vec![Some(2), Some(3)])]);
    let mut table = TableReconstructor::from_ipc_bytes(&bytes, &ConvertOptions::new()).unwrap();
    assert_eq!(table.batches().len(), 2);
    assert!(table.materialize().unwrap());
    let total: usize = table.batches().iter().map(RecordBatch::num_rows).sum();
    assert_eq!(total, 3);
    assert_eq!(
        table.schema().unwrap().field(0).data_type(),
        &DataType::Float64
    );
}

fn wide_ntz_batch(epoch: i64, fraction: i32) -> RecordBatch {
    let fields = Fields::from(vec![
        Field::new("epoch", DataType::Int64, true),
        Field::new("fraction", DataType::Int32, true),
    ]);
    let split = StructArray::try_new(
        fields,
        vec![
            Arc::new(Int64Array::from(vec![1, epoch])) as ArrayRef,
            Arc::new(Int32Array::from(vec![5, fraction])) as ArrayRef,
        ],
        None,
    )
    .unwrap();
    let schema = Schema::new(vec![tagged(
        "at",
        split.data_type().clone(),
        &[("logicalType", "TIMESTAMP_NTZ"), ("scale", "9")],
    )]);
    RecordBatch::try_new(Arc::new(schema), vec![Arc::new(split) as ArrayRef]).unwrap()
}

#[test]
fn in_range_nanoseconds_stay_nanoseconds() {
    let mut table =
        TableReconstructor::new(vec![Ok(wide_ntz_batch(2, 7))], &ConvertOptions::new()).unwrap();
    table.materialize().unwrap();
    let column = table.batches()[0].column(0);
    assert_eq!(
        column.data_type(),
        &DataType::Timestamp(TimeUnit::Nanosecond, None)
    );
    let nanos = column
        .as_any()
        .downcast_ref::<TimestampNanosecondArray>()
        .unwrap();
    assert_eq!(nanos.values().to_vec(), vec![1_000_000_005, 2_000_000_007]);
}

#[test]
fn far_epochs_downgrade_the_column_to_micros() {
    let far = i64::MAX / 1_000_000_000 + 1;
    let mut table =
        TableReconstructor::new(vec![Ok(wide_ntz_batch(far, 2_000))], &ConvertOptions::new())
            .unwrap();
    assert!(table.materialize().unwrap());
    let micros = table.batches()[0]
        .column(0)
        .as_any()
        .downcast_ref::<TimestampMicrosecondArray>()
        .unwrap();
    assert_eq!(micros.value(0), 1_000_000);
    assert_eq!(micros.value(1), far * 1_000_000 + 2);
}

#[test]
fn far_epoch_with_sub_micro_fraction_fails_without_replacing() {
    let far = i64::MAX / 1_000_000_000 + 1;
    let batches = vec![Ok(ledger_batch(vec![Some(1)])), Ok(wide_ntz_batch(far, 1))];
    let mut table = TableReconstructor::new(batches, &ConvertOptions::new()).unwrap();
    let err = table.materialize().unwrap_err();
    assert!(matches!(err, ConvertError::Value { .. }));
    assert!(!table.is_materialized());
    assert_eq!(table.batches()[0].column(0).data_type(), &DataType::Int64);
}

#[test]
fn nested_list_and_map_children_are_rewritten() {
    let item = tagged(
        "item",
        DataType::Int64,
        &[("logicalType", "TIMESTAMP_LTZ"), ("scale", "6")],
    );
    let list = ListArray::try_new(
        Arc::new(item),
        OffsetBuffer::new(vec![0, 1, 1].into()),
        Arc::new(Int64Array::from(vec![1_500_000])),
        Some(NullBuffer::from(vec![true, false])),
    )
    .unwrap();

    let entry_fields = Fields::from(vec![
        Field::new("key", DataType::Utf8, false)
            .with_metadata(HashMap::from([("logicalType".into(), "TEXT".into())])),
        tagged(
            "value",
            DataType::Int64,
            &[("logicalType", "FIXED"), ("scale", "1")],
        ),
    ]);
    let entries = StructArray::try_new(
        entry_fields.clone(),
        vec![
            Arc::new(StringArray::from(vec!["a", "b"])) as ArrayRef,
            Arc::new(Int64Array::from(vec![Some(25), None])) as ArrayRef,
        ],
        None,
    )
    .unwrap();
    let map = MapArray::try_new(
        Arc::new(Field::new("entries", DataType::Struct(entry_fields), false)),
        OffsetBuffer::new(vec![0, 2, 2].into()),
        entries,
        None,
        false,
    )
    .unwrap();
    let flags = BooleanArray::from(vec![true, false]);

    let schema = Schema::new(vec![
        tagged("times", list.data_type().clone(), &[("logicalType", "ARRAY")]),
        tagged("scores", map.data_type().clone(), &[("logicalType", "MAP")]),
        tagged("flag", DataType::Boolean, &[("logicalType", "BOOLEAN")]),
    ]);
    let batch = RecordBatch::try_new(
        Arc::new(schema),
        vec![Arc::new(list), Arc::new(map), Arc::new(flags)],
    )
    .unwrap();
    let flag = Arc::clone(batch.column(2));

    let options = ConvertOptions::new().with_session_time_zone("America/New_York");
    let mut table = TableReconstructor::new(vec![Ok(batch)], &options).unwrap();
    table.materialize().unwrap();
    let out = &table.batches()[0];

    let times = out.column(0).as_any().downcast_ref::<ListArray>().unwrap();
    assert_eq!(
        times.values().data_type(),
        &DataType::Timestamp(TimeUnit::Microsecond, Some("America/New_York".into()))
    );
    assert!(times.is_null(1));

    let scores = out.column(1).as_any().downcast_ref::<MapArray>().unwrap();
    let values = scores
        .values()
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap();
    assert_eq!(values.value(0), 2.5);
    assert!(values.is_null(1));
    assert_eq!(scores.keys().data_type(), &DataType::Utf8);

    assert!(Arc::ptr_eq(out.column(2), &flag));
}
