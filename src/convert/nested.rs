use arrow_array::{
    Array, ArrayRef, FixedSizeListArray, Float32Array, Float64Array, ListArray, MapArray,
    StructArray,
};
use arrow_buffer::NullBuffer;
use arrow_schema::DataType;

use super::{ColumnConverter, Converter, build, downcast, is_null_at};
use crate::{
    ConvertError, ConverterContext, LogicalType, Value,
    column::IntColumn,
    logical::is_signed_int,
    path::Path,
};

/// Structured ARRAY over a `List` column.
#[derive(Debug)]
pub struct ArrayConverter {
    list: ListArray,
    item: Box<Converter>,
}

impl ArrayConverter {
    pub(crate) fn try_new(
        array: &ArrayRef,
        ctx: &ConverterContext,
        path: &Path,
    ) -> Result<Self, ConvertError> {
        let list = downcast::<ListArray>(array.as_ref(), "list", path)?.clone();
        let DataType::List(item_field) = list.data_type() else {
            return Err(ConvertError::schema(path, "ARRAY requires a list with one item child"));
        };
        let item = build(item_field, list.values(), ctx, &path.push_item())?;
        Ok(Self {
            list,
            item: Box::new(item),
        })
    }
}

impl ColumnConverter for ArrayConverter {
    fn convert(&self, row: usize) -> Result<Option<Value>, ConvertError> {
        if self.list.is_null(row) {
            return Ok(None);
        }
        let offsets = self.list.value_offsets();
        let (start, end) = (offsets[row] as usize, offsets[row + 1] as usize);
        let items = (start..end)
            .map(|i| self.item.convert(i))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(Value::Array(items)))
    }
}

/// MAP over an Arrow `Map` column with a two-child entries struct.
#[derive(Debug)]
pub struct MapConverter {
    map: MapArray,
    key: Box<Converter>,
    value: Box<Converter>,
    path: String,
}

impl MapConverter {
    pub(crate) fn try_new(
        array: &ArrayRef,
        ctx: &ConverterContext,
        path: &Path,
    ) -> Result<Self, ConvertError> {
        let map = downcast::<MapArray>(array.as_ref(), "map", path)?.clone();
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
        let fields = entries.fields();
        let key = build(&fields[0], map.keys(), ctx, &path.push_key())?;
        let value = build(&fields[1], map.values(), ctx, &path.push_value())?;
        Ok(Self {
            map,
            key: Box::new(key),
            value: Box::new(value),
            path: path.into(),
        })
    }
}

impl ColumnConverter for MapConverter {
    fn convert(&self, row: usize) -> Result<Option<Value>, ConvertError> {
        if self.map.is_null(row) {
            return Ok(None);
        }
        let offsets = self.map.value_offsets();
        let (start, end) = (offsets[row] as usize, offsets[row + 1] as usize);
        let mut entries: Vec<(Value, Option<Value>)> = Vec::with_capacity(end - start);
        for i in start..end {
            let key = self.key.convert(i)?.ok_or_else(|| {
                ConvertError::value(&self.path, format!("null key in map entry {i}"))
            })?;
            let value = self.value.convert(i)?;
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = value,
                None => entries.push((key, value)),
            }
        }
        Ok(Some(Value::Map(entries)))
    }
}

/// Structured OBJECT over a `Struct` column.
#[derive(Debug)]
pub struct ObjectConverter {
    nulls: Option<NullBuffer>,
    children: Vec<(String, Converter)>,
}

impl ObjectConverter {
    pub(crate) fn try_new(
        array: &ArrayRef,
        ctx: &ConverterContext,
        path: &Path,
    ) -> Result<Self, ConvertError> {
        let structure = downcast::<StructArray>(array.as_ref(), "struct", path)?;
        let children = structure
            .fields()
            .iter()
            .zip(structure.columns())
            .map(|(field, column)| {
                let child = build(field, column, ctx, &path.push_field(field.name()))?;
                Ok((field.name().clone(), child))
            })
            .collect::<Result<Vec<_>, ConvertError>>()?;
        Ok(Self {
            nulls: structure.nulls().cloned(),
            children,
        })
    }

    /// Names of the decoded children, in schema order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(|(name, _)| name.as_str())
    }
}

impl ColumnConverter for ObjectConverter {
    fn convert(&self, row: usize) -> Result<Option<Value>, ConvertError> {
        if is_null_at(self.nulls.as_ref(), row) {
            return Ok(None);
        }
        let fields = self
            .children
            .iter()
            .map(|(name, child)| Ok((name.clone(), child.convert(row)?)))
            .collect::<Result<Vec<_>, ConvertError>>()?;
        Ok(Some(Value::Object(fields)))
    }
}

#[derive(Debug)]
enum Elements {
    Int(IntColumn),
    F32(Float32Array),
    F64(Float64Array),
}

impl Elements {
    fn get(&self, i: usize) -> Option<Value> {
        match self {
            Elements::Int(c) => c.get(i).map(Value::Int),
            Elements::F32(a) => a.is_valid(i).then(|| Value::Float(f64::from(a.value(i)))),
            Elements::F64(a) => a.is_valid(i).then(|| Value::Float(a.value(i))),
        }
    }
}

/// VECTOR over a `FixedSizeList` of integers or floats.
#[derive(Debug)]
pub struct VectorConverter {
    list: FixedSizeListArray,
    elements: Elements,
    path: String,
}

impl VectorConverter {
    pub(crate) fn try_new(array: &ArrayRef, path: &Path) -> Result<Self, ConvertError> {
        let list = downcast::<FixedSizeListArray>(array.as_ref(), "fixed-size list", path)?.clone();
        let values = list.values();
        let item_path = path.push_item();
        let elements = match values.data_type() {
            dt if is_signed_int(dt) => Elements::Int(IntColumn::try_new(values, &item_path)?),
            DataType::Float32 => Elements::F32(
                downcast::<Float32Array>(values.as_ref(), "float32", &item_path)?.clone(),
            ),
            DataType::Float64 => Elements::F64(
                downcast::<Float64Array>(values.as_ref(), "float64", &item_path)?.clone(),
            ),
            other => {
                return Err(ConvertError::not_supported(
                    &item_path,
                    LogicalType::Vector,
                    other,
                ));
            }
        };
        Ok(Self {
            list,
            elements,
            path: path.into(),
        })
    }

    /// Elements per row.
    pub fn dimension(&self) -> usize {
        self.list.value_length() as usize
    }
}

impl ColumnConverter for VectorConverter {
    fn convert(&self, row: usize) -> Result<Option<Value>, ConvertError> {
        if self.list.is_null(row) {
            return Ok(None);
        }
        let start = self.list.value_offset(row) as usize;
        let elements = (start..start + self.dimension())
            .map(|i| {
                self.elements.get(i).ok_or_else(|| {
                    ConvertError::value(&self.path, format!("null vector element at {i}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(Value::Vector(elements)))
    }
}
