//! # Apache Arrow Integration
//!
//! Conversions between Series/DataFrame and arrow arrays/record batches.
//! Values are copied into engine storage on the way in and out. Timestamps
//! coming from arrow are normalized to milliseconds and their timezone is
//! dropped, with a warning.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, BinaryArray, BooleanArray, Date32Array, Decimal128Array,
    DictionaryArray, DurationMicrosecondArray, DurationMillisecondArray,
    DurationNanosecondArray, Float32Array, Float64Array, Int16Array, Int32Array, Int64Array,
    Int8Array, ListArray, StringArray, StructArray, Time64NanosecondArray,
    TimestampMicrosecondArray, TimestampMillisecondArray, TimestampNanosecondArray,
    UInt16Array, UInt32Array, UInt64Array, UInt8Array,
};
use arrow::buffer::{NullBuffer, OffsetBuffer, ScalarBuffer};
use arrow::datatypes::{
    ArrowPrimitiveType, DataType as ArrowDataType, Date32Type, Decimal128Type,
    DurationMicrosecondType, DurationMillisecondType, DurationNanosecondType,
    DurationSecondType, Field as ArrowField, Fields, Float32Type, Float64Type, Int16Type,
    Int32Type, Int64Type, Int8Type, Schema, Time32MillisecondType, Time32SecondType,
    Time64MicrosecondType, Time64NanosecondType, TimeUnit as ArrowTimeUnit,
    TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow::record_batch::RecordBatch;

use crate::column::{ChunkedArray, PhysicalData};
use crate::core::dtype::{DataType, TimeUnit};
use crate::core::error::{Error, Result};
use crate::dataframe::DataFrame;
use crate::series::construction::normalize_timestamps;
use crate::series::Series;

fn unsupported(dtype: &ArrowDataType) -> Error {
    Error::TypeMismatch(format!("arrow type {} is not supported", dtype))
}

fn downcast_failed(dtype: &ArrowDataType) -> Error {
    Error::TypeMismatch(format!("arrow array does not match its type {}", dtype))
}

fn primitive<T: ArrowPrimitiveType>(array: &dyn Array) -> Result<Vec<Option<T::Native>>> {
    Ok(array
        .as_primitive_opt::<T>()
        .ok_or_else(|| downcast_failed(array.data_type()))?
        .iter()
        .collect())
}

/// Values widened to i64 and multiplied by `factor`
fn scaled<T>(array: &dyn Array, factor: i64) -> Result<ChunkedArray<i64>>
where
    T: ArrowPrimitiveType,
    T::Native: Into<i64>,
{
    Ok(primitive::<T>(array)?
        .into_iter()
        .map(|v| v.map(|v| v.into() * factor))
        .collect())
}

fn logical(name: &str, dtype: DataType, data: PhysicalData) -> Series {
    Series::from_physical_unchecked(name, dtype, data)
}

/// Seconds have no engine unit; their ticks are scaled to milliseconds
fn engine_time_unit(unit: &ArrowTimeUnit) -> TimeUnit {
    match unit {
        ArrowTimeUnit::Second | ArrowTimeUnit::Millisecond => TimeUnit::Milliseconds,
        ArrowTimeUnit::Microsecond => TimeUnit::Microseconds,
        ArrowTimeUnit::Nanosecond => TimeUnit::Nanoseconds,
    }
}

fn timestamp_ticks(array: &dyn Array, unit: &ArrowTimeUnit) -> Result<ChunkedArray<i64>> {
    match unit {
        ArrowTimeUnit::Second => scaled::<TimestampSecondType>(array, 1_000),
        ArrowTimeUnit::Millisecond => scaled::<TimestampMillisecondType>(array, 1),
        ArrowTimeUnit::Microsecond => scaled::<TimestampMicrosecondType>(array, 1),
        ArrowTimeUnit::Nanosecond => scaled::<TimestampNanosecondType>(array, 1),
    }
}

fn duration_ticks(array: &dyn Array, unit: &ArrowTimeUnit) -> Result<ChunkedArray<i64>> {
    match unit {
        ArrowTimeUnit::Second => scaled::<DurationSecondType>(array, 1_000),
        ArrowTimeUnit::Millisecond => scaled::<DurationMillisecondType>(array, 1),
        ArrowTimeUnit::Microsecond => scaled::<DurationMicrosecondType>(array, 1),
        ArrowTimeUnit::Nanosecond => scaled::<DurationNanosecondType>(array, 1),
    }
}

impl Series {
    /// Series from one arrow array
    pub fn from_arrow(name: &str, array: &dyn Array) -> Result<Series> {
        let dtype = array.data_type();
        let s = match dtype {
            ArrowDataType::Null => Series::full_null(name, array.len(), &DataType::Float32),
            ArrowDataType::Boolean => {
                let values: Vec<Option<bool>> = array
                    .as_boolean_opt()
                    .ok_or_else(|| downcast_failed(dtype))?
                    .iter()
                    .collect();
                Series::new(name, values)
            }
            ArrowDataType::Int8 => Series::new(name, primitive::<Int8Type>(array)?),
            ArrowDataType::Int16 => Series::new(name, primitive::<Int16Type>(array)?),
            ArrowDataType::Int32 => Series::new(name, primitive::<Int32Type>(array)?),
            ArrowDataType::Int64 => Series::new(name, primitive::<Int64Type>(array)?),
            ArrowDataType::UInt8 => Series::new(name, primitive::<UInt8Type>(array)?),
            ArrowDataType::UInt16 => Series::new(name, primitive::<UInt16Type>(array)?),
            ArrowDataType::UInt32 => Series::new(name, primitive::<UInt32Type>(array)?),
            ArrowDataType::UInt64 => Series::new(name, primitive::<UInt64Type>(array)?),
            ArrowDataType::Float32 => Series::new(name, primitive::<Float32Type>(array)?),
            ArrowDataType::Float64 => Series::new(name, primitive::<Float64Type>(array)?),
            ArrowDataType::Utf8 => {
                let values: Vec<Option<&str>> = array
                    .as_string_opt::<i32>()
                    .ok_or_else(|| downcast_failed(dtype))?
                    .iter()
                    .collect();
                Series::new(name, values)
            }
            ArrowDataType::LargeUtf8 => {
                let values: Vec<Option<&str>> = array
                    .as_string_opt::<i64>()
                    .ok_or_else(|| downcast_failed(dtype))?
                    .iter()
                    .collect();
                Series::new(name, values)
            }
            ArrowDataType::Binary => {
                let ca: ChunkedArray<Vec<u8>> = array
                    .as_binary_opt::<i32>()
                    .ok_or_else(|| downcast_failed(dtype))?
                    .iter()
                    .map(|v| v.map(<[u8]>::to_vec))
                    .collect();
                Series::from_chunked(name, ca)
            }
            ArrowDataType::LargeBinary => {
                let ca: ChunkedArray<Vec<u8>> = array
                    .as_binary_opt::<i64>()
                    .ok_or_else(|| downcast_failed(dtype))?
                    .iter()
                    .map(|v| v.map(<[u8]>::to_vec))
                    .collect();
                Series::from_chunked(name, ca)
            }
            ArrowDataType::Date32 => {
                let days: ChunkedArray<i32> = primitive::<Date32Type>(array)?.into_iter().collect();
                logical(name, DataType::Date, PhysicalData::Int32(days))
            }
            ArrowDataType::Date64 => {
                let ms = primitive::<arrow::datatypes::Date64Type>(array)?;
                let days: ChunkedArray<i32> = ms
                    .into_iter()
                    .map(|v| v.map(|v| v.div_euclid(86_400_000) as i32))
                    .collect();
                logical(name, DataType::Date, PhysicalData::Int32(days))
            }
            ArrowDataType::Timestamp(unit, tz) => {
                let tu = engine_time_unit(unit);
                let ticks = timestamp_ticks(array, unit)?;
                let tz = tz.as_ref().map(|tz| tz.to_string());
                logical(name, DataType::Datetime(tu, tz), PhysicalData::Int64(ticks))
            }
            ArrowDataType::Duration(unit) => {
                let tu = engine_time_unit(unit);
                let ticks = duration_ticks(array, unit)?;
                logical(name, DataType::Duration(tu), PhysicalData::Int64(ticks))
            }
            ArrowDataType::Time32(unit) => {
                let nanos: ChunkedArray<i64> = match unit {
                    ArrowTimeUnit::Second => primitive::<Time32SecondType>(array)?
                        .into_iter()
                        .map(|v| v.map(|v| v as i64 * 1_000_000_000))
                        .collect(),
                    ArrowTimeUnit::Millisecond => primitive::<Time32MillisecondType>(array)?
                        .into_iter()
                        .map(|v| v.map(|v| v as i64 * 1_000_000))
                        .collect(),
                    _ => return Err(unsupported(dtype)),
                };
                logical(name, DataType::Time, PhysicalData::Int64(nanos))
            }
            ArrowDataType::Time64(unit) => {
                let nanos: ChunkedArray<i64> = match unit {
                    ArrowTimeUnit::Microsecond => primitive::<Time64MicrosecondType>(array)?
                        .into_iter()
                        .map(|v| v.map(|v| v * 1_000))
                        .collect(),
                    ArrowTimeUnit::Nanosecond => {
                        primitive::<Time64NanosecondType>(array)?.into_iter().collect()
                    }
                    _ => return Err(unsupported(dtype)),
                };
                logical(name, DataType::Time, PhysicalData::Int64(nanos))
            }
            ArrowDataType::Decimal128(precision, scale) => {
                if *scale < 0 {
                    return Err(unsupported(dtype));
                }
                let values: ChunkedArray<i128> =
                    primitive::<Decimal128Type>(array)?.into_iter().collect();
                logical(
                    name,
                    DataType::Decimal(Some(*precision as usize), *scale as usize),
                    PhysicalData::Decimal(values),
                )
            }
            ArrowDataType::Dictionary(_, value_type)
                if matches!(**value_type, ArrowDataType::Utf8 | ArrowDataType::LargeUtf8) =>
            {
                let decoded = arrow::compute::cast(array, &ArrowDataType::Utf8)?;
                Series::from_arrow(name, decoded.as_ref())?.cast(&DataType::Categorical)?
            }
            ArrowDataType::List(_) => {
                let list = array.as_list_opt::<i32>().ok_or_else(|| downcast_failed(dtype))?;
                let inner = Series::from_arrow("", list.values().as_ref())?;
                let rows = (0..list.len())
                    .map(|i| {
                        if list.is_null(i) {
                            Ok(None)
                        } else {
                            Series::from_arrow("", list.value(i).as_ref()).map(Some)
                        }
                    })
                    .collect::<Result<Vec<_>>>()?;
                Series::new_list(name, rows, Some(inner.dtype()))?
            }
            ArrowDataType::LargeList(_) => {
                let list = array.as_list_opt::<i64>().ok_or_else(|| downcast_failed(dtype))?;
                let inner = Series::from_arrow("", list.values().as_ref())?;
                let rows = (0..list.len())
                    .map(|i| {
                        if list.is_null(i) {
                            Ok(None)
                        } else {
                            Series::from_arrow("", list.value(i).as_ref()).map(Some)
                        }
                    })
                    .collect::<Result<Vec<_>>>()?;
                Series::new_list(name, rows, Some(inner.dtype()))?
            }
            ArrowDataType::Struct(fields) => {
                let st = array.as_struct_opt().ok_or_else(|| downcast_failed(dtype))?;
                if st.null_count() > 0 {
                    log::warn!(
                        "struct-level nulls of '{}' are not retained; field values are kept",
                        name
                    );
                }
                let columns = fields
                    .iter()
                    .zip(st.columns())
                    .map(|(f, col)| Series::from_arrow(f.name(), col.as_ref()))
                    .collect::<Result<Vec<_>>>()?;
                Series::new_struct(name, columns)?
            }
            other => return Err(unsupported(other)),
        };
        normalize_timestamps(s)
    }

    /// Series with one chunk per arrow array
    pub fn from_arrow_chunks(name: &str, chunks: &[ArrayRef]) -> Result<Series> {
        let mut iter = chunks.iter();
        let mut out = match iter.next() {
            Some(first) => Series::from_arrow(name, first.as_ref())?,
            None => return Ok(Series::new_empty(name, None)),
        };
        for chunk in iter {
            out.append(&Series::from_arrow(name, chunk.as_ref())?)?;
        }
        Ok(out)
    }

    /// Copy the values into a single arrow array
    pub fn to_arrow(&self) -> Result<ArrayRef> {
        let array: ArrayRef = match self.dtype() {
            DataType::Boolean => Arc::new(BooleanArray::from(self.bool()?.to_options())),
            DataType::Int8 => Arc::new(Int8Array::from(self.unpack::<i8>()?.to_options())),
            DataType::Int16 => Arc::new(Int16Array::from(self.unpack::<i16>()?.to_options())),
            DataType::Int32 => Arc::new(Int32Array::from(self.unpack::<i32>()?.to_options())),
            DataType::Int64 => Arc::new(Int64Array::from(self.unpack::<i64>()?.to_options())),
            DataType::UInt8 => Arc::new(UInt8Array::from(self.unpack::<u8>()?.to_options())),
            DataType::UInt16 => Arc::new(UInt16Array::from(self.unpack::<u16>()?.to_options())),
            DataType::UInt32 => Arc::new(UInt32Array::from(self.unpack::<u32>()?.to_options())),
            DataType::UInt64 => Arc::new(UInt64Array::from(self.unpack::<u64>()?.to_options())),
            DataType::Float32 => Arc::new(Float32Array::from(self.unpack::<f32>()?.to_options())),
            DataType::Float64 => Arc::new(Float64Array::from(self.unpack::<f64>()?.to_options())),
            DataType::Utf8 => Arc::new(StringArray::from(self.utf8()?.to_options())),
            DataType::Binary => {
                let values = self.unpack::<Vec<u8>>()?.to_options();
                Arc::new(BinaryArray::from_opt_vec(
                    values.iter().map(|v| v.as_deref()).collect(),
                ))
            }
            DataType::Date => Arc::new(Date32Array::from(self.unpack::<i32>()?.to_options())),
            DataType::Datetime(tu, tz) => {
                let ticks = self.unpack::<i64>()?.to_options();
                match tu {
                    TimeUnit::Milliseconds => Arc::new(
                        TimestampMillisecondArray::from(ticks).with_timezone_opt(tz.clone()),
                    ),
                    TimeUnit::Microseconds => Arc::new(
                        TimestampMicrosecondArray::from(ticks).with_timezone_opt(tz.clone()),
                    ),
                    TimeUnit::Nanoseconds => Arc::new(
                        TimestampNanosecondArray::from(ticks).with_timezone_opt(tz.clone()),
                    ),
                }
            }
            DataType::Duration(tu) => {
                let ticks = self.unpack::<i64>()?.to_options();
                match tu {
                    TimeUnit::Milliseconds => Arc::new(DurationMillisecondArray::from(ticks)),
                    TimeUnit::Microseconds => Arc::new(DurationMicrosecondArray::from(ticks)),
                    TimeUnit::Nanoseconds => Arc::new(DurationNanosecondArray::from(ticks)),
                }
            }
            DataType::Time => {
                Arc::new(Time64NanosecondArray::from(self.unpack::<i64>()?.to_options()))
            }
            DataType::Decimal(precision, scale) => {
                let precision = precision.unwrap_or(38).min(38) as u8;
                Arc::new(
                    Decimal128Array::from(self.unpack::<i128>()?.to_options())
                        .with_precision_and_scale(precision, *scale as i8)?,
                )
            }
            DataType::Categorical => {
                let utf8 = self.cast(&DataType::Utf8)?;
                let values = utf8.utf8()?.to_options();
                let dict: DictionaryArray<UInt32Type> =
                    values.iter().map(|v| v.as_deref()).collect();
                Arc::new(dict)
            }
            DataType::List(_) => self.list_to_arrow()?,
            DataType::Struct(_) => {
                let fields = self.struct_()?.fields();
                let arrays = fields
                    .iter()
                    .map(|s| s.to_arrow())
                    .collect::<Result<Vec<_>>>()?;
                let arrow_fields: Fields = fields
                    .iter()
                    .zip(&arrays)
                    .map(|(s, a)| ArrowField::new(s.name(), a.data_type().clone(), true))
                    .collect();
                Arc::new(StructArray::try_new(arrow_fields, arrays, None)?)
            }
            DataType::Object => {
                return Err(Error::TypeMismatch(format!(
                    "Object Series '{}' has no arrow representation",
                    self.name()
                )))
            }
        };
        Ok(array)
    }

    fn list_to_arrow(&self) -> Result<ArrayRef> {
        let rows = self.list()?.to_options();
        let inner_dtype = self.inner_dtype().cloned().unwrap_or(DataType::Float32);
        let mut values = Series::new_empty("item", Some(&inner_dtype));
        let mut offsets = Vec::with_capacity(rows.len() + 1);
        let mut validity = Vec::with_capacity(rows.len());
        offsets.push(0i32);
        for row in &rows {
            if let Some(inner) = row {
                values.append(&inner.cast(&inner_dtype)?)?;
            }
            validity.push(row.is_some());
            let end = i32::try_from(values.len()).map_err(|_| {
                Error::Overflow(format!("list Series '{}' exceeds i32 offsets", self.name()))
            })?;
            offsets.push(end);
        }
        let values = values.to_arrow()?;
        let field = Arc::new(ArrowField::new("item", values.data_type().clone(), true));
        let nulls = if validity.iter().all(|v| *v) {
            None
        } else {
            Some(NullBuffer::from(validity))
        };
        Ok(Arc::new(ListArray::try_new(
            field,
            OffsetBuffer::new(ScalarBuffer::from(offsets)),
            values,
            nulls,
        )?))
    }
}

impl DataFrame {
    /// DataFrame from one record batch
    pub fn from_record_batch(batch: &RecordBatch) -> Result<DataFrame> {
        let schema = batch.schema();
        let columns = schema
            .fields()
            .iter()
            .zip(batch.columns())
            .map(|(field, array)| Series::from_arrow(field.name(), array.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        DataFrame::new(columns)
    }

    /// DataFrame from several batches sharing a schema, one chunk per batch
    pub fn from_record_batches(batches: &[RecordBatch]) -> Result<DataFrame> {
        let mut iter = batches.iter();
        let mut out = match iter.next() {
            Some(first) => DataFrame::from_record_batch(first)?,
            None => return Ok(DataFrame::empty()),
        };
        for batch in iter {
            out.vstack_mut(&DataFrame::from_record_batch(batch)?)?;
        }
        Ok(out)
    }

    /// Copy the DataFrame into one record batch
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let arrays = self
            .get_columns()
            .iter()
            .map(Series::to_arrow)
            .collect::<Result<Vec<_>>>()?;
        let fields: Vec<ArrowField> = self
            .get_columns()
            .iter()
            .zip(&arrays)
            .map(|(s, a)| ArrowField::new(s.name(), a.data_type().clone(), true))
            .collect();
        let schema = Arc::new(Schema::new(fields));
        if arrays.is_empty() {
            return Ok(RecordBatch::new_empty(schema));
        }
        Ok(RecordBatch::try_new(schema, arrays)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nullable_ints_round_trip() {
        let array: ArrayRef = Arc::new(Int64Array::from(vec![Some(1), None, Some(3)]));
        let s = Series::from_arrow("a", array.as_ref()).unwrap();
        assert_eq!(s.null_count(), 1);
        let back = s.to_arrow().unwrap();
        assert_eq!(back.as_ref(), array.as_ref());
    }

    #[test]
    fn test_timestamps_normalized_to_ms() {
        let array = TimestampNanosecondArray::from(vec![Some(1_500_000_000i64), None])
            .with_timezone("Europe/Paris");
        let s = Series::from_arrow("ts", &array).unwrap();
        assert_eq!(s.dtype(), &DataType::Datetime(TimeUnit::Milliseconds, None));
        assert_eq!(s.unpack::<i64>().unwrap().to_options(), vec![Some(1_500), None]);
    }

    #[test]
    fn test_dictionary_becomes_categorical() {
        let dict: DictionaryArray<Int32Type> = vec!["a", "b", "a"].into_iter().collect();
        let s = Series::from_arrow("c", &dict).unwrap();
        assert_eq!(s.dtype(), &DataType::Categorical);
        assert_eq!(s.categories().unwrap().len(), 2);
    }

    #[test]
    fn test_record_batch_round_trip() {
        let df = DataFrame::new(vec![
            Series::new("x", vec![1i32, 2]),
            Series::new("y", vec![Some("p"), None]),
        ])
        .unwrap();
        let batch = df.to_record_batch().unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(DataFrame::from_record_batch(&batch).unwrap(), df);
    }
}
