//! Series construction
//!
//! [`Series::construct`] dispatches on the shape of its input:
//!
//! 1. an existing Series is renamed and shares its storage
//! 2. an arrow array goes through the arrow conversion (feature `arrow`)
//! 3. a [`TypedBuffer`] of one native type takes a dtype-specific fast path
//! 4. a sequence of [`AnyValue`]s is classified in one full pass
//!
//! Empty input without a dtype yields a Float32 Series.

use chrono::{NaiveDate, NaiveDateTime};

use crate::column::{ChunkedArray, NumericNative, PhysicalData, StructChunked};
use crate::config::global_config;
use crate::core::any_value::{date_to_days, AnyValue, ObjectValue};
use crate::core::dtype::{get_supertype, DataType, Field, TimeUnit};
use crate::core::error::{Error, Result};
use crate::series::cast::rescale;
use crate::series::na::replace_nan;
use crate::series::Series;

/// A flat buffer of one native type
#[derive(Debug, Clone, PartialEq)]
pub enum TypedBuffer {
    Boolean(Vec<bool>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Utf8(Vec<String>),
    Binary(Vec<Vec<u8>>),
    Date(Vec<NaiveDate>),
    Datetime(Vec<NaiveDateTime>),
}

impl TypedBuffer {
    pub fn len(&self) -> usize {
        match self {
            TypedBuffer::Boolean(v) => v.len(),
            TypedBuffer::Int8(v) => v.len(),
            TypedBuffer::Int16(v) => v.len(),
            TypedBuffer::Int32(v) => v.len(),
            TypedBuffer::Int64(v) => v.len(),
            TypedBuffer::UInt8(v) => v.len(),
            TypedBuffer::UInt16(v) => v.len(),
            TypedBuffer::UInt32(v) => v.len(),
            TypedBuffer::UInt64(v) => v.len(),
            TypedBuffer::Float32(v) => v.len(),
            TypedBuffer::Float64(v) => v.len(),
            TypedBuffer::Utf8(v) => v.len(),
            TypedBuffer::Binary(v) => v.len(),
            TypedBuffer::Date(v) => v.len(),
            TypedBuffer::Datetime(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

macro_rules! impl_typed_from {
    ($($t:ty => $variant:ident),*) => {
        $(
            impl From<Vec<$t>> for TypedBuffer {
                fn from(v: Vec<$t>) -> Self {
                    TypedBuffer::$variant(v)
                }
            }

            impl From<Vec<$t>> for SeriesInput {
                fn from(v: Vec<$t>) -> Self {
                    SeriesInput::Typed(TypedBuffer::$variant(v))
                }
            }
        )*
    };
}

/// Input accepted by [`Series::construct`]
#[derive(Debug, Clone)]
pub enum SeriesInput {
    Series(Series),
    Typed(TypedBuffer),
    Values(Vec<AnyValue>),
    #[cfg(feature = "arrow")]
    Arrow(arrow::array::ArrayRef),
}

impl_typed_from!(
    bool => Boolean, i8 => Int8, i16 => Int16, i32 => Int32, i64 => Int64,
    u8 => UInt8, u16 => UInt16, u32 => UInt32, u64 => UInt64,
    f32 => Float32, f64 => Float64, String => Utf8, Vec<u8> => Binary,
    NaiveDate => Date, NaiveDateTime => Datetime
);

impl From<Series> for SeriesInput {
    fn from(s: Series) -> Self {
        SeriesInput::Series(s)
    }
}

impl From<TypedBuffer> for SeriesInput {
    fn from(b: TypedBuffer) -> Self {
        SeriesInput::Typed(b)
    }
}

impl From<Vec<AnyValue>> for SeriesInput {
    fn from(v: Vec<AnyValue>) -> Self {
        SeriesInput::Values(v)
    }
}

impl From<Vec<&str>> for SeriesInput {
    fn from(v: Vec<&str>) -> Self {
        SeriesInput::Typed(TypedBuffer::Utf8(v.into_iter().map(String::from).collect()))
    }
}

#[cfg(feature = "arrow")]
impl From<arrow::array::ArrayRef> for SeriesInput {
    fn from(a: arrow::array::ArrayRef) -> Self {
        SeriesInput::Arrow(a)
    }
}

/// Construction policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstructOptions {
    /// Fail on heterogeneous values and on values that do not fit `dtype`
    pub strict: bool,
    /// Store float NaN as null
    pub nan_to_null: bool,
}

impl Default for ConstructOptions {
    /// Defaults from the global configuration
    fn default() -> Self {
        let config = global_config().construction;
        Self {
            strict: config.strict,
            nan_to_null: config.nan_to_null,
        }
    }
}

impl ConstructOptions {
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn nan_to_null(mut self, nan_to_null: bool) -> Self {
        self.nan_to_null = nan_to_null;
        self
    }
}

/// Common dtype of two observed values, `None` when they do not combine
fn fold_dtype(acc: &DataType, next: &DataType) -> Option<DataType> {
    match (acc, next) {
        (a, b) if a == b => Some(a.clone()),
        (DataType::Struct(a), DataType::Struct(b)) => {
            if a.len() != b.len() || a.iter().zip(b).any(|(x, y)| x.name != y.name) {
                return None;
            }
            let fields = a
                .iter()
                .zip(b)
                .map(|(x, y)| fold_dtype(&x.dtype, &y.dtype).map(|d| Field::new(x.name.clone(), d)))
                .collect::<Option<Vec<_>>>()?;
            Some(DataType::Struct(fields))
        }
        (DataType::List(a), DataType::List(b)) => {
            fold_dtype(a, b).map(|inner| DataType::List(Box::new(inner)))
        }
        (a, b) if a.is_nested() || b.is_nested() => None,
        (DataType::Boolean, _) | (_, DataType::Boolean) => None,
        (DataType::Object, _) | (_, DataType::Object) => None,
        (a, b) => get_supertype(a, b),
    }
}

/// Classify a whole value sequence. Top-level heterogeneity is an error
/// under `strict` and Object otherwise; nested heterogeneity is always Object.
pub(crate) fn infer_dtype(values: &[AnyValue], strict: bool) -> Result<DataType> {
    let mut acc: Option<DataType> = None;
    for v in values.iter().filter(|v| !v.is_null()) {
        let Some(dtype) = v.dtype() else { continue };
        acc = match acc {
            None => Some(dtype),
            Some(prev) => match fold_dtype(&prev, &dtype) {
                Some(d) => Some(d),
                None if prev.is_nested() && dtype.is_nested() => return Ok(DataType::Object),
                None if strict => {
                    return Err(Error::TypeMismatch(format!(
                        "unexpected value {} of dtype {} in a sequence of {}; \
                         construct with strict = false to build an Object column",
                        v, dtype, prev
                    )))
                }
                None => return Ok(DataType::Object),
            },
        };
    }
    Ok(acc.unwrap_or(DataType::Float32))
}

fn collect_numeric<T: NumericNative>(values: &[AnyValue], strict: bool) -> Result<ChunkedArray<T>> {
    let mut out = Vec::with_capacity(values.len());
    for v in values {
        if v.is_null() {
            out.push(None);
            continue;
        }
        match v.extract::<T>() {
            Some(x) => out.push(Some(x)),
            None if strict => {
                return Err(Error::Overflow(format!(
                    "value {} does not fit in {}",
                    v,
                    T::dtype()
                )))
            }
            None => out.push(None),
        }
    }
    Ok(ChunkedArray::from_options(out))
}

fn collect_with<T, F>(values: &[AnyValue], f: F) -> ChunkedArray<T>
where
    T: crate::column::ArrayValue,
    F: Fn(&AnyValue) -> Option<T>,
{
    values.iter().map(f).collect()
}

fn ticks(v: &AnyValue, unit: TimeUnit) -> Option<i64> {
    match v {
        AnyValue::Date(d) => (*d as i64).checked_mul(unit.ticks_per_day()),
        AnyValue::Datetime(t, tu, _) | AnyValue::Duration(t, tu) => tu.convert(*t, unit),
        _ => None,
    }
}

fn unscaled(v: &AnyValue, scale: usize) -> Option<i128> {
    match v {
        AnyValue::Decimal(d, s) => rescale(*d, *s, scale),
        other => other
            .extract::<i128>()
            .and_then(|i| i.checked_mul(10i128.checked_pow(scale as u32)?)),
    }
}

/// Build the physical storage of `dtype` from values known to fit it
fn build_physical(values: &[AnyValue], dtype: &DataType, strict: bool) -> Result<PhysicalData> {
    let data = match dtype {
        DataType::Boolean => PhysicalData::Boolean(collect_with(values, AnyValue::as_bool)),
        DataType::Int8 => PhysicalData::Int8(collect_numeric(values, strict)?),
        DataType::Int16 => PhysicalData::Int16(collect_numeric(values, strict)?),
        DataType::Int32 => PhysicalData::Int32(collect_numeric(values, strict)?),
        DataType::Int64 => PhysicalData::Int64(collect_numeric(values, strict)?),
        DataType::UInt8 => PhysicalData::UInt8(collect_numeric(values, strict)?),
        DataType::UInt16 => PhysicalData::UInt16(collect_numeric(values, strict)?),
        DataType::UInt32 => PhysicalData::UInt32(collect_numeric(values, strict)?),
        DataType::UInt64 => PhysicalData::UInt64(collect_numeric(values, strict)?),
        DataType::Float32 => PhysicalData::Float32(collect_numeric(values, strict)?),
        DataType::Float64 => PhysicalData::Float64(collect_numeric(values, strict)?),
        DataType::Utf8 => PhysicalData::Utf8(collect_with(values, |v| v.as_str().map(String::from))),
        DataType::Binary => PhysicalData::Binary(collect_with(values, |v| match v {
            AnyValue::Binary(b) => Some(b.clone()),
            _ => None,
        })),
        DataType::Date => PhysicalData::Int32(collect_with(values, |v| match v {
            AnyValue::Date(d) => Some(*d),
            _ => None,
        })),
        DataType::Datetime(tu, _) | DataType::Duration(tu) => {
            PhysicalData::Int64(collect_with(values, |v| ticks(v, *tu)))
        }
        DataType::Time => PhysicalData::Int64(collect_with(values, |v| match v {
            AnyValue::Time(ns) => Some(*ns),
            _ => None,
        })),
        DataType::Decimal(_, scale) => {
            PhysicalData::Decimal(collect_with(values, |v| unscaled(v, *scale)))
        }
        DataType::List(inner) => {
            let mut out = Vec::with_capacity(values.len());
            for v in values {
                out.push(match v {
                    AnyValue::List(s) => Some(s.cast(inner)?),
                    _ => None,
                });
            }
            PhysicalData::List(ChunkedArray::from_options(out))
        }
        DataType::Struct(fields) => {
            let columns = fields
                .iter()
                .map(|f| {
                    let field_values: Vec<AnyValue> = values
                        .iter()
                        .map(|v| match v {
                            AnyValue::Struct(kv) => kv
                                .iter()
                                .find(|(k, _)| k == &f.name)
                                .map(|(_, v)| v.clone())
                                .unwrap_or(AnyValue::Null),
                            _ => AnyValue::Null,
                        })
                        .collect();
                    Series::from_any_values(&f.name, &field_values, strict)?.cast(&f.dtype)
                })
                .collect::<Result<Vec<_>>>()?;
            PhysicalData::Struct(StructChunked::new(columns)?)
        }
        DataType::Object => PhysicalData::Object(collect_with(values, |v| match v {
            AnyValue::Null => None,
            AnyValue::Object(o) => Some(o.clone()),
            other => Some(ObjectValue::with_repr(other.clone(), other.to_string())),
        })),
        DataType::Categorical => {
            return Err(Error::TypeMismatch(
                "categorical Series are built from strings and then cast".to_string(),
            ))
        }
    };
    Ok(data)
}

/// Convert Datetime values to milliseconds and drop the timezone
pub(crate) fn normalize_timestamps(s: Series) -> Result<Series> {
    match s.dtype() {
        DataType::Datetime(tu, tz) => {
            if let Some(tz) = tz {
                log::warn!(
                    "timezone '{}' of Series '{}' is not retained; values are kept as UTC",
                    tz,
                    s.name()
                );
            }
            if *tu == TimeUnit::Milliseconds && tz.is_none() {
                return Ok(s);
            }
            s.cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
        }
        _ => Ok(s),
    }
}

impl Series {
    /// Build a Series from any supported input.
    ///
    /// # Arguments
    /// * `name` - Name of the series
    /// * `input` - Values; see [`SeriesInput`]
    /// * `dtype` - Target dtype; inferred when `None`
    /// * `options` - Strictness and NaN policy
    ///
    /// # Example
    /// ```
    /// use colrs::{AnyValue, DataType, Series};
    /// use colrs::series::ConstructOptions;
    ///
    /// let values = vec![AnyValue::Int32(1), AnyValue::Float64(2.5), AnyValue::Null];
    /// let s = Series::construct("a", values, None, &ConstructOptions::default()).unwrap();
    /// assert_eq!(s.dtype(), &DataType::Float64);
    /// assert_eq!(s.null_count(), 1);
    /// ```
    pub fn construct(
        name: &str,
        input: impl Into<SeriesInput>,
        dtype: Option<&DataType>,
        options: &ConstructOptions,
    ) -> Result<Series> {
        let out = match input.into() {
            SeriesInput::Series(s) => s.with_name(name),
            SeriesInput::Typed(buf) => Series::from_typed(name, buf, options.nan_to_null),
            SeriesInput::Values(values) if values.is_empty() && dtype.is_none() => {
                Series::new_empty(name, None)
            }
            SeriesInput::Values(values) => {
                let s = match dtype {
                    Some(dtype) => {
                        Series::from_any_values_and_dtype(name, &values, dtype, options.strict)?
                    }
                    None => {
                        normalize_timestamps(Series::from_any_values(name, &values, options.strict)?)?
                    }
                };
                if options.nan_to_null {
                    s.nan_to_null()
                } else {
                    s
                }
            }
            #[cfg(feature = "arrow")]
            SeriesInput::Arrow(array) => Series::from_arrow(name, array.as_ref())?,
        };
        match dtype {
            Some(dtype) if out.dtype() != dtype => out.cast_with_options(dtype, options.strict),
            _ => Ok(out),
        }
    }

    fn nan_to_null(self) -> Series {
        let data = match self.physical() {
            PhysicalData::Float32(ca) => PhysicalData::Float32(replace_nan(ca, None)),
            PhysicalData::Float64(ca) => PhysicalData::Float64(replace_nan(ca, None)),
            _ => return self,
        };
        self.with_physical_data(data)
    }

    /// Fast path for a flat native buffer
    pub fn from_typed(name: &str, buffer: TypedBuffer, nan_to_null: bool) -> Series {
        let s = match buffer {
            TypedBuffer::Boolean(v) => Series::new(name, v),
            TypedBuffer::Int8(v) => Series::new(name, v),
            TypedBuffer::Int16(v) => Series::new(name, v),
            TypedBuffer::Int32(v) => Series::new(name, v),
            TypedBuffer::Int64(v) => Series::new(name, v),
            TypedBuffer::UInt8(v) => Series::new(name, v),
            TypedBuffer::UInt16(v) => Series::new(name, v),
            TypedBuffer::UInt32(v) => Series::new(name, v),
            TypedBuffer::UInt64(v) => Series::new(name, v),
            TypedBuffer::Float32(v) => Series::new(name, v),
            TypedBuffer::Float64(v) => Series::new(name, v),
            TypedBuffer::Utf8(v) => Series::new(name, v),
            TypedBuffer::Binary(v) => Series::from_chunked(name, ChunkedArray::from_vec(v)),
            TypedBuffer::Date(v) => Series::from_dates(name, v.into_iter().map(Some).collect()),
            TypedBuffer::Datetime(v) => Series::from_datetimes(name, v.into_iter().map(Some).collect()),
        };
        if nan_to_null {
            s.nan_to_null()
        } else {
            s
        }
    }

    /// Build a Series from dynamically typed values.
    ///
    /// The dtype is the common supertype of every non-null value. Values of
    /// incompatible kinds fail under `strict` and produce an Object Series
    /// otherwise. All-null or empty input yields Float32.
    pub fn from_any_values(name: &str, values: &[AnyValue], strict: bool) -> Result<Series> {
        let dtype = infer_dtype(values, strict)?;
        let data = build_physical(values, &dtype, strict)?;
        Ok(Series::from_physical_unchecked(name, dtype, data))
    }

    /// Build a Series of `dtype` from dynamically typed values. Values that do
    /// not fit become null, or fail under `strict`.
    pub fn from_any_values_and_dtype(
        name: &str,
        values: &[AnyValue],
        dtype: &DataType,
        strict: bool,
    ) -> Result<Series> {
        let natural = Series::from_any_values(name, values, false)?;
        if natural.dtype() != &DataType::Object || dtype == &DataType::Object {
            return natural.cast_with_options(dtype, strict);
        }
        // mixed kinds: cast value by value
        let mut out = Series::new_empty(name, Some(dtype));
        for v in values {
            let single = Series::from_any_values(name, std::slice::from_ref(v), false)?;
            out.append(&single.cast_with_options(dtype, strict)?)?;
        }
        out.rechunk();
        Ok(out)
    }

    /// Date Series from calendar dates
    pub fn from_dates(name: &str, values: Vec<Option<NaiveDate>>) -> Series {
        let days: ChunkedArray<i32> = values.into_iter().map(|d| d.map(date_to_days)).collect();
        Series::from_physical_unchecked(name, DataType::Date, PhysicalData::Int32(days))
    }

    /// Millisecond Datetime Series without timezone
    pub fn from_datetimes(name: &str, values: Vec<Option<NaiveDateTime>>) -> Series {
        let ticks: ChunkedArray<i64> = values
            .into_iter()
            .map(|d| d.map(|d| d.and_utc().timestamp_millis()))
            .collect();
        Series::from_physical_unchecked(
            name,
            DataType::Datetime(TimeUnit::Milliseconds, None),
            PhysicalData::Int64(ticks),
        )
    }

    /// List Series. The inner dtype is the supertype of all elements unless
    /// given.
    pub fn new_list(name: &str, values: Vec<Option<Series>>, inner: Option<&DataType>) -> Result<Series> {
        let inner = match inner {
            Some(dtype) => dtype.clone(),
            None => {
                let mut acc: Option<DataType> = None;
                for s in values.iter().flatten() {
                    acc = Some(match acc {
                        None => s.dtype().clone(),
                        Some(prev) => get_supertype(&prev, s.dtype()).ok_or_else(|| {
                            Error::TypeMismatch(format!(
                                "list elements of dtype {} and {} have no common dtype",
                                prev,
                                s.dtype()
                            ))
                        })?,
                    });
                }
                acc.unwrap_or(DataType::Float32)
            }
        };
        let mut out = Vec::with_capacity(values.len());
        for v in values {
            out.push(match v {
                Some(s) if s.dtype() != &inner => Some(s.strict_cast(&inner)?),
                other => other,
            });
        }
        Ok(Series::from_physical_unchecked(
            name,
            DataType::List(Box::new(inner)),
            PhysicalData::List(ChunkedArray::from_options(out)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_widths_fold() {
        let values = vec![AnyValue::Int8(1), AnyValue::Int32(2), AnyValue::Null];
        assert_eq!(infer_dtype(&values, true).unwrap(), DataType::Int32);
        let values = vec![AnyValue::Int64(1), AnyValue::Float32(2.0)];
        assert_eq!(infer_dtype(&values, true).unwrap(), DataType::Float64);
    }

    #[test]
    fn test_decimal_with_int_takes_scale() {
        let values = vec![AnyValue::Decimal(125, 2), AnyValue::Int64(3)];
        let s = Series::from_any_values("d", &values, true).unwrap();
        assert_eq!(s.dtype(), &DataType::Decimal(None, 2));
        assert_eq!(s.unpack::<i128>().unwrap().non_null_values(), vec![125, 300]);
    }

    #[test]
    fn test_heterogeneous_strict_and_lenient() {
        let values = vec![AnyValue::Int64(1), AnyValue::Utf8("x".into())];
        assert!(Series::from_any_values("a", &values, true).is_err());
        let s = Series::from_any_values("a", &values, false).unwrap();
        assert_eq!(s.dtype(), &DataType::Object);
    }

    #[test]
    fn test_nested_heterogeneity_is_object() {
        let values = vec![
            AnyValue::List(Series::new("", vec![1i64])),
            AnyValue::List(Series::new("", vec!["a"])),
        ];
        assert_eq!(infer_dtype(&values, true).unwrap(), DataType::Object);
    }

    #[test]
    fn test_all_null_defaults_to_float32() {
        let s = Series::from_any_values("a", &[AnyValue::Null, AnyValue::Null], true).unwrap();
        assert_eq!(s.dtype(), &DataType::Float32);
        assert_eq!(s.null_count(), 2);
    }
}
