//! Series module - the named, typed column of the engine
//!
//! A [`Series`] couples a name and a [`DataType`] with chunked physical
//! storage. Operations return new Series; only `rename`, `set_at_idx`,
//! `append`, `extend`, `rechunk` and `shrink_to_fit` mutate in place.

use std::fmt::{self, Display};
use std::sync::Arc;

use crate::column::{
    ArrayValue, ChunkedArray, PhysicalData, PhysicalType, StructChunked,
};
use crate::core::any_value::AnyValue;
use crate::core::dtype::{DataType, IdxSize, TimeUnit};
use crate::core::error::{Error, Result};

pub mod aggregate;
pub mod arithmetic;
pub mod cast;
pub mod categorical;
pub mod comparison;
pub mod construction;
pub mod indexing;
pub mod na;
pub mod ops;
pub mod rank;
pub mod sample;
pub mod view;
pub mod window;

pub use aggregate::QuantileInterpolation;
pub use categorical::RevMapping;
pub use construction::{ConstructOptions, SeriesInput, TypedBuffer};
pub use indexing::{Indexed, SeriesIndex};
pub use na::FillNullStrategy;
pub use rank::RankMethod;
pub use view::RawBuffer;
pub use window::RollingOptions;

/// Series data structure
///
/// Cloning is cheap: chunks share their value buffers.
#[derive(Debug, Clone)]
pub struct Series {
    name: String,
    dtype: DataType,
    data: PhysicalData,
    /// Category mapping, present only for Categorical
    rev_map: Option<Arc<RevMapping>>,
}

/// Conversion of native collections into a Series
pub trait IntoSeries {
    fn into_series(self, name: &str) -> Series;
}

macro_rules! impl_into_series {
    ($($t:ty),*) => {
        $(
            impl IntoSeries for Vec<$t> {
                fn into_series(self, name: &str) -> Series {
                    Series::from_chunked(name, ChunkedArray::from_vec(self))
                }
            }

            impl IntoSeries for Vec<Option<$t>> {
                fn into_series(self, name: &str) -> Series {
                    Series::from_chunked(name, ChunkedArray::from_options(self))
                }
            }

            impl IntoSeries for &[$t] {
                fn into_series(self, name: &str) -> Series {
                    Series::from_chunked(name, ChunkedArray::from_slice(self))
                }
            }

            impl IntoSeries for &[Option<$t>] {
                fn into_series(self, name: &str) -> Series {
                    Series::from_chunked(name, ChunkedArray::from_options(self.iter().cloned()))
                }
            }
        )*
    };
}

impl_into_series!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, String);

impl IntoSeries for Vec<&str> {
    fn into_series(self, name: &str) -> Series {
        Series::from_chunked(
            name,
            ChunkedArray::from_vec(self.into_iter().map(|s| s.to_string()).collect()),
        )
    }
}

impl IntoSeries for Vec<Option<&str>> {
    fn into_series(self, name: &str) -> Series {
        Series::from_chunked(
            name,
            ChunkedArray::from_options(self.into_iter().map(|s| s.map(|s| s.to_string()))),
        )
    }
}

impl IntoSeries for &[&str] {
    fn into_series(self, name: &str) -> Series {
        self.to_vec().into_series(name)
    }
}

impl<T: PhysicalType> IntoSeries for ChunkedArray<T> {
    fn into_series(self, name: &str) -> Series {
        Series::from_chunked(name, self)
    }
}

impl Series {
    /// Create a new Series from native values
    ///
    /// # Arguments
    /// * `name` - Name of the series
    /// * `values` - Values, optionally wrapped in `Option` for nulls
    ///
    /// # Example
    /// ```
    /// use colrs::Series;
    ///
    /// let s = Series::new("a", vec![1i64, 2, 3]);
    /// assert_eq!(s.len(), 3);
    /// ```
    pub fn new<V: IntoSeries>(name: &str, values: V) -> Series {
        values.into_series(name)
    }

    /// Wrap a typed chunked array
    pub fn from_chunked<T: PhysicalType>(name: &str, ca: ChunkedArray<T>) -> Series {
        Series {
            name: name.to_string(),
            dtype: T::dtype(),
            data: T::into_physical(ca),
            rev_map: None,
        }
    }

    /// Assemble a Series whose physical storage already matches `dtype`
    pub(crate) fn from_physical_unchecked(name: &str, dtype: DataType, data: PhysicalData) -> Series {
        Series {
            name: name.to_string(),
            dtype,
            data,
            rev_map: None,
        }
    }

    pub(crate) fn from_categorical_parts(
        name: &str,
        codes: ChunkedArray<u32>,
        rev_map: Arc<RevMapping>,
    ) -> Series {
        Series {
            name: name.to_string(),
            dtype: DataType::Categorical,
            data: PhysicalData::UInt32(codes),
            rev_map: Some(rev_map),
        }
    }

    /// Same name, dtype and category mapping over new storage
    pub(crate) fn with_physical_data(&self, data: PhysicalData) -> Series {
        Series {
            name: self.name.clone(),
            dtype: self.dtype.clone(),
            data,
            rev_map: self.rev_map.clone(),
        }
    }

    /// An empty Series. Without a dtype the column is Float32.
    pub fn new_empty(name: &str, dtype: Option<&DataType>) -> Series {
        Series::full_null(name, 0, dtype.unwrap_or(&DataType::Float32))
    }

    /// A Series of `length` nulls
    pub fn full_null(name: &str, length: usize, dtype: &DataType) -> Series {
        let data = match dtype.to_physical() {
            DataType::Boolean => PhysicalData::Boolean(ChunkedArray::full_null(length)),
            DataType::Int8 => PhysicalData::Int8(ChunkedArray::full_null(length)),
            DataType::Int16 => PhysicalData::Int16(ChunkedArray::full_null(length)),
            DataType::Int32 => PhysicalData::Int32(ChunkedArray::full_null(length)),
            DataType::Int64 => PhysicalData::Int64(ChunkedArray::full_null(length)),
            DataType::UInt8 => PhysicalData::UInt8(ChunkedArray::full_null(length)),
            DataType::UInt16 => PhysicalData::UInt16(ChunkedArray::full_null(length)),
            DataType::UInt32 => PhysicalData::UInt32(ChunkedArray::full_null(length)),
            DataType::UInt64 => PhysicalData::UInt64(ChunkedArray::full_null(length)),
            DataType::Float32 => PhysicalData::Float32(ChunkedArray::full_null(length)),
            DataType::Float64 => PhysicalData::Float64(ChunkedArray::full_null(length)),
            DataType::Utf8 => PhysicalData::Utf8(ChunkedArray::full_null(length)),
            DataType::Binary => PhysicalData::Binary(ChunkedArray::full_null(length)),
            DataType::Decimal(_, _) => PhysicalData::Decimal(ChunkedArray::full_null(length)),
            DataType::List(_) => PhysicalData::List(ChunkedArray::full_null(length)),
            DataType::Struct(fields) => PhysicalData::Struct(StructChunked::from_fields_unchecked(
                fields
                    .iter()
                    .map(|f| Series::full_null(&f.name, length, &f.dtype))
                    .collect(),
            )),
            _ => PhysicalData::Object(ChunkedArray::full_null(length)),
        };
        let rev_map = match dtype {
            DataType::Categorical => Some(Arc::new(RevMapping::new())),
            _ => None,
        };
        Series {
            name: name.to_string(),
            dtype: dtype.clone(),
            data,
            rev_map,
        }
    }

    /// Create a struct Series from equal-length fields
    pub fn new_struct(name: &str, fields: Vec<Series>) -> Result<Series> {
        let ca = StructChunked::new(fields)?;
        let dtype = DataType::Struct(ca.schema());
        Ok(Series::from_physical_unchecked(name, dtype, PhysicalData::Struct(ca)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename in place
    pub fn rename(&mut self, name: &str) -> &mut Self {
        self.name = name.to_string();
        self
    }

    /// Builder-style rename
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn dtype(&self) -> &DataType {
        &self.dtype
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn null_count(&self) -> usize {
        self.data.null_count()
    }

    /// Whether any chunk carries a validity bitmap
    pub fn has_validity(&self) -> bool {
        self.data.has_validity()
    }

    pub fn n_chunks(&self) -> usize {
        self.data.n_chunks()
    }

    pub fn chunk_lengths(&self) -> Vec<usize> {
        self.data.chunk_lengths()
    }

    /// Approximate heap size in bytes
    pub fn estimated_size(&self) -> usize {
        self.data.estimated_size()
    }

    pub fn inner_dtype(&self) -> Option<&DataType> {
        self.dtype.inner_dtype()
    }

    pub fn time_unit(&self) -> Option<TimeUnit> {
        self.dtype.time_unit()
    }

    pub fn is_numeric(&self) -> bool {
        self.dtype.is_numeric()
    }

    pub fn is_float(&self) -> bool {
        self.dtype.is_float()
    }

    pub fn is_integer(&self) -> bool {
        self.dtype.is_integer()
    }

    pub fn is_temporal(&self) -> bool {
        self.dtype.is_temporal()
    }

    pub fn is_boolean(&self) -> bool {
        self.dtype == DataType::Boolean
    }

    pub fn is_utf8(&self) -> bool {
        self.dtype == DataType::Utf8
    }

    /// Physical storage
    pub fn physical(&self) -> &PhysicalData {
        &self.data
    }

    pub(crate) fn physical_mut(&mut self) -> &mut PhysicalData {
        &mut self.data
    }

    pub fn rev_map(&self) -> Option<&Arc<RevMapping>> {
        self.rev_map.as_ref()
    }

    /// Borrow the storage as a typed chunked array
    pub fn unpack<T: ArrayValue>(&self) -> Result<&ChunkedArray<T>> {
        T::from_physical(&self.data).ok_or_else(|| {
            Error::TypeMismatch(format!(
                "Series '{}' has physical type {}, not {}",
                self.name,
                self.data.type_name(),
                std::any::type_name::<T>()
            ))
        })
    }

    pub fn bool(&self) -> Result<&ChunkedArray<bool>> {
        self.unpack()
    }

    pub fn i32(&self) -> Result<&ChunkedArray<i32>> {
        self.unpack()
    }

    pub fn i64(&self) -> Result<&ChunkedArray<i64>> {
        self.unpack()
    }

    pub fn u32(&self) -> Result<&ChunkedArray<u32>> {
        self.unpack()
    }

    pub fn f32(&self) -> Result<&ChunkedArray<f32>> {
        self.unpack()
    }

    pub fn f64(&self) -> Result<&ChunkedArray<f64>> {
        self.unpack()
    }

    pub fn utf8(&self) -> Result<&ChunkedArray<String>> {
        self.unpack()
    }

    pub fn list(&self) -> Result<&ChunkedArray<Series>> {
        self.unpack()
    }

    pub fn struct_(&self) -> Result<&StructChunked> {
        match &self.data {
            PhysicalData::Struct(ca) => Ok(ca),
            _ => Err(Error::TypeMismatch(format!(
                "Series '{}' of dtype {} is not a struct",
                self.name, self.dtype
            ))),
        }
    }

    /// Interpret a physical value according to this Series' logical dtype
    pub(crate) fn to_logical(&self, value: AnyValue) -> AnyValue {
        match (&self.dtype, value) {
            (_, AnyValue::Null) => AnyValue::Null,
            (DataType::Date, AnyValue::Int32(v)) => AnyValue::Date(v),
            (DataType::Datetime(tu, tz), AnyValue::Int64(v)) => {
                AnyValue::Datetime(v, *tu, tz.clone())
            }
            (DataType::Duration(tu), AnyValue::Int64(v)) => AnyValue::Duration(v, *tu),
            (DataType::Time, AnyValue::Int64(v)) => AnyValue::Time(v),
            (DataType::Decimal(_, scale), AnyValue::Decimal(v, _)) => AnyValue::Decimal(v, *scale),
            (DataType::Categorical, AnyValue::UInt32(code)) => self
                .rev_map
                .as_ref()
                .and_then(|m| m.get(code))
                .map(|s| AnyValue::Utf8(s.to_string()))
                .unwrap_or(AnyValue::Null),
            (_, v) => v,
        }
    }

    /// Value at a non-negative in-bounds position. Out of bounds yields Null.
    pub(crate) fn get_any(&self, index: usize) -> AnyValue {
        match self.data.get_physical(index) {
            Ok(v) => self.to_logical(v),
            Err(_) => AnyValue::Null,
        }
    }

    /// Value at `index`; negative indices count from the end
    pub fn get(&self, index: i64) -> Result<AnyValue> {
        let len = self.len();
        let idx = if index < 0 { index + len as i64 } else { index };
        if idx < 0 || idx as usize >= len {
            return Err(Error::IndexOutOfBounds { index, size: len });
        }
        let physical = self.data.get_physical(idx as usize)?;
        Ok(self.to_logical(physical))
    }

    /// Iterate logical values
    pub fn iter(&self) -> impl Iterator<Item = AnyValue> + '_ {
        (0..self.len()).map(move |i| self.get_any(i))
    }

    pub fn to_list(&self) -> Vec<AnyValue> {
        self.iter().collect()
    }

    /// Zero-copy slice; a negative offset counts from the end
    pub fn slice(&self, offset: i64, length: usize) -> Series {
        let len = self.len() as i64;
        let start = if offset < 0 {
            (len + offset).max(0)
        } else {
            offset.min(len)
        } as usize;
        self.with_physical_data(self.data.slice(start, length))
    }

    /// First `n` rows (10 when not given)
    pub fn head(&self, n: Option<usize>) -> Series {
        self.slice(0, n.unwrap_or(10))
    }

    /// Last `n` rows (10 when not given)
    pub fn tail(&self, n: Option<usize>) -> Series {
        let n = n.unwrap_or(10).min(self.len());
        self.slice((self.len() - n) as i64, n)
    }

    pub fn limit(&self, n: usize) -> Series {
        self.head(Some(n))
    }

    /// Empty Series of the same name and dtype
    pub fn clear(&self) -> Series {
        self.slice(0, 0)
    }

    /// Coalesce all chunks into one, in place
    pub fn rechunk(&mut self) -> &mut Self {
        if self.n_chunks() > 1 {
            self.data = self.data.rechunk();
        }
        self
    }

    /// Release excess buffer capacity, in place
    pub fn shrink_to_fit(&mut self) {
        self.data.shrink_to_fit();
    }

    /// Copy into storage that shares no buffers with `self`
    pub fn deep_copy(&self) -> Series {
        self.with_physical_data(self.data.deep_copy())
    }

    /// Check dtypes and bring a categorical `other` onto our mapping
    fn prepare_combine(&mut self, other: &Series, op: &str) -> Result<Series> {
        if self.dtype != other.dtype {
            return Err(Error::TypeMismatch(format!(
                "cannot {} Series of dtype {} to Series of dtype {}",
                op, other.dtype, self.dtype
            )));
        }
        if self.dtype == DataType::Categorical {
            let (merged, codes) = self.merge_categorical(other)?;
            if self.rev_map.as_ref().map(|m| **m != *merged).unwrap_or(true) {
                self.rev_map = Some(merged.clone());
            }
            return Ok(Series::from_categorical_parts(other.name(), codes, merged));
        }
        Ok(other.clone())
    }

    /// Append `other`'s chunks without copying values
    ///
    /// # Arguments
    /// * `other` - Series of the same dtype
    pub fn append(&mut self, other: &Series) -> Result<&mut Self> {
        let other = self.prepare_combine(other, "append")?;
        self.data.append(&other.data)?;
        Ok(self)
    }

    /// Write `other`'s values into contiguous storage.
    ///
    /// When the storage is aliased (for example by [`Series::view_shared`]),
    /// the in-place write fails with a borrow conflict; the Series then detaches
    /// onto a private copy and retries once. Any other failure is returned
    /// unchanged.
    pub fn extend(&mut self, other: &Series) -> Result<&mut Self> {
        let other = self.prepare_combine(other, "extend")?;
        match self.data.extend(&other.data) {
            Ok(()) => {}
            Err(err) if err.is_borrow_conflict() => {
                log::debug!(
                    "storage of Series '{}' is aliased, extending a private copy: {}",
                    self.name,
                    err
                );
                let mut detached = self.data.deep_copy();
                detached.extend(&other.data)?;
                self.data = detached;
            }
            Err(err) => return Err(err),
        }
        Ok(self)
    }

    /// Append `n` copies of `value`
    pub fn extend_constant(&self, value: AnyValue, n: usize) -> Result<Series> {
        let tail = Series::from_any_values(&self.name, &vec![value; n], false)?
            .cast(&self.dtype)?;
        let mut out = self.clone();
        out.append(&tail)?;
        Ok(out)
    }

    /// Gather rows at `indices`
    pub fn take(&self, indices: &[IdxSize]) -> Result<Series> {
        Ok(self.with_physical_data(self.data.take(indices)?))
    }

    /// Gather rows; `None` positions produce nulls
    pub fn take_opt(&self, indices: &[Option<IdxSize>]) -> Result<Series> {
        Ok(self.with_physical_data(self.data.take_opt(indices)?))
    }

    pub(crate) fn filter_ca(&self, mask: &ChunkedArray<bool>) -> Result<Series> {
        Ok(self.with_physical_data(self.data.filter(mask)?))
    }

    /// Keep rows where `mask` is true
    pub fn filter(&self, mask: &Series) -> Result<Series> {
        self.filter_ca(mask.bool()?)
    }

    pub fn reverse(&self) -> Series {
        self.with_physical_data(self.data.reverse())
    }

    /// Equal values and length; any null makes the Series unequal
    pub fn series_equal(&self, other: &Series) -> bool {
        self.null_count() == 0 && other.null_count() == 0 && self.series_equal_missing(other)
    }

    /// Equal values and length, with null equal to null
    pub fn series_equal_missing(&self, other: &Series) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl Default for Series {
    fn default() -> Self {
        Series::new_empty("", None)
    }
}

impl PartialEq for Series {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.dtype == other.dtype && self.series_equal_missing(other)
    }
}

impl Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "shape: ({},)", self.len())?;
        writeln!(f, "Series: '{}' [{}]", self.name, self.dtype)?;
        writeln!(f, "[")?;
        let n = self.len();
        for (i, v) in self.iter().enumerate() {
            if n > 20 && i == 10 {
                writeln!(f, "\t...")?;
            }
            if n > 20 && i >= 10 && i < n - 10 {
                continue;
            }
            match v {
                AnyValue::Utf8(s) => writeln!(f, "\t\"{}\"", s)?,
                other => writeln!(f, "\t{}", other)?,
            }
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_get() {
        let s = Series::new("a", vec![10i64, 20, 30]);
        assert_eq!(s.get(-1).unwrap(), AnyValue::Int64(30));
        assert_eq!(s.get(0).unwrap(), AnyValue::Int64(10));
        assert!(s.get(3).is_err());
        assert!(s.get(-4).is_err());
    }

    #[test]
    fn test_empty_defaults_to_float32() {
        let s = Series::new_empty("e", None);
        assert_eq!(s.dtype(), &DataType::Float32);
        assert!(s.is_empty());
    }

    #[test]
    fn test_extend_retries_on_alias() {
        let mut s = Series::new("a", vec![1i32, 2]);
        let alias = s.clone();
        s.extend(&Series::new("b", vec![3i32])).unwrap();
        assert_eq!(s.len(), 3);
        assert_eq!(alias.len(), 2);
    }

    #[test]
    fn test_append_dtype_mismatch() {
        let mut s = Series::new("a", vec![1i32, 2]);
        let err = s.append(&Series::new("b", vec![1.0f64])).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch(_)));
    }
}
