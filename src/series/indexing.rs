//! Positional indexing, gather and index-based writes

use std::ops::Range;

use crate::column::{ArrayValue, PhysicalData};
use crate::core::any_value::AnyValue;
use crate::core::dtype::{DataType, IdxSize, IDX_DTYPE};
use crate::core::error::{Error, Result};
use crate::series::Series;

#[cfg(not(feature = "bigidx"))]
const INDEX_WIDTH_MSG: &str = "Index positions should be smaller than 2^32.";
#[cfg(feature = "bigidx")]
const INDEX_WIDTH_MSG: &str = "Index positions should be smaller than 2^64.";

/// Selector accepted by [`Series::get_item`]
#[derive(Debug, Clone)]
pub enum SeriesIndex {
    /// Single position; negative counts from the end
    Int(i64),
    /// Integer positions to gather
    Indices(Series),
    /// Boolean mask of the same length
    Mask(Series),
    /// `start:stop:step` with Python-style bounds
    Slice {
        start: Option<i64>,
        stop: Option<i64>,
        step: Option<i64>,
    },
}

impl From<i64> for SeriesIndex {
    fn from(i: i64) -> Self {
        SeriesIndex::Int(i)
    }
}

impl From<i32> for SeriesIndex {
    fn from(i: i32) -> Self {
        SeriesIndex::Int(i as i64)
    }
}

impl From<Range<i64>> for SeriesIndex {
    fn from(r: Range<i64>) -> Self {
        SeriesIndex::Slice {
            start: Some(r.start),
            stop: Some(r.end),
            step: None,
        }
    }
}

impl From<Series> for SeriesIndex {
    /// Boolean Series filter, any other Series gathers
    fn from(s: Series) -> Self {
        if s.dtype() == &DataType::Boolean {
            SeriesIndex::Mask(s)
        } else {
            SeriesIndex::Indices(s)
        }
    }
}

/// Result of [`Series::get_item`]
#[derive(Debug, Clone, PartialEq)]
pub enum Indexed {
    Scalar(AnyValue),
    Series(Series),
}

impl Indexed {
    pub fn into_series(self) -> Option<Series> {
        match self {
            Indexed::Series(s) => Some(s),
            Indexed::Scalar(_) => None,
        }
    }

    pub fn into_scalar(self) -> Option<AnyValue> {
        match self {
            Indexed::Scalar(v) => Some(v),
            Indexed::Series(_) => None,
        }
    }
}

/// Values written by [`Series::set_at_idx`] and [`Series::set`]
#[derive(Debug, Clone)]
pub enum IndexValues {
    /// Broadcast to every target position
    Scalar(AnyValue),
    /// One value per target position
    Series(Series),
}

impl From<Series> for IndexValues {
    fn from(s: Series) -> Self {
        IndexValues::Series(s)
    }
}

impl From<AnyValue> for IndexValues {
    fn from(v: AnyValue) -> Self {
        IndexValues::Scalar(v)
    }
}

macro_rules! impl_scalar_index_values {
    ($($t:ty),*) => {
        $(
            impl From<$t> for IndexValues {
                fn from(v: $t) -> Self {
                    IndexValues::Scalar(AnyValue::from(v))
                }
            }
        )*
    };
}

impl_scalar_index_values!(bool, i32, i64, u32, u64, f32, f64, &str, String);

/// Translate user index values into gather positions.
///
/// Indices already of the native index type are used as is. Other integer
/// widths are promoted; negative values count from the end. Nulls gather nulls.
pub(crate) fn translate_indices(indices: &Series, len: usize) -> Result<Vec<Option<IdxSize>>> {
    if !indices.dtype().is_integer() {
        return Err(Error::TypeMismatch(format!(
            "cannot index with Series of dtype {}",
            indices.dtype()
        )));
    }
    if indices.dtype() == &IDX_DTYPE {
        return Ok(indices.unpack::<IdxSize>()?.to_options());
    }
    indices
        .iter()
        .map(|v| {
            if v.is_null() {
                return Ok(None);
            }
            let raw: i128 = v
                .extract()
                .ok_or_else(|| Error::InvalidValue(format!("invalid index {}", v)))?;
            let idx = if raw < 0 { raw + len as i128 } else { raw };
            if idx > IdxSize::MAX as i128 {
                return Err(Error::OutOfRange(INDEX_WIDTH_MSG.to_string()));
            }
            if idx < 0 {
                return Err(Error::IndexOutOfBounds {
                    index: raw as i64,
                    size: len,
                });
            }
            Ok(Some(idx as IdxSize))
        })
        .collect()
}

fn scatter_physical(
    data: &PhysicalData,
    indices: &[IdxSize],
    values: &PhysicalData,
) -> Result<PhysicalData> {
    crate::column::zip_same!(data, values, a, b => {
        Ok(ArrayValue::into_physical(a.scatter(indices, &b.to_options())?))
    }, else Err(Error::TypeMismatch(format!(
        "cannot assign {} values into {} storage",
        values.type_name(),
        data.type_name()
    ))))
}

impl Series {
    /// Index with an integer, an index Series, a boolean mask or a slice
    ///
    /// # Example
    /// ```
    /// use colrs::{AnyValue, Series};
    /// use colrs::series::{Indexed, SeriesIndex};
    ///
    /// let s = Series::new("a", vec![1i32, 2, 3]);
    /// assert_eq!(s.get_item(SeriesIndex::Int(-1)).unwrap(), Indexed::Scalar(AnyValue::Int32(3)));
    /// ```
    pub fn get_item(&self, index: impl Into<SeriesIndex>) -> Result<Indexed> {
        match index.into() {
            SeriesIndex::Int(i) => match self.get(i)? {
                AnyValue::List(inner) => Ok(Indexed::Series(inner)),
                value => Ok(Indexed::Scalar(value)),
            },
            SeriesIndex::Indices(idx) => self.gather(&idx).map(Indexed::Series),
            SeriesIndex::Mask(mask) => {
                if mask.len() != self.len() {
                    return Err(Error::ShapeMismatch(format!(
                        "boolean mask has length {} but Series has length {}",
                        mask.len(),
                        self.len()
                    )));
                }
                self.filter(&mask).map(Indexed::Series)
            }
            SeriesIndex::Slice { start, stop, step } => {
                self.slice_stepped(start, stop, step).map(Indexed::Series)
            }
        }
    }

    /// Gather with integer positions of any width; negative positions count
    /// from the end
    pub fn gather(&self, indices: &Series) -> Result<Series> {
        let idx = translate_indices(indices, self.len())?;
        self.take_opt(&idx)
    }

    /// `start:stop:step` slicing. A zero or negative step is an error.
    pub fn slice_stepped(
        &self,
        start: Option<i64>,
        stop: Option<i64>,
        step: Option<i64>,
    ) -> Result<Series> {
        let step = step.unwrap_or(1);
        if step <= 0 {
            return Err(Error::InvalidValue(format!(
                "slice step must be positive, got {}",
                step
            )));
        }
        let len = self.len() as i64;
        let clamp = |v: i64| if v < 0 { (len + v).max(0) } else { v.min(len) };
        let start = start.map(clamp).unwrap_or(0);
        let stop = stop.map(clamp).unwrap_or(len);
        if stop <= start {
            return Ok(self.clear());
        }
        if step == 1 {
            return Ok(self.slice(start, (stop - start) as usize));
        }
        let idx: Vec<IdxSize> = (start..stop)
            .step_by(step as usize)
            .map(|i| i as IdxSize)
            .collect();
        self.take(&idx)
    }

    /// Bring assigned values onto this Series' dtype
    fn prepare_assigned(&mut self, values: IndexValues) -> Result<Series> {
        let values = match values {
            IndexValues::Scalar(v) => Series::from_any_values(self.name(), &[v], false)?,
            IndexValues::Series(s) => s,
        };
        if self.dtype() == &DataType::Categorical {
            let values = values.strict_cast(&DataType::Categorical)?;
            let (merged, codes) = self.merge_categorical(&values)?;
            self.rev_map = Some(merged.clone());
            return Ok(Series::from_categorical_parts(values.name(), codes, merged));
        }
        values.strict_cast(self.dtype())
    }

    fn write_positions(&mut self, positions: &[IdxSize], values: IndexValues) -> Result<()> {
        let values = self.prepare_assigned(values)?;
        if values.len() != 1 && values.len() != positions.len() {
            return Err(Error::ShapeMismatch(format!(
                "cannot assign {} values to {} positions",
                values.len(),
                positions.len()
            )));
        }
        let data = scatter_physical(self.physical(), positions, values.physical())?;
        *self.physical_mut() = data;
        Ok(())
    }

    /// Write values at `indices` in place. A scalar is broadcast to every
    /// position; a Series must have one value per index.
    pub fn set_at_idx(
        &mut self,
        indices: &Series,
        values: impl Into<IndexValues>,
    ) -> Result<&mut Self> {
        let positions = translate_indices(indices, self.len())?
            .into_iter()
            .map(|i| i.ok_or_else(|| Error::InvalidValue("index must not be null".to_string())))
            .collect::<Result<Vec<_>>>()?;
        self.write_positions(&positions, values.into())?;
        Ok(self)
    }

    /// Write `value` where `mask` is true. A Series value of full length
    /// supplies the value per row.
    pub fn set(&mut self, mask: &Series, value: impl Into<IndexValues>) -> Result<&mut Self> {
        if mask.len() != self.len() {
            return Err(Error::ShapeMismatch(format!(
                "mask has length {} but Series has length {}",
                mask.len(),
                self.len()
            )));
        }
        let positions: Vec<IdxSize> = mask
            .bool()?
            .iter()
            .enumerate()
            .filter(|(_, m)| m.copied() == Some(true))
            .map(|(i, _)| i as IdxSize)
            .collect();
        let value = match value.into() {
            IndexValues::Series(s) if s.len() == self.len() && s.len() != 1 => {
                IndexValues::Series(s.take(&positions)?)
            }
            other => other,
        };
        if positions.is_empty() {
            return Ok(self);
        }
        self.write_positions(&positions, value)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_negative() {
        let idx = Series::new("i", vec![-1i64, 0, 2]);
        let out = translate_indices(&idx, 3).unwrap();
        assert_eq!(out, vec![Some(2), Some(0), Some(2)]);
    }

    #[cfg(not(feature = "bigidx"))]
    #[test]
    fn test_translate_too_wide() {
        let idx = Series::new("i", vec![1i64 << 33]);
        let err = translate_indices(&idx, 3).unwrap_err();
        assert!(err.to_string().contains("2^32"));
    }

    #[test]
    fn test_negative_step_rejected() {
        let s = Series::new("a", vec![1i32, 2, 3]);
        assert!(s.slice_stepped(None, None, Some(-1)).is_err());
        let stepped = s.slice_stepped(None, None, Some(2)).unwrap();
        assert_eq!(stepped.i32().unwrap().to_options(), vec![Some(1), Some(3)]);
    }
}
