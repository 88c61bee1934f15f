//! Null and NaN handling
//!
//! Nulls live in the validity bitmap and exist for every dtype. NaN is an IEEE
//! payload of a valid float value, so the NaN tests are defined for float
//! dtypes only.

use num_traits::{Float, NumCast};

use crate::column::{map_chunked, ArrayValue, ChunkedArray, NumericNative, PhysicalData};
use crate::core::any_value::AnyValue;
use crate::core::error::{Error, Result};
use crate::series::Series;

/// How [`Series::fill_null`] chooses replacement values
#[derive(Debug, Clone, PartialEq)]
pub enum FillNullStrategy {
    /// Carry the last valid value forward, at most `limit` slots
    Forward(Option<usize>),
    /// Carry the next valid value backward, at most `limit` slots
    Backward(Option<usize>),
    Min,
    Max,
    Mean,
    Zero,
    One,
    /// A literal, cast to the Series dtype
    Value(AnyValue),
}

fn fill_forward<T: ArrayValue>(ca: &ChunkedArray<T>, limit: Option<usize>) -> ChunkedArray<T> {
    let mut last: Option<T> = None;
    let mut run = 0usize;
    ca.apply_opt(|v| match v {
        Some(v) => {
            last = Some(v.clone());
            run = 0;
            Some(v.clone())
        }
        None => {
            run += 1;
            match limit {
                Some(limit) if run > limit => None,
                _ => last.clone(),
            }
        }
    })
}

fn fill_backward<T: ArrayValue>(ca: &ChunkedArray<T>, limit: Option<usize>) -> ChunkedArray<T> {
    fill_forward(&ca.reverse(), limit).reverse()
}

fn float_test<T, F>(ca: &ChunkedArray<T>, f: F) -> ChunkedArray<bool>
where
    T: NumericNative + Float,
    F: Fn(T) -> bool,
{
    ca.apply_values(|v| f(*v))
}

pub(crate) fn replace_nan<T: NumericNative + Float>(ca: &ChunkedArray<T>, fill: Option<T>) -> ChunkedArray<T> {
    ca.apply_opt(|v| match v {
        Some(v) if v.is_nan() => fill,
        Some(v) => Some(*v),
        None => None,
    })
}

impl Series {
    /// Boolean mask of null positions
    pub fn is_null(&self) -> Series {
        Series::from_chunked(self.name(), self.physical().is_null())
    }

    pub fn is_not_null(&self) -> Series {
        Series::from_chunked(self.name(), self.physical().is_not_null())
    }

    fn float_mask(&self, op: &str, test: fn(f64) -> bool) -> Result<Series> {
        let mask = match self.physical() {
            PhysicalData::Float32(ca) => float_test(ca, |v| test(v as f64)),
            PhysicalData::Float64(ca) => float_test(ca, test),
            _ => {
                return Err(Error::TypeMismatch(format!(
                    "`{}` is only defined for float dtypes, got {}",
                    op,
                    self.dtype()
                )))
            }
        };
        Ok(Series::from_chunked(self.name(), mask))
    }

    /// NaN test; nulls stay null
    pub fn is_nan(&self) -> Result<Series> {
        self.float_mask("is_nan", f64::is_nan)
    }

    pub fn is_not_nan(&self) -> Result<Series> {
        self.float_mask("is_not_nan", |v| !v.is_nan())
    }

    pub fn is_finite(&self) -> Result<Series> {
        self.float_mask("is_finite", f64::is_finite)
    }

    pub fn is_infinite(&self) -> Result<Series> {
        self.float_mask("is_infinite", f64::is_infinite)
    }

    /// Remove null entries
    pub fn drop_nulls(&self) -> Result<Series> {
        if self.null_count() == 0 {
            return Ok(self.clone());
        }
        self.filter(&self.is_not_null())
    }

    /// Remove NaN entries. Null entries are removed as well.
    pub fn drop_nans(&self) -> Result<Series> {
        self.filter(&self.is_not_nan()?)
    }

    /// Replace nulls according to `strategy`
    ///
    /// # Example
    /// ```
    /// use colrs::Series;
    /// use colrs::series::FillNullStrategy;
    ///
    /// let s = Series::new("a", vec![Some(1i32), None, Some(3)]);
    /// let filled = s.fill_null(FillNullStrategy::Forward(None)).unwrap();
    /// assert_eq!(filled.i32().unwrap().to_options(), vec![Some(1), Some(1), Some(3)]);
    /// ```
    pub fn fill_null(&self, strategy: FillNullStrategy) -> Result<Series> {
        if self.null_count() == 0 {
            return Ok(self.clone());
        }
        let value = match strategy {
            FillNullStrategy::Forward(limit) => {
                let data = map_chunked!(self.physical(), ca => fill_forward(ca, limit), "fill_null");
                return Ok(self.with_physical_data(data));
            }
            FillNullStrategy::Backward(limit) => {
                let data = map_chunked!(self.physical(), ca => fill_backward(ca, limit), "fill_null");
                return Ok(self.with_physical_data(data));
            }
            FillNullStrategy::Min => self.min()?,
            FillNullStrategy::Max => self.max()?,
            FillNullStrategy::Mean => self.mean().map(AnyValue::Float64).unwrap_or(AnyValue::Null),
            FillNullStrategy::Zero => AnyValue::Int32(0),
            FillNullStrategy::One => AnyValue::Int32(1),
            FillNullStrategy::Value(v) => v,
        };
        self.fill_null_with_value(value)
    }

    fn fill_null_with_value(&self, value: AnyValue) -> Result<Series> {
        if value.is_null() {
            return Ok(self.clone());
        }
        let fill = Series::from_any_values(self.name(), &[value], false)?.cast(self.dtype())?;
        if fill.null_count() > 0 {
            return Err(Error::InvalidValue(format!(
                "fill value does not fit in dtype {}",
                self.dtype()
            )));
        }
        let mut out = self.clone();
        out.set(&self.is_null(), fill)?;
        Ok(out)
    }

    /// Replace NaN with `value`; a null `value` turns NaN into null
    pub fn fill_nan(&self, value: impl Into<AnyValue>) -> Result<Series> {
        let value = value.into();
        let data = match self.physical() {
            PhysicalData::Float32(ca) => {
                let fill: Option<f32> = value.extract::<f64>().and_then(NumCast::from);
                PhysicalData::Float32(replace_nan(ca, fill))
            }
            PhysicalData::Float64(ca) => PhysicalData::Float64(replace_nan(ca, value.extract::<f64>())),
            _ => {
                return Err(Error::TypeMismatch(format!(
                    "`fill_nan` is only defined for float dtypes, got {}",
                    self.dtype()
                )))
            }
        };
        Ok(self.with_physical_data(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_forward_limit() {
        let ca = ChunkedArray::from_options(vec![Some(1), None, None, None, Some(5)]);
        assert_eq!(
            fill_forward(&ca, Some(2)).to_options(),
            vec![Some(1), Some(1), Some(1), None, Some(5)]
        );
        assert_eq!(
            fill_backward(&ca, None).to_options(),
            vec![Some(1), Some(5), Some(5), Some(5), Some(5)]
        );
    }

    #[test]
    fn test_nan_not_null() {
        let s = Series::new("f", vec![Some(1.0f64), Some(f64::NAN), None]);
        let nan = s.is_nan().unwrap();
        assert_eq!(nan.bool().unwrap().to_options(), vec![Some(false), Some(true), None]);
        assert_eq!(s.is_null().bool().unwrap().to_options(), vec![Some(false), Some(false), Some(true)]);
        assert!(Series::new("i", vec![1i32]).is_nan().is_err());
    }
}
