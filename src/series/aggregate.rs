//! Scalar aggregations
//!
//! Nulls are skipped. Float NaN participates like any other value, so a NaN
//! makes `sum` and `mean` NaN.

use std::collections::HashSet;

use num_traits::ToPrimitive;

use crate::column::{with_numeric, ArrayValue, ChunkedArray, NumericNative, PhysicalData};
use crate::core::any_value::AnyValue;
use crate::core::dtype::DataType;
use crate::core::error::{Error, Result};
use crate::series::Series;

/// Interpolation between the two data points bracketing a quantile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuantileInterpolation {
    #[default]
    Nearest,
    Lower,
    Higher,
    Midpoint,
    Linear,
}

/// Quantile of sorted values
pub(crate) fn quantile_sorted(
    sorted: &[f64],
    q: f64,
    interpolation: QuantileInterpolation,
) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let (lo, hi) = (sorted[lower], sorted[upper]);
    Some(match interpolation {
        QuantileInterpolation::Nearest => sorted[pos.round() as usize],
        QuantileInterpolation::Lower => lo,
        QuantileInterpolation::Higher => hi,
        QuantileInterpolation::Midpoint => (lo + hi) / 2.0,
        QuantileInterpolation::Linear => lo + (hi - lo) * (pos - lower as f64),
    })
}

pub(crate) fn sort_floats(values: &mut [f64]) {
    values.sort_by(|a, b| a.total_cmp(b));
}

pub(crate) fn variance(values: &[f64], ddof: u8) -> Option<f64> {
    let n = values.len();
    if n <= ddof as usize {
        return None;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some(ss / (n - ddof as usize) as f64)
}

pub(crate) fn skewness(values: &[f64], bias: bool) -> Option<f64> {
    let n = values.len() as f64;
    if values.is_empty() {
        return None;
    }
    let mean = values.iter().sum::<f64>() / n;
    let m2 = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let m3 = values.iter().map(|v| (v - mean).powi(3)).sum::<f64>() / n;
    let g1 = m3 / m2.powf(1.5);
    if bias {
        Some(g1)
    } else if n < 3.0 {
        None
    } else {
        Some(g1 * (n * (n - 1.0)).sqrt() / (n - 2.0))
    }
}

fn min_max<T: NumericNative>(ca: &ChunkedArray<T>, max: bool) -> Option<T> {
    let mut iter = ca.iter().flatten().copied().filter(|v| !v.is_nan_());
    let first = iter.next()?;
    Some(iter.fold(first, |acc, v| {
        let take = if max { v > acc } else { v < acc };
        if take {
            v
        } else {
            acc
        }
    }))
}

fn arg_min_max<T: NumericNative>(ca: &ChunkedArray<T>, max: bool) -> Option<usize> {
    let mut best: Option<(usize, T)> = None;
    for (i, v) in ca.iter().enumerate() {
        let v = match v {
            Some(v) if !v.is_nan_() => *v,
            _ => continue,
        };
        best = match best {
            Some((_, b)) if (max && v <= b) || (!max && v >= b) => best,
            _ => Some((i, v)),
        };
    }
    best.map(|(i, _)| i)
}

impl Series {
    /// Non-null values as `f64`. Booleans count as 0/1 and decimals are scaled.
    pub(crate) fn f64_values(&self) -> Result<Vec<f64>> {
        Ok(self.f64_options()?.into_iter().flatten().collect())
    }

    /// Every slot as `f64`, nulls as `None`
    pub(crate) fn f64_options(&self) -> Result<Vec<Option<f64>>> {
        with_numeric!(self.physical(), ca => Ok(ca.iter().map(|v| v.and_then(|v| v.to_f64())).collect()),
        else match self.physical() {
            PhysicalData::Boolean(ca) => Ok(ca.iter().map(|v| v.map(|b| *b as u8 as f64)).collect()),
            PhysicalData::Decimal(ca) => {
                let scale = match self.dtype() {
                    DataType::Decimal(_, s) => *s as i32,
                    _ => 0,
                };
                let factor = 10f64.powi(scale);
                Ok(ca.iter().map(|v| v.map(|v| *v as f64 / factor)).collect())
            }
            _ => Err(Error::TypeMismatch(format!(
                "numeric aggregation is not defined for dtype {}",
                self.dtype()
            ))),
        })
    }

    /// Sum of the non-null values.
    ///
    /// Signed integers sum as Int64, unsigned as UInt64 and Boolean counts
    /// the true values. Overflow is an error. An empty or all-null Series sums
    /// to zero.
    pub fn sum(&self) -> Result<AnyValue> {
        let overflow = || Error::Overflow(format!("sum of Series '{}' overflows", self.name()));
        match self.physical() {
            PhysicalData::Float32(ca) => Ok(AnyValue::Float32(ca.iter().flatten().sum())),
            PhysicalData::Float64(ca) => Ok(AnyValue::Float64(ca.iter().flatten().sum())),
            PhysicalData::Boolean(ca) => Ok(AnyValue::UInt64(
                ca.iter().flatten().filter(|b| **b).count() as u64,
            )),
            PhysicalData::Decimal(ca) => {
                let scale = match self.dtype() {
                    DataType::Decimal(_, s) => *s,
                    _ => 0,
                };
                let total = ca
                    .iter()
                    .flatten()
                    .try_fold(0i128, |acc, v| acc.checked_add(*v))
                    .ok_or_else(overflow)?;
                Ok(AnyValue::Decimal(total, scale))
            }
            data if self.dtype().is_unsigned_integer() => {
                let total = with_numeric!(data, ca => ca
                    .iter()
                    .flatten()
                    .try_fold(0u64, |acc, v| v.to_u64().and_then(|v| acc.checked_add(v))),
                    else None)
                .ok_or_else(overflow)?;
                Ok(AnyValue::UInt64(total))
            }
            data if self.dtype().is_integer() || matches!(self.dtype(), DataType::Duration(_)) => {
                let total = with_numeric!(data, ca => ca
                    .iter()
                    .flatten()
                    .try_fold(0i64, |acc, v| v.to_i64().and_then(|v| acc.checked_add(v))),
                    else None)
                .ok_or_else(overflow)?;
                Ok(match self.dtype() {
                    DataType::Duration(tu) => AnyValue::Duration(total, *tu),
                    _ => AnyValue::Int64(total),
                })
            }
            _ => Err(Error::TypeMismatch(format!(
                "`sum` is not defined for dtype {}",
                self.dtype()
            ))),
        }
    }

    /// Product of the non-null values; integers multiply as Int64
    pub fn product(&self) -> Result<AnyValue> {
        if self.dtype().is_float() {
            return Ok(AnyValue::Float64(self.f64_values()?.iter().product()));
        }
        if !self.dtype().is_integer() {
            return Err(Error::TypeMismatch(format!(
                "`product` is not defined for dtype {}",
                self.dtype()
            )));
        }
        let total = with_numeric!(self.physical(), ca => ca
            .iter()
            .flatten()
            .try_fold(1i64, |acc, v| v.to_i64().and_then(|v| acc.checked_mul(v))),
            else None)
        .ok_or_else(|| Error::Overflow(format!("product of Series '{}' overflows", self.name())))?;
        Ok(AnyValue::Int64(total))
    }

    pub fn mean(&self) -> Option<f64> {
        let values = self.f64_values().ok()?;
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }

    fn extreme(&self, max: bool) -> Result<AnyValue> {
        let name = if max { "max" } else { "min" };
        let physical = match self.physical() {
            PhysicalData::Boolean(ca) => {
                let mut values = ca.iter().flatten();
                if ca.null_count() == ca.len() {
                    AnyValue::Null
                } else if max {
                    AnyValue::Boolean(values.any(|v| *v))
                } else {
                    AnyValue::Boolean(values.all(|v| *v))
                }
            }
            PhysicalData::Utf8(ca) => {
                let values = ca.iter().flatten();
                let found = if max { values.max() } else { values.min() };
                found.map(|s| AnyValue::Utf8(s.clone())).unwrap_or(AnyValue::Null)
            }
            PhysicalData::Decimal(ca) => {
                let values = ca.iter().flatten();
                let found = if max { values.max() } else { values.min() };
                found
                    .map(|v| AnyValue::Decimal(*v, 0))
                    .unwrap_or(AnyValue::Null)
            }
            PhysicalData::UInt32(_) if self.dtype() == &DataType::Categorical => {
                return self.cast(&DataType::Utf8)?.extreme(max);
            }
            data => with_numeric!(data, ca => min_max(ca, max)
                .map(|v| v.to_any_value())
                .unwrap_or(AnyValue::Null),
                else return Err(Error::TypeMismatch(format!(
                    "`{}` is not defined for dtype {}",
                    name,
                    self.dtype()
                )))),
        };
        Ok(self.to_logical(physical))
    }

    /// Smallest non-null value. NaN is ignored unless every value is NaN.
    pub fn min(&self) -> Result<AnyValue> {
        self.extreme(false)
    }

    pub fn max(&self) -> Result<AnyValue> {
        self.extreme(true)
    }

    /// Variance with `ddof` delta degrees of freedom
    pub fn var(&self, ddof: u8) -> Option<f64> {
        variance(&self.f64_values().ok()?, ddof)
    }

    pub fn std(&self, ddof: u8) -> Option<f64> {
        self.var(ddof).map(f64::sqrt)
    }

    pub fn median(&self) -> Option<f64> {
        self.quantile(0.5, QuantileInterpolation::Linear).ok().flatten()
    }

    /// Quantile `q` in `[0, 1]` of the non-null values
    pub fn quantile(&self, q: f64, interpolation: QuantileInterpolation) -> Result<Option<f64>> {
        if !(0.0..=1.0).contains(&q) {
            return Err(Error::InvalidValue(format!(
                "quantile must be between 0 and 1, got {}",
                q
            )));
        }
        let mut values = self.f64_values()?;
        sort_floats(&mut values);
        Ok(quantile_sorted(&values, q, interpolation))
    }

    /// Sample skewness; `bias = false` applies the adjusted Fisher-Pearson correction
    pub fn skew(&self, bias: bool) -> Result<Option<f64>> {
        Ok(skewness(&self.f64_values()?, bias))
    }

    /// Number of distinct values; null counts as one value
    pub fn n_unique(&self) -> Result<usize> {
        let mut seen = HashSet::new();
        for v in self.iter() {
            seen.insert(v);
        }
        Ok(seen.len())
    }

    /// Position of the smallest value
    pub fn arg_min(&self) -> Option<usize> {
        self.arg_extreme(false)
    }

    pub fn arg_max(&self) -> Option<usize> {
        self.arg_extreme(true)
    }

    fn arg_extreme(&self, max: bool) -> Option<usize> {
        with_numeric!(self.physical(), ca => arg_min_max(ca, max), else {
            let target = self.extreme(max).ok()?;
            if target.is_null() {
                return None;
            }
            self.iter().position(|v| v == target)
        })
    }

    fn boolean_values(&self, op: &str) -> Result<&ChunkedArray<bool>> {
        self.bool().map_err(|_| {
            Error::TypeMismatch(format!(
                "`{}` is only defined for Boolean, got {}",
                op,
                self.dtype()
            ))
        })
    }

    /// Whether any non-null value is true
    pub fn any(&self) -> Result<bool> {
        Ok(self.boolean_values("any")?.iter().flatten().any(|v| *v))
    }

    /// Whether every non-null value is true
    pub fn all(&self) -> Result<bool> {
        Ok(self.boolean_values("all")?.iter().flatten().all(|v| *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_interpolations() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&v, 0.5, QuantileInterpolation::Lower), Some(2.0));
        assert_eq!(quantile_sorted(&v, 0.5, QuantileInterpolation::Higher), Some(3.0));
        assert_eq!(quantile_sorted(&v, 0.5, QuantileInterpolation::Midpoint), Some(2.5));
        assert_eq!(quantile_sorted(&v, 0.5, QuantileInterpolation::Linear), Some(2.5));
        assert_eq!(quantile_sorted(&[], 0.5, QuantileInterpolation::Linear), None);
    }

    #[test]
    fn test_variance_ddof() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(variance(&v, 0), Some(1.25));
        assert!((variance(&v, 1).unwrap() - 1.6666666666666667).abs() < 1e-12);
        assert_eq!(variance(&[1.0], 1), None);
    }

    #[test]
    fn test_arg_min_skips_nulls() {
        let ca = ChunkedArray::from_options(vec![None, Some(3), Some(1), Some(1)]);
        assert_eq!(arg_min_max(&ca, false), Some(2));
        assert_eq!(arg_min_max(&ca, true), Some(1));
    }
}
