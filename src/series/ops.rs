//! Ordering, uniqueness, transforms and user callbacks

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use num_traits::{Float, NumCast};

use crate::column::{
    map_chunked, map_numeric, with_numeric, zip_same, ArrayValue, ChunkedArray, NumericNative,
    PhysicalData,
};
use crate::core::any_value::AnyValue;
use crate::core::dtype::{get_supertype, DataType, IdxSize, IDX_DTYPE};
use crate::core::error::{Error, Result};
use crate::dataframe::DataFrame;
use crate::parallel;
use crate::series::Series;

/// Compares two rows of one column; nulls order after every value
pub(crate) type RowComparator = Box<dyn Fn(usize, usize) -> Ordering + Send + Sync>;

fn nulls_last<T>(a: &Option<T>, b: &Option<T>, cmp: impl Fn(&T, &T) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => cmp(a, b),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
    }
}

fn ord_comparator<T: ArrayValue + Ord>(ca: &ChunkedArray<T>) -> RowComparator {
    let values = ca.to_options();
    Box::new(move |i, j| nulls_last(&values[i], &values[j], |a, b| a.cmp(b)))
}

fn numeric_comparator<T: NumericNative>(ca: &ChunkedArray<T>) -> RowComparator {
    let values = ca.to_options();
    Box::new(move |i, j| nulls_last(&values[i], &values[j], |a, b| a.total_cmp_(b)))
}

/// Inclusive scan that leaves nulls in place and keeps accumulating
fn cumulative<T, F>(ca: &ChunkedArray<T>, reverse: bool, f: F) -> Result<ChunkedArray<T>>
where
    T: NumericNative,
    F: Fn(T, T) -> Option<T>,
{
    let mut values = ca.to_options();
    if reverse {
        values.reverse();
    }
    let mut acc: Option<T> = None;
    let mut out = Vec::with_capacity(values.len());
    for v in values {
        match v {
            Some(v) => {
                let next = match acc {
                    Some(a) => f(a, v).ok_or_else(|| {
                        Error::Overflow(format!("cumulative operation overflows at {:?}", v))
                    })?,
                    None => v,
                };
                acc = Some(next);
                out.push(Some(next));
            }
            None => out.push(None),
        }
    }
    if reverse {
        out.reverse();
    }
    Ok(ChunkedArray::from_options(out))
}

fn clip_ca<T: NumericNative>(ca: &ChunkedArray<T>, lo: &AnyValue, hi: &AnyValue) -> ChunkedArray<T> {
    let lo: Option<T> = lo.extract();
    let hi: Option<T> = hi.extract();
    ca.apply_values(|v| {
        let mut v = *v;
        if let Some(lo) = lo {
            if v < lo {
                v = lo;
            }
        }
        if let Some(hi) = hi {
            if v > hi {
                v = hi;
            }
        }
        v
    })
}

fn abs_ca<T: NumericNative>(ca: &ChunkedArray<T>) -> Result<ChunkedArray<T>> {
    ca.try_apply_opt(|v| match v {
        Some(v) => v
            .abs_()
            .map(Some)
            .ok_or_else(|| Error::Overflow(format!("abs of {:?} overflows", v))),
        None => Ok(None),
    })
}

fn float_map<T: NumericNative + Float>(ca: &ChunkedArray<T>, f: &dyn Fn(f64) -> f64) -> ChunkedArray<T> {
    ca.apply_values(|v| v.to_f64().map(f).and_then(|r| <T as NumCast>::from(r)).unwrap_or_else(T::nan))
}

impl Series {
    /// Row comparator over the logical values. Categoricals order by category.
    pub(crate) fn row_comparator(&self) -> Result<RowComparator> {
        if self.dtype() == &DataType::Categorical {
            return self.cast(&DataType::Utf8)?.row_comparator();
        }
        let cmp = match self.physical() {
            PhysicalData::Boolean(ca) => ord_comparator(ca),
            PhysicalData::Utf8(ca) => ord_comparator(ca),
            PhysicalData::Binary(ca) => ord_comparator(ca),
            PhysicalData::Decimal(ca) => ord_comparator(ca),
            data => with_numeric!(data, ca => numeric_comparator(ca),
                else return Err(Error::TypeMismatch(format!(
                    "cannot order values of dtype {}",
                    self.dtype()
                )))),
        };
        Ok(cmp)
    }

    /// Stable sort permutation. Nulls come last in both directions.
    pub(crate) fn arg_sort_indices(&self, reverse: bool) -> Result<Vec<IdxSize>> {
        let cmp = self.row_comparator()?;
        let mut idx: Vec<usize> = (0..self.len()).collect();
        let nulls = self.physical().is_null();
        let is_null = |i: usize| nulls.get(i).unwrap_or(false);
        idx.sort_by(|&a, &b| match (is_null(a), is_null(b)) {
            (false, false) => {
                let ord = cmp(a, b);
                if reverse {
                    ord.reverse()
                } else {
                    ord
                }
            }
            (na, nb) => na.cmp(&nb),
        });
        Ok(idx.into_iter().map(|i| i as IdxSize).collect())
    }

    /// Positions that would sort the Series
    pub fn argsort(&self, reverse: bool) -> Result<Series> {
        let idx = self.arg_sort_indices(reverse)?;
        Ok(Series::from_chunked(self.name(), ChunkedArray::from_vec(idx)))
    }

    pub fn sort(&self, reverse: bool) -> Result<Series> {
        let idx = self.arg_sort_indices(reverse)?;
        self.take(&idx)
    }

    /// Positions of the first occurrence of each distinct value
    pub fn arg_unique(&self) -> Result<Series> {
        let mut seen = HashSet::new();
        let idx: Vec<IdxSize> = self
            .iter()
            .enumerate()
            .filter(|(_, v)| seen.insert(v.clone()))
            .map(|(i, _)| i as IdxSize)
            .collect();
        Ok(Series::from_chunked(self.name(), ChunkedArray::from_vec(idx)))
    }

    /// Distinct values in order of first appearance
    pub fn unique(&self) -> Result<Series> {
        let idx = self.arg_unique()?;
        self.take(idx.unpack::<IdxSize>()?.cont_slice()?)
    }

    fn occurrence_counts(&self) -> HashMap<AnyValue, usize> {
        let mut counts = HashMap::new();
        for v in self.iter() {
            *counts.entry(v).or_insert(0) += 1;
        }
        counts
    }

    /// Whether each value occurs exactly once
    pub fn is_unique(&self) -> Result<Series> {
        let counts = self.occurrence_counts();
        let mask: Vec<bool> = self.iter().map(|v| counts.get(&v) == Some(&1)).collect();
        Ok(Series::new(self.name(), mask))
    }

    pub fn is_duplicated(&self) -> Result<Series> {
        let counts = self.occurrence_counts();
        let mask: Vec<bool> = self.iter().map(|v| counts.get(&v).copied().unwrap_or(0) > 1).collect();
        Ok(Series::new(self.name(), mask))
    }

    /// Whether each row is the first occurrence of its value
    pub fn is_first(&self) -> Result<Series> {
        let mut seen = HashSet::new();
        let mask: Vec<bool> = self.iter().map(|v| seen.insert(v)).collect();
        Ok(Series::new(self.name(), mask))
    }

    /// Distinct values with their counts, most frequent first
    pub fn value_counts(&self) -> Result<DataFrame> {
        let counts = self.occurrence_counts();
        let first = self.arg_unique()?;
        let mut order: Vec<(IdxSize, IdxSize)> = first
            .unpack::<IdxSize>()?
            .iter()
            .flatten()
            .map(|&i| {
                let n = counts.get(&self.get_any(i as usize)).copied().unwrap_or(0);
                (i, n as IdxSize)
            })
            .collect();
        order.sort_by(|a, b| b.1.cmp(&a.1));
        let idx: Vec<IdxSize> = order.iter().map(|(i, _)| *i).collect();
        let values = self.take(&idx)?;
        let counts = Series::from_chunked(
            "counts",
            ChunkedArray::from_vec(order.iter().map(|(_, n)| *n).collect()),
        );
        DataFrame::new(vec![values, counts])
    }

    /// Shift values by `periods`; vacated slots are null
    pub fn shift(&self, periods: i64) -> Result<Series> {
        let data = map_chunked!(self.physical(), ca => ca.shift_and_fill(periods, None), "shift");
        Ok(self.with_physical_data(data))
    }

    /// Shift values by `periods`, filling vacated slots with `fill`
    pub fn shift_and_fill(&self, periods: i64, fill: impl Into<AnyValue>) -> Result<Series> {
        let mut out = self.shift(periods)?;
        let n = (periods.unsigned_abs() as usize).min(self.len());
        let len = self.len();
        let mask: Vec<bool> = (0..len)
            .map(|i| if periods >= 0 { i < n } else { i >= len - n })
            .collect();
        out.set(&Series::new("mask", mask), fill.into())?;
        Ok(out)
    }

    /// Difference with the value `n` positions earlier
    pub fn diff(&self, n: i64) -> Result<Series> {
        let base = if self.dtype().is_unsigned_integer() {
            self.cast(&DataType::Int64)?
        } else {
            self.clone()
        };
        base.try_sub(&base.shift(n)?)
    }

    fn cumulative_op(&self, op: &str, reverse: bool, kind: CumKind) -> Result<Series> {
        let source = match (kind, self.dtype()) {
            (CumKind::Sum | CumKind::Prod, DataType::Boolean) => self.cast(&IDX_DTYPE)?,
            (CumKind::Sum | CumKind::Prod, DataType::UInt64) => self.clone(),
            (CumKind::Sum | CumKind::Prod, d) if d.is_integer() => self.cast(&DataType::Int64)?,
            (_, d) if d.is_integer() || d.is_float() => self.clone(),
            (_, d) => {
                return Err(Error::TypeMismatch(format!(
                    "`{}` is not defined for dtype {}",
                    op, d
                )))
            }
        };
        let data = map_numeric!(source.physical(), ca => match kind {
            CumKind::Sum => cumulative(ca, reverse, |a, b| a.checked_add_(b))?,
            CumKind::Prod => cumulative(ca, reverse, |a, b| a.checked_mul_(b))?,
            CumKind::Min => cumulative(ca, reverse, |a, b| Some(if b < a { b } else { a }))?,
            CumKind::Max => cumulative(ca, reverse, |a, b| Some(if b > a { b } else { a }))?,
        }, else unreachable_dtype(op, source.dtype())?);
        Ok(Series::from_physical_unchecked(self.name(), source.dtype().clone(), data))
    }

    pub fn cumsum(&self, reverse: bool) -> Result<Series> {
        self.cumulative_op("cumsum", reverse, CumKind::Sum)
    }

    pub fn cumprod(&self, reverse: bool) -> Result<Series> {
        self.cumulative_op("cumprod", reverse, CumKind::Prod)
    }

    pub fn cummin(&self, reverse: bool) -> Result<Series> {
        self.cumulative_op("cummin", reverse, CumKind::Min)
    }

    pub fn cummax(&self, reverse: bool) -> Result<Series> {
        self.cumulative_op("cummax", reverse, CumKind::Max)
    }

    /// Bound values to `[min, max]`; a null bound leaves that side open
    pub fn clip(&self, min: impl Into<AnyValue>, max: impl Into<AnyValue>) -> Result<Series> {
        let (lo, hi) = (min.into(), max.into());
        let data = map_numeric!(self.physical(), ca => clip_ca(ca, &lo, &hi),
            else unreachable_dtype("clip", self.dtype())?);
        Ok(self.with_physical_data(data))
    }

    pub fn abs(&self) -> Result<Series> {
        let data = map_numeric!(self.physical(), ca => abs_ca(ca)?,
            else unreachable_dtype("abs", self.dtype())?);
        Ok(self.with_physical_data(data))
    }

    /// Apply a float function; integers are computed in Float64
    fn float_unary(&self, op: &str, f: &dyn Fn(f64) -> f64) -> Result<Series> {
        let source = if self.dtype().is_integer() {
            self.cast(&DataType::Float64)?
        } else {
            self.clone()
        };
        let data = match source.physical() {
            PhysicalData::Float32(ca) => PhysicalData::Float32(float_map(ca, f)),
            PhysicalData::Float64(ca) => PhysicalData::Float64(float_map(ca, f)),
            _ => return unreachable_dtype(op, self.dtype()),
        };
        Ok(source.with_physical_data(data))
    }

    /// Round floats to `decimals` places; integers are returned unchanged
    pub fn round(&self, decimals: u32) -> Result<Series> {
        if self.dtype().is_integer() {
            return Ok(self.clone());
        }
        let factor = 10f64.powi(decimals as i32);
        self.float_unary("round", &|v| (v * factor).round() / factor)
    }

    pub fn floor(&self) -> Result<Series> {
        if self.dtype().is_integer() {
            return Ok(self.clone());
        }
        self.float_unary("floor", &f64::floor)
    }

    pub fn ceil(&self) -> Result<Series> {
        if self.dtype().is_integer() {
            return Ok(self.clone());
        }
        self.float_unary("ceil", &f64::ceil)
    }

    pub fn sqrt(&self) -> Result<Series> {
        self.float_unary("sqrt", &f64::sqrt)
    }

    pub fn exp(&self) -> Result<Series> {
        self.float_unary("exp", &f64::exp)
    }

    /// Logarithm in `base`
    pub fn log(&self, base: f64) -> Result<Series> {
        self.float_unary("log", &|v| v.log(base))
    }

    pub fn pow(&self, exponent: f64) -> Result<Series> {
        self.float_unary("pow", &|v| v.powf(exponent))
    }

    /// Whether each value occurs in `other`; nulls stay null
    pub fn is_in(&self, other: &Series) -> Result<Series> {
        let other = match (self.dtype(), other.dtype()) {
            (DataType::Categorical, _) => other.cast(&DataType::Utf8)?,
            (a, b) if a == b => other.clone(),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                let st = get_supertype(a, b).ok_or_else(|| {
                    Error::TypeMismatch(format!("cannot compare {} with {}", a, b))
                })?;
                return self.cast(&st)?.is_in(&other.cast(&st)?);
            }
            _ => other.cast(self.dtype())?,
        };
        let set: HashSet<AnyValue> = other.iter().filter(|v| !v.is_null()).collect();
        let mask: ChunkedArray<bool> = self
            .iter()
            .map(|v| if v.is_null() { None } else { Some(set.contains(&v)) })
            .collect();
        Ok(Series::from_chunked(self.name(), mask))
    }

    /// Take from `self` where `mask` is true and from `other` elsewhere
    pub fn zip_with(&self, mask: &Series, other: &Series) -> Result<Series> {
        let mask = mask.bool()?;
        if self.dtype() == &DataType::Categorical || other.dtype() == &DataType::Categorical {
            let out = self
                .cast(&DataType::Utf8)?
                .zip_with(&Series::from_chunked("mask", mask.clone()), &other.cast(&DataType::Utf8)?)?;
            return out.cast(&DataType::Categorical);
        }
        let (lhs, rhs) = if self.dtype() == other.dtype() {
            (self.clone(), other.clone())
        } else {
            let st = get_supertype(self.dtype(), other.dtype()).ok_or_else(|| {
                Error::TypeMismatch(format!(
                    "cannot combine {} with {}",
                    self.dtype(),
                    other.dtype()
                ))
            })?;
            (self.cast(&st)?, other.cast(&st)?)
        };
        let data = zip_same!(lhs.physical(), rhs.physical(), a, b => {
            ArrayValue::into_physical(a.zip_with(mask, b)?)
        }, else return Err(Error::TypeMismatch(format!(
            "`zip_with` is not supported for dtype {}",
            lhs.dtype()
        ))));
        Ok(lhs.with_physical_data(data))
    }

    /// Flatten a List Series; empty and null lists become one null row
    pub fn explode(&self) -> Result<Series> {
        let inner_dtype = match self.dtype() {
            DataType::List(inner) => (**inner).clone(),
            other => {
                return Err(Error::TypeMismatch(format!(
                    "`explode` needs a List Series, got {}",
                    other
                )))
            }
        };
        let mut out = Series::new_empty(self.name(), Some(&inner_dtype));
        for v in self.list()?.iter() {
            match v {
                Some(inner) if !inner.is_empty() => {
                    out.append(&inner.cast(&inner_dtype)?)?;
                }
                _ => {
                    out.append(&Series::full_null(self.name(), 1, &inner_dtype))?;
                }
            }
        }
        Ok(out.with_name(self.name()))
    }

    /// Apply `f` to every value. Nulls are passed as [`AnyValue::Null`].
    ///
    /// The result dtype is inferred from the returned values unless
    /// `return_dtype` is given. Errors from `f` are returned unchanged.
    pub fn apply<F>(&self, f: F, return_dtype: Option<&DataType>, parallel: bool) -> Result<Series>
    where
        F: Fn(AnyValue) -> Result<AnyValue> + Send + Sync,
    {
        if self.dtype().is_numeric() || self.dtype() == &DataType::Boolean {
            log::warn!(
                "element-wise apply over Series '{}' of dtype {} runs once per row; \
                 prefer a native kernel or a batch `map`",
                self.name(),
                self.dtype()
            );
        }
        let results = parallel::map_range(self.len(), parallel, |i| f(self.get_any(i)));
        let values = results.into_iter().collect::<Result<Vec<_>>>()?;
        let out = Series::from_any_values(self.name(), &values, false)?;
        match return_dtype {
            Some(dtype) => out.cast(dtype),
            None => Ok(out),
        }
    }

    /// Apply `f` once to the whole Series
    pub fn map<F>(&self, f: F) -> Result<Series>
    where
        F: FnOnce(&Series) -> Result<Series>,
    {
        Ok(f(self)?.with_name(self.name()))
    }
}

#[derive(Debug, Clone, Copy)]
enum CumKind {
    Sum,
    Prod,
    Min,
    Max,
}

fn unreachable_dtype<T>(op: &str, dtype: &DataType) -> Result<T> {
    Err(Error::TypeMismatch(format!(
        "`{}` is not defined for dtype {}",
        op, dtype
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cumulative_skips_nulls() {
        let ca = ChunkedArray::from_options(vec![Some(1i64), None, Some(2), Some(3)]);
        let out = cumulative(&ca, false, |a, b| a.checked_add_(b)).unwrap();
        assert_eq!(out.to_options(), vec![Some(1), None, Some(3), Some(6)]);
        let out = cumulative(&ca, true, |a, b| a.checked_add_(b)).unwrap();
        assert_eq!(out.to_options(), vec![Some(6), None, Some(5), Some(3)]);
    }

    #[test]
    fn test_sort_nulls_last() {
        let s = Series::new("a", vec![Some(2i32), None, Some(1)]);
        let sorted = s.sort(false).unwrap();
        assert_eq!(sorted.i32().unwrap().to_options(), vec![Some(1), Some(2), None]);
        let sorted = s.sort(true).unwrap();
        assert_eq!(sorted.i32().unwrap().to_options(), vec![Some(2), Some(1), None]);
    }

    #[test]
    fn test_unique_first_appearance() {
        let s = Series::new("a", vec!["b", "a", "b", "c"]);
        let u = s.unique().unwrap();
        assert_eq!(
            u.utf8().unwrap().to_options(),
            vec![Some("b".to_string()), Some("a".to_string()), Some("c".to_string())]
        );
    }
}
