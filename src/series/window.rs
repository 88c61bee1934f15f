//! Rolling window operations for Series
//!
//! A window of fixed size slides over the logical sequence. A position yields
//! a value only when its window holds at least `min_periods` non-null values.

use crate::core::any_value::AnyValue;
use crate::core::dtype::DataType;
use crate::core::error::{Error, Result};
use crate::parallel;
use crate::series::aggregate::{quantile_sorted, skewness, sort_floats, variance};
use crate::series::{QuantileInterpolation, Series};

/// Rolling window configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RollingOptions {
    /// Number of slots in the window
    pub window_size: usize,
    /// Minimum non-null values for a result; defaults to `window_size`
    pub min_periods: Option<usize>,
    /// Label the result at the window middle instead of its trailing edge
    pub center: bool,
    /// Per-slot multipliers applied before aggregation
    pub weights: Option<Vec<f64>>,
    /// Run on the worker pool
    pub parallel: bool,
}

impl RollingOptions {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            min_periods: None,
            center: false,
            weights: None,
            parallel: false,
        }
    }

    pub fn min_periods(mut self, min_periods: usize) -> Self {
        self.min_periods = Some(min_periods);
        self
    }

    pub fn center(mut self, center: bool) -> Self {
        self.center = center;
        self
    }

    pub fn weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    fn effective_min_periods(&self) -> usize {
        self.min_periods.unwrap_or(self.window_size)
    }

    fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(Error::InvalidValue(
                "Window size must be greater than 0".to_string(),
            ));
        }
        if let Some(w) = &self.weights {
            if w.len() != self.window_size {
                return Err(Error::LengthMismatch {
                    expected: self.window_size,
                    actual: w.len(),
                });
            }
        }
        Ok(())
    }

    /// Window `[start, end)` for position `i`, and the nominal start the
    /// weights are aligned to (negative before the first row)
    fn bounds(&self, i: usize, len: usize) -> (usize, usize, isize) {
        let w = self.window_size;
        let back = if self.center { w / 2 } else { w - 1 };
        let nominal = i as isize - back as isize;
        let start = nominal.max(0) as usize;
        let end = (nominal + w as isize).min(len as isize) as usize;
        (start, end, nominal)
    }

    fn weight(&self, j: usize, nominal: isize) -> f64 {
        self.weights
            .as_ref()
            .map(|w| w[(j as isize - nominal) as usize])
            .unwrap_or(1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum RollingAgg {
    Min,
    Max,
    Sum,
    Mean,
    Var,
    Std,
    Quantile(f64, QuantileInterpolation),
    Skew(bool),
}

impl RollingAgg {
    fn apply(&self, window: &mut Vec<f64>) -> Option<f64> {
        match self {
            RollingAgg::Min => window.iter().copied().reduce(f64::min),
            RollingAgg::Max => window.iter().copied().reduce(f64::max),
            RollingAgg::Sum => Some(window.iter().sum()),
            RollingAgg::Mean => {
                if window.is_empty() {
                    None
                } else {
                    Some(window.iter().sum::<f64>() / window.len() as f64)
                }
            }
            RollingAgg::Var => variance(window, 1),
            RollingAgg::Std => variance(window, 1).map(f64::sqrt),
            RollingAgg::Quantile(q, interpolation) => {
                sort_floats(window);
                quantile_sorted(window, *q, *interpolation)
            }
            RollingAgg::Skew(bias) => skewness(window, *bias),
        }
    }

    /// Whether an unweighted result can take the input's integer dtype
    fn keeps_dtype(&self) -> bool {
        matches!(self, RollingAgg::Min | RollingAgg::Max | RollingAgg::Sum)
    }
}

impl Series {
    fn rolling_agg(&self, agg: RollingAgg, options: &RollingOptions) -> Result<Series> {
        options.validate()?;
        let values = self.f64_options()?;
        let len = values.len();
        let min_periods = options.effective_min_periods();

        let out: Vec<Option<f64>> = parallel::map_range(len, options.parallel, |i| {
            let (start, end, nominal) = options.bounds(i, len);
            let mut window = Vec::with_capacity(end - start);
            for (j, v) in values.iter().enumerate().take(end).skip(start) {
                if let Some(v) = v {
                    window.push(v * options.weight(j, nominal));
                }
            }
            if window.len() < min_periods {
                None
            } else {
                agg.apply(&mut window)
            }
        });

        let result = Series::new(self.name(), out);
        if agg.keeps_dtype() && options.weights.is_none() && self.dtype().is_integer() {
            return result.cast(self.dtype());
        }
        Ok(result)
    }

    pub fn rolling_min(&self, options: &RollingOptions) -> Result<Series> {
        self.rolling_agg(RollingAgg::Min, options)
    }

    pub fn rolling_max(&self, options: &RollingOptions) -> Result<Series> {
        self.rolling_agg(RollingAgg::Max, options)
    }

    /// Rolling sum. With the default `min_periods` the first
    /// `window_size - 1` positions are null.
    ///
    /// # Example
    /// ```
    /// use colrs::Series;
    /// use colrs::series::RollingOptions;
    ///
    /// let s = Series::new("a", vec![1.0f64, 2.0, 3.0, 4.0]);
    /// let out = s.rolling_sum(&RollingOptions::new(2)).unwrap();
    /// assert_eq!(out.f64().unwrap().to_options(), vec![None, Some(3.0), Some(5.0), Some(7.0)]);
    /// ```
    pub fn rolling_sum(&self, options: &RollingOptions) -> Result<Series> {
        self.rolling_agg(RollingAgg::Sum, options)
    }

    pub fn rolling_mean(&self, options: &RollingOptions) -> Result<Series> {
        self.rolling_agg(RollingAgg::Mean, options)
    }

    /// Sample variance (ddof = 1) per window
    pub fn rolling_var(&self, options: &RollingOptions) -> Result<Series> {
        self.rolling_agg(RollingAgg::Var, options)
    }

    pub fn rolling_std(&self, options: &RollingOptions) -> Result<Series> {
        self.rolling_agg(RollingAgg::Std, options)
    }

    pub fn rolling_median(&self, options: &RollingOptions) -> Result<Series> {
        self.rolling_agg(RollingAgg::Quantile(0.5, QuantileInterpolation::Linear), options)
    }

    pub fn rolling_quantile(
        &self,
        quantile: f64,
        interpolation: QuantileInterpolation,
        options: &RollingOptions,
    ) -> Result<Series> {
        if !(0.0..=1.0).contains(&quantile) {
            return Err(Error::InvalidValue(format!(
                "quantile must be between 0 and 1, got {}",
                quantile
            )));
        }
        self.rolling_agg(RollingAgg::Quantile(quantile, interpolation), options)
    }

    pub fn rolling_skew(&self, bias: bool, options: &RollingOptions) -> Result<Series> {
        self.rolling_agg(RollingAgg::Skew(bias), options)
    }

    /// Apply `f` to each qualifying window.
    ///
    /// The callback receives the window as a Series (weights already applied)
    /// and runs once per window, so the cost is `O(n * window_size)`. Errors
    /// from the callback are returned unchanged.
    pub fn rolling_apply<F>(&self, f: F, options: &RollingOptions) -> Result<Series>
    where
        F: Fn(&Series) -> Result<AnyValue> + Send + Sync,
    {
        options.validate()?;
        let len = self.len();
        let min_periods = options.effective_min_periods();
        let source = if options.weights.is_some() {
            self.cast(&DataType::Float64)?
        } else {
            self.clone()
        };

        let results: Vec<Result<AnyValue>> = parallel::map_range(len, options.parallel, |i| {
            let (start, end, nominal) = options.bounds(i, len);
            let mut window = source.slice(start as i64, end - start);
            if window.len() - window.null_count() < min_periods {
                return Ok(AnyValue::Null);
            }
            if let Some(weights) = &options.weights {
                let offset = (start as isize - nominal) as usize;
                let w = Series::new("weights", weights[offset..offset + window.len()].to_vec());
                window = window.try_mul(&w)?;
            }
            f(&window)
        });

        let values = results.into_iter().collect::<Result<Vec<_>>>()?;
        Series::from_any_values(self.name(), &values, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_trailing_and_centered() {
        let opts = RollingOptions::new(3);
        assert_eq!(opts.bounds(0, 5), (0, 1, -2));
        assert_eq!(opts.bounds(4, 5), (2, 5, 2));
        let opts = RollingOptions::new(3).center(true);
        assert_eq!(opts.bounds(0, 5), (0, 2, -1));
        assert_eq!(opts.bounds(2, 5), (1, 4, 1));
        assert_eq!(opts.bounds(4, 5), (3, 5, 3));
    }

    #[test]
    fn test_weights_length_checked() {
        let s = Series::new("a", vec![1.0f64, 2.0]);
        let opts = RollingOptions::new(2).weights(vec![1.0]);
        assert!(s.rolling_mean(&opts).is_err());
    }

    #[test]
    fn test_leading_nulls() {
        let s = Series::new("a", vec![1i64, 2, 3, 4, 5]);
        let out = s.rolling_sum(&RollingOptions::new(3)).unwrap();
        assert_eq!(out.dtype(), &DataType::Int64);
        assert_eq!(
            out.i64().unwrap().to_options(),
            vec![None, None, Some(6), Some(9), Some(12)]
        );
    }
}
