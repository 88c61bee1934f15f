//! Grouping rows of a DataFrame by key columns and reducing each group

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::core::any_value::AnyValue;
use crate::core::dtype::{DataType, IdxSize};
use crate::core::error::{Error, Result};
use crate::dataframe::DataFrame;
use crate::parallel;
use crate::series::Series;

/// Aggregation function types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggFunction {
    First,
    Last,
    Sum,
    Min,
    Max,
    Mean,
    Median,
    /// Number of non-null values
    Count,
    /// Number of distinct values, null included
    NUnique,
}

impl AggFunction {
    /// Get function name as string
    pub fn name(&self) -> &'static str {
        match self {
            AggFunction::First => "first",
            AggFunction::Last => "last",
            AggFunction::Sum => "sum",
            AggFunction::Min => "min",
            AggFunction::Max => "max",
            AggFunction::Mean => "mean",
            AggFunction::Median => "median",
            AggFunction::Count => "count",
            AggFunction::NUnique => "n_unique",
        }
    }

    /// Reducers that only make sense over numeric columns
    pub fn is_numeric_only(&self) -> bool {
        matches!(self, AggFunction::Sum | AggFunction::Mean | AggFunction::Median)
    }
}

impl fmt::Display for AggFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AggFunction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "first" => Ok(AggFunction::First),
            "last" => Ok(AggFunction::Last),
            "sum" => Ok(AggFunction::Sum),
            "min" | "minimum" => Ok(AggFunction::Min),
            "max" | "maximum" => Ok(AggFunction::Max),
            "mean" | "avg" | "average" => Ok(AggFunction::Mean),
            "median" => Ok(AggFunction::Median),
            "count" => Ok(AggFunction::Count),
            "n_unique" | "nunique" => Ok(AggFunction::NUnique),
            other => Err(Error::InvalidValue(format!(
                "unknown aggregation function '{}'",
                other
            ))),
        }
    }
}

fn ensure_numeric(s: &Series, agg: AggFunction) -> Result<()> {
    if s.is_numeric() || s.is_boolean() {
        Ok(())
    } else {
        Err(Error::TypeMismatch(format!(
            "cannot compute {} of column '{}' with dtype {}",
            agg,
            s.name(),
            s.dtype()
        )))
    }
}

/// Reduce `s` over each row group; the result has one row per group
pub(crate) fn reduce_groups(
    s: &Series,
    groups: &[Vec<IdxSize>],
    agg: AggFunction,
    parallel: bool,
) -> Result<Series> {
    let n = groups.len();
    match agg {
        AggFunction::First => {
            let picks: Vec<_> = groups.iter().map(|g| g.first().copied()).collect();
            s.take_opt(&picks)
        }
        AggFunction::Last => {
            let picks: Vec<_> = groups.iter().map(|g| g.last().copied()).collect();
            s.take_opt(&picks)
        }
        AggFunction::Min | AggFunction::Max => {
            let cmp = s.row_comparator()?;
            let picks: Vec<Option<IdxSize>> = parallel::map_range(n, parallel, |i| {
                let group = &groups[i];
                if agg == AggFunction::Min {
                    // nulls sort last, so a null only wins in an all-null group
                    group
                        .iter()
                        .copied()
                        .min_by(|a, b| cmp(*a as usize, *b as usize))
                } else {
                    group
                        .iter()
                        .copied()
                        .filter(|idx| !s.get_any(*idx as usize).is_null())
                        .max_by(|a, b| cmp(*a as usize, *b as usize))
                        .or_else(|| group.first().copied())
                }
            });
            s.take_opt(&picks)
        }
        AggFunction::Sum => {
            ensure_numeric(s, agg)?;
            let dtype = s.clear().sum()?.dtype().unwrap_or(DataType::Float64);
            let sums = parallel::map_range(n, parallel, |i| s.take(&groups[i])?.sum())
                .into_iter()
                .collect::<Result<Vec<_>>>()?;
            Series::from_any_values_and_dtype(s.name(), &sums, &dtype, true)
        }
        AggFunction::Mean | AggFunction::Median => {
            ensure_numeric(s, agg)?;
            let values = parallel::map_range(n, parallel, |i| {
                let group = s.take(&groups[i])?;
                Ok(if agg == AggFunction::Mean {
                    group.mean()
                } else {
                    group.median()
                })
            })
            .into_iter()
            .collect::<Result<Vec<Option<f64>>>>()?;
            Ok(Series::new(s.name(), values))
        }
        AggFunction::Count => {
            let counts = parallel::map_range(n, parallel, |i| {
                let group = &groups[i];
                Ok((group.len() - s.take(group)?.null_count()) as IdxSize)
            })
            .into_iter()
            .collect::<Result<Vec<IdxSize>>>()?;
            Ok(Series::new(s.name(), counts))
        }
        AggFunction::NUnique => {
            let counts = parallel::map_range(n, parallel, |i| {
                Ok(s.take(&groups[i])?.n_unique()? as IdxSize)
            })
            .into_iter()
            .collect::<Result<Vec<IdxSize>>>()?;
            Ok(Series::new(s.name(), counts))
        }
    }
}

/// Row groups of a DataFrame keyed by the values of `by` columns
#[derive(Debug, Clone)]
pub struct GroupBy<'a> {
    /// Source DataFrame
    df: &'a DataFrame,

    /// Key column names
    by: Vec<String>,

    /// Row indices per group, groups in first-appearance order
    groups: Vec<Vec<IdxSize>>,

    parallel: bool,
}

impl<'a> GroupBy<'a> {
    /// Group the rows of `df` by the key tuple of the `by` columns
    pub fn new(df: &'a DataFrame, by: &[&str]) -> Result<Self> {
        if by.is_empty() {
            return Err(Error::InvalidOperation(
                "groupby needs at least one key column".to_string(),
            ));
        }
        let keys = by
            .iter()
            .map(|name| df.column(name))
            .collect::<Result<Vec<_>>>()?;

        let mut lookup: HashMap<Vec<AnyValue>, usize> = HashMap::new();
        let mut groups: Vec<Vec<IdxSize>> = Vec::new();
        for row in 0..df.height() {
            let key: Vec<AnyValue> = keys.iter().map(|s| s.get_any(row)).collect();
            let next = groups.len();
            let gid = *lookup.entry(key).or_insert(next);
            if gid == next {
                groups.push(Vec::new());
            }
            groups[gid].push(row as IdxSize);
        }
        log::debug!("grouped {} rows by {:?} into {} groups", df.height(), by, groups.len());

        Ok(GroupBy {
            df,
            by: by.iter().map(|s| s.to_string()).collect(),
            groups,
            parallel: false,
        })
    }

    /// Reduce groups on the worker pool
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Get the number of groups
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Row indices of each group
    pub fn groups(&self) -> &[Vec<IdxSize>] {
        &self.groups
    }

    pub fn by(&self) -> &[String] {
        &self.by
    }

    /// One row per group holding the key values
    pub fn keys(&self) -> Result<DataFrame> {
        let first: Vec<IdxSize> = self.groups.iter().map(|g| g[0]).collect();
        let columns = self
            .by
            .iter()
            .map(|name| self.df.column(name)?.take(&first))
            .collect::<Result<Vec<_>>>()?;
        DataFrame::new(columns)
    }

    /// Keys plus the row count of each group
    pub fn size(&self) -> Result<DataFrame> {
        let sizes: Vec<IdxSize> = self.groups.iter().map(|g| g.len() as IdxSize).collect();
        let mut out = self.keys()?;
        out.with_column(Series::new("size", sizes))?;
        Ok(out)
    }

    /// Reduce one column; the output column is named `<column>_<reducer>`
    pub fn agg(&self, column: &str, agg: AggFunction) -> Result<DataFrame> {
        self.agg_many(&[(column, agg)])
    }

    /// Several `(column, reducer)` aggregations side by side after the keys
    pub fn agg_many(&self, aggs: &[(&str, AggFunction)]) -> Result<DataFrame> {
        let mut columns = self.keys()?.into_columns();
        for (column, agg) in aggs {
            let reduced = reduce_groups(self.df.column(column)?, &self.groups, *agg, self.parallel)?;
            columns.push(reduced.with_name(&format!("{}_{}", column, agg)));
        }
        DataFrame::new(columns)
    }

    /// Apply `agg` to every non-key column. Numeric-only reducers skip
    /// columns of other dtypes.
    fn agg_all(&self, agg: AggFunction) -> Result<DataFrame> {
        let targets: Vec<&str> = self
            .df
            .get_columns()
            .iter()
            .filter(|s| !self.by.iter().any(|k| k == s.name()))
            .filter(|s| {
                let keep = !agg.is_numeric_only() || s.is_numeric() || s.is_boolean();
                if !keep {
                    log::debug!("{} skips non-numeric column '{}'", agg, s.name());
                }
                keep
            })
            .map(|s| s.name())
            .collect();
        let aggs: Vec<(&str, AggFunction)> = targets.into_iter().map(|c| (c, agg)).collect();
        self.agg_many(&aggs)
    }

    pub fn first(&self) -> Result<DataFrame> {
        self.agg_all(AggFunction::First)
    }

    pub fn last(&self) -> Result<DataFrame> {
        self.agg_all(AggFunction::Last)
    }

    pub fn sum(&self) -> Result<DataFrame> {
        self.agg_all(AggFunction::Sum)
    }

    pub fn min(&self) -> Result<DataFrame> {
        self.agg_all(AggFunction::Min)
    }

    pub fn max(&self) -> Result<DataFrame> {
        self.agg_all(AggFunction::Max)
    }

    pub fn mean(&self) -> Result<DataFrame> {
        self.agg_all(AggFunction::Mean)
    }

    pub fn median(&self) -> Result<DataFrame> {
        self.agg_all(AggFunction::Median)
    }

    pub fn count(&self) -> Result<DataFrame> {
        self.agg_all(AggFunction::Count)
    }

    pub fn n_unique(&self) -> Result<DataFrame> {
        self.agg_all(AggFunction::NUnique)
    }
}

impl DataFrame {
    /// Group rows by the values of the `by` columns
    pub fn groupby(&self, by: &[&str]) -> Result<GroupBy<'_>> {
        GroupBy::new(self, by)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales() -> DataFrame {
        DataFrame::new(vec![
            Series::new("shop", vec!["b", "a", "b", "a", "c"]),
            Series::new("units", vec![Some(1i64), Some(2), None, Some(4), None]),
        ])
        .unwrap()
    }

    #[test]
    fn test_keys_in_first_appearance_order() {
        let df = sales();
        let gb = df.groupby(&["shop"]).unwrap();
        assert_eq!(gb.group_count(), 3);
        let keys = gb.keys().unwrap();
        assert_eq!(
            keys.column("shop").unwrap().utf8().unwrap().non_null_values(),
            vec!["b".to_string(), "a".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn test_min_max_skip_nulls() {
        let df = sales();
        let gb = df.groupby(&["shop"]).unwrap();
        let out = gb.max().unwrap();
        assert_eq!(
            out.column("units_max").unwrap().i64().unwrap().to_options(),
            vec![Some(1), Some(4), None]
        );
        let out = gb.count().unwrap();
        assert_eq!(
            out.column("units_count").unwrap().to_list(),
            vec![AnyValue::from(1 as IdxSize), AnyValue::from(2 as IdxSize), AnyValue::from(0 as IdxSize)]
        );
    }

    #[test]
    fn test_parse_agg_function() {
        assert_eq!("avg".parse::<AggFunction>().unwrap(), AggFunction::Mean);
        assert!("mode".parse::<AggFunction>().is_err());
    }
}
