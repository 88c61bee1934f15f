use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt::{self, Display};

use crate::core::any_value::AnyValue;
use crate::core::dtype::{DataType, Field, IdxSize};
use crate::core::error::{ensure, Error, Result};
use crate::expr::eval::evaluate_exprs;
use crate::expr::Expr;
use crate::series::Series;

/// DataFrame struct: ordered, equal-length, uniquely named columns
#[derive(Debug, Clone, Default)]
pub struct DataFrame {
    columns: Vec<Series>,
}

fn check_unique_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(Error::DuplicateColumnName(name.to_string()));
        }
    }
    Ok(())
}

impl DataFrame {
    /// Create a DataFrame from columns of equal length and unique names
    ///
    /// # Example
    /// ```
    /// use colrs::{DataFrame, Series};
    ///
    /// let df = DataFrame::new(vec![
    ///     Series::new("k", vec![1i64, 2]),
    ///     Series::new("v", vec!["a", "b"]),
    /// ]).unwrap();
    /// assert_eq!(df.shape(), (2, 2));
    /// ```
    pub fn new(columns: Vec<Series>) -> Result<Self> {
        if let Some(first) = columns.first() {
            let height = first.len();
            for s in &columns[1..] {
                if s.len() != height {
                    return Err(Error::ShapeMismatch(format!(
                        "column '{}' has length {}, expected {} (length of column '{}')",
                        s.name(),
                        s.len(),
                        height,
                        first.name()
                    )));
                }
            }
        }
        check_unique_names(columns.iter().map(|s| s.name()))?;
        Ok(Self { columns })
    }

    /// A DataFrame without columns
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new_no_checks(columns: Vec<Series>) -> Self {
        Self { columns }
    }

    /// (height, width)
    pub fn shape(&self) -> (usize, usize) {
        (self.height(), self.width())
    }

    pub fn height(&self) -> usize {
        self.columns.first().map(|s| s.len()).unwrap_or(0)
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.height() == 0
    }

    pub fn get_columns(&self) -> &[Series] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Series> {
        self.columns
    }

    pub fn get_column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|s| s.name()).collect()
    }

    /// Names and dtypes in column order
    pub fn schema(&self) -> Vec<Field> {
        self.columns
            .iter()
            .map(|s| Field::new(s.name(), s.dtype().clone()))
            .collect()
    }

    pub fn dtypes(&self) -> Vec<DataType> {
        self.columns.iter().map(|s| s.dtype().clone()).collect()
    }

    pub fn contains_column(&self, name: &str) -> bool {
        self.find_idx_by_name(name).is_some()
    }

    pub fn find_idx_by_name(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|s| s.name() == name)
    }

    fn try_idx(&self, name: &str) -> Result<usize> {
        self.find_idx_by_name(name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
    }

    /// Column by name
    pub fn column(&self, name: &str) -> Result<&Series> {
        Ok(&self.columns[self.try_idx(name)?])
    }

    pub fn columns(&self, names: &[&str]) -> Result<Vec<&Series>> {
        names.iter().map(|n| self.column(n)).collect()
    }

    /// New DataFrame with the named columns, in the given order
    pub fn select_columns(&self, names: &[&str]) -> Result<DataFrame> {
        check_unique_names(names.iter().copied())?;
        let columns = names
            .iter()
            .map(|n| self.column(n).cloned())
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new_no_checks(columns))
    }

    /// Add `series`, or replace the column of the same name. A unit-length
    /// Series is broadcast to the height of a non-empty frame.
    pub fn with_column(&mut self, series: Series) -> Result<&mut Self> {
        let series = self.fit_height(series)?;
        match self.find_idx_by_name(series.name()) {
            Some(idx) => self.columns[idx] = series,
            None => self.columns.push(series),
        }
        Ok(self)
    }

    fn fit_height(&self, series: Series) -> Result<Series> {
        if self.columns.is_empty() || series.len() == self.height() {
            return Ok(series);
        }
        if series.len() == 1 {
            let value = series.get_any(0);
            let broadcast = Series::from_any_values(series.name(), &vec![value; self.height()], false)?;
            return broadcast.cast(series.dtype());
        }
        Err(Error::ShapeMismatch(format!(
            "column '{}' has length {}, DataFrame has height {}",
            series.name(),
            series.len(),
            self.height()
        )))
    }

    /// Rename column `old` to `new`
    pub fn rename(&mut self, old: &str, new: &str) -> Result<&mut Self> {
        let idx = self.try_idx(old)?;
        if old != new && self.contains_column(new) {
            return Err(Error::DuplicateColumnName(new.to_string()));
        }
        self.columns[idx].rename(new);
        Ok(self)
    }

    /// Replace every column name. The count must equal the width.
    pub fn set_column_names(&mut self, names: &[&str]) -> Result<()> {
        if names.len() != self.width() {
            return Err(Error::ShapeMismatch(format!(
                "{} names given for {} columns",
                names.len(),
                self.width()
            )));
        }
        check_unique_names(names.iter().copied())?;
        for (s, name) in self.columns.iter_mut().zip(names) {
            s.rename(name);
        }
        Ok(())
    }

    fn map_columns<F>(&self, f: F) -> Result<DataFrame>
    where
        F: Fn(&Series) -> Result<Series>,
    {
        let columns = self.columns.iter().map(f).collect::<Result<Vec<_>>>()?;
        Ok(Self::new_no_checks(columns))
    }

    /// Zero-copy row slice; a negative offset counts from the end
    pub fn slice(&self, offset: i64, length: usize) -> DataFrame {
        Self::new_no_checks(self.columns.iter().map(|s| s.slice(offset, length)).collect())
    }

    pub fn head(&self, n: Option<usize>) -> DataFrame {
        Self::new_no_checks(self.columns.iter().map(|s| s.head(n)).collect())
    }

    pub fn tail(&self, n: Option<usize>) -> DataFrame {
        Self::new_no_checks(self.columns.iter().map(|s| s.tail(n)).collect())
    }

    /// Keep rows where `mask` is true
    pub fn filter(&self, mask: &Series) -> Result<DataFrame> {
        ensure!(
            mask.len() == self.height(),
            Error::ShapeMismatch(format!(
                "filter mask has length {}, DataFrame has height {}",
                mask.len(),
                self.height()
            ))
        );
        self.map_columns(|s| s.filter(mask))
    }

    /// Gather rows at `indices`
    pub fn take(&self, indices: &[IdxSize]) -> Result<DataFrame> {
        self.map_columns(|s| s.take(indices))
    }

    pub(crate) fn take_opt(&self, indices: &[Option<IdxSize>]) -> Result<DataFrame> {
        self.map_columns(|s| s.take_opt(indices))
    }

    /// Stable sort by one or more columns. Nulls come last.
    pub fn sort(&self, by: &[&str], reverse: bool) -> Result<DataFrame> {
        match by {
            [] => Ok(self.clone()),
            [single] => {
                let idx = self.column(single)?.arg_sort_indices(reverse)?;
                self.take(&idx)
            }
            _ => {
                let keys = by
                    .iter()
                    .map(|name| {
                        let s = self.column(name)?;
                        let nulls = s.physical().is_null().to_options();
                        Ok((s.row_comparator()?, nulls))
                    })
                    .collect::<Result<Vec<_>>>()?;
                let mut idx: Vec<usize> = (0..self.height()).collect();
                idx.sort_by(|&a, &b| {
                    for (cmp, nulls) in &keys {
                        let na = nulls[a].unwrap_or(false);
                        let nb = nulls[b].unwrap_or(false);
                        let ord = match (na, nb) {
                            (false, false) if reverse => cmp(a, b).reverse(),
                            (false, false) => cmp(a, b),
                            _ => na.cmp(&nb),
                        };
                        if ord != Ordering::Equal {
                            return ord;
                        }
                    }
                    Ordering::Equal
                });
                let idx: Vec<IdxSize> = idx.into_iter().map(|i| i as IdxSize).collect();
                self.take(&idx)
            }
        }
    }

    /// Coalesce the chunks of every column
    pub fn rechunk(&mut self) -> &mut Self {
        for s in self.columns.iter_mut() {
            s.rechunk();
        }
        self
    }

    /// Largest chunk count over the columns
    pub fn n_chunks(&self) -> usize {
        self.columns.iter().map(|s| s.n_chunks()).max().unwrap_or(0)
    }

    /// Values of row `idx`; a negative index counts from the end
    pub fn get_row(&self, idx: i64) -> Result<Vec<AnyValue>> {
        self.columns.iter().map(|s| s.get(idx)).collect()
    }

    /// All rows, materialized
    pub fn rows(&self) -> Vec<Vec<AnyValue>> {
        (0..self.height())
            .map(|i| self.columns.iter().map(|s| s.get_any(i)).collect())
            .collect()
    }

    /// Evaluate expressions into a new DataFrame
    ///
    /// Unit-length results are broadcast to the longest result; other length
    /// mismatches and duplicate output names are errors.
    pub fn select(&self, exprs: &[Expr]) -> Result<DataFrame> {
        let columns = evaluate_exprs(self, exprs)?;
        DataFrame::new(columns)
    }

    /// Evaluate expressions and add or replace the resulting columns
    pub fn with_columns(&self, exprs: &[Expr]) -> Result<DataFrame> {
        let columns = evaluate_exprs(self, exprs)?;
        let mut out = self.clone();
        for s in columns {
            out.with_column(s)?;
        }
        Ok(out)
    }

    /// New DataFrame with `columns` added on the right
    pub fn hstack(&self, columns: &[Series]) -> Result<DataFrame> {
        let mut out = self.clone();
        out.hstack_mut(columns)?;
        Ok(out)
    }

    pub fn hstack_mut(&mut self, columns: &[Series]) -> Result<&mut Self> {
        check_unique_names(
            self.columns
                .iter()
                .map(|s| s.name())
                .chain(columns.iter().map(|s| s.name())),
        )?;
        for s in columns {
            if !self.columns.is_empty() && s.len() != self.height() {
                return Err(Error::ShapeMismatch(format!(
                    "cannot hstack column '{}' of length {} onto height {}",
                    s.name(),
                    s.len(),
                    self.height()
                )));
            }
            self.columns.push(s.clone());
        }
        Ok(self)
    }

    /// New DataFrame with the rows of `other` appended
    pub fn vstack(&self, other: &DataFrame) -> Result<DataFrame> {
        let mut out = self.clone();
        out.vstack_mut(other)?;
        Ok(out)
    }

    /// Append the rows of `other`. Names must match pairwise; dtypes must be equal.
    pub fn vstack_mut(&mut self, other: &DataFrame) -> Result<&mut Self> {
        if self.width() != other.width() {
            return Err(Error::ShapeMismatch(format!(
                "cannot vstack a DataFrame of width {} onto width {}",
                other.width(),
                self.width()
            )));
        }
        for (left, right) in self.columns.iter_mut().zip(other.columns.iter()) {
            if left.name() != right.name() {
                return Err(Error::ShapeMismatch(format!(
                    "column names do not match: '{}' and '{}'",
                    left.name(),
                    right.name()
                )));
            }
            left.append(right)?;
        }
        Ok(self)
    }

    /// Replace the column `name` with `series`, keeping its position
    pub fn replace(&mut self, name: &str, series: Series) -> Result<&mut Self> {
        let idx = self.try_idx(name)?;
        ensure!(
            series.len() == self.height(),
            Error::ShapeMismatch(format!(
                "replacement for '{}' has length {}, DataFrame has height {}",
                name,
                series.len(),
                self.height()
            ))
        );
        self.columns[idx] = series.with_name(name);
        Ok(self)
    }

    /// New DataFrame without column `name`
    pub fn drop(&self, name: &str) -> Result<DataFrame> {
        let mut out = self.clone();
        out.drop_in_place(name)?;
        Ok(out)
    }

    /// Remove column `name` and return it
    pub fn drop_in_place(&mut self, name: &str) -> Result<Series> {
        let idx = self.try_idx(name)?;
        Ok(self.columns.remove(idx))
    }

    /// Equal shape, names, dtypes and values, with null equal to null
    pub fn frame_equal_missing(&self, other: &DataFrame) -> bool {
        self.shape() == other.shape()
            && self
                .columns
                .iter()
                .zip(other.columns.iter())
                .all(|(a, b)| a == b)
    }
}

impl PartialEq for DataFrame {
    fn eq(&self, other: &Self) -> bool {
        self.frame_equal_missing(other)
    }
}

impl Display for DataFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "shape: ({}, {})", self.height(), self.width())?;
        let header: Vec<String> = self
            .columns
            .iter()
            .map(|s| format!("{} ({})", s.name(), s.dtype()))
            .collect();
        writeln!(f, "{}", header.join(" | "))?;
        let n = self.height();
        for i in 0..n {
            if n > 20 && i == 10 {
                writeln!(f, "...")?;
            }
            if n > 20 && i >= 10 && i < n - 10 {
                continue;
            }
            let row: Vec<String> = self.columns.iter().map(|s| s.get_any(i).to_string()).collect();
            writeln!(f, "{}", row.join(" | "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unequal_lengths_rejected() {
        let err = DataFrame::new(vec![
            Series::new("a", vec![1i32, 2]),
            Series::new("b", vec![1i32]),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch(_)));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = DataFrame::new(vec![
            Series::new("a", vec![1i32]),
            Series::new("a", vec![2i32]),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateColumnName(_)));
    }

    #[test]
    fn test_multi_key_sort() {
        let df = DataFrame::new(vec![
            Series::new("a", vec![2i32, 1, 2, 1]),
            Series::new("b", vec![Some(1i32), Some(5), None, Some(3)]),
        ])
        .unwrap();
        let sorted = df.sort(&["a", "b"], false).unwrap();
        assert_eq!(
            sorted.column("b").unwrap().i32().unwrap().to_options(),
            vec![Some(3), Some(5), Some(1), None]
        );
    }
}
