//! Module providing pivot table functionality

use std::collections::HashMap;

use crate::core::any_value::AnyValue;
use crate::core::dtype::IdxSize;
use crate::core::error::{Error, Result};
use crate::dataframe::DataFrame;
use crate::groupby::{reduce_groups, AggFunction, GroupBy};

/// Structure for creating pivot tables
#[derive(Debug)]
pub struct PivotTable<'a> {
    /// Source DataFrame
    df: &'a DataFrame,

    /// Column names that key the output rows
    index: Vec<String>,

    /// Column whose distinct values become output columns
    columns: String,

    /// Column reduced inside each cell
    values: String,

    /// Aggregation function
    aggfunc: AggFunction,
}

impl<'a> PivotTable<'a> {
    /// Create a new pivot table
    pub fn new(
        df: &'a DataFrame,
        index: &[&str],
        columns: &str,
        values: &str,
        aggfunc: AggFunction,
    ) -> Result<Self> {
        for name in index.iter().chain([&columns, &values]) {
            if !df.contains_column(name) {
                return Err(Error::ColumnNotFound(name.to_string()));
            }
        }
        if index.contains(&columns) {
            return Err(Error::InvalidOperation(format!(
                "pivot column '{}' is also an index column",
                columns
            )));
        }

        Ok(PivotTable {
            df,
            index: index.iter().map(|s| s.to_string()).collect(),
            columns: columns.to_string(),
            values: values.to_string(),
            aggfunc,
        })
    }

    /// Execute pivot table and generate a new DataFrame.
    ///
    /// Rows follow the first appearance of each index key, pivot columns the
    /// first appearance of each pivot value. Cells without any source row are
    /// null.
    pub fn execute(&self) -> Result<DataFrame> {
        let index: Vec<&str> = self.index.iter().map(String::as_str).collect();
        let grouped = GroupBy::new(self.df, &index)?;
        let pivot = self.df.column(&self.columns)?;
        let values = self.df.column(&self.values)?;

        let mut pivot_ids: HashMap<AnyValue, usize> = HashMap::new();
        let mut pivot_names: Vec<String> = Vec::new();
        let mut row_pivot = vec![0usize; self.df.height()];
        for (row, v) in pivot.iter().enumerate() {
            let next = pivot_names.len();
            let label = v.to_string();
            let id = *pivot_ids.entry(v).or_insert(next);
            if id == next {
                pivot_names.push(label);
            }
            row_pivot[row] = id;
        }

        // cells[p][g] holds the rows of index group g with pivot value p
        let n_groups = grouped.group_count();
        let mut cells: Vec<Vec<Vec<IdxSize>>> = vec![vec![Vec::new(); n_groups]; pivot_names.len()];
        for (g, rows) in grouped.groups().iter().enumerate() {
            for &row in rows {
                cells[row_pivot[row as usize]][g].push(row);
            }
        }

        let mut out = grouped.keys()?.into_columns();
        for (name, groups) in pivot_names.iter().zip(&cells) {
            let reduced = reduce_groups(values, groups, self.aggfunc, false)?;
            let present: Vec<Option<IdxSize>> = groups
                .iter()
                .enumerate()
                .map(|(g, rows)| (!rows.is_empty()).then_some(g as IdxSize))
                .collect();
            out.push(reduced.take_opt(&present)?.with_name(name));
        }
        log::debug!(
            "pivoted '{}' by '{}' into {} rows and {} value columns",
            self.values,
            self.columns,
            n_groups,
            pivot_names.len()
        );
        DataFrame::new(out)
    }
}

impl DataFrame {
    /// Spread the distinct values of `columns` into new columns, reducing
    /// `values` with `aggfunc` inside each `(index key, pivot value)` cell
    pub fn pivot(
        &self,
        index: &[&str],
        columns: &str,
        values: &str,
        aggfunc: AggFunction,
    ) -> Result<DataFrame> {
        PivotTable::new(self, index, columns, values, aggfunc)?.execute()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Series;

    #[test]
    fn test_missing_cells_are_null() {
        let df = DataFrame::new(vec![
            Series::new("region", vec!["n", "n", "s", "n"]),
            Series::new("product", vec!["x", "y", "x", "x"]),
            Series::new("qty", vec![1i64, 2, 3, 4]),
        ])
        .unwrap();
        let out = df.pivot(&["region"], "product", "qty", AggFunction::Sum).unwrap();
        assert_eq!(out.get_column_names(), vec!["region", "x", "y"]);
        assert_eq!(out.column("x").unwrap().i64().unwrap().to_options(), vec![Some(5), Some(3)]);
        assert_eq!(out.column("y").unwrap().i64().unwrap().to_options(), vec![Some(2), None]);
    }

    #[test]
    fn test_unknown_column() {
        let df = DataFrame::new(vec![Series::new("a", vec![1i64])]).unwrap();
        assert!(PivotTable::new(&df, &["a"], "b", "a", AggFunction::First).is_err());
    }
}
