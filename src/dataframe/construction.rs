//! DataFrame construction from columns, pairs, rows, records and matrices

use crate::core::any_value::AnyValue;
use crate::core::error::{Error, Result};
use crate::dataframe::DataFrame;
use crate::series::{ConstructOptions, Series, SeriesInput};

/// How a nested row-like input maps onto columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Each inner sequence is a row
    Row,
    /// Each inner sequence is a column
    Col,
}

fn default_name(i: usize) -> String {
    format!("column_{}", i)
}

/// Apply a `columns` rename list; its length must equal the width
fn apply_names(mut df: DataFrame, columns: Option<&[&str]>) -> Result<DataFrame> {
    if let Some(names) = columns {
        df.set_column_names(names)?;
    }
    Ok(df)
}

/// Transpose rows into per-column value lists
fn transpose(rows: &[Vec<AnyValue>]) -> Result<Vec<Vec<AnyValue>>> {
    let width = rows.first().map(|r| r.len()).unwrap_or(0);
    let mut out = vec![Vec::with_capacity(rows.len()); width];
    for (i, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(Error::ShapeMismatch(format!(
                "row {} has {} values, expected {}",
                i,
                row.len(),
                width
            )));
        }
        for (col, v) in out.iter_mut().zip(row) {
            col.push(v.clone());
        }
    }
    Ok(out)
}

impl DataFrame {
    /// DataFrame from existing Series, optionally renamed
    pub fn from_columns(columns: Vec<Series>, names: Option<&[&str]>) -> Result<DataFrame> {
        if let Some(names) = names {
            if names.len() != columns.len() {
                return Err(Error::ShapeMismatch(format!(
                    "{} names given for {} columns",
                    names.len(),
                    columns.len()
                )));
            }
            let renamed = columns
                .into_iter()
                .zip(names)
                .map(|(s, n)| s.with_name(n))
                .collect();
            return DataFrame::new(renamed);
        }
        DataFrame::new(columns)
    }

    /// DataFrame from `(name, values)` pairs, in order
    pub fn from_pairs<V>(pairs: Vec<(&str, V)>, columns: Option<&[&str]>) -> Result<DataFrame>
    where
        V: Into<SeriesInput>,
    {
        let options = ConstructOptions::default();
        let series = pairs
            .into_iter()
            .map(|(name, values)| Series::construct(name, values, None, &options))
            .collect::<Result<Vec<_>>>()?;
        apply_names(DataFrame::new(series)?, columns)
    }

    /// DataFrame from nested value sequences.
    ///
    /// Without an explicit `orient`, the input is read column-wise when the
    /// number of `columns` names equals the outer length, and row-wise
    /// otherwise.
    pub fn from_rows(
        data: &[Vec<AnyValue>],
        columns: Option<&[&str]>,
        orient: Option<Orientation>,
        strict: bool,
    ) -> Result<DataFrame> {
        let orient = orient.unwrap_or(match columns {
            Some(names) if names.len() == data.len() => Orientation::Col,
            _ => Orientation::Row,
        });
        let column_values = match orient {
            Orientation::Col => data.to_vec(),
            Orientation::Row => transpose(data)?,
        };
        let series = column_values
            .iter()
            .enumerate()
            .map(|(i, values)| Series::from_any_values(&default_name(i), values, strict))
            .collect::<Result<Vec<_>>>()?;
        apply_names(DataFrame::new(series)?, columns)
    }

    /// DataFrame from records of `(key, value)` pairs.
    ///
    /// Columns are the union of keys in first-seen order; a key missing from a
    /// record is null in that row.
    pub fn from_records(
        records: &[Vec<(String, AnyValue)>],
        columns: Option<&[&str]>,
        strict: bool,
    ) -> Result<DataFrame> {
        let mut keys: Vec<&str> = Vec::new();
        for record in records {
            for (k, _) in record {
                if !keys.contains(&k.as_str()) {
                    keys.push(k);
                }
            }
        }
        let series = keys
            .iter()
            .map(|key| {
                let values: Vec<AnyValue> = records
                    .iter()
                    .map(|r| {
                        r.iter()
                            .find(|(k, _)| k.as_str() == *key)
                            .map(|(_, v)| v.clone())
                            .unwrap_or(AnyValue::Null)
                    })
                    .collect();
                Series::from_any_values(key, &values, strict)
            })
            .collect::<Result<Vec<_>>>()?;
        apply_names(DataFrame::new(series)?, columns)
    }

    /// DataFrame from a 2-D matrix.
    ///
    /// When `orient` is not given and `columns` does not settle the layout, a
    /// warning is logged and each inner vector is taken as a row.
    pub fn from_matrix<T>(
        data: &[Vec<T>],
        columns: Option<&[&str]>,
        orient: Option<Orientation>,
    ) -> Result<DataFrame>
    where
        T: Clone + Into<AnyValue>,
    {
        let n_outer = data.len();
        let n_inner = data.first().map(|r| r.len()).unwrap_or(0);
        let orient = match (orient, columns) {
            (Some(o), _) => o,
            (None, Some(names)) if names.len() == n_inner && names.len() != n_outer => Orientation::Row,
            (None, Some(names)) if names.len() == n_outer && names.len() != n_inner => Orientation::Col,
            (None, _) => {
                log::warn!(
                    "orientation of a {}x{} matrix is ambiguous, reading it row-wise; \
                     pass an explicit orientation to silence this warning",
                    n_outer,
                    n_inner
                );
                Orientation::Row
            }
        };
        let values: Vec<Vec<AnyValue>> = data
            .iter()
            .map(|row| row.iter().cloned().map(Into::into).collect())
            .collect();
        DataFrame::from_rows(&values, columns, Some(orient), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dtype::DataType;

    #[test]
    fn test_orientation_inferred_from_names() {
        let data = vec![
            vec![AnyValue::Int64(1), AnyValue::Int64(2), AnyValue::Int64(3)],
            vec![AnyValue::Utf8("a".into()), AnyValue::Utf8("b".into()), AnyValue::Utf8("c".into())],
        ];
        let df = DataFrame::from_rows(&data, Some(&["x", "y"][..]), None, true).unwrap();
        assert_eq!(df.shape(), (3, 2));
        assert_eq!(df.column("y").unwrap().dtype(), &DataType::Utf8);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let data = vec![vec![AnyValue::Int64(1)], vec![]];
        assert!(DataFrame::from_rows(&data, None, Some(Orientation::Row), true).is_err());
    }

    #[test]
    fn test_rename_width_must_match() {
        let data = vec![vec![1.0f64, 2.0], vec![3.0, 4.0]];
        assert!(DataFrame::from_matrix(&data, Some(&["a", "b", "c"][..]), None).is_err());
        let df = DataFrame::from_matrix(&data, None, Some(Orientation::Col)).unwrap();
        assert_eq!(df.get_column_names(), vec!["column_0", "column_1"]);
        assert_eq!(df.column("column_0").unwrap().f64().unwrap().non_null_values(), vec![1.0, 2.0]);
    }
}
