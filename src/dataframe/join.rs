use std::collections::HashMap;

use crate::core::any_value::AnyValue;
use crate::core::dtype::{get_supertype, DataType, IdxSize};
use crate::core::error::{Error, Result};
use crate::dataframe::base::DataFrame;
use crate::series::Series;

/// Suffix for right columns whose names collide with left columns
pub const RIGHT_SUFFIX: &str = "_right";

/// Enum for join types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// Inner join (only rows that match in both tables)
    Inner,
    /// Left join (all rows from the left table and matching rows from the right table)
    Left,
    /// Outer join (all rows from both tables)
    Outer,
}

/// Join functionality for DataFrames
pub trait JoinExt {
    /// Join on a single key column from each side
    fn join(&self, other: &Self, left_on: &str, right_on: &str, how: JoinType) -> Result<Self>
    where
        Self: Sized;

    fn inner_join(&self, other: &Self, left_on: &str, right_on: &str) -> Result<Self>
    where
        Self: Sized,
    {
        self.join(other, left_on, right_on, JoinType::Inner)
    }

    fn left_join(&self, other: &Self, left_on: &str, right_on: &str) -> Result<Self>
    where
        Self: Sized,
    {
        self.join(other, left_on, right_on, JoinType::Left)
    }

    fn outer_join(&self, other: &Self, left_on: &str, right_on: &str) -> Result<Self>
    where
        Self: Sized,
    {
        self.join(other, left_on, right_on, JoinType::Outer)
    }
}

/// Bring both key columns to a common dtype
fn align_keys(left: &Series, right: &Series) -> Result<(Series, Series)> {
    let as_utf8 = |s: &Series| {
        if s.dtype() == &DataType::Categorical {
            s.cast(&DataType::Utf8)
        } else {
            Ok(s.clone())
        }
    };
    let (left, right) = (as_utf8(left)?, as_utf8(right)?);
    if left.dtype() == right.dtype() {
        return Ok((left, right));
    }
    let dtype = get_supertype(left.dtype(), right.dtype()).ok_or_else(|| {
        Error::TypeMismatch(format!(
            "join keys '{}' ({}) and '{}' ({}) have no common dtype",
            left.name(),
            left.dtype(),
            right.name(),
            right.dtype()
        ))
    })?;
    Ok((left.cast(&dtype)?, right.cast(&dtype)?))
}

/// Row pairs of a hash join. Null keys never match.
fn join_indices(
    left: &Series,
    right: &Series,
    how: JoinType,
) -> (Vec<Option<IdxSize>>, Vec<Option<IdxSize>>) {
    let mut table: HashMap<AnyValue, Vec<IdxSize>> = HashMap::new();
    for (i, key) in right.iter().enumerate() {
        if !key.is_null() {
            table.entry(key).or_default().push(i as IdxSize);
        }
    }

    let mut left_idx = Vec::with_capacity(left.len());
    let mut right_idx = Vec::with_capacity(left.len());
    let mut right_matched = vec![false; right.len()];
    for (i, key) in left.iter().enumerate() {
        let matches = if key.is_null() { None } else { table.get(&key) };
        match matches {
            Some(rows) => {
                for &r in rows {
                    left_idx.push(Some(i as IdxSize));
                    right_idx.push(Some(r));
                    right_matched[r as usize] = true;
                }
            }
            None if how != JoinType::Inner => {
                left_idx.push(Some(i as IdxSize));
                right_idx.push(None);
            }
            None => {}
        }
    }
    if how == JoinType::Outer {
        for (r, matched) in right_matched.into_iter().enumerate() {
            if !matched {
                left_idx.push(None);
                right_idx.push(Some(r as IdxSize));
            }
        }
    }
    (left_idx, right_idx)
}

impl JoinExt for DataFrame {
    fn join(&self, other: &Self, left_on: &str, right_on: &str, how: JoinType) -> Result<Self> {
        let (left_key, right_key) = align_keys(self.column(left_on)?, other.column(right_on)?)?;
        let (left_idx, right_idx) = join_indices(&left_key, &right_key, how);
        log::debug!(
            "{:?} join on '{}' = '{}' produced {} rows",
            how,
            left_on,
            right_on,
            left_idx.len()
        );

        let mut columns = Vec::with_capacity(self.width() + other.width());
        for s in self.get_columns() {
            if s.name() != left_on {
                columns.push(s.take_opt(&left_idx)?);
                continue;
            }
            let key = left_key.take_opt(&left_idx)?;
            let key = if how == JoinType::Outer {
                let from_left = Series::new(
                    "mask",
                    left_idx.iter().map(|i| i.is_some()).collect::<Vec<_>>(),
                );
                key.zip_with(&from_left, &right_key.take_opt(&right_idx)?)?
            } else {
                key
            };
            columns.push(key.with_name(left_on));
        }
        for s in other.get_columns() {
            if s.name() == right_on {
                continue;
            }
            let taken = s.take_opt(&right_idx)?;
            if self.contains_column(s.name()) {
                let name = format!("{}{}", s.name(), RIGHT_SUFFIX);
                columns.push(taken.with_name(&name));
            } else {
                columns.push(taken);
            }
        }
        DataFrame::new(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames() -> (DataFrame, DataFrame) {
        let left = DataFrame::new(vec![
            Series::new("k", vec![Some(1i64), Some(2), None]),
            Series::new("v", vec![10i64, 20, 30]),
        ])
        .unwrap();
        let right = DataFrame::new(vec![
            Series::new("k", vec![Some(2i32), Some(3), None]),
            Series::new("v", vec![200i64, 300, 400]),
        ])
        .unwrap();
        (left, right)
    }

    #[test]
    fn test_null_keys_never_match() {
        let (left, right) = frames();
        let out = left.inner_join(&right, "k", "k").unwrap();
        assert_eq!(out.height(), 1);
        assert_eq!(out.get_column_names(), vec!["k", "v", "v_right"]);
        assert_eq!(out.column("k").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn test_outer_join_coalesces_keys() {
        let (left, right) = frames();
        let out = left.outer_join(&right, "k", "k").unwrap();
        assert_eq!(out.height(), 5);
        assert_eq!(
            out.column("k").unwrap().i64().unwrap().to_options(),
            vec![Some(1), Some(2), None, Some(3), None]
        );
    }
}
