use std::collections::HashMap;
use std::sync::Arc;

use crate::column::ChunkedArray;
use crate::core::dtype::DataType;
use crate::core::error::{Error, Result};
use crate::series::Series;

/// Mapping between categorical codes and their string categories
///
/// Codes are assigned in first-appearance order and index into `categories`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RevMapping {
    /// Category per code
    categories: Vec<String>,

    /// Map from category to code
    index: HashMap<String, u32>,
}

impl RevMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mapping from a list of distinct categories
    ///
    /// # Arguments
    /// * `categories` - Categories in code order; duplicates are rejected
    pub fn from_categories(categories: Vec<String>) -> Result<Self> {
        let mut index = HashMap::with_capacity(categories.len());
        for (i, cat) in categories.iter().enumerate() {
            if index.insert(cat.clone(), i as u32).is_some() {
                return Err(Error::InvalidValue(format!(
                    "Category '{}' is duplicated",
                    cat
                )));
            }
        }
        Ok(Self { categories, index })
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Category for a code
    pub fn get(&self, code: u32) -> Option<&str> {
        self.categories.get(code as usize).map(|s| s.as_str())
    }

    /// Code for a category
    pub fn find(&self, category: &str) -> Option<u32> {
        self.index.get(category).copied()
    }

    /// Code for a category, registering it when unseen
    pub fn get_or_insert(&mut self, category: &str) -> u32 {
        if let Some(code) = self.index.get(category) {
            return *code;
        }
        let code = self.categories.len() as u32;
        self.categories.push(category.to_string());
        self.index.insert(category.to_string(), code);
        code
    }

    /// Merge `other` into a copy of `self`.
    ///
    /// Returns the merged mapping and, per code of `other`, its code in the
    /// merged mapping.
    pub fn merge(&self, other: &RevMapping) -> (RevMapping, Vec<u32>) {
        let mut merged = self.clone();
        let remap = other
            .categories
            .iter()
            .map(|cat| merged.get_or_insert(cat))
            .collect();
        (merged, remap)
    }
}

/// Encode a string column as categorical codes
pub(crate) fn encode_utf8(ca: &ChunkedArray<String>) -> (ChunkedArray<u32>, RevMapping) {
    let mut mapping = RevMapping::new();
    let codes = ca.apply_opt(|v| v.map(|s| mapping.get_or_insert(s)));
    (codes, mapping)
}

/// Decode categorical codes back into strings
pub(crate) fn decode_codes(codes: &ChunkedArray<u32>, mapping: &RevMapping) -> ChunkedArray<String> {
    codes.apply_opt(|c| c.and_then(|c| mapping.get(*c)).map(|s| s.to_string()))
}

impl Series {
    /// Create a categorical Series from string values
    pub fn new_categorical(name: &str, values: &[Option<&str>]) -> Series {
        let utf8: ChunkedArray<String> = values.iter().map(|v| v.map(|s| s.to_string())).collect();
        let (codes, mapping) = encode_utf8(&utf8);
        Series::from_categorical_parts(name, codes, Arc::new(mapping))
    }

    /// The category mapping of a Categorical Series
    pub fn categories(&self) -> Result<&RevMapping> {
        match (&self.dtype, &self.rev_map) {
            (DataType::Categorical, Some(map)) => Ok(map),
            _ => Err(Error::TypeMismatch(format!(
                "Series '{}' of dtype {} is not categorical",
                self.name, self.dtype
            ))),
        }
    }

    /// Rewrite `other`'s codes against a mapping merged with `self`'s.
    /// Returns (merged mapping, `other`'s codes re-encoded).
    pub(crate) fn merge_categorical(
        &self,
        other: &Series,
    ) -> Result<(Arc<RevMapping>, ChunkedArray<u32>)> {
        let left = self.categories()?;
        let right = other.categories()?;
        let right_codes = other.unpack::<u32>()?;
        if left == right {
            return Ok((Arc::new(left.clone()), right_codes.clone()));
        }
        let (merged, remap) = left.merge(right);
        let codes = right_codes.apply_values(|c| remap[*c as usize]);
        Ok((Arc::new(merged), codes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_appearance_codes() {
        let s = Series::new_categorical("c", &[Some("b"), Some("a"), None, Some("b")]);
        let map = s.categories().unwrap();
        assert_eq!(map.categories(), &["b".to_string(), "a".to_string()]);
        assert_eq!(s.unpack::<u32>().unwrap().to_options(), vec![Some(0), Some(1), None, Some(0)]);
    }

    #[test]
    fn test_merge() {
        let left = RevMapping::from_categories(vec!["x".into(), "y".into()]).unwrap();
        let right = RevMapping::from_categories(vec!["y".into(), "z".into()]).unwrap();
        let (merged, remap) = left.merge(&right);
        assert_eq!(merged.len(), 3);
        assert_eq!(remap, vec![1, 2]);
    }

    #[test]
    fn test_duplicate_category_rejected() {
        assert!(RevMapping::from_categories(vec!["a".into(), "a".into()]).is_err());
    }
}
