//! Column selectors: predicates over column names, dtypes and positions
//!
//! Selectors combine with `|` (union), `&` (intersection), `-` (difference)
//! and `!` (inversion). An inverted selector keeps the criteria it was built
//! with and matches every column those criteria reject, so `!a` and `!b` can
//! pick different columns on a new frame even when `a` and `b` agree on the
//! frame at hand. Positional selectors (`first`, `last`) cannot be inverted;
//! resolving such a selector fails with `InvalidOperation`.

use std::fmt;
use std::ops::{BitAnd, BitOr, Not, Sub};

use regex::Regex;

use crate::core::dtype::{DataType, Field};
use crate::core::error::{Error, Result};

/// Dtype families a selector can match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtypeClass {
    Numeric,
    Integer,
    Float,
    Temporal,
    String,
    Boolean,
    Nested,
}

impl DtypeClass {
    fn contains(&self, dtype: &DataType) -> bool {
        match self {
            DtypeClass::Numeric => dtype.is_numeric(),
            DtypeClass::Integer => dtype.is_integer(),
            DtypeClass::Float => dtype.is_float(),
            DtypeClass::Temporal => dtype.is_temporal(),
            DtypeClass::String => matches!(dtype, DataType::Utf8 | DataType::Categorical),
            DtypeClass::Boolean => dtype == &DataType::Boolean,
            DtypeClass::Nested => dtype.is_nested(),
        }
    }
}

#[derive(Debug, Clone)]
enum Criteria {
    All,
    ByName(Vec<String>),
    StartsWith(Vec<String>),
    EndsWith(Vec<String>),
    Contains(Vec<String>),
    Matches(Regex),
    ByDtype(Vec<DataType>),
    Class(DtypeClass),
    First,
    Last,
    Union(Box<Selector>, Box<Selector>),
    Intersect(Box<Selector>, Box<Selector>),
    Difference(Box<Selector>, Box<Selector>),
}

/// A column-selection predicate
#[derive(Debug, Clone)]
pub struct Selector {
    criteria: Criteria,
    inverted: bool,
}

impl Selector {
    fn new(criteria: Criteria) -> Self {
        Selector {
            criteria,
            inverted: false,
        }
    }

    pub fn all() -> Self {
        Self::new(Criteria::All)
    }

    pub fn by_name(names: &[&str]) -> Self {
        Self::new(Criteria::ByName(to_strings(names)))
    }

    pub fn starts_with(prefixes: &[&str]) -> Self {
        Self::new(Criteria::StartsWith(to_strings(prefixes)))
    }

    pub fn ends_with(suffixes: &[&str]) -> Self {
        Self::new(Criteria::EndsWith(to_strings(suffixes)))
    }

    pub fn contains(substrings: &[&str]) -> Self {
        Self::new(Criteria::Contains(to_strings(substrings)))
    }

    /// Names matching the regular expression `pattern`
    pub fn matches(pattern: &str) -> Result<Self> {
        Ok(Self::new(Criteria::Matches(Regex::new(pattern)?)))
    }

    pub fn by_dtype(dtypes: &[DataType]) -> Self {
        Self::new(Criteria::ByDtype(dtypes.to_vec()))
    }

    pub fn numeric() -> Self {
        Self::new(Criteria::Class(DtypeClass::Numeric))
    }

    pub fn integer() -> Self {
        Self::new(Criteria::Class(DtypeClass::Integer))
    }

    pub fn float() -> Self {
        Self::new(Criteria::Class(DtypeClass::Float))
    }

    pub fn temporal() -> Self {
        Self::new(Criteria::Class(DtypeClass::Temporal))
    }

    pub fn string() -> Self {
        Self::new(Criteria::Class(DtypeClass::String))
    }

    pub fn boolean() -> Self {
        Self::new(Criteria::Class(DtypeClass::Boolean))
    }

    pub fn nested() -> Self {
        Self::new(Criteria::Class(DtypeClass::Nested))
    }

    pub fn first() -> Self {
        Self::new(Criteria::First)
    }

    pub fn last() -> Self {
        Self::new(Criteria::Last)
    }

    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    fn matches_field(&self, idx: usize, width: usize, field: &Field) -> bool {
        let name = field.name.as_str();
        let hit = match &self.criteria {
            Criteria::All => true,
            Criteria::ByName(names) => names.iter().any(|n| n == name),
            Criteria::StartsWith(p) => p.iter().any(|p| name.starts_with(p.as_str())),
            Criteria::EndsWith(s) => s.iter().any(|s| name.ends_with(s.as_str())),
            Criteria::Contains(s) => s.iter().any(|s| name.contains(s.as_str())),
            Criteria::Matches(re) => re.is_match(name),
            Criteria::ByDtype(dtypes) => dtypes.contains(&field.dtype),
            Criteria::Class(class) => class.contains(&field.dtype),
            Criteria::First => idx == 0,
            Criteria::Last => idx + 1 == width,
            Criteria::Union(a, b) => {
                a.matches_field(idx, width, field) || b.matches_field(idx, width, field)
            }
            Criteria::Intersect(a, b) => {
                a.matches_field(idx, width, field) && b.matches_field(idx, width, field)
            }
            Criteria::Difference(a, b) => {
                a.matches_field(idx, width, field) && !b.matches_field(idx, width, field)
            }
        };
        hit != self.inverted
    }

    fn is_positional(&self) -> bool {
        match &self.criteria {
            Criteria::First | Criteria::Last => true,
            Criteria::Union(a, b) | Criteria::Intersect(a, b) | Criteria::Difference(a, b) => {
                a.is_positional() || b.is_positional()
            }
            _ => false,
        }
    }

    fn check_inversion(&self) -> Result<()> {
        if self.inverted && self.is_positional() {
            return Err(Error::InvalidOperation(format!(
                "cannot invert positional selector {}",
                self
            )));
        }
        match &self.criteria {
            Criteria::Union(a, b) | Criteria::Intersect(a, b) | Criteria::Difference(a, b) => {
                a.check_inversion()?;
                b.check_inversion()
            }
            _ => Ok(()),
        }
    }

    /// Names of the selected columns, in schema order
    pub fn select(&self, schema: &[Field]) -> Result<Vec<String>> {
        self.check_inversion()?;
        let width = schema.len();
        Ok(schema
            .iter()
            .enumerate()
            .filter(|(i, f)| self.matches_field(*i, width, f))
            .map(|(_, f)| f.name.clone())
            .collect())
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Not for Selector {
    type Output = Selector;

    fn not(mut self) -> Selector {
        self.inverted = !self.inverted;
        self
    }
}

impl BitOr for Selector {
    type Output = Selector;

    fn bitor(self, rhs: Selector) -> Selector {
        Selector::new(Criteria::Union(Box::new(self), Box::new(rhs)))
    }
}

impl BitAnd for Selector {
    type Output = Selector;

    fn bitand(self, rhs: Selector) -> Selector {
        Selector::new(Criteria::Intersect(Box::new(self), Box::new(rhs)))
    }
}

impl Sub for Selector {
    type Output = Selector;

    fn sub(self, rhs: Selector) -> Selector {
        Selector::new(Criteria::Difference(Box::new(self), Box::new(rhs)))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inverted {
            write!(f, "~")?;
        }
        match &self.criteria {
            Criteria::All => write!(f, "all()"),
            Criteria::ByName(v) => write!(f, "by_name({:?})", v),
            Criteria::StartsWith(v) => write!(f, "starts_with({:?})", v),
            Criteria::EndsWith(v) => write!(f, "ends_with({:?})", v),
            Criteria::Contains(v) => write!(f, "contains({:?})", v),
            Criteria::Matches(re) => write!(f, "matches({:?})", re.as_str()),
            Criteria::ByDtype(v) => write!(f, "by_dtype({:?})", v),
            Criteria::Class(c) => write!(f, "{:?}()", c),
            Criteria::First => write!(f, "first()"),
            Criteria::Last => write!(f, "last()"),
            Criteria::Union(a, b) => write!(f, "({} | {})", a, b),
            Criteria::Intersect(a, b) => write!(f, "({} & {})", a, b),
            Criteria::Difference(a, b) => write!(f, "({} - {})", a, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(fields: &[(&str, DataType)]) -> Vec<Field> {
        fields.iter().map(|(n, d)| Field::new(*n, d.clone())).collect()
    }

    #[test]
    fn test_name_and_position_selectors() {
        let s = schema(&[
            ("id", DataType::Int64),
            ("price_usd", DataType::Float64),
            ("price_eur", DataType::Float64),
            ("label", DataType::Utf8),
        ]);
        assert_eq!(Selector::starts_with(&["price"]).select(&s).unwrap(), vec!["price_usd", "price_eur"]);
        assert_eq!(Selector::ends_with(&["_eur"]).select(&s).unwrap(), vec!["price_eur"]);
        assert_eq!((Selector::first() | Selector::last()).select(&s).unwrap(), vec!["id", "label"]);
        assert_eq!((Selector::numeric() - Selector::integer()).select(&s).unwrap(), vec!["price_usd", "price_eur"]);
        assert_eq!(Selector::matches("^p.*d$").unwrap().select(&s).unwrap(), vec!["price_usd"]);
        assert!(Selector::matches("(").is_err());
    }

    #[test]
    fn test_inversion_uses_captured_criteria() {
        let narrow = schema(&[("a", DataType::Int64), ("b", DataType::Utf8)]);
        let by_dtype = Selector::by_dtype(&[DataType::Int64]);
        let by_prefix = Selector::starts_with(&["a"]);
        assert_eq!(by_dtype.select(&narrow).unwrap(), by_prefix.select(&narrow).unwrap());
        assert_eq!((!by_dtype.clone()).select(&narrow).unwrap(), (!by_prefix.clone()).select(&narrow).unwrap());

        let wide = schema(&[("a", DataType::Int64), ("b", DataType::Utf8), ("ax", DataType::Utf8)]);
        assert_eq!((!by_dtype).select(&wide).unwrap(), vec!["b", "ax"]);
        assert_eq!((!by_prefix).select(&wide).unwrap(), vec!["b"]);
    }

    #[test]
    fn test_positional_inversion_is_rejected() {
        let s = schema(&[("a", DataType::Int64), ("b", DataType::Utf8)]);
        assert!(matches!((!Selector::first()).select(&s), Err(Error::InvalidOperation(_))));
        let nested = Selector::numeric() | !(Selector::last() & Selector::string());
        assert!(matches!(nested.select(&s), Err(Error::InvalidOperation(_))));
        // a positional selector may still be subtracted from
        assert_eq!((Selector::all() - Selector::first()).select(&s).unwrap(), vec!["b"]);
    }
}
