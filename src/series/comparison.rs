//! Comparison and boolean logic kernels

use std::ops::{BitAnd, BitOr, BitXor, Not};

use crate::column::{ArrayValue, ChunkedArray, PhysicalData};
use crate::core::any_value::AnyValue;
use crate::core::dtype::{get_supertype, DataType};
use crate::core::error::{Error, Result};
use crate::series::arithmetic::zip_broadcast;
use crate::series::Series;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CmpOp {
    fn apply<T: PartialOrd>(&self, a: &T, b: &T) -> bool {
        match self {
            CmpOp::Eq => a == b,
            CmpOp::NotEq => a != b,
            CmpOp::Lt => a < b,
            CmpOp::LtEq => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::GtEq => a >= b,
        }
    }

    fn is_equality(&self) -> bool {
        matches!(self, CmpOp::Eq | CmpOp::NotEq)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::NotEq => "!=",
            CmpOp::Lt => "<",
            CmpOp::LtEq => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtEq => ">=",
        }
    }
}

/// Compare two arrays. With `missing`, null equals null and a null never
/// equals a value; otherwise any null yields null.
fn compare_ca<T: ArrayValue + PartialOrd>(
    lhs: &ChunkedArray<T>,
    rhs: &ChunkedArray<T>,
    op: CmpOp,
    missing: bool,
) -> Result<ChunkedArray<bool>> {
    zip_broadcast(lhs, rhs, |a, b| {
        Ok(match (a, b) {
            (Some(a), Some(b)) => Some(op.apply(a, b)),
            (a, b) if missing => {
                let both_null = a.is_none() && b.is_none();
                Some(if op == CmpOp::Eq { both_null } else { !both_null })
            }
            _ => None,
        })
    })
}

macro_rules! ordered_pair {
    ($lhs:expr, $rhs:expr, $a:ident, $b:ident => $body:expr, else $other:expr) => {
        match ($lhs, $rhs) {
            (PhysicalData::Boolean($a), PhysicalData::Boolean($b)) => $body,
            (PhysicalData::Int8($a), PhysicalData::Int8($b)) => $body,
            (PhysicalData::Int16($a), PhysicalData::Int16($b)) => $body,
            (PhysicalData::Int32($a), PhysicalData::Int32($b)) => $body,
            (PhysicalData::Int64($a), PhysicalData::Int64($b)) => $body,
            (PhysicalData::UInt8($a), PhysicalData::UInt8($b)) => $body,
            (PhysicalData::UInt16($a), PhysicalData::UInt16($b)) => $body,
            (PhysicalData::UInt32($a), PhysicalData::UInt32($b)) => $body,
            (PhysicalData::UInt64($a), PhysicalData::UInt64($b)) => $body,
            (PhysicalData::Float32($a), PhysicalData::Float32($b)) => $body,
            (PhysicalData::Float64($a), PhysicalData::Float64($b)) => $body,
            (PhysicalData::Utf8($a), PhysicalData::Utf8($b)) => $body,
            (PhysicalData::Binary($a), PhysicalData::Binary($b)) => $body,
            (PhysicalData::Decimal($a), PhysicalData::Decimal($b)) => $body,
            _ => $other,
        }
    };
}

impl Series {
    /// Bring both operands onto one comparable dtype
    fn comparison_operands(&self, rhs: &Series, op: CmpOp) -> Result<(Series, Series)> {
        let (l, r) = (self.dtype(), rhs.dtype());
        let mismatch = || {
            Error::TypeMismatch(format!(
                "cannot compare {} {} {}",
                l,
                op.symbol(),
                r
            ))
        };
        if l == r && l != &DataType::Categorical {
            return Ok((self.clone(), rhs.clone()));
        }
        let target = match (l, r) {
            (DataType::Categorical, DataType::Categorical | DataType::Utf8)
            | (DataType::Utf8, DataType::Categorical) => DataType::Utf8,
            (l, r) if l.is_temporal() || r.is_temporal() => {
                let same_kind = matches!(
                    (l, r),
                    (DataType::Datetime(_, _), DataType::Datetime(_, _))
                        | (DataType::Datetime(_, _), DataType::Date)
                        | (DataType::Date, DataType::Datetime(_, _))
                        | (DataType::Duration(_), DataType::Duration(_))
                );
                if !same_kind {
                    return Err(mismatch());
                }
                get_supertype(l, r).ok_or_else(mismatch)?
            }
            (DataType::Boolean, _) | (_, DataType::Boolean) => return Err(mismatch()),
            _ => get_supertype(l, r)
                .filter(|d| d.is_numeric())
                .ok_or_else(mismatch)?,
        };
        Ok((self.cast(&target)?, rhs.cast(&target)?))
    }

    fn compare(&self, rhs: &Series, op: CmpOp, missing: bool) -> Result<Series> {
        self.check_operand_lengths(rhs)?;
        if self.dtype().is_nested() || self.dtype() == &DataType::Object {
            return self.compare_values(rhs, op, missing);
        }
        let (lhs, rhs) = self.comparison_operands(rhs, op)?;
        let ca = ordered_pair!(lhs.physical(), rhs.physical(), a, b => compare_ca(a, b, op, missing)?,
            else return Err(Error::TypeMismatch(format!(
                "no comparison kernel for {}",
                lhs.dtype()
            ))));
        Ok(Series::from_chunked(self.name(), ca))
    }

    /// Row-wise equality for values without a total order
    fn compare_values(&self, rhs: &Series, op: CmpOp, missing: bool) -> Result<Series> {
        if !op.is_equality() {
            return Err(Error::TypeMismatch(format!(
                "operator {} is not defined for {}",
                op.symbol(),
                self.dtype()
            )));
        }
        let n = self.len().max(rhs.len());
        let value_at = |s: &Series, i: usize| if s.len() == 1 { s.get_any(0) } else { s.get_any(i) };
        let out: ChunkedArray<bool> = (0..n)
            .map(|i| {
                let (a, b) = (value_at(self, i), value_at(rhs, i));
                if !missing && (a.is_null() || b.is_null()) {
                    return None;
                }
                let eq = a == b;
                Some(if op == CmpOp::Eq { eq } else { !eq })
            })
            .collect();
        Ok(Series::from_chunked(self.name(), out))
    }

    fn compare_scalar(&self, value: AnyValue, op: CmpOp) -> Result<Series> {
        let literal = Series::from_any_values("literal", &[value], true)?;
        let literal = self.coerce_literal(literal)?;
        self.compare(&literal, op, false)
    }

    pub fn equal(&self, rhs: &Series) -> Result<Series> {
        self.compare(rhs, CmpOp::Eq, false)
    }

    /// Equality where null equals null
    pub fn equal_missing(&self, rhs: &Series) -> Result<Series> {
        self.compare(rhs, CmpOp::Eq, true)
    }

    pub fn not_equal(&self, rhs: &Series) -> Result<Series> {
        self.compare(rhs, CmpOp::NotEq, false)
    }

    pub fn not_equal_missing(&self, rhs: &Series) -> Result<Series> {
        self.compare(rhs, CmpOp::NotEq, true)
    }

    pub fn lt(&self, rhs: &Series) -> Result<Series> {
        self.compare(rhs, CmpOp::Lt, false)
    }

    pub fn lt_eq(&self, rhs: &Series) -> Result<Series> {
        self.compare(rhs, CmpOp::LtEq, false)
    }

    pub fn gt(&self, rhs: &Series) -> Result<Series> {
        self.compare(rhs, CmpOp::Gt, false)
    }

    pub fn gt_eq(&self, rhs: &Series) -> Result<Series> {
        self.compare(rhs, CmpOp::GtEq, false)
    }

    /// Compare against a scalar. Temporal literals are converted to the
    /// column's tick encoding first.
    ///
    /// # Example
    /// ```
    /// use colrs::{AnyValue, Series};
    /// use colrs::series::comparison::CmpOp;
    ///
    /// let s = Series::new("a", vec![1i64, 5, 9]);
    /// let mask = s.compare_with(AnyValue::Int64(4), CmpOp::Gt).unwrap();
    /// assert_eq!(mask.bool().unwrap().to_options(), vec![Some(false), Some(true), Some(true)]);
    /// ```
    pub fn compare_with(&self, value: impl Into<AnyValue>, op: CmpOp) -> Result<Series> {
        self.compare_scalar(value.into(), op)
    }

    /// Combine with the given binary operator on `Series`
    pub fn compare_op(&self, rhs: &Series, op: CmpOp) -> Result<Series> {
        self.compare(rhs, op, false)
    }

    fn boolean_operands<'a>(
        &'a self,
        rhs: &'a Series,
        op: &str,
    ) -> Result<(&'a ChunkedArray<bool>, &'a ChunkedArray<bool>)> {
        self.check_operand_lengths(rhs)?;
        match (self.physical(), rhs.physical()) {
            (PhysicalData::Boolean(a), PhysicalData::Boolean(b)) => Ok((a, b)),
            _ => Err(Error::TypeMismatch(format!(
                "`{}` is only defined for Boolean, got {} and {}",
                op,
                self.dtype(),
                rhs.dtype()
            ))),
        }
    }

    /// Kleene AND: false wins over null
    pub fn and(&self, rhs: &Series) -> Result<Series> {
        let (a, b) = self.boolean_operands(rhs, "and")?;
        let ca = zip_broadcast(a, b, |a, b| {
            Ok(match (a, b) {
                (Some(false), _) | (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            })
        })?;
        Ok(Series::from_chunked(self.name(), ca))
    }

    /// Kleene OR: true wins over null
    pub fn or(&self, rhs: &Series) -> Result<Series> {
        let (a, b) = self.boolean_operands(rhs, "or")?;
        let ca = zip_broadcast(a, b, |a, b| {
            Ok(match (a, b) {
                (Some(true), _) | (_, Some(true)) => Some(true),
                (Some(false), Some(false)) => Some(false),
                _ => None,
            })
        })?;
        Ok(Series::from_chunked(self.name(), ca))
    }

    pub fn xor(&self, rhs: &Series) -> Result<Series> {
        let (a, b) = self.boolean_operands(rhs, "xor")?;
        let ca = zip_broadcast(a, b, |a, b| {
            Ok(match (a, b) {
                (Some(a), Some(b)) => Some(a ^ b),
                _ => None,
            })
        })?;
        Ok(Series::from_chunked(self.name(), ca))
    }

    /// Logical negation; nulls stay null
    pub fn not(&self) -> Result<Series> {
        match self.physical() {
            PhysicalData::Boolean(ca) => {
                Ok(Series::from_chunked(self.name(), ca.apply_values(|v| !v)))
            }
            _ => Err(Error::TypeMismatch(format!(
                "`not` is only defined for Boolean, got {}",
                self.dtype()
            ))),
        }
    }
}

impl BitAnd for &Series {
    type Output = Result<Series>;

    fn bitand(self, rhs: &Series) -> Self::Output {
        self.and(rhs)
    }
}

impl BitOr for &Series {
    type Output = Result<Series>;

    fn bitor(self, rhs: &Series) -> Self::Output {
        self.or(rhs)
    }
}

impl BitXor for &Series {
    type Output = Result<Series>;

    fn bitxor(self, rhs: &Series) -> Self::Output {
        self.xor(rhs)
    }
}

impl Not for &Series {
    type Output = Result<Series>;

    fn not(self) -> Self::Output {
        Series::not(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_missing_semantics() {
        let a = ChunkedArray::from_options(vec![Some(1), None, None]);
        let b = ChunkedArray::from_options(vec![Some(1), Some(2), None]);
        let eq = compare_ca(&a, &b, CmpOp::Eq, true).unwrap();
        assert_eq!(eq.to_options(), vec![Some(true), Some(false), Some(true)]);
        let eq = compare_ca(&a, &b, CmpOp::Eq, false).unwrap();
        assert_eq!(eq.to_options(), vec![Some(true), None, None]);
    }

    #[test]
    fn test_kleene_logic() {
        let a = Series::new("a", vec![Some(true), Some(false), None, None]);
        let b = Series::new("b", vec![None, None, Some(false), Some(true)]);
        let and = a.and(&b).unwrap();
        assert_eq!(and.bool().unwrap().to_options(), vec![None, Some(false), Some(false), None]);
        let or = a.or(&b).unwrap();
        assert_eq!(or.bool().unwrap().to_options(), vec![Some(true), None, None, Some(true)]);
    }
}
