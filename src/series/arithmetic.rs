//! Arithmetic kernels
//!
//! Operands are promoted to their supertype and dispatched once to a typed
//! kernel. Integer overflow is an error; integer division or remainder by zero
//! yields null. True division on integers computes in Float64.

use std::ops::{Add, Div, Mul, Rem, Sub};

use num_traits::{NumCast, ToPrimitive};

use crate::column::{ArrayValue, ChunkedArray, NumericNative, PhysicalData};
use crate::core::any_value::AnyValue;
use crate::core::dtype::{get_supertype, DataType, TimeUnit};
use crate::core::error::{Error, Result};
use crate::series::Series;

/// Binary arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    /// Division producing floats for integer input
    TrueDiv,
    /// Division that floors when an operand is floating point
    FloorDiv,
    Rem,
}

impl ArithmeticOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Sub => "-",
            ArithmeticOp::Mul => "*",
            ArithmeticOp::TrueDiv => "/",
            ArithmeticOp::FloorDiv => "//",
            ArithmeticOp::Rem => "%",
        }
    }

    fn verb(&self) -> &'static str {
        match self {
            ArithmeticOp::Add => "adding",
            ArithmeticOp::Sub => "subtracting",
            ArithmeticOp::Mul => "multiplying",
            ArithmeticOp::TrueDiv | ArithmeticOp::FloorDiv => "dividing",
            ArithmeticOp::Rem => "taking the modulo",
        }
    }
}

/// Zip two arrays element-wise, broadcasting a unit-length side
pub(crate) fn zip_broadcast<T, U, R, F>(
    lhs: &ChunkedArray<T>,
    rhs: &ChunkedArray<U>,
    mut f: F,
) -> Result<ChunkedArray<R>>
where
    T: ArrayValue,
    U: ArrayValue,
    R: ArrayValue,
    F: FnMut(Option<&T>, Option<&U>) -> Result<Option<R>>,
{
    let out: Vec<Option<R>> = match (lhs.len(), rhs.len()) {
        (a, b) if a == b => lhs
            .iter()
            .zip(rhs.iter())
            .map(|(a, b)| f(a, b))
            .collect::<Result<_>>()?,
        (1, _) => {
            let a = lhs.get_ref(0);
            rhs.iter().map(|b| f(a, b)).collect::<Result<_>>()?
        }
        (_, 1) => {
            let b = rhs.get_ref(0);
            lhs.iter().map(|a| f(a, b)).collect::<Result<_>>()?
        }
        (a, b) => {
            return Err(Error::ShapeMismatch(format!(
                "cannot combine operands of length {} and {}",
                a, b
            )))
        }
    };
    Ok(ChunkedArray::from_options(out))
}

fn apply_native<T: NumericNative>(a: T, b: T, op: ArithmeticOp) -> Result<Option<T>> {
    let overflow = || Error::Overflow(format!("{:?} {} {:?} overflows", a, op.symbol(), b));
    match op {
        ArithmeticOp::Add => a.checked_add_(b).map(Some).ok_or_else(overflow),
        ArithmeticOp::Sub => a.checked_sub_(b).map(Some).ok_or_else(overflow),
        ArithmeticOp::Mul => a.checked_mul_(b).map(Some).ok_or_else(overflow),
        ArithmeticOp::TrueDiv => Ok(a.checked_div_(b)),
        ArithmeticOp::FloorDiv => {
            let q = a.checked_div_(b);
            if T::IS_FLOAT {
                Ok(q.and_then(|q| q.to_f64()).and_then(|q| <T as NumCast>::from(q.floor())))
            } else {
                Ok(q)
            }
        }
        ArithmeticOp::Rem => Ok(a.checked_rem_(b)),
    }
}

pub(crate) fn binary_numeric<T: NumericNative>(
    lhs: &ChunkedArray<T>,
    rhs: &ChunkedArray<T>,
    op: ArithmeticOp,
) -> Result<ChunkedArray<T>> {
    zip_broadcast(lhs, rhs, |a, b| match (a, b) {
        (Some(a), Some(b)) => apply_native(*a, *b, op),
        _ => Ok(None),
    })
}

fn apply_decimal(a: i128, b: i128, scale: usize, op: ArithmeticOp) -> Result<Option<i128>> {
    let overflow = || Error::Overflow(format!("decimal {} {} {} overflows", a, op.symbol(), b));
    let factor = 10i128.checked_pow(scale as u32).ok_or_else(overflow)?;
    match op {
        ArithmeticOp::Add => a.checked_add(b).map(Some).ok_or_else(overflow),
        ArithmeticOp::Sub => a.checked_sub(b).map(Some).ok_or_else(overflow),
        ArithmeticOp::Mul => a
            .checked_mul(b)
            .map(|p| Some(p / factor))
            .ok_or_else(overflow),
        ArithmeticOp::TrueDiv => {
            if b == 0 {
                return Ok(None);
            }
            a.checked_mul(factor)
                .map(|n| Some(n / b))
                .ok_or_else(overflow)
        }
        ArithmeticOp::FloorDiv => {
            if b == 0 {
                return Ok(None);
            }
            let mut q = a / b;
            if a % b != 0 && ((a < 0) != (b < 0)) {
                q -= 1;
            }
            q.checked_mul(factor).map(Some).ok_or_else(overflow)
        }
        ArithmeticOp::Rem => Ok(a.checked_rem(b)),
    }
}

macro_rules! numeric_pair {
    ($lhs:expr, $rhs:expr, $a:ident, $b:ident => $body:expr) => {
        match ($lhs, $rhs) {
            (PhysicalData::Int8($a), PhysicalData::Int8($b)) => PhysicalData::Int8($body),
            (PhysicalData::Int16($a), PhysicalData::Int16($b)) => PhysicalData::Int16($body),
            (PhysicalData::Int32($a), PhysicalData::Int32($b)) => PhysicalData::Int32($body),
            (PhysicalData::Int64($a), PhysicalData::Int64($b)) => PhysicalData::Int64($body),
            (PhysicalData::UInt8($a), PhysicalData::UInt8($b)) => PhysicalData::UInt8($body),
            (PhysicalData::UInt16($a), PhysicalData::UInt16($b)) => PhysicalData::UInt16($body),
            (PhysicalData::UInt32($a), PhysicalData::UInt32($b)) => PhysicalData::UInt32($body),
            (PhysicalData::UInt64($a), PhysicalData::UInt64($b)) => PhysicalData::UInt64($body),
            (PhysicalData::Float32($a), PhysicalData::Float32($b)) => PhysicalData::Float32($body),
            (PhysicalData::Float64($a), PhysicalData::Float64($b)) => PhysicalData::Float64($body),
            (l, r) => {
                return Err(Error::TypeMismatch(format!(
                    "no arithmetic kernel for {} and {}",
                    l.type_name(),
                    r.type_name()
                )))
            }
        }
    };
}

impl Series {
    pub(crate) fn check_operand_lengths(&self, rhs: &Series) -> Result<()> {
        let (l, r) = (self.len(), rhs.len());
        if l != r && l != 1 && r != 1 {
            return Err(Error::ShapeMismatch(format!(
                "Series '{}' has length {} but '{}' has length {}",
                self.name(),
                l,
                rhs.name(),
                r
            )));
        }
        Ok(())
    }

    /// Apply a binary arithmetic operator element-wise
    ///
    /// # Arguments
    /// * `rhs` - Right operand; a unit-length Series is broadcast
    /// * `op` - The operator
    pub fn arithmetic(&self, rhs: &Series, op: ArithmeticOp) -> Result<Series> {
        self.check_operand_lengths(rhs)?;
        let (l, r) = (self.dtype(), rhs.dtype());

        if l == &DataType::Utf8 && r == &DataType::Utf8 {
            if op != ArithmeticOp::Add {
                return Err(Error::TypeMismatch(format!(
                    "operator {} is not defined for strings",
                    op.symbol()
                )));
            }
            let ca = zip_broadcast(self.utf8()?, rhs.utf8()?, |a, b| {
                Ok(match (a, b) {
                    (Some(a), Some(b)) => Some(format!("{}{}", a, b)),
                    _ => None,
                })
            })?;
            return Ok(Series::from_chunked(self.name(), ca));
        }
        if l == &DataType::Boolean || r == &DataType::Boolean {
            return Err(Error::TypeMismatch(format!(
                "arithmetic {} is not defined for Boolean; use bitwise operators",
                op.symbol()
            )));
        }
        if l.is_temporal() || r.is_temporal() {
            return self.temporal_arithmetic(rhs, op);
        }
        let supertype = get_supertype(l, r)
            .filter(|d| d.is_numeric())
            .ok_or_else(|| {
                Error::TypeMismatch(format!(
                    "no arithmetic kernel for {} {} {}",
                    l,
                    op.symbol(),
                    r
                ))
            })?;
        if let DataType::Decimal(_, scale) = supertype {
            return self.decimal_arithmetic(rhs, scale, op);
        }
        let supertype = if op == ArithmeticOp::TrueDiv && supertype.is_integer() {
            DataType::Float64
        } else {
            supertype
        };
        let lhs = self.cast(&supertype)?;
        let rhs = rhs.cast(&supertype)?;
        let data = numeric_pair!(lhs.physical(), rhs.physical(), a, b => binary_numeric(a, b, op)?);
        Ok(Series::from_physical_unchecked(self.name(), supertype, data))
    }

    fn decimal_arithmetic(&self, rhs: &Series, scale: usize, op: ArithmeticOp) -> Result<Series> {
        let dtype = DataType::Decimal(None, scale);
        let lhs = self.cast(&dtype)?;
        let rhs = rhs.cast(&dtype)?;
        let ca = zip_broadcast(lhs.unpack::<i128>()?, rhs.unpack::<i128>()?, |a, b| match (a, b) {
            (Some(a), Some(b)) => apply_decimal(*a, *b, scale, op),
            _ => Ok(None),
        })?;
        Ok(Series::from_physical_unchecked(
            self.name(),
            dtype,
            PhysicalData::Decimal(ca),
        ))
    }

    fn temporal_arithmetic(&self, rhs: &Series, op: ArithmeticOp) -> Result<Series> {
        use DataType::*;
        let (l, r) = (self.dtype(), rhs.dtype());
        let finer = |a: &TimeUnit, b: &TimeUnit| {
            if a.ticks_per_second() >= b.ticks_per_second() {
                *a
            } else {
                *b
            }
        };
        let (lhs_dtype, rhs_dtype, out_dtype) = match (op, l, r) {
            (ArithmeticOp::Sub, Datetime(a, tz), Datetime(b, _)) => {
                let u = finer(a, b);
                (Datetime(u, tz.clone()), Datetime(u, tz.clone()), Duration(u))
            }
            (ArithmeticOp::Add | ArithmeticOp::Sub, Datetime(a, tz), Duration(b)) => {
                let u = finer(a, b);
                (Datetime(u, tz.clone()), Duration(u), Datetime(u, tz.clone()))
            }
            (ArithmeticOp::Add, Duration(a), Datetime(b, tz)) => {
                let u = finer(a, b);
                (Duration(u), Datetime(u, tz.clone()), Datetime(u, tz.clone()))
            }
            (ArithmeticOp::Add | ArithmeticOp::Sub, Duration(a), Duration(b)) => {
                let u = finer(a, b);
                (Duration(u), Duration(u), Duration(u))
            }
            (ArithmeticOp::Sub, Date, Date) => {
                let u = TimeUnit::Milliseconds;
                (Datetime(u, None), Datetime(u, None), Duration(u))
            }
            _ => {
                return Err(Error::TypeMismatch(format!(
                    "{} {} and {} is not supported; first cast to integer before {}",
                    op.verb(),
                    l,
                    r,
                    op.verb()
                )))
            }
        };
        let lhs = self.cast(&lhs_dtype)?;
        let rhs = rhs.cast(&rhs_dtype)?;
        let ticks = binary_numeric(lhs.i64()?, rhs.i64()?, op)?;
        Ok(Series::from_physical_unchecked(
            self.name(),
            out_dtype,
            PhysicalData::Int64(ticks),
        ))
    }

    /// Bring a scalar operand onto this Series' dtype where that is lossless in
    /// intent: integer literals, and float literals against float columns, take
    /// the column dtype; temporal literals take the column's unit.
    pub(crate) fn coerce_literal(&self, literal: Series) -> Result<Series> {
        let lit = literal.dtype().clone();
        let own = self.dtype();
        let numeric_col = own.is_integer() || own.is_float();
        if numeric_col && (lit.is_integer() || (lit.is_float() && own.is_float())) {
            return literal.strict_cast(own);
        }
        let same_temporal_kind = matches!(
            (own, &lit),
            (DataType::Datetime(_, _), DataType::Datetime(_, _))
                | (DataType::Datetime(_, _), DataType::Date)
                | (DataType::Duration(_), DataType::Duration(_))
        );
        if same_temporal_kind {
            return literal.strict_cast(own);
        }
        Ok(literal)
    }

    /// Apply an operator against a scalar, broadcasting it
    pub fn arithmetic_scalar(&self, value: impl Into<AnyValue>, op: ArithmeticOp) -> Result<Series> {
        let literal = Series::from_any_values("literal", &[value.into()], true)?;
        let literal = self.coerce_literal(literal)?;
        self.arithmetic(&literal, op)
    }

    pub fn try_add(&self, rhs: &Series) -> Result<Series> {
        self.arithmetic(rhs, ArithmeticOp::Add)
    }

    pub fn try_sub(&self, rhs: &Series) -> Result<Series> {
        self.arithmetic(rhs, ArithmeticOp::Sub)
    }

    pub fn try_mul(&self, rhs: &Series) -> Result<Series> {
        self.arithmetic(rhs, ArithmeticOp::Mul)
    }

    /// True division; integer operands produce Float64
    pub fn try_div(&self, rhs: &Series) -> Result<Series> {
        self.arithmetic(rhs, ArithmeticOp::TrueDiv)
    }

    pub fn floor_div(&self, rhs: &Series) -> Result<Series> {
        self.arithmetic(rhs, ArithmeticOp::FloorDiv)
    }

    pub fn try_rem(&self, rhs: &Series) -> Result<Series> {
        self.arithmetic(rhs, ArithmeticOp::Rem)
    }
}

macro_rules! impl_series_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl $trait<&Series> for &Series {
            type Output = Result<Series>;

            fn $method(self, rhs: &Series) -> Self::Output {
                self.arithmetic(rhs, $op)
            }
        }

        impl $trait<Series> for Series {
            type Output = Result<Series>;

            fn $method(self, rhs: Series) -> Self::Output {
                self.arithmetic(&rhs, $op)
            }
        }
    };
}

impl_series_op!(Add, add, ArithmeticOp::Add);
impl_series_op!(Sub, sub, ArithmeticOp::Sub);
impl_series_op!(Mul, mul, ArithmeticOp::Mul);
impl_series_op!(Div, div, ArithmeticOp::TrueDiv);
impl_series_op!(Rem, rem, ArithmeticOp::Rem);

macro_rules! impl_scalar_op {
    ($($t:ty),*) => {
        $(
            impl Add<$t> for &Series {
                type Output = Result<Series>;
                fn add(self, rhs: $t) -> Self::Output {
                    self.arithmetic_scalar(rhs, ArithmeticOp::Add)
                }
            }
            impl Sub<$t> for &Series {
                type Output = Result<Series>;
                fn sub(self, rhs: $t) -> Self::Output {
                    self.arithmetic_scalar(rhs, ArithmeticOp::Sub)
                }
            }
            impl Mul<$t> for &Series {
                type Output = Result<Series>;
                fn mul(self, rhs: $t) -> Self::Output {
                    self.arithmetic_scalar(rhs, ArithmeticOp::Mul)
                }
            }
            impl Div<$t> for &Series {
                type Output = Result<Series>;
                fn div(self, rhs: $t) -> Self::Output {
                    self.arithmetic_scalar(rhs, ArithmeticOp::TrueDiv)
                }
            }
            impl Rem<$t> for &Series {
                type Output = Result<Series>;
                fn rem(self, rhs: $t) -> Self::Output {
                    self.arithmetic_scalar(rhs, ArithmeticOp::Rem)
                }
            }
        )*
    };
}

impl_scalar_op!(i32, i64, u32, u64, f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_decimal_floor_div() {
        assert_eq!(apply_decimal(-750, 200, 2, ArithmeticOp::FloorDiv).unwrap(), Some(-400));
        assert_eq!(apply_decimal(150, 0, 2, ArithmeticOp::TrueDiv).unwrap(), None);
        assert_eq!(apply_decimal(150, 200, 2, ArithmeticOp::Mul).unwrap(), Some(300));
    }

    #[test]
    fn test_zip_broadcast_shape() {
        let a = ChunkedArray::from_vec(vec![1i32, 2, 3]);
        let b = ChunkedArray::from_vec(vec![1i32, 2]);
        assert!(binary_numeric(&a, &b, ArithmeticOp::Add).is_err());
        let one = ChunkedArray::from_vec(vec![10i32]);
        let out = binary_numeric(&a, &one, ArithmeticOp::Mul).unwrap();
        assert_eq!(out.to_options(), vec![Some(10), Some(20), Some(30)]);
    }
}
