//! Native element types and the traits that tie them to physical storage

use std::fmt::Debug;

use num_traits::{NumCast, ToPrimitive};

use crate::column::{ChunkedArray, PhysicalData};
use crate::core::any_value::{AnyValue, ObjectValue};
use crate::core::dtype::DataType;
use crate::series::Series;

/// Any value that can live in a chunk
pub trait ArrayValue: Clone + Debug + Default + Send + Sync + 'static {
    /// Wrap a chunked array into its physical variant
    fn into_physical(ca: ChunkedArray<Self>) -> PhysicalData;

    fn from_physical(data: &PhysicalData) -> Option<&ChunkedArray<Self>>;

    fn from_physical_mut(data: &mut PhysicalData) -> Option<&mut ChunkedArray<Self>>;

    /// The value as its physical AnyValue, ignoring any logical dtype
    fn to_any_value(&self) -> AnyValue;
}

/// Element types with a fixed physical dtype
pub trait PhysicalType: ArrayValue {
    fn dtype() -> DataType;
}

macro_rules! impl_array_value {
    ($t:ty, $variant:ident, $dtype:expr) => {
        impl ArrayValue for $t {
            fn into_physical(ca: ChunkedArray<Self>) -> PhysicalData {
                PhysicalData::$variant(ca)
            }

            fn from_physical(data: &PhysicalData) -> Option<&ChunkedArray<Self>> {
                match data {
                    PhysicalData::$variant(ca) => Some(ca),
                    _ => None,
                }
            }

            fn from_physical_mut(data: &mut PhysicalData) -> Option<&mut ChunkedArray<Self>> {
                match data {
                    PhysicalData::$variant(ca) => Some(ca),
                    _ => None,
                }
            }

            fn to_any_value(&self) -> AnyValue {
                AnyValue::$variant(self.clone())
            }
        }

        impl PhysicalType for $t {
            fn dtype() -> DataType {
                $dtype
            }
        }
    };
}

impl_array_value!(bool, Boolean, DataType::Boolean);
impl_array_value!(i8, Int8, DataType::Int8);
impl_array_value!(i16, Int16, DataType::Int16);
impl_array_value!(i32, Int32, DataType::Int32);
impl_array_value!(i64, Int64, DataType::Int64);
impl_array_value!(u8, UInt8, DataType::UInt8);
impl_array_value!(u16, UInt16, DataType::UInt16);
impl_array_value!(u32, UInt32, DataType::UInt32);
impl_array_value!(u64, UInt64, DataType::UInt64);
impl_array_value!(f32, Float32, DataType::Float32);
impl_array_value!(f64, Float64, DataType::Float64);
impl_array_value!(String, Utf8, DataType::Utf8);
impl_array_value!(Vec<u8>, Binary, DataType::Binary);
impl_array_value!(ObjectValue, Object, DataType::Object);

impl ArrayValue for i128 {
    fn into_physical(ca: ChunkedArray<Self>) -> PhysicalData {
        PhysicalData::Decimal(ca)
    }

    fn from_physical(data: &PhysicalData) -> Option<&ChunkedArray<Self>> {
        match data {
            PhysicalData::Decimal(ca) => Some(ca),
            _ => None,
        }
    }

    fn from_physical_mut(data: &mut PhysicalData) -> Option<&mut ChunkedArray<Self>> {
        match data {
            PhysicalData::Decimal(ca) => Some(ca),
            _ => None,
        }
    }

    fn to_any_value(&self) -> AnyValue {
        AnyValue::Decimal(*self, 0)
    }
}

impl ArrayValue for Series {
    fn into_physical(ca: ChunkedArray<Self>) -> PhysicalData {
        PhysicalData::List(ca)
    }

    fn from_physical(data: &PhysicalData) -> Option<&ChunkedArray<Self>> {
        match data {
            PhysicalData::List(ca) => Some(ca),
            _ => None,
        }
    }

    fn from_physical_mut(data: &mut PhysicalData) -> Option<&mut ChunkedArray<Self>> {
        match data {
            PhysicalData::List(ca) => Some(ca),
            _ => None,
        }
    }

    fn to_any_value(&self) -> AnyValue {
        AnyValue::List(self.clone())
    }
}

/// Numeric element types with checked arithmetic kernels
pub trait NumericNative:
    PhysicalType + Copy + PartialOrd + NumCast + ToPrimitive + num_traits::Zero + num_traits::One
{
    const IS_FLOAT: bool;

    /// `None` on overflow
    fn checked_add_(self, rhs: Self) -> Option<Self>;
    fn checked_sub_(self, rhs: Self) -> Option<Self>;
    fn checked_mul_(self, rhs: Self) -> Option<Self>;
    /// `None` when the quotient is undefined (integer division by zero)
    fn checked_div_(self, rhs: Self) -> Option<Self>;
    fn checked_rem_(self, rhs: Self) -> Option<Self>;
    fn abs_(self) -> Option<Self>;
    fn is_nan_(self) -> bool;

    /// Total order used by sorting: NaN sorts after every other value
    fn total_cmp_(&self, other: &Self) -> std::cmp::Ordering;

    fn min_value_() -> Self;
    fn max_value_() -> Self;
}

macro_rules! impl_numeric_int {
    ($($t:ty),*) => {
        $(
            impl NumericNative for $t {
                const IS_FLOAT: bool = false;

                fn checked_add_(self, rhs: Self) -> Option<Self> {
                    self.checked_add(rhs)
                }
                fn checked_sub_(self, rhs: Self) -> Option<Self> {
                    self.checked_sub(rhs)
                }
                fn checked_mul_(self, rhs: Self) -> Option<Self> {
                    self.checked_mul(rhs)
                }
                fn checked_div_(self, rhs: Self) -> Option<Self> {
                    self.checked_div(rhs)
                }
                fn checked_rem_(self, rhs: Self) -> Option<Self> {
                    self.checked_rem(rhs)
                }
                #[allow(unused_comparisons)]
                fn abs_(self) -> Option<Self> {
                    if self < <$t>::default() {
                        <$t>::default().checked_sub(self)
                    } else {
                        Some(self)
                    }
                }
                fn is_nan_(self) -> bool {
                    false
                }
                fn total_cmp_(&self, other: &Self) -> std::cmp::Ordering {
                    self.cmp(other)
                }
                fn min_value_() -> Self {
                    <$t>::MIN
                }
                fn max_value_() -> Self {
                    <$t>::MAX
                }
            }
        )*
    };
}

macro_rules! impl_numeric_float {
    ($($t:ty),*) => {
        $(
            impl NumericNative for $t {
                const IS_FLOAT: bool = true;

                fn checked_add_(self, rhs: Self) -> Option<Self> {
                    Some(self + rhs)
                }
                fn checked_sub_(self, rhs: Self) -> Option<Self> {
                    Some(self - rhs)
                }
                fn checked_mul_(self, rhs: Self) -> Option<Self> {
                    Some(self * rhs)
                }
                fn checked_div_(self, rhs: Self) -> Option<Self> {
                    Some(self / rhs)
                }
                fn checked_rem_(self, rhs: Self) -> Option<Self> {
                    Some(self % rhs)
                }
                fn abs_(self) -> Option<Self> {
                    Some(self.abs())
                }
                fn is_nan_(self) -> bool {
                    self.is_nan()
                }
                fn total_cmp_(&self, other: &Self) -> std::cmp::Ordering {
                    match (self.is_nan(), other.is_nan()) {
                        (true, true) => std::cmp::Ordering::Equal,
                        (true, false) => std::cmp::Ordering::Greater,
                        (false, true) => std::cmp::Ordering::Less,
                        (false, false) => self.partial_cmp(other).unwrap_or(std::cmp::Ordering::Equal),
                    }
                }
                fn min_value_() -> Self {
                    <$t>::NEG_INFINITY
                }
                fn max_value_() -> Self {
                    <$t>::INFINITY
                }
            }
        )*
    };
}

impl_numeric_int!(i8, i16, i32, i64, u8, u16, u32, u64);
impl_numeric_float!(f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_division_by_zero_is_none() {
        assert_eq!(5i32.checked_div_(0), None);
        assert_eq!(5u8.checked_rem_(0), None);
        assert_eq!(7i64.checked_div_(2), Some(3));
    }

    #[test]
    fn test_overflow_detected() {
        assert_eq!(i8::MAX.checked_add_(1), None);
        assert_eq!(0u32.checked_sub_(1), None);
        assert_eq!(i16::MIN.abs_(), None);
    }

    #[test]
    fn test_float_total_order() {
        assert_eq!(f64::NAN.total_cmp_(&1.0), std::cmp::Ordering::Greater);
        assert_eq!(1.0f32.total_cmp_(&2.0), std::cmp::Ordering::Less);
    }
}
