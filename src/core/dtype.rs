//! Data type tags, promotion and castability rules
//!
//! Every [`Series`](crate::series::Series) carries exactly one [`DataType`]. Logical
//! types (temporal, categorical, decimal) are stored on top of a physical
//! representation; [`DataType::to_physical`] names it.

use std::fmt::{self, Display};

/// Row index type used for gathers, ranks and group indices
#[cfg(not(feature = "bigidx"))]
pub type IdxSize = u32;
/// Row index type used for gathers, ranks and group indices
#[cfg(feature = "bigidx")]
pub type IdxSize = u64;

/// DataType matching [`IdxSize`]
#[cfg(not(feature = "bigidx"))]
pub const IDX_DTYPE: DataType = DataType::UInt32;
/// DataType matching [`IdxSize`]
#[cfg(feature = "bigidx")]
pub const IDX_DTYPE: DataType = DataType::UInt64;

/// Time unit of Datetime and Duration values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Milliseconds,
    Microseconds,
    Nanoseconds,
}

impl TimeUnit {
    /// Number of ticks in one second
    pub fn ticks_per_second(&self) -> i64 {
        match self {
            TimeUnit::Milliseconds => 1_000,
            TimeUnit::Microseconds => 1_000_000,
            TimeUnit::Nanoseconds => 1_000_000_000,
        }
    }

    /// Number of ticks in one day
    pub fn ticks_per_day(&self) -> i64 {
        self.ticks_per_second() * 86_400
    }

    /// Convert a tick count from this unit into `to`.
    ///
    /// Returns `None` when scaling up overflows `i64`. Scaling down floors.
    pub fn convert(&self, value: i64, to: TimeUnit) -> Option<i64> {
        let from = self.ticks_per_second();
        let target = to.ticks_per_second();
        if from == target {
            Some(value)
        } else if target > from {
            value.checked_mul(target / from)
        } else {
            Some(value.div_euclid(from / target))
        }
    }
}

impl Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeUnit::Milliseconds => write!(f, "ms"),
            TimeUnit::Microseconds => write!(f, "μs"),
            TimeUnit::Nanoseconds => write!(f, "ns"),
        }
    }
}

/// A named, typed slot in a schema or struct
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub dtype: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, dtype: DataType) -> Self {
        Self {
            name: name.into(),
            dtype,
        }
    }
}

/// Closed set of data type tags
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Utf8,
    Binary,
    /// Days since the unix epoch, stored as `i32`
    Date,
    /// Ticks since the unix epoch in the given unit, stored as `i64`
    Datetime(TimeUnit, Option<String>),
    /// Ticks in the given unit, stored as `i64`
    Duration(TimeUnit),
    /// Nanoseconds since midnight, stored as `i64`
    Time,
    /// Fixed point number stored as `i128`: (precision, scale)
    Decimal(Option<usize>, usize),
    /// Strings stored as `u32` codes plus a reverse mapping
    Categorical,
    List(Box<DataType>),
    Struct(Vec<Field>),
    /// Opaque values with no kernels besides gather, filter and equality
    Object,
}

/// How faithful a cast between two dtypes is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    /// Every value of the source type is representable in the target
    Lossless,
    /// Some values truncate, round or fall outside the target range
    Lossy,
}

impl DataType {
    pub fn is_signed_integer(&self) -> bool {
        matches!(
            self,
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64
        )
    }

    pub fn is_unsigned_integer(&self) -> bool {
        matches!(
            self,
            DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64
        )
    }

    pub fn is_integer(&self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }

    /// Integers, floats and decimals
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float() || matches!(self, DataType::Decimal(_, _))
    }

    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            DataType::Date | DataType::Datetime(_, _) | DataType::Duration(_) | DataType::Time
        )
    }

    pub fn is_nested(&self) -> bool {
        matches!(self, DataType::List(_) | DataType::Struct(_))
    }

    /// Whether values of this type have a total or partial order kernels can use
    pub fn is_ordinal(&self) -> bool {
        !matches!(
            self,
            DataType::List(_) | DataType::Struct(_) | DataType::Object
        )
    }

    /// The type the values are physically stored as.
    ///
    /// Decimal has no narrower physical tag and maps to itself.
    pub fn to_physical(&self) -> DataType {
        match self {
            DataType::Date => DataType::Int32,
            DataType::Datetime(_, _) | DataType::Duration(_) | DataType::Time => DataType::Int64,
            DataType::Categorical => DataType::UInt32,
            DataType::List(inner) => DataType::List(Box::new(inner.to_physical())),
            other => other.clone(),
        }
    }

    /// Inner type of a List
    pub fn inner_dtype(&self) -> Option<&DataType> {
        match self {
            DataType::List(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn time_unit(&self) -> Option<TimeUnit> {
        match self {
            DataType::Datetime(tu, _) | DataType::Duration(tu) => Some(*tu),
            _ => None,
        }
    }

    /// Width in bits of fixed-width numeric types
    pub fn bit_width(&self) -> Option<usize> {
        match self {
            DataType::Boolean => Some(1),
            DataType::Int8 | DataType::UInt8 => Some(8),
            DataType::Int16 | DataType::UInt16 => Some(16),
            DataType::Int32 | DataType::UInt32 | DataType::Float32 | DataType::Date => Some(32),
            DataType::Int64
            | DataType::UInt64
            | DataType::Float64
            | DataType::Datetime(_, _)
            | DataType::Duration(_)
            | DataType::Time => Some(64),
            DataType::Decimal(_, _) => Some(128),
            _ => None,
        }
    }

    fn signed_of_width(bits: usize) -> Option<DataType> {
        match bits {
            8 => Some(DataType::Int8),
            16 => Some(DataType::Int16),
            32 => Some(DataType::Int32),
            64 => Some(DataType::Int64),
            _ => None,
        }
    }

    /// Determine whether a value of `self` can be cast to `to`, and how faithfully.
    ///
    /// Returns `None` when no cast kernel exists.
    pub fn cast_kind(&self, to: &DataType) -> Option<CastKind> {
        use DataType::*;
        if self == to {
            return Some(CastKind::Lossless);
        }
        let lossless = |ok: bool| {
            if ok {
                CastKind::Lossless
            } else {
                CastKind::Lossy
            }
        };
        match (self, to) {
            (Object, _) => None,
            (_, Object) => Some(CastKind::Lossless),
            (List(a), List(b)) => a.cast_kind(b),
            (List(_), _) | (_, List(_)) => None,
            (Struct(a), Struct(b)) => {
                if a.len() != b.len() {
                    return None;
                }
                let mut kind = CastKind::Lossless;
                for (fa, fb) in a.iter().zip(b.iter()) {
                    match fa.dtype.cast_kind(&fb.dtype)? {
                        CastKind::Lossy => kind = CastKind::Lossy,
                        CastKind::Lossless => {}
                    }
                }
                Some(kind)
            }
            (Struct(_), _) | (_, Struct(_)) => None,
            (Binary, Utf8) | (Utf8, Binary) => Some(CastKind::Lossy),
            (Binary, _) | (_, Binary) => None,
            (_, Utf8) => Some(CastKind::Lossless),
            (Utf8, Categorical) | (Categorical, Utf8) => Some(CastKind::Lossless),
            (Utf8, _) => Some(CastKind::Lossy),
            (Categorical, UInt32) => Some(CastKind::Lossless),
            (Categorical, _) | (_, Categorical) => None,
            (Boolean, t) if t.is_numeric() => Some(CastKind::Lossless),
            (f, Boolean) if f.is_numeric() => Some(CastKind::Lossy),
            (Date, Datetime(_, _)) => Some(CastKind::Lossless),
            (Datetime(_, _), Date) => Some(CastKind::Lossy),
            (Datetime(a, _), Datetime(b, _)) | (Duration(a), Duration(b)) => {
                Some(lossless(b.ticks_per_second() >= a.ticks_per_second()))
            }
            (Datetime(_, _), Time) => Some(CastKind::Lossy),
            (f, t) if f.is_temporal() && t.is_integer() => {
                Some(f.to_physical().cast_kind(t).unwrap_or(CastKind::Lossy))
            }
            (f, t) if f.is_integer() && t.is_temporal() => {
                Some(f.cast_kind(&t.to_physical()).unwrap_or(CastKind::Lossy))
            }
            (f, t) if f.is_temporal() || t.is_temporal() => None,
            (Decimal(_, sa), Decimal(pb, sb)) => Some(lossless(sb >= sa && pb.is_none())),
            (Decimal(_, _), Float64) | (Decimal(_, _), Float32) => Some(CastKind::Lossy),
            (Decimal(_, _), _) => Some(CastKind::Lossy),
            (f, Decimal(p, _)) if f.is_integer() => Some(lossless(p.is_none())),
            (_, Decimal(_, _)) => Some(CastKind::Lossy),
            (f, t) if f.is_numeric() && t.is_numeric() => Some(lossless(numeric_widens(f, t))),
            _ => None,
        }
    }

    /// Whether a strict cast of every value of `self` into `to` and back is the identity
    pub fn can_cast_losslessly(&self, to: &DataType) -> bool {
        self.cast_kind(to) == Some(CastKind::Lossless)
    }
}

fn numeric_widens(from: &DataType, to: &DataType) -> bool {
    use DataType::*;
    let (fb, tb) = match (from.bit_width(), to.bit_width()) {
        (Some(a), Some(b)) => (a, b),
        _ => return false,
    };
    if from.is_signed_integer() && to.is_signed_integer()
        || from.is_unsigned_integer() && to.is_unsigned_integer()
    {
        return tb >= fb;
    }
    if from.is_unsigned_integer() && to.is_signed_integer() {
        return tb > fb;
    }
    if from.is_integer() && to.is_float() {
        // mantissa of f32 holds 24 bits, f64 holds 53
        return match to {
            Float32 => fb <= 16,
            _ => fb <= 32,
        };
    }
    matches!((from, to), (Float32, Float64))
}

/// Promoted result type of a binary operation between `l` and `r`.
///
/// Returns `None` when the two types have no common supertype.
pub fn get_supertype(l: &DataType, r: &DataType) -> Option<DataType> {
    if l == r {
        return Some(l.clone());
    }
    supertype_ordered(l, r).or_else(|| supertype_ordered(r, l))
}

fn supertype_ordered(l: &DataType, r: &DataType) -> Option<DataType> {
    use DataType::*;
    match (l, r) {
        (a, b) if a.is_signed_integer() && b.is_signed_integer() => {
            if a.bit_width()? >= b.bit_width()? {
                Some(a.clone())
            } else {
                Some(b.clone())
            }
        }
        (a, b) if a.is_unsigned_integer() && b.is_unsigned_integer() => {
            if a.bit_width()? >= b.bit_width()? {
                Some(a.clone())
            } else {
                Some(b.clone())
            }
        }
        (s, u) if s.is_signed_integer() && u.is_unsigned_integer() => {
            let sb = s.bit_width()?;
            let ub = u.bit_width()?;
            if sb > ub {
                Some(s.clone())
            } else {
                // no signed type is wide enough for UInt64
                DataType::signed_of_width(ub * 2).or(Some(Float64))
            }
        }
        (Float64, t) if t.is_integer() || t.is_float() => Some(Float64),
        (Float32, t) if t.is_integer() => {
            if t.bit_width()? <= 16 {
                Some(Float32)
            } else {
                Some(Float64)
            }
        }
        (Boolean, t) if t.is_numeric() => Some(t.clone()),
        (Decimal(_, sa), Decimal(_, sb)) => Some(Decimal(None, *sa.max(sb))),
        (Decimal(_, s), t) if t.is_integer() => Some(Decimal(None, *s)),
        (Decimal(_, _), t) if t.is_float() => Some(Float64),
        (Datetime(a, tz), Datetime(b, _)) => {
            let unit = if a.ticks_per_second() >= b.ticks_per_second() {
                *a
            } else {
                *b
            };
            Some(Datetime(unit, tz.clone()))
        }
        (Datetime(tu, tz), Date) => Some(Datetime(*tu, tz.clone())),
        (Duration(a), Duration(b)) => {
            if a.ticks_per_second() >= b.ticks_per_second() {
                Some(Duration(*a))
            } else {
                Some(Duration(*b))
            }
        }
        (Utf8, Categorical) => Some(Utf8),
        (List(a), List(b)) => Some(List(Box::new(get_supertype(a, b)?))),
        (List(inner), other) if !other.is_nested() => {
            Some(List(Box::new(get_supertype(inner, other)?)))
        }
        (Object, _) => Some(Object),
        _ => None,
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Boolean => write!(f, "bool"),
            DataType::Int8 => write!(f, "i8"),
            DataType::Int16 => write!(f, "i16"),
            DataType::Int32 => write!(f, "i32"),
            DataType::Int64 => write!(f, "i64"),
            DataType::UInt8 => write!(f, "u8"),
            DataType::UInt16 => write!(f, "u16"),
            DataType::UInt32 => write!(f, "u32"),
            DataType::UInt64 => write!(f, "u64"),
            DataType::Float32 => write!(f, "f32"),
            DataType::Float64 => write!(f, "f64"),
            DataType::Utf8 => write!(f, "str"),
            DataType::Binary => write!(f, "binary"),
            DataType::Date => write!(f, "date"),
            DataType::Datetime(tu, None) => write!(f, "datetime[{}]", tu),
            DataType::Datetime(tu, Some(tz)) => write!(f, "datetime[{}, {}]", tu, tz),
            DataType::Duration(tu) => write!(f, "duration[{}]", tu),
            DataType::Time => write!(f, "time"),
            DataType::Decimal(Some(p), s) => write!(f, "decimal[{},{}]", p, s),
            DataType::Decimal(None, s) => write!(f, "decimal[*,{}]", s),
            DataType::Categorical => write!(f, "cat"),
            DataType::List(inner) => write!(f, "list[{}]", inner),
            DataType::Struct(fields) => write!(f, "struct[{}]", fields.len()),
            DataType::Object => write!(f, "object"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_promotion() {
        assert_eq!(
            get_supertype(&DataType::Int8, &DataType::Int32),
            Some(DataType::Int32)
        );
        assert_eq!(
            get_supertype(&DataType::UInt8, &DataType::Int8),
            Some(DataType::Int16)
        );
        assert_eq!(
            get_supertype(&DataType::UInt32, &DataType::Int64),
            Some(DataType::Int64)
        );
        assert_eq!(
            get_supertype(&DataType::UInt64, &DataType::Int64),
            Some(DataType::Float64)
        );
    }

    #[test]
    fn test_float_absorbs_int() {
        assert_eq!(
            get_supertype(&DataType::Float32, &DataType::Int64),
            Some(DataType::Float64)
        );
        assert_eq!(
            get_supertype(&DataType::Int16, &DataType::Float32),
            Some(DataType::Float32)
        );
        assert_eq!(
            get_supertype(&DataType::Float32, &DataType::Float64),
            Some(DataType::Float64)
        );
    }

    #[test]
    fn test_decimal_scale_is_max() {
        assert_eq!(
            get_supertype(&DataType::Decimal(Some(5), 2), &DataType::Decimal(None, 4)),
            Some(DataType::Decimal(None, 4))
        );
        assert_eq!(
            get_supertype(&DataType::Int64, &DataType::Decimal(Some(10), 3)),
            Some(DataType::Decimal(None, 3))
        );
    }

    #[test]
    fn test_no_supertype() {
        assert_eq!(get_supertype(&DataType::Utf8, &DataType::Int64), None);
        assert_eq!(get_supertype(&DataType::Date, &DataType::Float64), None);
    }

    #[test]
    fn test_cast_kind() {
        assert_eq!(
            DataType::Int32.cast_kind(&DataType::Int64),
            Some(CastKind::Lossless)
        );
        assert_eq!(
            DataType::Int64.cast_kind(&DataType::Int8),
            Some(CastKind::Lossy)
        );
        assert_eq!(
            DataType::UInt16.cast_kind(&DataType::Int16),
            Some(CastKind::Lossy)
        );
        assert_eq!(
            DataType::Boolean.cast_kind(&DataType::UInt32),
            Some(CastKind::Lossless)
        );
        assert_eq!(DataType::Object.cast_kind(&DataType::Int64), None);
        assert_eq!(
            DataType::Date.cast_kind(&DataType::Datetime(TimeUnit::Milliseconds, None)),
            Some(CastKind::Lossless)
        );
    }

    #[test]
    fn test_time_unit_convert() {
        assert_eq!(
            TimeUnit::Milliseconds.convert(5, TimeUnit::Nanoseconds),
            Some(5_000_000)
        );
        assert_eq!(
            TimeUnit::Nanoseconds.convert(-1, TimeUnit::Milliseconds),
            Some(-1)
        );
        assert_eq!(
            TimeUnit::Milliseconds.convert(i64::MAX, TimeUnit::Microseconds),
            None
        );
    }
}
