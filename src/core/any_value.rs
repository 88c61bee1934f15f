//! Dynamically typed scalar values
//!
//! [`AnyValue`] is what element access returns and what literals, row
//! construction and heterogeneous input are expressed in.

use std::any::Any;
use std::fmt::{self, Debug, Display};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use num_traits::NumCast;

use crate::core::dtype::{DataType, Field, TimeUnit};
use crate::series::Series;

/// Days between 0001-01-01 (CE day 1) and 1970-01-01
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Opaque value stored in an Object column
#[derive(Clone)]
pub struct ObjectValue {
    inner: Arc<dyn Any + Send + Sync>,
    repr: String,
}

impl ObjectValue {
    /// Wrap any value; its `Debug` output becomes the display form
    pub fn new<T: Any + Send + Sync + Debug>(value: T) -> Self {
        let repr = format!("{:?}", value);
        Self {
            inner: Arc::new(value),
            repr,
        }
    }

    /// Wrap a value with an explicit display form
    pub fn with_repr<T: Any + Send + Sync>(value: T, repr: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(value),
            repr: repr.into(),
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    pub fn repr(&self) -> &str {
        &self.repr
    }
}

impl Default for ObjectValue {
    fn default() -> Self {
        Self::with_repr((), "null")
    }
}

impl Debug for ObjectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({})", self.repr)
    }
}

impl PartialEq for ObjectValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.repr == other.repr
    }
}

/// A single dynamically typed value
#[derive(Debug, Clone, Default)]
pub enum AnyValue {
    #[default]
    Null,
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Utf8(String),
    Binary(Vec<u8>),
    /// Days since the unix epoch
    Date(i32),
    Datetime(i64, TimeUnit, Option<String>),
    Duration(i64, TimeUnit),
    /// Nanoseconds since midnight
    Time(i64),
    /// Unscaled value and scale
    Decimal(i128, usize),
    List(Series),
    Struct(Vec<(String, AnyValue)>),
    Object(ObjectValue),
}

impl AnyValue {
    pub fn is_null(&self) -> bool {
        matches!(self, AnyValue::Null)
    }

    /// The dtype this value naturally belongs to. `Null` has none.
    pub fn dtype(&self) -> Option<DataType> {
        let dt = match self {
            AnyValue::Null => return None,
            AnyValue::Boolean(_) => DataType::Boolean,
            AnyValue::Int8(_) => DataType::Int8,
            AnyValue::Int16(_) => DataType::Int16,
            AnyValue::Int32(_) => DataType::Int32,
            AnyValue::Int64(_) => DataType::Int64,
            AnyValue::UInt8(_) => DataType::UInt8,
            AnyValue::UInt16(_) => DataType::UInt16,
            AnyValue::UInt32(_) => DataType::UInt32,
            AnyValue::UInt64(_) => DataType::UInt64,
            AnyValue::Float32(_) => DataType::Float32,
            AnyValue::Float64(_) => DataType::Float64,
            AnyValue::Utf8(_) => DataType::Utf8,
            AnyValue::Binary(_) => DataType::Binary,
            AnyValue::Date(_) => DataType::Date,
            AnyValue::Datetime(_, tu, tz) => DataType::Datetime(*tu, tz.clone()),
            AnyValue::Duration(_, tu) => DataType::Duration(*tu),
            AnyValue::Time(_) => DataType::Time,
            AnyValue::Decimal(_, scale) => DataType::Decimal(None, *scale),
            AnyValue::List(s) => DataType::List(Box::new(s.dtype().clone())),
            AnyValue::Struct(fields) => DataType::Struct(
                fields
                    .iter()
                    .map(|(name, v)| Field::new(name.clone(), v.dtype().unwrap_or(DataType::Float64)))
                    .collect(),
            ),
            AnyValue::Object(_) => DataType::Object,
        };
        Some(dt)
    }

    /// Numeric view of the value. Temporal values yield their physical ticks.
    pub fn extract<T: NumCast>(&self) -> Option<T> {
        match self {
            AnyValue::Boolean(v) => NumCast::from(*v as u8),
            AnyValue::Int8(v) => NumCast::from(*v),
            AnyValue::Int16(v) => NumCast::from(*v),
            AnyValue::Int32(v) => NumCast::from(*v),
            AnyValue::Int64(v) => NumCast::from(*v),
            AnyValue::UInt8(v) => NumCast::from(*v),
            AnyValue::UInt16(v) => NumCast::from(*v),
            AnyValue::UInt32(v) => NumCast::from(*v),
            AnyValue::UInt64(v) => NumCast::from(*v),
            AnyValue::Float32(v) => NumCast::from(*v),
            AnyValue::Float64(v) => NumCast::from(*v),
            AnyValue::Date(v) => NumCast::from(*v),
            AnyValue::Datetime(v, _, _) | AnyValue::Duration(v, _) | AnyValue::Time(v) => {
                NumCast::from(*v)
            }
            AnyValue::Decimal(v, scale) => NumCast::from(*v as f64 / 10f64.powi(*scale as i32)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AnyValue::Utf8(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AnyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.dtype().map(|d| d.is_numeric()).unwrap_or(false)
    }

    pub fn is_nested(&self) -> bool {
        matches!(self, AnyValue::List(_) | AnyValue::Struct(_))
    }

    /// Build a Date value from a calendar date
    pub fn from_date(date: NaiveDate) -> Self {
        AnyValue::Date(date_to_days(date))
    }

    /// Build a millisecond Datetime value
    pub fn from_datetime(dt: NaiveDateTime) -> Self {
        AnyValue::Datetime(
            dt.and_utc().timestamp_millis(),
            TimeUnit::Milliseconds,
            None,
        )
    }
}

/// Days since the unix epoch for a calendar date
pub fn date_to_days(date: NaiveDate) -> i32 {
    use chrono::Datelike;
    date.num_days_from_ce() - EPOCH_DAYS_FROM_CE
}

pub fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(EPOCH_DAYS_FROM_CE)?)
}

/// Convert epoch ticks in `unit` to a naive datetime
pub fn ticks_to_datetime(value: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let tps = unit.ticks_per_second();
    let secs = value.div_euclid(tps);
    let nanos = value.rem_euclid(tps) * (1_000_000_000 / tps);
    DateTime::from_timestamp(secs, nanos as u32).map(|dt| dt.naive_utc())
}

/// Convert a naive datetime to epoch ticks in `unit`
pub fn datetime_to_ticks(dt: NaiveDateTime, unit: TimeUnit) -> Option<i64> {
    let utc = dt.and_utc();
    match unit {
        TimeUnit::Milliseconds => Some(utc.timestamp_millis()),
        TimeUnit::Microseconds => Some(utc.timestamp_micros()),
        TimeUnit::Nanoseconds => utc.timestamp_nanos_opt(),
    }
}

pub fn nanos_to_time(nanos: i64) -> Option<NaiveTime> {
    let secs = u32::try_from(nanos.div_euclid(1_000_000_000)).ok()?;
    let sub = nanos.rem_euclid(1_000_000_000) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, sub)
}

pub fn time_to_nanos(time: NaiveTime) -> i64 {
    time.num_seconds_from_midnight() as i64 * 1_000_000_000 + time.nanosecond() as i64
}

/// Render an unscaled decimal with `scale` fractional digits
pub fn format_decimal(value: i128, scale: usize) -> String {
    if scale == 0 {
        return value.to_string();
    }
    let factor = 10i128.pow(scale as u32);
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    let factor = factor as u128;
    format!(
        "{}{}.{:0width$}",
        sign,
        abs / factor,
        abs % factor,
        width = scale
    )
}

fn float_bits_f64(v: f64) -> u64 {
    if v.is_nan() {
        f64::NAN.to_bits()
    } else if v == 0.0 {
        0
    } else {
        v.to_bits()
    }
}

impl PartialEq for AnyValue {
    fn eq(&self, other: &Self) -> bool {
        use AnyValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Boolean(a), Boolean(b)) => a == b,
            (Int8(a), Int8(b)) => a == b,
            (Int16(a), Int16(b)) => a == b,
            (Int32(a), Int32(b)) => a == b,
            (Int64(a), Int64(b)) => a == b,
            (UInt8(a), UInt8(b)) => a == b,
            (UInt16(a), UInt16(b)) => a == b,
            (UInt32(a), UInt32(b)) => a == b,
            (UInt64(a), UInt64(b)) => a == b,
            (Float32(a), Float32(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Float64(a), Float64(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Utf8(a), Utf8(b)) => a == b,
            (Binary(a), Binary(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (Datetime(a, ua, za), Datetime(b, ub, zb)) => a == b && ua == ub && za == zb,
            (Duration(a, ua), Duration(b, ub)) => a == b && ua == ub,
            (Time(a), Time(b)) => a == b,
            (Decimal(a, sa), Decimal(b, sb)) => a == b && sa == sb,
            (List(a), List(b)) => a.series_equal_missing(b),
            (Struct(a), Struct(b)) => a == b,
            (Object(a), Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for AnyValue {}

impl Hash for AnyValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            AnyValue::Null => {}
            AnyValue::Boolean(v) => v.hash(state),
            AnyValue::Int8(v) => v.hash(state),
            AnyValue::Int16(v) => v.hash(state),
            AnyValue::Int32(v) => v.hash(state),
            AnyValue::Int64(v) => v.hash(state),
            AnyValue::UInt8(v) => v.hash(state),
            AnyValue::UInt16(v) => v.hash(state),
            AnyValue::UInt32(v) => v.hash(state),
            AnyValue::UInt64(v) => v.hash(state),
            AnyValue::Float32(v) => float_bits_f64(*v as f64).hash(state),
            AnyValue::Float64(v) => float_bits_f64(*v).hash(state),
            AnyValue::Utf8(v) => v.hash(state),
            AnyValue::Binary(v) => v.hash(state),
            AnyValue::Date(v) => v.hash(state),
            AnyValue::Datetime(v, tu, tz) => {
                v.hash(state);
                tu.hash(state);
                tz.hash(state);
            }
            AnyValue::Duration(v, tu) => {
                v.hash(state);
                tu.hash(state);
            }
            AnyValue::Time(v) => v.hash(state),
            AnyValue::Decimal(v, s) => {
                v.hash(state);
                s.hash(state);
            }
            AnyValue::List(s) => {
                s.len().hash(state);
                for v in s.iter() {
                    v.hash(state);
                }
            }
            AnyValue::Struct(fields) => fields.hash(state),
            AnyValue::Object(o) => o.repr().hash(state),
        }
    }
}

impl Display for AnyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnyValue::Null => write!(f, "null"),
            AnyValue::Boolean(v) => write!(f, "{}", v),
            AnyValue::Int8(v) => write!(f, "{}", v),
            AnyValue::Int16(v) => write!(f, "{}", v),
            AnyValue::Int32(v) => write!(f, "{}", v),
            AnyValue::Int64(v) => write!(f, "{}", v),
            AnyValue::UInt8(v) => write!(f, "{}", v),
            AnyValue::UInt16(v) => write!(f, "{}", v),
            AnyValue::UInt32(v) => write!(f, "{}", v),
            AnyValue::UInt64(v) => write!(f, "{}", v),
            AnyValue::Float32(v) => write!(f, "{}", v),
            AnyValue::Float64(v) => write!(f, "{}", v),
            AnyValue::Utf8(v) => write!(f, "{}", v),
            AnyValue::Binary(v) => write!(f, "b{:?}", v),
            AnyValue::Date(v) => match days_to_date(*v) {
                Some(d) => write!(f, "{}", d.format("%Y-%m-%d")),
                None => write!(f, "{}d", v),
            },
            AnyValue::Datetime(v, tu, _) => match ticks_to_datetime(*v, *tu) {
                Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.f")),
                None => write!(f, "{}{}", v, tu),
            },
            AnyValue::Duration(v, tu) => write!(f, "{}{}", v, tu),
            AnyValue::Time(v) => match nanos_to_time(*v) {
                Some(t) => write!(f, "{}", t.format("%H:%M:%S%.f")),
                None => write!(f, "{}ns", v),
            },
            AnyValue::Decimal(v, s) => write!(f, "{}", format_decimal(*v, *s)),
            AnyValue::List(s) => {
                write!(f, "[")?;
                for (i, v) in s.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            AnyValue::Struct(fields) => {
                write!(f, "{{")?;
                for (i, (name, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, v)?;
                }
                write!(f, "}}")
            }
            AnyValue::Object(o) => write!(f, "{}", o.repr()),
        }
    }
}

macro_rules! impl_from_native {
    ($($t:ty => $variant:ident),*) => {
        $(
            impl From<$t> for AnyValue {
                fn from(v: $t) -> Self {
                    AnyValue::$variant(v)
                }
            }
        )*
    };
}

impl_from_native!(
    bool => Boolean,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
    String => Utf8,
    Vec<u8> => Binary,
    Series => List,
    ObjectValue => Object
);

impl From<&str> for AnyValue {
    fn from(v: &str) -> Self {
        AnyValue::Utf8(v.to_string())
    }
}

impl From<NaiveDate> for AnyValue {
    fn from(v: NaiveDate) -> Self {
        AnyValue::from_date(v)
    }
}

impl From<NaiveDateTime> for AnyValue {
    fn from(v: NaiveDateTime) -> Self {
        AnyValue::from_datetime(v)
    }
}

impl From<NaiveTime> for AnyValue {
    fn from(v: NaiveTime) -> Self {
        AnyValue::Time(time_to_nanos(v))
    }
}

impl<T: Into<AnyValue>> From<Option<T>> for AnyValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => AnyValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_equal_and_hash_consistent() {
        use std::collections::hash_map::DefaultHasher;
        let a = AnyValue::Float64(f64::NAN);
        let b = AnyValue::Float64(f64::NAN);
        assert_eq!(a, b);
        let mut ha = DefaultHasher::new();
        let mut hb = DefaultHasher::new();
        a.hash(&mut ha);
        b.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());
    }

    #[test]
    fn test_date_roundtrip() {
        let d = NaiveDate::from_ymd_opt(2021, 3, 4).unwrap();
        let days = date_to_days(d);
        assert_eq!(days_to_date(days), Some(d));
        assert_eq!(date_to_days(NaiveDate::from_ymd_opt(1970, 1, 2).unwrap()), 1);
    }

    #[test]
    fn test_format_decimal() {
        assert_eq!(format_decimal(12345, 2), "123.45");
        assert_eq!(format_decimal(-5, 3), "-0.005");
        assert_eq!(format_decimal(7, 0), "7");
    }

    #[test]
    fn test_extract() {
        assert_eq!(AnyValue::Int32(7).extract::<f64>(), Some(7.0));
        assert_eq!(AnyValue::Boolean(true).extract::<u32>(), Some(1));
        assert_eq!(AnyValue::Utf8("x".into()).extract::<i64>(), None);
        assert_eq!(AnyValue::Int64(-1).extract::<u8>(), None);
    }

    #[test]
    fn test_ticks_to_datetime() {
        let dt = ticks_to_datetime(1_500, TimeUnit::Milliseconds).unwrap();
        assert_eq!(dt.and_utc().timestamp_millis(), 1_500);
        let dt = ticks_to_datetime(-1, TimeUnit::Nanoseconds).unwrap();
        assert_eq!(datetime_to_ticks(dt, TimeUnit::Nanoseconds), Some(-1));
    }
}
