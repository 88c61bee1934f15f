//! Casting between dtypes
//!
//! A non-strict cast turns values that do not fit the target into nulls. A
//! strict cast runs the same kernels and fails if any non-null input became
//! null.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use num_traits::{NumCast, ToPrimitive, Zero};

use crate::column::{with_numeric, ChunkedArray, NumericNative, PhysicalData};
use crate::core::any_value::{datetime_to_ticks, time_to_nanos, AnyValue, ObjectValue};
use crate::core::dtype::{DataType, TimeUnit};
use crate::core::error::{Error, Result};
use crate::series::categorical::{decode_codes, encode_utf8};
use crate::series::Series;

fn cast_numeric<S: NumericNative, T: NumericNative>(ca: &ChunkedArray<S>) -> ChunkedArray<T> {
    ca.apply_opt(|v| v.and_then(|v| <T as NumCast>::from(*v)))
}

/// Cast a numeric array into the physical storage of `to`
fn numeric_to<S: NumericNative>(ca: &ChunkedArray<S>, to: &DataType) -> Result<PhysicalData> {
    let out = match to {
        DataType::Boolean => PhysicalData::Boolean(ca.apply_values(|v| !v.is_zero())),
        DataType::Int8 => PhysicalData::Int8(cast_numeric(ca)),
        DataType::Int16 => PhysicalData::Int16(cast_numeric(ca)),
        DataType::Int32 => PhysicalData::Int32(cast_numeric(ca)),
        DataType::Int64 => PhysicalData::Int64(cast_numeric(ca)),
        DataType::UInt8 => PhysicalData::UInt8(cast_numeric(ca)),
        DataType::UInt16 => PhysicalData::UInt16(cast_numeric(ca)),
        DataType::UInt32 => PhysicalData::UInt32(cast_numeric(ca)),
        DataType::UInt64 => PhysicalData::UInt64(cast_numeric(ca)),
        DataType::Float32 => PhysicalData::Float32(cast_numeric(ca)),
        DataType::Float64 => PhysicalData::Float64(cast_numeric(ca)),
        other => {
            return Err(Error::TypeMismatch(format!(
                "no numeric cast kernel into {}",
                other
            )))
        }
    };
    Ok(out)
}

fn pow10(exp: usize) -> Option<i128> {
    10i128.checked_pow(exp as u32)
}

/// Change the scale of an unscaled decimal, truncating when scaling down
pub(crate) fn rescale(value: i128, from: usize, to: usize) -> Option<i128> {
    if to >= from {
        value.checked_mul(pow10(to - from)?)
    } else {
        Some(value / pow10(from - to)?)
    }
}

fn fits_precision(value: i128, precision: Option<usize>) -> bool {
    match precision {
        Some(p) => pow10(p).map(|limit| value.abs() < limit).unwrap_or(true),
        None => true,
    }
}

/// Parse a decimal string into an unscaled value with `scale` digits
pub(crate) fn parse_decimal(s: &str, scale: usize) -> Option<i128> {
    let s = s.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, f),
        None => (digits, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.chars().all(|c| c.is_ascii_digit()) || !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let mut value: i128 = if int_part.is_empty() { 0 } else { int_part.parse().ok()? };
    value = value.checked_mul(pow10(scale)?)?;
    let frac: String = frac_part.chars().take(scale).collect();
    if !frac.is_empty() {
        let frac_value: i128 = frac.parse().ok()?;
        value = value.checked_add(frac_value.checked_mul(pow10(scale - frac.len())?)?)?;
    }
    Some(if negative { -value } else { value })
}

fn parse_numeric<T: NumericNative + FromStr>(ca: &ChunkedArray<String>) -> ChunkedArray<T> {
    ca.apply_opt(|v| v.and_then(|s| s.trim().parse::<T>().ok()))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

pub(crate) fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_utf8(ca: &ChunkedArray<String>, to: &DataType) -> Result<PhysicalData> {
    let out = match to {
        DataType::Boolean => PhysicalData::Boolean(ca.apply_opt(|v| v.and_then(|s| parse_bool(s)))),
        DataType::Int8 => PhysicalData::Int8(parse_numeric(ca)),
        DataType::Int16 => PhysicalData::Int16(parse_numeric(ca)),
        DataType::Int32 => PhysicalData::Int32(parse_numeric(ca)),
        DataType::Int64 | DataType::Duration(_) => PhysicalData::Int64(parse_numeric(ca)),
        DataType::UInt8 => PhysicalData::UInt8(parse_numeric(ca)),
        DataType::UInt16 => PhysicalData::UInt16(parse_numeric(ca)),
        DataType::UInt32 => PhysicalData::UInt32(parse_numeric(ca)),
        DataType::UInt64 => PhysicalData::UInt64(parse_numeric(ca)),
        DataType::Float32 => PhysicalData::Float32(parse_numeric(ca)),
        DataType::Float64 => PhysicalData::Float64(parse_numeric(ca)),
        DataType::Date => PhysicalData::Int32(ca.apply_opt(|v| {
            v.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
                .map(crate::core::any_value::date_to_days)
        })),
        DataType::Datetime(tu, _) => PhysicalData::Int64(ca.apply_opt(|v| {
            v.and_then(|s| parse_datetime(s))
                .and_then(|dt| datetime_to_ticks(dt, *tu))
        })),
        DataType::Time => PhysicalData::Int64(ca.apply_opt(|v| {
            v.and_then(|s| {
                NaiveTime::parse_from_str(s.trim(), "%H:%M:%S%.f")
                    .or_else(|_| NaiveTime::parse_from_str(s.trim(), "%H:%M"))
                    .ok()
            })
            .map(time_to_nanos)
        })),
        DataType::Decimal(precision, scale) => PhysicalData::Decimal(ca.apply_opt(|v| {
            v.and_then(|s| parse_decimal(s, *scale))
                .filter(|d| fits_precision(*d, *precision))
        })),
        other => {
            return Err(Error::TypeMismatch(format!(
                "cannot parse strings into {}",
                other
            )))
        }
    };
    Ok(out)
}

fn numeric_to_decimal<S: NumericNative>(
    ca: &ChunkedArray<S>,
    precision: Option<usize>,
    scale: usize,
) -> ChunkedArray<i128> {
    let factor = pow10(scale);
    ca.apply_opt(|v| {
        let v = *v?;
        let factor = factor?;
        let unscaled = if S::IS_FLOAT {
            let f = v.to_f64()? * factor as f64;
            if !f.is_finite() {
                return None;
            }
            f.round().to_i128()?
        } else {
            v.to_i128()?.checked_mul(factor)?
        };
        Some(unscaled).filter(|d| fits_precision(*d, precision))
    })
}

fn decimal_to(ca: &ChunkedArray<i128>, scale: usize, to: &DataType) -> Result<PhysicalData> {
    let factor = pow10(scale).unwrap_or(1);
    match to {
        DataType::Decimal(precision, to_scale) => Ok(PhysicalData::Decimal(ca.apply_opt(|v| {
            v.and_then(|v| rescale(*v, scale, *to_scale))
                .filter(|d| fits_precision(*d, *precision))
        }))),
        DataType::Float32 | DataType::Float64 => {
            let floats: ChunkedArray<f64> = ca.apply_values(|v| *v as f64 / factor as f64);
            numeric_to(&floats, to)
        }
        DataType::Boolean => Ok(PhysicalData::Boolean(ca.apply_values(|v| *v != 0))),
        t if t.is_integer() => {
            let truncated: ChunkedArray<i64> =
                ca.apply_opt(|v| v.and_then(|v| (v / factor).to_i64()));
            numeric_to(&truncated, t)
        }
        other => Err(Error::TypeMismatch(format!(
            "no cast kernel from decimal into {}",
            other
        ))),
    }
}

fn convert_ticks(ca: &ChunkedArray<i64>, from: TimeUnit, to: TimeUnit) -> ChunkedArray<i64> {
    ca.apply_opt(|v| v.and_then(|v| from.convert(*v, to)))
}

impl Series {
    /// Cast to `dtype`, turning values that do not fit into nulls
    pub fn cast(&self, dtype: &DataType) -> Result<Series> {
        self.cast_with_options(dtype, false)
    }

    /// Cast to `dtype`, failing when any value does not fit
    pub fn strict_cast(&self, dtype: &DataType) -> Result<Series> {
        self.cast_with_options(dtype, true)
    }

    pub fn cast_with_options(&self, dtype: &DataType, strict: bool) -> Result<Series> {
        let out = self.cast_impl(dtype)?;
        if strict && out.null_count() > self.null_count() {
            let offending = self
                .iter()
                .zip(out.iter())
                .find(|(src, dst)| !src.is_null() && dst.is_null())
                .map(|(src, _)| src)
                .unwrap_or(AnyValue::Null);
            let numeric_source = self.dtype.is_numeric()
                || self.dtype.is_temporal()
                || self.dtype == DataType::Boolean;
            return Err(if numeric_source {
                Error::Overflow(format!(
                    "value {} of Series '{}' does not fit in {}",
                    offending, self.name, dtype
                ))
            } else {
                Error::StrictCast {
                    from: self.dtype.clone(),
                    to: dtype.clone(),
                    detail: format!("value '{}' could not be converted", offending),
                }
            });
        }
        Ok(out)
    }

    fn cast_impl(&self, to: &DataType) -> Result<Series> {
        let from = &self.dtype;
        if from == to {
            return Ok(self.clone());
        }
        if from.cast_kind(to).is_none() {
            return Err(Error::TypeMismatch(format!(
                "cannot cast Series '{}' from {} to {}",
                self.name, from, to
            )));
        }
        let name = self.name.as_str();
        let relabel = |data: PhysicalData| Series::from_physical_unchecked(name, to.clone(), data);

        match (from, to) {
            (_, DataType::Object) => {
                let ca: ChunkedArray<ObjectValue> = self
                    .iter()
                    .map(|v| {
                        if v.is_null() {
                            None
                        } else {
                            let repr = v.to_string();
                            Some(ObjectValue::with_repr(v, repr))
                        }
                    })
                    .collect();
                Ok(relabel(PhysicalData::Object(ca)))
            }
            (DataType::Categorical, DataType::Utf8) => {
                let codes = self.unpack::<u32>()?;
                let map = self.categories()?;
                Ok(relabel(PhysicalData::Utf8(decode_codes(codes, map))))
            }
            (DataType::Categorical, DataType::UInt32) => {
                Ok(relabel(PhysicalData::UInt32(self.unpack::<u32>()?.clone())))
            }
            (DataType::Binary, DataType::Utf8) => {
                let ca = self.unpack::<Vec<u8>>()?;
                Ok(relabel(PhysicalData::Utf8(ca.apply_opt(|v| {
                    v.and_then(|b| String::from_utf8(b.clone()).ok())
                }))))
            }
            (DataType::Utf8, DataType::Binary) => {
                let ca = self.utf8()?;
                Ok(relabel(PhysicalData::Binary(
                    ca.apply_values(|s| s.as_bytes().to_vec()),
                )))
            }
            (_, DataType::Utf8) => {
                let ca: ChunkedArray<String> = self
                    .iter()
                    .map(|v| if v.is_null() { None } else { Some(v.to_string()) })
                    .collect();
                Ok(relabel(PhysicalData::Utf8(ca)))
            }
            (DataType::Utf8, DataType::Categorical) => {
                let (codes, map) = encode_utf8(self.utf8()?);
                Ok(Series::from_categorical_parts(name, codes, Arc::new(map)))
            }
            (DataType::Utf8, _) => Ok(relabel(parse_utf8(self.utf8()?, to)?)),
            (DataType::List(_), DataType::List(inner)) => {
                let ca = self.list()?;
                let cast = ca.try_apply_opt(|v| match v {
                    Some(s) => s.cast(inner).map(Some),
                    None => Ok(None),
                })?;
                Ok(relabel(PhysicalData::List(cast)))
            }
            (DataType::Struct(_), DataType::Struct(fields)) => {
                let ca = self.struct_()?;
                let cast = ca
                    .fields()
                    .iter()
                    .zip(fields.iter())
                    .map(|(s, f)| s.cast(&f.dtype).map(|s| s.with_name(&f.name)))
                    .collect::<Result<Vec<_>>>()?;
                Series::new_struct(name, cast)
            }
            (DataType::Decimal(_, scale), _) => {
                Ok(relabel(decimal_to(self.unpack::<i128>()?, *scale, to)?))
            }
            (_, DataType::Decimal(precision, scale)) => {
                let data = match &self.data {
                    PhysicalData::Boolean(ca) => {
                        let ints: ChunkedArray<u8> = ca.apply_values(|b| *b as u8);
                        numeric_to_decimal(&ints, *precision, *scale)
                    }
                    other => with_numeric!(other, ca => numeric_to_decimal(ca, *precision, *scale),
                        else return Err(Error::TypeMismatch(format!("cannot cast {} to {}", from, to)))),
                };
                Ok(relabel(PhysicalData::Decimal(data)))
            }
            (DataType::Date, DataType::Datetime(tu, _)) => {
                let per_day = tu.ticks_per_day();
                let ticks: ChunkedArray<i64> = self
                    .unpack::<i32>()?
                    .apply_opt(|v| v.and_then(|d| (*d as i64).checked_mul(per_day)));
                Ok(relabel(PhysicalData::Int64(ticks)))
            }
            (DataType::Datetime(tu, _), DataType::Date) => {
                let per_day = tu.ticks_per_day();
                let days: ChunkedArray<i32> = self
                    .i64()?
                    .apply_opt(|v| v.and_then(|t| i32::try_from(t.div_euclid(per_day)).ok()));
                Ok(relabel(PhysicalData::Int32(days)))
            }
            (DataType::Datetime(a, _), DataType::Datetime(b, _))
            | (DataType::Duration(a), DataType::Duration(b)) => {
                Ok(relabel(PhysicalData::Int64(convert_ticks(self.i64()?, *a, *b))))
            }
            (DataType::Datetime(tu, _), DataType::Time) => {
                let per_day = tu.ticks_per_day();
                let to_nanos = 1_000_000_000 / tu.ticks_per_second();
                let nanos: ChunkedArray<i64> = self
                    .i64()?
                    .apply_values(|t| t.rem_euclid(per_day) * to_nanos);
                Ok(relabel(PhysicalData::Int64(nanos)))
            }
            _ => {
                let target = to.to_physical();
                let data = match &self.data {
                    PhysicalData::Boolean(ca) => {
                        let ints: ChunkedArray<u8> = ca.apply_values(|b| *b as u8);
                        numeric_to(&ints, &target)?
                    }
                    other => with_numeric!(other, ca => numeric_to(ca, &target)?,
                        else return Err(Error::TypeMismatch(format!(
                            "cannot cast Series '{}' from {} to {}", self.name, from, to
                        )))),
                };
                Ok(relabel(data))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("12.345", 2), Some(1234));
        assert_eq!(parse_decimal("-0.5", 3), Some(-500));
        assert_eq!(parse_decimal("7", 1), Some(70));
        assert_eq!(parse_decimal("abc", 1), None);
        assert_eq!(parse_decimal(".", 1), None);
    }

    #[test]
    fn test_rescale() {
        assert_eq!(rescale(123, 1, 3), Some(12300));
        assert_eq!(rescale(12399, 3, 1), Some(123));
    }

    #[test]
    fn test_parse_datetime_formats() {
        assert!(parse_datetime("2021-01-01 10:00:00").is_some());
        assert!(parse_datetime("2021-01-01T10:00:00.5").is_some());
        assert!(parse_datetime("2021-01-01").is_some());
        assert!(parse_datetime("01/01/2021").is_none());
    }
}
