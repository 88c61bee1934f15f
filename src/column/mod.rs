//! Physical column storage
//!
//! [`PhysicalData`] is the closed set of physical representations a
//! [`Series`](crate::series::Series) can hold. Kernels dispatch over it once per
//! call with the macros in this module.

pub mod array;
pub mod buffer;
pub mod chunked;
pub mod native;
pub mod struct_chunked;

pub use array::Array;
pub use buffer::Buffer;
pub use chunked::ChunkedArray;
pub use native::{ArrayValue, NumericNative, PhysicalType};
pub use struct_chunked::StructChunked;

use crate::core::any_value::{AnyValue, ObjectValue};
use crate::core::dtype::IdxSize;
use crate::core::error::{Error, Result};
use crate::series::Series;

/// Physical storage of a column
#[derive(Debug, Clone)]
pub enum PhysicalData {
    Boolean(ChunkedArray<bool>),
    Int8(ChunkedArray<i8>),
    Int16(ChunkedArray<i16>),
    Int32(ChunkedArray<i32>),
    Int64(ChunkedArray<i64>),
    UInt8(ChunkedArray<u8>),
    UInt16(ChunkedArray<u16>),
    UInt32(ChunkedArray<u32>),
    UInt64(ChunkedArray<u64>),
    Float32(ChunkedArray<f32>),
    Float64(ChunkedArray<f64>),
    Utf8(ChunkedArray<String>),
    Binary(ChunkedArray<Vec<u8>>),
    Decimal(ChunkedArray<i128>),
    List(ChunkedArray<Series>),
    Struct(StructChunked),
    Object(ChunkedArray<ObjectValue>),
}

/// Evaluate `$body` with `$ca` bound to the concrete storage, whatever it is
macro_rules! with_physical {
    ($data:expr, $ca:ident => $body:expr) => {{
        use $crate::column::PhysicalData as __P;
        match $data {
            __P::Boolean($ca) => $body,
            __P::Int8($ca) => $body,
            __P::Int16($ca) => $body,
            __P::Int32($ca) => $body,
            __P::Int64($ca) => $body,
            __P::UInt8($ca) => $body,
            __P::UInt16($ca) => $body,
            __P::UInt32($ca) => $body,
            __P::UInt64($ca) => $body,
            __P::Float32($ca) => $body,
            __P::Float64($ca) => $body,
            __P::Utf8($ca) => $body,
            __P::Binary($ca) => $body,
            __P::Decimal($ca) => $body,
            __P::List($ca) => $body,
            __P::Struct($ca) => $body,
            __P::Object($ca) => $body,
        }
    }};
}
pub(crate) use with_physical;

/// Like [`with_physical`], re-wrapping the result in the same variant
macro_rules! map_physical {
    ($data:expr, $ca:ident => $body:expr) => {{
        use $crate::column::PhysicalData as __P;
        match $data {
            __P::Boolean($ca) => __P::Boolean($body),
            __P::Int8($ca) => __P::Int8($body),
            __P::Int16($ca) => __P::Int16($body),
            __P::Int32($ca) => __P::Int32($body),
            __P::Int64($ca) => __P::Int64($body),
            __P::UInt8($ca) => __P::UInt8($body),
            __P::UInt16($ca) => __P::UInt16($body),
            __P::UInt32($ca) => __P::UInt32($body),
            __P::UInt64($ca) => __P::UInt64($body),
            __P::Float32($ca) => __P::Float32($body),
            __P::Float64($ca) => __P::Float64($body),
            __P::Utf8($ca) => __P::Utf8($body),
            __P::Binary($ca) => __P::Binary($body),
            __P::Decimal($ca) => __P::Decimal($body),
            __P::List($ca) => __P::List($body),
            __P::Struct($ca) => __P::Struct($body),
            __P::Object($ca) => __P::Object($body),
        }
    }};
}
pub(crate) use map_physical;

/// Like [`map_physical`] for every variant backed by a `ChunkedArray`.
/// Struct storage yields a TypeMismatch.
macro_rules! map_chunked {
    ($data:expr, $ca:ident => $body:expr, $op:expr) => {{
        use $crate::column::PhysicalData as __P;
        match $data {
            __P::Boolean($ca) => __P::Boolean($body),
            __P::Int8($ca) => __P::Int8($body),
            __P::Int16($ca) => __P::Int16($body),
            __P::Int32($ca) => __P::Int32($body),
            __P::Int64($ca) => __P::Int64($body),
            __P::UInt8($ca) => __P::UInt8($body),
            __P::UInt16($ca) => __P::UInt16($body),
            __P::UInt32($ca) => __P::UInt32($body),
            __P::UInt64($ca) => __P::UInt64($body),
            __P::Float32($ca) => __P::Float32($body),
            __P::Float64($ca) => __P::Float64($body),
            __P::Utf8($ca) => __P::Utf8($body),
            __P::Binary($ca) => __P::Binary($body),
            __P::Decimal($ca) => __P::Decimal($body),
            __P::List($ca) => __P::List($body),
            __P::Object($ca) => __P::Object($body),
            __P::Struct(_) => {
                return Err($crate::core::error::Error::TypeMismatch(format!(
                    "`{}` is not supported for struct columns",
                    $op
                )))
            }
        }
    }};
}
pub(crate) use map_chunked;

/// Dispatch over the numeric (integer and float) variants only
macro_rules! with_numeric {
    ($data:expr, $ca:ident => $body:expr, else $other:expr) => {{
        use $crate::column::PhysicalData as __P;
        match $data {
            __P::Int8($ca) => $body,
            __P::Int16($ca) => $body,
            __P::Int32($ca) => $body,
            __P::Int64($ca) => $body,
            __P::UInt8($ca) => $body,
            __P::UInt16($ca) => $body,
            __P::UInt32($ca) => $body,
            __P::UInt64($ca) => $body,
            __P::Float32($ca) => $body,
            __P::Float64($ca) => $body,
            _ => $other,
        }
    }};
}
pub(crate) use with_numeric;

/// Dispatch over the numeric variants, re-wrapping the result
macro_rules! map_numeric {
    ($data:expr, $ca:ident => $body:expr, else $other:expr) => {{
        use $crate::column::PhysicalData as __P;
        match $data {
            __P::Int8($ca) => __P::Int8($body),
            __P::Int16($ca) => __P::Int16($body),
            __P::Int32($ca) => __P::Int32($body),
            __P::Int64($ca) => __P::Int64($body),
            __P::UInt8($ca) => __P::UInt8($body),
            __P::UInt16($ca) => __P::UInt16($body),
            __P::UInt32($ca) => __P::UInt32($body),
            __P::UInt64($ca) => __P::UInt64($body),
            __P::Float32($ca) => __P::Float32($body),
            __P::Float64($ca) => __P::Float64($body),
            _ => $other,
        }
    }};
}
pub(crate) use map_numeric;

/// Apply `$body` to two storages of the same variant
macro_rules! zip_same {
    ($lhs:expr, $rhs:expr, $a:ident, $b:ident => $body:expr, else $other:expr) => {{
        use $crate::column::PhysicalData as __P;
        match ($lhs, $rhs) {
            (__P::Boolean($a), __P::Boolean($b)) => $body,
            (__P::Int8($a), __P::Int8($b)) => $body,
            (__P::Int16($a), __P::Int16($b)) => $body,
            (__P::Int32($a), __P::Int32($b)) => $body,
            (__P::Int64($a), __P::Int64($b)) => $body,
            (__P::UInt8($a), __P::UInt8($b)) => $body,
            (__P::UInt16($a), __P::UInt16($b)) => $body,
            (__P::UInt32($a), __P::UInt32($b)) => $body,
            (__P::UInt64($a), __P::UInt64($b)) => $body,
            (__P::Float32($a), __P::Float32($b)) => $body,
            (__P::Float64($a), __P::Float64($b)) => $body,
            (__P::Utf8($a), __P::Utf8($b)) => $body,
            (__P::Binary($a), __P::Binary($b)) => $body,
            (__P::Decimal($a), __P::Decimal($b)) => $body,
            (__P::List($a), __P::List($b)) => $body,
            (__P::Object($a), __P::Object($b)) => $body,
            _ => $other,
        }
    }};
}
pub(crate) use zip_same;

impl PhysicalData {
    pub fn len(&self) -> usize {
        with_physical!(self, ca => ca.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn null_count(&self) -> usize {
        with_physical!(self, ca => ca.null_count())
    }

    pub fn has_validity(&self) -> bool {
        with_physical!(self, ca => ca.has_validity())
    }

    pub fn n_chunks(&self) -> usize {
        with_physical!(self, ca => ca.n_chunks())
    }

    pub fn chunk_lengths(&self) -> Vec<usize> {
        with_physical!(self, ca => ca.chunk_lengths())
    }

    pub fn estimated_size(&self) -> usize {
        match self {
            PhysicalData::Utf8(ca) => ca.iter().flatten().map(|s| s.len()).sum::<usize>() + ca.estimated_size(),
            PhysicalData::Binary(ca) => ca.iter().flatten().map(|s| s.len()).sum::<usize>() + ca.estimated_size(),
            PhysicalData::List(ca) => ca.iter().flatten().map(|s| s.estimated_size()).sum(),
            other => with_physical!(other, ca => ca.estimated_size()),
        }
    }

    pub fn slice(&self, offset: usize, length: usize) -> Self {
        map_physical!(self, ca => ca.slice(offset, length))
    }

    pub fn rechunk(&self) -> Self {
        map_physical!(self, ca => ca.rechunk())
    }

    pub fn take(&self, indices: &[IdxSize]) -> Result<Self> {
        Ok(map_physical!(self, ca => ca.take(indices)?))
    }

    pub fn take_opt(&self, indices: &[Option<IdxSize>]) -> Result<Self> {
        Ok(map_physical!(self, ca => ca.take_opt(indices)?))
    }

    pub fn filter(&self, mask: &ChunkedArray<bool>) -> Result<Self> {
        Ok(map_physical!(self, ca => ca.filter(mask)?))
    }

    /// Copy into storage that shares no buffers with `self`
    pub fn deep_copy(&self) -> Self {
        map_physical!(self, ca => ca.deep_copy())
    }

    pub fn reverse(&self) -> Self {
        map_physical!(self, ca => ca.reverse())
    }

    pub fn is_null(&self) -> ChunkedArray<bool> {
        with_physical!(self, ca => ca.is_null())
    }

    pub fn is_not_null(&self) -> ChunkedArray<bool> {
        with_physical!(self, ca => ca.is_not_null())
    }

    pub fn shrink_to_fit(&mut self) {
        with_physical!(self, ca => ca.shrink_to_fit())
    }

    /// Physical value at `index` (no logical interpretation)
    pub fn get_physical(&self, index: usize) -> Result<AnyValue> {
        with_physical!(self, ca => ca.get_any_value(index))
    }

    /// Whether any value buffer is aliased by another owner
    pub fn is_shared(&self) -> bool {
        with_physical!(self, ca => ca.is_shared())
    }

    /// Concatenate chunk lists. Both sides must have the same variant.
    pub fn append(&mut self, other: &PhysicalData) -> Result<()> {
        if let (PhysicalData::Struct(a), PhysicalData::Struct(b)) = (&mut *self, other) {
            return a.append(b);
        }
        zip_same!(self, other, a, b => {
            a.append(b);
            Ok(())
        }, else Err(Error::TypeMismatch("cannot append columns of different physical types".to_string())))
    }

    /// Extend into contiguous storage. Both sides must have the same variant.
    pub fn extend(&mut self, other: &PhysicalData) -> Result<()> {
        if let (PhysicalData::Struct(a), PhysicalData::Struct(b)) = (&mut *self, other) {
            return a.extend(b);
        }
        zip_same!(self, other, a, b => a.extend(b),
            else Err(Error::TypeMismatch("cannot extend columns of different physical types".to_string())))
    }

    /// Short physical type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            PhysicalData::Boolean(_) => "bool",
            PhysicalData::Int8(_) => "i8",
            PhysicalData::Int16(_) => "i16",
            PhysicalData::Int32(_) => "i32",
            PhysicalData::Int64(_) => "i64",
            PhysicalData::UInt8(_) => "u8",
            PhysicalData::UInt16(_) => "u16",
            PhysicalData::UInt32(_) => "u32",
            PhysicalData::UInt64(_) => "u64",
            PhysicalData::Float32(_) => "f32",
            PhysicalData::Float64(_) => "f64",
            PhysicalData::Utf8(_) => "str",
            PhysicalData::Binary(_) => "binary",
            PhysicalData::Decimal(_) => "i128",
            PhysicalData::List(_) => "list",
            PhysicalData::Struct(_) => "struct",
            PhysicalData::Object(_) => "object",
        }
    }
}
