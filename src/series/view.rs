//! Zero-copy access to the values of a single-chunk Series
//!
//! Views borrow the Series' storage. They require exactly one chunk and no
//! validity bitmap; call [`Series::rechunk`] and drop nulls first.

use crate::column::{with_numeric, ArrayValue, Buffer, ChunkedArray, PhysicalData};
use crate::core::dtype::DataType;
use crate::core::error::{Error, Result};
use crate::series::Series;

/// Pointer, length and dtype of a contiguous value buffer.
///
/// The pointer is only valid while the originating Series is alive and
/// unmodified.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBuffer {
    pub ptr: *const u8,
    pub len: usize,
    pub dtype: DataType,
}

fn first_ptr<T: ArrayValue>(ca: &ChunkedArray<T>) -> *const u8 {
    ca.chunks()
        .first()
        .map(|c| c.buffer().as_ptr() as *const u8)
        .unwrap_or(std::ptr::null())
}

impl Series {
    fn check_contiguous(&self) -> Result<()> {
        if self.n_chunks() != 1 {
            return Err(Error::NotContiguous(format!(
                "Series '{}' has {} chunks; rechunk first",
                self.name(),
                self.n_chunks()
            )));
        }
        if self.has_validity() {
            return Err(Error::NotContiguous(format!(
                "Series '{}' has a validity bitmap; drop nulls first",
                self.name()
            )));
        }
        Ok(())
    }

    /// Pointer to the start of the value buffer
    pub fn as_single_ptr(&self) -> Result<RawBuffer> {
        self.check_contiguous()?;
        let ptr = match self.physical() {
            PhysicalData::Boolean(ca) => first_ptr(ca),
            PhysicalData::Utf8(ca) => first_ptr(ca),
            PhysicalData::Binary(ca) => first_ptr(ca),
            PhysicalData::Decimal(ca) => first_ptr(ca),
            PhysicalData::List(ca) => first_ptr(ca),
            PhysicalData::Object(ca) => first_ptr(ca),
            PhysicalData::Struct(_) => {
                return Err(Error::TypeMismatch(
                    "struct columns have no single value buffer".to_string(),
                ))
            }
            data => with_numeric!(data, ca => first_ptr(ca), else std::ptr::null()),
        };
        Ok(RawBuffer {
            ptr,
            len: self.len(),
            dtype: self.dtype().clone(),
        })
    }

    /// Borrow the values as a slice of their physical type
    pub fn view<T: ArrayValue>(&self) -> Result<&[T]> {
        self.check_contiguous()?;
        self.unpack::<T>()?.cont_slice()
    }

    /// Alias the value buffer. While the alias lives, [`Series::extend`]
    /// writes into a private copy instead of growing in place.
    pub fn view_shared<T: ArrayValue>(&self) -> Result<Buffer<T>> {
        self.check_contiguous()?;
        self.unpack::<T>()?
            .chunks()
            .first()
            .map(|c| c.buffer().clone())
            .ok_or_else(|| Error::NotContiguous(format!("Series '{}' has no chunks", self.name())))
    }

    /// Run `f` with mutable access to the values. Aliased storage is copied
    /// first, so existing views keep their old contents.
    pub fn with_values_mut<T, R, F>(&mut self, f: F) -> Result<R>
    where
        T: ArrayValue,
        F: FnOnce(&mut [T]) -> R,
    {
        self.check_contiguous()?;
        let dtype = self.dtype().clone();
        let ca = T::from_physical_mut(self.physical_mut()).ok_or_else(|| {
            Error::TypeMismatch(format!(
                "cannot view Series of dtype {} as {}",
                dtype,
                std::any::type_name::<T>()
            ))
        })?;
        match ca.chunks_mut().first_mut() {
            Some(chunk) => Ok(f(chunk.buffer_mut().make_mut())),
            None => Ok(f(&mut [])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_requires_single_chunk() {
        let mut s = Series::new("a", vec![1i64, 2]);
        s.append(&Series::new("a", vec![3i64])).unwrap();
        assert!(matches!(s.view::<i64>(), Err(Error::NotContiguous(_))));
        s.rechunk();
        assert_eq!(s.view::<i64>().unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn test_nulls_block_raw_pointer() {
        let s = Series::new("a", vec![Some(1i32), None]);
        assert!(s.as_single_ptr().is_err());
    }

    #[test]
    fn test_mutation_does_not_leak_into_alias() {
        let mut s = Series::new("a", vec![1i32, 2, 3]);
        let alias = s.view_shared::<i32>().unwrap();
        s.with_values_mut::<i32, _, _>(|v| v[0] = 10).unwrap();
        assert_eq!(alias.as_slice(), &[1, 2, 3]);
        assert_eq!(s.view::<i32>().unwrap(), &[10, 2, 3]);
    }
}
