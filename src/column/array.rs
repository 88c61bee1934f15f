use crate::column::buffer::Buffer;
use crate::column::native::ArrayValue;
use crate::core::bitmap::{Bitmap, MutableBitmap};

/// One contiguous chunk: a value buffer plus an optional validity bitmap.
///
/// Without a bitmap every slot is valid. Null slots hold `T::default()`.
#[derive(Debug, Clone)]
pub struct Array<T: ArrayValue> {
    values: Buffer<T>,
    validity: Option<Bitmap>,
}

impl<T: ArrayValue> Array<T> {
    /// Create a new chunk. An all-valid bitmap is dropped.
    pub fn new(values: Buffer<T>, validity: Option<Bitmap>) -> Self {
        debug_assert!(validity
            .as_ref()
            .map(|v| v.len() == values.len())
            .unwrap_or(true));
        let validity = validity.filter(|v| v.unset_bits() > 0);
        Self { values, validity }
    }

    pub fn from_vec(values: Vec<T>) -> Self {
        Self::new(Buffer::new(values), None)
    }

    pub fn from_options<I: IntoIterator<Item = Option<T>>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        let mut values = Vec::with_capacity(lower);
        let mut validity = MutableBitmap::with_capacity(lower);
        for opt in iter {
            match opt {
                Some(v) => {
                    values.push(v);
                    validity.push(true);
                }
                None => {
                    values.push(T::default());
                    validity.push(false);
                }
            }
        }
        Self::new(Buffer::new(values), validity.into_validity())
    }

    pub fn new_null(length: usize) -> Self {
        Self::new(
            Buffer::new(vec![T::default(); length]),
            Some(Bitmap::new_unset(length)),
        )
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.validity.as_ref().map(|v| v.unset_bits()).unwrap_or(0)
    }

    pub fn validity(&self) -> Option<&Bitmap> {
        self.validity.as_ref()
    }

    pub fn values(&self) -> &[T] {
        self.values.as_slice()
    }

    pub fn buffer(&self) -> &Buffer<T> {
        &self.values
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut Buffer<T> {
        &mut self.values
    }

    pub(crate) fn set_validity(&mut self, validity: Option<Bitmap>) {
        self.validity = validity.filter(|v| v.unset_bits() > 0);
    }

    #[inline]
    pub fn is_valid(&self, i: usize) -> bool {
        self.validity.as_ref().map(|v| v.get(i)).unwrap_or(true)
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<&T> {
        if self.is_valid(i) {
            self.values.as_slice().get(i)
        } else {
            None
        }
    }

    /// Zero-copy slice
    pub fn slice(&self, offset: usize, length: usize) -> Self {
        Self::new(
            self.values.slice(offset, length),
            self.validity.as_ref().map(|v| v.slice(offset, length)),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&T>> + '_ {
        self.values
            .as_slice()
            .iter()
            .enumerate()
            .map(move |(i, v)| if self.is_valid(i) { Some(v) } else { None })
    }
}

impl<T: ArrayValue> Default for Array<T> {
    fn default() -> Self {
        Self::from_vec(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_options() {
        let arr = Array::from_options(vec![Some(1i32), None, Some(3)]);
        assert_eq!(arr.len(), 3);
        assert_eq!(arr.null_count(), 1);
        assert_eq!(arr.get(1), None);
        assert_eq!(arr.get(2), Some(&3));
    }

    #[test]
    fn test_all_valid_drops_bitmap() {
        let arr = Array::from_options(vec![Some(1i32), Some(2)]);
        assert!(arr.validity().is_none());
    }

    #[test]
    fn test_slice() {
        let arr = Array::from_options(vec![Some(1i64), None, Some(3), Some(4)]);
        let s = arr.slice(2, 2);
        assert_eq!(s.null_count(), 0);
        assert!(s.validity().is_none());
        assert_eq!(s.values(), &[3, 4]);
    }
}
