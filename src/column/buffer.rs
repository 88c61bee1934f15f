use std::sync::Arc;

use crate::core::error::{Error, Result};

/// Reference-counted value buffer.
///
/// Slices and clones share the allocation read-only. In-place growth is only
/// possible while the allocation is uniquely owned; see [`Buffer::try_extend`].
#[derive(Debug, Clone)]
pub struct Buffer<T> {
    data: Arc<Vec<T>>,
    offset: usize,
    len: usize,
}

impl<T: Clone> Buffer<T> {
    pub fn new(values: Vec<T>) -> Self {
        let len = values.len();
        Self {
            data: Arc::new(values),
            offset: 0,
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data[self.offset..self.offset + self.len]
    }

    pub fn as_ptr(&self) -> *const T {
        self.as_slice().as_ptr()
    }

    /// Zero-copy sub-buffer
    pub fn slice(&self, offset: usize, length: usize) -> Self {
        debug_assert!(offset + length <= self.len);
        Self {
            data: self.data.clone(),
            offset: self.offset + offset,
            len: length,
        }
    }

    /// Whether another buffer or view aliases this allocation
    pub fn is_shared(&self) -> bool {
        Arc::strong_count(&self.data) > 1
    }

    /// Allocated capacity of the backing vector
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Mutable access without copying, if the allocation is not aliased
    pub fn get_mut(&mut self) -> Option<&mut [T]> {
        let (offset, len) = (self.offset, self.len);
        Arc::get_mut(&mut self.data).map(|v| &mut v[offset..offset + len])
    }

    /// Mutable access, copying the visible window first if it is aliased
    pub fn make_mut(&mut self) -> &mut [T] {
        if self.is_shared() {
            *self = Buffer::new(self.as_slice().to_vec());
        }
        let (offset, len) = (self.offset, self.len);
        let vec = Arc::make_mut(&mut self.data);
        &mut vec[offset..offset + len]
    }

    /// Grow the buffer in place.
    ///
    /// Fails with [`Error::BorrowConflict`] when the allocation is shared, since
    /// writing past the visible window would be observed by the other owner.
    pub fn try_extend(&mut self, values: &[T]) -> Result<()> {
        let end = self.offset + self.len;
        match Arc::get_mut(&mut self.data) {
            Some(vec) => {
                vec.truncate(end);
                vec.extend_from_slice(values);
                self.len += values.len();
                Ok(())
            }
            None => Err(Error::BorrowConflict(format!(
                "buffer of length {} is aliased by {} other owners",
                self.len,
                Arc::strong_count(&self.data) - 1
            ))),
        }
    }

    /// Release excess capacity. Aliased buffers are left untouched.
    pub fn shrink_to_fit(&mut self) {
        let (offset, len) = (self.offset, self.len);
        if let Some(vec) = Arc::get_mut(&mut self.data) {
            if offset > 0 {
                vec.drain(..offset);
                self.offset = 0;
            }
            vec.truncate(len);
            vec.shrink_to_fit();
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        if self.offset == 0 && self.len == self.data.len() {
            match Arc::try_unwrap(self.data) {
                Ok(vec) => vec,
                Err(shared) => shared.as_ref().clone(),
            }
        } else {
            self.as_slice().to_vec()
        }
    }
}

impl<T: Clone> From<Vec<T>> for Buffer<T> {
    fn from(values: Vec<T>) -> Self {
        Buffer::new(values)
    }
}

impl<T: Clone> Default for Buffer<T> {
    fn default() -> Self {
        Buffer::new(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_shares() {
        let buf = Buffer::new(vec![1, 2, 3, 4, 5]);
        let sliced = buf.slice(1, 3);
        assert_eq!(sliced.as_slice(), &[2, 3, 4]);
        assert!(buf.is_shared());
        assert!(sliced.is_shared());
    }

    #[test]
    fn test_try_extend_unique() {
        let mut buf = Buffer::new(vec![1, 2]);
        buf.try_extend(&[3, 4]).unwrap();
        assert_eq!(buf.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_try_extend_aliased_conflicts() {
        let mut buf = Buffer::new(vec![1, 2]);
        let _view = buf.clone();
        let err = buf.try_extend(&[3]).unwrap_err();
        assert!(err.is_borrow_conflict());
        assert_eq!(buf.as_slice(), &[1, 2]);
    }

    #[test]
    fn test_make_mut_detaches() {
        let mut buf = Buffer::new(vec![1, 2, 3]);
        let view = buf.slice(0, 3);
        buf.make_mut()[0] = 10;
        assert_eq!(buf.as_slice(), &[10, 2, 3]);
        assert_eq!(view.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn test_shrink_to_fit_drops_prefix() {
        let buf = Buffer::new(vec![1, 2, 3, 4]);
        let mut sliced = buf.slice(2, 2);
        drop(buf);
        sliced.shrink_to_fit();
        assert_eq!(sliced.as_slice(), &[3, 4]);
        assert!(sliced.capacity() < 4);
    }
}
