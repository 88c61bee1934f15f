//! Chunked column storage
//!
//! A [`ChunkedArray`] is an ordered list of [`Array`] chunks that logically
//! concatenate into one sequence. Appending concatenates chunk lists without
//! touching values; extending writes into a single contiguous buffer.

use crate::column::array::Array;
use crate::column::buffer::Buffer;
use crate::column::native::ArrayValue;
use crate::core::any_value::AnyValue;
use crate::core::bitmap::MutableBitmap;
use crate::core::dtype::IdxSize;
use crate::core::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct ChunkedArray<T: ArrayValue> {
    chunks: Vec<Array<T>>,
    length: usize,
    null_count: usize,
}

impl<T: ArrayValue> ChunkedArray<T> {
    /// Create from chunks. Empty chunks are dropped unless all are empty.
    pub fn from_chunks(chunks: Vec<Array<T>>) -> Self {
        let mut chunks: Vec<Array<T>> = chunks.into_iter().filter(|c| !c.is_empty()).collect();
        if chunks.is_empty() {
            chunks.push(Array::default());
        }
        let mut out = Self {
            chunks,
            length: 0,
            null_count: 0,
        };
        out.compute_len();
        out
    }

    pub fn from_vec(values: Vec<T>) -> Self {
        Self::from_chunks(vec![Array::from_vec(values)])
    }

    pub fn from_slice(values: &[T]) -> Self {
        Self::from_vec(values.to_vec())
    }

    pub fn from_options<I: IntoIterator<Item = Option<T>>>(iter: I) -> Self {
        Self::from_chunks(vec![Array::from_options(iter)])
    }

    pub fn full(value: T, length: usize) -> Self {
        Self::from_vec(vec![value; length])
    }

    pub fn full_null(length: usize) -> Self {
        Self::from_chunks(vec![Array::new_null(length)])
    }

    fn compute_len(&mut self) {
        self.length = self.chunks.iter().map(|c| c.len()).sum();
        self.null_count = self.chunks.iter().map(|c| c.null_count()).sum();
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn null_count(&self) -> usize {
        self.null_count
    }

    pub fn has_validity(&self) -> bool {
        self.chunks.iter().any(|c| c.validity().is_some())
    }

    pub fn n_chunks(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunk_lengths(&self) -> Vec<usize> {
        self.chunks.iter().map(|c| c.len()).collect()
    }

    pub fn chunks(&self) -> &[Array<T>] {
        &self.chunks
    }

    pub(crate) fn chunks_mut(&mut self) -> &mut [Array<T>] {
        &mut self.chunks
    }

    /// Translate a logical index into (chunk index, index within chunk)
    fn index_to_chunked_index(&self, mut index: usize) -> (usize, usize) {
        for (chunk_idx, chunk) in self.chunks.iter().enumerate() {
            if index < chunk.len() {
                return (chunk_idx, index);
            }
            index -= chunk.len();
        }
        (self.chunks.len(), index)
    }

    /// Value at `index`, `None` when null or out of bounds
    pub fn get_ref(&self, index: usize) -> Option<&T> {
        if index >= self.length {
            return None;
        }
        let (chunk_idx, idx) = self.index_to_chunked_index(index);
        self.chunks.get(chunk_idx).and_then(|c| c.get(idx))
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.get_ref(index).cloned()
    }

    /// Physical value at `index` as an AnyValue
    pub fn get_any_value(&self, index: usize) -> Result<AnyValue> {
        Ok(self
            .get_ref(index)
            .map(|v| v.to_any_value())
            .unwrap_or(AnyValue::Null))
    }

    /// Whether any chunk buffer is aliased by another owner
    pub fn is_shared(&self) -> bool {
        self.chunks.iter().any(|c| c.buffer().is_shared())
    }

    pub fn is_valid(&self, index: usize) -> bool {
        let (chunk_idx, idx) = self.index_to_chunked_index(index);
        self.chunks
            .get(chunk_idx)
            .map(|c| c.is_valid(idx))
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&T>> + '_ {
        self.chunks.iter().flat_map(|c| c.iter())
    }

    pub fn to_options(&self) -> Vec<Option<T>> {
        self.iter().map(|v| v.cloned()).collect()
    }

    /// Non-null values in order
    pub fn non_null_values(&self) -> Vec<T> {
        self.iter().flatten().cloned().collect()
    }

    /// Zero-copy slice. The range is clamped to the array bounds.
    pub fn slice(&self, offset: usize, length: usize) -> Self {
        let offset = offset.min(self.length);
        let mut remaining = length.min(self.length - offset);
        let mut skip = offset;
        let mut out = Vec::new();
        for chunk in &self.chunks {
            if remaining == 0 {
                break;
            }
            if skip >= chunk.len() {
                skip -= chunk.len();
                continue;
            }
            let take = remaining.min(chunk.len() - skip);
            out.push(chunk.slice(skip, take));
            remaining -= take;
            skip = 0;
        }
        Self::from_chunks(out)
    }

    /// Coalesce all chunks into one contiguous chunk
    pub fn rechunk(&self) -> Self {
        if self.chunks.len() == 1 {
            return self.clone();
        }
        let mut values = Vec::with_capacity(self.length);
        let mut validity = MutableBitmap::with_capacity(self.length);
        for chunk in &self.chunks {
            values.extend_from_slice(chunk.values());
            match chunk.validity() {
                Some(v) => validity.extend_from_bitmap(v),
                None => validity.extend_constant(chunk.len(), true),
            }
        }
        Self::from_chunks(vec![Array::new(
            Buffer::new(values),
            validity.into_validity(),
        )])
    }

    /// Concatenate the chunk lists. Never copies values.
    pub fn append(&mut self, other: &Self) {
        if self.is_empty() {
            self.chunks.clear();
        }
        self.chunks
            .extend(other.chunks.iter().filter(|c| !c.is_empty()).cloned());
        if self.chunks.is_empty() {
            self.chunks.push(Array::default());
        }
        self.compute_len();
    }

    /// Write `other`'s values into this array's single contiguous buffer.
    ///
    /// Multi-chunk arrays are rechunked first. Fails with
    /// [`Error::BorrowConflict`] when the remaining buffer is aliased.
    pub fn extend(&mut self, other: &Self) -> Result<()> {
        if self.chunks.len() > 1 {
            *self = self.rechunk();
        }
        let own_len = self.length;
        let needs_validity = self.null_count > 0 || other.null_count > 0;
        let chunk = &mut self.chunks[0];
        let old_validity = chunk.validity().cloned();

        let mut incoming = Vec::with_capacity(other.len());
        for c in other.chunks() {
            incoming.extend_from_slice(c.values());
        }
        chunk.buffer_mut().try_extend(&incoming)?;

        if needs_validity {
            let mut validity = MutableBitmap::with_capacity(own_len + other.len());
            match old_validity {
                Some(v) => validity.extend_from_bitmap(&v),
                None => validity.extend_constant(own_len, true),
            }
            for c in other.chunks() {
                match c.validity() {
                    Some(v) => validity.extend_from_bitmap(v),
                    None => validity.extend_constant(c.len(), true),
                }
            }
            chunk.set_validity(validity.into_validity());
        }
        self.compute_len();
        Ok(())
    }

    /// Copy every chunk into freshly allocated buffers
    pub fn deep_copy(&self) -> Self {
        Self::from_chunks(
            self.chunks
                .iter()
                .map(|c| Array::new(Buffer::new(c.values().to_vec()), c.validity().cloned()))
                .collect(),
        )
    }

    /// Release excess capacity in every chunk
    pub fn shrink_to_fit(&mut self) {
        for chunk in self.chunks.iter_mut() {
            chunk.buffer_mut().shrink_to_fit();
        }
    }

    /// Append `n` copies of `value` (or nulls) as a new chunk
    pub fn extend_constant(&mut self, value: Option<T>, n: usize) {
        let tail = match value {
            Some(v) => Self::full(v, n),
            None => Self::full_null(n),
        };
        self.append(&tail);
    }

    /// Gather values at the given positions
    pub fn take(&self, indices: &[IdxSize]) -> Result<Self> {
        let mut out = Vec::with_capacity(indices.len());
        for &idx in indices {
            let idx = idx as usize;
            if idx >= self.length {
                return Err(Error::IndexOutOfBounds {
                    index: idx as i64,
                    size: self.length,
                });
            }
            out.push(self.get(idx));
        }
        Ok(Self::from_options(out))
    }

    /// Gather where a missing index produces a null
    pub fn take_opt(&self, indices: &[Option<IdxSize>]) -> Result<Self> {
        let mut out = Vec::with_capacity(indices.len());
        for idx in indices {
            match idx {
                Some(idx) => {
                    let idx = *idx as usize;
                    if idx >= self.length {
                        return Err(Error::IndexOutOfBounds {
                            index: idx as i64,
                            size: self.length,
                        });
                    }
                    out.push(self.get(idx));
                }
                None => out.push(None),
            }
        }
        Ok(Self::from_options(out))
    }

    /// Keep positions where `mask` is true. A null mask entry drops the row.
    pub fn filter(&self, mask: &ChunkedArray<bool>) -> Result<Self> {
        if mask.len() != self.length {
            return Err(Error::ShapeMismatch(format!(
                "filter mask has length {} but array has length {}",
                mask.len(),
                self.length
            )));
        }
        let out: Vec<Option<T>> = self
            .iter()
            .zip(mask.iter())
            .filter_map(|(v, m)| match m {
                Some(true) => Some(v.cloned()),
                _ => None,
            })
            .collect();
        Ok(Self::from_options(out))
    }

    pub fn is_null(&self) -> ChunkedArray<bool> {
        ChunkedArray::from_vec(self.iter().map(|v| v.is_none()).collect())
    }

    pub fn is_not_null(&self) -> ChunkedArray<bool> {
        ChunkedArray::from_vec(self.iter().map(|v| v.is_some()).collect())
    }

    pub fn reverse(&self) -> Self {
        let mut values = self.to_options();
        values.reverse();
        Self::from_options(values)
    }

    /// Borrow the values as one slice. Requires a single chunk without nulls.
    pub fn cont_slice(&self) -> Result<&[T]> {
        if self.chunks.len() == 1 && self.chunks[0].validity().is_none() {
            Ok(self.chunks[0].values())
        } else {
            Err(Error::NotContiguous(format!(
                "array has {} chunks and {} nulls",
                self.chunks.len(),
                self.null_count
            )))
        }
    }

    /// Map every valid value, keeping the validity bitmaps
    pub fn apply_values<U, F>(&self, f: F) -> ChunkedArray<U>
    where
        U: ArrayValue,
        F: Fn(&T) -> U,
    {
        let chunks = self
            .chunks
            .iter()
            .map(|c| {
                let values: Vec<U> = c
                    .values()
                    .iter()
                    .enumerate()
                    .map(|(i, v)| if c.is_valid(i) { f(v) } else { U::default() })
                    .collect();
                Array::new(Buffer::new(values), c.validity().cloned())
            })
            .collect();
        ChunkedArray::from_chunks(chunks)
    }

    /// Map every slot, including nulls
    pub fn apply_opt<U, F>(&self, mut f: F) -> ChunkedArray<U>
    where
        U: ArrayValue,
        F: FnMut(Option<&T>) -> Option<U>,
    {
        ChunkedArray::from_options(self.iter().map(|v| f(v)).collect::<Vec<_>>())
    }

    pub fn try_apply_opt<U, F>(&self, mut f: F) -> Result<ChunkedArray<U>>
    where
        U: ArrayValue,
        F: FnMut(Option<&T>) -> Result<Option<U>>,
    {
        let mut out = Vec::with_capacity(self.length);
        for v in self.iter() {
            out.push(f(v)?);
        }
        Ok(ChunkedArray::from_options(out))
    }

    /// Write `values` at `indices`. A single value is broadcast.
    pub fn scatter(&self, indices: &[IdxSize], values: &[Option<T>]) -> Result<Self> {
        if values.len() != 1 && values.len() != indices.len() {
            return Err(Error::ShapeMismatch(format!(
                "cannot assign {} values to {} positions",
                values.len(),
                indices.len()
            )));
        }
        let mut out = self.to_options();
        for (i, &idx) in indices.iter().enumerate() {
            let idx = idx as usize;
            if idx >= out.len() {
                return Err(Error::IndexOutOfBounds {
                    index: idx as i64,
                    size: out.len(),
                });
            }
            let value = if values.len() == 1 { &values[0] } else { &values[i] };
            out[idx] = value.clone();
        }
        Ok(Self::from_options(out))
    }

    /// Take from `self` where `mask` is true and from `other` elsewhere
    pub fn zip_with(&self, mask: &ChunkedArray<bool>, other: &Self) -> Result<Self> {
        if mask.len() != self.length || other.len() != self.length {
            return Err(Error::ShapeMismatch(format!(
                "zip_with lengths differ: self {}, mask {}, other {}",
                self.length,
                mask.len(),
                other.len()
            )));
        }
        let out: Vec<Option<T>> = self
            .iter()
            .zip(other.iter())
            .zip(mask.iter())
            .map(|((a, b), m)| match m {
                Some(true) => a.cloned(),
                _ => b.cloned(),
            })
            .collect();
        Ok(Self::from_options(out))
    }

    /// Replace nulls with `value`
    pub fn fill_null_with(&self, value: T) -> Self {
        Self::from_options(
            self.iter()
                .map(|v| Some(v.cloned().unwrap_or_else(|| value.clone())))
                .collect::<Vec<_>>(),
        )
    }

    /// Shift values by `periods`, filling vacated slots with `fill`
    pub fn shift_and_fill(&self, periods: i64, fill: Option<T>) -> Self {
        let len = self.length;
        let n = (periods.unsigned_abs() as usize).min(len);
        let values = self.to_options();
        let mut out = Vec::with_capacity(len);
        if periods >= 0 {
            out.extend(std::iter::repeat(fill.clone()).take(n));
            out.extend(values.into_iter().take(len - n));
        } else {
            out.extend(values.into_iter().skip(n));
            out.extend(std::iter::repeat(fill).take(n));
        }
        Self::from_options(out)
    }

    /// Approximate heap size in bytes
    pub fn estimated_size(&self) -> usize {
        self.chunks
            .iter()
            .map(|c| {
                c.len() * std::mem::size_of::<T>()
                    + c.validity().map(|v| v.estimated_bytes()).unwrap_or(0)
            })
            .sum()
    }
}

impl<T: ArrayValue> Default for ChunkedArray<T> {
    fn default() -> Self {
        Self::from_vec(Vec::new())
    }
}

impl<T: ArrayValue> FromIterator<Option<T>> for ChunkedArray<T> {
    fn from_iter<I: IntoIterator<Item = Option<T>>>(iter: I) -> Self {
        Self::from_options(iter)
    }
}

impl<T: ArrayValue + PartialEq> PartialEq for ChunkedArray<T> {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length && self.iter().eq(other.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_chunks() -> ChunkedArray<i32> {
        let mut ca = ChunkedArray::from_vec(vec![1, 2, 3]);
        ca.append(&ChunkedArray::from_options(vec![Some(4), None]));
        ca
    }

    #[test]
    fn test_append_keeps_chunks() {
        let ca = two_chunks();
        assert_eq!(ca.n_chunks(), 2);
        assert_eq!(ca.chunk_lengths(), vec![3, 2]);
        assert_eq!(ca.len(), 5);
        assert_eq!(ca.null_count(), 1);
    }

    #[test]
    fn test_rechunk() {
        let ca = two_chunks().rechunk();
        assert_eq!(ca.n_chunks(), 1);
        assert_eq!(ca.to_options(), vec![Some(1), Some(2), Some(3), Some(4), None]);
    }

    #[test]
    fn test_slice_across_chunks() {
        let ca = two_chunks();
        let s = ca.slice(2, 2);
        assert_eq!(s.to_options(), vec![Some(3), Some(4)]);
        assert_eq!(s.n_chunks(), 2);
        let s = ca.slice(4, 10);
        assert_eq!(s.to_options(), vec![None]);
    }

    #[test]
    fn test_extend_contiguous() {
        let mut ca = ChunkedArray::from_vec(vec![1, 2]);
        ca.extend(&ChunkedArray::from_options(vec![None, Some(5)]))
            .unwrap();
        assert_eq!(ca.n_chunks(), 1);
        assert_eq!(ca.to_options(), vec![Some(1), Some(2), None, Some(5)]);
    }

    #[test]
    fn test_extend_aliased_fails() {
        let mut ca = ChunkedArray::from_vec(vec![1, 2]);
        let alias = ca.clone();
        let err = ca.extend(&ChunkedArray::from_vec(vec![3])).unwrap_err();
        assert!(err.is_borrow_conflict());
        assert_eq!(alias.len(), 2);
    }

    #[test]
    fn test_take_and_filter() {
        let ca = two_chunks();
        let taken = ca.take(&[4, 0, 3]).unwrap();
        assert_eq!(taken.to_options(), vec![None, Some(1), Some(4)]);
        assert!(ca.take(&[5]).is_err());

        let mask = ChunkedArray::from_vec(vec![true, false, true, false, true]);
        let filtered = ca.filter(&mask).unwrap();
        assert_eq!(filtered.to_options(), vec![Some(1), Some(3), None]);
    }

    #[test]
    fn test_cont_slice_requires_single_chunk() {
        assert!(two_chunks().cont_slice().is_err());
        let ca = ChunkedArray::from_vec(vec![1, 2]);
        assert_eq!(ca.cont_slice().unwrap(), &[1, 2]);
    }

    #[test]
    fn test_scatter_broadcast() {
        let ca = ChunkedArray::from_vec(vec![1, 2, 3, 4]);
        let out = ca.scatter(&[0, 2], &[Some(99)]).unwrap();
        assert_eq!(out.to_options(), vec![Some(99), Some(2), Some(99), Some(4)]);
        assert!(ca.scatter(&[0, 1, 2], &[Some(1), Some(2)]).is_err());
    }

    #[test]
    fn test_shift_and_fill() {
        let ca = ChunkedArray::from_vec(vec![1, 2, 3]);
        assert_eq!(
            ca.shift_and_fill(1, None).to_options(),
            vec![None, Some(1), Some(2)]
        );
        assert_eq!(
            ca.shift_and_fill(-2, Some(0)).to_options(),
            vec![Some(3), Some(0), Some(0)]
        );
    }
}
