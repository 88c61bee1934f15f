use std::sync::Arc;

/// Immutable validity bitmap. A set bit marks a valid (non-null) slot.
///
/// Slicing shares the underlying bytes.
#[derive(Debug, Clone)]
pub struct Bitmap {
    bytes: Arc<Vec<u8>>,
    offset: usize,
    len: usize,
    unset_bits: usize,
}

#[inline]
fn get_bit(bytes: &[u8], i: usize) -> bool {
    bytes[i / 8] & (1 << (i % 8)) != 0
}

#[inline]
fn set_bit(bytes: &mut [u8], i: usize, value: bool) {
    if value {
        bytes[i / 8] |= 1 << (i % 8);
    } else {
        bytes[i / 8] &= !(1 << (i % 8));
    }
}

impl Bitmap {
    /// Creates a bitmap with every bit set
    pub fn new_set(length: usize) -> Self {
        let bytes_needed = (length + 7) / 8;
        Self {
            bytes: Arc::new(vec![0xFFu8; bytes_needed]),
            offset: 0,
            len: length,
            unset_bits: 0,
        }
    }

    /// Creates a bitmap with every bit unset
    pub fn new_unset(length: usize) -> Self {
        let bytes_needed = (length + 7) / 8;
        Self {
            bytes: Arc::new(vec![0u8; bytes_needed]),
            offset: 0,
            len: length,
            unset_bits: length,
        }
    }

    /// Creates a bitmap from a slice of booleans
    pub fn from_bools(bools: &[bool]) -> Self {
        bools.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the bit at `index`. The caller guarantees `index < len`.
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        debug_assert!(index < self.len);
        get_bit(&self.bytes, self.offset + index)
    }

    /// Number of unset bits, i.e. nulls when used as validity
    pub fn unset_bits(&self) -> usize {
        self.unset_bits
    }

    pub fn set_bits(&self) -> usize {
        self.len - self.unset_bits
    }

    /// Zero-copy slice of `length` bits starting at `offset`
    pub fn slice(&self, offset: usize, length: usize) -> Self {
        debug_assert!(offset + length <= self.len);
        let mut out = Self {
            bytes: self.bytes.clone(),
            offset: self.offset + offset,
            len: length,
            unset_bits: 0,
        };
        out.unset_bits = if self.unset_bits == 0 {
            0
        } else if self.unset_bits == self.len {
            length
        } else {
            out.iter().filter(|b| !b).count()
        };
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }

    /// Bitwise AND of two bitmaps of equal length
    pub fn and(&self, other: &Bitmap) -> Bitmap {
        self.iter().zip(other.iter()).map(|(a, b)| a && b).collect()
    }

    pub fn not(&self) -> Bitmap {
        self.iter().map(|b| !b).collect()
    }

    /// Approximate heap size in bytes
    pub fn estimated_bytes(&self) -> usize {
        (self.len + 7) / 8
    }
}

impl FromIterator<bool> for Bitmap {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let mut builder = MutableBitmap::new();
        for b in iter {
            builder.push(b);
        }
        builder.freeze()
    }
}

impl PartialEq for Bitmap {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

/// Growable bitmap used while building arrays
#[derive(Debug, Clone, Default)]
pub struct MutableBitmap {
    bytes: Vec<u8>,
    len: usize,
    unset_bits: usize,
}

impl MutableBitmap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity((capacity + 7) / 8),
            len: 0,
            unset_bits: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn unset_bits(&self) -> usize {
        self.unset_bits
    }

    #[inline]
    pub fn push(&mut self, value: bool) {
        if self.len % 8 == 0 {
            self.bytes.push(0);
        }
        set_bit(&mut self.bytes, self.len, value);
        if !value {
            self.unset_bits += 1;
        }
        self.len += 1;
    }

    pub fn extend_constant(&mut self, additional: usize, value: bool) {
        for _ in 0..additional {
            self.push(value);
        }
    }

    pub fn extend_from_bitmap(&mut self, other: &Bitmap) {
        for b in other.iter() {
            self.push(b);
        }
    }

    /// Overwrites an existing bit
    pub fn set(&mut self, index: usize, value: bool) {
        debug_assert!(index < self.len);
        let old = get_bit(&self.bytes, index);
        if old != value {
            set_bit(&mut self.bytes, index, value);
            if value {
                self.unset_bits -= 1;
            } else {
                self.unset_bits += 1;
            }
        }
    }

    pub fn freeze(self) -> Bitmap {
        Bitmap {
            bytes: Arc::new(self.bytes),
            offset: 0,
            len: self.len,
            unset_bits: self.unset_bits,
        }
    }

    /// Freeze into a validity bitmap, dropping it when no bit is unset
    pub fn into_validity(self) -> Option<Bitmap> {
        if self.unset_bits == 0 {
            None
        } else {
            Some(self.freeze())
        }
    }
}

/// Combine two optional validities: a slot is valid only when valid in both
pub fn combine_validities(lhs: Option<&Bitmap>, rhs: Option<&Bitmap>) -> Option<Bitmap> {
    match (lhs, rhs) {
        (None, None) => None,
        (Some(l), None) => Some(l.clone()),
        (None, Some(r)) => Some(r.clone()),
        (Some(l), Some(r)) => Some(l.and(r)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bools() {
        let bm = Bitmap::from_bools(&[true, false, true, true, false, true, true, true, false]);
        assert_eq!(bm.len(), 9);
        assert_eq!(bm.unset_bits(), 3);
        assert!(bm.get(0));
        assert!(!bm.get(1));
        assert!(!bm.get(8));
    }

    #[test]
    fn test_slice_counts_unset() {
        let bm = Bitmap::from_bools(&[true, false, true, true, false, true]);
        let sliced = bm.slice(2, 3);
        assert_eq!(sliced.len(), 3);
        assert_eq!(sliced.unset_bits(), 1);
        assert_eq!(sliced.iter().collect::<Vec<_>>(), vec![true, true, false]);
    }

    #[test]
    fn test_mutable_set() {
        let mut mb = MutableBitmap::with_capacity(4);
        mb.extend_constant(4, true);
        mb.set(2, false);
        assert_eq!(mb.unset_bits(), 1);
        let bm = mb.freeze();
        assert_eq!(bm.iter().collect::<Vec<_>>(), vec![true, true, false, true]);
    }

    #[test]
    fn test_into_validity_drops_all_valid() {
        let mut mb = MutableBitmap::new();
        mb.extend_constant(10, true);
        assert!(mb.into_validity().is_none());
    }

    #[test]
    fn test_combine() {
        let a = Bitmap::from_bools(&[true, true, false]);
        let b = Bitmap::from_bools(&[false, true, true]);
        let c = combine_validities(Some(&a), Some(&b)).unwrap();
        assert_eq!(c.iter().collect::<Vec<_>>(), vec![false, true, false]);
        assert!(combine_validities(None, None).is_none());
    }
}
