use crate::column::ChunkedArray;
use crate::core::any_value::AnyValue;
use crate::core::dtype::{Field, IdxSize};
use crate::core::error::{Error, Result};
use crate::series::Series;

/// Struct column: equal-length field Series sharing one row axis
#[derive(Debug, Clone)]
pub struct StructChunked {
    fields: Vec<Series>,
    length: usize,
}

impl StructChunked {
    /// Create a struct column from its fields
    ///
    /// # Arguments
    /// * `fields` - Field Series; names must be unique and lengths equal
    pub fn new(fields: Vec<Series>) -> Result<Self> {
        let length = fields.first().map(|s| s.len()).unwrap_or(0);
        for (i, f) in fields.iter().enumerate() {
            if f.len() != length {
                return Err(Error::LengthMismatch {
                    expected: length,
                    actual: f.len(),
                });
            }
            if fields[..i].iter().any(|other| other.name() == f.name()) {
                return Err(Error::DuplicateColumnName(f.name().to_string()));
            }
        }
        Ok(Self { fields, length })
    }

    pub(crate) fn from_fields_unchecked(fields: Vec<Series>) -> Self {
        let length = fields.first().map(|s| s.len()).unwrap_or(0);
        Self { fields, length }
    }

    pub fn fields(&self) -> &[Series] {
        &self.fields
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Series> {
        self.fields.iter().find(|s| s.name() == name)
    }

    pub fn schema(&self) -> Vec<Field> {
        self.fields
            .iter()
            .map(|s| Field::new(s.name(), s.dtype().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Struct rows are never null themselves; nulls live in the fields
    pub fn null_count(&self) -> usize {
        0
    }

    pub fn has_validity(&self) -> bool {
        false
    }

    pub fn n_chunks(&self) -> usize {
        self.fields.first().map(|s| s.n_chunks()).unwrap_or(1)
    }

    pub fn chunk_lengths(&self) -> Vec<usize> {
        self.fields
            .first()
            .map(|s| s.chunk_lengths())
            .unwrap_or_else(|| vec![self.length])
    }

    pub fn get_any_value(&self, index: usize) -> Result<AnyValue> {
        let mut values = Vec::with_capacity(self.fields.len());
        for f in &self.fields {
            values.push((f.name().to_string(), f.get(index as i64)?));
        }
        Ok(AnyValue::Struct(values))
    }

    pub fn slice(&self, offset: usize, length: usize) -> Self {
        Self::from_fields_unchecked(
            self.fields
                .iter()
                .map(|s| s.slice(offset as i64, length))
                .collect(),
        )
    }

    pub fn rechunk(&self) -> Self {
        Self::from_fields_unchecked(
            self.fields
                .iter()
                .map(|s| {
                    let mut s = s.clone();
                    s.rechunk();
                    s
                })
                .collect(),
        )
    }

    pub fn take(&self, indices: &[IdxSize]) -> Result<Self> {
        let fields = self
            .fields
            .iter()
            .map(|s| s.take(indices))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_fields_unchecked(fields))
    }

    pub fn take_opt(&self, indices: &[Option<IdxSize>]) -> Result<Self> {
        let fields = self
            .fields
            .iter()
            .map(|s| s.take_opt(indices))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_fields_unchecked(fields))
    }

    pub fn filter(&self, mask: &ChunkedArray<bool>) -> Result<Self> {
        let fields = self
            .fields
            .iter()
            .map(|s| s.filter_ca(mask))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_fields_unchecked(fields))
    }

    pub fn is_null(&self) -> ChunkedArray<bool> {
        ChunkedArray::full(false, self.length)
    }

    pub fn is_not_null(&self) -> ChunkedArray<bool> {
        ChunkedArray::full(true, self.length)
    }

    pub fn reverse(&self) -> Self {
        Self::from_fields_unchecked(self.fields.iter().map(|s| s.reverse()).collect())
    }

    fn check_same_fields(&self, other: &Self) -> Result<()> {
        if self.schema() != other.schema() {
            return Err(Error::TypeMismatch(
                "cannot combine struct columns with different fields".to_string(),
            ));
        }
        Ok(())
    }

    pub fn append(&mut self, other: &Self) -> Result<()> {
        self.check_same_fields(other)?;
        for (f, o) in self.fields.iter_mut().zip(other.fields.iter()) {
            f.append(o)?;
        }
        self.length += other.length;
        Ok(())
    }

    pub fn extend(&mut self, other: &Self) -> Result<()> {
        self.check_same_fields(other)?;
        for (f, o) in self.fields.iter_mut().zip(other.fields.iter()) {
            f.extend(o)?;
        }
        self.length += other.length;
        Ok(())
    }

    pub fn shrink_to_fit(&mut self) {
        for f in self.fields.iter_mut() {
            f.shrink_to_fit();
        }
    }

    pub fn deep_copy(&self) -> Self {
        Self::from_fields_unchecked(self.fields.iter().map(|s| s.deep_copy()).collect())
    }

    pub fn is_shared(&self) -> bool {
        self.fields.iter().any(|s| s.physical().is_shared())
    }

    pub fn estimated_size(&self) -> usize {
        self.fields.iter().map(|s| s.estimated_size()).sum()
    }
}
