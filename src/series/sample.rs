//! Random sampling and shuffling

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::core::dtype::IdxSize;
use crate::core::error::{Error, Result};
use crate::series::Series;

/// Seeded generator, or one seeded from the OS when no seed is given
pub(crate) fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Row positions for a sample of `n` out of `len`
pub(crate) fn sample_indices(
    len: usize,
    n: usize,
    with_replacement: bool,
    shuffle: bool,
    seed: Option<u64>,
) -> Result<Vec<IdxSize>> {
    let mut rng = make_rng(seed);
    if with_replacement {
        if len == 0 && n > 0 {
            return Err(Error::InvalidValue(
                "cannot sample with replacement from an empty Series".to_string(),
            ));
        }
        return Ok((0..n).map(|_| rng.random_range(0..len) as IdxSize).collect());
    }
    if n > len {
        return Err(Error::InvalidValue(format!(
            "cannot take a larger sample ({}) than the population ({}) without replacement",
            n, len
        )));
    }
    let mut idx: Vec<IdxSize> = rand::seq::index::sample(&mut rng, len, n)
        .into_iter()
        .map(|i| i as IdxSize)
        .collect();
    if !shuffle {
        idx.sort_unstable();
    }
    Ok(idx)
}

/// Resolve the `n` / `frac` pair. Giving both is an error; giving neither
/// samples one row.
pub(crate) fn resolve_sample_size(len: usize, n: Option<usize>, frac: Option<f64>) -> Result<usize> {
    match (n, frac) {
        (Some(_), Some(_)) => Err(Error::InvalidValue(
            "cannot specify both `n` and `frac`".to_string(),
        )),
        (Some(n), None) => Ok(n),
        (None, Some(frac)) => {
            if frac < 0.0 {
                return Err(Error::InvalidValue(format!(
                    "`frac` must not be negative, got {}",
                    frac
                )));
            }
            Ok((frac * len as f64) as usize)
        }
        (None, None) => Ok(1),
    }
}

impl Series {
    /// Sample rows
    ///
    /// # Arguments
    /// * `n` - Number of rows; mutually exclusive with `frac`
    /// * `frac` - Fraction of the length
    /// * `with_replacement` - Allow a row to be drawn more than once
    /// * `shuffle` - Keep the random draw order instead of the original order
    /// * `seed` - Seed for a deterministic result
    pub fn sample(
        &self,
        n: Option<usize>,
        frac: Option<f64>,
        with_replacement: bool,
        shuffle: bool,
        seed: Option<u64>,
    ) -> Result<Series> {
        let n = resolve_sample_size(self.len(), n, frac)?;
        let idx = sample_indices(self.len(), n, with_replacement, shuffle, seed)?;
        self.take(&idx)
    }

    pub fn sample_n(
        &self,
        n: usize,
        with_replacement: bool,
        shuffle: bool,
        seed: Option<u64>,
    ) -> Result<Series> {
        self.sample(Some(n), None, with_replacement, shuffle, seed)
    }

    pub fn sample_frac(
        &self,
        frac: f64,
        with_replacement: bool,
        shuffle: bool,
        seed: Option<u64>,
    ) -> Result<Series> {
        self.sample(None, Some(frac), with_replacement, shuffle, seed)
    }

    /// Random permutation of the rows
    pub fn shuffle(&self, seed: Option<u64>) -> Result<Series> {
        let mut idx: Vec<IdxSize> = (0..self.len() as IdxSize).collect();
        idx.shuffle(&mut make_rng(seed));
        self.take(&idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_n_and_frac_rejected() {
        let s = Series::new("a", vec![1i32, 2, 3]);
        assert!(s.sample(Some(1), Some(0.5), false, false, Some(0)).is_err());
    }

    #[test]
    fn test_seed_is_deterministic() {
        let s = Series::new("a", (0..100i64).collect::<Vec<_>>());
        let a = s.sample_n(10, false, true, Some(42)).unwrap();
        let b = s.sample_n(10, false, true, Some(42)).unwrap();
        assert!(a.series_equal(&b));
    }

    #[test]
    fn test_without_replacement_too_large() {
        let s = Series::new("a", vec![1i32, 2]);
        assert!(s.sample_n(3, false, false, None).is_err());
        assert_eq!(s.sample_n(3, true, false, Some(1)).unwrap().len(), 3);
    }
}
