use rand::seq::SliceRandom;

use crate::column::ChunkedArray;
use crate::core::dtype::IdxSize;
use crate::core::error::Result;
use crate::series::sample::make_rng;
use crate::series::Series;

/// How tied values are ranked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankMethod {
    /// Mean of the positions the ties occupy
    #[default]
    Average,
    /// Lowest position of the tie group
    Min,
    /// Highest position of the tie group
    Max,
    /// Like `Min`, but groups are numbered consecutively
    Dense,
    /// Order of appearance breaks ties
    Ordinal,
    /// Ties are broken randomly
    Random,
}

impl Series {
    /// Rank values starting at 1. Nulls keep a null rank.
    ///
    /// `Average` yields Float64, every other method yields the index dtype.
    /// `seed` only affects [`RankMethod::Random`].
    pub fn rank(&self, method: RankMethod, reverse: bool, seed: Option<u64>) -> Result<Series> {
        let len = self.len();
        let order = self.arg_sort_indices(reverse)?;
        let valid = len - self.null_count();
        let cmp = self.row_comparator()?;

        let mut ranks: Vec<Option<f64>> = vec![None; len];
        let mut rng = make_rng(seed);
        let mut dense = 0usize;
        let mut start = 0usize;
        while start < valid {
            let mut end = start + 1;
            while end < valid && cmp(order[start] as usize, order[end] as usize).is_eq() {
                end += 1;
            }
            dense += 1;
            let group = &order[start..end];
            match method {
                RankMethod::Average => {
                    let avg = (start + 1 + end) as f64 / 2.0;
                    group.iter().for_each(|&i| ranks[i as usize] = Some(avg));
                }
                RankMethod::Min => group.iter().for_each(|&i| ranks[i as usize] = Some((start + 1) as f64)),
                RankMethod::Max => group.iter().for_each(|&i| ranks[i as usize] = Some(end as f64)),
                RankMethod::Dense => group.iter().for_each(|&i| ranks[i as usize] = Some(dense as f64)),
                RankMethod::Ordinal => {
                    for (k, &i) in group.iter().enumerate() {
                        ranks[i as usize] = Some((start + 1 + k) as f64);
                    }
                }
                RankMethod::Random => {
                    let mut positions: Vec<usize> = (start + 1..=end).collect();
                    positions.shuffle(&mut rng);
                    for (&i, pos) in group.iter().zip(positions) {
                        ranks[i as usize] = Some(pos as f64);
                    }
                }
            }
            start = end;
        }

        if method == RankMethod::Average {
            return Ok(Series::new(self.name(), ranks));
        }
        let ranks: ChunkedArray<IdxSize> = ranks
            .into_iter()
            .map(|r| r.map(|r| r as IdxSize))
            .collect();
        Ok(Series::from_chunked(self.name(), ranks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_methods() {
        let s = Series::new("a", vec![3i32, 6, 1, 1, 6]);
        let avg = s.rank(RankMethod::Average, false, None).unwrap();
        assert_eq!(
            avg.f64().unwrap().non_null_values(),
            vec![3.0, 4.5, 1.5, 1.5, 4.5]
        );
        let ord = s.rank(RankMethod::Ordinal, false, None).unwrap();
        let ord: Vec<IdxSize> = ord.unpack::<IdxSize>().unwrap().non_null_values();
        assert_eq!(ord, vec![3, 4, 1, 2, 5]);
        let dense = s.rank(RankMethod::Dense, false, None).unwrap();
        let dense: Vec<IdxSize> = dense.unpack::<IdxSize>().unwrap().non_null_values();
        assert_eq!(dense, vec![2, 3, 1, 1, 3]);
    }

    #[test]
    fn test_rank_keeps_nulls() {
        let s = Series::new("a", vec![Some(2.0f64), None, Some(1.0)]);
        let r = s.rank(RankMethod::Min, true, None).unwrap();
        let r = r.unpack::<IdxSize>().unwrap().to_options();
        assert_eq!(r, vec![Some(1), None, Some(2)]);
    }
}
