use itertools::Itertools;
use serde::Serialize;

/// A pairing of one contig's left copies with its right copies: `left[i]` is
/// paired with `right[i]`. Both lists have length `min(m, n)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Matching {
    pub left: Vec<usize>,
    pub right: Vec<usize>,
}

impl Matching {
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.left.iter().copied().zip(self.right.iter().copied())
    }
}

/// Lazily enumerates every matching between `m` left copies and `n` right
/// copies. The larger side contributes an ordered selection of `min(m, n)`
/// distinct indices, paired positionally with `0..min(m, n)` on the smaller
/// side. Selections come out in lexicographic order.
pub fn matchings(m: usize, n: usize) -> Box<dyn Iterator<Item = Matching>> {
    if m >= n {
        let fixed: Vec<usize> = (0..n).collect();
        Box::new((0..m).permutations(n).map(move |left| Matching {
            left,
            right: fixed.clone(),
        }))
    } else {
        let fixed: Vec<usize> = (0..m).collect();
        Box::new((0..n).permutations(m).map(move |right| Matching {
            left: fixed.clone(),
            right,
        }))
    }
}

/// Collects [`matchings`] into a vector.
pub fn generate_matchings(m: usize, n: usize) -> Vec<Matching> {
    matchings(m, n).collect()
}

/// Number of matchings for `m` and `n` copies, `max! / (max - min)!`,
/// saturating at `u128::MAX`.
pub fn matching_count(m: usize, n: usize) -> u128 {
    let (hi, lo) = if m >= n { (m, n) } else { (n, m) };
    ((hi - lo + 1)..=hi)
        .try_fold(1u128, |acc, x| acc.checked_mul(x as u128))
        .unwrap_or(u128::MAX)
}
