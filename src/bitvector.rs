//! A dense bit vector with O(1) rank and O(log n) select, used for the three
//! bit-split BWT components (`ac_gt`, `ac`, `gt`) and for the kLCP vector.
//!
//! The rank support is a single level of per-word (64-bit block) cumulative
//! popcounts, without an extra superblock level: these vectors are at most
//! as long as the indexed text, which keeps the `Vec<u64>` checkpoint array
//! a small fraction of the bit vector itself.

use rayon::prelude::*;

/// An immutable bit vector with rank/select support.
#[derive(Debug, Clone)]
pub struct BitVector {
    words: Vec<u64>,
    len: usize,
    /// `cumulative_rank[i]` = number of set bits in `words[0..i]`.
    cumulative_rank: Vec<u64>,
}

impl BitVector {
    /// Builds rank support over an already-populated set of words.
    ///
    /// `len` is the number of meaningful bits (the last word may be
    /// partially used).
    pub fn from_words(words: Vec<u64>, len: usize) -> Self {
        debug_assert!(len <= words.len() * 64);

        let mut cumulative_rank = vec![0u64; words.len() + 1];

        // the prefix sum is inherently sequential, but computing it is
        // linear in the number of words and dominated by construction of
        // the words themselves, so it is left single-threaded
        let mut acc = 0u64;
        for (i, &word) in words.iter().enumerate() {
            cumulative_rank[i] = acc;
            acc += word.count_ones() as u64;
        }
        cumulative_rank[words.len()] = acc;

        Self {
            words,
            len,
            cumulative_rank,
        }
    }

    /// Builds a bit vector of `len` bits from a parallel iterator-friendly
    /// source by evaluating `bit_at` for every position. Used during
    /// construction where the bits come from a rayon-parallel computation.
    pub fn from_bits_parallel(len: usize, bit_at: impl Fn(usize) -> bool + Sync) -> Self {
        let num_words = len.div_ceil(64);
        let words: Vec<u64> = (0..num_words)
            .into_par_iter()
            .map(|word_idx| {
                let mut word = 0u64;
                let base = word_idx * 64;
                for bit in 0..64 {
                    let pos = base + bit;
                    if pos >= len {
                        break;
                    }
                    if bit_at(pos) {
                        word |= 1 << bit;
                    }
                }
                word
            })
            .collect();

        Self::from_words(words, len)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The underlying 64-bit words, for serialization (§6 sibling-file
    /// layout).
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    #[inline]
    pub fn get(&self, i: usize) -> bool {
        debug_assert!(i < self.len);
        (self.words[i / 64] >> (i % 64)) & 1 == 1
    }

    /// Number of set bits in `[0, i)`. `i` may range up to `self.len()`.
    #[inline]
    pub fn rank1(&self, i: usize) -> usize {
        debug_assert!(i <= self.len);

        let word_idx = i / 64;
        let bit_idx = i % 64;

        let base = self.cumulative_rank[word_idx];
        let partial = if bit_idx == 0 {
            0
        } else {
            let word = self.words[word_idx];
            let mask = (1u64 << bit_idx) - 1;
            (word & mask).count_ones() as u64
        };

        (base + partial as u64) as usize
    }

    /// Number of unset bits in `[0, i)`.
    #[inline]
    pub fn rank0(&self, i: usize) -> usize {
        i - self.rank1(i)
    }

    /// Position of the `j`-th (1-based) set bit, or `None` if there are
    /// fewer than `j` set bits.
    pub fn select1(&self, j: usize) -> Option<usize> {
        if j == 0 || j as u64 > self.total_ones() {
            return None;
        }

        // binary search over word-granularity cumulative ranks for the word
        // containing the j-th one bit
        let mut lo = 0usize;
        let mut hi = self.cumulative_rank.len() - 1;
        while lo + 1 < hi {
            let mid = lo + (hi - lo) / 2;
            if self.cumulative_rank[mid] < j as u64 {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        let word = self.words[lo];
        let mut remaining = j as u64 - self.cumulative_rank[lo];
        for bit in 0..64 {
            if (word >> bit) & 1 == 1 {
                remaining -= 1;
                if remaining == 0 {
                    return Some(lo * 64 + bit);
                }
            }
        }

        unreachable!("word did not contain the expected number of set bits")
    }

    pub fn total_ones(&self) -> u64 {
        *self.cumulative_rank.last().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force(bits: &[bool]) -> BitVector {
        BitVector::from_bits_parallel(bits.len(), |i| bits[i])
    }

    #[test]
    fn rank_matches_brute_force_count() {
        let bits = [true, false, true, true, false, false, true, false, true];
        let bv = brute_force(&bits);

        for i in 0..=bits.len() {
            let expected = bits[..i].iter().filter(|&&b| b).count();
            assert_eq!(bv.rank1(i), expected, "rank1({i})");
        }
    }

    #[test]
    fn select_inverts_rank() {
        let bits = [true, false, true, true, false, false, true, false, true];
        let bv = brute_force(&bits);

        let ones: Vec<usize> = (0..bits.len()).filter(|&i| bits[i]).collect();
        for (j, &pos) in ones.iter().enumerate() {
            assert_eq!(bv.select1(j + 1), Some(pos));
        }
        assert_eq!(bv.select1(ones.len() + 1), None);
    }

    #[test]
    fn works_across_word_boundaries() {
        let len = 300;
        let bits: Vec<bool> = (0..len).map(|i| i % 7 == 0).collect();
        let bv = brute_force(&bits);

        for i in 0..=len {
            let expected = bits[..i].iter().filter(|&&b| b).count();
            assert_eq!(bv.rank1(i), expected);
        }
    }
}
