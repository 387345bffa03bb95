//! The compressed SA-indexed mask (§4.3): `sa_mask[i] = m[SA[i]]`, stored
//! as a run-length encoding with periodic rank/select checkpoints.
//!
//! A masked superstring produced by `compact` marks exactly one occurrence
//! per canonical k-mer, so in practice this vector is long runs of zeros
//! separated by isolated ones; run-length block compression exploits that
//! skew without pulling in a full succinct-library dependency (RRR/SD would
//! be the production choice for a denser mask).

const CHECKPOINT_STRIDE: usize = 64;

#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    /// Index into `run_lengths` of the first run in this checkpoint group.
    run_index: usize,
    /// Number of bits covered by all runs before `run_index`.
    position: u64,
    /// Number of set bits covered by all runs before `run_index`.
    ones: u64,
}

/// A compressed, immutable bit vector with rank1/select1 support, used for
/// the SA-mask.
#[derive(Debug, Clone)]
pub struct CompressedBitVector {
    first_bit: bool,
    run_lengths: Vec<u32>,
    len: usize,
    total_ones: u64,
    checkpoints: Vec<Checkpoint>,
}

impl CompressedBitVector {
    /// Builds the compressed representation from a dense source.
    pub fn from_bit_source(len: usize, bit_at: impl Fn(usize) -> bool) -> Self {
        let mut run_lengths = Vec::new();
        let first_bit = if len == 0 { false } else { bit_at(0) };

        let mut current_bit = first_bit;
        let mut current_run_len: u32 = 0;

        for i in 0..len {
            let bit = bit_at(i);
            if bit == current_bit {
                current_run_len += 1;
            } else {
                run_lengths.push(current_run_len);
                current_bit = bit;
                current_run_len = 1;
            }
        }
        if len > 0 {
            run_lengths.push(current_run_len);
        }

        let mut checkpoints = Vec::new();
        let mut position = 0u64;
        let mut ones = 0u64;
        let mut bit = first_bit;

        for (run_index, &run_len) in run_lengths.iter().enumerate() {
            if run_index % CHECKPOINT_STRIDE == 0 {
                checkpoints.push(Checkpoint {
                    run_index,
                    position,
                    ones,
                });
            }
            if bit {
                ones += run_len as u64;
            }
            position += run_len as u64;
            bit = !bit;
        }

        Self {
            first_bit,
            run_lengths,
            len,
            total_ones: ones,
            checkpoints,
        }
    }

    /// Rebuilds a compressed bit vector from its run-length form, e.g. when
    /// loading an index back off disk (§6 sibling-file layout).
    pub fn from_runs(first_bit: bool, run_lengths: Vec<u32>, len: usize) -> Self {
        let mut checkpoints = Vec::new();
        let mut position = 0u64;
        let mut ones = 0u64;
        let mut bit = first_bit;

        for (run_index, &run_len) in run_lengths.iter().enumerate() {
            if run_index % CHECKPOINT_STRIDE == 0 {
                checkpoints.push(Checkpoint {
                    run_index,
                    position,
                    ones,
                });
            }
            if bit {
                ones += run_len as u64;
            }
            position += run_len as u64;
            bit = !bit;
        }

        Self {
            first_bit,
            run_lengths,
            len,
            total_ones: ones,
            checkpoints,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total_ones(&self) -> u64 {
        self.total_ones
    }

    pub fn first_bit(&self) -> bool {
        self.first_bit
    }

    /// The run lengths, for serialization.
    pub fn run_lengths(&self) -> &[u32] {
        &self.run_lengths
    }

    fn checkpoint_before(&self, target_position: u64) -> Checkpoint {
        let idx = match self
            .checkpoints
            .binary_search_by_key(&target_position, |c| c.position)
        {
            Ok(i) => i,
            Err(0) => 0,
            Err(i) => i - 1,
        };
        self.checkpoints[idx]
    }

    /// Number of set bits in `[0, i)`.
    pub fn rank1(&self, i: usize) -> usize {
        debug_assert!(i <= self.len);
        if i == 0 {
            return 0;
        }

        let target = i as u64;
        let checkpoint = self.checkpoint_before(target);

        let mut position = checkpoint.position;
        let mut ones = checkpoint.ones;
        let mut bit = if checkpoint.run_index % 2 == 0 {
            self.first_bit
        } else {
            !self.first_bit
        };

        for &run_len in &self.run_lengths[checkpoint.run_index..] {
            let run_len = run_len as u64;
            if position + run_len >= target {
                let covered = target - position;
                if bit {
                    ones += covered;
                }
                return ones as usize;
            }

            position += run_len;
            if bit {
                ones += run_len;
            }
            bit = !bit;
        }

        ones as usize
    }

    pub fn rank0(&self, i: usize) -> usize {
        i - self.rank1(i)
    }

    pub fn get(&self, i: usize) -> bool {
        self.rank1(i + 1) > self.rank1(i)
    }

    /// Position of the `j`-th (1-based) set bit, or `None` if there are
    /// fewer than `j` set bits.
    pub fn select1(&self, j: usize) -> Option<usize> {
        if j == 0 || j as u64 > self.total_ones {
            return None;
        }

        let target = j as u64;
        let checkpoint_idx = match self
            .checkpoints
            .binary_search_by_key(&target, |c| c.ones + 1)
        {
            Ok(i) => i,
            Err(0) => 0,
            Err(i) => i - 1,
        };
        let checkpoint = self.checkpoints[checkpoint_idx];

        let mut position = checkpoint.position;
        let mut ones = checkpoint.ones;
        let mut bit = if checkpoint.run_index % 2 == 0 {
            self.first_bit
        } else {
            !self.first_bit
        };

        for &run_len in &self.run_lengths[checkpoint.run_index..] {
            let run_len = run_len as u64;
            if bit {
                if ones + run_len >= target {
                    let offset_in_run = target - ones - 1;
                    return Some((position + offset_in_run) as usize);
                }
                ones += run_len;
            }
            position += run_len;
            bit = !bit;
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(bits: &[bool]) -> CompressedBitVector {
        CompressedBitVector::from_bit_source(bits.len(), |i| bits[i])
    }

    #[test]
    fn rank_matches_brute_force() {
        let bits = [
            false, false, true, false, false, false, true, true, false, true, false, false,
            false,
        ];
        let cbv = roundtrip(&bits);

        for i in 0..=bits.len() {
            let expected = bits[..i].iter().filter(|&&b| b).count();
            assert_eq!(cbv.rank1(i), expected, "rank1({i})");
        }
    }

    #[test]
    fn select_inverts_rank() {
        let bits = [
            false, false, true, false, false, false, true, true, false, true, false, false,
            false,
        ];
        let cbv = roundtrip(&bits);

        let ones: Vec<usize> = (0..bits.len()).filter(|&i| bits[i]).collect();
        for (j, &pos) in ones.iter().enumerate() {
            assert_eq!(cbv.select1(j + 1), Some(pos));
        }
        assert_eq!(cbv.select1(ones.len() + 1), None);
    }

    #[test]
    fn handles_many_checkpoint_groups() {
        let len = 10_000;
        let bits: Vec<bool> = (0..len).map(|i| i % 97 == 0).collect();
        let cbv = roundtrip(&bits);

        for i in (0..=len).step_by(37) {
            let expected = bits[..i].iter().filter(|&&b| b).count();
            assert_eq!(cbv.rank1(i), expected);
        }

        let ones: Vec<usize> = (0..len).filter(|&i| bits[i]).collect();
        for (j, &pos) in ones.iter().enumerate() {
            assert_eq!(cbv.select1(j + 1), Some(pos));
        }
    }

    #[test]
    fn all_zero_and_all_one() {
        let zeros = roundtrip(&vec![false; 50]);
        assert_eq!(zeros.total_ones(), 0);
        assert_eq!(zeros.select1(1), None);

        let ones = roundtrip(&vec![true; 50]);
        assert_eq!(ones.total_ones(), 50);
        assert_eq!(ones.rank1(50), 50);
        assert_eq!(ones.select1(50), Some(49));
    }
}
