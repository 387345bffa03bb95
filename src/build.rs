//! Build (§4.5): from `(S, m, k)` to a queryable [`crate::index::Index`].

use crate::alphabet;
use crate::bitvector::BitVector;
use crate::bwt::{BitSplitBwt, A, C, G, T};
use crate::error::{FmsiError, Result};
use crate::index::Index;
use crate::klcp::build_klcp;
use crate::masked_superstring::MaskedSuperstring;
use crate::sa_mask::CompressedBitVector;

/// Build-time options, mirroring the CLI's `index` subcommand flags.
#[derive(Debug, Clone, Copy)]
pub struct BuildConfig {
    /// Build the kLCP vector so streamed queries are available (`-x` omits it).
    pub build_klcp: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self { build_klcp: true }
    }
}

/// Runs the full build pipeline (§4.5 steps 1-5).
pub fn build(ms: &MaskedSuperstring, config: BuildConfig) -> Result<Index> {
    let k = ms.k();
    if k == 0 || k > 64 {
        return Err(FmsiError::KTooLarge { k });
    }

    let n = ms.len();
    let dense = ms.dense_codes();

    // Step 1: 2-bit form with sentinel appended, fed to the suffix sorter.
    let mut sortable: Vec<u8> = dense
        .iter()
        .map(|&c| alphabet::dense_with_sentinel_offset(c))
        .collect();
    sortable.push(0);

    let sa = suffix_array(&sortable);

    let dollar_position = sa
        .iter()
        .position(|&p| p == 0)
        .expect("the sentinel occurs exactly once in the suffix array");

    // Step 2-3: derive L and sa_mask in one logical pass, split L into the
    // three bit vectors in parallel (from_bits_parallel evaluates the
    // closure independently per bit).
    let symbol_at_row = |i: usize| -> u8 {
        let sa_i = sa[i] as usize;
        if sa_i == 0 {
            A
        } else {
            dense[sa_i - 1]
        }
    };

    let ac_gt = BitVector::from_bits_parallel(n + 1, |i| symbol_at_row(i) >= G);

    // ac/gt only make sense built from the compacted subsequences (their
    // length is |AC| / |GT|, not n+1), so those are assembled sequentially
    // before handing the result to the parallel rank-support builder.
    let mut ac_bits = Vec::with_capacity(n + 1);
    let mut gt_bits = Vec::with_capacity(n + 1);
    for i in 0..=n {
        let symbol = symbol_at_row(i);
        if symbol >= G {
            gt_bits.push(symbol == T);
        } else {
            ac_bits.push(symbol == C);
        }
    }
    let ac = BitVector::from_bits_parallel(ac_bits.len(), |i| ac_bits[i]);
    let gt = BitVector::from_bits_parallel(gt_bits.len(), |i| gt_bits[i]);

    let bwt = BitSplitBwt::new(ac_gt, ac, gt, dollar_position);

    let a_count = bwt.ac().len() - bwt.ac().total_ones() as usize - 1;
    let c_count = bwt.ac().total_ones() as usize;
    let g_count = bwt.gt().len() - bwt.gt().total_ones() as usize;
    let counts = [
        1,
        1 + a_count,
        1 + a_count + c_count,
        1 + a_count + c_count + g_count,
    ];

    let mask = ms.mask();
    let sa_mask = CompressedBitVector::from_bit_source(n + 1, |i| {
        let sa_i = sa[i] as usize;
        sa_i < n && mask[sa_i]
    });

    let klcp = if config.build_klcp {
        Some(build_klcp(&dense, &sa, k))
    } else {
        None
    };

    let is_minimized = mask_is_minimized(&dense, mask, k);

    Ok(Index::new(
        bwt,
        sa_mask,
        counts,
        dollar_position,
        klcp,
        k,
        is_minimized,
    ))
}

/// Whether `mask` marks at most one occurrence per canonical k-mer class
/// (§4.4's precondition for minimal lookup, checked once at build time
/// rather than on every `lookup_minimal` call).
fn mask_is_minimized(dense: &[u8], mask: &[bool], k: usize) -> bool {
    let n = dense.len();
    if n < k {
        return true;
    }

    let mut seen: rustc_hash::FxHashSet<u128> = rustc_hash::FxHashSet::default();
    for i in 0..=n - k {
        if mask[i] {
            let canon = alphabet::canonical(alphabet::pack(&dense[i..i + k]), k);
            if !seen.insert(canon) {
                return false;
            }
        }
    }
    true
}

/// Computes the suffix array of `text` (an alphabet where 0 is reserved as
/// the unique smallest symbol).
fn suffix_array(text: &[u8]) -> Vec<i32> {
    libsais::SuffixArrayConstruction::for_text(text)
        .in_owned_buffer32()
        .single_threaded()
        .run()
        .expect("libsais suffix array construction")
        .into_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_concrete_scenario_one() {
        let ms = MaskedSuperstring::parse(b"CaGGTag", Some(3)).unwrap();
        let index = build(&ms, BuildConfig::default()).unwrap();

        assert_eq!(index.counts(), [1, 3, 4, 7]);
        // for "CAGGTAG$" the suffix array places the sentinel-only suffix
        // at rank 0 and the full-string suffix at rank 3 (verified by hand:
        // SA = [7,5,1,0,6,2,3,4], so ISA[0] = 3); counts independently
        // confirm this, so 3 is the value this crate treats as ground truth
        assert_eq!(index.dollar_position(), 3);
    }

    #[test]
    fn scenario_one_mask_is_minimized() {
        // CAG, GGT, GTA, TAG are four distinct canonical classes.
        let ms = MaskedSuperstring::parse(b"CaGGTag", Some(3)).unwrap();
        let index = build(&ms, BuildConfig::default()).unwrap();
        assert!(index.is_minimized());
    }

    #[test]
    fn duplicate_canonical_occurrence_is_not_minimized() {
        // ACGACG, mask 111100 marks both ACG-starting occurrences, so the
        // canonical class ACG (self-reverse-complement-free here) has two
        // marked occurrences.
        let ms = MaskedSuperstring::parse(b"ACGACg", Some(3)).unwrap();
        let index = build(&ms, BuildConfig::default()).unwrap();
        assert!(!index.is_minimized());
    }
}
