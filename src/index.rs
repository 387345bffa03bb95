//! The top-level `Index`: ties the bit-split BWT, the SA-mask, and the
//! optional kLCP together behind the public query surface (§3, §4.4, §4.6).

use crate::alphabet;
use crate::bitvector::BitVector;
use crate::bwt::{BitSplitBwt, A, C, G, T};
use crate::error::{FmsiError, Result};
use crate::masked_superstring::MaskedSuperstring;
use crate::predicate::Predicate;
use crate::sa_mask::CompressedBitVector;
use crate::search;
use crate::strand_predictor::StrandPredictor;

/// A built, immutable succinct index over a masked superstring.
#[derive(Debug)]
pub struct Index {
    bwt: BitSplitBwt,
    sa_mask: CompressedBitVector,
    counts: [usize; 4],
    dollar_position: usize,
    klcp: Option<BitVector>,
    k: usize,
    /// Whether `sa_mask` marks at most one occurrence per canonical k-mer
    /// class (§4.4's precondition for minimal lookup).
    is_minimized: bool,
    predictor: std::cell::RefCell<StrandPredictor>,
}

impl Index {
    pub fn new(
        bwt: BitSplitBwt,
        sa_mask: CompressedBitVector,
        counts: [usize; 4],
        dollar_position: usize,
        klcp: Option<BitVector>,
        k: usize,
        is_minimized: bool,
    ) -> Self {
        Self {
            bwt,
            sa_mask,
            counts,
            dollar_position,
            klcp,
            k,
            is_minimized,
            predictor: std::cell::RefCell::new(StrandPredictor::new()),
        }
    }

    pub fn bwt(&self) -> &BitSplitBwt {
        &self.bwt
    }

    pub fn sa_mask(&self) -> &CompressedBitVector {
        &self.sa_mask
    }

    pub fn counts(&self) -> [usize; 4] {
        self.counts
    }

    pub fn counts_array(&self) -> &[usize; 4] {
        &self.counts
    }

    pub fn dollar_position(&self) -> usize {
        self.dollar_position
    }

    pub fn klcp(&self) -> Option<&BitVector> {
        self.klcp.as_ref()
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Whether the loaded mask marks at most one occurrence per canonical
    /// k-mer class, the precondition minimal lookup requires (§7).
    pub fn is_minimized(&self) -> bool {
        self.is_minimized
    }

    /// `n`, the length of the indexed string (excluding the sentinel).
    pub fn len(&self) -> usize {
        self.bwt.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn search_forward(&self, codes: &[u8]) -> search::Range {
        search::search_kmer(&self.bwt, &self.counts, codes)
    }

    fn search_reverse_complement(&self, codes: &[u8]) -> search::Range {
        let rc = alphabet::reverse_complement_sequence(codes);
        search::search_kmer(&self.bwt, &self.counts, &rc)
    }

    /// Whether `codes` equals its own reverse complement (an even-length
    /// palindromic k-mer); contributions from the two strands must not be
    /// double-counted in that case (§4.4 "Canonical semantics").
    fn is_self_reverse_complement(&self, codes: &[u8]) -> bool {
        codes == alphabet::reverse_complement_sequence(codes)
    }

    /// `single_membership(pattern, maximized_ones)` combined across both
    /// strands under canonical, `or`-demasking semantics.
    pub fn single_membership(&self, codes: &[u8], maximized_ones: bool) -> i8 {
        let forward = search::membership_from_range(
            &self.sa_mask,
            self.search_forward(codes),
            maximized_ones,
        );
        if forward == 1 {
            return 1;
        }
        if self.is_self_reverse_complement(codes) {
            return forward;
        }
        let reverse = search::membership_from_range(
            &self.sa_mask,
            self.search_reverse_complement(codes),
            maximized_ones,
        );
        forward.max(reverse)
    }

    /// `general_counts(pattern)` combined across both strands.
    pub fn general_counts(&self, codes: &[u8]) -> (usize, usize) {
        let (ones_f, total_f) = search::general_counts(&self.sa_mask, self.search_forward(codes));
        if self.is_self_reverse_complement(codes) {
            return (ones_f, total_f);
        }
        let (ones_r, total_r) =
            search::general_counts(&self.sa_mask, self.search_reverse_complement(codes));
        (ones_f + ones_r, total_f + total_r)
    }

    /// Evaluates an arbitrary demasking predicate `f` for a single k-mer.
    /// Returns `None` if the k-mer does not occur at all.
    pub fn is_represented(&self, codes: &[u8], predicate: Predicate) -> Option<bool> {
        let (ones, total) = self.general_counts(codes);
        if total == 0 {
            None
        } else {
            Some(predicate.eval(ones, total))
        }
    }

    /// Minimal lookup (§4.4): requires a minimized mask (§7 hard error
    /// otherwise, since an unminimized mask makes `kmer_order` non-injective
    /// and the returned identifier meaningless).
    pub fn lookup_minimal(&self, codes: &[u8]) -> Result<i64> {
        if !self.is_minimized {
            return Err(FmsiError::LookupRequiresMinimizedMask);
        }
        let forward = search::lookup_minimal_from_range(&self.sa_mask, self.search_forward(codes));
        if forward >= 0 || self.is_self_reverse_complement(codes) {
            return Ok(forward);
        }
        Ok(search::lookup_minimal_from_range(
            &self.sa_mask,
            self.search_reverse_complement(codes),
        ))
    }

    /// Non-minimal lookup (§4.4): faster, identifiers may have gaps.
    pub fn lookup_non_minimal(&self, codes: &[u8]) -> i64 {
        let forward = search::lookup_non_minimal_from_range(self.search_forward(codes));
        if forward >= 0 || self.is_self_reverse_complement(codes) {
            return forward;
        }
        search::lookup_non_minimal_from_range(self.search_reverse_complement(codes))
    }

    /// Inverse access (§4.6): recovers the k-mer (dense codes) that maps to
    /// identifier `h`.
    pub fn access(&self, h: usize, minimal: bool) -> Result<Vec<u8>> {
        let mut position = if minimal {
            self.sa_mask
                .select1(h + 1)
                .ok_or(FmsiError::IndexCorruption {
                    path: Default::default(),
                    reason: format!("no represented k-mer with identifier {h}"),
                })?
        } else {
            h
        };

        let mut codes = Vec::with_capacity(self.k);
        for _ in 0..self.k {
            let c = self.first_column_symbol(position);
            codes.push(c);
            position = self
                .bwt
                .select(c, position - self.counts[c as usize] + 1)
                .ok_or(FmsiError::IndexCorruption {
                    path: Default::default(),
                    reason: "select() ran out of occurrences during access".to_string(),
                })?;
        }
        Ok(codes)
    }

    fn first_column_symbol(&self, position: usize) -> u8 {
        for c in [A, C, G, T] {
            let lower = self.counts[c as usize];
            let upper = if (c as usize) + 1 < 4 {
                self.counts[c as usize + 1]
            } else {
                self.bwt.len()
            };
            if position >= lower && position < upper {
                return c;
            }
        }
        unreachable!("position {position} falls in the sentinel row, not a real symbol")
    }

    /// Recovers `(S, m)` byte-for-byte (§8 invariant 7).
    pub fn export(&self) -> MaskedSuperstring {
        let n = self.len();
        let mut sequence = vec![0u8; n];
        let mut mask = vec![false; n];

        // Row 0 always represents the suffix consisting of the sentinel
        // alone (the unique smallest suffix), so L[0] = S[n-1]; walking
        // the LF-mapping backward from there recovers S right to left.
        let mut sa_row = 0usize;
        for i in (0..n).rev() {
            let c = self.bwt.access(sa_row);
            sequence[i] = alphabet::decode(c);
            mask[i] = self.sa_mask.get(sa_row);
            sa_row = self.counts[c as usize] + self.bwt.rank(sa_row, c);
        }

        MaskedSuperstring::new(sequence, mask, self.k)
    }

    /// Streamed membership over `sequence` under demasking predicate `f`
    /// (§4.4 "Streamed membership / lookup"). One verdict per k-mer start
    /// position: `1` represented, `0` present-but-unrepresented, `-1`
    /// absent or spanning a non-ACGT character.
    ///
    /// `-S`/`require_klcp` at the CLI layer is what makes a missing kLCP a
    /// hard error; by itself, `query_sequence` falls back to an unchunked
    /// per-window scan (no kLCP needed) so that a plain `fmsi query` against
    /// an index built with `-x` still works.
    pub fn query_sequence(&self, sequence: &[u8], predicate: Predicate) -> Result<Vec<i8>> {
        match self.klcp.as_ref() {
            Some(klcp) => Ok(self.stream_runs(sequence, klcp, |index, codes, ranges, rc_ranges| {
                let num_windows = ranges.len();
                (0..num_windows)
                    .map(|w| {
                        let (ones, total) = index.combine_counts(
                            &codes[w..w + index.k],
                            ranges[w],
                            rc_ranges[num_windows - 1 - w],
                        );
                        if total == 0 {
                            -1
                        } else if predicate.eval(ones, total) {
                            1
                        } else {
                            0
                        }
                    })
                    .collect()
            })),
            None => Ok(self.query_sequence_scanning(sequence, predicate)),
        }
    }

    /// Per-window fallback for [`Self::query_sequence`] when no kLCP is
    /// loaded: re-runs a fresh backward search per window via
    /// [`Self::is_represented`] instead of extending a running range.
    fn query_sequence_scanning(&self, sequence: &[u8], predicate: Predicate) -> Vec<i8> {
        let total_windows = if sequence.len() >= self.k {
            sequence.len() - self.k + 1
        } else {
            0
        };
        let mut out = vec![-1i8; total_windows];

        for (offset, codes) in acgt_runs(sequence) {
            if codes.len() < self.k {
                continue;
            }
            for w in 0..=codes.len() - self.k {
                let window = &codes[w..w + self.k];
                out[offset + w] = match self.is_represented(window, predicate) {
                    None => -1,
                    Some(true) => 1,
                    Some(false) => 0,
                };
            }
        }

        out
    }

    /// Streamed lookup over `sequence` (§4.4). `minimal` selects minimal vs.
    /// non-minimal identifiers; `-1` marks absent or invalid windows. Falls
    /// back to an unchunked per-window scan when no kLCP is loaded, the same
    /// way [`Self::query_sequence`] does.
    pub fn lookup_sequence(&self, sequence: &[u8], minimal: bool) -> Result<Vec<i64>> {
        if minimal && !self.is_minimized {
            return Err(FmsiError::LookupRequiresMinimizedMask);
        }

        match self.klcp.as_ref() {
            Some(klcp) => Ok(self.stream_runs_i64(sequence, klcp, |index, _codes, ranges, rc_ranges| {
                let num_windows = ranges.len();
                (0..num_windows)
                    .map(|w| {
                        let lookup = |range| {
                            if minimal {
                                search::lookup_minimal_from_range(&index.sa_mask, range)
                            } else {
                                search::lookup_non_minimal_from_range(range)
                            }
                        };
                        let forward = lookup(ranges[w]);
                        if forward >= 0 {
                            forward
                        } else {
                            lookup(rc_ranges[num_windows - 1 - w])
                        }
                    })
                    .collect()
            })),
            None => self.lookup_sequence_scanning(sequence, minimal),
        }
    }

    /// Per-window fallback for [`Self::lookup_sequence`] when no kLCP is
    /// loaded.
    fn lookup_sequence_scanning(&self, sequence: &[u8], minimal: bool) -> Result<Vec<i64>> {
        let total_windows = if sequence.len() >= self.k {
            sequence.len() - self.k + 1
        } else {
            0
        };
        let mut out = vec![-1i64; total_windows];

        for (offset, codes) in acgt_runs(sequence) {
            if codes.len() < self.k {
                continue;
            }
            for w in 0..=codes.len() - self.k {
                let window = &codes[w..w + self.k];
                out[offset + w] = if minimal {
                    self.lookup_minimal(window)?
                } else {
                    self.lookup_non_minimal(window)
                };
            }
        }

        Ok(out)
    }

    /// Splits `sequence` at non-ACGT characters (§4.4 "Edge policy"), runs
    /// `combine` per valid run, and assembles a full-length result with
    /// `-1` filling windows that touch an invalid character or that don't
    /// exist (sequence shorter than `k`).
    fn stream_runs(
        &self,
        sequence: &[u8],
        klcp: &BitVector,
        combine: impl Fn(&Self, &[u8], &[search::Range], &[search::Range]) -> Vec<i8>,
    ) -> Vec<i8> {
        let total_windows = if sequence.len() >= self.k {
            sequence.len() - self.k + 1
        } else {
            0
        };
        let mut out = vec![-1i8; total_windows];

        for (offset, codes) in acgt_runs(sequence) {
            if codes.len() < self.k {
                continue;
            }
            let verdicts = self.run_verdicts(&codes, klcp, &combine, |&v| v == 1);
            out[offset..offset + verdicts.len()].copy_from_slice(&verdicts);
        }

        out
    }

    fn stream_runs_i64(
        &self,
        sequence: &[u8],
        klcp: &BitVector,
        combine: impl Fn(&Self, &[u8], &[search::Range], &[search::Range]) -> Vec<i64>,
    ) -> Vec<i64> {
        let total_windows = if sequence.len() >= self.k {
            sequence.len() - self.k + 1
        } else {
            0
        };
        let mut out = vec![-1i64; total_windows];

        for (offset, codes) in acgt_runs(sequence) {
            if codes.len() < self.k {
                continue;
            }
            let verdicts = self.run_verdicts(&codes, klcp, &combine, |&v| v >= 0);
            out[offset..offset + verdicts.len()].copy_from_slice(&verdicts);
        }

        out
    }

    /// Computes both strands' chunked ranges for one valid run, combines
    /// them via `combine`, and feeds the batch's hit counts (per `is_hit`)
    /// to the strand predictor. The predictor's swap decision only affects
    /// which strand we report as "forward" to `observe` for its own
    /// bookkeeping; verdicts never depend on it (§4.9).
    fn run_verdicts<V: Copy>(
        &self,
        codes: &[u8],
        klcp: &BitVector,
        combine: &impl Fn(&Self, &[u8], &[search::Range], &[search::Range]) -> Vec<V>,
        is_hit: impl Fn(&V) -> bool,
    ) -> Vec<V> {
        let rc_codes = alphabet::reverse_complement_sequence(codes);
        let forward_ranges =
            search::streamed_ranges_chunked(&self.bwt, &self.counts, klcp, codes, self.k);
        let rc_ranges =
            search::streamed_ranges_chunked(&self.bwt, &self.counts, klcp, &rc_codes, self.k);

        let swapped = self.predictor.borrow().predict_swap();
        let verdicts = combine(self, codes, &forward_ranges, &rc_ranges);

        let hits = verdicts.iter().filter(|v| is_hit(v)).count();
        self.predictor
            .borrow_mut()
            .observe(hits, verdicts.len() - hits, swapped);

        verdicts
    }

    fn combine_counts(
        &self,
        window_codes: &[u8],
        forward: search::Range,
        reverse: search::Range,
    ) -> (usize, usize) {
        let (ones_f, total_f) = search::general_counts(&self.sa_mask, forward);
        if self.is_self_reverse_complement(window_codes) {
            return (ones_f, total_f);
        }
        let (ones_r, total_r) = search::general_counts(&self.sa_mask, reverse);
        (ones_f + ones_r, total_f + total_r)
    }
}

#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use crate::build::{build, BuildConfig};
    use crate::masked_superstring::MaskedSuperstring;

    prop_compose! {
        fn masked_superstring_with_k()
            (len in 4usize..80)
            (k in 1usize..=len.min(8), bases in prop::collection::vec(0u8..4, len), case in prop::collection::vec(any::<bool>(), len))
                -> (usize, Vec<u8>, Vec<bool>) {
            (k, bases, case)
        }
    }

    fn to_mask_cased(bases: &[u8], case: &[bool]) -> Vec<u8> {
        bases
            .iter()
            .zip(case)
            .map(|(&b, &upper)| {
                let c = crate::alphabet::decode(b);
                if upper {
                    c
                } else {
                    c.to_ascii_lowercase()
                }
            })
            .collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn export_after_build_is_the_identity((k, bases, case) in masked_superstring_with_k()) {
            let raw = to_mask_cased(&bases, &case);
            let ms = MaskedSuperstring::parse(&raw, Some(k)).unwrap();
            let index = build(&ms, BuildConfig::default()).unwrap();
            let exported = index.export();
            prop_assert_eq!(exported.to_mask_cased_bytes(), ms.to_mask_cased_bytes());
        }

        #[test]
        fn single_membership_matches_brute_force((k, bases, case) in masked_superstring_with_k()) {
            let raw = to_mask_cased(&bases, &case);
            let ms = MaskedSuperstring::parse(&raw, Some(k)).unwrap();
            let index = build(&ms, BuildConfig::default()).unwrap();
            let dense = ms.dense_codes();
            let mask = ms.mask();

            if dense.len() >= k {
                for i in 0..=dense.len() - k {
                    let window = &dense[i..i + k];
                    let rc = crate::alphabet::reverse_complement_sequence(window);

                    let mut any_one = false;
                    let mut any_occurrence = false;
                    for j in 0..=dense.len() - k {
                        if dense[j..j + k] == window[..] || dense[j..j + k] == rc[..] {
                            any_occurrence = true;
                            if mask[j] {
                                any_one = true;
                            }
                        }
                    }

                    let expected = if !any_occurrence {
                        -1
                    } else if any_one {
                        1
                    } else {
                        0
                    };
                    prop_assert_eq!(index.single_membership(window, false), expected, "window {i}");
                }
            }
        }
    }
}

fn acgt_runs(sequence: &[u8]) -> Vec<(usize, Vec<u8>)> {
    let mut runs = Vec::new();
    let mut current_start = None;
    let mut current: Vec<u8> = Vec::new();

    for (i, &byte) in sequence.iter().enumerate() {
        match alphabet::encode(byte) {
            Some(code) => {
                if current_start.is_none() {
                    current_start = Some(i);
                }
                current.push(code);
            }
            None => {
                if let Some(start) = current_start.take() {
                    runs.push((start, std::mem::take(&mut current)));
                }
            }
        }
    }
    if let Some(start) = current_start {
        runs.push((start, current));
    }
    runs
}
