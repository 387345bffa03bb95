//! The kLCP bit vector (§4.5 step 5, §9 Design Notes).
//!
//! `KLCP[i] = 1` iff the length-`(k-1)` prefixes of the suffixes ranked `i`
//! and `i+1` are equal and both suffixes have at least `k - 1` remaining
//! characters. Built directly from the in-memory suffix array and text
//! during construction (the simpler of the two valid strategies the Design
//! Notes allow, trading a little build-time CPU for not needing the
//! packed-sample reconstruction scheme).

use rayon::prelude::*;

use crate::bitvector::BitVector;

/// Builds the kLCP vector for dense text `text` (length `n`, codes 0..=3,
/// sentinel-less) given its suffix array `sa` (length `n + 1`, sentinel
/// included) and k-mer length `k`.
pub fn build_klcp(text: &[u8], sa: &[i32], k: usize) -> BitVector {
    let n = text.len();
    let prefix_len = k - 1;

    BitVector::from_bits_parallel(n + 1, |i| {
        if i >= n {
            return false;
        }

        let p1 = sa[i] as usize;
        let p2 = sa[i + 1] as usize;

        if p1 + prefix_len > n || p2 + prefix_len > n {
            return false;
        }

        text[p1..p1 + prefix_len] == text[p2..p2 + prefix_len]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_spec_example() {
        // "CACACat", k=3. Dense codes: C=1 A=0 C=1 A=0 C=1 a(A)=0 t(T)=3
        let text = [1u8, 0, 1, 0, 1, 0, 3];
        // suffix array of "CACACAT$" (case-folded, sentinel smallest)
        // suffixes: 0:CACACAT 1:ACACAT 2:CACAT 3:ACAT 4:CAT 5:AT 6:T 7:(empty)
        // sorted: "" < ACACAT < ACAT < AT < CACACAT < CACAT < CAT < T
        let sa = [7, 1, 3, 5, 0, 2, 4, 6];
        let klcp = build_klcp(&text, &sa, 3);

        let expected = [false, true, false, false, true, true, false, false];
        for i in 0..8 {
            assert_eq!(klcp.get(i), expected[i], "klcp[{i}]");
        }
    }
}
