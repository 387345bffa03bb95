//! The search engine (§4.4): backward search over the bit-split BWT, range
//! extension via kLCP, and the range-to-verdict/identifier mappings used by
//! both single-k-mer and streamed queries.
//!
//! This module works purely in terms of SA ranges; [`crate::index::Index`]
//! is responsible for combining forward and reverse-complement ranges under
//! canonical semantics, chunking long sequences, and driving the strand
//! predictor.

use crate::bitvector::BitVector;
use crate::bwt::BitSplitBwt;
use crate::sa_mask::CompressedBitVector;

/// A half-open SA interval `[lo, hi)`.
pub type Range = (usize, usize);

#[inline]
fn is_empty(range: Range) -> bool {
    range.0 >= range.1
}

/// Extends the range of pattern `P` to the range of `c·P` (§4.4 "Range
/// update").
pub fn update_range(bwt: &BitSplitBwt, counts: &[usize; 4], range: Range, c: u8) -> Range {
    if is_empty(range) {
        return range;
    }
    let (lo, hi) = range;
    let base = counts[c as usize];
    (base + bwt.rank(lo, c), base + bwt.rank(hi, c))
}

/// Searches a full k-mer (dense codes, most significant symbol first) from
/// an initial full range, processing symbols right to left.
pub fn search_kmer(bwt: &BitSplitBwt, counts: &[usize; 4], codes: &[u8]) -> Range {
    let mut range: Range = (0, bwt.len());
    for &c in codes.iter().rev() {
        if is_empty(range) {
            break;
        }
        range = update_range(bwt, counts, range, c);
    }
    range
}

/// Extends `range` (representing some pattern `P`) to the range of the
/// maximal (k-1)-equivalence class containing it, using the kLCP vector.
pub fn extend_with_klcp(klcp: &BitVector, range: Range) -> Range {
    let (mut lo, mut hi) = range;

    while hi < klcp.len() && klcp.get(hi - 1) {
        hi += 1;
    }
    while lo > 0 && klcp.get(lo - 1) {
        lo -= 1;
    }

    (lo, hi)
}

/// `single_membership(pattern, maximized_ones)` (§4.4).
pub fn membership_from_range(
    sa_mask: &CompressedBitVector,
    range: Range,
    maximized_ones: bool,
) -> i8 {
    let (lo, hi) = range;
    if is_empty(range) {
        return -1;
    }
    if maximized_ones {
        return sa_mask.get(lo) as i8;
    }
    if (lo..hi).any(|i| sa_mask.get(i)) {
        1
    } else {
        0
    }
}

/// `general_counts(pattern)`: `(ones_in_range, range_size)`.
pub fn general_counts(sa_mask: &CompressedBitVector, range: Range) -> (usize, usize) {
    let (lo, hi) = range;
    if is_empty(range) {
        return (0, 0);
    }
    let ones = sa_mask.rank1(hi) - sa_mask.rank1(lo);
    (ones, hi - lo)
}

/// Minimal lookup: `kmer_order(lo)` when the k-mer is represented, else -1.
/// Requires a minimized mask (exactly one 1 per canonical k-mer class).
pub fn lookup_minimal_from_range(sa_mask: &CompressedBitVector, range: Range) -> i64 {
    let (lo, _) = range;
    if is_empty(range) || !sa_mask.get(lo) {
        return -1;
    }
    sa_mask.rank1(lo) as i64
}

/// Non-minimal lookup: the SA row itself, whenever the range is non-empty.
pub fn lookup_non_minimal_from_range(range: Range) -> i64 {
    if is_empty(range) {
        -1
    } else {
        range.0 as i64
    }
}

/// Per-window SA ranges for every length-`k` window of `codes`, computed
/// right to left with kLCP-assisted range extension (§4.4 "Streamed
/// membership / lookup", step 1). Returns one range per window, indexed by
/// window start position.
pub fn streamed_ranges(
    bwt: &BitSplitBwt,
    counts: &[usize; 4],
    klcp: &BitVector,
    codes: &[u8],
    k: usize,
) -> Vec<Range> {
    if codes.len() < k {
        return Vec::new();
    }

    let num_windows = codes.len() - k + 1;
    let mut ranges = vec![(0usize, 0usize); num_windows];

    let mut fresh = true;
    let mut range: Range = (0, bwt.len());

    for w in (0..num_windows).rev() {
        range = if fresh {
            search_kmer(bwt, counts, &codes[w..w + k])
        } else {
            let extended = extend_with_klcp(klcp, range);
            update_range(bwt, counts, extended, codes[w])
        };
        ranges[w] = range;
        fresh = is_empty(range);
    }

    ranges
}

/// Window length (in characters) for chunked streaming (§4.4 "Chunking"):
/// grows with the square root of the sequence length, clamped to
/// `[k + 10, k + 400]`.
pub fn chunk_window_length(total_len: usize, k: usize) -> usize {
    let grown = (total_len as f64).sqrt() as usize + k;
    grown.clamp(k + 10, k + 400)
}

/// Like [`streamed_ranges`], but processes `codes` in bounded chunks rather
/// than as a single run, so a long sequence can't force an unbounded amount
/// of backward-search restart work into one contiguous extension chain.
/// Each chunk is independently correct (it starts "fresh"), so chunking
/// only affects performance, never the returned ranges.
pub fn streamed_ranges_chunked(
    bwt: &BitSplitBwt,
    counts: &[usize; 4],
    klcp: &BitVector,
    codes: &[u8],
    k: usize,
) -> Vec<Range> {
    let total_len = codes.len();
    if total_len < k {
        return Vec::new();
    }

    let num_windows = total_len - k + 1;
    let chunk_char_len = chunk_window_length(total_len, k);
    let windows_per_chunk = chunk_char_len.saturating_sub(k - 1).max(1);

    let mut ranges = vec![(0usize, 0usize); num_windows];
    let mut start_w = 0;
    while start_w < num_windows {
        let end_w = (start_w + windows_per_chunk).min(num_windows);
        let chunk_ranges = streamed_ranges(bwt, counts, klcp, &codes[start_w..end_w - 1 + k], k);
        ranges[start_w..end_w].copy_from_slice(&chunk_ranges);
        start_w = end_w;
    }
    ranges
}
