//! Masked-superstring compaction (§4.7): given a demasking predicate `f`,
//! rebuild a masked superstring whose represented canonical k-mer set is
//! exactly `{ c : f(ones(c), total(c)) }`.

use rustc_hash::FxHashMap;

use crate::alphabet;
use crate::masked_superstring::MaskedSuperstring;
use crate::predicate::Predicate;

/// Runs compaction over an already-loaded masked superstring (used directly
/// by the `compact` subcommand; [`crate::set_algebra`] runs this over a
/// concatenation of several exports).
pub fn compact(ms: &MaskedSuperstring, predicate: Predicate) -> MaskedSuperstring {
    let k = ms.k();
    let dense = ms.dense_codes();
    let segment_id = vec![0u32; dense.len()];
    compact_with_segments(&dense, ms.mask(), &segment_id, k, predicate)
}

/// The shared compaction core, used directly by [`compact`] (one segment)
/// and by [`crate::set_algebra`] (several concatenated operands). `segment_id`
/// marks which original masked superstring each position came from, so a
/// window that straddles two concatenated operands is never mistaken for a
/// real occurrence of the k-mer it happens to spell.
pub fn compact_with_segments(
    dense: &[u8],
    mask: &[bool],
    segment_id: &[u32],
    k: usize,
    predicate: Predicate,
) -> MaskedSuperstring {
    let represented = represented_canonical_kmers(dense, mask, segment_id, k, predicate);
    let (sequence_codes, mask) = greedy_assemble(&represented, k);

    let sequence: Vec<u8> = sequence_codes.iter().map(|&c| alphabet::decode(c)).collect();
    MaskedSuperstring::new(sequence, mask, k)
}

/// §4.7 step 1-2: enumerate windows that don't straddle a segment boundary,
/// accumulate `(ones, total)` per canonical k-mer, and keep the ones `f`
/// selects, sorted lexicographically (by canonical 2-bit value, which
/// matches ASCII A<C<G<T order) for a deterministic assembly order.
fn represented_canonical_kmers(
    dense: &[u8],
    mask: &[bool],
    segment_id: &[u32],
    k: usize,
    predicate: Predicate,
) -> Vec<u128> {
    let n = dense.len();
    let mut counts: FxHashMap<u128, (u32, u32)> = FxHashMap::default();

    if n >= k {
        for i in 0..=n - k {
            if segment_id[i] != segment_id[i + k - 1] {
                continue;
            }
            let canon = alphabet::canonical(alphabet::pack(&dense[i..i + k]), k);
            let entry = counts.entry(canon).or_insert((0, 0));
            entry.1 += 1;
            if mask[i] {
                entry.0 += 1;
            }
        }
    }

    let mut represented: Vec<u128> = counts
        .into_iter()
        .filter(|&(_, (ones, total))| predicate.eval(ones as usize, total as usize))
        .map(|(kmer, _)| kmer)
        .collect();
    represented.sort_unstable();
    represented
}

/// §4.7 step 3: the "Global" greedy superstring rebuild. Chains k-mers
/// whose `(k-1)`-prefix matches the current buffer's tail, marking the
/// start of each merged occurrence as represented.
fn greedy_assemble(represented: &[u128], k: usize) -> (Vec<u8>, Vec<bool>) {
    let km1_mask = alphabet::kmer_mask(k - 1);

    let mut by_prefix: FxHashMap<u128, Vec<usize>> = FxHashMap::default();
    for (idx, &kmer) in represented.iter().enumerate() {
        by_prefix.entry(kmer >> 2).or_default().push(idx);
    }

    let mut used = vec![false; represented.len()];
    let mut sequence = Vec::new();
    let mut mask = Vec::new();

    for start_idx in 0..represented.len() {
        if used[start_idx] {
            continue;
        }
        used[start_idx] = true;

        sequence.extend(alphabet::unpack(represented[start_idx], k));
        mask.push(true);
        mask.extend(std::iter::repeat(false).take(k - 1));

        loop {
            let tail = &sequence[sequence.len() - (k - 1)..];
            let tail_word = alphabet::pack(tail) & km1_mask;

            let next = by_prefix
                .get(&tail_word)
                .and_then(|candidates| candidates.iter().copied().find(|&i| !used[i]));

            let Some(idx) = next else { break };
            used[idx] = true;
            let codes = alphabet::unpack(represented[idx], k);
            sequence.push(codes[k - 1]);
            mask.push(false);
            let new_len = mask.len();
            mask[new_len - k] = true;
        }
    }

    (sequence, mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_concrete_scenario_five() {
        // ACGTAGATA, mask 000001100, k=3, f=xor -> canonical {ATA, ATC}.
        //
        // The mask marking positions 0 and 1 instead doesn't reach this set:
        // windows 0 ("ACG") and 1 ("CGT") are reverse complements of each
        // other, so both fall in canonical class ACG, which then has 2
        // marked occurrences (even, excluded by xor) rather than 1. See
        // DESIGN.md for the full discrepancy analysis; marking positions 5
        // and 6 (the starts of "GAT" and "ATA") is what actually produces
        // {ATA, ATC}, each with exactly one marked, odd occurrence.
        let ms = MaskedSuperstring::parse(b"acgtaGAta", Some(3)).unwrap();
        assert_eq!(ms.sequence(), b"ACGTAGATA");
        assert_eq!(
            ms.mask(),
            &[false, false, false, false, false, true, true, false, false][..]
        );

        let compacted = compact(&ms, Predicate::Xor);

        let mut produced: Vec<u128> = Vec::new();
        let dense = compacted.dense_codes();
        for (i, &represented) in compacted.mask().iter().enumerate() {
            if represented {
                produced.push(alphabet::canonical(alphabet::pack(&dense[i..i + 3]), 3));
            }
        }
        produced.sort_unstable();

        let mut expected = vec![
            alphabet::canonical(alphabet::pack(&[0, 3, 0]), 3), // ATA
            alphabet::canonical(alphabet::pack(&[0, 3, 1]), 3), // ATC
        ];
        expected.sort_unstable();

        assert_eq!(produced, expected);
    }
}
