//! Set algebra over masked superstrings (§4.8): merge, union, intersection,
//! difference, and symmetric difference, all built on exporting operands,
//! concatenating them (keeping track of operand boundaries so compaction
//! never counts a boundary-straddling window as a real occurrence), and
//! running [`crate::compaction`] with the predicate that matches each
//! operation's "number of operands the k-mer is represented in" semantics.

use crate::compaction::compact_with_segments;
use crate::error::{FmsiError, Result};
use crate::masked_superstring::MaskedSuperstring;
use crate::predicate::{exactly_all_of, Predicate, EXACTLY_ONE};

/// Concatenates several masked superstrings of the same `k`, recording which
/// operand each position came from.
struct Concatenation {
    dense: Vec<u8>,
    mask: Vec<bool>,
    segment_id: Vec<u32>,
    k: usize,
}

fn concatenate(operands: &[&MaskedSuperstring]) -> Result<Concatenation> {
    let k = operands
        .first()
        .map(|ms| ms.k())
        .ok_or(FmsiError::EmptyInput {
            path: Default::default(),
        })?;

    let mut dense = Vec::new();
    let mut mask = Vec::new();
    let mut segment_id = Vec::new();

    for (id, ms) in operands.iter().enumerate() {
        if ms.k() != k {
            return Err(FmsiError::KMismatch {
                stored: ms.k(),
                requested: k,
            });
        }
        dense.extend(ms.dense_codes());
        mask.extend(ms.mask());
        segment_id.extend(std::iter::repeat(id as u32).take(ms.len()));
    }

    Ok(Concatenation {
        dense,
        mask,
        segment_id,
        k,
    })
}

/// Plain concatenation, with no recompaction: the `merge` subcommand's job
/// is just to produce one masked superstring file out of several, leaving
/// any further normalization to an explicit `compact`.
pub fn merge(operands: &[&MaskedSuperstring]) -> Result<MaskedSuperstring> {
    let concatenation = concatenate(operands)?;
    let sequence: Vec<u8> = concatenation
        .dense
        .iter()
        .map(|&c| crate::alphabet::decode(c))
        .collect();
    Ok(MaskedSuperstring::new(
        sequence,
        concatenation.mask,
        concatenation.k,
    ))
}

/// `A ∪ B ∪ ...`: a canonical k-mer is represented if it's represented in at
/// least one operand.
pub fn union(operands: &[&MaskedSuperstring]) -> Result<MaskedSuperstring> {
    compact_concatenation(operands, Predicate::Or)
}

/// `A ∩ B ∩ ...`: a canonical k-mer is represented iff it's represented in
/// every operand.
pub fn intersection(operands: &[&MaskedSuperstring]) -> Result<MaskedSuperstring> {
    compact_concatenation(operands, exactly_all_of(operands.len()))
}

/// `A ∆ B`: exclusive or, i.e. represented in an odd number of operands.
pub fn symmetric_difference(operands: &[&MaskedSuperstring]) -> Result<MaskedSuperstring> {
    compact_concatenation(operands, Predicate::Xor)
}

/// `A \ B`: represented in `A` but not in `B`. Implemented as
/// `compact(concat(A, B, B), EXACTLY_ONE)`: a k-mer represented only in `A`
/// is represented exactly once across the three copies; one represented in
/// `B` (or in both) is represented zero or two times, never one.
pub fn difference(a: &MaskedSuperstring, b: &MaskedSuperstring) -> Result<MaskedSuperstring> {
    compact_concatenation(&[a, b, b], EXACTLY_ONE)
}

fn compact_concatenation(
    operands: &[&MaskedSuperstring],
    predicate: Predicate,
) -> Result<MaskedSuperstring> {
    let concatenation = concatenate(operands)?;
    Ok(compact_with_segments(
        &concatenation.dense,
        &concatenation.mask,
        &concatenation.segment_id,
        concatenation.k,
        predicate,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet;

    fn canonical_set(ms: &MaskedSuperstring) -> std::collections::BTreeSet<u128> {
        let dense = ms.dense_codes();
        let k = ms.k();
        let mut set = std::collections::BTreeSet::new();
        if dense.len() >= k {
            for i in 0..=dense.len() - k {
                if ms.mask()[i] {
                    set.insert(alphabet::canonical(alphabet::pack(&dense[i..i + k]), k));
                }
            }
        }
        set
    }

    #[test]
    fn union_is_the_set_union_of_canonical_kmers() {
        let a = MaskedSuperstring::parse(b"ACGTA", Some(3)).unwrap();
        let b = MaskedSuperstring::parse(b"TTTAC", Some(3)).unwrap();

        let result = union(&[&a, &b]).unwrap();
        let union_set: std::collections::BTreeSet<u128> =
            canonical_set(&a).union(&canonical_set(&b)).copied().collect();
        assert_eq!(canonical_set(&result), union_set);
    }

    #[test]
    fn difference_excludes_kmers_present_in_b() {
        let a = MaskedSuperstring::parse(b"ACGTACG", Some(3)).unwrap();
        let b = MaskedSuperstring::parse(b"ACGT", Some(3)).unwrap();

        let result = difference(&a, &b).unwrap();
        let expected: std::collections::BTreeSet<u128> = canonical_set(&a)
            .difference(&canonical_set(&b))
            .copied()
            .collect();
        assert_eq!(canonical_set(&result), expected);
    }

    #[test]
    fn rejects_mismatched_k() {
        let a = MaskedSuperstring::parse(b"ACGTA", Some(3)).unwrap();
        let b = MaskedSuperstring::parse(b"ACGTA", Some(4)).unwrap();
        assert!(matches!(union(&[&a, &b]), Err(FmsiError::KMismatch { .. })));
    }
}
