//! The masked superstring value type (§3): `(S, m, k)`.

use crate::alphabet;
use crate::error::FmsiError;

/// An owned masked superstring: an upper-cased DNA string `S` together with
/// a mask `m` of equal length and a k-mer length `k`.
#[derive(Debug, Clone)]
pub struct MaskedSuperstring {
    sequence: Vec<u8>,
    mask: Vec<bool>,
    k: usize,
}

impl MaskedSuperstring {
    pub fn new(sequence: Vec<u8>, mask: Vec<bool>, k: usize) -> Self {
        assert_eq!(sequence.len(), mask.len());
        Self { sequence, mask, k }
    }

    /// Parses the mask-cased representation: upper case marks a represented
    /// occurrence (mask bit 1), lower case an unrepresented one (mask bit
    /// 0). Any other byte is rejected (§6 input format).
    pub fn parse(raw: &[u8], k: Option<usize>) -> Result<Self, FmsiError> {
        let mut sequence = Vec::with_capacity(raw.len());
        let mut mask = Vec::with_capacity(raw.len());

        for (position, &byte) in raw.iter().enumerate() {
            if alphabet::encode(byte).is_none() {
                return Err(FmsiError::InvalidAlphabetChar {
                    char: byte as char,
                    position,
                });
            }
            sequence.push(byte.to_ascii_uppercase());
            mask.push(byte.is_ascii_uppercase());
        }

        let k = match k {
            Some(k) => k,
            None => infer_k(&mask)?,
        };

        Ok(Self { sequence, mask, k })
    }

    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Renders back to the mask-cased textual representation (§6 input
    /// format / export).
    pub fn to_mask_cased_bytes(&self) -> Vec<u8> {
        self.sequence
            .iter()
            .zip(&self.mask)
            .map(|(&c, &represented)| {
                if represented {
                    c
                } else {
                    c.to_ascii_lowercase()
                }
            })
            .collect()
    }

    /// Dense 2-bit codes of the sequence (0..=3), for feeding into `build`.
    pub fn dense_codes(&self) -> Vec<u8> {
        self.sequence
            .iter()
            .map(|&c| alphabet::encode(c).expect("sequence was validated during parse"))
            .collect()
    }
}

/// Infers `k` from the mask's invariant: the last run of zeros has length
/// `k - 1` (the tightest case of the "`>= k - 1`" invariant in §3, which is
/// what every masked superstring produced by this crate or by `compact`
/// satisfies).
pub fn infer_k(mask: &[bool]) -> Result<usize, FmsiError> {
    if mask.is_empty() {
        return Err(FmsiError::EmptyInput {
            path: Default::default(),
        });
    }

    let trailing_zeros = mask.iter().rev().take_while(|&&b| !b).count();
    Ok(trailing_zeros + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tracks_case_as_mask() {
        let ms = MaskedSuperstring::parse(b"CaGGTag", Some(3)).unwrap();
        assert_eq!(ms.sequence(), b"CAGGTAG");
        assert_eq!(
            ms.mask(),
            &[true, false, true, true, true, false, false][..]
        );
        assert_eq!(ms.k(), 3);
    }

    #[test]
    fn rejects_invalid_characters() {
        let err = MaskedSuperstring::parse(b"ACGN", Some(3)).unwrap_err();
        assert!(matches!(err, FmsiError::InvalidAlphabetChar { .. }));
    }

    #[test]
    fn infers_k_from_trailing_zero_run() {
        assert_eq!(infer_k(&[true, false, true, false, false]).unwrap(), 3);
        assert_eq!(infer_k(&[true]).unwrap(), 1);
    }

    #[test]
    fn roundtrips_mask_cased_text() {
        let raw = b"CaGGTag";
        let ms = MaskedSuperstring::parse(raw, Some(3)).unwrap();
        assert_eq!(ms.to_mask_cased_bytes(), raw);
    }
}
