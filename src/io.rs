//! On-disk index format (§6): a handful of sibling files next to a base
//! path, `<path>.fmsi.{ac_gt,ac,gt,mask,klcp,misc}`. Chosen over a single
//! archive so each component can be memory-mapped or regenerated
//! independently; see DESIGN.md for why this hand-rolled format is used
//! instead of a general serialization crate.

use std::convert::TryInto;
use std::fs;
use std::path::{Path, PathBuf};

use crate::bitvector::BitVector;
use crate::bwt::BitSplitBwt;
use crate::error::{FmsiError, Result};
use crate::index::Index;
use crate::sa_mask::CompressedBitVector;

fn sibling(base: &Path, suffix: &str) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(".fmsi.");
    name.push(suffix);
    PathBuf::from(name)
}

fn corrupt(path: &Path, reason: impl Into<String>) -> FmsiError {
    FmsiError::IndexCorruption {
        path: path.to_owned(),
        reason: reason.into(),
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| FmsiError::InputUnreadable {
        path: path.to_owned(),
        source,
    })
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).map_err(|source| FmsiError::InputUnreadable {
        path: path.to_owned(),
        source,
    })
}

fn write_bitvector(path: &Path, bv: &BitVector) -> Result<()> {
    let mut bytes = Vec::with_capacity(8 + bv.words().len() * 8);
    bytes.extend_from_slice(&(bv.len() as u64).to_le_bytes());
    bytes.extend_from_slice(bytemuck::cast_slice(bv.words()));
    write_file(path, &bytes)
}

fn read_bitvector(path: &Path) -> Result<BitVector> {
    let bytes = read_file(path)?;
    if bytes.len() < 8 {
        return Err(corrupt(path, "truncated bit vector header"));
    }
    let len = u64::from_le_bytes(bytes[0..8].try_into().unwrap()) as usize;
    let word_bytes = &bytes[8..];
    if word_bytes.len() % 8 != 0 {
        return Err(corrupt(path, "bit vector word data is misaligned"));
    }
    let words: &[u64] = bytemuck::try_cast_slice(word_bytes)
        .map_err(|_| corrupt(path, "bit vector word data is misaligned"))?;
    Ok(BitVector::from_words(words.to_vec(), len))
}

fn write_sa_mask(path: &Path, sa_mask: &CompressedBitVector) -> Result<()> {
    let run_lengths = sa_mask.run_lengths();
    let mut bytes = Vec::with_capacity(17 + run_lengths.len() * 4);
    bytes.push(sa_mask.first_bit() as u8);
    bytes.extend_from_slice(&(sa_mask.len() as u64).to_le_bytes());
    bytes.extend_from_slice(&(run_lengths.len() as u64).to_le_bytes());
    bytes.extend_from_slice(bytemuck::cast_slice(run_lengths));
    write_file(path, &bytes)
}

fn read_sa_mask(path: &Path) -> Result<CompressedBitVector> {
    let bytes = read_file(path)?;
    if bytes.len() < 17 {
        return Err(corrupt(path, "truncated sa_mask header"));
    }
    let first_bit = bytes[0] != 0;
    let len = u64::from_le_bytes(bytes[1..9].try_into().unwrap()) as usize;
    let run_count = u64::from_le_bytes(bytes[9..17].try_into().unwrap()) as usize;
    let run_bytes = &bytes[17..];
    if run_bytes.len() != run_count * 4 {
        return Err(corrupt(path, "sa_mask run-length data is misaligned"));
    }
    let run_lengths: Vec<u32> = bytemuck::try_cast_slice(run_bytes)
        .map_err(|_| corrupt(path, "sa_mask run-length data is misaligned"))?
        .to_vec();
    Ok(CompressedBitVector::from_runs(first_bit, run_lengths, len))
}

/// `dollar_position`, then `counts[0..3]`, then `k` (§6's documented order),
/// followed by two implementation-only trailing lines (`has_klcp`,
/// `is_minimized`) that §6 doesn't name but that round-tripping needs.
fn write_misc(path: &Path, index: &Index) -> Result<()> {
    let counts = index.counts_array();
    let text = format!(
        "{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n",
        index.dollar_position(),
        counts[0],
        counts[1],
        counts[2],
        counts[3],
        index.k(),
        index.klcp().is_some() as u8,
        index.is_minimized() as u8,
    );
    write_file(path, text.as_bytes())
}

struct Misc {
    dollar_position: usize,
    k: usize,
    counts: [usize; 4],
    has_klcp: bool,
    is_minimized: bool,
}

fn read_misc(path: &Path) -> Result<Misc> {
    let bytes = read_file(path)?;
    let text = std::str::from_utf8(&bytes).map_err(|_| corrupt(path, "misc file is not UTF-8"))?;
    let mut lines = text.lines();
    let mut next = |field: &str| -> Result<&str> {
        lines
            .next()
            .ok_or_else(|| corrupt(path, format!("missing field {field}")))
    };
    let parse = |field: &str, s: &str| -> Result<usize> {
        s.parse()
            .map_err(|_| corrupt(path, format!("field {field} is not a number: {s:?}")))
    };

    let dollar_position = parse("dollar_position", next("dollar_position")?)?;
    let counts = [
        parse("counts[0]", next("counts[0]")?)?,
        parse("counts[1]", next("counts[1]")?)?,
        parse("counts[2]", next("counts[2]")?)?,
        parse("counts[3]", next("counts[3]")?)?,
    ];
    let k = parse("k", next("k")?)?;
    let has_klcp = parse("has_klcp", next("has_klcp")?)? != 0;
    let is_minimized = parse("is_minimized", next("is_minimized")?)? != 0;

    Ok(Misc {
        dollar_position,
        k,
        counts,
        has_klcp,
        is_minimized,
    })
}

/// Writes every sibling file for `index` under `base`.
pub fn save(index: &Index, base: &Path) -> Result<()> {
    write_bitvector(&sibling(base, "ac_gt"), index.bwt().ac_gt())?;
    write_bitvector(&sibling(base, "ac"), index.bwt().ac())?;
    write_bitvector(&sibling(base, "gt"), index.bwt().gt())?;
    write_sa_mask(&sibling(base, "mask"), index.sa_mask())?;
    if let Some(klcp) = index.klcp() {
        write_bitvector(&sibling(base, "klcp"), klcp)?;
    }
    write_misc(&sibling(base, "misc"), index)
}

/// Loads an index back from the sibling files under `base`.
pub fn load(base: &Path) -> Result<Index> {
    let misc = read_misc(&sibling(base, "misc"))?;

    let ac_gt = read_bitvector(&sibling(base, "ac_gt"))?;
    let ac = read_bitvector(&sibling(base, "ac"))?;
    let gt = read_bitvector(&sibling(base, "gt"))?;
    let bwt = BitSplitBwt::new(ac_gt, ac, gt, misc.dollar_position);

    let sa_mask = read_sa_mask(&sibling(base, "mask"))?;

    let klcp_path = sibling(base, "klcp");
    let klcp = if misc.has_klcp {
        Some(read_bitvector(&klcp_path)?)
    } else {
        None
    };

    Ok(Index::new(
        bwt,
        sa_mask,
        misc.counts,
        misc.dollar_position,
        klcp,
        misc.k,
        misc.is_minimized,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{build, BuildConfig};
    use crate::masked_superstring::MaskedSuperstring;

    #[test]
    fn roundtrips_through_a_temp_directory() {
        let ms = MaskedSuperstring::parse(b"CaGGTag", Some(3)).unwrap();
        let index = build(&ms, BuildConfig::default()).unwrap();

        let dir = std::env::temp_dir().join(format!("fmsi-io-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let base = dir.join("idx");

        save(&index, &base).unwrap();
        let loaded = load(&base).unwrap();

        assert_eq!(loaded.counts(), index.counts());
        assert_eq!(loaded.dollar_position(), index.dollar_position());
        assert_eq!(loaded.k(), index.k());
        assert_eq!(loaded.is_minimized(), index.is_minimized());
        assert_eq!(loaded.export().to_mask_cased_bytes(), index.export().to_mask_cased_bytes());

        for suffix in ["ac_gt", "ac", "gt", "mask", "klcp", "misc"] {
            let _ = fs::remove_file(sibling(&base, suffix));
        }
        let _ = fs::remove_dir(&dir);
    }
}
