//! The demasking predicate `f(ones, total) -> bool` that defines which
//! canonical k-mers a query, a compaction, or a set operation represents.
//!
//! The predicate is a property of the query, not of the index: the index
//! always stores `S`, `m`, `k` verbatim.

use std::str::FromStr;

use crate::error::FmsiError;

/// A demasking predicate, named after the CLI `-f` flag values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// At least one occurrence is represented.
    Or,
    /// Every occurrence is represented.
    And,
    /// An odd number of occurrences are represented.
    Xor,
    /// The number of represented occurrences lies in `[r, s]`.
    RangeRS { r: usize, s: usize },
}

impl Predicate {
    pub fn eval(self, ones: usize, total: usize) -> bool {
        match self {
            Predicate::Or => ones > 0,
            Predicate::And => ones == total,
            Predicate::Xor => ones % 2 == 1,
            Predicate::RangeRS { r, s } => ones >= r && ones <= s,
        }
    }
}

impl FromStr for Predicate {
    type Err = FmsiError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "or" => Ok(Predicate::Or),
            "and" | "all" => Ok(Predicate::And),
            "xor" => Ok(Predicate::Xor),
            other => parse_range(other).ok_or_else(|| FmsiError::UnknownPredicate {
                name: other.to_string(),
            }),
        }
    }
}

fn parse_range(name: &str) -> Option<Predicate> {
    let (r_str, s_str) = name.split_once('-')?;
    let r = r_str.parse().ok()?;
    let s = s_str.parse().ok()?;
    Some(Predicate::RangeRS { r, s })
}

/// `1-1`: selects entries with exactly one represented occurrence. Used by
/// the set-difference algebra (§4.8): after concatenating `[A, B, B]`, a
/// k-mer exclusive to `A` has exactly one marked occurrence.
pub const EXACTLY_ONE: Predicate = Predicate::RangeRS { r: 1, s: 1 };

/// `m-m`, where `m` is the number of concatenated indices: selects entries
/// represented in every operand. Used by intersection.
pub fn exactly_all_of(m: usize) -> Predicate {
    Predicate::RangeRS { r: m, s: m }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_predicates() {
        assert_eq!("or".parse::<Predicate>().unwrap(), Predicate::Or);
        assert_eq!("and".parse::<Predicate>().unwrap(), Predicate::And);
        assert_eq!("all".parse::<Predicate>().unwrap(), Predicate::And);
        assert_eq!("xor".parse::<Predicate>().unwrap(), Predicate::Xor);
    }

    #[test]
    fn parses_range_predicate() {
        assert_eq!(
            "2-5".parse::<Predicate>().unwrap(),
            Predicate::RangeRS { r: 2, s: 5 }
        );
    }

    #[test]
    fn rejects_unknown_predicate() {
        assert!("bogus".parse::<Predicate>().is_err());
    }

    #[test]
    fn eval_semantics() {
        assert!(Predicate::Or.eval(1, 3));
        assert!(!Predicate::Or.eval(0, 3));
        assert!(Predicate::And.eval(3, 3));
        assert!(!Predicate::And.eval(2, 3));
        assert!(Predicate::Xor.eval(1, 4));
        assert!(!Predicate::Xor.eval(2, 4));
        assert!(EXACTLY_ONE.eval(1, 2));
        assert!(!EXACTLY_ONE.eval(2, 2));
    }
}
