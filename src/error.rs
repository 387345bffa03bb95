use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced at the boundaries of the library (file I/O, CLI argument
/// parsing, cross-checking stored vs. requested parameters).
///
/// See the error handling policy in the crate-level documentation: hard
/// errors here always map to a non-zero process exit code, while the
/// `ParameterMismatch` soft-fallback cases (k > 64 disables streaming, `-O`
/// ignored together with `-f`) are reported via `log::warn!` instead of this
/// type.
#[derive(Debug, Error)]
pub enum FmsiError {
    #[error("could not read input file {path}: {source}")]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("input file {path} is empty")]
    EmptyInput { path: PathBuf },

    #[error("input file {path} contains more than one record, but a single masked superstring record was expected")]
    MultiRecordInput { path: PathBuf },

    #[error("invalid character {char:?} at position {position} in masked superstring (expected A/C/G/T, upper or lower case)")]
    InvalidAlphabetChar { char: char, position: usize },

    #[error("index file {path} is missing or could not be parsed: {reason}")]
    IndexCorruption { path: PathBuf, reason: String },

    #[error(
        "stored k ({stored}) does not match requested k ({requested})"
    )]
    KMismatch { stored: usize, requested: usize },

    #[error("minimal lookup requires a minimized mask (one occurrence marked per canonical k-mer); rebuild with `compact` first")]
    LookupRequiresMinimizedMask,

    #[error("streaming query requires a loaded kLCP bit vector; rebuild the index without `-x`")]
    StreamingRequiresKlcp,

    #[error("k={k} exceeds the maximum supported k-mer length of 64")]
    KTooLarge { k: usize },

    #[error("unknown demasking predicate {name:?} (expected one of: or, and, all, xor, R-S)")]
    UnknownPredicate { name: String },
}

pub type Result<T> = std::result::Result<T, FmsiError>;
