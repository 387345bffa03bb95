//! The `fmsi` command-line interface (§6): one executable, one subcommand
//! per operation, dispatched through [`run`].

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::build::{build, BuildConfig};
use crate::error::{FmsiError, Result};
use crate::fasta::{read_records, read_single_record};
use crate::index::Index;
use crate::masked_superstring::MaskedSuperstring;
use crate::predicate::Predicate;
use crate::{compaction, io, set_algebra};

#[derive(Debug, Parser)]
#[command(name = "fmsi", about = "A succinct FM-index over masked superstrings of DNA k-mers", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build an index from a masked superstring and write its sibling files.
    Index {
        /// Masked-superstring input file (`-` for stdin).
        input: PathBuf,
        /// Base path for the sibling index files.
        #[arg(short = 'r', long = "output")]
        output: PathBuf,
        /// Override the k inferred from the mask's trailing zero run.
        #[arg(short = 'k')]
        k: Option<usize>,
        /// Omit the kLCP vector (disables streamed queries).
        #[arg(short = 'x')]
        no_klcp: bool,
    },
    /// Per-k-mer membership over input sequences.
    Query {
        /// Base path of the index to query.
        index: PathBuf,
        /// Sequence input (default stdin).
        #[arg(short = 'q', long = "query", default_value = "-")]
        query: PathBuf,
        /// Sanity-check k against the stored index.
        #[arg(short = 'k')]
        k: Option<usize>,
        /// Require streamed queries to use the loaded kLCP.
        #[arg(short = 'S')]
        require_klcp: bool,
        /// The caller asserts the loaded mask maximizes the number of ones.
        #[arg(short = 'O')]
        maximized_ones: bool,
        /// Demasking predicate: `or`, `all`/`and`, `xor`, or `R-S`.
        #[arg(short = 'f', default_value = "or")]
        predicate: Predicate,
        /// Flush output after every record.
        #[arg(short = 'F')]
        flush: bool,
    },
    /// Like `query`, but emits k-mer identifiers instead of 0/1 verdicts.
    Lookup {
        index: PathBuf,
        #[arg(short = 'q', long = "query", default_value = "-")]
        query: PathBuf,
        #[arg(short = 'k')]
        k: Option<usize>,
        /// Use minimal identifiers (requires a minimized mask); non-minimal otherwise.
        #[arg(short = 'm', long = "minimal")]
        minimal: bool,
        #[arg(short = 'F')]
        flush: bool,
    },
    /// Print the indexed masked superstring.
    Export { index: PathBuf },
    /// Rebuild the index after applying a demasking predicate.
    Compact {
        index: PathBuf,
        #[arg(short = 'r', long = "output")]
        output: PathBuf,
        #[arg(short = 'f', default_value = "or")]
        predicate: Predicate,
    },
    /// Concatenates several indices' masked superstrings without recompaction.
    Merge {
        #[arg(short = 'p', long = "input", required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
        #[arg(short = 'r', long = "output")]
        output: PathBuf,
    },
    /// Union of several indices' represented k-mer sets.
    Union {
        #[arg(short = 'p', long = "input", required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
        #[arg(short = 'r', long = "output")]
        output: PathBuf,
    },
    /// Intersection of several indices' represented k-mer sets.
    Inter {
        #[arg(short = 'p', long = "input", required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
        #[arg(short = 'r', long = "output")]
        output: PathBuf,
    },
    /// Set difference of exactly two indices' represented k-mer sets.
    Diff {
        #[arg(short = 'p', long = "input", required = true, num_args = 2)]
        inputs: Vec<PathBuf>,
        #[arg(short = 'r', long = "output")]
        output: PathBuf,
    },
    /// Symmetric difference of several indices' represented k-mer sets.
    Symdiff {
        #[arg(short = 'p', long = "input", required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
        #[arg(short = 'r', long = "output")]
        output: PathBuf,
    },
    /// Remove an index's sibling files.
    Clean { index: PathBuf },
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Index { input, output, k, no_klcp } => run_index(input, output, k, no_klcp),
        Command::Query {
            index,
            query,
            k,
            require_klcp,
            maximized_ones,
            predicate,
            flush,
        } => run_query(index, query, k, require_klcp, maximized_ones, predicate, flush),
        Command::Lookup {
            index,
            query,
            k,
            minimal,
            flush,
        } => run_lookup(index, query, k, minimal, flush),
        Command::Export { index } => run_export(index),
        Command::Compact { index, output, predicate } => run_compact(index, output, predicate),
        Command::Merge { inputs, output } => run_set_op(inputs, output, set_algebra::merge),
        Command::Union { inputs, output } => run_set_op(inputs, output, set_algebra::union),
        Command::Inter { inputs, output } => run_set_op(inputs, output, set_algebra::intersection),
        Command::Diff { inputs, output } => run_set_op(inputs, output, |operands| {
            set_algebra::difference(operands[0], operands[1])
        }),
        Command::Symdiff { inputs, output } => {
            run_set_op(inputs, output, set_algebra::symmetric_difference)
        }
        Command::Clean { index } => run_clean(index),
    }
}

fn run_index(input: PathBuf, output: PathBuf, k: Option<usize>, no_klcp: bool) -> Result<()> {
    let record = read_single_record(&input)?;
    let ms = MaskedSuperstring::parse(&record.sequence, k)?;
    log::info!("building index over {} bases (k={})", ms.len(), ms.k());
    let index = build(&ms, BuildConfig { build_klcp: !no_klcp })?;
    io::save(&index, &output)?;
    log::info!("wrote index sibling files to {}", output.display());
    Ok(())
}

fn load_and_check_k(index_path: &PathBuf, requested_k: Option<usize>) -> Result<Index> {
    let index = io::load(index_path)?;
    if let Some(requested) = requested_k {
        if requested != index.k() {
            return Err(FmsiError::KMismatch {
                stored: index.k(),
                requested,
            });
        }
    }
    Ok(index)
}

fn run_query(
    index_path: PathBuf,
    query_path: PathBuf,
    k: Option<usize>,
    require_klcp: bool,
    maximized_ones: bool,
    predicate: Predicate,
    flush: bool,
) -> Result<()> {
    let index = load_and_check_k(&index_path, k)?;
    if require_klcp && index.klcp().is_none() {
        return Err(FmsiError::StreamingRequiresKlcp);
    }
    if maximized_ones && predicate != Predicate::Or {
        log::warn!("-O is ignored together with -f; falling back to range scanning");
    }

    use std::io::Write;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for record in read_records(&query_path)? {
        let verdicts = index.query_sequence(&record.sequence, predicate)?;
        let rendered: String = verdicts
            .iter()
            .map(|&v| if v == 1 { '1' } else { '0' })
            .collect();
        writeln!(out, "{}\t{}", record.id, rendered).ok();
        if flush {
            out.flush().ok();
        }
    }
    Ok(())
}

fn run_lookup(
    index_path: PathBuf,
    query_path: PathBuf,
    k: Option<usize>,
    minimal: bool,
    flush: bool,
) -> Result<()> {
    let index = load_and_check_k(&index_path, k)?;

    use std::io::Write;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for record in read_records(&query_path)? {
        let identifiers = index.lookup_sequence(&record.sequence, minimal)?;
        let rendered = identifiers
            .iter()
            .map(|h| h.to_string())
            .collect::<Vec<_>>()
            .join(",");
        writeln!(out, "{}\t{}", record.id, rendered).ok();
        if flush {
            out.flush().ok();
        }
    }
    Ok(())
}

fn run_export(index_path: PathBuf) -> Result<()> {
    let index = io::load(&index_path)?;
    let ms = index.export();
    println!(">{}", index_path.display());
    println!("{}", String::from_utf8_lossy(&ms.to_mask_cased_bytes()));
    Ok(())
}

fn run_compact(index_path: PathBuf, output: PathBuf, predicate: Predicate) -> Result<()> {
    let index = io::load(&index_path)?;
    let exported = index.export();
    let compacted = compaction::compact(&exported, predicate);
    let rebuilt = build(&compacted, BuildConfig { build_klcp: index.klcp().is_some() })?;
    io::save(&rebuilt, &output)
}

fn run_set_op(
    inputs: Vec<PathBuf>,
    output: PathBuf,
    op: impl Fn(&[&MaskedSuperstring]) -> Result<MaskedSuperstring>,
) -> Result<()> {
    let indices: Vec<Index> = inputs.iter().map(|p| io::load(p)).collect::<Result<_>>()?;
    let exported: Vec<MaskedSuperstring> = indices.iter().map(Index::export).collect();
    let refs: Vec<&MaskedSuperstring> = exported.iter().collect();

    let result = op(&refs)?;
    let build_klcp = indices.iter().all(|idx| idx.klcp().is_some());
    let rebuilt = build(&result, BuildConfig { build_klcp })?;
    io::save(&rebuilt, &output)
}

fn run_clean(index_path: PathBuf) -> Result<()> {
    for suffix in ["ac_gt", "ac", "gt", "mask", "klcp", "misc"] {
        let mut name = index_path.as_os_str().to_owned();
        name.push(".fmsi.");
        name.push(suffix);
        let _ = std::fs::remove_file(PathBuf::from(name));
    }
    Ok(())
}

/// Maps an error to the process exit code from §7's policy: 1 for
/// malformed input or an unrecognized predicate, 2 for index corruption,
/// 1 for every other (parameter-mismatch) hard error.
pub fn exit_code_for(error: &FmsiError) -> i32 {
    match error {
        FmsiError::IndexCorruption { .. } => 2,
        _ => 1,
    }
}
