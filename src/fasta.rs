//! Minimal FASTA/FASTQ reader (§6 input contract): `index` expects exactly
//! one record, `query`/`lookup` accept several (one report per record); `-`
//! means stdin.

use std::fs;
use std::io::Read;
use std::path::Path;

use memchr::memchr;

use crate::error::{FmsiError, Result};

/// A single sequence record: just the raw header (without the leading `>`
/// or `@`) and the sequence bytes, verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: String,
    pub sequence: Vec<u8>,
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .map_err(|source| FmsiError::InputUnreadable {
                path: path.to_owned(),
                source,
            })?;
        Ok(buf)
    } else {
        fs::read(path).map_err(|source| FmsiError::InputUnreadable {
            path: path.to_owned(),
            source,
        })
    }
}

/// Parses every record out of `path`, auto-detecting FASTA (`>`) vs. FASTQ
/// (`@`) from the first non-whitespace byte.
pub fn read_records(path: &Path) -> Result<Vec<Record>> {
    let bytes = read_bytes(path)?;
    let trimmed_start = bytes.iter().position(|b| !b.is_ascii_whitespace());

    let Some(start) = trimmed_start else {
        return Err(FmsiError::EmptyInput {
            path: path.to_owned(),
        });
    };

    match bytes[start] {
        b'>' => Ok(parse_fasta(&bytes[start..])),
        b'@' => Ok(parse_fastq(&bytes[start..])),
        other => Err(FmsiError::InputUnreadable {
            path: path.to_owned(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("expected a FASTA ('>') or FASTQ ('@') record, found {other:?}"),
            ),
        }),
    }
}

/// Reads `path` and enforces the `index` subcommand's single-record rule.
pub fn read_single_record(path: &Path) -> Result<Record> {
    let mut records = read_records(path)?;
    match records.len() {
        0 => Err(FmsiError::EmptyInput {
            path: path.to_owned(),
        }),
        1 => Ok(records.remove(0)),
        _ => Err(FmsiError::MultiRecordInput {
            path: path.to_owned(),
        }),
    }
}

fn lines(bytes: &[u8]) -> impl Iterator<Item = &[u8]> {
    let mut rest = bytes;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let line = match memchr(b'\n', rest) {
            Some(i) => {
                let line = &rest[..i];
                rest = &rest[i + 1..];
                line
            }
            None => {
                let line = rest;
                rest = &[];
                line
            }
        };
        Some(strip_cr(line))
    })
}

fn strip_cr(line: &[u8]) -> &[u8] {
    match line.last() {
        Some(b'\r') => &line[..line.len() - 1],
        _ => line,
    }
}

fn parse_fasta(bytes: &[u8]) -> Vec<Record> {
    let mut records = Vec::new();
    let mut current_id: Option<String> = None;
    let mut current_seq = Vec::new();

    for line in lines(bytes) {
        if let Some(header) = line.strip_prefix(b">") {
            if let Some(id) = current_id.take() {
                records.push(Record {
                    id,
                    sequence: std::mem::take(&mut current_seq),
                });
            }
            current_id = Some(String::from_utf8_lossy(header).into_owned());
        } else {
            current_seq.extend_from_slice(line);
        }
    }
    if let Some(id) = current_id {
        records.push(Record {
            id,
            sequence: current_seq,
        });
    }
    records
}

fn parse_fastq(bytes: &[u8]) -> Vec<Record> {
    let mut records = Vec::new();
    let mut it = lines(bytes);

    while let Some(header) = it.next() {
        let Some(header) = header.strip_prefix(b"@") else {
            continue;
        };
        let Some(sequence) = it.next() else { break };
        let Some(_plus) = it.next() else { break };
        let Some(_quality) = it.next() else { break };

        records.push(Record {
            id: String::from_utf8_lossy(header).into_owned(),
            sequence: sequence.to_vec(),
        });
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multi_record_fasta_with_wrapped_lines() {
        let bytes = b">r1 desc\nACGT\nACGT\n>r2\nTTTT\n";
        let records = parse_fasta(bytes);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "r1 desc");
        assert_eq!(records[0].sequence, b"ACGTACGT");
        assert_eq!(records[1].sequence, b"TTTT");
    }

    #[test]
    fn parses_fastq_ignoring_quality() {
        let bytes = b"@read1\nACGT\n+\nIIII\n@read2\nTTTT\n+\nIIII\n";
        let records = parse_fastq(bytes);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "read1");
        assert_eq!(records[1].sequence, b"TTTT");
    }
}
