//! Input readers: FASTA sequence sets, count tables and length registries.
//!
//! FASTA parsing uses rust-bio by default, or needletail with the
//! `needletail` feature. With the `gzip` feature, paths ending in `.gz` are
//! decompressed on the fly.

use std::{
    collections::HashSet,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use bytes::Bytes;

use crate::{
    aggregate::SequenceSet,
    error::{InvalidSymbolError, KmerCompError},
    kmer::{Alphabet, KmerLength, Sequence},
    lengths::SequenceLengths,
    table::FrequencyTable,
};

#[cfg(feature = "tracing")]
use tracing::debug;

/// Derives a set name from a file path.
///
/// The basename loses a trailing `.gz` and its last extension, and keeps at
/// most its first two dot-separated parts, so
/// `UP000005640.human.proteome.fasta.gz` becomes `UP000005640.human`.
///
/// ```rust
/// use kmercomp::reader::set_name;
///
/// assert_eq!(set_name("data/UP000005640.human.proteome.fasta.gz"), "UP000005640.human");
/// assert_eq!(set_name("mouse.fa"), "mouse");
/// ```
pub fn set_name<P: AsRef<Path>>(path: P) -> String {
    let file_name = path
        .as_ref()
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let stem = file_name.strip_suffix(".gz").unwrap_or(&file_name);
    let stem = match stem.rsplit_once('.') {
        Some((head, _)) if !head.is_empty() => head,
        _ => stem,
    };
    stem.splitn(3, '.').take(2).collect::<Vec<_>>().join(".")
}

#[cfg(all(not(feature = "needletail"), feature = "gzip"))]
fn is_gzip_path(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

fn open(path: &Path) -> Result<File, KmerCompError> {
    File::open(path).map_err(|source| KmerCompError::SequenceRead {
        source,
        path: path.to_path_buf(),
    })
}

#[cfg(not(feature = "needletail"))]
fn read_fasta<R: std::io::Read>(reader: R, path: &Path) -> Result<Vec<Bytes>, KmerCompError> {
    bio::io::fasta::Reader::new(reader)
        .records()
        .map(|record| {
            record
                .map(|r| Bytes::copy_from_slice(r.seq()))
                .map_err(|e| KmerCompError::SequenceParse {
                    details: e.to_string(),
                    path: path.to_path_buf(),
                })
        })
        .collect()
}

#[cfg(all(not(feature = "needletail"), not(feature = "gzip")))]
fn read_residues(path: &Path) -> Result<Vec<Bytes>, KmerCompError> {
    read_fasta(BufReader::new(open(path)?), path)
}

#[cfg(all(not(feature = "needletail"), feature = "gzip"))]
fn read_residues(path: &Path) -> Result<Vec<Bytes>, KmerCompError> {
    use flate2::read::GzDecoder;

    let file = open(path)?;
    if is_gzip_path(path) {
        read_fasta(BufReader::new(GzDecoder::new(file)), path)
    } else {
        read_fasta(BufReader::new(file), path)
    }
}

#[cfg(feature = "needletail")]
fn read_residues(path: &Path) -> Result<Vec<Bytes>, KmerCompError> {
    // needletail detects compression and FASTA/FASTQ on its own.
    let parse_error = |e: needletail::errors::ParseError| KmerCompError::SequenceParse {
        details: e.to_string(),
        path: path.to_path_buf(),
    };
    let mut reader = needletail::parse_fastx_reader(open(path)?).map_err(parse_error)?;
    let mut residues = Vec::new();
    while let Some(record) = reader.next() {
        let record = record.map_err(parse_error)?;
        residues.push(Bytes::copy_from_slice(&record.seq()));
    }
    Ok(residues)
}

/// Reads every record of a FASTA file into a [`SequenceSet`] named after the
/// file (see [`set_name`]).
///
/// Records with no residues are skipped. When `alphabet` is given, every
/// residue must belong to it.
///
/// # Errors
///
/// Returns [`KmerCompError::SequenceRead`] or [`KmerCompError::SequenceParse`]
/// if the file cannot be read, and [`KmerCompError::InvalidSymbol`] for a
/// non-ASCII residue or one outside `alphabet`.
pub fn read_sequence_set<P: AsRef<Path>>(
    path: P,
    alphabet: Option<Alphabet>,
) -> Result<SequenceSet, KmerCompError> {
    let path = path.as_ref();
    let name = set_name(path);

    let invalid = |err: InvalidSymbolError| KmerCompError::InvalidSymbol {
        symbol: err.symbol,
        position: err.position,
        set: name.clone(),
    };

    let mut sequences = Vec::new();
    for residues in read_residues(path)? {
        if residues.is_empty() {
            continue;
        }
        if let Some(alphabet) = alphabet {
            alphabet.validate(&residues).map_err(invalid)?;
        }
        sequences.push(Sequence::new(residues).map_err(invalid)?);
    }

    #[cfg(feature = "tracing")]
    debug!(set = %name, sequences = sequences.len(), "Read sequence set");

    Ok(SequenceSet::new(name, sequences))
}

/// Reads a length registry: a JSON object mapping set names to lengths.
///
/// # Errors
///
/// Returns [`KmerCompError::FileRead`] if the file cannot be opened and
/// [`KmerCompError::MalformedJson`] if it is not such an object.
pub fn read_lengths<P: AsRef<Path>>(path: P) -> Result<SequenceLengths, KmerCompError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| KmerCompError::FileRead {
        source,
        path: path.to_path_buf(),
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| KmerCompError::MalformedJson {
        source,
        path: path.to_path_buf(),
    })
}

/// Reads a tab-separated count table.
///
/// The header's first cell labels the set column and every further cell is a
/// k-mer; k is taken from their common length. Each following non-blank line
/// holds a set name and one integer count per k-mer.
///
/// # Errors
///
/// Returns [`KmerCompError::FileRead`] if the file cannot be read and
/// [`KmerCompError::MalformedTable`] for a missing header, k-mers of
/// unequal length, repeated k-mers or set names, ragged rows, or cells that
/// are not non-negative integers.
pub fn read_count_table<P: AsRef<Path>>(path: P) -> Result<FrequencyTable, KmerCompError> {
    let path = path.as_ref();
    let file_error = |source| KmerCompError::FileRead {
        source,
        path: path.to_path_buf(),
    };
    let malformed = |line: usize, details: String| KmerCompError::MalformedTable {
        details,
        line,
        path: path.to_path_buf(),
    };

    let reader = BufReader::new(File::open(path).map_err(file_error)?);
    let mut lines = reader.lines().enumerate();

    let (_, header) = lines
        .next()
        .ok_or_else(|| malformed(1, "missing header row".to_string()))?;
    let header = header.map_err(file_error)?;
    let columns: Vec<String> = header
        .trim_end_matches('\r')
        .split('\t')
        .skip(1)
        .map(str::to_owned)
        .collect();

    let width = columns.first().map_or(0, String::len);
    if columns.iter().any(|kmer| kmer.len() != width) {
        return Err(malformed(1, "k-mer columns differ in length".to_string()));
    }
    let mut seen = HashSet::new();
    if let Some(dup) = columns.iter().find(|kmer| !seen.insert(kmer.as_str())) {
        return Err(malformed(1, format!("k-mer '{dup}' appears more than once")));
    }
    let k = KmerLength::new(width)
        .map_err(|_| malformed(1, "header has no k-mer columns".to_string()))?;

    let mut rows = Vec::new();
    let mut cells = Vec::new();
    for (index, line) in lines {
        let line_no = index + 1;
        let line = line.map_err(file_error)?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let mut fields = line.split('\t');
        let name = fields.next().unwrap_or_default().to_string();
        let start = cells.len();
        for field in fields {
            let count = field.trim().parse::<u64>().map_err(|_| {
                malformed(line_no, format!("'{field}' is not a non-negative integer count"))
            })?;
            cells.push(count);
        }
        if cells.len() - start != columns.len() {
            return Err(malformed(
                line_no,
                format!(
                    "expected {} counts for '{name}', found {}",
                    columns.len(),
                    cells.len() - start
                ),
            ));
        }
        rows.push(name);
    }

    FrequencyTable::from_parts(k, rows, columns, cells).map_err(|details| malformed(1, details))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    fn temp_file(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn set_name_strips_extensions() {
        assert_eq!(set_name("a/b/human.fasta"), "human");
        assert_eq!(set_name("human.fasta.gz"), "human");
        assert_eq!(set_name("UP1.mouse.fasta"), "UP1.mouse");
        assert_eq!(set_name("UP1.mouse.v2.fasta"), "UP1.mouse");
        assert_eq!(set_name("noext"), "noext");
        assert_eq!(set_name(".hidden"), ".hidden");
    }

    #[test]
    fn reads_multiline_records_and_skips_empty_ones() {
        let file = temp_file(".fa", ">s1\nACG\nTA\n>empty\n>s2\nGG\n");
        let set = read_sequence_set(file.path(), None).unwrap();
        let seqs: Vec<&[u8]> = set.sequences().iter().map(Sequence::as_bytes).collect();
        assert_eq!(seqs, [b"ACGTA".as_slice(), b"GG".as_slice()]);
        assert_eq!(set.total_length(), 7);
    }

    #[test]
    fn alphabet_validation_names_the_set() {
        let file = temp_file(".fa", ">s1\nACGX\n");
        let err = read_sequence_set(file.path(), Some(Alphabet::Dna)).unwrap_err();
        assert!(matches!(
            err,
            KmerCompError::InvalidSymbol { symbol: b'X', position: 3, .. }
        ));
        assert!(read_sequence_set(file.path(), None).is_ok());
    }

    #[test]
    fn missing_fasta_is_a_read_error() {
        let err = read_sequence_set("/nonexistent/x.fa", None).unwrap_err();
        assert!(matches!(err, KmerCompError::SequenceRead { .. }));
    }

    #[test]
    fn reads_count_table() {
        let file = temp_file(".tsv", "set\tAA\tAB\na\t2\t1\nb\t0\t3\n\n");
        let table = read_count_table(file.path()).unwrap();
        assert_eq!(table.k().get(), 2);
        assert_eq!(table.rows(), ["a", "b"]);
        assert_eq!(table.columns(), ["AA", "AB"]);
        assert_eq!(table.cells(), [2, 1, 0, 3]);
    }

    #[test]
    fn count_table_rejects_ragged_rows() {
        let file = temp_file(".tsv", "set\tAA\tAB\na\t2\n");
        let err = read_count_table(file.path()).unwrap_err();
        assert!(matches!(err, KmerCompError::MalformedTable { line: 2, .. }));
    }

    #[test]
    fn count_table_rejects_mixed_kmer_lengths() {
        let file = temp_file(".tsv", "set\tAA\tABC\na\t2\t1\n");
        let err = read_count_table(file.path()).unwrap_err();
        assert!(matches!(err, KmerCompError::MalformedTable { line: 1, .. }));
    }

    #[test]
    fn count_table_rejects_non_integer_cells() {
        let file = temp_file(".tsv", "set\tA\tC\na\t2\t-1\n");
        let err = read_count_table(file.path()).unwrap_err();
        assert!(err.to_string().contains("'-1'"));
    }

    #[test]
    fn count_table_rejects_duplicate_sets() {
        let file = temp_file(".tsv", "set\tA\tC\na\t2\t1\na\t0\t1\n");
        assert!(matches!(
            read_count_table(file.path()),
            Err(KmerCompError::MalformedTable { .. })
        ));
    }

    #[test]
    fn reads_lengths_registry() {
        let file = temp_file(".json", r#"{"a": 10, "b": 0}"#);
        let lengths = read_lengths(file.path()).unwrap();
        assert_eq!(lengths.length_of("a"), 10);
        assert_eq!(lengths.length_of("b"), 1);
    }

    #[test]
    fn malformed_lengths_registry() {
        let file = temp_file(".json", r#"{"a": -3}"#);
        assert!(matches!(
            read_lengths(file.path()),
            Err(KmerCompError::MalformedJson { .. })
        ));
    }
}
