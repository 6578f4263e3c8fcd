//! Error types for kmercomp.
//!
//! Fatal input and output problems are reported through [`KmerCompError`] and
//! end the run. Problems that only affect one k or one sequence set
//! ([`EmptyInputError`], [`ContingencyError`]) are carried as values inside the
//! report so the remaining results can still be produced.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors that can occur in kmercomp operations.
#[derive(Debug, Error)]
pub enum KmerCompError {
    /// K-mer length is not a positive integer.
    #[error("invalid k-mer length {k}: must be at least {min}")]
    InvalidKmerLength { k: usize, min: usize },

    /// Encountered a symbol outside the configured alphabet.
    #[error(
        "invalid symbol '{}' at position {position} of a sequence in '{set}'",
        char::from(*.symbol)
    )]
    InvalidSymbol {
        symbol: u8,
        position: usize,
        set: String,
    },

    /// Failed to read a sequence file.
    #[error("failed to read sequence file '{path}': {source}")]
    SequenceRead {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to parse a sequence record.
    #[error("failed to parse sequence record in '{path}': {details}")]
    SequenceParse { details: String, path: PathBuf },

    /// Failed to read an input file (count table, length registry).
    #[error("failed to read '{path}': {source}")]
    FileRead {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Structured input could not be parsed as JSON.
    #[error("'{path}' is not a valid JSON file: {source}")]
    MalformedJson {
        #[source]
        source: serde_json::Error,
        path: PathBuf,
    },

    /// A count table is not a well-formed tab-separated matrix.
    #[error("malformed count table '{path}' at line {line}: {details}")]
    MalformedTable {
        details: String,
        line: usize,
        path: PathBuf,
    },

    /// Fewer sequence sets than a comparison needs.
    #[error("expected at least {min} sequence sets, but found {found}")]
    TooFewSets { found: usize, min: usize },

    /// The same set name appears twice in one comparison.
    #[error("sequence set '{name}' appears more than once")]
    DuplicateSet { name: String },

    /// No k-mer lengths were requested.
    #[error("no k-mer lengths given")]
    NoKmerLengths,

    /// Two count tables were given for the same k.
    #[error("more than one count table has k={k}")]
    DuplicateKmerLength { k: usize },

    /// Failed to write output.
    #[error("failed to write output: {source}")]
    WriteError {
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize JSON output.
    #[error("failed to serialize JSON: {source}")]
    JsonError {
        #[source]
        source: serde_json::Error,
    },
}

/// Error for invalid k-mer length.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("k-mer length {k} is out of range: must be at least {min}")]
pub struct KmerLengthError {
    /// The invalid k value that was provided.
    pub k: usize,
    /// Minimum valid k-mer length.
    pub min: usize,
}

/// Error for a sequence symbol that is not allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidSymbolError {
    /// The invalid byte value.
    pub symbol: u8,
    /// Position of the invalid byte in the sequence.
    pub position: usize,
}

impl std::fmt::Display for InvalidSymbolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.symbol.is_ascii_graphic() || self.symbol == b' ' {
            write!(
                f,
                "invalid symbol '{}' (0x{:02x}) at position {}",
                self.symbol as char, self.symbol, self.position
            )
        } else {
            write!(
                f,
                "invalid symbol 0x{:02x} at position {}",
                self.symbol, self.position
            )
        }
    }
}

impl std::error::Error for InvalidSymbolError {}

/// Descriptive statistics were requested for an empty vector.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("cannot describe an empty count vector")]
pub struct EmptyInputError;

/// Reasons a frequency table cannot be treated as a contingency table.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ContingencyError {
    /// Fewer than two rows.
    #[error("contingency table needs at least 2 rows, found {rows}")]
    TooFewRows { rows: usize },

    /// Fewer than two columns.
    #[error("contingency table needs at least 2 columns, found {columns}")]
    TooFewColumns { columns: usize },

    /// A cell is negative or not finite.
    #[error("cell ({row}, {column}) holds {value}, expected a finite non-negative number")]
    InvalidCell { row: usize, column: usize, value: f64 },

    /// A row or column sums to zero, so an expected frequency is zero.
    #[error("the table of expected frequencies has a zero element at ({row}, {column})")]
    ZeroExpected { row: usize, column: usize },
}

impl From<std::io::Error> for KmerCompError {
    fn from(source: std::io::Error) -> Self {
        Self::WriteError { source }
    }
}

impl From<serde_json::Error> for KmerCompError {
    fn from(source: serde_json::Error) -> Self {
        Self::JsonError { source }
    }
}

impl From<KmerLengthError> for KmerCompError {
    fn from(err: KmerLengthError) -> Self {
        Self::InvalidKmerLength {
            k: err.k,
            min: err.min,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kmer_length_error_display() {
        let err = KmerLengthError { k: 0, min: 1 };
        assert_eq!(
            err.to_string(),
            "k-mer length 0 is out of range: must be at least 1"
        );
    }

    #[test]
    fn invalid_symbol_error_display() {
        let err = InvalidSymbolError {
            symbol: b'X',
            position: 5,
        };
        assert_eq!(err.to_string(), "invalid symbol 'X' (0x58) at position 5");

        let err = InvalidSymbolError {
            symbol: 0x07,
            position: 1,
        };
        assert_eq!(err.to_string(), "invalid symbol 0x07 at position 1");
    }

    #[test]
    fn kmercomp_error_from_kmer_length_error() {
        let err: KmerCompError = KmerLengthError { k: 0, min: 1 }.into();
        assert!(matches!(err, KmerCompError::InvalidKmerLength { k: 0, .. }));
    }

    #[test]
    fn invalid_symbol_names_the_set() {
        let err = KmerCompError::InvalidSymbol {
            symbol: b'*',
            position: 3,
            set: "human".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid symbol '*' at position 3 of a sequence in 'human'"
        );
    }

    #[test]
    fn contingency_error_display() {
        let err = ContingencyError::ZeroExpected { row: 0, column: 2 };
        assert_eq!(
            err.to_string(),
            "the table of expected frequencies has a zero element at (0, 2)"
        );
    }
}
