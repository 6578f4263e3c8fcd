//! Frequency tables aligned across sequence sets.
//!
//! Count profiles from different sets generally observe different k-mers.
//! [`TableBuilder`] puts them on a shared column vocabulary so that each row
//! can be compared cell by cell, and optionally drops rare columns.
//!
//! # Example
//!
//! ```rust
//! use kmercomp::kmer::{CountProfile, KmerLength};
//! use kmercomp::table::TableBuilder;
//!
//! let a: CountProfile = [("AA", 2), ("AB", 1)].into_iter().collect();
//! let b: CountProfile = [("AB", 3)].into_iter().collect();
//!
//! let table = TableBuilder::new().build(
//!     KmerLength::new(2)?,
//!     &[("a".to_string(), a), ("b".to_string(), b)],
//! )?;
//!
//! assert_eq!(table.columns(), ["AA", "AB"]);
//! assert_eq!(table.row(1), Some(&[0, 3][..]));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::{BTreeSet, HashSet};

use clap::ValueEnum;
use rustc_hash::FxHashMap;

use crate::{
    error::KmerCompError,
    kmer::{Alphabet, CountProfile, KmerLength},
};

#[cfg(feature = "tracing")]
use tracing::debug;

/// How the inclusion threshold is applied across rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum InclusionPolicy {
    /// Keep a column when at least one set reaches the threshold.
    #[default]
    Any,
    /// Keep a column only when every set reaches the threshold.
    All,
}

impl InclusionPolicy {
    fn keeps(self, mut counts: impl Iterator<Item = u64>, threshold: u64) -> bool {
        match self {
            Self::Any => counts.any(|c| c >= threshold),
            Self::All => counts.all(|c| c >= threshold),
        }
    }
}

/// Which k-mers make up the table's columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Vocabulary {
    /// The union of k-mers observed in any profile.
    #[default]
    Observed,
    /// Every k-mer over the alphabet, observed or not.
    Complete(Alphabet),
}

/// A set × k-mer count matrix for a single k.
///
/// Rows keep the order the sets were given in; columns are sorted k-mer
/// strings. Cells are stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyTable {
    k: KmerLength,
    rows: Vec<String>,
    columns: Vec<String>,
    cells: Vec<u64>,
}

impl FrequencyTable {
    /// Assembles a table from parts, checking that the shapes agree.
    pub(crate) fn from_parts(
        k: KmerLength,
        rows: Vec<String>,
        columns: Vec<String>,
        cells: Vec<u64>,
    ) -> Result<Self, String> {
        if cells.len() != rows.len() * columns.len() {
            return Err(format!(
                "{} cells do not fill {} rows x {} columns",
                cells.len(),
                rows.len(),
                columns.len()
            ));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = rows.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(format!("set '{dup}' appears more than once"));
        }
        Ok(Self {
            k,
            rows,
            columns,
            cells,
        })
    }

    /// The k-mer length of every column.
    #[must_use]
    pub const fn k(&self) -> KmerLength {
        self.k
    }

    /// Set names in row order.
    #[must_use]
    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    /// K-mers in column order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows.
    #[must_use]
    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    #[must_use]
    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    /// All cells, row-major.
    #[must_use]
    pub fn cells(&self) -> &[u64] {
        &self.cells
    }

    /// The counts of row `index`.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[u64]> {
        if index >= self.nrows() {
            return None;
        }
        let ncols = self.ncols();
        Some(&self.cells[index * ncols..(index + 1) * ncols])
    }

    /// The counts of the row named `name`.
    #[must_use]
    pub fn row_by_name(&self, name: &str) -> Option<&[u64]> {
        self.rows
            .iter()
            .position(|r| r == name)
            .and_then(|i| self.row(i))
    }

    /// The cell at (`row`, `column`).
    #[must_use]
    pub fn get(&self, row: usize, column: usize) -> Option<u64> {
        if column >= self.ncols() {
            return None;
        }
        self.row(row).map(|r| r[column])
    }

    /// Iterates over `(set name, counts)` pairs in row order.
    pub fn iter_rows(&self) -> impl Iterator<Item = (&str, &[u64])> + '_ {
        self.rows
            .iter()
            .enumerate()
            .filter_map(|(i, name)| self.row(i).map(|r| (name.as_str(), r)))
    }

    /// Sum of all cells.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.cells.iter().sum()
    }
}

/// Builds [`FrequencyTable`]s from per-set count profiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableBuilder {
    inclusion_threshold: Option<u64>,
    policy: InclusionPolicy,
    vocabulary: Vocabulary,
}

impl TableBuilder {
    /// A builder with no threshold and the observed vocabulary.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inclusion_threshold: None,
            policy: InclusionPolicy::Any,
            vocabulary: Vocabulary::Observed,
        }
    }

    /// Drops columns whose counts fall below `threshold` (see [`InclusionPolicy`]).
    #[must_use]
    pub const fn inclusion_threshold(mut self, threshold: Option<u64>) -> Self {
        self.inclusion_threshold = threshold;
        self
    }

    /// Sets whether any or all rows must reach the threshold.
    #[must_use]
    pub const fn policy(mut self, policy: InclusionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the column vocabulary.
    #[must_use]
    pub const fn vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    /// Aligns `profiles` into a single table.
    ///
    /// Rows follow the order of `profiles`. Every cell holds the profile's
    /// count for that column's k-mer, or zero when the set never saw it.
    ///
    /// # Errors
    ///
    /// Returns [`KmerCompError::DuplicateSet`] if two profiles share a name.
    pub fn build(
        &self,
        k: KmerLength,
        profiles: &[(String, CountProfile)],
    ) -> Result<FrequencyTable, KmerCompError> {
        let mut seen = HashSet::new();
        for (name, _) in profiles {
            if !seen.insert(name.as_str()) {
                return Err(KmerCompError::DuplicateSet { name: name.clone() });
            }
        }

        let vocabulary: Vec<String> = match self.vocabulary {
            Vocabulary::Observed => profiles
                .iter()
                .flat_map(|(_, profile)| profile.kmers())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .map(str::to_owned)
                .collect(),
            Vocabulary::Complete(alphabet) => alphabet.all_kmers(k),
        };

        let columns: Vec<String> = match self.inclusion_threshold {
            Some(threshold) => vocabulary
                .into_iter()
                .filter(|kmer| {
                    self.policy.keeps(
                        profiles.iter().map(|(_, profile)| profile.get(kmer)),
                        threshold,
                    )
                })
                .collect(),
            None => vocabulary,
        };

        let cells = profiles
            .iter()
            .flat_map(|(_, profile)| columns.iter().map(move |kmer| profile.get(kmer)))
            .collect();
        let rows = profiles.iter().map(|(name, _)| name.clone()).collect();

        #[cfg(feature = "tracing")]
        debug!(
            k = k.get(),
            rows = profiles.len(),
            columns = columns.len(),
            "Built frequency table"
        );

        Ok(FrequencyTable {
            k,
            rows,
            columns,
            cells,
        })
    }

    /// Applies this builder's vocabulary and threshold to an existing table.
    ///
    /// Every column of `table` stays a candidate, including all-zero ones.
    /// A complete vocabulary adds the missing alphabet k-mers as zero columns.
    #[must_use]
    pub fn refine(&self, table: &FrequencyTable) -> FrequencyTable {
        let index: FxHashMap<&str, usize> = table
            .columns()
            .iter()
            .enumerate()
            .map(|(i, kmer)| (kmer.as_str(), i))
            .collect();
        let cell = |row: usize, kmer: &str| {
            index
                .get(kmer)
                .and_then(|&column| table.get(row, column))
                .unwrap_or(0)
        };

        let vocabulary: Vec<String> = match self.vocabulary {
            Vocabulary::Observed => table.columns().to_vec(),
            Vocabulary::Complete(alphabet) => alphabet
                .all_kmers(table.k())
                .into_iter()
                .chain(table.columns().iter().cloned())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
        };

        let columns: Vec<String> = match self.inclusion_threshold {
            Some(threshold) => vocabulary
                .into_iter()
                .filter(|kmer| {
                    let counts = (0..table.nrows()).map(|row| cell(row, kmer.as_str()));
                    self.policy.keeps(counts, threshold)
                })
                .collect(),
            None => vocabulary,
        };

        let cells = (0..table.nrows())
            .flat_map(|row| columns.iter().map(move |kmer| cell(row, kmer.as_str())))
            .collect();

        FrequencyTable {
            k: table.k(),
            rows: table.rows().to_vec(),
            columns,
            cells,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k(k: usize) -> KmerLength {
        KmerLength::new(k).unwrap()
    }

    fn profiles() -> Vec<(String, CountProfile)> {
        vec![
            (
                "a".to_string(),
                [("AA", 2), ("AB", 1)].into_iter().collect(),
            ),
            ("b".to_string(), [("AB", 3), ("BB", 5)].into_iter().collect()),
        ]
    }

    #[test]
    fn zero_fills_union_vocabulary() {
        let table = TableBuilder::new().build(k(2), &profiles()).unwrap();
        assert_eq!(table.rows(), ["a", "b"]);
        assert_eq!(table.columns(), ["AA", "AB", "BB"]);
        assert_eq!(table.cells(), [2, 1, 0, 0, 3, 5]);
        assert_eq!(table.total(), 11);
    }

    #[test]
    fn rows_follow_input_order() {
        let mut reversed = profiles();
        reversed.reverse();
        let table = TableBuilder::new().build(k(2), &reversed).unwrap();
        assert_eq!(table.rows(), ["b", "a"]);
        assert_eq!(table.row_by_name("a"), Some(&[2, 1, 0][..]));
    }

    #[test]
    fn threshold_any_keeps_column_if_one_row_qualifies() {
        let table = TableBuilder::new()
            .inclusion_threshold(Some(3))
            .build(k(2), &profiles())
            .unwrap();
        assert_eq!(table.columns(), ["AB", "BB"]);
        assert_eq!(table.cells(), [1, 0, 3, 5]);
    }

    #[test]
    fn threshold_all_requires_every_row() {
        let table = TableBuilder::new()
            .inclusion_threshold(Some(1))
            .policy(InclusionPolicy::All)
            .build(k(2), &profiles())
            .unwrap();
        assert_eq!(table.columns(), ["AB"]);
        assert_eq!(table.cells(), [1, 3]);
    }

    #[test]
    fn complete_vocabulary_includes_unobserved_kmers() {
        let profiles = vec![
            ("a".to_string(), [("A", 2)].into_iter().collect()),
            ("b".to_string(), [("T", 1)].into_iter().collect()),
        ];
        let table = TableBuilder::new()
            .vocabulary(Vocabulary::Complete(Alphabet::Dna))
            .build(k(1), &profiles)
            .unwrap();
        assert_eq!(table.columns(), ["A", "C", "G", "T"]);
        assert_eq!(table.cells(), [2, 0, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn duplicate_set_names_are_rejected() {
        let mut dup = profiles();
        dup[1].0 = "a".to_string();
        let err = TableBuilder::new().build(k(2), &dup).unwrap_err();
        assert!(matches!(err, KmerCompError::DuplicateSet { name } if name == "a"));
    }

    #[test]
    fn accessors_are_bounds_checked() {
        let table = TableBuilder::new().build(k(2), &profiles()).unwrap();
        assert_eq!(table.get(1, 2), Some(5));
        assert_eq!(table.get(2, 0), None);
        assert_eq!(table.get(0, 3), None);
        assert_eq!(table.row(2), None);
    }

    fn with_zero_column() -> FrequencyTable {
        FrequencyTable::from_parts(
            k(2),
            vec!["a".into(), "b".into()],
            vec!["AA".into(), "AC".into(), "CA".into()],
            vec![12, 0, 3, 4, 0, 9],
        )
        .unwrap()
    }

    #[test]
    fn refine_keeps_zero_columns_at_threshold_zero() {
        let table = with_zero_column();
        let refined = TableBuilder::new()
            .inclusion_threshold(Some(0))
            .refine(&table);
        assert_eq!(refined, table);

        let unfiltered = TableBuilder::new().refine(&table);
        assert_eq!(unfiltered, table);
    }

    #[test]
    fn refine_applies_policy_to_existing_columns() {
        let table = with_zero_column();

        let any = TableBuilder::new()
            .inclusion_threshold(Some(5))
            .refine(&table);
        assert_eq!(any.columns(), ["AA", "CA"]);
        assert_eq!(any.cells(), [12, 3, 4, 9]);

        let all = TableBuilder::new()
            .inclusion_threshold(Some(4))
            .policy(InclusionPolicy::All)
            .refine(&table);
        assert_eq!(all.columns(), ["AA"]);
        assert_eq!(all.cells(), [12, 4]);
        assert_eq!(all.rows(), ["a", "b"]);
    }

    #[test]
    fn refine_with_complete_vocabulary_adds_zero_columns() {
        let table = FrequencyTable::from_parts(
            k(1),
            vec!["a".into(), "b".into()],
            vec!["T".into(), "A".into()],
            vec![1, 2, 0, 5],
        )
        .unwrap();
        let refined = TableBuilder::new()
            .vocabulary(Vocabulary::Complete(Alphabet::Dna))
            .refine(&table);
        assert_eq!(refined.columns(), ["A", "C", "G", "T"]);
        assert_eq!(refined.cells(), [2, 0, 0, 1, 5, 0, 0, 0]);
    }

    #[test]
    fn from_parts_checks_shape() {
        assert!(FrequencyTable::from_parts(
            k(1),
            vec!["a".into()],
            vec!["A".into(), "C".into()],
            vec![1]
        )
        .is_err());
    }
}
