//! Builder pattern API for running a comparison end to end.
//!
//! [`Comparison`] collects the k values and analysis settings, then counts,
//! aligns and analyzes sequence sets for every k in parallel.
//!
//! # Example
//!
//! ```rust,no_run
//! use kmercomp::builder::Comparison;
//!
//! let report = Comparison::new()
//!     .k(2)?
//!     .k(3)?
//!     .inclusion_threshold(5)
//!     .run_files(&["human.fasta", "mouse.fasta"])?;
//!
//! report.write_artifacts("results")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{collections::HashSet, path::Path};

use rayon::prelude::*;

use crate::{
    aggregate::{aggregate, SequenceSet},
    association::ContingencyValues,
    config::AnalysisConfig,
    error::{KmerCompError, KmerLengthError},
    kmer::{Alphabet, CountProfile, KmerLength},
    lengths::SequenceLengths,
    reader::read_sequence_set,
    report::{ComparisonReport, KmerResult},
    stats::RangeMode,
    table::{FrequencyTable, InclusionPolicy, Vocabulary},
};

#[cfg(feature = "tracing")]
use tracing::{info, info_span, warn};

/// Smallest number of sets a comparison accepts.
pub const MIN_SETS: usize = 2;

/// A builder for configuring and running k-mer comparisons.
///
/// Use [`Comparison::new()`] to create a builder, add k values and settings
/// with the fluent API, then call [`run()`](Comparison::run),
/// [`run_files()`](Comparison::run_files) or
/// [`analyze()`](Comparison::analyze).
///
/// # Example
///
/// ```rust
/// use kmercomp::aggregate::SequenceSet;
/// use kmercomp::builder::Comparison;
/// use kmercomp::kmer::Sequence;
///
/// let human = SequenceSet::new("human", vec![Sequence::new("MKVLAAGIV")?]);
/// let mouse = SequenceSet::new("mouse", vec![Sequence::new("MKVLSTGIA")?]);
///
/// let report = Comparison::new().k(1)?.run(&[human, mouse])?;
///
/// let result = &report.results()[0];
/// assert_eq!(result.table.rows(), ["human", "mouse"]);
/// assert!(result.association.is_ok());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Comparison {
    ks: Vec<KmerLength>,
    alphabet: Option<Alphabet>,
    config: AnalysisConfig,
}

impl Comparison {
    /// Creates a builder with no k values and the default [`AnalysisConfig`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a k-mer length.
    ///
    /// # Errors
    ///
    /// Returns [`KmerLengthError`] if `k` is zero.
    ///
    /// # Example
    ///
    /// ```rust
    /// use kmercomp::builder::Comparison;
    ///
    /// let comparison = Comparison::new().k(3)?.k(2)?.k(3)?;
    /// assert_eq!(comparison.get_k_values().len(), 2);
    /// # Ok::<(), kmercomp::error::KmerLengthError>(())
    /// ```
    pub fn k(self, k: usize) -> Result<Self, KmerLengthError> {
        Ok(self.k_validated(KmerLength::new(k)?))
    }

    /// Adds a pre-validated k-mer length.
    #[must_use]
    pub fn k_validated(mut self, k: KmerLength) -> Self {
        if let Err(pos) = self.ks.binary_search(&k) {
            self.ks.insert(pos, k);
        }
        self
    }

    /// Adds several pre-validated k-mer lengths.
    ///
    /// # Example
    ///
    /// ```rust
    /// use kmercomp::builder::Comparison;
    /// use kmercomp::kmer::KmerLength;
    ///
    /// let ks = KmerLength::parse_list("3,1,2")?;
    /// let comparison = Comparison::new().k_values(ks);
    /// assert_eq!(comparison.get_k_values()[0].get(), 1);
    /// # Ok::<(), String>(())
    /// ```
    #[must_use]
    pub fn k_values<I: IntoIterator<Item = KmerLength>>(self, ks: I) -> Self {
        ks.into_iter().fold(self, Self::k_validated)
    }

    /// Requires every residue read by [`run_files()`](Self::run_files) to
    /// belong to `alphabet`.
    #[must_use]
    pub const fn alphabet(mut self, alphabet: Alphabet) -> Self {
        self.alphabet = Some(alphabet);
        self
    }

    /// Replaces every analysis setting at once.
    #[must_use]
    pub const fn config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    /// Drops k-mer columns whose counts fall below `threshold`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use kmercomp::builder::Comparison;
    /// use kmercomp::table::InclusionPolicy;
    ///
    /// // Keep only k-mers seen at least 10 times in every set
    /// let comparison = Comparison::new()
    ///     .inclusion_threshold(10)
    ///     .inclusion_policy(InclusionPolicy::All);
    /// assert_eq!(comparison.get_config().inclusion_threshold, Some(10));
    /// ```
    #[must_use]
    pub const fn inclusion_threshold(mut self, threshold: u64) -> Self {
        self.config.inclusion_threshold = Some(threshold);
        self
    }

    /// Sets whether any or all sets must reach the inclusion threshold.
    #[must_use]
    pub const fn inclusion_policy(mut self, policy: InclusionPolicy) -> Self {
        self.config.inclusion_policy = policy;
        self
    }

    /// Sets the column vocabulary of every table.
    #[must_use]
    pub const fn vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.config.vocabulary = vocabulary;
        self
    }

    /// Sets the extremum reported by the descriptive statistics.
    #[must_use]
    pub const fn range_mode(mut self, range_mode: RangeMode) -> Self {
        self.config.range_mode = range_mode;
        self
    }

    /// Enables or disables Yates' correction for 1-dof tables.
    #[must_use]
    pub const fn yates_correction(mut self, enabled: bool) -> Self {
        self.config.yates_correction = enabled;
        self
    }

    /// Selects raw or length-normalized cells for the association test.
    #[must_use]
    pub const fn contingency_values(mut self, values: ContingencyValues) -> Self {
        self.config.contingency_values = values;
        self
    }

    /// Sets the length assumed for sets missing from the length registry.
    #[must_use]
    pub const fn default_length(mut self, length: u64) -> Self {
        self.config.default_length = length;
        self
    }

    /// Returns the configured k values in ascending order.
    #[must_use]
    pub fn get_k_values(&self) -> &[KmerLength] {
        &self.ks
    }

    /// Returns the configured alphabet, if any.
    #[must_use]
    pub const fn get_alphabet(&self) -> Option<Alphabet> {
        self.alphabet
    }

    /// Returns the analysis settings.
    #[must_use]
    pub const fn get_config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Reads one [`SequenceSet`] per FASTA file, in parallel.
    ///
    /// # Errors
    ///
    /// Returns the first read, parse or symbol error encountered.
    pub fn read_sets<P>(&self, paths: &[P]) -> Result<Vec<SequenceSet>, KmerCompError>
    where
        P: AsRef<Path> + Sync,
    {
        paths
            .par_iter()
            .map(|path| read_sequence_set(path, self.alphabet))
            .collect()
    }

    /// Counts every set for every k and aligns the counts into one table per k.
    ///
    /// Tables are returned in ascending k order.
    ///
    /// # Errors
    ///
    /// Returns [`KmerCompError::NoKmerLengths`] if no k was added and
    /// [`KmerCompError::DuplicateSet`] if two sets share a name.
    pub fn count_sets(&self, sets: &[SequenceSet]) -> Result<Vec<FrequencyTable>, KmerCompError> {
        if self.ks.is_empty() {
            return Err(KmerCompError::NoKmerLengths);
        }
        let mut seen = HashSet::new();
        if let Some(dup) = sets.iter().find(|set| !seen.insert(set.name())) {
            return Err(KmerCompError::DuplicateSet {
                name: dup.name().to_owned(),
            });
        }

        #[cfg(feature = "tracing")]
        let _span = info_span!("count_sets", sets = sets.len(), k_values = self.ks.len()).entered();

        let builder = self.config.table_builder();
        let tables = self
            .ks
            .par_iter()
            .map(|&k| {
                let profiles: Vec<(String, CountProfile)> = sets
                    .par_iter()
                    .map(|set| (set.name().to_owned(), aggregate(set, k)))
                    .collect();
                builder.build(k, &profiles)
            })
            .collect::<Result<Vec<_>, _>>()?;

        #[cfg(feature = "tracing")]
        info!(tables = tables.len(), "Counted k-mers for every set");

        Ok(tables)
    }

    /// Runs the full comparison over in-memory sets.
    ///
    /// Set lengths for normalization are the sets' total residue counts.
    ///
    /// # Errors
    ///
    /// Returns [`KmerCompError::TooFewSets`] for fewer than two sets, plus
    /// the errors of [`count_sets()`](Self::count_sets). A table that cannot
    /// be tested is not an error; it is recorded in the report.
    pub fn run(&self, sets: &[SequenceSet]) -> Result<ComparisonReport, KmerCompError> {
        check_set_count(sets.len())?;

        #[cfg(feature = "tracing")]
        info!(
            sets = sets.len(),
            k_values = ?self.ks.iter().map(|k| k.get()).collect::<Vec<_>>(),
            "Starting k-mer comparison"
        );

        let tables = self.count_sets(sets)?;
        let lengths = SequenceLengths::from_sets(sets);
        Ok(self.report(tables, &lengths))
    }

    /// Reads FASTA files and runs the full comparison, one set per file.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`read_sets()`](Self::read_sets) and
    /// [`run()`](Self::run).
    pub fn run_files<P>(&self, paths: &[P]) -> Result<ComparisonReport, KmerCompError>
    where
        P: AsRef<Path> + Sync,
    {
        check_set_count(paths.len())?;
        let sets = self.read_sets(paths)?;
        self.run(&sets)
    }

    /// Analyzes count tables that were built elsewhere, one per k.
    ///
    /// The configured k values are ignored; each table carries its own. When
    /// an inclusion threshold or a complete vocabulary is configured, tables
    /// are refined with those settings first; see
    /// [`TableBuilder::refine`](crate::table::TableBuilder::refine).
    ///
    /// # Errors
    ///
    /// Returns [`KmerCompError::NoKmerLengths`] for no tables,
    /// [`KmerCompError::TooFewSets`] for a table with fewer than two rows and
    /// [`KmerCompError::DuplicateKmerLength`] for two tables with the same k.
    pub fn analyze(
        &self,
        tables: Vec<FrequencyTable>,
        lengths: &SequenceLengths,
    ) -> Result<ComparisonReport, KmerCompError> {
        if tables.is_empty() {
            return Err(KmerCompError::NoKmerLengths);
        }
        let mut seen = HashSet::new();
        for table in &tables {
            check_set_count(table.nrows())?;
            if !seen.insert(table.k()) {
                return Err(KmerCompError::DuplicateKmerLength { k: table.k().get() });
            }
        }

        #[cfg(feature = "tracing")]
        info!(tables = tables.len(), "Analyzing count tables");

        let rebuild = self.config.inclusion_threshold.is_some()
            || self.config.vocabulary != Vocabulary::Observed;
        let tables = if rebuild {
            let builder = self.config.table_builder();
            tables.iter().map(|table| builder.refine(table)).collect()
        } else {
            tables
        };

        Ok(self.report(tables, lengths))
    }

    fn report(&self, tables: Vec<FrequencyTable>, lengths: &SequenceLengths) -> ComparisonReport {
        let lengths = lengths.clone().with_fallback(self.config.default_length);
        let engine = self.config.statistics_engine();
        let tester = self.config.association_tester();
        let values = self.config.contingency_values;

        let results: Vec<KmerResult> = tables
            .into_par_iter()
            .map(|table| KmerResult {
                statistics: engine.describe_table(&table, &lengths),
                association: tester.test_with(&table, values, &lengths),
                table,
            })
            .collect();

        let report = ComparisonReport::new(results);

        #[cfg(feature = "tracing")]
        {
            for failure in report.results().iter().filter_map(|r| r.association.as_ref().err()) {
                warn!(k = failure.k.get(), error = %failure.message, "Association test failed");
            }
            info!(
                k_values = report.len(),
                failures = report.failure_count(),
                "Comparison complete"
            );
        }

        report
    }
}

fn check_set_count(found: usize) -> Result<(), KmerCompError> {
    if found < MIN_SETS {
        return Err(KmerCompError::TooFewSets {
            found,
            min: MIN_SETS,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmer::Sequence;

    fn set(name: &str, seqs: &[&'static str]) -> SequenceSet {
        SequenceSet::new(
            name,
            seqs.iter().map(|s| Sequence::new(*s).unwrap()).collect(),
        )
    }

    fn sets() -> Vec<SequenceSet> {
        vec![set("a", &["AAAB", "AB"]), set("b", &["ABBB", "BA"])]
    }

    #[test]
    fn builder_default() {
        let comparison = Comparison::new();
        assert!(comparison.get_k_values().is_empty());
        assert_eq!(comparison.get_alphabet(), None);
        assert_eq!(comparison.get_config(), &AnalysisConfig::default());
    }

    #[test]
    fn builder_k_sorted_and_deduplicated() {
        let comparison = Comparison::new().k(3).unwrap().k(1).unwrap().k(3).unwrap();
        let ks: Vec<usize> = comparison.get_k_values().iter().map(|k| k.get()).collect();
        assert_eq!(ks, [1, 3]);
    }

    #[test]
    fn builder_k_invalid() {
        assert!(Comparison::new().k(0).is_err());
    }

    #[test]
    fn builder_chained_settings() {
        let comparison = Comparison::new()
            .alphabet(Alphabet::Protein)
            .inclusion_threshold(3)
            .inclusion_policy(InclusionPolicy::All)
            .range_mode(RangeMode::Max)
            .yates_correction(false)
            .contingency_values(ContingencyValues::Normalized)
            .default_length(10);
        let config = comparison.get_config();
        assert_eq!(comparison.get_alphabet(), Some(Alphabet::Protein));
        assert_eq!(config.inclusion_threshold, Some(3));
        assert_eq!(config.inclusion_policy, InclusionPolicy::All);
        assert_eq!(config.range_mode, RangeMode::Max);
        assert!(!config.yates_correction);
        assert_eq!(config.contingency_values, ContingencyValues::Normalized);
        assert_eq!(config.default_length, 10);
    }

    #[test]
    fn run_without_k_fails() {
        let err = Comparison::new().run(&sets()).unwrap_err();
        assert!(matches!(err, KmerCompError::NoKmerLengths));
    }

    #[test]
    fn run_with_one_set_fails() {
        let err = Comparison::new()
            .k(1)
            .unwrap()
            .run(&sets()[..1])
            .unwrap_err();
        assert!(matches!(err, KmerCompError::TooFewSets { found: 1, min: 2 }));
    }

    #[test]
    fn duplicate_set_names_fail() {
        let dup = vec![set("a", &["AB"]), set("a", &["BA"])];
        let err = Comparison::new().k(1).unwrap().run(&dup).unwrap_err();
        assert!(matches!(err, KmerCompError::DuplicateSet { name } if name == "a"));
    }

    #[test]
    fn count_sets_builds_one_table_per_k() {
        let tables = Comparison::new()
            .k(2)
            .unwrap()
            .k(1)
            .unwrap()
            .count_sets(&sets())
            .unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].k().get(), 1);
        assert_eq!(tables[0].columns(), ["A", "B"]);
        assert_eq!(tables[0].cells(), [4, 2, 2, 4]);
        assert_eq!(tables[1].columns(), ["AA", "AB", "BA", "BB"]);
        assert_eq!(tables[1].row_by_name("a"), Some(&[2, 2, 0, 0][..]));
        assert_eq!(tables[1].row_by_name("b"), Some(&[0, 1, 1, 2][..]));
    }

    #[test]
    fn failures_stay_scoped_to_their_k() {
        // k=5 exceeds every sequence, so its table has no columns.
        let report = Comparison::new()
            .k(1)
            .unwrap()
            .k(5)
            .unwrap()
            .run(&sets())
            .unwrap();
        assert_eq!(report.len(), 2);
        assert!(report.results()[0].association.is_ok());
        assert!(report.results()[1].association.is_err());
        assert_eq!(report.failure_count(), 1);
    }

    #[test]
    fn run_normalizes_by_total_length() {
        let report = Comparison::new().k(1).unwrap().run(&sets()).unwrap();
        let stats = &report.results()[0].statistics;
        let norm = stats.normalized.get("a").unwrap();
        let crate::stats::SetStatistics::Computed(norm) = norm else {
            panic!("expected statistics");
        };
        // Counts [4, 2] over a total length of 6.
        assert!((norm.mean - 0.5).abs() < 1e-12);
    }

    #[test]
    fn analyze_checks_tables() {
        let comparison = Comparison::new();
        let lengths = SequenceLengths::new();
        assert!(matches!(
            comparison.analyze(Vec::new(), &lengths),
            Err(KmerCompError::NoKmerLengths)
        ));

        let tables = Comparison::new().k(1).unwrap().count_sets(&sets()).unwrap();
        let twice = vec![tables[0].clone(), tables[0].clone()];
        assert!(matches!(
            comparison.analyze(twice, &lengths),
            Err(KmerCompError::DuplicateKmerLength { k: 1 })
        ));
    }

    #[test]
    fn analyze_applies_threshold() {
        let tables = Comparison::new().k(2).unwrap().count_sets(&sets()).unwrap();
        let report = Comparison::new()
            .inclusion_threshold(2)
            .analyze(tables, &SequenceLengths::new())
            .unwrap();
        assert_eq!(report.results()[0].table.columns(), ["AA", "AB", "BB"]);
    }
}
