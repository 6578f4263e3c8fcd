//! Descriptive statistics over k-mer count vectors.
//!
//! [`StatisticsEngine`] summarizes one set's row of a frequency table, either
//! as raw counts or divided by the set's total sequence length. Variance and
//! standard deviation use the population denominator (n).
//!
//! # Example
//!
//! ```rust
//! use kmercomp::stats::{Extremum, RangeMode, StatisticsEngine};
//!
//! let engine = StatisticsEngine::new(RangeMode::MinMax);
//! let stats = engine.describe(&[1.0, 2.0, 3.0, 4.0])?;
//!
//! assert_eq!(stats.mean, 2.5);
//! assert_eq!(stats.median, 2.5);
//! assert_eq!(stats.variance, 1.25);
//! assert_eq!(stats.extremum, Extremum::Range(1.0, 4.0));
//! # Ok::<(), kmercomp::error::EmptyInputError>(())
//! ```

use clap::ValueEnum;
use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};

use crate::{error::EmptyInputError, lengths::SequenceLengths, table::FrequencyTable};

/// Which extremum [`DescriptiveStats`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RangeMode {
    /// Minimum and maximum, serialized as `"range": [min, max]`.
    #[default]
    MinMax,
    /// Maximum only, serialized as `"max_count": max`.
    Max,
}

/// The extremum part of [`DescriptiveStats`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Extremum {
    /// `(min, max)`.
    #[serde(rename = "range")]
    Range(f64, f64),
    /// Maximum only.
    #[serde(rename = "max_count")]
    Max(f64),
}

/// Summary statistics of one numeric vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveStats {
    /// Arithmetic mean.
    pub mean: f64,
    /// Median; mean of the two middle values for even lengths.
    pub median: f64,
    /// Population variance.
    pub variance: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    /// Range or maximum, depending on [`RangeMode`].
    #[serde(flatten)]
    pub extremum: Extremum,
}

/// Statistics of one set, or why they could not be computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SetStatistics {
    /// Statistics were computed.
    Computed(DescriptiveStats),
    /// The set's count vector could not be described.
    Failed {
        /// Description of the failure.
        error: String,
    },
}

impl From<Result<DescriptiveStats, EmptyInputError>> for SetStatistics {
    fn from(result: Result<DescriptiveStats, EmptyInputError>) -> Self {
        match result {
            Ok(stats) => Self::Computed(stats),
            Err(err) => Self::Failed {
                error: err.to_string(),
            },
        }
    }
}

/// Per-set statistics keyed by set name, in table row order.
///
/// Serializes as a JSON object whose keys keep that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetStatisticsMap(Vec<(String, SetStatistics)>);

impl SetStatisticsMap {
    /// The statistics of set `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SetStatistics> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    /// Iterates over `(set name, statistics)` in row order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SetStatistics)> + '_ {
        self.0.iter().map(|(n, s)| (n.as_str(), s))
    }

    /// Number of sets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no set is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push(&mut self, name: &str, stats: SetStatistics) {
        self.0.push((name.to_owned(), stats));
    }
}

impl Serialize for SetStatisticsMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, stats) in &self.0 {
            map.serialize_entry(name, stats)?;
        }
        map.end()
    }
}

/// Raw and normalized statistics for every set of one table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableStatistics {
    /// Statistics of the raw counts.
    pub raw: SetStatisticsMap,
    /// Statistics of the counts divided by each set's total length.
    pub normalized: SetStatisticsMap,
}

/// Computes [`DescriptiveStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatisticsEngine {
    range_mode: RangeMode,
}

impl StatisticsEngine {
    /// An engine reporting the given extremum.
    #[must_use]
    pub const fn new(range_mode: RangeMode) -> Self {
        Self { range_mode }
    }

    /// The configured extremum mode.
    #[must_use]
    pub const fn range_mode(&self) -> RangeMode {
        self.range_mode
    }

    /// Describes `values`.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyInputError`] when `values` is empty.
    pub fn describe(&self, values: &[f64]) -> Result<DescriptiveStats, EmptyInputError> {
        if values.is_empty() {
            return Err(EmptyInputError);
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n;

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let median = median_sorted(&sorted);

        let (min, max) = (sorted[0], sorted[sorted.len() - 1]);
        let extremum = match self.range_mode {
            RangeMode::MinMax => Extremum::Range(min, max),
            RangeMode::Max => Extremum::Max(max),
        };

        Ok(DescriptiveStats {
            mean,
            median,
            variance,
            std_dev: variance.sqrt(),
            extremum,
        })
    }

    /// Describes `values` after dividing each by `total_length`.
    ///
    /// A `total_length` of zero is treated as 1.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyInputError`] when `values` is empty.
    pub fn describe_normalized(
        &self,
        values: &[f64],
        total_length: u64,
    ) -> Result<DescriptiveStats, EmptyInputError> {
        let divisor = total_length.max(1) as f64;
        let normalized: Vec<f64> = values.iter().map(|&v| v / divisor).collect();
        self.describe(&normalized)
    }

    /// Describes every row of `table`, raw and normalized by `lengths`.
    ///
    /// A row that cannot be described (a table without columns) is recorded
    /// as [`SetStatistics::Failed`]; the other rows are unaffected.
    #[must_use]
    pub fn describe_table(
        &self,
        table: &FrequencyTable,
        lengths: &SequenceLengths,
    ) -> TableStatistics {
        let mut out = TableStatistics::default();
        for (name, row) in table.iter_rows() {
            let values: Vec<f64> = row.iter().map(|&c| c as f64).collect();
            out.raw.push(name, self.describe(&values).into());
            out.normalized.push(
                name,
                self.describe_normalized(&values, lengths.length_of(name))
                    .into(),
            );
        }
        out
    }
}

/// Median of an already sorted, non-empty slice.
fn median_sorted(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
