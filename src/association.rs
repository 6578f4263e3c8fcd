//! Chi-square independence tests over frequency tables.
//!
//! A [`FrequencyTable`] is read as a contingency table (sets × k-mers).
//! [`AssociationTester`] computes Pearson's chi-square statistic, its p-value
//! and Cramér's V. Cramér's V is reported next to the p-value because, on
//! tables with many large counts, p-values saturate at or near zero.
//!
//! A table that cannot be tested produces an [`AssociationFailure`] carrying
//! the reason and the set names, so one bad k never stops the others.

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::{
    distribution::chi_squared_sf,
    error::ContingencyError,
    kmer::KmerLength,
    lengths::SequenceLengths,
    table::FrequencyTable,
};

/// Whether cells are raw counts or counts divided by set length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContingencyValues {
    /// Integer counts as stored in the table.
    #[default]
    Counts,
    /// Each row divided by its set's total sequence length.
    Normalized,
}

/// A successful chi-square test for one k.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssociationResult {
    /// K-mer length of the tested table.
    #[serde(serialize_with = "serialize_k")]
    pub k: KmerLength,
    /// Set names, in row order.
    pub sets: Vec<String>,
    /// Pearson chi-square statistic.
    pub chi2: f64,
    /// Upper-tail p-value.
    pub p_value: f64,
    /// Degrees of freedom, `(rows - 1) * (columns - 1)`.
    pub dof: usize,
    /// Cramér's V in `[0, 1]`.
    pub cramers_v: f64,
    /// Sum of all cells.
    pub n: f64,
}

/// A chi-square test that could not be carried out for one k.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("association test for k={k} failed: {message}")]
pub struct AssociationFailure {
    /// K-mer length of the table.
    #[serde(serialize_with = "serialize_k")]
    pub k: KmerLength,
    /// Set names, in row order.
    pub sets: Vec<String>,
    /// Why the test failed.
    #[serde(rename = "error")]
    pub message: String,
    #[serde(skip)]
    #[source]
    source: ContingencyError,
}

impl AssociationFailure {
    fn new(table: &FrequencyTable, source: ContingencyError) -> Self {
        Self {
            k: table.k(),
            sets: table.rows().to_vec(),
            message: source.to_string(),
            source,
        }
    }

    /// The underlying contingency problem.
    #[must_use]
    pub const fn cause(&self) -> &ContingencyError {
        &self.source
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_k<S: Serializer>(k: &KmerLength, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(k.get() as u64)
}

/// Outcome of testing one table.
pub type AssociationOutcome = Result<AssociationResult, AssociationFailure>;

/// Runs chi-square independence tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssociationTester {
    yates_correction: bool,
}

impl Default for AssociationTester {
    fn default() -> Self {
        Self::new()
    }
}

impl AssociationTester {
    /// A tester that applies Yates' correction to 1-dof tables.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            yates_correction: true,
        }
    }

    /// Enables or disables Yates' continuity correction for 1-dof tables.
    #[must_use]
    pub const fn yates_correction(mut self, enabled: bool) -> Self {
        self.yates_correction = enabled;
        self
    }

    /// Tests the raw counts of `table`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use kmercomp::association::AssociationTester;
    /// use kmercomp::kmer::{CountProfile, KmerLength};
    /// use kmercomp::table::TableBuilder;
    ///
    /// let a: CountProfile = [("AA", 2), ("AB", 1)].into_iter().collect();
    /// let b: CountProfile = [("AA", 0), ("AB", 3)].into_iter().collect();
    /// let table = TableBuilder::new()
    ///     .build(KmerLength::new(2)?, &[("a".into(), a), ("b".into(), b)])?;
    ///
    /// let result = AssociationTester::new().test(&table)?;
    /// assert_eq!(result.dof, 1);
    /// assert!(result.chi2.is_finite());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn test(&self, table: &FrequencyTable) -> AssociationOutcome {
        let cells: Vec<f64> = table.cells().iter().map(|&c| c as f64).collect();
        Self::test_cells(table, &cells, self.yates_correction)
    }

    /// Tests `table` after dividing each row by its set's total length.
    ///
    /// Yates' correction applies to raw counts only and is skipped here.
    pub fn test_normalized(
        &self,
        table: &FrequencyTable,
        lengths: &SequenceLengths,
    ) -> AssociationOutcome {
        let ncols = table.ncols();
        let cells: Vec<f64> = table
            .cells()
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let name = &table.rows()[i / ncols.max(1)];
                c as f64 / lengths.length_of(name) as f64
            })
            .collect();
        Self::test_cells(table, &cells, false)
    }

    /// Tests `table` with the cell values selected by `values`.
    pub fn test_with(
        &self,
        table: &FrequencyTable,
        values: ContingencyValues,
        lengths: &SequenceLengths,
    ) -> AssociationOutcome {
        match values {
            ContingencyValues::Counts => self.test(table),
            ContingencyValues::Normalized => self.test_normalized(table, lengths),
        }
    }

    fn test_cells(table: &FrequencyTable, cells: &[f64], continuity: bool) -> AssociationOutcome {
        chi_squared(cells, table.nrows(), table.ncols(), continuity)
            .map(|stat| AssociationResult {
                k: table.k(),
                sets: table.rows().to_vec(),
                chi2: stat.chi2,
                p_value: stat.p_value,
                dof: stat.dof,
                cramers_v: stat.cramers_v,
                n: stat.n,
            })
            .map_err(|err| AssociationFailure::new(table, err))
    }
}

/// Pearson chi-square test on a row-major `nrows × ncols` matrix.
fn chi_squared(
    observed: &[f64],
    nrows: usize,
    ncols: usize,
    continuity: bool,
) -> Result<ChiSquared, ContingencyError> {
    if nrows < 2 {
        return Err(ContingencyError::TooFewRows { rows: nrows });
    }
    if ncols < 2 {
        return Err(ContingencyError::TooFewColumns { columns: ncols });
    }
    if let Some((i, &value)) = observed
        .iter()
        .enumerate()
        .find(|(_, v)| !v.is_finite() || **v < 0.0)
    {
        return Err(ContingencyError::InvalidCell {
            row: i / ncols,
            column: i % ncols,
            value,
        });
    }

    let mut row_sums = vec![0.0; nrows];
    let mut col_sums = vec![0.0; ncols];
    for (i, &value) in observed.iter().enumerate() {
        row_sums[i / ncols] += value;
        col_sums[i % ncols] += value;
    }
    let n: f64 = row_sums.iter().sum();

    if let Some(row) = row_sums.iter().position(|&s| s <= 0.0) {
        return Err(ContingencyError::ZeroExpected { row, column: 0 });
    }
    if let Some(column) = col_sums.iter().position(|&s| s <= 0.0) {
        return Err(ContingencyError::ZeroExpected { row: 0, column });
    }

    let dof = (nrows - 1) * (ncols - 1);
    let correct = continuity && dof == 1;

    let mut chi2 = 0.0;
    for (i, &obs) in observed.iter().enumerate() {
        let expected = row_sums[i / ncols] * col_sums[i % ncols] / n;
        let mut diff = obs - expected;
        if correct {
            // Move the observation up to 0.5 toward its expectation.
            diff = diff.signum() * (diff.abs() - diff.abs().min(0.5));
        }
        chi2 += diff * diff / expected;
    }

    let p_value = chi_squared_sf(chi2, dof as f64).unwrap_or(f64::NAN);
    let min_dim = (nrows - 1).min(ncols - 1) as f64;
    let cramers_v = (chi2 / (n * min_dim)).sqrt().clamp(0.0, 1.0);

    Ok(ChiSquared {
        chi2,
        p_value,
        dof,
        cramers_v,
        n,
    })
}

struct ChiSquared {
    chi2: f64,
    p_value: f64,
    dof: usize,
    cramers_v: f64,
    n: f64,
}
