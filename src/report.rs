//! Result artifacts.
//!
//! A [`ComparisonReport`] holds one [`KmerResult`] per k and writes:
//!
//! - `descriptive_statistics.json` and `normalized_descriptive_statistics.json`,
//!   keyed by `"k=<k>"` and then by set name;
//! - `chi2_results.txt`, a fixed-width table of association outcomes;
//! - `chi2_results.json`, the same outcomes with unrounded numbers.
//!
//! Count tables and length registries, the output of `kmercomp count`, are
//! written with [`write_count_table`] and [`write_lengths`].

use std::{
    fmt::Write as _,
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{ser::SerializeMap, Serialize, Serializer};

use crate::{
    association::AssociationOutcome,
    error::KmerCompError,
    kmer::KmerLength,
    lengths::SequenceLengths,
    stats::{SetStatisticsMap, TableStatistics},
    table::FrequencyTable,
};

/// Raw descriptive statistics file name.
pub const STATISTICS_FILE: &str = "descriptive_statistics.json";
/// Length-normalized descriptive statistics file name.
pub const NORMALIZED_STATISTICS_FILE: &str = "normalized_descriptive_statistics.json";
/// Fixed-width association table file name.
pub const ASSOCIATION_TABLE_FILE: &str = "chi2_results.txt";
/// Association outcomes as JSON.
pub const ASSOCIATION_JSON_FILE: &str = "chi2_results.json";
/// Length registry file name.
pub const LENGTHS_FILE: &str = "sequence_lengths.json";

/// Header cell labelling the set-name column of a count table.
pub const SET_COLUMN: &str = "set";

const COLUMN_WIDTH: usize = 15;

/// File name of the count table for `k`.
#[must_use]
pub fn count_table_file(k: KmerLength) -> String {
    format!("kmer_counts_k{k}.tsv")
}

fn k_key(k: KmerLength) -> String {
    format!("k={k}")
}

/// Everything computed for one k.
#[derive(Debug, Clone)]
pub struct KmerResult {
    /// The aligned counts the other results were computed from.
    pub table: FrequencyTable,
    /// Raw and normalized per-set statistics.
    pub statistics: TableStatistics,
    /// Chi-square test outcome.
    pub association: AssociationOutcome,
}

impl KmerResult {
    /// The k-mer length of this result.
    #[must_use]
    pub const fn k(&self) -> KmerLength {
        self.table.k()
    }
}

/// Results for every requested k, in ascending k order.
#[derive(Debug, Clone, Default)]
pub struct ComparisonReport {
    results: Vec<KmerResult>,
}

impl ComparisonReport {
    /// Collects `results`, ordering them by k.
    #[must_use]
    pub fn new(mut results: Vec<KmerResult>) -> Self {
        results.sort_by_key(KmerResult::k);
        Self { results }
    }

    /// Per-k results in ascending k order.
    #[must_use]
    pub fn results(&self) -> &[KmerResult] {
        &self.results
    }

    /// The result for `k`, if it was computed.
    #[must_use]
    pub fn get(&self, k: KmerLength) -> Option<&KmerResult> {
        self.results
            .binary_search_by_key(&k, KmerResult::k)
            .ok()
            .map(|i| &self.results[i])
    }

    /// Number of k values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns `true` if no k was processed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of k values whose association test failed.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.association.is_err())
            .count()
    }

    /// Writes the raw (or normalized) statistics artifact.
    pub fn write_statistics<W: Write>(
        &self,
        mut writer: W,
        normalized: bool,
    ) -> Result<(), KmerCompError> {
        let artifact = ByK(
            self.results
                .iter()
                .map(|r| {
                    let stats = if normalized {
                        &r.statistics.normalized
                    } else {
                        &r.statistics.raw
                    };
                    (r.k(), stats)
                })
                .collect::<Vec<(KmerLength, &SetStatisticsMap)>>(),
        );
        serde_json::to_writer_pretty(&mut writer, &artifact)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Renders the fixed-width association table.
    ///
    /// Columns are 15 characters wide, left aligned and separated by a space.
    /// chi2 and Cramér's V have 3 decimals; p is formatted by
    /// [`format_p_value`].
    #[must_use]
    pub fn association_table(&self) -> String {
        let mut out = String::new();
        push_row(&mut out, &["k-mer length", "chi2", "p", "dof", "cramers v"]);
        for result in &self.results {
            let key = k_key(result.k());
            match &result.association {
                Ok(r) => push_row(
                    &mut out,
                    &[
                        key,
                        format!("{:.3}", r.chi2),
                        format_p_value(r.p_value),
                        r.dof.to_string(),
                        format!("{:.3}", r.cramers_v),
                    ],
                ),
                Err(failure) => push_row(
                    &mut out,
                    &[key, format!("failed: {}", failure.message)],
                ),
            }
        }
        out
    }

    /// Writes the association outcomes as JSON, keyed by `"k=<k>"`.
    pub fn write_association_json<W: Write>(&self, mut writer: W) -> Result<(), KmerCompError> {
        let artifact = ByK(
            self.results
                .iter()
                .map(|r| (r.k(), AssociationEntry(&r.association)))
                .collect(),
        );
        serde_json::to_writer_pretty(&mut writer, &artifact)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Writes all four analysis artifacts into `dir`, creating it if needed.
    ///
    /// Returns the paths written.
    pub fn write_artifacts<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<PathBuf>, KmerCompError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let mut written = Vec::with_capacity(4);

        let path = dir.join(STATISTICS_FILE);
        self.write_statistics(create(&path)?, false)?;
        written.push(path);

        let path = dir.join(NORMALIZED_STATISTICS_FILE);
        self.write_statistics(create(&path)?, true)?;
        written.push(path);

        let path = dir.join(ASSOCIATION_TABLE_FILE);
        fs::write(&path, self.association_table())?;
        written.push(path);

        let path = dir.join(ASSOCIATION_JSON_FILE);
        self.write_association_json(create(&path)?)?;
        written.push(path);

        Ok(written)
    }
}

fn create(path: &Path) -> Result<BufWriter<File>, KmerCompError> {
    Ok(BufWriter::new(File::create(path)?))
}

/// Appends one table line: every cell but the last padded to the column width.
fn push_row<S: AsRef<str>>(out: &mut String, cells: &[S]) {
    let w = COLUMN_WIDTH;
    if let Some((last, rest)) = cells.split_last() {
        for cell in rest {
            let _ = write!(out, "{:<w$} ", cell.as_ref());
        }
        out.push_str(last.as_ref());
    }
    out.push('\n');
}

/// Formats a p-value for display.
///
/// Values below 0.01, other than zero, use two-decimal scientific notation
/// with a signed two-digit exponent; everything else uses two decimals.
///
/// ```rust
/// use kmercomp::report::format_p_value;
///
/// assert_eq!(format_p_value(1.234e-5), "1.23e-05");
/// assert_eq!(format_p_value(0.4567), "0.46");
/// assert_eq!(format_p_value(0.0), "0.00");
/// ```
#[must_use]
pub fn format_p_value(p: f64) -> String {
    if p == 0.0 || p.is_nan() || p >= 1e-2 {
        return format!("{p:.2}");
    }
    let formatted = format!("{p:.2e}");
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => match exponent.parse::<i32>() {
            Ok(exp) => {
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{mantissa}e{sign}{:02}", exp.abs())
            }
            Err(_) => formatted,
        },
        None => formatted,
    }
}

/// Writes `table` as tab-separated text with a header row.
pub fn write_count_table<W: Write>(
    table: &FrequencyTable,
    mut writer: W,
) -> Result<(), KmerCompError> {
    write!(writer, "{SET_COLUMN}")?;
    for kmer in table.columns() {
        write!(writer, "\t{kmer}")?;
    }
    writeln!(writer)?;

    for (name, row) in table.iter_rows() {
        write!(writer, "{name}")?;
        for count in row {
            write!(writer, "\t{count}")?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes one count table per k plus the length registry into `dir`.
///
/// Returns the paths written.
pub fn write_count_artifacts<P: AsRef<Path>>(
    dir: P,
    tables: &[FrequencyTable],
    lengths: &SequenceLengths,
) -> Result<Vec<PathBuf>, KmerCompError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(tables.len() + 1);
    for table in tables {
        let path = dir.join(count_table_file(table.k()));
        write_count_table(table, create(&path)?)?;
        written.push(path);
    }

    let path = dir.join(LENGTHS_FILE);
    write_lengths(lengths, create(&path)?)?;
    written.push(path);

    Ok(written)
}

/// Writes the length registry as a JSON object.
pub fn write_lengths<W: Write>(
    lengths: &SequenceLengths,
    mut writer: W,
) -> Result<(), KmerCompError> {
    serde_json::to_writer_pretty(&mut writer, lengths)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Serializes `(k, value)` pairs as a map keyed by `"k=<k>"`, in the given order.
struct ByK<T>(Vec<(KmerLength, T)>);

impl<T: Serialize> Serialize for ByK<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, value) in &self.0 {
            map.serialize_entry(&k_key(*k), value)?;
        }
        map.end()
    }
}

struct AssociationEntry<'a>(&'a AssociationOutcome);

impl Serialize for AssociationEntry<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Ok(result) => result.serialize(serializer),
            Err(failure) => failure.serialize(serializer),
        }
    }
}
