//! Command-line interface definition.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::{
    association::ContingencyValues,
    config::AnalysisConfig,
    kmer::{Alphabet, KmerLength},
    lengths::DEFAULT_LENGTH,
    stats::RangeMode,
    table::InclusionPolicy,
};

/// Compare k-mer frequency profiles across sequence sets.
#[derive(Parser, Debug)]
#[command(name = "kmercomp")]
#[command(version, author, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Suppress informational output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// What to run.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Count k-mers in FASTA files and write one count table per k
    Count {
        /// Comma-separated k-mer lengths, e.g. "1,2,3"
        #[arg(value_parser = parse_k_values)]
        k_values: KmerValues,

        /// FASTA files, one sequence set per file
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Reject residues outside this alphabet
        #[arg(short, long, value_enum)]
        alphabet: Option<Alphabet>,
    },

    /// Analyze count tables written by `count`
    Analyze {
        /// Count tables (TSV), one per k
        #[arg(required = true)]
        tables: Vec<PathBuf>,

        /// JSON object mapping set names to total sequence length
        #[arg(short, long)]
        lengths: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Count and analyze FASTA files in one run
    Compare {
        /// Comma-separated k-mer lengths, e.g. "1,2,3"
        #[arg(value_parser = parse_k_values)]
        k_values: KmerValues,

        /// FASTA files, one sequence set per file (at least two)
        #[arg(required = true, num_args = 2..)]
        paths: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Reject residues outside this alphabet
        #[arg(short, long, value_enum)]
        alphabet: Option<Alphabet>,

        /// Use every k-mer over the alphabet as a column, observed or not
        #[arg(long, requires = "alphabet")]
        complete_vocabulary: bool,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },
}

/// Settings shared by `analyze` and `compare`.
#[derive(ClapArgs, Debug, Clone)]
pub struct AnalysisArgs {
    /// Drop k-mers whose count is below this threshold
    #[arg(short, long)]
    pub threshold: Option<u64>,

    /// Whether any or all sets must reach the threshold
    #[arg(long, value_enum, default_value = "any")]
    pub inclusion: InclusionPolicy,

    /// Extremum reported in the descriptive statistics
    #[arg(long, value_enum, default_value = "min-max")]
    pub range: RangeMode,

    /// Disable Yates' continuity correction for 1-dof tables
    #[arg(long)]
    pub no_yates: bool,

    /// Run the chi-square test on length-normalized frequencies
    #[arg(long)]
    pub normalized: bool,

    /// Length assumed for sets missing from the length registry
    #[arg(long, default_value_t = DEFAULT_LENGTH)]
    pub default_length: u64,
}

impl AnalysisArgs {
    /// Maps the flags onto an [`AnalysisConfig`].
    #[must_use]
    pub fn config(&self) -> AnalysisConfig {
        AnalysisConfig {
            inclusion_threshold: self.threshold,
            inclusion_policy: self.inclusion,
            range_mode: self.range,
            yates_correction: !self.no_yates,
            contingency_values: if self.normalized {
                ContingencyValues::Normalized
            } else {
                ContingencyValues::Counts
            },
            default_length: self.default_length,
            ..AnalysisConfig::default()
        }
    }
}

/// A parsed, sorted and deduplicated list of k values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KmerValues(pub Vec<KmerLength>);

fn parse_k_values(s: &str) -> Result<KmerValues, String> {
    KmerLength::parse_list(s).map(KmerValues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_compare_with_flags() {
        let args = Args::try_parse_from([
            "kmercomp", "compare", "2,1,2", "a.fa", "b.fa", "-o", "out", "--threshold", "3",
            "--inclusion", "all", "--range", "max", "--no-yates", "--normalized",
        ])
        .unwrap();
        let Command::Compare {
            k_values,
            paths,
            analysis,
            ..
        } = args.command
        else {
            panic!("expected compare");
        };
        let ks: Vec<usize> = k_values.0.iter().map(|k| k.get()).collect();
        assert_eq!(ks, [1, 2]);
        assert_eq!(paths.len(), 2);

        let config = analysis.config();
        assert_eq!(config.inclusion_threshold, Some(3));
        assert_eq!(config.inclusion_policy, InclusionPolicy::All);
        assert_eq!(config.range_mode, RangeMode::Max);
        assert!(!config.yates_correction);
        assert_eq!(config.contingency_values, ContingencyValues::Normalized);
    }

    #[test]
    fn analysis_defaults_match_config_defaults() {
        let args = Args::try_parse_from([
            "kmercomp", "analyze", "t.tsv", "--lengths", "l.json", "-o", "out",
        ])
        .unwrap();
        let Command::Analyze { analysis, .. } = args.command else {
            panic!("expected analyze");
        };
        assert_eq!(analysis.config(), AnalysisConfig::default());
    }

    #[test]
    fn rejects_zero_k() {
        assert!(Args::try_parse_from(["kmercomp", "count", "0,2", "a.fa", "-o", "out"]).is_err());
    }

    #[test]
    fn compare_needs_two_files() {
        assert!(Args::try_parse_from(["kmercomp", "compare", "2", "a.fa", "-o", "out"]).is_err());
    }
}
