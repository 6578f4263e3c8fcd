use std::{path::PathBuf, process};

use clap::Parser;
use colored::Colorize;
use kmercomp::{
    builder::Comparison,
    cli::{Args, Command},
    error::KmerCompError,
    lengths::SequenceLengths,
    reader::{read_count_table, read_lengths},
    report::{write_count_artifacts, ComparisonReport},
    table::Vocabulary,
};

#[cfg(feature = "tracing")]
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let args = Args::parse();

    #[cfg(feature = "tracing")]
    init_tracing();

    match run(args.command, args.quiet) {
        Ok(written) => {
            if !args.quiet {
                for path in written {
                    eprintln!("{}: {}", "wrote".bold(), path.display().to_string().blue());
                }
            }
        }
        Err(e) => {
            eprintln!(
                "{}\n {}",
                "Application error:".blue().bold(),
                e.to_string().blue()
            );
            process::exit(1);
        }
    }
}

fn run(command: Command, quiet: bool) -> Result<Vec<PathBuf>, KmerCompError> {
    match command {
        Command::Count {
            k_values,
            paths,
            output,
            alphabet,
        } => {
            let mut comparison = Comparison::new().k_values(k_values.0);
            if let Some(alphabet) = alphabet {
                comparison = comparison.alphabet(alphabet);
            }
            let sets = comparison.read_sets(&paths)?;
            let tables = comparison.count_sets(&sets)?;
            write_count_artifacts(output, &tables, &SequenceLengths::from_sets(&sets))
        }
        Command::Analyze {
            tables,
            lengths,
            output,
            analysis,
        } => {
            let lengths = read_lengths(lengths)?;
            let tables = tables
                .iter()
                .map(read_count_table)
                .collect::<Result<Vec<_>, _>>()?;
            let report = Comparison::new()
                .config(analysis.config())
                .analyze(tables, &lengths)?;
            finish(&report, output, quiet)
        }
        Command::Compare {
            k_values,
            paths,
            output,
            alphabet,
            complete_vocabulary,
            analysis,
        } => {
            let mut comparison = Comparison::new()
                .k_values(k_values.0)
                .config(analysis.config());
            if let Some(alphabet) = alphabet {
                comparison = comparison.alphabet(alphabet);
                if complete_vocabulary {
                    comparison = comparison.vocabulary(Vocabulary::Complete(alphabet));
                }
            }
            let report = comparison.run_files(&paths)?;
            finish(&report, output, quiet)
        }
    }
}

fn finish(
    report: &ComparisonReport,
    output: PathBuf,
    quiet: bool,
) -> Result<Vec<PathBuf>, KmerCompError> {
    if !quiet {
        for failure in report
            .results()
            .iter()
            .filter_map(|r| r.association.as_ref().err())
        {
            eprintln!("{} {}", "warning:".yellow().bold(), failure);
        }
    }
    report.write_artifacts(output)
}
