//! # kmercomp
//!
//! Compare k-mer frequency profiles across two or more sequence sets.
//!
//! For every requested k, each set's sequences are counted and summed into a
//! [`CountProfile`](kmer::CountProfile), the profiles are aligned into a
//! [`FrequencyTable`](table::FrequencyTable), and the table is summarized with
//! descriptive statistics (raw and length-normalized) and a chi-square test of
//! independence with Cramér's V.
//!
//! ## Quick start
//!
//! ```rust
//! use kmercomp::aggregate::SequenceSet;
//! use kmercomp::builder::Comparison;
//! use kmercomp::kmer::Sequence;
//!
//! let a = SequenceSet::new("a", vec![Sequence::new("ACGTACGTAA")?]);
//! let b = SequenceSet::new("b", vec![Sequence::new("TTTTGCATTT")?]);
//!
//! let report = Comparison::new().k(1)?.k(2)?.run(&[a, b])?;
//! print!("{}", report.association_table());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Pieces
//!
//! - [`kmer`]: k-mer lengths, sequences and per-sequence counting
//! - [`aggregate`]: per-set count profiles
//! - [`table`]: aligned frequency tables with optional column filtering
//! - [`stats`]: mean, median, variance, standard deviation and extremum
//! - [`association`]: chi-square test and Cramér's V
//! - [`reader`] and [`report`]: input files and output artifacts
//!
//! ## Features
//!
//! - `rust-bio` (default): FASTA parsing with rust-bio
//! - `needletail`: FASTA parsing with needletail
//! - `gzip`: read `.gz` FASTA files
//! - `tracing`: structured logging of the pipeline

pub mod aggregate;
pub mod association;
pub mod builder;
pub mod cli;
pub mod config;
pub mod distribution;
pub mod error;
pub mod kmer;
pub mod lengths;
pub mod reader;
pub mod report;
pub mod stats;
pub mod table;
