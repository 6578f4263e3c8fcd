//! K-mer counting primitives.
//!
//! This module holds the validated [`KmerLength`], the [`Sequence`] and
//! [`Alphabet`] types, and the sparse [`CountProfile`] produced by
//! [`count_kmers`].
//!
//! # Example
//!
//! ```rust
//! use kmercomp::kmer::{count_kmers, KmerLength, Sequence};
//!
//! let seq = Sequence::new("AAAB")?;
//! let profile = count_kmers(&seq, KmerLength::new(2)?);
//!
//! assert_eq!(profile.get("AA"), 2);
//! assert_eq!(profile.get("AB"), 1);
//! assert_eq!(profile.get("BB"), 0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{fmt, ops::Add};

use bytes::Bytes;
use clap::ValueEnum;
use rustc_hash::FxHashMap;

use crate::error::{InvalidSymbolError, KmerLengthError};

/// Minimum valid k-mer length.
pub const MIN_K: usize = 1;

/// A validated k-mer length (k >= 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KmerLength(usize);

impl KmerLength {
    /// Creates a k-mer length, rejecting zero.
    ///
    /// # Example
    ///
    /// ```rust
    /// use kmercomp::kmer::KmerLength;
    ///
    /// assert_eq!(KmerLength::new(3).map(|k| k.get()), Ok(3));
    /// assert!(KmerLength::new(0).is_err());
    /// ```
    pub const fn new(k: usize) -> Result<Self, KmerLengthError> {
        if k < MIN_K {
            return Err(KmerLengthError { k, min: MIN_K });
        }
        Ok(Self(k))
    }

    /// Returns the length as a plain `usize`.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }

    /// Parses a comma-separated list such as `"1,2,3"` into k-mer lengths.
    ///
    /// Duplicates are removed and the result is sorted ascending.
    pub fn parse_list(s: &str) -> Result<Vec<Self>, String> {
        let mut ks = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                let k: usize = part
                    .parse()
                    .map_err(|_| format!("'{part}' is not a valid number"))?;
                Self::new(k).map_err(|e| e.to_string())
            })
            .collect::<Result<Vec<_>, _>>()?;

        if ks.is_empty() {
            return Err("at least one k-mer length is required".to_string());
        }
        ks.sort_unstable();
        ks.dedup();
        Ok(ks)
    }
}

impl fmt::Display for KmerLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A fixed symbol set that sequences may be drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Alphabet {
    /// Nucleotides `ACGT`.
    Dna,
    /// The 20 standard amino acids plus selenocysteine (`U`).
    Protein,
}

const DNA_SYMBOLS: &[u8] = b"ACGT";
const PROTEIN_SYMBOLS: &[u8] = b"ACDEFGHIKLMNPQRSTUVWY";

impl Alphabet {
    /// The alphabet's symbols in ascending byte order.
    #[must_use]
    pub const fn symbols(self) -> &'static [u8] {
        match self {
            Self::Dna => DNA_SYMBOLS,
            Self::Protein => PROTEIN_SYMBOLS,
        }
    }

    /// Returns `true` if `symbol` belongs to this alphabet.
    #[must_use]
    pub fn contains(self, symbol: u8) -> bool {
        self.symbols().contains(&symbol)
    }

    /// Checks every byte of `residues` against the alphabet.
    pub fn validate(self, residues: &[u8]) -> Result<(), InvalidSymbolError> {
        match residues.iter().position(|&b| !self.contains(b)) {
            Some(position) => Err(InvalidSymbolError {
                symbol: residues[position],
                position,
            }),
            None => Ok(()),
        }
    }

    /// Enumerates every possible k-mer over this alphabet, in sorted order.
    ///
    /// The result has `symbols().len().pow(k)` entries, so this is only
    /// practical for small k.
    #[must_use]
    pub fn all_kmers(self, k: KmerLength) -> Vec<String> {
        let symbols = self.symbols();
        let mut kmers = vec![String::new()];
        for _ in 0..k.get() {
            kmers = kmers
                .iter()
                .flat_map(|prefix| {
                    symbols.iter().map(move |&s| {
                        let mut next = String::with_capacity(prefix.len() + 1);
                        next.push_str(prefix);
                        next.push(char::from(s));
                        next
                    })
                })
                .collect();
        }
        kmers
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dna => write!(f, "dna"),
            Self::Protein => write!(f, "protein"),
        }
    }
}

/// An immutable biological sequence.
///
/// Only ASCII bytes are accepted, so every window of the sequence is valid
/// UTF-8 and can be used as a k-mer key directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sequence(Bytes);

impl Sequence {
    /// Creates a sequence from anything that converts into [`Bytes`].
    pub fn new(residues: impl Into<Bytes>) -> Result<Self, InvalidSymbolError> {
        let residues = residues.into();
        if let Some(position) = residues.iter().position(|b| !b.is_ascii()) {
            return Err(InvalidSymbolError {
                symbol: residues[position],
                position,
            });
        }
        Ok(Self(residues))
    }

    /// Number of residues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the sequence has no residues.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw residue bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Sparse k-mer counts for one sequence or one sequence set.
///
/// Reads of absent k-mers return zero. Profiles combine by pointwise addition,
/// which is associative and commutative with the empty profile as identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountProfile(FxHashMap<String, u64>);

impl CountProfile {
    /// Creates an empty profile.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count for `kmer`, zero when absent.
    #[must_use]
    pub fn get(&self, kmer: &str) -> u64 {
        self.0.get(kmer).copied().unwrap_or(0)
    }

    /// Adds `count` occurrences of `kmer`.
    pub fn add(&mut self, kmer: &str, count: u64) {
        if let Some(existing) = self.0.get_mut(kmer) {
            *existing += count;
        } else {
            self.0.insert(kmer.to_owned(), count);
        }
    }

    /// Pointwise sum of two profiles.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        // Fold the smaller map into the larger one.
        let (mut into, from) = if self.0.len() >= other.0.len() {
            (self.0, other.0)
        } else {
            (other.0, self.0)
        };
        for (kmer, count) in from {
            *into.entry(kmer).or_insert(0) += count;
        }
        Self(into)
    }

    /// Number of distinct k-mers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no k-mer has been counted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of k-mer occurrences.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// Iterates over `(kmer, count)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.0.iter().map(|(kmer, &count)| (kmer.as_str(), count))
    }

    /// The observed k-mers in arbitrary order.
    pub fn kmers(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.keys().map(String::as_str)
    }
}

impl Add for CountProfile {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.merge(rhs)
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for CountProfile {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut profile = Self::new();
        for (kmer, count) in iter {
            *profile.0.entry(kmer.into()).or_insert(0) += count;
        }
        profile
    }
}

/// Counts every overlapping k-mer in `sequence`.
///
/// A window of length k is placed at every offset from 0 to `len - k`
/// inclusive. Sequences shorter than k yield an empty profile.
#[must_use]
pub fn count_kmers(sequence: &Sequence, k: KmerLength) -> CountProfile {
    let mut profile = CountProfile::new();
    count_into(&mut profile, sequence, k);
    profile
}

/// Adds the k-mers of `sequence` to an existing profile.
pub(crate) fn count_into(profile: &mut CountProfile, sequence: &Sequence, k: KmerLength) {
    for window in sequence.as_bytes().windows(k.get()) {
        // Sequence guarantees ASCII, so every window is valid UTF-8.
        if let Ok(kmer) = std::str::from_utf8(window) {
            profile.add(kmer, 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(s: &str) -> Sequence {
        Sequence::new(s.to_owned()).unwrap()
    }

    fn k(k: usize) -> KmerLength {
        KmerLength::new(k).unwrap()
    }

    #[test]
    fn counts_overlapping_windows() {
        let profile = count_kmers(&seq("AAAB"), k(2));
        assert_eq!(profile.get("AA"), 2);
        assert_eq!(profile.get("AB"), 1);
        assert_eq!(profile.len(), 2);
        assert_eq!(profile.total(), 3);
    }

    #[test]
    fn short_sequence_gives_empty_profile() {
        assert!(count_kmers(&seq("ACG"), k(4)).is_empty());
        assert!(count_kmers(&seq(""), k(1)).is_empty());
    }

    #[test]
    fn k_equal_to_length_counts_once() {
        let profile = count_kmers(&seq("MKV"), k(3));
        assert_eq!(profile.get("MKV"), 1);
        assert_eq!(profile.total(), 1);
    }

    #[test]
    fn counting_is_literal() {
        // No canonicalization and no skipping of unusual symbols.
        let profile = count_kmers(&seq("NNX"), k(2));
        assert_eq!(profile.get("NN"), 1);
        assert_eq!(profile.get("NX"), 1);
    }

    #[test]
    fn kmer_length_rejects_zero() {
        assert_eq!(KmerLength::new(0), Err(KmerLengthError { k: 0, min: 1 }));
    }

    #[test]
    fn parse_list_sorts_and_dedups() {
        let ks = KmerLength::parse_list("3, 1,2,3").unwrap();
        let ks: Vec<_> = ks.into_iter().map(KmerLength::get).collect();
        assert_eq!(ks, vec![1, 2, 3]);
    }

    #[test]
    fn parse_list_rejects_bad_input() {
        assert!(KmerLength::parse_list("").is_err());
        assert!(KmerLength::parse_list("1,a").is_err());
        assert!(KmerLength::parse_list("0").is_err());
    }

    #[test]
    fn merge_is_pointwise_sum() {
        let a: CountProfile = [("AA", 2), ("AB", 1)].into_iter().collect();
        let b: CountProfile = [("AB", 3), ("BB", 4)].into_iter().collect();
        let merged = a.clone() + b.clone();
        assert_eq!(merged.get("AA"), 2);
        assert_eq!(merged.get("AB"), 4);
        assert_eq!(merged.get("BB"), 4);
        assert_eq!(merged, b + a);
    }

    #[test]
    fn merge_with_empty_is_identity() {
        let a: CountProfile = [("AA", 2)].into_iter().collect();
        assert_eq!(a.clone().merge(CountProfile::new()), a);
        assert_eq!(CountProfile::new().merge(a.clone()), a);
    }

    #[test]
    fn sequence_rejects_non_ascii() {
        let err = Sequence::new("AÅ".to_owned()).unwrap_err();
        assert_eq!(err.position, 1);
    }

    #[test]
    fn alphabet_validate() {
        assert!(Alphabet::Dna.validate(b"ACGT").is_ok());
        let err = Alphabet::Dna.validate(b"ACNT").unwrap_err();
        assert_eq!(err.symbol, b'N');
        assert_eq!(err.position, 2);
        assert!(Alphabet::Protein.validate(b"MKVLU").is_ok());
        assert!(Alphabet::Protein.validate(b"MKB").is_err());
    }

    #[test]
    fn all_kmers_enumerates_sorted_vocabulary() {
        let kmers = Alphabet::Dna.all_kmers(k(2));
        assert_eq!(kmers.len(), 16);
        assert_eq!(kmers.first().map(String::as_str), Some("AA"));
        assert_eq!(kmers.last().map(String::as_str), Some("TT"));
        assert!(kmers.windows(2).all(|w| w[0] < w[1]));

        assert_eq!(Alphabet::Protein.all_kmers(k(1)).len(), 21);
    }
}
